// アプリケーション層モジュール
pub mod adapter_selector;
pub mod cloudwatch_adapter;
pub mod direct_adapter;
pub mod event_normalizer;
pub mod failure_notifier;
pub mod notification_handler;
pub mod source_adapter;

// 再エクスポート
pub use adapter_selector::{AdapterKind, AdapterSelector, SelectorError};
pub use cloudwatch_adapter::CloudWatchAlarmAdapter;
pub use direct_adapter::DirectAdapter;
pub use event_normalizer::{EventMap, EventNormalizer, NormalizationError};
pub use failure_notifier::FailureNotifier;
pub use notification_handler::{HandlerError, InvocationResponse, NotificationHandler};
pub use source_adapter::{AdapterError, SourceAdapter, Transformation};
