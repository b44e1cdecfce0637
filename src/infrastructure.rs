// インフラストラクチャ層モジュール
pub mod config;
pub mod dispatcher;
pub mod logging;
pub mod webhook_transport;

// 再エクスポート
pub use config::NotifierConfig;
pub use dispatcher::{DispatchError, Dispatcher, build_request_body};
pub use logging::{init_logging, redact_target};
pub use webhook_transport::{
    ReqwestWebhookTransport, TransportError, WebhookResponse, WebhookTransport,
};
