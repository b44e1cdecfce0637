// ドメイン層モジュール
pub mod notification;

// 再エクスポート
pub use notification::{
    Attachment, AttachmentField, CanonicalNotification, MentionPolicy, ValidationError,
};
