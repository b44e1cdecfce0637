//! 通知の送信
//!
//! `CanonicalNotification`を受信側（Discord互換Webhook）のJSON形式に
//! シリアライズし、1回だけPOSTする。2xx以外のステータスはエラーにせず、
//! そのまま呼び出し元に返す。

use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::logging::redact_target;
use super::webhook_transport::{TransportError, WebhookResponse, WebhookTransport};
use crate::domain::{Attachment, AttachmentField, CanonicalNotification, MentionPolicy, ValidationError};

/// 送信エラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// 不変条件違反（ネットワーク呼び出しは行わない）
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// ワイヤ形式へのシリアライズ失敗
    #[error("failed to serialize webhook payload: {0}")]
    Serialization(String),

    /// 送信失敗
    #[error("failed to send message to webhook: {0}")]
    Delivery(String),

    /// 送信後のレスポンス読み取り失敗
    #[error("failed to read webhook response (status {status}): {message}")]
    ResponseRead { status: u16, message: String },
}

impl From<TransportError> for DispatchError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ReadBody { status, message } => {
                DispatchError::ResponseRead { status, message }
            }
            other => DispatchError::Delivery(other.to_string()),
        }
    }
}

/// 通知ディスパッチャー
#[derive(Debug, Clone)]
pub struct Dispatcher<T>
where
    T: WebhookTransport,
{
    transport: T,
}

impl<T> Dispatcher<T>
where
    T: WebhookTransport,
{
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// 通知を検証・シリアライズして送信する
    ///
    /// # 戻り値
    /// * `Ok(WebhookResponse)` - 受信側のステータスとボディ（2xx以外も含む）
    /// * `Err(DispatchError)` - 検証・シリアライズ・送信・読み取りのいずれかに失敗
    #[instrument(skip_all, fields(target_host = %redact_target(&notification.target)))]
    pub async fn send(
        &self,
        notification: &CanonicalNotification,
    ) -> Result<WebhookResponse, DispatchError> {
        notification.validate()?;
        let body = build_request_body(notification)?;
        let body_length = body.len();

        let started = Instant::now();
        let result = self.transport.post_json(&notification.target, body).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                info!(
                    status = response.status,
                    body_length = body_length,
                    elapsed_ms = elapsed_ms,
                    "Webhook送信完了"
                );
                Ok(response)
            }
            Err(err) => {
                warn!(error = %err, elapsed_ms = elapsed_ms, "Webhook送信失敗");
                Err(err.into())
            }
        }
    }
}

/// 通知をワイヤ形式のJSONにシリアライズする
///
/// 未設定・空の項目はキーごと省略する。メンションポリシーは中身が空でも
/// 存在すれば出力する（全抑止の指示になる）。
pub fn build_request_body(notification: &CanonicalNotification) -> Result<Vec<u8>, DispatchError> {
    serde_json::to_vec(&WebhookPayload::from(notification))
        .map_err(|e| DispatchError::Serialization(e.to_string()))
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<WireEmbed<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_mentions: Option<WireAllowedMentions<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct WireEmbed<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<WireField<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<WireFooter<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct WireField<'a> {
    name: &'a str,
    value: &'a str,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct WireFooter<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct WireAllowedMentions<'a> {
    /// 全抑止を表現するため常に出力する
    parse: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    users: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    roles: &'a [String],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    replied_user: bool,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl<'a> From<&'a CanonicalNotification> for WebhookPayload<'a> {
    fn from(n: &'a CanonicalNotification) -> Self {
        Self {
            content: n.body(),
            embeds: n.attachments.iter().map(WireEmbed::from).collect(),
            allowed_mentions: n.mention_policy.as_ref().map(WireAllowedMentions::from),
            username: n.sender_name(),
            avatar_url: n.sender_icon_url(),
        }
    }
}

impl<'a> From<&'a Attachment> for WireEmbed<'a> {
    fn from(a: &'a Attachment) -> Self {
        Self {
            title: non_empty(&a.title),
            description: non_empty(&a.description),
            color: a.accent_color,
            fields: a.fields.iter().map(WireField::from).collect(),
            footer: non_empty(&a.footer_text).map(|text| WireFooter { text }),
            timestamp: non_empty(&a.timestamp),
        }
    }
}

impl<'a> From<&'a AttachmentField> for WireField<'a> {
    fn from(f: &'a AttachmentField) -> Self {
        Self {
            name: &f.name,
            value: &f.value,
            inline: f.inline,
        }
    }
}

impl<'a> From<&'a MentionPolicy> for WireAllowedMentions<'a> {
    fn from(p: &'a MentionPolicy) -> Self {
        Self {
            parse: &p.allowed_parse_scopes,
            users: &p.allowed_user_ids,
            roles: &p.allowed_role_ids,
            replied_user: p.allow_replied_user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::webhook_transport::tests::MockWebhookTransport;
    use serde_json::{Value, json};

    fn body_json(notification: &CanonicalNotification) -> Value {
        serde_json::from_slice(&build_request_body(notification).unwrap()).unwrap()
    }

    fn simple_notification() -> CanonicalNotification {
        CanonicalNotification::new("https://discord.example/hook", "hello")
    }

    // ==================== シリアライズ テスト ====================

    #[test]
    fn test_body_only_payload() {
        assert_eq!(body_json(&simple_notification()), json!({"content": "hello"}));
    }

    #[test]
    fn test_full_payload() {
        let notification = CanonicalNotification {
            sender_name: Some("bot".to_string()),
            sender_icon_url: Some("https://example.com/a.png".to_string()),
            attachments: vec![Attachment {
                title: Some("Title".to_string()),
                description: Some("Desc".to_string()),
                accent_color: Some(0xE74C3C),
                fields: vec![AttachmentField::new("Region", "us-east-1", true)],
                footer_text: Some("footer".to_string()),
                timestamp: Some("2024-01-02T03:04:05.678Z".to_string()),
            }],
            mention_policy: Some(MentionPolicy {
                allowed_parse_scopes: vec!["users".to_string()],
                allowed_user_ids: vec!["123".to_string()],
                allowed_role_ids: vec![],
                allow_replied_user: true,
            }),
            ..simple_notification()
        };

        assert_eq!(
            body_json(&notification),
            json!({
                "content": "hello",
                "embeds": [{
                    "title": "Title",
                    "description": "Desc",
                    "color": 0xE74C3C,
                    "fields": [{"name": "Region", "value": "us-east-1", "inline": true}],
                    "footer": {"text": "footer"},
                    "timestamp": "2024-01-02T03:04:05.678Z"
                }],
                "allowed_mentions": {"parse": ["users"], "users": ["123"], "replied_user": true},
                "username": "bot",
                "avatar_url": "https://example.com/a.png"
            })
        );
    }

    #[test]
    fn test_explicit_suppression_is_serialized() {
        let notification = CanonicalNotification {
            mention_policy: Some(MentionPolicy::suppress_all()),
            ..simple_notification()
        };
        assert_eq!(
            body_json(&notification),
            json!({"content": "hello", "allowed_mentions": {"parse": []}})
        );
    }

    #[test]
    fn test_blank_optional_fields_are_omitted() {
        let notification = CanonicalNotification {
            body: Some("  ".to_string()),
            sender_name: Some(" ".to_string()),
            sender_icon_url: Some(String::new()),
            attachments: vec![Attachment {
                title: Some("only title".to_string()),
                footer_text: Some(String::new()),
                timestamp: Some(String::new()),
                ..Attachment::default()
            }],
            ..simple_notification()
        };
        assert_eq!(
            body_json(&notification),
            json!({"embeds": [{"title": "only title"}]})
        );
    }

    // ==================== send テスト ====================

    #[tokio::test]
    async fn test_send_success() {
        let transport = MockWebhookTransport::new();
        transport.push_response(200, "ok");
        let dispatcher = Dispatcher::new(transport.clone());

        let response = dispatcher.send(&simple_notification()).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "ok");
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://discord.example/hook");
        assert_eq!(requests[0].json(), json!({"content": "hello"}));
    }

    #[tokio::test]
    async fn test_send_returns_non_success_status() {
        let transport = MockWebhookTransport::new();
        transport.push_response(400, r#"{"message":"Cannot send an empty message"}"#);
        let dispatcher = Dispatcher::new(transport);

        let response = dispatcher.send(&simple_notification()).await.unwrap();

        assert_eq!(response.status, 400);
        assert!(response.body.contains("Cannot send an empty message"));
    }

    #[tokio::test]
    async fn test_send_validation_error_makes_no_request() {
        let transport = MockWebhookTransport::new();
        let dispatcher = Dispatcher::new(transport.clone());

        let result = dispatcher.send(&CanonicalNotification::default()).await;

        assert_eq!(
            result.unwrap_err(),
            DispatchError::Validation(ValidationError::MissingTarget)
        );
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_send_network_error_is_delivery_error() {
        let transport = MockWebhookTransport::new();
        transport.push_error(TransportError::Request("boom".to_string()));
        let dispatcher = Dispatcher::new(transport);

        let err = dispatcher.send(&simple_notification()).await.unwrap_err();

        assert_eq!(err, DispatchError::Delivery("request failed: boom".to_string()));
        assert!(err.to_string().starts_with("failed to send message to webhook"));
    }

    #[tokio::test]
    async fn test_send_read_error_is_distinct_from_delivery_error() {
        let transport = MockWebhookTransport::new();
        transport.push_error(TransportError::ReadBody {
            status: 200,
            message: "connection reset".to_string(),
        });
        let dispatcher = Dispatcher::new(transport);

        let err = dispatcher.send(&simple_notification()).await.unwrap_err();

        assert_eq!(
            err,
            DispatchError::ResponseRead {
                status: 200,
                message: "connection reset".to_string()
            }
        );
    }
}
