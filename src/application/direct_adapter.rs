/// 直接形式アダプター
///
/// Webhookのリクエストボディに近い形のJSON（またはそれを文字列化したもの）を
/// そのまま通知に変換する。
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::event_normalizer::{EventMap, EventNormalizer};
use super::source_adapter::{
    AdapterError, SourceAdapter, Transformation, first_non_blank, first_present,
    nullable_default, nullable_string,
};
use crate::domain::{Attachment, AttachmentField, CanonicalNotification, MentionPolicy};

const TARGET_KEYS: [&str; 2] = ["webhookURL", "webhook_url"];
const BODY_KEYS: [&str; 2] = ["content", "message"];
const SENDER_NAME_KEYS: [&str; 2] = ["username", "senderName"];
const SENDER_ICON_KEYS: [&str; 2] = ["avatar_url", "senderIconURL"];
const ATTACHMENT_KEYS: [&str; 2] = ["embeds", "attachments"];
const MENTION_KEYS: [&str; 2] = ["allowed_mentions", "mentionPolicy"];

/// 受信側が受け付ける色コードの上限
const MAX_COLOR: u32 = 0xFFFFFF;

/// 直接形式アダプター
#[derive(Debug, Clone, Default)]
pub struct DirectAdapter {
    /// イベントに送信先が無い場合に使う送信先（空なら無効）
    fallback_target: String,
}

impl DirectAdapter {
    pub fn new(fallback_target: impl Into<String>) -> Self {
        Self {
            fallback_target: fallback_target.into().trim().to_string(),
        }
    }

    fn build(&self, event: &EventMap) -> Result<CanonicalNotification, AdapterError> {
        let target = first_non_blank(event, &TARGET_KEYS)
            .or_else(|| Some(self.fallback_target.clone()).filter(|t| !t.is_empty()))
            .ok_or(AdapterError::MissingTarget)?;

        // アタッチメントがあっても本文は必須
        let body = first_non_blank(event, &BODY_KEYS).ok_or(AdapterError::MissingContent)?;

        let mut notification = CanonicalNotification::new(target, body);
        notification.sender_name = first_non_blank(event, &SENDER_NAME_KEYS);
        notification.sender_icon_url = first_non_blank(event, &SENDER_ICON_KEYS);

        if let Some((key, value)) = first_present(event, &ATTACHMENT_KEYS) {
            notification.attachments = decode_attachments(key, value)?;
        }

        if let Some((key, value)) = first_present(event, &MENTION_KEYS) {
            notification.mention_policy = decode_mention_policy(key, value)?;
        }

        Ok(notification)
    }
}

impl SourceAdapter for DirectAdapter {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn transform(&self, raw: &[u8]) -> Transformation {
        let event = match EventNormalizer::normalize(raw) {
            Ok(event) => event,
            Err(err) => return Transformation::failure(err.into(), None),
        };

        match self.build(&event) {
            Ok(notification) => Transformation::success(notification, event),
            Err(err) => Transformation::failure(err, Some(event)),
        }
    }
}

/// 受信側スキーマのembed
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EmbedInput {
    title: Option<String>,
    description: Option<String>,
    #[serde(deserialize_with = "lenient_color")]
    color: Option<u32>,
    fields: Option<Vec<EmbedFieldInput>>,
    footer: Option<EmbedFooterInput>,
    timestamp: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EmbedFieldInput {
    #[serde(deserialize_with = "nullable_string")]
    name: String,
    #[serde(deserialize_with = "nullable_string")]
    value: String,
    #[serde(deserialize_with = "nullable_default")]
    inline: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EmbedFooterInput {
    #[serde(deserialize_with = "nullable_string")]
    text: String,
}

/// 受信側スキーマのallowed_mentions
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AllowedMentionsInput {
    parse: Option<Vec<String>>,
    users: Option<Vec<String>>,
    roles: Option<Vec<String>>,
    #[serde(deserialize_with = "nullable_default")]
    replied_user: bool,
}

impl From<EmbedInput> for Attachment {
    fn from(input: EmbedInput) -> Self {
        Self {
            title: input.title,
            description: input.description,
            accent_color: input.color,
            fields: input
                .fields
                .unwrap_or_default()
                .into_iter()
                .map(|f| AttachmentField::new(f.name, f.value, f.inline))
                .collect(),
            footer_text: input.footer.map(|f| f.text).filter(|t| !t.is_empty()),
            timestamp: input.timestamp,
        }
    }
}

impl From<AllowedMentionsInput> for MentionPolicy {
    fn from(input: AllowedMentionsInput) -> Self {
        Self {
            allowed_parse_scopes: input.parse.unwrap_or_default(),
            allowed_user_ids: input.users.unwrap_or_default(),
            allowed_role_ids: input.roles.unwrap_or_default(),
            allow_replied_user: input.replied_user,
        }
    }
}

/// 色は任意の整数として受け付け、0xRRGGBBの範囲外は指定なしとして扱う
fn lenient_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let color = Option::<i64>::deserialize(deserializer)?;
    Ok(color
        .and_then(|c| u32::try_from(c).ok())
        .filter(|c| *c <= MAX_COLOR))
}

/// 汎用JSON値を型付きの値にデコードする
fn decode_field<T: DeserializeOwned>(field: &str, value: &Value) -> Result<T, AdapterError> {
    serde_json::from_value(value.clone()).map_err(|e| AdapterError::Schema {
        field: field.to_string(),
        message: e.to_string(),
    })
}

fn decode_attachments(field: &str, value: &Value) -> Result<Vec<Attachment>, AdapterError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    let embeds: Vec<EmbedInput> = decode_field(field, value)?;
    Ok(embeds.into_iter().map(Attachment::from).collect())
}

/// 空のポリシーは「指定なし」として扱う（明示的な全抑止にはしない）
fn decode_mention_policy(field: &str, value: &Value) -> Result<Option<MentionPolicy>, AdapterError> {
    if value.is_null() {
        return Ok(None);
    }
    let input: AllowedMentionsInput = decode_field(field, value)?;
    let policy = MentionPolicy::from(input);
    Ok(Some(policy).filter(|p| !p.is_empty()))
}
