/// 入力形式ごとの変換器（SourceAdapter）の共通定義
///
/// 各アダプターは生のペイロードから`CanonicalNotification`を1つ組み立てる。
/// 失敗時もベストエフォートで正規化マップを返し、障害通知に添付できるようにする。
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use super::event_normalizer::{EventMap, NormalizationError};
use crate::domain::CanonicalNotification;

/// アダプター変換エラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    /// イベントの正規化に失敗
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    /// 送信先がイベントにも設定にも無い
    #[error("event must contain a 'webhookURL' or 'webhook_url'")]
    MissingTarget,

    /// 本文が無い
    #[error("event must contain a 'content' or 'message' field")]
    MissingContent,

    /// 設定済みの送信先を必須とするアダプターで未設定
    #[error("{adapter} adapter requires a configured target")]
    MissingConfiguredTarget { adapter: &'static str },

    /// アラームメッセージが空
    #[error("alarm message is empty")]
    EmptyAlarmMessage,

    /// フィールドの型付きデコードに失敗
    #[error("'{field}' has an invalid shape: {message}")]
    Schema { field: String, message: String },

    /// アラームレコードのデコードに失敗
    #[error("failed to decode cloudwatch alarm: {0}")]
    AlarmDecode(String),
}

/// アダプターの変換結果
///
/// `event`は成功・失敗に関わらず取得できた範囲の正規化マップ。
#[derive(Debug)]
pub struct Transformation {
    pub result: Result<CanonicalNotification, AdapterError>,
    pub event: Option<EventMap>,
}

impl Transformation {
    pub fn success(notification: CanonicalNotification, event: EventMap) -> Self {
        Self {
            result: Ok(notification),
            event: Some(event),
        }
    }

    pub fn failure(error: AdapterError, event: Option<EventMap>) -> Self {
        Self {
            result: Err(error),
            event,
        }
    }
}

/// 入力形式ごとの変換器
///
/// 呼び出し間で状態を持たない。同じ入力に対しては常に同じ結果を返す。
pub trait SourceAdapter: Send + Sync {
    /// ログ用のアダプター名
    fn name(&self) -> &'static str;

    /// 生のペイロードを通知に変換
    fn transform(&self, raw: &[u8]) -> Transformation;
}

/// 任意のJSON値を前後の空白を除いた文字列に変換する
///
/// 文字列はそのまま、nullは空文字列、それ以外はJSON表現を使う。
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// 指定キーを順に探し、最初に見つかった空でない値を返す
pub(crate) fn first_non_blank(event: &EventMap, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| event.get(*key))
        .map(stringify)
        .find(|value| !value.is_empty())
}

/// 指定キーを順に探し、最初に存在したキーと値を返す
pub(crate) fn first_present<'a>(
    event: &'a EventMap,
    keys: &[&'static str],
) -> Option<(&'static str, &'a Value)> {
    keys.iter()
        .find_map(|key| event.get(*key).map(|value| (*key, value)))
}

/// nullを空文字列として受け付ける（`deserialize_with`用）
pub(crate) fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    nullable_default(deserializer)
}

/// nullをデフォルト値として受け付ける（`deserialize_with`用）
pub(crate) fn nullable_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: Value) -> EventMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_stringify_trims_strings() {
        assert_eq!(stringify(&json!("  hello \n")), "hello");
    }

    #[test]
    fn test_stringify_coerces_scalars() {
        assert_eq!(stringify(&json!(42)), "42");
        assert_eq!(stringify(&json!(1.5)), "1.5");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&Value::Null), "");
    }

    #[test]
    fn test_first_non_blank_skips_blank_values() {
        let event = event(json!({"content": "   ", "message": "fallback"}));
        assert_eq!(
            first_non_blank(&event, &["content", "message"]),
            Some("fallback".to_string())
        );
    }

    #[test]
    fn test_first_non_blank_respects_key_order() {
        let event = event(json!({"message": "second", "content": "first"}));
        assert_eq!(
            first_non_blank(&event, &["content", "message"]),
            Some("first".to_string())
        );
    }

    #[test]
    fn test_first_present_returns_null_values() {
        let event = event(json!({"attachments": null}));
        let (key, value) = first_present(&event, &["embeds", "attachments"]).unwrap();
        assert_eq!(key, "attachments");
        assert!(value.is_null());
    }

    #[test]
    fn test_adapter_error_display() {
        assert_eq!(
            AdapterError::MissingConfiguredTarget {
                adapter: "cloudwatch"
            }
            .to_string(),
            "cloudwatch adapter requires a configured target"
        );
        assert_eq!(
            AdapterError::from(NormalizationError::NotObjectOrString).to_string(),
            "event must be an object or JSON string"
        );
        assert_eq!(
            AdapterError::Schema {
                field: "embeds".to_string(),
                message: "invalid type".to_string()
            }
            .to_string(),
            "'embeds' has an invalid shape: invalid type"
        );
    }
}
