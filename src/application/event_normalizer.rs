/// 受信イベントの正規化
///
/// Lambdaに届くペイロードはJSONオブジェクトの場合と、JSONを文字列として
/// エスケープした形（SNS経由など）の場合がある。どちらも汎用マップに揃える。
use serde_json::{Map, Value};
use thiserror::Error;

/// 正規化後の汎用キー・バリュー構造
pub type EventMap = Map<String, Value>;

/// 正規化エラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizationError {
    /// オブジェクトでもJSON文字列でもない
    #[error("event must be an object or JSON string")]
    NotObjectOrString,
    /// 文字列の中身がJSONとして解釈できない
    #[error("string payload must contain a JSON object")]
    StringNotObject,
}

/// 受信イベント正規化器
pub struct EventNormalizer;

impl EventNormalizer {
    /// 生のペイロードを汎用マップに変換する
    ///
    /// - 空または空白のみ → 空マップ
    /// - JSONオブジェクト → そのまま
    /// - JSON文字列 → 中身を再度JSONとしてパース
    /// - それ以外 → `NormalizationError::NotObjectOrString`
    pub fn normalize(raw: &[u8]) -> Result<EventMap, NormalizationError> {
        let trimmed = raw.trim_ascii();
        if trimmed.is_empty() {
            return Ok(EventMap::new());
        }

        match serde_json::from_slice::<Value>(trimmed) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(Value::String(inner)) => Self::unwrap_string(&inner),
            _ => Err(NormalizationError::NotObjectOrString),
        }
    }

    /// JSON文字列の中身をオブジェクトとしてパース
    fn unwrap_string(inner: &str) -> Result<EventMap, NormalizationError> {
        let inner = inner.trim();
        if inner.is_empty() {
            return Ok(EventMap::new());
        }

        match serde_json::from_str::<Value>(inner) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(NormalizationError::NotObjectOrString),
            Err(_) => Err(NormalizationError::StringNotObject),
        }
    }
}
