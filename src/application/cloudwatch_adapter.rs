/// CloudWatchアラームアダプター
///
/// SNS経由で届くCloudWatchアラームの状態変化を、1つのembedを持つ通知に変換する。
/// 送信先は設定値で固定し、メンションは常に全抑止にする。
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::event_normalizer::EventMap;
use super::source_adapter::{
    AdapterError, SourceAdapter, Transformation, nullable_default, nullable_string,
};
use crate::domain::{Attachment, AttachmentField, CanonicalNotification, MentionPolicy};

/// ALARM状態の色（赤系）
pub const ALARM_COLOR: u32 = 0xE74C3C;

/// OK状態の色（緑系）
pub const OK_COLOR: u32 = 0x2ECC71;

const DEFAULT_DESCRIPTION: &str = "CloudWatch reported a state change.";

/// CloudWatchアラームアダプター
#[derive(Debug, Clone, Default)]
pub struct CloudWatchAlarmAdapter {
    target: String,
}

impl CloudWatchAlarmAdapter {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into().trim().to_string(),
        }
    }

    fn build(&self, alarm: &CloudWatchAlarm) -> CanonicalNotification {
        let mut notification = CanonicalNotification::new(&self.target, alarm_summary(alarm));
        notification.mention_policy = Some(MentionPolicy::suppress_all());
        notification.attachments.push(alarm_attachment(alarm));
        notification
    }
}

impl SourceAdapter for CloudWatchAlarmAdapter {
    fn name(&self) -> &'static str {
        "cloudwatch"
    }

    fn transform(&self, raw: &[u8]) -> Transformation {
        if self.target.is_empty() {
            return Transformation::failure(
                AdapterError::MissingConfiguredTarget {
                    adapter: self.name(),
                },
                None,
            );
        }

        let message = match extract_alarm_message(raw) {
            Ok(message) => message,
            Err(err) => return Transformation::failure(err, None),
        };

        match decode_alarm(&message) {
            Ok((alarm, event)) => Transformation::success(self.build(&alarm), event),
            Err(err) => Transformation::failure(err, Some(raw_message_map(&message))),
        }
    }
}

/// SNS Lambdaイベントのエンベロープ（必要な部分のみ）
#[derive(Debug, Default, Deserialize)]
struct SnsEnvelope {
    #[serde(rename = "Records", default)]
    records: Vec<SnsRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct SnsRecord {
    #[serde(rename = "Sns", default)]
    sns: SnsNotification,
}

#[derive(Debug, Default, Deserialize)]
struct SnsNotification {
    #[serde(rename = "Message", default)]
    message: Value,
}

/// CloudWatchアラームのSNSメッセージ
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CloudWatchAlarm {
    #[serde(rename = "AlarmName", deserialize_with = "nullable_string")]
    alarm_name: String,
    #[serde(rename = "AlarmDescription", deserialize_with = "nullable_string")]
    alarm_description: String,
    #[serde(rename = "AWSAccountId", deserialize_with = "nullable_string")]
    aws_account_id: String,
    #[serde(rename = "NewStateValue", deserialize_with = "nullable_string")]
    new_state_value: String,
    #[serde(rename = "NewStateReason", deserialize_with = "nullable_string")]
    new_state_reason: String,
    #[serde(rename = "StateChangeTime", deserialize_with = "nullable_string")]
    state_change_time: String,
    #[serde(rename = "Region", deserialize_with = "nullable_string")]
    region: String,
    #[serde(rename = "AlarmArn", deserialize_with = "nullable_string")]
    alarm_arn: String,
    #[serde(rename = "OldStateValue", deserialize_with = "nullable_string")]
    old_state_value: String,
    #[serde(rename = "Trigger", deserialize_with = "nullable_default")]
    trigger: CloudWatchTrigger,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CloudWatchTrigger {
    #[serde(rename = "MetricName", deserialize_with = "nullable_string")]
    metric_name: String,
    #[serde(rename = "Namespace", deserialize_with = "nullable_string")]
    namespace: String,
    #[serde(rename = "StatisticType", deserialize_with = "nullable_string")]
    statistic_type: String,
    #[serde(rename = "Statistic", deserialize_with = "nullable_string")]
    statistic: String,
    #[serde(rename = "Period", deserialize_with = "nullable_default")]
    period: i64,
    #[serde(rename = "EvaluationPeriods", deserialize_with = "nullable_default")]
    evaluation_periods: i64,
    #[serde(rename = "ComparisonOperator", deserialize_with = "nullable_string")]
    comparison_operator: String,
    /// 数値の文字列表現をそのまま保持する
    #[serde(rename = "Threshold", deserialize_with = "threshold_text")]
    threshold: String,
    #[serde(rename = "TreatMissingData", deserialize_with = "nullable_string")]
    treat_missing_data: String,
    #[serde(rename = "Dimensions", deserialize_with = "nullable_default")]
    dimensions: Vec<CloudWatchDimension>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CloudWatchDimension {
    #[serde(deserialize_with = "nullable_string")]
    name: String,
    #[serde(deserialize_with = "nullable_string")]
    value: String,
}

/// 閾値は数値・数値文字列のどちらでも受け付け、テキストとして保持する
fn threshold_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.trim().to_string()),
        other => Err(serde::de::Error::custom(format!(
            "Threshold must be a number, got {other}"
        ))),
    }
}

/// 生のペイロードからアラームメッセージ本文を取り出す
///
/// 優先順: JSON文字列 → SNSエンベロープの`Records[0].Sns.Message` → 生のペイロード。
/// 最初に構造が一致したものだけを使う。
fn extract_alarm_message(raw: &[u8]) -> Result<String, AdapterError> {
    let trimmed = raw.trim_ascii();
    if trimmed.is_empty() {
        return Err(AdapterError::EmptyAlarmMessage);
    }

    let message = if let Ok(unwrapped) = serde_json::from_slice::<String>(trimmed) {
        unwrapped
    } else if let Some(message) = envelope_message(trimmed) {
        message
    } else {
        String::from_utf8_lossy(trimmed).into_owned()
    };

    let message = message.trim();
    if message.is_empty() {
        return Err(AdapterError::EmptyAlarmMessage);
    }
    Ok(message.to_string())
}

/// SNSエンベロープの最初のレコードのメッセージを取り出す
///
/// メッセージは通常JSON文字列だが、オブジェクトが埋め込まれている場合も受け付ける。
fn envelope_message(raw: &[u8]) -> Option<String> {
    let envelope: SnsEnvelope = serde_json::from_slice(raw).ok()?;
    match envelope.records.into_iter().next()?.sns.message {
        Value::String(message) if !message.is_empty() => Some(message),
        Value::Object(object) => Some(Value::Object(object).to_string()),
        _ => None,
    }
}

/// メッセージをアラームレコードとしてデコードする
///
/// JSONオブジェクト以外は受け付けない。デコード元のオブジェクトは
/// 未知のキーも含めてそのまま障害通知用のマップとして返す。
fn decode_alarm(message: &str) -> Result<(CloudWatchAlarm, EventMap), AdapterError> {
    let map = match serde_json::from_str::<Value>(message) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(AdapterError::AlarmDecode(format!(
                "alarm message must be a JSON object, got {}",
                json_kind(&other)
            )));
        }
        Err(err) => return Err(AdapterError::AlarmDecode(err.to_string())),
    };

    let alarm = serde_json::from_value(Value::Object(map.clone()))
        .map_err(|e| AdapterError::AlarmDecode(e.to_string()))?;
    Ok((alarm, map))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// デコードできなかったメッセージを障害通知用に包む
fn raw_message_map(message: &str) -> EventMap {
    let mut fallback = EventMap::new();
    fallback.insert("raw".to_string(), Value::String(message.to_string()));
    fallback
}

fn alarm_summary(alarm: &CloudWatchAlarm) -> String {
    let state = alarm.new_state_value.trim().to_lowercase();
    let state = if state.is_empty() { "unknown" } else { state.as_str() };
    format!(
        ":rotating_light: CloudWatch alarm {:?} is {}",
        alarm.alarm_name, state
    )
}

fn alarm_attachment(alarm: &CloudWatchAlarm) -> Attachment {
    let reason = alarm.new_state_reason.trim();
    let description = if reason.is_empty() {
        DEFAULT_DESCRIPTION
    } else {
        reason
    };

    let accent_color = match alarm.new_state_value.trim().to_uppercase().as_str() {
        "ALARM" => Some(ALARM_COLOR),
        "OK" => Some(OK_COLOR),
        _ => None,
    };

    let footer = alarm.alarm_description.trim();

    Attachment {
        title: Some(alarm.alarm_name.clone()),
        description: Some(description.to_string()),
        accent_color,
        fields: alarm_fields(alarm),
        footer_text: (!footer.is_empty()).then(|| footer.to_string()),
        timestamp: Some(alarm.state_change_time.clone()).filter(|t| !t.is_empty()),
    }
}

fn alarm_fields(alarm: &CloudWatchAlarm) -> Vec<AttachmentField> {
    let mut fields = Vec::new();
    let mut push = |name: &str, value: &str, inline: bool| {
        let value = value.trim();
        if !value.is_empty() {
            fields.push(AttachmentField::new(name, value, inline));
        }
    };

    push("Account", &alarm.aws_account_id, true);
    push("Region", &alarm.region, true);
    push("Old State", &alarm.old_state_value, true);
    push("New State", &alarm.new_state_value, true);
    push("Alarm ARN", &alarm.alarm_arn, false);
    push("Trigger", &trigger_summary(&alarm.trigger), false);
    push("Dimensions", &dimensions_summary(&alarm.trigger.dimensions), false);

    fields
}

fn trigger_summary(trigger: &CloudWatchTrigger) -> String {
    let mut parts = Vec::new();

    let metric = trigger.metric_name.trim();
    let namespace = trigger.namespace.trim();
    if !metric.is_empty() {
        if namespace.is_empty() {
            parts.push(metric.to_string());
        } else {
            parts.push(format!("{namespace}/{metric}"));
        }
    }

    let statistic = [&trigger.statistic_type, &trigger.statistic]
        .into_iter()
        .map(|s| s.trim())
        .find(|s| !s.is_empty());
    if let Some(statistic) = statistic {
        parts.push(statistic.to_string());
    }

    let operator = trigger.comparison_operator.trim();
    if !operator.is_empty() && !trigger.threshold.is_empty() {
        parts.push(format!("{operator} {}", trigger.threshold));
    }
    if trigger.evaluation_periods > 0 {
        parts.push(format!("for {} periods", trigger.evaluation_periods));
    }
    if trigger.period > 0 {
        parts.push(format!("period: {}s", trigger.period));
    }

    let missing = trigger.treat_missing_data.trim();
    if !missing.is_empty() {
        parts.push(format!("missing data: {missing}"));
    }

    parts.join(" · ")
}

fn dimensions_summary(dimensions: &[CloudWatchDimension]) -> String {
    dimensions
        .iter()
        .map(|d| (d.name.trim(), d.value.trim()))
        .filter(|(name, value)| !name.is_empty() && !value.is_empty())
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}
