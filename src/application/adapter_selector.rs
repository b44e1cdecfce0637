/// アダプター選択
///
/// データの中身ではなく設定値（ADAPTER_TYPE）でアダプターを決める。
use thiserror::Error;

use super::cloudwatch_adapter::CloudWatchAlarmAdapter;
use super::direct_adapter::DirectAdapter;
use super::source_adapter::SourceAdapter;

/// アダプター選択エラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectorError {
    /// 未対応のアダプター種別
    #[error("unsupported adapter type: {0:?}")]
    UnsupportedAdapter(String),
}

/// アダプター種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    /// 直接形式（デフォルト）
    Direct,
    /// CloudWatchアラーム（SNS経由）
    CloudWatch,
}

impl AdapterKind {
    /// 設定値をパースする（前後の空白と大文字小文字は無視）
    pub fn parse(value: &str) -> Result<Self, SelectorError> {
        match value.trim().to_lowercase().as_str() {
            "" | "direct" => Ok(AdapterKind::Direct),
            "cloudwatch" => Ok(AdapterKind::CloudWatch),
            _ => Err(SelectorError::UnsupportedAdapter(value.trim().to_string())),
        }
    }
}

/// アダプター選択器
pub struct AdapterSelector;

impl AdapterSelector {
    /// 設定値からアダプターを構築する
    ///
    /// # 引数
    /// * `adapter_type` - アダプター種別の設定値
    /// * `configured_target` - 設定済みの送信先。directでは代替、cloudwatchでは必須
    pub fn select(
        adapter_type: &str,
        configured_target: &str,
    ) -> Result<Box<dyn SourceAdapter>, SelectorError> {
        let adapter: Box<dyn SourceAdapter> = match AdapterKind::parse(adapter_type)? {
            AdapterKind::Direct => Box::new(DirectAdapter::new(configured_target)),
            AdapterKind::CloudWatch => Box::new(CloudWatchAlarmAdapter::new(configured_target)),
        };
        Ok(adapter)
    }
}
