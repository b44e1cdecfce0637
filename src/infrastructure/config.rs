//! 通知Lambda設定
//!
//! 呼び出しごとに環境変数から読み込む。どの変数も読み込み時点では必須ではなく、
//! 必要性はそれを使うアダプターが判断する。

/// アダプター種別の環境変数
pub const ADAPTER_TYPE_ENV: &str = "ADAPTER_TYPE";

/// 送信先URLの環境変数（directでは代替、cloudwatchでは必須）
pub const WEBHOOK_URL_ENV: &str = "WEBHOOK_URL";

/// 障害通知先URLの環境変数（空なら障害通知しない）
pub const ERROR_WEBHOOK_URL_ENV: &str = "ERROR_WEBHOOK_URL";

/// 通知Lambda設定
///
/// 以下の環境変数から読み込む（前後の空白は除去）:
/// - ADAPTER_TYPE: `direct`（デフォルト）または`cloudwatch`
/// - WEBHOOK_URL: 送信先URL
/// - ERROR_WEBHOOK_URL: 障害通知先URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifierConfig {
    adapter_type: String,
    webhook_url: String,
    error_webhook_url: String,
}

impl NotifierConfig {
    /// 明示的な値で設定を作成（テスト用）
    pub fn new(
        adapter_type: impl Into<String>,
        webhook_url: impl Into<String>,
        error_webhook_url: impl Into<String>,
    ) -> Self {
        Self {
            adapter_type: adapter_type.into().trim().to_string(),
            webhook_url: webhook_url.into().trim().to_string(),
            error_webhook_url: error_webhook_url.into().trim().to_string(),
        }
    }

    /// 環境変数から設定を読み込む（未設定は空文字列）
    pub fn from_env() -> Self {
        let read = |key: &str| std::env::var(key).unwrap_or_default();
        Self::new(
            read(ADAPTER_TYPE_ENV),
            read(WEBHOOK_URL_ENV),
            read(ERROR_WEBHOOK_URL_ENV),
        )
    }

    /// アダプター種別を取得
    pub fn adapter_type(&self) -> &str {
        &self.adapter_type
    }

    /// 送信先URLを取得
    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    /// 障害通知先URLを取得
    pub fn error_webhook_url(&self) -> &str {
        &self.error_webhook_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    unsafe fn clear_env() {
        unsafe {
            std::env::remove_var(ADAPTER_TYPE_ENV);
            std::env::remove_var(WEBHOOK_URL_ENV);
            std::env::remove_var(ERROR_WEBHOOK_URL_ENV);
        }
    }

    #[test]
    fn test_new_trims_values() {
        let config = NotifierConfig::new(" CloudWatch ", " https://hook \n", "\thttps://err ");

        assert_eq!(config.adapter_type(), "CloudWatch");
        assert_eq!(config.webhook_url(), "https://hook");
        assert_eq!(config.error_webhook_url(), "https://err");
    }

    #[test]
    #[serial]
    fn test_from_env_success() {
        // 環境変数を設定 (Rust 2024ではunsafe)
        unsafe {
            clear_env();
            std::env::set_var(ADAPTER_TYPE_ENV, "cloudwatch");
            std::env::set_var(WEBHOOK_URL_ENV, " https://discord.example/hook ");
            std::env::set_var(ERROR_WEBHOOK_URL_ENV, "https://discord.example/error");
        }

        let config = NotifierConfig::from_env();

        assert_eq!(config.adapter_type(), "cloudwatch");
        assert_eq!(config.webhook_url(), "https://discord.example/hook");
        assert_eq!(config.error_webhook_url(), "https://discord.example/error");

        unsafe { clear_env() };
    }

    #[test]
    #[serial]
    fn test_from_env_defaults_to_empty() {
        unsafe { clear_env() };

        let config = NotifierConfig::from_env();

        assert_eq!(config, NotifierConfig::default());
        assert_eq!(config.adapter_type(), "");
        assert_eq!(config.webhook_url(), "");
        assert_eq!(config.error_webhook_url(), "");
    }
}
