//! Webhook送信用HTTPトランスポート
//!
//! Dispatcherが使うHTTP POSTの抽象化。本番ではプロセス起動時に1つだけ
//! 構築した`reqwest::Client`を全呼び出しで共有し、テストではモックに差し替える。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

/// リクエストタイムアウト（秒）
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// 接続タイムアウト（秒）
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// トランスポートのエラー型
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// HTTPクライアントの構築に失敗
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// 送信失敗（接続、DNS、タイムアウトなど）
    #[error("request failed: {0}")]
    Request(String),

    /// 送信後のレスポンスボディ読み取りに失敗
    #[error("failed to read response body (status {status}): {message}")]
    ReadBody { status: u16, message: String },
}

/// 受信側のレスポンス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    /// HTTPステータスコード（2xx以外もそのまま返す）
    pub status: u16,
    /// レスポンスボディ
    pub body: String,
}

/// Webhook送信トレイト（テスト用の抽象化）
///
/// リクエストの組み立ては呼び出しごとに完結させ、実装は並行利用に対して安全であること。
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// JSONボディを1回だけPOSTする（再試行しない）
    ///
    /// # 引数
    /// * `url` - 送信先URL
    /// * `body` - シリアライズ済みのJSONボディ
    ///
    /// # 戻り値
    /// * `Ok(WebhookResponse)` - ステータスに関わらずレスポンスを受け取れた
    /// * `Err(TransportError)` - 送信またはボディ読み取りに失敗
    async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<WebhookResponse, TransportError>;
}

/// reqwestを使った実装
#[derive(Debug, Clone)]
pub struct ReqwestWebhookTransport {
    client: Client,
}

impl ReqwestWebhookTransport {
    /// デフォルト設定のクライアントで作成
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| TransportError::Build(describe(e)))?;
        Ok(Self::with_client(client))
    }

    /// 事前設定されたクライアントで作成
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WebhookTransport for ReqwestWebhookTransport {
    async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<WebhookResponse, TransportError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Request(describe(e)))?;

        let status = response.status().as_u16();

        // 送信自体は成功しているので、読み取り失敗は送信失敗と区別する
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::ReadBody {
                status,
                message: describe(e),
            })?;

        Ok(WebhookResponse { status, body })
    }
}

/// reqwestのエラーを原因の連鎖を含めて文字列化する
///
/// Webhook URLにはトークンが含まれるため、URLは取り除く。
fn describe(err: reqwest::Error) -> String {
    let err = err.without_url();
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
