/// Discord通知Lambda関数
///
/// 受信したイベントを設定されたアダプターで正規化済み通知に変換し、
/// Discord互換のWebhookへ送信する。失敗時は障害通知先へ診断メッセージを送る。
///
/// 設定（環境変数、呼び出しごとに読み込み）:
/// - ADAPTER_TYPE: `direct`（デフォルト）または`cloudwatch`
/// - WEBHOOK_URL: 送信先URL
/// - ERROR_WEBHOOK_URL: 障害通知先URL
use lambda_runtime::{Error, LambdaEvent, service_fn};
use notifier::application::{InvocationResponse, NotificationHandler};
use notifier::infrastructure::{
    Dispatcher, NotifierConfig, ReqwestWebhookTransport, TransportError, init_logging,
};
use serde_json::value::RawValue;
use tokio::sync::OnceCell;
use tracing::info;

/// ReqwestWebhookTransportの静的インスタンス
///
/// Lambda warm start時にコネクションプールを再利用するため、
/// 一度構築したクライアントを静的に保持する。
static TRANSPORT: OnceCell<ReqwestWebhookTransport> = OnceCell::const_new();

/// ReqwestWebhookTransportを取得（初期化されていなければ初期化）
async fn get_transport() -> Result<&'static ReqwestWebhookTransport, TransportError> {
    TRANSPORT
        .get_or_try_init(|| async { ReqwestWebhookTransport::new() })
        .await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // 構造化ログを初期化
    init_logging();

    // HTTPクライアントの構築失敗は起動エラーにする
    get_transport().await?;

    // Lambda関数を初期化して実行
    let func = service_fn(handler);
    lambda_runtime::run(func).await?;
    Ok(())
}

/// Lambda関数のメインハンドラー
///
/// # 処理フロー
/// 1. 設定を環境変数から読み込み
/// 2. NotificationHandlerで変換・送信
/// 3. 受信側のステータスとボディをそのまま返却
///
/// 失敗時は元のエラーをそのままランタイムに返す（障害通知はハンドラー内で実施済み）。
async fn handler(event: LambdaEvent<Box<RawValue>>) -> Result<InvocationResponse, Error> {
    let request_id = event.context.request_id.clone();
    let raw = event.payload.get();

    info!(
        request_id = %request_id,
        payload_length = raw.len(),
        "通知イベントを受信"
    );

    let config = NotifierConfig::from_env();
    let transport = get_transport().await?;
    let handler = NotificationHandler::new(config, Dispatcher::new(transport.clone()));

    let response = handler.handle(raw.as_bytes()).await?;
    Ok(response)
}
