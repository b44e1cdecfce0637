/// 通知ハンドラー
///
/// 1回の呼び出しを処理する唯一の入口。アダプター選択・変換・送信を順に行い、
/// いずれかが失敗した場合は障害通知を試みてから元のエラーをそのまま返す。
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use super::adapter_selector::{AdapterSelector, SelectorError};
use super::event_normalizer::EventMap;
use super::failure_notifier::FailureNotifier;
use super::source_adapter::AdapterError;
use crate::infrastructure::{DispatchError, Dispatcher, NotifierConfig, WebhookTransport};

/// ハンドラーのエラー型
///
/// 表示は各段階のエラーをそのまま使う。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// 呼び出し元（Lambdaランタイム）に返すレスポンス
///
/// 受信側のステータスとボディをそのまま返す。2xx以外でもエラーにはしない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: String,
}

/// 通知ハンドラー
pub struct NotificationHandler<T>
where
    T: WebhookTransport,
{
    config: NotifierConfig,
    dispatcher: Dispatcher<T>,
}

impl<T> NotificationHandler<T>
where
    T: WebhookTransport,
{
    pub fn new(config: NotifierConfig, dispatcher: Dispatcher<T>) -> Self {
        Self { config, dispatcher }
    }

    /// イベントを処理する
    ///
    /// # 処理フロー
    /// 1. 設定値からアダプターを選択
    /// 2. 生のペイロードを通知に変換
    /// 3. 送信して受信側のレスポンスを返す
    ///
    /// どの段階で失敗しても障害通知を1回だけ試み、元のエラーを返す。
    pub async fn handle(&self, raw: &[u8]) -> Result<InvocationResponse, HandlerError> {
        let mut event = None;
        match self.process(raw, &mut event).await {
            Ok(response) => Ok(response),
            Err(err) => {
                error!(error = %err, "通知処理に失敗");
                FailureNotifier::new(&self.dispatcher, self.config.error_webhook_url())
                    .notify(raw, event.as_ref(), &err)
                    .await;
                Err(err)
            }
        }
    }

    async fn process(
        &self,
        raw: &[u8],
        event: &mut Option<EventMap>,
    ) -> Result<InvocationResponse, HandlerError> {
        let adapter =
            AdapterSelector::select(self.config.adapter_type(), self.config.webhook_url())?;

        let transformation = adapter.transform(raw);
        *event = transformation.event;
        let notification = transformation.result?;

        debug!(
            adapter = adapter.name(),
            event_keys = event.as_ref().map_or(0, |e| e.len()),
            attachments = notification.attachments.len(),
            "イベント変換完了"
        );

        let response = self.dispatcher.send(&notification).await?;

        info!(
            adapter = adapter.name(),
            status = response.status,
            "通知処理完了"
        );

        Ok(InvocationResponse {
            status_code: response.status,
            body: response.body,
        })
    }
}
