/// 障害通知
///
/// 正規化・変換・送信のいずれかが失敗したときに、障害通知先へ診断メッセージを
/// ベストエフォートで送る。自身の失敗は呼び出し元に伝播させない。
use serde_json::Value;
use tracing::{debug, info, warn};

use super::event_normalizer::EventMap;
use crate::domain::{Attachment, CanonicalNotification, MentionPolicy};
use crate::infrastructure::{Dispatcher, WebhookTransport};

/// 診断メッセージ本文の接頭辞
pub const FAILURE_PREFIX: &str = "Failed to process request: ";

/// 受信側の本文の最大文字数
const MAX_CONTENT_CHARS: usize = 2000;

/// 受信側のembed説明文の最大文字数
const MAX_DESCRIPTION_CHARS: usize = 4096;

/// 障害通知器
pub struct FailureNotifier<'a, T>
where
    T: WebhookTransport,
{
    dispatcher: &'a Dispatcher<T>,
    /// 障害通知先（空なら何もしない）
    target: &'a str,
}

impl<'a, T> FailureNotifier<'a, T>
where
    T: WebhookTransport,
{
    pub fn new(dispatcher: &'a Dispatcher<T>, target: &'a str) -> Self {
        Self { dispatcher, target }
    }

    /// 診断メッセージを送信する
    ///
    /// 送信結果とエラーは記録するだけで破棄する。元のエラーを隠したり
    /// 置き換えたりしないため。
    ///
    /// # 引数
    /// * `raw` - 受信した生のペイロード
    /// * `event` - 取得できていれば正規化マップ（優先して表示）
    /// * `cause` - 元のエラー
    pub async fn notify(
        &self,
        raw: &[u8],
        event: Option<&EventMap>,
        cause: &(dyn std::error::Error + Send + Sync),
    ) {
        let target = self.target.trim();
        if target.is_empty() {
            debug!("障害通知先が未設定のためスキップ");
            return;
        }

        let diagnostic = build_diagnostic(target, raw, event, cause);

        match self.dispatcher.send(&diagnostic).await {
            Ok(response) if (200..300).contains(&response.status) => {
                info!(status = response.status, "障害通知を送信");
            }
            Ok(response) => {
                warn!(
                    status = response.status,
                    body = %response.body,
                    "障害通知が受け付けられなかった"
                );
            }
            Err(err) => {
                warn!(error = %err, "障害通知の送信に失敗");
            }
        }
    }
}

/// 診断用の通知を組み立てる
pub fn build_diagnostic(
    target: &str,
    raw: &[u8],
    event: Option<&EventMap>,
    cause: &(impl std::fmt::Display + ?Sized),
) -> CanonicalNotification {
    let body = truncate_chars(&format!("{FAILURE_PREFIX}{cause}"), MAX_CONTENT_CHARS);

    let mut notification = CanonicalNotification::new(target, body);
    notification.mention_policy = Some(MentionPolicy::suppress_all());
    notification.attachments.push(Attachment {
        title: Some("Request".to_string()),
        description: Some(render_request(raw, event)),
        ..Attachment::default()
    });
    notification
}

/// リクエスト内容をコードブロックとして整形する
///
/// 正規化マップがあればそれを、なければ生のペイロードを使う。
/// JSONはインデントして`json`タグ付き、それ以外はそのまま囲む。
fn render_request(raw: &[u8], event: Option<&EventMap>) -> String {
    if let Some(pretty) = event.and_then(|e| serde_json::to_string_pretty(e).ok()) {
        return code_block("json", &pretty);
    }

    // 空白の除去はJSON判定にだけ使い、非JSONは原文のまま囲む
    let pretty = serde_json::from_slice::<Value>(raw.trim_ascii())
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok());
    match pretty {
        Some(pretty) => code_block("json", &pretty),
        None => code_block("", &String::from_utf8_lossy(raw)),
    }
}

fn code_block(lang: &str, content: &str) -> String {
    // フェンスが途中で閉じないようにする
    let content = content.replace("```", "``\u{200b}`");
    let overhead = lang.chars().count() + "```\n\n```".len();
    let content = truncate_chars(&content, MAX_DESCRIPTION_CHARS - overhead);
    format!("```{lang}\n{content}\n```")
}

/// 文字境界で切り詰め、末尾に省略記号を付ける
fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}
