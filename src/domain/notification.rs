/// 正規化済み通知モデル
///
/// 入力形式に依存しない通知レコード。SourceAdapterが1回の呼び出しにつき
/// 1つだけ構築し、Dispatcherに渡した後は変更しない。
use thiserror::Error;

/// 送信直前の不変条件チェックで検出されるエラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// 送信先が空
    #[error("notification target must be provided")]
    MissingTarget,
    /// 本文もアタッチメントも無い
    #[error("notification must include a body or at least one attachment")]
    MissingBodyOrAttachments,
}

/// 正規化済み通知
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalNotification {
    /// 送信先（Webhook URL）
    pub target: String,
    /// 本文
    pub body: Option<String>,
    /// リッチコンテンツブロック（順序を保持）
    pub attachments: Vec<Attachment>,
    /// メンション制御。`None`は受信側デフォルト、空のポリシーは全抑止を意味する
    pub mention_policy: Option<MentionPolicy>,
    /// 表示名の上書き
    pub sender_name: Option<String>,
    /// アイコンURLの上書き
    pub sender_icon_url: Option<String>,
}

impl CanonicalNotification {
    /// 送信先と本文から通知を作成
    pub fn new(target: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    /// 不変条件を検証する
    ///
    /// 構築時ではなく送信直前に呼び出す。アダプターはエラーを返す途中で
    /// 部分的なレコードを組み立てることがあるため。
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.target.trim().is_empty() {
            return Err(ValidationError::MissingTarget);
        }
        if self.body().is_none() && self.attachments.is_empty() {
            return Err(ValidationError::MissingBodyOrAttachments);
        }
        Ok(())
    }

    /// 空白でない本文を取得
    pub fn body(&self) -> Option<&str> {
        non_blank(self.body.as_deref())
    }

    /// 空白でない表示名を取得
    pub fn sender_name(&self) -> Option<&str> {
        non_blank(self.sender_name.as_deref())
    }

    /// 空白でないアイコンURLを取得
    pub fn sender_icon_url(&self) -> Option<&str> {
        non_blank(self.sender_icon_url.as_deref())
    }
}

/// リッチコンテンツブロック
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachment {
    pub title: Option<String>,
    pub description: Option<String>,
    /// 色コード（0xRRGGBB）
    pub accent_color: Option<u32>,
    pub fields: Vec<AttachmentField>,
    pub footer_text: Option<String>,
    /// ISO 8601文字列。検証せずそのまま送る
    pub timestamp: Option<String>,
}

/// アタッチメント内の名前付きフィールド
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl AttachmentField {
    pub fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }
}

/// メンション通知の許可リスト
///
/// 全コレクションが空でフラグがfalseのポリシーも「存在する」ことに意味がある。
/// 受信側には全メンション抑止として送られる。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionPolicy {
    pub allowed_parse_scopes: Vec<String>,
    pub allowed_user_ids: Vec<String>,
    pub allowed_role_ids: Vec<String>,
    pub allow_replied_user: bool,
}

impl MentionPolicy {
    /// 全メンションを抑止するポリシー
    pub fn suppress_all() -> Self {
        Self::default()
    }

    /// 何も許可していないかどうか
    pub fn is_empty(&self) -> bool {
        self.allowed_parse_scopes.is_empty()
            && self.allowed_user_ids.is_empty()
            && self.allowed_role_ids.is_empty()
            && !self.allow_replied_user
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
