//! # メールメッセージ
//!
//! 配信対象のメッセージ（宛先・件名・本文）と、送信手段が返す失敗を定義する。

use thiserror::Error;

use crate::DomainError;

/// 送信失敗
///
/// 送信手段（SMTP、SES など）が配信を拒否・失敗したことを表す。
/// `Display` は失敗理由そのものを返し、配信記録の `error` にそのまま格納される。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// 送信に失敗（接続エラー、タイムアウト、受信拒否など）
    #[error("{0}")]
    SendFailed(String),

    /// 送信手段がメッセージを組み立てられなかった（アドレス形式不正など）
    #[error("{0}")]
    InvalidMessage(String),
}

/// 宛先の最大文字数（RFC 5321 のパス長上限、`dispatch_attempts.recipient` の列幅）
pub const MAX_RECIPIENT_LENGTH: usize = 320;

/// メールメッセージ
///
/// 宛先・件名・本文はいずれも必須。宛先は `local@domain` 形式で、
/// 空白を含まず [`MAX_RECIPIENT_LENGTH`] 文字以内であること。作成後は不変。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    recipient: String,
    subject:   String,
    body:      String,
}

impl MailMessage {
    /// 検証付きでメッセージを作成する
    ///
    /// 宛先の前後の空白は取り除く。件名と本文は内容を変えずに保持する。
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let recipient = recipient.into().trim().to_string();
        let subject = subject.into();
        let body = body.into();

        validate_recipient(&recipient)?;
        if subject.trim().is_empty() {
            return Err(DomainError::Validation("件名は必須です".to_string()));
        }
        if body.trim().is_empty() {
            return Err(DomainError::Validation("本文は必須です".to_string()));
        }

        Ok(Self {
            recipient,
            subject,
            body,
        })
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

fn validate_recipient(recipient: &str) -> Result<(), DomainError> {
    if recipient.is_empty() {
        return Err(DomainError::Validation("宛先は必須です".to_string()));
    }

    if recipient.chars().count() > MAX_RECIPIENT_LENGTH {
        return Err(DomainError::Validation(format!(
            "宛先は {MAX_RECIPIENT_LENGTH} 文字以内で入力してください"
        )));
    }

    let invalid = || DomainError::Validation(format!("宛先の形式が不正です: {recipient}"));

    if recipient.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let Some((local, domain)) = recipient.split_once('@') else {
        return Err(invalid());
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    Ok(())
}
