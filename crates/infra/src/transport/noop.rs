//! Noop 送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! ローカル実行や送信無効化時に使用する。

use async_trait::async_trait;
use courier_domain::dispatch::{MailMessage, TransportError};

use super::MailTransport;

/// Noop 送信（ログ出力のみ、常に成功）
#[derive(Debug, Clone, Default)]
pub struct NoopMailTransport;

#[async_trait]
impl MailTransport for NoopMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError> {
        tracing::info!(
            recipient = %message.recipient(),
            subject = %message.subject(),
            "Noop: メール送信をスキップ"
        );
        Ok(())
    }
}
