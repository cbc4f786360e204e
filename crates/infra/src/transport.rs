//! # メール送信手段
//!
//! 配信エンジンが 1 回の送信試行で呼び出す送信手段を抽象化する。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: [`MailTransport`] で送信方法を隠蔽する
//! - **環境変数切替**: `NOTIFICATION_BACKEND` で SMTP / SES / Noop を選択
//! - **失敗は値で返す**: 送信失敗は [`TransportError`] として返し、
//!   リトライ判断は呼び出し側（配信エンジン）に任せる

mod noop;
mod ses;
mod smtp;

use async_trait::async_trait;
use courier_domain::dispatch::{MailMessage, TransportError};
pub use noop::NoopMailTransport;
pub use ses::{SesMailTransport, create_client as create_ses_client};
pub use smtp::SmtpMailTransport;

/// メール送信トレイト
///
/// 1 回の呼び出しが 1 回の送信試行に相当する。実装はリトライしないこと。
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// メッセージを送信する
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError>;
}
