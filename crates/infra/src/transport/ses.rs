//! SES 送信実装
//!
//! AWS SES v2 API を使用してメールを送信する。本番環境で使用する。

use async_trait::async_trait;
use aws_sdk_sesv2::{
    Client,
    types::{Body, Content, Destination, EmailContent, Message},
};
use courier_domain::dispatch::{MailMessage, TransportError};

use super::MailTransport;

/// SES 送信
///
/// `aws_sdk_sesv2::Client` をラップする。
pub struct SesMailTransport {
    client:       Client,
    from_address: String,
}

impl SesMailTransport {
    /// 新しい SES 送信インスタンスを作成
    ///
    /// `from_address` は SES で検証済みであること。
    pub fn new(client: Client, from_address: String) -> Self {
        Self {
            client,
            from_address,
        }
    }
}

/// SES クライアントを作成する
///
/// 認証情報とリージョンは SDK のデフォルトチェーンで解決する
/// （環境変数 `AWS_REGION` / `AWS_ACCESS_KEY_ID`、本番では IAM ロール）。
pub async fn create_client() -> Client {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;
    Client::new(&config)
}

fn content(data: &str, part: &str) -> Result<Content, TransportError> {
    Content::builder()
        .data(data)
        .build()
        .map_err(|e| TransportError::InvalidMessage(format!("{part}構築失敗: {e}")))
}

#[async_trait]
impl MailTransport for SesMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError> {
        let destination = Destination::builder()
            .to_addresses(message.recipient())
            .build();

        let email = EmailContent::builder()
            .simple(
                Message::builder()
                    .subject(content(message.subject(), "件名")?)
                    .body(
                        Body::builder()
                            .text(content(message.body(), "本文")?)
                            .build(),
                    )
                    .build(),
            )
            .build();

        self.client
            .send_email()
            .from_email_address(&self.from_address)
            .destination(destination)
            .content(email)
            .send()
            .await
            .map_err(|e| TransportError::SendFailed(format!("SES 送信失敗: {e}")))?;

        Ok(())
    }
}
