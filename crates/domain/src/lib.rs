//! # Courier ドメイン層
//!
//! メール配信記録のドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **エンティティ**: 一意の識別子と状態遷移を持つ [`dispatch::DispatchAttempt`]
//! - **値オブジェクト**: 検証済みの [`dispatch::MailMessage`]、[`dispatch::DispatchStatus`]
//! - **ポリシー**: リトライ判定とバックオフ計算を行う [`dispatch::RetryPolicy`]
//! - **ドメインエラー**: 不変条件違反を表現する [`DomainError`]
//!
//! ## 依存関係の方向
//!
//! ```text
//! dispatch-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（DB、SMTP）には一切依存しない。
//!
//! ## 使用例
//!
//! ```rust
//! use courier_domain::dispatch::{
//!     DispatchAttempt, DispatchAttemptId, DispatchStatus, MailMessage, NewDispatchAttempt,
//! };
//!
//! let message = MailMessage::new("a@x.com", "Hi", "Body").unwrap();
//! let attempt = DispatchAttempt::new(NewDispatchAttempt {
//!     id: DispatchAttemptId::new(),
//!     message,
//!     now: chrono::Utc::now(),
//! });
//! assert_eq!(attempt.status(), DispatchStatus::Pending);
//! ```

pub mod clock;
pub mod dispatch;
pub mod error;

pub use error::DomainError;
