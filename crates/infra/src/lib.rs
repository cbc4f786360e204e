//! # Courier インフラ層
//!
//! 外部システム（PostgreSQL、SMTP、SES）との接続・通信を担当する。
//!
//! ## 責務
//!
//! - **配信記録ストア**: [`repository::DispatchAttemptRepository`] と
//!   その PostgreSQL / インメモリ実装
//! - **送信手段**: [`transport::MailTransport`] と SMTP / SES / Noop 実装
//! - **データベース接続**: PostgreSQL への接続プール管理とマイグレーション
//!
//! ## 依存関係
//!
//! ```text
//! dispatch-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層に依存しない（依存性逆転の原則）。
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use courier_infra::{db, repository::PostgresDispatchAttemptRepository};
//!
//! async fn setup() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::connect("postgres://localhost/courier").await?;
//!     let repository = PostgresDispatchAttemptRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod repository;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use error::{InfraError, InfraErrorKind};
