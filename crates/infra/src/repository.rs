//! # リポジトリ実装
//!
//! 配信記録ストアのトレイトと、その具体的な実装を提供する。
//!
//! ## 設計方針
//!
//! - **データベース抽象化**: sqlx を使用し、PostgreSQL 固有の処理をカプセル化
//! - **テスタビリティ**: トレイト経由で差し替え可能。`DATABASE_URL` 未設定時や
//!   テストではインメモリ実装を使う

pub mod dispatch_attempt_repository;
pub mod in_memory;

pub use dispatch_attempt_repository::{
    DispatchAttemptRepository,
    PostgresDispatchAttemptRepository,
};
pub use in_memory::InMemoryDispatchAttemptRepository;
