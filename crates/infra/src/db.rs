//! # PostgreSQL 接続
//!
//! 配信記録ストア用の接続プールを作り、`dispatch_attempts` のスキーマを適用する。
//! 接続の取得待ちが [`ACQUIRE_TIMEOUT`] を超えると `InfraErrorKind::Unavailable` になり、
//! 呼び出し元には 503 として返る。

use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::error::InfraError;

/// プールの最大接続数
///
/// 1 件の配信は書き込みごとに接続を借りて返すため、バックオフ中の記録は接続を占有しない。
pub const MAX_CONNECTIONS: u32 = 10;

/// 接続取得のタイムアウト
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// 接続プールを作成し、未適用のマイグレーションを適用する
///
/// サーバー起動時に一度だけ呼び出す。
pub async fn connect(database_url: &str) -> Result<PgPool, InfraError> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|e| InfraError::unexpected(format!("マイグレーションに失敗しました: {e}")))?;

    tracing::info!(
        max_connections = MAX_CONNECTIONS,
        "配信記録ストアに接続しました"
    );
    Ok(pool)
}
