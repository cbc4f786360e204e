//! # DispatchAttemptRepository
//!
//! 配信記録の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **記録単位の原子性**: 1 件の記録の読み書きは原子的。記録をまたぐ
//!   トランザクションは持たない
//! - **一覧の順序**: 作成日時の降順（同時刻は ID の降順）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_domain::dispatch::{
    DispatchAttempt,
    DispatchAttemptId,
    DispatchAttemptRecord,
    DispatchStatus,
    MailMessage,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// 配信記録リポジトリトレイト
#[async_trait]
pub trait DispatchAttemptRepository: Send + Sync {
    /// 新しい配信記録を保存する
    ///
    /// 同じ ID の記録が既にある場合は `Conflict` を返す。
    async fn insert(&self, attempt: &DispatchAttempt) -> Result<(), InfraError>;

    /// ID で配信記録を検索する
    async fn find_by_id(
        &self,
        id: &DispatchAttemptId,
    ) -> Result<Option<DispatchAttempt>, InfraError>;

    /// 既存の配信記録を上書きする
    ///
    /// 対象が存在しない場合はエラーを返す。
    async fn update(&self, attempt: &DispatchAttempt) -> Result<(), InfraError>;

    /// 全件を作成日時の降順で取得する
    async fn find_all(&self) -> Result<Vec<DispatchAttempt>, InfraError>;

    /// 指定ステータスの記録を作成日時の降順で取得する
    async fn find_by_status(
        &self,
        status: DispatchStatus,
    ) -> Result<Vec<DispatchAttempt>, InfraError>;
}

/// DB の dispatch_attempts テーブルの行を表す中間構造体
///
/// `TryFrom` で `DispatchAttempt` への変換ロジックを一箇所に集約する。
#[derive(sqlx::FromRow)]
struct DispatchAttemptRow {
    id:            Uuid,
    recipient:     String,
    subject:       String,
    body:          String,
    status:        String,
    error:         Option<String>,
    attempt_count: i32,
    created_at:    DateTime<Utc>,
    updated_at:    DateTime<Utc>,
    finalized_at:  Option<DateTime<Utc>>,
}

impl TryFrom<DispatchAttemptRow> for DispatchAttempt {
    type Error = InfraError;

    fn try_from(row: DispatchAttemptRow) -> Result<Self, Self::Error> {
        Ok(DispatchAttempt::from_db(DispatchAttemptRecord {
            id:            DispatchAttemptId::from_uuid(row.id),
            message:       MailMessage::new(row.recipient, row.subject, row.body)?,
            status:        row
                .status
                .parse::<DispatchStatus>()
                .map_err(|e| InfraError::unexpected(format!("{}: {e}", row.status)))?,
            error:         row.error,
            attempt_count: u32::try_from(row.attempt_count)
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            created_at:    row.created_at,
            updated_at:    row.updated_at,
            finalized_at:  row.finalized_at,
        })?)
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        id,
        recipient,
        subject,
        body,
        status,
        error,
        attempt_count,
        created_at,
        updated_at,
        finalized_at
    FROM dispatch_attempts
"#;

/// PostgreSQL 実装の DispatchAttemptRepository
#[derive(Debug, Clone)]
pub struct PostgresDispatchAttemptRepository {
    pool: PgPool,
}

impl PostgresDispatchAttemptRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn attempt_count_column(attempt: &DispatchAttempt) -> Result<i32, InfraError> {
    i32::try_from(attempt.attempt_count()).map_err(|e| InfraError::unexpected(e.to_string()))
}

#[async_trait]
impl DispatchAttemptRepository for PostgresDispatchAttemptRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(dispatch_id = %attempt.id()))]
    async fn insert(&self, attempt: &DispatchAttempt) -> Result<(), InfraError> {
        let result = sqlx::query(
            r#"
            INSERT INTO dispatch_attempts (
                id, recipient, subject, body, status, error,
                attempt_count, created_at, updated_at, finalized_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(attempt.id().as_uuid())
        .bind(attempt.recipient())
        .bind(attempt.subject())
        .bind(attempt.body())
        .bind(attempt.status().as_str())
        .bind(attempt.error())
        .bind(attempt_count_column(attempt)?)
        .bind(attempt.created_at())
        .bind(attempt.updated_at())
        .bind(attempt.finalized_at())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict(
                "DispatchAttempt",
                attempt.id().to_string(),
            ));
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(dispatch_id = %id))]
    async fn find_by_id(
        &self,
        id: &DispatchAttemptId,
    ) -> Result<Option<DispatchAttempt>, InfraError> {
        let row = sqlx::query_as::<_, DispatchAttemptRow>(&format!(
            "{SELECT_COLUMNS} WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(DispatchAttempt::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(dispatch_id = %attempt.id(), status = %attempt.status()))]
    async fn update(&self, attempt: &DispatchAttempt) -> Result<(), InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE dispatch_attempts
            SET status = $2,
                error = $3,
                attempt_count = $4,
                updated_at = $5,
                finalized_at = $6
            WHERE id = $1
            "#,
        )
        .bind(attempt.id().as_uuid())
        .bind(attempt.status().as_str())
        .bind(attempt.error())
        .bind(attempt_count_column(attempt)?)
        .bind(attempt.updated_at())
        .bind(attempt.finalized_at())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::unexpected(format!(
                "更新対象の配信記録が存在しません: {}",
                attempt.id()
            )));
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_all(&self) -> Result<Vec<DispatchAttempt>, InfraError> {
        let rows = sqlx::query_as::<_, DispatchAttemptRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DispatchAttempt::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(status = %status))]
    async fn find_by_status(
        &self,
        status: DispatchStatus,
    ) -> Result<Vec<DispatchAttempt>, InfraError> {
        let rows = sqlx::query_as::<_, DispatchAttemptRow>(&format!(
            "{SELECT_COLUMNS} WHERE status = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DispatchAttempt::try_from).collect()
    }
}
