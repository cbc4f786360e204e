//! # 配信試行記録
//!
//! 1 件の送信要求と、そのリトライ履歴を表すエンティティ。
//! 状態遷移は消費型メソッド（`self` を受け取り新しい `Self` を返す）で表現し、
//! 許可されない遷移は [`DomainError::Validation`] になる。

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{DispatchStatus, MailMessage};
use crate::DomainError;

/// 配信試行 ID
///
/// dispatch_attempts テーブルの主キー。作成時に UUID v7 で一度だけ採番する。
/// 再送は新しい ID を持つ別の記録になる。
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{_0}")]
pub struct DispatchAttemptId(Uuid);

impl DispatchAttemptId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// DB やパスパラメータの UUID から復元する
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DispatchAttemptId {
    fn default() -> Self {
        Self::new()
    }
}

/// 配信試行エンティティ
///
/// ## 不変条件
///
/// - `id`・メッセージ・`created_at` は作成後に変更されない
/// - `error` は `FAILED` の間だけ存在し、`SUCCESS` になると消える
/// - `finalized_at` が設定された記録（`SUCCESS`、または最終試行後の `FAILED`）は
///   以後どの遷移も受け付けない
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchAttempt {
    id:            DispatchAttemptId,
    message:       MailMessage,
    status:        DispatchStatus,
    error:         Option<String>,
    attempt_count: u32,
    created_at:    DateTime<Utc>,
    updated_at:    DateTime<Utc>,
    finalized_at:  Option<DateTime<Utc>>,
}

/// 配信試行の新規作成パラメータ
pub struct NewDispatchAttempt {
    pub id:      DispatchAttemptId,
    pub message: MailMessage,
    pub now:     DateTime<Utc>,
}

/// 配信試行の DB 復元パラメータ
pub struct DispatchAttemptRecord {
    pub id:            DispatchAttemptId,
    pub message:       MailMessage,
    pub status:        DispatchStatus,
    pub error:         Option<String>,
    pub attempt_count: u32,
    pub created_at:    DateTime<Utc>,
    pub updated_at:    DateTime<Utc>,
    pub finalized_at:  Option<DateTime<Utc>>,
}

impl DispatchAttempt {
    /// 新しい配信試行を `PENDING` で作成する
    pub fn new(params: NewDispatchAttempt) -> Self {
        Self {
            id:            params.id,
            message:       params.message,
            status:        DispatchStatus::Pending,
            error:         None,
            attempt_count: 0,
            created_at:    params.now,
            updated_at:    params.now,
            finalized_at:  None,
        }
    }

    /// 既存のデータから復元する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 不変条件違反（例: `SUCCESS` なのに `error` がある）
    pub fn from_db(record: DispatchAttemptRecord) -> Result<Self, DomainError> {
        if record.error.is_some() && record.status != DispatchStatus::Failed {
            return Err(DomainError::Validation(format!(
                "{} の配信記録は error を持てません",
                record.status
            )));
        }
        if record.status == DispatchStatus::Success && record.finalized_at.is_none() {
            return Err(DomainError::Validation(
                "SUCCESS の配信記録には finalized_at が必要です".to_string(),
            ));
        }
        if matches!(
            record.status,
            DispatchStatus::Pending | DispatchStatus::Retrying
        ) && record.finalized_at.is_some()
        {
            return Err(DomainError::Validation(format!(
                "{} の配信記録は finalized_at を持てません",
                record.status
            )));
        }

        Ok(Self {
            id:            record.id,
            message:       record.message,
            status:        record.status,
            error:         record.error,
            attempt_count: record.attempt_count,
            created_at:    record.created_at,
            updated_at:    record.updated_at,
            finalized_at:  record.finalized_at,
        })
    }

    // Getter メソッド

    pub fn id(&self) -> &DispatchAttemptId {
        &self.id
    }

    pub fn message(&self) -> &MailMessage {
        &self.message
    }

    pub fn recipient(&self) -> &str {
        self.message.recipient()
    }

    pub fn subject(&self) -> &str {
        self.message.subject()
    }

    pub fn body(&self) -> &str {
        self.message.body()
    }

    pub fn status(&self) -> DispatchStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn finalized_at(&self) -> Option<DateTime<Utc>> {
        self.finalized_at
    }

    /// 送信に成功済みか
    pub fn is_successful(&self) -> bool {
        self.status == DispatchStatus::Success
    }

    /// 終端状態か（以後の自動遷移がない）
    pub fn is_finalized(&self) -> bool {
        self.finalized_at.is_some()
    }

    // 状態遷移メソッド

    /// 送信試行を開始する（`PENDING` / 未確定の `FAILED` → `RETRYING`）
    ///
    /// 試行回数を 1 増やす。
    pub fn begin_attempt(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let startable = match self.status {
            DispatchStatus::Pending => true,
            DispatchStatus::Failed => !self.is_finalized(),
            DispatchStatus::Retrying | DispatchStatus::Success => false,
        };
        if !startable {
            return Err(self.invalid_transition(DispatchStatus::Retrying));
        }

        Ok(Self {
            status: DispatchStatus::Retrying,
            attempt_count: self.attempt_count + 1,
            updated_at: now,
            ..self
        })
    }

    /// 送信成功を記録する（`RETRYING` → `SUCCESS`）
    ///
    /// 直前の試行で残った `error` は消え、記録は確定する。
    pub fn succeeded(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.status != DispatchStatus::Retrying {
            return Err(self.invalid_transition(DispatchStatus::Success));
        }

        Ok(Self {
            status: DispatchStatus::Success,
            error: None,
            updated_at: now,
            finalized_at: Some(now),
            ..self
        })
    }

    /// 送信失敗を記録する（`RETRYING` → `FAILED`）
    ///
    /// `is_final` が真の場合（最終試行の失敗）は記録を確定する。
    pub fn failed(
        self,
        reason: impl Into<String>,
        is_final: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if self.status != DispatchStatus::Retrying {
            return Err(self.invalid_transition(DispatchStatus::Failed));
        }

        Ok(Self {
            status: DispatchStatus::Failed,
            error: Some(reason.into()),
            updated_at: now,
            finalized_at: is_final.then_some(now),
            ..self
        })
    }

    fn invalid_transition(&self, to: DispatchStatus) -> DomainError {
        DomainError::Validation(format!(
            "配信記録 {} は {}{} から {} に遷移できません",
            self.id,
            self.status,
            if self.is_finalized() { "（確定済み）" } else { "" },
            to
        ))
    }
}
