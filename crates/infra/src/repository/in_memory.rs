//! # インメモリ配信記録ストア
//!
//! `DATABASE_URL` 未設定時のローカル実行と、テストで使用するストア。
//! プロセス終了とともに内容は失われる。

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use courier_domain::dispatch::{DispatchAttempt, DispatchAttemptId, DispatchStatus};

use super::DispatchAttemptRepository;
use crate::error::InfraError;

/// インメモリ実装の DispatchAttemptRepository
///
/// 挿入順に保持し、一覧時に作成日時の降順へ並べ替える。
/// 作成日時が同じ記録は後から挿入したものを先に返す。
#[derive(Debug, Default)]
pub struct InMemoryDispatchAttemptRepository {
    attempts: Mutex<Vec<DispatchAttempt>>,
}

impl InMemoryDispatchAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DispatchAttempt>> {
        // 保持しているのは完成済みの値だけなので、ポイズン後もそのまま使える
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn newest_first<'a>(
        attempts: impl DoubleEndedIterator<Item = &'a DispatchAttempt>,
    ) -> Vec<DispatchAttempt> {
        let mut sorted: Vec<DispatchAttempt> = attempts.rev().cloned().collect();
        sorted.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        sorted
    }
}

#[async_trait]
impl DispatchAttemptRepository for InMemoryDispatchAttemptRepository {
    async fn insert(&self, attempt: &DispatchAttempt) -> Result<(), InfraError> {
        let mut attempts = self.lock();
        if attempts.iter().any(|a| a.id() == attempt.id()) {
            return Err(InfraError::conflict(
                "DispatchAttempt",
                attempt.id().to_string(),
            ));
        }
        attempts.push(attempt.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &DispatchAttemptId,
    ) -> Result<Option<DispatchAttempt>, InfraError> {
        Ok(self.lock().iter().find(|a| a.id() == id).cloned())
    }

    async fn update(&self, attempt: &DispatchAttempt) -> Result<(), InfraError> {
        let mut attempts = self.lock();
        let Some(slot) = attempts.iter_mut().find(|a| a.id() == attempt.id()) else {
            return Err(InfraError::unexpected(format!(
                "更新対象の配信記録が存在しません: {}",
                attempt.id()
            )));
        };
        *slot = attempt.clone();
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<DispatchAttempt>, InfraError> {
        Ok(Self::newest_first(self.lock().iter()))
    }

    async fn find_by_status(
        &self,
        status: DispatchStatus,
    ) -> Result<Vec<DispatchAttempt>, InfraError> {
        let attempts = self.lock();
        let matching: Vec<&DispatchAttempt> =
            attempts.iter().filter(|a| a.status() == status).collect();
        Ok(Self::newest_first(matching.into_iter()))
    }
}
