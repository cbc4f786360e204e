//! # テスト用モック
//!
//! ユースケーステストで使用する送信手段とストアのモック。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! courier-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use courier_domain::dispatch::{
    DispatchAttempt,
    DispatchAttemptId,
    DispatchStatus,
    MailMessage,
    TransportError,
};

use crate::{
    error::InfraError,
    repository::{DispatchAttemptRepository, InMemoryDispatchAttemptRepository},
    transport::MailTransport,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ===== ScriptedMailTransport =====

/// 結果を台本どおりに返す送信手段
///
/// `push_*` で積んだ結果を先頭から順に返し、台本が尽きたら
/// 既定の結果（[`succeeding`](Self::succeeding) なら成功、
/// [`always_failing`](Self::always_failing) なら失敗）を返す。
/// 送信されたメッセージはすべて記録する。
#[derive(Clone)]
pub struct ScriptedMailTransport {
    script:   Arc<Mutex<VecDeque<Result<(), TransportError>>>>,
    fallback: Result<(), TransportError>,
    sent:     Arc<Mutex<Vec<MailMessage>>>,
}

impl ScriptedMailTransport {
    /// 台本が尽きた後は成功する
    pub fn succeeding() -> Self {
        Self::with_fallback(Ok(()))
    }

    /// 台本が尽きた後は `reason` で失敗する
    pub fn always_failing(reason: impl Into<String>) -> Self {
        Self::with_fallback(Err(TransportError::SendFailed(reason.into())))
    }

    fn with_fallback(fallback: Result<(), TransportError>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 次の試行を `reason` で失敗させる
    pub fn push_failure(self, reason: impl Into<String>) -> Self {
        lock(&self.script).push_back(Err(TransportError::SendFailed(reason.into())));
        self
    }

    /// 送信を試みたメッセージ（失敗した試行も含む）
    pub fn sent_messages(&self) -> Vec<MailMessage> {
        lock(&self.sent).clone()
    }

    /// 送信を試みた回数
    pub fn call_count(&self) -> usize {
        lock(&self.sent).len()
    }
}

#[async_trait]
impl MailTransport for ScriptedMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError> {
        lock(&self.sent).push(message.clone());
        let next = lock(&self.script).pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

// ===== FailingDispatchAttemptRepository =====

/// どの操作を失敗させるか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    /// すべての操作
    Everything,
    /// `update` のみ（作成は成功し、試行結果の保存で失敗する）
    Updates,
}

/// 利用できないストアを模したリポジトリ
///
/// 失敗対象外の操作はインメモリストアに委譲する。
#[derive(Debug)]
pub struct FailingDispatchAttemptRepository {
    inner:   InMemoryDispatchAttemptRepository,
    fail_on: FailOn,
}

impl FailingDispatchAttemptRepository {
    pub fn new(fail_on: FailOn) -> Self {
        Self {
            inner: InMemoryDispatchAttemptRepository::new(),
            fail_on,
        }
    }

    fn unavailable() -> InfraError {
        InfraError::unavailable("connection refused")
    }

    fn check(&self, is_update: bool) -> Result<(), InfraError> {
        match self.fail_on {
            FailOn::Everything => Err(Self::unavailable()),
            FailOn::Updates if is_update => Err(Self::unavailable()),
            FailOn::Updates => Ok(()),
        }
    }
}

#[async_trait]
impl DispatchAttemptRepository for FailingDispatchAttemptRepository {
    async fn insert(&self, attempt: &DispatchAttempt) -> Result<(), InfraError> {
        self.check(false)?;
        self.inner.insert(attempt).await
    }

    async fn find_by_id(
        &self,
        id: &DispatchAttemptId,
    ) -> Result<Option<DispatchAttempt>, InfraError> {
        self.check(false)?;
        self.inner.find_by_id(id).await
    }

    async fn update(&self, attempt: &DispatchAttempt) -> Result<(), InfraError> {
        self.check(true)?;
        self.inner.update(attempt).await
    }

    async fn find_all(&self) -> Result<Vec<DispatchAttempt>, InfraError> {
        self.check(false)?;
        self.inner.find_all().await
    }

    async fn find_by_status(
        &self,
        status: DispatchStatus,
    ) -> Result<Vec<DispatchAttempt>, InfraError> {
        self.check(false)?;
        self.inner.find_by_status(status).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::InfraErrorKind;

    fn message() -> MailMessage {
        MailMessage::new("a@x.com", "Hi", "Body").unwrap()
    }

    #[tokio::test]
    async fn test_台本の順に結果を返し尽きたら既定に戻る() {
        let transport = ScriptedMailTransport::succeeding().push_failure("timeout");

        let first = transport.send(&message()).await;
        let second = transport.send(&message()).await;

        assert_eq!(first, Err(TransportError::SendFailed("timeout".to_string())));
        assert_eq!(second, Ok(()));
        assert_eq!(transport.sent_messages(), vec![message(), message()]);
    }

    #[tokio::test]
    async fn test_always_failingは常に失敗する() {
        let transport = ScriptedMailTransport::always_failing("SMTP down");

        let result = transport.send(&message()).await;

        assert_eq!(result, Err(TransportError::SendFailed("SMTP down".to_string())));
    }

    #[tokio::test]
    async fn test_updatesのみ失敗させられる() {
        let repo = FailingDispatchAttemptRepository::new(FailOn::Updates);
        let attempt = DispatchAttempt::new(courier_domain::dispatch::NewDispatchAttempt {
            id:      DispatchAttemptId::new(),
            message: message(),
            now:     chrono::Utc::now(),
        });

        repo.insert(&attempt).await.unwrap();
        let err = repo.update(&attempt).await.unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::Unavailable(_)));
    }
}
