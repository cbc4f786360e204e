//! 配信テストビルダー
//!
//! ユースケースを標準的なモックで組み立て、テストコードの重複を削減する。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use courier_domain::{
    clock::SteppingClock,
    dispatch::{DEFAULT_MAX_ATTEMPTS, FixedBackoff, RetryPolicy},
};
use courier_infra::{
    mock::ScriptedMailTransport,
    repository::{DispatchAttemptRepository, InMemoryDispatchAttemptRepository},
    transport::MailTransport,
};

use crate::usecase::{DispatchUseCaseImpl, SendMailInput};

/// 配信テストのセットアップデータ
///
/// DispatchTestBuilder が生成する SUT と、その依存のハンドル。
pub struct DispatchTestSetup {
    pub sut:        DispatchUseCaseImpl,
    pub repository: Arc<dyn DispatchAttemptRepository>,
    pub transport:  ScriptedMailTransport,
}

/// 配信テストビルダー
///
/// 既定値:
/// - 送信手段: 常に成功する [`ScriptedMailTransport`]
/// - ストア: [`InMemoryDispatchAttemptRepository`]
/// - リトライ方針: 5 秒の [`FixedBackoff`]、最大 2 回
/// - 時計: 呼び出しごとに 1 秒進む [`SteppingClock`]
///
/// ```ignore
/// let setup = DispatchTestBuilder::new()
///     .with_transport(ScriptedMailTransport::always_failing("boom"))
///     .build();
/// let attempt = setup.sut.send(send_input("a@x.com")).await?;
/// ```
pub struct DispatchTestBuilder {
    transport:    ScriptedMailTransport,
    repository:   Arc<dyn DispatchAttemptRepository>,
    retry_policy: Arc<dyn RetryPolicy>,
    max_attempts: u32,
    start:        DateTime<Utc>,
}

impl DispatchTestBuilder {
    pub fn new() -> Self {
        Self {
            transport:    ScriptedMailTransport::succeeding(),
            repository:   Arc::new(InMemoryDispatchAttemptRepository::new()),
            retry_policy: Arc::new(FixedBackoff::default()),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            start:        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
        }
    }

    pub fn with_transport(mut self, transport: ScriptedMailTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn DispatchAttemptRepository>) -> Self {
        self.repository = repository;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// ビルダーのストアを取得
    pub fn repository(&self) -> Arc<dyn DispatchAttemptRepository> {
        Arc::clone(&self.repository)
    }

    /// 台本付きの送信手段で SUT を組み立てる
    pub fn build(self) -> DispatchTestSetup {
        let transport = self.transport.clone();
        let repository = self.repository();
        let sut = self.build_with_transport(Arc::new(transport.clone()));
        DispatchTestSetup {
            sut,
            repository,
            transport,
        }
    }

    /// 任意の送信手段で SUT を組み立てる
    pub fn build_with_transport(self, transport: Arc<dyn MailTransport>) -> DispatchUseCaseImpl {
        DispatchUseCaseImpl::new(
            self.repository,
            transport,
            self.retry_policy,
            Arc::new(SteppingClock::new(self.start, Duration::seconds(1))),
            self.max_attempts,
        )
    }
}

impl Default for DispatchTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 件名・本文が固定の送信入力
pub fn send_input(recipient: &str) -> SendMailInput {
    SendMailInput {
        recipient: recipient.to_string(),
        subject:   "Hi".to_string(),
        body:      "Body".to_string(),
    }
}
