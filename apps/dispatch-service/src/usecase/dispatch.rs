//! # 配信ユースケース
//!
//! 送信要求を配信記録として永続化し、リトライ方針に従って送信手段を呼び出す。
//!
//! ## 状態の書き込み順
//!
//! 1 件の記録について、書き込みは次の順に直列化される:
//!
//! ```text
//! insert(PENDING) → update(RETRYING) → update(SUCCESS)
//!                                    → update(FAILED) → 待機 → update(RETRYING) → ...
//! ```
//!
//! 送信失敗は記録の `status` / `error` に変換して返し、呼び出し元には伝播しない。
//! ストアの失敗はその時点で処理を中断し、呼び出し元に伝播する。
//!
//! 試行ループは記録の作成後に別タスクで実行する。呼び出し元が待つのをやめても
//! （HTTP クライアントの切断など）ループは終端状態まで進む。

use std::sync::Arc;

use courier_domain::{
    DomainError,
    clock::Clock,
    dispatch::{
        DispatchAttempt,
        DispatchAttemptId,
        MailMessage,
        NewDispatchAttempt,
        RetryPolicy,
        StatusFilter,
    },
};
use courier_infra::{repository::DispatchAttemptRepository, transport::MailTransport};
use courier_shared::{event_log::event, log_business_event};
use tracing::Instrument as _;

use crate::error::DispatchError;

/// 送信要求の入力
pub struct SendMailInput {
    pub recipient: String,
    pub subject:   String,
    pub body:      String,
}

/// 配信ユースケース
///
/// 依存はすべて `Arc` で保持し、操作はすべて `&self` で受けるため、
/// `Arc<DispatchUseCaseImpl>` として複数タスクから同時に使える。
/// 異なる記録の送信同士は協調しない（グローバルロックなし）。
pub struct DispatchUseCaseImpl {
    repository:   Arc<dyn DispatchAttemptRepository>,
    transport:    Arc<dyn MailTransport>,
    retry_policy: Arc<dyn RetryPolicy>,
    clock:        Arc<dyn Clock>,
    max_attempts: u32,
}

impl DispatchUseCaseImpl {
    pub fn new(
        repository: Arc<dyn DispatchAttemptRepository>,
        transport: Arc<dyn MailTransport>,
        retry_policy: Arc<dyn RetryPolicy>,
        clock: Arc<dyn Clock>,
        max_attempts: u32,
    ) -> Self {
        Self {
            repository,
            transport,
            retry_policy,
            clock,
            max_attempts,
        }
    }

    /// メールを送信する
    ///
    /// 配信記録を `PENDING` で作成してから試行ループを実行し、
    /// ループ終了時点で永続化されている記録を返す。
    /// 送信に失敗しても `Ok`（`status = FAILED`）を返す。
    ///
    /// # Errors
    ///
    /// - `DispatchError::BadRequest`: 宛先・件名・本文が不正
    /// - `DispatchError::StoreUnavailable`: ストアへの書き込みに失敗
    pub async fn send(&self, input: SendMailInput) -> Result<DispatchAttempt, DispatchError> {
        let message = MailMessage::new(input.recipient, input.subject, input.body)?;
        self.dispatch(message).await
    }

    /// 既存の配信記録を再送する
    ///
    /// - `SUCCESS` の記録はそのまま返す（送信も新規記録の作成もしない）
    /// - それ以外は同じメッセージで新しい記録を作成して送信する。元の記録は変更しない
    ///
    /// # Errors
    ///
    /// - `DispatchError::NotFound`: 記録が存在しない
    /// - `DispatchError::StoreUnavailable`: ストアの読み書きに失敗
    pub async fn resend(&self, id: &DispatchAttemptId) -> Result<DispatchAttempt, DispatchError> {
        let original = self.get(id).await?;

        if original.is_successful() {
            log_business_event!(
                event.category = event::category::DISPATCH,
                event.action = event::action::RESEND_SKIPPED,
                event.entity_type = event::entity_type::DISPATCH_ATTEMPT,
                event.entity_id = %original.id(),
                event.result = event::result::SUCCESS,
                "送信済みのため再送をスキップ"
            );
            return Ok(original);
        }

        let resent = self.dispatch(original.message().clone()).await?;
        log_business_event!(
            event.category = event::category::DISPATCH,
            event.action = event::action::DISPATCH_RESENT,
            event.entity_type = event::entity_type::DISPATCH_ATTEMPT,
            event.entity_id = %resent.id(),
            event.result = result_of(&resent),
            dispatch.resent_from = %original.id(),
            dispatch.status = %resent.status(),
            "再送完了"
        );
        Ok(resent)
    }

    /// 配信履歴を作成日時の降順で取得する
    ///
    /// `status_filter` が未指定・空白なら全件、それ以外は大文字小文字を区別せず
    /// ステータス名と比較する。どのステータスにも一致しない名前は空の一覧になる。
    pub async fn list(
        &self,
        status_filter: Option<&str>,
    ) -> Result<Vec<DispatchAttempt>, DispatchError> {
        let attempts = match StatusFilter::parse(status_filter) {
            StatusFilter::All => self.repository.find_all().await?,
            StatusFilter::Only(status) => self.repository.find_by_status(status).await?,
            StatusFilter::Unmatched => Vec::new(),
        };
        Ok(attempts)
    }

    /// 配信記録を 1 件取得する
    pub async fn get(&self, id: &DispatchAttemptId) -> Result<DispatchAttempt, DispatchError> {
        let attempt = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity_type: "DispatchAttempt",
                id:          id.to_string(),
            })?;
        Ok(attempt)
    }

    async fn dispatch(&self, message: MailMessage) -> Result<DispatchAttempt, DispatchError> {
        let attempt = DispatchAttempt::new(NewDispatchAttempt {
            id: DispatchAttemptId::new(),
            message,
            now: self.clock.now(),
        });
        self.repository.insert(&attempt).await?;

        log_business_event!(
            event.category = event::category::DISPATCH,
            event.action = event::action::DISPATCH_CREATED,
            event.entity_type = event::entity_type::DISPATCH_ATTEMPT,
            event.entity_id = %attempt.id(),
            event.result = event::result::SUCCESS,
            "配信記録を作成"
        );

        let runner = self.runner();
        tokio::spawn(async move { runner.run(attempt).await }.in_current_span())
            .await
            .map_err(|e| DispatchError::Internal(format!("試行ループが異常終了しました: {e}")))?
    }

    fn runner(&self) -> AttemptRunner {
        AttemptRunner {
            repository:   Arc::clone(&self.repository),
            transport:    Arc::clone(&self.transport),
            retry_policy: Arc::clone(&self.retry_policy),
            clock:        Arc::clone(&self.clock),
            max_attempts: self.max_attempts,
        }
    }
}

/// 1 件の記録について試行ループを回す
///
/// 呼び出し元のタスクから切り離して実行するため、依存を所有する。
struct AttemptRunner {
    repository:   Arc<dyn DispatchAttemptRepository>,
    transport:    Arc<dyn MailTransport>,
    retry_policy: Arc<dyn RetryPolicy>,
    clock:        Arc<dyn Clock>,
    max_attempts: u32,
}

impl AttemptRunner {
    /// 各試行の直前に `RETRYING`、結果に応じて `SUCCESS` / `FAILED` を書き込む。
    /// 待機は `tokio::time::sleep` で、このタスクだけを止める。
    #[tracing::instrument(skip_all, fields(dispatch_id = %attempt.id()))]
    async fn run(&self, mut attempt: DispatchAttempt) -> Result<DispatchAttempt, DispatchError> {
        loop {
            let current = attempt
                .begin_attempt(self.clock.now())
                .map_err(transition_error)?;
            self.repository.update(&current).await?;
            let attempt_number = current.attempt_count();

            match self.transport.send(current.message()).await {
                Ok(()) => {
                    let succeeded = current
                        .succeeded(self.clock.now())
                        .map_err(transition_error)?;
                    self.repository.update(&succeeded).await?;

                    log_business_event!(
                        event.category = event::category::DISPATCH,
                        event.action = event::action::ATTEMPT_SUCCEEDED,
                        event.entity_type = event::entity_type::DISPATCH_ATTEMPT,
                        event.entity_id = %succeeded.id(),
                        event.result = event::result::SUCCESS,
                        dispatch.attempt = attempt_number,
                        "送信成功"
                    );
                    return Ok(succeeded);
                }
                Err(e) => {
                    let retry = self
                        .retry_policy
                        .should_retry(attempt_number, self.max_attempts);
                    let failed = current
                        .failed(e.to_string(), !retry, self.clock.now())
                        .map_err(transition_error)?;
                    self.repository.update(&failed).await?;

                    log_business_event!(
                        event.category = event::category::DISPATCH,
                        event.action = event::action::ATTEMPT_FAILED,
                        event.entity_type = event::entity_type::DISPATCH_ATTEMPT,
                        event.entity_id = %failed.id(),
                        event.result = event::result::FAILURE,
                        dispatch.attempt = attempt_number,
                        dispatch.max_attempts = self.max_attempts,
                        error = %e,
                        "送信失敗"
                    );

                    if !retry {
                        log_business_event!(
                            event.category = event::category::DISPATCH,
                            event.action = event::action::DISPATCH_EXHAUSTED,
                            event.entity_type = event::entity_type::DISPATCH_ATTEMPT,
                            event.entity_id = %failed.id(),
                            event.result = event::result::FAILURE,
                            dispatch.attempts = attempt_number,
                            "最大試行回数に到達"
                        );
                        return Ok(failed);
                    }

                    let backoff = self.retry_policy.backoff_duration(attempt_number);
                    tracing::debug!(?backoff, attempt = attempt_number, "再試行まで待機");
                    tokio::time::sleep(backoff).await;
                    attempt = failed;
                }
            }
        }
    }
}

fn result_of(attempt: &DispatchAttempt) -> &'static str {
    if attempt.is_successful() {
        event::result::SUCCESS
    } else {
        event::result::FAILURE
    }
}

/// 試行ループ内の遷移は常に許可されるはずなので、失敗は内部エラーとして扱う
fn transition_error(err: DomainError) -> DispatchError {
    DispatchError::Internal(err.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use courier_domain::dispatch::{DispatchStatus, ExponentialBackoff, MAX_RECIPIENT_LENGTH};
    use courier_infra::{
        mock::{FailOn, FailingDispatchAttemptRepository, ScriptedMailTransport},
        transport::MailTransport,
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tokio::time::Instant;

    use super::*;
    use crate::test_utils::{DispatchTestBuilder, send_input};

    /// 一時停止した時計の上で、経過時間が `expected` ちょうど（タイマー精度内）か
    fn assert_elapsed(started: Instant, expected: Duration) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(100),
            "経過時間 {elapsed:?} が {expected:?} であること"
        );
    }

    // ===== send =====

    #[tokio::test]
    async fn test_send_送信成功ならsuccessで1回だけ呼ばれる() {
        // Given
        let setup = DispatchTestBuilder::new().build();

        // When
        let attempt = setup.sut.send(send_input("a@x.com")).await.unwrap();

        // Then
        assert_eq!(attempt.status(), DispatchStatus::Success);
        assert_eq!(attempt.error(), None);
        assert_eq!(attempt.attempt_count(), 1);
        assert!(attempt.is_finalized());
        assert_eq!(setup.transport.call_count(), 1);

        let stored = setup.repository.find_by_id(attempt.id()).await.unwrap();
        assert_eq!(stored, Some(attempt));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_2回失敗ならfailedで最後の理由を保持する() {
        // Given
        let transport = ScriptedMailTransport::succeeding()
            .push_failure("first")
            .push_failure("boom");
        let setup = DispatchTestBuilder::new().with_transport(transport).build();

        // When
        let attempt = setup.sut.send(send_input("a@x.com")).await.unwrap();

        // Then
        assert_eq!(attempt.status(), DispatchStatus::Failed);
        assert_eq!(attempt.error(), Some("boom"));
        assert_eq!(attempt.attempt_count(), 2);
        assert!(attempt.is_finalized());
        assert_eq!(setup.transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_1回失敗後に成功すればerrorは消える() {
        // Given
        let transport = ScriptedMailTransport::succeeding().push_failure("timeout");
        let setup = DispatchTestBuilder::new().with_transport(transport).build();

        // When
        let attempt = setup.sut.send(send_input("a@x.com")).await.unwrap();

        // Then
        assert_eq!(attempt.status(), DispatchStatus::Success);
        assert_eq!(attempt.error(), None);
        assert_eq!(attempt.attempt_count(), 2);
        assert_eq!(setup.transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_失敗と再試行の間で5秒待つ() {
        // Given
        let setup = DispatchTestBuilder::new()
            .with_transport(ScriptedMailTransport::always_failing("boom"))
            .build();
        let started = Instant::now();

        // When
        setup.sut.send(send_input("a@x.com")).await.unwrap();

        // Then
        assert_elapsed(started, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_成功時は待たない() {
        let setup = DispatchTestBuilder::new().build();
        let started = Instant::now();

        setup.sut.send(send_input("a@x.com")).await.unwrap();

        assert_elapsed(started, Duration::ZERO);
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 2)]
    #[case(3, 3)]
    #[tokio::test(start_paused = true)]
    async fn test_send_常に失敗する送信手段は最大試行回数だけ呼ばれる(
        #[case] max_attempts: u32,
        #[case] expected_calls: usize,
    ) {
        let setup = DispatchTestBuilder::new()
            .with_transport(ScriptedMailTransport::always_failing("boom"))
            .with_max_attempts(max_attempts)
            .build();

        let attempt = setup.sut.send(send_input("a@x.com")).await.unwrap();

        assert_eq!(attempt.status(), DispatchStatus::Failed);
        assert_eq!(setup.transport.call_count(), expected_calls);
        assert_eq!(attempt.attempt_count(), max_attempts);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_リトライ方針を差し替えられる() {
        // Given: 1 秒から倍々で待つ方針、3 回まで
        let setup = DispatchTestBuilder::new()
            .with_transport(ScriptedMailTransport::always_failing("boom"))
            .with_retry_policy(Arc::new(ExponentialBackoff::new(
                Duration::from_secs(1),
                2,
                Duration::from_secs(60),
            )))
            .with_max_attempts(3)
            .build();
        let started = Instant::now();

        // When
        setup.sut.send(send_input("a@x.com")).await.unwrap();

        // Then: 1 秒 + 2 秒
        assert_elapsed(started, Duration::from_secs(3));
        assert_eq!(setup.transport.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_待機中の記録は未確定のfailedとして見える() {
        // Given
        let setup = DispatchTestBuilder::new()
            .with_transport(ScriptedMailTransport::succeeding().push_failure("boom"))
            .build();
        let sut = Arc::new(setup.sut);
        let handle = tokio::spawn({
            let sut = Arc::clone(&sut);
            async move { sut.send(send_input("a@x.com")).await }
        });

        // When: バックオフ中に履歴を見る
        tokio::time::sleep(Duration::from_secs(1)).await;
        let in_flight = sut.list(None).await.unwrap();

        // Then
        assert_eq!(in_flight.len(), 1);
        assert_eq!(in_flight[0].status(), DispatchStatus::Failed);
        assert_eq!(in_flight[0].error(), Some("boom"));
        assert!(!in_flight[0].is_finalized());

        let finished = handle.await.unwrap().unwrap();
        assert_eq!(finished.status(), DispatchStatus::Success);
        assert_eq!(finished.id(), in_flight[0].id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_呼び出し元が待つのをやめても記録は終端状態まで進む() {
        // Given: 1 回目は失敗、2 回目は成功
        let setup = DispatchTestBuilder::new()
            .with_transport(ScriptedMailTransport::succeeding().push_failure("boom"))
            .build();

        // When: バックオフ中に呼び出し元が待つのをやめる
        let abandoned =
            tokio::time::timeout(Duration::from_secs(1), setup.sut.send(send_input("a@x.com")))
                .await;
        assert!(abandoned.is_err());
        tokio::time::sleep(Duration::from_secs(60)).await;

        // Then
        let stored = setup.sut.list(None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status(), DispatchStatus::Success);
        assert_eq!(stored[0].error(), None);
        assert!(stored[0].is_finalized());
        assert_eq!(setup.transport.call_count(), 2);
    }

    /// 送信手段が呼ばれた時点の記録を覗き見る
    struct ObservingTransport {
        repository: Arc<dyn DispatchAttemptRepository>,
        observed:   std::sync::Mutex<Vec<(DispatchStatus, u32)>>,
    }

    #[async_trait::async_trait]
    impl MailTransport for ObservingTransport {
        async fn send(
            &self,
            _message: &MailMessage,
        ) -> Result<(), courier_domain::dispatch::TransportError> {
            let all = self.repository.find_all().await.unwrap();
            self.observed
                .lock()
                .unwrap()
                .push((all[0].status(), all[0].attempt_count()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_send_送信前にretryingが永続化されている() {
        // Given
        let builder = DispatchTestBuilder::new();
        let repository = builder.repository();
        let transport = Arc::new(ObservingTransport {
            repository: Arc::clone(&repository),
            observed:   std::sync::Mutex::new(Vec::new()),
        });
        let sut = builder.build_with_transport(transport.clone());

        // When
        sut.send(send_input("a@x.com")).await.unwrap();

        // Then
        assert_eq!(
            *transport.observed.lock().unwrap(),
            vec![(DispatchStatus::Retrying, 1)]
        );
    }

    #[rstest]
    #[case("", "Hi", "Body")]
    #[case("not-an-address", "Hi", "Body")]
    #[case("a@x.com", " ", "Body")]
    #[case("a@x.com", "Hi", "")]
    #[tokio::test]
    async fn test_send_不正な入力はbad_requestで記録も送信もしない(
        #[case] recipient: &str,
        #[case] subject: &str,
        #[case] body: &str,
    ) {
        let setup = DispatchTestBuilder::new().build();

        let result = setup
            .sut
            .send(SendMailInput {
                recipient: recipient.to_string(),
                subject:   subject.to_string(),
                body:      body.to_string(),
            })
            .await;

        assert!(matches!(result, Err(DispatchError::BadRequest(_))));
        assert_eq!(setup.transport.call_count(), 0);
        assert!(setup.sut.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_長すぎる宛先はストアに触れる前にbad_requestになる() {
        // Given: ストアに触れれば StoreUnavailable になる構成
        let setup = DispatchTestBuilder::new()
            .with_repository(Arc::new(FailingDispatchAttemptRepository::new(
                FailOn::Everything,
            )))
            .build();
        let recipient = format!("{}@x.com", "a".repeat(MAX_RECIPIENT_LENGTH));

        // When
        let result = setup.sut.send(send_input(&recipient)).await;

        // Then
        assert!(matches!(result, Err(DispatchError::BadRequest(_))));
        assert_eq!(setup.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_send_ストアが使えなければstore_unavailableで送信しない() {
        let setup = DispatchTestBuilder::new()
            .with_repository(Arc::new(FailingDispatchAttemptRepository::new(
                FailOn::Everything,
            )))
            .build();

        let result = setup.sut.send(send_input("a@x.com")).await;

        assert!(matches!(result, Err(DispatchError::StoreUnavailable(_))));
        assert_eq!(setup.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_send_試行結果を保存できなければstore_unavailableになる() {
        let setup = DispatchTestBuilder::new()
            .with_repository(Arc::new(FailingDispatchAttemptRepository::new(
                FailOn::Updates,
            )))
            .build();

        let result = setup.sut.send(send_input("a@x.com")).await;

        assert!(matches!(result, Err(DispatchError::StoreUnavailable(_))));
    }

    // ===== resend =====

    #[tokio::test]
    async fn test_resend_successの記録はそのまま返し送信しない() {
        // Given
        let setup = DispatchTestBuilder::new().build();
        let original = setup.sut.send(send_input("a@x.com")).await.unwrap();

        // When
        let result = setup.sut.resend(original.id()).await.unwrap();

        // Then
        assert_eq!(result, original);
        assert_eq!(setup.transport.call_count(), 1);
        assert_eq!(setup.sut.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resend_failedの記録は新しい記録で再送し元は変えない() {
        // Given
        let transport = ScriptedMailTransport::succeeding()
            .push_failure("boom")
            .push_failure("boom");
        let setup = DispatchTestBuilder::new().with_transport(transport).build();
        let original = setup.sut.send(send_input("a@x.com")).await.unwrap();
        assert_eq!(original.status(), DispatchStatus::Failed);

        // When
        let resent = setup.sut.resend(original.id()).await.unwrap();

        // Then
        assert_ne!(resent.id(), original.id());
        assert_eq!(resent.status(), DispatchStatus::Success);
        assert_eq!(resent.message(), original.message());
        assert!(resent.created_at() > original.created_at());

        let stored_original = setup.sut.get(original.id()).await.unwrap();
        assert_eq!(stored_original, original);
        assert_eq!(
            setup.transport.sent_messages(),
            vec![original.message().clone(); 3]
        );
    }

    #[tokio::test]
    async fn test_resend_存在しないidはnot_found() {
        let setup = DispatchTestBuilder::new().build();

        let result = setup.sut.resend(&DispatchAttemptId::new()).await;

        assert!(matches!(result, Err(DispatchError::NotFound(_))));
        assert_eq!(setup.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_resend_ストアが使えなければstore_unavailable() {
        let setup = DispatchTestBuilder::new()
            .with_repository(Arc::new(FailingDispatchAttemptRepository::new(
                FailOn::Everything,
            )))
            .build();

        let result = setup.sut.resend(&DispatchAttemptId::new()).await;

        assert!(matches!(result, Err(DispatchError::StoreUnavailable(_))));
    }

    // ===== list / get =====

    #[tokio::test]
    async fn test_list_作成日時の降順で返す() {
        // Given
        let setup = DispatchTestBuilder::new().build();
        let first = setup.sut.send(send_input("first@x.com")).await.unwrap();
        let second = setup.sut.send(send_input("second@x.com")).await.unwrap();
        let third = setup.sut.send(send_input("third@x.com")).await.unwrap();

        // When
        let ids: Vec<_> = setup
            .sut
            .list(None)
            .await
            .unwrap()
            .iter()
            .map(|a| a.id().clone())
            .collect();

        // Then
        assert_eq!(
            ids,
            vec![third.id().clone(), second.id().clone(), first.id().clone()]
        );
    }

    #[rstest]
    #[case(Some("failed"))]
    #[case(Some("FAILED"))]
    #[case(Some(" Failed "))]
    #[tokio::test(start_paused = true)]
    async fn test_list_ステータスは大文字小文字を区別せず絞り込む(
        #[case] filter: Option<&str>,
    ) {
        // Given: 1 件目は 2 回失敗、2 件目は成功
        let setup = DispatchTestBuilder::new()
            .with_transport(
                ScriptedMailTransport::succeeding()
                    .push_failure("boom")
                    .push_failure("boom"),
            )
            .build();
        let failed = setup.sut.send(send_input("a@x.com")).await.unwrap();
        setup.sut.send(send_input("b@x.com")).await.unwrap();

        // When
        let result = setup.sut.list(filter).await.unwrap();

        // Then
        assert_eq!(result, vec![failed]);
    }

    #[rstest]
    #[case(None, 2)]
    #[case(Some(""), 2)]
    #[case(Some("   "), 2)]
    #[case(Some("success"), 2)]
    #[case(Some("pending"), 0)]
    #[case(Some("bounced"), 0)]
    #[tokio::test]
    async fn test_list_フィルタごとの件数(#[case] filter: Option<&str>, #[case] expected: usize) {
        let setup = DispatchTestBuilder::new().build();
        setup.sut.send(send_input("a@x.com")).await.unwrap();
        setup.sut.send(send_input("b@x.com")).await.unwrap();

        let result = setup.sut.list(filter).await.unwrap();

        assert_eq!(result.len(), expected);
    }

    #[tokio::test]
    async fn test_list_ストアが使えなければstore_unavailable() {
        let setup = DispatchTestBuilder::new()
            .with_repository(Arc::new(FailingDispatchAttemptRepository::new(
                FailOn::Everything,
            )))
            .build();

        let result = setup.sut.list(None).await;

        assert!(matches!(result, Err(DispatchError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_get_存在しないidはnot_found() {
        let setup = DispatchTestBuilder::new().build();

        let id = DispatchAttemptId::new();

        let result = setup.sut.get(&id).await;

        assert!(matches!(
            result,
            Err(DispatchError::NotFound(msg)) if msg == format!("DispatchAttempt が見つかりません: {id}")
        ));
    }

    // ===== 並行性 =====

    #[tokio::test(start_paused = true)]
    async fn test_並行する送信のバックオフは互いを待たせない() {
        // Given
        let setup = DispatchTestBuilder::new()
            .with_transport(ScriptedMailTransport::always_failing("boom"))
            .build();
        let started = Instant::now();

        // When
        let (a, b) = tokio::join!(
            setup.sut.send(send_input("a@x.com")),
            setup.sut.send(send_input("b@x.com")),
        );

        // Then: 2 件分のバックオフが重なり、合計 5 秒で済む
        assert_elapsed(started, Duration::from_secs(5));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.status(), DispatchStatus::Failed);
        assert_eq!(b.status(), DispatchStatus::Failed);
        assert_eq!(setup.transport.call_count(), 4);
    }
}
