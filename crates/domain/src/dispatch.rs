//! # メール配信
//!
//! 配信試行の記録（[`DispatchAttempt`]）と、その状態遷移・リトライ方針を管理する。
//!
//! ## 概念モデル
//!
//! - **DispatchAttempt**: 1 件の送信要求とそのリトライ履歴を表す記録
//! - **DispatchStatus**: `PENDING` → `RETRYING` → `SUCCESS` / `FAILED` の状態
//! - **MailMessage**: 宛先・件名・本文（作成後は不変）
//! - **RetryPolicy**: 再試行の可否とバックオフ時間を決める純粋な方針
//!
//! ## 状態遷移
//!
//! ```text
//! PENDING ──▶ RETRYING ──▶ SUCCESS（終端）
//!                │  ▲
//!                ▼  │ バックオフ後に再試行
//!             FAILED ──▶ FAILED（finalized_at 付き、終端）
//! ```

mod attempt;
mod message;
mod retry_policy;
mod status;

pub use attempt::*;
pub use message::*;
pub use retry_policy::*;
pub use status::*;
