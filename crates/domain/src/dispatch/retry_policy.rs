//! # リトライ方針
//!
//! 送信失敗後に再試行するか、どれだけ待つかを決める純粋な方針。
//! 配信エンジンは方針を注入で受け取り、ループ内で問い合わせるだけにする。

use std::{fmt::Debug, time::Duration};

/// デフォルトの最大試行回数（初回 + 再試行 1 回）
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// デフォルトのバックオフ時間
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// リトライ方針トレイト
///
/// `attempt` は 1 始まりの試行番号（直前に失敗した試行）。
pub trait RetryPolicy: Debug + Send + Sync {
    /// `attempt` 回目の失敗後に再試行するか
    fn should_retry(&self, attempt: u32, max_attempts: u32) -> bool {
        attempt < max_attempts
    }

    /// `attempt` 回目の失敗後、次の試行までに待つ時間
    fn backoff_duration(&self, attempt: u32) -> Duration;
}

/// 固定バックオフ
///
/// 試行番号に関係なく常に同じ時間だけ待つ。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_secs(seconds: u64) -> Self {
        Self::new(Duration::from_secs(seconds))
    }
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF)
    }
}

impl RetryPolicy for FixedBackoff {
    fn backoff_duration(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// 指数バックオフ
///
/// `initial * multiplier^(attempt - 1)` を `max` で頭打ちにする。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    initial:    Duration,
    multiplier: u32,
    max:        Duration,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, multiplier: u32, max: Duration) -> Self {
        Self {
            initial,
            multiplier,
            max,
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn backoff_duration(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        self.multiplier
            .checked_pow(exponent)
            .and_then(|factor| self.initial.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }
}
