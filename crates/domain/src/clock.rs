//! # Clock（時刻プロバイダ）
//!
//! ユースケース層での `Utc::now()` 直接呼び出しを置き換え、
//! テストで決定的な時刻を注入可能にするための抽象化。

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};

/// 現在時刻を提供するトレイト
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 実際のシステム時刻を返す実装
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 呼び出すたびに一定間隔だけ進む時刻を返すテスト用実装
///
/// 作成日時の降順ソートを検証するテストで、記録ごとに異なる `created_at` を
/// 決定的に割り当てるために使う。
pub struct SteppingClock {
    start:      DateTime<Utc>,
    step_ms:    i64,
    tick_count: AtomicI64,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            start,
            step_ms: step.num_milliseconds(),
            tick_count: AtomicI64::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.tick_count.fetch_add(1, Ordering::SeqCst);
        self.start + Duration::milliseconds(self.step_ms * tick)
    }
}
