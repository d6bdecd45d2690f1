//! 시계/대기 추상화.
//!
//! 감시 스케줄러는 현재 시각과 대기를 이 trait으로만 다룹니다.
//! 테스트에서는 `sleep`이 가상 시각을 전진시키는 수동 시계를 사용합니다.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 현재 시각 조회와 대기.
#[async_trait]
pub trait Clock: Send + Sync {
    /// 현재 시각 (UTC).
    fn now(&self) -> DateTime<Utc>;

    /// 지정 시간 동안 대기. 취소되지 않습니다.
    async fn sleep(&self, duration: Duration);
}

/// 실제 시스템 시계.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
