//! 지수 백오프 재시도 정책.
//!
//! 시도 횟수를 명시적으로 세고, 대기 시간은 순수 함수로 계산합니다:
//!
//! ```text
//! delay(attempt) = min(base_delay * 2^attempt, max_delay)
//! ```
//!
//! 기본값(base 1초, 상한 8초)에서 대기 시간은 2s, 4s, 8s, 8s, ... 입니다.
//! 마지막 시도 이후에는 대기하지 않습니다.

use std::future::Future;
use std::time::Duration;

use crate::error::DataError;

/// 재시도 정책.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 최대 시도 횟수 (첫 시도 포함)
    pub max_attempts: u32,
    /// 백오프 기준 단위
    pub base_delay: Duration,
    /// 백오프 상한
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        }
    }
}

/// 재시도 예산을 소진한 결과.
#[derive(Debug)]
pub struct RetryExhausted {
    /// 실제로 수행된 시도 횟수
    pub attempts: u32,
    /// 마지막 실패 원인
    pub last_error: DataError,
}

impl RetryPolicy {
    /// 시도 횟수만 지정한 기본 정책.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// `attempt`번째(1부터) 시도가 실패한 뒤의 대기 시간.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// 비동기 작업을 정책에 따라 실행.
    ///
    /// `operation`은 1부터 시작하는 시도 번호를 받습니다. 재시도 불가능한
    /// 에러는 즉시 반환됩니다.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, RetryExhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = crate::Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() || attempt >= max_attempts => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
                Err(e) => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "요청 실패, 재시도 예정"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
