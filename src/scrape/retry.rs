//! 指数退避重试

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{ErrorKind, ScrapeError};
use crate::utils::report::{Event, Reporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 第 n 次失败后等待 `multiplier * 2^n`
    pub multiplier: Duration,
    /// 单次等待上限
    pub max_wait: Duration,
    /// 自第一次尝试起的总时长上限，失败时已超出则不再重试
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            multiplier: Duration::from_millis(500),
            max_wait: Duration::from_secs(600),
            max_elapsed: Duration::from_secs(600),
        }
    }
}

impl RetryPolicy {
    /// 第 `attempt` 次（从 1 开始）失败后的等待时长
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.multiplier.saturating_mul(factor).min(self.max_wait)
    }

    /// 执行 `op`，只对 `ErrorKind::Transient` 的错误重试
    ///
    /// 致命错误原样返回；时间用尽时返回 `RetriesExhausted`，携带最后一次错误。
    pub async fn run<T, F, Fut>(&self, reporter: &dyn Reporter, mut op: F) -> Result<T, ScrapeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScrapeError>>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.kind() == ErrorKind::Fatal => return Err(e),
                Err(e) => e,
            };

            if started.elapsed() >= self.max_elapsed {
                return Err(ScrapeError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.delay_for(attempt);
            reporter.report(&Event::RetryScheduled {
                attempt,
                delay,
                error: error.to_string(),
            });
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(10), Duration::from_secs(512));
        assert_eq!(policy.delay_for(11), Duration::from_secs(600));
        assert_eq!(policy.delay_for(40), Duration::from_secs(600));
    }
}
