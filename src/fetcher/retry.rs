//! 通用异步重试（指数退避）

use std::future::Future;
use tracing::warn;

use crate::config::RetryPolicy;
use crate::error::{TdResult, TechDetectError};

/// 按策略重试异步操作；闭包参数为当前尝试序号（从 0 开始）
/// 全部失败时返回最后一次错误，并包装重试次数
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> TdResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = TdResult<T>>,
{
    let mut attempt = 0;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries => {
                let backoff = policy.backoff_for(attempt);
                warn!(
                    "Request failed, retrying in {:?} (attempt {}/{}): {}",
                    backoff,
                    attempt + 1,
                    policy.max_retries,
                    e
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(TechDetectError::RetryExhausted {
                    retries: policy.max_retries,
                    source: Box::new(e),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_two_attempts_with_backoff_gap() {
        let policy = RetryPolicy::default();
        let mut stamps = Vec::new();

        let result: TdResult<()> = with_retry(&policy, |_| {
            stamps.push(Instant::now());
            async { Err(TechDetectError::RequestTimeout("operation timed out".to_string())) }
        })
        .await;

        assert_eq!(stamps.len(), 2);
        assert!(stamps[1] - stamps[0] >= Duration::from_secs(1));
        match result {
            Err(TechDetectError::RetryExhausted { retries, source }) => {
                assert_eq!(retries, 1);
                assert!(matches!(*source, TechDetectError::RequestTimeout(_)));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_retry() {
        let policy = RetryPolicy::default();
        let result = with_retry(&policy, |attempt| async move {
            if attempt == 0 {
                Err(TechDetectError::InvalidInput("first".to_string()))
            } else {
                Ok(attempt)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_between_attempts() {
        let policy = RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_secs(1),
        };
        let mut stamps = Vec::new();
        let _ = with_retry(&policy, |_| {
            stamps.push(Instant::now());
            async { Err::<(), _>(TechDetectError::RequestTimeout("t".to_string())) }
        })
        .await;

        assert_eq!(stamps.len(), 3);
        assert!(stamps[1] - stamps[0] >= Duration::from_secs(1));
        assert!(stamps[2] - stamps[1] >= Duration::from_secs(2));
    }
}
