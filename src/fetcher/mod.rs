//! 抓取模块：单路径请求、重定向累积与重试
pub mod redirect;
pub mod retry;
pub mod http_fetcher;

use async_trait::async_trait;
use tracing::debug;

use crate::config::RetryPolicy;
use crate::detector::DetectionContext;
use crate::error::TdResult;
use crate::rule::RequestConfig;

pub use self::http_fetcher::HttpFetcher;
pub use self::retry::with_retry;

/// 页面抓取接口：一次调用产出一个检测上下文
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, request: &RequestConfig) -> TdResult<DetectionContext>;
}

/// 带重试的抓取
pub async fn fetch_with_retry(
    fetcher: &dyn PageFetcher,
    url: &str,
    request: &RequestConfig,
    policy: &RetryPolicy,
) -> TdResult<DetectionContext> {
    with_retry(policy, |attempt| {
        debug!("Fetching {} (attempt {})", url, attempt + 1);
        fetcher.fetch(url, request)
    })
    .await
}
