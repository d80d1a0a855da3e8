//! 全局配置管理,存储所有可配置项

use std::path::PathBuf;
use std::time::Duration;

/// 单次请求超时
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// 失败后的重试次数（不含首次请求）
pub const MAX_RETRIES: u32 = 1;
/// 指数退避初始间隔
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// 同域重定向最大跳数
pub const MAX_REDIRECTS: usize = 3;
/// 增强阶段整体超时
pub const AUGMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// 重试策略（指数退避）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 重试次数（不含第一次）
    pub max_retries: u32,
    /// 首次退避间隔，之后每次翻倍
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// 第 `attempt` 次失败后（从 0 开始）的退避时长
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_backoff: INITIAL_BACKOFF,
        }
    }
}

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 指纹规则路径（目录或单个 JSON 文件）
    pub fingerprints_path: PathBuf,
    // 单次请求超时
    pub http_timeout: Duration,
    // 是否跳过 TLS 证书校验
    pub insecure_skip_verify: bool,
    pub retry: RetryPolicy,
    pub max_redirects: usize,
    pub user_agent: String,
    // 增强阶段超时
    pub augment_timeout: Duration,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            fingerprints_path: PathBuf::from("./data/fingerprints"),
            http_timeout: REQUEST_TIMEOUT,
            insecure_skip_verify: false,
            retry: RetryPolicy::default(),
            max_redirects: MAX_REDIRECTS,
            user_agent: format!("techdetect/{}", env!("CARGO_PKG_VERSION")),
            augment_timeout: AUGMENT_TIMEOUT,
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GlobalConfig::default(),
        }
    }

    pub fn fingerprints_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.fingerprints_path = path.into();
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    pub fn insecure_skip_verify(mut self, insecure: bool) -> Self {
        self.config.insecure_skip_verify = insecure;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.max_redirects = max_redirects;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn augment_timeout(mut self, timeout: Duration) -> Self {
        self.config.augment_timeout = timeout;
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}
