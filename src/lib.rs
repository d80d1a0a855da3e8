//! techdetect - 基于声明式指纹规则的网站技术栈探测引擎

// 导出全局错误类型
pub use self::error::{TechDetectError, TdResult};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, GlobalConfig, RetryPolicy};

// 导出规则模块核心接口
pub use self::rule::{
    AugmentProbe, Fingerprint, FingerprintDb, HttpProbe, RequestConfig, RuleLoader, RuleStore, Technology,
};

// 导出编译模块核心接口
pub use self::compiler::{CompiledPattern, FieldRef, Operator, Query, QueryCompiler, VersionRule};

// 导出工具模块核心接口
pub use self::utils::{DetectionMap, DetectionUpdater, HeaderConverter, VersionExtractor};

// 导出抓取模块核心接口
pub use self::fetcher::{HttpFetcher, PageFetcher, fetch_with_retry};

// 导出增强模块核心接口
pub use self::augment::{Augmenter, BrowserAugmenter, ScriptRuntime};

// 导出检测模块核心接口
pub use self::detector::{
    DetectResult, DetectionContext, MatchOutcome, PathClassifier, QueryEvaluator, TechDetector,
    detect_full, detect_http_only, init_detector, init_detector_with_config,
};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod compiler;
pub mod utils;
pub mod fetcher;
pub mod augment;
pub mod detector;
pub mod cli;
