//! 规则模块：负责指纹规则的加载与数据模型定义
pub mod model;
pub mod loader;

// 导出核心接口
pub use self::model::{
    AugmentProbe, Fingerprint, FingerprintDb, HttpProbe, RequestConfig, RuleStore, Technology,
};
pub use self::loader::RuleLoader;
