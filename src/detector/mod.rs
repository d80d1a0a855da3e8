//! 检测模块：路径归类、查询求值与检测编排
pub mod context;
pub mod evaluator;
pub mod classifier;
pub mod detector;
pub mod global;

// 导出核心接口
pub use self::context::DetectionContext;
pub use self::evaluator::{MatchOutcome, QueryEvaluator};
pub use self::classifier::{PathClassification, PathClassifier};
pub use self::detector::{DetectResult, TechDetector};
pub use self::global::{
    detect_full, detect_http_only, get_global_detector, init_detector, init_detector_with_config,
};
