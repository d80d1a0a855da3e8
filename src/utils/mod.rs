//! 工具模块：版本提取、结果更新、Header 合并
pub mod version_extractor;
pub mod detection_updater;
pub mod header_converter;

pub use self::version_extractor::VersionExtractor;
pub use self::detection_updater::{DetectionMap, DetectionUpdater};
pub use self::header_converter::HeaderConverter;
