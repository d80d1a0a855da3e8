//! 全局检测器单例管理
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::detector::{DetectResult, TechDetector};
use crate::config::{ConfigManager, GlobalConfig};
use crate::error::{TdResult, TechDetectError};

/// 全局检测器实例
static GLOBAL_DETECTOR: Lazy<Arc<OnceCell<TechDetector>>> = Lazy::new(|| Arc::new(OnceCell::new()));

/// 初始化全局检测器（默认配置）
pub async fn init_detector() -> TdResult<()> {
    init_detector_with_config(ConfigManager::get_default()).await
}

/// 带自定义配置初始化全局检测器；重复初始化保持第一次的实例
pub async fn init_detector_with_config(config: GlobalConfig) -> TdResult<()> {
    GLOBAL_DETECTOR
        .get_or_try_init(|| TechDetector::new(config))
        .await?;
    Ok(())
}

/// 获取全局检测器
pub fn get_global_detector() -> TdResult<&'static TechDetector> {
    GLOBAL_DETECTOR.get().ok_or(TechDetectError::DetectorNotInitialized)
}

/// 使用全局检测器执行仅 HTTP 检测
pub async fn detect_http_only(url: &str) -> TdResult<DetectResult> {
    get_global_detector()?.detect_http_only(url).await
}

/// 使用全局检测器执行完整检测
pub async fn detect_full(url: &str) -> TdResult<DetectResult> {
    get_global_detector()?.detect_full(url).await
}
