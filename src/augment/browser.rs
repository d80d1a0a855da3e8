//! 脚本探针增强器
//! 真实的无头浏览器由调用方通过 [`ScriptRuntime`] 提供，这里只负责探针调度与结果合并

use async_trait::async_trait;
use tracing::debug;

use super::{Augmenter, classify_augmentation, should_run_probe};
use crate::error::TdResult;
use crate::fetcher::redirect::join_probe_path;
use crate::rule::RuleStore;
use crate::utils::{DetectionMap, DetectionUpdater};

/// 脚本运行时（页面导航 + 脚本求值）
#[async_trait]
pub trait ScriptRuntime: Send + Sync {
    async fn navigate(&self, url: &str) -> TdResult<()>;
    async fn eval_bool(&self, script: &str) -> TdResult<bool>;
    async fn eval_string(&self, script: &str) -> TdResult<String>;
}

/// 探针脚本以立即执行函数包装，脚本体内可直接 `return`
pub fn wrap_script(body: &str) -> String {
    format!("(function(){{ {} }})()", body)
}

/// 基于脚本运行时的增强器
pub struct BrowserAugmenter<R> {
    runtime: R,
}

impl<R: ScriptRuntime> BrowserAugmenter<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }
}

#[async_trait]
impl<R: ScriptRuntime> Augmenter for BrowserAugmenter<R> {
    async fn augment(&self, base_url: &str, store: &RuleStore, mut results: DetectionMap) -> TdResult<DetectionMap> {
        let groups = classify_augmentation(store);
        if groups.is_empty() {
            return Ok(results);
        }

        for group in &groups {
            let url = join_probe_path(base_url, &group.path);
            if let Err(e) = self.runtime.navigate(&url).await {
                debug!("Navigation to {} failed, skipping path: {}", url, e);
                continue;
            }

            for (tech, probes) in &group.technologies {
                for probe in probes {
                    if !should_run_probe(tech, &results, probe) {
                        continue;
                    }

                    let mut detected = false;
                    if probe.has_detection_capability() {
                        match self.runtime.eval_bool(&wrap_script(&probe.detection)).await {
                            Ok(value) => detected = value,
                            Err(e) => debug!("Detection script for {} failed: {}", tech, e),
                        }
                    }

                    let mut version = String::new();
                    if probe.has_version_capability() && (detected || results.contains_key(*tech)) {
                        match self.runtime.eval_string(&wrap_script(&probe.version)).await {
                            Ok(value) => version = value,
                            Err(e) => debug!("Version script for {} failed: {}", tech, e),
                        }
                    }

                    if detected {
                        DetectionUpdater::update(&mut results, tech.to_string(), version);
                        break;
                    }
                    // 已由 HTTP 阶段检测到，仅补充版本
                    if !version.is_empty() && results.contains_key(*tech) {
                        DetectionUpdater::update(&mut results, tech.to_string(), version);
                        break;
                    }
                }
            }
        }

        Ok(results)
    }
}
