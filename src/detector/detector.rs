//! 检测器核心：路径归类 -> 逐路径抓取 -> 探针求值 -> 增强 -> implies 推导
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use super::classifier::{PathClassification, PathClassifier};
use super::context::DetectionContext;
use super::evaluator::QueryEvaluator;
use crate::augment::Augmenter;
use crate::config::GlobalConfig;
use crate::error::{TdResult, TechDetectError};
use crate::fetcher::redirect::join_probe_path;
use crate::fetcher::{HttpFetcher, PageFetcher, fetch_with_retry};
use crate::rule::{RuleLoader, RuleStore, Technology};
use crate::utils::{DetectionMap, DetectionUpdater};

/// 单个目标的检测结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectResult {
    /// 技术名 -> 版本（空串表示版本未知）
    pub technologies: DetectionMap,
    /// 抓取失败的探针路径
    pub failed_paths: Vec<String>,
}

impl DetectResult {
    /// 补充规则元数据，按技术名排序
    pub fn to_technologies(&self, store: &RuleStore) -> Vec<Technology> {
        self.technologies
            .iter()
            .map(|(name, version)| store.describe(name, version))
            .collect()
    }

    fn mark_failed(&mut self, path: &str) {
        if !self.failed_paths.iter().any(|p| p == path) {
            self.failed_paths.push(path.to_string());
        }
    }
}

/// 技术检测器
#[derive(Clone)]
pub struct TechDetector {
    store: Arc<RuleStore>,
    fetcher: Arc<dyn PageFetcher>,
    augmenter: Option<Arc<dyn Augmenter>>,
    config: GlobalConfig,
}

impl fmt::Debug for TechDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TechDetector")
            .field("fingerprints", &self.store.len())
            .field("augmenter", &self.augmenter.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TechDetector {
    /// 创建检测器（从配置路径加载规则）
    pub async fn new(config: GlobalConfig) -> TdResult<Self> {
        let store = RuleLoader::load(&config).await?;
        info!("Loaded {} fingerprints from {}", store.len(), config.fingerprints_path.display());
        Self::with_store(Arc::new(store), config)
    }

    /// 使用已加载的规则库和默认 HTTP 抓取器
    pub fn with_store(store: Arc<RuleStore>, config: GlobalConfig) -> TdResult<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(store, Arc::new(fetcher), config))
    }

    /// 使用自定义抓取器
    pub fn with_fetcher(store: Arc<RuleStore>, fetcher: Arc<dyn PageFetcher>, config: GlobalConfig) -> Self {
        Self {
            store,
            fetcher,
            augmenter: None,
            config,
        }
    }

    /// 挂载增强器（`detect_full` 时生效）
    pub fn with_augmenter(mut self, augmenter: Arc<dyn Augmenter>) -> Self {
        self.augmenter = Some(augmenter);
        self
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// 仅 HTTP 阶段
    pub async fn detect_http_only(&self, url: &str) -> TdResult<DetectResult> {
        self.detect(url, false).await
    }

    /// HTTP 阶段 + 增强阶段
    pub async fn detect_full(&self, url: &str) -> TdResult<DetectResult> {
        self.detect(url, true).await
    }

    /// 核心检测接口
    pub async fn detect(&self, url: &str, include_augmentation: bool) -> TdResult<DetectResult> {
        let target = Url::parse(url)?;
        if !matches!(target.scheme(), "http" | "https") {
            return Err(TechDetectError::InvalidInput(format!("unsupported scheme in {}", url)));
        }

        let mut result = DetectResult::default();
        let groups = PathClassifier::classify(&self.store);
        debug!("{} unique paths to probe on {}", groups.len(), url);

        let mut fatal = false;
        for group in &groups {
            // 目标已不可达，剩余路径不再请求
            if fatal {
                result.mark_failed(&group.path);
                continue;
            }

            let path_url = join_probe_path(url, &group.path);
            match fetch_with_retry(self.fetcher.as_ref(), &path_url, &group.request, &self.config.retry).await {
                Ok(ctx) => Self::evaluate_group(group, &ctx, &mut result.technologies),
                Err(e) => {
                    if e.is_fatal_network() {
                        warn!("Target {} unreachable, skipping remaining paths: {}", url, e);
                        fatal = true;
                    } else {
                        debug!("Fetching {} failed: {}", path_url, e);
                    }
                    result.mark_failed(&group.path);
                }
            }
        }

        if include_augmentation {
            self.augment(url, &mut result.technologies).await;
        }

        DetectionUpdater::apply_implies(&self.store, &mut result.technologies);
        Ok(result)
    }

    /// 对一个路径的上下文求值其所有技术的探针；每个技术第一个命中的探针胜出
    fn evaluate_group(group: &PathClassification<'_>, ctx: &DetectionContext, detected: &mut DetectionMap) {
        for (tech, probes) in &group.technologies {
            for probe in probes {
                let outcome = QueryEvaluator::evaluate(&probe.detect, ctx);
                if !outcome.matched {
                    continue;
                }
                let mut version = outcome.version;
                if version.is_empty() {
                    version = QueryEvaluator::extract_version(&probe.extract_version, ctx).unwrap_or_default();
                }
                debug!("{} matched on {} (version {:?})", tech, group.path, version);
                DetectionUpdater::update(detected, tech.to_string(), version);
                break;
            }
        }
    }

    /// 增强器拿到结果副本；失败或超时保留原结果
    async fn augment(&self, url: &str, detected: &mut DetectionMap) {
        let Some(augmenter) = &self.augmenter else {
            debug!("No augmenter configured, skipping augmentation for {}", url);
            return;
        };

        let snapshot = detected.clone();
        let run = augmenter.augment(url, &self.store, snapshot);
        match tokio::time::timeout(self.config.augment_timeout, run).await {
            Ok(Ok(augmented)) => DetectionUpdater::merge(detected, augmented),
            Ok(Err(e)) => warn!("Augmentation failed for {}, keeping HTTP results: {}", url, e),
            Err(_) => warn!(
                "Augmentation timed out after {:?} for {}, keeping HTTP results",
                self.config.augment_timeout, url
            ),
        }
    }
}
