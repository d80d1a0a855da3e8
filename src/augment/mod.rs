//! 增强阶段：在 HTTP 检测结果之上追加/升级结果的外部协作方接口
//! 协作方只拿到结果副本，失败时引擎保留增强前的结果
pub mod browser;

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::TdResult;
use crate::rule::{AugmentProbe, RuleStore};
use crate::utils::DetectionMap;

pub use self::browser::{BrowserAugmenter, ScriptRuntime};

/// 增强器
#[async_trait]
pub trait Augmenter: Send + Sync {
    /// `results` 为引擎结果的副本，返回增强后的结果
    async fn augment(&self, base_url: &str, store: &RuleStore, results: DetectionMap) -> TdResult<DetectionMap>;
}

/// 按路径分组的增强探针
#[derive(Debug, Clone)]
pub struct AugmentClassification<'a> {
    pub path: String,
    pub technologies: Vec<(&'a str, Vec<&'a AugmentProbe>)>,
}

/// 把所有技术的增强探针按路径分组
pub fn classify_augmentation(store: &RuleStore) -> Vec<AugmentClassification<'_>> {
    let mut groups: BTreeMap<&str, AugmentClassification<'_>> = BTreeMap::new();

    for (name, fingerprint) in store.iter_sorted() {
        for probe in &fingerprint.augmentation {
            let group = groups
                .entry(probe.path.as_str())
                .or_insert_with(|| AugmentClassification {
                    path: probe.path.clone(),
                    technologies: Vec::new(),
                });
            let continues_last = group
                .technologies
                .last()
                .is_some_and(|(tech, _)| *tech == name.as_str());
            if !continues_last {
                group.technologies.push((name.as_str(), Vec::new()));
            }
            if let Some((_, probes)) = group.technologies.last_mut() {
                probes.push(probe);
            }
        }
    }

    groups.into_values().collect()
}

/// 是否需要对该技术运行增强探针
/// 未检测到：探针需具备检测脚本；已检测但无版本：探针需具备版本脚本；已有版本：跳过
pub fn should_run_probe(tech: &str, results: &DetectionMap, probe: &AugmentProbe) -> bool {
    match results.get(tech) {
        None => probe.has_detection_capability(),
        Some(version) if !version.is_empty() => false,
        Some(_) => probe.has_version_capability(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(detection: &str, version: &str) -> AugmentProbe {
        AugmentProbe {
            path: "/".to_string(),
            detection: detection.to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn test_should_run_probe() {
        let mut results = DetectionMap::new();
        results.insert("React".into(), String::new());
        results.insert("jQuery".into(), "3.7.1".into());

        assert!(should_run_probe("Vue", &results, &probe("return !!window.Vue;", "")));
        assert!(!should_run_probe("Vue", &results, &probe("", "return Vue.version;")));
        assert!(should_run_probe("React", &results, &probe("", "return React.version;")));
        assert!(!should_run_probe("React", &results, &probe("return true;", "")));
        assert!(!should_run_probe("jQuery", &results, &probe("return true;", "return jQuery.fn.jquery;")));
    }
}
