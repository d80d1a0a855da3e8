//! 路径归类：把所有技术的 HTTP 探针按 (路径, 请求形态) 分组
//! 同一路径只抓取一次，无论有多少技术在探测它

use std::collections::BTreeMap;

use crate::rule::{HttpProbe, RequestConfig, RuleStore};

/// 一个待抓取的唯一路径及共享它的探针
#[derive(Debug, Clone)]
pub struct PathClassification<'a> {
    pub path: String,
    pub request: RequestConfig,
    /// 技术名 -> 该技术在此路径上的探针（保持声明顺序）
    pub technologies: Vec<(&'a str, Vec<&'a HttpProbe>)>,
}

/// 路径归类器（纯函数，每次检测重新计算）
pub struct PathClassifier;

impl PathClassifier {
    pub fn classify(store: &RuleStore) -> Vec<PathClassification<'_>> {
        let mut groups: BTreeMap<(String, String), PathClassification<'_>> = BTreeMap::new();

        for (name, fingerprint) in store.iter_sorted() {
            for probe in &fingerprint.paths {
                let request = probe.request_config();
                let key = (probe.path.clone(), request.shape_key());
                let group = groups.entry(key).or_insert_with(|| PathClassification {
                    path: probe.path.clone(),
                    request,
                    technologies: Vec::new(),
                });

                // 同一技术的探针连续出现，直接追加到最后一项
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleLoader;

    fn store() -> RuleStore {
        RuleLoader::load_from_str(
            r#"{ "apps": {
                "Nginx": { "paths": [{ "path": "/", "detect": { "headers.server": { "$regex": "nginx" } } }] },
                "WordPress": { "paths": [
                    { "path": "/", "detect": { "body": { "$regex": "wp-content" } } },
                    { "path": "/wp-login.php", "detect": { "body": { "$regex": "wp-submit" } } },
                    { "path": "/", "detect": { "body": { "$regex": "wp-json" } } }
                ] },
                "GraphQL": { "paths": [{
                    "path": "/",
                    "request": { "method": "POST", "headers": { "Content-Type": "application/json" }, "body": { "query": "{__typename}" } },
                    "detect": { "body": { "$regex": "__typename" } }
                }] },
                "Static": {}
            } }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_shared_path_is_grouped_once() {
        let store = store();
        let groups = PathClassifier::classify(&store);
        assert_eq!(groups.len(), 3);

        let root_get: Vec<_> = groups
            .iter()
            .filter(|g| g.path == "/" && g.request.method_name() == "GET")
            .collect();
        assert_eq!(root_get.len(), 1);
        let techs: Vec<&str> = root_get[0].technologies.iter().map(|(t, _)| *t).collect();
        assert_eq!(techs, vec!["Nginx", "WordPress"]);
        // WordPress 在 "/" 上的两个探针保持声明顺序
        assert_eq!(root_get[0].technologies[1].1.len(), 2);
    }

    #[test]
    fn test_request_shape_splits_groups() {
        let store = store();
        let groups = PathClassifier::classify(&store);
        let post = groups
            .iter()
            .find(|g| g.request.method_name() == "POST")
            .unwrap();
        assert_eq!(post.path, "/");
        assert_eq!(post.technologies.len(), 1);
        assert_eq!(post.technologies[0].0, "GraphQL");
    }

    #[test]
    fn test_empty_store_has_no_groups() {
        assert!(PathClassifier::classify(&RuleStore::default()).is_empty());
    }
}
