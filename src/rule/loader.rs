//! 规则加载管理器
//! 负责从本地目录、单个文件或内存数据加载指纹规则库

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::model::{Fingerprint, FingerprintDb, RuleStore};
use crate::config::GlobalConfig;
use crate::error::{TdResult, TechDetectError};

/// 规则加载管理器
pub struct RuleLoader;

impl RuleLoader {
    /// 按配置加载规则库
    pub async fn load(config: &GlobalConfig) -> TdResult<RuleStore> {
        Self::load_path(&config.fingerprints_path).await
    }

    /// 加载目录（全部 *.json）或单个文件
    pub async fn load_path(path: &Path) -> TdResult<RuleStore> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            TechDetectError::RuleLoadError(format!("cannot access {}: {}", path.display(), e))
        })?;

        let store = if metadata.is_dir() {
            Self::load_dir(path).await?
        } else {
            RuleStore::new(Self::load_file(path).await?)
        };

        if store.is_empty() {
            warn!("No fingerprints found under {}", path.display());
        }
        debug!("Loaded {} fingerprints from {}", store.len(), path.display());
        Ok(store)
    }

    /// 加载目录下全部 JSON 文件（按文件名排序，后者覆盖同名规则）
    async fn load_dir(dir: &Path) -> TdResult<RuleStore> {
        let mut files: Vec<PathBuf> = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();

        let mut store = RuleStore::default();
        for file in files {
            let fingerprints = Self::load_file(&file).await?;
            debug!("{}: {} fingerprints", file.display(), fingerprints.len());
            store.extend(fingerprints);
        }
        Ok(store)
    }

    async fn load_file(path: &Path) -> TdResult<HashMap<String, Fingerprint>> {
        let data = tokio::fs::read(path).await?;
        Self::parse_slice(&data).map_err(|e| {
            TechDetectError::RuleLoadError(format!("failed to load {}: {}", path.display(), e))
        })
    }

    /// 从 JSON 字符串加载
    pub fn load_from_str(json: &str) -> TdResult<RuleStore> {
        Self::load_from_slice(json.as_bytes())
    }

    /// 从 JSON 字节加载
    pub fn load_from_slice(data: &[u8]) -> TdResult<RuleStore> {
        let fingerprints = Self::parse_slice(data)
            .map_err(|e| TechDetectError::RuleLoadError(e.to_string()))?;
        Ok(RuleStore::new(fingerprints))
    }

    fn parse_slice(data: &[u8]) -> TdResult<HashMap<String, Fingerprint>> {
        let db: FingerprintDb = serde_json::from_slice(data)?;
        Ok(db.apps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CMS_RULES: &str = r#"{
        "apps": {
            "Example": {
                "cats": [1],
                "implies": ["PHP"],
                "paths": [{ "path": "/", "detect": { "body": { "$regex": "Example CMS" } } }]
            },
            "PHP": { "cats": [27] }
        }
    }"#;

    #[test]
    fn test_load_from_str() {
        let store = RuleLoader::load_from_str(CMS_RULES).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.implies_of("Example"), ["PHP".to_string()]);
        assert!(store.implies_of("PHP").is_empty());
    }

    #[test]
    fn test_malformed_rules_are_load_errors() {
        let err = RuleLoader::load_from_str(r#"{ "apps": { "X": { "paths": 5 } } }"#).unwrap_err();
        assert!(matches!(err, TechDetectError::RuleLoadError(_)));
        assert!(RuleLoader::load_from_str("not json").is_err());
    }

    #[tokio::test]
    async fn test_load_dir_merges_sorted_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = std::fs::File::create(dir.path().join("a.json")).unwrap();
        a.write_all(CMS_RULES.as_bytes()).unwrap();
        let mut b = std::fs::File::create(dir.path().join("b.json")).unwrap();
        b.write_all(br#"{ "apps": { "PHP": { "cats": [27], "website": "https://php.net" } } }"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = RuleLoader::load_path(dir.path()).await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("PHP").unwrap().website.as_deref(), Some("https://php.net"));
    }

    #[tokio::test]
    async fn test_missing_path_is_load_error() {
        let err = RuleLoader::load_path(Path::new("/definitely/not/here")).await.unwrap_err();
        assert!(matches!(err, TechDetectError::RuleLoadError(_)));
    }
}
