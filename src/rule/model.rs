//! 规则数据模型定义
//! 加载后只读，检测期间在多个目标之间共享

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::compiler::{Query, VersionRule, deserialize_version_rules};

/// 技术检测结果（含规则元数据）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Technology {
    pub name: String,
    /// 空串表示已检测到但版本未知
    pub version: String,
    pub categories: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpe: Option<String>,
}

impl Technology {
    /// 从名称快速创建（默认值）
    pub fn from_name(name: String) -> Self {
        Self {
            name,
            version: String::new(),
            categories: Vec::new(),
            website: None,
            description: None,
            icon: None,
            cpe: None,
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} {}", self.name, self.version)
        }
    }
}

/// 请求覆盖配置（缺省为无额外 Header 的 GET）
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct RequestConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// 不透明请求体
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RequestConfig {
    /// 规范化后的请求方法（大写，缺省 GET）
    pub fn method_name(&self) -> String {
        match self.method.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m.to_uppercase(),
            _ => "GET".to_string(),
        }
    }

    /// 请求形态键，用于路径归类
    pub fn shape_key(&self) -> String {
        let headers = self
            .headers
            .iter()
            .map(|(k, v)| format!("{}={}", k.to_lowercase(), v))
            .collect::<Vec<_>>()
            .join("&");
        let body = match &self.body {
            None | Some(Value::Null) => String::new(),
            Some(body) => body.to_string(),
        };
        format!("{} {} {}", self.method_name(), headers, body)
    }
}

/// HTTP 探针
#[derive(Debug, Clone, Deserialize)]
pub struct HttpProbe {
    pub path: String,
    #[serde(default)]
    pub request: Option<RequestConfig>,
    /// 检测表达式（缺失视为永不匹配）
    #[serde(default)]
    pub detect: Query,
    #[serde(default, deserialize_with = "deserialize_version_rules")]
    pub extract_version: Vec<VersionRule>,
}

impl HttpProbe {
    pub fn request_config(&self) -> RequestConfig {
        self.request.clone().unwrap_or_default()
    }
}

/// 脚本类增强探针（由外部脚本运行时执行）
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AugmentProbe {
    pub path: String,
    #[serde(default)]
    pub detection: String,
    #[serde(default)]
    pub version: String,
}

impl AugmentProbe {
    pub fn has_detection_capability(&self) -> bool {
        !self.detection.is_empty()
    }

    pub fn has_version_capability(&self) -> bool {
        !self.version.is_empty()
    }
}

/// 单个技术的完整指纹
#[derive(Debug, Clone, Deserialize)]
pub struct Fingerprint {
    #[serde(rename = "cats", alias = "categories", default)]
    pub categories: Vec<u32>,
    #[serde(default, deserialize_with = "deserialize_implies")]
    pub implies: Vec<String>,
    #[serde(default)]
    pub paths: Vec<HttpProbe>,
    #[serde(rename = "browser", alias = "augmentation", default)]
    pub augmentation: Vec<AugmentProbe>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub cpe: Option<String>,
}

/// 规则文件结构
#[derive(Debug, Clone, Deserialize)]
pub struct FingerprintDb {
    #[serde(default)]
    pub apps: HashMap<String, Fingerprint>,
}

/// implies 兼容字符串（逗号分隔）与数组两种写法
fn deserialize_implies<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    let mut implied = Vec::new();
    match value {
        Some(Value::String(s)) => {
            for tech in s.split(',') {
                let tech = tech.trim();
                if !tech.is_empty() {
                    implied.push(tech.to_string());
                }
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                if let Value::String(s) = item {
                    let tech = s.trim();
                    if !tech.is_empty() {
                        implied.push(tech.to_string());
                    }
                }
            }
        }
        Some(Value::Null) | None => {}
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "implies must be a string or list, got {}",
                other
            )));
        }
    }
    Ok(implied)
}

/// 规则库：技术名 -> 指纹，加载一次后只读
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    fingerprints: HashMap<String, Fingerprint>,
}

impl RuleStore {
    pub fn new(fingerprints: HashMap<String, Fingerprint>) -> Self {
        Self { fingerprints }
    }

    pub fn get(&self, name: &str) -> Option<&Fingerprint> {
        self.fingerprints.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fingerprints.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// 按名称排序遍历，保证归类与推导顺序确定
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&String, &Fingerprint)> {
        let mut entries: Vec<_> = self.fingerprints.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter()
    }

    pub fn implies_of(&self, name: &str) -> &[String] {
        self.fingerprints
            .get(name)
            .map(|fp| fp.implies.as_slice())
            .unwrap_or(&[])
    }

    /// 合并另一份规则（同名覆盖）
    pub fn extend(&mut self, fingerprints: HashMap<String, Fingerprint>) {
        self.fingerprints.extend(fingerprints);
    }

    /// 为检测结果补充规则元数据
    pub fn describe(&self, name: &str, version: &str) -> Technology {
        let mut tech = Technology::from_name(name.to_string());
        tech.version = version.to_string();
        if let Some(fp) = self.fingerprints.get(name) {
            tech.categories = fp.categories.clone();
            tech.website = fp.website.clone();
            tech.description = fp.description.clone();
            tech.icon = fp.icon.clone();
            tech.cpe = fp.cpe.clone();
        }
        tech
    }
}
