//! 查询表达式模型
//! 规则中的 `detect` 树在加载期被解码为以下强类型结构，检测期只做求值

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::compiler::QueryCompiler;

/// 版本标记分隔符（`pattern\;version:\1`），兼容不带反斜杠的写法
const VERSION_MARKERS: [&str; 2] = ["\\;version:", ";version:"];

/// 字段引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRef {
    /// 完整响应体
    Body,
    /// 指定响应头（大小写不敏感）
    Header(String),
    /// 无法识别的字段，永不匹配
    Unknown(String),
}

impl FieldRef {
    /// 解析 `body` / `headers.<name>`
    pub fn parse(path: &str) -> Self {
        match path.split_once('.') {
            None if path == "body" => FieldRef::Body,
            Some(("headers", name)) if !name.is_empty() => FieldRef::Header(name.to_string()),
            _ => FieldRef::Unknown(path.to_string()),
        }
    }
}

/// 编译后的正则模式
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub raw: String,
    /// 编译失败时为 None，求值时视为不匹配
    pub regex: Option<Regex>,
    pub has_version_marker: bool,
}

impl CompiledPattern {
    /// 剥离版本标记后编译
    pub fn compile(raw: &str) -> Self {
        let (pattern, has_version_marker) = split_version_marker(raw);
        let regex = match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::debug!("Pattern {:?} does not compile, treated as non-match: {}", pattern, e);
                None
            }
        };
        Self {
            raw: raw.to_string(),
            regex,
            has_version_marker,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }
}

/// 返回 (去除标记后的正则, 是否携带版本标记)
pub fn split_version_marker(raw: &str) -> (&str, bool) {
    for marker in VERSION_MARKERS {
        if let Some(idx) = raw.find(marker) {
            return (&raw[..idx], true);
        }
    }
    (raw, false)
}

/// 字段操作符
#[derive(Debug, Clone)]
pub enum Operator {
    Regex(CompiledPattern),
    Eq(String),
    Ne(String),
    Exists(bool),
    In(Vec<String>),
    Nin(Vec<String>),
    /// 操作数类型与操作符不符（如 `$eq: 5`）
    Mismatched(String),
}

/// 字段条件：字段引用 + 一个或多个操作符（全部满足才匹配）
#[derive(Debug, Clone)]
pub struct FieldCondition {
    pub field: FieldRef,
    pub operators: Vec<Operator>,
}

/// 查询表达式
#[derive(Debug, Clone, Default)]
pub enum Query {
    And(Vec<Query>),
    Or(Vec<Query>),
    Not(Box<Query>),
    Nor(Vec<Query>),
    Field(FieldCondition),
    /// 结构非法的节点，永不匹配
    #[default]
    Never,
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(QueryCompiler::compile(&value))
    }
}

/// 独立版本提取规则（字段 -> 正则）
#[derive(Debug, Clone)]
pub struct VersionRule {
    pub field: FieldRef,
    pub pattern: CompiledPattern,
}

/// `extract_version` 列表反序列化：每项为单键映射，多键按键序展开
pub fn deserialize_version_rules<'de, D>(deserializer: D) -> Result<Vec<VersionRule>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Map<String, Value>>> = Option::deserialize(deserializer)?;
    Ok(QueryCompiler::compile_version_rules(raw.unwrap_or_default()))
}
