//! 查询求值器：对单个检测上下文求值查询表达式，按需输出版本号
//! 纯函数，无共享可变状态；任何规则书写错误都退化为“不匹配”

use super::context::DetectionContext;
use crate::compiler::{CompiledPattern, FieldCondition, FieldRef, Operator, Query, VersionRule};
use crate::utils::VersionExtractor;

/// 求值结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    pub matched: bool,
    /// 空串表示无版本
    pub version: String,
}

impl MatchOutcome {
    pub fn miss() -> Self {
        Self::default()
    }

    pub fn hit(version: impl Into<String>) -> Self {
        Self {
            matched: true,
            version: version.into(),
        }
    }

    fn from_bool(matched: bool) -> Self {
        Self {
            matched,
            version: String::new(),
        }
    }
}

/// 查询求值器
pub struct QueryEvaluator;

impl QueryEvaluator {
    /// 求值查询表达式
    pub fn evaluate(query: &Query, ctx: &DetectionContext) -> MatchOutcome {
        match query {
            // 任一子项失败即短路；版本取最后一个非空子项版本
            Query::And(children) => {
                let mut version = String::new();
                for child in children {
                    let outcome = Self::evaluate(child, ctx);
                    if !outcome.matched {
                        return MatchOutcome::miss();
                    }
                    if !outcome.version.is_empty() {
                        version = outcome.version;
                    }
                }
                MatchOutcome::hit(version)
            }
            // 第一个匹配的子项胜出（含其版本）
            Query::Or(children) => children
                .iter()
                .map(|child| Self::evaluate(child, ctx))
                .find(|outcome| outcome.matched)
                .unwrap_or_default(),
            Query::Not(child) => MatchOutcome::from_bool(!Self::evaluate(child, ctx).matched),
            Query::Nor(children) => MatchOutcome::from_bool(
                !children.iter().any(|child| Self::evaluate(child, ctx).matched),
            ),
            Query::Field(condition) => Self::evaluate_field(condition, ctx),
            Query::Never => MatchOutcome::miss(),
        }
    }

    /// 解析字段值，缺失返回空串
    pub fn resolve_field<'a>(field: &FieldRef, ctx: &'a DetectionContext) -> &'a str {
        match field {
            FieldRef::Body => &ctx.body,
            FieldRef::Header(name) => ctx.header(name).unwrap_or(""),
            FieldRef::Unknown(_) => "",
        }
    }

    fn evaluate_field(condition: &FieldCondition, ctx: &DetectionContext) -> MatchOutcome {
        if matches!(condition.field, FieldRef::Unknown(_)) || condition.operators.is_empty() {
            return MatchOutcome::miss();
        }

        let value = Self::resolve_field(&condition.field, ctx);
        if value.is_empty() {
            // 字段缺失：只有 `$exists: false` 能成立
            let absent_expected = condition
                .operators
                .iter()
                .all(|op| matches!(op, Operator::Exists(false)));
            return MatchOutcome::from_bool(absent_expected);
        }

        let mut version = String::new();
        for operator in &condition.operators {
            let outcome = Self::evaluate_operator(operator, value);
            if !outcome.matched {
                return MatchOutcome::miss();
            }
            if !outcome.version.is_empty() {
                version = outcome.version;
            }
        }
        MatchOutcome::hit(version)
    }

    /// 对非空字段值求值单个操作符
    fn evaluate_operator(operator: &Operator, value: &str) -> MatchOutcome {
        match operator {
            Operator::Regex(pattern) => Self::evaluate_regex(pattern, value),
            Operator::Eq(expected) => MatchOutcome::from_bool(value == expected),
            Operator::Ne(expected) => MatchOutcome::from_bool(value != expected),
            Operator::Exists(should_exist) => MatchOutcome::from_bool(*should_exist),
            Operator::In(values) => MatchOutcome::from_bool(values.iter().any(|v| v == value)),
            Operator::Nin(values) => MatchOutcome::from_bool(!values.iter().any(|v| v == value)),
            Operator::Mismatched(_) => MatchOutcome::miss(),
        }
    }

    fn evaluate_regex(pattern: &CompiledPattern, value: &str) -> MatchOutcome {
        let Some(regex) = &pattern.regex else {
            return MatchOutcome::miss();
        };
        let Some(captures) = regex.captures(value) else {
            return MatchOutcome::miss();
        };
        let version = if pattern.has_version_marker {
            VersionExtractor::first_group(&captures).unwrap_or_default()
        } else {
            String::new()
        };
        MatchOutcome::hit(version)
    }

    /// 表达式匹配但无版本时的兜底版本提取：第一个捕获成功的规则胜出
    pub fn extract_version(rules: &[VersionRule], ctx: &DetectionContext) -> Option<String> {
        rules.iter().find_map(|rule| {
            let value = Self::resolve_field(&rule.field, ctx);
            if value.is_empty() {
                return None;
            }
            let captures = rule.pattern.regex.as_ref()?.captures(value)?;
            VersionExtractor::first_group(&captures)
        })
    }
}
