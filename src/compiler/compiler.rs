//! 查询编译器
//! 将 JSON 形式的 `detect` 树一次性解码为 [`Query`]，非法结构解码为永不匹配的节点

use serde_json::{Map, Value};
use tracing::debug;

use super::query::{CompiledPattern, FieldCondition, FieldRef, Operator, Query, VersionRule};

/// 查询编译器
pub struct QueryCompiler;

impl QueryCompiler {
    /// 编译查询树
    pub fn compile(value: &Value) -> Query {
        let Value::Object(map) = value else {
            return Query::Never;
        };

        let mut clauses: Vec<Query> = map
            .iter()
            .map(|(key, value)| Self::compile_entry(key, value))
            .collect();

        match clauses.len() {
            0 => Query::Never,
            1 => clauses.remove(0),
            // 多键对象按键序隐式 AND
            _ => Query::And(clauses),
        }
    }

    fn compile_entry(key: &str, value: &Value) -> Query {
        match key {
            "$or" => Self::compile_list(value).map_or(Query::Never, Query::Or),
            "$and" => Self::compile_list(value).map_or(Query::Never, Query::And),
            "$nor" => Self::compile_list(value).map_or(Query::Never, Query::Nor),
            "$not" => match value {
                Value::Object(_) => Query::Not(Box::new(Self::compile(value))),
                _ => Query::Never,
            },
            field => Self::compile_field(field, value),
        }
    }

    /// 组合子的数组参数；非数组返回 None
    fn compile_list(value: &Value) -> Option<Vec<Query>> {
        match value {
            Value::Array(items) => Some(items.iter().map(Self::compile).collect()),
            _ => None,
        }
    }

    fn compile_field(path: &str, condition: &Value) -> Query {
        let field = FieldRef::parse(path);
        if let FieldRef::Unknown(name) = &field {
            debug!("Unknown field reference {:?}, condition never matches", name);
            return Query::Never;
        }

        let Value::Object(ops) = condition else {
            return Query::Never;
        };

        let operators = Self::compile_operators(ops);
        if operators.is_empty() {
            return Query::Never;
        }

        Query::Field(FieldCondition { field, operators })
    }

    fn compile_operators(ops: &Map<String, Value>) -> Vec<Operator> {
        ops.iter()
            .filter_map(|(op, operand)| {
                let operator = match op.as_str() {
                    "$regex" => match operand {
                        Value::String(s) => Operator::Regex(CompiledPattern::compile(s)),
                        _ => Operator::Mismatched(op.clone()),
                    },
                    "$eq" => match operand {
                        Value::String(s) => Operator::Eq(s.clone()),
                        _ => Operator::Mismatched(op.clone()),
                    },
                    "$ne" => match operand {
                        Value::String(s) => Operator::Ne(s.clone()),
                        _ => Operator::Mismatched(op.clone()),
                    },
                    "$exists" => match operand {
                        Value::Bool(b) => Operator::Exists(*b),
                        _ => Operator::Mismatched(op.clone()),
                    },
                    "$in" => Self::string_list(operand).map_or(Operator::Mismatched(op.clone()), Operator::In),
                    "$nin" => Self::string_list(operand).map_or(Operator::Mismatched(op.clone()), Operator::Nin),
                    other => {
                        debug!("Ignoring unknown operator {:?}", other);
                        return None;
                    }
                };
                Some(operator)
            })
            .collect()
    }

    /// 成员运算的操作数：数组中的非字符串元素忽略
    fn string_list(operand: &Value) -> Option<Vec<String>> {
        let Value::Array(items) = operand else {
            return None;
        };
        Some(
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
        )
    }

    /// 编译 `extract_version` 规则列表
    pub fn compile_version_rules(raw: Vec<Map<String, Value>>) -> Vec<VersionRule> {
        raw.into_iter()
            .flat_map(|rule| rule.into_iter())
            .filter_map(|(field, pattern)| {
                let Value::String(pattern) = pattern else {
                    return None;
                };
                Some(VersionRule {
                    field: FieldRef::parse(&field),
                    pattern: CompiledPattern::compile(&pattern),
                })
            })
            .collect()
    }
}
