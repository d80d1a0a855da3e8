//! 编译模块：将规则中的查询树解码为可直接求值的结构
pub mod query;
pub mod compiler;

pub use self::query::{
    CompiledPattern, FieldCondition, FieldRef, Operator, Query, VersionRule,
    deserialize_version_rules, split_version_marker,
};
pub use self::compiler::QueryCompiler;
