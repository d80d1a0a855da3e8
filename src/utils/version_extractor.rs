//! 版本提取工具模块
//! 负责从正则捕获结果中取出版本号（约定为第一个捕获分组）

use regex::Captures;

/// 版本提取工具类
pub struct VersionExtractor;

impl VersionExtractor {
    /// 取第一个捕获分组作为版本号
    ///
    /// # 返回值
    /// - `Some(String)`: 分组 1 参与了匹配且非空
    /// - `None`: 正则没有捕获分组，或分组 1 未参与匹配/为空
    pub fn first_group(captures: &Captures) -> Option<String> {
        captures
            .get(1)
            .map(|m| m.as_str())
            .filter(|version| !version.is_empty())
            .map(str::to_string)
    }
}
