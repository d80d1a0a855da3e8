//! Header格式转换工具
//! 将 reqwest 的 HeaderMap 合并进检测上下文（每个名称只保留首次出现的值）

use reqwest::header::HeaderMap;

use crate::detector::DetectionContext;

/// Header转换工具
pub struct HeaderConverter;

impl HeaderConverter {
    /// 合并一跳响应的 Header，已存在的名称（含更早跳）保持不变
    /// 返回新增的 Header 数
    pub fn merge_first_seen(header_map: &HeaderMap, ctx: &mut DetectionContext) -> usize {
        let mut added = 0;
        for name in header_map.keys() {
            // 同一响应内的重复 Header 取第一个值
            let Some(value) = header_map.get(name) else {
                continue;
            };
            let value = String::from_utf8_lossy(value.as_bytes());
            if ctx.insert_header_if_absent(name.as_str(), &value) {
                added += 1;
            }
        }
        added
    }
}
