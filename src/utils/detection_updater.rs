//! 检测结果更新工具
//! 负责更新检测结果（只升级版本、不降级）以及 implies 推导闭包

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::rule::RuleStore;

/// 检测结果：技术名 -> 版本（空串表示版本未知）
pub type DetectionMap = BTreeMap<String, String>;

/// 检测结果更新工具
pub struct DetectionUpdater;

impl DetectionUpdater {
    /// 更新检测结果；已有非空版本不会被覆盖，空版本可被升级
    /// 返回结果是否发生变化
    pub fn update(detected: &mut DetectionMap, tech_name: String, version: String) -> bool {
        match detected.entry(tech_name) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if existing.is_empty() && !version.is_empty() {
                    *existing = version;
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(version);
                true
            }
        }
    }

    /// 合并另一份结果（逐项走 update 规则）
    pub fn merge(detected: &mut DetectionMap, other: DetectionMap) {
        for (tech_name, version) in other {
            Self::update(detected, tech_name, version);
        }
    }

    /// 应用关联推导规则（implies），直到一轮遍历不再新增为止
    pub fn apply_implies(store: &RuleStore, detected: &mut DetectionMap) {
        loop {
            let implied: Vec<String> = detected
                .keys()
                .flat_map(|name| store.implies_of(name).iter())
                .filter(|implied| !detected.contains_key(implied.as_str()))
                .cloned()
                .collect();

            if implied.is_empty() {
                break;
            }
            for tech in implied {
                detected.entry(tech).or_default();
            }
        }
    }
}
