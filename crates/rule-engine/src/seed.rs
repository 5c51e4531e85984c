//! 演示规则
//!
//! 覆盖工单、联系人、资产三类业务对象的常用校验，供内存存储启动时加载。

use crate::models::Rule;
use chrono::{Duration, Utc};

const DEMO_RULES: &[(&str, &str, &str)] = &[
    ("WorkOrder", "ISBLANK(Priority)", "Priority is required."),
    (
        "WorkOrder",
        "Estimated_Cost = 0",
        "Estimated cost must be greater than zero.",
    ),
    (
        "WorkOrder",
        "Start_Date < TODAY()",
        "Start date cannot be in the past.",
    ),
    (
        "WorkOrder",
        "End_Date <= Start_Date",
        "End date must be later than start date.",
    ),
    (
        "WorkOrder",
        "AND(Status = \"Open\", ISBLANK(Priority))",
        "Priority must be set when status is open.",
    ),
    ("Contact", "ISBLANK(Email)", "Email is required for contacts."),
    (
        "Contact",
        "ISBLANK(Phone)",
        "Phone number is required for contacts.",
    ),
    ("Asset", "ISBLANK(Asset_Tag)", "Asset tag is required."),
    (
        "Asset",
        "Purchase_Price <= 0",
        "Purchase price must be greater than zero.",
    ),
];

/// 生成演示规则，created_at 依次递增以保持定义顺序
pub fn demo_rules() -> Vec<Rule> {
    let base = Utc::now();

    DEMO_RULES
        .iter()
        .enumerate()
        .map(|(i, (object_type, expression, message))| {
            let mut rule = Rule::new(*object_type, *expression, *message);
            rule.created_at = base + Duration::milliseconds(i as i64);
            rule.updated_at = rule.created_at;
            rule
        })
        .collect()
}
