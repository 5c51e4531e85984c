//! 规则存储
//!
//! `RuleStore` 是规则引擎访问规则定义的唯一入口。引擎只依赖该 trait，
//! 内存实现用于测试和演示，PostgreSQL 实现位于服务层。

use crate::error::{Result, RuleError};
use crate::models::{NewRule, Rule, RulePatch};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// 规则存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// 获取对象类型下的启用规则，按 (created_at, id) 升序
    async fn list_active_rules(&self, object_type: &str) -> Result<Vec<Rule>>;

    /// 获取全部规则，按 object_type 升序、created_at 降序
    async fn list_all(&self) -> Result<Vec<Rule>>;

    async fn get(&self, id: Uuid) -> Result<Rule>;

    async fn create(&self, input: NewRule) -> Result<Rule>;

    async fn update(&self, id: Uuid, patch: RulePatch) -> Result<Rule>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// 基于 DashMap 的内存规则存储
#[derive(Clone, Default)]
pub struct InMemoryRuleStore {
    rules: Arc<DashMap<Uuid, Rule>>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        let store = Self::new();
        for rule in rules {
            store.insert(rule);
        }
        store
    }

    /// 直接写入一条完整规则，已存在则覆盖
    pub fn insert(&self, rule: Rule) {
        self.rules.insert(rule.id, rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[instrument(skip(self))]
    pub fn clear(&self) {
        let count = self.rules.len();
        self.rules.clear();
        info!("已清空 {} 条规则", count);
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn list_active_rules(&self, object_type: &str) -> Result<Vec<Rule>> {
        let mut rules: Vec<Rule> = self
            .rules
            .iter()
            .filter(|r| r.is_active && r.object_type == object_type)
            .map(|r| r.value().clone())
            .collect();

        rules.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rules)
    }

    async fn list_all(&self) -> Result<Vec<Rule>> {
        let mut rules: Vec<Rule> = self.rules.iter().map(|r| r.value().clone()).collect();

        rules.sort_by(|a, b| {
            a.object_type
                .cmp(&b.object_type)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(rules)
    }

    async fn get(&self, id: Uuid) -> Result<Rule> {
        self.rules
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or_else(|| RuleError::RuleNotFound(id.to_string()))
    }

    #[instrument(skip(self, input), fields(object_type = %input.object_type))]
    async fn create(&self, input: NewRule) -> Result<Rule> {
        let rule = Rule::from_new(input);
        self.rules.insert(rule.id, rule.clone());

        info!(rule_id = %rule.id, "规则已创建");
        Ok(rule)
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: Uuid, patch: RulePatch) -> Result<Rule> {
        let Some(mut entry) = self.rules.get_mut(&id) else {
            warn!("更新不存在的规则: {}", id);
            return Err(RuleError::RuleNotFound(id.to_string()));
        };

        entry.apply(patch);
        info!("规则已更新: {}", id);
        Ok(entry.value().clone())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<()> {
        if self.rules.remove(&id).is_some() {
            info!("规则已删除: {}", id);
            Ok(())
        } else {
            warn!("删除不存在的规则: {}", id);
            Err(RuleError::RuleNotFound(id.to_string()))
        }
    }
}
