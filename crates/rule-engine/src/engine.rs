//! 规则引擎门面
//!
//! 从规则存储读取对象类型下的启用规则，逐条编译并求值，收集触发规则的错误消息。
//!
//! 规则表达式本身的任何错误（词法、语法、求值）都按“失败即触发”处理：
//! 该规则的错误消息照常输出，同时记录告警日志、诊断信息和失败指标。
//! 存储层错误不属于规则失败，直接返回给调用方。

use crate::compiler::{EngineLimits, RuleCompiler};
use crate::error::{Result, RuleError};
use crate::evaluator::Evaluator;
use crate::models::{
    EvaluationOutcome, EvaluationResponse, ExpressionTestResult, FieldRecord, NewRule, Rule,
    RuleDiagnostic, RulePatch, RuleReport,
};
use crate::store::RuleStore;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// 规则引擎
#[derive(Clone)]
pub struct RuleEngine {
    store: Arc<dyn RuleStore>,
    compiler: Arc<RuleCompiler>,
}

impl RuleEngine {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self::with_limits(store, EngineLimits::default())
    }

    pub fn with_limits(store: Arc<dyn RuleStore>, limits: EngineLimits) -> Self {
        Self::with_compiler(store, Arc::new(RuleCompiler::with_limits(limits)))
    }

    pub fn with_compiler(store: Arc<dyn RuleStore>, compiler: Arc<RuleCompiler>) -> Self {
        Self { store, compiler }
    }

    pub fn store(&self) -> &Arc<dyn RuleStore> {
        &self.store
    }

    pub fn compiler(&self) -> &Arc<RuleCompiler> {
        &self.compiler
    }

    /// 对记录执行对象类型下的全部启用规则
    pub async fn evaluate_rules(
        &self,
        object_type: &str,
        record: &FieldRecord,
    ) -> Result<EvaluationOutcome> {
        self.evaluate_rules_on(object_type, record, Local::now().date_naive())
            .await
    }

    /// 以指定日期作为 `TODAY()` 执行规则
    #[instrument(skip(self, record), fields(fields = record.len()))]
    pub async fn evaluate_rules_on(
        &self,
        object_type: &str,
        record: &FieldRecord,
        today: NaiveDate,
    ) -> Result<EvaluationOutcome> {
        let start = Instant::now();

        let rules = self.store.list_active_rules(object_type).await?;
        let outcome = self.evaluate_loaded(&rules, record, today);

        metrics::histogram!(
            "rule_evaluation_duration_seconds",
            "object_type" => object_type.to_string()
        )
        .record(start.elapsed().as_secs_f64());

        debug!(
            rules = rules.len(),
            fired = outcome.fired_count(),
            "规则校验完成"
        );

        Ok(outcome)
    }

    /// 对已加载的规则求值，规则按传入顺序执行
    pub fn evaluate_loaded(
        &self,
        rules: &[Rule],
        record: &FieldRecord,
        today: NaiveDate,
    ) -> EvaluationOutcome {
        let evaluator = Evaluator::with_today(record, today);
        let mut outcome = EvaluationOutcome {
            messages: Vec::new(),
            reports: Vec::with_capacity(rules.len()),
        };

        for rule in rules {
            let result = self
                .compiler
                .compile(&rule.expression)
                .and_then(|compiled| {
                    evaluator
                        .evaluate_predicate(&compiled.ast)
                        .map_err(RuleError::from)
                });

            let report = match result {
                Ok(fired) => {
                    record_evaluation(&rule.object_type, if fired { "fired" } else { "passed" });
                    RuleReport {
                        rule_id: rule.id,
                        fired,
                        error: None,
                    }
                }
                Err(err) => {
                    let diagnostic = RuleDiagnostic {
                        rule_id: rule.id,
                        kind: err.kind().to_string(),
                        message: err.to_string(),
                    };
                    warn!(
                        rule_id = %rule.id,
                        kind = %diagnostic.kind,
                        expression = %rule.expression,
                        "规则执行失败, 按触发处理: {}",
                        diagnostic.message
                    );
                    record_evaluation(&rule.object_type, "error");
                    metrics::counter!("rule_failures_total", "kind" => err.kind()).increment(1);

                    RuleReport {
                        rule_id: rule.id,
                        fired: true,
                        error: Some(diagnostic),
                    }
                }
            };

            if report.fired {
                outcome.messages.push(rule.error_message.clone());
            }
            outcome.reports.push(report);
        }

        outcome
    }

    /// 以 JSON 表单数据执行校验
    pub async fn evaluate(
        &self,
        object_type: &str,
        form_data: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<EvaluationResponse> {
        let record = FieldRecord::from_json_map(form_data)?;
        let outcome = self.evaluate_rules(object_type, &record).await?;
        Ok(outcome.into_response())
    }

    /// 编译通过后保存新规则
    pub async fn create_rule(&self, input: NewRule) -> Result<Rule> {
        self.compiler.compile(&input.expression)?;
        self.store.create(input).await
    }

    /// 更新规则，表达式被替换时从编译缓存中移除旧表达式
    #[instrument(skip(self, patch))]
    pub async fn update_rule(&self, id: Uuid, patch: RulePatch) -> Result<Rule> {
        let Some(expression) = patch.expression.as_deref() else {
            return self.store.update(id, patch).await;
        };

        self.compiler.compile(expression)?;
        let previous = self.store.get(id).await?;
        let rule = self.store.update(id, patch).await?;

        if previous.expression != rule.expression {
            self.evict(&previous.expression);
        }
        Ok(rule)
    }

    /// 删除规则并移除其表达式的编译缓存
    #[instrument(skip(self))]
    pub async fn delete_rule(&self, id: Uuid) -> Result<()> {
        let previous = self.store.get(id).await?;
        self.store.delete(id).await?;
        self.evict(&previous.expression);
        Ok(())
    }

    // 其他规则若使用相同表达式，下次求值时重新编译
    fn evict(&self, expression: &str) {
        if self.compiler.invalidate(expression) {
            debug!(cached = self.compiler.len(), "已移除表达式编译缓存");
        }
    }

    /// 不经过规则存储，试运行单个表达式
    ///
    /// 与正式校验一致，表达式出错时视为触发并返回错误描述。表单数据不合法时返回错误。
    pub fn test_expression(
        &self,
        expression: &str,
        form_data: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<ExpressionTestResult> {
        let record = FieldRecord::from_json_map(form_data)?;
        Ok(self.test_expression_on(expression, &record, Local::now().date_naive()))
    }

    pub fn test_expression_on(
        &self,
        expression: &str,
        record: &FieldRecord,
        today: NaiveDate,
    ) -> ExpressionTestResult {
        let result = self
            .compiler
            .compile_uncached(expression)
            .and_then(|compiled| {
                Evaluator::with_today(record, today)
                    .evaluate_predicate(&compiled.ast)
                    .map_err(RuleError::from)
            });

        match result {
            Ok(fired) => ExpressionTestResult { fired, error: None },
            Err(err) => ExpressionTestResult {
                fired: true,
                error: Some(err.to_string()),
            },
        }
    }
}

fn record_evaluation(object_type: &str, result: &'static str) {
    metrics::counter!(
        "rule_evaluations_total",
        "object_type" => object_type.to_string(),
        "result" => result
    )
    .increment(1);
}
