//! PostgreSQL 规则存储
//!
//! 规则保存在 `validation_rules` 表，表结构见工作区根目录 migrations/。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rule_engine::{NewRule, Result, Rule, RuleError, RulePatch, RuleStore};
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

/// 规则表查询结果
#[derive(Debug, sqlx::FromRow)]
struct RuleRow {
    id: Uuid,
    object_type: String,
    expression: String,
    error_message: String,
    is_active: bool,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RuleRow> for Rule {
    fn from(row: RuleRow) -> Self {
        Self {
            id: row.id,
            object_type: row.object_type,
            expression: row.expression,
            error_message: row.error_message,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const RULE_COLUMNS: &str = r#"
    id, object_type, expression, error_message, is_active, created_by, created_at, updated_at
"#;

fn store_error(err: sqlx::Error) -> RuleError {
    RuleError::Store(err.to_string())
}

/// 基于 sqlx 的规则存储
#[derive(Clone)]
pub struct PgRuleStore {
    pool: PgPool,
}

impl PgRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RuleStore for PgRuleStore {
    #[instrument(skip(self))]
    async fn list_active_rules(&self, object_type: &str) -> Result<Vec<Rule>> {
        let sql = format!(
            "SELECT {} FROM validation_rules \
             WHERE object_type = $1 AND is_active = true \
             ORDER BY created_at ASC, id ASC",
            RULE_COLUMNS
        );

        let rows = sqlx::query_as::<_, RuleRow>(&sql)
            .bind(object_type)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        debug!(count = rows.len(), "Loaded active rules");
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Rule>> {
        let sql = format!(
            "SELECT {} FROM validation_rules \
             ORDER BY object_type ASC, created_at DESC, id ASC",
            RULE_COLUMNS
        );

        let rows = sqlx::query_as::<_, RuleRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn get(&self, id: Uuid) -> Result<Rule> {
        let sql = format!("SELECT {} FROM validation_rules WHERE id = $1", RULE_COLUMNS);

        sqlx::query_as::<_, RuleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?
            .map(Into::into)
            .ok_or_else(|| RuleError::RuleNotFound(id.to_string()))
    }

    #[instrument(skip(self, input), fields(object_type = %input.object_type))]
    async fn create(&self, input: NewRule) -> Result<Rule> {
        let rule = Rule::from_new(input);
        let sql = format!(
            "INSERT INTO validation_rules ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {}",
            RULE_COLUMNS, RULE_COLUMNS
        );

        let row = sqlx::query_as::<_, RuleRow>(&sql)
            .bind(rule.id)
            .bind(&rule.object_type)
            .bind(&rule.expression)
            .bind(&rule.error_message)
            .bind(rule.is_active)
            .bind(rule.created_by)
            .bind(rule.created_at)
            .bind(rule.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(row.into())
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: Uuid, patch: RulePatch) -> Result<Rule> {
        let sql = format!(
            "UPDATE validation_rules SET \
                object_type = COALESCE($2, object_type), \
                expression = COALESCE($3, expression), \
                error_message = COALESCE($4, error_message), \
                is_active = COALESCE($5, is_active), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            RULE_COLUMNS
        );

        sqlx::query_as::<_, RuleRow>(&sql)
            .bind(id)
            .bind(patch.object_type)
            .bind(patch.expression)
            .bind(patch.error_message)
            .bind(patch.is_active)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?
            .map(Into::into)
            .ok_or_else(|| RuleError::RuleNotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM validation_rules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(RuleError::RuleNotFound(id.to_string()));
        }
        Ok(())
    }
}
