//! 表达式编译器
//!
//! 将规则表达式文本编译为语法树，并按表达式原文缓存编译结果。
//! 缓存条目插入后不再修改，可被多个并发求值共享。

use crate::ast::Expr;
use crate::error::{ParseError, Result};
use crate::lexer::tokenize;
use crate::parser::{DEFAULT_MAX_DEPTH, Parser};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// 表达式资源限制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineLimits {
    /// 表达式最大字节长度
    pub max_expression_length: usize,
    /// 语法树最大嵌套深度
    pub max_depth: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_expression_length: 4096,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// 编译后的表达式
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    /// 表达式原文
    pub source: String,
    pub ast: Expr,
    /// 表达式引用的字段
    pub required_fields: BTreeSet<String>,
}

/// 缓存统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompilerStats {
    pub cached: usize,
    pub hits: u64,
    pub misses: u64,
}

/// 带缓存的表达式编译器
pub struct RuleCompiler {
    limits: EngineLimits,
    cache: DashMap<String, Arc<CompiledExpression>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RuleCompiler {
    pub fn new() -> Self {
        Self::with_limits(EngineLimits::default())
    }

    pub fn with_limits(limits: EngineLimits) -> Self {
        Self {
            limits,
            cache: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn limits(&self) -> EngineLimits {
        self.limits
    }

    /// 编译表达式，命中缓存时直接返回
    ///
    /// 编译失败的表达式不会进入缓存。
    pub fn compile(&self, source: &str) -> Result<Arc<CompiledExpression>> {
        if let Some(hit) = self.cache.get(source) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(hit.value()));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let compiled = Arc::new(self.compile_uncached(source)?);

        // 并发编译同一表达式时保留先插入的结果
        let entry = self
            .cache
            .entry(source.to_string())
            .or_insert(compiled);

        debug!(expression = source, "表达式已编译");
        Ok(Arc::clone(entry.value()))
    }

    /// 编译表达式，不读写缓存
    pub fn compile_uncached(&self, source: &str) -> Result<CompiledExpression> {
        if source.len() > self.limits.max_expression_length {
            return Err(ParseError::new(
                self.limits.max_expression_length,
                format!(
                    "表达式长度 {} 超过上限 {}",
                    source.len(),
                    self.limits.max_expression_length
                ),
            )
            .into());
        }

        let tokens = tokenize(source)?;
        let ast = Parser::with_max_depth(tokens, self.limits.max_depth).parse()?;
        let required_fields = ast.referenced_fields();

        Ok(CompiledExpression {
            source: source.to_string(),
            ast,
            required_fields,
        })
    }

    /// 移除某个表达式的缓存
    pub fn invalidate(&self, source: &str) -> bool {
        self.cache.remove(source).is_some()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> CompilerStats {
        CompilerStats {
            cached: self.cache.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for RuleCompiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;

    #[test]
    fn test_compile_extracts_fields() {
        let compiler = RuleCompiler::new();
        let compiled = compiler
            .compile("AND(Status = \"Open\", ISBLANK(Priority))")
            .unwrap();

        assert!(compiled.required_fields.contains("Status"));
        assert!(compiled.required_fields.contains("Priority"));
        assert_eq!(compiled.required_fields.len(), 2);
    }

    #[test]
    fn test_cache_hits() {
        let compiler = RuleCompiler::new();
        let a = compiler.compile("Estimated_Cost = 0").unwrap();
        let b = compiler.compile("Estimated_Cost = 0").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(
            compiler.stats(),
            CompilerStats {
                cached: 1,
                hits: 1,
                misses: 1
            }
        );
    }

    #[test]
    fn test_cache_keyed_by_exact_text() {
        let compiler = RuleCompiler::new();
        compiler.compile("A = 1").unwrap();
        compiler.compile("A=1").unwrap();
        assert_eq!(compiler.len(), 2);
    }

    #[test]
    fn test_errors_not_cached() {
        let compiler = RuleCompiler::new();
        assert!(matches!(
            compiler.compile("ISBLANK(Priority"),
            Err(RuleError::Parse(_))
        ));
        assert!(matches!(compiler.compile("A # 1"), Err(RuleError::Lex(_))));
        assert!(compiler.is_empty());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let compiler = RuleCompiler::new();
        compiler.compile("A = 1").unwrap();
        compiler.compile("B = 2").unwrap();

        assert!(compiler.invalidate("A = 1"));
        assert!(!compiler.invalidate("A = 1"));
        assert_eq!(compiler.len(), 1);

        compiler.clear();
        assert!(compiler.is_empty());
    }

    #[test]
    fn test_length_limit() {
        let compiler = RuleCompiler::with_limits(EngineLimits {
            max_expression_length: 16,
            max_depth: 64,
        });

        assert!(compiler.compile("A = 1").is_ok());
        let err = compiler.compile("Some_Long_Field_Name = 1").unwrap_err();
        assert!(matches!(err, RuleError::Parse(_)));
    }

    #[test]
    fn test_depth_limit() {
        let compiler = RuleCompiler::with_limits(EngineLimits {
            max_expression_length: 4096,
            max_depth: 3,
        });

        assert!(compiler.compile("((A)) = 1").is_ok());
        assert!(compiler.compile("((((A)))) = 1").is_err());
    }

    #[test]
    fn test_limits_deserialize_with_defaults() {
        let limits: EngineLimits = serde_json::from_str(r#"{"max_depth": 8}"#).unwrap();
        assert_eq!(limits.max_depth, 8);
        assert_eq!(limits.max_expression_length, 4096);
    }
}
