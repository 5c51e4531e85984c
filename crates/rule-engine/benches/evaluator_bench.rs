//! 表达式引擎性能基准测试
//!
//! 分别测量词法+语法分析、求值、以及带缓存的整批规则执行。

use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rule_engine::{
    Evaluator, FieldRecord, InMemoryRuleStore, RuleCompiler, RuleEngine, parse, seed,
};
use std::hint::black_box;
use std::sync::Arc;

const EXPRESSIONS: &[(&str, &str)] = &[
    ("isblank", "ISBLANK(Priority)"),
    ("equality", "Estimated_Cost = 0"),
    ("date_compare", "Start_Date < TODAY()"),
    ("nested_logic", "OR(AND(Status = \"Open\", ISBLANK(Priority)), Estimated_Cost * 2 > 1000)"),
];

fn workorder_record() -> FieldRecord {
    FieldRecord::new()
        .with("Priority", "High")
        .with("Status", "Open")
        .with("Estimated_Cost", 150.0)
        .with("Start_Date", "2024-07-01")
        .with("End_Date", "2024-07-10")
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default()
}

/// 解析基准
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for (name, expression) in EXPRESSIONS {
        group.bench_with_input(BenchmarkId::from_parameter(name), expression, |b, expr| {
            b.iter(|| parse(black_box(expr)))
        });
    }

    group.finish();
}

/// 求值基准（语法树已就绪）
fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let record = workorder_record();

    for (name, expression) in EXPRESSIONS {
        let ast = parse(expression).expect("基准表达式应能解析");
        group.bench_with_input(BenchmarkId::from_parameter(name), &ast, |b, ast| {
            let evaluator = Evaluator::with_today(&record, today());
            b.iter(|| evaluator.evaluate(black_box(ast)))
        });
    }

    group.finish();
}

/// 编译缓存命中
fn bench_compile_cached(c: &mut Criterion) {
    let compiler = RuleCompiler::new();
    let expression = EXPRESSIONS[3].1;
    compiler.compile(expression).expect("基准表达式应能编译");

    c.bench_function("compile_cached", |b| {
        b.iter(|| compiler.compile(black_box(expression)))
    });
}

/// 整批规则执行（内存存储 + 演示规则）
fn bench_evaluate_rules(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("创建 tokio 运行时失败");
    let engine = RuleEngine::new(Arc::new(InMemoryRuleStore::with_rules(seed::demo_rules())));
    let record = workorder_record();

    c.bench_function("evaluate_rules_workorder", |b| {
        b.iter(|| {
            runtime.block_on(engine.evaluate_rules_on(
                black_box("WorkOrder"),
                black_box(&record),
                today(),
            ))
        })
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_evaluate,
    bench_compile_cached,
    bench_evaluate_rules,
);
criterion_main!(benches);
