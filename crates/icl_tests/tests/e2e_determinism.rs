//! E2E: the determinism contract — byte-stable emission, stable ids,
//! stable graph serialization.

mod common;

use icl_compile::compile::{CompileOptions, Compiler};

const SOURCES: &[&str] = &[
    "x := 1 + 2;",
    "fn add(a:Num,b:Num):Num => a+b; result := @add(3,4); @print(result);",
    "sum := 0; loop i in 0..10 { sum := sum + i; } @print(sum);",
    "if 1 < 2 ? { a := \"yes\"; @print(a); } : { @print(\"no\"); }",
    "f := lam(n:Num):Num => n * n; @print(f(9));",
];

fn full_compile(source: &str, optimize: bool) -> (Vec<String>, String, String) {
    let compiler = Compiler::new();
    let options = CompileOptions {
        targets: vec![
            "python".to_string(),
            "javascript".to_string(),
            "rust".to_string(),
            "web".to_string(),
        ],
        optimize,
        ..CompileOptions::default()
    };
    let outcome = compiler.compile(source, &options).unwrap();
    let texts = outcome
        .targets
        .iter()
        .map(|t| {
            t.result
                .as_ref()
                .map(|a| a.bundle.primary_text().to_string())
                .unwrap_or_default()
        })
        .collect();
    (
        texts,
        serde_json::to_string(&outcome.graph).unwrap(),
        serde_json::to_string(&outcome.source_map).unwrap(),
    )
}

#[test]
fn repeated_compilations_are_byte_identical() {
    for source in SOURCES {
        let (texts_a, graph_a, map_a) = full_compile(source, false);
        let (texts_b, graph_b, map_b) = full_compile(source, false);
        assert_eq!(texts_a, texts_b, "emission differs for: {}", source);
        assert_eq!(graph_a, graph_b, "graph differs for: {}", source);
        assert_eq!(map_a, map_b, "source map differs for: {}", source);
    }
}

#[test]
fn optimized_compilations_are_also_deterministic() {
    for source in SOURCES {
        let (texts_a, graph_a, _) = full_compile(source, true);
        let (texts_b, graph_b, _) = full_compile(source, true);
        assert_eq!(texts_a, texts_b);
        assert_eq!(graph_a, graph_b);
    }
}

#[test]
fn ir_ids_are_stable_across_runs() {
    let a = common::explain(SOURCES[1], None);
    let b = common::explain(SOURCES[1], None);
    assert_eq!(a["ir"], b["ir"]);
}

#[test]
fn optimizer_reuses_replaced_node_ids() {
    let compiler = Compiler::new();
    let plain = compiler
        .explain("x := 1 + 2; @print(x);", None, &CompileOptions::default())
        .unwrap();
    let optimized = compiler
        .explain(
            "x := 1 + 2; @print(x);",
            None,
            &CompileOptions {
                optimize: true,
                ..CompileOptions::default()
            },
        )
        .unwrap();
    let plain_value = &plain["ir"]["body"][0]["value"];
    let optimized_value = &optimized["ir"]["body"][0]["value"];
    assert_eq!(plain_value["kind"], "IRBinary");
    assert_eq!(optimized_value["kind"], "IRLiteral");
    assert_eq!(plain_value["id"], optimized_value["id"]);
    assert_eq!(optimized_value["value"]["value"], "3");
}

#[test]
fn unoptimized_output_is_unaffected_by_the_flag_existing() {
    // The optimizer must not run (and not perturb bytes) when disabled.
    let source = "dead := 1; x := 2 + 3; @print(x);";
    let (texts, _, _) = full_compile(source, false);
    assert!(texts[0].contains("dead = 1"));
    assert!(texts[0].contains("x = (2 + 3)"));

    let (optimized, _, _) = full_compile(source, true);
    assert!(!optimized[0].contains("dead"));
    assert!(optimized[0].contains("x = 5"));
}
