//! E2E: the contract corpus and the stable gate.

mod common;

use icl_compile::contract::{contract_test, CORPUS};
use icl_compile::manifest::Stability;
use icl_compile::Compiler;

#[test]
fn every_builtin_pack_passes_the_corpus() {
    let compiler = Compiler::new();
    let report = contract_test(&compiler, None).unwrap();
    assert!(report.passed());
    assert_eq!(report.targets.len(), 4);
    for target in &report.targets {
        assert_eq!(target.outcomes.len(), CORPUS.len());
        for outcome in &target.outcomes {
            assert!(
                outcome.passed,
                "{} failed '{}': {:?}",
                target.target, outcome.case, outcome.detail
            );
        }
    }
}

#[test]
fn stable_packs_are_gated_at_one_hundred_percent() {
    let compiler = Compiler::new();
    let report = contract_test(&compiler, None).unwrap();
    for target in report
        .targets
        .iter()
        .filter(|t| t.stability == Stability::Stable)
    {
        assert!(target.gate_violation.is_none(), "{:?}", target.gate_violation);
        assert!(target.outcomes.iter().all(|o| o.passed));
    }
}

#[test]
fn corpus_covers_every_feature_id() {
    use icl_compile::compile::{front_end, CompileOptions};
    use icl_compile::features;
    use icl_language::macros::MacroRegistry;
    use std::collections::BTreeSet;

    let macros = MacroRegistry::with_builtins();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for case in CORPUS {
        let fe = front_end(case.source, &macros, &CompileOptions::default()).unwrap();
        for (feature, _) in features::features_used(&fe.ir, &fe.map) {
            seen.insert(feature);
        }
    }
    for feature in features::ALL {
        assert!(seen.contains(feature), "corpus never exercises '{}'", feature);
    }
}

#[test]
fn filtered_run_reports_only_requested_targets() {
    let compiler = Compiler::new();
    let report = contract_test(
        &compiler,
        Some(&["rust".to_string(), "web".to_string()]),
    )
    .unwrap();
    let names: Vec<&str> = report.targets.iter().map(|t| t.target.as_str()).collect();
    assert_eq!(names, vec!["rust", "web"]);
}

#[test]
fn report_serializes_for_the_cli() {
    let compiler = Compiler::new();
    let report = contract_test(&compiler, Some(&["python".to_string()])).unwrap();
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["targets"][0]["target"], "python");
    assert_eq!(value["targets"][0]["stability"], "stable");
    assert_eq!(value["targets"][0]["passed"], true);
    assert!(value["targets"][0]["outcomes"].as_array().unwrap().len() >= 10);
}
