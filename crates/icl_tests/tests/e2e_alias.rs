//! E2E: the opt-in alias normalizer through the full pipeline.

mod common;

use icl_compile::compile::{CompileOptions, Compiler};
use icl_language::alias::AliasMode;

fn compile_natural(source: &str, mode: AliasMode, target: &str) -> (String, usize) {
    let compiler = Compiler::new();
    let options = CompileOptions {
        targets: vec![target.to_string()],
        alias_mode: Some(mode),
        alias_trace: true,
        ..CompileOptions::default()
    };
    let outcome = compiler.compile(source, &options).unwrap();
    let text = outcome.targets[0]
        .result
        .as_ref()
        .unwrap()
        .bundle
        .primary_text()
        .to_string();
    let rewrites = outcome.alias_trace.map(|t| t.len()).unwrap_or(0);
    (text, rewrites)
}

#[test]
fn core_alias_block_function_compiles() {
    let (text, rewrites) = compile_natural(
        "function double(n:Num):Num { return n * 2; } prnt(double(4));",
        AliasMode::Core,
        "python",
    );
    assert_eq!(
        text,
        "def double(n):\n    return (n * 2)\nprint(double(4))\n"
    );
    assert_eq!(rewrites, 3);
}

#[test]
fn extended_aliases_cover_logic_words() {
    let (text, rewrites) = compile_natural(
        "flag := yes and not no; show(flag);",
        AliasMode::Extended,
        "javascript",
    );
    assert_eq!(
        text,
        "let flag = (true && (!false));\nconsole.log(flag);\n"
    );
    // yes, and, not, no, show.
    assert_eq!(rewrites, 5);
}

#[test]
fn core_mode_leaves_extended_words_to_the_lexer() {
    let compiler = Compiler::new();
    let options = CompileOptions {
        targets: vec!["python".to_string()],
        alias_mode: Some(AliasMode::Core),
        ..CompileOptions::default()
    };
    // `and` stays an identifier in core mode, so analysis rejects it.
    let outcome = compiler.compile("flag := yes and no;", &options);
    assert!(outcome.is_err());
}

#[test]
fn aliases_inside_strings_and_comments_stay_verbatim() {
    let (text, rewrites) = compile_natural(
        "s := \"show and return\"; // show it\nshow(s);",
        AliasMode::Extended,
        "python",
    );
    assert_eq!(text, "s = \"show and return\"\nprint(s)\n");
    assert_eq!(rewrites, 1);
}

#[test]
fn trace_is_off_unless_requested() {
    let compiler = Compiler::new();
    let options = CompileOptions {
        targets: vec!["python".to_string()],
        alias_mode: Some(AliasMode::Core),
        alias_trace: false,
        ..CompileOptions::default()
    };
    let outcome = compiler.compile("show(1);", &options).unwrap();
    assert!(outcome.alias_trace.is_none());
}

#[test]
fn normalizer_is_off_by_default() {
    // Without --natural, `show` is an unknown identifier, not print.
    let codes = common::check_codes("show(1);");
    assert_eq!(codes, vec!["SEM011"]);
}
