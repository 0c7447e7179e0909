//! Opt-in alias normalization.
//!
//! A preprocessing pass that rewrites natural-word aliases into canonical
//! ICL tokens before lexing. String literals and `//` comments pass through
//! untouched; outside those regions, whole words (identifier boundaries as
//! the lexer defines them) are looked up in the selected table:
//!
//! | Mode | Rewrites |
//! |------|----------|
//! | core | `function`/`mkfn`→`fn`, `lambda`→`lam`, `return`→`ret`, `when`→`if`, `repeat`→`loop`, `within`→`in`, `prnt`/`show`→`print` |
//! | extended | core plus `and`→`&&`, `or`→`\|\|`, `not`→`!`, `yes`→`true`, `no`→`false` |
//!
//! The pass returns the rewritten text with an ordered trace of every
//! rewrite. As a safety net it re-lexes its own output: if the original text
//! lexed cleanly but the rewritten text does not, the rewrite changed lexical
//! structure and the pass fails with `ALI001` pointing at the responsible
//! rewrite. The normalizer is off by default and enabled by the host
//! (`--natural`, `--alias-mode`).

use crate::lexer::Lexer;
use icl_base::{codes, Diagnostic, DiagnosticList, Interner, Span};
use serde::Serialize;

/// Which rewrite table to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasMode {
    Core,
    Extended,
}

const CORE_ALIASES: &[(&str, &str)] = &[
    ("function", "fn"),
    ("mkfn", "fn"),
    ("lambda", "lam"),
    ("return", "ret"),
    ("when", "if"),
    ("repeat", "loop"),
    ("within", "in"),
    ("prnt", "print"),
    ("show", "print"),
];

const EXTENDED_ALIASES: &[(&str, &str)] = &[
    ("and", "&&"),
    ("or", "||"),
    ("not", "!"),
    ("yes", "true"),
    ("no", "false"),
];

/// One recorded rewrite; spans index the *original* source.
#[derive(Debug, Clone, Serialize)]
pub struct AliasRewrite {
    pub from: String,
    pub to: String,
    pub span: Span,
}

fn lookup(word: &str, mode: AliasMode) -> Option<&'static str> {
    let core = CORE_ALIASES.iter().find(|(k, _)| *k == word);
    match (core, mode) {
        (Some((_, v)), _) => Some(v),
        (None, AliasMode::Extended) => EXTENDED_ALIASES
            .iter()
            .find(|(k, _)| *k == word)
            .map(|(_, v)| *v),
        (None, AliasMode::Core) => None,
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn lexes_cleanly(text: &str) -> Result<(), DiagnosticList> {
    let mut scratch = Interner::new();
    Lexer::new(text, &mut scratch).tokenize().map(|_| ())
}

/// Applies the alias table, returning the normalized text and rewrite trace.
pub fn normalize(
    source: &str,
    mode: AliasMode,
) -> Result<(String, Vec<AliasRewrite>), DiagnosticList> {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut trace = Vec::new();
    // Output offset of each rewrite, for mapping lex failures back.
    let mut out_positions = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        // String literal region: copy verbatim, honoring escapes.
        if b == b'"' {
            let start = i;
            i += 1;
            while i < bytes.len() && bytes[i] != b'"' && bytes[i] != b'\n' {
                if bytes[i] == b'\\' && i + 1 < bytes.len() {
                    i += 2;
                } else {
                    i += 1;
                }
            }
            if i < bytes.len() && bytes[i] == b'"' {
                i += 1;
            }
            out.push_str(&source[start..i]);
            continue;
        }

        // Line comment region: copy verbatim to end of line.
        if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
            let start = i;
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            out.push_str(&source[start..i]);
            continue;
        }

        if is_ident_start(b) {
            let start = i;
            while i < bytes.len() && is_ident_continue(bytes[i]) {
                i += 1;
            }
            let word = &source[start..i];
            if let Some(replacement) = lookup(word, mode) {
                out_positions.push(out.len());
                trace.push(AliasRewrite {
                    from: word.to_string(),
                    to: replacement.to_string(),
                    span: Span::new(start, i),
                });
                out.push_str(replacement);
            } else {
                out.push_str(word);
            }
            continue;
        }

        let ch = source[i..].chars().next().unwrap_or('\u{fffd}');
        out.push(ch);
        i += ch.len_utf8();
    }

    if trace.is_empty() {
        return Ok((out, trace));
    }

    // A rewrite must never change lexical structure: if the original lexed
    // cleanly but the rewritten text does not, blame the nearest rewrite.
    if let Err(diags) = lexes_cleanly(&out) {
        if lexes_cleanly(source).is_ok() {
            let error_pos = diags
                .iter()
                .find_map(|d| d.span)
                .map(|s| s.start)
                .unwrap_or(0);
            let culprit = out_positions
                .iter()
                .rposition(|&p| p <= error_pos)
                .unwrap_or(0);
            let rewrite = &trace[culprit];
            return Err(Diagnostic::error(
                codes::ALI_AMBIGUOUS_REWRITE,
                format!(
                    "alias rewrite '{}' -> '{}' produced an invalid token sequence",
                    rewrite.from, rewrite.to
                ),
            )
            .with_span(rewrite.span)
            .into());
        }
    }

    Ok((out, trace))
}
