//! Structured, phase-owned diagnostics.
//!
//! Every failure in the compiler is a [`Diagnostic`]: a stable code, a
//! human-readable message, an optional source [`Span`], and an optional hint.
//! Codes are grouped by the stage that owns them:
//!
//! | Family | Stage |
//! |--------|-------|
//! | `ALI*` | alias normalizer |
//! | `LEX*` | lexer |
//! | `PAR*` | parser |
//! | `SEM*` | semantic analyzer |
//! | `PLG*` | macro / syntax plug-ins |
//! | `PACK*` | pack manifest and registry |
//! | `LOW*` | lowering |
//! | `CLI*` | command-line usage |
//!
//! Stages accumulate diagnostics rather than stopping at the first problem:
//! lexical and parse errors aggregate per file, semantic errors per module,
//! lowering errors per target. The aggregate is a [`DiagnosticList`], which
//! is itself an error type so pipelines can propagate it with `?`.

use crate::span::{LineIndex, Span};
use serde::Serialize;
use std::fmt;

/// Stable diagnostic codes, one constant per error the compiler can report.
pub mod codes {
    /// Alias rewrite produced text that no longer lexes.
    pub const ALI_AMBIGUOUS_REWRITE: &str = "ALI001";

    /// Unexpected character in the input.
    pub const LEX_UNEXPECTED_CHAR: &str = "LEX001";
    /// String literal not closed before end of line or file.
    pub const LEX_UNTERMINATED_STRING: &str = "LEX002";

    /// Unexpected token while parsing an expression.
    pub const PAR_UNEXPECTED_TOKEN: &str = "PAR001";
    /// A statement or clause did not match its required form.
    pub const PAR_EXPECTED_FORM: &str = "PAR002";

    pub const SEM_UNKNOWN_IDENT: &str = "SEM001";
    pub const SEM_ANNOTATION_MISMATCH: &str = "SEM002";
    pub const SEM_CONDITION_NOT_BOOL: &str = "SEM003";
    pub const SEM_LOOP_BOUND_NOT_NUM: &str = "SEM004";
    pub const SEM_RETURN_OUTSIDE_FN: &str = "SEM005";
    pub const SEM_EXPR_BODY_MISMATCH: &str = "SEM006";
    pub const SEM_MISSING_RETURN: &str = "SEM007";
    pub const SEM_RETURN_TYPE_MISMATCH: &str = "SEM008";
    pub const SEM_UNKNOWN_TYPE: &str = "SEM009";
    pub const SEM_UNEXPANDED_MACRO: &str = "SEM010";
    pub const SEM_UNRESOLVED_CALLEE: &str = "SEM011";
    pub const SEM_ARITY_MISMATCH: &str = "SEM012";
    pub const SEM_UNARY_OPERAND: &str = "SEM013";
    pub const SEM_ARITHMETIC_OPERAND: &str = "SEM014";
    pub const SEM_COMPARISON_OPERAND: &str = "SEM015";
    pub const SEM_EQUALITY_OPERAND: &str = "SEM016";
    pub const SEM_LOGICAL_OPERAND: &str = "SEM017";
    pub const SEM_NOT_CALLABLE: &str = "SEM018";
    pub const SEM_DUPLICATE_FUNCTION: &str = "SEM019";
    pub const SEM_DUPLICATE_PARAM: &str = "SEM020";
    pub const SEM_INTERNAL: &str = "SEM098";
    pub const SEM_UNCLASSIFIED: &str = "SEM099";

    /// A registered macro expander failed.
    pub const PLG_EXPANDER_FAILED: &str = "PLG001";
    /// Macro name has no registered expander.
    pub const PLG_UNKNOWN_MACRO: &str = "PLG002";

    /// Manifest failed structural validation.
    pub const PACK_INVALID_MANIFEST: &str = "PACK001";
    /// No pack registered for the requested target id or alias.
    pub const PACK_UNKNOWN_TARGET: &str = "PACK002";
    /// Pack id or alias collides with an already-registered pack.
    pub const PACK_DUPLICATE_ID: &str = "PACK003";
    /// A stable pack failed a required contract case.
    pub const PACK_STABLE_GATE: &str = "PACK004";
    /// A pack specifier could not be resolved to a builder.
    pub const PACK_UNRESOLVED_SPEC: &str = "PACK005";

    /// Target pack does not cover a feature the source uses.
    pub const LOW_UNSUPPORTED_FEATURE: &str = "LOW001";
    /// Pack declared partial support; lowering emitted a fallback warning.
    pub const LOW_FALLBACK_WARNING: &str = "LOW002";
    /// Lowering applied a fallback substitution.
    pub const LOW_FALLBACK_SUBSTITUTION: &str = "LOW003";

    /// Invalid command-line usage.
    pub const CLI_USAGE: &str = "CLI001";
}

/// Whether a diagnostic blocks artifact production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    /// Emitted alongside an artifact (`LOW002`/`LOW003`).
    Warning,
}

/// One structured diagnostic: `{code, message, span?, hint?}`.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub severity: Severity,
}

impl Diagnostic {
    /// Creates an error diagnostic with no span or hint.
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            message: message.into(),
            span: None,
            hint: None,
            severity: Severity::Error,
        }
    }

    /// Creates a warning diagnostic (lowering fallbacks).
    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    /// Attaches a source span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attaches a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Renders the diagnostic against its source with a caret underline:
    ///
    /// ```text
    /// error[SEM001]: unknown identifier 'y'
    ///    3 | x := y + 1;
    ///      |      ^
    ///      | hint: define 'y' before using it
    /// ```
    pub fn render(&self, source: &str) -> String {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let mut out = format!("{}[{}]: {}", label, self.code, self.message);
        if let Some(span) = self.span {
            let index = LineIndex::new(source);
            let (line_num, line_start, line_text) = index.line_text(source, span.start);
            let col = span.start.saturating_sub(line_start);
            let width = span.len().max(1).min(line_text.len().saturating_sub(col).max(1));
            out.push_str(&format!(
                "\n{:4} | {}\n     | {}{}",
                line_num,
                line_text,
                " ".repeat(col),
                "^".repeat(width)
            ));
        }
        if let Some(hint) = &self.hint {
            out.push_str(&format!("\n     | hint: {}", hint));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(span) = self.span {
            write!(f, " at {}..{}", span.start, span.end)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// An aggregated, ordered collection of diagnostics from one stage.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct DiagnosticList {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: DiagnosticList) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// `true` if any entry is an [`Severity::Error`].
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Converts into `Err(self)` when errors are present.
    pub fn into_result(self) -> Result<(), DiagnosticList> {
        if self.has_errors() {
            Err(self)
        } else {
            Ok(())
        }
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl From<Diagnostic> for DiagnosticList {
    fn from(diagnostic: Diagnostic) -> Self {
        DiagnosticList {
            diagnostics: vec![diagnostic],
        }
    }
}

impl FromIterator<Diagnostic> for DiagnosticList {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        DiagnosticList {
            diagnostics: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for DiagnosticList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for DiagnosticList {}
