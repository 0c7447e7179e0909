//! Source location tracking.
//!
//! A [`Span`] is a contiguous byte-offset region of source text. Every token,
//! AST node, IR node, and diagnostic carries one, so errors and source maps
//! can point at the exact characters they describe.
//!
//! Byte offsets match Rust's slicing semantics: `&source[span.start..span.end]`
//! extracts the spanned text. Human-facing output (diagnostic rendering, the
//! source-map artifact) needs 1-based line/column positions instead; a
//! [`LineIndex`] built once per source resolves offsets to [`Location`]s
//! without rescanning the text.

use serde::Serialize;

/// A byte-offset range in source text.
///
/// Spans are `Copy` and cheap to pass around. [`Span::merge`] combines the
/// spans of sub-expressions into the span of a compound node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    /// Byte offset of the first character (inclusive).
    pub start: usize,
    /// Byte offset past the last character (exclusive).
    pub end: usize,
}

impl Span {
    /// Creates a span from byte offsets. No validation is performed.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Covers from the start of `self` to the end of `other`.
    ///
    /// The span of `a + b` is `a.span.merge(b.span)`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if this span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A resolved 1-based source position, as exposed in source maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

/// Precomputed line-start table for offset → line/column resolution.
///
/// Built once per source string; lookups are a binary search over the line
/// starts. Offsets past the end of the source clamp to the final position.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Scans `source` and records the byte offset of every line start.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        LineIndex {
            line_starts,
            len: source.len(),
        }
    }

    /// Resolves a byte offset to a 1-based `(line, column)` pair.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        (line + 1, offset - self.line_starts[line] + 1)
    }

    /// Resolves a span to a full start/end [`Location`].
    pub fn location(&self, span: Span) -> Location {
        let (line, column) = self.position(span.start);
        let (end_line, end_column) = self.position(span.end);
        Location {
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// Returns the 1-based line number and the text of the line containing
    /// `offset`, for diagnostic rendering.
    pub fn line_text<'s>(&self, source: &'s str, offset: usize) -> (usize, usize, &'s str) {
        let (line, _) = self.position(offset);
        let start = self.line_starts[line - 1];
        let end = self
            .line_starts
            .get(line)
            .map(|next| next.saturating_sub(1))
            .unwrap_or(source.len());
        (line, start, &source[start..end.max(start)])
    }
}
