//! The ICL lexer.
//!
//! A single-pass byte-cursor scanner from source text to the ordered token
//! stream. ICL is whitespace-insensitive (newlines do not terminate
//! statements), so the lexer has no structural stage; it only classifies:
//!
//! - identifiers `[A-Za-z_][A-Za-z0-9_]*`, with keywords reserved
//! - numbers: integers or single-decimal-point decimals
//! - strings: `"…"` with escapes `\n \t \" \\`
//! - `//` line comments (no tokens emitted)
//! - operators with maximal munch: `:= => .. == != <= >= && ||` win over
//!   their one-character prefixes
//!
//! Errors accumulate instead of aborting: an unexpected character (`LEX001`)
//! or unterminated string (`LEX002`) is recorded and scanning continues, so
//! one pass reports every lexical problem in the file.

use crate::token::{Token, TokenKind};
use icl_base::{codes, Diagnostic, DiagnosticList, Interner, Span, Symbol};

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Streaming scanner over one source string.
pub struct Lexer<'s, 'i> {
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
    interner: &'i mut Interner,
    diagnostics: DiagnosticList,
}

impl<'s, 'i> Lexer<'s, 'i> {
    pub fn new(source: &'s str, interner: &'i mut Interner) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            interner,
            diagnostics: DiagnosticList::new(),
        }
    }

    /// Scans the whole input. Returns the token stream (terminated by an
    /// `Eof` token) or the aggregated lexical diagnostics.
    pub fn tokenize(mut self) -> Result<Vec<Token>, DiagnosticList> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            if self.pos >= self.bytes.len() {
                let span = Span::new(self.pos, self.pos);
                tokens.push(Token::new(TokenKind::Eof, Symbol::EMPTY, span));
                break;
            }
            if let Some(token) = self.next_token() {
                tokens.push(token);
            }
        }
        if self.diagnostics.has_errors() {
            Err(self.diagnostics)
        } else {
            log::trace!("lexed {} tokens", tokens.len());
            Ok(tokens)
        }
    }

    fn skip_trivia(&mut self) {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                b'/' if self.peek_at(1) == Some(b'/') => {
                    while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn next_token(&mut self) -> Option<Token> {
        let start = self.pos;
        let b = self.bytes[self.pos];

        // Two-character operators take priority over their prefixes.
        if let Some(next) = self.peek_at(1) {
            let kind = match (b, next) {
                (b':', b'=') => Some(TokenKind::Assign),
                (b'=', b'>') => Some(TokenKind::FatArrow),
                (b'.', b'.') => Some(TokenKind::DotDot),
                (b'=', b'=') => Some(TokenKind::EqEq),
                (b'!', b'=') => Some(TokenKind::NotEq),
                (b'<', b'=') => Some(TokenKind::LtEq),
                (b'>', b'=') => Some(TokenKind::GtEq),
                (b'&', b'&') => Some(TokenKind::AndAnd),
                (b'|', b'|') => Some(TokenKind::OrOr),
                _ => None,
            };
            if let Some(kind) = kind {
                self.pos += 2;
                return Some(self.token(kind, start));
            }
        }

        let kind = match b {
            b':' => Some(TokenKind::Colon),
            b'?' => Some(TokenKind::Question),
            b'@' => Some(TokenKind::At),
            b'#' => Some(TokenKind::Hash),
            b'+' => Some(TokenKind::Plus),
            b'-' => Some(TokenKind::Minus),
            b'*' => Some(TokenKind::Star),
            b'/' => Some(TokenKind::Slash),
            b'%' => Some(TokenKind::Percent),
            b'<' => Some(TokenKind::Lt),
            b'>' => Some(TokenKind::Gt),
            b'!' => Some(TokenKind::Bang),
            b'(' => Some(TokenKind::LParen),
            b')' => Some(TokenKind::RParen),
            b'{' => Some(TokenKind::LBrace),
            b'}' => Some(TokenKind::RBrace),
            b',' => Some(TokenKind::Comma),
            b';' => Some(TokenKind::Semicolon),
            _ => None,
        };
        if let Some(kind) = kind {
            self.pos += 1;
            return Some(self.token(kind, start));
        }

        if b == b'"' {
            return self.scan_string(start);
        }
        if b.is_ascii_digit() {
            return Some(self.scan_number(start));
        }
        if is_ident_start(b) {
            return Some(self.scan_ident(start));
        }

        // Unknown byte: report once and resynchronize past the full
        // character so multi-byte input cannot split mid-codepoint.
        let ch = self.source[self.pos..].chars().next().unwrap_or('\u{fffd}');
        let width = ch.len_utf8();
        self.pos += width;
        self.diagnostics.push(
            Diagnostic::error(
                codes::LEX_UNEXPECTED_CHAR,
                format!("unexpected character '{}'", ch),
            )
            .with_span(Span::new(start, start + width)),
        );
        None
    }

    fn token(&mut self, kind: TokenKind, start: usize) -> Token {
        let lexeme = self.interner.intern(&self.source[start..self.pos]);
        Token::new(kind, lexeme, Span::new(start, self.pos))
    }

    fn scan_ident(&mut self, start: usize) -> Token {
        while self.pos < self.bytes.len() && is_ident_continue(self.bytes[self.pos]) {
            self.pos += 1;
        }
        let word = &self.source[start..self.pos];
        let kind = TokenKind::keyword(word).unwrap_or(TokenKind::Ident);
        let lexeme = self.interner.intern(word);
        Token::new(kind, lexeme, Span::new(start, self.pos))
    }

    fn scan_number(&mut self, start: usize) -> Token {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        // A single decimal point, and only when a digit follows: `0..3`
        // must lex as Number DotDot Number.
        if self.bytes.get(self.pos) == Some(&b'.')
            && self.peek_at(1).is_some_and(|b| b.is_ascii_digit())
        {
            self.pos += 1;
            while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        }
        self.token(TokenKind::Number, start)
    }

    fn scan_string(&mut self, start: usize) -> Option<Token> {
        self.pos += 1; // opening quote
        let mut value = String::new();
        loop {
            match self.bytes.get(self.pos) {
                None | Some(b'\n') => {
                    self.diagnostics.push(
                        Diagnostic::error(
                            codes::LEX_UNTERMINATED_STRING,
                            "unterminated string literal",
                        )
                        .with_span(Span::new(start, self.pos))
                        .with_hint("close the string with '\"' before the end of the line"),
                    );
                    return None;
                }
                Some(b'"') => {
                    self.pos += 1;
                    let lexeme = self.interner.intern(&value);
                    return Some(Token::new(
                        TokenKind::Str,
                        lexeme,
                        Span::new(start, self.pos),
                    ));
                }
                Some(b'\\') => {
                    let escape_start = self.pos;
                    self.pos += 1;
                    match self.bytes.get(self.pos) {
                        Some(b'n') => value.push('\n'),
                        Some(b't') => value.push('\t'),
                        Some(b'"') => value.push('"'),
                        Some(b'\\') => value.push('\\'),
                        other => {
                            self.diagnostics.push(
                                Diagnostic::error(
                                    codes::LEX_UNEXPECTED_CHAR,
                                    "unknown escape sequence in string literal",
                                )
                                .with_span(Span::new(escape_start, self.pos + 1))
                                .with_hint("valid escapes are \\n \\t \\\" \\\\"),
                            );
                            if let Some(&b) = other {
                                value.push(b as char);
                            }
                        }
                    }
                    self.pos += 1;
                }
                Some(_) => {
                    let ch = self.source[self.pos..].chars().next().unwrap_or('\u{fffd}');
                    value.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
    }
}
