//! The tokenizer.
//!
//! Transforms source text into the flat token stream the compiler consumes.
//! The stream always terminates with a single `Eof` token. Bytes with no
//! lexical rule become `Unknown` tokens rather than errors; rejecting them
//! is the parser's job. The only lexical error is a string literal that
//! never closes.

use thiserror::Error;

use crate::cursor::Cursor;
use crate::token::{keyword_from_ident, Token, TokenKind};

/// A lexical error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("unterminated string literal starting at byte {at}")]
    UnterminatedString { at: usize },
}

/// Tokenizer over a source buffer.
///
/// # Example
///
/// ```
/// use zlox_lex::scanner::Scanner;
/// use zlox_lex::token::TokenKind;
///
/// let tokens = Scanner::scan_all("print 1;").unwrap();
/// let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     [TokenKind::Print, TokenKind::Number, TokenKind::Semicolon, TokenKind::Eof],
/// );
/// ```
pub struct Scanner<'src> {
    cursor: Cursor<'src>,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
        }
    }

    /// Tokenizes the whole source, including the terminating `Eof`.
    pub fn scan_all(source: &'src str) -> Result<Vec<Token<'src>>, ScanError> {
        let mut scanner = Scanner::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = scanner.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Scans the next token.
    pub fn next_token(&mut self) -> Result<Token<'src>, ScanError> {
        self.skip_trivia();

        let start = self.cursor.position();
        let Some(byte) = self.cursor.current() else {
            return Ok(Token::new(TokenKind::Eof, ""));
        };

        let kind = match byte {
            b'+' => self.single(TokenKind::Plus),
            b'-' => self.single(TokenKind::Minus),
            b'*' => self.single(TokenKind::Star),
            // A surviving slash is division; comments were consumed above.
            b'/' => self.single(TokenKind::Slash),
            b';' => self.single(TokenKind::Semicolon),
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b'>' => self.single(TokenKind::Greater),
            b'<' => self.single(TokenKind::Less),
            b'=' => {
                self.cursor.advance();
                if self.cursor.current() == Some(b'=') {
                    self.cursor.advance();
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                }
            }
            b'"' => self.string(start)?,
            b'0'..=b'9' => self.number(),
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.identifier(start),
            _ => self.unknown(),
        };

        Ok(Token::new(kind, self.cursor.slice_from(start)))
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.cursor.advance();
        kind
    }

    /// Scans a string literal; the lexeme keeps both quotes.
    fn string(&mut self, start: usize) -> Result<TokenKind, ScanError> {
        self.cursor.advance();
        loop {
            match self.cursor.current() {
                Some(b'"') => {
                    self.cursor.advance();
                    return Ok(TokenKind::Str);
                }
                Some(_) => self.cursor.advance(),
                None => return Err(ScanError::UnterminatedString { at: start }),
            }
        }
    }

    /// Scans `digits ('.' digits)?`. A dot not followed by a digit is left
    /// for the next token.
    fn number(&mut self) -> TokenKind {
        while matches!(self.cursor.current(), Some(b) if b.is_ascii_digit()) {
            self.cursor.advance();
        }
        if self.cursor.current() == Some(b'.')
            && matches!(self.cursor.peek(1), Some(b) if b.is_ascii_digit())
        {
            self.cursor.advance();
            while matches!(self.cursor.current(), Some(b) if b.is_ascii_digit()) {
                self.cursor.advance();
            }
        }
        TokenKind::Number
    }

    fn identifier(&mut self, start: usize) -> TokenKind {
        while matches!(
            self.cursor.current(),
            Some(b) if b.is_ascii_alphanumeric() || b == b'_'
        ) {
            self.cursor.advance();
        }
        keyword_from_ident(self.cursor.slice_from(start)).unwrap_or(TokenKind::Ident)
    }

    /// Steps over one whole UTF-8 scalar so the lexeme stays on character
    /// boundaries even for bytes the language has no use for.
    fn unknown(&mut self) -> TokenKind {
        self.cursor.advance();
        while matches!(self.cursor.current(), Some(b) if b & 0xc0 == 0x80) {
            self.cursor.advance();
        }
        TokenKind::Unknown
    }

    /// Skips whitespace and `//` line comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.cursor.current() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => self.cursor.advance(),
                Some(b'/') if self.cursor.peek(1) == Some(b'/') => {
                    while !matches!(self.cursor.current(), Some(b'\n') | None) {
                        self.cursor.advance();
                    }
                }
                _ => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::scan_all(source)
            .unwrap()
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn empty_source_is_just_eof() {
        assert_eq!(kinds(""), [TokenKind::Eof]);
        assert_eq!(kinds("   \t\r\n"), [TokenKind::Eof]);
    }

    #[test]
    fn operators_and_delimiters() {
        assert_eq!(
            kinds("+ - * / ; { } < >"),
            [
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Semicolon,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn equal_vs_equal_equal() {
        assert_eq!(
            kinds("= == = ==="),
            [
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Equal,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn numbers() {
        let tokens = Scanner::scan_all("12 3.5 0.25 7").unwrap();
        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme).collect();
        assert_eq!(lexemes, ["12", "3.5", "0.25", "7", ""]);
        assert!(tokens[..4].iter().all(|t| t.kind == TokenKind::Number));
    }

    #[test]
    fn trailing_dot_is_not_part_of_a_number() {
        let tokens = Scanner::scan_all("1.").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "1");
        assert_eq!(tokens[1].kind, TokenKind::Unknown);
        assert_eq!(tokens[1].lexeme, ".");
    }

    #[test]
    fn string_lexeme_keeps_quotes() {
        let tokens = Scanner::scan_all("\"hello world\"").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].lexeme, "\"hello world\"");
    }

    #[test]
    fn unterminated_string_reports_start_offset() {
        assert_eq!(
            Scanner::scan_all("print \"oops"),
            Err(ScanError::UnterminatedString { at: 6 })
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("var x = true; print nil; false varx"),
            [
                TokenKind::Var,
                TokenKind::Ident,
                TokenKind::Equal,
                TokenKind::True,
                TokenKind::Semicolon,
                TokenKind::Print,
                TokenKind::Nil,
                TokenKind::Semicolon,
                TokenKind::False,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn line_comments_are_skipped() {
        assert_eq!(
            kinds("1 // the rest is noise ;;;\n2 // and no trailing newline"),
            [TokenKind::Number, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn unknown_bytes_become_unknown_tokens() {
        let tokens = Scanner::scan_all("1 @ 2").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Unknown);
        assert_eq!(tokens[1].lexeme, "@");
    }

    #[test]
    fn unknown_multibyte_char_stays_on_boundaries() {
        let tokens = Scanner::scan_all("1 é 2").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Unknown);
        assert_eq!(tokens[1].lexeme, "é");
        assert_eq!(tokens[2].kind, TokenKind::Number);
    }

    #[test]
    fn statement_shaped_input() {
        assert_eq!(
            kinds("var x = 1 + 2 * 3; { print x == \"s\"; }"),
            [
                TokenKind::Var,
                TokenKind::Ident,
                TokenKind::Equal,
                TokenKind::Number,
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::Star,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::LBrace,
                TokenKind::Print,
                TokenKind::Ident,
                TokenKind::EqualEqual,
                TokenKind::Str,
                TokenKind::Semicolon,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Scanning any input terminates with `Eof` or the unterminated
        /// string error, and never panics.
        #[test]
        fn scan_any_input(source in ".*") {
            match Scanner::scan_all(&source) {
                Ok(tokens) => {
                    prop_assert!(!tokens.is_empty());
                    prop_assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
                    // Exactly one Eof, and it is last.
                    prop_assert_eq!(
                        tokens.iter().filter(|t| t.kind == TokenKind::Eof).count(),
                        1
                    );
                }
                Err(ScanError::UnterminatedString { at }) => {
                    prop_assert!(at < source.len());
                }
            }
        }

        /// Every lexeme of every token is a slice of the input.
        #[test]
        fn lexemes_are_substrings(source in ".*") {
            if let Ok(tokens) = Scanner::scan_all(&source) {
                for token in &tokens {
                    prop_assert!(
                        token.lexeme.is_empty() || source.contains(token.lexeme)
                    );
                }
            }
        }
    }
}
