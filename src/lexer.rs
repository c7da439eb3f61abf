//! Single-pass tokenizer: maximal munch over a source buffer.
//!
//! Mirrors the scanning algorithm of a classic hand-rolled C tokenizer:
//! longest-match punctuators first, then identifier/keyword, then numeric
//! and literal scanning, with comments and whitespace handled inline.

use crate::error::{CompileError, Result};
use crate::intern::Interner;
use crate::span::Span;
use crate::token::{Keyword, Punct, Token, TokenKind};

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    interner: &'a mut Interner,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, interner: &'a mut Interner) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            interner,
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek(0)?;
        self.pos += 1;
        Some(b)
    }

    /// Scans the whole buffer, including whitespace and newline tokens, as
    /// the preprocessor stage would need them. Terminated by `Eof`.
    pub fn tokenize_raw(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.is_eof();
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    /// Scans the buffer and drops whitespace/newline tokens, the sweep a
    /// preprocessor performs once macro expansion is finished.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let raw = self.tokenize_raw()?;
        Ok(strip_preprocessor_only_tokens(raw))
    }

    fn next_token(&mut self) -> Result<Token> {
        let start = self.pos;
        match self.peek(0) {
            None => Ok(Token::new(TokenKind::Eof, Span::new(start, start))),
            Some(b' ') | Some(b'\t') | Some(b'\r') => {
                while matches!(self.peek(0), Some(b' ') | Some(b'\t') | Some(b'\r')) {
                    self.pos += 1;
                }
                Ok(Token::new(TokenKind::Whitespace, Span::new(start, self.pos)))
            }
            Some(b'\n') => {
                self.pos += 1;
                Ok(Token::new(TokenKind::Newline, Span::new(start, self.pos)))
            }
            Some(b'/') if self.peek(1) == Some(b'/') => {
                while !matches!(self.peek(0), None | Some(b'\n')) {
                    self.pos += 1;
                }
                Ok(Token::new(TokenKind::Whitespace, Span::new(start, self.pos)))
            }
            Some(b'/') if self.peek(1) == Some(b'*') => {
                self.pos += 2;
                loop {
                    match (self.peek(0), self.peek(1)) {
                        (Some(b'*'), Some(b'/')) => {
                            self.pos += 2;
                            break;
                        }
                        (Some(_), _) => self.pos += 1,
                        (None, _) => {
                            return Err(CompileError::lexical(
                                "unclosed block comment",
                                Span::new(start, self.pos),
                            ))
                        }
                    }
                }
                Ok(Token::new(TokenKind::Whitespace, Span::new(start, self.pos)))
            }
            Some(b) if b == b'_' || b.is_ascii_alphabetic() => self.scan_ident_or_keyword(start),
            Some(b) if b.is_ascii_digit() => self.scan_number(start),
            Some(b'\'') => self.scan_char_literal(start),
            Some(b'"') => self.scan_string_literal(start),
            Some(b'#') => {
                self.pos += 1;
                if self.peek(0) == Some(b'#') {
                    self.pos += 1;
                    Ok(Token::new(TokenKind::HashHash, Span::new(start, self.pos)))
                } else {
                    Ok(Token::new(TokenKind::Hash, Span::new(start, self.pos)))
                }
            }
            Some(_) => self.scan_punct(start),
        }
    }

    fn scan_ident_or_keyword(&mut self, start: usize) -> Result<Token> {
        while matches!(self.peek(0), Some(b) if b == b'_' || b.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        let word = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        let kind = match Keyword::lookup(word) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Ident(self.interner.intern(word)),
        };
        Ok(Token::new(kind, Span::new(start, self.pos)))
    }

    fn scan_number(&mut self, start: usize) -> Result<Token> {
        while matches!(self.peek(0), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        let value: i64 = digits
            .parse()
            .map_err(|_| CompileError::lexical("invalid integer literal", Span::new(start, self.pos)))?;
        // Suffix: up to three letters from {u,U,l,L}, no semantic effect.
        let mut suffix_len = 0;
        while suffix_len < 3 {
            match self.peek(suffix_len) {
                Some(b'u') | Some(b'U') | Some(b'l') | Some(b'L') => suffix_len += 1,
                _ => break,
            }
        }
        self.pos += suffix_len;
        Ok(Token::new(TokenKind::IntLiteral(value), Span::new(start, self.pos)))
    }

    fn scan_char_literal(&mut self, start: usize) -> Result<Token> {
        self.pos += 1; // opening quote
        let value = self.bump().ok_or_else(|| {
            CompileError::lexical("unterminated character literal", Span::new(start, self.pos))
        })?;
        if self.peek(0) != Some(b'\'') {
            return Err(CompileError::lexical(
                "unterminated character literal",
                Span::new(start, self.pos),
            ));
        }
        self.pos += 1;
        Ok(Token::new(TokenKind::CharLiteral(value), Span::new(start, self.pos)))
    }

    fn scan_string_literal(&mut self, start: usize) -> Result<Token> {
        self.pos += 1; // opening quote
        let content_start = self.pos;
        while !matches!(self.peek(0), None | Some(b'"')) {
            self.pos += 1;
        }
        if self.peek(0) != Some(b'"') {
            return Err(CompileError::lexical(
                "unterminated string literal",
                Span::new(start, self.pos),
            ));
        }
        let content = std::str::from_utf8(&self.src[content_start..self.pos]).unwrap();
        let sym = self.interner.intern(content);
        self.pos += 1; // closing quote
        Ok(Token::new(TokenKind::StringLiteral(sym), Span::new(start, self.pos)))
    }

    fn scan_punct(&mut self, start: usize) -> Result<Token> {
        use Punct::*;
        let three = (self.peek(0), self.peek(1), self.peek(2));
        if let (Some(a), Some(b), Some(c)) = three {
            let p = match (a, b, c) {
                (b'<', b'<', b'=') => Some(ShlEq),
                (b'>', b'>', b'=') => Some(ShrEq),
                (b'.', b'.', b'.') => Some(Ellipsis),
                _ => None,
            };
            if let Some(p) = p {
                self.pos += 3;
                return Ok(Token::new(TokenKind::Punct(p), Span::new(start, self.pos)));
            }
        }
        let two = (self.peek(0), self.peek(1));
        if let (Some(a), Some(b)) = two {
            let p = match (a, b) {
                (b'+', b'+') => Some(PlusPlus),
                (b'-', b'-') => Some(MinusMinus),
                (b'-', b'>') => Some(Arrow),
                (b'+', b'=') => Some(PlusEq),
                (b'-', b'=') => Some(MinusEq),
                (b'*', b'=') => Some(StarEq),
                (b'/', b'=') => Some(SlashEq),
                (b'%', b'=') => Some(PercentEq),
                (b'=', b'=') => Some(Eq),
                (b'!', b'=') => Some(NotEq),
                (b'<', b'=') => Some(Le),
                (b'>', b'=') => Some(Ge),
                (b'<', b'<') => Some(Shl),
                (b'>', b'>') => Some(Shr),
                (b'&', b'&') => Some(AndAnd),
                (b'|', b'|') => Some(OrOr),
                (b'&', b'=') => Some(AmpEq),
                (b'|', b'=') => Some(PipeEq),
                (b'^', b'=') => Some(CaretEq),
                _ => None,
            };
            if let Some(p) = p {
                self.pos += 2;
                return Ok(Token::new(TokenKind::Punct(p), Span::new(start, self.pos)));
            }
        }
        let one = self.bump().unwrap();
        let p = match one {
            b'+' => Plus,
            b'-' => Minus,
            b'*' => Star,
            b'/' => Slash,
            b'%' => Percent,
            b'=' => Assign,
            b'<' => Lt,
            b'>' => Gt,
            b'!' => Not,
            b'&' => Amp,
            b'|' => Pipe,
            b'^' => Caret,
            b'~' => Tilde,
            b'(' => LParen,
            b')' => RParen,
            b'{' => LBrace,
            b'}' => RBrace,
            b'[' => LBracket,
            b']' => RBracket,
            b';' => Semicolon,
            b',' => Comma,
            b'.' => Dot,
            b':' => Colon,
            b'?' => Question,
            other => {
                return Err(CompileError::lexical(
                    format!("unexpected byte 0x{other:02x}"),
                    Span::new(start, self.pos),
                ))
            }
        };
        Ok(Token::new(TokenKind::Punct(p), Span::new(start, self.pos)))
    }
}

pub fn strip_preprocessor_only_tokens(tokens: Vec<Token>) -> Vec<Token> {
    tokens
        .into_iter()
        .filter(|t| !matches!(t.kind, TokenKind::Whitespace | TokenKind::Newline))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new(src, &mut interner);
        lexer.tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_keywords_and_idents() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new("int main", &mut interner);
        let toks = lexer.tokenize().unwrap();
        assert_eq!(toks[0].kind, TokenKind::Keyword(Keyword::Int));
        assert!(matches!(toks[1].kind, TokenKind::Ident(_)));
        assert_eq!(toks[2].kind, TokenKind::Eof);
    }

    #[test]
    fn maximal_munch_prefers_longest_punct() {
        let ks = kinds("a <<= b");
        assert!(ks.iter().any(|k| *k == TokenKind::Punct(Punct::ShlEq)));
    }

    #[test]
    fn scans_ellipsis_not_three_dots() {
        let ks = kinds("f(a, ...)");
        assert!(ks.iter().any(|k| *k == TokenKind::Punct(Punct::Ellipsis)));
    }

    #[test]
    fn integer_suffix_is_skipped_without_semantic_effect() {
        let ks = kinds("123UL");
        assert_eq!(ks[0], TokenKind::IntLiteral(123));
    }

    #[test]
    fn line_comment_is_stripped() {
        let ks = kinds("1 // comment\n2");
        assert_eq!(ks, vec![TokenKind::IntLiteral(1), TokenKind::IntLiteral(2), TokenKind::Eof]);
    }

    #[test]
    fn unclosed_block_comment_is_fatal() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new("/* never closed", &mut interner);
        assert!(lexer.tokenize().is_err());
    }

    #[test]
    fn string_literal_interns_content_without_quotes() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new("\"hi\"", &mut interner);
        let toks = lexer.tokenize().unwrap();
        match toks[0].kind {
            TokenKind::StringLiteral(sym) => assert_eq!(interner.resolve(sym), "hi"),
            other => panic!("expected string literal, got {other:?}"),
        }
    }

    #[test]
    fn char_literal_value_is_the_byte() {
        let ks = kinds("'a'");
        assert_eq!(ks[0], TokenKind::CharLiteral(b'a'));
    }

    #[test]
    fn unexpected_byte_is_fatal() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new("$", &mut interner);
        assert!(lexer.tokenize().is_err());
    }
}
