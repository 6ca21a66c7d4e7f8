//! RTF lexer.
//!
//! Tokenizes a normalized RTF byte stream into control words, control
//! symbols, hex escapes, Unicode escapes, group braces and literal runs.
//! The lexer is zero-copy: literal runs and control-word names are slices
//! of the input. Byte offsets are preserved on every token.
//!
//! The input is expected to have gone through the binary stripper and the
//! escape normalizer first, so `\binN` payloads and escaped `\\ \{ \}`
//! never reach the grammar.

use crate::error::{Result, RtfError};
use crate::token::{Span, Token, TokenKind};

/// Longest control word name admitted by the RTF specification.
const MAX_CONTROL_WORD_LEN: usize = 32;

/// RTF lexer over a byte stream.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer.
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Tokenize the entire input.
    pub fn tokenize(mut self) -> Result<Vec<Token<'a>>> {
        let mut tokens = Vec::new();
        while self.pos < self.input.len() {
            tokens.push(self.next_token()?);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        match self.input[self.pos] {
            b'{' => {
                self.pos += 1;
                Ok(Token::new(Span::new(start, self.pos), TokenKind::GroupOpen))
            }
            b'}' => {
                self.pos += 1;
                Ok(Token::new(Span::new(start, self.pos), TokenKind::GroupClose))
            }
            b'\r' | b'\n' => {
                while self.pos < self.input.len() && matches!(self.input[self.pos], b'\r' | b'\n') {
                    self.pos += 1;
                }
                Ok(Token::new(Span::new(start, self.pos), TokenKind::Newline))
            }
            b'\\' => self.control(start),
            _ => self.literal(start),
        }
    }

    /// Lex a control word, control symbol, hex escape or Unicode escape.
    fn control(&mut self, start: usize) -> Result<Token<'a>> {
        self.pos += 1; // backslash
        let Some(&b) = self.input.get(self.pos) else {
            return Err(RtfError::MalformedRtf(format!(
                "truncated control sequence at offset {start}"
            )));
        };

        if b == b'\'' {
            return self.hex_escape(start);
        }

        if !b.is_ascii_alphabetic() {
            // A backslash-newline acts as a paragraph break, everything
            // else non-alphabetic is a control symbol.
            self.pos += 1;
            let kind = if matches!(b, b'\r' | b'\n') {
                if b == b'\r' && self.input.get(self.pos) == Some(&b'\n') {
                    self.pos += 1;
                }
                TokenKind::ControlWord { name: b"par", param: None }
            } else {
                TokenKind::ControlSymbol(b)
            };
            return Ok(Token::new(Span::new(start, self.pos), kind));
        }

        let name_start = self.pos;
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_alphabetic() {
            self.pos += 1;
        }
        let name = &self.input[name_start..self.pos];
        if name.len() > MAX_CONTROL_WORD_LEN {
            return Err(RtfError::MalformedRtf(format!(
                "control word longer than {MAX_CONTROL_WORD_LEN} letters at offset {start}"
            )));
        }

        let param = self.numeric_parameter()?;
        self.delimiter();

        let kind = match name {
            b"u" if param.is_some() => TokenKind::UnicodeEscape(param.unwrap_or(0)),
            b"htmltag" => TokenKind::HtmlTag { param },
            b"mhtmltag" => TokenKind::MHtmlTag { param },
            _ => TokenKind::ControlWord { name, param },
        };
        Ok(Token::new(Span::new(start, self.pos), kind))
    }

    /// Parse the optional signed numeric parameter after a control word.
    fn numeric_parameter(&mut self) -> Result<Option<i32>> {
        let start = self.pos;
        if self.input.get(self.pos) == Some(&b'-') {
            self.pos += 1;
        }
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let digits = &self.input[start..self.pos];
        if digits.is_empty() || digits == b"-" {
            self.pos = start;
            return Ok(None);
        }
        let num = std::str::from_utf8(digits)?.parse::<i32>()?;
        Ok(Some(num))
    }

    /// Consume the single delimiter that terminates a control word: one
    /// space, one CR, one LF, or one CRLF.
    fn delimiter(&mut self) {
        match self.input.get(self.pos) {
            Some(b' ') | Some(b'\n') => self.pos += 1,
            Some(b'\r') => {
                self.pos += 1;
                if self.input.get(self.pos) == Some(&b'\n') {
                    self.pos += 1;
                }
            }
            _ => {}
        }
    }

    /// Lex `\'HH`.
    fn hex_escape(&mut self, start: usize) -> Result<Token<'a>> {
        self.pos += 1; // quote
        if self.pos + 2 > self.input.len() {
            return Err(RtfError::MalformedRtf(format!(
                "truncated hex escape at offset {start}"
            )));
        }
        let hi = hex_nibble(self.input[self.pos], start)?;
        let lo = hex_nibble(self.input[self.pos + 1], start)?;
        self.pos += 2;
        Ok(Token::new(
            Span::new(start, self.pos),
            TokenKind::HexEscape((hi << 4) | lo),
        ))
    }

    /// Lex a run of plain bytes up to the next special character.
    fn literal(&mut self, start: usize) -> Result<Token<'a>> {
        while self.pos < self.input.len()
            && !matches!(self.input[self.pos], b'{' | b'}' | b'\\' | b'\r' | b'\n')
        {
            self.pos += 1;
        }
        Ok(Token::new(
            Span::new(start, self.pos),
            TokenKind::Literal(&self.input[start..self.pos]),
        ))
    }
}

#[inline]
fn hex_nibble(c: u8, offset: usize) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(RtfError::MalformedRtf(format!(
            "invalid hex escape at offset {offset}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &[u8]) -> Vec<Token<'_>> {
        Lexer::new(input).tokenize().unwrap()
    }

    #[test]
    fn test_simple_tokenization() {
        let tokens = lex(br"{\rtf1\ansi Hello}");
        assert_eq!(tokens.len(), 5);
        assert!(matches!(tokens[0].kind, TokenKind::GroupOpen));
        assert!(matches!(
            tokens[1].kind,
            TokenKind::ControlWord { name: b"rtf", param: Some(1) }
        ));
        assert!(matches!(
            tokens[2].kind,
            TokenKind::ControlWord { name: b"ansi", param: None }
        ));
        assert!(matches!(tokens[3].kind, TokenKind::Literal(b"Hello")));
        assert!(matches!(tokens[4].kind, TokenKind::GroupClose));
    }

    #[test]
    fn test_offsets_preserved() {
        let tokens = lex(br"{\par x}");
        assert_eq!(tokens[0].span, Span::new(0, 1));
        // delimiter space belongs to the control word
        assert_eq!(tokens[1].span, Span::new(1, 6));
        assert_eq!(tokens[2].span, Span::new(6, 7));
    }

    #[test]
    fn test_negative_parameter() {
        let tokens = lex(br"{\u-10179?}");
        assert!(matches!(tokens[1].kind, TokenKind::UnicodeEscape(-10179)));
        assert!(matches!(tokens[2].kind, TokenKind::Literal(b"?")));
    }

    #[test]
    fn test_unicode_delimiter_space_consumed() {
        let tokens = lex(b"{\\u8212 ?}");
        assert!(matches!(tokens[1].kind, TokenKind::UnicodeEscape(8212)));
        // the space was the delimiter; the fallback is the next token
        assert!(matches!(tokens[2].kind, TokenKind::Literal(b"?")));
    }

    #[test]
    fn test_bare_u_is_a_control_word() {
        let tokens = lex(br"{\u x}");
        assert!(matches!(
            tokens[1].kind,
            TokenKind::ControlWord { name: b"u", param: None }
        ));
    }

    #[test]
    fn test_hex_escape() {
        let tokens = lex(br"{\'93\'fa}");
        assert!(matches!(tokens[1].kind, TokenKind::HexEscape(0x93)));
        assert!(matches!(tokens[2].kind, TokenKind::HexEscape(0xFA)));
    }

    #[test]
    fn test_truncated_hex_escape() {
        assert!(matches!(
            Lexer::new(br"{\'9").tokenize(),
            Err(RtfError::MalformedRtf(_))
        ));
        assert!(matches!(
            Lexer::new(br"{\'zz}").tokenize(),
            Err(RtfError::MalformedRtf(_))
        ));
    }

    #[test]
    fn test_control_symbols() {
        let tokens = lex(br"{\*\~\-\_}");
        assert!(matches!(tokens[1].kind, TokenKind::ControlSymbol(b'*')));
        assert!(matches!(tokens[2].kind, TokenKind::ControlSymbol(b'~')));
        assert!(matches!(tokens[3].kind, TokenKind::ControlSymbol(b'-')));
        assert!(matches!(tokens[4].kind, TokenKind::ControlSymbol(b'_')));
    }

    #[test]
    fn test_htmltag_recognized() {
        let tokens = lex(br"{\*\htmltag64 <p>}");
        assert!(matches!(tokens[2].kind, TokenKind::HtmlTag { param: Some(64) }));
        assert!(matches!(tokens[3].kind, TokenKind::Literal(b"<p>")));
        let tokens = lex(br"{\*\mhtmltag64 x}");
        assert!(matches!(tokens[2].kind, TokenKind::MHtmlTag { param: Some(64) }));
    }

    #[test]
    fn test_crlf_is_layout() {
        let tokens = lex(b"{a\r\nb}");
        assert!(matches!(tokens[1].kind, TokenKind::Literal(b"a")));
        assert!(matches!(tokens[2].kind, TokenKind::Newline));
        assert!(matches!(tokens[3].kind, TokenKind::Literal(b"b")));
    }

    #[test]
    fn test_crlf_delimits_control_word() {
        // A CRLF right after a control word is its delimiter, not layout
        let tokens = lex(b"{\\par\r\nx}");
        assert!(matches!(
            tokens[1].kind,
            TokenKind::ControlWord { name: b"par", param: None }
        ));
        assert!(matches!(tokens[2].kind, TokenKind::Literal(b"x")));
    }

    #[test]
    fn test_bracket_balance_on_accepted_input() {
        let tokens = lex(br"{\rtf1{\f0 a}{{b}c}}");
        let opens = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::GroupOpen))
            .count();
        let closes = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::GroupClose))
            .count();
        assert_eq!(opens, closes);
    }

    #[test]
    fn test_truncated_stream() {
        assert!(matches!(
            Lexer::new(b"{\\").tokenize(),
            Err(RtfError::MalformedRtf(_))
        ));
    }
}
