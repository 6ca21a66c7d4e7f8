//! Text decoding.
//!
//! Walks the tree after suppression and rewrites leaf tokens into decoded
//! byte runs. Decoding state is scoped: the active font and the `\ucN`
//! fallback byte count are pushed when a group opens and restored when it
//! closes. Unicode escapes consume their ANSI fallback bytes, surrogate
//! pairs combine into single code points, and contiguous hex escapes
//! decode as one byte string through the active font's codepage so
//! multi-byte CJK sequences survive.
//!
//! Decoded output is UTF-8: bytes that went through a legacy codepage are
//! transcoded, ASCII literals pass through untouched.

use bumpalo::Bump;
use encoding_rs::Encoding;
use smallvec::SmallVec;

use crate::deencapsulate::Options;
use crate::encoding::DEFAULT_ENCODING;
use crate::error::{Result, RtfError};
use crate::fonts::FontTable;
use crate::parser::{Group, Node};
use crate::token::{Span, Token, TokenKind};

/// Per-group decoding state.
#[derive(Debug, Clone, Copy)]
struct Scope {
    font: Option<i32>,
    uc: usize,
}

/// What the fallback bytes currently being consumed belong to.
#[derive(Debug, Default)]
enum Awaiting {
    #[default]
    None,
    /// A high surrogate waiting for its low partner; the fallback is kept
    /// in case the pair never completes and the ASCII alternative is
    /// wanted.
    High { unit: u16, fallback: Vec<u8>, span: Span },
    /// A standalone low surrogate being rescued by its ASCII fallback.
    LowFallback { fallback: Vec<u8>, span: Span },
}

/// Unicode-escape bookkeeping local to one group's child list.
#[derive(Debug, Default)]
struct UniState {
    /// Fallback bytes still to consume for the most recent `\uN`.
    skip: usize,
    awaiting: Awaiting,
}

/// Tree-rewriting text decoder.
pub struct TextDecoder<'a, 'f> {
    arena: &'a Bump,
    fonts: &'f FontTable,
    base_encoding: Option<&'static Encoding>,
    keep_fontdef: bool,
    ascii_fallback: bool,
    scopes: SmallVec<[Scope; 8]>,
}

impl<'a, 'f> TextDecoder<'a, 'f> {
    pub fn new(
        arena: &'a Bump,
        fonts: &'f FontTable,
        base_encoding: Option<&'static Encoding>,
        default_font: Option<i32>,
        options: &Options,
    ) -> Self {
        let mut scopes = SmallVec::new();
        scopes.push(Scope {
            font: default_font,
            uc: options.initial_byte_count as usize,
        });
        Self {
            arena,
            fonts,
            base_encoding,
            keep_fontdef: options.keep_fontdef,
            ascii_fallback: options.use_ascii_alternatives_on_unicode_decode_failure,
            scopes,
        }
    }

    /// Decode every leaf in the document tree in place.
    pub fn decode(&mut self, doc: &mut Group<'a>) -> Result<()> {
        let children = std::mem::take(&mut doc.children);
        doc.children = self.rewrite(children)?;
        Ok(())
    }

    fn walk(&mut self, group: &mut Group<'a>) -> Result<()> {
        let inherited = *self.scopes.last().expect("scope stack is never empty");
        self.scopes.push(inherited);
        let children = std::mem::take(&mut group.children);
        let result = self.rewrite(children);
        self.scopes.pop();
        group.children = result?;
        Ok(())
    }

    fn rewrite(&mut self, children: Vec<Node<'a>>) -> Result<Vec<Node<'a>>> {
        let mut out: Vec<Node<'a>> = Vec::with_capacity(children.len());
        let mut uni = UniState::default();
        let mut hex_run: SmallVec<[u8; 16]> = SmallVec::new();
        let mut hex_span: Option<Span> = None;

        for node in children {
            let token = match node {
                Node::Group(mut sub) => {
                    self.flush_hex(&mut hex_run, &mut hex_span, &mut out);
                    // fallback consumption and surrogate pairing never
                    // cross a group boundary
                    uni.skip = 0;
                    self.finish_unicode(&mut uni, &mut out)?;
                    self.walk(&mut sub)?;
                    out.push(Node::Group(sub));
                    continue;
                }
                Node::Token(token) => token,
            };
            match token.kind {
                TokenKind::HexEscape(byte) => {
                    if uni.skip > 0 {
                        self.consume_fallback_byte(&mut uni, byte, &mut out);
                    } else {
                        hex_span = Some(match hex_span {
                            Some(span) => Span::new(span.start, token.span.end),
                            None => token.span,
                        });
                        hex_run.push(byte);
                    }
                }
                // Layout whitespace: never content, never a fallback byte,
                // and it does not interrupt a hex run.
                TokenKind::Newline => {}
                TokenKind::UnicodeEscape(value) => {
                    self.flush_hex(&mut hex_run, &mut hex_span, &mut out);
                    self.on_unicode(&mut uni, value, token.span, &mut out)?;
                }
                TokenKind::ControlWord { name: b"uc", param } => {
                    self.flush_hex(&mut hex_run, &mut hex_span, &mut out);
                    self.scope_mut().uc = param.unwrap_or(1).max(0) as usize;
                }
                TokenKind::ControlWord { name: b"f", param: Some(num) } => {
                    self.flush_hex(&mut hex_run, &mut hex_span, &mut out);
                    self.scope_mut().font = Some(num);
                    if self.keep_fontdef {
                        out.push(Node::Token(token));
                    }
                }
                TokenKind::Literal(bytes) => {
                    let rest = if uni.skip > 0 {
                        self.consume_fallback_literal(&mut uni, bytes, &mut out)
                    } else {
                        bytes
                    };
                    if !rest.is_empty() {
                        self.flush_hex(&mut hex_run, &mut hex_span, &mut out);
                        out.push(self.decode_literal(rest, token.span));
                    }
                }
                TokenKind::ControlSymbol(sym) => {
                    self.flush_hex(&mut hex_run, &mut hex_span, &mut out);
                    match sym {
                        b'~' => out.push(text_node("\u{00A0}", token.span)),
                        b'-' => out.push(text_node("\u{00AD}", token.span)),
                        b'_' => out.push(text_node("\u{2011}", token.span)),
                        // formula character and index subentry produce nothing
                        b'|' | b':' => {}
                        _ => out.push(Node::Token(token)),
                    }
                }
                _ => {
                    self.flush_hex(&mut hex_run, &mut hex_span, &mut out);
                    out.push(Node::Token(token));
                }
            }
        }
        self.flush_hex(&mut hex_run, &mut hex_span, &mut out);
        self.finish_unicode(&mut uni, &mut out)?;
        Ok(out)
    }

    #[inline]
    fn scope_mut(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack is never empty")
    }

    #[inline]
    fn scope_uc(&self) -> usize {
        self.scopes.last().expect("scope stack is never empty").uc
    }

    /// Encoding chain: active font, then `\ansicpg`/charset keyword, then
    /// the ANSI default.
    fn active_encoding(&self) -> &'static Encoding {
        let scope = self.scopes.last().expect("scope stack is never empty");
        scope
            .font
            .and_then(|num| self.fonts.encoding_for(num))
            .or(self.base_encoding)
            .unwrap_or(DEFAULT_ENCODING)
    }

    /// Process one `\uN` escape.
    fn on_unicode(
        &self,
        uni: &mut UniState,
        raw: i32,
        span: Span,
        out: &mut Vec<Node<'a>>,
    ) -> Result<()> {
        // Unconsumed fallback of the previous escape is abandoned.
        uni.skip = 0;
        let unit = normalize_unit(raw);
        if is_low_surrogate(unit) {
            match std::mem::take(&mut uni.awaiting) {
                Awaiting::High { unit: high, .. } => {
                    let cp =
                        0x10000 + (((high as u32 - 0xD800) << 10) | (unit as u32 - 0xDC00));
                    self.push_code_point(cp, span, out)?;
                    uni.skip = self.scope_uc();
                }
                Awaiting::LowFallback { fallback, span: prev } => {
                    out.push(self.text_from_vec(fallback, prev));
                    self.begin_standalone_low(uni, span)?;
                }
                Awaiting::None => self.begin_standalone_low(uni, span)?,
            }
        } else if is_high_surrogate(unit) {
            self.resolve_dangling(uni, out)?;
            uni.awaiting = Awaiting::High { unit, fallback: Vec::new(), span };
            uni.skip = self.scope_uc();
        } else {
            self.resolve_dangling(uni, out)?;
            self.push_code_point(unit as u32, span, out)?;
            uni.skip = self.scope_uc();
        }
        Ok(())
    }

    /// A low surrogate with no preceding high surrogate.
    fn begin_standalone_low(&self, uni: &mut UniState, span: Span) -> Result<()> {
        if self.ascii_fallback {
            uni.awaiting = Awaiting::LowFallback { fallback: Vec::new(), span };
            uni.skip = self.scope_uc();
            Ok(())
        } else {
            Err(RtfError::MalformedRtf(format!(
                "low surrogate without a preceding high surrogate at offset {}",
                span.start
            )))
        }
    }

    /// Resolve an incomplete surrogate before anything else is emitted.
    fn resolve_dangling(&self, uni: &mut UniState, out: &mut Vec<Node<'a>>) -> Result<()> {
        match std::mem::take(&mut uni.awaiting) {
            Awaiting::None => Ok(()),
            Awaiting::High { fallback, span, .. } => {
                if self.ascii_fallback {
                    out.push(self.text_from_vec(fallback, span));
                    Ok(())
                } else {
                    Err(RtfError::MalformedRtf(format!(
                        "high surrogate without a following low surrogate at offset {}",
                        span.start
                    )))
                }
            }
            Awaiting::LowFallback { fallback, span } => {
                out.push(self.text_from_vec(fallback, span));
                Ok(())
            }
        }
    }

    /// The surrogate buffer must be empty when a group closes.
    fn finish_unicode(&self, uni: &mut UniState, out: &mut Vec<Node<'a>>) -> Result<()> {
        self.resolve_dangling(uni, out)
    }

    /// Count one fallback byte against the pending `\uN`.
    fn consume_fallback_byte(&self, uni: &mut UniState, byte: u8, out: &mut Vec<Node<'a>>) {
        match &mut uni.awaiting {
            Awaiting::High { fallback, .. } | Awaiting::LowFallback { fallback, .. } => {
                fallback.push(byte);
            }
            Awaiting::None => {}
        }
        uni.skip -= 1;
        if uni.skip == 0
            && let Awaiting::LowFallback { .. } = uni.awaiting
            && let Awaiting::LowFallback { fallback, span } = std::mem::take(&mut uni.awaiting)
        {
            out.push(self.text_from_vec(fallback, span));
        }
    }

    /// Consume fallback bytes from the head of a literal run; whitespace
    /// between the escape and its fallback never counts. Returns the
    /// remainder that is real content.
    fn consume_fallback_literal(
        &self,
        uni: &mut UniState,
        bytes: &'a [u8],
        out: &mut Vec<Node<'a>>,
    ) -> &'a [u8] {
        let mut idx = 0;
        while idx < bytes.len() && uni.skip > 0 {
            let byte = bytes[idx];
            if byte.is_ascii_whitespace() {
                idx += 1;
                continue;
            }
            self.consume_fallback_byte(uni, byte, out);
            idx += 1;
        }
        &bytes[idx..]
    }

    /// Decode and emit an accumulated hex-escape run.
    fn flush_hex(
        &self,
        run: &mut SmallVec<[u8; 16]>,
        span: &mut Option<Span>,
        out: &mut Vec<Node<'a>>,
    ) {
        if run.is_empty() {
            return;
        }
        let span = span.take().unwrap_or(Span::new(0, 0));
        let encoding = self.active_encoding();
        let (decoded, had_errors) = encoding.decode_without_bom_handling(run);
        if had_errors {
            log::debug!(
                "hex run at offset {} is not valid {}; decoded lossily",
                span.start,
                encoding.name()
            );
        }
        out.push(Node::Token(Token::new(
            span,
            TokenKind::Text(self.arena.alloc_slice_copy(decoded.as_bytes())),
        )));
        run.clear();
    }

    /// Decode a literal run. Pure ASCII passes through without copying.
    fn decode_literal(&self, bytes: &'a [u8], span: Span) -> Node<'a> {
        if bytes.is_ascii() {
            return Node::Token(Token::new(span, TokenKind::Text(bytes)));
        }
        let encoding = self.active_encoding();
        let (decoded, had_errors) = encoding.decode_without_bom_handling(bytes);
        if had_errors {
            log::debug!(
                "literal at offset {} is not valid {}; decoded lossily",
                span.start,
                encoding.name()
            );
        }
        Node::Token(Token::new(
            span,
            TokenKind::Text(self.arena.alloc_slice_copy(decoded.as_bytes())),
        ))
    }

    fn push_code_point(&self, cp: u32, span: Span, out: &mut Vec<Node<'a>>) -> Result<()> {
        let ch = char::from_u32(cp).ok_or_else(|| {
            RtfError::MalformedRtf(format!(
                "\\u escape does not name a Unicode scalar value at offset {}",
                span.start
            ))
        })?;
        let mut buf = [0u8; 4];
        let encoded = ch.encode_utf8(&mut buf);
        out.push(Node::Token(Token::new(
            span,
            TokenKind::Text(self.arena.alloc_slice_copy(encoded.as_bytes())),
        )));
        Ok(())
    }

    fn text_from_vec(&self, bytes: Vec<u8>, span: Span) -> Node<'a> {
        Node::Token(Token::new(
            span,
            TokenKind::Text(self.arena.alloc_slice_copy(&bytes)),
        ))
    }
}

fn text_node<'a>(text: &'static str, span: Span) -> Node<'a> {
    Node::Token(Token::new(span, TokenKind::Text(text.as_bytes())))
}

/// Fold the lexed parameter into the unsigned 16-bit wire value: a
/// negative N denotes 65536 + N, anything else is taken mod 2^16.
#[inline]
fn normalize_unit(raw: i32) -> u16 {
    (raw.rem_euclid(65536)) as u16
}

#[inline]
fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

#[inline]
fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}
