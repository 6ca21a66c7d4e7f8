//! Encapsulation header validation.
//!
//! Per [MS-OXRTFEX] a de-encapsulating reader inspects no more than the
//! first 10 RTF tokens for the FROM control word, requires the `{\rtf1`
//! magic, a charset keyword, and (optionally) an `\ansicpgN` declaration
//! naming a registered codepage.

use encoding_rs::Encoding;

use crate::encoding::{codepage_to_encoding, is_registered_codepage};
use crate::error::{Result, RtfError};
use crate::parser::{Group, Node};
use crate::token::{Token, TokenKind};

/// Number of leading tokens inspected for the FROM control word.
const FROM_SCAN_WINDOW: usize = 10;

/// Number of leading children searched for header control words.
const HEADER_SCAN_WINDOW: usize = 20;

/// What the encapsulated payload originally was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Text,
}

impl ContentType {
    /// The lowercase name callers match on.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Html => "html",
            ContentType::Text => "text",
        }
    }
}

/// The header charset keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Ansi,
    Mac,
    Pc,
    Pca,
}

impl Charset {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"ansi" => Some(Charset::Ansi),
            b"mac" => Some(Charset::Mac),
            b"pc" => Some(Charset::Pc),
            b"pca" => Some(Charset::Pca),
            _ => None,
        }
    }

    /// Codepage implied by the keyword when no `\ansicpgN` is present.
    pub fn codepage(&self) -> u32 {
        match self {
            Charset::Ansi => 1252,
            Charset::Mac => 10000,
            Charset::Pc => 437,
            Charset::Pca => 850,
        }
    }
}

/// Validated header facts the rest of the pipeline consumes.
#[derive(Debug, Clone)]
pub struct Header {
    pub content_type: ContentType,
    pub charset: Charset,
    /// Codepage from `\ansicpgN`, when declared.
    pub ansicpg: Option<u32>,
    /// Document default font from `\deffN`, when declared.
    pub default_font: Option<i32>,
    /// Base encoding: `\ansicpgN` if declared and decodable, else the
    /// charset keyword's codepage.
    pub encoding: Option<&'static Encoding>,
}

/// Validate the document group as encapsulated HTML/text and extract the
/// header facts.
pub fn validate(doc: &Group<'_>, fallback_to_default_charset: bool) -> Result<Header> {
    validate_magic(doc)?;
    let charset = validate_charset(doc, fallback_to_default_charset)?;
    let content_type = validate_from_header(doc)?;
    let ansicpg = validate_ansicpg(doc)?;
    let default_font = default_font(doc);

    let encoding = ansicpg
        .and_then(codepage_to_encoding)
        .or_else(|| codepage_to_encoding(charset.codepage()));

    Ok(Header {
        content_type,
        charset,
        ansicpg,
        default_font,
        encoding,
    })
}

/// The document must start with `\rtf1`.
fn validate_magic(doc: &Group<'_>) -> Result<()> {
    match doc.first_token().map(|t| t.kind) {
        Some(TokenKind::ControlWord { name: b"rtf", param: Some(1) }) => Ok(()),
        _ => {
            log::debug!("first token of the document group is not \\rtf1");
            Err(RtfError::MalformedRtf(
                "RTF stream does not start with {\\rtf1".into(),
            ))
        }
    }
}

/// Header control words before the first interior group. Used for the
/// charset, `\ansicpg` and `\deffN` extraction.
fn header_control_words<'g, 'a>(doc: &'g Group<'a>) -> impl Iterator<Item = &'g Token<'a>> {
    doc.children
        .iter()
        .filter(|n| match n {
            Node::Token(t) => t.is_significant(),
            Node::Group(_) => true,
        })
        .take(HEADER_SCAN_WINDOW)
        .map_while(|n| match n {
            Node::Token(t) => Some(t),
            Node::Group(_) => None,
        })
        .filter(|t| matches!(t.kind, TokenKind::ControlWord { .. }))
}

/// The charset control word must precede any plain text or table control
/// words; a stream without one is malformed or corrupted.
fn validate_charset(doc: &Group<'_>, fallback_to_default: bool) -> Result<Charset> {
    for token in header_control_words(doc) {
        if let TokenKind::ControlWord { name, param: None } = token.kind
            && let Some(charset) = Charset::from_name(name)
        {
            return Ok(charset);
        }
    }
    if !fallback_to_default {
        return Err(RtfError::MalformedRtf(
            "RTF stream does not include a charset control word".into(),
        ));
    }
    log::warn!(
        "charset control word missing; falling back to \\ansi; dangerous on untrusted input"
    );
    Ok(Charset::Ansi)
}

/// Tracks what the FROM scan has seen so far.
#[derive(Debug, Default)]
struct FromScan {
    rtf1: bool,
    from: Option<ContentType>,
    fonttbl: bool,
    malformed: bool,
}

impl FromScan {
    fn check(&mut self, kind: &TokenKind<'_>) {
        match *kind {
            TokenKind::ControlWord { name: b"fromhtml", param: Some(1) } => {
                self.saw_from(ContentType::Html);
            }
            TokenKind::ControlWord { name: b"fromtext", param: None } => {
                self.saw_from(ContentType::Text);
            }
            TokenKind::ControlWord { name: b"rtf", param: Some(1) } => {
                self.rtf1 = true;
            }
            TokenKind::ControlWord { name: b"fonttbl", .. } => {
                self.fonttbl = true;
                if self.from.is_none() {
                    log::debug!("\\fonttbl found before the FROM control word");
                    self.malformed = true;
                }
            }
            _ => {}
        }
    }

    fn saw_from(&mut self, ty: ContentType) {
        if self.from.is_some() {
            log::debug!("multiple FROM control words found in the header");
            self.malformed = true;
            return;
        }
        if !self.rtf1 {
            log::debug!("FROM control word found before \\rtf1");
            self.malformed = true;
        }
        self.from = Some(ty);
    }
}

/// Inspect the first 10 significant tokens (control words inside a group
/// encountered in the window are inspected as well, per the "begin group
/// marks and control words" rule of [MS-OXRTFEX]).
fn validate_from_header(doc: &Group<'_>) -> Result<ContentType> {
    let mut scan = FromScan::default();
    let window = doc
        .children
        .iter()
        .filter(|n| match n {
            Node::Token(t) => t.is_significant(),
            Node::Group(_) => true,
        })
        .take(FROM_SCAN_WINDOW);

    for node in window {
        match node {
            Node::Token(t) => scan.check(&t.kind),
            Node::Group(g) => scan_group(g, &mut scan),
        }
        if scan.from.is_some() && scan.malformed {
            return Err(RtfError::MalformedEncapsulatedRtf(
                "encapsulation headers are present but malformed".into(),
            ));
        }
    }

    match scan.from {
        Some(ty) => Ok(ty),
        None => {
            log::debug!("no FROM control word in the first {FROM_SCAN_WINDOW} tokens");
            Err(RtfError::NotEncapsulatedRtf(
                "FROMHTML/TEXT control word not found".into(),
            ))
        }
    }
}

fn scan_group(group: &Group<'_>, scan: &mut FromScan) {
    for node in &group.children {
        match node {
            Node::Token(t) => scan.check(&t.kind),
            Node::Group(g) => scan_group(g, scan),
        }
    }
}

/// `\ansicpgN` is optional, but when present its argument must name a
/// registered codepage.
fn validate_ansicpg(doc: &Group<'_>) -> Result<Option<u32>> {
    for token in header_control_words(doc) {
        if let TokenKind::ControlWord { name: b"ansicpg", param } = token.kind {
            let valid = param
                .filter(|&p| p >= 0 && is_registered_codepage(p as u32))
                .map(|p| p as u32);
            return match valid {
                Some(cp) => Ok(Some(cp)),
                None => Err(RtfError::MalformedRtf(format!(
                    "unsupported codepage in header at offset {}",
                    token.span.start
                ))),
            };
        }
    }
    Ok(None)
}

/// `\deffN`, when declared, names the document default font.
fn default_font(doc: &Group<'_>) -> Option<i32> {
    header_control_words(doc).find_map(|t| match t.kind {
        TokenKind::ControlWord { name: b"deff", param: Some(p) } => Some(p),
        _ => None,
    })
}
