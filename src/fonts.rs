//! Font table parsing.
//!
//! The `\fonttbl` destination maps font numbers to charset declarations;
//! those drive which codepage decodes hex-escaped and literal text while
//! the font is active. Fonts without charset information are legal and
//! simply contribute no codepage.

use std::collections::HashMap;

use encoding_rs::Encoding;

use crate::encoding::{charset_to_codepage, codepage_to_encoding, is_registered_codepage};
use crate::parser::{Group, Node};
use crate::token::TokenKind;

/// How many leading document children are searched for the `\fonttbl`
/// group. It must precede any substantive content, so a shallow scan is
/// enough.
const FONTTBL_SCAN_WINDOW: usize = 20;

/// One font definition: `{\fN \fcharsetM \cpgM <name>;}`.
#[derive(Debug, Clone)]
pub struct FontDef {
    pub num: i32,
    pub codepage: Option<u32>,
    pub encoding: Option<&'static Encoding>,
}

/// Mapping from `\fN` font numbers to their definitions.
#[derive(Debug, Clone, Default)]
pub struct FontTable {
    fonts: HashMap<i32, FontDef>,
}

impl FontTable {
    #[inline]
    pub fn get(&self, num: i32) -> Option<&FontDef> {
        self.fonts.get(&num)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Encoding for a font number, when the font declares one.
    #[inline]
    pub fn encoding_for(&self, num: i32) -> Option<&'static Encoding> {
        self.fonts.get(&num).and_then(|f| f.encoding)
    }
}

/// Extract the font table from the leading children of the document
/// group. A missing `\fonttbl` yields an empty table.
pub fn parse_font_table(doc: &Group<'_>) -> FontTable {
    let mut table = FontTable::default();
    let Some(font_group) = find_font_table(doc) else {
        log::debug!("no \\fonttbl group found; decoding will use header codepages");
        return table;
    };

    for child in &font_group.children {
        let Node::Group(fontdef) = child else {
            continue;
        };
        if let Some(def) = parse_font_def(fontdef) {
            table.fonts.insert(def.num, def);
        }
    }
    table
}

/// Locate the group whose first control word is `\fonttbl`.
fn find_font_table<'g, 'a>(doc: &'g Group<'a>) -> Option<&'g Group<'a>> {
    doc.children
        .iter()
        .take(FONTTBL_SCAN_WINDOW)
        .find_map(|node| match node {
            Node::Group(g) if g.first_control_word() == Some(&b"fonttbl"[..]) => Some(g),
            _ => None,
        })
}

/// Parse one `{\fN ...}` definition group.
fn parse_font_def(group: &Group<'_>) -> Option<FontDef> {
    let mut num = None;
    let mut fcharset = None;
    let mut cpg = None;
    for node in &group.children {
        let Node::Token(tok) = node else { continue };
        if let TokenKind::ControlWord { name, param: Some(p) } = tok.kind {
            match name {
                b"f" if num.is_none() => num = Some(p),
                b"fcharset" if fcharset.is_none() => fcharset = Some(p),
                b"cpg" if cpg.is_none() => cpg = Some(p),
                _ => {}
            }
        }
    }
    let num = num?;

    // \cpg is a direct codepage; it takes precedence over the charset
    // mapping when both are present and usable.
    let from_cpg = cpg
        .filter(|&c| c >= 0 && is_registered_codepage(c as u32))
        .map(|c| c as u32);
    let from_charset = fcharset
        .and_then(charset_to_codepage)
        .filter(|&c| is_registered_codepage(c));
    let codepage = from_cpg.or(from_charset);

    Some(FontDef {
        num,
        codepage,
        encoding: codepage.and_then(codepage_to_encoding),
    })
}
