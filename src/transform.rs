//! Tree transformation passes.
//!
//! After suppression and decoding, three passes remain: delete the
//! suppressed tokens (matched by byte offset, the stable identity), strip
//! every non-visible group, and join the surviving byte runs into the
//! final output. Groups that are not `\*\htmltag` destinations never
//! carry original content, so the stripper drops them wholesale:
//! `\fonttbl`, `\colortbl`, `\stylesheet`, `\info`, `\*\...` destinations
//! and `\mhtmltag` groups all vanish here.

use std::collections::HashSet;

use crate::parser::{Group, GroupKind, Node};
use crate::token::TokenKind;

/// Remove every token whose offset is in the suppression set.
pub fn delete_tokens(group: &mut Group<'_>, offsets: &HashSet<usize>) {
    group.children.retain_mut(|child| match child {
        Node::Token(token) => !offsets.contains(&token.span.start),
        Node::Group(sub) => {
            delete_tokens(sub, offsets);
            true
        }
    });
}

/// Flatten the document into its final byte string.
///
/// Only the root group and `\*\htmltag` destinations contribute content;
/// within a kept destination every nested group is preserved and
/// flattened. Surviving control words map to their textual decodings or
/// to nothing.
pub fn render(doc: &Group<'_>) -> Vec<u8> {
    let mut out = Vec::new();
    render_group(doc, false, &mut out);
    out
}

fn render_group(group: &Group<'_>, in_htmltag: bool, out: &mut Vec<u8>) {
    for child in &group.children {
        match child {
            Node::Token(token) => render_token(&token.kind, out),
            Node::Group(sub) => {
                if in_htmltag || sub.kind == GroupKind::HtmlTag {
                    render_group(sub, true, out);
                }
            }
        }
    }
}

fn render_token(kind: &TokenKind<'_>, out: &mut Vec<u8>) {
    match kind {
        TokenKind::Text(bytes) => out.extend_from_slice(bytes),
        TokenKind::ControlWord { name, .. } => {
            if let Some(text) = control_word_text(name) {
                out.extend_from_slice(text);
            }
        }
        // everything else is an artifact of the container format
        _ => {}
    }
}

/// Control words with a textual decoding.
fn control_word_text(name: &[u8]) -> Option<&'static [u8]> {
    match name {
        b"par" | b"line" => Some(b"\n"),
        b"tab" => Some(b"\t"),
        b"lquote" => Some("\u{2018}".as_bytes()),
        b"rquote" => Some("\u{2019}".as_bytes()),
        b"ldblquote" => Some("\u{201C}".as_bytes()),
        b"rdblquote" => Some("\u{201D}".as_bytes()),
        b"bullet" => Some("\u{2022}".as_bytes()),
        b"endash" => Some("\u{2013}".as_bytes()),
        b"emdash" => Some("\u{2014}".as_bytes()),
        _ => None,
    }
}
