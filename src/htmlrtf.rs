//! HTMLRTF suppression.
//!
//! `\htmlrtf` ... `\htmlrtf0` bracket fragments of RTF the encapsulator
//! added for RTF readers; none of it was in the original HTML. The state
//! transfers into nested groups and is restored when a group closes, so
//! the scan keeps an explicit stack via recursion-local state. Tokens are
//! identified for deletion by their byte offset, which is unique per
//! token, rather than by value.

use std::collections::HashSet;

use crate::parser::{Group, GroupKind, Node};

/// Collect the offsets of every token suppressed by HTMLRTF regions.
///
/// The toggles themselves are collected too: they drive the state but are
/// not original content. Nothing inside an `\*\htmltag` destination is
/// ever suppressed; that payload is literal HTML.
pub fn suppressed_offsets(doc: &Group<'_>) -> HashSet<usize> {
    let mut offsets = HashSet::new();
    scan(doc, false, &mut offsets);
    offsets
}

fn scan(group: &Group<'_>, inherited: bool, offsets: &mut HashSet<usize>) {
    let mut state = inherited;
    for child in &group.children {
        match child {
            Node::Group(sub) => {
                if sub.kind != GroupKind::HtmlTag {
                    scan(sub, state, offsets);
                }
                // state inside the subgroup was restored on exit
            }
            Node::Token(token) => {
                if let Some(on) = token.kind.htmlrtf_toggle() {
                    offsets.insert(token.span.start);
                    state = on;
                } else if state {
                    offsets.insert(token.span.start);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::parse;
    use crate::token::TokenKind;

    fn offsets_for(input: &[u8]) -> HashSet<usize> {
        let root = parse(Lexer::new(input).tokenize().unwrap()).unwrap();
        suppressed_offsets(&root)
    }

    /// Collect the literal bytes of tokens NOT suppressed.
    fn surviving_literals(input: &[u8]) -> Vec<u8> {
        let root = parse(Lexer::new(input).tokenize().unwrap()).unwrap();
        let suppressed = suppressed_offsets(&root);
        let mut out = Vec::new();
        collect(&root, &suppressed, &mut out);
        out
    }

    fn collect(group: &Group<'_>, suppressed: &HashSet<usize>, out: &mut Vec<u8>) {
        for child in &group.children {
            match child {
                Node::Group(sub) => collect(sub, suppressed, out),
                Node::Token(t) => {
                    if let TokenKind::Literal(bytes) = t.kind
                        && !suppressed.contains(&t.span.start)
                    {
                        out.extend_from_slice(bytes);
                    }
                }
            }
        }
    }

    #[test]
    fn test_basic_suppression() {
        let out = surviving_literals(br"{\rtf1\htmlrtf junk\htmlrtf0 keep}");
        assert_eq!(out, b"keep");
    }

    #[test]
    fn test_toggles_themselves_are_marked() {
        let input = br"{\rtf1\htmlrtf x\htmlrtf0 y}";
        let root = parse(Lexer::new(input).tokenize().unwrap()).unwrap();
        let suppressed = suppressed_offsets(&root);
        // \htmlrtf at offset 6, \htmlrtf0 at offset 16
        assert!(suppressed.contains(&6));
        assert!(suppressed.contains(&16));
    }

    #[test]
    fn test_state_restored_on_group_close() {
        // suppression enabled inside the nested group must not leak out
        let out = surviving_literals(br"{\rtf1 a{\htmlrtf hidden}b}");
        assert_eq!(out, b"ab");
    }

    #[test]
    fn test_state_transfers_into_groups() {
        // suppression enabled outside applies within nested groups
        let out = surviving_literals(br"{\rtf1\htmlrtf {inner}\htmlrtf0 after}");
        assert_eq!(out, b"after");
    }

    #[test]
    fn test_inner_toggle_off_is_scoped() {
        // \htmlrtf0 inside a nested group only affects that group
        let out = surviving_literals(br"{\rtf1\htmlrtf a{\htmlrtf0 shown}b\htmlrtf0 c}");
        assert_eq!(out, b"shownc");
    }

    #[test]
    fn test_htmltag_contents_exempt() {
        let out = surviving_literals(br"{\rtf1\htmlrtf junk{\*\htmltag64 <b>X</b>}\htmlrtf0 y}");
        assert_eq!(out, b"<b>X</b>y");
    }

    #[test]
    fn test_htmlrtf1_enables() {
        let out = surviving_literals(br"{\rtf1\htmlrtf1 junk\htmlrtf0 keep}");
        assert_eq!(out, b"keep");
    }

    #[test]
    fn test_no_suppression_no_offsets() {
        assert!(offsets_for(br"{\rtf1 plain {nested} text}").is_empty());
    }
}
