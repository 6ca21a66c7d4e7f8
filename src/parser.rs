//! RTF grammar: token stream to group tree.
//!
//! `start := group`, `group := '{' (token | group)* '}'`. The parser runs
//! iteratively with an explicit group stack so arbitrarily deep documents
//! never exhaust the call stack. Brace tokens are consumed into the tree
//! structure; every other token becomes a leaf of its enclosing group.

use crate::error::{Result, RtfError};
use crate::token::{Span, Token, TokenKind};

/// What a group is, judged from its leading tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Plain group.
    Normal,
    /// `{\*\htmltag ...}`: carries literal HTML payload.
    HtmlTag,
    /// `{\*\mhtmltag ...}`: always discarded.
    MHtmlTag,
    /// Any other `{\*\... }` ignorable destination.
    Destination,
}

/// A node of the parsed tree: a leaf token or a nested group.
#[derive(Debug, Clone)]
pub enum Node<'a> {
    Token(Token<'a>),
    Group(Group<'a>),
}

/// A brace-delimited group and its children, in document order.
#[derive(Debug, Clone)]
pub struct Group<'a> {
    pub kind: GroupKind,
    pub span: Span,
    pub children: Vec<Node<'a>>,
}

impl<'a> Group<'a> {
    /// First significant (non-layout) child token, if any.
    pub fn first_token(&self) -> Option<&Token<'a>> {
        self.children.iter().find_map(|n| match n {
            Node::Token(t) if t.is_significant() => Some(t),
            _ => None,
        })
    }

    /// First control-word name in the group, skipping anything else.
    /// Destinations are identified by this.
    pub fn first_control_word(&self) -> Option<&'a [u8]> {
        self.children.iter().find_map(|n| match n {
            Node::Token(t) => t.kind.control_word(),
            _ => None,
        })
    }
}

/// Parse a token stream into the root group.
pub fn parse<'a>(tokens: Vec<Token<'a>>) -> Result<Group<'a>> {
    let mut stack: Vec<Group<'a>> = Vec::new();
    let mut root: Option<Group<'a>> = None;

    for token in tokens {
        if root.is_some() {
            // Only layout junk may trail the document's closing brace.
            match token.kind {
                TokenKind::Newline => continue,
                TokenKind::Literal(bytes)
                    if bytes.iter().all(|b| b.is_ascii_whitespace() || *b == 0) =>
                {
                    continue;
                }
                _ => {
                    return Err(RtfError::MalformedRtf(format!(
                        "content after document close at offset {}",
                        token.span.start
                    )));
                }
            }
        }
        match token.kind {
            TokenKind::GroupOpen => {
                stack.push(Group {
                    kind: GroupKind::Normal,
                    span: token.span,
                    children: Vec::new(),
                });
            }
            TokenKind::GroupClose => {
                let Some(mut group) = stack.pop() else {
                    return Err(RtfError::MalformedRtf(format!(
                        "unbalanced '}}' at offset {}",
                        token.span.start
                    )));
                };
                group.kind = classify(&group.children);
                group.span.end = token.span.end;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Group(group)),
                    None => root = Some(group),
                }
            }
            TokenKind::Newline if stack.is_empty() => {}
            _ => match stack.last_mut() {
                Some(group) => group.children.push(Node::Token(token)),
                None => {
                    return Err(RtfError::MalformedRtf(format!(
                        "content before document open at offset {}",
                        token.span.start
                    )));
                }
            },
        }
    }

    if let Some(open) = stack.last() {
        return Err(RtfError::MalformedRtf(format!(
            "unbalanced '{{' at offset {}",
            open.span.start
        )));
    }
    root.ok_or_else(|| RtfError::MalformedRtf("empty document".into()))
}

/// Classify a completed group from its leading tokens.
fn classify(children: &[Node<'_>]) -> GroupKind {
    let mut tokens = children.iter().filter_map(|n| match n {
        Node::Token(t) if t.is_significant() => Some(t),
        _ => None,
    });
    if !matches!(
        tokens.next().map(|t| t.kind),
        Some(TokenKind::ControlSymbol(b'*'))
    ) {
        return GroupKind::Normal;
    }
    match tokens.next().map(|t| t.kind) {
        Some(TokenKind::HtmlTag { .. }) => GroupKind::HtmlTag,
        Some(TokenKind::MHtmlTag { .. }) => GroupKind::MHtmlTag,
        _ => GroupKind::Destination,
    }
}
