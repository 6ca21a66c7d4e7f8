//! Escaped control character normalization.
//!
//! RTF authors may write `\\`, `\{` and `\}` to embed literal backslashes
//! and braces in text. Rewriting them to their `\'HH` hex form before
//! tokenization means the grammar only ever sees braces as group markers
//! and backslashes as control-sequence introducers.

/// Rewrite `\\` → `\'5c`, `\{` → `\'7b`, `\}` → `\'7d`.
///
/// A single left-to-right pass: once a backslash pair is consumed its
/// bytes are never re-examined, so the rewrite cannot fire inside an
/// existing `\'HH` sequence and cannot steal the backslash of a control
/// word. Normalizing an already-normalized stream is a no-op.
pub fn encode_escaped_control_chars(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\\' && i + 1 < raw.len() {
            match raw[i + 1] {
                b'\\' => out.extend_from_slice(b"\\'5c"),
                b'{' => out.extend_from_slice(b"\\'7b"),
                b'}' => out.extend_from_slice(b"\\'7d"),
                other => {
                    out.push(b'\\');
                    out.push(other);
                }
            }
            i += 2;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaped_chars_rewritten() {
        assert_eq!(
            encode_escaped_control_chars(br"a\\b\{c\}d"),
            br"a\'5cb\'7bc\'7dd"
        );
    }

    #[test]
    fn test_control_words_untouched() {
        let input = br"{\rtf1\ansi\par}".to_vec();
        assert_eq!(encode_escaped_control_chars(&input), input);
    }

    #[test]
    fn test_no_match_inside_existing_hex() {
        let input = br"\'7b\'5c\'7d".to_vec();
        assert_eq!(encode_escaped_control_chars(&input), input);
    }

    #[test]
    fn test_triple_backslash() {
        // escaped backslash followed by an escaped brace
        assert_eq!(encode_escaped_control_chars(br"\\\{"), br"\'5c\'7b");
        // escaped backslash followed by a structural brace
        assert_eq!(encode_escaped_control_chars(br"\\}"), br"\'5c}");
    }

    #[test]
    fn test_idempotent() {
        let once = encode_escaped_control_chars(br"a\\b\{c\}d");
        let twice = encode_escaped_control_chars(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_trailing_backslash_kept() {
        assert_eq!(encode_escaped_control_chars(br"ab\"), br"ab\");
    }
}
