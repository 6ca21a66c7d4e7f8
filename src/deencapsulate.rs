//! De-encapsulation facade.
//!
//! Ties the pipeline together: binary stripping, escape normalization,
//! lexing, tree building, encapsulation validation, HTMLRTF suppression,
//! text decoding and the final tree flattening. Compressed ([MS-OXRTFCP])
//! input is detected and decompressed automatically, so the RTF body
//! stream of a `.msg` can be handed over as extracted.

use bumpalo::Bump;

use crate::binary::{self, BinaryRecord};
use crate::compressed;
use crate::decode::TextDecoder;
use crate::error::{Result, RtfError};
use crate::escape::encode_escaped_control_chars;
use crate::fonts::parse_font_table;
use crate::header::{self, ContentType};
use crate::htmlrtf::suppressed_offsets;
use crate::lexer::Lexer;
use crate::parser;
use crate::transform;

/// Magic of an OLE compound file: a whole `.msg` rather than the RTF body
/// stream extracted from it.
const OLE_MAGIC: &[u8] = b"\xd0\xcf\x11\xe0\xa1\xb1\x1a\xe1";

/// UTF-8 byte order mark.
const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Knobs for the de-encapsulation pipeline. The defaults follow
/// [MS-OXRTFEX] strictly.
#[derive(Debug, Clone)]
pub struct Options {
    /// Assume `\ansi` when the header lacks a charset keyword instead of
    /// failing. Dangerous on untrusted input.
    pub fallback_to_default_charset: bool,
    /// Starting `\uc` value, for inputs that are fragments without the
    /// header that would normally set it.
    pub initial_byte_count: u32,
    /// On a broken surrogate sequence, emit the ANSI fallback bytes that
    /// accompanied the `\uN` escapes instead of failing.
    pub use_ascii_alternatives_on_unicode_decode_failure: bool,
    /// Keep `\fN` tokens in the tree after decoding, for diagnostics.
    /// They never reach the output either way.
    pub keep_fontdef: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            fallback_to_default_charset: false,
            initial_byte_count: 1,
            use_ascii_alternatives_on_unicode_decode_failure: false,
            keep_fontdef: false,
        }
    }
}

/// De-encapsulating RTF reader for HTML/TEXT bodies found in `.msg`
/// messages.
///
/// ```
/// use longan::DeEncapsulator;
///
/// let raw = br"{\rtf1\ansi\ansicpg1252\fromhtml1{\*\htmltag64 <p>hi</p>}}";
/// let mut rtf = DeEncapsulator::new(&raw[..])?;
/// rtf.deencapsulate()?;
/// assert_eq!(rtf.html(), Some(&b"<p>hi</p>"[..]));
/// # Ok::<(), longan::RtfError>(())
/// ```
#[derive(Debug)]
pub struct DeEncapsulator {
    raw: Vec<u8>,
    options: Options,
    content: Option<Vec<u8>>,
    content_type: Option<ContentType>,
    found_binary: Vec<BinaryRecord>,
}

impl DeEncapsulator {
    /// Load raw RTF bytes. Catches the common mistakes early: empty
    /// input and whole OLE compound files.
    pub fn new(raw: impl Into<Vec<u8>>) -> Result<Self> {
        Self::with_options(raw, Options::default())
    }

    /// Load raw RTF bytes with explicit pipeline options.
    pub fn with_options(raw: impl Into<Vec<u8>>, options: Options) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(RtfError::MalformedRtf("input is empty".into()));
        }
        if raw.starts_with(OLE_MAGIC) {
            return Err(RtfError::UnsupportedFormat(
                "input is a whole OLE compound file; extract the RTF body stream first".into(),
            ));
        }
        Ok(Self {
            raw,
            options,
            content: None,
            content_type: None,
            found_binary: Vec::new(),
        })
    }

    /// Load RTF handed over as a text string. Encoded as Latin-1 so every
    /// code point below U+0100 keeps its byte identity.
    pub fn from_text(text: &str) -> Result<Self> {
        let mut bytes = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let cp = ch as u32;
            if cp > 0xFF {
                return Err(RtfError::MalformedRtf(format!(
                    "text input contains U+{cp:04X}, which has no single-byte form"
                )));
            }
            bytes.push(cp as u8);
        }
        Self::new(bytes)
    }

    /// Run the pipeline and populate `content`/`content_type`.
    pub fn deencapsulate(&mut self) -> Result<()> {
        // .msg property streams are frequently NUL padded
        let mut data: &[u8] = &self.raw;
        while data.last() == Some(&0) {
            data = &data[..data.len() - 1];
        }

        let decompressed;
        if compressed::is_compressed(data) {
            decompressed = compressed::decompress(data)?;
            data = &decompressed;
        }
        if data.starts_with(UTF8_BOM) {
            data = &data[UTF8_BOM.len()..];
        }

        let (stripped, found_binary) = binary::strip_binary(data);
        self.found_binary = found_binary;

        let normalized = encode_escaped_control_chars(&stripped);
        let arena = Bump::new();

        let tokens = Lexer::new(&normalized).tokenize()?;
        let mut doc = parser::parse(tokens)?;

        let header = header::validate(&doc, self.options.fallback_to_default_charset)?;
        log::debug!(
            "validated encapsulation header: content_type={}, charset={:?}, ansicpg={:?}",
            header.content_type.as_str(),
            header.charset,
            header.ansicpg
        );
        let fonts = parse_font_table(&doc);

        let suppressed = suppressed_offsets(&doc);
        transform::delete_tokens(&mut doc, &suppressed);

        let mut decoder = TextDecoder::new(
            &arena,
            &fonts,
            header.encoding,
            header.default_font,
            &self.options,
        );
        decoder.decode(&mut doc)?;

        self.content = Some(transform::render(&doc));
        self.content_type = Some(header.content_type);
        Ok(())
    }

    /// The de-encapsulated payload, whatever its type. `None` before
    /// `deencapsulate` has run.
    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    /// Whether the payload was HTML or plain text.
    pub fn content_type(&self) -> Option<ContentType> {
        self.content_type
    }

    /// The payload, when it is HTML.
    pub fn html(&self) -> Option<&[u8]> {
        match self.content_type {
            Some(ContentType::Html) => self.content.as_deref(),
            _ => None,
        }
    }

    /// The payload, when it is plain text.
    pub fn text(&self) -> Option<&[u8]> {
        match self.content_type {
            Some(ContentType::Text) => self.content.as_deref(),
            _ => None,
        }
    }

    /// Binary payloads spliced out of the stream before parsing.
    pub fn found_binary(&self) -> &[BinaryRecord] {
        &self.found_binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deencapsulate(raw: &[u8]) -> Result<DeEncapsulator> {
        let mut rtf = DeEncapsulator::new(raw)?;
        rtf.deencapsulate()?;
        Ok(rtf)
    }

    #[test]
    fn test_basic_html() {
        let rtf =
            deencapsulate(br"{\rtf1\ansi\ansicpg1252\fromhtml1{\*\htmltag <p>hi</p>}}").unwrap();
        assert_eq!(rtf.content_type(), Some(ContentType::Html));
        assert_eq!(rtf.content(), Some(&b"<p>hi</p>"[..]));
        assert_eq!(rtf.html(), Some(&b"<p>hi</p>"[..]));
        assert_eq!(rtf.text(), None);
    }

    #[test]
    fn test_basic_text() {
        let rtf = deencapsulate(br"{\rtf1\ansi\fromtext hello\par world}").unwrap();
        assert_eq!(rtf.content_type(), Some(ContentType::Text));
        assert_eq!(rtf.content(), Some(&b"hello\nworld"[..]));
        assert_eq!(rtf.text(), Some(&b"hello\nworld"[..]));
        assert_eq!(rtf.html(), None);
    }

    #[test]
    fn test_htmlrtf_region_suppressed() {
        let rtf =
            deencapsulate(br"{\rtf1\ansi\fromhtml1\htmlrtf junk\htmlrtf0{\*\htmltag <b>X</b>}}")
                .unwrap();
        assert_eq!(rtf.content(), Some(&b"<b>X</b>"[..]));
    }

    #[test]
    fn test_unicode_escape_in_htmltag() {
        let rtf = deencapsulate(b"{\\rtf1\\ansi\\fromhtml1{\\*\\htmltag \\u8212?}}").unwrap();
        assert_eq!(rtf.content(), Some(&b"\xe2\x80\x94"[..]));
    }

    #[test]
    fn test_surrogate_pair_in_htmltag() {
        let rtf =
            deencapsulate(br"{\rtf1\ansi\fromhtml1{\*\htmltag \u-10179?\u-8704?}}").unwrap();
        assert_eq!(rtf.content(), Some(&b"\xf0\x9f\x98\x80"[..]));
    }

    #[test]
    fn test_missing_charset_is_malformed() {
        assert!(matches!(
            deencapsulate(br"{\rtf1\fromtext}"),
            Err(RtfError::MalformedRtf(_))
        ));
    }

    #[test]
    fn test_realistic_html_shape() {
        let rtf = deencapsulate(
            br"{\rtf1\ansi\ansicpg1252\fromhtml1\deff0{\fonttbl{\f0\fswiss Arial;}}\htmlrtf\pard\plain\htmlrtf0{\*\htmltag64 <html>}{\*\htmltag241 <p>}Hello{\*\htmltag249 </p>}{\*\htmltag64 </html>}}",
        )
        .unwrap();
        assert_eq!(rtf.content(), Some(&b"<html><p>Hello</p></html>"[..]));
    }

    #[test]
    fn test_shift_jis_text_body() {
        let rtf = deencapsulate(
            br"{\rtf1\ansi\ansicpg932\fromtext\deff0{\fonttbl{\f0\fswiss\fcharset128 MS Gothic;}}\'82\'b7\'82\'dd\'82\'dc\'82\'b9\'82\'f1\par}",
        )
        .unwrap();
        let mut expected = "\u{3059}\u{307F}\u{307E}\u{305B}\u{3093}".as_bytes().to_vec();
        expected.push(b'\n');
        assert_eq!(rtf.content(), Some(expected.as_slice()));
    }

    #[test]
    fn test_escaped_control_chars_in_body() {
        let rtf = deencapsulate(b"{\\rtf1\\ansi\\fromtext \\{x\\}\\\\}").unwrap();
        assert_eq!(rtf.content(), Some(&b"{x}\\"[..]));
    }

    #[test]
    fn test_binary_payload_extracted() {
        let rtf =
            deencapsulate(b"{\\rtf1\\ansi\\fromtext\\bin5 \x00\x01{\\xhello}").unwrap();
        assert_eq!(rtf.content(), Some(&b"hello"[..]));
        assert_eq!(rtf.found_binary().len(), 1);
        assert_eq!(rtf.found_binary()[0].data, b"\x00\x01{\\x");
    }

    #[test]
    fn test_trailing_nuls_trimmed() {
        let rtf = deencapsulate(b"{\\rtf1\\ansi\\fromtext hi}\x00\x00").unwrap();
        assert_eq!(rtf.content(), Some(&b"hi"[..]));
    }

    #[test]
    fn test_utf8_bom_skipped() {
        let rtf = deencapsulate(b"\xef\xbb\xbf{\\rtf1\\ansi\\fromtext hi}").unwrap();
        assert_eq!(rtf.content(), Some(&b"hi"[..]));
    }

    #[test]
    fn test_compressed_input_is_decompressed() {
        // the canonical [MS-OXRTFCP] sample decompresses to plain RTF with
        // no FROM marker; reaching NotEncapsulatedRtf proves the container
        // was unwrapped and parsed
        let sample: &[u8] = &[
            0x2d, 0x00, 0x00, 0x00, 0x2b, 0x00, 0x00, 0x00, 0x4c, 0x5a, 0x46, 0x75, 0xf1, 0xc5,
            0xc7, 0xa7, 0x03, 0x00, 0x0a, 0x00, 0x72, 0x63, 0x70, 0x67, 0x31, 0x32, 0x35, 0x42,
            0x32, 0x0a, 0xf3, 0x20, 0x68, 0x65, 0x6c, 0x09, 0x00, 0x20, 0x62, 0x77, 0x05, 0xb0,
            0x6c, 0x64, 0x7d, 0x0a, 0x80, 0x0f, 0xa0,
        ];
        assert!(matches!(
            deencapsulate(sample),
            Err(RtfError::NotEncapsulatedRtf(_))
        ));
    }

    #[test]
    fn test_stored_container_round_trip() {
        let body: &[u8] = br"{\rtf1\ansi\fromtext hi}";
        let mut data = Vec::new();
        data.extend_from_slice(&((body.len() + 12) as u32).to_le_bytes());
        data.extend_from_slice(&(body.len() as u32).to_le_bytes());
        data.extend_from_slice(b"MELA");
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(body);
        let rtf = deencapsulate(&data).unwrap();
        assert_eq!(rtf.content(), Some(&b"hi"[..]));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            DeEncapsulator::new(Vec::new()),
            Err(RtfError::MalformedRtf(_))
        ));
    }

    #[test]
    fn test_whole_msg_rejected() {
        let mut msg = b"\xd0\xcf\x11\xe0\xa1\xb1\x1a\xe1".to_vec();
        msg.extend_from_slice(&[0u8; 64]);
        assert!(matches!(
            DeEncapsulator::new(msg),
            Err(RtfError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_from_text_constructor() {
        let mut rtf =
            DeEncapsulator::from_text("{\\rtf1\\ansi\\fromtext caf\u{00E9}}").unwrap();
        rtf.deencapsulate().unwrap();
        // the Latin-1 0xE9 byte decodes through windows-1252 back to é
        assert_eq!(rtf.content(), Some("caf\u{00E9}".as_bytes()));
    }

    #[test]
    fn test_from_text_rejects_wide_chars() {
        assert!(matches!(
            DeEncapsulator::from_text("{\\rtf1 \u{4E16}}"),
            Err(RtfError::MalformedRtf(_))
        ));
    }

    #[test]
    fn test_content_none_before_run() {
        let rtf = DeEncapsulator::new(&br"{\rtf1\ansi\fromtext hi}"[..]).unwrap();
        assert!(rtf.content().is_none());
        assert!(rtf.content_type().is_none());
    }

    #[test]
    fn test_uc_fallbacks_in_text_body() {
        let rtf =
            deencapsulate(b"{\\rtf1\\ansi\\fromtext\\uc1 \\u1088?\\u1091?}").unwrap();
        assert_eq!(rtf.content(), Some("\u{0440}\u{0443}".as_bytes()));
    }

    #[test]
    fn test_fonttbl_group_never_leaks_into_content() {
        let rtf = deencapsulate(
            br"{\rtf1\ansi\fromtext{\fonttbl{\f0\fswiss Arial;}{\f1\fmodern Courier New;}}body}",
        )
        .unwrap();
        assert_eq!(rtf.content(), Some(&b"body"[..]));
    }
}
