//! Longan - RTF de-encapsulation for Outlook message bodies
//!
//! When Outlook stores an HTML or plain-text message body inside a `.msg`
//! file, it wraps the original content in an RTF container as specified
//! by [MS-OXRTFEX]. This library reverses that encapsulation: it parses
//! the RTF stream, discards the "pretty-printing" RTF the encapsulator
//! added, and reconstructs the original HTML or text bytes with minimal
//! loss.
//!
//! # Features
//!
//! - **Full [MS-OXRTFEX] header validation**: `{\rtf1` magic, charset
//!   keyword, `\fromhtml1`/`\fromtext` detection within the first ten
//!   tokens, `\ansicpg` codepage checking
//! - **Scoped HTMLRTF suppression**: `\htmlrtf`...`\htmlrtf0` regions are
//!   removed with the state machine [MS-OXRTFEX] requires, including
//!   state transfer into nested groups
//! - **Multi-codepage decoding**: font-table driven codepage selection
//!   (`\fcharsetN`, `\cpgN`), `\uN` Unicode escapes with surrogate-pair
//!   handling and `\ucN` fallback consumption, multi-byte CJK hex runs
//! - **Compressed RTF**: LZFu/MELA containers ([MS-OXRTFCP]) are detected
//!   and decompressed transparently
//! - **Binary payload handling**: `\binN` regions are spliced out before
//!   parsing and exposed with positions for reassembly
//!
//! # Example
//!
//! ```
//! use longan::{ContentType, DeEncapsulator};
//!
//! let raw = br"{\rtf1\ansi\ansicpg1252\fromhtml1{\*\htmltag64 <p>hi</p>}}";
//! let mut rtf = DeEncapsulator::new(&raw[..])?;
//! rtf.deencapsulate()?;
//! assert_eq!(rtf.content_type(), Some(ContentType::Html));
//! assert_eq!(rtf.content(), Some(&b"<p>hi</p>"[..]));
//! # Ok::<(), longan::RtfError>(())
//! ```

mod binary;
mod compressed;
mod decode;
mod deencapsulate;
mod encoding;
mod error;
mod escape;
mod fonts;
mod header;
mod htmlrtf;
mod lexer;
mod parser;
mod token;
mod transform;

// Re-exports
pub use binary::BinaryRecord;
pub use compressed::{decompress, is_compressed};
pub use deencapsulate::{DeEncapsulator, Options};
pub use encoding::{charset_to_codepage, codepage_to_encoding, is_registered_codepage};
pub use error::{Result, RtfError};
pub use fonts::{FontDef, FontTable};
pub use header::{Charset, ContentType};
