//! Error types for RTF de-encapsulation.

use thiserror::Error;

/// Result type for de-encapsulation operations.
pub type Result<T> = std::result::Result<T, RtfError>;

/// Errors surfaced by the de-encapsulation pipeline.
///
/// The variants mirror the failure classes of [MS-OXRTFEX]: structural
/// problems with the RTF itself, streams that are valid RTF but carry no
/// encapsulation markers, streams whose markers are present but misordered
/// or duplicated, and streams using features this crate refuses to handle.
#[derive(Error, Debug)]
pub enum RtfError {
    /// Lexical or structural violation of the RTF grammar, or an invalid
    /// header (bad magic, missing charset keyword, unknown codepage).
    #[error("malformed RTF: {0}")]
    MalformedRtf(String),

    /// Structurally valid RTF that does not contain a `\fromhtml1` or
    /// `\fromtext` marker. Most likely an ordinary RTF document.
    #[error("not encapsulated RTF: {0}")]
    NotEncapsulatedRtf(String),

    /// Encapsulation markers are present but misordered or duplicated.
    #[error("malformed encapsulated RTF: {0}")]
    MalformedEncapsulatedRtf(String),

    /// Input the crate recognizes but intentionally rejects, e.g. a whole
    /// OLE compound file instead of the extracted RTF body stream.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl From<std::num::ParseIntError> for RtfError {
    fn from(err: std::num::ParseIntError) -> Self {
        RtfError::MalformedRtf(format!("invalid numeric parameter: {err}"))
    }
}

impl From<std::str::Utf8Error> for RtfError {
    fn from(err: std::str::Utf8Error) -> Self {
        RtfError::MalformedRtf(format!("invalid byte sequence: {err}"))
    }
}
