//! Compressed RTF ([MS-OXRTFCP]) support.
//!
//! The RTF body stored in a `.msg` message is normally wrapped in the
//! LZFu compression container. The facade detects the container and
//! decompresses it before parsing, so callers can hand over the body
//! stream exactly as extracted.

use crate::error::{Result, RtfError};
use zerocopy::FromBytes;
use zerocopy_derive::{FromBytes as DeriveFromBytes, Immutable, KnownLayout};

/// Signature of LZFu-compressed payloads.
const COMPRESSED_SIGNATURE: &[u8; 4] = b"LZFu";

/// Signature of stored (uncompressed) payloads.
const UNCOMPRESSED_SIGNATURE: &[u8; 4] = b"MELA";

/// Dictionary pre-load mandated by [MS-OXRTFCP].
const INIT_DICT: &[u8] = b"{\\rtf1\\ansi\\mac\\deff0\\deftab720{\\fonttbl;}\
{\\f0\\fnil \\froman \\fswiss \\fmodern \\fscript \\fdecor MS Sans SerifSymbolArial\
Times New RomanCourier{\\colortbl\\red0\\green0\\blue0\r\n\\par \\pard\\plain\\f0\\fs20\
\\b\\i\\u\\tab\\tx";

const INIT_DICT_SIZE: usize = 207;
const MAX_DICT_SIZE: usize = 4096;

/// The 16-byte container header.
#[repr(C)]
#[derive(Debug, Clone, Copy, DeriveFromBytes, Immutable, KnownLayout)]
struct ContainerHeader {
    /// Size of everything after this field (little-endian).
    compressed_size: [u8; 4],
    /// Size of the decompressed payload (little-endian).
    raw_size: [u8; 4],
    /// `LZFu` or `MELA`.
    compression_type: [u8; 4],
    /// CRC32 of the payload; zero for `MELA` (little-endian).
    crc32: [u8; 4],
}

impl ContainerHeader {
    #[inline]
    fn raw_size(&self) -> u32 {
        u32::from_le_bytes(self.raw_size)
    }

    #[inline]
    fn crc32(&self) -> u32 {
        u32::from_le_bytes(self.crc32)
    }
}

/// Detect the compressed-RTF container by its signature.
pub fn is_compressed(data: &[u8]) -> bool {
    data.len() >= 16 && (&data[8..12] == COMPRESSED_SIGNATURE || &data[8..12] == UNCOMPRESSED_SIGNATURE)
}

/// Decompress a compressed-RTF container into plain RTF bytes.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 16 {
        return Err(RtfError::MalformedRtf(
            "compressed rtf header must be at least 16 bytes".into(),
        ));
    }
    let header = ContainerHeader::read_from_bytes(&data[..16])
        .map_err(|_| RtfError::MalformedRtf("unreadable compressed rtf header".into()))?;
    let payload = &data[16..];

    match &header.compression_type {
        sig if sig == COMPRESSED_SIGNATURE => decompress_lzfu(payload, &header),
        sig if sig == UNCOMPRESSED_SIGNATURE => {
            if header.crc32() != 0 {
                return Err(RtfError::MalformedRtf(
                    "stored rtf container must carry a zero CRC32".into(),
                ));
            }
            let size = (header.raw_size() as usize).min(payload.len());
            Ok(payload[..size].to_vec())
        }
        other => Err(RtfError::MalformedRtf(format!(
            "unknown rtf compression type {other:?}"
        ))),
    }
}

/// LZFu proper: a 4096-byte ring dictionary, control bytes whose bits
/// select literal bytes or 12+4-bit dictionary references.
fn decompress_lzfu(payload: &[u8], header: &ContainerHeader) -> Result<Vec<u8>> {
    let crc = crc_fast::checksum(crc_fast::CrcAlgorithm::Crc32IsoHdlc, payload) as u32;
    if crc != header.crc32() {
        return Err(RtfError::MalformedRtf(format!(
            "compressed rtf CRC32 mismatch: expected {:#010x}, got {crc:#010x}",
            header.crc32()
        )));
    }

    let mut dict = vec![b' '; MAX_DICT_SIZE];
    dict[..INIT_DICT_SIZE].copy_from_slice(INIT_DICT);
    let mut write_offset = INIT_DICT_SIZE;

    let mut output = Vec::with_capacity(header.raw_size() as usize);
    let mut pos = 0usize;

    while pos < payload.len() {
        let control = payload[pos];
        pos += 1;
        for bit in 0..8 {
            if control & (1 << bit) != 0 {
                // dictionary reference
                if pos + 2 > payload.len() {
                    return Ok(output);
                }
                let token = u16::from_be_bytes([payload[pos], payload[pos + 1]]);
                pos += 2;
                let offset = ((token >> 4) & 0x0FFF) as usize;
                let length = (token & 0x0F) as usize + 2;
                if offset == write_offset {
                    // end-of-stream marker
                    return Ok(output);
                }
                for step in 0..length {
                    let byte = dict[(offset + step) % MAX_DICT_SIZE];
                    output.push(byte);
                    dict[write_offset] = byte;
                    write_offset = (write_offset + 1) % MAX_DICT_SIZE;
                }
            } else {
                // literal
                if pos >= payload.len() {
                    return Ok(output);
                }
                let byte = payload[pos];
                pos += 1;
                output.push(byte);
                dict[write_offset] = byte;
                write_offset = (write_offset + 1) % MAX_DICT_SIZE;
            }
        }
    }
    Ok(output)
}
