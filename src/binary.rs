//! Binary payload extraction.
//!
//! `\binN` is followed by N raw bytes which may contain `{`, `}` and `\`
//! and must never reach the tokenizer. This pre-scan splices the payload
//! bytes out of the stream, leaving the `\binN` control word in place,
//! and keeps a positional record per payload so a caller can reassemble
//! the original stream.

use memchr::memmem;

/// One extracted `\binN` payload.
///
/// All positions reference the ORIGINAL stream: inserting `data` back at
/// `bin_start_pos` (left to right across records) reproduces the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryRecord {
    /// The raw payload bytes.
    pub data: Vec<u8>,
    /// The numeric argument of the control word.
    pub param: i32,
    /// Offset of the `\bin` control word.
    pub start_pos: usize,
    /// Offset where the payload starts.
    pub bin_start_pos: usize,
    /// Offset one past the payload end.
    pub end_pos: usize,
}

/// Splice all `\binN` payloads out of `raw`.
///
/// Returns the stripped stream and the extracted records in document
/// order. Matches never overlap: a `\bin` sequence inside an earlier
/// payload is data, not markup. `\bin` without an immediately following
/// digit (`\binary`, a bare `\bin`) is left for the tokenizer to handle
/// as an ordinary control word.
pub fn strip_binary(raw: &[u8]) -> (Vec<u8>, Vec<BinaryRecord>) {
    let mut records = Vec::new();
    let mut out = Vec::with_capacity(raw.len());
    let mut cursor = 0usize;

    for pos in memmem::find_iter(raw, b"\\bin") {
        if pos < cursor {
            continue; // inside the previous payload
        }
        let digits_start = pos + 4;
        let mut digits_end = digits_start;
        while digits_end < raw.len() && raw[digits_end].is_ascii_digit() {
            digits_end += 1;
        }
        if digits_end == digits_start {
            continue; // no numeric argument; not a binary introducer
        }
        let Ok(digits) = std::str::from_utf8(&raw[digits_start..digits_end]) else {
            continue;
        };
        let Ok(param) = digits.parse::<i32>() else {
            continue; // absurd length; the tokenizer will reject it
        };

        // optional single space delimiter, part of the control word
        let mut data_start = digits_end;
        if raw.get(data_start) == Some(&b' ') {
            data_start += 1;
        }
        let len = param.max(0) as usize;
        let data_end = (data_start + len).min(raw.len());

        out.extend_from_slice(&raw[cursor..data_start]);
        records.push(BinaryRecord {
            data: raw[data_start..data_end].to_vec(),
            param,
            start_pos: pos,
            bin_start_pos: data_start,
            end_pos: data_end,
        });
        cursor = data_end;
    }
    out.extend_from_slice(&raw[cursor..]);

    if !records.is_empty() {
        log::info!("extracted {} binary payload(s) from rtf stream", records.len());
    }
    (out, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_extraction() {
        let raw = b"{\\rtf1\\bin5 \x01\x02{\x03}\\par}";
        let (stripped, records) = strip_binary(raw);
        assert_eq!(stripped, b"{\\rtf1\\bin5 \\par}");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data, b"\x01\x02{\x03}");
        assert_eq!(records[0].param, 5);
        assert_eq!(records[0].start_pos, 6);
        assert_eq!(records[0].bin_start_pos, 12);
        assert_eq!(records[0].end_pos, 17);
    }

    #[test]
    fn test_splicing_round_trip() {
        let raw = b"{\\rtf1\\bin3 \xff\xfe\xfd mid\\bin2 \\\\tail}".to_vec();
        let (stripped, records) = strip_binary(&raw);
        // reinsert each payload at its original offset, left to right
        let mut rebuilt = stripped.clone();
        for rec in &records {
            let mut with_data = Vec::new();
            with_data.extend_from_slice(&rebuilt[..rec.bin_start_pos]);
            with_data.extend_from_slice(&rec.data);
            with_data.extend_from_slice(&rebuilt[rec.bin_start_pos..]);
            rebuilt = with_data;
        }
        assert_eq!(rebuilt, raw);
    }

    #[test]
    fn test_zero_length() {
        let raw = b"{\\bin0 x}";
        let (stripped, records) = strip_binary(raw);
        assert_eq!(stripped, raw);
        assert_eq!(records.len(), 1);
        assert!(records[0].data.is_empty());
    }

    #[test]
    fn test_bin_without_number_untouched() {
        let raw = b"{\\binary stuff\\bin }";
        let (stripped, records) = strip_binary(raw);
        assert_eq!(stripped, raw);
        assert!(records.is_empty());
    }

    #[test]
    fn test_marker_inside_payload_not_matched() {
        // the payload itself spells \bin2 and must be treated as data
        let raw = b"{\\bin6 \\bin2 x tail}";
        let (stripped, records) = strip_binary(raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data, b"\\bin2 ");
        assert_eq!(stripped, b"{\\bin6 x tail}");
    }

    #[test]
    fn test_payload_truncated_by_eof() {
        let raw = b"{\\bin10 ab";
        let (stripped, records) = strip_binary(raw);
        assert_eq!(stripped, b"{\\bin10 ");
        assert_eq!(records[0].data, b"ab");
    }
}
