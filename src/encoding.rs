//! Codepage resolution for RTF text decoding.
//!
//! RTF carries text in legacy byte encodings selected through three
//! channels: the header charset keyword (`\ansi`, `\mac`, `\pc`, `\pca`),
//! the `\ansicpgN` header control word, and per-font `\fcharsetN` /
//! `\cpgN` declarations in the font table. This module maps all of them
//! onto `encoding_rs` encodings.

use encoding_rs::Encoding;

/// The ANSI default. Used whenever no more specific codepage applies.
pub static DEFAULT_ENCODING: &Encoding = &encoding_rs::WINDOWS_1252_INIT;

/// Map a Windows codepage identifier to an `encoding_rs` encoding.
///
/// Covers the codepages that actually show up in RTF streams; a handful of
/// DOS and Mac pages without an exact `encoding_rs` counterpart map to the
/// closest approximation. Returns `None` for codepages that cannot be
/// decoded at all.
pub fn codepage_to_encoding(codepage: u32) -> Option<&'static Encoding> {
    match codepage {
        // DOS codepages. encoding_rs only ships the Cyrillic page; CP437
        // and CP850 have no decoder here and fall back to the ANSI
        // default, which at least keeps the Latin repertoire close.
        866 => Some(encoding_rs::IBM866),

        // Windows codepages
        874 => Some(encoding_rs::WINDOWS_874),   // Thai
        1250 => Some(encoding_rs::WINDOWS_1250), // Central European
        1251 => Some(encoding_rs::WINDOWS_1251), // Cyrillic
        1252 => Some(encoding_rs::WINDOWS_1252), // Western European
        1253 => Some(encoding_rs::WINDOWS_1253), // Greek
        1254 => Some(encoding_rs::WINDOWS_1254), // Turkish
        1255 => Some(encoding_rs::WINDOWS_1255), // Hebrew
        1256 => Some(encoding_rs::WINDOWS_1256), // Arabic
        1257 => Some(encoding_rs::WINDOWS_1257), // Baltic
        1258 => Some(encoding_rs::WINDOWS_1258), // Vietnamese

        // East Asian codepages
        932 => Some(encoding_rs::SHIFT_JIS),  // Japanese
        936 => Some(encoding_rs::GBK),        // Simplified Chinese
        949 => Some(encoding_rs::EUC_KR),     // Korean
        950 => Some(encoding_rs::BIG5),       // Traditional Chinese
        1361 => Some(encoding_rs::EUC_KR),    // Korean Johab (approximation)
        20932 => Some(encoding_rs::EUC_JP),   // Japanese EUC-JP
        20936 => Some(encoding_rs::GBK),      // GB2312
        50220 | 50222 => Some(encoding_rs::ISO_2022_JP), // Japanese JIS
        51932 => Some(encoding_rs::EUC_JP),
        51936 => Some(encoding_rs::GBK),
        51949 => Some(encoding_rs::EUC_KR),
        54936 => Some(encoding_rs::GB18030),  // superset of GBK

        // ISO 8859 series
        28591 => Some(encoding_rs::WINDOWS_1252), // ISO-8859-1 approximation
        28592 => Some(encoding_rs::ISO_8859_2),
        28593 => Some(encoding_rs::ISO_8859_3),
        28594 => Some(encoding_rs::ISO_8859_4),
        28595 => Some(encoding_rs::ISO_8859_5),
        28596 => Some(encoding_rs::ISO_8859_6),
        28597 => Some(encoding_rs::ISO_8859_7),
        28598 | 38598 => Some(encoding_rs::ISO_8859_8),
        28603 => Some(encoding_rs::ISO_8859_13),
        28605 => Some(encoding_rs::ISO_8859_15),

        // KOI8 series
        20866 => Some(encoding_rs::KOI8_R),
        21866 => Some(encoding_rs::KOI8_U),

        // Macintosh
        10000 => Some(encoding_rs::MACINTOSH),
        10001 => Some(encoding_rs::SHIFT_JIS),    // Mac Japanese
        10002 => Some(encoding_rs::BIG5),         // Mac Traditional Chinese
        10003 => Some(encoding_rs::EUC_KR),       // Mac Korean
        10004 => Some(encoding_rs::ISO_8859_6),   // Mac Arabic (approximation)
        10005 => Some(encoding_rs::WINDOWS_1255), // Mac Hebrew (approximation)
        10007 => Some(encoding_rs::X_MAC_CYRILLIC),
        10008 => Some(encoding_rs::GBK),          // Mac Simplified Chinese
        10017 => Some(encoding_rs::X_MAC_CYRILLIC), // Mac Ukrainian
        10021 => Some(encoding_rs::WINDOWS_874),  // Mac Thai (approximation)
        10029 => Some(encoding_rs::ISO_8859_2),   // Mac Latin 2 (approximation)
        10081 => Some(encoding_rs::WINDOWS_1254), // Mac Turkish (approximation)

        // Unicode
        1200 => Some(encoding_rs::UTF_16LE),
        1201 => Some(encoding_rs::UTF_16BE),
        65000 => Some(encoding_rs::UTF_8), // UTF-7, decoded as UTF-8
        65001 => Some(encoding_rs::UTF_8),

        // US-ASCII
        20127 => Some(encoding_rs::WINDOWS_1252),

        _ => None,
    }
}

/// Map a `\fcharsetN` argument to its Windows codepage.
///
/// The table is the documented charset-to-codepage mapping; DEFAULT, OEM
/// and SYMBOL charsets carry no codepage and return `None`.
pub fn charset_to_codepage(fcharset: i32) -> Option<u32> {
    match fcharset {
        0 => Some(1252),   // ANSI_CHARSET
        1 => None,         // DEFAULT_CHARSET
        2 => None,         // SYMBOL_CHARSET
        77 => Some(10000), // MAC_CHARSET
        128 => Some(932),  // SHIFTJIS_CHARSET
        129 => Some(949),  // HANGUL_CHARSET
        130 => Some(1361), // JOHAB_CHARSET
        134 => Some(936),  // GB2312_CHARSET
        136 => Some(950),  // CHINESEBIG5_CHARSET
        161 => Some(1253), // GREEK_CHARSET
        162 => Some(1254), // TURKISH_CHARSET
        163 => Some(1258), // VIETNAMESE_CHARSET
        177 => Some(1255), // HEBREW_CHARSET
        178 => Some(1256), // ARABIC_CHARSET
        186 => Some(1257), // BALTIC_CHARSET
        204 => Some(1251), // RUSSIAN_CHARSET
        222 => Some(874),  // THAI_CHARSET
        238 => Some(1250), // EE_CHARSET
        255 => None,       // OEM_CHARSET
        _ => None,
    }
}

/// Registered Windows codepage identifiers, used to validate `\ansicpgN`
/// and `\cpgN` arguments.
///
/// A codepage can be registered without being decodable here (EBCDIC
/// pages, for instance); validation and decoding are separate concerns.
const REGISTERED_CODEPAGES: &[u32] = &[
    37, 437, 500, 708, 709, 710, 720, 737, 775, 850, 852, 855, 857, 858, 860, 861, 862, 863, 864,
    865, 866, 869, 870, 874, 875, 932, 936, 949, 950, 1026, 1047, 1140, 1141, 1142, 1143, 1144,
    1145, 1146, 1147, 1148, 1149, 1200, 1201, 1250, 1251, 1252, 1253, 1254, 1255, 1256, 1257,
    1258, 1361, 10000, 10001, 10002, 10003, 10004, 10005, 10006, 10007, 10008, 10010, 10017,
    10021, 10029, 10079, 10081, 10082, 12000, 12001, 20000, 20001, 20002, 20003, 20004, 20005,
    20105, 20106, 20107, 20108, 20127, 20261, 20269, 20273, 20277, 20278, 20280, 20284, 20285,
    20290, 20297, 20420, 20423, 20424, 20833, 20838, 20866, 20871, 20880, 20905, 20924, 20932,
    20936, 20949, 21025, 21027, 21866, 28591, 28592, 28593, 28594, 28595, 28596, 28597, 28598,
    28599, 28603, 28605, 29001, 38598, 50220, 50221, 50222, 50225, 50227, 50229, 50930, 50931,
    50933, 50935, 50936, 50937, 50939, 51932, 51936, 51949, 51950, 52936, 54936, 57002, 57003,
    57004, 57005, 57006, 57007, 57008, 57009, 57010, 57011, 65000, 65001,
];

/// Check whether a number names a registered Windows codepage.
pub fn is_registered_codepage(codepage: u32) -> bool {
    REGISTERED_CODEPAGES.binary_search(&codepage).is_ok()
}
