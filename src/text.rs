//! Character payload decoding for text fields
//!
//! Character-set handling is encoding specific, so the syntax decoder hands
//! text payloads to a [`TextDecoder`]. [`DvbTextDecoder`] implements the
//! character table selection of ETSI EN 300 468 Annex A.

use encoding_rs::Encoding;

/// Turns a raw text payload into a string
pub trait TextDecoder: Send + Sync {
    /// Decode `bytes`; undecodable input is replaced, never rejected
    fn decode(&self, bytes: &[u8]) -> String;
}

/// DVB SI strings with a leading character table selector
#[derive(Debug, Clone, Copy, Default)]
pub struct DvbTextDecoder;

impl DvbTextDecoder {
    /// Split the selector bytes off and pick the character table
    fn select(bytes: &[u8]) -> (&'static Encoding, &[u8], bool) {
        let Some(&first) = bytes.first() else {
            return (encoding_rs::WINDOWS_1252, bytes, true);
        };

        let single = |enc| (enc, &bytes[1..], true);
        match first {
            0x01 => single(encoding_rs::ISO_8859_5),
            0x02 => single(encoding_rs::ISO_8859_6),
            0x03 => single(encoding_rs::ISO_8859_7),
            0x04 => single(encoding_rs::ISO_8859_8),
            0x05 => single(encoding_rs::WINDOWS_1254),
            0x06 => single(encoding_rs::ISO_8859_10),
            0x07 => single(encoding_rs::WINDOWS_874),
            0x09 => single(encoding_rs::ISO_8859_13),
            0x0A => single(encoding_rs::ISO_8859_14),
            0x0B => single(encoding_rs::ISO_8859_15),
            0x10 if bytes.len() >= 3 => {
                let table = match bytes[2] {
                    0x02 => encoding_rs::ISO_8859_2,
                    0x03 => encoding_rs::ISO_8859_3,
                    0x04 => encoding_rs::ISO_8859_4,
                    0x05 => encoding_rs::ISO_8859_5,
                    0x06 => encoding_rs::ISO_8859_6,
                    0x07 => encoding_rs::ISO_8859_7,
                    0x08 => encoding_rs::ISO_8859_8,
                    0x09 => encoding_rs::WINDOWS_1254,
                    0x0A => encoding_rs::ISO_8859_10,
                    0x0B => encoding_rs::WINDOWS_874,
                    0x0D => encoding_rs::ISO_8859_13,
                    0x0E => encoding_rs::ISO_8859_14,
                    0x0F => encoding_rs::ISO_8859_15,
                    0x10 => encoding_rs::ISO_8859_16,
                    _ => encoding_rs::WINDOWS_1252,
                };
                (table, &bytes[3..], true)
            }
            0x11 => (encoding_rs::UTF_16BE, &bytes[1..], false),
            0x12 => (encoding_rs::EUC_KR, &bytes[1..], false),
            0x13 => (encoding_rs::GBK, &bytes[1..], false),
            0x14 => (encoding_rs::BIG5, &bytes[1..], false),
            0x15 => (encoding_rs::UTF_8, &bytes[1..], false),
            0x1F if bytes.len() >= 2 => (encoding_rs::WINDOWS_1252, &bytes[2..], true),
            // remaining selector values are reserved
            0x00..=0x1F => single(encoding_rs::WINDOWS_1252),
            // no selector: the default table (ISO 6937, approximated)
            _ => (encoding_rs::WINDOWS_1252, bytes, true),
        }
    }
}

impl TextDecoder for DvbTextDecoder {
    fn decode(&self, bytes: &[u8]) -> String {
        let (table, payload, single_byte) = Self::select(bytes);

        if !single_byte {
            let (text, _) = table.decode_without_bom_handling(payload);
            return text.into_owned();
        }

        // C1 control codes: 0x8A is a line break, emphasis and the rest are dropped
        let cleaned: Vec<u8> = payload
            .iter()
            .filter_map(|&b| match b {
                0x8A => Some(b'\n'),
                0x80..=0x9F => None,
                _ => Some(b),
            })
            .collect();
        let (text, _) = table.decode_without_bom_handling(&cleaned);
        text.into_owned()
    }
}

/// Plain UTF-8 with lossy replacement, for private payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8TextDecoder;

impl TextDecoder for Utf8TextDecoder {
    fn decode(&self, bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }
}
