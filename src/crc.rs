//! CRC_32 checks for long-form sections
//!
//! Decoding never verifies checksums; the CRC_32 field is reported as read.
//! These helpers let callers check it separately.

use crc::{Crc, CRC_32_MPEG_2};

use crate::field::{SyntaxField, SyntaxKind};

const MPEG2: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// CRC-32/MPEG-2 of `data`
pub fn crc32_mpeg2(data: &[u8]) -> u32 {
    MPEG2.checksum(data)
}

/// Whether the trailing four bytes of `section` are its CRC_32
pub fn verify_section(section: &[u8]) -> bool {
    if section.len() < 4 {
        return false;
    }
    let (body, trailer) = section.split_at(section.len() - 4);
    let stored = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    crc32_mpeg2(body) == stored
}

/// Check the CRC_32 of a decoded section against the buffer it came from
///
/// Returns `None` when `root` does not end with a 32-bit checksum field or
/// does not lie inside `data`.
pub fn verify_decoded(data: &[u8], root: &SyntaxField) -> Option<bool> {
    let last = root.children.last()?;
    if last.kind != SyntaxKind::Checksum || last.bit_length != 32 {
        return None;
    }
    let section = data.get(root.position..root.position + root.byte_length())?;
    Some(verify_section(section))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Cursor;
    use crate::field::FieldValue;

    #[test]
    fn test_check_value() {
        assert_eq!(crc32_mpeg2(b"123456789"), 0x0376_E6E7);
        assert_eq!(crc32_mpeg2(&[]), 0xFFFF_FFFF);
    }

    #[test]
    fn test_verify_section() {
        let mut section = vec![0x00u8, 0xB0, 0x0D, 0x00, 0x01, 0xC1, 0x00, 0x00, 0x00, 0x01, 0xF0, 0x00];
        let crc = crc32_mpeg2(&section);
        section.extend_from_slice(&crc.to_be_bytes());
        assert!(verify_section(&section));

        section[4] ^= 0x01;
        assert!(!verify_section(&section));
        assert!(!verify_section(&[0x00, 0x01]));
    }

    #[test]
    fn test_verify_decoded() {
        let mut data = vec![0x70u8, 0x70, 0x05];
        data.extend_from_slice(&crc32_mpeg2(&[0x70, 0x70, 0x05]).to_be_bytes());

        let mut root = SyntaxField::new(SyntaxKind::Section, "s", Cursor::at(0));
        root.bit_length = data.len() * 8;
        let mut crc = SyntaxField::new(SyntaxKind::Checksum, "CRC_32", Cursor::at(3));
        crc.bit_length = 32;
        crc.value = FieldValue::Number(0);
        root.children.push(crc);
        assert_eq!(verify_decoded(&data, &root), Some(true));

        root.children[0].kind = SyntaxKind::Number;
        assert_eq!(verify_decoded(&data, &root), None);
    }
}
