//! Section decoder entry point
//!
//! Every PSI/SI section opens with the same 24-bit header, so its framing is
//! read directly rather than through a template. The table id then selects
//! the template that describes the whole section, header included.

use bitfield::bitfield;
use once_cell::sync::Lazy;
use std::sync::Arc;

use crate::bits::Cursor;
use crate::buffer::ByteSource;
use crate::decoder::SyntaxDecoder;
use crate::definition::{DataField, Encoding};
use crate::error::{DecodeError, Result};
use crate::field::{SyntaxField, SyntaxKind};
use crate::registry::TemplateRegistry;
use crate::template::Template;
use crate::text::TextDecoder;

/// Bytes taken by the fixed section header
pub const SECTION_HEADER_LEN: usize = 3;

bitfield! {
    /// table_id, section_syntax_indicator, private_indicator, reserved and
    /// section_length packed in the low 24 bits
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct SectionHeader(u32);
    impl Debug;
    pub u8, table_id, _: 23, 16;
    pub section_syntax_indicator, _: 15;
    pub private_indicator, _: 14;
    pub u8, reserved, _: 13, 12;
    pub u16, section_length, _: 11, 0;
}

impl SectionHeader {
    /// Bytes covered by the whole section, header included
    pub fn total_len(&self) -> usize {
        SECTION_HEADER_LEN + self.section_length() as usize
    }
}

/// Read the fixed header at `position`
pub fn read_header<B: ByteSource + ?Sized>(
    buf: &B,
    position: usize,
    limit: usize,
) -> Result<SectionHeader> {
    let limit = limit.min(buf.len());
    if position + SECTION_HEADER_LEN > limit {
        return Err(DecodeError::out_of_bounds(format!(
            "section header at {} needs {} bytes before byte {}",
            position, SECTION_HEADER_LEN, limit
        )));
    }
    Ok(SectionHeader(buf.read_u24(position)?))
}

static PRIVATE_SECTION: Lazy<Arc<Template>> = Lazy::new(|| Arc::new(private_section_template()));

/// Template used for table ids without a registered template
pub fn private_section_template() -> Template {
    Template::table("private_section", (0x00..=0xFF).collect::<Vec<u8>>())
        .with_group("private")
        .field(DataField::unsigned("table_id", 8).with_format("0x%02X"))
        .field(DataField::bits("section_syntax_indicator", 1))
        .field(DataField::bits("private_indicator", 1))
        .field(DataField::bits("reserved", 2))
        .field(DataField::unsigned("section_length", 12))
        .field(DataField::sized_by(
            "private_data",
            Encoding::Octets,
            "section_length",
        ))
}

/// Label of a section with no registered template
pub fn private_section_label(table_id: u8) -> String {
    format!("private section (table_id=0x{:02X})", table_id)
}

/// Decode the section starting at `position`
///
/// `limit` is an exclusive byte bound, for example the end of the enclosing
/// payload. A section whose declared length runs past the limit or the buffer
/// is rejected before any field is decoded.
pub fn decode_section<B: ByteSource + ?Sized>(
    buf: &B,
    position: usize,
    limit: usize,
    registry: &TemplateRegistry,
    text: &dyn TextDecoder,
) -> Result<SyntaxField> {
    let limit = limit.min(buf.len());
    let header = read_header(buf, position, limit)?;
    let end = position + header.total_len();
    if end > limit {
        return Err(DecodeError::out_of_bounds(format!(
            "section_length {} at {} ends at byte {} past byte {}",
            header.section_length(),
            position,
            end,
            limit
        )));
    }

    let table_id = header.table_id();
    let (template, label) = match registry.lookup_table(table_id) {
        Some(template) => {
            let label = template.display_name(table_id).to_string();
            (template, label)
        }
        None => (Arc::clone(&PRIVATE_SECTION), private_section_label(table_id)),
    };

    let start = Cursor::at(position);
    let (children, _) = SyntaxDecoder::new(buf.as_bytes(), text).decode(&template.fields, start, end)?;

    let mut root = SyntaxField::new(SyntaxKind::Section, &template.name, start);
    root.display = label.clone();
    root.label = Some(label);
    root.children = children;
    root.close(Cursor::at(end));
    Ok(root)
}
