//! Descriptor decoder entry point

use bitfield::bitfield;
use log::debug;
use once_cell::sync::Lazy;
use std::sync::Arc;

use crate::bits::Cursor;
use crate::buffer::ByteSource;
use crate::decoder::SyntaxDecoder;
use crate::definition::{DataField, Encoding};
use crate::error::{DecodeError, Result};
use crate::field::{FieldValue, SyntaxField, SyntaxKind};
use crate::registry::TemplateRegistry;
use crate::template::Template;
use crate::text::TextDecoder;

/// Bytes taken by descriptor_tag and descriptor_length
pub const DESCRIPTOR_HEADER_LEN: usize = 2;

/// Name of the leaf emitted for a descriptor that failed to decode
pub const UNPARSED_DESCRIPTOR: &str = "unparsed_descriptor";

bitfield! {
    /// descriptor_tag and descriptor_length
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct DescriptorHeader(u16);
    impl Debug;
    pub u8, tag, _: 15, 8;
    pub u8, length, _: 7, 0;
}

impl DescriptorHeader {
    /// Bytes covered by the whole descriptor, header included
    pub fn total_len(&self) -> usize {
        DESCRIPTOR_HEADER_LEN + self.length() as usize
    }
}

/// Read the descriptor header at `position`
pub fn read_header<B: ByteSource + ?Sized>(
    buf: &B,
    position: usize,
    limit: usize,
) -> Result<DescriptorHeader> {
    let limit = limit.min(buf.len());
    if position + DESCRIPTOR_HEADER_LEN > limit {
        return Err(DecodeError::out_of_bounds(format!(
            "descriptor header at {} needs {} bytes before byte {}",
            position, DESCRIPTOR_HEADER_LEN, limit
        )));
    }
    Ok(DescriptorHeader(buf.read_u16(position)?))
}

static UNKNOWN_DESCRIPTOR: Lazy<Arc<Template>> =
    Lazy::new(|| Arc::new(unknown_descriptor_template()));

/// Template used for tags without a registered template
///
/// Registered under tag 0x00 only to satisfy verification; it is never
/// looked up by key.
pub fn unknown_descriptor_template() -> Template {
    Template::descriptor("descriptor", 0x00)
        .field(DataField::unsigned("descriptor_tag", 8).with_format("0x%02X"))
        .field(DataField::unsigned("descriptor_length", 8))
        .field(DataField::sized_by(
            "descriptor_payload",
            Encoding::Octets,
            "descriptor_length",
        ))
}

/// Label of a descriptor with no registered template
pub fn unknown_descriptor_label(tag: u8) -> String {
    format!("unknown descriptor (tag=0x{:02X})", tag)
}

/// Pick the template for a descriptor
///
/// When any template narrows `tag` by an extension, the first payload byte is
/// taken as descriptor_tag_extension. A miss on the extended key falls back
/// to the plain tag.
fn select_template(
    bytes: &[u8],
    position: usize,
    header: DescriptorHeader,
    registry: &TemplateRegistry,
) -> Option<Arc<Template>> {
    let tag = header.tag();
    let extension = if header.length() > 0 && registry.has_extensions(tag) {
        bytes.get(position + DESCRIPTOR_HEADER_LEN).copied()
    } else {
        None
    };

    extension
        .and_then(|ext| registry.lookup_descriptor(tag, Some(ext)))
        .or_else(|| registry.lookup_descriptor(tag, None))
}

/// Decode the descriptor starting at `position`
///
/// The descriptor must end at or before `limit` (exclusive) and the end of
/// the buffer; its template never reads past descriptor_length.
pub fn decode_descriptor<B: ByteSource + ?Sized>(
    buf: &B,
    position: usize,
    limit: usize,
    registry: &TemplateRegistry,
    text: &dyn TextDecoder,
) -> Result<SyntaxField> {
    let bytes = buf.as_bytes();
    let limit = limit.min(bytes.len());
    let header = read_header(buf, position, limit)?;
    let end = position + header.total_len();
    if end > limit {
        return Err(DecodeError::out_of_bounds(format!(
            "descriptor 0x{:02X} at {} with length {} ends past byte {}",
            header.tag(),
            position,
            header.length(),
            limit
        )));
    }

    let (template, label) = match select_template(bytes, position, header, registry) {
        Some(template) => {
            let label = template.name.clone();
            (template, label)
        }
        None => (
            Arc::clone(&UNKNOWN_DESCRIPTOR),
            unknown_descriptor_label(header.tag()),
        ),
    };

    let start = Cursor::at(position);
    let (children, _) = SyntaxDecoder::new(bytes, text).decode(&template.fields, start, end)?;

    let mut root = SyntaxField::new(SyntaxKind::Descriptor, &template.name, start);
    root.display = label.clone();
    root.label = Some(label);
    root.children = children;
    root.close(Cursor::at(end));
    Ok(root)
}

/// Decode consecutive descriptors in `position..end`, one failure at a time
///
/// A descriptor that fails to decode becomes an [`UNPARSED_DESCRIPTOR`]
/// octet leaf covering the bytes its header claims (or the rest of the loop
/// when even the header is unusable), and decoding resumes after it. This is
/// a policy for callers that want to show as much of a broken loop as
/// possible; use [`decode_descriptor`] directly to stop at the first error.
pub fn decode_descriptor_loop<B: ByteSource + ?Sized>(
    buf: &B,
    position: usize,
    end: usize,
    registry: &TemplateRegistry,
    text: &dyn TextDecoder,
) -> Vec<SyntaxField> {
    let bytes = buf.as_bytes();
    let end = end.min(bytes.len());
    let mut descriptors = Vec::new();
    let mut at = position;

    while at < end {
        match decode_descriptor(buf, at, end, registry, text) {
            Ok(descriptor) => {
                at += descriptor.byte_length().max(DESCRIPTOR_HEADER_LEN);
                descriptors.push(descriptor);
            }
            Err(err) => {
                let skip_to = match read_header(buf, at, end) {
                    Ok(header) => (at + header.total_len()).min(end),
                    Err(_) => end,
                };
                debug!("descriptor at {}..{} left unparsed: {}", at, skip_to, err);
                descriptors.push(unparsed(bytes, at, skip_to, &err));
                at = skip_to;
            }
        }
    }

    descriptors
}

fn unparsed(bytes: &[u8], start: usize, end: usize, err: &DecodeError) -> SyntaxField {
    let mut leaf = SyntaxField::new(SyntaxKind::Octets, UNPARSED_DESCRIPTOR, Cursor::at(start));
    leaf.value = FieldValue::Octets(bytes[start..end].to_vec());
    leaf.display = err.to_string();
    leaf.close(Cursor::at(end));
    leaf
}
