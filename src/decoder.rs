//! Syntax decoder: interprets field definitions against a byte buffer
//!
//! The walk threads three things through every step: the bit [`Cursor`], the
//! enclosing byte limit, and the fields already decoded in the current scope
//! (for length and condition references). Each step returns the advanced
//! cursor; nothing is mutated in place.
//!
//! Any bounds or reference error aborts the whole decode call. Resilience at
//! the level of individual descriptors is left to callers, see
//! [`crate::descriptor::decode_descriptor_loop`].

use crate::bits::{ensure_available, read_bits, read_units, Cursor};
use crate::definition::{
    ConditionalField, DataField, Encoding, FieldDefinition, LengthSpec, LoopField, LoopKind,
    LoopLength, Presentation,
};
use crate::error::{DecodeError, Result};
use crate::field::{FieldValue, SyntaxField, SyntaxKind};
use crate::mapping::format_number;
use crate::text::TextDecoder;

/// Fields visible to references: decoded siblings, then enclosing scopes
struct Scope<'s> {
    fields: &'s [SyntaxField],
    parent: Option<&'s Scope<'s>>,
}

impl<'s> Scope<'s> {
    fn lookup(&self, name: &str) -> Option<&'s SyntaxField> {
        self.fields
            .iter()
            .rev()
            .find(|f| f.name == name)
            .or_else(|| self.parent.and_then(|p| p.lookup(name)))
    }
}

/// Interpreter for field definition lists
pub struct SyntaxDecoder<'a> {
    data: &'a [u8],
    text: &'a dyn TextDecoder,
}

impl<'a> SyntaxDecoder<'a> {
    /// Create a decoder over `data`
    pub fn new(data: &'a [u8], text: &'a dyn TextDecoder) -> Self {
        SyntaxDecoder { data, text }
    }

    /// Decode `fields` starting at `start`, never reading at or past byte
    /// `limit` (clamped to the buffer length)
    ///
    /// Returns the decoded nodes in order and the cursor after the last one.
    pub fn decode(
        &self,
        fields: &[FieldDefinition],
        start: Cursor,
        limit: usize,
    ) -> Result<(Vec<SyntaxField>, Cursor)> {
        let limit = limit.min(self.data.len());
        self.decode_list(fields, start, limit, None)
    }

    fn decode_list(
        &self,
        fields: &[FieldDefinition],
        start: Cursor,
        limit: usize,
        parent: Option<&Scope<'_>>,
    ) -> Result<(Vec<SyntaxField>, Cursor)> {
        let mut decoded = Vec::with_capacity(fields.len());
        let mut cursor = start;

        for definition in fields {
            let scope = Scope {
                fields: &decoded,
                parent,
            };
            let (nodes, next) = self.decode_one(definition, cursor, limit, &scope)?;
            decoded.extend(nodes);
            cursor = next;
        }

        Ok((decoded, cursor))
    }

    fn decode_one(
        &self,
        definition: &FieldDefinition,
        cursor: Cursor,
        limit: usize,
        scope: &Scope<'_>,
    ) -> Result<(Vec<SyntaxField>, Cursor)> {
        match definition {
            FieldDefinition::Data(field) => {
                let (node, next) = self.decode_data(field, cursor, limit, scope)?;
                Ok((vec![node], next))
            }
            FieldDefinition::Loop(field) => {
                let (node, next) = self.decode_loop(field, cursor, limit, scope)?;
                Ok((vec![node], next))
            }
            FieldDefinition::Conditional(field) => {
                self.decode_conditional(field, cursor, limit, scope)
            }
        }
    }

    fn resolve_number(&self, scope: &Scope<'_>, name: &str, owner: &str) -> Result<u64> {
        let field = scope.lookup(name).ok_or_else(|| {
            DecodeError::unresolved_reference(format!(
                "'{}' refers to '{}' which has not been decoded",
                owner, name
            ))
        })?;
        field.number().ok_or_else(|| {
            DecodeError::invalid_length(format!(
                "'{}' refers to '{}' which is not numeric",
                owner, name
            ))
        })
    }

    fn decode_data(
        &self,
        field: &DataField,
        start: Cursor,
        limit: usize,
        scope: &Scope<'_>,
    ) -> Result<(SyntaxField, Cursor)> {
        let (bits, payload) = match &field.length {
            LengthSpec::Bits(bits) => (*bits as usize, start),
            LengthSpec::Field { name, .. } => {
                let value = self.resolve_number(scope, name, &field.name)?;
                (field.bits_from_reference(value)?, start)
            }
            LengthSpec::Prefixed { prefix_bits } => {
                let (count, next) = read_bits(self.data, start, *prefix_bits as usize, limit)?;
                (field.bits_from_reference(count)?, next)
            }
        };
        field.encoding.check_width(bits)?;
        ensure_available(payload, bits, limit).map_err(|e| match e {
            DecodeError::OutOfBounds(msg) => {
                DecodeError::out_of_bounds(format!("field '{}': {}", field.name, msg))
            }
            other => other,
        })?;

        let presentation = &field.presentation;
        let (mut node, end) = match field.encoding {
            Encoding::Bits | Encoding::Unsigned | Encoding::Checksum => {
                let (value, end) = read_bits(self.data, payload, bits, limit)?;
                let kind = match field.encoding {
                    Encoding::Bits => SyntaxKind::Bits,
                    Encoding::Checksum => SyntaxKind::Checksum,
                    _ => SyntaxKind::Number,
                };
                let label = presentation.mappings.resolve(value).map(str::to_string);
                let text = number_text(field.encoding, presentation, value, bits);

                let mut node = SyntaxField::new(kind, &field.name, start);
                node.display = present(presentation, text, label.as_deref());
                node.value = FieldValue::Number(value);
                node.label = label;
                (node, end)
            }
            Encoding::Nibbles => {
                let (nibbles, end) = read_units(self.data, payload, 4, bits / 4, limit)?;
                let text: String = nibbles
                    .iter()
                    .map(|n| char::from_digit(u32::from(*n), 16).unwrap_or('?'))
                    .collect();

                let mut node = SyntaxField::new(SyntaxKind::Nibbles, &field.name, start);
                node.display = present(presentation, text, None);
                node.value = FieldValue::Nibbles(nibbles);
                (node, end)
            }
            Encoding::Octets => {
                let (octets, end) = read_units(self.data, payload, 8, bits / 8, limit)?;
                let text = octets
                    .iter()
                    .map(|b| format!("{:02X}", b))
                    .collect::<Vec<_>>()
                    .join(" ");

                let mut node = SyntaxField::new(SyntaxKind::Octets, &field.name, start);
                node.display = present(presentation, text, None);
                node.value = FieldValue::Octets(octets);
                (node, end)
            }
            Encoding::Text => {
                let (raw, end) = read_units(self.data, payload, 8, bits / 8, limit)?;
                let text = self.text.decode(&raw);

                let mut node = SyntaxField::new(SyntaxKind::Text, &field.name, start);
                node.display = present(presentation, format!("\"{}\"", text), None);
                node.value = FieldValue::Text { raw, text };
                (node, end)
            }
        };

        node.close(end);
        Ok((node, end))
    }

    fn decode_loop(
        &self,
        field: &LoopField,
        start: Cursor,
        limit: usize,
        scope: &Scope<'_>,
    ) -> Result<(SyntaxField, Cursor)> {
        let mut node = SyntaxField::new(SyntaxKind::Group, &field.name, start);
        let mut cursor = start;

        match field.kind {
            LoopKind::Bytes => {
                let span = self.byte_loop_span(field, start, limit, scope)?;
                ensure_available(start, span, limit).map_err(|_| {
                    DecodeError::out_of_bounds(format!(
                        "loop '{}' spans {} bytes from {} past byte {}",
                        field.name,
                        span / 8,
                        start,
                        limit
                    ))
                })?;

                let end = start.advance(span);
                let inner_limit = end.position + usize::from(!end.is_aligned());
                let mut index = 0;
                while cursor < end {
                    let (item, next) = self.decode_iteration(field, index, cursor, inner_limit, scope)?;
                    if next > end {
                        return Err(DecodeError::invalid_length(format!(
                            "loop '{}': iteration {} ends at {} past the loop end {}",
                            field.name, index, next, end
                        )));
                    }
                    node.children.push(item);
                    cursor = next;
                    index += 1;
                }
            }
            LoopKind::Count => {
                let LoopLength::Field(name) = &field.length else {
                    return Err(DecodeError::malformed_template(format!(
                        "count loop '{}' has no count field",
                        field.name
                    )));
                };
                let count = field.corrected(self.resolve_number(scope, name, &field.name)?)?;
                for index in 0..count {
                    let (item, next) =
                        self.decode_iteration(field, index as usize, cursor, limit, scope)?;
                    node.children.push(item);
                    cursor = next;
                }
            }
        }

        node.close(cursor);
        Ok((node, cursor))
    }

    /// Span of a byte-length loop, in bits
    fn byte_loop_span(
        &self,
        field: &LoopField,
        start: Cursor,
        limit: usize,
        scope: &Scope<'_>,
    ) -> Result<usize> {
        let bytes = match &field.length {
            LoopLength::Field(name) => {
                field.corrected(self.resolve_number(scope, name, &field.name)?)?
            }
            LoopLength::Implicit => {
                let remaining = (start.bits_until(limit) / 8) as i128;
                let total = remaining + i128::from(field.correction);
                u64::try_from(total).map_err(|_| {
                    DecodeError::malformed_template(format!(
                        "loop '{}': correction {} exceeds the {} remaining bytes",
                        field.name, field.correction, remaining
                    ))
                })?
            }
        };

        bytes
            .checked_mul(8)
            .and_then(|b| usize::try_from(b).ok())
            .ok_or_else(|| {
                DecodeError::invalid_length(format!(
                    "loop '{}': {} bytes overflows",
                    field.name, bytes
                ))
            })
    }

    fn decode_iteration(
        &self,
        field: &LoopField,
        index: usize,
        start: Cursor,
        limit: usize,
        scope: &Scope<'_>,
    ) -> Result<(SyntaxField, Cursor)> {
        let (children, next) = self.decode_list(&field.body, start, limit, Some(scope))?;
        // count loops are bounded by their count; byte loops need progress
        if field.is_byte_length() && next == start {
            return Err(DecodeError::invalid_length(format!(
                "loop '{}': iteration {} consumed no data",
                field.name, index
            )));
        }

        let mut item = SyntaxField::new(SyntaxKind::Group, field.item_label(index), start);
        item.children = children;
        item.close(next);
        Ok((item, next))
    }

    fn decode_conditional(
        &self,
        field: &ConditionalField,
        cursor: Cursor,
        limit: usize,
        scope: &Scope<'_>,
    ) -> Result<(Vec<SyntaxField>, Cursor)> {
        let condition = &field.condition;
        let value = self.resolve_number(scope, &condition.field, "condition")?;
        let branch = if condition.predicate.test(value) {
            &field.then
        } else {
            &field.otherwise
        };

        if branch.is_empty() {
            return Ok((Vec::new(), cursor));
        }
        self.decode_list(branch, cursor, limit, Some(scope))
    }
}

fn number_text(encoding: Encoding, presentation: &Presentation, value: u64, bits: usize) -> String {
    if let Some(format) = &presentation.format {
        return format_number(format, value);
    }
    match encoding {
        Encoding::Bits => format!("{:0width$b}", value, width = bits),
        Encoding::Checksum => format!("0x{:0width$X}", value, width = bits.div_ceil(4)),
        _ => value.to_string(),
    }
}

fn present(presentation: &Presentation, text: String, label: Option<&str>) -> String {
    let mut display = presentation.prefix.clone().unwrap_or_default();
    display.push_str(&text);
    if let Some(label) = label {
        display.push_str(" (");
        display.push_str(label);
        display.push(')');
    }
    display
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Condition, ConditionalField};
    use crate::mapping::ValueMappings;
    use crate::text::DvbTextDecoder;

    fn decode(
        fields: &[FieldDefinition],
        data: &[u8],
    ) -> Result<(Vec<SyntaxField>, Cursor)> {
        SyntaxDecoder::new(data, &DvbTextDecoder).decode(fields, Cursor::at(0), data.len())
    }

    fn number(nodes: &[SyntaxField], name: &str) -> Option<u64> {
        nodes.iter().find(|n| n.name == name).and_then(|n| n.number())
    }

    #[test]
    fn test_literal_lengths_advance_cursor() -> Result<()> {
        let fields: Vec<FieldDefinition> = vec![
            DataField::unsigned("a", 3).into(),
            DataField::bits("b", 7).into(),
            DataField::unsigned("c", 11).into(),
        ];
        let data = [0b1010_1100u8, 0b1111_0000, 0b0001_0110];
        let (nodes, end) = decode(&fields, &data)?;

        assert_eq!(end, Cursor { position: 2, bit_offset: 5 });
        assert_eq!(number(&nodes, "a"), Some(0b101));
        assert_eq!(number(&nodes, "b"), Some(0b0110_011));
        assert_eq!(number(&nodes, "c"), Some(0b1100_0000_010));

        let b = &nodes[1];
        assert_eq!((b.position, b.bit_offset, b.bit_length), (0, 3, 7));
        assert_eq!(b.kind, SyntaxKind::Bits);
        assert_eq!(b.display, "0110011");
        Ok(())
    }

    #[test]
    fn test_mapping_and_format() -> Result<()> {
        let mappings = ValueMappings::new().with(5, "Foo").with_range(10, 20, "Bar");
        let fields: Vec<FieldDefinition> = vec![
            DataField::unsigned("x", 8).with_mappings(mappings.clone()).into(),
            DataField::unsigned("y", 8).with_mappings(mappings.clone()).into(),
            DataField::unsigned("z", 8).with_mappings(mappings).into(),
            DataField::unsigned("pid", 16)
                .with_format("0x%04X")
                .with_prefix("PID ")
                .into(),
        ];
        let (nodes, _) = decode(&fields, &[5, 15, 21, 0x01, 0x00])?;

        assert_eq!(nodes[0].label.as_deref(), Some("Foo"));
        assert_eq!(nodes[0].display, "5 (Foo)");
        assert_eq!(nodes[1].label.as_deref(), Some("Bar"));
        assert_eq!(nodes[2].label, None);
        assert_eq!(nodes[2].display, "21");
        assert_eq!(nodes[3].display, "PID 0x0100");
        Ok(())
    }

    #[test]
    fn test_referenced_lengths() -> Result<()> {
        let fields: Vec<FieldDefinition> = vec![
            DataField::unsigned("name_length", 8).into(),
            DataField::sized_by("name", Encoding::Text, "name_length").into(),
            DataField::unsigned("digits", 4).into(),
            DataField::sized_by("bcd", Encoding::Nibbles, "digits").into(),
            DataField::unsigned("flag_bits", 4).into(),
            DataField::sized_by("flags", Encoding::Bits, "flag_bits")
                .bit_packed()
                .into(),
        ];
        let data = [3, b'A', b'B', b'C', 0x31, 0x23, 0x46];
        let (nodes, end) = decode(&fields, &data)?;

        let name = &nodes[1];
        assert_eq!(name.text(), Some("ABC"));
        assert_eq!(name.byte_length(), 3);
        assert_eq!(nodes[3].value, FieldValue::Nibbles(vec![1, 2, 3]));
        assert_eq!(number(&nodes, "flags"), Some(0b0110));
        assert_eq!(end, Cursor::at(7));
        Ok(())
    }

    #[test]
    fn test_prefixed_text() -> Result<()> {
        let fields: Vec<FieldDefinition> = vec![DataField::text_prefixed("service_name", 8).into()];
        let (nodes, end) = decode(&fields, &[2, b'O', b'K', 0xFF])?;
        assert_eq!(nodes[0].text(), Some("OK"));
        assert_eq!(nodes[0].bit_length, 24);
        assert_eq!(end, Cursor::at(3));
        Ok(())
    }

    #[test]
    fn test_unresolved_reference() {
        let payload = DataField::sized_by("payload", Encoding::Octets, "missing");
        let fields: Vec<FieldDefinition> = vec![payload.into()];
        assert!(matches!(
            decode(&fields, &[0; 4]),
            Err(DecodeError::UnresolvedReference(_))
        ));
    }

    #[test]
    fn test_field_past_limit() {
        let fields: Vec<FieldDefinition> = vec![
            DataField::unsigned("length", 8).into(),
            DataField::sized_by("payload", Encoding::Octets, "length").into(),
        ];
        let err = decode(&fields, &[4, 1, 2]).unwrap_err();
        assert!(err.is_out_of_bounds());
        assert!(err.to_string().contains("payload"));

        let decoder = SyntaxDecoder::new(&[0u8; 8], &DvbTextDecoder);
        let wide: Vec<FieldDefinition> = vec![DataField::checksum("CRC_32", 32).into()];
        assert!(decoder.decode(&wide, Cursor::at(6), 8).is_err());
        assert!(decoder.decode(&wide, Cursor::at(2), 6).is_ok());
        assert!(decoder.decode(&wide, Cursor::at(3), 6).is_err());
    }

    fn entries_loop(kind: LoopKind) -> Vec<FieldDefinition> {
        let body = vec![
            DataField::unsigned("id", 8).into(),
            DataField::unsigned("value", 8).into(),
        ];
        let l = match kind {
            LoopKind::Bytes => LoopField::bytes("entries", "length", body),
            LoopKind::Count => LoopField::count("entries", "length", body),
        };
        vec![
            DataField::unsigned("length", 8).into(),
            l.with_item_name("entry").into(),
            DataField::unsigned("trailer", 8).into(),
        ]
    }

    #[test]
    fn test_byte_loop() -> Result<()> {
        let data = [4, 1, 10, 2, 20, 0xEE];
        let (nodes, end) = decode(&entries_loop(LoopKind::Bytes), &data)?;

        let entries = &nodes[1];
        assert_eq!(entries.kind, SyntaxKind::Group);
        assert_eq!(entries.children.len(), 2);
        assert_eq!(entries.bit_length, 32);
        let consumed: usize = entries.children.iter().map(|c| c.bit_length).sum();
        assert_eq!(consumed, 8 * 4);
        assert_eq!(entries.children[1].name, "entry[1]");
        assert_eq!(entries.children[1].child("value").and_then(|f| f.number()), Some(20));
        assert_eq!(number(&nodes, "trailer"), Some(0xEE));
        assert_eq!(end, Cursor::at(6));
        Ok(())
    }

    #[test]
    fn test_byte_loop_must_land_on_boundary() {
        // three bytes cannot hold whole two-byte entries
        let data = [3, 1, 10, 2, 20, 0xEE];
        assert!(decode(&entries_loop(LoopKind::Bytes), &data).is_err());
    }

    #[test]
    fn test_byte_loop_past_limit() {
        let data = [9, 1, 10, 2];
        let err = decode(&entries_loop(LoopKind::Bytes), &data).unwrap_err();
        assert!(err.is_out_of_bounds());
    }

    #[test]
    fn test_count_loop() -> Result<()> {
        let data = [3, 1, 10, 2, 20, 3, 30, 0xEE];
        let (nodes, _) = decode(&entries_loop(LoopKind::Count), &data)?;
        assert_eq!(nodes[1].children.len(), 3);
        assert_eq!(number(&nodes, "trailer"), Some(0xEE));

        let (nodes, _) = decode(&entries_loop(LoopKind::Count), &[0, 0xEE])?;
        assert!(nodes[1].children.is_empty());
        assert_eq!(number(&nodes, "trailer"), Some(0xEE));
        Ok(())
    }

    fn optional_items(kind: LoopKind) -> Vec<FieldDefinition> {
        let body = vec![ConditionalField::new(
            Condition::equals("flag", 1),
            vec![DataField::unsigned("x", 8).into()],
        )
        .into()];
        let items = match kind {
            LoopKind::Count => LoopField::count("items", "count", body),
            LoopKind::Bytes => LoopField::bytes("items", "count", body),
        };
        vec![
            DataField::unsigned("flag", 1).into(),
            DataField::bits("reserved", 7).into(),
            DataField::unsigned("count", 8).into(),
            items.into(),
        ]
    }

    #[test]
    fn test_count_loop_with_empty_iterations() -> Result<()> {
        let fields = optional_items(LoopKind::Count);
        crate::definition::verify_fields(&fields)?;

        let (nodes, end) = decode(&fields, &[0x00, 3])?;
        let items = &nodes[3];
        assert_eq!(items.children.len(), 3);
        assert!(items.children.iter().all(|c| c.children.is_empty() && c.bit_length == 0));
        assert_eq!(end, Cursor::at(2));

        let (nodes, _) = decode(&fields, &[0x80, 2, 0x11, 0x22])?;
        assert_eq!(nodes[3].children[1].child("x").and_then(|f| f.number()), Some(0x22));
        Ok(())
    }

    #[test]
    fn test_byte_loop_without_progress_fails() {
        let fields = optional_items(LoopKind::Bytes);
        assert!(matches!(
            decode(&fields, &[0x00, 2, 0x11, 0x22]),
            Err(DecodeError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_duplicate_iterations_are_kept() -> Result<()> {
        let data = [2, 7, 7, 7, 7, 0];
        let (nodes, _) = decode(&entries_loop(LoopKind::Count), &data)?;
        let values = |group: &SyntaxField| -> Vec<Option<u64>> {
            group.children.iter().map(|c| c.number()).collect()
        };
        let (a, b) = (&nodes[1].children[0], &nodes[1].children[1]);
        assert_eq!(values(a), values(b));
        assert_ne!(a.position, b.position);
        Ok(())
    }

    #[test]
    fn test_negative_correction() -> Result<()> {
        let fields: Vec<FieldDefinition> = vec![
            DataField::unsigned("length", 8).into(),
            LoopField::bytes("items", "length", vec![DataField::unsigned("v", 8).into()])
                .with_correction(-1)
                .into(),
            DataField::unsigned("last", 8).into(),
        ];
        let (nodes, _) = decode(&fields, &[3, 1, 2, 3])?;
        assert_eq!(nodes[1].children.len(), 2);
        assert_eq!(number(&nodes, "last"), Some(3));

        assert!(matches!(
            decode(&fields, &[0, 1]),
            Err(DecodeError::InvalidLength(_))
        ));
        Ok(())
    }

    #[test]
    fn test_implicit_loop() -> Result<()> {
        let fields: Vec<FieldDefinition> = vec![LoopField::implicit(
            "bytes",
            vec![DataField::unsigned("b", 8).into()],
        )
        .with_correction(-4)
        .into()];
        let decoder = SyntaxDecoder::new(&[1, 2, 3, 4, 5, 6, 7], &DvbTextDecoder);
        let (nodes, end) = decoder.decode(&fields, Cursor::at(1), 7)?;
        assert_eq!(nodes[0].children.len(), 2);
        assert_eq!(end, Cursor::at(3));

        let err = decoder.decode(&fields, Cursor::at(4), 7).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedTemplate(_)));
        Ok(())
    }

    #[test]
    fn test_nested_loop_sees_outer_fields() -> Result<()> {
        let fields: Vec<FieldDefinition> = vec![
            DataField::unsigned("width", 8).into(),
            DataField::unsigned("count", 8).into(),
            LoopField::count(
                "rows",
                "count",
                vec![DataField::sized_by("cells", Encoding::Octets, "width").into()],
            )
            .into(),
        ];
        let (nodes, end) = decode(&fields, &[2, 2, 1, 2, 3, 4])?;
        let rows = &nodes[2];
        assert_eq!(rows.children.len(), 2);
        assert_eq!(
            rows.children[1].child("cells").map(|c| c.value.clone()),
            Some(FieldValue::Octets(vec![3, 4]))
        );
        assert_eq!(end, Cursor::at(6));
        Ok(())
    }

    fn conditional() -> Vec<FieldDefinition> {
        vec![
            DataField::unsigned("type", 8).into(),
            ConditionalField::new(
                Condition::equals("type", 1),
                vec![
                    DataField::unsigned("a1", 8).into(),
                    DataField::unsigned("a2", 8).into(),
                ],
            )
            .with_else(vec![DataField::unsigned("b", 16).into()])
            .into(),
            DataField::unsigned("tail", 8).into(),
        ]
    }

    #[test]
    fn test_conditional_then_branch() -> Result<()> {
        let (nodes, _) = decode(&conditional(), &[1, 0xA1, 0xA2, 0xFF])?;
        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["type", "a1", "a2", "tail"]);
        Ok(())
    }

    #[test]
    fn test_conditional_else_branch() -> Result<()> {
        let (nodes, _) = decode(&conditional(), &[2, 0xB0, 0xB1, 0xFF])?;
        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["type", "b", "tail"]);
        assert_eq!(number(&nodes, "b"), Some(0xB0B1));
        Ok(())
    }

    #[test]
    fn test_conditional_without_else_contributes_nothing() -> Result<()> {
        let fields: Vec<FieldDefinition> = vec![
            DataField::unsigned("flag", 1).into(),
            DataField::bits("reserved", 7).into(),
            ConditionalField::new(
                Condition::one_of("flag", vec![1]),
                vec![DataField::unsigned("extra", 8).into()],
            )
            .into(),
        ];
        let (nodes, end) = decode(&fields, &[0x00])?;
        assert_eq!(nodes.len(), 2);
        assert_eq!(end, Cursor::at(1));
        Ok(())
    }

    #[test]
    fn test_conditional_range_and_branch_references() -> Result<()> {
        let fields: Vec<FieldDefinition> = vec![
            DataField::unsigned("table_id", 8).into(),
            ConditionalField::new(
                Condition::range("table_id", 0x4E, 0x6F),
                vec![DataField::unsigned("event_length", 8).into()],
            )
            .into(),
            DataField::sized_by("event", Encoding::Octets, "event_length").into(),
        ];
        let (nodes, _) = decode(&fields, &[0x50, 2, 9, 9])?;
        assert_eq!(nodes[2].value, FieldValue::Octets(vec![9, 9]));

        // condition false: the reference is left dangling
        assert!(matches!(
            decode(&fields, &[0x40, 2, 9, 9]),
            Err(DecodeError::UnresolvedReference(_))
        ));
        Ok(())
    }

    #[test]
    fn test_checksum_display() -> Result<()> {
        let fields: Vec<FieldDefinition> = vec![DataField::checksum("CRC_32", 32).into()];
        let (nodes, _) = decode(&fields, &[0xDE, 0xAD, 0xBE, 0xEF])?;
        assert_eq!(nodes[0].kind, SyntaxKind::Checksum);
        assert_eq!(nodes[0].display, "0xDEADBEEF");
        Ok(())
    }
}
