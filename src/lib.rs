//! # MPEG-2 PSI/SI Syntax Decoder
//!
//! A template-driven decoder for MPEG-2 Program Specific Information and DVB
//! Service Information sections and descriptors.
//!
//! Table and descriptor layouts are data, not code: each is a [`Template`]
//! built from field definitions (fixed or referenced lengths, loops,
//! conditionals) and registered by table id or descriptor tag. Decoding walks
//! the template over the bytes and produces a [`SyntaxField`] tree carrying
//! values, labels and exact bit positions. This library provides:
//!
//! - A declarative field definition model with self-validation
//! - Section and descriptor decoding with generic fallbacks for unknown ids
//! - Built-in templates for PAT, CAT, PMT, NIT, SDT and TDT
//! - DVB character table handling for text fields
//! - CRC-32/MPEG-2 helpers
//!
//! ## Features
//!
//! - `serde`: Enable serialization/deserialization of templates and trees
//!
//! ## Example
//!
//! ```
//! use psisi_syntax::Decoder;
//!
//! let decoder = Decoder::builder().with_builtins().build()?;
//! let pat = [
//!     0x00, 0xB0, 0x0D, 0x00, 0x01, 0xC1, 0x00, 0x00,
//!     0x00, 0x01, 0xF0, 0x00, 0x2A, 0xB1, 0x04, 0xB2,
//! ];
//! let root = decoder.decode_section(&pat, 0, pat.len())?;
//! assert_eq!(root.label.as_deref(), Some("PAT"));
//! for field in root.walk() {
//!     println!("{}", field);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bits;
pub mod buffer;
pub mod builtin;
pub mod crc;
pub mod decoder;
pub mod definition;
pub mod descriptor;
pub mod error;
pub mod field;
pub mod mapping;
pub mod parser;
pub mod registry;
pub mod section;
pub mod template;
pub mod text;

pub use bits::Cursor;
pub use buffer::ByteSource;
pub use decoder::SyntaxDecoder;
pub use definition::{
    Condition, ConditionalField, DataField, Encoding, FieldDefinition, LengthSpec, LoopField,
    LoopKind, LoopLength, Predicate, Presentation,
};
pub use error::{DecodeError, Result};
pub use field::{FieldValue, SyntaxField, SyntaxKind};
pub use mapping::{Mapping, ValueMappings};
pub use parser::{Decoder, DecoderBuilder};
pub use registry::{SharedRegistry, TemplateRegistry};
pub use template::{Template, TemplateKeys};
pub use text::{DvbTextDecoder, TextDecoder, Utf8TextDecoder};

/// ISO/IEC 13818-1 and ETSI EN 300 468 framing constants
pub mod constants {
    /// table_id, flags and section_length
    pub const SECTION_HEADER_LEN: usize = crate::section::SECTION_HEADER_LEN;

    /// descriptor_tag and descriptor_length
    pub const DESCRIPTOR_HEADER_LEN: usize = crate::descriptor::DESCRIPTOR_HEADER_LEN;

    /// Largest section_length of a PSI section
    pub const MAX_PSI_SECTION_LENGTH: usize = 1021;

    /// Largest section_length of a private or SI section
    pub const MAX_PRIVATE_SECTION_LENGTH: usize = 4093;

    /// Size of the CRC_32 trailing long-form sections
    pub const CRC_32_LEN: usize = 4;

    /// Stuffing value after the last section of a payload
    pub const STUFFING_TABLE_ID: u8 = crate::parser::STUFFING_TABLE_ID;
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn test_template_round_trip() -> std::result::Result<(), serde_json::Error> {
        for template in builtin::tables().into_iter().chain(builtin::descriptors()) {
            let json = serde_json::to_string(&template)?;
            let back: Template = serde_json::from_str(&json)?;
            assert_eq!(back, template);
        }
        Ok(())
    }

    #[test]
    fn test_template_from_json() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let json = r#"{
            "name": "stream_identifier_descriptor",
            "keys": { "descriptor": { "tag": 82, "extension": null } },
            "fields": [
                { "data": { "name": "descriptor_tag", "encoding": "unsigned", "length": { "bits": 8 } } },
                { "data": { "name": "descriptor_length", "encoding": "unsigned", "length": { "bits": 8 } } },
                { "data": { "name": "component_tag", "encoding": "unsigned", "length": { "bits": 8 } } }
            ]
        }"#;
        let template: Template = serde_json::from_str(json)?;
        let mut registry = TemplateRegistry::new();
        registry.register(template)?;

        let decoder = Decoder::new(std::sync::Arc::new(registry));
        let root = decoder.decode_descriptor(&[0x52u8, 0x01, 0x2A], 0, 3)?;
        assert_eq!(root.child("component_tag").and_then(|f| f.number()), Some(42));
        Ok(())
    }

    #[test]
    fn test_tree_serializes() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let decoder = Decoder::builder().with_builtins().build()?;
        let root = decoder.decode_descriptor(&[0x52u8, 0x01, 0x2A], 0, 3)?;
        let json = serde_json::to_value(&root)?;
        assert_eq!(json["name"], "stream_identifier_descriptor");
        Ok(())
    }
}
