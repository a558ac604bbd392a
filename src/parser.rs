//! High-level decoder for PSI/SI sections and descriptors

use std::sync::Arc;

use crate::buffer::ByteSource;
use crate::descriptor;
use crate::error::Result;
use crate::field::SyntaxField;
use crate::registry::{self, SharedRegistry, TemplateRegistry};
use crate::section;
use crate::text::{DvbTextDecoder, TextDecoder};

/// table_id value used to stuff the rest of a payload after the last section
pub const STUFFING_TABLE_ID: u8 = 0xFF;

/// Section and descriptor decoder bound to one registry snapshot
pub struct Decoder {
    registry: Arc<TemplateRegistry>,
    text: Box<dyn TextDecoder>,
}

impl Decoder {
    /// Create a decoder over `registry` with DVB text decoding
    pub fn new(registry: Arc<TemplateRegistry>) -> Self {
        Decoder {
            registry,
            text: Box::new(DvbTextDecoder),
        }
    }

    /// Start configuring a decoder
    pub fn builder() -> DecoderBuilder {
        DecoderBuilder::new()
    }

    /// The registry snapshot in use
    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Decode the section starting at `position`, bounded by `limit`
    pub fn decode_section<B: ByteSource + ?Sized>(
        &self,
        buf: &B,
        position: usize,
        limit: usize,
    ) -> Result<SyntaxField> {
        section::decode_section(buf, position, limit, &self.registry, self.text.as_ref())
    }

    /// Decode consecutive sections packed into one payload
    ///
    /// Stops at the end of the buffer or at a stuffing byte where the next
    /// table_id would be. The first failing section aborts the call.
    pub fn decode_sections<B: ByteSource + ?Sized>(&self, buf: &B) -> Result<Vec<SyntaxField>> {
        let mut sections = Vec::new();
        let mut at = 0;
        while at < buf.len() && buf.read_u8(at)? != STUFFING_TABLE_ID {
            let section = self.decode_section(buf, at, buf.len())?;
            at += section.byte_length();
            sections.push(section);
        }
        Ok(sections)
    }

    /// Decode the descriptor starting at `position`, bounded by `limit`
    pub fn decode_descriptor<B: ByteSource + ?Sized>(
        &self,
        buf: &B,
        position: usize,
        limit: usize,
    ) -> Result<SyntaxField> {
        descriptor::decode_descriptor(buf, position, limit, &self.registry, self.text.as_ref())
    }

    /// Decode a descriptor loop, keeping undecodable descriptors as raw leaves
    ///
    /// See [`descriptor::decode_descriptor_loop`].
    pub fn decode_descriptor_loop<B: ByteSource + ?Sized>(
        &self,
        buf: &B,
        position: usize,
        end: usize,
    ) -> Vec<SyntaxField> {
        descriptor::decode_descriptor_loop(buf, position, end, &self.registry, self.text.as_ref())
    }

    /// Uniqueness key of a decoded section, per its template
    pub fn instance_key(&self, root: &SyntaxField) -> Option<Vec<u64>> {
        let table_id = u8::try_from(root.child("table_id")?.number()?).ok()?;
        let template = self.registry.lookup_table(table_id)?;
        if template.name != root.name {
            return None;
        }
        template.instance_key(root)
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("tables", &self.registry.table_count())
            .field("descriptors", &self.registry.descriptor_count())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Decoder`]
///
/// Without an explicit registry the decoder takes a snapshot of
/// [`registry::global`].
pub struct DecoderBuilder {
    registry: Option<Arc<TemplateRegistry>>,
    builtins: bool,
    text: Option<Box<dyn TextDecoder>>,
}

impl DecoderBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        DecoderBuilder {
            registry: None,
            builtins: false,
            text: None,
        }
    }

    /// Use `registry`
    pub fn with_registry(mut self, registry: Arc<TemplateRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use the current snapshot of `shared`
    pub fn with_shared(self, shared: &SharedRegistry) -> Self {
        self.with_registry(shared.snapshot())
    }

    /// Use a fresh registry holding only the built-in templates
    pub fn with_builtins(mut self) -> Self {
        self.builtins = true;
        self
    }

    /// Decode text fields with `text`
    pub fn with_text_decoder(mut self, text: impl TextDecoder + 'static) -> Self {
        self.text = Some(Box::new(text));
        self
    }

    /// Build the decoder
    pub fn build(self) -> Result<Decoder> {
        let registry = match self.registry {
            Some(registry) => registry,
            None if self.builtins => Arc::new(TemplateRegistry::with_builtins()?),
            None => registry::global().snapshot(),
        };
        Ok(Decoder {
            registry,
            text: self.text.unwrap_or_else(|| Box::new(DvbTextDecoder)),
        })
    }
}

impl Default for DecoderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
