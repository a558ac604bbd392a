//! Templates: named, keyed bundles of field definitions

use std::collections::BTreeMap;

use crate::definition::{spliced_names, verify_fields, FieldDefinition};
use crate::error::{DecodeError, Result};
use crate::field::SyntaxField;

/// Identifiers a template is registered under
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TemplateKeys {
    /// Section template for one or more table ids
    Table(Vec<u8>),
    /// Descriptor template for a tag, optionally narrowed by a tag extension
    Descriptor {
        /// descriptor_tag
        tag: u8,
        /// descriptor_tag_extension, when the template declares one
        extension: Option<u8>,
    },
}

/// The data-described schema of one section or descriptor kind
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Template {
    /// Template name, used as the root node name
    pub name: String,
    /// Optional presentation group
    #[cfg_attr(feature = "serde", serde(default))]
    pub group: Option<String>,
    /// Registration keys
    pub keys: TemplateKeys,
    /// Top-level fields in decode order
    pub fields: Vec<FieldDefinition>,
    /// Field names whose values identify one logical table instance
    #[cfg_attr(feature = "serde", serde(default))]
    pub unique_key: Vec<String>,
    /// Human-readable names per table id
    #[cfg_attr(feature = "serde", serde(default))]
    pub display_names: BTreeMap<u8, String>,
}

impl Template {
    /// Create a section template for `table_ids`
    pub fn table(name: impl Into<String>, table_ids: impl Into<Vec<u8>>) -> Self {
        Self::build(name, TemplateKeys::Table(table_ids.into()))
    }

    /// Create a descriptor template for `tag`
    pub fn descriptor(name: impl Into<String>, tag: u8) -> Self {
        Self::build(
            name,
            TemplateKeys::Descriptor {
                tag,
                extension: None,
            },
        )
    }

    /// Create an extension descriptor template for `tag` / `extension`
    pub fn extension_descriptor(name: impl Into<String>, tag: u8, extension: u8) -> Self {
        Self::build(
            name,
            TemplateKeys::Descriptor {
                tag,
                extension: Some(extension),
            },
        )
    }

    fn build(name: impl Into<String>, keys: TemplateKeys) -> Self {
        Template {
            name: name.into(),
            group: None,
            keys,
            fields: Vec::new(),
            unique_key: Vec::new(),
            display_names: BTreeMap::new(),
        }
    }

    /// Append a top-level field
    pub fn field(mut self, field: impl Into<FieldDefinition>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Replace the top-level fields
    pub fn with_fields(mut self, fields: Vec<FieldDefinition>) -> Self {
        self.fields = fields;
        self
    }

    /// Set the presentation group
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Set the uniqueness key
    pub fn with_unique_key<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_key = names.into_iter().map(Into::into).collect();
        self
    }

    /// Name table `table_id` for display
    pub fn with_display_name(mut self, table_id: u8, name: impl Into<String>) -> Self {
        self.display_names.insert(table_id, name.into());
        self
    }

    /// Display name for `table_id`, falling back to the template name
    pub fn display_name(&self, table_id: u8) -> &str {
        self.display_names
            .get(&table_id)
            .map(String::as_str)
            .unwrap_or(&self.name)
    }

    /// Check the keys, every field definition and the uniqueness key
    pub fn verify(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DecodeError::malformed_template(
                "template without a name".to_string(),
            ));
        }
        if let TemplateKeys::Table(ids) = &self.keys {
            if ids.is_empty() {
                return Err(DecodeError::malformed_template(format!(
                    "template '{}' declares no table id",
                    self.name
                )));
            }
        }
        if self.fields.is_empty() {
            return Err(DecodeError::malformed_template(format!(
                "template '{}' has no fields",
                self.name
            )));
        }

        verify_fields(&self.fields).map_err(|e| match e {
            DecodeError::MalformedTemplate(msg) => {
                DecodeError::malformed_template(format!("template '{}': {}", self.name, msg))
            }
            other => other,
        })?;

        let top_level = spliced_names(&self.fields);
        for key in &self.unique_key {
            if !top_level.contains(&key.as_str()) {
                return Err(DecodeError::malformed_template(format!(
                    "template '{}': unique key '{}' is not a top-level field",
                    self.name, key
                )));
            }
        }
        Ok(())
    }

    /// Values of the uniqueness key in a decoded tree
    ///
    /// Returns `None` when the template has no uniqueness key or a key field
    /// is missing or non-numeric in `root`.
    pub fn instance_key(&self, root: &SyntaxField) -> Option<Vec<u64>> {
        if self.unique_key.is_empty() {
            return None;
        }
        self.unique_key
            .iter()
            .map(|name| root.child(name).and_then(SyntaxField::number))
            .collect()
    }
}
