//! Template registry
//!
//! [`TemplateRegistry`] is a plain value: build it, register templates, then
//! hand it (usually behind an `Arc`) to the decoders. [`SharedRegistry`] adds
//! copy-on-write registration for applications that load user templates while
//! decodes are running; every decode works on one consistent snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, warn};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::Result;
use crate::template::{Template, TemplateKeys};

/// Key of a descriptor template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorKey {
    /// descriptor_tag
    pub tag: u8,
    /// descriptor_tag_extension
    pub extension: Option<u8>,
}

/// Mapping from table ids and descriptor tags to templates
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    tables: HashMap<u8, Arc<Template>>,
    descriptors: HashMap<DescriptorKey, Arc<Template>>,
}

impl TemplateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in MPEG-2 and DVB templates
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        crate::builtin::register_all(&mut registry)?;
        Ok(registry)
    }

    /// Register `template` under every key it declares
    ///
    /// The template is verified first; a malformed template is rejected and
    /// the registry is left untouched. On key collision the last registration
    /// wins.
    pub fn register(&mut self, template: Template) -> Result<()> {
        template.verify()?;
        let template = Arc::new(template);

        match &template.keys {
            TemplateKeys::Table(ids) => {
                for &id in ids {
                    if let Some(previous) = self.tables.insert(id, Arc::clone(&template)) {
                        warn!(
                            "table_id 0x{:02X}: '{}' replaces '{}'",
                            id, template.name, previous.name
                        );
                    }
                }
                debug!("registered table template '{}' for {:02X?}", template.name, ids);
            }
            TemplateKeys::Descriptor { tag, extension } => {
                let key = DescriptorKey {
                    tag: *tag,
                    extension: *extension,
                };
                if let Some(previous) = self.descriptors.insert(key, Arc::clone(&template)) {
                    warn!(
                        "descriptor {:?}: '{}' replaces '{}'",
                        key, template.name, previous.name
                    );
                }
                debug!("registered descriptor template '{}' for {:?}", template.name, key);
            }
        }
        Ok(())
    }

    /// Template for `table_id`
    pub fn lookup_table(&self, table_id: u8) -> Option<Arc<Template>> {
        self.tables.get(&table_id).cloned()
    }

    /// Template for a descriptor tag and optional tag extension
    pub fn lookup_descriptor(&self, tag: u8, extension: Option<u8>) -> Option<Arc<Template>> {
        self.descriptors
            .get(&DescriptorKey { tag, extension })
            .cloned()
    }

    /// Whether any template narrows `tag` by a tag extension
    pub fn has_extensions(&self, tag: u8) -> bool {
        self.descriptors
            .keys()
            .any(|k| k.tag == tag && k.extension.is_some())
    }

    /// Number of table ids with a template
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Number of descriptor keys with a template
    pub fn descriptor_count(&self) -> usize {
        self.descriptors.len()
    }
}

/// A registry that can be extended while decodes are in flight
///
/// Registration clones the current registry, applies the change and swaps the
/// result in. Decoders hold an `Arc` snapshot and never observe a half
/// applied registration.
#[derive(Debug, Default)]
pub struct SharedRegistry {
    current: RwLock<Arc<TemplateRegistry>>,
}

impl SharedRegistry {
    /// Wrap an existing registry
    pub fn new(registry: TemplateRegistry) -> Self {
        SharedRegistry {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// Consistent view of the registry
    pub fn snapshot(&self) -> Arc<TemplateRegistry> {
        Arc::clone(&self.current.read())
    }

    /// Register a template, copy-on-write
    pub fn register(&self, template: Template) -> Result<()> {
        let mut current = self.current.write();
        let mut next = TemplateRegistry::clone(&current);
        next.register(template)?;
        *current = Arc::new(next);
        Ok(())
    }

    /// Register several templates as one atomic update
    ///
    /// Either all templates are registered or, if one is malformed, none is.
    pub fn register_all(&self, templates: impl IntoIterator<Item = Template>) -> Result<()> {
        let mut current = self.current.write();
        let mut next = TemplateRegistry::clone(&current);
        for template in templates {
            next.register(template)?;
        }
        *current = Arc::new(next);
        Ok(())
    }
}

static GLOBAL: Lazy<SharedRegistry> = Lazy::new(|| {
    let registry = TemplateRegistry::with_builtins().unwrap_or_else(|err| {
        error!("built-in templates rejected, starting empty: {}", err);
        TemplateRegistry::new()
    });
    SharedRegistry::new(registry)
});

/// Process-wide registry, seeded with the built-in templates
///
/// Meant for the application's composition root; library code and tests
/// should construct their own registries.
pub fn global() -> &'static SharedRegistry {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DataField;
    use crate::error::DecodeError;

    fn table(name: &str, ids: &[u8]) -> Template {
        Template::table(name, ids.to_vec()).field(DataField::unsigned("table_id", 8))
    }

    #[test]
    fn test_register_and_lookup() -> Result<()> {
        let mut registry = TemplateRegistry::new();
        registry.register(table("sdt", &[0x42, 0x46]))?;
        assert_eq!(registry.table_count(), 2);
        assert_eq!(
            registry.lookup_table(0x46).map(|t| t.name.clone()),
            Some("sdt".to_string())
        );
        assert!(registry.lookup_table(0x4A).is_none());
        Ok(())
    }

    #[test]
    fn test_last_registration_wins() -> Result<()> {
        let mut registry = TemplateRegistry::new();
        registry.register(table("first", &[0x02]))?;
        registry.register(table("second", &[0x02]))?;
        assert_eq!(registry.lookup_table(0x02).map(|t| t.name.clone()), Some("second".into()));
        Ok(())
    }

    #[test]
    fn test_malformed_template_rejected() {
        let mut registry = TemplateRegistry::new();
        let broken = Template::table("broken", vec![0x80]).field(DataField::unsigned("", 8));
        assert!(matches!(
            registry.register(broken),
            Err(DecodeError::MalformedTemplate(_))
        ));
        assert_eq!(registry.table_count(), 0);
    }

    #[test]
    fn test_descriptor_keys() -> Result<()> {
        let mut registry = TemplateRegistry::new();
        registry.register(
            Template::descriptor("service_descriptor", 0x48)
                .field(DataField::unsigned("descriptor_tag", 8)),
        )?;
        registry.register(
            Template::extension_descriptor("t2_delivery_system_descriptor", 0x7F, 0x04)
                .field(DataField::unsigned("descriptor_tag", 8)),
        )?;

        assert!(registry.lookup_descriptor(0x48, None).is_some());
        assert!(registry.lookup_descriptor(0x48, Some(0)).is_none());
        assert!(registry.lookup_descriptor(0x7F, Some(0x04)).is_some());
        assert!(registry.has_extensions(0x7F));
        assert!(!registry.has_extensions(0x48));
        assert_eq!(registry.descriptor_count(), 2);
        Ok(())
    }

    #[test]
    fn test_shared_snapshots_are_stable() -> Result<()> {
        let shared = SharedRegistry::new(TemplateRegistry::new());
        let before = shared.snapshot();
        shared.register(table("pat", &[0x00]))?;

        assert!(before.lookup_table(0x00).is_none());
        assert!(shared.snapshot().lookup_table(0x00).is_some());
        Ok(())
    }

    #[test]
    fn test_shared_batch_is_atomic() {
        let shared = SharedRegistry::new(TemplateRegistry::new());
        let batch = vec![
            table("good", &[0x10]),
            Template::table("bad", Vec::<u8>::new()).field(DataField::unsigned("x", 8)),
        ];
        assert!(shared.register_all(batch).is_err());
        assert_eq!(shared.snapshot().table_count(), 0);
    }

    #[test]
    fn test_global_has_builtins() {
        assert!(global().snapshot().lookup_table(0x00).is_some());
    }
}
