//! Tag directory built from the controller symbol table at startup.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::cip::{CipError, SymbolEntry, WireType};
use crate::device::DeviceSession;

/// A named, typed data point on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub instance_id: u32,
    /// Element type.
    pub wire_type: WireType,
    /// Array dimensions, 0 for scalars.
    pub dimensions: u8,
}

impl Tag {
    /// A scalar tag.
    pub fn new(name: impl Into<String>, wire_type: WireType) -> Self {
        Self {
            name: name.into(),
            instance_id: 0,
            wire_type,
            dimensions: 0,
        }
    }

    /// A one-dimensional array tag of `wire_type` elements.
    pub fn array(name: impl Into<String>, wire_type: WireType) -> Self {
        Self {
            dimensions: 1,
            ..Self::new(name, wire_type)
        }
    }

    pub fn from_symbol(entry: &SymbolEntry) -> Self {
        Self {
            name: entry.name.clone(),
            instance_id: entry.instance_id,
            wire_type: entry.wire_type(),
            dimensions: entry.dimensions(),
        }
    }

    pub fn is_array(&self) -> bool {
        self.dimensions > 0
    }
}

/// Name-to-tag lookup table. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct TagDirectory {
    tags: HashMap<String, Tag>,
}

impl TagDirectory {
    pub fn from_tags(tags: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            tags: tags.into_iter().map(|tag| (tag.name.clone(), tag)).collect(),
        }
    }

    /// Build from raw symbol entries, leaving out system symbols.
    pub fn from_symbols(symbols: &[SymbolEntry]) -> Self {
        let tags = symbols.iter().filter_map(|entry| {
            if entry.is_system() {
                debug!("Skipping system symbol {}", entry.name);
                None
            } else {
                Some(Tag::from_symbol(entry))
            }
        });
        Self::from_tags(tags)
    }

    /// Enumerate the device's tags.
    pub async fn enumerate(session: &DeviceSession) -> Result<Self, CipError> {
        let symbols = session.list_symbols().await?;
        let directory = Self::from_symbols(&symbols);
        info!(
            "Discovered {} tags ({} symbols) on {}",
            directory.len(),
            symbols.len(),
            session.endpoint()
        );
        Ok(directory)
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.tags.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(instance_id: u32, name: &str, symbol_type: u16) -> SymbolEntry {
        SymbolEntry {
            instance_id,
            name: name.to_string(),
            symbol_type,
        }
    }

    #[test]
    fn test_from_symbols_filters_system() {
        let directory = TagDirectory::from_symbols(&[
            symbol(1, "Temperature", 0x00CA),
            symbol(2, "__Hidden", 0x00C4),
            symbol(3, "Program:Main", 0x1068),
            symbol(4, "Batch", 0x20C4),
        ]);

        assert_eq!(directory.len(), 2);
        assert!(directory.contains("Temperature"));
        assert!(!directory.contains("__Hidden"));

        let batch = directory.get("Batch").unwrap();
        assert_eq!(batch.instance_id, 4);
        assert_eq!(batch.wire_type, WireType::Dint);
        assert!(batch.is_array());
    }

    #[test]
    fn test_lookup_is_exact() {
        let directory = TagDirectory::from_tags([Tag::new("Speed", WireType::Int)]);
        assert!(directory.get("Speed").is_some());
        assert!(directory.get("speed").is_none());
        assert!(directory.get("Speed ").is_none());
    }

    #[test]
    fn test_empty_directory() {
        let directory = TagDirectory::from_symbols(&[]);
        assert!(directory.is_empty());
        assert_eq!(directory.iter().count(), 0);
    }
}
