use serde_derive::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::CatalogLoadError;

/// Section listing descriptive router properties, used to seed the device descriptor
pub const ROUTER_INFO: &str = "routerInfo";
/// Section listing the keys that are polled and turned into consumers
pub const QUERY_KEYS: &str = "queryKeys";

/// Static definition of one attribute the router knows about
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDefinition {
    pub key: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "hsType", default)]
    pub unit_hint: Option<String>,
    #[serde(rename = "hsClass", default)]
    pub class_hint: Option<String>,
}

/// In-memory copy of the catalog document, loaded once per process
#[derive(Debug, Clone, Default)]
pub struct KeyCatalog {
    sections: HashMap<String, Vec<KeyDefinition>>,
}

impl KeyCatalog {
    /// Reads and parses the catalog file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogLoadError> {
        let path = path.as_ref();
        info!("Loading key catalog from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|source| CatalogLoadError::Missing {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parses a catalog document. Both well-known sections must be present.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogLoadError> {
        let sections: HashMap<String, Vec<KeyDefinition>> = serde_json::from_str(raw)?;

        for required in [ROUTER_INFO, QUERY_KEYS] {
            if !sections.contains_key(required) {
                return Err(CatalogLoadError::MissingSection(required.to_string()));
            }
        }

        for (section, definitions) in &sections {
            let mut seen = HashSet::new();
            for definition in definitions {
                if !seen.insert(definition.key.as_str()) {
                    return Err(CatalogLoadError::DuplicateKey {
                        section: section.clone(),
                        key: definition.key.clone(),
                    });
                }
            }
            debug!("Catalog section `{}` holds {} keys", section, definitions.len());
        }

        Ok(Self { sections })
    }

    /// Returns the ordered definitions of a named section
    pub fn section(&self, name: &str) -> Result<&[KeyDefinition], CatalogLoadError> {
        self.sections
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| CatalogLoadError::MissingSection(name.to_string()))
    }

    /// Finds a definition by key within a section
    pub fn lookup(&self, section: &str, key: &str) -> Option<&KeyDefinition> {
        self.sections.get(section)?.iter().find(|d| d.key == key)
    }

    /// Keys of the polled section, in catalog order
    pub fn query_keys(&self) -> Result<Vec<String>, CatalogLoadError> {
        Ok(self
            .section(QUERY_KEYS)?
            .iter()
            .map(|d| d.key.clone())
            .collect())
    }
}
