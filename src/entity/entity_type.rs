use crate::core::{DbError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use strum::{Display, EnumString};

/// What a record of a given type can do.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    /// Instantiate empty, read/write attributes, insert, find, delete.
    Persistable,
    /// Can be revived into its source type (archive types).
    Restorable,
}

/// Static descriptor of an entity type: name, table and capabilities.
///
/// Hand-written models and generated archive types are described the same
/// way and live side by side in a [`super::ModelRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityType {
    name: String,
    table_name: Option<String>,
    base: Option<String>,
    capabilities: BTreeSet<Capability>,
    protected: BTreeSet<String>,
}

impl EntityType {
    /// A persistable type stored in `table_name`.
    pub fn new(name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: Some(table_name.into()),
            base: None,
            capabilities: BTreeSet::from([Capability::Persistable]),
            protected: BTreeSet::new(),
        }
    }

    /// A type with no table and no capabilities.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            base: None,
            capabilities: BTreeSet::new(),
            protected: BTreeSet::new(),
        }
    }

    pub fn with_table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn without_capability(mut self, capability: Capability) -> Self {
        self.capabilities.remove(&capability);
        self
    }

    /// Marks an attribute as not writable through [`super::Record::set`].
    pub fn protect(mut self, attribute: impl Into<String>) -> Self {
        self.protected.insert(attribute.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        self.capabilities.iter().copied()
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn is_protected(&self, attribute: &str) -> bool {
        self.protected.contains(attribute)
    }

    /// Table name, or an argument error naming the type.
    pub fn require_table(&self) -> Result<&str> {
        self.table_name().ok_or_else(|| {
            DbError::invalid_argument(format!("entity type '{}' has no table", self.name))
        })
    }

    pub fn require_capability(&self, capability: Capability) -> Result<()> {
        if self.has_capability(capability) {
            return Ok(());
        }
        Err(DbError::invalid_argument(format!(
            "entity type '{}' is not {}",
            self.name, capability
        )))
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table_name {
            Some(table) => write!(f, "{} ({})", self.name, table),
            None => write!(f, "{}", self.name),
        }
    }
}
