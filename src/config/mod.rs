//! Archive configuration: which fields get stamped onto archived copies,
//! where the archive lives, and whether schema changes are mirrored.

pub mod catalog;
pub mod field;
pub mod internals;

pub use catalog::Catalog;
pub use field::{FieldDescriptor, FieldProducer};
pub use internals::{ArchiveFactory, Internals, RestoreFactory, TransferFactory};

use crate::core::{Attributes, DataType, Result, Value};
use crate::entity::{EntityType, Record};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_PREFIX: &str = "archive_";

/// Archival policy for one source entity type.
///
/// Fields are public like any plain settings struct. Once registered in a
/// [`Catalog`] a configuration is shared behind `Arc` and no longer changes.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Explicit archive table name. Pinning it also stops `rename_table`
    /// from being mirrored.
    pub table_name: Option<String>,

    /// Parent type name for the generated archive entity type
    pub abstract_base: Option<String>,

    /// Bookkeeping fields written on archive and stripped on restore
    pub fields: BTreeMap<String, FieldDescriptor>,

    /// Mirror schema migrations onto the archive table
    pub migrate: bool,

    /// Mirror `add_index` / `remove_index` as well
    pub mirror_indexes: bool,

    /// Prefix for derived archive table names
    pub prefix: String,

    pub source_type: Option<Arc<EntityType>>,

    pub target_type: Option<Arc<EntityType>>,

    /// Directories holding model definitions, loaded before migrations resolve
    pub model_paths: Vec<PathBuf>,

    pub internals: Internals,
}

impl ArchiveConfig {
    pub fn new() -> Self {
        let deleted_at = FieldDescriptor::deleted_at();
        let mut fields = BTreeMap::new();
        fields.insert(deleted_at.name().to_string(), deleted_at);

        Self {
            table_name: None,
            abstract_base: None,
            fields,
            migrate: true,
            mirror_indexes: false,
            prefix: DEFAULT_PREFIX.to_string(),
            source_type: None,
            target_type: None,
            model_paths: Vec::new(),
            internals: Internals::default(),
        }
    }

    /// Defaults overridden by whatever `options` sets.
    pub fn from_options(options: &ConfigOptions) -> Self {
        Self::new().merge(options)
    }

    /// Every attribute that currently holds a value.
    pub fn to_options(&self) -> ConfigOptions {
        ConfigOptions {
            table_name: self.table_name.clone(),
            abstract_base: self.abstract_base.clone(),
            fields: Some(self.fields.clone()),
            migrate: Some(self.migrate),
            mirror_indexes: Some(self.mirror_indexes),
            prefix: Some(self.prefix.clone()),
            source_type: self.source_type.clone(),
            target_type: self.target_type.clone(),
            model_paths: Some(self.model_paths.clone()),
            internals: Some(self.internals.clone()),
        }
    }

    /// Returns a new configuration where every attribute set in `other`
    /// replaces the one in `self`. The field map is replaced as a whole.
    pub fn merge(&self, other: &ConfigOptions) -> Self {
        let mut merged = self.clone();
        if let Some(table_name) = &other.table_name {
            merged.table_name = Some(table_name.clone());
        }
        if let Some(abstract_base) = &other.abstract_base {
            merged.abstract_base = Some(abstract_base.clone());
        }
        if let Some(fields) = &other.fields {
            merged.fields = fields.clone();
        }
        if let Some(migrate) = other.migrate {
            merged.migrate = migrate;
        }
        if let Some(mirror_indexes) = other.mirror_indexes {
            merged.mirror_indexes = mirror_indexes;
        }
        if let Some(prefix) = &other.prefix {
            merged.prefix = prefix.clone();
        }
        if let Some(source_type) = &other.source_type {
            merged.source_type = Some(source_type.clone());
        }
        if let Some(target_type) = &other.target_type {
            merged.target_type = Some(target_type.clone());
        }
        if let Some(model_paths) = &other.model_paths {
            merged.model_paths = model_paths.clone();
        }
        if let Some(internals) = &other.internals {
            merged.internals = internals.clone();
        }
        merged
    }

    pub fn merge_config(&self, other: &ArchiveConfig) -> Self {
        self.merge(&other.to_options())
    }

    /// One resolved value per configured field, evaluated fresh on every call.
    pub fn primitive_fields(&self, source: Option<&Record>) -> Attributes {
        self.fields
            .iter()
            .map(|(name, field)| (name.clone(), field.value(source)))
            .collect()
    }

    /// Adds (or replaces) a field and returns it.
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
        constant: Option<Value>,
        producer: Option<FieldProducer>,
    ) -> Result<&FieldDescriptor> {
        let field = FieldDescriptor::new(name, data_type, constant, producer)?;
        Ok(self.insert_field(field))
    }

    pub fn insert_field(&mut self, field: FieldDescriptor) -> &FieldDescriptor {
        let name = field.name().to_string();
        self.fields.insert(name.clone(), field);
        &self.fields[&name]
    }

    /// Fields in ascending name order.
    pub fn sorted_fields(&self) -> Vec<&FieldDescriptor> {
        let mut fields: Vec<&FieldDescriptor> = self.fields.values().collect();
        fields.sort();
        fields
    }

    pub fn is_managed_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn has_explicit_table_name(&self) -> bool {
        self.table_name.is_some()
    }

    pub fn source_table_name(&self) -> Option<&str> {
        self.source_type.as_ref().and_then(|ty| ty.table_name())
    }

    /// Archive table for `source_table`: the pinned name, or prefix + source.
    pub fn archive_table_name(&self, source_table: &str) -> String {
        match &self.table_name {
            Some(name) => name.clone(),
            None => self.prefixed(source_table),
        }
    }

    pub fn prefixed(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial configuration: unset attributes fall back during [`ArchiveConfig::merge`].
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub table_name: Option<String>,
    pub abstract_base: Option<String>,
    pub fields: Option<BTreeMap<String, FieldDescriptor>>,
    pub migrate: Option<bool>,
    pub mirror_indexes: Option<bool>,
    pub prefix: Option<String>,
    pub source_type: Option<Arc<EntityType>>,
    pub target_type: Option<Arc<EntityType>>,
    pub model_paths: Option<Vec<PathBuf>>,
    pub internals: Option<Internals>,
}

impl ConfigOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_name(mut self, table_name: &str) -> Self {
        self.table_name = Some(table_name.to_string());
        self
    }

    pub fn abstract_base(mut self, base: &str) -> Self {
        self.abstract_base = Some(base.to_string());
        self
    }

    /// Replaces the whole field set.
    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        self.fields = Some(
            fields
                .into_iter()
                .map(|field| (field.name().to_string(), field))
                .collect(),
        );
        self
    }

    /// Archive without any bookkeeping fields.
    pub fn no_fields(mut self) -> Self {
        self.fields = Some(BTreeMap::new());
        self
    }

    /// Adds one field to the replacement set (which starts empty).
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields
            .get_or_insert_with(BTreeMap::new)
            .insert(field.name().to_string(), field);
        self
    }

    pub fn migrate(mut self, migrate: bool) -> Self {
        self.migrate = Some(migrate);
        self
    }

    pub fn indexes(mut self, mirror_indexes: bool) -> Self {
        self.mirror_indexes = Some(mirror_indexes);
        self
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    pub fn source_type(mut self, source_type: Arc<EntityType>) -> Self {
        self.source_type = Some(source_type);
        self
    }

    pub fn target_type(mut self, target_type: Arc<EntityType>) -> Self {
        self.target_type = Some(target_type);
        self
    }

    pub fn model_paths(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.model_paths = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn internals(mut self, internals: Internals) -> Self {
        self.internals = Some(internals);
        self
    }
}
