//! Model definitions read from JSON files.
//!
//! A file holds one definition or an array of them:
//!
//! ```json
//! {
//!   "name": "Post",
//!   "table": "posts",
//!   "protected": ["author_id"],
//!   "undestroy": {
//!     "prefix": "old_",
//!     "fields": [
//!       { "name": "deleted_at", "type": "datetime", "producer": "now" },
//!       { "name": "reason", "type": "string", "value": "manual" }
//!     ]
//!   }
//! }
//! ```

use super::{ArchiveBinding, Capability, EntityType, ModelRegistry, Record};
use crate::config::{ArchiveConfig, ConfigOptions, FieldDescriptor, FieldProducer};
use crate::core::{DataType, DbError, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Loads model definitions into a registry.
pub trait ModelLoader {
    /// Loads everything under `paths` that was not loaded before and returns
    /// the number of models registered.
    fn load_models(&self, paths: &[PathBuf], models: &ModelRegistry) -> Result<usize>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub protected: Vec<String>,
    #[serde(default)]
    pub undestroy: Option<UndestroyDefinition>,
}

fn default_capabilities() -> Vec<Capability> {
    vec![Capability::Persistable]
}

impl ModelDefinition {
    pub fn to_entity_type(&self) -> EntityType {
        let mut entity = EntityType::bare(&self.name);
        if let Some(table) = &self.table {
            entity = entity.with_table(table);
        }
        if let Some(base) = &self.base {
            entity = entity.with_base(base);
        }
        for capability in &self.capabilities {
            entity = entity.with_capability(*capability);
        }
        for attribute in &self.protected {
            entity = entity.protect(attribute);
        }
        entity
    }
}

/// Archive options as written in a model file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UndestroyDefinition {
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub abstract_base: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub migrate: Option<bool>,
    #[serde(default)]
    pub indexes: Option<bool>,
    #[serde(default)]
    pub fields: Option<Vec<FieldDefinition>>,
    /// Name of an already known type to archive into.
    #[serde(default)]
    pub target: Option<String>,
}

impl UndestroyDefinition {
    pub fn to_options(&self, models: &ModelRegistry) -> Result<ConfigOptions> {
        self.to_options_with(|name| models.entity_type(name))
    }

    /// Like [`UndestroyDefinition::to_options`], resolving `target` through
    /// `lookup`.
    pub fn to_options_with(
        &self,
        lookup: impl Fn(&str) -> Result<Option<Arc<EntityType>>>,
    ) -> Result<ConfigOptions> {
        let mut options = ConfigOptions::new();
        if let Some(table_name) = &self.table_name {
            options = options.table_name(table_name);
        }
        if let Some(base) = &self.abstract_base {
            options = options.abstract_base(base);
        }
        if let Some(prefix) = &self.prefix {
            options = options.prefix(prefix);
        }
        if let Some(migrate) = self.migrate {
            options = options.migrate(migrate);
        }
        if let Some(indexes) = self.indexes {
            options = options.indexes(indexes);
        }
        if let Some(fields) = &self.fields {
            let fields = fields
                .iter()
                .map(FieldDefinition::to_descriptor)
                .collect::<Result<Vec<_>>>()?;
            options = options.fields(fields);
        }
        if let Some(target) = &self.target {
            let target_type = lookup(target)?
                .ok_or_else(|| DbError::invalid_argument(format!("unknown archive type '{}'", target)))?;
            options = options.target_type(target_type);
        }
        Ok(options)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub producer: Option<BuiltinProducer>,
}

/// Producers that can be named in a model file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinProducer {
    /// Current time
    Now,
    /// Copy of an attribute of the record being archived
    Source(String),
}

impl BuiltinProducer {
    pub fn to_producer(&self) -> FieldProducer {
        match self {
            Self::Now => Arc::new(|_: Option<&Record>| Value::now()),
            Self::Source(attribute) => {
                let attribute = attribute.clone();
                Arc::new(move |source: Option<&Record>| {
                    source
                        .and_then(|record| record.get(&attribute))
                        .cloned()
                        .unwrap_or(Value::Null)
                })
            }
        }
    }
}

impl FieldDefinition {
    /// Constants are read into the field's type, so a `datetime` field may
    /// give its value as an RFC 3339 string.
    pub fn to_descriptor(&self) -> Result<FieldDescriptor> {
        let value = self
            .value
            .clone()
            .map(|value| value.coerce_to(self.data_type))
            .transpose()?;
        FieldDescriptor::new(
            &self.name,
            self.data_type,
            value,
            self.producer.as_ref().map(BuiltinProducer::to_producer),
        )
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModelFile {
    One(ModelDefinition),
    Many(Vec<ModelDefinition>),
}

/// Reads `*.json` model files, walking directories recursively in name
/// order. Files already loaded into the registry are skipped.
///
/// All types are registered before any archive binding is created, so a
/// definition may name a target type defined in a later file. A batch that
/// fails leaves the registry untouched and its files unmarked.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonModelLoader;

impl JsonModelLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_file(path: &Path) -> Result<Vec<ModelDefinition>> {
        let contents = fs::read_to_string(path).map_err(|err| {
            DbError::IoError(format!("Failed to read model file '{}': {}", path.display(), err))
        })?;
        let file: ModelFile = serde_json::from_str(&contents).map_err(|err| {
            DbError::ParseError(format!("Invalid model file '{}': {}", path.display(), err))
        })?;
        Ok(match file {
            ModelFile::One(definition) => vec![definition],
            ModelFile::Many(definitions) => definitions,
        })
    }

    fn collect_files(path: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        let metadata = fs::metadata(path).map_err(|err| {
            DbError::IoError(format!("Failed to read model path '{}': {}", path.display(), err))
        })?;

        if metadata.is_file() {
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                files.push(path.to_path_buf());
            }
            return Ok(());
        }

        let mut entries = fs::read_dir(path)
            .map_err(|err| {
                DbError::IoError(format!("Failed to read models directory '{}': {}", path.display(), err))
            })?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        for entry in entries {
            Self::collect_files(&entry, files)?;
        }
        Ok(())
    }
}

impl ModelLoader for JsonModelLoader {
    fn load_models(&self, paths: &[PathBuf], models: &ModelRegistry) -> Result<usize> {
        let mut files = Vec::new();
        for path in paths {
            Self::collect_files(path, &mut files)?;
        }

        let mut pending = Vec::new();
        let mut definitions = Vec::new();
        for file in files {
            if models.is_loaded(&file)? {
                debug!(file = %file.display(), "model file already loaded");
                continue;
            }
            definitions.extend(Self::read_file(&file)?);
            pending.push(file);
        }

        // Nothing is registered until the whole batch resolves.
        let batch = Self::stage(&definitions, models)?;
        for entity_type in batch.types {
            models.register_type(entity_type)?;
        }
        for (model, config) in batch.bindings {
            models.attach(ArchiveBinding::register(model, config, models.catalog())?)?;
        }
        for file in &pending {
            models.mark_loaded(file)?;
        }

        info!(models = definitions.len(), "model definitions loaded");
        Ok(definitions.len())
    }
}

struct StagedModels {
    types: Vec<Arc<EntityType>>,
    bindings: Vec<(Arc<EntityType>, ArchiveConfig)>,
}

impl JsonModelLoader {
    fn stage(definitions: &[ModelDefinition], models: &ModelRegistry) -> Result<StagedModels> {
        let mut staged: BTreeMap<&str, Arc<EntityType>> = BTreeMap::new();
        let mut types = Vec::with_capacity(definitions.len());
        for definition in definitions {
            if staged.contains_key(definition.name.as_str()) || models.entity_type(&definition.name)?.is_some() {
                return Err(DbError::invalid_argument(format!(
                    "entity type '{}' is already registered",
                    definition.name
                )));
            }
            let entity_type = Arc::new(definition.to_entity_type());
            staged.insert(definition.name.as_str(), entity_type.clone());
            types.push(entity_type);
        }

        let lookup = |name: &str| match staged.get(name) {
            Some(entity_type) => Ok(Some(entity_type.clone())),
            None => models.entity_type(name),
        };

        let mut bindings = Vec::new();
        for (definition, model) in definitions.iter().zip(&types) {
            if let Some(undestroy) = &definition.undestroy {
                let options = undestroy.to_options_with(lookup)?;
                let config = ArchiveBinding::resolve(model, &options, models.catalog())?;
                bindings.push((model.clone(), config));
            }
        }

        Ok(StagedModels { types, bindings })
    }
}
