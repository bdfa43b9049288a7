use super::{ArchiveBinding, EntityType, Record};
use crate::config::{Catalog, ConfigOptions};
use crate::core::{DbError, Result};
use crate::storage::RecordStore;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Known entity types and the archive bindings attached to them.
///
/// Generated archive types are registered here next to hand-written ones.
/// Shared by reference; interior locks let loaders add models through `&self`.
#[derive(Debug)]
pub struct ModelRegistry {
    catalog: Arc<Catalog>,
    types: RwLock<BTreeMap<String, Arc<EntityType>>>,
    bindings: RwLock<BTreeMap<String, Arc<ArchiveBinding>>>,
    loaded_paths: RwLock<BTreeSet<PathBuf>>,
}

impl ModelRegistry {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            types: RwLock::new(BTreeMap::new()),
            bindings: RwLock::new(BTreeMap::new()),
            loaded_paths: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn register_type(&self, entity_type: impl Into<Arc<EntityType>>) -> Result<Arc<EntityType>> {
        let entity_type = entity_type.into();
        let mut types = self.types.write()?;
        if types.contains_key(entity_type.name()) {
            return Err(DbError::invalid_argument(format!(
                "entity type '{}' is already registered",
                entity_type.name()
            )));
        }
        types.insert(entity_type.name().to_string(), entity_type.clone());
        debug!(entity = %entity_type, "entity type registered");
        Ok(entity_type)
    }

    pub fn entity_type(&self, name: &str) -> Result<Option<Arc<EntityType>>> {
        Ok(self.types.read()?.get(name).cloned())
    }

    pub fn types(&self) -> Result<Vec<Arc<EntityType>>> {
        Ok(self.types.read()?.values().cloned().collect())
    }

    /// Enables archiving for the registered type `source`. The archive type is
    /// registered as well unless a type with its name already exists.
    ///
    /// Binding the same type again replaces its binding, but the earlier
    /// configuration stays in the catalog and keeps winning table lookups.
    pub fn undestroy(&self, source: &str, options: &ConfigOptions) -> Result<Arc<ArchiveBinding>> {
        let model = self
            .entity_type(source)?
            .ok_or_else(|| DbError::invalid_argument(format!("unknown entity type '{}'", source)))?;

        self.attach(ArchiveBinding::new(model, options, &self.catalog)?)
    }

    /// Stores `binding` and registers its archive type if that name is free.
    pub fn attach(&self, binding: ArchiveBinding) -> Result<Arc<ArchiveBinding>> {
        let source = binding.model().name().to_string();
        let binding = Arc::new(binding);
        {
            let mut types = self.types.write()?;
            let archive = binding.archive_type();
            types
                .entry(archive.name().to_string())
                .or_insert_with(|| archive.clone());
        }

        let previous = self
            .bindings
            .write()?
            .insert(source.clone(), binding.clone());
        if previous.is_some() {
            warn!(model = %source, "archive binding replaced");
        }
        Ok(binding)
    }

    pub fn binding(&self, source: &str) -> Result<Option<Arc<ArchiveBinding>>> {
        Ok(self.bindings.read()?.get(source).cloned())
    }

    /// The binding whose archive type is `archive`.
    pub fn binding_for_archive(&self, archive: &str) -> Result<Option<Arc<ArchiveBinding>>> {
        Ok(self
            .bindings
            .read()?
            .values()
            .find(|binding| binding.archive_type().name() == archive)
            .cloned())
    }

    /// Deletes `record`, archiving it first when its type is bound.
    pub fn destroy(&self, record: &mut Record, store: &mut dyn RecordStore) -> Result<bool> {
        match self.binding(record.entity_type().name())? {
            Some(binding) => binding.destroy(record, store),
            None => store.delete(record),
        }
    }

    pub fn restore(&self, archived: &mut Record, store: &mut dyn RecordStore) -> Result<()> {
        self.archive_binding(archived)?.restore(archived, store)
    }

    pub fn restore_copy(&self, archived: &Record, store: &mut dyn RecordStore) -> Result<()> {
        self.archive_binding(archived)?.restore_copy(archived, store)
    }

    /// Restores each record through the binding of its own archive type.
    pub fn restore_all(&self, archived: Vec<Record>, store: &mut dyn RecordStore) -> Result<usize> {
        let mut restored = 0;
        for mut record in archived {
            self.restore(&mut record, store)?;
            restored += 1;
        }
        Ok(restored)
    }

    pub fn is_loaded(&self, path: &Path) -> Result<bool> {
        Ok(self.loaded_paths.read()?.contains(path))
    }

    /// Records `path` as loaded. False if it already was.
    pub fn mark_loaded(&self, path: &Path) -> Result<bool> {
        Ok(self.loaded_paths.write()?.insert(path.to_path_buf()))
    }

    fn archive_binding(&self, archived: &Record) -> Result<Arc<ArchiveBinding>> {
        let name = archived.entity_type().name();
        self.binding_for_archive(name)?
            .ok_or_else(|| DbError::invalid_argument(format!("'{}' is not a bound archive type", name)))
    }
}
