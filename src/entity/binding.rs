use super::{Capability, EntityType, Record};
use crate::archive::ArchiveArgs;
use crate::config::{ArchiveConfig, Catalog, ConfigOptions};
use crate::core::{DbError, Result};
use crate::storage::RecordStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Describes the archive entity type for `source` under `config`:
/// `<Source>Archive`, stored in the configured archive table, persistable
/// and restorable.
pub fn archive_entity_type(config: &ArchiveConfig, source: &EntityType) -> Result<EntityType> {
    let table = config.archive_table_name(source.require_table()?);

    let mut archive = EntityType::new(format!("{}Archive", source.name()), table)
        .with_capability(Capability::Restorable);
    if let Some(base) = &config.abstract_base {
        archive = archive.with_base(base.clone());
    }
    Ok(archive)
}

/// Ties a source entity type to its archive configuration and runs the
/// archive step before records of that type are deleted.
#[derive(Debug, Clone)]
pub struct ArchiveBinding {
    model: Arc<EntityType>,
    archive: Arc<EntityType>,
    config: Arc<ArchiveConfig>,
}

impl ArchiveBinding {
    /// Resolves `options` over the catalog defaults, fills in the source and
    /// archive types, and registers the result in `catalog`.
    pub fn new(model: Arc<EntityType>, options: &ConfigOptions, catalog: &Catalog) -> Result<Self> {
        let config = Self::resolve(&model, options, catalog)?;
        Self::register(model, config, catalog)
    }

    /// Everything [`ArchiveBinding::new`] checks, without registering the
    /// configuration.
    pub fn resolve(model: &Arc<EntityType>, options: &ConfigOptions, catalog: &Catalog) -> Result<ArchiveConfig> {
        model.require_capability(Capability::Persistable)?;

        let mut config = catalog.defaults()?.merge(options);
        config.source_type = Some(model.clone());

        let archive = match config.target_type.clone() {
            Some(target) => target,
            None => Arc::new(archive_entity_type(&config, model)?),
        };
        archive.require_capability(Capability::Persistable)?;
        config.target_type = Some(archive);
        Ok(config)
    }

    /// Registers a configuration produced by [`ArchiveBinding::resolve`].
    pub fn register(model: Arc<EntityType>, config: ArchiveConfig, catalog: &Catalog) -> Result<Self> {
        let archive = config
            .target_type
            .clone()
            .ok_or_else(|| DbError::invalid_argument(format!("no archive type resolved for '{}'", model.name())))?;

        let config = catalog.register(config)?;
        info!(model = model.name(), archive = %archive, "archive binding created");

        Ok(Self { model, archive, config })
    }

    pub fn model(&self) -> &Arc<EntityType> {
        &self.model
    }

    pub fn archive_type(&self) -> &Arc<EntityType> {
        &self.archive
    }

    pub fn config(&self) -> &Arc<ArchiveConfig> {
        &self.config
    }

    /// Copies `record` into the archive table.
    pub fn before_destroy(&self, record: &Record, store: &mut dyn RecordStore) -> Result<()> {
        self.check_type(record, &self.model)?;
        let mut archive = (self.config.internals.archive)(
            ArchiveArgs::new()
                .source(record.clone())
                .config(self.config.clone()),
        )?;
        archive.run(store)
    }

    /// Archives and then deletes `record`. Nothing is deleted when archiving
    /// fails. Returns false for a record that was never stored.
    pub fn destroy(&self, record: &mut Record, store: &mut dyn RecordStore) -> Result<bool> {
        if !record.is_persisted() {
            debug!(model = self.model.name(), "skipping destroy of unsaved record");
            return Ok(false);
        }
        self.before_destroy(record, store)?;
        store.delete(record)
    }

    pub(super) fn check_type(&self, record: &Record, expected: &EntityType) -> Result<()> {
        if record.entity_type().name() != expected.name() {
            return Err(DbError::invalid_argument(format!(
                "expected a '{}' record, got '{}'",
                expected.name(),
                record.entity_type().name()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType, Value};
    use crate::storage::InMemoryStore;

    fn posts() -> Arc<EntityType> {
        Arc::new(EntityType::new("Post", "posts"))
    }

    fn store() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store
            .create_table(
                "posts",
                vec![Column::new("id", DataType::Integer).primary_key(), Column::new("title", DataType::String)],
            )
            .unwrap();
        store
            .create_table(
                "archive_posts",
                vec![
                    Column::new("id", DataType::Integer).primary_key(),
                    Column::new("title", DataType::String),
                    Column::new("deleted_at", DataType::Datetime),
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_archive_entity_type() {
        let config = ArchiveConfig::from_options(&ConfigOptions::new().abstract_base("ArchiveBase"));
        let archive = archive_entity_type(&config, &posts()).unwrap();

        assert_eq!(archive.name(), "PostArchive");
        assert_eq!(archive.table_name(), Some("archive_posts"));
        assert_eq!(archive.base(), Some("ArchiveBase"));
        assert!(archive.has_capability(Capability::Persistable));
        assert!(archive.has_capability(Capability::Restorable));

        assert!(archive_entity_type(&config, &EntityType::bare("Widget")).is_err());
    }

    #[test]
    fn test_new_registers_resolved_config() {
        let catalog = Catalog::new();
        let binding = ArchiveBinding::new(posts(), &ConfigOptions::new(), &catalog).unwrap();

        assert_eq!(binding.archive_type().table_name(), Some("archive_posts"));
        assert_eq!(binding.config().source_type.as_ref().unwrap().name(), "Post");
        assert!(!binding.config().has_explicit_table_name());

        let found = catalog.find_by_table("posts").unwrap().unwrap();
        assert!(Arc::ptr_eq(&found, binding.config()));
    }

    #[test]
    fn test_new_merges_over_catalog_defaults() {
        let catalog = Catalog::new();
        catalog.configure(|defaults| defaults.prefix = "old_".to_string()).unwrap();

        let binding = ArchiveBinding::new(posts(), &ConfigOptions::new().migrate(false), &catalog).unwrap();
        assert_eq!(binding.archive_type().table_name(), Some("old_posts"));
        assert!(!binding.config().migrate);

        let pinned = ArchiveBinding::new(posts(), &ConfigOptions::new().table_name("graveyard"), &catalog).unwrap();
        assert_eq!(pinned.archive_type().table_name(), Some("graveyard"));
    }

    #[test]
    fn test_new_requires_persistable_types() {
        let catalog = Catalog::new();
        let plain = Arc::new(EntityType::new("Post", "posts").without_capability(Capability::Persistable));
        assert!(ArchiveBinding::new(plain, &ConfigOptions::new(), &catalog).is_err());

        let bad_target = ConfigOptions::new().target_type(Arc::new(EntityType::bare("Nowhere")));
        assert!(ArchiveBinding::new(posts(), &bad_target, &catalog).is_err());
        assert!(catalog.is_empty().unwrap());
    }

    #[test]
    fn test_destroy_archives_then_deletes() {
        let catalog = Catalog::new();
        let binding = ArchiveBinding::new(posts(), &ConfigOptions::new(), &catalog).unwrap();
        let mut store = store();

        let mut post = Record::build(posts(), [("title".to_string(), Value::from("Hello"))]).unwrap();
        store.insert(&mut post).unwrap();

        assert!(binding.destroy(&mut post, &mut store).unwrap());
        assert_eq!(store.row_count("posts").unwrap(), 0);

        let archived = store.find(binding.archive_type(), &Default::default()).unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].get("title"), Some(&Value::from("Hello")));
        assert_eq!(archived[0].get("id"), Some(&Value::Integer(1)));
        assert!(archived[0].get("deleted_at").unwrap().as_timestamp().is_some());
    }

    #[test]
    fn test_destroy_unsaved_record_is_noop() {
        let catalog = Catalog::new();
        let binding = ArchiveBinding::new(posts(), &ConfigOptions::new(), &catalog).unwrap();
        let mut store = store();

        let mut post = Record::new(posts());
        assert!(!binding.destroy(&mut post, &mut store).unwrap());
        assert_eq!(store.row_count("archive_posts").unwrap(), 0);
    }

    #[test]
    fn test_before_destroy_rejects_other_types() {
        let catalog = Catalog::new();
        let binding = ArchiveBinding::new(posts(), &ConfigOptions::new(), &catalog).unwrap();
        let mut store = store();

        let comment = Record::new(Arc::new(EntityType::new("Comment", "comments")));
        assert!(binding.before_destroy(&comment, &mut store).is_err());
    }

    #[test]
    fn test_custom_internals_are_used() {
        use crate::archive::Archiver;
        use crate::config::Internals;
        use crate::restore::{RestoreArgs, Restorer};
        use crate::transfer::{FieldTransfer, Runnable, Transfer, TransferArgs};
        use std::sync::atomic::{AtomicUsize, Ordering};

        let archives = Arc::new(AtomicUsize::new(0));
        let transfers = Arc::new(AtomicUsize::new(0));
        let restores = Arc::new(AtomicUsize::new(0));

        let internals = {
            let (archives, transfers, restores) = (archives.clone(), transfers.clone(), restores.clone());
            Internals::default()
                .with_archive(Arc::new(move |args: ArchiveArgs| -> Result<Box<dyn Runnable>> {
                    archives.fetch_add(1, Ordering::SeqCst);
                    Ok(Box::new(Archiver::new(args)?))
                }))
                .with_transfer(Arc::new(move |args: TransferArgs| -> Result<Box<dyn Transfer>> {
                    transfers.fetch_add(1, Ordering::SeqCst);
                    Ok(Box::new(FieldTransfer::new(args)?))
                }))
                .with_restore(Arc::new(move |args: RestoreArgs| -> Result<Box<dyn Runnable>> {
                    restores.fetch_add(1, Ordering::SeqCst);
                    Ok(Box::new(Restorer::new(args)?))
                }))
        };

        let catalog = Catalog::new();
        let binding = ArchiveBinding::new(posts(), &ConfigOptions::new().internals(internals), &catalog).unwrap();
        let mut store = store();

        let mut post = Record::build(posts(), [("title".to_string(), Value::from("Hello"))]).unwrap();
        store.insert(&mut post).unwrap();
        binding.destroy(&mut post, &mut store).unwrap();

        assert_eq!(archives.load(Ordering::SeqCst), 1);
        assert_eq!(transfers.load(Ordering::SeqCst), 1);
        assert_eq!(restores.load(Ordering::SeqCst), 0);

        let archived = store.find(binding.archive_type(), &Default::default()).unwrap().remove(0);
        binding.restore_copy(&archived, &mut store).unwrap();

        assert_eq!(restores.load(Ordering::SeqCst), 1);
        assert_eq!(transfers.load(Ordering::SeqCst), 2);
        assert_eq!(store.row_count("posts").unwrap(), 1);
    }

    #[test]
    fn test_failing_archive_factory_aborts_destroy() {
        use crate::config::Internals;
        use crate::transfer::Runnable;

        let internals = Internals::default().with_archive(Arc::new(|_: ArchiveArgs| -> Result<Box<dyn Runnable>> {
            Err(DbError::UnsupportedOperation("archiving disabled".to_string()))
        }));
        let catalog = Catalog::new();
        let binding = ArchiveBinding::new(posts(), &ConfigOptions::new().internals(internals), &catalog).unwrap();
        let mut store = store();

        let mut post = Record::build(posts(), [("title".to_string(), Value::from("Hello"))]).unwrap();
        store.insert(&mut post).unwrap();

        assert!(matches!(
            binding.destroy(&mut post, &mut store),
            Err(DbError::UnsupportedOperation(_))
        ));
        assert_eq!(store.row_count("posts").unwrap(), 1);
    }
}
