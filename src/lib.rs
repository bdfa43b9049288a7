// ============================================================================
// rustmemodb-archive: soft delete with archive tables
// ============================================================================

//! Records are copied into a parallel archive table before they are deleted
//! and can later be restored from it.
//!
//! ```
//! use std::sync::Arc;
//! use rustmemodb_archive::{
//!     Catalog, ConfigOptions, DataType, EntityType, InMemoryStore, MirroringMigrator,
//!     ModelRegistry, Record, RecordStore, Value, table_block,
//! };
//!
//! # fn main() -> rustmemodb_archive::Result<()> {
//! let models = ModelRegistry::new(Arc::new(Catalog::new()));
//! models.register_type(EntityType::new("Post", "posts"))?;
//! let binding = models.undestroy("Post", &ConfigOptions::new())?;
//!
//! // creates `posts` and `archive_posts` (with a `deleted_at` column)
//! let mut migrator = MirroringMigrator::new(InMemoryStore::new(), &models);
//! migrator.create_table("posts", table_block(|t| { t.string("title"); }))?;
//! let mut store = migrator.into_inner();
//!
//! let mut post = Record::build(binding.model().clone(), [("title".to_string(), Value::from("Hello"))])?;
//! store.insert(&mut post)?;
//! models.destroy(&mut post, &mut store)?;
//!
//! let mut archived = store.find(binding.archive_type(), &Default::default())?.remove(0);
//! models.restore(&mut archived, &mut store)?;
//! assert_eq!(store.row_count("posts")?, 1);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod core;
pub mod entity;
pub mod migration;
pub mod restore;
pub mod storage;
pub mod transfer;

pub use archive::{ArchiveArgs, Archiver};
pub use config::{ArchiveConfig, Catalog, ConfigOptions, FieldDescriptor, FieldProducer, Internals};
pub use crate::core::{Attributes, Column, DataType, DbError, Result, Value};
pub use entity::{
    ArchiveBinding, Capability, EntityType, JsonModelLoader, ModelDefinition, ModelLoader, ModelRegistry, Record,
    archive_entity_type,
};
pub use migration::{MigrationArg, MigrationStatement, MirroringMigrator, Operation, SchemaExecutor, table_block};
pub use restore::{RestoreArgs, Restorer};
pub use storage::{InMemoryStore, RecordStore};
pub use transfer::{FieldTransfer, Runnable, Transfer, TransferArgs};
