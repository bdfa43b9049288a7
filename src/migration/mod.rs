//! Mirrors schema migrations of source tables onto their archive tables.

pub mod definition;
pub mod executor;
pub mod mirror;
pub mod operation;
pub mod statement;

pub use definition::{TableBlock, TableDefinition, table_block};
pub use executor::SchemaExecutor;
pub use mirror::MirroringMigrator;
pub use operation::{IndexAction, MigrationArg, Operation, SchemaAction};
pub use statement::MigrationStatement;
