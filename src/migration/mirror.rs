use super::{IndexAction, MigrationArg, MigrationStatement, Operation, SchemaAction, SchemaExecutor, TableBlock};
use crate::core::{DataType, Result};
use crate::entity::{ModelLoader, ModelRegistry};
use tracing::{debug, info, warn};

/// Wraps a [`SchemaExecutor`] so that every operation on a source table is
/// also replayed on that table's archive.
///
/// The wrapped executor always runs first. Mirroring is decided per call by
/// [`MigrationStatement::should_run`] against the registry's catalog. Model
/// definitions from the default configuration's `model_paths` are loaded
/// before the first operation so their archive configurations are known.
pub struct MirroringMigrator<'a, E> {
    inner: E,
    models: &'a ModelRegistry,
    loader: Option<&'a dyn ModelLoader>,
    models_loaded: bool,
}

impl<'a, E: SchemaExecutor> MirroringMigrator<'a, E> {
    pub fn new(inner: E, models: &'a ModelRegistry) -> Self {
        Self {
            inner,
            models,
            loader: None,
            models_loaded: false,
        }
    }

    pub fn with_loader(mut self, loader: &'a dyn ModelLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.inner
    }

    pub fn into_inner(self) -> E {
        self.inner
    }

    pub fn create_table(&mut self, name: &str, block: TableBlock) -> Result<()> {
        self.dispatch(SchemaAction::CreateTable.into(), vec![name.into()], Some(block))
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.dispatch(SchemaAction::DropTable.into(), vec![name.into()], None)
    }

    pub fn rename_table(&mut self, from: &str, to: &str) -> Result<()> {
        self.dispatch(SchemaAction::RenameTable.into(), vec![from.into(), to.into()], None)
    }

    pub fn add_column(&mut self, table: &str, column: &str, data_type: DataType) -> Result<()> {
        self.dispatch(
            SchemaAction::AddColumn.into(),
            vec![table.into(), column.into(), data_type.into()],
            None,
        )
    }

    pub fn rename_column(&mut self, table: &str, from: &str, to: &str) -> Result<()> {
        self.dispatch(
            SchemaAction::RenameColumn.into(),
            vec![table.into(), from.into(), to.into()],
            None,
        )
    }

    pub fn change_column(&mut self, table: &str, column: &str, data_type: DataType) -> Result<()> {
        self.dispatch(
            SchemaAction::ChangeColumn.into(),
            vec![table.into(), column.into(), data_type.into()],
            None,
        )
    }

    pub fn remove_column(&mut self, table: &str, column: &str) -> Result<()> {
        self.dispatch(SchemaAction::RemoveColumn.into(), vec![table.into(), column.into()], None)
    }

    pub fn add_index(&mut self, table: &str, columns: &[&str]) -> Result<()> {
        self.dispatch(
            IndexAction::AddIndex.into(),
            vec![table.into(), MigrationArg::columns(columns.iter().copied())],
            None,
        )
    }

    pub fn remove_index(&mut self, table: &str, columns: &[&str]) -> Result<()> {
        self.dispatch(
            IndexAction::RemoveIndex.into(),
            vec![table.into(), MigrationArg::columns(columns.iter().copied())],
            None,
        )
    }

    fn dispatch(&mut self, operation: Operation, arguments: Vec<MigrationArg>, block: Option<TableBlock>) -> Result<()> {
        self.ensure_models_loaded()?;
        self.inner.execute(&operation, &arguments, block.as_ref())?;

        let statement = MigrationStatement::new(operation, arguments, block);
        let catalog = self.models.catalog();
        if statement.should_run(catalog)? {
            statement.run(&mut self.inner, catalog)?;
        } else {
            debug!(operation = %statement.operation(), "not mirrored");
        }
        Ok(())
    }

    fn ensure_models_loaded(&mut self) -> Result<()> {
        if self.models_loaded {
            return Ok(());
        }
        let paths = self.models.catalog().defaults()?.model_paths;
        match self.loader {
            Some(loader) if !paths.is_empty() => {
                let loaded = loader.load_models(&paths, self.models)?;
                info!(loaded, "model definitions loaded for migration");
            }
            None if !paths.is_empty() => {
                warn!(paths = ?paths, "model paths configured but no loader set; definitions not loaded");
            }
            _ => {}
        }
        self.models_loaded = true;
        Ok(())
    }
}

impl<E: SchemaExecutor> SchemaExecutor for MirroringMigrator<'_, E> {
    fn execute(&mut self, operation: &Operation, arguments: &[MigrationArg], block: Option<&TableBlock>) -> Result<()> {
        self.dispatch(operation.clone(), arguments.to_vec(), block.cloned())
    }
}
