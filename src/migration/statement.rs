use super::{MigrationArg, Operation, SchemaAction, SchemaExecutor, TableBlock};
use crate::config::{ArchiveConfig, Catalog};
use crate::core::{DbError, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// One migration call, resolved against the catalog to decide whether and
/// how it is replayed on an archive table.
#[derive(Clone)]
pub struct MigrationStatement {
    operation: Operation,
    arguments: Vec<MigrationArg>,
    block: Option<TableBlock>,
}

impl MigrationStatement {
    pub fn new(operation: impl Into<Operation>, arguments: Vec<MigrationArg>, block: Option<TableBlock>) -> Self {
        Self {
            operation: operation.into(),
            arguments,
            block,
        }
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn arguments(&self) -> &[MigrationArg] {
        &self.arguments
    }

    pub fn block(&self) -> Option<&TableBlock> {
        self.block.as_ref()
    }

    /// The table the operation targets: the first argument.
    pub fn source_table_name(&self) -> Option<&str> {
        self.arguments.first().and_then(MigrationArg::as_name)
    }

    /// First registered configuration whose source type uses this table.
    pub fn config(&self, catalog: &Catalog) -> Result<Option<Arc<ArchiveConfig>>> {
        match self.source_table_name() {
            Some(table) => catalog.find_by_table(table),
            None => Ok(None),
        }
    }

    pub fn target_table_name(&self, catalog: &Catalog) -> Result<Option<String>> {
        let (Some(source), Some(config)) = (self.source_table_name(), self.config(catalog)?) else {
            return Ok(None);
        };
        Ok(Some(archive_table(&config, source)))
    }

    pub fn is_schema_action(&self) -> bool {
        self.operation.is_schema_action()
    }

    pub fn is_index_action(&self) -> bool {
        self.operation.is_index_action()
    }

    pub fn is_rename_table(&self) -> bool {
        self.operation == Operation::Schema(SchemaAction::RenameTable)
    }

    /// Whether this operation should be replayed on the archive table.
    pub fn should_run(&self, catalog: &Catalog) -> Result<bool> {
        if self.arguments.is_empty() {
            return Ok(false);
        }
        let Some(config) = self.config(catalog)? else {
            return Ok(false);
        };
        if !config.migrate {
            return Ok(false);
        }
        // a pinned archive table keeps its name when the source is renamed
        if self.is_rename_table() && config.has_explicit_table_name() {
            return Ok(false);
        }
        Ok(self.is_schema_action() || (self.is_index_action() && config.mirror_indexes))
    }

    /// Arguments rewritten for the archive table. `self` is left untouched.
    pub fn target_arguments(&self, catalog: &Catalog) -> Result<Vec<MigrationArg>> {
        let config = self.require_config(catalog)?;
        let source = self.source_table_name().unwrap_or_default();

        let mut arguments = self.arguments.clone();
        arguments[0] = MigrationArg::Name(archive_table(&config, source));
        if self.is_rename_table()
            && let Some(new_name) = arguments.get(1).and_then(MigrationArg::as_name).map(|n| config.prefixed(n))
        {
            arguments[1] = MigrationArg::Name(new_name);
        }
        Ok(arguments)
    }

    /// Replays the operation on the archive table. `create_table` is
    /// followed by one `add_column` per configured field, by name.
    pub fn run(&self, executor: &mut dyn SchemaExecutor, catalog: &Catalog) -> Result<()> {
        let config = self.require_config(catalog)?;
        let arguments = self.target_arguments(catalog)?;

        info!(operation = %self.operation, table = %arguments[0], "mirroring migration onto archive");
        executor.execute(&self.operation, &arguments, self.block.as_ref())?;

        if self.operation == Operation::Schema(SchemaAction::CreateTable) {
            for field in config.sorted_fields() {
                debug!(field = field.name(), "adding archive field column");
                executor.execute(
                    &SchemaAction::AddColumn.into(),
                    &[
                        arguments[0].clone(),
                        MigrationArg::name(field.name()),
                        MigrationArg::Type(field.data_type()),
                    ],
                    None,
                )?;
            }
        }
        Ok(())
    }

    fn require_config(&self, catalog: &Catalog) -> Result<Arc<ArchiveConfig>> {
        self.config(catalog)?.ok_or_else(|| {
            DbError::invalid_argument(format!(
                "no archive configuration for table '{}'",
                self.source_table_name().unwrap_or_default()
            ))
        })
    }
}

/// The bound archive type's table when there is one, the derived name otherwise.
fn archive_table(config: &ArchiveConfig, source_table: &str) -> String {
    config
        .target_type
        .as_ref()
        .and_then(|ty| ty.table_name())
        .map(str::to_string)
        .unwrap_or_else(|| config.archive_table_name(source_table))
}

impl std::fmt::Debug for MigrationStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationStatement")
            .field("operation", &self.operation)
            .field("arguments", &self.arguments)
            .field("block", &self.block.as_ref().map(|_| "<block>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigOptions, FieldDescriptor};
    use crate::core::{DataType, Value};
    use crate::entity::EntityType;

    fn catalog(options: ConfigOptions) -> Catalog {
        let catalog = Catalog::new();
        catalog
            .create(&options.source_type(Arc::new(EntityType::new("Source", "source"))))
            .unwrap();
        catalog
    }

    fn statement(operation: &str, arguments: Vec<MigrationArg>) -> MigrationStatement {
        MigrationStatement::new(Operation::parse(operation), arguments, None)
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(String, Vec<MigrationArg>)>,
    }

    impl SchemaExecutor for Recorder {
        fn execute(&mut self, operation: &Operation, arguments: &[MigrationArg], _block: Option<&TableBlock>) -> Result<()> {
            self.calls.push((operation.to_string(), arguments.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn test_source_table_name() {
        let stmt = statement("add_column", vec!["foo".into(), "bar".into()]);
        assert_eq!(stmt.source_table_name(), Some("foo"));
        assert_eq!(statement("add_column", vec![]).source_table_name(), None);
    }

    #[test]
    fn test_config_resolves_first_match() {
        let catalog = catalog(ConfigOptions::new());
        catalog
            .create(&ConfigOptions::new().table_name("second").source_type(Arc::new(EntityType::new("Other", "source"))))
            .unwrap();

        let config = statement("add_column", vec!["source".into()]).config(&catalog).unwrap().unwrap();
        assert_eq!(config.source_type.as_ref().unwrap().name(), "Source");
        assert!(statement("add_column", vec!["missing".into()]).config(&catalog).unwrap().is_none());
    }

    #[test]
    fn test_target_table_name() {
        let catalog = catalog(ConfigOptions::new());
        let stmt = statement("add_column", vec!["source".into()]);
        assert_eq!(stmt.target_table_name(&catalog).unwrap().as_deref(), Some("archive_source"));

        let pinned = self::catalog(ConfigOptions::new().table_name("old_source"));
        assert_eq!(stmt.target_table_name(&pinned).unwrap().as_deref(), Some("old_source"));
    }

    #[test]
    fn test_should_run_truth_table() {
        let add_column = statement("add_column", vec!["source".into(), "col".into(), DataType::String.into()]);
        let add_index = statement("add_index", vec!["source".into(), "col".into()]);
        let rename = statement("rename_table", vec!["source".into(), "new_source".into()]);

        let default = catalog(ConfigOptions::new());
        assert!(add_column.should_run(&default).unwrap());
        assert!(!add_index.should_run(&default).unwrap());
        assert!(rename.should_run(&default).unwrap());

        let no_migrate = catalog(ConfigOptions::new().migrate(false));
        assert!(!add_column.should_run(&no_migrate).unwrap());

        let indexes = catalog(ConfigOptions::new().indexes(true));
        assert!(add_index.should_run(&indexes).unwrap());

        let indexes_no_migrate = catalog(ConfigOptions::new().indexes(true).migrate(false));
        assert!(!add_index.should_run(&indexes_no_migrate).unwrap());

        let pinned = catalog(ConfigOptions::new().table_name("old_source"));
        assert!(!rename.should_run(&pinned).unwrap());
        assert!(add_column.should_run(&pinned).unwrap());

        assert!(!statement("add_column", vec![]).should_run(&default).unwrap());
        assert!(!statement("add_column", vec!["unknown".into()]).should_run(&default).unwrap());
        assert!(!statement("execute", vec!["source".into()]).should_run(&default).unwrap());
    }

    #[test]
    fn test_target_arguments_rename_table() {
        let catalog = catalog(ConfigOptions::new());
        let rename = statement("rename_table", vec!["source".into(), "new_source".into()]);

        let target = rename.target_arguments(&catalog).unwrap();
        assert_eq!(target, vec![MigrationArg::from("archive_source"), MigrationArg::from("archive_new_source")]);
        assert_eq!(rename.arguments(), &[MigrationArg::from("source"), MigrationArg::from("new_source")]);
    }

    #[test]
    fn test_target_arguments_keep_trailing_arguments() {
        let catalog = catalog(ConfigOptions::new());
        let add = statement("add_column", vec!["source".into(), "title".into(), DataType::String.into()]);

        assert_eq!(
            add.target_arguments(&catalog).unwrap(),
            vec![MigrationArg::from("archive_source"), "title".into(), DataType::String.into()]
        );
    }

    #[test]
    fn test_target_arguments_without_config() {
        let catalog = Catalog::new();
        let err = statement("add_column", vec!["source".into()]).target_arguments(&catalog).unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
    }

    #[test]
    fn test_run_create_table_adds_field_columns() {
        let catalog = catalog(ConfigOptions::new().fields([
            FieldDescriptor::deleted_at(),
            FieldDescriptor::constant("deleted_by_id", DataType::Integer, Value::Integer(1)),
        ]));
        let mut recorder = Recorder::default();

        statement("create_table", vec!["source".into()]).run(&mut recorder, &catalog).unwrap();

        assert_eq!(
            recorder.calls,
            vec![
                ("create_table".to_string(), vec![MigrationArg::from("archive_source")]),
                (
                    "add_column".to_string(),
                    vec!["archive_source".into(), "deleted_at".into(), DataType::Datetime.into()]
                ),
                (
                    "add_column".to_string(),
                    vec!["archive_source".into(), "deleted_by_id".into(), DataType::Integer.into()]
                ),
            ]
        );
    }

    #[test]
    fn test_run_other_schema_action_is_single_call() {
        let catalog = catalog(ConfigOptions::new());
        let mut recorder = Recorder::default();

        statement("remove_column", vec!["source".into(), "title".into()])
            .run(&mut recorder, &catalog)
            .unwrap();

        assert_eq!(
            recorder.calls,
            vec![("remove_column".to_string(), vec!["archive_source".into(), "title".into()])]
        );
    }
}
