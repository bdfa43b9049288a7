use super::{IndexDef, RecordStore, RowId, Table, TableSchema};
use crate::core::{Attributes, Column, DataType, DbError, Result, Value};
use crate::entity::{EntityType, Record};
use crate::migration::executor::{name_arg, type_arg};
use crate::migration::{IndexAction, MigrationArg, Operation, SchemaAction, SchemaExecutor, TableBlock, TableDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Reference backend: a set of named tables held in memory.
///
/// Implements both [`RecordStore`] and [`SchemaExecutor`], so one instance
/// can be migrated and then used to archive and restore records.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: HashMap<String, Table>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self { tables: HashMap::new() }
    }

    pub fn create_table(&mut self, name: &str, columns: Vec<Column>) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(DbError::TableExists(name.to_string()));
        }
        self.tables
            .insert(name.to_string(), Table::new(TableSchema::new(name, columns)));
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        if self.tables.remove(name).is_none() {
            return Err(DbError::TableNotFound(name.to_string()));
        }
        Ok(())
    }

    pub fn rename_table(&mut self, from: &str, to: &str) -> Result<()> {
        if self.tables.contains_key(to) {
            return Err(DbError::TableExists(to.to_string()));
        }
        let mut table = self
            .tables
            .remove(from)
            .ok_or_else(|| DbError::TableNotFound(from.to_string()))?;
        table.rename(to);
        self.tables.insert(to.to_string(), table);
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn row_count(&self, name: &str) -> Result<usize> {
        Ok(self.table(name)?.row_count())
    }

    fn run_schema(&mut self, action: SchemaAction, op: &Operation, args: &[MigrationArg], block: Option<&TableBlock>) -> Result<()> {
        let table = name_arg(op, args, 0)?;
        match action {
            SchemaAction::CreateTable => {
                let definition = TableDefinition::from_block(block);
                let mut columns = Vec::new();
                let implicit_id = !args
                    .iter()
                    .filter_map(MigrationArg::as_options)
                    .any(|opts| opts.get("id") == Some(&Value::Boolean(false)));
                if implicit_id && !definition.columns().iter().any(|c| c.name == "id") {
                    columns.push(Column::new("id", DataType::Integer).primary_key());
                }
                columns.extend(definition.into_columns());
                self.create_table(table, columns)
            }
            SchemaAction::DropTable => self.drop_table(table),
            SchemaAction::RenameTable => self.rename_table(table, name_arg(op, args, 1)?),
            SchemaAction::AddColumn => {
                let column = Column::new(name_arg(op, args, 1)?, type_arg(op, args, 2)?);
                self.table_mut(table)?.add_column(column)
            }
            SchemaAction::RenameColumn => {
                let (from, to) = (name_arg(op, args, 1)?, name_arg(op, args, 2)?);
                self.table_mut(table)?.rename_column(from, to)
            }
            SchemaAction::ChangeColumn => {
                let (column, data_type) = (name_arg(op, args, 1)?, type_arg(op, args, 2)?);
                self.table_mut(table)?.change_column(column, data_type)
            }
            SchemaAction::RemoveColumn => self.table_mut(table)?.remove_column(name_arg(op, args, 1)?),
        }
    }

    fn run_index(&mut self, action: IndexAction, op: &Operation, args: &[MigrationArg]) -> Result<()> {
        let table_name = name_arg(op, args, 0)?;
        let options = args.iter().find_map(MigrationArg::as_options);
        let explicit_name = options
            .and_then(|opts| opts.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let columns = args.get(1).and_then(MigrationArg::as_columns).or_else(|| {
            options
                .and_then(|opts| opts.get("column"))
                .and_then(Value::as_str)
                .map(|c| vec![c.to_string()])
        });

        let table = self.table_mut(table_name)?;
        match action {
            IndexAction::AddIndex => {
                let columns = columns.ok_or_else(|| DbError::invalid_argument("add_index expects columns"))?;
                let name = explicit_name.unwrap_or_else(|| IndexDef::default_name(table_name, &columns));
                table.add_index(IndexDef { name, columns })
            }
            IndexAction::RemoveIndex => {
                let name = match (explicit_name, columns) {
                    (Some(name), _) => name,
                    (None, Some(columns)) => table
                        .schema()
                        .indexes
                        .iter()
                        .find(|idx| idx.columns == columns)
                        .map(|idx| idx.name.clone())
                        .unwrap_or_else(|| IndexDef::default_name(table_name, &columns)),
                    (None, None) => return Err(DbError::invalid_argument("remove_index expects a column or name")),
                };
                table.remove_index(&name).map(|_| ())
            }
        }
    }
}

impl RecordStore for InMemoryStore {
    fn insert(&mut self, record: &mut Record) -> Result<RowId> {
        let table_name = record.entity_type().require_table()?.to_string();
        let (row_id, stored) = self.table_mut(&table_name)?.insert(record.attributes())?;

        for (name, value) in stored {
            if !value.is_null() && record.get(&name).is_none() {
                record.write_raw(name, value);
            }
        }
        record.mark_persisted(row_id);

        debug!(table = %table_name, row_id, "row inserted");
        Ok(row_id)
    }

    fn find(&self, entity_type: &Arc<EntityType>, criteria: &Attributes) -> Result<Vec<Record>> {
        let table = self.table(entity_type.require_table()?)?;
        Ok(table
            .find(criteria)?
            .into_iter()
            .map(|(row_id, row)| {
                let mut record = Record::from_trusted_fields(entity_type.clone(), row.clone());
                record.mark_persisted(row_id);
                record
            })
            .collect())
    }

    fn delete(&mut self, record: &mut Record) -> Result<bool> {
        let Some(row_id) = record.row_id() else {
            return Ok(false);
        };
        let table_name = record.entity_type().require_table()?.to_string();
        let removed = self.table_mut(&table_name)?.delete(row_id);
        if removed {
            record.mark_removed();
            debug!(table = %table_name, row_id, "row deleted");
        }
        Ok(removed)
    }
}

impl SchemaExecutor for InMemoryStore {
    fn execute(&mut self, operation: &Operation, arguments: &[MigrationArg], block: Option<&TableBlock>) -> Result<()> {
        debug!(%operation, args = arguments.len(), "executing migration");
        match operation {
            Operation::Schema(action) => self.run_schema(*action, operation, arguments, block),
            Operation::Index(action) => self.run_index(*action, operation, arguments),
            Operation::Other(name) => Err(DbError::UnsupportedOperation(format!(
                "migration operation '{}'",
                name
            ))),
        }
    }
}
