use super::{MigrationArg, Operation, TableBlock};
use crate::core::{DataType, DbError, Result};

/// Runs migration operations against some schema.
pub trait SchemaExecutor {
    fn execute(&mut self, operation: &Operation, arguments: &[MigrationArg], block: Option<&TableBlock>) -> Result<()>;
}

impl<F> SchemaExecutor for F
where
    F: FnMut(&Operation, &[MigrationArg], Option<&TableBlock>) -> Result<()>,
{
    fn execute(&mut self, operation: &Operation, arguments: &[MigrationArg], block: Option<&TableBlock>) -> Result<()> {
        self(operation, arguments, block)
    }
}

/// Positional name argument, or an argument error naming the operation.
pub(crate) fn name_arg<'a>(operation: &Operation, arguments: &'a [MigrationArg], position: usize) -> Result<&'a str> {
    arguments
        .get(position)
        .and_then(MigrationArg::as_name)
        .ok_or_else(|| missing(operation, position, "name"))
}

pub(crate) fn type_arg(operation: &Operation, arguments: &[MigrationArg], position: usize) -> Result<DataType> {
    arguments
        .get(position)
        .and_then(MigrationArg::as_type)
        .ok_or_else(|| missing(operation, position, "type"))
}

fn missing(operation: &Operation, position: usize, kind: &str) -> DbError {
    DbError::invalid_argument(format!("{} expects a {} at position {}", operation, kind, position))
}
