use crate::core::{Column, DataType};
use std::sync::Arc;

/// Column-definition callback passed along with `create_table`.
///
/// Shared so the same definition can be applied to the source table and to
/// its archive table.
pub type TableBlock = Arc<dyn Fn(&mut TableDefinition) + Send + Sync>;

/// Columns collected by a [`TableBlock`].
#[derive(Debug, Clone, Default)]
pub struct TableDefinition {
    columns: Vec<Column>,
}

impl TableDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `block` against a fresh definition.
    pub fn from_block(block: Option<&TableBlock>) -> Self {
        let mut definition = Self::new();
        if let Some(block) = block {
            block(&mut definition);
        }
        definition
    }

    pub fn column(&mut self, name: &str, data_type: DataType) -> &mut Self {
        self.columns.push(Column::new(name, data_type));
        self
    }

    pub fn add(&mut self, column: Column) -> &mut Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(&mut self, name: &str) -> &mut Self {
        self.add(Column::new(name, DataType::Integer).primary_key())
    }

    pub fn integer(&mut self, name: &str) -> &mut Self {
        self.column(name, DataType::Integer)
    }

    pub fn string(&mut self, name: &str) -> &mut Self {
        self.column(name, DataType::String)
    }

    pub fn text(&mut self, name: &str) -> &mut Self {
        self.column(name, DataType::Text)
    }

    pub fn boolean(&mut self, name: &str) -> &mut Self {
        self.column(name, DataType::Boolean)
    }

    pub fn datetime(&mut self, name: &str) -> &mut Self {
        self.column(name, DataType::Datetime)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}

/// Wraps a closure as a [`TableBlock`].
pub fn table_block<F>(f: F) -> TableBlock
where
    F: Fn(&mut TableDefinition) + Send + Sync + 'static,
{
    Arc::new(f)
}
