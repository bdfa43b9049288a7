use super::RowId;
use crate::core::{Attributes, Column, DataType, DbError, Result, Schema, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
}

impl IndexDef {
    /// Conventional name: `index_<table>_on_<col>_and_<col>`.
    pub fn default_name(table: &str, columns: &[String]) -> String {
        format!("index_{}_on_{}", table, columns.join("_and_"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    schema: Schema,
    pub indexes: Vec<IndexDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            schema: Schema::new(columns),
            indexes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema.columns().iter().map(|c| c.name.as_str()).collect()
    }

    pub fn index(&self, name: &str) -> Option<&IndexDef> {
        self.indexes.iter().find(|idx| idx.name == name)
    }

    pub fn is_indexed(&self, column: &str) -> bool {
        self.indexes.iter().any(|idx| idx.columns.iter().any(|c| c == column))
    }
}

/// Rows of one table keyed by row id. Every stored row carries a value for
/// every column (missing ones are `Null`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    schema: TableSchema,
    rows: BTreeMap<RowId, Attributes>,
    next_row_id: RowId,
    /// Next generated integer key. Never reused after a delete; `None` once
    /// a stored key reached `i64::MAX`.
    next_key: Option<i64>,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
            next_row_id: 0,
            next_key: Some(1),
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub(crate) fn rename(&mut self, new_name: impl Into<String>) {
        self.schema.name = new_name.into();
    }

    /// Validates and stores `values`, returning the row id and the row as
    /// stored. An empty integer primary key gets the next free value.
    pub fn insert(&mut self, values: &Attributes) -> Result<(RowId, Attributes)> {
        for name in values.keys() {
            if !self.schema.schema.has_column(name) {
                return Err(DbError::ColumnNotFound(name.clone(), self.name().to_string()));
            }
        }

        let mut row = Attributes::new();
        for column in self.schema.schema.columns() {
            let mut value = values.get(&column.name).cloned().unwrap_or(Value::Null);
            if value.is_null() && column.primary_key && column.data_type == DataType::Integer {
                let key = self.next_key.ok_or_else(|| {
                    DbError::ConstraintViolation(format!(
                        "Key sequence for '{}' in table '{}' is exhausted",
                        column.name,
                        self.name()
                    ))
                })?;
                value = Value::Integer(key);
            }
            column.validate(&value)?;
            row.insert(column.name.clone(), value);
        }
        self.check_uniqueness(&row)?;
        self.advance_key(&row);

        let id = self.next_row_id;
        self.next_row_id += 1;
        self.rows.insert(id, row.clone());
        Ok((id, row))
    }

    pub fn delete(&mut self, id: RowId) -> bool {
        self.rows.remove(&id).is_some()
    }

    pub fn get(&self, id: RowId) -> Option<&Attributes> {
        self.rows.get(&id)
    }

    /// Rows whose values match every entry of `criteria`.
    pub fn find(&self, criteria: &Attributes) -> Result<Vec<(RowId, &Attributes)>> {
        for name in criteria.keys() {
            if !self.schema.schema.has_column(name) {
                return Err(DbError::ColumnNotFound(name.clone(), self.name().to_string()));
            }
        }

        Ok(self
            .rows
            .iter()
            .filter(|(_, row)| {
                criteria
                    .iter()
                    .all(|(name, expected)| row.get(name).is_some_and(|v| v.matches(expected)))
            })
            .map(|(id, row)| (*id, row))
            .collect())
    }

    pub fn scan(&self) -> impl Iterator<Item = (RowId, &Attributes)> {
        self.rows.iter().map(|(id, row)| (*id, row))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.schema.schema.has_column(&column.name) {
            return Err(DbError::ExecutionError(format!(
                "Column '{}' already exists in table '{}'",
                column.name,
                self.name()
            )));
        }
        if !column.nullable && !self.rows.is_empty() {
            return Err(DbError::ConstraintViolation(format!(
                "Column '{}' cannot be NULL",
                column.name
            )));
        }

        for row in self.rows.values_mut() {
            row.insert(column.name.clone(), Value::Null);
        }
        self.schema.schema.push(column);
        Ok(())
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        if self.schema.schema.has_column(to) {
            return Err(DbError::ExecutionError(format!(
                "Column '{}' already exists in table '{}'",
                to,
                self.name()
            )));
        }
        let table = self.name().to_string();
        let column = self
            .schema
            .schema
            .get_column_mut(from)
            .ok_or_else(|| DbError::ColumnNotFound(from.to_string(), table))?;
        column.name = to.to_string();

        for row in self.rows.values_mut() {
            if let Some(value) = row.remove(from) {
                row.insert(to.to_string(), value);
            }
        }
        for index in &mut self.schema.indexes {
            for col in &mut index.columns {
                if col == from {
                    *col = to.to_string();
                }
            }
        }
        Ok(())
    }

    /// Changes a column's type. Existing values must fit the new type.
    pub fn change_column(&mut self, name: &str, data_type: DataType) -> Result<()> {
        let column = self
            .schema
            .schema
            .get_column(name)
            .ok_or_else(|| DbError::ColumnNotFound(name.to_string(), self.name().to_string()))?;

        let mut changed = column.clone();
        changed.data_type = data_type;
        for row in self.rows.values() {
            if let Some(value) = row.get(name) {
                changed.validate(value)?;
            }
        }

        if let Some(column) = self.schema.schema.get_column_mut(name) {
            column.data_type = data_type;
        }
        Ok(())
    }

    /// Drops a column, its values and every index that covers it.
    pub fn remove_column(&mut self, name: &str) -> Result<()> {
        self.schema
            .schema
            .remove(name)
            .ok_or_else(|| DbError::ColumnNotFound(name.to_string(), self.name().to_string()))?;

        for row in self.rows.values_mut() {
            row.remove(name);
        }
        self.schema
            .indexes
            .retain(|idx| !idx.columns.iter().any(|c| c == name));
        Ok(())
    }

    pub fn add_index(&mut self, index: IndexDef) -> Result<()> {
        if self.schema.index(&index.name).is_some() {
            return Err(DbError::ExecutionError(format!(
                "Index '{}' already exists on table '{}'",
                index.name,
                self.name()
            )));
        }
        for column in &index.columns {
            if !self.schema.schema.has_column(column) {
                return Err(DbError::ColumnNotFound(column.clone(), self.name().to_string()));
            }
        }
        self.schema.indexes.push(index);
        Ok(())
    }

    pub fn remove_index(&mut self, name: &str) -> Result<IndexDef> {
        let position = self
            .schema
            .indexes
            .iter()
            .position(|idx| idx.name == name)
            .ok_or_else(|| {
                DbError::ExecutionError(format!("Index '{}' not found on table '{}'", name, self.name()))
            })?;
        Ok(self.schema.indexes.remove(position))
    }

    fn advance_key(&mut self, row: &Attributes) {
        let keys = self
            .schema
            .schema
            .columns()
            .iter()
            .filter(|c| c.primary_key && c.data_type == DataType::Integer)
            .filter_map(|c| row.get(&c.name).and_then(Value::as_i64));
        if let Some(max) = keys.max() {
            self.next_key = match (self.next_key, max.checked_add(1)) {
                (Some(next), Some(candidate)) => Some(next.max(candidate)),
                _ => None,
            };
        }
    }

    fn check_uniqueness(&self, row: &Attributes) -> Result<()> {
        for column in self.schema.schema.columns().iter().filter(|c| c.primary_key) {
            let Some(value) = row.get(&column.name) else {
                continue;
            };
            let duplicate = self
                .rows
                .values()
                .any(|existing| existing.get(&column.name) == Some(value));
            if duplicate {
                return Err(DbError::ConstraintViolation(format!(
                    "Duplicate value for primary key '{}' in table '{}'",
                    column.name,
                    self.name()
                )));
            }
        }
        Ok(())
    }
}
