use super::EntityType;
use crate::core::{Attributes, DbError, Result, Value};
use crate::storage::RowId;
use std::sync::Arc;

/// One instance of an entity type: its attributes plus the row it was stored at.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entity_type: Arc<EntityType>,
    attributes: Attributes,
    row_id: Option<RowId>,
}

impl Record {
    /// Empty, unsaved instance.
    pub fn new(entity_type: Arc<EntityType>) -> Self {
        Self {
            entity_type,
            attributes: Attributes::new(),
            row_id: None,
        }
    }

    /// Builds an instance through the validated write path.
    pub fn build(
        entity_type: Arc<EntityType>,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<Self> {
        let mut record = Self::new(entity_type);
        for (name, value) in fields {
            record.set(name, value)?;
        }
        Ok(record)
    }

    /// Builds an instance from a field map that is already trusted, such as
    /// an archived copy. Protected attributes are written as well.
    pub fn from_trusted_fields(
        entity_type: Arc<EntityType>,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        let mut record = Self::new(entity_type);
        for (name, value) in fields {
            record.write_raw(name, value);
        }
        record
    }

    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.entity_type
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Validated write: rejects protected attributes.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let name = name.into();
        if self.entity_type.is_protected(&name) {
            return Err(DbError::ProtectedAttribute(
                name,
                self.entity_type.name().to_string(),
            ));
        }
        self.attributes.insert(name, value.into());
        Ok(())
    }

    /// Unchecked write.
    pub fn write_raw(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn into_attributes(self) -> Attributes {
        self.attributes
    }

    pub fn row_id(&self) -> Option<RowId> {
        self.row_id
    }

    pub fn is_persisted(&self) -> bool {
        self.row_id.is_some()
    }

    pub(crate) fn mark_persisted(&mut self, row_id: RowId) {
        self.row_id = Some(row_id);
    }

    pub(crate) fn mark_removed(&mut self) {
        self.row_id = None;
    }
}
