use crate::core::{Attributes, Result};
use crate::entity::{EntityType, Record};
use std::sync::Arc;

pub type RowId = usize;

/// Persistence collaborator used by transfers, bindings and restores.
pub trait RecordStore {
    /// Saves `record` into its type's table and marks it persisted.
    /// Values the store generates (such as a primary key) are written back.
    fn insert(&mut self, record: &mut Record) -> Result<RowId>;

    /// Every stored instance of `entity_type` matching `criteria`.
    fn find(&self, entity_type: &Arc<EntityType>, criteria: &Attributes) -> Result<Vec<Record>>;

    /// Removes `record`. Returns false when it was not stored.
    fn delete(&mut self, record: &mut Record) -> Result<bool>;
}
