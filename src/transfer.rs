//! Field transfer: build a record of some type from a trusted field map and save it.

use crate::core::{Attributes, DbError, Result};
use crate::entity::{EntityType, Record};
use crate::storage::RecordStore;
use std::sync::Arc;
use tracing::debug;

/// A single step run against a record store.
pub trait Runnable {
    fn run(&mut self, store: &mut dyn RecordStore) -> Result<()>;
}

/// A step that persists one prepared record.
pub trait Transfer: Runnable {
    /// The record that `run` will persist.
    fn target(&self) -> &Record;
}

#[derive(Debug, Clone, Default)]
pub struct TransferArgs {
    pub target_type: Option<Arc<EntityType>>,
    pub fields: Option<Attributes>,
}

impl TransferArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target_type(mut self, target_type: Arc<EntityType>) -> Self {
        self.target_type = Some(target_type);
        self
    }

    pub fn fields(mut self, fields: Attributes) -> Self {
        self.fields = Some(fields);
        self
    }
}

/// Default [`Transfer`]: an empty instance of the target type with every
/// field assigned through the raw path, inserted on `run`.
#[derive(Debug)]
pub struct FieldTransfer {
    target: Record,
}

impl FieldTransfer {
    pub fn new(args: TransferArgs) -> Result<Self> {
        let target_type = args
            .target_type
            .ok_or_else(|| DbError::invalid_argument("transfer requires a target type"))?;

        let mut target = Record::new(target_type);
        for (field, value) in args.fields.unwrap_or_default() {
            target.write_raw(field, value);
        }

        Ok(Self { target })
    }

    pub fn into_target(self) -> Record {
        self.target
    }
}

impl Runnable for FieldTransfer {
    fn run(&mut self, store: &mut dyn RecordStore) -> Result<()> {
        let row_id = store.insert(&mut self.target)?;
        debug!(
            entity = self.target.entity_type().name(),
            row_id,
            fields = self.target.attributes().len(),
            "transfer persisted"
        );
        Ok(())
    }
}

impl Transfer for FieldTransfer {
    fn target(&self) -> &Record {
        &self.target
    }
}
