//! Revives an archived record into its source table.

use crate::config::ArchiveConfig;
use crate::core::{Attributes, DbError, Result};
use crate::entity::Record;
use crate::storage::RecordStore;
use crate::transfer::{Runnable, Transfer, TransferArgs};
use std::sync::Arc;
use tracing::info_span;

#[derive(Default)]
pub struct RestoreArgs {
    /// The archived record to revive.
    pub target: Option<Record>,
    pub config: Option<Arc<ArchiveConfig>>,
    pub transfer: Option<Box<dyn Transfer>>,
}

impl RestoreArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(mut self, target: Record) -> Self {
        self.target = Some(target);
        self
    }

    pub fn config(mut self, config: Arc<ArchiveConfig>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn transfer(mut self, transfer: Box<dyn Transfer>) -> Self {
        self.transfer = Some(transfer);
        self
    }
}

/// Writes an archived record back into its source table.
///
/// Only the copy is made here. Removing the archived row afterwards is up to
/// the caller (see `ArchiveBinding::restore`).
pub struct Restorer {
    target: Record,
    config: Arc<ArchiveConfig>,
    transfer: Option<Box<dyn Transfer>>,
}

impl Restorer {
    pub fn new(args: RestoreArgs) -> Result<Self> {
        let (Some(target), Some(config)) = (args.target, args.config) else {
            return Err(DbError::invalid_argument("restore requires a target and a config"));
        };

        Ok(Self {
            target,
            config,
            transfer: args.transfer,
        })
    }

    pub fn target(&self) -> &Record {
        &self.target
    }

    pub fn config(&self) -> &Arc<ArchiveConfig> {
        &self.config
    }

    /// Archived attributes minus the configured bookkeeping fields.
    pub fn restore_fields(&self) -> Attributes {
        self.target
            .attributes()
            .iter()
            .filter(|(name, _)| !self.config.is_managed_field(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub fn transfer(&mut self) -> Result<&dyn Transfer> {
        Ok(&**self.ensure_transfer()?)
    }

    fn ensure_transfer(&mut self) -> Result<&mut Box<dyn Transfer>> {
        let transfer = match self.transfer.take() {
            Some(transfer) => transfer,
            None => self.build_transfer()?,
        };
        Ok(self.transfer.insert(transfer))
    }

    fn build_transfer(&self) -> Result<Box<dyn Transfer>> {
        let source_type = self.config.source_type.clone().ok_or_else(|| {
            DbError::invalid_argument(format!(
                "no source type configured for '{}'",
                self.target.entity_type().name()
            ))
        })?;

        (self.config.internals.transfer)(
            TransferArgs::new()
                .target_type(source_type)
                .fields(self.restore_fields()),
        )
    }
}

impl Runnable for Restorer {
    fn run(&mut self, store: &mut dyn RecordStore) -> Result<()> {
        let span = info_span!("restore", archived = self.target.entity_type().name());
        let _enter = span.enter();
        self.ensure_transfer()?.run(store)
    }
}
