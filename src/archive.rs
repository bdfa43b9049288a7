//! Copies a record into its archive table before the record is destroyed.

use crate::config::ArchiveConfig;
use crate::core::{Attributes, DbError, Result};
use crate::entity::Record;
use crate::storage::RecordStore;
use crate::transfer::{Runnable, Transfer, TransferArgs};
use std::sync::Arc;
use tracing::info_span;

#[derive(Default)]
pub struct ArchiveArgs {
    pub source: Option<Record>,
    pub config: Option<Arc<ArchiveConfig>>,
    /// Prebuilt transfer, used instead of building one from the config.
    pub transfer: Option<Box<dyn Transfer>>,
}

impl ArchiveArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: Record) -> Self {
        self.source = Some(source);
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

pub struct Archiver {
    source: Record,
    config: Arc<ArchiveConfig>,
    transfer: Option<Box<dyn Transfer>>,
}

impl Archiver {
    pub fn new(args: ArchiveArgs) -> Result<Self> {
        let (Some(source), Some(config)) = (args.source, args.config) else {
            return Err(DbError::invalid_argument("archive requires a source and a config"));
        };

        Ok(Self {
            source,
            config,
            transfer: args.transfer,
        })
    }

    pub fn source(&self) -> &Record {
        &self.source
    }

    pub fn config(&self) -> &Arc<ArchiveConfig> {
        &self.config
    }

    /// Source attributes with the configured fields computed on top.
    pub fn archive_fields(&self) -> Attributes {
        let mut fields = self.source.attributes().clone();
        fields.extend(self.config.primitive_fields(Some(&self.source)));
        fields
    }

    /// The transfer this archiver runs, built on first access.
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
        let target_type = self.config.target_type.clone().ok_or_else(|| {
            DbError::invalid_argument(format!(
                "no archive type configured for '{}'",
                self.source.entity_type().name()
            ))
        })?;

        (self.config.internals.transfer)(
            TransferArgs::new()
                .target_type(target_type)
                .fields(self.archive_fields()),
        )
    }
}

impl Runnable for Archiver {
    fn run(&mut self, store: &mut dyn RecordStore) -> Result<()> {
        let span = info_span!("archive", source = self.source.entity_type().name());
        let _enter = span.enter();
        self.ensure_transfer()?.run(store)
    }
}
