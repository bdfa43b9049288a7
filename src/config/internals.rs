use crate::archive::{ArchiveArgs, Archiver};
use crate::core::Result;
use crate::restore::{RestoreArgs, Restorer};
use crate::transfer::{FieldTransfer, Runnable, Transfer, TransferArgs};
use std::fmt;
use std::sync::Arc;

pub type ArchiveFactory = Arc<dyn Fn(ArchiveArgs) -> Result<Box<dyn Runnable>> + Send + Sync>;
pub type TransferFactory = Arc<dyn Fn(TransferArgs) -> Result<Box<dyn Transfer>> + Send + Sync>;
pub type RestoreFactory = Arc<dyn Fn(RestoreArgs) -> Result<Box<dyn Runnable>> + Send + Sync>;

/// Pluggable implementations used by a configuration.
///
/// Bindings build the archive and restore steps through these factories, and
/// both steps build their transfer through `transfer`.
#[derive(Clone)]
pub struct Internals {
    pub archive: ArchiveFactory,
    pub transfer: TransferFactory,
    pub restore: RestoreFactory,
}

impl Internals {
    pub fn with_archive(mut self, archive: ArchiveFactory) -> Self {
        self.archive = archive;
        self
    }

    pub fn with_transfer(mut self, transfer: TransferFactory) -> Self {
        self.transfer = transfer;
        self
    }

    pub fn with_restore(mut self, restore: RestoreFactory) -> Self {
        self.restore = restore;
        self
    }
}

impl Default for Internals {
    fn default() -> Self {
        Self {
            archive: Arc::new(|args: ArchiveArgs| -> Result<Box<dyn Runnable>> { Ok(Box::new(Archiver::new(args)?)) }),
            transfer: Arc::new(|args: TransferArgs| -> Result<Box<dyn Transfer>> {
                Ok(Box::new(FieldTransfer::new(args)?))
            }),
            restore: Arc::new(|args: RestoreArgs| -> Result<Box<dyn Runnable>> { Ok(Box::new(Restorer::new(args)?)) }),
        }
    }
}

impl fmt::Debug for Internals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Internals")
            .field("archive", &"<factory>")
            .field("transfer", &"<factory>")
            .field("restore", &"<factory>")
            .finish()
    }
}
