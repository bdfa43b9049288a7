use super::{ArchiveBinding, Capability, Record};
use crate::core::{Attributes, Result};
use crate::restore::RestoreArgs;
use crate::storage::RecordStore;
use tracing::info;

impl ArchiveBinding {
    /// Writes the archived record back into the source table and keeps the
    /// archive copy.
    pub fn restore_copy(&self, archived: &Record, store: &mut dyn RecordStore) -> Result<()> {
        archived.entity_type().require_capability(Capability::Restorable)?;
        self.check_type(archived, self.archive_type())?;

        let mut restore = (self.config().internals.restore)(
            RestoreArgs::new()
                .target(archived.clone())
                .config(self.config().clone()),
        )?;
        restore.run(store)
    }

    /// Restores the record and removes it from the archive. If the restore
    /// write fails the archive copy is left in place.
    pub fn restore(&self, archived: &mut Record, store: &mut dyn RecordStore) -> Result<()> {
        self.restore_copy(archived, store)?;
        store.delete(archived)?;
        Ok(())
    }

    /// Restores every record in order, stopping at the first failure.
    /// Returns how many were restored.
    pub fn restore_all(&self, archived: Vec<Record>, store: &mut dyn RecordStore) -> Result<usize> {
        let mut restored = 0;
        for mut record in archived {
            self.restore(&mut record, store)?;
            restored += 1;
        }
        info!(model = self.model().name(), restored, "archived records restored");
        Ok(restored)
    }

    /// Restores every archived record matching `criteria`.
    pub fn restore_where(&self, criteria: &Attributes, store: &mut dyn RecordStore) -> Result<usize> {
        let archived = store.find(self.archive_type(), criteria)?;
        self.restore_all(archived, store)
    }
}
