//! Entity types, record instances and the archive lifecycle binding.

pub mod binding;
pub mod entity_type;
pub mod loader;
pub mod record;
pub mod registry;
mod restorable;

pub use binding::{ArchiveBinding, archive_entity_type};
pub use entity_type::{Capability, EntityType};
pub use loader::{JsonModelLoader, ModelDefinition, ModelLoader};
pub use record::Record;
pub use registry::ModelRegistry;
