pub mod engine;
pub mod memory;
pub mod table;

pub use engine::{RecordStore, RowId};
pub use memory::InMemoryStore;
pub use table::{IndexDef, Table, TableSchema};
