pub mod error;
pub mod types;
pub mod value;

pub use error::{DbError, Result};
pub use types::{Attributes, Column, DataType, Schema};
pub use value::Value;
