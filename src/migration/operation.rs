use crate::core::{DataType, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString, IntoStaticStr};

/// Structural operations that are mirrored whenever mirroring is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SchemaAction {
    CreateTable,
    DropTable,
    RenameTable,
    AddColumn,
    RenameColumn,
    ChangeColumn,
    RemoveColumn,
}

/// Index operations, mirrored only when index mirroring is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum IndexAction {
    AddIndex,
    RemoveIndex,
}

/// A migration operation, classified by what mirroring does with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Schema(SchemaAction),
    Index(IndexAction),
    /// Anything else. Passed through to the executor, never mirrored.
    Other(String),
}

impl Operation {
    pub fn parse(name: &str) -> Self {
        if let Ok(action) = SchemaAction::from_str(name) {
            return Self::Schema(action);
        }
        if let Ok(action) = IndexAction::from_str(name) {
            return Self::Index(action);
        }
        Self::Other(name.to_string())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Schema(action) => action.into(),
            Self::Index(action) => action.into(),
            Self::Other(name) => name,
        }
    }

    pub fn is_schema_action(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    pub fn is_index_action(&self) -> bool {
        matches!(self, Self::Index(_))
    }
}

impl From<SchemaAction> for Operation {
    fn from(action: SchemaAction) -> Self {
        Self::Schema(action)
    }
}

impl From<IndexAction> for Operation {
    fn from(action: IndexAction) -> Self {
        Self::Index(action)
    }
}

impl From<&str> for Operation {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One positional argument of a migration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationArg {
    /// Table, column or index name
    Name(String),
    Type(DataType),
    Columns(Vec<String>),
    Options(BTreeMap<String, Value>),
}

impl MigrationArg {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Columns(columns.into_iter().map(Into::into).collect())
    }

    pub fn options<I, K>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Options(options.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<DataType> {
        match self {
            Self::Type(data_type) => Some(*data_type),
            _ => None,
        }
    }

    /// Column list, treating a single name as a one-column list.
    pub fn as_columns(&self) -> Option<Vec<String>> {
        match self {
            Self::Name(name) => Some(vec![name.clone()]),
            Self::Columns(columns) => Some(columns.clone()),
            _ => None,
        }
    }

    pub fn as_options(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Options(options) => Some(options),
            _ => None,
        }
    }
}

impl From<&str> for MigrationArg {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for MigrationArg {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<DataType> for MigrationArg {
    fn from(data_type: DataType) -> Self {
        Self::Type(data_type)
    }
}

impl fmt::Display for MigrationArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Type(data_type) => write!(f, "{}", data_type),
            Self::Columns(columns) => write!(f, "[{}]", columns.join(", ")),
            Self::Options(options) => {
                let pairs: Vec<String> = options.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
        }
    }
}
