use crate::core::{DataType, DbError, Result, Value};
use crate::entity::Record;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Function producing a field value, optionally from the record being archived.
pub type FieldProducer = Arc<dyn Fn(Option<&Record>) -> Value + Send + Sync>;

#[derive(Clone)]
enum FieldValue {
    Constant(Value),
    Producer(FieldProducer),
}

/// A named, typed value producer attached to an archive configuration.
///
/// The type tag is only used when mirroring `create_table` onto the archive
/// table; produced values are not checked against it.
#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    data_type: DataType,
    value: FieldValue,
}

impl FieldDescriptor {
    /// Builds a descriptor from an optional constant and an optional producer.
    ///
    /// At least one must be given. When both are, the producer wins.
    pub fn new(
        name: impl Into<String>,
        data_type: DataType,
        constant: Option<Value>,
        producer: Option<FieldProducer>,
    ) -> Result<Self> {
        let name = name.into();
        let value = match (producer, constant) {
            (Some(producer), _) => FieldValue::Producer(producer),
            (None, Some(constant)) => FieldValue::Constant(constant),
            (None, None) => {
                return Err(DbError::invalid_argument(format!(
                    "field '{}' needs a value or a producer",
                    name
                )));
            }
        };

        Ok(Self {
            name,
            data_type,
            value,
        })
    }

    pub fn constant(name: impl Into<String>, data_type: DataType, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            data_type,
            value: FieldValue::Constant(value.into()),
        }
    }

    pub fn computed<F>(name: impl Into<String>, data_type: DataType, producer: F) -> Self
    where
        F: Fn(Option<&Record>) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            data_type,
            value: FieldValue::Producer(Arc::new(producer)),
        }
    }

    /// The `deleted_at` bookkeeping field every configuration starts with.
    pub fn deleted_at() -> Self {
        Self::now("deleted_at")
    }

    /// Datetime field stamped with the time it is evaluated.
    pub fn now(name: impl Into<String>) -> Self {
        Self::computed(name, DataType::Datetime, |_| Value::now())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.value, FieldValue::Producer(_))
    }

    /// Resolves the value, invoking the producer with `source` when there is one.
    pub fn value(&self, source: Option<&Record>) -> Value {
        match &self.value {
            FieldValue::Constant(value) => value.clone(),
            FieldValue::Producer(producer) => producer(source),
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("FieldDescriptor");
        out.field("name", &self.name).field("data_type", &self.data_type);
        match &self.value {
            FieldValue::Constant(value) => out.field("constant", value),
            FieldValue::Producer(_) => out.field("producer", &"<fn>"),
        };
        out.finish()
    }
}

impl PartialEq for FieldDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for FieldDescriptor {}

impl PartialOrd for FieldDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;
    use std::sync::Mutex;

    #[test]
    fn test_requires_value_or_producer() {
        let err = FieldDescriptor::new("foo", DataType::String, None, None).unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
    }

    #[test]
    fn test_constant_value() {
        let field = FieldDescriptor::new("foo", DataType::String, Some("bar".into()), None).unwrap();
        assert_eq!(field.value(None), Value::from("bar"));
        assert!(!field.is_computed());
    }

    #[test]
    fn test_producer_wins_over_constant() {
        let producer: FieldProducer = Arc::new(|_: Option<&Record>| Value::Integer(2));
        let field =
            FieldDescriptor::new("foo", DataType::Integer, Some(Value::Integer(1)), Some(producer)).unwrap();
        assert_eq!(field.value(None), Value::Integer(2));
    }

    #[test]
    fn test_producer_receives_source() {
        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let field = FieldDescriptor::computed("copy", DataType::String, move |source| {
            let name = source.and_then(|record| record.get("name").cloned());
            *captured.lock().unwrap() = name.clone();
            name.unwrap_or(Value::Null)
        });

        let posts = Arc::new(EntityType::new("Post", "posts"));
        let record = Record::from_trusted_fields(posts, [("name".to_string(), Value::from("Foo"))]);

        assert_eq!(field.value(Some(&record)), Value::from("Foo"));
        assert_eq!(*seen.lock().unwrap(), Some(Value::from("Foo")));
        assert_eq!(field.value(None), Value::Null);
    }

    #[test]
    fn test_ordering_by_name() {
        let mut fields = vec![
            FieldDescriptor::constant("deleted_by_id", DataType::Integer, 1i64),
            FieldDescriptor::deleted_at(),
            FieldDescriptor::constant("archived_reason", DataType::String, "gc"),
        ];
        fields.sort();
        let names: Vec<&str> = fields.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["archived_reason", "deleted_at", "deleted_by_id"]);
    }
}
