// Record trait shared by every stored entity

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// Fields managed by the store; a patch never overwrites them
pub const MANAGED_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// Core trait that any storable record must implement
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection this record type lives in (e.g., "tasks", "notes")
    fn collection_name() -> &'static str
    where
        Self: Sized;

    /// Key every record of a singleton collection must use
    fn fixed_id() -> Option<&'static str>
    where
        Self: Sized,
    {
        None
    }

    /// Unique identifier for this record; empty until the store assigns one
    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn created_at(&self) -> Option<DateTime<Utc>>;

    fn updated_at(&self) -> Option<DateTime<Utc>>;

    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>);
}

/// Value types that can be indexed for filtering
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    String(String),
    Int(i64),
    Bool(bool),
}

impl IndexValue {
    /// Convert a JSON field into an indexable value
    ///
    /// Nulls, arrays, objects and non-integral numbers are not indexed.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(IndexValue::String(s.clone())),
            Value::Bool(b) => Some(IndexValue::Bool(*b)),
            Value::Number(n) => n.as_i64().map(IndexValue::Int),
            _ => None,
        }
    }
}

impl From<&str> for IndexValue {
    fn from(value: &str) -> Self {
        IndexValue::String(value.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(value: String) -> Self {
        IndexValue::String(value)
    }
}

impl From<i64> for IndexValue {
    fn from(value: i64) -> Self {
        IndexValue::Int(value)
    }
}

impl From<bool> for IndexValue {
    fn from(value: bool) -> Self {
        IndexValue::Bool(value)
    }
}

impl std::fmt::Display for IndexValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexValue::String(s) => write!(f, "{}", s),
            IndexValue::Int(i) => write!(f, "{}", i),
            IndexValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Partial update merged onto the stored record
///
/// Keys are the persisted (camelCase) field names. Top-level keys replace the
/// stored value; a JSON null clears an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    fields: Map<String, Value>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a patch from a JSON object
    pub fn from_value(value: Value) -> StoreResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(StoreError::InvalidRecord(format!(
                "patch must be a JSON object, got {}",
                other
            ))),
        }
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Set a field from any serializable value (enums, nested structs)
    pub fn set_serialized<V: Serialize>(mut self, field: &str, value: &V) -> StoreResult<Self> {
        self.fields.insert(field.to_string(), serde_json::to_value(value)?);
        Ok(self)
    }

    pub fn clear(self, field: &str) -> Self {
        self.set(field, Value::Null)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Merge onto a stored document, skipping store-managed fields
    pub(crate) fn apply_to(&self, target: &mut Value) -> StoreResult<()> {
        let object = target
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidRecord("stored record is not a JSON object".to_string()))?;

        for (key, value) in &self.fields {
            if MANAGED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            object.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_index_value_from_json() {
        assert_eq!(IndexValue::from_json(&json!("todo")), Some(IndexValue::from("todo")));
        assert_eq!(IndexValue::from_json(&json!(3)), Some(IndexValue::Int(3)));
        assert_eq!(IndexValue::from_json(&json!(true)), Some(IndexValue::Bool(true)));
        assert_eq!(IndexValue::from_json(&json!(null)), None);
        assert_eq!(IndexValue::from_json(&json!(1.5)), None);
        assert_eq!(IndexValue::from_json(&json!(["a"])), None);
    }

    #[test]
    fn test_index_value_display() {
        assert_eq!(IndexValue::String("test".to_string()).to_string(), "test");
        assert_eq!(IndexValue::Int(42).to_string(), "42");
        assert_eq!(IndexValue::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_patch_apply_skips_managed_fields() {
        let mut stored = json!({
            "id": "t1",
            "title": "Old",
            "createdAt": "2024-01-01T00:00:00Z",
            "dueDate": "2024-02-01T00:00:00Z"
        });
        let patch = Patch::new()
            .set("title", "New")
            .set("id", "hijack")
            .set("createdAt", "1999-01-01T00:00:00Z")
            .clear("dueDate");

        patch.apply_to(&mut stored).unwrap();

        assert_eq!(stored["id"], "t1");
        assert_eq!(stored["title"], "New");
        assert_eq!(stored["createdAt"], "2024-01-01T00:00:00Z");
        assert!(stored["dueDate"].is_null());
    }

    #[test]
    fn test_patch_from_value_requires_object() {
        assert!(Patch::from_value(json!({"status": "done"})).is_ok());
        assert!(Patch::from_value(json!(["status"])).is_err());
    }

    #[test]
    fn test_patch_fields() {
        let patch = Patch::new().set("status", "done");
        assert!(!patch.is_empty());
        assert_eq!(patch.fields().collect::<Vec<_>>(), vec!["status"]);
        assert!(Patch::new().is_empty());
    }
}
