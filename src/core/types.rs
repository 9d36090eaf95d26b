use crate::core::{Result, Value, WriteError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// System-assigned identifier of a persisted record.
///
/// Only valid once the backend has reported a successful insert; the
/// coordinator never fabricates these.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-supplied scalar fields for one record, keyed by column name.
///
/// # Examples
///
/// ```
/// use aggwrite::Payload;
///
/// let parent = Payload::new()
///     .set("title", "Pasta")
///     .set("category", "dinner");
///
/// assert_eq!(parent.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload {
    fields: HashMap<String, Value>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value for the same column.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Build a payload from a JSON object of scalar fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use aggwrite::Payload;
    ///
    /// let payload = Payload::from_json(&serde_json::json!({
    ///     "name": "Pasta",
    ///     "qty": "400g",
    /// }))
    /// .unwrap();
    ///
    /// assert_eq!(payload.get("qty").unwrap().as_str(), Some("400g"));
    /// ```
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let object = json.as_object().ok_or_else(|| {
            WriteError::Validation("payload must be a JSON object".into())
        })?;

        let mut payload = Self::new();
        for (column, value) in object {
            payload = payload.set(column.clone(), Value::from_json(value)?);
        }
        Ok(payload)
    }
}
