//! Queue message envelope
//!
//! Every message on the queue carries exactly one parsed row together with the
//! environment tag of the bucket it came from:
//!
//! ```json
//! {"data":{"id":"1","name":"Ada"},"env":"dev"}
//! ```
//!
//! Column order inside `data` follows the header of the source file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

/// One parsed line of an uploaded file, keyed by header column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a column value, keeping first-insertion order
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), Value::String(value.into()));
    }

    /// Get a column as text
    ///
    /// Producers only ever write strings, but bodies written by other tools may
    /// carry numbers; those are rendered with their JSON text.
    pub fn get(&self, column: &str) -> Option<String> {
        match self.0.get(column)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

/// Body of a queue message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub data: Row,
    pub env: String,
}

impl Envelope {
    pub fn new(data: Row, env: impl Into<String>) -> Self {
        Self {
            data,
            env: env.into(),
        }
    }

    /// Serialize into the text body sent to the queue
    pub fn to_body(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a message body received from the queue
    pub fn from_body(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}
