//! Structured activity results.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ActivityError;

/// Keys owned by the result envelope; outputs may not use them.
const RESERVED_KEYS: [&str; 3] = ["activity", "date", "success"];

/// Named outputs of an activity run, in insertion order, with unique names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityOutputs(Map<String, Value>);

impl ActivityOutputs {
    /// No outputs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output.
    ///
    /// # Errors
    ///
    /// `DuplicateOutput` when `name` is already present or is one of the envelope
    /// keys, `OutputEncoding` when `value` cannot be represented as JSON.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Serialize) -> Result<(), ActivityError> {
        let name = name.into();
        if self.0.contains_key(&name) || RESERVED_KEYS.contains(&name.as_str()) {
            return Err(ActivityError::DuplicateOutput(name));
        }
        let value = serde_json::to_value(value).map_err(|e| ActivityError::OutputEncoding {
            name: name.clone(),
            message: e.to_string(),
        })?;
        self.0.insert(name, value);
        Ok(())
    }

    /// Builder form of [`ActivityOutputs::insert`].
    ///
    /// # Errors
    ///
    /// Same as [`ActivityOutputs::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Serialize) -> Result<Self, ActivityError> {
        self.insert(name, value)?;
        Ok(self)
    }

    /// Build from `(name, value)` pairs, rejecting duplicates.
    ///
    /// # Errors
    ///
    /// Same as [`ActivityOutputs::insert`].
    pub fn from_pairs<I, K>(pairs: I) -> Result<Self, ActivityError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut outputs = Self::new();
        for (name, value) in pairs {
            outputs.insert(name, value)?;
        }
        Ok(outputs)
    }

    /// Number of outputs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no outputs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Immutable record of one activity run.
///
/// Serialized as `{"activity": id, "date": ts, "success": bool, ...outputs}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityResult {
    #[serde(rename = "activity")]
    activity_id: String,
    date: DateTime<Utc>,
    success: bool,
    #[serde(flatten)]
    outputs: Map<String, Value>,
}

impl ActivityResult {
    /// Result carrying `outputs`.
    pub fn new(activity_id: impl Into<String>, date: DateTime<Utc>, success: bool, outputs: ActivityOutputs) -> Self {
        Self {
            activity_id: activity_id.into(),
            date,
            success,
            outputs: outputs.0,
        }
    }

    /// Failed run with no outputs.
    pub fn failure(activity_id: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self::new(activity_id, date, false, ActivityOutputs::new())
    }

    /// Activity that produced the result.
    pub fn activity_id(&self) -> &str {
        &self.activity_id
    }

    /// Execution timestamp.
    pub const fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Whether the run succeeded.
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// All outputs, in insertion order.
    pub const fn outputs(&self) -> &Map<String, Value> {
        &self.outputs
    }

    /// One output by name.
    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    /// Envelope as a JSON value.
    pub fn to_json(&self) -> Value {
        let mut object = Map::with_capacity(self.outputs.len() + 3);
        object.insert("activity".into(), Value::String(self.activity_id.clone()));
        object.insert("date".into(), Value::String(self.date.to_rfc3339_opts(SecondsFormat::AutoSi, true)));
        object.insert("success".into(), Value::Bool(self.success));
        for (name, value) in &self.outputs {
            object.insert(name.clone(), value.clone());
        }
        Value::Object(object)
    }
}
