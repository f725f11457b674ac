//! Reconciliation options
use crate::errors::MorphError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_KEY_ATTRIBUTE: &str = "data-unique-key";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MorphOptions {
    /// Attribute whose value identifies an element among its keyed siblings.
    pub key_attribute: String,
    /// Restore the selection range of a focused control after its value is rewritten.
    pub preserve_selection: bool,
}

impl Default for MorphOptions {
    fn default() -> Self {
        MorphOptions {
            key_attribute: DEFAULT_KEY_ATTRIBUTE.to_string(),
            preserve_selection: true,
        }
    }
}

impl MorphOptions {
    /// Parses options from a JSON object; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, MorphError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_key_attribute(mut self, name: &str) -> Self {
        self.key_attribute = name.to_string();
        self
    }
}
