use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::NodeError;
use crate::item::binary::BinaryData;
use crate::item::field_path;

/// A single record flowing through a node.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Item {
    #[serde(default)]
    pub json: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<HashMap<String, BinaryData>>,
    #[serde(
        default,
        rename = "pairedItem",
        skip_serializing_if = "Option::is_none"
    )]
    pub paired_item: Option<PairedItem>,
}

/// Provenance metadata linking an output record back to its originating
/// input index or indices.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PairedItem {
    /// Index into the node's main input.
    Index(usize),
    /// Index into a specific input connection (for multi-input nodes).
    Sourced { item: usize, input: usize },
    /// An output record produced from several input records.
    Many(Vec<PairedItem>),
}

impl Item {
    pub fn new(json: Value) -> Self {
        Item {
            json,
            binary: None,
            paired_item: None,
        }
    }

    pub fn from_object(object: Map<String, Value>) -> Self {
        Item::new(Value::Object(object))
    }

    pub fn with_paired(mut self, paired: PairedItem) -> Self {
        self.paired_item = Some(paired);
        self
    }

    pub fn with_binary(mut self, key: impl Into<String>, data: BinaryData) -> Self {
        self.binary
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), data);
        self
    }

    /// Build the error-flagged item emitted under the host's
    /// continue-on-fail policy.
    pub fn from_error(error: &NodeError, paired: Option<PairedItem>) -> Self {
        Item {
            json: serde_json::json!({ "error": error.to_string() }),
            binary: None,
            paired_item: paired,
        }
    }

    /// Resolve a field on this item's JSON payload.
    ///
    /// With `dot_notation` the path is split on `.` and walked through
    /// nested objects (and array indices); without it the path is treated
    /// as one literal key.
    pub fn field(&self, path: &str, dot_notation: bool) -> Option<&Value> {
        field_path::get_path(&self.json, path, dot_notation)
    }
}

impl Default for Item {
    fn default() -> Self {
        Item::new(Value::Object(Map::new()))
    }
}
