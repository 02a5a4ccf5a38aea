use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::NodeError;

/// A binary attachment carried alongside an item's JSON payload.
///
/// The payload is stored base64-encoded, the way the host platform moves
/// binary buffers between nodes.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BinaryData {
    pub data: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
}

impl BinaryData {
    /// Encode raw bytes into a new attachment.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        BinaryData {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: mime_type.into(),
            file_name: None,
            file_extension: None,
        }
    }

    /// Decode the payload back into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, NodeError> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| NodeError::SerializationError(format!("Invalid base64 payload: {}", e)))
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = Some(extension.into());
        self
    }
}
