use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Multipart payloads
// ---------------------------------------------------------------------------

/// Response to `POST /api/write/items/{key}?uploads`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateMultipartResponse {
    pub upload_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// One entry of the completion body (`[{partNumber, etag}, ...]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}
