//! Wire types for the export API
//!
//! Field names are snake_case to match the animator clients already in use.

use crate::artifact::ArtifactId;
use crate::error::Result;
use crate::sequence::{validate_keyframes, Keyframe, DEFAULT_SEQUENCE_NAME};
use serde::{Deserialize, Serialize};

/// Request body for `/export`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Display name of the sequence
    #[serde(default, alias = "sequence_name", alias = "sequenceName")]
    pub animation_name: String,
    /// Originating rig type; stored with the artifact, does not affect encoding
    #[serde(default, alias = "rigType")]
    pub rig_type: Option<String>,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

impl ExportRequest {
    /// Name used for the document and the file name
    pub fn display_name(&self) -> &str {
        let name = self.animation_name.trim();
        if name.is_empty() {
            DEFAULT_SEQUENCE_NAME
        } else {
            name
        }
    }

    /// Reject empty or malformed keyframe payloads
    pub fn validate(&self) -> Result<()> {
        validate_keyframes(&self.keyframes)
    }
}

/// Request body for `/publish`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishRequest {
    #[serde(flatten)]
    pub export: ExportRequest,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<u64>,
    #[serde(default)]
    pub for_sale: bool,
}

/// Response body for a successful `/export`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReceipt {
    pub success: bool,
    pub file_id: ArtifactId,
    pub download_url: String,
    pub file_name: String,
}

/// Response body for `/publish`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketplace_url: Option<String>,
    pub message: String,
}

/// API error envelope
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: ApiErrorDetail,
}

/// API error detail
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ApiErrorDetail {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}
