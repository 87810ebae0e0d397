//! Response shapes returned by the analysis operations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AnalysisStatus;
use crate::constants::COMPARE_PLACEHOLDER_NOTE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeStartResponse {
    pub analysis_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatusResponse {
    pub analysis_id: Uuid,
    pub status: AnalysisStatus,
    /// Always `None` until a scoring stage exists.
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisManifestResponse {
    pub analysis_id: Uuid,
    /// Raw manifest text exactly as produced by the extractor.
    pub manifest_json: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeCompareResponse {
    pub status: AnalysisStatus,
    pub similarity: Option<f64>,
    pub note: String,
}

impl AnalyzeCompareResponse {
    /// The fixed result returned while no comparison logic exists.
    pub fn placeholder() -> Self {
        Self {
            status: AnalysisStatus::Pending,
            similarity: None,
            note: COMPARE_PLACEHOLDER_NOTE.to_string(),
        }
    }
}
