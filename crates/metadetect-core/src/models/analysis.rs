use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle of an analysis. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "report_status", rename_all = "UPPERCASE")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisStatus {
    Pending,
    Done,
    Failed,
}

impl AnalysisStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AnalysisStatus::Pending)
    }
}

impl Display for AnalysisStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AnalysisStatus::Pending => write!(f, "PENDING"),
            AnalysisStatus::Done => write!(f, "DONE"),
            AnalysisStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for AnalysisStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(AnalysisStatus::Pending),
            "DONE" => Ok(AnalysisStatus::Done),
            "FAILED" => Ok(AnalysisStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid analysis status: {}", s)),
        }
    }
}

/// One provenance analysis attempt for an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub image_id: Uuid,
    pub status: AnalysisStatus,
    pub confidence: Option<f64>,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    /// A fresh PENDING record with a newly generated id.
    pub fn pending(image_id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            image_id,
            status: AnalysisStatus::Pending,
            confidence: None,
            details: None,
            created_at,
        }
    }

    /// Applies a terminal state. Returns `false` and leaves the record
    /// untouched if it is already terminal.
    pub fn complete(&mut self, completion: &AnalysisCompletion) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = completion.status;
        self.confidence = completion.confidence;
        self.details = Some(completion.details.clone());
        true
    }
}

/// Terminal state written exactly once to a PENDING record.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisCompletion {
    pub status: AnalysisStatus,
    pub confidence: Option<f64>,
    pub details: String,
}

impl AnalysisCompletion {
    pub fn done(manifest: String) -> Self {
        Self {
            status: AnalysisStatus::Done,
            confidence: None,
            details: manifest,
        }
    }

    pub fn failed(error_json: String) -> Self {
        Self {
            status: AnalysisStatus::Failed,
            confidence: None,
            details: error_json,
        }
    }
}
