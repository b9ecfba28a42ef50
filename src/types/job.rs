//! Job Model
//!
//! Lifecycle records for background analyses. A record is created on upload
//! in `processing`, mutated only by the worker owning the job, and ends in
//! exactly one terminal state: `completed` (data set) or `failed` (error
//! set).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::types::report::AnalysisResult;

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One background analysis, owned by the job registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub analysis_id: Uuid,
    pub status: JobStatus,
    /// In [0, 100], monotonically non-decreasing
    pub progress: u8,
    pub filename: String,
    pub file_path: PathBuf,
    pub data: Option<AnalysisResult>,
    pub error: Option<String>,
}

impl JobRecord {
    pub fn new(analysis_id: Uuid, filename: impl Into<String>, file_path: PathBuf) -> Self {
        Self {
            analysis_id,
            status: JobStatus::Processing,
            progress: 0,
            filename: filename.into(),
            file_path,
            data: None,
            error: None,
        }
    }
}

/// Result view of a job: pending, completed with data, or failed with error
#[derive(Debug, Clone)]
pub enum JobOutcome {
    /// Still processing
    Pending,
    Completed(Box<AnalysisResult>),
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminality() {
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_wire_form() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Processing).expect("serialize"),
            "\"processing\""
        );
    }

    #[test]
    fn test_new_record_starts_processing() {
        let record = JobRecord::new(Uuid::new_v4(), "contract.pdf", PathBuf::from("/tmp/x.pdf"));
        assert_eq!(record.status, JobStatus::Processing);
        assert_eq!(record.progress, 0);
        assert!(record.data.is_none());
        assert!(record.error.is_none());
    }
}
