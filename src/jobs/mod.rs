//! Background Job Lifecycle
//!
//! In-memory registry of long-running analyses. A record is created on
//! upload in `processing`; the spawned worker owns all further mutation:
//! progress moves monotonically (10 at start, 100 at success) and exactly
//! one terminal transition lands (`completed` with data, or `failed` with
//! an error string). For multi-process deployment the registry would be
//! replaced by an external KV keyed by the same UUID; the create / update
//! progress / terminal-transition contract is unchanged.

use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::pipeline::ContractAnalyzer;
use crate::types::{AnalysisResult, JobOutcome, JobRecord, JobStatus};

/// Shared registry handle
pub type SharedJobRegistry = Arc<JobRegistry>;

/// In-memory analysis job registry; the only shared mutable structure
/// across workers
#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<Uuid, JobRecord>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a job in `processing` and return its id
    pub fn create(&self, filename: impl Into<String>, file_path: PathBuf) -> Uuid {
        let analysis_id = Uuid::new_v4();
        self.create_with_id(analysis_id, filename, file_path);
        analysis_id
    }

    /// Create a job under a caller-chosen id (uploads are stored on disk
    /// keyed by the same id)
    pub fn create_with_id(
        &self,
        analysis_id: Uuid,
        filename: impl Into<String>,
        file_path: PathBuf,
    ) {
        self.jobs
            .insert(analysis_id, JobRecord::new(analysis_id, filename, file_path));
    }

    /// Raise the job's progress; regressions and terminal jobs are ignored
    pub fn update_progress(&self, analysis_id: Uuid, progress: u8) {
        if let Some(mut record) = self.jobs.get_mut(&analysis_id)
            && !record.status.is_terminal()
            && progress > record.progress
        {
            record.progress = progress.min(100);
        }
    }

    /// Terminal transition to `completed`; ignored if already terminal
    pub fn complete(&self, analysis_id: Uuid, data: AnalysisResult) {
        if let Some(mut record) = self.jobs.get_mut(&analysis_id)
            && !record.status.is_terminal()
        {
            record.status = JobStatus::Completed;
            record.progress = 100;
            record.data = Some(data);
        }
    }

    /// Terminal transition to `failed`; ignored if already terminal
    pub fn fail(&self, analysis_id: Uuid, error: impl Into<String>) {
        if let Some(mut record) = self.jobs.get_mut(&analysis_id)
            && !record.status.is_terminal()
        {
            record.status = JobStatus::Failed;
            record.error = Some(error.into());
        }
    }

    /// Snapshot of one job record
    pub fn get(&self, analysis_id: Uuid) -> Option<JobRecord> {
        self.jobs.get(&analysis_id).map(|record| record.clone())
    }

    /// Result view: pending while processing, data when completed, error
    /// when failed
    pub fn result(&self, analysis_id: Uuid) -> Option<JobOutcome> {
        self.jobs.get(&analysis_id).map(|record| match record.status {
            JobStatus::Processing => JobOutcome::Pending,
            JobStatus::Completed => record
                .data
                .clone()
                .map(Box::new)
                .map(JobOutcome::Completed)
                .unwrap_or(JobOutcome::Pending),
            JobStatus::Failed => JobOutcome::Failed(
                record
                    .error
                    .clone()
                    .unwrap_or_else(|| "Analysis failed".to_string()),
            ),
        })
    }
}

/// Enqueue an analysis: create the job, spawn the owning worker, return
/// the id immediately
pub fn spawn_analysis(
    registry: SharedJobRegistry,
    analyzer: Arc<ContractAnalyzer>,
    file_path: PathBuf,
    filename: impl Into<String>,
) -> Uuid {
    let analysis_id = registry.create(filename, file_path.clone());
    spawn_worker(registry, analyzer, analysis_id, file_path);
    analysis_id
}

/// Upload entry point: store the file under the analysis id, create the
/// job, spawn the owning worker
pub fn submit_upload(
    registry: SharedJobRegistry,
    analyzer: Arc<ContractAnalyzer>,
    upload_dir: &std::path::Path,
    source: &std::path::Path,
    filename: impl Into<String>,
) -> crate::types::Result<Uuid> {
    let analysis_id = Uuid::new_v4();

    std::fs::create_dir_all(upload_dir)?;
    let staged = upload_dir.join(format!("{analysis_id}.pdf"));
    std::fs::copy(source, &staged)?;

    registry.create_with_id(analysis_id, filename, staged.clone());
    spawn_worker(registry, analyzer, analysis_id, staged);
    Ok(analysis_id)
}

/// The worker owning all mutation of one job record
fn spawn_worker(
    registry: SharedJobRegistry,
    analyzer: Arc<ContractAnalyzer>,
    analysis_id: Uuid,
    file_path: PathBuf,
) {
    tokio::spawn(async move {
        info!("Starting analysis: {analysis_id}");
        registry.update_progress(analysis_id, 10);

        match analyzer.analyze_contract(&file_path).await {
            Ok(result) => {
                registry.complete(analysis_id, result);
                info!("Analysis complete: {analysis_id}");
            }
            Err(e) => {
                error!("Analysis failed: {analysis_id} - {e}");
                registry.fail(analysis_id, e.to_string());
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnalysisResult, DocumentSummary, RiskLevel, RiskSummary};

    fn result() -> AnalysisResult {
        AnalysisResult {
            document: DocumentSummary {
                filename: "contract.pdf".to_string(),
                total_chunks: 3,
                risky_clauses_found: 0,
            },
            summary: RiskSummary {
                overall_risk: RiskLevel::Low,
                average_risk_score: 0.0,
                compound_risks_found: 0,
                categories_flagged: Vec::new(),
            },
            risky_clauses: Vec::new(),
            compound_risks: Vec::new(),
        }
    }

    #[test]
    fn test_lifecycle_to_completed() {
        let registry = JobRegistry::new();
        let id = registry.create("contract.pdf", PathBuf::from("/tmp/a.pdf"));

        assert!(matches!(registry.result(id), Some(JobOutcome::Pending)));

        registry.update_progress(id, 10);
        assert_eq!(registry.get(id).expect("record").progress, 10);

        registry.complete(id, result());
        let record = registry.get(id).expect("record");
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.progress, 100);
        assert!(matches!(
            registry.result(id),
            Some(JobOutcome::Completed(_))
        ));
    }

    #[test]
    fn test_lifecycle_to_failed() {
        let registry = JobRegistry::new();
        let id = registry.create("contract.pdf", PathBuf::from("/tmp/a.pdf"));

        registry.fail(id, "Insufficient credits: budget exhausted");
        match registry.result(id) {
            Some(JobOutcome::Failed(message)) => {
                assert!(message.contains("Insufficient credits"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        // No partial result on failure
        assert!(registry.get(id).expect("record").data.is_none());
    }

    #[test]
    fn test_progress_is_monotonic() {
        let registry = JobRegistry::new();
        let id = registry.create("contract.pdf", PathBuf::from("/tmp/a.pdf"));

        registry.update_progress(id, 50);
        registry.update_progress(id, 10);
        assert_eq!(registry.get(id).expect("record").progress, 50);
    }

    #[test]
    fn test_terminal_transition_is_single() {
        let registry = JobRegistry::new();
        let id = registry.create("contract.pdf", PathBuf::from("/tmp/a.pdf"));

        registry.complete(id, result());
        registry.fail(id, "late error");

        let record = registry.get(id).expect("record");
        assert_eq!(record.status, JobStatus::Completed);
        assert!(record.error.is_none());

        registry.update_progress(id, 99);
        assert_eq!(registry.get(id).expect("record").progress, 100);
    }

    #[test]
    fn test_unknown_job() {
        let registry = JobRegistry::new();
        assert!(registry.get(Uuid::new_v4()).is_none());
        assert!(registry.result(Uuid::new_v4()).is_none());
    }
}
