//! Core Types
//!
//! Domain records for the analysis pipeline plus the unified error type.

pub mod analysis;
pub mod document;
pub mod error;
pub mod job;
pub mod report;

pub use analysis::{
    ArbiterVerdict, CategoryDetection, ExtractedParameters, OptimistAnalysis, PessimistAnalysis,
    RiskAnalysis, RiskLevel, Zone,
};
pub use document::{Definition, DocumentMetadata, ProcessedDocument, SemanticChunk};
pub use error::{ClauseError, ErrorCategory, ErrorClassifier, LlmError, Result};
pub use job::{JobOutcome, JobRecord, JobStatus};
pub use report::{
    AnalysisResult, CompoundRisk, CompoundRiskEntry, CompoundRiskList, DocumentSummary,
    GeneratedFix, RiskSummary, RiskyClause, Severity,
};
