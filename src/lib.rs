//! clauseguard - Contract Risk Analysis Pipeline
//!
//! Ingests legal contracts (PDF), flags clauses in a closed set of
//! high-risk categories, scores each flagged clause through adversarial
//! three-agent adjudication, drafts a safer replacement, and detects
//! compound risks arising from co-occurring flaws. Outputs are advisory;
//! nothing here constitutes legal advice.
//!
//! ## Pipeline
//!
//! - **S1 Document Processor**: hybrid PDF extraction with OCR fallback,
//!   metadata and definition extraction, semantic chunking
//! - **S2 Category Detector**: three-zone retrieval classification
//!   (noise / courtroom / safe)
//! - **S3 Adversarial Analyzer**: Pessimist / Optimist / Arbiter
//!   structured-output debate with parameter extraction
//! - **S4 Fix Generator**: retrieval-guided safe-clause drafting
//! - **S5 Compound Detector**: rule-based plus model-synthesized compound
//!   risks
//!
//! ## Crosscutting
//!
//! - [`ai`]: resilient model client (multi-model primary attempts,
//!   cross-provider fallback, token budget enforcement, structured output)
//! - [`rag`]: sentence embeddings and the prototype/exemplar store
//! - [`jobs`]: background job lifecycle for long-running analyses
//! - [`config`]: figment-merged configuration

pub mod ai;
pub mod config;
pub mod constants;
pub mod jobs;
pub mod pipeline;
pub mod rag;
pub mod text;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{ClauseError, ErrorCategory, Result};

// Pipeline
pub use pipeline::{ContractAnalyzer, DocumentProcessor};

// Results
pub use types::{AnalysisResult, JobOutcome, JobRecord, JobStatus, RiskLevel};

// =============================================================================
// Service Re-exports
// =============================================================================

pub use ai::{ModelClient, ModelType, SharedModelClient, Tracer};
pub use jobs::{JobRegistry, SharedJobRegistry, spawn_analysis, submit_upload};
pub use rag::{Embedder, SharedVectorStore, VectorStore, shared_embedder};
