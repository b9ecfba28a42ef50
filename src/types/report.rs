//! Report Model
//!
//! Records produced by Stages 4 and 5 and the top-level analysis result.
//! Field names in `AnalysisResult` and its children are the stable wire
//! contract consumed by any surrounding HTTP layer.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::ai::schema::StructuredOutput;
use crate::types::analysis::RiskLevel;

// =============================================================================
// Generated Fix (Stage 4)
// =============================================================================

/// A model-drafted replacement clause
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedFix {
    /// Complete safe clause text
    pub suggested_replacement: String,
    /// Explanation of changes (at most 50 words)
    pub edit_comment: String,
    /// 2-3 specific improvements
    #[serde(default)]
    pub key_changes: Vec<String>,
    /// Up to 2 truncated exemplar snippets
    #[serde(default)]
    pub precedent_citations: Vec<String>,
}

impl StructuredOutput for GeneratedFix {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "suggested_replacement": {"type": "string"},
                "edit_comment": {"type": "string"},
                "key_changes": {"type": "array"},
                "precedent_citations": {"type": "array"}
            },
            "required": ["suggested_replacement", "edit_comment"]
        })
    }
}

// =============================================================================
// Compound Risk (Stage 5)
// =============================================================================

/// Compound risk severity, derived from the combined score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Mapping from combined score: >=85 Critical, >=70 High, >=50 Medium
    pub fn from_combined_score(score: u32) -> Self {
        if score >= 85 {
            Self::Critical
        } else if score >= 70 {
            Self::High
        } else if score >= 50 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// A systemic vulnerability emerging from co-occurring flagged clauses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompoundRisk {
    pub risk_type: String,
    pub severity: Severity,
    pub description: String,
    /// Non-empty subset of flagged chunk ids
    pub affected_clause_ids: Vec<String>,
    pub mitigation_advice: String,
    /// In [0, 100]
    pub combined_risk_score: u32,
}

/// Wrapper schema for the synthesis-pass structured call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompoundRiskList {
    #[serde(default)]
    pub risks: Vec<CompoundRisk>,
}

impl StructuredOutput for CompoundRiskList {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "risks": {"type": "array"}
            },
            "required": ["risks"]
        })
    }
}

// =============================================================================
// Analysis Result (wire contract)
// =============================================================================

/// Document block of the result record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub filename: String,
    pub total_chunks: usize,
    pub risky_clauses_found: usize,
}

/// Summary block of the result record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSummary {
    pub overall_risk: RiskLevel,
    /// Rounded to one decimal; 0 when nothing was flagged
    pub average_risk_score: f64,
    pub compound_risks_found: usize,
    /// Sorted subset of the target categories
    pub categories_flagged: Vec<String>,
}

/// One flagged clause with its verdict and suggested fix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskyClause {
    pub chunk_id: String,
    pub category: String,
    pub original_text: String,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub pessimist_analysis: String,
    pub optimist_analysis: String,
    pub arbiter_reasoning: String,
    pub suggested_fix: String,
    pub fix_comment: String,
    #[serde(default)]
    pub key_changes: Vec<String>,
}

/// Compound-risk entry in the result record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompoundRiskEntry {
    pub risk_type: String,
    pub severity: Severity,
    pub description: String,
    pub affected_clauses: Vec<String>,
    pub mitigation: String,
    pub risk_score: u32,
}

impl From<&CompoundRisk> for CompoundRiskEntry {
    fn from(risk: &CompoundRisk) -> Self {
        Self {
            risk_type: risk.risk_type.clone(),
            severity: risk.severity,
            description: risk.description.clone(),
            affected_clauses: risk.affected_clause_ids.clone(),
            mitigation: risk.mitigation_advice.clone(),
            risk_score: risk.combined_risk_score,
        }
    }
}

/// The top-level analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub document: DocumentSummary,
    pub summary: RiskSummary,
    pub risky_clauses: Vec<RiskyClause>,
    pub compound_risks: Vec<CompoundRiskEntry>,
}
