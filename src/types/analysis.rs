//! Analysis Model
//!
//! Records produced by Stages 2 and 3: category detection with three-zone
//! triage, structural parameters, the three agent outputs, and the bound
//! risk verdict.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;

use crate::ai::schema::StructuredOutput;

// =============================================================================
// Category Detection (Stage 2)
// =============================================================================

/// Triage verdict for a chunk: ignore, adjudicate, or accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Noise,
    Courtroom,
    Safe,
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Noise => write!(f, "noise"),
            Self::Courtroom => write!(f, "courtroom"),
            Self::Safe => write!(f, "safe"),
        }
    }
}

/// Stage 2 output: category match, zone triage, and retrieved exemplars
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDetection {
    /// One of the target categories, or "Unknown" when the store is empty
    pub category: String,
    /// In [0, 1]
    pub confidence: f64,
    /// In [0, 1]
    pub similarity_to_prototype: f64,
    pub zone: Zone,
    pub needs_agent_review: bool,

    /// Populated only when `needs_agent_review`
    #[serde(default)]
    pub retrieved_safe_examples: Vec<String>,
    /// Populated only when `needs_agent_review`
    #[serde(default)]
    pub retrieved_risky_examples: Vec<String>,
    pub decision_reasoning: String,
}

impl CategoryDetection {
    /// Detection for a chunk with no prototype match (empty store)
    pub fn unknown() -> Self {
        Self {
            category: "Unknown".to_string(),
            confidence: 0.0,
            similarity_to_prototype: 0.0,
            zone: Zone::Noise,
            needs_agent_review: false,
            retrieved_safe_examples: Vec::new(),
            retrieved_risky_examples: Vec::new(),
            decision_reasoning: "No category match".to_string(),
        }
    }
}

// =============================================================================
// Structural Parameters
// =============================================================================

/// Deterministic regex-extracted structural features of a clause
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedParameters {
    pub days_mentioned: Option<u32>,
    pub months_mentioned: Option<u32>,
    pub years_mentioned: Option<u32>,
    /// Monetary literals as written, currency symbol included
    #[serde(default)]
    pub amounts_mentioned: Vec<String>,

    pub has_written_notice: bool,
    pub is_mutual: bool,
    pub requires_cause: bool,
    pub has_cap: bool,
    pub has_cure_period: bool,

    /// Named lowercase substring hits
    #[serde(default)]
    pub raw_text_markers: HashMap<String, bool>,
}

// =============================================================================
// Agent Outputs (Stage 3)
// =============================================================================

/// Pessimist (red team) output: relevance gate plus worst-case analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PessimistAnalysis {
    /// Is the clause's primary topic the target category?
    pub is_relevant: bool,
    pub relevance_reasoning: String,
    pub risk_argument: String,
    #[serde(default)]
    pub key_concerns: Vec<String>,
}

impl StructuredOutput for PessimistAnalysis {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "is_relevant": {"type": "boolean"},
                "relevance_reasoning": {"type": "string"},
                "risk_argument": {"type": "string"},
                "key_concerns": {"type": "array"}
            },
            "required": ["is_relevant", "relevance_reasoning", "risk_argument"]
        })
    }
}

/// Optimist (blue team) output: the defense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimistAnalysis {
    pub defense_argument: String,
    pub industry_context: String,
    #[serde(default)]
    pub mitigating_factors: Vec<String>,
}

impl StructuredOutput for OptimistAnalysis {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "defense_argument": {"type": "string"},
                "industry_context": {"type": "string"},
                "mitigating_factors": {"type": "array"}
            },
            "required": ["defense_argument", "industry_context"]
        })
    }
}

/// Arbiter (judge) output: the scored verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbiterVerdict {
    /// 0 = safe, 100 = critical
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub reasoning: String,
    #[serde(default)]
    pub key_factors: Vec<String>,
}

impl StructuredOutput for ArbiterVerdict {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "risk_score": {"type": "integer"},
                "risk_level": {"type": "string"},
                "reasoning": {"type": "string"},
                "key_factors": {"type": "array"}
            },
            "required": ["risk_score", "risk_level", "reasoning"]
        })
    }
}

// =============================================================================
// Risk Level
// =============================================================================

/// Canonical risk bucketing of a 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Canonical mapping: [0,25] Low, [26,50] Medium, [51,75] High,
    /// [76,100] Critical
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=25 => Self::Low,
            26..=50 => Self::Medium,
            51..=75 => Self::High,
            _ => Self::Critical,
        }
    }

    /// Overall document risk mapping over the average flagged score
    pub fn from_average(avg: f64) -> Self {
        if avg >= 75.0 {
            Self::Critical
        } else if avg >= 60.0 {
            Self::High
        } else if avg >= 40.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

// =============================================================================
// Risk Analysis (Stage 3 output)
// =============================================================================

/// The bound verdict for one chunk.
///
/// Invariants: `final_risk_level` is the canonical mapping of
/// `final_risk_score`; an irrelevant chunk carries score 0, level Low, and
/// no agent records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub chunk_id: String,
    pub category: String,

    pub is_relevant: bool,

    pub pessimist_analysis: Option<PessimistAnalysis>,
    pub optimist_analysis: Option<OptimistAnalysis>,
    pub arbiter_verdict: Option<ArbiterVerdict>,

    pub extracted_parameters: Option<ExtractedParameters>,

    #[serde(default)]
    pub safe_precedents_used: Vec<String>,
    #[serde(default)]
    pub risky_precedents_used: Vec<String>,

    pub final_risk_score: u32,
    pub final_risk_level: RiskLevel,
}

impl RiskAnalysis {
    /// Verdict for a chunk the Pessimist dismissed as off-topic
    pub fn irrelevant(chunk_id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            category: category.into(),
            is_relevant: false,
            pessimist_analysis: None,
            optimist_analysis: None,
            arbiter_verdict: None,
            extracted_parameters: None,
            safe_precedents_used: Vec::new(),
            risky_precedents_used: Vec::new(),
            final_risk_score: 0,
            final_risk_level: RiskLevel::Low,
        }
    }
}
