//! Compound Risk Detector (Stage 5)
//!
//! Systemic vulnerabilities from co-occurring flagged clauses, in three
//! passes whose order the output preserves:
//!
//! 1. **Pattern pass**: fixed catalog of dangerous category co-occurrences.
//! 2. **Severity escalation**: two or more high-scoring clauses in the
//!    same category.
//! 3. **Synthesis pass**: one structured model call for non-obvious
//!    combinations (0-2 risks); failures count as empty.
//!
//! Deduplication keys on (risk_type, sorted affected ids); the first
//! occurrence wins.

use std::collections::{BTreeMap, HashSet};
use tracing::{info, instrument, warn};

use crate::ai::SharedModelClient;
use crate::ai::provider::{ChatMessage, ModelType};
use crate::constants::compound as compound_constants;
use crate::pipeline::prompts;
use crate::text::take_chars;
use crate::types::{CompoundRisk, CompoundRiskList, Result, RiskAnalysis, Severity};

/// Rule-based plus model-synthesized compound detection
pub struct CompoundRiskDetector {
    llm: SharedModelClient,
}

impl CompoundRiskDetector {
    pub fn new(llm: SharedModelClient) -> Self {
        Self { llm }
    }

    /// Detect compound risks over the relevant risk analyses. Fewer than
    /// two analyses cannot compound.
    #[instrument(skip_all, fields(analyses = risk_analyses.len()))]
    pub async fn detect(
        &self,
        risk_analyses: &[RiskAnalysis],
        _document_text: &str,
    ) -> Result<Vec<CompoundRisk>> {
        if risk_analyses.len() < 2 {
            info!("Only {} risky clause(s) - no compound risks possible", risk_analyses.len());
            return Ok(Vec::new());
        }

        info!("Checking {} clauses for compound risks", risk_analyses.len());

        let mut compound_risks = Vec::new();
        compound_risks.extend(detect_pattern_risks(risk_analyses));
        compound_risks.extend(detect_severity_escalation(risk_analyses));
        compound_risks.extend(self.synthesis_pass(risk_analyses).await?);

        let unique = deduplicate(compound_risks);
        info!("Found {} compound risks", unique.len());
        Ok(unique)
    }

    /// Model synthesis over summaries of the gated clauses; failure means
    /// no synthesized risks
    async fn synthesis_pass(&self, analyses: &[RiskAnalysis]) -> Result<Vec<CompoundRisk>> {
        let summaries: Vec<String> = analyses
            .iter()
            .enumerate()
            .filter(|(_, a)| {
                a.is_relevant && a.final_risk_score >= compound_constants::SYNTHESIS_MIN_SCORE
            })
            .map(|(index, a)| {
                let reasoning = a
                    .arbiter_verdict
                    .as_ref()
                    .map(|v| take_chars(&v.reasoning, 150))
                    .unwrap_or_else(|| "See analysis".to_string());
                format!(
                    "{}. [{}] Risk: {}/100\n   Issue: {reasoning}...",
                    index + 1,
                    a.category,
                    a.final_risk_score
                )
            })
            .collect();

        if summaries.len() < 2 {
            return Ok(Vec::new());
        }

        let messages = [
            ChatMessage::system(prompts::COMPOUND_SYSTEM_PROMPT),
            ChatMessage::user(prompts::compound_prompt(&summaries.join("\n"))),
        ];

        match self
            .llm
            .complete_structured::<CompoundRiskList>(&messages, ModelType::Smart, 0.2)
            .await
        {
            Ok(list) => Ok(list.risks),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Compound synthesis failed: {e}");
                Ok(Vec::new())
            }
        }
    }
}

/// Pattern pass over the fixed co-occurrence catalog
fn detect_pattern_risks(analyses: &[RiskAnalysis]) -> Vec<CompoundRisk> {
    let categories_present: HashSet<&str> = analyses
        .iter()
        .filter(|a| a.is_relevant)
        .map(|a| a.category.as_str())
        .collect();

    let mut risks = Vec::new();

    for pattern in compound_constants::DANGEROUS_PATTERNS {
        if !pattern
            .categories
            .iter()
            .all(|c| categories_present.contains(c))
        {
            continue;
        }

        let affected: Vec<&RiskAnalysis> = analyses
            .iter()
            .filter(|a| a.is_relevant && pattern.categories.contains(&a.category.as_str()))
            .collect();

        let combined_score = boost_score(
            mean_score(affected.iter().map(|a| a.final_risk_score)),
            compound_constants::PATTERN_SCORE_BOOST,
        );

        info!("Pattern detected: {}", pattern.risk_type);
        risks.push(CompoundRisk {
            risk_type: pattern.risk_type.to_string(),
            severity: Severity::from_combined_score(combined_score),
            description: format!(
                "{}. This creates a power imbalance where one party controls both contract \
                 duration and financial exposure.",
                pattern.description
            ),
            affected_clause_ids: affected.iter().map(|a| a.chunk_id.clone()).collect(),
            mitigation_advice: "Negotiate to make both clauses mutual and balanced. If one \
                                party can terminate unilaterally, ensure liability is capped \
                                and reasonable."
                .to_string(),
            combined_risk_score: combined_score,
        });
    }

    risks
}

/// Severity escalation: two or more clauses scoring >= 70 in one category
fn detect_severity_escalation(analyses: &[RiskAnalysis]) -> Vec<CompoundRisk> {
    let mut by_category: BTreeMap<&str, Vec<&RiskAnalysis>> = BTreeMap::new();
    for analysis in analyses {
        if analysis.is_relevant
            && analysis.final_risk_score >= compound_constants::ESCALATION_MIN_SCORE
        {
            by_category
                .entry(analysis.category.as_str())
                .or_default()
                .push(analysis);
        }
    }

    let mut risks = Vec::new();
    for (category, clauses) in by_category {
        if clauses.len() < 2 {
            continue;
        }

        let combined_score = boost_score(
            mean_score(clauses.iter().map(|c| c.final_risk_score)),
            compound_constants::ESCALATION_SCORE_BOOST,
        );

        info!("Severity escalation: {}x {category}", clauses.len());
        risks.push(CompoundRisk {
            risk_type: format!("Multiple {category} Risks"),
            severity: Severity::from_combined_score(combined_score),
            description: format!(
                "Contract contains {} separate high-risk {category} clauses, creating \
                 systemic vulnerability.",
                clauses.len()
            ),
            affected_clause_ids: clauses.iter().map(|c| c.chunk_id.clone()).collect(),
            mitigation_advice: format!(
                "Address all {category} clauses holistically to ensure consistent protections \
                 throughout the contract."
            ),
            combined_risk_score: combined_score,
        });
    }

    risks
}

/// First occurrence wins on (risk_type, sorted affected ids)
fn deduplicate(risks: Vec<CompoundRisk>) -> Vec<CompoundRisk> {
    let mut seen: HashSet<(String, Vec<String>)> = HashSet::new();
    risks
        .into_iter()
        .filter(|risk| {
            let mut ids = risk.affected_clause_ids.clone();
            ids.sort();
            seen.insert((risk.risk_type.clone(), ids))
        })
        .collect()
}

fn mean_score(scores: impl Iterator<Item = u32>) -> u32 {
    let collected: Vec<u32> = scores.collect();
    if collected.is_empty() {
        50
    } else {
        collected.iter().sum::<u32>() / collected.len() as u32
    }
}

fn boost_score(mean: u32, boost: u32) -> u32 {
    (mean + boost).min(100)
}
