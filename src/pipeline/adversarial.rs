//! Adversarial Analyzer (Stage 3)
//!
//! Three-agent risk adjudication over a courtroom-zone chunk:
//!
//! 1. **Pessimist** (gatekeeper + red team): decides relevance first; an
//!    irrelevant chunk short-circuits with score 0 and no agent records.
//! 2. **Optimist** (blue team): defends the clause against the pessimist's
//!    argument.
//! 3. **Arbiter** (judge): weighs both and assigns the score. The risk
//!    level is always recomputed from the score with the canonical
//!    mapping, overriding whatever level the model returned.
//!
//! Each agent degrades to a generic record on failure; only
//! `InsufficientCredits` escapes this stage.

use tracing::{error, info, instrument, warn};

use crate::ai::provider::{ChatMessage, ModelType};
use crate::ai::SharedModelClient;
use crate::pipeline::params::ParameterExtractor;
use crate::pipeline::prompts;
use crate::text::{sanitize_for_llm, truncate_for_context};
use crate::types::{
    ArbiterVerdict, CategoryDetection, ExtractedParameters, OptimistAnalysis, PessimistAnalysis,
    Result, RiskAnalysis, RiskLevel, SemanticChunk,
};

const CLAUSE_CONTEXT_TOKENS: usize = 400;
const ARGUMENT_CONTEXT_TOKENS: usize = 300;
const PRECEDENT_SNIPPET_CHARS: usize = 150;

/// Three-agent adversarial analyzer
pub struct AdversarialAnalyzer {
    llm: SharedModelClient,
}

impl AdversarialAnalyzer {
    pub fn new(llm: SharedModelClient) -> Self {
        Self { llm }
    }

    /// Adjudicate one chunk. Invoked only for `needs_agent_review`
    /// detections.
    #[instrument(skip(self, chunk, detection), fields(chunk_id = %chunk.id, category = %detection.category))]
    pub async fn analyze(
        &self,
        chunk: &SemanticChunk,
        detection: &CategoryDetection,
    ) -> Result<RiskAnalysis> {
        info!("Analyzing {} - {}", chunk.id, detection.category);

        let clause = sanitize_for_llm(&chunk.text);
        let params = ParameterExtractor::extract(&chunk.text);

        let pessimist = self
            .run_pessimist(
                &clause,
                &detection.category,
                &detection.retrieved_risky_examples,
                &params,
            )
            .await?;

        if !pessimist.is_relevant {
            info!("Dismissed as not relevant to {}", detection.category);
            return Ok(RiskAnalysis::irrelevant(&chunk.id, &detection.category));
        }

        let optimist = self
            .run_optimist(
                &clause,
                &pessimist.risk_argument,
                &detection.retrieved_safe_examples,
                &params,
            )
            .await?;

        let verdict = self
            .run_arbiter(
                &clause,
                &detection.category,
                &pessimist,
                &optimist,
                &detection.retrieved_safe_examples,
                &detection.retrieved_risky_examples,
                &params,
            )
            .await?;

        info!(
            "Verdict: {}/100 ({})",
            verdict.risk_score, verdict.risk_level
        );

        Ok(RiskAnalysis {
            chunk_id: chunk.id.clone(),
            category: detection.category.clone(),
            is_relevant: true,
            final_risk_score: verdict.risk_score,
            final_risk_level: verdict.risk_level,
            pessimist_analysis: Some(pessimist),
            optimist_analysis: Some(optimist),
            arbiter_verdict: Some(verdict),
            extracted_parameters: Some(params),
            safe_precedents_used: detection
                .retrieved_safe_examples
                .iter()
                .take(3)
                .cloned()
                .collect(),
            risky_precedents_used: detection
                .retrieved_risky_examples
                .iter()
                .take(3)
                .cloned()
                .collect(),
        })
    }

    async fn run_pessimist(
        &self,
        clause: &str,
        category: &str,
        risky_precedents: &[String],
        params: &ExtractedParameters,
    ) -> Result<PessimistAnalysis> {
        let prompt = prompts::pessimist_prompt(
            category,
            &truncate_for_context(clause, CLAUSE_CONTEXT_TOKENS),
            &format_precedents(risky_precedents),
            &format_parameters(params),
        );

        let messages = [
            ChatMessage::system(prompts::PESSIMIST_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ];

        match self
            .llm
            .complete_structured::<PessimistAnalysis>(&messages, ModelType::Smart, 0.2)
            .await
        {
            Ok(result) => Ok(result),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!("Pessimist failed: {e}");
                Ok(PessimistAnalysis {
                    is_relevant: true,
                    relevance_reasoning: "Error in analysis".to_string(),
                    risk_argument: "Manual review required".to_string(),
                    key_concerns: Vec::new(),
                })
            }
        }
    }

    async fn run_optimist(
        &self,
        clause: &str,
        pessimist_argument: &str,
        safe_precedents: &[String],
        params: &ExtractedParameters,
    ) -> Result<OptimistAnalysis> {
        let prompt = prompts::optimist_prompt(
            &truncate_for_context(clause, CLAUSE_CONTEXT_TOKENS),
            &truncate_for_context(pessimist_argument, ARGUMENT_CONTEXT_TOKENS),
            &format_precedents(safe_precedents),
            &format_parameters(params),
        );

        let messages = [
            ChatMessage::system(prompts::OPTIMIST_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ];

        match self
            .llm
            .complete_structured::<OptimistAnalysis>(&messages, ModelType::Smart, 0.2)
            .await
        {
            Ok(result) => Ok(result),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!("Optimist failed: {e}");
                Ok(OptimistAnalysis {
                    defense_argument: "Standard practice in industry".to_string(),
                    industry_context: "Common in similar agreements".to_string(),
                    mitigating_factors: Vec::new(),
                })
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_arbiter(
        &self,
        clause: &str,
        category: &str,
        pessimist: &PessimistAnalysis,
        optimist: &OptimistAnalysis,
        safe_precedents: &[String],
        risky_precedents: &[String],
        params: &ExtractedParameters,
    ) -> Result<ArbiterVerdict> {
        let safe_summary = format!(
            "Standard protection: {} examples show mutual rights, notice periods",
            safe_precedents.len()
        );
        let risky_summary = format!(
            "Risk patterns: {} examples show unilateral control, no protections",
            risky_precedents.len()
        );

        let prompt = prompts::arbiter_prompt(
            category,
            &truncate_for_context(clause, CLAUSE_CONTEXT_TOKENS),
            &truncate_for_context(&pessimist.risk_argument, ARGUMENT_CONTEXT_TOKENS),
            &format_listed(&pessimist.key_concerns),
            &truncate_for_context(&optimist.defense_argument, ARGUMENT_CONTEXT_TOKENS),
            &format_listed(&optimist.mitigating_factors),
            &safe_summary,
            &risky_summary,
            &format_parameters(params),
        );

        let messages = [
            ChatMessage::system(prompts::ARBITER_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ];

        match self
            .llm
            .complete_structured::<ArbiterVerdict>(&messages, ModelType::Smart, 0.2)
            .await
        {
            Ok(mut verdict) => {
                verdict.risk_score = verdict.risk_score.min(100);
                verdict.risk_level = RiskLevel::from_score(verdict.risk_score);
                Ok(verdict)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!("Arbiter failed: {e}");
                Ok(ArbiterVerdict {
                    risk_score: 50,
                    risk_level: RiskLevel::Medium,
                    reasoning: "Manual review required due to analysis error".to_string(),
                    key_factors: Vec::new(),
                })
            }
        }
    }
}

/// "- <first 150 chars>..." per precedent, or "None available"
fn format_precedents(precedents: &[String]) -> String {
    if precedents.is_empty() {
        return "None available".to_string();
    }
    precedents
        .iter()
        .take(3)
        .map(|p| format!("- {}...", crate::text::take_chars(p, PRECEDENT_SNIPPET_CHARS)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// First three entries comma-joined, or "None"
fn format_listed(entries: &[String]) -> String {
    if entries.is_empty() {
        "None".to_string()
    } else {
        entries
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Human-readable parameter summary for prompt slots
fn format_parameters(params: &ExtractedParameters) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(days) = params.days_mentioned {
        lines.push(format!("- Notice period: {days} days"));
    }
    if !params.amounts_mentioned.is_empty() {
        lines.push(format!("- Amounts: {}", params.amounts_mentioned.join(", ")));
    }
    if params.is_mutual {
        lines.push("- Mutual (either party)".to_string());
    } else {
        lines.push("- Unilateral (one party only)".to_string());
    }
    if params.has_written_notice {
        lines.push("- Written notice required".to_string());
    }
    if params.requires_cause {
        lines.push("- Requires cause".to_string());
    }
    if params.has_cap {
        lines.push("- Has liability cap".to_string());
    }

    if lines.is_empty() {
        warn!("no structural parameters extracted");
        "No specific parameters extracted".to_string()
    } else {
        lines.join("\n")
    }
}
