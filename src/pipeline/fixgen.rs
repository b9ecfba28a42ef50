//! Fix Generator (Stage 4)
//!
//! Retrieval-guided safe-clause drafting for gated risky chunks: retrieve
//! the closest exemplars for the category, keep only safe ones, re-rank by
//! structural-parameter boosts, and generate the replacement with the top
//! templates as inline guidance. On generation failure the best template
//! (or the original clause) stands in with a manual-drafting comment.

use tracing::{error, info, instrument};

use crate::ai::SharedModelClient;
use crate::ai::provider::{ChatMessage, ModelType};
use crate::pipeline::prompts;
use crate::rag::store::{ExemplarMatch, SharedVectorStore};
use crate::text::{sanitize_for_llm, take_chars};
use crate::types::{ExtractedParameters, GeneratedFix, Result, RiskAnalysis};

const RETRIEVAL_POOL: usize = 10;
const RANKED_KEEP: usize = 5;
const INLINE_TEMPLATES: usize = 3;
const CITATION_COUNT: usize = 2;
const CITATION_CHARS: usize = 100;
const GENERATION_TEMPERATURE: f32 = 0.3;

/// Retrieval-guided fix generator
pub struct FixGenerator {
    llm: SharedModelClient,
    store: SharedVectorStore,
}

impl FixGenerator {
    pub fn new(llm: SharedModelClient, store: SharedVectorStore) -> Self {
        Self { llm, store }
    }

    /// Draft a safe replacement for a flagged clause
    #[instrument(skip_all, fields(category = %category))]
    pub async fn generate(
        &self,
        risky_text: &str,
        category: &str,
        risk_analysis: &RiskAnalysis,
    ) -> Result<GeneratedFix> {
        info!("Generating fix for {category}");

        let templates =
            self.retrieve_safe_templates(risky_text, category, risk_analysis.extracted_parameters.as_ref())?;

        let mut fix = self
            .generate_with_templates(risky_text, category, risk_analysis, &templates)
            .await?;

        fix.precedent_citations = templates
            .iter()
            .take(CITATION_COUNT)
            .map(|t| format!("{}...", take_chars(&t.text, CITATION_CHARS)))
            .collect();

        info!(
            "Fix generated ({} chars)",
            crate::text::char_count(&fix.suggested_replacement)
        );
        Ok(fix)
    }

    /// Top templates for the category: retrieve broadly, keep safe ones,
    /// re-rank by parameter boosts
    fn retrieve_safe_templates(
        &self,
        risky_text: &str,
        category: &str,
        parameters: Option<&ExtractedParameters>,
    ) -> Result<Vec<ExemplarMatch>> {
        let pool = self
            .store
            .query_category(risky_text, category, None, RETRIEVAL_POOL)?;

        let mut safe_only: Vec<ExemplarMatch> = pool
            .into_iter()
            .filter(|t| t.risk_level == "safe")
            .collect();

        if let Some(params) = parameters {
            let mut scored: Vec<(f64, ExemplarMatch)> = safe_only
                .into_iter()
                .map(|template| (boosted_score(&template, params), template))
                .collect();
            scored.sort_by(|a, b| b.0.total_cmp(&a.0));
            safe_only = scored.into_iter().map(|(_, t)| t).collect();
        }

        safe_only.truncate(RANKED_KEEP);
        Ok(safe_only)
    }

    async fn generate_with_templates(
        &self,
        risky_text: &str,
        category: &str,
        risk_analysis: &RiskAnalysis,
        templates: &[ExemplarMatch],
    ) -> Result<GeneratedFix> {
        let template_examples = if templates.is_empty() {
            "No templates available - generate from scratch.".to_string()
        } else {
            templates
                .iter()
                .take(INLINE_TEMPLATES)
                .enumerate()
                .map(|(index, t)| {
                    format!(
                        "Example {} (Similarity: {:.0}%):\n{}",
                        index + 1,
                        t.similarity * 100.0,
                        t.text
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let arbiter_reasoning = risk_analysis
            .arbiter_verdict
            .as_ref()
            .map(|v| take_chars(&v.reasoning, 200))
            .unwrap_or_else(|| "See analysis".to_string());
        let risk_summary = format!(
            "Risk Score: {}/100 ({})\nKey Issues: {arbiter_reasoning}",
            risk_analysis.final_risk_score, risk_analysis.final_risk_level
        );

        let clause = sanitize_for_llm(risky_text);
        let prompt = prompts::fix_prompt(
            category,
            &clause,
            &risk_summary,
            &template_examples,
            risky_text.split_whitespace().count(),
        );

        let messages = [
            ChatMessage::system(prompts::FIX_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ];

        match self
            .llm
            .complete_structured::<GeneratedFix>(&messages, ModelType::Smart, GENERATION_TEMPERATURE)
            .await
        {
            Ok(fix) => Ok(fix),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!("Fix generation failed: {e}");
                Ok(GeneratedFix {
                    suggested_replacement: templates
                        .first()
                        .map(|t| t.text.clone())
                        .unwrap_or_else(|| risky_text.to_string()),
                    edit_comment: "Manual drafting recommended due to generation error."
                        .to_string(),
                    key_changes: vec!["Review and revise manually".to_string()],
                    precedent_citations: Vec::new(),
                })
            }
        }
    }
}

/// Similarity multiplied by structural-fit boosts: templates mentioning
/// days when a notice period exists (×1.2), "either party" when the clause
/// is mutual (×1.3), cap language when a cap exists (×1.2)
fn boosted_score(template: &ExemplarMatch, params: &ExtractedParameters) -> f64 {
    let text = template.text.to_lowercase();
    let mut score = template.similarity;

    if params.days_mentioned.is_some() && text.contains("days") {
        score *= 1.2;
    }
    if params.is_mutual && text.contains("either party") {
        score *= 1.3;
    }
    if params.has_cap && (text.contains("limited") || text.contains("cap")) {
        score *= 1.2;
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::params::ParameterExtractor;

    fn template(text: &str, similarity: f64) -> ExemplarMatch {
        ExemplarMatch {
            text: text.to_string(),
            category: "Unilateral Termination".to_string(),
            risk_level: "safe".to_string(),
            similarity,
        }
    }

    #[test]
    fn test_boosts_stack() {
        let params = ParameterExtractor::extract(
            "Either party may terminate upon 30 days notice; liability limited to fees.",
        );
        let fit = template(
            "Either party may terminate upon 60 days written notice; damages limited to fees paid.",
            0.5,
        );
        // days (1.2) × either party (1.3) × limited (1.2)
        let expected = 0.5 * 1.2 * 1.3 * 1.2;
        assert!((boosted_score(&fit, &params) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_no_boost_without_parameter_match() {
        let params = ParameterExtractor::extract("Company may terminate at any time.");
        let plain = template("Company provides services as described.", 0.7);
        assert!((boosted_score(&plain, &params) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_boost_reorders_templates() {
        let params = ParameterExtractor::extract(
            "Either party may terminate upon 30 days notice.",
        );
        let generic = template("Termination follows the procedures in Exhibit B.", 0.8);
        let fitted = template("Either party may terminate on 60 days notice.", 0.7);

        // 0.7 × 1.2 × 1.3 = 1.092 beats 0.8
        assert!(boosted_score(&fitted, &params) > boosted_score(&generic, &params));
    }
}
