//! Contract Analysis Pipeline
//!
//! The five-stage dataflow from raw document bytes to a structured risk
//! report, plus the orchestrator binding the stages together. A single
//! analysis is sequential across stages; stage failures degrade where the
//! contract allows, and only Stage 1 errors or `InsufficientCredits` fail
//! the job.

pub mod adversarial;
pub mod compound;
pub mod detector;
pub mod document;
pub mod fixgen;
pub mod params;
pub mod prompts;

pub use adversarial::AdversarialAnalyzer;
pub use compound::CompoundRiskDetector;
pub use detector::CategoryDetector;
pub use document::DocumentProcessor;
pub use fixgen::FixGenerator;
pub use params::ParameterExtractor;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::ai::{ModelClient, SharedModelClient, Tracer};
use crate::config::Config;
use crate::constants::pipeline as pipeline_constants;
use crate::rag::embedding::shared_embedder;
use crate::rag::store::{SharedVectorStore, VectorStore};
use crate::types::{
    AnalysisResult, ClauseError, CompoundRiskEntry, DocumentSummary, Result, RiskAnalysis,
    RiskLevel, RiskSummary, RiskyClause,
};

/// The end-to-end contract analyzer
pub struct ContractAnalyzer {
    processor: Arc<DocumentProcessor>,
    detector: CategoryDetector,
    risk_analyzer: AdversarialAnalyzer,
    fix_generator: FixGenerator,
    compound_detector: CompoundRiskDetector,
    llm: SharedModelClient,
}

impl ContractAnalyzer {
    /// Wire up all stages from configuration. The embedder and vector
    /// store are process-wide read-mostly singletons.
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = shared_embedder();
        let seeds: Vec<(String, String)> = config
            .corpus
            .prototype_seeds
            .iter()
            .map(|(category, seed)| (category.clone(), seed.clone()))
            .collect();
        let store: SharedVectorStore = Arc::new(VectorStore::open_with_seeds(
            &config.corpus.db_path,
            embedder.clone(),
            seeds,
        )?);
        let tracer = Arc::new(Tracer::from_config(&config.observability));
        let llm: SharedModelClient = Arc::new(ModelClient::from_config(&config.llm, tracer)?);

        Ok(Self::new(config, embedder, store, llm))
    }

    /// Wire up all stages with injected collaborators (used by tests and
    /// embedders that manage their own corpus)
    pub fn new(
        config: &Config,
        embedder: crate::rag::embedding::SharedEmbedder,
        store: SharedVectorStore,
        llm: SharedModelClient,
    ) -> Self {
        Self {
            processor: Arc::new(DocumentProcessor::new(config, embedder)),
            detector: CategoryDetector::new(store.clone(), config.zones.clone()),
            risk_analyzer: AdversarialAnalyzer::new(llm.clone()),
            fix_generator: FixGenerator::new(llm.clone(), store),
            compound_detector: CompoundRiskDetector::new(llm.clone()),
            llm,
        }
    }

    /// Run the full pipeline over one PDF
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn analyze_contract(&self, path: &Path) -> Result<AnalysisResult> {
        info!("Analyzing: {}", path.display());

        // Stage 1 is CPU- and I/O-bound; run it off the async workers
        let processor = self.processor.clone();
        let owned_path = path.to_path_buf();
        let doc = tokio::task::spawn_blocking(move || processor.process(&owned_path))
            .await
            .map_err(|e| ClauseError::Job(format!("stage 1 worker panicked: {e}")))??;

        // Stages 2-4 per chunk, preserving source order
        let mut risky_clauses: Vec<RiskyClause> = Vec::new();
        let mut risk_analyses: Vec<RiskAnalysis> = Vec::new();

        for chunk in &doc.chunks {
            let detection = self.detector.detect(chunk)?;

            if !detection.needs_agent_review {
                continue;
            }

            let analysis = self.risk_analyzer.analyze(chunk, &detection).await?;

            if !analysis.is_relevant
                || analysis.final_risk_score < pipeline_constants::REPORT_SCORE_FLOOR
            {
                continue;
            }

            let fix = self
                .fix_generator
                .generate(&chunk.text, &detection.category, &analysis)
                .await?;

            risky_clauses.push(RiskyClause {
                chunk_id: chunk.id.clone(),
                category: detection.category.clone(),
                original_text: chunk.text.clone(),
                risk_score: analysis.final_risk_score,
                risk_level: analysis.final_risk_level,
                pessimist_analysis: analysis
                    .pessimist_analysis
                    .as_ref()
                    .map(|p| p.risk_argument.clone())
                    .unwrap_or_default(),
                optimist_analysis: analysis
                    .optimist_analysis
                    .as_ref()
                    .map(|o| o.defense_argument.clone())
                    .unwrap_or_default(),
                arbiter_reasoning: analysis
                    .arbiter_verdict
                    .as_ref()
                    .map(|v| v.reasoning.clone())
                    .unwrap_or_default(),
                suggested_fix: fix.suggested_replacement,
                fix_comment: fix.edit_comment,
                key_changes: fix.key_changes,
            });
            risk_analyses.push(analysis);
        }

        // Stage 5 over the gated verdicts
        let compound_risks = self
            .compound_detector
            .detect(&risk_analyses, &doc.full_text)
            .await?;

        let result = assemble_result(
            &doc.metadata.filename,
            doc.total_chunks,
            risky_clauses,
            &compound_risks,
        );

        let stats = self.llm.stats();
        info!(
            "Analysis complete: {} risky clauses, {} model calls",
            result.risky_clauses.len(),
            stats.total_calls
        );
        Ok(result)
    }

    /// Model usage statistics for this analyzer's client
    pub fn stats(&self) -> crate::ai::ClientStats {
        self.llm.stats()
    }
}

/// Bind flagged clauses and compound risks into the wire-contract record
fn assemble_result(
    filename: &str,
    total_chunks: usize,
    risky_clauses: Vec<RiskyClause>,
    compound_risks: &[crate::types::CompoundRisk],
) -> AnalysisResult {
    let average = if risky_clauses.is_empty() {
        0.0
    } else {
        risky_clauses.iter().map(|c| f64::from(c.risk_score)).sum::<f64>()
            / risky_clauses.len() as f64
    };

    let categories_flagged: Vec<String> = risky_clauses
        .iter()
        .map(|c| c.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    AnalysisResult {
        document: DocumentSummary {
            filename: filename.to_string(),
            total_chunks,
            risky_clauses_found: risky_clauses.len(),
        },
        summary: RiskSummary {
            overall_risk: RiskLevel::from_average(average),
            average_risk_score: (average * 10.0).round() / 10.0,
            compound_risks_found: compound_risks.len(),
            categories_flagged,
        },
        compound_risks: compound_risks.iter().map(CompoundRiskEntry::from).collect(),
        risky_clauses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Tracer;
    use crate::config::{LlmConfig, ModelTable, ProviderSettings};
    use crate::rag::embedding::{EMBEDDING_DIMENSIONS, HashEmbedder, SharedEmbedder};
    use crate::types::{CompoundRisk, Severity};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn clause(chunk_id: &str, category: &str, score: u32) -> RiskyClause {
        RiskyClause {
            chunk_id: chunk_id.to_string(),
            category: category.to_string(),
            original_text: "text".to_string(),
            risk_score: score,
            risk_level: RiskLevel::from_score(score),
            pessimist_analysis: String::new(),
            optimist_analysis: String::new(),
            arbiter_reasoning: String::new(),
            suggested_fix: String::new(),
            fix_comment: String::new(),
            key_changes: Vec::new(),
        }
    }

    #[test]
    fn test_empty_report_is_low_risk() {
        let result = assemble_result("contract.pdf", 10, Vec::new(), &[]);
        assert_eq!(result.summary.average_risk_score, 0.0);
        assert_eq!(result.summary.overall_risk, RiskLevel::Low);
        assert!(result.summary.categories_flagged.is_empty());
        assert!(result.compound_risks.is_empty());
        assert_eq!(result.document.risky_clauses_found, 0);
    }

    #[test]
    fn test_average_and_overall_risk() {
        let clauses = vec![
            clause("chunk_001", "Unilateral Termination", 80),
            clause("chunk_002", "Unlimited Liability", 55),
        ];
        let result = assemble_result("contract.pdf", 12, clauses, &[]);
        assert_eq!(result.summary.average_risk_score, 67.5);
        assert_eq!(result.summary.overall_risk, RiskLevel::High);
    }

    #[test]
    fn test_categories_flagged_sorted_and_unique() {
        let clauses = vec![
            clause("chunk_001", "Unlimited Liability", 60),
            clause("chunk_002", "Non-Compete", 60),
            clause("chunk_003", "Unlimited Liability", 70),
        ];
        let result = assemble_result("contract.pdf", 5, clauses, &[]);
        assert_eq!(
            result.summary.categories_flagged,
            vec!["Non-Compete".to_string(), "Unlimited Liability".to_string()]
        );
    }

    /// Read a full HTTP request (headers plus Content-Length body)
    async fn drain_request(sock: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let Ok(n) = sock.read(&mut chunk).await else {
                return;
            };
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() - (header_end + 4) >= content_length {
                return;
            }
        }
    }

    /// Chat-completions stub answering every request with the same body
    async fn spawn_stub(body: String) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    break;
                };
                drain_request(&mut sock).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{addr}/v1")
    }

    /// One canned structured response satisfying every agent schema at once
    /// (unknown fields are ignored on deserialization)
    fn omnibus_agent_response() -> String {
        let content = serde_json::json!({
            "is_relevant": true,
            "relevance_reasoning": "Termination is the clause's primary topic",
            "risk_argument": "Unilateral control with no notice protections",
            "key_concerns": ["no notice period"],
            "defense_argument": "Common in vendor agreements",
            "industry_context": "Seen in short-term engagements",
            "mitigating_factors": [],
            "risk_score": 85,
            "risk_level": "Critical",
            "reasoning": "The imbalance outweighs the industry-standard defense",
            "key_factors": ["unilateral", "no notice"],
            "suggested_replacement":
                "Either party may terminate this Agreement upon 30 days prior written notice.",
            "edit_comment": "Made termination mutual and added a notice period.",
            "key_changes": ["mutual rights", "30-day notice"],
            "precedent_citations": [],
            "risks": []
        })
        .to_string();

        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_analyze_contract_end_to_end_with_stub_model() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pdf_path = dir.path().join("vendor_terms.pdf");
        // One long sentence built from the termination-prototype
        // vocabulary: a single chunk that lands squarely on the category
        crate::pipeline::document::tests::write_fixture_pdf(
            &pdf_path,
            &[
                "Contract termination clauses Covers ending agreement notice",
                "periods termination rights cancellation Keywords terminate",
                "cancel end notice",
            ],
        );

        let base_url = spawn_stub(omnibus_agent_response()).await;
        let llm_config = LlmConfig {
            primary: ProviderSettings {
                name: "stub".to_string(),
                base_url,
                api_key: Some("sk-test".to_string()),
                api_key_env: "CLAUSEGUARD_UNSET".to_string(),
                models: ModelTable {
                    fast: vec!["stub-model".to_string()],
                    smart: vec!["stub-model".to_string()],
                    structured: vec!["stub-model".to_string()],
                },
            },
            fallback: None,
            affordable_tokens: 10_000,
            timeout_secs: 5,
            retry_delay_secs: 0,
            max_retries: 2,
        };

        let embedder: SharedEmbedder = Arc::new(HashEmbedder::new(EMBEDDING_DIMENSIONS));
        let store: SharedVectorStore =
            Arc::new(VectorStore::open_in_memory(embedder.clone()).expect("store"));
        let llm: SharedModelClient = Arc::new(
            ModelClient::from_config(&llm_config, Arc::new(Tracer::noop())).expect("client"),
        );

        let analyzer = ContractAnalyzer::new(&Config::default(), embedder, store, llm);
        let result = analyzer
            .analyze_contract(&pdf_path)
            .await
            .expect("analysis");

        assert_eq!(result.document.filename, "vendor_terms.pdf");
        assert_eq!(result.document.risky_clauses_found, 1);

        let flagged = &result.risky_clauses[0];
        assert_eq!(flagged.category, "Unilateral Termination");
        assert_eq!(flagged.risk_score, 85);
        assert_eq!(flagged.risk_level, RiskLevel::Critical);
        assert!(flagged.suggested_fix.contains("either party")
            || flagged.suggested_fix.contains("Either party"));
        assert!(flagged.suggested_fix.contains("30 days"));

        assert_eq!(result.summary.overall_risk, RiskLevel::Critical);
        assert_eq!(result.summary.average_risk_score, 85.0);
        assert_eq!(
            result.summary.categories_flagged,
            vec!["Unilateral Termination".to_string()]
        );
        // A single flagged clause cannot compound
        assert!(result.compound_risks.is_empty());

        assert!(analyzer.stats().total_calls >= 3);
    }

    #[tokio::test]
    async fn test_zero_budget_fails_before_any_model_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pdf_path = dir.path().join("vendor_terms.pdf");
        crate::pipeline::document::tests::write_fixture_pdf(
            &pdf_path,
            &[
                "Contract termination clauses Covers ending agreement notice",
                "periods termination rights cancellation Keywords terminate",
                "cancel end notice",
            ],
        );

        let llm_config = LlmConfig {
            primary: ProviderSettings {
                name: "stub".to_string(),
                base_url: "http://192.0.2.1:9/v1".to_string(),
                api_key: Some("sk-test".to_string()),
                api_key_env: "CLAUSEGUARD_UNSET".to_string(),
                models: ModelTable::default(),
            },
            fallback: None,
            affordable_tokens: 10,
            timeout_secs: 1,
            retry_delay_secs: 0,
            max_retries: 1,
        };

        let embedder: SharedEmbedder = Arc::new(HashEmbedder::new(EMBEDDING_DIMENSIONS));
        let store: SharedVectorStore =
            Arc::new(VectorStore::open_in_memory(embedder.clone()).expect("store"));
        let llm: SharedModelClient = Arc::new(
            ModelClient::from_config(&llm_config, Arc::new(Tracer::noop())).expect("client"),
        );

        let analyzer = ContractAnalyzer::new(&Config::default(), embedder, store, llm);
        let err = analyzer.analyze_contract(&pdf_path).await.unwrap_err();
        assert!(matches!(err, ClauseError::InsufficientCredits(_)));
    }

    #[test]
    fn test_compound_entries_carried_through() {
        let clauses = vec![
            clause("chunk_001", "Unilateral Termination", 80),
            clause("chunk_002", "Unlimited Liability", 70),
        ];
        let compound = vec![CompoundRisk {
            risk_type: "Termination + Unlimited Liability".to_string(),
            severity: Severity::Critical,
            description: "d".to_string(),
            affected_clause_ids: vec!["chunk_001".to_string(), "chunk_002".to_string()],
            mitigation_advice: "m".to_string(),
            combined_risk_score: 90,
        }];

        let result = assemble_result("contract.pdf", 4, clauses, &compound);
        assert_eq!(result.summary.compound_risks_found, 1);
        assert_eq!(result.compound_risks.len(), 1);
        assert_eq!(result.compound_risks[0].risk_score, 90);

        // Affected ids are a subset of the flagged chunk ids
        let flagged: Vec<&str> = result
            .risky_clauses
            .iter()
            .map(|c| c.chunk_id.as_str())
            .collect();
        for id in &result.compound_risks[0].affected_clauses {
            assert!(flagged.contains(&id.as_str()));
        }
    }
}
