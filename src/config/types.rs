//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/clauseguard/) and project (.clauseguard/)
//! level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Model client settings
    pub llm: LlmConfig,

    /// Semantic chunking settings
    pub chunking: ChunkingConfig,

    /// Three-zone detection thresholds
    pub zones: ZoneConfig,

    /// Reference corpus settings
    pub corpus: CorpusConfig,

    /// Observability settings
    pub observability: ObservabilityConfig,

    /// OCR tool settings
    pub ocr: OcrConfig,

    /// Background job settings
    pub jobs: JobsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            chunking: ChunkingConfig::default(),
            zones: ZoneConfig::default(),
            corpus: CorpusConfig::default(),
            observability: ObservabilityConfig::default(),
            ocr: OcrConfig::default(),
            jobs: JobsConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ClauseError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        if self.llm.timeout_secs == 0 {
            return Err(crate::types::ClauseError::Config(
                "llm.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.primary.models.fast.is_empty() {
            return Err(crate::types::ClauseError::Config(
                "llm.primary.models.fast must list at least one model".to_string(),
            ));
        }

        if self.chunking.min_chunk_length >= self.chunking.max_chunk_length {
            return Err(crate::types::ClauseError::Config(format!(
                "chunking.min_chunk_length ({}) must be below max_chunk_length ({})",
                self.chunking.min_chunk_length, self.chunking.max_chunk_length
            )));
        }

        if !(0.0..=1.0).contains(&self.chunking.similarity_percentile) {
            return Err(crate::types::ClauseError::Config(format!(
                "chunking.similarity_percentile must be in [0, 1], got {}",
                self.chunking.similarity_percentile
            )));
        }

        for (name, value) in [
            ("zones.noise_threshold", self.zones.noise_threshold),
            ("zones.safe_threshold", self.zones.safe_threshold),
            ("zones.safe_exemplar_cutoff", self.zones.safe_exemplar_cutoff),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(crate::types::ClauseError::Config(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }

        if self.zones.noise_threshold >= self.zones.safe_threshold {
            return Err(crate::types::ClauseError::Config(format!(
                "zones.noise_threshold ({}) must be below safe_threshold ({})",
                self.zones.noise_threshold, self.zones.safe_threshold
            )));
        }

        for category in &self.corpus.target_categories {
            if !self.corpus.prototype_seeds.contains_key(category) {
                return Err(crate::types::ClauseError::Config(format!(
                    "corpus.prototype_seeds is missing a seed for '{category}'"
                )));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Model Client Configuration
// =============================================================================

/// Ordered model lists per model type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelTable {
    pub fast: Vec<String>,
    pub smart: Vec<String>,
    pub structured: Vec<String>,
}

impl Default for ModelTable {
    fn default() -> Self {
        Self {
            fast: vec![
                "llama-3.1-8b-instant".to_string(),
                "mixtral-8x7b-32768".to_string(),
            ],
            smart: vec!["llama-3.3-70b-versatile".to_string()],
            structured: vec!["llama-3.1-8b-instant".to_string()],
        }
    }
}

impl ModelTable {
    fn fallback_defaults() -> Self {
        Self {
            fast: vec![
                "openai/gpt-4o-mini".to_string(),
                "meta-llama/llama-3.1-8b-instruct".to_string(),
            ],
            smart: vec![
                "openai/gpt-4o-mini".to_string(),
                "anthropic/claude-3.5-sonnet".to_string(),
            ],
            structured: vec!["openai/gpt-4o-mini".to_string()],
        }
    }
}

/// One logical provider: an OpenAI-compatible endpoint with a model table
///
/// Note: API keys are never serialized to output and are redacted in debug
/// output. When `api_key` is unset the key is resolved from `api_key_env`
/// at client construction.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Provider name for logging
    pub name: String,
    /// OpenAI-compatible base URL
    pub base_url: String,
    /// API key; prefer `api_key_env` to keep secrets out of config files
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable the key is read from when `api_key` is unset
    pub api_key_env: String,
    /// Ordered model lists per model type
    pub models: ModelTable,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_key_env", &self.api_key_env)
            .field("models", &self.models)
            .finish()
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: "primary".to_string(),
            base_url: constants::llm::PRIMARY_BASE_URL.to_string(),
            api_key: None,
            api_key_env: constants::llm::PRIMARY_API_KEY_ENV.to_string(),
            models: ModelTable::default(),
        }
    }
}

/// Model client configuration: primary and optional fallback provider plus
/// budget and retry discipline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub primary: ProviderSettings,
    /// Fallback provider tried after the primary list is exhausted
    pub fallback: Option<ProviderSettings>,

    /// Pre-flight token budget: estimated prompt tokens + max_tokens must
    /// stay below this
    pub affordable_tokens: u64,
    /// Per-call request timeout (seconds)
    pub timeout_secs: u64,
    /// Sleep after a rate-limit response (seconds)
    pub retry_delay_secs: u64,
    /// Structured-output parse/validation retries
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary: ProviderSettings::default(),
            fallback: Some(ProviderSettings {
                name: "fallback".to_string(),
                base_url: constants::llm::FALLBACK_BASE_URL.to_string(),
                api_key: None,
                api_key_env: constants::llm::FALLBACK_API_KEY_ENV.to_string(),
                models: ModelTable::fallback_defaults(),
            }),
            affordable_tokens: constants::llm::DEFAULT_AFFORDABLE_TOKENS,
            timeout_secs: constants::llm::DEFAULT_TIMEOUT_SECS,
            retry_delay_secs: constants::llm::DEFAULT_RETRY_DELAY_SECS,
            max_retries: constants::llm::DEFAULT_MAX_RETRIES,
        }
    }
}

// =============================================================================
// Chunking Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub min_chunk_length: usize,
    pub max_chunk_length: usize,
    /// Percentile fraction over the consecutive-sentence similarity array;
    /// 0.75 places breakpoints below the 75th percentile score
    pub similarity_percentile: f64,
    /// Context window captured around each chunk (characters)
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_chunk_length: constants::chunking::MIN_CHUNK_LENGTH,
            max_chunk_length: constants::chunking::MAX_CHUNK_LENGTH,
            similarity_percentile: constants::chunking::SIMILARITY_PERCENTILE,
            overlap: constants::chunking::CONTEXT_WINDOW,
        }
    }
}

// =============================================================================
// Zone Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub noise_threshold: f64,
    pub safe_threshold: f64,
    /// Hard gate on the nearest safe exemplar, separate from safe_threshold
    pub safe_exemplar_cutoff: f64,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            noise_threshold: constants::zones::NOISE_THRESHOLD,
            safe_threshold: constants::zones::SAFE_THRESHOLD,
            safe_exemplar_cutoff: constants::zones::SAFE_EXEMPLAR_CUTOFF,
        }
    }
}

// =============================================================================
// Corpus Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Vector store database path
    pub db_path: PathBuf,
    /// The closed category set; a prototype seed exists for each
    pub target_categories: Vec<String>,
    /// Seed document per category, used to auto-initialize an empty
    /// prototype collection
    pub prototype_seeds: std::collections::BTreeMap<String, String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(constants::corpus::DEFAULT_DB_PATH),
            target_categories: constants::corpus::TARGET_CATEGORIES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            prototype_seeds: constants::corpus::PROTOTYPE_SEEDS
                .iter()
                .map(|(category, seed)| ((*category).to_string(), (*seed).to_string()))
                .collect(),
        }
    }
}

// =============================================================================
// Observability Configuration
// =============================================================================

/// Observation-span backend settings. When `enabled` is false or the public
/// key is empty the tracer is a no-op.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub enabled: bool,
    pub public_key: String,
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub host: String,
}

impl std::fmt::Debug for ObservabilityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservabilityConfig")
            .field("enabled", &self.enabled)
            .field("public_key", &self.public_key)
            .field("secret_key", &"[REDACTED]")
            .field("host", &self.host)
            .finish()
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            public_key: String::new(),
            secret_key: String::new(),
            host: "https://cloud.langfuse.com".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Whether a backend is actually configured
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.public_key.is_empty()
    }
}

// =============================================================================
// OCR Configuration
// =============================================================================

/// External OCR tooling. Paths default to the binaries on PATH and can be
/// overridden per environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Poppler's pdftoppm binary (rasterizes PDF pages)
    pub pdftoppm_path: PathBuf,
    /// Tesseract binary
    pub tesseract_path: PathBuf,
    /// Rasterization resolution (dpi)
    pub dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            pdftoppm_path: PathBuf::from("pdftoppm"),
            tesseract_path: PathBuf::from("tesseract"),
            dpi: 200,
        }
    }
}

// =============================================================================
// Jobs Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Uploaded files are stored here keyed by analysis id
    pub upload_dir: PathBuf,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./uploads"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_thresholds() {
        let config = Config::default();
        assert_eq!(config.zones.noise_threshold, 0.44);
        assert_eq!(config.zones.safe_threshold, 0.85);
        assert_eq!(config.zones.safe_exemplar_cutoff, 0.90);
        assert_eq!(config.chunking.min_chunk_length, 100);
        assert_eq!(config.chunking.max_chunk_length, 800);
        assert_eq!(config.llm.affordable_tokens, 10_000);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.llm.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_chunk_bounds() {
        let mut config = Config::default();
        config.chunking.min_chunk_length = 900;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_percentile() {
        let mut config = Config::default();
        config.chunking.similarity_percentile = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_zones() {
        let mut config = Config::default();
        config.zones.noise_threshold = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_seed_per_category() {
        let mut config = Config::default();
        config
            .corpus
            .target_categories
            .push("Exclusivity".to_string());
        assert!(config.validate().is_err());

        config
            .corpus
            .prototype_seeds
            .insert("Exclusivity".to_string(), "Exclusive dealing clauses.".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_key_never_serialized_or_debugged() {
        let mut settings = ProviderSettings::default();
        settings.api_key = Some("sk-secret".to_string());
        let json = serde_json::to_string(&settings).expect("serialize");
        assert!(!json.contains("sk-secret"));
        let debug = format!("{settings:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_observability_unconfigured_by_default() {
        let config = ObservabilityConfig::default();
        assert!(!config.is_configured());
    }
}
