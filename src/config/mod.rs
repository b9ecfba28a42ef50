//! Configuration
//!
//! Figment-merged configuration with built-in defaults, global and project
//! TOML files, and CLAUSEGUARD_* environment overrides.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    ChunkingConfig, Config, CorpusConfig, JobsConfig, LlmConfig, ModelTable,
    ObservabilityConfig, OcrConfig, ProviderSettings, ZoneConfig,
};
