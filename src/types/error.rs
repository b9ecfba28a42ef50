//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Provides error classification for the model client's retry and
//! fallback decisions.
//!
//! ## Error Categories
//!
//! - **Transient**: temporary server issues (skip to next model)
//! - **RateLimit**: API rate limiting (wait, then continue)
//! - **Credits**: payment required / budget exhausted (abort immediately)
//! - **Auth / Network / BadRequest / ParseError / Unknown**: skip to next model
//!
//! ## Design Principles
//!
//! - Single unified error type (ClauseError) for the entire application
//! - Category-based routing: skip-to-next errors never abort, abort errors
//!   are never silently retried
//! - No panic/unwrap outside tests

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories for model-call routing decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - sleep the configured delay, then try the next model
    RateLimit,
    /// Payment required / insufficient credits - abort, never retry
    Credits,
    /// Authentication failed - skip to next model
    Auth,
    /// Network/connectivity issues - skip to next model
    Network,
    /// Invalid request - skip to next model
    BadRequest,
    /// Response parsing failed - bounded retry at the structured layer
    ParseError,
    /// Temporary server issues (5xx, empty choices) - skip to next model
    Transient,
    /// Unknown error - skip to next model
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Credits => write!(f, "CREDITS"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if this category aborts the whole call chain immediately
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Credits)
    }

    /// Check if this category should pause before the next attempt
    pub fn should_pause(&self) -> bool {
        matches!(self, Self::RateLimit)
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Model-call error with category and provider context
#[derive(Debug, Clone)]
pub struct LlmError {
    /// Error category for routing decisions
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    /// Create a new model-call error
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
        }
    }

    /// Add provider context
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Check if this error aborts the call chain
    pub fn is_abort(&self) -> bool {
        self.category.is_abort()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Classifies raw provider failures into routing categories
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from any provider
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();

        // Credit/payment exhaustion aborts the chain, so it is checked first
        if lower.contains("402") || lower.contains("payment") || lower.contains("insufficient") {
            return LlmError::new(ErrorCategory::Credits, message).provider(provider);
        }

        if lower.contains("429")
            || lower.contains("rate limit")
            || lower.contains("too many requests")
        {
            return LlmError::new(ErrorCategory::RateLimit, message).provider(provider);
        }

        if lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
        {
            return LlmError::new(ErrorCategory::Auth, message).provider(provider);
        }

        if lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("unreachable")
        {
            return LlmError::new(ErrorCategory::Network, message).provider(provider);
        }

        if lower.contains("400") || lower.contains("bad request") || lower.contains("malformed") {
            return LlmError::new(ErrorCategory::BadRequest, message).provider(provider);
        }

        if lower.contains("500")
            || lower.contains("502")
            || lower.contains("503")
            || lower.contains("504")
            || lower.contains("overloaded")
            || lower.contains("empty response")
        {
            return LlmError::new(ErrorCategory::Transient, message).provider(provider);
        }

        LlmError::new(ErrorCategory::Unknown, message).provider(provider)
    }

    /// Classify an HTTP status code directly (more accurate than string matching)
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        let category = match status {
            402 => ErrorCategory::Credits,
            429 => ErrorCategory::RateLimit,
            401 | 403 => ErrorCategory::Auth,
            400 => ErrorCategory::BadRequest,
            500..=599 => ErrorCategory::Transient,
            _ => ErrorCategory::Unknown,
        };
        LlmError::new(category, message).provider(provider)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ClauseError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Model Client Errors
    // -------------------------------------------------------------------------
    /// Structured model-call error with category
    #[error("LLM error: {0}")]
    Llm(LlmError),

    /// Simple model API error (use Llm variant for structured errors)
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// Unrecoverable: the request exceeds the affordable token budget or the
    /// provider reports payment required. Fails the job immediately.
    #[error("Insufficient credits: {0}")]
    InsufficientCredits(String),

    /// Structured output could not be parsed or validated within the
    /// configured retry budget
    #[error("Structured output failed after {attempts} attempts: {message}")]
    StructuredParse { attempts: u32, message: String },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Job error: {0}")]
    Job(String),

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },
}

impl From<LlmError> for ClauseError {
    fn from(err: LlmError) -> Self {
        if err.is_abort() {
            ClauseError::InsufficientCredits(err.message)
        } else {
            ClauseError::Llm(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, ClauseError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl ClauseError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a model error from message (convenience wrapper)
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(LlmError::new(ErrorCategory::Unknown, message))
    }

    /// Check whether this error must fail the job without further model calls
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InsufficientCredits(_))
    }
}

// =============================================================================
// Tests
// =============================================================================
