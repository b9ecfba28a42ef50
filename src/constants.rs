//! Global Constants
//!
//! Centralized constants for pipeline tuning.
//! All magic numbers should be defined here with documentation.

/// Semantic chunking constants
pub mod chunking {
    /// Minimum chunk length in characters; shorter spans are dropped
    pub const MIN_CHUNK_LENGTH: usize = 100;

    /// Maximum chunk length in characters; longer spans are truncated
    pub const MAX_CHUNK_LENGTH: usize = 800;

    /// Percentile fraction applied to the consecutive-sentence similarity
    /// array to place breakpoints (0.75 = 75th percentile)
    pub const SIMILARITY_PERCENTILE: f64 = 0.75;

    /// Context window captured before/after each chunk (characters)
    pub const CONTEXT_WINDOW: usize = 50;

    /// Sentences shorter than this many characters are discarded
    pub const MIN_SENTENCE_LENGTH: usize = 20;
}

/// Three-zone retrieval filtering thresholds
pub mod zones {
    /// Below this prototype similarity a chunk is noise (ignored)
    pub const NOISE_THRESHOLD: f64 = 0.44;

    /// At or above this prototype similarity a chunk is a safe-zone candidate
    pub const SAFE_THRESHOLD: f64 = 0.85;

    /// Hard gate on the nearest safe exemplar for the safe zone.
    /// Distinct from SAFE_THRESHOLD: a clause can match the category closely
    /// and still deviate from canonical safe phrasing.
    pub const SAFE_EXEMPLAR_CUTOFF: f64 = 0.90;
}

/// Model client constants
pub mod llm {
    /// Pre-flight token budget (estimated prompt tokens + max_tokens)
    pub const DEFAULT_AFFORDABLE_TOKENS: u64 = 10_000;

    /// Per-call request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Delay before moving on after a rate-limit response (seconds)
    pub const DEFAULT_RETRY_DELAY_SECS: u64 = 1;

    /// Maximum structured-output parse/validation retries
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Default max_tokens for completions
    pub const DEFAULT_MAX_TOKENS: u32 = 800;

    /// Characters-per-token divisor for the pre-flight estimate
    pub const CHARS_PER_TOKEN: u64 = 3;

    /// Primary provider defaults (OpenAI-compatible)
    pub const PRIMARY_BASE_URL: &str = "https://api.groq.com/openai/v1";
    pub const PRIMARY_API_KEY_ENV: &str = "GROQ_API_KEY";

    /// Fallback provider defaults (OpenAI-compatible)
    pub const FALLBACK_BASE_URL: &str = "https://openrouter.ai/api/v1";
    pub const FALLBACK_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
}

/// Reference corpus constants
pub mod corpus {
    /// The closed set of risk categories the detector recognizes
    pub const TARGET_CATEGORIES: &[&str] = &[
        "Unilateral Termination",
        "Unlimited Liability",
        "Non-Compete",
    ];

    /// One seed prototype document per target category, used to
    /// auto-initialize an empty prototype collection
    pub const PROTOTYPE_SEEDS: &[(&str, &str)] = &[
        (
            "Unilateral Termination",
            "Contract termination clauses. Covers ending agreement, notice periods, \
             termination rights, cancellation. Keywords: terminate, cancel, end, notice.",
        ),
        (
            "Unlimited Liability",
            "Liability clauses without caps. Covers unlimited exposure, uncapped damages, \
             indemnification without limits. Keywords: unlimited, uncapped, liable for all.",
        ),
        (
            "Non-Compete",
            "Post-contract competitive restrictions. Covers non-compete, customer \
             solicitation, restrictive covenants. Keywords: compete, solicit, restrictive.",
        ),
    ];

    /// Default vector store location
    pub const DEFAULT_DB_PATH: &str = "./corpus/gold.db";
}

/// Document processing constants
pub mod document {
    /// Aggregate extracted text shorter than this is treated as scanned
    pub const SCANNED_TEXT_THRESHOLD: usize = 100;

    /// Secondary extractor wins when its page text reaches this fraction
    /// of the primary extractor's length
    pub const SECONDARY_LENGTH_RATIO: f64 = 0.9;

    /// Sentinel emitted when the OCR path cannot recover any text
    pub const OCR_FAILED_SENTINEL: &str =
        "OCR FAILED: Could not extract text from this document.";

    /// Header region scanned for parties and effective date (characters)
    pub const HEADER_REGION: usize = 2000;

    /// Region scanned for contract-type keyword voting (characters)
    pub const TYPE_REGION: usize = 3000;

    /// Maximum mentioned amounts kept in metadata
    pub const MAX_AMOUNTS: usize = 5;

    /// Maximum parties kept in metadata
    pub const MAX_PARTIES: usize = 2;
}

/// Compound risk detection constants
pub mod compound {
    /// A dangerous category co-occurrence
    pub struct DangerousPattern {
        pub categories: [&'static str; 2],
        pub risk_type: &'static str,
        pub description: &'static str,
    }

    /// Fixed catalog of dangerous category co-occurrences
    pub const DANGEROUS_PATTERNS: &[DangerousPattern] = &[
        DangerousPattern {
            categories: ["Unilateral Termination", "Unlimited Liability"],
            risk_type: "Termination + Unlimited Liability",
            description:
                "Vendor can terminate at will while maintaining unlimited liability claims",
        },
        DangerousPattern {
            categories: ["Unilateral Termination", "Non-Compete"],
            risk_type: "Termination + Non-Compete Lock-in",
            description:
                "Vendor can terminate while non-compete prevents working elsewhere",
        },
        DangerousPattern {
            categories: ["Unlimited Liability", "Non-Compete"],
            risk_type: "Unlimited Liability + Restricted Exit",
            description: "Unlimited exposure with no ability to work for competitors",
        },
    ];

    /// Score boost applied to pattern-pass combinations
    pub const PATTERN_SCORE_BOOST: u32 = 15;

    /// Score boost applied to severity-escalation combinations
    pub const ESCALATION_SCORE_BOOST: u32 = 10;

    /// Per-clause score floor for the severity-escalation pass
    pub const ESCALATION_MIN_SCORE: u32 = 70;

    /// Per-clause score floor for the synthesis pass
    pub const SYNTHESIS_MIN_SCORE: u32 = 50;
}

/// Pipeline gating constants
pub mod pipeline {
    /// Minimum final risk score for a clause to reach the report
    pub const REPORT_SCORE_FLOOR: u32 = 50;
}
