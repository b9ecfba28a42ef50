//! Structured Output Protocol
//!
//! Structured output is enforced by prompt discipline, not by API feature:
//! each structured record declares a minimal JSON-schema surface (top-level
//! property types plus the required list) that is embedded in a system
//! message, and the raw response is stripped of markdown fences, parsed,
//! and validated by typed deserialization.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::ai::provider::ChatMessage;
use crate::types::{ClauseError, Result};

/// A record the model client can produce via structured generation.
///
/// `schema()` returns the minimal JSON-schema surface embedded in the
/// prompt; it is a stable contract and must match the serde shape.
pub trait StructuredOutput: DeserializeOwned {
    fn schema() -> Value;
}

/// Build the schema instruction appended to (or inserted as) the system
/// message for a structured call
pub fn schema_instruction(schema: &Value) -> String {
    let schema_text =
        serde_json::to_string_pretty(schema).unwrap_or_else(|_| "{}".to_string());
    format!(
        "CRITICAL: Respond with ONLY a valid JSON object. No explanations, no schema definitions.\n\
         \n\
         Example format:\n\
         {schema_text}\n\
         \n\
         Your response must be ACTUAL DATA matching this structure, not the schema itself."
    )
}

/// Extend the message list with the schema instruction: appended to an
/// existing leading system message, otherwise inserted as one
pub fn with_schema_instruction<T: StructuredOutput>(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    let instruction = schema_instruction(&T::schema());
    let mut enhanced: Vec<ChatMessage> = messages.to_vec();

    match enhanced.first_mut() {
        Some(first) if first.role == "system" => {
            first.content = format!("{}\n\n{}", first.content, instruction);
        }
        _ => enhanced.insert(0, ChatMessage::system(instruction)),
    }

    enhanced
}

/// Strip optional triple-backtick fences and a leading `json` tag
pub fn strip_code_fences(raw: &str) -> &str {
    let mut cleaned = raw.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

/// Parse a raw structured response into `T`.
///
/// Parse and validation failures both surface as `StructuredParse` so the
/// client's bounded retry loop can distinguish them from abort errors.
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> Result<T> {
    let cleaned = strip_code_fences(raw);

    let value: Value = serde_json::from_str(cleaned).map_err(|e| ClauseError::StructuredParse {
        attempts: 1,
        message: format!(
            "invalid JSON ({e}); raw: {}",
            crate::text::snippet(cleaned, 200)
        ),
    })?;

    serde_json::from_value(value).map_err(|e| ClauseError::StructuredParse {
        attempts: 1,
        message: format!("schema validation failed: {e}"),
    })
}
