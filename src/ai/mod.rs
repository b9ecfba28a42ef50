//! Model Integration Layer
//!
//! Resilient model client, structured-output protocol, and observation
//! spans.

pub mod client;
pub mod observe;
pub mod provider;
pub mod schema;

pub use client::{ClientStats, ModelClient, SharedModelClient};
pub use observe::{SpanStats, TraceSummary, Tracer};
pub use provider::{ChatMessage, ModelType, ProviderEndpoint};
pub use schema::StructuredOutput;
