//! Patchmend-LLM: generative messages API integration for patchmend
//!
//! This crate is the only place that speaks HTTP to the code-generation
//! service. It exposes a narrow [`CompletionApi`] capability so callers can
//! substitute a deterministic double in tests.
//!
//! ## Layers
//!
//! - [`client`]: `reqwest`-backed client and its configuration
//! - [`types`]: wire types for the messages endpoint
//! - [`probe`]: model availability hunt across candidate identifiers

pub mod client;
pub mod error;
pub mod probe;
pub mod types;

use async_trait::async_trait;

pub use client::{AnthropicClient, AnthropicConfig, DEFAULT_MODEL};
pub use error::{ErrorClass, LlmError};
pub use probe::{probe_models, ModelProbe, ProbeReport, ProbeStatus, DEFAULT_CANDIDATES};
pub use types::{ContentBlock, Message, MessageRequest, MessageResponse};

/// Result type for generative service operations
pub type Result<T> = std::result::Result<T, LlmError>;

/// A single-shot text completion capability.
///
/// One call is one outbound request. Retry policy belongs to the caller.
#[async_trait]
pub trait CompletionApi: Send + Sync {
    /// Send `prompt` to `model` and return the concatenated text output.
    async fn complete(&self, model: &str, prompt: &str, max_tokens: u32) -> Result<String>;
}
