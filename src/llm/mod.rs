//! Text-generation providers
//!
//! A provider accepts the transcript plus the MCP tool catalog (converted
//! to its own function-calling schema) and returns a reply that carries
//! plain text, requested tool invocations, or both. The Mistral and
//! OpenRouter endpoints share the OpenAI-compatible wire schema; Gemini
//! has its own.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiCompatProvider;

use crate::config::{ProviderKind, Settings};
use crate::error::Result;
use crate::mcp::ToolDescriptor;
use crate::session::transcript::{ToolInvocation, Transcript};
use async_trait::async_trait;

/// One model reply: final text and/or requested tool invocations
#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    pub text: String,
    pub tool_calls: Vec<ToolInvocation>,
}

/// A text-generation endpoint with function calling
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Short provider label for logs and errors
    fn name(&self) -> &'static str;

    /// Send the transcript and tool catalog, return the model's reply
    async fn complete(
        &self,
        transcript: &Transcript,
        tools: &[ToolDescriptor],
    ) -> Result<ChatReply>;
}

/// Build the provider selected by the settings.
///
/// Fails with a configuration error when the matching API key is missing,
/// before any network activity.
pub fn provider_from_settings(settings: &Settings) -> Result<Box<dyn ChatProvider>> {
    let api_key = settings.api_key()?.to_string();
    let model = settings.model.clone();

    Ok(match settings.provider {
        ProviderKind::Mistral => Box::new(OpenAiCompatProvider::mistral(api_key, model)),
        ProviderKind::Openrouter => Box::new(OpenAiCompatProvider::openrouter(api_key, model)),
        ProviderKind::Gemini => Box::new(GeminiProvider::new(api_key, model)),
    })
}
