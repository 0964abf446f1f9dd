//! OpenAI-compatible chat-completions provider
//!
//! Covers the Mistral and OpenRouter endpoints, which differ only in base
//! URL and default model. Tool invocations arrive as `tool_calls` entries
//! whose arguments are a serialized JSON string; tool results go back as
//! `role: "tool"` messages referencing the invocation id.

use crate::error::{HermesError, Result};
use crate::llm::{ChatProvider, ChatReply};
use crate::mcp::ToolDescriptor;
use crate::session::transcript::{ConversationEntry, Role, ToolInvocation, Transcript};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// Provider speaking the OpenAI chat-completions schema
pub struct OpenAiCompatProvider {
    http: reqwest::Client,
    label: &'static str,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

impl OpenAiCompatProvider {
    /// Mistral's chat-completions endpoint
    pub fn mistral(api_key: String, model: Option<String>) -> Self {
        Self::custom(
            "mistral",
            "https://api.mistral.ai/v1",
            api_key,
            model.unwrap_or_else(|| "mistral-large-latest".to_string()),
        )
    }

    /// OpenRouter's chat-completions endpoint
    pub fn openrouter(api_key: String, model: Option<String>) -> Self {
        Self::custom(
            "openrouter",
            "https://openrouter.ai/api/v1",
            api_key,
            model.unwrap_or_else(|| "openai/gpt-4o-mini".to_string()),
        )
    }

    /// Any OpenAI-compatible endpoint
    pub fn custom(
        label: &'static str,
        base_url: impl Into<String>,
        api_key: String,
        model: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            label,
            base_url: base_url.into(),
            api_key,
            model,
        }
    }

    fn wire_messages(transcript: &Transcript) -> Vec<WireMessage> {
        transcript.entries().iter().map(Self::wire_message).collect()
    }

    fn wire_message(entry: &ConversationEntry) -> WireMessage {
        match entry.role {
            Role::System => WireMessage {
                role: "system",
                content: Some(entry.content.clone()),
                tool_calls: Vec::new(),
                tool_call_id: None,
            },
            Role::User => WireMessage {
                role: "user",
                content: Some(entry.content.clone()),
                tool_calls: Vec::new(),
                tool_call_id: None,
            },
            Role::Assistant => WireMessage {
                role: "assistant",
                // Content must be absent, not empty, on pure tool-call turns
                content: (!entry.content.is_empty()).then(|| entry.content.clone()),
                tool_calls: entry
                    .tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.id.clone(),
                        kind: "function".to_string(),
                        function: WireFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    })
                    .collect(),
                tool_call_id: None,
            },
            Role::Tool => WireMessage {
                role: "tool",
                content: Some(entry.content.clone()),
                tool_calls: Vec::new(),
                tool_call_id: entry.tool_call_id.clone(),
            },
        }
    }

    fn wire_tool(tool: &ToolDescriptor) -> Value {
        let parameters = if tool.input_schema.is_null() {
            json!({"type": "object", "properties": {}})
        } else {
            tool.input_schema.clone()
        };
        json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": parameters,
            }
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    fn name(&self) -> &'static str {
        self.label
    }

    async fn complete(
        &self,
        transcript: &Transcript,
        tools: &[ToolDescriptor],
    ) -> Result<ChatReply> {
        let request = ChatRequest {
            model: &self.model,
            messages: Self::wire_messages(transcript),
            tools: (!tools.is_empty()).then(|| tools.iter().map(Self::wire_tool).collect()),
        };

        debug!(provider = self.label, model = %self.model, "requesting completion");
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HermesError::Transport(format!(
                "{} API returned {}: {}",
                self.label,
                status,
                body.chars().take(300).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| {
                HermesError::Transport(format!("{} API returned no choices", self.label))
            })?;

        Ok(ChatReply {
            text: message.content.unwrap_or_default(),
            tool_calls: message
                .tool_calls
                .into_iter()
                .map(|call| ToolInvocation {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_message_roles() {
        let mut transcript = Transcript::new(Some("be helpful"));
        transcript.push_user("hello");
        let call = ToolInvocation {
            id: "call-7".to_string(),
            name: "search".to_string(),
            arguments: r#"{"query":"x"}"#.to_string(),
        };
        transcript.push_assistant("", vec![call.clone()]);
        transcript.push_tool_result(&call, "found it");

        let messages = OpenAiCompatProvider::wire_messages(&transcript);
        let encoded = serde_json::to_value(&messages).unwrap();

        assert_eq!(encoded[0]["role"], "system");
        assert_eq!(encoded[1]["role"], "user");
        assert_eq!(encoded[2]["role"], "assistant");
        // Empty assistant content is omitted on pure tool-call turns
        assert!(encoded[2].get("content").is_none());
        assert_eq!(encoded[2]["tool_calls"][0]["id"], "call-7");
        assert_eq!(encoded[2]["tool_calls"][0]["function"]["name"], "search");
        assert_eq!(encoded[3]["role"], "tool");
        assert_eq!(encoded[3]["tool_call_id"], "call-7");
        assert_eq!(encoded[3]["content"], "found it");
    }

    #[test]
    fn test_wire_tool_schema_default() {
        let tool = ToolDescriptor {
            name: "ping".to_string(),
            description: String::new(),
            input_schema: Value::Null,
        };
        let wire = OpenAiCompatProvider::wire_tool(&tool);
        assert_eq!(wire["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_response_parsing_with_tool_calls() {
        let raw = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call-1",
                        "type": "function",
                        "function": {"name": "search", "arguments": "{\"q\":\"a\"}"}
                    }]
                }
            }]
        });

        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        let message = &parsed.choices[0].message;
        assert!(message.content.is_none());
        assert_eq!(message.tool_calls[0].function.name, "search");
    }
}
