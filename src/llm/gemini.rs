//! Gemini generateContent provider
//!
//! Gemini speaks its own schema: roles are "user"/"model", tool calls are
//! `functionCall` parts with structured args (no invocation id on the
//! wire), and tool results go back as `functionResponse` parts keyed by
//! function name. Invocation ids are synthesized locally so the transcript
//! keeps its back-references.

use crate::error::{HermesError, Result};
use crate::llm::{ChatProvider, ChatReply};
use crate::mcp::ToolDescriptor;
use crate::session::transcript::{Role, ToolInvocation, Transcript};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Provider speaking the Gemini generateContent schema
pub struct GeminiProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: model.unwrap_or_else(|| "gemini-2.0-flash".to_string()),
        }
    }

    /// Point at a different endpoint (mock servers in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Assemble the generateContent request body from the transcript.
    ///
    /// System entries become the systemInstruction; tool results are sent
    /// as user-role functionResponse parts keyed by tool name.
    fn request_body(transcript: &Transcript, tools: &[ToolDescriptor]) -> Value {
        let mut body = Map::new();
        let mut contents = Vec::new();

        for entry in transcript.entries() {
            match entry.role {
                Role::System => {
                    body.insert(
                        "systemInstruction".to_string(),
                        json!({"parts": [{"text": entry.content}]}),
                    );
                }
                Role::User => {
                    contents.push(json!({
                        "role": "user",
                        "parts": [{"text": entry.content}],
                    }));
                }
                Role::Assistant => {
                    let mut parts = Vec::new();
                    if !entry.content.is_empty() {
                        parts.push(json!({"text": entry.content}));
                    }
                    for call in &entry.tool_calls {
                        let args: Value =
                            serde_json::from_str(&call.arguments).unwrap_or_else(|_| json!({}));
                        parts.push(json!({
                            "functionCall": {"name": call.name, "args": args},
                        }));
                    }
                    contents.push(json!({"role": "model", "parts": parts}));
                }
                Role::Tool => {
                    let name = entry.tool_name.clone().unwrap_or_default();
                    contents.push(json!({
                        "role": "user",
                        "parts": [{
                            "functionResponse": {
                                "name": name,
                                "response": {"content": entry.content},
                            }
                        }],
                    }));
                }
            }
        }

        body.insert("contents".to_string(), Value::Array(contents));
        if !tools.is_empty() {
            let declarations: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": sanitize_schema(&tool.input_schema),
                    })
                })
                .collect();
            body.insert(
                "tools".to_string(),
                json!([{"functionDeclarations": declarations}]),
            );
        }
        Value::Object(body)
    }

    /// Collect text and functionCall parts from the first candidate.
    ///
    /// Gemini assigns no invocation ids; they are synthesized from the
    /// function name and part position so transcript back-references stay
    /// deterministic.
    fn parse_reply(result: &Value) -> ChatReply {
        let mut reply = ChatReply::default();

        let Some(parts) = result
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
        else {
            return reply;
        };

        for (index, part) in parts.iter().enumerate() {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                if !reply.text.is_empty() {
                    reply.text.push('\n');
                }
                reply.text.push_str(text);
            }
            if let Some(call) = part.get("functionCall") {
                let name = call
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
                reply.tool_calls.push(ToolInvocation {
                    id: format!("{name}-{index}"),
                    name,
                    arguments: args.to_string(),
                });
            }
        }
        reply
    }
}

/// Strip JSON-Schema keywords the Gemini API rejects
fn sanitize_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .iter()
                .filter(|(key, _)| key.as_str() != "additionalProperties" && key.as_str() != "$schema")
                .map(|(key, value)| (key.clone(), sanitize_schema(value)))
                .collect();
            Value::Object(cleaned)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_schema).collect()),
        Value::Null => json!({"type": "object", "properties": {}}),
        other => other.clone(),
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(
        &self,
        transcript: &Transcript,
        tools: &[ToolDescriptor],
    ) -> Result<ChatReply> {
        let body = Self::request_body(transcript, tools);

        debug!(model = %self.model, "requesting completion");
        let response = self
            .http
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(HermesError::Transport(format!(
                "gemini API returned {}: {}",
                status,
                text.chars().take(300).collect::<String>()
            )));
        }

        let result: Value = response.json().await?;
        Ok(Self::parse_reply(&result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_roles_and_system() {
        let mut transcript = Transcript::new(Some("terse answers"));
        transcript.push_user("list pages");
        let call = ToolInvocation {
            id: "search-0".to_string(),
            name: "search".to_string(),
            arguments: r#"{"query":"pages"}"#.to_string(),
        };
        transcript.push_assistant("", vec![call.clone()]);
        transcript.push_tool_result(&call, "two pages");

        let body = GeminiProvider::request_body(&transcript, &[]);

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "terse answers"
        );
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(
            contents[1]["parts"][0]["functionCall"]["args"]["query"],
            "pages"
        );
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"]["name"],
            "search"
        );
    }

    #[test]
    fn test_request_body_declares_tools() {
        let transcript = Transcript::new(None);
        let tools = vec![ToolDescriptor {
            name: "search".to_string(),
            description: "find things".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "additionalProperties": false
            }),
        }];

        let body = GeminiProvider::request_body(&transcript, &tools);
        let declaration = &body["tools"][0]["functionDeclarations"][0];
        assert_eq!(declaration["name"], "search");
        assert!(declaration["parameters"]
            .get("additionalProperties")
            .is_none());
    }

    #[test]
    fn test_parse_reply_with_function_calls() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "let me look"},
                        {"functionCall": {"name": "search", "args": {"query": "x"}}}
                    ]
                }
            }]
        });

        let reply = GeminiProvider::parse_reply(&raw);
        assert_eq!(reply.text, "let me look");
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].name, "search");
        assert_eq!(reply.tool_calls[0].id, "search-1");
        assert_eq!(reply.tool_calls[0].arguments, r#"{"query":"x"}"#);
    }

    #[test]
    fn test_parse_reply_empty_candidates() {
        let reply = GeminiProvider::parse_reply(&json!({}));
        assert!(reply.text.is_empty());
        assert!(reply.tool_calls.is_empty());
    }
}
