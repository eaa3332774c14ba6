//! OpenAI-compatible chat completions client (`OpenRouter` by default)

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatModel, ModelResponse, Role, ToolCall, ToolDefinition, Turn};
use crate::{Error, Result};

/// Connection and sampling settings for the chat endpoint
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// API base, e.g. `https://openrouter.ai/api/v1`
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound on a single inference round-trip
    pub timeout: Duration,
    /// System instructions prepended to every request
    pub instructions: String,
}

/// Chat completions client
pub struct OpenRouterClient {
    client: reqwest::Client,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is empty
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(Error::Config("LLM base URL required".to_string()));
        }
        if config.api_key.as_deref().is_none_or(str::is_empty) {
            tracing::warn!(base_url = %config.base_url, "no LLM API key configured");
        }

        Ok(Self {
            client: reqwest::Client::new(),
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn build_request<'a>(
        &'a self,
        history: &'a [Turn],
        tools: &[ToolDefinition],
    ) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !self.config.instructions.is_empty() {
            messages.push(WireMessage {
                role: "system",
                content: Some(self.config.instructions.as_str()),
                tool_calls: None,
                tool_call_id: None,
                name: None,
            });
        }
        messages.extend(history.iter().map(WireMessage::from_turn));

        let tools: Vec<serde_json::Value> = tools.iter().map(ToolDefinition::to_wire).collect();
        let tool_choice = if tools.is_empty() { None } else { Some("auto") };

        ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            tools: if tools.is_empty() { None } else { Some(tools) },
            tool_choice,
        }
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<ModelResponse> {
        let mut builder = self.client.post(self.endpoint()).json(request);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Inference(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!("chat endpoint error {status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Inference(format!("failed to read response: {e}")))?;

        parse_response(&body)
    }
}

#[async_trait]
impl ChatModel for OpenRouterClient {
    async fn complete(&self, history: &[Turn], tools: &[ToolDefinition]) -> Result<ModelResponse> {
        let request = self.build_request(history, tools);

        tracing::debug!(
            model = %self.config.model,
            turns = history.len(),
            tools = tools.len(),
            "chat completion request"
        );

        tokio::time::timeout(self.config.timeout, self.send(&request))
            .await
            .map_err(|_| {
                Error::Inference(format!(
                    "chat completion timed out after {}s",
                    self.config.timeout.as_secs()
                ))
            })?
    }
}

/// Decode a chat completions body into a [`ModelResponse`]
fn parse_response(body: &str) -> Result<ModelResponse> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| Error::Inference(format!("malformed chat response: {e}")))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::Inference("chat response had no choices".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCall {
            id: tc.id,
            name: tc.function.name,
            arguments: tc.function.arguments.unwrap_or_else(|| "{}".to_string()),
        })
        .collect();

    Ok(ModelResponse {
        text: choice.message.content.unwrap_or_default(),
        tool_calls,
    })
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    /// `null` for assistant turns that only carry tool calls
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl<'a> WireMessage<'a> {
    fn from_turn(turn: &'a Turn) -> Self {
        let tool_calls = (!turn.tool_calls.is_empty()).then(|| {
            turn.tool_calls
                .iter()
                .map(|tc| WireToolCall {
                    id: &tc.id,
                    kind: "function",
                    function: WireFunction {
                        name: &tc.name,
                        arguments: &tc.arguments,
                    },
                })
                .collect()
        });

        let content = if turn.role == Role::Assistant
            && turn.content.is_empty()
            && tool_calls.is_some()
        {
            None
        } else {
            Some(turn.content.as_str())
        };

        Self {
            role: turn.role.as_str(),
            content,
            tool_calls,
            tool_call_id: turn.tool_call_id.as_deref(),
            name: turn.name.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct WireToolCall<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Deserialize)]
struct ResponseToolCall {
    /// Some providers omit it; the agent assigns one before execution
    #[serde(default)]
    id: String,
    function: ResponseFunction,
}

#[derive(Deserialize)]
struct ResponseFunction {
    name: String,
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenRouterClient {
        OpenRouterClient::new(OpenRouterConfig {
            base_url: "https://openrouter.ai/api/v1/".to_string(),
            api_key: Some("sk-test".to_string()),
            model: "meta-llama/llama-3.2-3b-instruct:free".to_string(),
            max_tokens: 300,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
            instructions: "Be brief.".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        assert_eq!(
            client().endpoint(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn request_carries_system_history_and_tools() {
        let client = client();
        let call = ToolCall::new("call_1", "search_contact", r#"{"name":"Ada"}"#);
        let history = vec![
            Turn::user("Who is Ada?"),
            Turn::assistant_tool_calls("", vec![call.clone()]),
            Turn::tool(&call, "Contact: Ada (ID: 1)"),
        ];
        let tools = vec![ToolDefinition {
            name: "search_contact".to_string(),
            description: "Search".to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {}, "required": []}),
        }];

        let value = serde_json::to_value(client.build_request(&history, &tools)).unwrap();

        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][2]["content"], serde_json::Value::Null);
        assert_eq!(value["messages"][2]["tool_calls"][0]["type"], "function");
        assert_eq!(value["messages"][3]["tool_call_id"], "call_1");
        assert_eq!(value["messages"][3]["name"], "search_contact");
        assert_eq!(value["tools"][0]["function"]["name"], "search_contact");
        assert_eq!(value["tool_choice"], "auto");
    }

    #[test]
    fn request_omits_tools_when_catalog_empty() {
        let client = client();
        let history = vec![Turn::user("hi")];
        let value = serde_json::to_value(client.build_request(&history, &[])).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
    }

    #[test]
    fn parse_response_with_tool_calls() {
        let body = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "add_note_to_contact", "arguments": "{\"contact_name\":\"Ada\",\"note\":\"hi\"}"}
                    }]
                }
            }]
        }"#;

        let response = parse_response(body).unwrap();
        assert!(response.text.is_empty());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].id, "call_9");
        assert_eq!(response.tool_calls[0].name, "add_note_to_contact");
    }

    #[test]
    fn parse_response_tolerates_missing_call_id() {
        let body = r#"{
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [
                        {"type": "function", "function": {"name": "search_contact", "arguments": "{}"}},
                        {"id": "call_2", "type": "function", "function": {"name": "search_contact"}}
                    ]
                }
            }]
        }"#;

        let response = parse_response(body).unwrap();
        assert_eq!(response.tool_calls.len(), 2);
        assert!(response.tool_calls[0].id.is_empty());
        assert_eq!(response.tool_calls[1].id, "call_2");
        assert_eq!(response.tool_calls[1].arguments, "{}");
    }

    #[test]
    fn parse_response_rejects_empty_choices_and_garbage() {
        assert!(matches!(
            parse_response(r#"{"choices": []}"#),
            Err(Error::Inference(_))
        ));
        assert!(matches!(parse_response("<html>"), Err(Error::Inference(_))));
    }
}
