use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::llm::{CLASSIFY_TOOL_NAME, SYSTEM_PROMPT, build_classify_prompt, classify_tool_schema};
use crate::llm::{ClassifyRequest, Classifier};
use crate::models::Verdict;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// Configuration for the Anthropic API client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key (from ANTHROPIC_API_KEY env var)
    pub api_key: String,
    /// Model to use
    pub model: String,
    /// Temperature (0-1, lower = more deterministic)
    pub temperature: f64,
    /// Maximum tokens in response
    pub max_tokens: u32,
}

impl AnthropicConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set")?;

        Ok(Self::new(api_key, "claude-sonnet-4-20250514".to_string()))
    }

    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            temperature: 0.0,
            max_tokens: 256,
        }
    }
}

/// Anthropic API client
pub struct AnthropicClient {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send a message forcing a single tool call and return that tool's input
    pub async fn send_with_tool(
        &self,
        system: &str,
        user: &str,
        tool_name: &str,
        tool_description: &str,
        input_schema: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let request = AnthropicToolRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            system: Some(system.to_string()),
            messages: vec![Message {
                role: "user".to_string(),
                content: user.to_string(),
            }],
            tools: vec![Tool {
                name: tool_name.to_string(),
                description: tool_description.to_string(),
                input_schema,
            }],
            tool_choice: Some(ToolChoice {
                choice_type: "tool".to_string(),
                name: tool_name.to_string(),
            }),
        };

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic API error: {} - {}", status, body);
        }

        let response: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic API response")?;

        extract_tool_input(response, tool_name)
    }
}

#[async_trait::async_trait]
impl Classifier for AnthropicClient {
    async fn classify(&self, request: &ClassifyRequest<'_>) -> Result<Verdict> {
        let prompt =
            build_classify_prompt(request.utterance, request.templates, request.pending_question);

        let input = self
            .send_with_tool(
                SYSTEM_PROMPT,
                &prompt,
                CLASSIFY_TOOL_NAME,
                "Report whether the utterance is a template question and whether it answers the previous question",
                classify_tool_schema(),
            )
            .await?;

        serde_json::from_value(input).context("Failed to parse tool input as Verdict")
    }
}

/// Find the named tool_use block in a response
fn extract_tool_input(response: AnthropicResponse, tool_name: &str) -> Result<serde_json::Value> {
    response
        .content
        .into_iter()
        .find(|c| c.content_type == "tool_use" && c.name.as_deref() == Some(tool_name))
        .and_then(|c| c.input)
        .context("No tool_use response found")
}

#[derive(Debug, Serialize)]
struct AnthropicToolRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct Tool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ToolChoice {
    #[serde(rename = "type")]
    choice_type: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    input: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tool_input() {
        let response: AnthropicResponse = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "text", "text": "Labelling now."},
                    {"type": "tool_use", "name": "classify_utterance", "input": {"is_question": true, "is_answer": false}}
                ]
            }"#,
        )
        .unwrap();

        let input = extract_tool_input(response, CLASSIFY_TOOL_NAME).unwrap();
        let verdict: Verdict = serde_json::from_value(input).unwrap();
        assert_eq!(verdict, Verdict::question());
    }

    #[test]
    fn test_missing_tool_block_is_an_error() {
        let response: AnthropicResponse =
            serde_json::from_str(r#"{"content": [{"type": "text", "text": "no tool"}]}"#).unwrap();
        assert!(extract_tool_input(response, CLASSIFY_TOOL_NAME).is_err());
    }

    #[test]
    fn test_tool_request_serialization() {
        let request = AnthropicToolRequest {
            model: "m".to_string(),
            max_tokens: 10,
            temperature: None,
            system: None,
            messages: vec![],
            tools: vec![],
            tool_choice: Some(ToolChoice {
                choice_type: "tool".to_string(),
                name: CLASSIFY_TOOL_NAME.to_string(),
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json["tool_choice"]["type"], "tool");
    }
}
