use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::errors::{AIError, ConfigError};

/// Diffs beyond this size are truncated before being sent (50 KB).
const MAX_DIFF_SIZE: usize = 50_000;

/// Represents a chat message with a role and content
///
/// This structure is used for both requests to and responses from AI chat models
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Request body for an OpenAI-compatible /chat/completions endpoint
#[derive(Serialize, Debug, Clone)]
pub struct OpenAIChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

/// Represents a message in the OpenAI API response format
#[derive(Deserialize, Debug, Clone)]
pub struct OpenAIChoice {
    pub message: ChatMessage,
}

/// Response structure from an OpenAI-compatible chat completion API.
/// Compatible providers (DeepSeek and friends) omit some of the decorative
/// fields, so everything beyond `choices` is optional.
#[derive(Deserialize, Debug, Clone)]
pub struct OpenAIChatCompletionResponse {
    pub choices: Vec<OpenAIChoice>,
}

/// DashScope application completion request
#[derive(Serialize, Debug, Clone)]
pub struct DashScopeRequest {
    pub input: DashScopeInput,
    pub parameters: serde_json::Value,
    pub debug: serde_json::Value,
}

#[derive(Serialize, Debug, Clone)]
pub struct DashScopeInput {
    pub prompt: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DashScopeResponse {
    pub output: DashScopeOutput,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct DashScopeOutput {
    #[serde(default)]
    pub text: String,
}

/// The structured review the model is prompted to return.
///
/// All fields default: the model does not always honor the schema, and a
/// partially-filled review is still worth rendering.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ReviewJson {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// A single issue found during review.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Issue {
    /// high, medium or low
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub suggestion: String,
}

/// Result of reviewing one file: the raw model reply plus the best-effort
/// structured parse of it.
#[derive(Debug, Clone)]
pub struct ReviewResult {
    pub file_name: String,
    pub content: String,
    pub review: Option<ReviewJson>,
}

/// AI client dispatching on the configured provider.
#[derive(Debug, Clone)]
pub enum AiClient {
    OpenAi {
        http: reqwest::Client,
        api_key: String,
        base_url: String,
        model: String,
        temperature: f32,
        max_tokens: u32,
    },
    DashScope {
        http: reqwest::Client,
        api_key: String,
        base_url: String,
        app_id: String,
    },
}

impl AiClient {
    /// Builds a client from the configuration's `ai` section.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ConfigError> {
        match cfg.ai.provider.as_str() {
            "openai" | "deepseek" | "custom" => Ok(AiClient::OpenAi {
                http: reqwest::Client::new(),
                api_key: cfg.resolved_api_key(),
                base_url: cfg.ai.base_url.clone(),
                model: cfg.ai.model.clone(),
                temperature: cfg.ai.temperature,
                max_tokens: cfg.ai.max_tokens,
            }),
            "dashscope" => {
                let base_url = if cfg.ai.base_url.is_empty() {
                    "https://dashscope.aliyuncs.com".to_string()
                } else {
                    cfg.ai.base_url.clone()
                };
                Ok(AiClient::DashScope {
                    http: reqwest::Client::new(),
                    api_key: cfg.resolved_api_key(),
                    base_url,
                    app_id: dashscope_app_id(&cfg.ai.model),
                })
            }
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }

    /// Submits one file's diff (or content) for review.
    ///
    /// The reply is parsed as [`ReviewJson`]; when parsing fails the request
    /// is retried once, and a reply that still does not parse is kept as raw
    /// text rather than treated as an error.
    pub async fn review(
        &self,
        file_name: &str,
        diff: &str,
        system_prompt: &str,
    ) -> Result<ReviewResult, AIError> {
        let diff = truncate_diff(diff);
        let user_prompt = format!(
            "File: {}\n\nCode changes:\n```\n{}\n```\n\nPlease review the changes above.",
            file_name, diff
        );

        let mut content = self.request_completion(system_prompt, &user_prompt).await?;
        let mut review = parse_review_json(&content);

        if review.is_none() {
            warn!(
                "Review reply for '{}' did not parse as JSON, retrying once",
                file_name
            );
            match self.request_completion(system_prompt, &user_prompt).await {
                Ok(retry_content) => {
                    if let Some(parsed) = parse_review_json(&retry_content) {
                        content = retry_content;
                        review = Some(parsed);
                    } else {
                        warn!("Retry reply still not valid JSON, keeping raw text");
                    }
                }
                Err(e) => warn!("Retry request failed ({}), keeping first reply", e),
            }
        }

        Ok(ReviewResult {
            file_name: file_name.to_string(),
            content,
            review,
        })
    }

    /// Sends one completion request and returns the cleaned reply text.
    async fn request_completion(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, AIError> {
        match self {
            AiClient::OpenAi {
                http,
                api_key,
                base_url,
                model,
                temperature,
                max_tokens,
            } => {
                let request_payload = OpenAIChatRequest {
                    model: model.clone(),
                    messages: vec![
                        ChatMessage {
                            role: "system".to_string(),
                            content: system_prompt.to_string(),
                        },
                        ChatMessage {
                            role: "user".to_string(),
                            content: user_prompt.to_string(),
                        },
                    ],
                    temperature: Some(*temperature),
                    max_tokens: if *max_tokens > 0 {
                        Some(*max_tokens)
                    } else {
                        None
                    },
                    stream: false,
                };

                let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
                debug!("Sending review request to {}", url);

                let mut request_builder = http.post(&url);
                if !api_key.is_empty() {
                    request_builder = request_builder.bearer_auth(api_key);
                }

                let response = request_builder
                    .json(&request_payload)
                    .send()
                    .await
                    .map_err(AIError::RequestFailed)?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body from AI response".to_string());
                    return Err(AIError::ApiResponseError(status, body));
                }

                let data = response
                    .json::<OpenAIChatCompletionResponse>()
                    .await
                    .map_err(AIError::ResponseParseFailed)?;

                let choice = data.choices.first().ok_or(AIError::NoChoiceInResponse)?;
                if choice.message.content.trim().is_empty() {
                    return Err(AIError::EmptyMessage);
                }
                Ok(clean_model_output(&choice.message.content))
            }
            AiClient::DashScope {
                http,
                api_key,
                base_url,
                app_id,
            } => {
                // DashScope applications take a single prompt string.
                let request_payload = DashScopeRequest {
                    input: DashScopeInput {
                        prompt: format!("{}\n\n{}", system_prompt, user_prompt),
                    },
                    parameters: serde_json::json!({}),
                    debug: serde_json::json!({}),
                };

                let url = format!(
                    "{}/api/v1/apps/{}/completion",
                    base_url.trim_end_matches('/'),
                    app_id
                );
                debug!("Sending review request to {}", url);

                let response = http
                    .post(&url)
                    .bearer_auth(api_key)
                    .json(&request_payload)
                    .send()
                    .await
                    .map_err(AIError::RequestFailed)?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body from AI response".to_string());
                    return Err(AIError::ApiResponseError(status, body));
                }

                let data = response
                    .json::<DashScopeResponse>()
                    .await
                    .map_err(AIError::ResponseParseFailed)?;

                if data.output.text.trim().is_empty() {
                    return Err(AIError::EmptyMessage);
                }
                Ok(clean_model_output(&data.output.text))
            }
        }
    }
}

/// Extracts the DashScope application id from the configured model field.
/// Accepts either `dashscope:<app_id>` or a bare app id.
fn dashscope_app_id(model: &str) -> String {
    model
        .strip_prefix("dashscope:")
        .unwrap_or(model)
        .to_string()
}

// Removes <think>...</think> tags and their content from a given string.
//
// The regex pattern is compiled once using lazy_static since this function
// runs on every reply.
lazy_static! {
    static ref RE_THINK_TAGS: Regex = Regex::new(r"(?s)<think>.*?</think>").unwrap();
}

/// Cleans a model reply: reasoning tags dropped, Markdown code fences peeled.
pub fn clean_model_output(text: &str) -> String {
    let without_think = RE_THINK_TAGS.replace_all(text, "");
    strip_code_fences(without_think.trim()).to_string()
}

/// Strips a surrounding ```json ... ``` (or plain ```) fence, if present.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Best-effort parse of a reply as the structured review schema.
fn parse_review_json(content: &str) -> Option<ReviewJson> {
    serde_json::from_str::<ReviewJson>(content.trim()).ok()
}

/// Truncates an oversized diff at a char boundary and appends a marker.
fn truncate_diff(diff: &str) -> String {
    if diff.len() <= MAX_DIFF_SIZE {
        return diff.to_string();
    }

    let mut end = MAX_DIFF_SIZE;
    while !diff.is_char_boundary(end) {
        end -= 1;
    }

    format!(
        "{}\n\n... (content truncated, original size: {} bytes)",
        &diff[..end],
        diff.len()
    )
}
