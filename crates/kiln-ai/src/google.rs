use serde::Deserialize;
use serde_json::{json, Value};

use async_trait::async_trait;

use crate::{ChatRequest, ChatResponse, ChatUsage, KilnAiError, LlmClient, Message, MessageRole};

#[derive(Debug, Clone)]
/// Connection settings for the Gemini `generateContent` endpoint.
pub struct GoogleConfig {
    pub api_base: String,
    pub api_key: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone)]
/// Gemini-backed generation client. One HTTP attempt per call, bounded by the
/// configured request timeout; failures surface as `KilnAiError` for the
/// session runtime's fallback decision.
pub struct GoogleClient {
    client: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig) -> Result<Self, KilnAiError> {
        if config.api_key.trim().is_empty() {
            return Err(KilnAiError::MissingApiKey);
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()?;

        Ok(Self { client, config })
    }

    fn generate_content_url(&self, model: &str) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        format!("{base}/models/{model}:generateContent")
    }
}

#[async_trait]
impl LlmClient for GoogleClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, KilnAiError> {
        let body = build_generate_content_body(&request);
        let url = self.generate_content_url(&request.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(KilnAiError::HttpStatus {
                status: status.as_u16(),
                body: raw,
            });
        }

        parse_generate_content_response(&raw)
    }
}

fn build_generate_content_body(request: &ChatRequest) -> Value {
    let system = extract_system_text(&request.messages);
    let contents = to_google_contents(&request.messages);

    let mut body = json!({
        "contents": contents,
    });

    if !system.is_empty() {
        body["systemInstruction"] = json!({
            "parts": [{ "text": system }],
        });
    }

    if request.temperature.is_some() || request.max_tokens.is_some() {
        let mut generation_config = json!({});
        if let Some(temperature) = request.temperature {
            generation_config["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }
        body["generationConfig"] = generation_config;
    }

    body
}

fn extract_system_text(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|message| message.role == MessageRole::System)
        .map(|message| message.content.as_str())
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn to_google_contents(messages: &[Message]) -> Value {
    Value::Array(
        messages
            .iter()
            .filter_map(|message| {
                let role = match message.role {
                    MessageRole::System => return None,
                    MessageRole::User => "user",
                    MessageRole::Assistant => "model",
                };
                if message.content.trim().is_empty() {
                    return None;
                }
                Some(json!({
                    "role": role,
                    "parts": [{ "text": message.content }],
                }))
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<GenerateContentCandidate>>,
    usage_metadata: Option<GenerateContentUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentCandidate {
    content: Option<GenerateContentContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentContent {
    parts: Option<Vec<GenerateContentPart>>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentUsage {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
}

fn parse_generate_content_response(raw: &str) -> Result<ChatResponse, KilnAiError> {
    let parsed: GenerateContentResponse = serde_json::from_str(raw)?;
    let candidate = parsed
        .candidates
        .and_then(|mut candidates| candidates.drain(..).next())
        .ok_or_else(|| {
            KilnAiError::InvalidResponse("response contained no candidates".to_string())
        })?;

    let parts = candidate
        .content
        .and_then(|content| content.parts)
        .unwrap_or_default();
    let text = parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let usage = parsed
        .usage_metadata
        .map(|usage| ChatUsage {
            input_tokens: usage.prompt_token_count.unwrap_or(0),
            output_tokens: usage.candidates_token_count.unwrap_or(0),
            total_tokens: usage.total_token_count.unwrap_or(0),
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        message: Message::assistant(text),
        finish_reason: candidate.finish_reason,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_routes_system_text_to_system_instruction() {
        let request = ChatRequest {
            model: "gemini-2.0-flash-001".to_string(),
            messages: vec![
                Message::system("be helpful"),
                Message::user("hi"),
                Message::assistant("hello"),
            ],
            max_tokens: None,
            temperature: None,
        };

        let body = build_generate_content_body(&request);
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            json!("be helpful")
        );
        let contents = body["contents"].as_array().expect("contents array");
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0]["role"], json!("user"));
        assert_eq!(contents[1]["role"], json!("model"));
    }

    #[test]
    fn body_skips_blank_turns_and_optional_generation_config() {
        let request = ChatRequest {
            model: "gemini-2.0-flash-001".to_string(),
            messages: vec![Message::user("   "), Message::user("real question")],
            max_tokens: Some(256),
            temperature: Some(0.2),
        };

        let body = build_generate_content_body(&request);
        let contents = body["contents"].as_array().expect("contents array");
        assert_eq!(contents.len(), 1);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], json!(256));
    }

    #[test]
    fn parse_joins_candidate_text_parts() {
        let raw = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "first" }, { "text": "second" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 7, "candidatesTokenCount": 3, "totalTokenCount": 10 }
        })
        .to_string();

        let response = parse_generate_content_response(&raw).expect("parse");
        assert_eq!(response.message.content, "first\nsecond");
        assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(response.usage.total_tokens, 10);
    }

    #[test]
    fn parse_rejects_empty_candidate_list() {
        let raw = json!({ "candidates": [] }).to_string();
        let error = parse_generate_content_response(&raw).expect_err("no candidates");
        assert!(matches!(error, KilnAiError::InvalidResponse(_)));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let error = GoogleClient::new(GoogleConfig {
            api_base: "https://example.invalid/v1beta".to_string(),
            api_key: "  ".to_string(),
            request_timeout_ms: 1_000,
        })
        .expect_err("blank key");
        assert!(matches!(error, KilnAiError::MissingApiKey));
    }
}
