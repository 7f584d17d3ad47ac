use anyhow::{Context as _, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::traits::CompletionService;
use super::types::{GenerationOptions, ResponseFormat, Speaker, Turn};
use crate::constants::HTTP_REQUEST_TIMEOUT_SECS;

/// Completion backend that talks to the Gemini `generateContent` REST API
pub struct GeminiCompletion {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiCompletion {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
                .build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    fn build_request(
        system_instruction: &str,
        history: &[Turn],
        new_message: &str,
        options: &GenerationOptions,
    ) -> GenerateContentRequest {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|turn| Content {
                role: match turn.role {
                    Speaker::User => "user",
                    Speaker::Model => "model",
                }
                .to_string(),
                parts: vec![Part {
                    text: turn.text.clone(),
                }],
            })
            .collect();
        contents.push(Content {
            role: "user".to_string(),
            parts: vec![Part {
                text: new_message.to_string(),
            }],
        });

        let system_instruction = (!system_instruction.trim().is_empty()).then(|| Content {
            role: "system".to_string(),
            parts: vec![Part {
                text: system_instruction.to_string(),
            }],
        });

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: options.temperature,
                top_p: options.top_p,
                top_k: options.top_k,
                max_output_tokens: options.max_output_tokens,
                response_mime_type: match options.response_format {
                    ResponseFormat::Text => "text/plain",
                    ResponseFormat::Json => "application/json",
                }
                .to_string(),
            },
        }
    }
}

#[async_trait]
impl CompletionService for GeminiCompletion {
    async fn complete(
        &self,
        system_instruction: &str,
        history: &[Turn],
        new_message: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        let body = Self::build_request(system_instruction, history, new_message, options);
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach Gemini API for model {}", self.model))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, error_text);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        extract_text(parsed)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .context("Gemini returned no candidates")?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        anyhow::bail!(
            "Gemini returned an empty candidate (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        );
    }
    Ok(text)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}
