use anyhow::{Context as _, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::traits::CompletionService;
use super::types::{GenerationOptions, ResponseFormat, Speaker, Turn};
use crate::constants::HTTP_REQUEST_TIMEOUT_SECS;

/// Completion backend for any OpenAI-compatible chat endpoint (e.g. a LiteLLM proxy)
pub struct OpenAiCompatibleCompletion {
    client: Client,
    base_url: String,
    model_name: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleCompletion {
    pub fn new(
        base_url: impl Into<String>,
        model_name: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
                .build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model_name: model_name.into(),
            api_key,
        })
    }

    fn build_body(
        &self,
        system_instruction: &str,
        history: &[Turn],
        new_message: &str,
        options: &GenerationOptions,
    ) -> serde_json::Value {
        let mut messages = Vec::with_capacity(history.len() + 2);

        if !system_instruction.trim().is_empty() {
            messages.push(json!({
                "role": "system",
                "content": system_instruction
            }));
        }

        for turn in history {
            let role = match turn.role {
                Speaker::User => "user",
                Speaker::Model => "assistant",
            };
            messages.push(json!({
                "role": role,
                "content": turn.text
            }));
        }

        messages.push(json!({
            "role": "user",
            "content": new_message
        }));

        let mut body = json!({
            "model": self.model_name,
            "messages": messages,
            "stream": false,
            "temperature": options.temperature,
            "top_p": options.top_p,
            "max_tokens": options.max_output_tokens,
        });

        if options.response_format == ResponseFormat::Json {
            body["response_format"] = json!({ "type": "json_object" });
        }

        body
    }
}

#[async_trait]
impl CompletionService for OpenAiCompatibleCompletion {
    async fn complete(
        &self,
        system_instruction: &str,
        history: &[Turn],
        new_message: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        let body = self.build_body(system_instruction, history, new_message, options);
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to connect to completion endpoint at {}", self.base_url))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Completion endpoint error: {}", error_text);
        }

        let response_json: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse completion response")?;

        response_json
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .context("Completion endpoint returned no content")
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

// Response structures (OpenAI format)

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_turns_become_assistant_messages() {
        let backend =
            OpenAiCompatibleCompletion::new("http://localhost:4000/", "gemini/gemini-1.5-flash", None)
                .unwrap();
        let history = vec![Turn::user(""), Turn::model("Namaste", None)];
        let body = backend.build_body(
            "persona",
            &history,
            "Who built Meenakshi temple?",
            &GenerationOptions::default(),
        );

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["content"], "Who built Meenakshi temple?");
        assert!(body.get("response_format").is_none());
        assert_eq!(backend.base_url, "http://localhost:4000");
    }

    #[test]
    fn test_json_format_requests_json_object() {
        let backend = OpenAiCompatibleCompletion::new("http://proxy", "m", None).unwrap();
        let body = backend.build_body("", &[], "quiz", &GenerationOptions::default().json());
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }
}
