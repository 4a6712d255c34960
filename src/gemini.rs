//! Minimal Gemini REST client.
//!
//! Covers the two endpoints the annotators need: `models/*:embedContent`
//! for embedding vectors and `models/*:generateContent` for short textual
//! replies. Responses are parsed strictly — a reply with a missing or
//! unexpected shape is an error, never a best-effort guess.
//!
//! Each call is a single attempt with a configured timeout. A transient
//! failure fails the chunk being annotated; the chunk is picked up again on
//! the next pipeline invocation because its annotation key is still absent.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    /// Build a client from the `GOOGLE_API_KEY` environment variable.
    /// A missing key is a fatal startup error.
    pub fn from_env(timeout_secs: u64) -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| anyhow::anyhow!("GOOGLE_API_KEY environment variable not set"))?;
        Self::new(api_key, DEFAULT_BASE_URL, timeout_secs)
    }

    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Embed a document chunk. `title` labels the payload for retrieval
    /// models that use it.
    pub async fn embed_content(&self, model: &str, text: &str, title: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "content": { "parts": [ { "text": text } ] },
            "taskType": "RETRIEVAL_DOCUMENT",
            "title": title,
        });

        let url = format!("{}/models/{}:embedContent", self.base_url, model);
        let json = self.post(&url, &body).await?;
        parse_embed_response(&json)
    }

    /// Generate a short textual reply to a prompt, optionally under a
    /// system instruction.
    pub async fn generate_content(
        &self,
        model: &str,
        system_instruction: Option<&str>,
        prompt: &str,
    ) -> Result<String> {
        let mut body = serde_json::json!({
            "contents": [ { "parts": [ { "text": prompt } ] } ],
        });
        if let Some(system) = system_instruction {
            body["systemInstruction"] = serde_json::json!({ "parts": [ { "text": system } ] });
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let json = self.post(&url, &body).await?;
        parse_generate_response(&json)
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Gemini API error {}: {}", status, body_text);
        }

        response
            .json()
            .await
            .context("Gemini response was not valid JSON")
    }
}

/// Extract `embedding.values` as a float vector.
fn parse_embed_response(json: &Value) -> Result<Vec<f32>> {
    let values = json
        .get("embedding")
        .and_then(|e| e.get("values"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid embed response: missing embedding.values"))?;

    let mut vec = Vec::with_capacity(values.len());
    for value in values {
        let f = value
            .as_f64()
            .ok_or_else(|| anyhow::anyhow!("Invalid embed response: non-numeric value"))?;
        vec.push(f as f32);
    }

    Ok(vec)
}

/// Extract the text of the first candidate's first part.
fn parse_generate_response(json: &Value) -> Result<String> {
    let text = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .and_then(|p| p.first())
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid generate response: missing candidate text"))?;

    Ok(text.to_string())
}
