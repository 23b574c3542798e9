use super::BatchTranscriber;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

/// Batch transcription over the hosted REST API
pub struct OpenAiBatch {
    client: Client,
    base_url: String,
}

impl OpenAiBatch {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl BatchTranscriber for OpenAiBatch {
    async fn transcribe(&self, audio: Vec<u8>, model: &str, credential: &str) -> Result<String> {
        info!(
            "Sending {} bytes to the batch transcription API (model {})",
            audio.len(),
            model
        );

        let part = reqwest::multipart::Part::bytes(audio)
            .file_name("audio.wav")
            .mime_str("audio/wav")?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", model.to_string());

        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {credential}"))
            .multipart(form)
            .send()
            .await
            .context("failed to send transcription request")?;

        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("transcription API error: {detail}");
        }

        let json: serde_json::Value = response.json().await?;
        Ok(json["text"].as_str().unwrap_or_default().to_string())
    }
}
