use crate::{types::*, utils, ChatClient, StreamingCallback, StreamingChunk};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Environment variable holding the API credential
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const MAX_RETRIES: u32 = 3;

/// Matches the output cap the coaching prompt was tuned for
const MAX_OUTPUT_TOKENS: usize = 1000;

#[derive(Debug, Serialize)]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    contents: Vec<GeminiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Parts,
}

#[derive(Debug, Serialize)]
struct Parts {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    max_output_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeminiMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

impl GeminiMessage {
    fn user(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![GeminiPart::text(text)],
        }
    }

    fn model(text: &str) -> Self {
        Self {
            role: Some("model".to_string()),
            parts: vec![GeminiPart::text(text)],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<GeminiInlineData>,
}

impl GeminiPart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiInlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeminiCandidate {
    pub content: Option<GeminiMessage>,
    #[serde(rename = "finishReason")]
    #[allow(dead_code)]
    pub finish_reason: Option<String>,
}

/// Rate limit information extracted from response headers
#[derive(Debug)]
pub(crate) struct GeminiRateLimitInfo {
    requests_remaining: Option<u32>,
}

impl RateLimitHandler for GeminiRateLimitInfo {
    fn from_response(_response: &Response) -> Self {
        Self {
            requests_remaining: None,
        }
    }

    fn get_retry_delay(&self) -> Duration {
        Duration::from_secs(2)
    }

    fn log_status(&self) {
        debug!(
            "Gemini rate limits - requests remaining: {}",
            self.requests_remaining
                .map_or("unknown".to_string(), |r| r.to_string())
        );
    }
}

/// Chat client against the Gemini generative language API.
///
/// Keeps the conversation history client-side and resends it with every
/// turn, so each instance is an independent, explicitly owned session.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    system_instruction: Option<String>,
    history: Vec<GeminiMessage>,
}

impl GeminiClient {
    pub fn default_base_url() -> String {
        "https://generativelanguage.googleapis.com/v1beta".to_string()
    }

    pub fn default_model() -> String {
        "gemini-1.5-flash".to_string()
    }

    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            base_url,
            system_instruction: None,
            history: Vec::new(),
        }
    }

    /// Create a client with the credential from the process environment.
    /// A missing key is fatal here: nothing in this client works without it.
    pub fn from_env(model: String, base_url: String) -> Result<Self, ClientError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(ClientError::MissingApiKey(API_KEY_ENV))?;
        Ok(Self::new(api_key, model, base_url))
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Number of turns (user + model entries) accumulated so far
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn get_url(&self, streaming: bool) -> String {
        if streaming {
            format!(
                "{}/models/{}:streamGenerateContent",
                self.base_url, self.model
            )
        } else {
            format!("{}/models/{}:generateContent", self.base_url, self.model)
        }
    }

    fn build_request(&self) -> GeminiRequest {
        GeminiRequest {
            system_instruction: self.system_instruction.as_ref().map(|text| {
                SystemInstruction {
                    parts: Parts { text: text.clone() },
                }
            }),
            contents: self.history.clone(),
            generation_config: Some(GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
            }),
        }
    }

    async fn send_internal(
        &mut self,
        text: &str,
        streaming_callback: Option<&StreamingCallback>,
    ) -> Result<String> {
        self.history.push(GeminiMessage::user(text));
        let request = self.build_request();

        match self
            .send_with_retry(&request, streaming_callback, MAX_RETRIES)
            .await
        {
            Ok(reply) => {
                self.history.push(GeminiMessage::model(&reply));
                Ok(reply)
            }
            Err(e) => {
                // Drop the pending user turn so a retry does not send it twice
                self.history.pop();
                Err(e)
            }
        }
    }

    async fn send_with_retry(
        &self,
        request: &GeminiRequest,
        streaming_callback: Option<&StreamingCallback>,
        max_retries: u32,
    ) -> Result<String> {
        let mut attempts = 0;

        loop {
            match if let Some(callback) = streaming_callback {
                self.try_send_request_streaming(request, callback).await
            } else {
                self.try_send_request(request).await
            } {
                Ok((reply, rate_limits)) => {
                    rate_limits.log_status();
                    return Ok(reply);
                }
                Err(e) => {
                    if utils::handle_retryable_error::<GeminiRateLimitInfo>(
                        &e,
                        attempts,
                        max_retries,
                    )
                    .await
                    {
                        attempts += 1;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn try_send_request(
        &self,
        request: &GeminiRequest,
    ) -> Result<(String, GeminiRateLimitInfo)> {
        let url = self.get_url(false);

        trace!(
            "Sending Gemini request to {}:\n{}",
            self.model,
            serde_json::to_string_pretty(request)?
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        let response = utils::check_response_error::<GeminiRateLimitInfo>(response).await?;
        let rate_limits = GeminiRateLimitInfo::from_response(&response);

        let response_text = response
            .text()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        let gemini_response: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| ApiError::Unknown(format!("Failed to parse response: {e}")))?;

        Ok((collect_text(&gemini_response), rate_limits))
    }

    async fn try_send_request_streaming(
        &self,
        request: &GeminiRequest,
        streaming_callback: &StreamingCallback,
    ) -> Result<(String, GeminiRateLimitInfo)> {
        let response = self
            .client
            .post(self.get_url(true))
            .query(&[("key", &self.api_key), ("alt", &"sse".to_string())])
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        let mut response = utils::check_response_error::<GeminiRateLimitInfo>(response).await?;
        let rate_limits = GeminiRateLimitInfo::from_response(&response);

        let mut reply = String::new();
        let mut line_buffer = String::new();
        let mut pending: Vec<u8> = Vec::new();

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?
        {
            // Chunk boundaries are arbitrary and can split a multi-byte
            // character, so carry incomplete trailing bytes over to the
            // next chunk instead of failing the turn.
            pending.extend_from_slice(&chunk);
            let chunk_str = take_complete_utf8(&mut pending)?;

            for c in chunk_str.chars() {
                if c == '\n' {
                    if !line_buffer.is_empty() {
                        process_sse_line(&line_buffer, &mut reply, streaming_callback)?;
                        line_buffer.clear();
                    }
                } else {
                    line_buffer.push(c);
                }
            }
        }

        if !pending.is_empty() {
            warn!(
                "Stream ended inside a UTF-8 sequence, dropping {} trailing bytes",
                pending.len()
            );
        }

        // Process any remaining data in the buffer
        if !line_buffer.is_empty() {
            process_sse_line(&line_buffer, &mut reply, streaming_callback)?;
        }

        streaming_callback(&StreamingChunk::StreamingComplete)?;

        Ok((reply, rate_limits))
    }
}

// Split off the longest valid UTF-8 prefix, leaving the bytes of an
// incomplete trailing character in the buffer for the next chunk.
fn take_complete_utf8(pending: &mut Vec<u8>) -> Result<String> {
    let valid = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(e) => {
            return Err(ApiError::Unknown(format!("Invalid UTF-8 in stream: {e}")).into());
        }
    };
    let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
    pending.drain(..valid);
    Ok(text)
}

fn process_sse_line(line: &str, reply: &mut String, callback: &StreamingCallback) -> Result<()> {
    if let Some(data) = line.strip_prefix("data: ") {
        debug!("Received data line: {}", data);
        if let Ok(response) = serde_json::from_str::<GeminiResponse>(data) {
            if let Some(candidate) = response.candidates.first() {
                if let Some(content) = &candidate.content {
                    for part in &content.parts {
                        if let Some(text) = &part.text {
                            reply.push_str(text);
                            callback(&StreamingChunk::Text(text.clone()))?;
                        }
                    }
                }
            }
        } else {
            warn!("Failed to parse Gemini response from data: {}", data);
        }
    } else if line.len() > 1 {
        warn!("Received line without 'data' prefix: {}", line);
    }
    Ok(())
}

fn collect_text(response: &GeminiResponse) -> String {
    let mut text = String::new();
    for candidate in &response.candidates {
        if let Some(content) = &candidate.content {
            for part in &content.parts {
                if let Some(t) = &part.text {
                    text.push_str(t);
                }
            }
        }
    }
    text
}

#[async_trait]
impl ChatClient for GeminiClient {
    async fn send_message(&mut self, text: &str) -> Result<String> {
        self.send_internal(text, None).await
    }

    async fn send_message_stream(
        &mut self,
        text: &str,
        callback: &StreamingCallback,
    ) -> Result<String> {
        self.send_internal(text, Some(callback)).await
    }
}
