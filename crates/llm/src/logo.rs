use crate::gemini::{GeminiMessage, GeminiPart, GeminiRateLimitInfo, GeminiResponse};
use crate::{types::ApiError, utils};
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

const LOGO_MODEL: &str = "gemini-2.5-flash-image";

const LOGO_PROMPT: &str = "A minimalist, modern logo for a fitness app named 'STATUR'. \
The design shows a clear, light blue outline of a human head in profile, looking to the right. \
Inside the head outline is a stylized, powerful muscle symbol (a flexed biceps). \
The line work is clean, thin, and professional (line-art style), suitable for a white app background. \
The logo radiates intelligence, focus, and physical strength. \
High quality, vector style, isolated on white background.";

#[derive(Debug, Serialize)]
struct LogoRequest {
    contents: Vec<GeminiMessage>,
}

/// One-shot image generation for the app logo.
///
/// Purely cosmetic: every failure is logged and swallowed, the caller
/// just gets `None` and renders without a logo.
pub struct LogoService {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LogoService {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    /// Generate the logo and return it as a `data:image/png;base64,` URI
    pub async fn fetch_logo(&self) -> Option<String> {
        match self.try_fetch_logo().await {
            Ok(Some(uri)) => Some(uri),
            Ok(None) => {
                warn!("Logo generation returned no image data");
                None
            }
            Err(e) => {
                warn!("Logo generation failed: {}", e);
                None
            }
        }
    }

    async fn try_fetch_logo(&self) -> anyhow::Result<Option<String>> {
        let url = format!("{}/models/{}:generateContent", self.base_url, LOGO_MODEL);

        let request = LogoRequest {
            contents: vec![GeminiMessage {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(LOGO_PROMPT.to_string()),
                    inline_data: None,
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        let response = utils::check_response_error::<GeminiRateLimitInfo>(response).await?;

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Unknown(format!("Failed to parse response: {e}")))?;

        for candidate in &gemini_response.candidates {
            if let Some(content) = &candidate.content {
                for part in &content.parts {
                    if let Some(inline_data) = &part.inline_data {
                        debug!("Received logo image ({} base64 chars)", inline_data.data.len());
                        return Ok(Some(format!("data:image/png;base64,{}", inline_data.data)));
                    }
                }
            }
        }

        Ok(None)
    }
}

/// Decode a `data:image/png;base64,` URI into raw PNG bytes
pub fn decode_png_data_uri(uri: &str) -> Option<Vec<u8>> {
    let data = uri.strip_prefix("data:image/png;base64,")?;
    STANDARD.decode(data).ok()
}
