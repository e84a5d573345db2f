use crate::{
    config::GeminiConfig,
    error::{IconError, Result},
    generator::traits::{build_icon_prompt, IconGenerator},
    models::{
        AspectRatio, GeminiContent, GeminiGenerationConfig, GeminiImageConfig,
        GeminiImageRequest, GeminiImageResponse, GeminiPart,
    },
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

#[derive(Clone)]
pub struct GeminiImageClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiImageClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| IconError::ConfigError("Gemini API key is required".into()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IconError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model: config.model,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn supported_models() -> Vec<(&'static str, &'static str)> {
        vec![
            ("gemini-2.5-flash-image", "Gemini 2.5 Flash Image"),
            ("gemini-3-pro-image-preview", "Gemini 3 Pro Image (preview)"),
        ]
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    pub fn build_request(prompt: &str, aspect_ratio: AspectRatio) -> GeminiImageRequest {
        GeminiImageRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                    inline_data: None,
                }],
            }],
            generation_config: GeminiGenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
                image_config: GeminiImageConfig {
                    aspect_ratio: aspect_ratio.request_ratio().to_string(),
                },
            },
        }
    }

    /// Pulls the first inline image out of a response as a `data:` URL.
    pub fn extract_image_reference(response: GeminiImageResponse) -> Result<String> {
        if let Some(error) = response.error {
            return Err(IconError::ResponseError(format!(
                "Gemini returned error {}: {}",
                error.code.unwrap_or_default(),
                error.message.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        let mut finish_reason = None;
        for candidate in response.candidates {
            if finish_reason.is_none() {
                finish_reason = candidate.finish_reason.clone();
            }
            let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
            for part in parts {
                if let Some(inline) = part.inline_data {
                    if inline.data.is_empty() {
                        continue;
                    }
                    return Ok(format!("data:{};base64,{}", inline.mime_type, inline.data));
                }
            }
        }

        Err(IconError::ResponseError(match finish_reason {
            Some(reason) => format!("No image generated (finish reason: {})", reason),
            None => "No image generated".to_string(),
        }))
    }
}

#[async_trait]
impl IconGenerator for GeminiImageClient {
    async fn generate(
        &self,
        text: &str,
        style_suffix: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<String> {
        let prompt = build_icon_prompt(text, style_suffix, aspect_ratio);
        let payload = Self::build_request(&prompt, aspect_ratio);

        log::info!("Generating icon with model: {}", self.model);
        log::debug!("Icon prompt: {}", prompt);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| IconError::RequestError(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IconError::ResponseError(e.to_string()))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<GeminiImageResponse>(&body)
                .ok()
                .and_then(|parsed| parsed.error)
                .and_then(|error| error.message)
                .unwrap_or(body);
            return Err(IconError::RequestError(format!(
                "Gemini request failed: {} {}",
                status, detail
            )));
        }

        let parsed: GeminiImageResponse = serde_json::from_str(&body)
            .map_err(|e| IconError::SerializationError(e.to_string()))?;

        Self::extract_image_reference(parsed)
    }
}
