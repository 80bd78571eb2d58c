use crate::core::error::{GenerationError, GenerationResult};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// An inline image returned by the generation backend. Transient: the
/// workflow decodes it to bytes for caching, the exporter re-encodes a
/// data URI at render time.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub base64: String,
}

impl ImagePayload {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }

    pub fn decode(&self) -> GenerationResult<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.base64)
            .map_err(|e| GenerationError::Api(format!("invalid base64 image payload: {}", e)))
    }
}

pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[async_trait]
pub trait ImageClient: Send + Sync + Debug {
    async fn generate_image(&self, prompt: &str) -> GenerationResult<ImagePayload>;
}

#[derive(Debug)]
pub struct GeminiImageClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiImageClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct ImageRequest {
    contents: Vec<ImageContent>,
    #[serde(rename = "generationConfig")]
    generation_config: ImageGenerationConfig,
}

#[derive(Serialize)]
struct ImageContent {
    parts: Vec<ImageTextPart>,
}

#[derive(Serialize)]
struct ImageTextPart {
    text: String,
}

#[derive(Serialize)]
struct ImageGenerationConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: Vec<String>,
}

#[derive(Deserialize)]
struct ImageResponse {
    #[serde(default)]
    candidates: Vec<ImageCandidate>,
    error: Option<ImageApiError>,
}

#[derive(Deserialize)]
struct ImageCandidate {
    content: Option<ImageCandidateContent>,
}

#[derive(Deserialize)]
struct ImageCandidateContent {
    #[serde(default)]
    parts: Vec<ImageResponsePart>,
}

#[derive(Deserialize)]
struct ImageResponsePart {
    #[serde(default)]
    #[serde(alias = "inline_data")]
    #[serde(alias = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct InlineData {
    #[serde(default)]
    #[serde(alias = "mime_type")]
    #[serde(alias = "mimeType")]
    mime_type: Option<String>,
    data: String,
}

#[derive(Deserialize)]
struct ImageApiError {
    message: String,
}

/// Finds the first inline image across all candidates' parts. The
/// backend may interleave text parts with the image part.
fn extract_image(response: ImageResponse) -> GenerationResult<ImagePayload> {
    if let Some(err) = response.error {
        return Err(GenerationError::classify(err.message));
    }

    for candidate in response.candidates {
        let Some(content) = candidate.content else {
            continue;
        };
        for part in content.parts {
            if let Some(inline) = part.inline_data {
                if inline.data.is_empty() {
                    continue;
                }
                return Ok(ImagePayload {
                    mime_type: inline.mime_type.unwrap_or_else(|| "image/png".to_string()),
                    base64: inline.data,
                });
            }
        }
    }

    Err(GenerationError::NoImageData)
}

#[async_trait]
impl ImageClient for GeminiImageClient {
    async fn generate_image(&self, prompt: &str) -> GenerationResult<ImagePayload> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let request_body = ImageRequest {
            contents: vec![ImageContent {
                parts: vec![ImageTextPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: ImageGenerationConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            },
        };

        let resp = self.client.post(&url).json(&request_body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::classify(format!(
                "{} {}",
                status, error_text
            )));
        }

        let response_text = resp.text().await?;
        let response: ImageResponse = serde_json::from_str(&response_text).map_err(|e| {
            GenerationError::Api(format!("Failed to parse image response: {}", e))
        })?;

        extract_image(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_inline_image_camel_case() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Here is your image" },
                        { "inlineData": { "mimeType": "image/png", "data": "aGVsbG8=" } }
                    ]
                }
            }]
        }"#;
        let response: ImageResponse = serde_json::from_str(json).unwrap();
        let payload = extract_image(response).unwrap();
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.decode().unwrap(), b"hello");
    }

    #[test]
    fn test_extract_inline_image_snake_case() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        { "inline_data": { "mime_type": "image/jpeg", "data": "aGk=" } }
                    ]
                }
            }]
        }"#;
        let response: ImageResponse = serde_json::from_str(json).unwrap();
        let payload = extract_image(response).unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");
    }

    #[test]
    fn test_missing_mime_type_defaults_to_png() {
        let json = r#"{
            "candidates": [{
                "content": { "parts": [{ "inlineData": { "data": "aGk=" } }] }
            }]
        }"#;
        let response: ImageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_image(response).unwrap().mime_type, "image/png");
    }

    #[test]
    fn test_text_only_response_is_no_image_data() {
        let json = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "I cannot draw that." }] }
            }]
        }"#;
        let response: ImageResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            extract_image(response),
            Err(GenerationError::NoImageData)
        ));
    }

    #[test]
    fn test_empty_candidates_is_no_image_data() {
        let response: ImageResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(
            extract_image(response),
            Err(GenerationError::NoImageData)
        ));
    }

    #[test]
    fn test_embedded_error_is_classified() {
        let json = r#"{"error": {"message": "Quota exceeded for requests"}}"#;
        let response: ImageResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            extract_image(response),
            Err(GenerationError::QuotaExceeded(_))
        ));
    }

    #[test]
    fn test_data_uri_roundtrip() {
        let payload = ImagePayload {
            mime_type: "image/png".to_string(),
            base64: "aGVsbG8=".to_string(),
        };
        assert_eq!(payload.to_data_uri(), "data:image/png;base64,aGVsbG8=");
        assert_eq!(encode_data_uri("image/png", b"hello"), payload.to_data_uri());
    }
}
