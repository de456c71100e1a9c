use std::time::Duration;

use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};

use super::ai_service::{AnalysisError, VisionService};
use super::image_source::ImagePayload;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// The prompt pins the response shape so the extractor's brace-scanning
/// heuristic has exactly one JSON object to find.
const ANALYSIS_PROMPT: &str = "Analyze the food image and return ONLY a JSON object with keys: \
     calories_kcal, protein_g, fat_g, carbs_g, fiber_g, estimated_portion, confidence. \
     Ensure the output is valid JSON.";

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    InlineData { inline_data: InlineData },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Gemini `generateContent` REST client.
pub struct GeminiClient {
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(model: Option<String>) -> Self {
        Self {
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl VisionService for GeminiClient {
    async fn analyze_food_image(
        &self,
        api_key: &str,
        image: &ImagePayload,
    ) -> Result<String, AnalysisError> {
        log::debug!(
            "📸 Preparing image for analysis: {} bytes, {}",
            image.bytes.len(),
            image.mime_type
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.to_string(),
                            data: general_purpose::STANDARD.encode(&image.bytes),
                        },
                    },
                    Part::Text {
                        text: ANALYSIS_PROMPT.to_string(),
                    },
                ],
            }],
        };

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        log::info!("🤖 Sending request to Gemini with model: {}", self.model);

        // The key goes in a header only; it must never appear in logs.
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 Gemini response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("❌ Gemini API error ({}): {}", status, body);
            return Err(AnalysisError::Api { status, body });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or(AnalysisError::EmptyResponse)?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect();

        if text.is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }

        log::info!("💬 Gemini reply received ({} bytes)", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model() {
        let client = GeminiClient::new(None);
        assert_eq!(client.model(), "gemini-2.5-flash");

        let client = GeminiClient::new(Some("gemini-2.0-pro".to_string()));
        assert_eq!(client.model(), "gemini-2.0-pro");
    }

    #[test]
    fn test_request_serializes_as_inline_data_then_prompt() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/jpeg".to_string(),
                            data: "aGVsbG8=".to_string(),
                        },
                    },
                    Part::Text {
                        text: ANALYSIS_PROMPT.to_string(),
                    },
                ],
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inline_data"]["mime_type"], "image/jpeg");
        assert!(parts[1]["text"]
            .as_str()
            .unwrap()
            .contains("calories_kcal"));
    }

    #[test]
    fn test_response_text_is_concatenated_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"calories_kcal\""},{"text":": 90}"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let text: String = parsed.candidates[0]
            .content
            .parts
            .iter()
            .map(|p| p.text.clone())
            .collect();
        assert_eq!(text, "{\"calories_kcal\": 90}");
    }
}
