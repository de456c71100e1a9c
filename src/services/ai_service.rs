use thiserror::Error;

use crate::extractor::ExtractionError;
use crate::services::image_source::ImagePayload;

/// Failures on the analysis path, classified for user-facing messages.
/// Everything here is caught at the task-runner boundary; nothing
/// propagates to the interactive loop as a panic or an unhandled error.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("network error while contacting the model: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model API error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Seam for the multimodal inference endpoint (Gemini in production,
/// stubs in tests). Returns the model's raw free-form text; payload
/// extraction is the caller's job.
#[async_trait::async_trait]
pub trait VisionService: Send + Sync {
    async fn analyze_food_image(
        &self,
        api_key: &str,
        image: &ImagePayload,
    ) -> Result<String, AnalysisError>;
}
