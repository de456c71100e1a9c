use crate::models::NutritionEstimate;
use crate::services::ImagePayload;

/// Per-run state owned exclusively by the interactive loop. The API key
/// lives in process memory only and is never logged or written to disk.
pub struct Session {
    pub api_key: Option<String>,
    pub image: Option<ImagePayload>,
    pub image_label: Option<String>,
    pub last_estimate: Option<NutritionEstimate>,
    pub last_report: Option<String>,
}

impl Session {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            image: None,
            image_label: None,
            last_estimate: None,
            last_report: None,
        }
    }

    pub fn set_image(&mut self, image: ImagePayload, label: String) {
        self.image = Some(image);
        self.image_label = Some(label);
    }

    pub fn set_result(&mut self, estimate: NutritionEstimate, report: String) {
        self.last_estimate = Some(estimate);
        self.last_report = Some(report);
    }

    pub fn clear_result(&mut self) {
        self.last_estimate = None;
        self.last_report = None;
    }

    /// Drops the image and results but keeps the API key, so a cleared
    /// session is immediately ready for the next photo.
    pub fn clear(&mut self) {
        self.image = None;
        self.image_label = None;
        self.clear_result();
    }
}
