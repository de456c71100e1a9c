pub mod ai_service;
pub mod gemini; // Gemini generateContent REST client
pub mod image_source;
pub mod speech;

pub use ai_service::{AnalysisError, VisionService};
pub use gemini::GeminiClient;
pub use image_source::{fetch_url, load_file, ImagePayload};
pub use speech::{ConsoleSpeechEngine, SpeechEngine};
