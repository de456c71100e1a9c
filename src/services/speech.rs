use anyhow::Result;

/// Seam for the speech-output engine. Callers hand over text that has
/// already been cleaned with `strip_formatting`; `stop` interrupts an
/// in-progress utterance when a new request preempts it.
#[async_trait::async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn speak(&self, text: &str) -> Result<()>;
    async fn stop(&self);
}

/// Stand-in engine that writes the utterance to the console. A platform
/// TTS backend would implement the same trait.
pub struct ConsoleSpeechEngine;

#[async_trait::async_trait]
impl SpeechEngine for ConsoleSpeechEngine {
    async fn speak(&self, text: &str) -> Result<()> {
        log::info!("🔊 Speaking {} characters", text.len());
        println!("🔊 {}", text);
        Ok(())
    }

    async fn stop(&self) {
        log::debug!("🔇 Speech stop requested");
    }
}
