use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::extractor::{extract_record, strip_formatting};
use crate::models::NutritionEstimate;
use crate::services::{AnalysisError, ImagePayload, SpeechEngine, VisionService};

/// Completion events, delivered over the channel owned by the interactive
/// loop. Background tasks never touch session or display state directly.
#[derive(Debug)]
pub enum UiEvent {
    AnalysisDone {
        estimate: NutritionEstimate,
        report: String,
    },
    AnalysisFailed {
        message: String,
    },
    SpeechFinished,
}

/// Runs long-latency work off the interactive loop.
///
/// Analysis is single-flight: a busy flag doubles as the disabled state of
/// the analyze control, so a second submission is refused rather than
/// queued. Speech is latest-wins: a new request interrupts the one in
/// flight.
pub struct TaskRunner {
    events: mpsc::UnboundedSender<UiEvent>,
    analysis_busy: Arc<AtomicBool>,
    speech_task: Option<JoinHandle<()>>,
}

impl TaskRunner {
    pub fn new(events: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self {
            events,
            analysis_busy: Arc::new(AtomicBool::new(false)),
            speech_task: None,
        }
    }

    /// True while an analysis task is in flight; the interactive loop
    /// treats this as the analyze control being disabled.
    pub fn analysis_in_flight(&self) -> bool {
        self.analysis_busy.load(Ordering::SeqCst)
    }

    /// Spawns one analysis task. Returns false without spawning when one
    /// is already running. The busy flag is cleared before the completion
    /// event is sent, whatever the outcome, so the control is re-enabled
    /// by the time the result is displayed.
    pub fn submit_analysis(
        &self,
        service: Arc<dyn VisionService>,
        api_key: String,
        image: ImagePayload,
    ) -> bool {
        if self.analysis_busy.swap(true, Ordering::SeqCst) {
            log::warn!("⏳ Analysis already in flight, submission refused");
            return false;
        }

        let busy = self.analysis_busy.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = match run_analysis(service, &api_key, &image).await {
                Ok((estimate, report)) => UiEvent::AnalysisDone { estimate, report },
                Err(err) => {
                    log::error!("❌ Analysis failed: {}", err);
                    UiEvent::AnalysisFailed {
                        message: user_message(&err),
                    }
                }
            };
            busy.store(false, Ordering::SeqCst);
            let _ = events.send(event);
        });
        true
    }

    /// Starts a speech task, interrupting any utterance still in flight.
    pub fn submit_speech(&mut self, engine: Arc<dyn SpeechEngine>, text: String) {
        self.interrupt_speech();

        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            // Silence the engine first in case an aborted task left it talking.
            engine.stop().await;
            if let Err(err) = engine.speak(&text).await {
                log::error!("❌ Speech engine error: {}", err);
            }
            let _ = events.send(UiEvent::SpeechFinished);
        });
        self.speech_task = Some(handle);
    }

    pub fn interrupt_speech(&mut self) {
        if let Some(handle) = self.speech_task.take() {
            if !handle.is_finished() {
                log::debug!("🔁 Interrupting in-flight speech task");
                handle.abort();
            }
        }
    }
}

async fn run_analysis(
    service: Arc<dyn VisionService>,
    api_key: &str,
    image: &ImagePayload,
) -> Result<(NutritionEstimate, String), AnalysisError> {
    let raw = service.analyze_food_image(api_key, image).await?;
    // Extraction sees the raw reply; stripping only cleans the copy kept
    // for display and speech.
    let estimate = extract_record(&raw)?;
    let report = strip_formatting(&raw);
    Ok((estimate, report))
}

fn user_message(err: &AnalysisError) -> String {
    match err {
        AnalysisError::Extraction(inner) => format!(
            "Could not read the model's analysis: {}\n\nRaw response for diagnosis:\n{}",
            inner,
            inner.raw_text()
        ),
        AnalysisError::Transport(_) | AnalysisError::Api { .. } => format!(
            "Analysis failed: {}\n\nCheck that the API key is valid and the network connection is stable.",
            err
        ),
        AnalysisError::EmptyResponse => format!("Analysis failed: {}", err),
    }
}
