mod extractor;
mod models;
mod runner;
mod services;
mod session;

use std::env;
use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use models::NutritionEstimate;
use runner::{TaskRunner, UiEvent};
use services::{
    fetch_url, load_file, ConsoleSpeechEngine, GeminiClient, SpeechEngine, VisionService,
};
use session::Session;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Load environment variables
    dotenv().ok();

    log::info!("🚀 Starting food nutrition scanner...");

    let gemini = GeminiClient::new(env::var("GEMINI_MODEL").ok());
    log::info!("✅ Gemini client initialized with model: {}", gemini.model());
    let vision: Arc<dyn VisionService> = Arc::new(gemini);
    let speech: Arc<dyn SpeechEngine> = Arc::new(ConsoleSpeechEngine);
    let http = reqwest::Client::new();

    let mut session = Session::new(env::var("GEMINI_API_KEY").ok());
    if session.api_key.is_some() {
        log::info!("🔑 API key preset from environment");
    }

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut runner = TaskRunner::new(events_tx);

    print_banner();
    prompt();

    // The interactive context: one loop owns the session and all display
    // output. Background tasks report back only through the event channel.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        let keep_going = handle_command(
                            line.trim(),
                            &mut session,
                            &mut runner,
                            &vision,
                            &speech,
                            &http,
                        )
                        .await;
                        if !keep_going {
                            break;
                        }
                        prompt();
                    }
                    None => break,
                }
            }
            Some(event) = events_rx.recv() => {
                handle_event(event, &mut session);
                prompt();
            }
        }
    }

    runner.interrupt_speech();
    log::info!("🛑 Shutting down...");

    Ok(())
}

async fn handle_command(
    line: &str,
    session: &mut Session,
    runner: &mut TaskRunner,
    vision: &Arc<dyn VisionService>,
    speech: &Arc<dyn SpeechEngine>,
    http: &reqwest::Client,
) -> bool {
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "help" => print_banner(),
        "key" => {
            if arg.is_empty() {
                println!("Usage: key <API key>");
            } else {
                session.api_key = Some(arg.to_string());
                println!("🔑 API key set (kept in memory only, never saved).");
            }
        }
        "file" => {
            if arg.is_empty() {
                println!("Usage: file <path to image>");
            } else {
                match load_file(arg).await {
                    Ok(image) => {
                        println!("🖼️  Image loaded: {} ({} bytes, {})", arg, image.bytes.len(), image.mime_type);
                        session.set_image(image, arg.to_string());
                    }
                    Err(err) => println!("❌ {:#}", err),
                }
            }
        }
        "url" => {
            if arg.is_empty() {
                println!("Usage: url <image link>");
            } else {
                match fetch_url(http, arg).await {
                    Ok(image) => {
                        println!("🖼️  Image downloaded: {} ({} bytes, {})", arg, image.bytes.len(), image.mime_type);
                        session.set_image(image, arg.to_string());
                    }
                    Err(err) => println!("❌ {:#}", err),
                }
            }
        }
        "analyze" => analyze(session, runner, vision),
        "speak" => match &session.last_report {
            Some(report) => {
                runner.submit_speech(speech.clone(), report.clone());
                println!("🔊 Reading the analysis aloud...");
            }
            None => println!("⚠️  Nothing to read yet, run an analysis first."),
        },
        "clear" => {
            runner.interrupt_speech();
            session.clear();
            println!("🧹 Cleared image and results (API key kept).");
        }
        "quit" | "exit" => return false,
        other => println!("Unknown command: {} (try 'help')", other),
    }
    true
}

fn analyze(session: &mut Session, runner: &TaskRunner, vision: &Arc<dyn VisionService>) {
    // Preconditions are reported immediately, before any task starts.
    let Some(api_key) = session.api_key.clone() else {
        println!("⚠️  Set an API key first: key <API key>");
        return;
    };
    let Some(image) = session.image.clone() else {
        println!("⚠️  Choose an image first: file <path> or url <link>");
        return;
    };
    if runner.analysis_in_flight() {
        println!("⏳ An analysis is already running, please wait.");
        return;
    }

    session.clear_result();
    if runner.submit_analysis(vision.clone(), api_key, image) {
        println!("🤖 Sending the image for analysis... please wait.");
    }
}

fn handle_event(event: UiEvent, session: &mut Session) {
    match event {
        UiEvent::AnalysisDone { estimate, report } => {
            print_estimate(&estimate);
            session.set_result(estimate, report);
        }
        UiEvent::AnalysisFailed { message } => {
            session.clear_result();
            println!("\n❌ {}\n", message);
        }
        UiEvent::SpeechFinished => log::debug!("🔊 Speech finished"),
    }
}

fn print_estimate(estimate: &NutritionEstimate) {
    println!("\n📋 Nutrition estimate");
    for (label, value) in estimate.display_rows() {
        println!("  {:<18} {}", label, value);
    }
    println!();
}

fn print_banner() {
    println!("\n🍽️  Food Nutrition Scanner");
    println!("   key <API key>   set the Gemini API key (memory only)");
    println!("   file <path>     load a food photo from disk");
    println!("   url <link>      download a food photo");
    println!("   analyze         estimate nutrition for the current photo");
    println!("   speak           read the last analysis aloud");
    println!("   clear           drop photo and results, keep the key");
    println!("   quit            exit\n");
}

fn prompt() {
    use std::io::Write;
    print!("> ");
    let _ = std::io::stdout().flush();
}
