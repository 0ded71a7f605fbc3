use std::process::ExitCode;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use voxlate::config::file::config_file_path;
use voxlate::voice::{AudioCapture, AudioPlayback, calculate_energy};
use voxlate::{
    Config, LanguagePair, SessionObserver, SessionOutcome, SessionState, SpeechPlayback,
    TranslationOrchestrator, TranslationRequest, TranslationSessionResult, Translator, runtime,
    translate_batch,
};

/// voxlate - speak, translate, hear
#[derive(Parser)]
#[command(name = "voxlate", version, about)]
struct Cli {
    /// Source language tag (e.g. "en-US")
    #[arg(long, global = true)]
    from: Option<String>,

    /// Target language tag (e.g. "es-ES")
    #[arg(long, global = true)]
    to: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive push-to-talk loop (default)
    Run,
    /// Translate typed text
    Translate {
        /// Text to translate
        text: String,
        /// Speak the translation through the full pipeline
        #[arg(long)]
        speak: bool,
    },
    /// Translate several texts concurrently
    Batch {
        /// Texts to translate
        #[arg(required = true)]
        texts: Vec<String>,
        /// Additional target languages; each text goes to every target
        #[arg(long = "also")]
        also: Vec<String>,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Print the config file location
    ConfigPath,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info",
        1 => "info,voxlate=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = cli.command.unwrap_or(Command::Run);

    match command {
        Command::TestMic { duration } => return test_mic(duration).await,
        Command::TestSpeaker => return test_speaker().await,
        Command::ConfigPath => {
            match config_file_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("no config directory available"),
            }
            return Ok(());
        }
        _ => {}
    }

    let mut config = Config::load()?;
    if let Some(from) = cli.from {
        config.languages.from = from;
    }
    if let Some(to) = cli.to {
        config.languages.to = to;
    }
    tracing::debug!(?config, "loaded configuration");

    if runtime::missing_translation_credential(&config) {
        tracing::warn!(
            "no translation credential configured; translations will echo the original text"
        );
    }

    match command {
        Command::Translate { text, speak } => translate_once(&config, &text, speak).await,
        Command::Batch { texts, also } => batch(&config, texts, also).await,
        Command::TestTts { text } => test_tts(&config, &text).await,
        _ => interactive(&config).await,
    }
}

/// One entry in the console's translation history
struct HistoryEntry {
    at: DateTime<Local>,
    result: TranslationSessionResult,
}

/// Prints orchestrator events and keeps the session history
#[derive(Default)]
struct ConsoleObserver {
    history: Mutex<Vec<HistoryEntry>>,
}

impl ConsoleObserver {
    fn print_history(&self) {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        if history.is_empty() {
            println!("(no translations yet)");
            return;
        }
        for entry in history.iter() {
            println!(
                "{}  [{} → {}] {} → {} ({:.0}%)",
                entry.at.format("%H:%M:%S"),
                entry.result.from_language,
                entry.result.to_language,
                entry.result.original_text,
                entry.result.translated_text,
                entry.result.confidence * 100.0
            );
        }
    }
}

impl SessionObserver for ConsoleObserver {
    fn on_status(&self, state: SessionState) {
        match state {
            SessionState::Listening => println!("🎙  listening..."),
            SessionState::Translating => println!("🌐 translating..."),
            SessionState::Speaking => println!("🔊 speaking..."),
            SessionState::Idle | SessionState::Error => {}
        }
    }

    fn on_result(&self, result: &TranslationSessionResult) {
        println!(
            "✔ {} → {} ({:.0}%)",
            result.original_text,
            result.translated_text,
            result.confidence * 100.0
        );
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(HistoryEntry {
                at: Local::now(),
                result: result.clone(),
            });
    }

    fn on_error(&self, reason: &str) {
        println!("✘ {reason}");
    }
}

fn print_help(languages: &LanguagePair) {
    println!("voxlate: {} → {}", languages.from, languages.to);
    println!("  <Enter>      listen, translate, speak");
    println!("  t <text>     translate typed text");
    println!("  s            stop listening / speaking");
    println!("  swap         swap languages");
    println!("  history      show translations");
    println!("  q            quit");
}

fn report(outcome: &SessionOutcome) {
    match outcome {
        SessionOutcome::Empty => println!("(nothing heard)"),
        SessionOutcome::Cancelled => println!("(stopped)"),
        SessionOutcome::Rejected => println!("(busy, wait for the current translation)"),
        SessionOutcome::Completed(_) | SessionOutcome::Failed(_) => {}
    }
}

/// Interactive push-to-talk loop
async fn interactive(config: &Config) -> anyhow::Result<()> {
    let console = Arc::new(ConsoleObserver::default());
    let orchestrator = Arc::new(runtime::build_orchestrator(config, console.clone())?);

    let caps = orchestrator.capabilities();
    if !caps.speech_capture {
        println!("note: speech capture unavailable (no microphone or STT key), use `t <text>`");
    }
    if !caps.speech_playback {
        println!("note: speech playback unavailable (no speaker or TTS key)");
    }

    print_help(&orchestrator.languages());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => spawn_session(&orchestrator, None),
            "s" | "stop" => {
                if !orchestrator.stop_listening() && !orchestrator.stop_speaking() {
                    println!("(nothing to stop)");
                }
            }
            "swap" => {
                let pair = orchestrator.swap_languages();
                println!("now {} → {}", pair.from, pair.to);
            }
            "history" => console.print_history(),
            "q" | "quit" | "exit" => {
                orchestrator.stop_listening();
                orchestrator.stop_speaking();
                break;
            }
            _ => match line.strip_prefix("t ") {
                Some(text) => spawn_session(&orchestrator, Some(text.to_string())),
                None => print_help(&orchestrator.languages()),
            },
        }
    }

    Ok(())
}

fn spawn_session(orchestrator: &Arc<TranslationOrchestrator>, text: Option<String>) {
    let orchestrator = Arc::clone(orchestrator);
    tokio::spawn(async move {
        let outcome = match text {
            Some(text) => orchestrator.translate_text(&text).await,
            None => orchestrator.start_listening().await,
        };
        report(&outcome);
    });
}

/// Translate typed text once
async fn translate_once(config: &Config, text: &str, speak: bool) -> anyhow::Result<()> {
    if speak {
        let console = Arc::new(ConsoleObserver::default());
        let orchestrator = runtime::build_orchestrator(config, console)?;
        let outcome = orchestrator.translate_text(text).await;
        report(&outcome);
        if let SessionOutcome::Failed(reason) = outcome {
            anyhow::bail!(reason);
        }
        return Ok(());
    }

    let translator = runtime::build_translator(config)?;
    let LanguagePair { from, to } = &config.languages;
    let result = translator.translate(text, from, to).await;
    println!("{}", result.translated_text);
    tracing::info!(confidence = result.confidence, "translated");
    Ok(())
}

/// Translate every text into every target concurrently
async fn batch(config: &Config, texts: Vec<String>, also: Vec<String>) -> anyhow::Result<()> {
    let translator = runtime::build_translator(config)?;

    let targets: Vec<String> = std::iter::once(config.languages.to.clone())
        .chain(also)
        .collect();
    let requests: Vec<TranslationRequest> = texts
        .iter()
        .flat_map(|text| {
            targets
                .iter()
                .map(move |to| {
                    TranslationRequest::new(text.clone(), config.languages.from.clone(), to.clone())
                })
        })
        .collect();

    let results = translate_batch(&translator, &requests).await;
    for (request, result) in requests.iter().zip(results) {
        println!(
            "[{}] {} → {} ({:.0}%)",
            request.to,
            request.text,
            result.translated_text,
            result.confidence * 100.0
        );
    }

    Ok(())
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let cancel = CancellationToken::new();
    let meter_cancel = cancel.clone();

    // cpal streams are not Send; meter on a blocking thread
    let meter = tokio::task::spawn_blocking(move || -> voxlate::Result<()> {
        let mut capture = AudioCapture::open()?;
        capture.start()?;

        let mut second = 0;
        while !meter_cancel.is_cancelled() {
            std::thread::sleep(Duration::from_secs(1));
            second += 1;

            let samples = capture.take_buffer();
            let energy = calculate_energy(&samples);
            let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let meter_len = (energy * 100.0).min(50.0) as usize;
            let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

            println!("[{second:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]");
        }

        capture.stop();
        Ok(())
    });

    tokio::time::sleep(Duration::from_secs(duration)).await;
    cancel.cancel();
    meter.await??;

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sample_rate = 24000_u32;
    let frequency = 440.0_f32;
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    tokio::task::spawn_blocking(move || {
        AudioPlayback::open(sample_rate)?.play_blocking(samples, 1.0, &CancellationToken::new())
    })
    .await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");

    Ok(())
}

/// Test TTS output
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let playback = runtime::build_playback(config)?;
    if !playback.is_available() {
        anyhow::bail!("no output device available");
    }

    println!("Synthesizing and playing in {}...", config.languages.to);
    playback
        .speak(
            text,
            &config.languages.to,
            &config.voice.params,
            CancellationToken::new(),
        )
        .await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
