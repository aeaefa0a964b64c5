//! skald: transcript acquisition CLI
//!
//! Fetches a transcript (or the list of caption tracks) for one video and
//! prints it as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use skald::settings::{Config, Secrets};
use skald::{RuntimeConfig, SkaldError, TranscriptRequest};
use tracing::debug;

/// Skald transcript CLI
#[derive(Parser)]
#[command(name = "skald")]
#[command(version = skald::PKG_VERSION)]
#[command(about = "Resilient video transcript acquisition")]
struct Args {
    /// Path to a config file (default: ~/.skald/config.toml, /etc/skald/config.toml)
    #[arg(short, long, env = "SKALD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a transcript as JSON segments
    Transcript {
        /// Video identifier
        video_id: String,
        /// Requested language code, or "auto"
        #[arg(short, long, default_value = "en")]
        lang: String,
        /// Never machine-translate caption tracks
        #[arg(long)]
        disable_translate: bool,
        /// Do not fall back to speech-to-text
        #[arg(long)]
        no_stt_fallback: bool,
        /// STT backend override: openai, gemini or local
        #[arg(long)]
        stt_backend: Option<String>,
        /// Skip captions and transcribe the audio directly
        #[arg(long)]
        force_stt: bool,
        /// Gemini API key for this request
        #[arg(long, env = "SKALD_GEMINI_API_KEY", hide_env_values = true)]
        gemini_api_key: Option<String>,
    },

    /// List available caption tracks
    Languages {
        /// Video identifier
        video_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let build = skald::BuildInfo::current();
    debug!(version = %build, built_at = build.built_at, "starting");

    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;
    let runtime = Arc::new(RuntimeConfig::from_env()?);
    let service = config.build_service(&secrets, runtime)?;

    match args.command {
        Command::Transcript {
            video_id,
            lang,
            disable_translate,
            no_stt_fallback,
            stt_backend,
            force_stt,
            gemini_api_key,
        } => {
            let mut request = TranscriptRequest::new(video_id, lang)
                .disable_translate(disable_translate)
                .stt_fallback(!no_stt_fallback)
                .force_stt(force_stt);
            if let Some(backend) = stt_backend {
                request = request.stt_backend(backend);
            }
            if let Some(key) = gemini_api_key {
                request = request.gemini_api_key(key);
            }

            match service.fetch(&request).await {
                Ok(segments) => println!("{}", serde_json::to_string_pretty(&segments)?),
                Err(SkaldError::Throttled { retry_after_secs }) => {
                    eprintln!("transcript unavailable, retry after {retry_after_secs}s");
                    std::process::exit(75);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Command::Languages { video_id } => {
            let tracks = service.list_languages(&video_id).await?;
            println!("{}", serde_json::to_string_pretty(&tracks)?);
        }
    }

    Ok(())
}
