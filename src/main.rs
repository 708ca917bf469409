use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wakeword_gateway::api::websocket::round_score;
use wakeword_gateway::voice::{Session, read_wav};
use wakeword_gateway::{Config, Daemon, engine};

/// Wakeword - streaming wake word detection gateway
#[derive(Parser)]
#[command(name = "wakeword", version, about)]
struct Cli {
    /// Address to bind
    #[arg(long, env = "WAKEWORD_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "WAKEWORD_PORT")]
    port: Option<u16>,

    /// Path to a TOML config file
    #[arg(short, long, env = "WAKEWORD_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved configuration
    ShowConfig,
    /// Replay a 16-bit WAV file through a detection session
    ScoreFile {
        /// WAV file to score
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,wakeword_gateway=info",
        1 => "info,wakeword_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
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
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::ShowConfig => {
                println!("{config:#?}");
                Ok(())
            }
            Command::ScoreFile { path } => score_file(&config, &path).await,
        };
    }

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "starting wake word gateway"
    );

    let daemon = Daemon::new(config)?;
    tracing::info!(phrases = ?daemon.phrases(), "wake word gateway ready");

    // Run until interrupted
    daemon.run().await?;

    Ok(())
}

/// Replay a WAV file frame by frame on a simulated clock
async fn score_file(config: &Config, path: &Path) -> anyhow::Result<()> {
    let audio = read_wav(path)?;
    if audio.sample_rate != config.detection.sample_rate {
        tracing::warn!(
            file_rate = audio.sample_rate,
            expected_rate = config.detection.sample_rate,
            "sample rate mismatch; scores may be meaningless"
        );
    }

    let engine = engine::scoring_cell(config).get().await?;
    let mut session = Session::new(format!("file:{}", path.display()), config, engine);

    let frame_duration = config.detection.frame_duration();
    let start = Instant::now();
    let mut elapsed = Duration::ZERO;

    println!("Scoring {} ({} samples at {} Hz)", path.display(), audio.samples.len(), audio.sample_rate);
    println!("---");

    let pcm: Vec<u8> = audio.samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    session.feed(&pcm);
    // Each decision is stamped at the end of its frame
    loop {
        elapsed += frame_duration;
        let Some(events) = session.process_next(start + elapsed).await else {
            break;
        };
        for event in events {
            println!("[{:>8.3}s] {} score={}", elapsed.as_secs_f64(), event.phrase, round_score(event.score));
        }
    }

    let stats = session.close();
    println!("---");
    println!(
        "{} frames scored, {} dropped, {} detections",
        stats.frames_scored, stats.frames_dropped, stats.detections
    );

    Ok(())
}
