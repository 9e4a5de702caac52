//! Chatter Monitor - session log tailer for the speaking avatar.
//!
//! This binary watches Claude Code session logs and emits one
//! emotion-tagged speak event per new assistant reply.
//!
//! # Commands
//!
//! - `chatter-monitor run`: Tail session logs until interrupted
//! - `chatter-monitor classify`: Print the emotion picked for some text
//! - `chatter-monitor clean`: Print text as it would be spoken
//! - `chatter-monitor parse`: Run JSONL from stdin through the pipeline
//!
//! # Environment Variables
//!
//! See the [`config`](chatter_monitor::config) module for available
//! configuration options.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use chatter_monitor::classifier::EmotionClassifier;
use chatter_monitor::config::Config;
use chatter_monitor::filter::clean_text_for_speech;
use chatter_monitor::pipeline::SpeechPipeline;
use chatter_monitor::sink::{HttpSink, StdoutSink};
use chatter_monitor::watcher::LogTailer;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Chatter Monitor - session log tailer for the speaking avatar.
///
/// Watches Claude Code session logs and turns each new assistant reply
/// into a `{"type":"speak","text":...,"emotion":...}` event.
#[derive(Parser, Debug)]
#[command(name = "chatter-monitor")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    CHATTER_CLAUDE_DIR              Claude directory (default: ~/.claude)
    CHATTER_INCLUDE_SUBAGENTS       Speak sub-agent logs too (default: false)
    CHATTER_DEBOUNCE_MS             Per-file change debounce (default: 100)
    CHATTER_STABILITY_THRESHOLD_MS  Write quiet period (default: 100)
    CHATTER_POLL_INTERVAL_MS        Write stability poll interval (default: 50)
    CHATTER_SERVER_URL              Event hub URL (enables the http sink)

EXAMPLES:
    # Print speak events to stdout
    chatter-monitor run

    # Forward speak events to a local event hub
    chatter-monitor run --sink http --server-url http://127.0.0.1:8563

    # Check what a reply would sound like
    chatter-monitor classify \"完了しました！\"
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Where `run` delivers speak events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SinkKind {
    /// One JSON object per line on stdout.
    Stdout,
    /// `POST /speak` on the event hub.
    Http,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Tail session logs and emit speak events.
    ///
    /// Runs until SIGINT or SIGTERM.
    Run {
        /// Also watch sub-agent session logs.
        #[arg(long)]
        sub_agents: bool,

        /// Directory to watch (default: <CHATTER_CLAUDE_DIR>/projects).
        #[arg(long)]
        root: Option<PathBuf>,

        /// Event destination (default: http when a server URL is set, else stdout).
        #[arg(long, value_enum)]
        sink: Option<SinkKind>,

        /// Event hub URL, overrides CHATTER_SERVER_URL.
        #[arg(long)]
        server_url: Option<String>,
    },

    /// Classify TEXT, or each line of stdin, and print `<emotion>\t<text>`.
    Classify {
        /// Text to classify.
        text: Option<String>,
    },

    /// Clean TEXT, or each line of stdin, for speech synthesis.
    Clean {
        /// Text to clean.
        text: Option<String>,
    },

    /// Read session log lines from stdin and print the speak events.
    Parse {
        /// Treat input as sub-agent logs.
        #[arg(long)]
        sub_agents: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    match cli.command {
        Command::Run {
            sub_agents,
            root,
            sink,
            server_url,
        } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;

            runtime.block_on(run_monitor(sub_agents, root, sink, server_url))
        }
        Command::Classify { text } => run_classify(text),
        Command::Clean { text } => run_clean(text),
        Command::Parse { sub_agents } => run_parse(sub_agents),
    }
}

/// Runs the tailer until a shutdown signal arrives.
async fn run_monitor(
    sub_agents: bool,
    root: Option<PathBuf>,
    sink: Option<SinkKind>,
    server_url: Option<String>,
) -> Result<()> {
    info!("Starting Chatter Monitor");

    let config = Config::from_env().context("Failed to load configuration")?;

    let mut tailer_config = config.tailer_config();
    if sub_agents {
        tailer_config = tailer_config.with_sub_agents(true);
    }
    if let Some(root) = root {
        tailer_config.root = root;
    }

    let server_url = server_url.or(config.server_url.clone());
    let sink = sink.unwrap_or(if server_url.is_some() {
        SinkKind::Http
    } else {
        SinkKind::Stdout
    });

    info!(
        root = %tailer_config.root.display(),
        include_sub_agents = tailer_config.include_sub_agents,
        max_depth = tailer_config.max_depth(),
        sink = ?sink,
        "Configuration loaded"
    );

    // The host creates the projects directory before watching it
    if !tailer_config.root.exists() {
        info!(
            watch_dir = %tailer_config.root.display(),
            "Creating projects directory"
        );
        std::fs::create_dir_all(&tailer_config.root)
            .context("Failed to create watch directory")?;
    }

    let root_display = tailer_config.root.display().to_string();
    let (mut handle, http_sink) = match sink {
        SinkKind::Stdout => {
            let handle = LogTailer::start(tailer_config, StdoutSink)
                .context(format!("Failed to start log tailer for {root_display}"))?;
            (handle, None)
        }
        SinkKind::Http => {
            let url = server_url.context(
                "The http sink needs a server URL. Set CHATTER_SERVER_URL or pass --server-url.",
            )?;
            let http_sink = HttpSink::new(&url).context("Failed to create HTTP client")?;
            info!(endpoint = %http_sink.endpoint(), "Forwarding speak events");
            let handle = LogTailer::start(tailer_config, http_sink.clone())
                .context(format!("Failed to start log tailer for {root_display}"))?;
            (handle, Some(http_sink))
        }
    };

    info!("Monitor running. Press Ctrl+C to stop.");

    wait_for_shutdown().await;
    info!("Shutdown signal received");

    info!("Shutting down...");
    handle.close();

    if let Some(http_sink) = http_sink {
        let drained = http_sink
            .shutdown(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS))
            .await;
        if !drained {
            error!("Some speak events could not be delivered");
        }
    }

    info!("Monitor stopped");
    Ok(())
}

/// Runs the classify command.
fn run_classify(text: Option<String>) -> Result<()> {
    let classifier = EmotionClassifier::new();
    for_each_input(text, |line, out| {
        writeln!(out, "{}\t{}", classifier.classify(line), line)
    })
}

/// Runs the clean command.
fn run_clean(text: Option<String>) -> Result<()> {
    for_each_input(text, |line, out| writeln!(out, "{}", clean_text_for_speech(line)))
}

/// Runs the parse command.
fn run_parse(sub_agents: bool) -> Result<()> {
    let pipeline = SpeechPipeline::new(sub_agents);
    for_each_input(None, |line, out| {
        for event in pipeline.process_line(line) {
            writeln!(out, "{}", event.to_json())?;
        }
        Ok(())
    })
}

/// Applies `f` to `text`, or to every stdin line when `text` is absent.
fn for_each_input<F>(text: Option<String>, mut f: F) -> Result<()>
where
    F: FnMut(&str, &mut dyn Write) -> io::Result<()>,
{
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match text {
        Some(text) => f(&text, &mut out).context("Failed to write output")?,
        None => {
            for line in io::stdin().lock().lines() {
                let line = line.context("Failed to read stdin")?;
                f(&line, &mut out).context("Failed to write output")?;
            }
        }
    }

    out.flush().context("Failed to flush output")
}

/// Initializes the logging subsystem.
///
/// Logs go to stderr so stdout stays free for speak events.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
