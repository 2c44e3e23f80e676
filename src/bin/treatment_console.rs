//! # Treatment Console
//!
//! Drives one voice session from stdin. Lines starting with `{` are data-channel JSON
//! from the app; anything else is a driver utterance. Spoken prompts and outbound app
//! messages are printed as they happen.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use treatment_core::config::TreatmentConfig;
use treatment_core::error::{TreatmentError, TreatmentResult};
use treatment_core::events::MessagePublisher;
use treatment_core::logging::init_structured_logging;
use treatment_core::session::{MessageDisposition, TurnDisposition, VoiceSession};
use treatment_core::trips::{InMemoryTripRepository, Trip, TripRepository, TripUpdateBus};
use treatment_core::treatment::OutboundMessage;
use treatment_core::turn::SpeechSink;

#[derive(Parser)]
#[command(name = "treatment-console")]
#[command(about = "Run a delivery treatment session against stdin")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (default: ./treatment.toml when present)
    #[arg(short, long, env = "TREATMENT_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Preload a trip as ID=ADDRESS (repeatable)
    #[arg(long = "trip", value_parser = parse_trip)]
    trips: Vec<Trip>,
}

fn parse_trip(raw: &str) -> Result<Trip, String> {
    let (id, address) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=ADDRESS, got '{raw}'"))?;
    if id.trim().is_empty() {
        return Err("trip id must not be empty".to_string());
    }
    Ok(Trip::new(id.trim(), address.trim()))
}

fn print_line(prefix: &str, text: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{prefix}{text}")?;
    stdout.flush()
}

/// Prints what the assistant would say aloud
struct ConsoleSpeech;

#[async_trait]
impl SpeechSink for ConsoleSpeech {
    async fn say(&self, text: &str) -> TreatmentResult<()> {
        print_line("agent> ", text).map_err(|e| TreatmentError::Speech(e.to_string()))
    }
}

/// Prints outbound app messages as the JSON that would go over the data channel
struct ConsolePublisher;

#[async_trait]
impl MessagePublisher for ConsolePublisher {
    async fn publish(&self, message: OutboundMessage) -> TreatmentResult<()> {
        let json = message
            .to_json()
            .map_err(|e| TreatmentError::Publish(e.to_string()))?;
        print_line("app<   ", &json).map_err(|e| TreatmentError::Publish(e.to_string()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TreatmentConfig::load_from(Some(path.as_path())),
        None => TreatmentConfig::load(),
    }
    .context("Failed to load configuration")?;
    if cli.json_logs || config.is_production() {
        config.logging.json = true;
    }
    init_structured_logging(&config.logging);

    let updates = TripUpdateBus::new(config.messaging.channel_capacity);
    let trips = InMemoryTripRepository::new();
    let _follower = trips.follow(&updates);

    for trip in cli.trips {
        trips.upsert(trip).await?;
    }

    let session = VoiceSession::new(
        &config,
        Arc::new(ConsolePublisher),
        Arc::new(ConsoleSpeech),
        Arc::new(trips.clone()),
        updates,
    )
    .context("Failed to build voice session")?;

    info!(session_id = %session.id(), environment = %config.environment, "Console session ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('{') {
            match session.handle_data_message(line).await {
                Ok(MessageDisposition::Ignored { reason }) => println!("(ignored: {reason})"),
                Ok(disposition) => tracing::debug!(?disposition, "Message handled"),
                Err(err) => error!(error = %err, "Failed to handle message"),
            }
        } else {
            match session.handle_user_turn(line).await {
                Ok(TurnDisposition::Delegated) => println!("(delegated to assistant)"),
                Ok(TurnDisposition::Workflow(outcome)) => {
                    tracing::debug!(?outcome, "Turn handled")
                }
                Err(err) => error!(error = %err, "Failed to handle turn"),
            }
        }
    }

    let stats = trips.stats();
    info!(
        total = stats.total,
        completed = stats.completed,
        cancelled = stats.cancelled,
        "Session ended"
    );

    Ok(())
}
