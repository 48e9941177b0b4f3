use anyhow::Result;
use axonwatch::audio::{AudioChunk, CollectorSink};
use axonwatch::config::Config;
use axonwatch::session::{
    DriverConfig, ScriptedConnector, SessionDriver, SessionState, StreamEvent,
    SyntheticCaptureSource,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Run a bounded synthetic monitoring session against a scripted stream.
///
/// Exercises the full engine — capture, scoring, telemetry parsing, risk
/// aggregation and audio scheduling — without a camera or a remote
/// provider. Useful as a smoke test and as a reference for wiring a real
/// connector.
#[derive(Parser)]
#[command(name = "axonwatch", version = axonwatch::version_string())]
struct Cli {
    /// Path to config file (defaults to ~/.config/axonwatch/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds to run the smoke session
    #[arg(long, default_value_t = 8)]
    duration: u64,

    /// Override the threat alert threshold (0-100)
    #[arg(long)]
    threat_threshold: Option<u8>,

    /// Override the noise alert threshold (0-100)
    #[arg(long)]
    noise_threshold: Option<u8>,

    /// Override the frame capture cadence in Hz
    #[arg(long)]
    cadence: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path)?,
            None => Config::default(),
        },
    }
    .with_env_overrides();

    if let Some(threshold) = cli.threat_threshold {
        config.alerts.threat_threshold = threshold;
    }
    if let Some(threshold) = cli.noise_threshold {
        config.alerts.noise_threshold = threshold;
    }
    if let Some(cadence) = cli.cadence {
        config.session.frame_cadence_hz = cadence;
    }
    config.validate()?;

    let (connector, script_tx) = ScriptedConnector::channel(32);
    let frame_log = connector.frame_log();
    let mut driver = SessionDriver::new(DriverConfig::from_config(&config), Arc::new(connector));
    let mut snapshots = driver.subscribe();

    driver
        .connect(
            Box::new(SyntheticCaptureSource::new().with_interference(4)),
            Box::new(CollectorSink::new()),
        )
        .await?;
    println!("session open; running for {}s", cli.duration);

    // Scripted remote: status updates (one split mid-marker), an alert, a
    // log note and a short audio response.
    tokio::spawn(async move {
        let script: Vec<(u64, StreamEvent)> = vec![
            (
                400,
                StreamEvent::TextDelta(
                    "[AXON_UPDATE] THREAT: 12, STRENGTH: 96, NOISE: 0.21\n".to_string(),
                ),
            ),
            (600, StreamEvent::TextDelta("[LOG] Sweep nominal\n".to_string())),
            (800, StreamEvent::Audio(AudioChunk::new(vec![0u8; 9600]))),
            (1200, StreamEvent::TextDelta("[AXON_UPD".to_string())),
            (
                300,
                StreamEvent::TextDelta("ATE] THREAT: 58, STRENGTH: 84, NOISE: 1.4\n".to_string()),
            ),
            (
                900,
                StreamEvent::TextDelta(
                    "[ALERT: Manipulated Sign] High-frequency pattern on speed limit sign\n"
                        .to_string(),
                ),
            ),
            (500, StreamEvent::TurnComplete),
            (
                1500,
                StreamEvent::TextDelta(
                    "[AXON_UPDATE] THREAT: 9, STRENGTH: 97, NOISE: 0.18\n".to_string(),
                ),
            ),
        ];
        for (delay_ms, event) in script {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            if script_tx.send(event).await.is_err() {
                break;
            }
        }
    });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(cli.duration);
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow().clone();
                println!(
                    "state={:<10} risk={:>3} threat={:>3} noise={:>3} signal={:>3} events={}",
                    format!("{:?}", snapshot.session_state),
                    snapshot.risk.composite_risk(),
                    snapshot.risk.threat_score(),
                    snapshot.risk.noise_score(),
                    snapshot.risk.signal_strength(),
                    snapshot.risk.recent_events().count(),
                );
                if matches!(
                    snapshot.session_state,
                    SessionState::Closed | SessionState::Failed
                ) {
                    break;
                }
            }
        }
    }

    driver.stop().await;

    let final_snapshot = snapshots.borrow().clone();
    println!("session ended in state {:?}", final_snapshot.session_state);
    println!("transmitted {} frames", frame_log.frame_count());
    for event in final_snapshot.risk.recent_events() {
        println!(
            "  [{:?}] {} — {}",
            event.severity, event.category, event.description
        );
    }

    Ok(())
}
