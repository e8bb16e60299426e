use clap::Parser;
use miette::{IntoDiagnostic, Result};
use ramp_orchestrator::config::EngineConfig;
use ramp_orchestrator::interfaces::csv::timeline_writer::TimelineWriter;
use ramp_orchestrator::interfaces::json::scenario::Scenario;
use ramp_orchestrator::logging::init_logging;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario JSON file describing one session
    scenario: PathBuf,

    /// Status polling interval in milliseconds
    #[arg(long, default_value_t = 5000)]
    poll_interval_ms: u64,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = EngineConfig {
        poll_interval: Duration::from_millis(cli.poll_interval_ms),
        ..EngineConfig::default()
    };

    let file = File::open(&cli.scenario).into_diagnostic()?;
    let scenario = Scenario::from_reader(file).into_diagnostic()?;
    let outcome = scenario.play(config).await.into_diagnostic()?;

    if let Some(err) = &outcome.error {
        eprintln!("Error processing scenario: {}", err);
    }
    if let Some(failure) = &outcome.snapshot.failure {
        eprintln!("Payment failed: {} ({})", failure.reason, failure.support_link);
    }

    let stdout = io::stdout();
    let mut writer = TimelineWriter::new(stdout.lock());
    writer
        .write_timeline(&outcome.snapshot.timeline)
        .into_diagnostic()?;

    Ok(())
}
