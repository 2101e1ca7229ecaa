//! AlertHub Agent - Command-line alert producer.
//!
//! # Commands
//!
//! - `alerthub-agent send`: Send one alert
//! - `alerthub-agent simulate`: Send a burst of synthetic alerts, showing
//!   rate limiting at work
//!
//! # Environment Variables
//!
//! See the [`config`] module for available configuration options.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use alerthub_agent::config::{self, Config};
use alerthub_agent::error::AgentError;
use alerthub_agent::sender::{AlertSender, SendOutcome};

/// AlertHub Agent - Rate-limited alert producer.
///
/// Sends alerts to an AlertHub server, suppressing repeats of the same event
/// type within a minimum interval.
#[derive(Parser, Debug)]
#[command(name = "alerthub-agent")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    ALERT_SERVER_URL            Ingestion URL (default: http://127.0.0.1:8000/alert)
    ALERTHUB_SOURCE_ID          Agent identifier (default: hostname)
    ALERTHUB_MIN_INTERVAL_SECS  Seconds between sends of one type (default: 5)
    ALERTHUB_ENABLED            Set to 'false' to suppress all sends

EXAMPLES:
    # Send one alert
    alerthub-agent send --type cpu_high --severity high --message 'CPU 95%'

    # Attach structured detail
    alerthub-agent send --type disk_full --severity medium \\
        --message 'disk at 91%' --payload '{\"mount\": \"/var\"}'

    # Ten alerts of one type, 1s apart: roughly one alert per 5 s window is delivered
    alerthub-agent simulate --count 10 --interval-ms 1000
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Settings that override the environment.
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Agent identifier placed in each alert.
    #[arg(long)]
    source: Option<String>,

    /// Full URL of the server's ingestion endpoint.
    #[arg(long)]
    server_url: Option<String>,

    /// Minimum seconds between two sends of one event type.
    #[arg(long)]
    min_interval: Option<String>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Send one alert.
    ///
    /// Exits 0 when the alert was delivered or deliberately suppressed, and
    /// 1 when sending failed.
    Send {
        /// Event type (also the rate-limiting key).
        #[arg(long = "type")]
        event_type: String,

        /// Severity label, e.g. low, medium, high.
        #[arg(long)]
        severity: String,

        /// Human-readable message.
        #[arg(long)]
        message: String,

        /// Extra detail as a JSON object.
        #[arg(long)]
        payload: Option<String>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Send synthetic alerts in a loop.
    Simulate {
        /// Number of alerts to send.
        #[arg(long, default_value_t = 10)]
        count: u32,

        /// Delay between alerts in milliseconds.
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Event type used for every alert.
        #[arg(long = "type", default_value = "simulated")]
        event_type: String,

        /// Severity label used for every alert.
        #[arg(long, default_value = "low")]
        severity: String,

        #[command(flatten)]
        overrides: Overrides,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logging();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    match cli.command {
        Command::Send {
            event_type,
            severity,
            message,
            payload,
            overrides,
        } => {
            let config = load_config(overrides)?;
            let payload = parse_payload(payload.as_deref())?;
            runtime.block_on(run_send(config, event_type, severity, message, payload))
        }
        Command::Simulate {
            count,
            interval_ms,
            event_type,
            severity,
            overrides,
        } => {
            let config = load_config(overrides)?;
            runtime.block_on(run_simulate(
                config,
                count,
                Duration::from_millis(interval_ms),
                event_type,
                severity,
            ))
        }
    }
}

/// Sends one alert and maps the outcome to an exit code.
async fn run_send(
    config: Config,
    event_type: String,
    severity: String,
    message: String,
    payload: Map<String, Value>,
) -> Result<ExitCode> {
    let mut sender = AlertSender::new(config);
    let outcome = sender.send(&event_type, &severity, &message, payload).await;

    println!("{outcome}");

    Ok(if outcome.is_failed() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

/// Sends `count` alerts of one type, `interval` apart.
async fn run_simulate(
    config: Config,
    count: u32,
    interval: Duration,
    event_type: String,
    severity: String,
) -> Result<ExitCode> {
    info!(
        count,
        interval_secs = interval.as_secs_f64(),
        min_interval_secs = config.min_interval.as_secs_f64(),
        event_type = %event_type,
        "Starting simulation"
    );

    let mut sender = AlertSender::new(config);
    let (mut delivered, mut suppressed, mut failed) = (0u32, 0u32, 0u32);

    for i in 1..=count {
        let message = format!("simulated alert {i}/{count}");
        let mut payload = Map::new();
        payload.insert("sequence".to_string(), json!(i));

        let outcome = sender.send(&event_type, &severity, &message, payload).await;
        println!("[{i}/{count}] {outcome}");

        match outcome {
            SendOutcome::Delivered => delivered += 1,
            SendOutcome::Suppressed(_) => suppressed += 1,
            SendOutcome::Failed(_) => failed += 1,
        }

        if i < count {
            tokio::time::sleep(interval).await;
        }
    }

    println!("delivered={delivered} suppressed={suppressed} failed={failed}");
    Ok(ExitCode::SUCCESS)
}

/// Loads configuration from the environment and applies CLI overrides.
fn load_config(overrides: Overrides) -> Result<Config, AgentError> {
    let mut config = Config::from_env()?;

    if let Some(source) = overrides.source {
        config.source_id = source;
    }
    if let Some(url) = overrides.server_url {
        config.server_url = url;
    }
    if let Some(raw) = overrides.min_interval {
        config.min_interval = config::parse_interval("--min-interval", &raw)?;
    }

    Ok(config)
}

/// Parses the `--payload` argument into a JSON object.
fn parse_payload(raw: Option<&str>) -> Result<Map<String, Value>, AgentError> {
    match raw {
        None => Ok(Map::new()),
        Some(raw) => Ok(serde_json::from_str(raw)?),
    }
}

/// Initializes logging to stderr; stdout carries the command's output.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_send() {
        let cli = Cli::try_parse_from([
            "alerthub-agent",
            "send",
            "--type",
            "cpu_high",
            "--severity",
            "high",
            "--message",
            "CPU 95%",
            "--payload",
            r#"{"cpu": 95}"#,
            "--source",
            "db-01",
        ])
        .unwrap();

        match cli.command {
            Command::Send {
                event_type,
                payload,
                overrides,
                ..
            } => {
                assert_eq!(event_type, "cpu_high");
                assert_eq!(payload.as_deref(), Some(r#"{"cpu": 95}"#));
                assert_eq!(overrides.source.as_deref(), Some("db-01"));
                assert!(overrides.server_url.is_none());
            }
            other => panic!("expected Send, got {other:?}"),
        }
    }

    #[test]
    fn cli_send_requires_type() {
        let result = Cli::try_parse_from([
            "alerthub-agent",
            "send",
            "--severity",
            "high",
            "--message",
            "m",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_simulate_defaults() {
        let cli = Cli::try_parse_from(["alerthub-agent", "simulate"]).unwrap();
        match cli.command {
            Command::Simulate {
                count,
                interval_ms,
                event_type,
                ..
            } => {
                assert_eq!(count, 10);
                assert_eq!(interval_ms, 1000);
                assert_eq!(event_type, "simulated");
            }
            other => panic!("expected Simulate, got {other:?}"),
        }
    }

    #[test]
    fn help_describes_simulation_by_window() {
        use clap::CommandFactory;

        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("roughly one alert per 5 s window is delivered"));
        assert!(!help.contains("every fifth"));
    }

    #[test]
    fn parse_payload_accepts_object() {
        let payload = parse_payload(Some(r#"{"mount": "/var"}"#)).unwrap();
        assert_eq!(payload["mount"], "/var");
        assert!(parse_payload(None).unwrap().is_empty());
    }

    #[test]
    fn parse_payload_rejects_non_object() {
        assert!(matches!(
            parse_payload(Some("[1, 2]")),
            Err(AgentError::Json(_))
        ));
        assert!(parse_payload(Some("not json")).is_err());
    }
}
