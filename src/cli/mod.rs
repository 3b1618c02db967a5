//! Command-line interface for pipeline-relay.
//!
//! Provides commands for running a handler under the Lambda runtime,
//! invoking a handler locally with a saved event, and inspecting the
//! resolved configuration.

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;
use tracing::info;

use crate::adapters::{AwsServices, ChatSink, SlackWebhook};
use crate::config::{self, RelayConfig};
use crate::core::{BuildLogRelay, Handler, LogSubscriptionAggregator, PipelineNotifier};
use crate::domain::HandlerResponse;

/// pipeline-relay - Slack notifications for pipeline, build and log events
#[derive(Parser, Debug)]
#[command(name = "pipeline-relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "RELAY_JSON_LOGS")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a handler under the Lambda runtime
    Serve {
        /// Handler to run
        #[arg(long, value_enum, env = "RELAY_HANDLER")]
        handler: HandlerKind,
    },

    /// Run a handler once against an event file
    Invoke {
        /// Handler to run
        #[arg(long, value_enum, env = "RELAY_HANDLER")]
        handler: HandlerKind,

        /// Event JSON file (reads from stdin if not provided)
        #[arg(short, long)]
        event: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Which handler to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HandlerKind {
    /// Pipeline status line
    Notifier,

    /// Pipeline status line plus build log link
    BuildLogs,

    /// CloudWatch Logs subscription aggregator
    LogSubscription,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve { handler } => {
                let config = config::config()?;
                serve(build_handler(handler, config).await).await
            }
            Commands::Invoke { handler, event } => {
                let config = config::config()?;
                invoke(build_handler(handler, config).await, event).await
            }
            Commands::Config => show_config(),
        }
    }
}

/// Construct a handler with its collaborators
pub async fn build_handler(kind: HandlerKind, config: &RelayConfig) -> Arc<dyn Handler> {
    let sink: Arc<dyn ChatSink> = Arc::new(SlackWebhook::from_config(&config.slack));

    match kind {
        HandlerKind::Notifier => Arc::new(PipelineNotifier::new(config.slack.clone(), sink)),
        HandlerKind::BuildLogs => {
            let aws = AwsServices::for_region(&config.build_logs.region).await;
            Arc::new(BuildLogRelay::new(
                config.slack.clone(),
                config.build_logs.clone(),
                sink,
                Arc::new(aws.builds),
                Arc::new(aws.logs),
                Arc::new(aws.storage),
            ))
        }
        HandlerKind::LogSubscription => Arc::new(LogSubscriptionAggregator::new(
            config.slack.clone(),
            config.subscription.clone(),
            sink,
        )),
    }
}

async fn serve(handler: Arc<dyn Handler>) -> Result<()> {
    info!(handler = handler.name(), "Starting Lambda runtime");

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let handler = Arc::clone(&handler);
        async move { Ok::<HandlerResponse, lambda_runtime::Error>(handler.handle(event.payload).await) }
    }))
    .await
    .map_err(|e| anyhow::anyhow!("Lambda runtime failed: {}", e))
}

async fn invoke(handler: Arc<dyn Handler>, event_path: Option<PathBuf>) -> Result<()> {
    let raw = match event_path {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read event file: {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read event from stdin")?;
            buf
        }
    };

    let event: Value = serde_json::from_str(&raw).context("Event is not valid JSON")?;
    let response = handler.handle(event).await;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn show_config() -> Result<()> {
    let config = config::config()?;

    match &config.config_file {
        Some(path) => println!("# Config file: {}", path.display()),
        None => println!("# Config file: (none, using defaults and environment)"),
    }
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["pipeline-relay", "serve", "--handler", "log-subscription"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Serve {
                handler: HandlerKind::LogSubscription
            }
        ));
    }

    #[test]
    fn test_parse_invoke_with_event_file() {
        let cli = Cli::try_parse_from([
            "pipeline-relay",
            "--json-logs",
            "invoke",
            "--handler",
            "build-logs",
            "--event",
            "event.json",
        ])
        .unwrap();

        assert!(cli.json_logs);
        match cli.command {
            Commands::Invoke { handler, event } => {
                assert_eq!(handler, HandlerKind::BuildLogs);
                assert_eq!(event, Some(PathBuf::from("event.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_build_handler_names() {
        let config = RelayConfig::default();
        assert_eq!(build_handler(HandlerKind::Notifier, &config).await.name(), "notifier");
        assert_eq!(
            build_handler(HandlerKind::LogSubscription, &config).await.name(),
            "log-subscription"
        );
    }
}
