mod cli;
mod config;
mod gmail;
mod logging;
mod server;
mod webhook;

use anyhow::Result;
use clap::Parser;
use cli::args::{Cli, Commands};
use config::env::Config;
use log::{info, warn};
use server::routes::AppState;
use std::sync::Arc;
use webhook::notification::{PushEnvelope, PushMessage};
use webhook::pipeline::NotificationPipeline;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;
    logging::init(&config)?;

    match cli.command {
        None => run_server(config, None).await?,
        Some(Commands::Serve { port }) => run_server(config, port).await?,
        Some(Commands::Replay { data }) => run_replay(config, data).await?,
    }

    Ok(())
}

async fn run_server(config: Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.port);
    info!("Starting Gmail relay (Gmail API at {})", config.gmail_api_base);
    if config.access_token.is_none() {
        warn!("ACCESS_TOKEN not set; notifications will be acknowledged but not resolved");
    }

    let pipeline = NotificationPipeline::new(Arc::new(config), reqwest::Client::new());
    server::routes::serve(AppState { pipeline }, port).await
}

async fn run_replay(config: Config, data: String) -> Result<()> {
    let pipeline = NotificationPipeline::new(Arc::new(config), reqwest::Client::new());

    let envelope = PushEnvelope {
        message: Some(PushMessage {
            data: Some(data),
            ..Default::default()
        }),
        subscription: None,
    };

    let records = pipeline.process(envelope).await?;

    if records.is_empty() {
        println!("No new emails for this notification");
    }
    for record in &records {
        println!("{}", serde_json::to_string_pretty(record)?);
    }

    Ok(())
}
