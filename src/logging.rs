use anyhow::{Context, Result};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config as LogConfig, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::Path;

use crate::config::env::Config;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";

/// Install the global logger for the relay
pub fn init(config: &Config) -> Result<()> {
    let log_config = build_config(config.debug_logs_enabled, config.log_file.as_deref())?;
    log4rs::init_config(log_config).context("Failed to install logger")?;
    Ok(())
}

fn build_config(debug: bool, log_file: Option<&Path>) -> Result<LogConfig> {
    let level = if debug { LevelFilter::Debug } else { LevelFilter::Info };

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();

    let mut builder = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        // HTTP internals are noisy at debug level
        .logger(Logger::builder().build("hyper", LevelFilter::Warn))
        .logger(Logger::builder().build("hyper_util", LevelFilter::Warn))
        .logger(Logger::builder().build("reqwest", LevelFilter::Warn));
    let mut root = Root::builder().appender("stdout");

    if let Some(path) = log_file {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder = builder.appender(Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }

    builder
        .build(root.build(level))
        .context("Invalid logging configuration")
}
