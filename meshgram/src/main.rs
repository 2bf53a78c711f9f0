mod cli;
mod output;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use meshgram_core::chat::{ChatBackend, TelegramBot};
use meshgram_core::command::{CommandRouter, Providers, command_list};
use meshgram_core::provider::{GithubModels, GoogleTranslate, WeatherApi};
use meshgram_core::transport::MeshtasticConnector;
use meshgram_core::{
    Bridge, BridgeConfig, ChatPoller, FrameCodec, PollSettings, Shutdown, Throttle, TransportLink,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::{Cli, Commands};
use crate::output::{OutputFormat, print_output};
use crate::utils::{print_info, print_success, print_warning};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Set up logging
    setup_logging(&cli);

    let config = cli.load_config()?;
    let format = OutputFormat::from_flag(cli.json);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Config => print_output(&config.redacted(), ["Setting", "Value"], format),
        Commands::Run => run(config, format).await,
    }
}

fn setup_logging(cli: &Cli) {
    let filter_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info,meshgram=debug,meshgram_core=debug"
    } else {
        "info"
    };

    // The stream buffer logs every partial frame at info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{filter_level},meshtastic::connections::stream_buffer=warn"
        ))
    });

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

async fn run(config: BridgeConfig, format: OutputFormat) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let weather = WeatherApi::new(config.weather_api_key.clone());
    let assistant = GithubModels::new(config.github_token.clone());
    if weather.is_configured() {
        info!("☀️ Weather provider ready");
    } else {
        print_warning("WEATHERAPI_KEY not set, /weather will ask for it");
    }
    if assistant.is_configured() {
        info!("🤖 AI provider ready");
    } else {
        print_warning("GITHUB_TOKEN not set, /ai will ask for it");
    }
    if !config.node_names.is_empty() {
        info!("📝 Name overrides: {:?}", config.node_names);
    }

    let providers = Providers {
        weather: Arc::new(weather),
        translator: Arc::new(GoogleTranslate::new()),
        assistant: Arc::new(assistant),
    };
    let codec = FrameCodec::new(config.max_payload_bytes);
    let router = CommandRouter::new(
        providers,
        codec,
        config.default_city.clone(),
        config.stage_delay(),
    );

    let chat: Arc<dyn ChatBackend> = Arc::new(TelegramBot::new(config.bot_token.clone()));
    let bridge = Bridge::new(
        TransportLink::new(MeshtasticConnector, config.retry_policy()),
        config.mesh_host.clone(),
        Throttle::new(config.send_interval),
        codec,
        router,
        Arc::clone(&chat),
        config.chat_ids.clone(),
        config.node_names.clone(),
    );
    let poller = ChatPoller::new(
        chat,
        config.chat_ids.clone(),
        bridge.outbox(),
        PollSettings {
            timeout: config.poll_timeout,
            interval: config.poll_interval,
            error_threshold: config.error_threshold,
            error_backoff: config.error_backoff,
        },
    );

    info!("📋 Commands: {}", command_list());
    info!(
        "⏱ Send interval: {}",
        humantime::format_duration(config.send_interval)
    );
    print_info(&format!(
        "Bridging {} with {} chat(s)",
        config.mesh_host,
        config.chat_ids.len()
    ));

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());
    let poller_task = tokio::spawn(poller.run(shutdown.clone()));

    let outcome = bridge.run(shutdown.clone()).await;
    shutdown.trigger();
    if let Err(e) = poller_task.await {
        warn!("Chat poller task failed: {e}");
    }

    let stats = outcome.context("Bridge stopped")?;
    print_success("Bridge stopped");
    print_output(&stats, ["Counter", "Value"], format)
}

fn spawn_signal_listener(shutdown: Shutdown) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("👋 Shutdown requested");
        shutdown.trigger();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!("Cannot listen for SIGTERM: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
