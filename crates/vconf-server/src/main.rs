//! `vconf-server` binary: settings, tracing, and the warp listener

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use vconf_server::settings::{SeedRecord, DEFAULT_SETTINGS_FILE};
use vconf_server::{routes, telemetry, LogFormat, Settings};

fn cli() -> Command {
    Command::new("vconf-server")
        .version(vconf_server::VERSION)
        .about("HTTP API for fetching and merging Vector pipeline configs")
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Settings file (defaults to ./app.toml when present)"),
        )
        .arg(
            Arg::new("address")
                .long("address")
                .help("Listen address, overrides SERVER_ADDRESS"),
        )
        .arg(
            Arg::new("payload-key")
                .long("payload-key")
                .help("Record data key holding the document text"),
        )
        .arg(
            Arg::new("max-attempts")
                .long("max-attempts")
                .value_parser(value_parser!(u32))
                .help("Update attempts before giving up on version conflicts"),
        )
        .arg(
            Arg::new("store-timeout-ms")
                .long("store-timeout-ms")
                .value_parser(value_parser!(u64))
                .help("Bound on each record store call"),
        )
        .arg(
            Arg::new("store-root")
                .long("store-root")
                .value_parser(value_parser!(PathBuf))
                .help("Use the file record store rooted here"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("NAMESPACE/NAME=FILE")
                .action(ArgAction::Append)
                .value_parser(value_parser!(SeedRecord))
                .help("Load FILE into the in-memory store at startup (repeatable)"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .default_value("text")
                .value_parser(value_parser!(LogFormat))
                .help("Log line format: text or json"),
        )
}

fn load_settings(args: &ArgMatches) -> anyhow::Result<Settings> {
    let mut settings = match args.get_one::<PathBuf>("config") {
        Some(path) => Settings::load(path)?,
        None if Path::new(DEFAULT_SETTINGS_FILE).is_file() => {
            Settings::load(Path::new(DEFAULT_SETTINGS_FILE))?
        }
        None => Settings::default(),
    };

    settings = settings.apply_env(|name| std::env::var(name).ok());

    if let Some(address) = args.get_one::<String>("address") {
        settings = settings.with_server_address(address);
    }
    if let Some(key) = args.get_one::<String>("payload-key") {
        settings = settings.with_payload_key(key);
    }
    if let Some(attempts) = args.get_one::<u32>("max-attempts") {
        settings = settings.with_max_update_attempts(*attempts);
    }
    if let Some(millis) = args.get_one::<u64>("store-timeout-ms") {
        settings = settings.with_store_timeout_ms(*millis);
    }
    if let Some(root) = args.get_one::<PathBuf>("store-root") {
        settings = settings.with_store_root(root);
    }
    for seed in args.get_many::<SeedRecord>("seed").into_iter().flatten() {
        settings = settings.with_seed(seed.clone());
    }

    settings.validate()?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli().get_matches();

    telemetry::init(args.get_one::<LogFormat>("log-format").copied().unwrap_or_default());

    let settings = load_settings(&args).context("failed to load settings")?;
    let addr = settings.socket_addr()?;
    let service = settings.build_service()?;
    let shutdown = service.shutdown_token().clone();

    let (bound, server) = warp::serve(routes(service, settings.max_body_bytes))
        .try_bind_with_graceful_shutdown(addr, async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", err);
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        })
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        address = %bound,
        payload_key = %settings.payload_key,
        max_update_attempts = settings.max_update_attempts,
        "vconf-server listening"
    );

    server.await;
    tracing::info!("vconf-server stopped");
    Ok(())
}
