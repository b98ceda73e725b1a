use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use watchman::config::{enabled_providers, Command, Settings};
use watchman::{mail, server, static_files};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("watchman=info,watchman_backend=info,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_target(false)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .init();
}

fn collect_static(settings: &Settings) -> Result<()> {
    let source = settings
        .command_args
        .iter()
        .find(|arg| !arg.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| static_files::default_source(settings));

    let report = static_files::collect(&source, &settings.static_assets)
        .with_context(|| format!("collectstatic from {}", source.display()))?;

    println!(
        "{} static file(s) copied to {}",
        report.copied,
        settings.static_assets.static_root().display()
    );
    if let Some(manifest) = report.manifest {
        println!(
            "{} hashed, {} compressed, manifest written to {}",
            report.hashed,
            report.compressed,
            manifest.display()
        );
    }
    Ok(())
}

fn check(settings: &Settings) -> Result<()> {
    mail::smtp_transport(&settings.email).context("email settings")?;
    let dump = serde_json::to_string_pretty(settings).context("serializing settings")?;
    println!("{}", dump);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let settings = match Settings::from_env() {
        Ok(settings) => Arc::new(settings),
        Err(errors) => {
            for e in errors.errors() {
                error!(key = e.key(), "{}", e);
            }
            return Err(errors.into());
        }
    };

    info!("Watchman backend starting");
    if settings.development_mode {
        info!("Mode: development");
    } else {
        info!("Mode: production");
    }
    info!("Allowed hosts: {:?}", settings.allowed_hosts);
    info!("Social providers: {:?}", enabled_providers(&settings.social));

    match &settings.command {
        Command::RunServer => server::serve(settings.clone()).await,
        Command::CollectStatic => collect_static(&settings),
        Command::Check => check(&settings),
        Command::Other(name) => anyhow::bail!("Unknown command: {}", name),
    }
}
