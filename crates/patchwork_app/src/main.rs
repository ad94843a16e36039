// SPDX-License-Identifier: MIT OR Apache-2.0
//! Patchwork - media session graph monitor
//!
//! Mirrors a media routing session into a graph model:
//! - Replays a scripted session on its own thread
//! - Polls the event bridge on a fixed cadence
//! - Requests new links from the session
//! - Applies a rubberband selection to the final graph
//!
//! ## Usage
//!
//! `patchwork [settings.ron]`. Without a settings file the built-in demo
//! session is played with default settings. `patchwork --init <path>`
//! writes the default settings as a starting point.

mod monitor;
mod session;
mod settings;

use clap::Parser;
use settings::MonitorSettings;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(name = "patchwork", version, about = "Mirror a media session into a graph")]
struct Cli {
    /// Settings file (RON); built-in defaults when omitted
    #[arg(value_name = "SETTINGS")]
    settings: Option<PathBuf>,

    /// Write the default settings to this path and exit
    #[arg(long, value_name = "PATH", conflicts_with = "settings")]
    init: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    if let Some(path) = cli.init {
        if let Err(e) = MonitorSettings::default().save(&path) {
            eprintln!("Failed to write settings: {e}");
            std::process::exit(1);
        }
        println!("Wrote default settings to {}", path.display());
        return;
    }

    let settings = match MonitorSettings::load_or_default(cli.settings.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings: {e}");
            std::process::exit(2);
        }
    };

    // RUST_LOG wins over the configured filter
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Patchwork v{}", env!("CARGO_PKG_VERSION"));

    match monitor::run(&settings) {
        Ok(report) => {
            tracing::info!(
                nodes = report.nodes,
                pads = report.pads,
                links = report.links,
                selected = report.selected.len(),
                changes = report.changes,
                created_on_request = report.created_on_request,
                "Session finished"
            );
            tracing::debug!(stats = ?report.stats, "Bridge statistics");
        }
        Err(e) => {
            tracing::error!("Monitor failed: {e}");
            std::process::exit(1);
        }
    }
}
