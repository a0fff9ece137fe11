mod backend_bridge;
mod controller;
mod ui;

use clap::Parser;
use client_core::{
    config::{load_settings, normalize_server_url},
    EndpointFlow,
};
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use crate::backend_bridge::{commands::BackendCommand, runtime};
use crate::controller::events::UiEvent;
use crate::ui::{LabelApp, StartupConfig};

#[derive(Parser, Debug)]
#[command(name = "labelgen-gui", about = "Desktop front end for the label server")]
struct Cli {
    /// Label server base URL; overrides labelgen.toml and environment.
    #[arg(long)]
    server_url: Option<String>,
    /// Talk to servers that only expose the single-step `/upload` endpoint.
    #[arg(long)]
    legacy: bool,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(server_url) = &cli.server_url {
        settings.server_url = normalize_server_url(server_url);
    }
    let mut options = settings.workflow_options();
    if cli.legacy {
        options.flow = EndpointFlow::LegacyUpload;
    }
    tracing::info!(server_url = %settings.server_url, ?options, "starting label generator");

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    runtime::launch(settings.server_url.clone(), cmd_rx, ui_tx);

    let startup = StartupConfig {
        server_url: settings.server_url,
        options,
    };
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Label Generator")
            .with_inner_size([880.0, 620.0])
            .with_min_inner_size([640.0, 480.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "Label Generator",
        native_options,
        Box::new(|_cc| Ok(Box::new(LabelApp::new(startup, cmd_tx, ui_rx)))),
    )
}
