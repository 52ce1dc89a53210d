use clap::Parser;
use crossbeam_channel::bounded;

mod backend_bridge;
mod config;
mod controller;
mod ui;

use backend_bridge::commands::BackendCommand;
use controller::events::UiEvent;

/// Desktop client for scene-graph prompt exploration.
#[derive(Debug, Parser)]
#[command(name = "scene-studio")]
struct Args {
    /// Base URL of the scene-graph parser service (also serves /prompt-to-image).
    #[arg(long)]
    scene_graph_url: Option<String>,

    /// Base URL of the probability service.
    #[arg(long)]
    probability_url: Option<String>,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let mut settings = config::load_settings();
    if let Some(url) = args.scene_graph_url {
        settings.scene_graph_url = url;
    }
    if let Some(url) = args.probability_url {
        settings.probability_url = url;
    }
    let endpoints = settings.endpoints();
    tracing::info!(
        scene_graph_url = %endpoints.scene_graph_url,
        probability_url = %endpoints.probability_url,
        "starting scene studio"
    );

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    backend_bridge::runtime::launch(cmd_rx, ui_tx, endpoints);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Scene Studio")
            .with_inner_size([1180.0, 760.0])
            .with_min_inner_size([860.0, 560.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Scene Studio",
        options,
        Box::new(|_cc| Ok(Box::new(ui::app::StudioApp::new(cmd_tx, ui_rx)))),
    )
}
