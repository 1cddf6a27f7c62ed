#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]

use eframe::egui;
use log::{error, info, warn};
use std::sync::Arc;

use smart_translate::config::{self, SettingsStore};

mod logger;
mod ui;

fn main() -> anyhow::Result<()> {
    logger::init();
    info!("App starting");

    // Settings: settings.json next to the exe. Env vars still override if present.
    let store = Arc::new(SettingsStore::open(config::settings_path()));
    if let Err(e) = store.seed_defaults() {
        error!("Failed to seed default settings: {}", e);
    }
    store.apply_env_overrides();
    if !store.get_with_defaults().is_configured() {
        warn!("API base URL or key not configured; opening Settings");
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Smart Translate")
            .with_inner_size([900.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Smart Translate",
        native_options,
        Box::new(move |cc| Box::new(ui::TranslatorApp::new(cc, store))),
    )
    .map_err(|e| anyhow::anyhow!("UI error: {}", e))?;

    info!("Main UI: event loop exited");
    Ok(())
}
