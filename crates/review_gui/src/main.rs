mod app;

use anyhow::{Context, Result};
use directories_next::ProjectDirs;
use eframe::{NativeOptions, egui};
use review_core::ReviewConfig;
use std::path::{Path, PathBuf};

use app::UiApp;

const CONFIG_ENV: &str = "IMAGE_REVIEW_CONFIG";
const CONFIG_FILE: &str = "review.toml";

fn main() {
    tracing_subscriber::fmt::init();
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e:#}");
            std::process::exit(2);
        }
    };

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([640.0, 760.0]),
        ..NativeOptions::default()
    };
    let title = format!("Image Review App {}", env!("IMAGE_REVIEW_VERSION"));
    if let Err(e) = eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| {
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(Box::new(UiApp::new(config)))
        }),
    ) {
        eprintln!("Application stopped with error: {e}");
    }
}

/// `$IMAGE_REVIEW_CONFIG`, then `./review.toml`, then the platform config dir.
fn load_config() -> Result<ReviewConfig> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return read_config(Path::new(&path));
    }
    let candidates = std::iter::once(PathBuf::from(CONFIG_FILE)).chain(
        ProjectDirs::from("", "", "image-review").map(|dirs| dirs.config_dir().join(CONFIG_FILE)),
    );
    for path in candidates {
        if path.exists() {
            return read_config(&path);
        }
    }
    tracing::info!("no {CONFIG_FILE} found; using defaults");
    Ok(ReviewConfig::default())
}

fn read_config(path: &Path) -> Result<ReviewConfig> {
    let config = ReviewConfig::load(path)
        .with_context(|| format!("reading {}", path.display()))?;
    tracing::info!("configuration loaded from {}", path.display());
    Ok(config)
}
