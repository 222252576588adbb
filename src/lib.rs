//! Mihbara - stroke capture and layered raster rendering core
//!
//! Turns pointer samples into pressure-aware strokes, rasterizes them with
//! round-pen or calligraphy nibs, and composites layers into a flat image.

pub mod brush;
pub mod commands;
pub mod config;
pub mod core;
pub mod input;
pub mod project;
pub mod raster;
pub mod render;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber. Call once from the host binary.
pub fn init() {
    let installed = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mihbara=info,mihbara_lib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if installed.is_ok() {
        tracing::debug!("Mihbara {} initialized", env!("CARGO_PKG_VERSION"));
    }
}
