// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod app;
mod cli;
mod config;
mod map;
mod ui;
mod weather;

use clap::Parser;
use eframe::egui;
use log::{info, warn};
use mimalloc::MiMalloc;

use app::RadarApp;
use cli::Args;
use config::AppConfig;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load configuration, using defaults: {}", e);
        AppConfig::default()
    });
    args.apply(&mut config);

    if args.save_config {
        config.save()?;
        match AppConfig::get_config_path() {
            Ok(path) => info!("Configuration written to {}", path.display()),
            Err(e) => warn!("Configuration written, path unavailable: {}", e),
        }
        return Ok(());
    }

    info!("Starting Radar Desktop...");

    // Background work (radar refresh, geolocation, repaint events) runs here
    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Radar Desktop"),
        ..Default::default()
    };

    eframe::run_native(
        "Radar Desktop",
        options,
        Box::new(move |cc| {
            let app = RadarApp::new(cc, &config)?;
            Ok(Box::new(app))
        }),
    )?;

    Ok(())
}
