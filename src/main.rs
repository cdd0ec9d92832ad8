// src/main.rs
mod config;
mod drivers;
mod engine;
mod gui;
mod network;
mod recorder;
mod sequencer;
mod types;
mod visualizer;
use anyhow::anyhow;
use clap::{Parser, ValueEnum};
use config::AppConfig;
use eframe::egui;
use std::path::PathBuf;
// 两个窗口：实时显示 / 定时采集
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum AppMode {
    /// Live waveforms, spectra and head map
    Viewer,
    /// Timed Left/Right trials saved to CSV
    Acquire,
}
impl AppMode {
    fn title(&self) -> &'static str {
        match self {
            AppMode::Viewer => "WiFi EEG Viewer",
            AppMode::Acquire => "WiFi EEG Acquisition",
        }
    }
}
#[derive(Parser, Debug)]
#[command(name = "wifi_eeg")]
#[command(about = "Acquisition and live view for a WiFi EEG headset")]
struct Args {
    /// Which window to open
    #[arg(value_enum, default_value = "viewer")]
    mode: AppMode,
    /// JSON configuration file (defaults apply when omitted)
    config: Option<PathBuf>,
}
// 入口函数
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mode = args.mode;
    let config = AppConfig::load_or_default(args.config.as_deref());
    log::info!("starting {} ({}:{})", mode.title(), config.reader.host, config.reader.port);
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1280.0, 800.0])
        .with_min_inner_size([900.0, 600.0])
        .with_title(mode.title());
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        mode.title(),
        options,
        Box::new(move |_cc| -> Box<dyn eframe::App> {
            match mode {
                AppMode::Viewer => Box::new(gui::ViewerApp::new(&config)),
                AppMode::Acquire => Box::new(gui::AcquisitionApp::new(&config)),
            }
        }),
    )
    .map_err(|err| anyhow!("window closed with error: {err}"))
}
