// src/gui.rs
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use eframe::egui;
use egui::{Align2, Color32, FontId, Rect, RichText, Rounding, Stroke, Vec2};
use egui_plot::{Legend, Line, Plot, PlotPoints};

use crate::config::{AcquisitionInputs, AppConfig};
use crate::drivers::DisplayFrame;
use crate::engine::{AcquisitionEngine, ViewerEngine};
use crate::network::NetworkReader;
use crate::sequencer::AcquisitionSettings;
use crate::types::{Phase, SIGNAL_CHANNELS};
use crate::visualizer::{self, DrawCommand, PlotSeries};

/// Repaint cadence while a run is in progress; phase deadlines are checked on every frame.
const ACQUISITION_TICK: Duration = Duration::from_millis(20);

// 把绘图指令翻译成 egui painter 调用
pub fn paint_commands(painter: &egui::Painter, rect: Rect, commands: &[DrawCommand]) {
    let origin = rect.min.to_vec2();
    for command in commands {
        match command {
            DrawCommand::FillRect { min, size, color } => {
                painter.rect_filled(
                    Rect::from_min_size(*min + origin, *size),
                    Rounding::same(0.0),
                    *color,
                );
            }
            DrawCommand::Line {
                from,
                to,
                width,
                color,
            } => {
                painter.line_segment([*from + origin, *to + origin], Stroke::new(*width, *color));
            }
            DrawCommand::Circle {
                center,
                radius,
                fill,
                stroke_width,
                stroke,
            } => {
                let stroke = Stroke::new(*stroke_width, *stroke);
                match fill {
                    Some(fill) => painter.circle(*center + origin, *radius, *fill, stroke),
                    None => painter.circle_stroke(*center + origin, *radius, stroke),
                };
            }
            DrawCommand::Text {
                pos,
                text,
                size,
                color,
            } => {
                painter.text(
                    *pos + origin,
                    Align2::CENTER_CENTER,
                    text,
                    FontId::proportional(*size),
                    *color,
                );
            }
        }
    }
}

fn plot_series(plot_ui: &mut egui_plot::PlotUi, series: Vec<PlotSeries>) {
    for s in series.into_iter().filter(|s| !s.is_empty()) {
        plot_ui.line(
            Line::new(PlotPoints::new(s.points))
                .name(s.label)
                .color(s.color)
                .width(1.5),
        );
    }
}

// ============================================================
// 实时显示窗口
// ============================================================
pub struct ViewerApp {
    reader: NetworkReader,
    lines: Receiver<String>,
    engine: ViewerEngine,
    refresh: Duration,
    last_refresh: Option<Instant>,
    frame: Option<DisplayFrame>,
    send_text: String,
}

impl ViewerApp {
    pub fn new(config: &AppConfig) -> Self {
        let mut reader = NetworkReader::connect(&config.reader);
        let lines = reader.subscribe();
        reader.start();
        Self {
            reader,
            lines,
            engine: ViewerEngine::new(&config.display),
            refresh: config.display.refresh(),
            last_refresh: None,
            frame: None,
            send_text: String::new(),
        }
    }

    fn refresh_frame(&mut self) {
        let due = self
            .last_refresh
            .map_or(true, |t| t.elapsed() >= self.refresh);
        if !due {
            return;
        }
        self.last_refresh = Some(Instant::now());
        let snapshot = self.reader.get_latest(self.engine.data_len());
        if let Some(frame) = self.engine.frame(snapshot.as_ref()) {
            self.frame = Some(frame);
        }
    }

    fn draw_plots(&self, ui: &mut egui::Ui) {
        let Some(frame) = &self.frame else {
            ui.label(if self.reader.is_running() {
                "Waiting for data..."
            } else {
                "Not connected."
            });
            return;
        };
        let height = (ui.available_height() / 2.0 - 10.0).max(120.0);
        ui.label("Time domain (50 Hz low-pass)");
        Plot::new("waveform_plot")
            .height(height)
            .legend(Legend::default())
            .include_y(frame.y_range.0)
            .include_y(frame.y_range.1)
            .auto_bounds_x()
            .show(ui, |plot_ui| plot_series(plot_ui, visualizer::waveform_series(frame)));
        ui.label("Spectrum");
        Plot::new("spectrum_plot")
            .height(height)
            .legend(Legend::default())
            .include_y(0.0)
            .show(ui, |plot_ui| plot_series(plot_ui, visualizer::spectrum_series(frame)));
    }

    fn draw_head(&self, ui: &mut egui::Ui) {
        let side = ui.available_width().min(320.0);
        let (response, painter) = ui.allocate_painter(Vec2::splat(side), egui::Sense::hover());
        let amplitudes = self
            .frame
            .as_ref()
            .map(|f| f.head_amplitudes)
            .unwrap_or([0.0; SIGNAL_CHANNELS]);
        let scene = visualizer::head_scene(response.rect.size(), &amplitudes);
        paint_commands(&painter, response.rect, &scene);
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        let raw = self.engine.raw_text();
        ui.add(
            egui::TextEdit::multiline(&mut raw.as_str())
                .font(egui::TextStyle::Monospace)
                .desired_rows(10),
        );
        ui.horizontal(|ui| {
            if ui.button(self.engine.mode().label()).clicked() {
                self.engine.toggle_mode(&self.reader);
            }
            ui.text_edit_singleline(&mut self.send_text);
            if ui.button("Send").clicked() {
                self.engine.send_text(&self.reader, &self.send_text);
            }
        });
        ui.horizontal_wrapped(|ui| {
            for ch in 0..SIGNAL_CHANNELS {
                let mut enabled = self.engine.channel_enabled()[ch];
                let label = RichText::new(format!("CH{}", ch + 1)).color(visualizer::CHANNEL_COLORS[ch]);
                if ui.checkbox(&mut enabled, label).changed() {
                    self.engine.set_channel_enabled(ch, enabled);
                }
            }
        });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(line) = self.lines.try_recv() {
            self.engine.push_line(&line);
        }
        self.refresh_frame();

        egui::SidePanel::right("viewer_side").min_width(340.0).show(ctx, |ui| {
            ui.heading("Head map");
            self.draw_head(ui);
            ui.separator();
            self.draw_controls(ui);
        });
        egui::CentralPanel::default().show(ctx, |ui| self.draw_plots(ui));

        ctx.request_repaint_after(self.refresh);
    }
}

// ============================================================
// 采集窗口
// ============================================================
pub struct AcquisitionApp {
    reader: NetworkReader,
    lines: Receiver<String>,
    engine: AcquisitionEngine,
    inputs: AcquisitionInputs,
}

impl AcquisitionApp {
    pub fn new(config: &AppConfig) -> Self {
        let mut reader = NetworkReader::connect(&config.reader);
        let lines = reader.subscribe();
        reader.start();
        Self {
            reader,
            lines,
            engine: AcquisitionEngine::new(&config.export),
            inputs: config.acquisition.clone(),
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        let enabled = self.engine.start_enabled();
        egui::Grid::new("acquisition_inputs").num_columns(2).show(ui, |ui| {
            ui.label("Rounds");
            ui.add_enabled(enabled, egui::TextEdit::singleline(&mut self.inputs.rounds));
            ui.end_row();
            ui.label("Rest (s)");
            ui.add_enabled(enabled, egui::TextEdit::singleline(&mut self.inputs.rest_secs));
            ui.end_row();
            ui.label("Left (s)");
            ui.add_enabled(enabled, egui::TextEdit::singleline(&mut self.inputs.left_secs));
            ui.end_row();
            ui.label("Right (s)");
            ui.add_enabled(enabled, egui::TextEdit::singleline(&mut self.inputs.right_secs));
            ui.end_row();
        });
        if ui.add_enabled(enabled, egui::Button::new("Start")).clicked() {
            let settings = AcquisitionSettings::from_inputs(
                &self.inputs.rounds,
                &self.inputs.rest_secs,
                &self.inputs.left_secs,
                &self.inputs.right_secs,
            );
            if let Err(err) = self.engine.start(settings) {
                log::warn!("{err}");
            }
        }
        ui.separator();
        if !self.reader.is_running() {
            ui.label(RichText::new("Device not connected").color(Color32::YELLOW));
        }
        ui.label(format!("Phase: {:?}", self.engine.phase()));
        if let Some(left) = self.engine.time_remaining(Instant::now()) {
            ui.label(format!("Remaining: {:.1} s", left.as_secs_f64()));
        }
        ui.label(format!("Rounds left: {}", self.engine.rounds_remaining()));
        ui.label(format!("Rows captured: {}", self.engine.recorded_rows()));
        if self.engine.is_recording() {
            ui.label(RichText::new("● Recording").color(Color32::RED));
        }
        if let Some(summary) = self.engine.last_export() {
            ui.label(format!("Saved {}", summary.raw_path.display()));
            match &summary.filtered_path {
                Some(path) => ui.label(format!("Saved {}", path.display())),
                None => ui.label("No data captured, filtered file skipped"),
            };
        }
    }
}

impl eframe::App for AcquisitionApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(line) = self.lines.try_recv() {
            self.engine.handle_line(&line);
        }
        self.engine.tick();

        egui::SidePanel::left("acquisition_side").min_width(220.0).show(ctx, |ui| {
            ui.heading("Acquisition");
            self.draw_controls(ui);
        });
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let size = ui.available_size();
                let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
                let scene = visualizer::instruction_scene(response.rect.size(), self.engine.instruction());
                paint_commands(&painter, response.rect, &scene);
            });

        if self.engine.phase() == Phase::Finished || self.engine.start_enabled() {
            ctx.request_repaint_after(Duration::from_millis(100));
        } else {
            ctx.request_repaint_after(ACQUISITION_TICK);
        }
    }
}
