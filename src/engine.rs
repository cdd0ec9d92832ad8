// src/engine.rs
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::{debug, error, info};
use ndarray::Array2;

use crate::config::{DisplaySettings, ExportSettings};
use crate::drivers::{parse_channel_line, DisplayFrame, DisplayTransform};
use crate::recorder::{export_trials, ExportSummary, TrialLog, TrialRow};
use crate::sequencer::{AcquisitionSettings, Sequencer, SequencerError, SequencerEvent};
use crate::types::{CommandSink, DeviceMode, Phase, SIGNAL_CHANNELS};

/// Raw lines kept for the viewer's text box.
pub const RAW_LOG_LINES: usize = 10;

// ============================================================
// 采集控制：计时流程 + 打标签录制 + 结束导出
// ============================================================
pub struct AcquisitionEngine {
    sequencer: Sequencer,
    log: TrialLog,
    run_started: Option<Instant>,
    export: ExportSettings,
    start_enabled: bool,
    last_export: Option<ExportSummary>,
}

impl AcquisitionEngine {
    pub fn new(export: &ExportSettings) -> Self {
        Self {
            sequencer: Sequencer::new(),
            log: TrialLog::new(),
            run_started: None,
            export: export.clone(),
            start_enabled: true,
            last_export: None,
        }
    }

    pub fn start(&mut self, settings: AcquisitionSettings) -> Result<(), SequencerError> {
        self.start_at(settings, Instant::now())
    }

    /// Clears the previous capture and begins a run at `now`.
    pub fn start_at(
        &mut self,
        settings: AcquisitionSettings,
        now: Instant,
    ) -> Result<(), SequencerError> {
        let events = self.sequencer.start(settings, Duration::ZERO)?;
        info!(
            "▶ acquisition started: {} rounds, rest {:?}, left {:?}, right {:?}",
            settings.rounds, settings.rest, settings.left, settings.right
        );
        self.log.clear();
        self.run_started = Some(now);
        self.start_enabled = false;
        self.last_export = None;
        self.apply(events);
        Ok(())
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        let Some(elapsed) = self.elapsed(now) else {
            return;
        };
        let events = self.sequencer.advance(elapsed);
        self.apply(events);
    }

    pub fn handle_line(&mut self, line: &str) {
        self.handle_line_at(line, Instant::now());
    }

    /// Brings the phase up to date, then records `line` if the recording window is open.
    pub fn handle_line_at(&mut self, line: &str, now: Instant) {
        self.tick_at(now);
        if !self.sequencer.is_recording() {
            return;
        }
        let (Some(class), Some(elapsed)) = (self.sequencer.current_class(), self.elapsed(now)) else {
            return;
        };
        match parse_channel_line(line) {
            Some(sample) => self.log.push(TrialRow {
                timestamp: elapsed.as_secs_f64(),
                values: sample.signal(),
                class,
            }),
            None => debug!("⚠️ not a sample line, not recorded: {line:?}"),
        }
    }

    pub fn start_enabled(&self) -> bool {
        self.start_enabled
    }

    pub fn instruction(&self) -> &'static str {
        self.sequencer.instruction()
    }

    pub fn phase(&self) -> Phase {
        self.sequencer.phase()
    }

    pub fn is_recording(&self) -> bool {
        self.sequencer.is_recording()
    }

    pub fn rounds_remaining(&self) -> u32 {
        self.sequencer.rounds_remaining()
    }

    pub fn time_remaining(&self, now: Instant) -> Option<Duration> {
        self.elapsed(now).and_then(|t| self.sequencer.time_remaining(t))
    }

    pub fn recorded_rows(&self) -> usize {
        self.log.len()
    }

    pub fn last_export(&self) -> Option<&ExportSummary> {
        self.last_export.as_ref()
    }

    fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.run_started.map(|start| now.saturating_duration_since(start))
    }

    fn apply(&mut self, events: Vec<SequencerEvent>) {
        for event in events {
            match event {
                SequencerEvent::PhaseEntered(phase) => debug!("phase -> {phase:?}"),
                SequencerEvent::RecordingStarted(class) => info!("🔴 recording {class}"),
                SequencerEvent::RecordingStopped => debug!("recording stopped"),
                SequencerEvent::Finished => self.finish(),
            }
        }
    }

    fn finish(&mut self) {
        info!("✅ collection finished, {} rows captured", self.log.len());
        match export_trials(&self.log, &self.export.output_dir, &self.export.filter()) {
            Ok(summary) => self.last_export = Some(summary),
            Err(err) => error!("❌ export failed: {err}"),
        }
        self.run_started = None;
        self.start_enabled = true;
    }
}

// ============================================================
// 实时显示控制：原始行日志 / 模式切换 / 通道开关
// ============================================================
pub struct ViewerEngine {
    raw_lines: VecDeque<String>,
    mode: DeviceMode,
    channel_enabled: [bool; SIGNAL_CHANNELS],
    transform: DisplayTransform,
}

impl ViewerEngine {
    pub fn new(display: &DisplaySettings) -> Self {
        Self {
            raw_lines: VecDeque::with_capacity(RAW_LOG_LINES + 1),
            mode: DeviceMode::default(),
            channel_enabled: [true; SIGNAL_CHANNELS],
            transform: DisplayTransform::new(display),
        }
    }

    pub fn push_line(&mut self, line: &str) {
        self.raw_lines.push_back(line.to_owned());
        while self.raw_lines.len() > RAW_LOG_LINES {
            self.raw_lines.pop_front();
        }
    }

    pub fn raw_text(&self) -> String {
        self.raw_lines
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    /// Flips Normal/Test and sends the command for the new mode.
    pub fn toggle_mode(&mut self, sink: &dyn CommandSink) {
        self.mode = self.mode.toggled();
        sink.send_line(self.mode.command());
        info!("device mode -> {}", self.mode.label());
    }

    pub fn send_text(&self, sink: &dyn CommandSink, text: &str) {
        sink.send_line(text);
    }

    pub fn channel_enabled(&self) -> &[bool; SIGNAL_CHANNELS] {
        &self.channel_enabled
    }

    pub fn set_channel_enabled(&mut self, channel: usize, enabled: bool) {
        if let Some(slot) = self.channel_enabled.get_mut(channel) {
            *slot = enabled;
        }
    }

    /// Samples to request from the reader each refresh.
    pub fn data_len(&self) -> usize {
        self.transform.data_len()
    }

    /// `None` until the reader has buffered a first sample.
    pub fn frame(&self, snapshot: Option<&Array2<f64>>) -> Option<DisplayFrame> {
        snapshot.map(|grid| self.transform.compute(grid, &self.channel_enabled))
    }
}
