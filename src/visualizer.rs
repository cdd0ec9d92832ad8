// src/visualizer.rs
//! Draw-command scenes for the instruction canvas and the scalp map, plus
//! plot series for the waveform and spectrum views. Coordinates are relative
//! to the top-left corner of the area being painted.
use eframe::egui;
use egui::{Color32, Pos2, Vec2};

use crate::drivers::DisplayFrame;
use crate::types::SIGNAL_CHANNELS;

pub const CROSS_HALF_LENGTH: f32 = 40.0;
pub const CROSS_WIDTH: f32 = 4.0;
pub const INSTRUCTION_FONT_SIZE: f32 = 48.0;
pub const ELECTRODE_RADIUS: f32 = 20.0;
const HEAD_RADIUS_RATIO: f32 = 0.45;
const LABEL_FONT_SIZE: f32 = 14.0;

/// Normalized (x, y) of each electrode; (0.5, 0.5) is the head center.
pub const ELECTRODE_POSITIONS: [(f32, f32); SIGNAL_CHANNELS] = [
    (0.39, 0.17),
    (0.61, 0.17),
    (0.34, 0.50),
    (0.66, 0.50),
    (0.21, 0.70),
    (0.79, 0.70),
    (0.38, 0.85),
    (0.62, 0.85),
];

pub const ORANGE: Color32 = Color32::from_rgb(255, 165, 0);

// 8 通道曲线颜色
pub const CHANNEL_COLORS: [Color32; SIGNAL_CHANNELS] = [
    Color32::from_rgb(0, 128, 0),
    Color32::from_rgb(0, 0, 255),
    Color32::from_rgb(0, 255, 255),
    Color32::from_rgb(255, 0, 255),
    Color32::from_rgb(255, 255, 0),
    Color32::WHITE,
    Color32::GRAY,
    ORANGE,
];

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    FillRect {
        min: Pos2,
        size: Vec2,
        color: Color32,
    },
    Line {
        from: Pos2,
        to: Pos2,
        width: f32,
        color: Color32,
    },
    Circle {
        center: Pos2,
        radius: f32,
        fill: Option<Color32>,
        stroke_width: f32,
        stroke: Color32,
    },
    /// Text centered on `pos`.
    Text {
        pos: Pos2,
        text: String,
        size: f32,
        color: Color32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlotSeries {
    pub label: String,
    pub color: Color32,
    pub points: Vec<[f64; 2]>,
}

impl PlotSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// White canvas, red fixation cross, and the instruction text when there is one.
pub fn instruction_scene(size: Vec2, text: &str) -> Vec<DrawCommand> {
    let center = Pos2::new(size.x / 2.0, size.y / 2.0);
    let mut commands = vec![
        DrawCommand::FillRect {
            min: Pos2::ZERO,
            size,
            color: Color32::WHITE,
        },
        DrawCommand::Line {
            from: center - Vec2::new(CROSS_HALF_LENGTH, 0.0),
            to: center + Vec2::new(CROSS_HALF_LENGTH, 0.0),
            width: CROSS_WIDTH,
            color: Color32::RED,
        },
        DrawCommand::Line {
            from: center - Vec2::new(0.0, CROSS_HALF_LENGTH),
            to: center + Vec2::new(0.0, CROSS_HALF_LENGTH),
            width: CROSS_WIDTH,
            color: Color32::RED,
        },
    ];
    if !text.is_empty() {
        commands.push(DrawCommand::Text {
            pos: center,
            text: text.to_owned(),
            size: INSTRUCTION_FONT_SIZE,
            color: Color32::BLACK,
        });
    }
    commands
}

pub fn electrode_color(amplitude: f64) -> Color32 {
    let amp = amplitude.abs();
    if amp > 0.45 {
        Color32::RED
    } else if amp > 0.3 {
        ORANGE
    } else {
        Color32::from_rgb(0, 128, 0)
    }
}

/// Schematic scalp map: head outline, one colored disc per electrode, "R" at the center.
pub fn head_scene(size: Vec2, amplitudes: &[f64; SIGNAL_CHANNELS]) -> Vec<DrawCommand> {
    let center = Pos2::new(size.x / 2.0, size.y / 2.0);
    let head_radius = size.x.min(size.y) * HEAD_RADIUS_RATIO;
    let mut commands = vec![DrawCommand::Circle {
        center,
        radius: head_radius,
        fill: None,
        stroke_width: 2.0,
        stroke: Color32::BLACK,
    }];
    for (i, (&(nx, ny), &amp)) in ELECTRODE_POSITIONS.iter().zip(amplitudes).enumerate() {
        let pos = center + Vec2::new((nx - 0.5) * 2.0 * head_radius, (ny - 0.5) * 2.0 * head_radius);
        commands.push(DrawCommand::Circle {
            center: pos,
            radius: ELECTRODE_RADIUS,
            fill: Some(electrode_color(amp)),
            stroke_width: 2.0,
            stroke: Color32::BLACK,
        });
        commands.push(DrawCommand::Text {
            pos,
            text: format!("{}", i + 1),
            size: LABEL_FONT_SIZE,
            color: Color32::BLACK,
        });
    }
    commands.push(DrawCommand::Text {
        pos: center,
        text: "R".to_owned(),
        size: LABEL_FONT_SIZE,
        color: Color32::DARK_GRAY,
    });
    commands
}

/// Smoothed traces against sample index; hidden channels give empty series.
pub fn waveform_series(frame: &DisplayFrame) -> Vec<PlotSeries> {
    frame
        .waveforms
        .iter()
        .enumerate()
        .map(|(ch, wave)| PlotSeries {
            label: channel_label(ch),
            color: CHANNEL_COLORS[ch % SIGNAL_CHANNELS],
            points: wave.iter().enumerate().map(|(i, &v)| [i as f64, v]).collect(),
        })
        .collect()
}

pub fn spectrum_series(frame: &DisplayFrame) -> Vec<PlotSeries> {
    frame
        .spectra
        .iter()
        .enumerate()
        .map(|(ch, spectrum)| PlotSeries {
            label: channel_label(ch),
            color: CHANNEL_COLORS[ch % SIGNAL_CHANNELS],
            points: spectrum
                .frequencies_hz
                .iter()
                .zip(&spectrum.magnitudes)
                .map(|(&f, &m)| [f, m])
                .collect(),
        })
        .collect()
}

fn channel_label(ch: usize) -> String {
    format!("CH{}", ch + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ChannelSpectrum;

    #[test]
    fn instruction_scene_draws_cross_and_text() {
        let scene = instruction_scene(Vec2::new(800.0, 600.0), "Left");
        assert_eq!(scene.len(), 4);
        assert!(matches!(scene[0], DrawCommand::FillRect { color, .. } if color == Color32::WHITE));
        assert_eq!(
            scene[1],
            DrawCommand::Line {
                from: Pos2::new(360.0, 300.0),
                to: Pos2::new(440.0, 300.0),
                width: 4.0,
                color: Color32::RED,
            }
        );
        match &scene[3] {
            DrawCommand::Text { pos, text, size, color } => {
                assert_eq!(*pos, Pos2::new(400.0, 300.0));
                assert_eq!(text, "Left");
                assert_eq!(*size, 48.0);
                assert_eq!(*color, Color32::BLACK);
            }
            other => panic!("unexpected {other:?}"),
        }
        // cue phase: cross only
        assert_eq!(instruction_scene(Vec2::new(800.0, 600.0), "").len(), 3);
    }

    #[test]
    fn electrode_colors_follow_thresholds() {
        assert_eq!(electrode_color(0.5), Color32::RED);
        assert_eq!(electrode_color(-0.46), Color32::RED);
        assert_eq!(electrode_color(0.45), ORANGE);
        assert_eq!(electrode_color(0.31), ORANGE);
        assert_eq!(electrode_color(0.3), Color32::from_rgb(0, 128, 0));
        assert_eq!(electrode_color(0.0), Color32::from_rgb(0, 128, 0));
    }

    #[test]
    fn head_scene_places_electrodes_inside_the_head() {
        let amps = [0.0, 0.4, 0.5, -0.6, 0.1, 0.2, 0.35, 1.0];
        let scene = head_scene(Vec2::new(400.0, 300.0), &amps);
        // outline + 8 x (disc + label) + "R"
        assert_eq!(scene.len(), 18);
        let DrawCommand::Circle { center, radius, fill, .. } = &scene[0] else {
            panic!("head outline first");
        };
        assert_eq!(*center, Pos2::new(200.0, 150.0));
        assert!((radius - 135.0).abs() < 1e-4);
        assert!(fill.is_none());
        match &scene[1] {
            DrawCommand::Circle { center, radius, fill, .. } => {
                assert!((center.x - (200.0 - 0.11 * 270.0)).abs() < 1e-3);
                assert!((center.y - (150.0 - 0.33 * 270.0)).abs() < 1e-3);
                assert_eq!(*radius, ELECTRODE_RADIUS);
                assert_eq!(*fill, Some(Color32::from_rgb(0, 128, 0)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(&scene[7], DrawCommand::Circle { fill: Some(c), .. } if *c == Color32::RED));
        assert!(matches!(&scene[17], DrawCommand::Text { text, .. } if text == "R"));
    }

    #[test]
    fn series_carry_palette_and_labels() {
        let mut waveforms = vec![Vec::new(); SIGNAL_CHANNELS];
        waveforms[2] = vec![1.0, 2.0, 3.0];
        let mut spectra = vec![ChannelSpectrum::default(); SIGNAL_CHANNELS];
        spectra[7] = ChannelSpectrum {
            frequencies_hz: vec![0.0, 250.0],
            magnitudes: vec![1.0, 0.5],
        };
        let frame = DisplayFrame {
            waveforms,
            spectra,
            head_amplitudes: [0.0; SIGNAL_CHANNELS],
            y_range: (-1.0, 1.0),
        };
        let waves = waveform_series(&frame);
        assert_eq!(waves.len(), 8);
        assert_eq!(waves[2].label, "CH3");
        assert_eq!(waves[2].color, Color32::from_rgb(0, 255, 255));
        assert_eq!(waves[2].points, vec![[0.0, 1.0], [1.0, 2.0], [2.0, 3.0]]);
        assert!(waves[0].is_empty());
        let spectra = spectrum_series(&frame);
        assert_eq!(spectra[7].label, "CH8");
        assert_eq!(spectra[7].color, ORANGE);
        assert_eq!(spectra[7].points, vec![[0.0, 1.0], [250.0, 0.5]]);
    }
}
