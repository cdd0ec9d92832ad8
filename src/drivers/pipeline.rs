use ndarray::Array2;
use crate::config::DisplaySettings;
use crate::drivers::fft::{ChannelSpectrum, SpectrumBuilder};
use crate::drivers::FilterSpec;
use crate::types::SIGNAL_CHANNELS;
/// Y range used when no channel is selected.
pub const DEFAULT_Y_RANGE: (f64, f64) = (-4.5, 4.5);
/// Ready-to-plot view of the newest samples of the 8 signal channels.
#[derive(Clone, Debug)]
pub struct DisplayFrame {
    /// Smoothed time-domain traces; empty for hidden channels.
    pub waveforms: Vec<Vec<f64>>,
    /// Magnitude spectra of the raw traces; empty for hidden channels.
    pub spectra: Vec<ChannelSpectrum>,
    /// `|newest sample|` of every channel, hidden or not.
    pub head_amplitudes: [f64; SIGNAL_CHANNELS],
    pub y_range: (f64, f64),
}
/// Turns ring buffer snapshots into display frames.
pub struct DisplayTransform {
    data_len: usize,
    smoothing: FilterSpec,
    spectrum: SpectrumBuilder,
}
impl DisplayTransform {
    pub fn new(settings: &DisplaySettings) -> Self {
        Self {
            data_len: settings.data_len,
            smoothing: settings.smoothing_filter(),
            spectrum: SpectrumBuilder::with_size(settings.fft_size, settings.sample_rate_hz),
        }
    }
    pub fn data_len(&self) -> usize {
        self.data_len
    }
    /// `snapshot` is a `channels x samples` grid whose row 0 is the reference channel.
    pub fn compute(&self, snapshot: &Array2<f64>, enabled: &[bool; SIGNAL_CHANNELS]) -> DisplayFrame {
        let mut waveforms = Vec::with_capacity(SIGNAL_CHANNELS);
        let mut spectra = Vec::with_capacity(SIGNAL_CHANNELS);
        let mut head_amplitudes = [0.0; SIGNAL_CHANNELS];
        let mut y_bounds: Option<(f64, f64)> = None;
        let skip = snapshot.ncols().saturating_sub(self.data_len);
        for ch in 0..SIGNAL_CHANNELS {
            let wave: Vec<f64> = if ch + 1 < snapshot.nrows() {
                snapshot.row(ch + 1).iter().skip(skip).copied().collect()
            } else {
                Vec::new()
            };
            head_amplitudes[ch] = wave.last().map(|v| v.abs()).unwrap_or(0.0);
            if !enabled[ch] {
                waveforms.push(Vec::new());
                spectra.push(ChannelSpectrum::default());
                continue;
            }
            for &v in &wave {
                y_bounds = Some(match y_bounds {
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                    None => (v, v),
                });
            }
            waveforms.push(self.smoothing.smooth(&wave));
            spectra.push(self.spectrum.compute(&wave));
        }
        DisplayFrame {
            waveforms,
            spectra,
            head_amplitudes,
            y_range: y_bounds.unwrap_or(DEFAULT_Y_RANGE),
        }
    }
}
