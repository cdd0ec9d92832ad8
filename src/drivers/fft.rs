use rustfft::{num_complex::Complex64, FftPlanner};
/// One-sided magnitude spectrum of a single channel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelSpectrum {
    pub frequencies_hz: Vec<f64>,
    pub magnitudes: Vec<f64>,
}
impl ChannelSpectrum {
    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }
}
/// Helper that computes real-input FFTs over the newest `fft_size` samples.
pub struct SpectrumBuilder {
    fft_size: usize,
    sample_rate_hz: f64,
}
impl SpectrumBuilder {
    /// Windows shorter than this produce no spectrum.
    pub const MIN_SAMPLES: usize = 3;
    pub fn with_size(fft_size: usize, sample_rate_hz: f64) -> Self {
        Self {
            fft_size,
            sample_rate_hz,
        }
    }
    /// Bins `k = 0..=n/2` at `k * fs / n`, magnitudes `|X_k| / n`, where `n` is the
    /// window actually used (the whole input when it is shorter than `fft_size`).
    pub fn compute(&self, samples: &[f64]) -> ChannelSpectrum {
        let window = &samples[samples.len().saturating_sub(self.fft_size)..];
        let n = window.len();
        if n < Self::MIN_SAMPLES {
            return ChannelSpectrum::default();
        }
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n);
        let mut buffer: Vec<Complex64> = window.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        fft.process(&mut buffer);
        let bins = n / 2 + 1;
        let frequencies_hz = (0..bins)
            .map(|k| k as f64 * self.sample_rate_hz / n as f64)
            .collect();
        let magnitudes = buffer
            .iter()
            .take(bins)
            .map(|c| c.norm() / n as f64)
            .collect();
        ChannelSpectrum {
            frequencies_hz,
            magnitudes,
        }
    }
}
