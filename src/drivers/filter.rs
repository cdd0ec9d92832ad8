//! Butterworth IIR design and zero-phase (forward-backward) application.
//!
//! The design follows the classic analog-prototype route: Butterworth poles on the
//! unit circle, pre-warped cutoffs, low-pass scaling or low-pass to band-pass
//! transform, then the bilinear transform. The result is kept as a cascade of
//! second-order sections, which stays well conditioned for narrow EEG bands
//! such as 0.5–30 Hz at 500 Hz.
use std::f64::consts::PI;
use rustfft::num_complex::Complex64;
use crate::drivers::FilterError;
/// Imaginary parts below this are treated as real poles when pairing sections.
const REAL_POLE_TOLERANCE: f64 = 1e-10;
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BandKind {
    Lowpass { cutoff_hz: f64 },
    Bandpass { low_hz: f64, high_hz: f64 },
}
impl BandKind {
    /// `lowcut <= 0` selects a low-pass at `highcut`, anything else a band-pass.
    pub fn from_cutoffs(lowcut_hz: f64, highcut_hz: f64) -> Self {
        if lowcut_hz <= 0.0 {
            BandKind::Lowpass {
                cutoff_hz: highcut_hz,
            }
        } else {
            BandKind::Bandpass {
                low_hz: lowcut_hz,
                high_hz: highcut_hz,
            }
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq)]
struct Section {
    b: [f64; 3],
    a: [f64; 3], // a[0] == 1
}
impl Section {
    fn dc_gain(&self) -> f64 {
        (self.b[0] + self.b[1] + self.b[2]) / (self.a[0] + self.a[1] + self.a[2])
    }
    /// Transposed direct form II state after settling on a unit step.
    fn step_state(&self) -> [f64; 2] {
        let y = self.dc_gain();
        let z2 = self.b[2] - self.a[2] * y;
        let z1 = self.b[1] - self.a[1] * y + z2;
        [z1, z2]
    }
    #[cfg(test)]
    fn response(&self, z: Complex64) -> Complex64 {
        let zi = z.inv();
        let num = (zi * self.b[2] + self.b[1]) * zi + self.b[0];
        let den = (zi * self.a[2] + self.a[1]) * zi + self.a[0];
        num / den
    }
}
/// Digital Butterworth filter as a cascade of second-order sections.
#[derive(Clone, Debug)]
pub struct ButterworthDesign {
    sections: Vec<Section>,
    /// Number of poles, i.e. the order of the equivalent transfer function.
    degree: usize,
}
impl ButterworthDesign {
    pub fn new(order: usize, kind: BandKind, sample_rate_hz: f64) -> Result<Self, FilterError> {
        if !(sample_rate_hz > 0.0) || !sample_rate_hz.is_finite() {
            return Err(FilterError::InvalidSampleRate);
        }
        if order == 0 {
            return Err(FilterError::InvalidOrder);
        }
        let nyquist_hz = sample_rate_hz / 2.0;
        let check = |cutoff_hz: f64| {
            if cutoff_hz > 0.0 && cutoff_hz < nyquist_hz {
                Ok(())
            } else {
                Err(FilterError::CutoffOutOfRange {
                    cutoff_hz,
                    nyquist_hz,
                })
            }
        };
        let fs2 = 2.0 * sample_rate_hz;
        let prewarp = |hz: f64| fs2 * (PI * hz / sample_rate_hz).tan();
        let prototype = analog_prototype(order);
        let (zeros, poles, gain) = match kind {
            BandKind::Lowpass { cutoff_hz } => {
                check(cutoff_hz)?;
                let wo = prewarp(cutoff_hz);
                let poles: Vec<Complex64> = prototype.iter().map(|&p| p * wo).collect();
                (Vec::new(), poles, wo.powi(order as i32))
            }
            BandKind::Bandpass { low_hz, high_hz } => {
                check(low_hz)?;
                check(high_hz)?;
                if low_hz >= high_hz {
                    return Err(FilterError::InvertedBand { low_hz, high_hz });
                }
                let (w1, w2) = (prewarp(low_hz), prewarp(high_hz));
                let bw = w2 - w1;
                let wo2 = w1 * w2;
                let mut poles = Vec::with_capacity(2 * order);
                for &p in &prototype {
                    let p_lp = p * (bw / 2.0);
                    let root = (p_lp * p_lp - wo2).sqrt();
                    poles.push(p_lp + root);
                    poles.push(p_lp - root);
                }
                let zeros = vec![Complex64::new(0.0, 0.0); order];
                (zeros, poles, bw.powi(order as i32))
            }
        };
        let (zeros, poles, gain) = bilinear(&zeros, &poles, gain, fs2);
        Ok(Self {
            sections: pair_sections(&zeros, &poles, gain),
            degree: poles.len(),
        })
    }
    pub fn lowpass(order: usize, cutoff_hz: f64, sample_rate_hz: f64) -> Result<Self, FilterError> {
        Self::new(order, BandKind::Lowpass { cutoff_hz }, sample_rate_hz)
    }
    pub fn bandpass(
        order: usize,
        low_hz: f64,
        high_hz: f64,
        sample_rate_hz: f64,
    ) -> Result<Self, FilterError> {
        Self::new(order, BandKind::Bandpass { low_hz, high_hz }, sample_rate_hz)
    }
    /// Edge padding used by `filtfilt`, three times the transfer function length.
    pub fn pad_len(&self) -> usize {
        3 * (self.degree + 1)
    }
    /// Single forward pass, with every section started in the steady state for `initial`.
    pub fn lfilter(&self, input: &[f64], initial: f64) -> Vec<f64> {
        let mut scale = initial;
        let mut states: Vec<[f64; 2]> = self
            .sections
            .iter()
            .map(|s| {
                let [z1, z2] = s.step_state();
                let state = [z1 * scale, z2 * scale];
                scale *= s.dc_gain();
                state
            })
            .collect();
        input
            .iter()
            .map(|&x| {
                let mut value = x;
                for (s, state) in self.sections.iter().zip(states.iter_mut()) {
                    let y = s.b[0] * value + state[0];
                    state[0] = s.b[1] * value - s.a[1] * y + state[1];
                    state[1] = s.b[2] * value - s.a[2] * y;
                    value = y;
                }
                value
            })
            .collect()
    }
    /// Zero-phase filtering with odd reflection padding at both ends.
    pub fn filtfilt(&self, input: &[f64]) -> Vec<f64> {
        let n = input.len();
        if n == 0 {
            return Vec::new();
        }
        let pad = self.pad_len().min(n - 1);
        let first = input[0];
        let last = input[n - 1];
        let mut extended = Vec::with_capacity(n + 2 * pad);
        extended.extend((1..=pad).rev().map(|i| 2.0 * first - input[i]));
        extended.extend_from_slice(input);
        extended.extend((n - 1 - pad..n - 1).rev().map(|i| 2.0 * last - input[i]));
        let mut forward = self.lfilter(&extended, extended[0]);
        forward.reverse();
        let mut backward = self.lfilter(&forward, forward[0]);
        backward.reverse();
        backward[pad..pad + n].to_vec()
    }
}
/// Zero-phase Butterworth filter of one channel.
///
/// Inputs shorter than `3 * order` come back unchanged, as do inputs for which no
/// filter can be designed (the error is logged).
pub fn filtfilt_butterworth(
    signal: &[f64],
    lowcut_hz: f64,
    highcut_hz: f64,
    sample_rate_hz: f64,
    order: usize,
) -> Vec<f64> {
    if signal.len() < order * 3 {
        return signal.to_vec();
    }
    let kind = BandKind::from_cutoffs(lowcut_hz, highcut_hz);
    match ButterworthDesign::new(order, kind, sample_rate_hz) {
        Ok(design) => design.filtfilt(signal),
        Err(err) => {
            log::warn!("filter skipped: {err}");
            signal.to_vec()
        }
    }
}
/// Filter parameters carried by configuration and applied per channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSpec {
    pub lowcut_hz: f64,
    pub highcut_hz: f64,
    pub sample_rate_hz: f64,
    pub order: usize,
}
impl FilterSpec {
    pub fn lowpass(cutoff_hz: f64, sample_rate_hz: f64, order: usize) -> Self {
        Self {
            lowcut_hz: 0.0,
            highcut_hz: cutoff_hz,
            sample_rate_hz,
            order,
        }
    }
    pub fn bandpass(low_hz: f64, high_hz: f64, sample_rate_hz: f64, order: usize) -> Self {
        Self {
            lowcut_hz: low_hz,
            highcut_hz: high_hz,
            sample_rate_hz,
            order,
        }
    }
    fn design(&self) -> Result<ButterworthDesign, FilterError> {
        let kind = BandKind::from_cutoffs(self.lowcut_hz, self.highcut_hz);
        ButterworthDesign::new(self.order, kind, self.sample_rate_hz)
    }
    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        filtfilt_butterworth(
            signal,
            self.lowcut_hz,
            self.highcut_hz,
            self.sample_rate_hz,
            self.order,
        )
    }
    /// Display smoothing: the trace is left alone until it is longer than the
    /// `filtfilt` edge padding (19 samples for a 5th-order low-pass).
    pub fn smooth(&self, signal: &[f64]) -> Vec<f64> {
        match self.design() {
            Ok(design) if signal.len() > design.pad_len() => design.filtfilt(signal),
            Ok(_) => signal.to_vec(),
            Err(err) => {
                log::warn!("smoothing skipped: {err}");
                signal.to_vec()
            }
        }
    }
    /// Filters every column independently; channels are never mixed.
    pub fn apply_columns(&self, columns: &[Vec<f64>]) -> Vec<Vec<f64>> {
        columns.iter().map(|column| self.apply(column)).collect()
    }
}
// scipy-style `buttap`: poles -exp(i*pi*m/(2N)) for m = -N+1, -N+3, ..., N-1
fn analog_prototype(order: usize) -> Vec<Complex64> {
    let n = order as f64;
    (0..order)
        .map(|k| {
            let m = -n + 1.0 + 2.0 * k as f64;
            -Complex64::from_polar(1.0, PI * m / (2.0 * n))
        })
        .collect()
}
fn bilinear(
    zeros: &[Complex64],
    poles: &[Complex64],
    gain: f64,
    fs2: f64,
) -> (Vec<Complex64>, Vec<Complex64>, f64) {
    let fs2 = Complex64::new(fs2, 0.0);
    let mut digital_zeros: Vec<Complex64> = zeros.iter().map(|&z| (fs2 + z) / (fs2 - z)).collect();
    let digital_poles: Vec<Complex64> = poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();
    // zeros at infinity land on Nyquist
    digital_zeros.resize(poles.len(), Complex64::new(-1.0, 0.0));
    let num: Complex64 = zeros.iter().map(|&z| fs2 - z).product();
    let den: Complex64 = poles.iter().map(|&p| fs2 - p).product();
    let digital_gain = gain * (num / den).re;
    (digital_zeros, digital_poles, digital_gain)
}
fn pair_sections(zeros: &[Complex64], poles: &[Complex64], gain: f64) -> Vec<Section> {
    let mut complex_poles = Vec::new();
    let mut real_poles = Vec::new();
    for p in poles {
        if p.im.abs() <= REAL_POLE_TOLERANCE {
            real_poles.push(p.re);
        } else if p.im > 0.0 {
            complex_poles.push(*p);
        }
    }
    // All zeros of a Butterworth low-pass or band-pass are real (+1 or -1).
    // Interleave them so every band-pass section gets one of each.
    let (mut plus, mut minus): (Vec<f64>, Vec<f64>) =
        zeros.iter().map(|z| z.re).partition(|&re| re > 0.0);
    let mut real_zeros = Vec::with_capacity(zeros.len());
    while !plus.is_empty() || !minus.is_empty() {
        if let Some(z) = plus.pop() {
            real_zeros.push(z);
        }
        if let Some(z) = minus.pop() {
            real_zeros.push(z);
        }
    }
    let mut zero_iter = real_zeros.into_iter();
    let mut sections = Vec::with_capacity((poles.len() + 1) / 2);
    let mut numerator_for = |count: usize| -> [f64; 3] {
        let taken: Vec<f64> = zero_iter.by_ref().take(count).collect();
        match taken.as_slice() {
            [z1, z2] => [1.0, -(z1 + z2), z1 * z2],
            [z1] => [1.0, -z1, 0.0],
            _ => [1.0, 0.0, 0.0],
        }
    };
    for p in &complex_poles {
        sections.push(Section {
            b: numerator_for(2),
            a: [1.0, -2.0 * p.re, p.norm_sqr()],
        });
    }
    for pair in real_poles.chunks(2) {
        let (b, a) = match pair {
            [p1, p2] => (numerator_for(2), [1.0, -(p1 + p2), p1 * p2]),
            [p] => (numerator_for(1), [1.0, -p, 0.0]),
            _ => continue,
        };
        sections.push(Section { b, a });
    }
    if let Some(first) = sections.first_mut() {
        for coeff in &mut first.b {
            *coeff *= gain;
        }
    }
    sections
}
#[cfg(test)]
impl ButterworthDesign {
    fn section_count(&self) -> usize {
        self.sections.len()
    }
    /// Magnitude response at `freq_hz`.
    fn gain_at(&self, freq_hz: f64, sample_rate_hz: f64) -> f64 {
        let z = Complex64::from_polar(1.0, 2.0 * PI * freq_hz / sample_rate_hz);
        self.sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.response(z))
            .norm()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    const FS: f64 = 500.0;
    fn sine(freq_hz: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / FS).sin())
            .collect()
    }
    #[test]
    fn short_input_is_returned_unchanged() {
        let signal: Vec<f64> = (0..14).map(|i| (i as f64 * 0.7).sin() * 3.0).collect();
        assert_eq!(filtfilt_butterworth(&signal, 0.5, 30.0, FS, 5), signal);
        assert_eq!(filtfilt_butterworth(&signal, 0.0, 50.0, FS, 5), signal);
        let fifteen: Vec<f64> = (0..15).map(|i| (i as f64 * 0.7).sin()).collect();
        assert_ne!(filtfilt_butterworth(&fifteen, 0.0, 50.0, FS, 5), fifteen);
    }
    #[test]
    fn output_has_input_length() {
        for len in [15, 16, 33, 34, 200] {
            let signal = sine(10.0, len);
            assert_eq!(filtfilt_butterworth(&signal, 0.5, 30.0, FS, 5).len(), len);
            assert_eq!(filtfilt_butterworth(&signal, 0.0, 50.0, FS, 5).len(), len);
        }
    }
    #[test]
    fn lowpass_response_is_butterworth() {
        let design = ButterworthDesign::lowpass(5, 50.0, FS).unwrap();
        assert_eq!(design.section_count(), 3);
        assert_eq!(design.pad_len(), 18);
        assert!((design.gain_at(0.0, FS) - 1.0).abs() < 1e-9);
        assert!((design.gain_at(50.0, FS) - 0.5f64.sqrt()).abs() < 1e-6);
        assert!(design.gain_at(150.0, FS) < 1e-2);
    }
    #[test]
    fn bandpass_response_is_butterworth() {
        let design = ButterworthDesign::bandpass(5, 0.5, 30.0, FS).unwrap();
        assert_eq!(design.section_count(), 5);
        assert_eq!(design.pad_len(), 33);
        assert!(design.gain_at(0.0, FS) < 1e-9);
        assert!((design.gain_at(0.5, FS) - 0.5f64.sqrt()).abs() < 1e-4);
        assert!((design.gain_at(30.0, FS) - 0.5f64.sqrt()).abs() < 1e-4);
        assert!((design.gain_at(8.0, FS) - 1.0).abs() < 1e-3);
        assert!(design.gain_at(120.0, FS) < 1e-3);
    }
    #[test]
    fn lowpass_keeps_slow_wave_without_phase_shift() {
        let slow = sine(5.0, 1000);
        let noisy: Vec<f64> = slow
            .iter()
            .zip(sine(150.0, 1000))
            .map(|(s, n)| s + 0.5 * n)
            .collect();
        let filtered = filtfilt_butterworth(&noisy, 0.0, 50.0, FS, 5);
        for i in 100..900 {
            assert!((filtered[i] - slow[i]).abs() < 0.02, "sample {i}");
        }
    }
    #[test]
    fn bandpass_removes_dc_offset() {
        let constant = vec![5.0; 200];
        let filtered = filtfilt_butterworth(&constant, 0.5, 30.0, FS, 5);
        assert!(filtered.iter().all(|v| v.abs() < 1e-6));
        let lowpassed = filtfilt_butterworth(&constant, 0.0, 50.0, FS, 5);
        assert!(lowpassed.iter().all(|v| (v - 5.0).abs() < 1e-6));
    }
    #[test]
    fn refiltering_is_close_to_a_single_pass_in_band() {
        let wave = sine(10.0, 1000);
        let once = filtfilt_butterworth(&wave, 0.0, 50.0, FS, 5);
        let twice = filtfilt_butterworth(&once, 0.0, 50.0, FS, 5);
        for i in 100..900 {
            assert!((once[i] - twice[i]).abs() < 1e-2);
        }
    }
    #[test]
    fn invalid_cutoffs_are_reported() {
        assert_eq!(
            ButterworthDesign::lowpass(5, 300.0, FS).unwrap_err(),
            FilterError::CutoffOutOfRange {
                cutoff_hz: 300.0,
                nyquist_hz: 250.0
            }
        );
        assert!(matches!(
            ButterworthDesign::bandpass(5, 30.0, 10.0, FS),
            Err(FilterError::InvertedBand { .. })
        ));
        assert_eq!(
            ButterworthDesign::lowpass(0, 50.0, FS).unwrap_err(),
            FilterError::InvalidOrder
        );
        // the convenience wrapper degrades to a pass-through
        let signal = sine(10.0, 64);
        assert_eq!(filtfilt_butterworth(&signal, 0.0, 300.0, FS, 5), signal);
    }
    #[test]
    fn columns_are_filtered_independently() {
        let spec = FilterSpec::bandpass(0.5, 30.0, FS, 5);
        let columns = vec![vec![1.0; 100], sine(10.0, 100)];
        let filtered = spec.apply_columns(&columns);
        assert_eq!(filtered[0], spec.apply(&columns[0]));
        assert_eq!(filtered[1], spec.apply(&columns[1]));
    }
    #[test]
    fn smoothing_waits_for_more_than_the_padding() {
        let spec = FilterSpec::lowpass(50.0, FS, 5);
        let eighteen: Vec<f64> = (0..18).map(|i| (i as f64 * 0.7).sin()).collect();
        assert_eq!(spec.smooth(&eighteen), eighteen);
        let nineteen: Vec<f64> = (0..19).map(|i| (i as f64 * 0.7).sin()).collect();
        let smoothed = spec.smooth(&nineteen);
        assert_eq!(smoothed.len(), 19);
        assert_ne!(smoothed, nineteen);
        // export keeps the shorter 3 x order threshold
        assert_ne!(spec.apply(&eighteen), eighteen);
    }
}
