use thiserror::Error;
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },
    #[error("field {index} is not a numeric literal: {field:?}")]
    NotNumeric { index: usize, field: String },
}
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("filter order must be at least 1")]
    InvalidOrder,
    #[error("cutoff {cutoff_hz} Hz must lie strictly between 0 and Nyquist ({nyquist_hz} Hz)")]
    CutoffOutOfRange { cutoff_hz: f64, nyquist_hz: f64 },
    #[error("band edges inverted: low {low_hz} Hz >= high {high_hz} Hz")]
    InvertedBand { low_hz: f64, high_hz: f64 },
}
