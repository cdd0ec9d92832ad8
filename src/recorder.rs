// src/recorder.rs
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::drivers::FilterSpec;
use crate::types::{ClassLabel, SIGNAL_CHANNELS};

pub const RAW_FILE_NAME: &str = "EEG_data_raw.csv";
pub const FILTERED_FILE_NAME: &str = "EEG_data_filtered.csv";
pub const CSV_HEADER: &str = "Timestamp,EEG_1,EEG_2,EEG_3,EEG_4,EEG_5,EEG_6,EEG_7,EEG_8,Class";

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One labeled sample captured while recording.
#[derive(Clone, Debug, PartialEq)]
pub struct TrialRow {
    /// Seconds since the acquisition run started.
    pub timestamp: f64,
    pub values: [f64; SIGNAL_CHANNELS],
    pub class: ClassLabel,
}

/// Rows of one acquisition run, in arrival order.
#[derive(Clone, Debug, Default)]
pub struct TrialLog {
    rows: Vec<TrialRow>,
}

impl TrialLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: TrialRow) {
        self.rows.push(row);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[TrialRow] {
        &self.rows
    }

    /// Channel-major copy of the signal values.
    pub fn columns(&self) -> Vec<Vec<f64>> {
        (0..SIGNAL_CHANNELS)
            .map(|ch| self.rows.iter().map(|row| row.values[ch]).collect())
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportSummary {
    pub rows: usize,
    pub raw_path: PathBuf,
    /// `None` when nothing was captured.
    pub filtered_path: Option<PathBuf>,
}

/// Writes the raw capture and, when rows exist, a copy band-passed over each
/// whole channel column.
pub fn export_trials(
    log: &TrialLog,
    dir: &Path,
    filter: &FilterSpec,
) -> Result<ExportSummary, RecorderError> {
    fs::create_dir_all(dir).map_err(|source| RecorderError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let raw_path = dir.join(RAW_FILE_NAME);
    write_csv(&raw_path, log.rows())?;
    info!("💾 raw data saved to {} ({} rows)", raw_path.display(), log.len());

    if log.is_empty() {
        warn!("no trial rows captured, skipping {FILTERED_FILE_NAME}");
        return Ok(ExportSummary {
            rows: 0,
            raw_path,
            filtered_path: None,
        });
    }

    let filtered_columns = filter.apply_columns(&log.columns());
    let filtered_rows: Vec<TrialRow> = log
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut values = [0.0; SIGNAL_CHANNELS];
            for (ch, slot) in values.iter_mut().enumerate() {
                *slot = filtered_columns[ch][i];
            }
            TrialRow {
                values,
                ..row.clone()
            }
        })
        .collect();

    let filtered_path = dir.join(FILTERED_FILE_NAME);
    write_csv(&filtered_path, &filtered_rows)?;
    info!("💾 filtered data saved to {}", filtered_path.display());

    Ok(ExportSummary {
        rows: log.len(),
        raw_path,
        filtered_path: Some(filtered_path),
    })
}

fn write_csv(path: &Path, rows: &[TrialRow]) -> Result<(), RecorderError> {
    let to_error = |source| RecorderError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(to_error)?;
    let mut w = BufWriter::new(file);
    writeln!(w, "{CSV_HEADER}").map_err(to_error)?;
    for row in rows {
        write!(w, "{:?}", row.timestamp).map_err(to_error)?;
        for v in &row.values {
            write!(w, ",{v:?}").map_err(to_error)?;
        }
        writeln!(w, ",{}", row.class).map_err(to_error)?;
    }
    w.flush().map_err(to_error)
}
