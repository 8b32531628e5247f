use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::app_dirs::AppDirs;
use crate::record::TestRecord;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// One flattened line of `history.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub completed_at: String,
    pub name: String,
    pub registration_number: String,
    pub department: String,
    pub half_time: u64,
    pub break_time: u64,
    pub first_characters: usize,
    pub first_mistakes: usize,
    pub first_time_spent: u64,
    pub second_characters: Option<usize>,
    pub second_mistakes: Option<usize>,
    pub second_time_spent: Option<u64>,
    pub total_characters: usize,
    pub total_mistakes: usize,
    pub ended_early: bool,
}

impl From<&TestRecord> for HistoryRow {
    fn from(r: &TestRecord) -> Self {
        Self {
            completed_at: r.completed_at.to_rfc3339(),
            name: r.name.clone(),
            registration_number: r.registration_number.clone(),
            department: r.department.clone(),
            half_time: r.half_time,
            break_time: r.break_time,
            first_characters: r.first_half.characters_typed,
            first_mistakes: r.first_half.mistakes,
            first_time_spent: r.first_half.time_spent,
            second_characters: r.second_half.map(|h| h.characters_typed),
            second_mistakes: r.second_half.map(|h| h.mistakes),
            second_time_spent: r.second_half.map(|h| h.time_spent),
            total_characters: r.total_characters_typed,
            total_mistakes: r.total_mistakes,
            ended_early: r.ended_early,
        }
    }
}

/// Append-only local log of finished sessions
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new() -> Option<Self> {
        AppDirs::history_path().map(|path| Self { path })
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &TestRecord) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // header only goes into a fresh file
        let needs_header = !self.path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(HistoryRow::from(record))?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<HistoryRow>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<HistoryRow>, csv::Error>>()?;
        Ok(rows)
    }
}
