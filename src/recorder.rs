use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use chrono::Local;
use log::info;
use serde::{Deserialize, Serialize};
use crate::error::{Result, SpellerError};
use crate::scheduler::TrialOutcome;
/// One line of the trial log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub recorded_at: String,
    pub trial: usize,
    pub orders: Vec<Vec<u8>>,
    pub decoded: Option<char>,
    pub expected: Option<char>,
    pub short_sequences: Vec<usize>,
    pub anomalies: usize,
    pub features: usize,
    pub archive: Option<PathBuf>,
    #[serde(default)]
    pub auxiliary_archives: Vec<PathBuf>,
}
impl TrialRecord {
    pub fn from_outcome(outcome: &TrialOutcome, expected: Option<char>) -> Self {
        Self {
            recorded_at: Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            trial: outcome.trial,
            orders: outcome.orders.clone(),
            decoded: outcome.decoded.as_char(),
            expected,
            short_sequences: outcome.short_sequences(),
            anomalies: outcome.anomaly_count(),
            features: outcome.features.len(),
            archive: outcome.archive.clone(),
            auxiliary_archives: outcome.auxiliary_archives.clone(),
        }
    }
}
/// Appends one JSON line per finished trial.
pub struct TrialRecorder {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}
impl TrialRecorder {
    pub fn new() -> Self {
        Self {
            writer: None,
            path: None,
        }
    }
    pub fn start(&mut self, path: &Path) -> Result<()> {
        self.stop()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SpellerError::Persistence {
                path: path.to_path_buf(),
                source,
            })?;
        self.writer = Some(BufWriter::new(file));
        self.path = Some(path.to_path_buf());
        info!("trial log started: {}", path.display());
        Ok(())
    }
    pub fn stop(&mut self) -> Result<()> {
        if let Some(mut w) = self.writer.take() {
            w.flush()?;
            if let Some(path) = self.path.take() {
                info!("trial log saved: {}", path.display());
            }
        }
        Ok(())
    }
    /// Writes and flushes one record. A no-op while not recording.
    pub fn write_record(&mut self, record: &TrialRecord) -> Result<()> {
        let Some(w) = &mut self.writer else {
            return Ok(());
        };
        serde_json::to_writer(&mut *w, record).map_err(|source| SpellerError::Encode {
            name: format!("trial {}", record.trial),
            source,
        })?;
        writeln!(w)?;
        w.flush()?;
        Ok(())
    }
    pub fn is_recording(&self) -> bool {
        self.writer.is_some()
    }
}
impl Default for TrialRecorder {
    fn default() -> Self {
        Self::new()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Decoded;
    fn outcome(trial: usize, decoded: Decoded) -> TrialOutcome {
        TrialOutcome {
            trial,
            orders: vec![vec![2, 1, 3]],
            decoded,
            sequences: Vec::new(),
            features: Vec::new(),
            archive: None,
            auxiliary_archives: Vec::new(),
        }
    }
    #[test]
    fn records_append_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trials.jsonl");
        let mut recorder = TrialRecorder::new();
        assert!(!recorder.is_recording());
        recorder
            .write_record(&TrialRecord::from_outcome(&outcome(0, Decoded::NoDecode), None))
            .unwrap();
        recorder.start(&path).unwrap();
        assert!(recorder.is_recording());
        recorder
            .write_record(&TrialRecord::from_outcome(&outcome(1, Decoded::Char('A')), Some('A')))
            .unwrap();
        recorder
            .write_record(&TrialRecord::from_outcome(&outcome(2, Decoded::NoDecode), Some('B')))
            .unwrap();
        recorder.stop().unwrap();
        assert!(!recorder.is_recording());
        let raw = std::fs::read_to_string(&path).unwrap();
        let records: Vec<TrialRecord> = raw
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].decoded, Some('A'));
        assert_eq!(records[1].decoded, None);
        assert_eq!(records[1].expected, Some('B'));
        assert_eq!(records[0].orders, vec![vec![2, 1, 3]]);
    }
}
