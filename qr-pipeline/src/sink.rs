// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::warn;
use qr_core::QrError;
use qr_fountain::{verify, Verification};
use qr_router::FileState;
use serde::Serialize;

/// A descriptor of an incomplete file, written alongside the output
/// directory so a later session can resume or at least report progress.
#[derive(Debug, Clone, Serialize)]
pub struct PartialDescriptor {
    pub file_name: String,
    pub file_size: i64,
    pub num_chunks: usize,
    pub recovered_chunks: usize,
    pub percentage: u32,
    pub missing_chunks: Vec<usize>,
    pub pending_coded_packets: usize,
}

/// Session-wide summary, optionally written to `integrity_report.json`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub verified: Vec<String>,
    pub corrupt: Vec<String>,
    pub incomplete: Vec<String>,
    pub unverified: Vec<String>,
}

/// What happened when [`Sink::save`] was asked to persist a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(Verification),
    /// The decoder had not recovered every chunk yet.
    Incomplete,
    /// Checksum comparison failed; bytes were written to `<name>.failed`.
    Corrupt { expected: String, actual: String },
    /// `save` had already succeeded for this `file_name`.
    AlreadySaved,
}

/// Writes finalized files atomically, quarantines corrupt reconstructions,
/// and records partial-progress descriptors for incomplete files. Owned by
/// a single thread (the pipeline's optional sink task); no locking.
pub struct Sink {
    output_dir: PathBuf,
    already_saved: HashSet<String>,
}

impl Sink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Sink { output_dir: output_dir.into(), already_saved: HashSet::new() }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Assembles and verifies `file`, writing it atomically to
    /// `OUT/<file_name>` on success, or `OUT/<file_name>.failed` on a
    /// checksum mismatch. Idempotent per `file_name`.
    pub fn save(&mut self, file: &FileState) -> Result<SaveOutcome, QrError> {
        if self.already_saved.contains(&file.file_name) {
            return Ok(SaveOutcome::AlreadySaved);
        }

        let bytes = match file.finalize() {
            Ok(bytes) => bytes,
            Err(_) => return Ok(SaveOutcome::Incomplete),
        };

        let verification = verify(&bytes, &file.metadata.file_checksum);

        match verification {
            Verification::Corrupt { expected, actual } => {
                let failed_path = self.output_dir.join(format!("{}.failed", file.file_name));
                self.write_atomically(&failed_path, &bytes)?;
                warn!("{} failed checksum verification; quarantined to {failed_path:?}", file.file_name);
                Ok(SaveOutcome::Corrupt { expected, actual })
            }
            verdict @ (Verification::Verified | Verification::Unverified) => {
                let final_path = self.output_dir.join(&file.file_name);
                self.write_atomically(&final_path, &bytes)?;
                self.already_saved.insert(file.file_name.clone());
                if verdict == Verification::Unverified {
                    warn!("{} saved without a checksum to verify against", file.file_name);
                }
                Ok(SaveOutcome::Saved(verdict))
            }
        }
    }

    /// Writes a `<file_name>.partial.json` descriptor for an incomplete
    /// file, for a future session to report on (or resume).
    pub fn save_partial(&self, file: &FileState) -> Result<(), QrError> {
        let (recovered, total) = file.progress();
        let percentage = if total == 0 { 100 } else { (recovered * 100 / total) as u32 };

        let descriptor = PartialDescriptor {
            file_name: file.file_name.clone(),
            file_size: file.metadata.file_size,
            num_chunks: total,
            recovered_chunks: recovered,
            percentage,
            missing_chunks: file.missing_indices(),
            pending_coded_packets: file.pending_coded_count(),
        };

        let path = self.output_dir.join(format!("{}.partial.json", file.file_name));
        let json = serde_json::to_vec_pretty(&descriptor).map_err(|e| QrError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        self.write_atomically(&path, &json)
    }

    pub fn write_integrity_report(&self, report: &IntegrityReport) -> Result<(), QrError> {
        let path = self.output_dir.join("integrity_report.json");
        let json = serde_json::to_vec_pretty(report).map_err(|e| QrError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        self.write_atomically(&path, &json)
    }

    fn write_atomically(&self, path: &Path, bytes: &[u8]) -> Result<(), QrError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let tmp_path = path.with_extension(tmp_extension(path));
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(bytes)?;
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

fn tmp_extension(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{ext}.tmp"),
        None => "tmp".to_string(),
    }
}

/// Tallies [`SaveOutcome`]s into an [`IntegrityReport`] across a session.
#[derive(Default)]
pub struct ReportBuilder {
    report: IntegrityReport,
}

impl ReportBuilder {
    pub fn record(&mut self, file_name: &str, outcome: &SaveOutcome) {
        match outcome {
            SaveOutcome::Saved(Verification::Verified) => self.report.verified.push(file_name.to_string()),
            SaveOutcome::Saved(Verification::Unverified) => self.report.unverified.push(file_name.to_string()),
            SaveOutcome::Saved(Verification::Corrupt { .. }) => unreachable!("Saved never carries Corrupt"),
            SaveOutcome::Corrupt { .. } => self.report.corrupt.push(file_name.to_string()),
            SaveOutcome::Incomplete => self.report.incomplete.push(file_name.to_string()),
            SaveOutcome::AlreadySaved => {}
        }
    }

    pub fn record_incomplete(&mut self, file_name: &str) {
        self.report.incomplete.push(file_name.to_string());
    }

    pub fn finish(self) -> IntegrityReport {
        self.report
    }
}
