//! One forward pass over a domain's records: select, resolve, copy.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::recovery::naming::{resolve_destination, shard_relative_path};
use crate::{ArchiveRecord, CopyOutcome, CopyStatus, RecoveryJob, RecoveryReport};

/// Fatal engine failures. Per-record copy problems are not errors at this
/// level; they are reported through `CopyStatus::Failed` and the pass
/// continues.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("existence probe failed for {}: {source}", .path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("collision probe limit reached for {}", .0.display())]
    ProbeExhausted(PathBuf),
}

/// Case-insensitive extension membership test, built fresh per job from the
/// caller's tokens. The caller's list is never mutated.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    suffixes: Vec<String>,
}

impl ExtensionFilter {
    pub fn new(tokens: &[String]) -> Self {
        let suffixes = tokens.iter().map(|t| format!(".{}", t)).collect();
        Self { suffixes }
    }

    /// True if `path` ends with `.{token}` for any token, ignoring ASCII
    /// case.
    pub fn matches(&self, path: &str) -> bool {
        let bytes = path.as_bytes();
        self.suffixes.iter().any(|suffix| {
            let s = suffix.as_bytes();
            bytes.len() >= s.len() && bytes[bytes.len() - s.len()..].eq_ignore_ascii_case(s)
        })
    }
}

#[derive(Debug, Clone)]
pub struct RecoveryProgress {
    /// Accepted records handled so far, including the current one.
    pub processed: usize,
    /// Total accepted records in this pass.
    pub total: usize,
    pub copied: usize,
    pub renamed: usize,
    pub failed: usize,
    pub current_file: String,
}

/// Copies accepted records out of the sharded archive tree.
///
/// The engine creates no directories; the destination tree must exist
/// before `recover` is called. Source data is only ever read.
pub struct RecoveryEngine {
    archive_root: PathBuf,
    progress_callback: Option<Box<dyn Fn(RecoveryProgress) + Send + Sync>>,
}

impl RecoveryEngine {
    pub fn new(archive_root: impl Into<PathBuf>) -> Self {
        Self {
            archive_root: archive_root.into(),
            progress_callback: None,
        }
    }

    pub fn set_progress_callback<F>(&mut self, callback: F)
    where
        F: Fn(RecoveryProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    /// Run one recovery pass. Records are processed in input order, so
    /// collision numbering is deterministic for a given record sequence.
    pub fn recover(
        &self,
        job: &RecoveryJob,
        records: &[ArchiveRecord],
    ) -> Result<RecoveryReport, RecoveryError> {
        let started_at = Utc::now();
        let filter = ExtensionFilter::new(&job.extensions);

        // The path filter intentionally matches anywhere in the path, not
        // only as a leading segment.
        let selected: Vec<&ArchiveRecord> = records
            .iter()
            .filter(|r| {
                r.relative_path.contains(&job.path_filter) && filter.matches(&r.relative_path)
            })
            .collect();

        tracing::info!(
            "Recovering {} of {} {} records to {}",
            selected.len(),
            records.len(),
            job.domain,
            job.dest_dir.display()
        );

        let mut outcomes = Vec::with_capacity(selected.len());
        let mut copied = 0usize;
        let mut renamed = 0usize;
        let mut failed = 0usize;
        let mut bytes_copied = 0u64;

        for (i, record) in selected.iter().enumerate() {
            let source = self
                .archive_root
                .join(shard_relative_path(&record.identifier));
            let file_name = record.original_filename();

            let (destination, was_renamed) = resolve_destination(&job.dest_dir, file_name)?;
            if was_renamed {
                tracing::info!(
                    "Duplicate filename {}, renaming to {}",
                    file_name,
                    destination.display()
                );
            }

            match fs::copy(&source, &destination) {
                Ok(bytes) => {
                    copied += 1;
                    bytes_copied += bytes;
                    let status = if was_renamed {
                        renamed += 1;
                        CopyStatus::RenamedDuplicate
                    } else {
                        CopyStatus::Copied
                    };
                    outcomes.push(CopyOutcome {
                        record: (*record).clone(),
                        destination,
                        bytes_copied: bytes,
                        status,
                    });
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        "Failed to copy {} from {}: {}",
                        record.relative_path,
                        source.display(),
                        e
                    );
                    outcomes.push(CopyOutcome {
                        record: (*record).clone(),
                        destination,
                        bytes_copied: 0,
                        status: CopyStatus::Failed(e.to_string()),
                    });
                }
            }

            self.emit_progress(RecoveryProgress {
                processed: i + 1,
                total: selected.len(),
                copied,
                renamed,
                failed,
                current_file: file_name.to_string(),
            });
        }

        let report = RecoveryReport {
            run_id: Uuid::new_v4(),
            domain: job.domain.clone(),
            started_at,
            finished_at: Utc::now(),
            total_records: records.len(),
            matched: selected.len(),
            copied,
            renamed,
            failed,
            bytes_copied,
            outcomes,
        };

        tracing::info!(
            "Completed copying of {} {} files ({} renamed, {} failed)",
            report.copied,
            report.domain,
            report.renamed,
            report.failed
        );

        Ok(report)
    }

    fn emit_progress(&self, progress: RecoveryProgress) {
        if let Some(ref callback) = self.progress_callback {
            callback(progress);
        }
    }
}
