//! Recovery of original filenames from a content-addressed device backup.
//!
//! The backup stores every file under an obfuscated, content-derived name
//! inside two-character shard directories and records the true relative
//! path in a SQLite index. This crate reads that index and copies matching
//! files back out under their original names.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

pub mod identity;
pub mod manifest;
pub mod recovery;

// Re-export key types
pub use manifest::{DomainSummary, ManifestIndex};
pub use recovery::{
    resolve_destination, shard_relative_path, ExtensionFilter, RecoveryEngine, RecoveryError,
    RecoveryProgress,
};

/// One row of the backup's file index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRecord {
    /// Content-derived hex string, used verbatim as the obfuscated on-disk
    /// filename and as the two-character shard key.
    pub identifier: String,
    /// Logical namespace tag, e.g. "CameraRollDomain".
    pub domain: String,
    /// Original forward-slash-separated path on the source device.
    pub relative_path: String,
}

impl ArchiveRecord {
    /// Final path segment of `relative_path` — the filename to restore.
    pub fn original_filename(&self) -> &str {
        self.relative_path.rsplit('/').next().unwrap_or("")
    }
}

/// Caller-supplied descriptor for one recovery pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryJob {
    pub domain: String,
    /// Case-insensitive extension tokens, without the leading dot.
    pub extensions: Vec<String>,
    /// Substring that `relative_path` must contain. Matches anywhere in the
    /// path, not only as a leading segment.
    pub path_filter: String,
    pub dest_dir: PathBuf,
}

impl RecoveryJob {
    pub fn new(
        domain: impl Into<String>,
        extensions: Vec<String>,
        path_filter: impl Into<String>,
        dest_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            domain: domain.into(),
            extensions,
            path_filter: path_filter.into(),
            dest_dir: dest_dir.into(),
        }
    }

    /// Camera captures: pictures and videos taken with the device camera.
    pub fn camera_roll(dest_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            "CameraRollDomain",
            vec!["jpg".to_string(), "mov".to_string()],
            "Media/DCIM",
            dest_dir,
        )
    }

    /// Image and video attachments sent over SMS/MMS.
    pub fn sms_attachments(dest_dir: impl Into<PathBuf>) -> Self {
        let extensions = [
            "jpg", "jpeg", "gif", "png", "mov", "mp4", "avi", "m4v", "mpg", "mpeg", "webm", "ogv",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        Self::new(
            "MediaDomain",
            extensions,
            "Library/SMS/Attachments",
            dest_dir,
        )
    }
}

/// Per-file result of a recovery pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyOutcome {
    pub record: ArchiveRecord,
    pub destination: PathBuf,
    pub bytes_copied: u64,
    pub status: CopyStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyStatus {
    Copied,
    /// Copied successfully, but under a numbered name because the original
    /// destination already existed.
    RenamedDuplicate,
    Failed(String),
}

/// Summary of one recovery pass over a single domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub run_id: Uuid,
    pub domain: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Records handed to the engine before filtering.
    pub total_records: usize,
    /// Records that passed the path and extension filters.
    pub matched: usize,
    /// Files copied, including renamed duplicates.
    pub copied: usize,
    pub renamed: usize,
    pub failed: usize,
    pub bytes_copied: u64,
    pub outcomes: Vec<CopyOutcome>,
}

impl RecoveryReport {
    /// Per-record failures only.
    pub fn errors(&self) -> impl Iterator<Item = &CopyOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, CopyStatus::Failed(_)))
    }
}

/// Fetch a job's domain records from the index and run one recovery pass.
pub fn extract_domain(
    index: &ManifestIndex,
    engine: &RecoveryEngine,
    job: &RecoveryJob,
) -> Result<RecoveryReport> {
    let records = index.fetch_records(&job.domain)?;
    let report = engine.recover(job, &records)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn original_filename_is_last_segment() {
        let record = ArchiveRecord {
            identifier: "ab".repeat(20),
            domain: "CameraRollDomain".to_string(),
            relative_path: "Media/DCIM/100APPLE/IMG_0001.JPG".to_string(),
        };
        assert_eq!(record.original_filename(), "IMG_0001.JPG");
    }

    #[test]
    fn original_filename_without_separator() {
        let record = ArchiveRecord {
            identifier: "cd".repeat(20),
            domain: "MediaDomain".to_string(),
            relative_path: "voicemail.amr".to_string(),
        };
        assert_eq!(record.original_filename(), "voicemail.amr");
    }

    #[test]
    fn canonical_jobs_carry_expected_parameters() {
        let camera = RecoveryJob::camera_roll("out/camera");
        assert_eq!(camera.domain, "CameraRollDomain");
        assert_eq!(camera.path_filter, "Media/DCIM");
        assert_eq!(camera.extensions, vec!["jpg", "mov"]);

        let sms = RecoveryJob::sms_attachments("out/sms");
        assert_eq!(sms.domain, "MediaDomain");
        assert_eq!(sms.path_filter, "Library/SMS/Attachments");
        assert_eq!(sms.extensions.len(), 12);
    }
}
