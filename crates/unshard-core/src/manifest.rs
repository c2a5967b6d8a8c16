//! Read-only SQLite access to the backup's file index.
//!
//! The index maps every obfuscated identifier to the original path it had
//! on the source device. It is externally owned and never written here;
//! the connection is opened read-only and closed when the handle drops.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ArchiveRecord;

/// Handle on the backup's file index.
pub struct ManifestIndex {
    conn: Connection,
    db_path: PathBuf,
}

/// One domain present in the index, with its record count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainSummary {
    pub domain: String,
    pub files: u64,
}

impl ManifestIndex {
    /// Open the index database read-only. Fails if the file is missing or
    /// is not a readable SQLite database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();

        let conn = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context(format!(
            "Failed to open backup index at {}",
            db_path.display()
        ))?;

        tracing::debug!("Opened backup index at {}", db_path.display());
        Ok(Self { conn, db_path })
    }

    /// Every record belonging to `domain`, in the table's natural order.
    /// The order is not guaranteed beyond stability within one pass.
    pub fn fetch_records(&self, domain: &str) -> Result<Vec<ArchiveRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT fileID, domain, relativePath FROM Files WHERE domain = ?1")?;

        let records = stmt
            .query_map(params![domain], |row| {
                Ok(ArchiveRecord {
                    identifier: row.get(0)?,
                    domain: row.get(1)?,
                    relative_path: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context(format!("Failed to query records for domain {}", domain))?;

        tracing::info!("Fetched {} records for domain {}", records.len(), domain);
        Ok(records)
    }

    /// Number of records belonging to `domain`.
    pub fn count_records(&self, domain: &str) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM Files WHERE domain = ?1",
                params![domain],
                |row| row.get(0),
            )
            .context(format!("Failed to count records for domain {}", domain))?;

        Ok(count as u64)
    }

    /// Distinct domains in the index with their record counts.
    pub fn list_domains(&self) -> Result<Vec<DomainSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT domain, COUNT(*) FROM Files GROUP BY domain ORDER BY domain")?;

        let summaries = stmt
            .query_map([], |row| {
                let domain: String = row.get(0)?;
                let files: i64 = row.get(1)?;
                Ok(DomainSummary {
                    domain,
                    files: files as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list domains")?;

        Ok(summaries)
    }

    /// Path of the index database file.
    pub fn path(&self) -> &Path {
        &self.db_path
    }
}
