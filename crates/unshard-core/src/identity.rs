//! Integrity checks for content-derived identifiers.
//!
//! The archive names every stored file after the SHA-1 digest of
//! `"<domain>-<relative_path>"`, so a record's identifier can be recomputed
//! from its other two columns and compared against the stored value. A
//! mismatch points at index corruption or tampering.

use sha1::{Digest, Sha1};

use crate::ArchiveRecord;

/// Length of a hex-encoded identifier.
pub const IDENTIFIER_LEN: usize = 40;

/// Recompute the identifier a record with these columns should carry.
pub fn identifier_for(domain: &str, relative_path: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(domain.as_bytes());
    hasher.update(b"-");
    hasher.update(relative_path.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// True if the record's stored identifier matches the recomputed one.
pub fn verify_record(record: &ArchiveRecord) -> bool {
    identifier_for(&record.domain, &record.relative_path) == record.identifier
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_is_forty_lowercase_hex_chars() {
        let id = identifier_for("CameraRollDomain", "Media/DCIM/100APPLE/IMG_0001.JPG");
        assert_eq!(id.len(), IDENTIFIER_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn identifier_is_deterministic() {
        let a = identifier_for("MediaDomain", "Library/SMS/Attachments/ab/01/cat.gif");
        let b = identifier_for("MediaDomain", "Library/SMS/Attachments/ab/01/cat.gif");
        assert_eq!(a, b);
    }

    #[test]
    fn identifier_depends_on_domain_and_path() {
        let base = identifier_for("CameraRollDomain", "Media/DCIM/100APPLE/IMG_0001.JPG");
        assert_ne!(
            base,
            identifier_for("MediaDomain", "Media/DCIM/100APPLE/IMG_0001.JPG")
        );
        assert_ne!(
            base,
            identifier_for("CameraRollDomain", "Media/DCIM/100APPLE/IMG_0002.JPG")
        );
    }

    #[test]
    fn verify_record_detects_mismatch() {
        let mut record = ArchiveRecord {
            identifier: identifier_for("CameraRollDomain", "Media/DCIM/100APPLE/IMG_0001.JPG"),
            domain: "CameraRollDomain".to_string(),
            relative_path: "Media/DCIM/100APPLE/IMG_0001.JPG".to_string(),
        };
        assert!(verify_record(&record));

        record.identifier = "0".repeat(IDENTIFIER_LEN);
        assert!(!verify_record(&record));
    }
}
