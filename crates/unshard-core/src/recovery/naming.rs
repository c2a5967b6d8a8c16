//! Shard path mapping and destination-name collision resolution.

use std::path::{Path, PathBuf};

use crate::recovery::RecoveryError;

/// Ceiling on collision probes before the filesystem is treated as
/// adversarial and the pass aborts.
const MAX_COLLISION_PROBES: u32 = 1_000_000;

/// Path of a stored file relative to the archive root: the identifier's
/// first two characters name the shard directory, exactly as stored.
pub fn shard_relative_path(identifier: &str) -> PathBuf {
    let shard = identifier.get(0..2).unwrap_or(identifier);
    Path::new(shard).join(identifier)
}

/// Insert `-n` before the filename's first dot. A name without a dot gets
/// the suffix appended at the end.
fn numbered(file_name: &str, n: u32) -> String {
    match file_name.split_once('.') {
        Some((stem, rest)) => format!("{}-{}.{}", stem, n, rest),
        None => format!("{}-{}", file_name, n),
    }
}

/// Resolve a collision-free destination for `file_name` inside `dir`.
///
/// Probes `dir/file_name`, then `dir/<stem>-1.<rest>`, `dir/<stem>-2.<rest>`,
/// … until an unused path is found. The counter always restarts from the
/// unnumbered name, so numbering is deterministic and monotonic across
/// repeated runs. Returns the chosen path and whether renaming was needed.
///
/// A failing existence check is fatal rather than retried.
pub fn resolve_destination(
    dir: &Path,
    file_name: &str,
) -> Result<(PathBuf, bool), RecoveryError> {
    let mut candidate = dir.join(file_name);
    let mut n: u32 = 0;

    loop {
        let exists = candidate.try_exists().map_err(|source| RecoveryError::Probe {
            path: candidate.clone(),
            source,
        })?;

        if !exists {
            return Ok((candidate, n > 0));
        }

        if n >= MAX_COLLISION_PROBES {
            return Err(RecoveryError::ProbeExhausted(dir.join(file_name)));
        }

        n += 1;
        candidate = dir.join(numbered(file_name, n));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn shard_is_first_two_characters() {
        let id = "abc1234567890123456789012345678901234567";
        assert_eq!(shard_relative_path(id), Path::new("ab").join(id));
    }

    #[test]
    fn shard_is_case_sensitive() {
        let id = "ABc1234567890123456789012345678901234567";
        assert_eq!(shard_relative_path(id), Path::new("AB").join(id));
    }

    #[test]
    fn unused_name_is_kept_as_is() {
        let temp_dir = TempDir::new().unwrap();
        let (path, renamed) = resolve_destination(temp_dir.path(), "photo.jpg").unwrap();
        assert_eq!(path, temp_dir.path().join("photo.jpg"));
        assert!(!renamed);
    }

    #[test]
    fn collision_numbering_is_monotonic() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("photo.jpg"), b"first").unwrap();

        let (path, renamed) = resolve_destination(temp_dir.path(), "photo.jpg").unwrap();
        assert_eq!(path, temp_dir.path().join("photo-1.jpg"));
        assert!(renamed);

        fs::write(&path, b"second").unwrap();
        let (path, renamed) = resolve_destination(temp_dir.path(), "photo.jpg").unwrap();
        assert_eq!(path, temp_dir.path().join("photo-2.jpg"));
        assert!(renamed);
    }

    // The suffix is inserted after the first dot's stem, not before the true
    // extension. "IMG.0001.JPG" collides to "IMG-1.0001.JPG".
    #[test]
    fn multi_dot_name_splits_on_first_dot() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("IMG.0001.JPG"), b"x").unwrap();

        let (path, renamed) = resolve_destination(temp_dir.path(), "IMG.0001.JPG").unwrap();
        assert_eq!(path, temp_dir.path().join("IMG-1.0001.JPG"));
        assert!(renamed);
    }

    #[test]
    fn dotless_name_gets_suffix_appended() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("README"), b"x").unwrap();

        let (path, renamed) = resolve_destination(temp_dir.path(), "README").unwrap();
        assert_eq!(path, temp_dir.path().join("README-1"));
        assert!(renamed);
    }
}
