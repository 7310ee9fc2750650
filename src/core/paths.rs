//! Path normalization for scan targets: canonicalization, legacy storage-root
//! alias rewriting, and external-root containment checks.
//!
//! The legacy alias is a historical mount location kept for installs that
//! predate the storage-root migration. Paths arriving from mount/file events
//! may still reference it; rewriting happens before any containment check so
//! the check is stable across the migration boundary.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::errors::{MsrError, Result};

/// Canonicalizes event paths against the external storage root.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    external_root: PathBuf,
    legacy_root_alias: PathBuf,
}

impl PathNormalizer {
    /// Create a normalizer for the given canonical external root and its
    /// legacy alias. Trailing slashes are stripped so prefix comparisons
    /// behave uniformly.
    #[must_use]
    pub fn new(external_root: impl Into<PathBuf>, legacy_root_alias: impl Into<PathBuf>) -> Self {
        Self {
            external_root: strip_trailing_slash(external_root.into()),
            legacy_root_alias: strip_trailing_slash(legacy_root_alias.into()),
        }
    }

    /// The canonical external storage root.
    #[must_use]
    pub fn external_root(&self) -> &Path {
        &self.external_root
    }

    /// The legacy storage-root alias.
    #[must_use]
    pub fn legacy_root_alias(&self) -> &Path {
        &self.legacy_root_alias
    }

    /// Resolve a path to its canonical form, then rewrite the legacy alias.
    ///
    /// Fails with [`MsrError::Normalization`] when the filesystem cannot
    /// resolve the path (missing file, dangling symlink, permission error).
    /// Callers treat that as "drop the event", never as a retryable error.
    pub fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        let resolved = fs::canonicalize(path).map_err(|e| MsrError::normalization(path, e))?;
        Ok(self.rewrite_legacy_alias(&resolved))
    }

    /// Rewrite the legacy storage-root prefix to the canonical external root.
    ///
    /// Pure and idempotent: paths already under the canonical root (or under
    /// neither root) pass through unchanged.
    #[must_use]
    pub fn rewrite_legacy_alias(&self, path: &Path) -> PathBuf {
        match path.strip_prefix(&self.legacy_root_alias) {
            Ok(rest) if rest.as_os_str().is_empty() => self.external_root.clone(),
            Ok(rest) => self.external_root.join(rest),
            Err(_) => path.to_path_buf(),
        }
    }

    /// Whether `path` is a strict descendant of the external root.
    ///
    /// The root itself does not count: a file-changed event for the root
    /// directory is not a scannable file.
    #[must_use]
    pub fn is_under_external_root(&self, path: &Path) -> bool {
        path.starts_with(&self.external_root) && path != self.external_root
    }
}

fn strip_trailing_slash(path: PathBuf) -> PathBuf {
    let s = path.to_string_lossy();
    if s.len() > 1 {
        if let Some(stripped) = s.strip_suffix('/') {
            return PathBuf::from(stripped);
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn normalizer() -> PathNormalizer {
        PathNormalizer::new("/media", "/mnt/media")
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        let n = PathNormalizer::new("/media/", "/mnt/media/");
        assert_eq!(n.external_root(), Path::new("/media"));
        assert_eq!(n.legacy_root_alias(), Path::new("/mnt/media"));
    }

    #[test]
    fn legacy_prefix_is_rewritten() {
        let n = normalizer();
        assert_eq!(
            n.rewrite_legacy_alias(Path::new("/mnt/media/DCIM/img.jpg")),
            PathBuf::from("/media/DCIM/img.jpg")
        );
    }

    #[test]
    fn legacy_root_itself_maps_to_external_root() {
        let n = normalizer();
        assert_eq!(
            n.rewrite_legacy_alias(Path::new("/mnt/media")),
            PathBuf::from("/media")
        );
    }

    #[test]
    fn canonical_paths_pass_through() {
        let n = normalizer();
        assert_eq!(
            n.rewrite_legacy_alias(Path::new("/media/Music/track.flac")),
            PathBuf::from("/media/Music/track.flac")
        );
    }

    #[test]
    fn unrelated_paths_pass_through() {
        let n = normalizer();
        assert_eq!(
            n.rewrite_legacy_alias(Path::new("/home/user/notes.txt")),
            PathBuf::from("/home/user/notes.txt")
        );
    }

    #[test]
    fn rewrite_is_idempotent() {
        let n = normalizer();
        let once = n.rewrite_legacy_alias(Path::new("/mnt/media/Video/clip.mkv"));
        let twice = n.rewrite_legacy_alias(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn similar_prefix_is_not_rewritten() {
        // /mnt/mediastore shares a string prefix with /mnt/media but is a
        // different directory; component-wise strip_prefix must not match.
        let n = normalizer();
        assert_eq!(
            n.rewrite_legacy_alias(Path::new("/mnt/mediastore/a.mp3")),
            PathBuf::from("/mnt/mediastore/a.mp3")
        );
    }

    #[test]
    fn containment_is_strict() {
        let n = normalizer();
        assert!(n.is_under_external_root(Path::new("/media/DCIM/img.jpg")));
        assert!(!n.is_under_external_root(Path::new("/media")));
        assert!(!n.is_under_external_root(Path::new("/mediastore/img.jpg")));
        assert!(!n.is_under_external_root(Path::new("/home/user/img.jpg")));
    }

    #[cfg(unix)]
    #[test]
    fn canonicalize_resolves_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("library");
        fs::create_dir(&real).unwrap();
        fs::write(real.join("song.mp3"), b"").unwrap();
        let link = dir.path().join("shortcut");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let real_canonical = fs::canonicalize(&real).unwrap();
        let n = PathNormalizer::new(&real_canonical, dir.path().join("old-library"));
        let resolved = n.canonicalize(&link.join("song.mp3")).unwrap();
        assert_eq!(resolved, real_canonical.join("song.mp3"));
    }

    #[cfg(unix)]
    #[test]
    fn canonicalize_fails_on_dangling_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("broken");
        std::os::unix::fs::symlink(dir.path().join("nonexistent"), &link).unwrap();

        let n = normalizer();
        let err = n.canonicalize(&link).unwrap_err();
        assert_eq!(err.code(), "MSR-2001");
        assert!(!err.is_retryable());
    }

    #[test]
    fn canonicalize_fails_on_missing_path() {
        let n = normalizer();
        let err = n
            .canonicalize(Path::new("/no/such/path/anywhere.mp4"))
            .unwrap_err();
        assert_eq!(err.code(), "MSR-2001");
    }

    #[test]
    fn canonicalize_applies_legacy_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let base = fs::canonicalize(dir.path()).unwrap();
        let legacy = base.join("legacy");
        fs::create_dir(&legacy).unwrap();
        fs::write(legacy.join("img.jpg"), b"").unwrap();

        let n = PathNormalizer::new(base.join("storage"), &legacy);
        let resolved = n.canonicalize(&legacy.join("img.jpg")).unwrap();
        assert_eq!(resolved, base.join("storage").join("img.jpg"));
    }

    proptest! {
        // Normalizing a relative suffix under the legacy alias must agree
        // with normalizing the same suffix under the canonical root.
        #[test]
        fn rewrite_agrees_across_roots(segments in prop::collection::vec("[a-z0-9]{1,8}", 1..5)) {
            let n = normalizer();
            let suffix: PathBuf = segments.iter().collect();
            let via_legacy = n.rewrite_legacy_alias(&Path::new("/mnt/media").join(&suffix));
            let via_canonical = n.rewrite_legacy_alias(&Path::new("/media").join(&suffix));
            prop_assert_eq!(via_legacy, via_canonical);
        }

        #[test]
        fn rewrite_idempotent_for_arbitrary_suffixes(segments in prop::collection::vec("[a-z0-9]{1,8}", 0..5)) {
            let n = normalizer();
            let path = Path::new("/mnt/media").join(segments.iter().collect::<PathBuf>());
            let once = n.rewrite_legacy_alias(&path);
            let twice = n.rewrite_legacy_alias(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
