use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Maximum length of a platform-native path in native units (bytes on
/// POSIX-like systems, wide characters on Windows), counting the
/// terminating NUL where the platform needs one. Longer paths are
/// rejected, never truncated.
pub const MAX_PATH_UNITS: usize = 4096;

/// Suffix of the in-progress write target of a staged write.
///
/// Reserved by the promotion protocol; callers must not choose final
/// filenames that collide with it.
pub const TMP_SUFFIX: &str = ".tmp";

/// Suffix under which the previous version of a file is displaced while
/// being replaced. Reserved like [`TMP_SUFFIX`].
pub const AWAY_SUFFIX: &str = ".away";

/// Appends a reserved suffix to the full final name, extension included:
/// `out.dat` staged becomes `out.dat.tmp`.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// The in-progress write target for `dest`.
pub fn staging_path(dest: &Path) -> PathBuf {
    with_suffix(dest, TMP_SUFFIX)
}

/// The side name `dest` is displaced to while being replaced.
pub fn displaced_path(dest: &Path) -> PathBuf {
    with_suffix(dest, AWAY_SUFFIX)
}

/// Rejects paths whose byte encoding does not fit the native bound with
/// its terminating NUL. The Windows implementation performs the
/// equivalent check on the wide encoding it produces.
#[cfg(not(windows))]
pub(crate) fn check_byte_length(path: &Path) -> filestage_base::FilestageResult<()> {
    use filestage_base::{FilestageError, error::ErrorKind};

    let units = path.as_os_str().len();
    if units >= MAX_PATH_UNITS {
        return Err(Box::new(FilestageError::new(ErrorKind::PathTooLong {
            path: path.to_path_buf(),
            units,
        })));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_path_appends_to_full_name() {
        assert_eq!(staging_path(Path::new("out.dat")), PathBuf::from("out.dat.tmp"));
        assert_eq!(
            staging_path(Path::new("dir/payload.bin")),
            PathBuf::from("dir/payload.bin.tmp")
        );
    }

    #[test]
    fn test_displaced_path_appends_to_full_name() {
        assert_eq!(displaced_path(Path::new("out.dat")), PathBuf::from("out.dat.away"));
    }

    #[test]
    fn test_suffixes_do_not_collide() {
        let dest = Path::new("out.dat");
        assert_ne!(staging_path(dest), displaced_path(dest));
        assert_ne!(staging_path(dest), dest);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_byte_length_bound() {
        let ok = PathBuf::from("a".repeat(MAX_PATH_UNITS - 1));
        assert!(check_byte_length(&ok).is_ok());

        let too_long = PathBuf::from("a".repeat(MAX_PATH_UNITS));
        let err = check_byte_length(&too_long).unwrap_err();
        match err.kind() {
            filestage_base::ErrorKind::PathTooLong { units, .. } => {
                assert_eq!(*units, MAX_PATH_UNITS);
            }
            other => panic!("expected PathTooLong, got {:?}", other),
        }
    }
}
