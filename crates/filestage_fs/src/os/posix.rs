use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use filestage_base::error::ErrorKind;
use filestage_base::{FilestageError, FilestageResult};
use tracing::{debug, instrument};

use crate::file_path::check_byte_length;
use crate::handle::{FileHandle, RawFile};
use crate::traits::FileSystem;

/// Disk filesystem for POSIX-like targets: narrow paths with `/`
/// separators, stream-backed handles, `st_mode` bits.
#[derive(Debug, Default)]
pub struct PosixFileSystem;

impl PosixFileSystem {
    pub fn new() -> Self {
        Self
    }
}

fn fs_err(path: &Path, source: std::io::Error) -> Box<FilestageError> {
    Box::new(FilestageError::new(ErrorKind::Io {
        path: path.to_path_buf(),
        source,
    }))
}

impl FileSystem for PosixFileSystem {
    #[instrument(skip(self))]
    fn binary_path(&self) -> FilestageResult<PathBuf> {
        let exe = std::env::current_exe().map_err(|e| fs_err(Path::new("<current_exe>"), e))?;
        if exe.as_os_str().is_empty() {
            // the empty path is the reserved failure value, never a result
            return Err(Box::new(FilestageError::message(
                "executable path resolved to the reserved empty path",
            )));
        }
        debug!(path = %exe.display(), "resolved running binary");
        Ok(exe)
    }

    fn exists(&self, path: &Path) -> FilestageResult<bool> {
        check_byte_length(path)?;
        match fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(fs_err(path, e)),
        }
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn open_for_reading(&self, path: &Path) -> FilestageResult<FileHandle> {
        check_byte_length(path)?;
        let file = File::open(path).map_err(|e| fs_err(path, e))?;
        debug!("opened for reading");
        Ok(FileHandle::new(PosixFile {
            path: path.to_path_buf(),
            file,
        }))
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn create_for_writing(&self, path: &Path) -> FilestageResult<FileHandle> {
        check_byte_length(path)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| fs_err(path, e))?;
        debug!("created for writing");
        Ok(FileHandle::new(PosixFile {
            path: path.to_path_buf(),
            file,
        }))
    }

    fn file_mode(&self, path: &Path) -> FilestageResult<u32> {
        check_byte_length(path)?;
        let meta = fs::metadata(path).map_err(|e| fs_err(path, e))?;
        Ok(meta.permissions().mode())
    }

    fn set_file_mode(&self, path: &Path, mode: u32) -> FilestageResult<()> {
        check_byte_length(path)?;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| fs_err(path, e))
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn delete_file(&self, path: &Path) -> FilestageResult<()> {
        check_byte_length(path)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // deletion is idempotent; a pre-absent file counts as removed
                debug!("already absent");
                Ok(())
            }
            Err(e) => Err(fs_err(path, e)),
        }
    }

    #[instrument(skip(self), fields(source = %source.display(), dest = %dest.display()))]
    fn rename_file(&self, source: &Path, dest: &Path) -> FilestageResult<()> {
        check_byte_length(source)?;
        check_byte_length(dest)?;
        // rename(2): same-volume, atomic for readers of dest
        fs::rename(source, dest).map_err(|e| fs_err(source, e))?;
        debug!("renamed");
        Ok(())
    }
}

/// Stream-backed handle; the cursor lives in the underlying descriptor.
#[derive(Debug)]
struct PosixFile {
    path: PathBuf,
    file: File,
}

impl RawFile for PosixFile {
    fn size(&mut self) -> FilestageResult<u64> {
        // answered from the inode; the cursor does not move
        let meta = self.file.metadata().map_err(|e| fs_err(&self.path, e))?;
        Ok(meta.len())
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> FilestageResult<()> {
        self.file.read_exact(buf).map_err(|e| fs_err(&self.path, e))
    }

    fn write_chunk(&mut self, buf: &[u8]) -> FilestageResult<()> {
        self.file.write_all(buf).map_err(|e| fs_err(&self.path, e))
    }

    fn close(self: Box<Self>) -> FilestageResult<()> {
        // File carries no user-space buffer, so releasing the descriptor
        // is the whole close
        drop(self.file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_dir() -> (TempDir, PosixFileSystem) {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        (temp_dir, PosixFileSystem::new())
    }

    #[test]
    fn test_round_trip() {
        let (temp_dir, fs) = setup_test_dir();
        let path = temp_dir.path().join("data.bin");

        let mut writer = fs.create_for_writing(&path).unwrap();
        writer.write_chunk(b"hello world").unwrap();
        writer.close().unwrap();

        let mut reader = fs.open_for_reading(&path).unwrap();
        assert_eq!(reader.size().unwrap(), 11);
        let mut buf = [0u8; 11];
        reader.read_chunk(&mut buf).unwrap();
        assert_eq!(&buf, b"hello world");
        reader.close().unwrap();
    }

    #[test]
    fn test_size_does_not_move_cursor() {
        let (temp_dir, fs) = setup_test_dir();
        let path = temp_dir.path().join("cursor.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let mut reader = fs.open_for_reading(&path).unwrap();
        let mut head = [0u8; 4];
        reader.read_chunk(&mut head).unwrap();
        assert_eq!(reader.size().unwrap(), 10);

        let mut tail = [0u8; 6];
        reader.read_chunk(&mut tail).unwrap();
        assert_eq!(&tail, b"456789");
    }

    #[test]
    fn test_open_missing_fails() {
        let (temp_dir, fs) = setup_test_dir();
        let result = fs.open_for_reading(&temp_dir.path().join("absent.bin"));
        assert!(result.is_err());
    }

    #[test]
    fn test_create_truncates_existing() {
        let (temp_dir, fs) = setup_test_dir();
        let path = temp_dir.path().join("trunc.bin");
        std::fs::write(&path, b"previous run's bytes").unwrap();

        let writer = fs.create_for_writing(&path).unwrap();
        writer.close().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"");
    }

    #[test]
    fn test_short_read_fails() {
        let (temp_dir, fs) = setup_test_dir();
        let path = temp_dir.path().join("short.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let mut reader = fs.open_for_reading(&path).unwrap();
        let mut buf = [0u8; 20];
        assert!(reader.read_chunk(&mut buf).is_err());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (temp_dir, fs) = setup_test_dir();
        let path = temp_dir.path().join("victim.bin");

        // absent
        fs.delete_file(&path).unwrap();
        assert!(!fs.exists(&path).unwrap());

        // present
        std::fs::write(&path, b"x").unwrap();
        fs.delete_file(&path).unwrap();
        assert!(!fs.exists(&path).unwrap());
    }

    #[test]
    fn test_rename_promotes_temp() {
        let (temp_dir, fs) = setup_test_dir();
        let tmp = temp_dir.path().join("out.tmp");
        let dat = temp_dir.path().join("out.dat");

        let mut writer = fs.create_for_writing(&tmp).unwrap();
        writer.write_chunk(b"0123456789").unwrap();
        writer.close().unwrap();

        fs.rename_file(&tmp, &dat).unwrap();

        assert_eq!(std::fs::read(&dat).unwrap(), b"0123456789");
        assert!(!fs.exists(&tmp).unwrap());
    }

    #[test]
    fn test_copy_applies_mode() {
        let (temp_dir, fs) = setup_test_dir();
        let source = temp_dir.path().join("a.bin");
        let dest = temp_dir.path().join("b.bin");
        std::fs::write(&source, b"payload bytes").unwrap();

        fs.copy_file(&source, &dest, 0o100600).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"payload bytes");
        assert_eq!(fs.file_mode(&dest).unwrap() & 0o777, 0o600);
    }

    #[test]
    fn test_copy_overwrites_dest() {
        let (temp_dir, fs) = setup_test_dir();
        let source = temp_dir.path().join("src.bin");
        let dest = temp_dir.path().join("dst.bin");
        std::fs::write(&source, b"new").unwrap();
        std::fs::write(&dest, b"a much longer previous content").unwrap();

        fs.copy_file(&source, &dest, 0o100644).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }

    #[test]
    fn test_file_mode_missing_fails() {
        let (temp_dir, fs) = setup_test_dir();
        assert!(fs.file_mode(&temp_dir.path().join("absent.bin")).is_err());
    }

    #[test]
    fn test_overlong_path_rejected() {
        let (_temp_dir, fs) = setup_test_dir();
        let long = PathBuf::from("a".repeat(crate::MAX_PATH_UNITS + 10));
        let err = fs.open_for_reading(&long).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::PathTooLong { .. }));
    }

    #[test]
    fn test_binary_path_resolves() {
        let (_temp_dir, fs) = setup_test_dir();
        let exe = fs.binary_path().unwrap();
        assert!(exe.is_absolute());
        assert!(!exe.as_os_str().is_empty());
    }
}
