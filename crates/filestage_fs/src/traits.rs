use std::path::{Path, PathBuf};
use std::sync::Arc;

use filestage_base::FilestageResult;

use crate::handle::FileHandle;

/* The per-platform type and constant selection of the underlying OS APIs
is hidden behind a single capability trait with one concrete disk
implementation per build target. Callers depend on the trait, never on
the concrete filesystem, which also makes every operation testable
against the in-memory implementation. */

/// Transfer unit of the provided `copy_file` implementation.
const COPY_CHUNK: usize = 32 * 1024;

/// Filesystem capability: binary path discovery, handle lifecycle entry
/// points and whole-file path operations.
///
/// Disk implementations are selected per build target
/// (`PosixFileSystem`, `WindowsFileSystem`, aliased as
/// [`crate::NativeFileSystem`]); [`crate::MemoryFileSystem`] backs
/// deterministic tests. Paths pass through unmodified: no normalization,
/// no symbolic-link resolution, and validation of anything beyond the
/// native length bound is the caller's job.
pub trait FileSystem: std::fmt::Debug + Send + Sync + 'static {
    /// Absolute path of the currently running executable image, as an
    /// owned value.
    ///
    /// An empty path is reserved and never a valid result; failure to
    /// resolve is an error the caller has no fallback for.
    fn binary_path(&self) -> FilestageResult<PathBuf>;

    /// Whether a file exists at `path`.
    fn exists(&self, path: &Path) -> FilestageResult<bool>;

    /// Opens an existing file for binary, sequential, read-only access.
    ///
    /// Every failure (absent file, permission denied, invalid path)
    /// surfaces as an error; there is no partially usable handle.
    fn open_for_reading(&self, path: &Path) -> FilestageResult<FileHandle>;

    /// Creates the file if absent or truncates it if present, opened for
    /// binary write access.
    ///
    /// Truncation guarantees a staged write starts from a clean slate
    /// rather than on top of a previous run's bytes.
    fn create_for_writing(&self, path: &Path) -> FilestageResult<FileHandle>;

    /// Platform mode/attribute bits for an existing path.
    fn file_mode(&self, path: &Path) -> FilestageResult<u32>;

    /// Applies platform mode/attribute bits to an existing path.
    fn set_file_mode(&self, path: &Path, mode: u32) -> FilestageResult<()>;

    /// Removes the named file.
    ///
    /// Deletion is idempotent: removing an already-absent file succeeds,
    /// and afterwards the path is absent either way.
    fn delete_file(&self, path: &Path) -> FilestageResult<()>;

    /// Renames `source` onto `dest` within one volume, replacing any
    /// existing `dest`.
    ///
    /// Atomic with respect to concurrent readers of `dest`: they observe
    /// the old content or the new content, never a mixture. This is the
    /// primitive the promotion protocol in [`crate::staging`] is built
    /// on, and the reason rename exists here instead of a copy-and-delete
    /// composition.
    fn rename_file(&self, source: &Path, dest: &Path) -> FilestageResult<()>;

    /// Copies the full byte content of `source` to `dest`, overwriting
    /// `dest` if present, and applies `mode` to the destination.
    ///
    /// Never reports success on a partial copy; on failure the
    /// destination may hold partial bytes and must be treated as
    /// unusable.
    fn copy_file(&self, source: &Path, dest: &Path, mode: u32) -> FilestageResult<()> {
        let mut from = self.open_for_reading(source)?;
        let mut to = self.create_for_writing(dest)?;

        let mut remaining = from.size()?;
        let mut buffer = [0u8; COPY_CHUNK];
        while remaining > 0 {
            let take = remaining.min(COPY_CHUNK as u64) as usize;
            from.read_chunk(&mut buffer[..take])?;
            to.write_chunk(&buffer[..take])?;
            remaining -= take as u64;
        }

        from.close()?;
        to.close()?;
        self.set_file_mode(dest, mode)
    }
}

/// Shared handle to a filesystem implementation.
///
/// Wraps `Arc<dyn FileSystem>`: clones are cheap, thread-safe, and all
/// observe the same filesystem.
#[derive(Debug, Clone)]
pub struct FsHandle(Arc<dyn FileSystem>);

impl FsHandle {
    /// Wraps a filesystem implementation for shared use.
    pub fn new(fs: impl FileSystem + 'static) -> Self {
        Self(Arc::new(fs))
    }
}

impl std::ops::Deref for FsHandle {
    type Target = dyn FileSystem;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
