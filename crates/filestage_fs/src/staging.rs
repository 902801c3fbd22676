use std::path::{Path, PathBuf};

use filestage_base::{FilestageResult, ResultExt};
use tracing::{debug, warn};

use crate::file_path::{displaced_path, staging_path};
use crate::handle::FileHandle;
use crate::traits::FsHandle;

/* Replacing a file crash-safely is a two-phase commit on a single path:
new content accumulates beside the destination under the reserved `.tmp`
name, the previous version is displaced to `.away`, and the rename of the
temp file onto the destination is the commit point. Readers of the
destination observe the old content or the new content, never a mixture.
The rename itself is the only atomic step; ordering around it is the
caller's responsibility. */

/// Outcome of a successful [`StagedWrite::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Destination replaced, no leftovers remain.
    Clean,
    /// Destination replaced, but the displaced previous version could not
    /// be removed and remains under the `.away` name until a later
    /// [`recover`] sweep.
    StaleAway,
}

/// What a [`recover`] sweep found and did for one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Recovery {
    /// An unfinished temp file was discarded.
    pub discarded_temp: bool,
    /// A stale away file next to an intact destination was removed.
    pub removed_stale_away: bool,
    /// The destination was missing and the displaced previous version was
    /// renamed back into place.
    pub restored_away: bool,
}

impl Recovery {
    /// True when no staging leftovers were found.
    pub fn is_clean(&self) -> bool {
        !(self.discarded_temp || self.removed_stale_away || self.restored_away)
    }
}

/// An in-progress staged write.
///
/// Content written here lands in the destination's temp file and becomes
/// visible at the destination only when [`StagedWrite::commit`] promotes
/// it. Dropping an uncommitted value aborts the write and removes the
/// temp file on a best-effort basis.
#[derive(Debug)]
pub struct StagedWrite {
    fs: FsHandle,
    dest: PathBuf,
    tmp: PathBuf,
    handle: Option<FileHandle>,
}

impl StagedWrite {
    /// Opens the temp file for `dest` and enters the writing state.
    pub fn begin(fs: FsHandle, dest: impl Into<PathBuf>) -> FilestageResult<Self> {
        let dest = dest.into();
        let tmp = staging_path(&dest);
        let handle = fs
            .create_for_writing(&tmp)
            .with_context(|| format!("staging write for {}", dest.display()))?;
        debug!(dest = %dest.display(), tmp = %tmp.display(), "staged write started");
        Ok(Self {
            fs,
            dest,
            tmp,
            handle: Some(handle),
        })
    }

    /// Destination this staged write will replace on commit.
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Appends bytes to the temp file.
    pub fn write(&mut self, bytes: &[u8]) -> FilestageResult<()> {
        // present until commit or abort consumes self
        let handle = self.handle.as_mut().expect("staged write already finished");
        handle
            .write_chunk(bytes)
            .with_context(|| format!("writing staged file {}", self.tmp.display()))
    }

    /// Closes the temp file and promotes it onto the destination.
    ///
    /// An existing destination is displaced to the away name before the
    /// atomic rename, so a crash at any point leaves either the old or
    /// the new content reachable; [`recover`] sorts out the leftovers.
    pub fn commit(mut self) -> FilestageResult<Commit> {
        let handle = self.handle.take().expect("staged write already finished");
        handle
            .close()
            .with_context(|| format!("closing staged file {}", self.tmp.display()))?;

        let away = displaced_path(&self.dest);
        if self.fs.exists(&self.dest)? {
            self.fs
                .rename_file(&self.dest, &away)
                .with_context(|| format!("displacing {}", self.dest.display()))?;
        }
        self.fs
            .rename_file(&self.tmp, &self.dest)
            .with_context(|| format!("promoting {}", self.tmp.display()))?;
        debug!(dest = %self.dest.display(), "staged write committed");

        match self.fs.delete_file(&away) {
            Ok(()) => Ok(Commit::Clean),
            Err(error) => {
                warn!(away = %away.display(), %error, "displaced previous version left behind");
                Ok(Commit::StaleAway)
            }
        }
    }

    /// Discards the staged write and removes the temp file.
    pub fn abort(mut self) -> FilestageResult<()> {
        let handle = self.handle.take().expect("staged write already finished");
        handle.close()?;
        self.fs
            .delete_file(&self.tmp)
            .with_context(|| format!("removing staged file {}", self.tmp.display()))
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        // only when still in the writing state; a failed commit leaves
        // its leftovers for recover()
        if let Some(handle) = self.handle.take() {
            let _ = handle.close();
            if let Err(error) = self.fs.delete_file(&self.tmp) {
                warn!(tmp = %self.tmp.display(), %error, "failed to remove staged file");
            }
        }
    }
}

/// Sweeps one destination's staging leftovers after a crash.
///
/// An unfinished temp file is always discarded: its write never reached
/// the commit point. A displaced previous version under the away name is
/// renamed back when the destination is missing (the crash hit inside the
/// promotion window) and removed when the destination is intact (the
/// crash hit after the atomic step).
pub fn recover(fs: &FsHandle, dest: &Path) -> FilestageResult<Recovery> {
    let tmp = staging_path(dest);
    let away = displaced_path(dest);
    let mut recovery = Recovery::default();

    if fs.exists(&tmp)? {
        fs.delete_file(&tmp)
            .with_context(|| format!("discarding staged file {}", tmp.display()))?;
        recovery.discarded_temp = true;
    }

    if fs.exists(&away)? {
        if fs.exists(dest)? {
            fs.delete_file(&away)
                .with_context(|| format!("removing stale away file {}", away.display()))?;
            recovery.removed_stale_away = true;
        } else {
            fs.rename_file(&away, dest)
                .with_context(|| format!("restoring {}", dest.display()))?;
            recovery.restored_away = true;
        }
    }

    if !recovery.is_clean() {
        debug!(dest = %dest.display(), ?recovery, "recovered staging leftovers");
    }
    Ok(recovery)
}
