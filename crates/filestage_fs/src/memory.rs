use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use filestage_base::error::ErrorKind;
use filestage_base::{FilestageError, FilestageResult};

use crate::handle::{FileHandle, RawFile};
use crate::traits::FileSystem;

/// In-memory filesystem for deterministic tests: no disk access, no side
/// effects outside the instance.
///
/// Write handles buffer locally and publish their contents on close (or
/// on drop), so a reader of a path never observes a write in progress,
/// mirroring the staged visibility the disk implementations get from the
/// promotion protocol. `rename_file` moves content and mode under a
/// single lock acquisition.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<PathBuf, MemoryEntry>,
    binary: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    content: Vec<u8>,
    mode: u32,
}

const DEFAULT_MODE: u32 = 0o644;
const BINARY_MODE: u32 = 0o755;

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file with the given content and the default mode.
    pub fn add_file(&self, path: impl Into<PathBuf>, content: Vec<u8>) {
        self.state.lock().unwrap().files.insert(
            path.into(),
            MemoryEntry {
                content,
                mode: DEFAULT_MODE,
            },
        );
    }

    /// Registers the running binary's path and image bytes.
    pub fn set_binary(&self, path: impl Into<PathBuf>, image: Vec<u8>) {
        let path = path.into();
        let mut state = self.state.lock().unwrap();
        state.files.insert(
            path.clone(),
            MemoryEntry {
                content: image,
                mode: BINARY_MODE,
            },
        );
        state.binary = Some(path);
    }

    /// Raw content of a stored file, if present.
    pub fn content(&self, path: &Path) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path)
            .map(|entry| entry.content.clone())
    }
}

fn not_found(path: &Path) -> Box<FilestageError> {
    Box::new(FilestageError::new(ErrorKind::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
    }))
}

fn wrong_direction(path: &Path, detail: &str) -> Box<FilestageError> {
    Box::new(FilestageError::new(ErrorKind::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, detail.to_string()),
    }))
}

impl FileSystem for MemoryFileSystem {
    fn binary_path(&self) -> FilestageResult<PathBuf> {
        self.state
            .lock()
            .unwrap()
            .binary
            .clone()
            .ok_or_else(|| Box::new(FilestageError::message("no binary registered")))
    }

    fn exists(&self, path: &Path) -> FilestageResult<bool> {
        Ok(self.state.lock().unwrap().files.contains_key(path))
    }

    fn open_for_reading(&self, path: &Path) -> FilestageResult<FileHandle> {
        let state = self.state.lock().unwrap();
        let entry = state.files.get(path).ok_or_else(|| not_found(path))?;
        Ok(FileHandle::new(MemoryReadFile {
            path: path.to_path_buf(),
            content: entry.content.clone(),
            cursor: 0,
        }))
    }

    fn create_for_writing(&self, path: &Path) -> FilestageResult<FileHandle> {
        Ok(FileHandle::new(MemoryWriteFile {
            path: path.to_path_buf(),
            buffer: Vec::new(),
            state: Arc::clone(&self.state),
            published: false,
        }))
    }

    fn file_mode(&self, path: &Path) -> FilestageResult<u32> {
        let state = self.state.lock().unwrap();
        let entry = state.files.get(path).ok_or_else(|| not_found(path))?;
        Ok(entry.mode)
    }

    fn set_file_mode(&self, path: &Path, mode: u32) -> FilestageResult<()> {
        let mut state = self.state.lock().unwrap();
        let entry = state.files.get_mut(path).ok_or_else(|| not_found(path))?;
        entry.mode = mode;
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> FilestageResult<()> {
        // deletion is idempotent; a pre-absent file also counts as removed
        self.state.lock().unwrap().files.remove(path);
        Ok(())
    }

    fn rename_file(&self, source: &Path, dest: &Path) -> FilestageResult<()> {
        let mut state = self.state.lock().unwrap();
        let entry = state.files.remove(source).ok_or_else(|| not_found(source))?;
        state.files.insert(dest.to_path_buf(), entry);
        Ok(())
    }
}

/// Read handle over a snapshot of the content taken at open time.
#[derive(Debug)]
struct MemoryReadFile {
    path: PathBuf,
    content: Vec<u8>,
    cursor: usize,
}

impl RawFile for MemoryReadFile {
    fn size(&mut self) -> FilestageResult<u64> {
        Ok(self.content.len() as u64)
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> FilestageResult<()> {
        let end = self
            .cursor
            .checked_add(buf.len())
            .filter(|&end| end <= self.content.len())
            .ok_or_else(|| {
                Box::new(FilestageError::new(ErrorKind::Io {
                    path: self.path.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "failed to fill whole chunk",
                    ),
                }))
            })?;
        buf.copy_from_slice(&self.content[self.cursor..end]);
        self.cursor = end;
        Ok(())
    }

    fn write_chunk(&mut self, _buf: &[u8]) -> FilestageResult<()> {
        Err(wrong_direction(&self.path, "handle is open for reading"))
    }

    fn close(self: Box<Self>) -> FilestageResult<()> {
        Ok(())
    }
}

/// Write handle buffering until close; publishes into the shared map.
#[derive(Debug)]
struct MemoryWriteFile {
    path: PathBuf,
    buffer: Vec<u8>,
    state: Arc<Mutex<MemoryState>>,
    published: bool,
}

impl MemoryWriteFile {
    fn publish(&mut self) {
        if self.published {
            return;
        }
        self.published = true;
        let mut state = self.state.lock().unwrap();
        // an existing entry keeps its mode through truncation
        let mode = state
            .files
            .get(&self.path)
            .map(|entry| entry.mode)
            .unwrap_or(DEFAULT_MODE);
        state.files.insert(
            self.path.clone(),
            MemoryEntry {
                content: std::mem::take(&mut self.buffer),
                mode,
            },
        );
    }
}

impl RawFile for MemoryWriteFile {
    fn size(&mut self) -> FilestageResult<u64> {
        Ok(self.buffer.len() as u64)
    }

    fn read_chunk(&mut self, _buf: &mut [u8]) -> FilestageResult<()> {
        Err(wrong_direction(&self.path, "handle is open for writing"))
    }

    fn write_chunk(&mut self, buf: &[u8]) -> FilestageResult<()> {
        self.buffer.extend_from_slice(buf);
        Ok(())
    }

    fn close(mut self: Box<Self>) -> FilestageResult<()> {
        self.publish();
        Ok(())
    }
}

impl Drop for MemoryWriteFile {
    fn drop(&mut self) {
        self.publish();
    }
}
