use std::ffi::OsString;
use std::io;
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

use filestage_base::error::ErrorKind;
use filestage_base::{FilestageError, FilestageResult};
use tracing::{debug, instrument};
use windows::Win32::Foundation::{
    CloseHandle, ERROR_FILE_NOT_FOUND, ERROR_PATH_NOT_FOUND, FALSE, HANDLE, HMODULE,
};
use windows::Win32::Storage::FileSystem::{
    CREATE_ALWAYS, CopyFileW, CreateFileW, DeleteFileW, FILE_ATTRIBUTE_NORMAL,
    FILE_FLAGS_AND_ATTRIBUTES, FILE_GENERIC_READ, FILE_GENERIC_WRITE, FILE_SHARE_NONE,
    FILE_SHARE_READ, GetFileAttributesW, GetFileSizeEx, INVALID_FILE_ATTRIBUTES,
    MOVEFILE_REPLACE_EXISTING, MoveFileExW, OPEN_EXISTING, ReadFile, SetFileAttributesW,
    WriteFile,
};
use windows::Win32::System::LibraryLoader::GetModuleFileNameW;
use windows::core::PCWSTR;

use crate::file_path::MAX_PATH_UNITS;
use crate::handle::{FileHandle, RawFile};
use crate::traits::FileSystem;

/// Disk filesystem for Windows: wide paths with `\` separators, native
/// handles, attribute bits as the mode value.
#[derive(Debug, Default)]
pub struct WindowsFileSystem;

impl WindowsFileSystem {
    pub fn new() -> Self {
        Self
    }
}

fn fs_err(path: &Path, source: io::Error) -> Box<FilestageError> {
    Box::new(FilestageError::new(ErrorKind::Io {
        path: path.to_path_buf(),
        source,
    }))
}

fn win_err(path: &Path, error: windows::core::Error) -> Box<FilestageError> {
    fs_err(path, io::Error::from_raw_os_error(error.code().0))
}

/// Null-terminated wide encoding of a path, rejecting interior NULs and
/// anything over the native bound.
fn encode_wide(path: &Path) -> FilestageResult<Vec<u16>> {
    let mut wide: Vec<u16> = path.as_os_str().encode_wide().collect();
    if wide.contains(&0) {
        return Err(Box::new(FilestageError::message(format!(
            "path contains an interior NUL: {}",
            path.display()
        ))));
    }
    wide.push(0);
    if wide.len() > MAX_PATH_UNITS {
        return Err(Box::new(FilestageError::new(ErrorKind::PathTooLong {
            path: path.to_path_buf(),
            units: wide.len(),
        })));
    }
    Ok(wide)
}

impl FileSystem for WindowsFileSystem {
    #[instrument(skip(self))]
    fn binary_path(&self) -> FilestageResult<PathBuf> {
        let mut buffer = [0u16; MAX_PATH_UNITS];
        let len = unsafe { GetModuleFileNameW(HMODULE::default(), &mut buffer) } as usize;
        if len == 0 || len >= buffer.len() {
            // zero means failure, a full buffer means truncation
            return Err(fs_err(Path::new("<module>"), io::Error::last_os_error()));
        }
        let path = PathBuf::from(OsString::from_wide(&buffer[..len]));
        debug!(path = %path.display(), "resolved running binary");
        Ok(path)
    }

    fn exists(&self, path: &Path) -> FilestageResult<bool> {
        let wide = encode_wide(path)?;
        let attributes = unsafe { GetFileAttributesW(PCWSTR(wide.as_ptr())) };
        Ok(attributes != INVALID_FILE_ATTRIBUTES)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn open_for_reading(&self, path: &Path) -> FilestageResult<FileHandle> {
        let wide = encode_wide(path)?;
        let handle = unsafe {
            CreateFileW(
                PCWSTR(wide.as_ptr()),
                FILE_GENERIC_READ.0,
                FILE_SHARE_READ,
                None,
                OPEN_EXISTING,
                FILE_FLAGS_AND_ATTRIBUTES(0),
                HANDLE::default(),
            )
        }
        .map_err(|e| win_err(path, e))?;
        debug!("opened for reading");
        Ok(FileHandle::new(WindowsFile {
            path: path.to_path_buf(),
            handle,
        }))
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn create_for_writing(&self, path: &Path) -> FilestageResult<FileHandle> {
        let wide = encode_wide(path)?;
        let handle = unsafe {
            CreateFileW(
                PCWSTR(wide.as_ptr()),
                FILE_GENERIC_WRITE.0,
                FILE_SHARE_NONE,
                None,
                CREATE_ALWAYS,
                FILE_ATTRIBUTE_NORMAL,
                HANDLE::default(),
            )
        }
        .map_err(|e| win_err(path, e))?;
        debug!("created for writing");
        Ok(FileHandle::new(WindowsFile {
            path: path.to_path_buf(),
            handle,
        }))
    }

    fn file_mode(&self, path: &Path) -> FilestageResult<u32> {
        let wide = encode_wide(path)?;
        let attributes = unsafe { GetFileAttributesW(PCWSTR(wide.as_ptr())) };
        if attributes == INVALID_FILE_ATTRIBUTES {
            return Err(fs_err(path, io::Error::last_os_error()));
        }
        Ok(attributes)
    }

    fn set_file_mode(&self, path: &Path, mode: u32) -> FilestageResult<()> {
        let wide = encode_wide(path)?;
        unsafe { SetFileAttributesW(PCWSTR(wide.as_ptr()), FILE_FLAGS_AND_ATTRIBUTES(mode)) }
            .map_err(|e| win_err(path, e))
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn delete_file(&self, path: &Path) -> FilestageResult<()> {
        let wide = encode_wide(path)?;
        match unsafe { DeleteFileW(PCWSTR(wide.as_ptr())) } {
            Ok(()) => Ok(()),
            // deletion is idempotent; a pre-absent file counts as removed
            Err(e)
                if e.code() == ERROR_FILE_NOT_FOUND.to_hresult()
                    || e.code() == ERROR_PATH_NOT_FOUND.to_hresult() =>
            {
                debug!("already absent");
                Ok(())
            }
            Err(e) => Err(win_err(path, e)),
        }
    }

    #[instrument(skip(self), fields(source = %source.display(), dest = %dest.display()))]
    fn rename_file(&self, source: &Path, dest: &Path) -> FilestageResult<()> {
        let wide_source = encode_wide(source)?;
        let wide_dest = encode_wide(dest)?;
        unsafe {
            MoveFileExW(
                PCWSTR(wide_source.as_ptr()),
                PCWSTR(wide_dest.as_ptr()),
                MOVEFILE_REPLACE_EXISTING,
            )
        }
        .map_err(|e| win_err(source, e))?;
        debug!("renamed");
        Ok(())
    }

    #[instrument(skip(self), fields(source = %source.display(), dest = %dest.display()))]
    fn copy_file(&self, source: &Path, dest: &Path, mode: u32) -> FilestageResult<()> {
        let wide_source = encode_wide(source)?;
        let wide_dest = encode_wide(dest)?;
        // CopyFileW moves content and attributes in one call; mode is
        // applied on top to match the narrow-path implementation
        unsafe { CopyFileW(PCWSTR(wide_source.as_ptr()), PCWSTR(wide_dest.as_ptr()), FALSE) }
            .map_err(|e| win_err(source, e))?;
        self.set_file_mode(dest, mode)
    }
}

/// Native handle; the cursor lives in the kernel file object.
#[derive(Debug)]
struct WindowsFile {
    path: PathBuf,
    handle: HANDLE,
}

impl RawFile for WindowsFile {
    fn size(&mut self) -> FilestageResult<u64> {
        let mut size = 0i64;
        unsafe { GetFileSizeEx(self.handle, &mut size) }.map_err(|e| win_err(&self.path, e))?;
        Ok(size as u64)
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> FilestageResult<()> {
        let mut filled = 0usize;
        while filled < buf.len() {
            let mut got = 0u32;
            unsafe { ReadFile(self.handle, Some(&mut buf[filled..]), Some(&mut got), None) }
                .map_err(|e| win_err(&self.path, e))?;
            if got == 0 {
                // end of file before the chunk was complete
                return Err(fs_err(
                    &self.path,
                    io::Error::new(io::ErrorKind::UnexpectedEof, "failed to fill whole chunk"),
                ));
            }
            filled += got as usize;
        }
        Ok(())
    }

    fn write_chunk(&mut self, buf: &[u8]) -> FilestageResult<()> {
        let mut written = 0usize;
        while written < buf.len() {
            let mut put = 0u32;
            unsafe { WriteFile(self.handle, Some(&buf[written..]), Some(&mut put), None) }
                .map_err(|e| win_err(&self.path, e))?;
            if put == 0 {
                return Err(fs_err(
                    &self.path,
                    io::Error::new(io::ErrorKind::WriteZero, "failed to write whole chunk"),
                ));
            }
            written += put as usize;
        }
        Ok(())
    }

    fn close(mut self: Box<Self>) -> FilestageResult<()> {
        let handle = std::mem::replace(&mut self.handle, HANDLE::default());
        unsafe { CloseHandle(handle) }.map_err(|e| win_err(&self.path, e))
    }
}

impl Drop for WindowsFile {
    fn drop(&mut self) {
        if !self.handle.is_invalid() {
            unsafe {
                _ = CloseHandle(self.handle);
            }
        }
    }
}
