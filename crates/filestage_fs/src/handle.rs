use filestage_base::FilestageResult;

/// Backing implementation of one open file. The platform representation
/// lives behind this trait: a native handle on Windows, a stream-backed
/// `std::fs::File` on POSIX-like systems, a buffer in the in-memory
/// filesystem.
pub(crate) trait RawFile: std::fmt::Debug + Send {
    fn size(&mut self) -> FilestageResult<u64>;
    fn read_chunk(&mut self, buf: &mut [u8]) -> FilestageResult<()>;
    fn write_chunk(&mut self, buf: &[u8]) -> FilestageResult<()>;
    fn close(self: Box<Self>) -> FilestageResult<()>;
}

/// An open file, bound to exactly one underlying OS resource.
///
/// Obtained from `FileSystem::open_for_reading` or
/// `FileSystem::create_for_writing`; the caller owns it exclusively until
/// it is closed. [`FileHandle::close`] consumes the handle, so use after
/// close and double close are compile errors rather than runtime
/// contracts.
#[derive(Debug)]
pub struct FileHandle(Box<dyn RawFile>);

impl FileHandle {
    pub(crate) fn new(raw: impl RawFile + 'static) -> Self {
        Self(Box::new(raw))
    }

    /// Total byte length of the open file's current contents.
    ///
    /// The read/write cursor is left where it was; implementations answer
    /// through cursor-neutral queries.
    pub fn size(&mut self) -> FilestageResult<u64> {
        self.0.size()
    }

    /// Reads exactly `buf.len()` bytes into `buf`, advancing the cursor.
    ///
    /// A short read is an error; reading past end-of-file is an error,
    /// not a zero-length success. After a failed read the handle's
    /// remaining use is unspecified and the caller should close it.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> FilestageResult<()> {
        self.0.read_chunk(buf)
    }

    /// Writes exactly `buf.len()` bytes, advancing the cursor.
    ///
    /// A short write is an error even though some bytes may already be
    /// persisted; the caller must treat the destination as discard-worthy
    /// after any failure.
    pub fn write_chunk(&mut self, buf: &[u8]) -> FilestageResult<()> {
        self.0.write_chunk(buf)
    }

    /// Releases the underlying OS resource and reports the platform close
    /// status.
    ///
    /// Dropping an unclosed handle also releases the resource; the
    /// explicit form exists to observe the status.
    pub fn close(self) -> FilestageResult<()> {
        self.0.close()
    }
}
