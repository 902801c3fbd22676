/* Uniform filesystem operations for self-managing binaries: locating the
running executable image, chunked I/O through owned handles, and the
crash-safe temp/away replacement protocol. One disk implementation exists
per platform family, selected at build time; an in-memory implementation
backs deterministic tests. */

mod file_path;
pub use file_path::{AWAY_SUFFIX, MAX_PATH_UNITS, TMP_SUFFIX, displaced_path, staging_path};

mod handle;
pub use handle::FileHandle;

mod traits;
pub use traits::{FileSystem, FsHandle};

pub mod memory;
pub use memory::MemoryFileSystem;

pub mod os;
pub use os::NativeFileSystem;

pub mod staging;
pub use staging::{Commit, Recovery, StagedWrite, recover};
