/* The CLI is intentionally minimal: two positional arguments, no
argument-parsing dependency, no configuration file.

`filestage SOURCE DEST` installs the content of SOURCE at DEST through a
staged write: the bytes land in DEST's temp file and are promoted by an
atomic rename, so a crash at any point leaves either the previous DEST or
the finished new one on disk, never a partial file. Leftovers of an
earlier crashed run are recovered before the write starts, and the source
mode is carried over to the destination.

Exit codes:
- 0: destination replaced
- 1: any failure (missing argument, unreadable source, failed promotion)
*/

use std::env;
use std::path::PathBuf;
use std::process;

use filestage_base::tracing::init_tracing;
use filestage_fs::staging::{self, StagedWrite};
use filestage_fs::{FsHandle, NativeFileSystem};

const INSTALL_CHUNK: usize = 64 * 1024;

fn main() {
    init_tracing().unwrap();

    let mut args = env::args_os().skip(1);
    let (source, dest) = match (args.next(), args.next()) {
        (Some(source), Some(dest)) => (PathBuf::from(source), PathBuf::from(dest)),
        _ => {
            eprintln!("Usage: filestage SOURCE DEST");
            process::exit(1);
        }
    };

    let fs = FsHandle::new(NativeFileSystem::new());

    let recovery = match staging::recover(&fs, &dest) {
        Ok(recovery) => recovery,
        Err(e) => {
            eprintln!(
                "Error: failed to recover staging leftovers for {}: {}",
                dest.display(),
                e
            );
            process::exit(1);
        }
    };
    if !recovery.is_clean() {
        println!("Recovered staging leftovers for {}", dest.display());
    }

    let mode = match fs.file_mode(&source) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: failed to query {}: {}", source.display(), e);
            process::exit(1);
        }
    };

    let mut reader = match fs.open_for_reading(&source) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("Error: failed to open {}: {}", source.display(), e);
            process::exit(1);
        }
    };

    let total = match reader.size() {
        Ok(total) => total,
        Err(e) => {
            eprintln!("Error: failed to size {}: {}", source.display(), e);
            process::exit(1);
        }
    };

    let mut staged = match StagedWrite::begin(fs.clone(), &dest) {
        Ok(staged) => staged,
        Err(e) => {
            eprintln!("Error: failed to stage {}: {}", dest.display(), e);
            process::exit(1);
        }
    };

    let mut buffer = vec![0u8; INSTALL_CHUNK];
    let mut remaining = total;
    while remaining > 0 {
        let take = remaining.min(INSTALL_CHUNK as u64) as usize;
        if let Err(e) = reader.read_chunk(&mut buffer[..take]) {
            eprintln!("Error: failed to read {}: {}", source.display(), e);
            process::exit(1);
        }
        if let Err(e) = staged.write(&buffer[..take]) {
            eprintln!("Error: failed to write staged file: {}", e);
            process::exit(1);
        }
        remaining -= take as u64;
    }

    if let Err(e) = reader.close() {
        eprintln!("Error: failed to close {}: {}", source.display(), e);
        process::exit(1);
    }

    if let Err(e) = staged.commit() {
        eprintln!("Error: failed to promote {}: {}", dest.display(), e);
        process::exit(1);
    }

    if let Err(e) = fs.set_file_mode(&dest, mode) {
        eprintln!("Error: failed to apply mode to {}: {}", dest.display(), e);
        process::exit(1);
    }

    println!(
        "Installed {} -> {} ({} bytes)",
        source.display(),
        dest.display(),
        total
    );
}
