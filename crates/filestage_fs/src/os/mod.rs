/* One disk implementation per build target. The selection happens once,
here, at compile time; everything else goes through the FileSystem trait. */

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        pub mod windows;
        pub use self::windows::WindowsFileSystem;

        /// The disk filesystem of the current build target.
        pub type NativeFileSystem = WindowsFileSystem;
    } else {
        pub mod posix;
        pub use self::posix::PosixFileSystem;

        /// The disk filesystem of the current build target.
        pub type NativeFileSystem = PosixFileSystem;
    }
}
