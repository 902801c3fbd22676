/* filestage_base carries the error handling and tracing setup shared by all
crates in the workspace, so that every filesystem operation reports failures
through one error type. */

pub mod error;
mod error_tests;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, FilestageError, FilestageResult, ResultExt};
