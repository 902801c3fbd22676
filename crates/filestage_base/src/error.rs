use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

/* The error type is hand-rolled rather than derived. Callers of this layer
pattern match on ErrorKind to decide between retry, fallback and abort, and
the two-layer split keeps the structural variant separate from the context
strings attached during propagation. */

/// Error variants that can occur in filestage operations.
/// Each variant carries the context needed to report the failing path.
#[derive(Debug)]
pub enum ErrorKind {
    /// An OS-level file operation failed. Not-found, permission denied,
    /// short I/O and resource exhaustion all surface here; the `source`
    /// carries the platform classification.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A path exceeded the native length bound and was rejected before
    /// reaching the OS.
    PathTooLong { path: PathBuf, units: usize },

    /// Catch-all for other errors with a message
    Message { message: String },
}

/// Error type wrapping ErrorKind with optional propagation context.
#[derive(Debug)]
pub struct FilestageError {
    kind: ErrorKind,
    context: Vec<String>,
}

impl FilestageError {
    /// Creates a new error from an ErrorKind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
        }
    }

    /// Creates a message-only error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the attached context strings, outermost first.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    /// Returns the innermost error in the source chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }
}

impl From<ErrorKind> for FilestageError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for FilestageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::Io { source, .. } => Some(source),
            ErrorKind::PathTooLong { .. } => None,
            ErrorKind::Message { .. } => None,
        }
    }
}

impl fmt::Display for FilestageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ctx) in self.context.iter().enumerate() {
            if i == 0 {
                write!(f, "{}", ctx)?;
            } else {
                write!(f, ": {}", ctx)?;
            }
        }

        if !self.context.is_empty() {
            write!(f, ": ")?;
        }

        match &self.kind {
            ErrorKind::Io { path, source } => {
                write!(f, "file operation failed at {}: {}", path.display(), source)
            }
            ErrorKind::PathTooLong { path, units } => {
                write!(
                    f,
                    "path of {} native units exceeds the supported bound: {}",
                    units,
                    path.display()
                )
            }
            ErrorKind::Message { message } => {
                write!(f, "{}", message)
            }
        }
    }
}

/// Standard result type for filestage operations.
/// The error is boxed to keep the Ok path small.
pub type FilestageResult<T> = std::result::Result<T, Box<FilestageError>>;

/// Extension trait for attaching context to Results during propagation.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> FilestageResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> FilestageResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for FilestageResult<T> {
    fn context(self, context: impl Into<String>) -> FilestageResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> FilestageResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}
