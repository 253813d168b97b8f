// ── Central error type ────────────────────────────────────────────────────────
//
// All fallible operations in Scrawl return `error::Result<T>`.  No panics in
// production paths.  Errors never propagate past the shell: the shell logs
// them and hands them to the front end as `ShellEvent::LoadFailed` or
// `ShellEvent::SaveFailed`.

use crate::platform::Locator;

/// Every error that Scrawl can produce.
#[derive(Debug)]
pub enum EditorError {
    /// A Win32 API call returned a failure code.
    #[cfg(windows)]
    Win32 {
        /// The name of the failing function, for display purposes.
        function: &'static str,
        /// The raw Win32 error code (`GetLastError()` value) or HRESULT.
        code: u32,
    },

    /// The document behind a picker result could not be opened for reading.
    StreamNotFound {
        locator: Locator,
        source: std::io::Error,
    },

    /// The save target yielded no writable stream.
    NoOutputStream(Locator),

    /// The background worker has shut down and no longer accepts jobs.
    WorkerGone,

    /// A background job panicked before producing a result.
    JobPanicked(String),

    /// A standard I/O error (write, flush, thread spawn, …).
    Io(std::io::Error),
}

impl std::fmt::Display for EditorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(windows)]
            Self::Win32 { function, code } => {
                write!(f, "{function} failed (error {code:#010x})")
            }
            Self::StreamNotFound { locator, source } => {
                write!(f, "cannot open {locator}: {source}")
            }
            Self::NoOutputStream(locator) => write!(f, "no output stream for {locator}"),
            Self::WorkerGone => f.write_str("background worker is not running"),
            Self::JobPanicked(msg) => write!(f, "background job panicked: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for EditorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StreamNotFound { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EditorError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// Convert a windows-crate error (HRESULT) directly into an EditorError so that
// `?` can be used on `windows::core::Result<T>` throughout the platform module.
#[cfg(windows)]
impl From<windows::core::Error> for EditorError {
    fn from(e: windows::core::Error) -> Self {
        // HRESULT.0 is i32; reinterpret bits as u32 for display purposes.
        Self::Win32 {
            function: "windows",
            code: e.code().0 as u32,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EditorError>;

// ── Tests ─────────────────────────────────────────────────────────────────────
