// ── Platform abstraction layer ────────────────────────────────────────────────
//
// The shell talks to the OS only through the traits below.  Each front end
// (`console`, `win32`) implements them; tests implement them with fakes.
// No `unsafe` lives here; all Win32 FFI is confined to the `win32` sub-module.

use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

pub mod console;

#[cfg(windows)]
pub mod win32;

// ── Locator ───────────────────────────────────────────────────────────────────

/// Opaque handle to a user-chosen document, as returned by a picker.
///
/// Only the `ContentResolver` that matches the picker interprets it; on the
/// desktop front ends it is a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Path> for Locator {
    fn from(p: &Path) -> Self {
        Self(p.to_string_lossy().into_owned())
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Pickers ───────────────────────────────────────────────────────────────────

/// The platform has no document picker to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerUnavailable(pub String);

impl std::fmt::Display for PickerUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "document picker unavailable: {}", self.0)
    }
}

impl std::error::Error for PickerUnavailable {}

/// Content type declared for documents created by "Save As".
pub const PLAIN_TEXT_MIME: &str = "text/plain";

/// Document open / create pickers.
///
/// Each call is one request answered exactly once: `Ok(Some(_))` with the
/// chosen document, `Ok(None)` when the user backed out.
pub trait DocumentPicker {
    /// Pick an existing document of any type.
    fn pick_open(&mut self) -> Result<Option<Locator>, PickerUnavailable>;

    /// Pick where to create a document, pre-filled with `suggested_name`.
    fn pick_save(
        &mut self,
        suggested_name: &str,
        mime: &str,
    ) -> Result<Option<Locator>, PickerUnavailable>;
}

// ── Speech ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    /// No recognition engine is installed or it cannot be started.
    Unavailable(String),
    /// The engine ran but recognition failed.
    Failed(String),
}

impl std::fmt::Display for SpeechError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(why) => write!(f, "speech recognition unavailable: {why}"),
            Self::Failed(why) => write!(f, "speech recognition failed: {why}"),
        }
    }
}

impl std::error::Error for SpeechError {}

/// Transcript candidates, best first, or why there are none.
pub type SpeechOutcome = Result<Vec<String>, SpeechError>;

/// One-shot answer channel for a dictation request.
///
/// Delivered at most once, from any thread.  Dropping an undelivered reply
/// answers with `SpeechError::Failed`, so every request is resolved.
pub struct SpeechReply {
    deliver: Option<Box<dyn FnOnce(SpeechOutcome) + Send>>,
}

impl SpeechReply {
    pub fn new(deliver: impl FnOnce(SpeechOutcome) + Send + 'static) -> Self {
        Self {
            deliver: Some(Box::new(deliver)),
        }
    }

    /// Hand over the transcript candidates, best first.  An empty list means
    /// the user cancelled or nothing was heard.
    pub fn send(mut self, outcome: SpeechOutcome) {
        if let Some(deliver) = self.deliver.take() {
            deliver(outcome);
        }
    }
}

impl Drop for SpeechReply {
    fn drop(&mut self) {
        if let Some(deliver) = self.deliver.take() {
            log::warn!("dictation request dropped without an answer");
            deliver(Err(SpeechError::Failed("no answer from recognizer".to_owned())));
        }
    }
}

impl std::fmt::Debug for SpeechReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechReply")
            .field("pending", &self.deliver.is_some())
            .finish()
    }
}

/// Free-form dictation.
pub trait SpeechRecognizer {
    /// Listen once.  The outcome goes to `reply`, either before this returns
    /// or later from another thread.
    fn recognize(&mut self, reply: SpeechReply);
}

// ── Notifications ─────────────────────────────────────────────────────────────

/// Transient, non-blocking user notification.
pub trait Notifier {
    fn toast(&mut self, message: &str);
}

/// Everything the shell needs from the UI-thread side of a front end.
pub trait Platform: DocumentPicker + SpeechRecognizer + Notifier {}

impl<T: DocumentPicker + SpeechRecognizer + Notifier> Platform for T {}

// ── Content resolution ────────────────────────────────────────────────────────

/// Opens the byte streams behind locators.  Called on the worker thread.
pub trait ContentResolver: Send + Sync + 'static {
    fn open_read(&self, locator: &Locator) -> io::Result<Box<dyn Read + Send>>;

    /// `Ok(None)` when the target exists but yields no writable stream.
    fn open_write(&self, locator: &Locator) -> io::Result<Option<Box<dyn Write + Send>>>;
}

/// Resolves locators as filesystem paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsResolver;

impl ContentResolver for FsResolver {
    fn open_read(&self, locator: &Locator) -> io::Result<Box<dyn Read + Send>> {
        let file = fs::File::open(PathBuf::from(locator.as_str()))?;
        Ok(Box::new(file))
    }

    fn open_write(&self, locator: &Locator) -> io::Result<Option<Box<dyn Write + Send>>> {
        if locator.as_str().is_empty() {
            return Ok(None);
        }
        let file = fs::File::create(PathBuf::from(locator.as_str()))?;
        Ok(Some(Box::new(io::BufWriter::new(file))))
    }
}

// ── Locale ────────────────────────────────────────────────────────────────────

/// The user's locale tag, e.g. `ru-RU` or `en_US.UTF-8`.
pub fn system_locale_tag() -> Option<String> {
    #[cfg(windows)]
    {
        if let Some(tag) = win32::user_locale_name() {
            return Some(tag);
        }
    }

    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.is_empty())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
