// ── Safety policy ────────────────────────────────────────────────────────────
// Unsafe code is forbidden everywhere except `platform::win32` (Win32 / WinRT
// FFI).  Each unsafe block there MUST carry a `// SAFETY:` comment.
#![deny(unsafe_code)]

//! Scrawl: a very simple plain-text editor.
//!
//! One document, three actions: open a file, save it under a new name, and
//! dictate text at the cursor.  Loading is bounded to [`loader::MAX_CHARS`]
//! characters; all document I/O runs on a single background [`worker`] and
//! is applied by the [`shell`] on the UI thread.

pub mod document;
pub mod error;
pub mod i18n;
pub mod loader;
pub mod logging;
pub mod platform;
pub mod shell;
pub mod worker;
