// ── Win32 platform implementation ─────────────────────────────────────────────
//
// This is the one module in the codebase where `unsafe` code is permitted.
// Every `unsafe` block MUST carry a `// SAFETY:` comment that states:
//   • which invariant makes the operation sound, and
//   • what the caller is responsible for maintaining.
//
// Nothing in this module is `pub` beyond what callers genuinely need; keep the
// unsafe surface as small as possible.

#![allow(unsafe_code)]

use windows::Win32::Globalization::GetUserDefaultLocaleName;

// ── Sub-modules ───────────────────────────────────────────────────────────────

pub mod dialogs; // common open/save dialogs
pub mod speech; // WinRT dictation
pub mod window; // main window, WndProc, message loop

/// `LOCALE_NAME_MAX_LENGTH`, including the null terminator.
const LOCALE_NAME_LEN: usize = 85;

/// The user's default locale name, e.g. `ru-RU`.
pub(crate) fn user_locale_name() -> Option<String> {
    let mut buf = [0u16; LOCALE_NAME_LEN];
    // SAFETY: buf is a writable buffer of LOCALE_NAME_MAX_LENGTH units; the
    // function writes at most that many, including the terminator.
    let len = unsafe { GetUserDefaultLocaleName(&mut buf) };
    // The returned length counts the terminator; 0 means failure.
    let len = usize::try_from(len).ok()?.checked_sub(1)?;
    (len > 0).then(|| String::from_utf16_lossy(&buf[..len]))
}

/// Null-terminated UTF-16 copy of `s` for `PCWSTR` parameters.
pub(crate) fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}
