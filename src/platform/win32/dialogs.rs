// ── Common dialogs ─────────────────────────────────────────────────────────────
//
// Thin wrappers around the Win32 common-dialog APIs.  Each function returns
// `Ok(Some(path))` on user confirmation, `Ok(None)` on cancel, and
// `Err(code)` with the `CommDlgExtendedError` code when the dialog itself
// failed.
//
// This is inside `platform::win32` so `unsafe` is permitted per crate policy.

#![allow(unsafe_code)]

use std::path::PathBuf;

use windows::{
    core::{PCWSTR, PWSTR},
    Win32::{
        Foundation::HWND,
        UI::Controls::Dialogs::{
            CommDlgExtendedError, GetOpenFileNameW, GetSaveFileNameW, OFN_EXPLORER,
            OFN_FILEMUSTEXIST, OFN_HIDEREADONLY, OFN_OVERWRITEPROMPT, OFN_PATHMUSTEXIST,
            OPENFILENAMEW,
        },
    },
};

use super::wide;

// ── Buffer size ───────────────────────────────────────────────────────────────

/// Maximum path length in `WCHAR`s, including the null terminator.
/// `MAX_PATH` (260) is too short for modern Windows paths; use 32 768 which
/// is the documented maximum for `\\?\` extended paths.
const PATH_BUF_LEN: usize = 32_768;

/// Outcome of one dialog: a path, a cancel, or the dialog's error code.
pub(crate) type DialogResult = Result<Option<PathBuf>, u32>;

// ── Open dialog ───────────────────────────────────────────────────────────────

/// Show the standard "Open" dialog.  Any file type is accepted.
pub(crate) fn show_open_dialog(hwnd_owner: HWND) -> DialogResult {
    let mut buf = vec![0u16; PATH_BUF_LEN];

    // The filter string is null-separated pairs ending with a double null.
    let filter: Vec<u16> = "All Files (*.*)\0*.*\0\0".encode_utf16().collect();

    let mut ofn = OPENFILENAMEW {
        lStructSize: std::mem::size_of::<OPENFILENAMEW>() as u32,
        hwndOwner: hwnd_owner,
        lpstrFilter: PCWSTR(filter.as_ptr()),
        lpstrFile: PWSTR(buf.as_mut_ptr()),
        nMaxFile: PATH_BUF_LEN as u32,
        Flags: OFN_EXPLORER | OFN_FILEMUSTEXIST | OFN_PATHMUSTEXIST | OFN_HIDEREADONLY,
        ..Default::default()
    };

    // SAFETY: `ofn` is fully initialised; `buf` and `filter` outlive this
    // call.  GetOpenFileNameW reads and writes only within the buffers we
    // provided.  The function is called on the UI thread (required for modal
    // dialogs).
    let ok = unsafe { GetOpenFileNameW(&mut ofn) };

    finish(ok.as_bool(), &buf)
}

// ── Save dialog ───────────────────────────────────────────────────────────────

/// Show the standard "Save As" dialog for a plain-text document.
///
/// `default_name` pre-populates the filename field; `.txt` is appended when
/// the user types a name without an extension.
pub(crate) fn show_save_dialog(hwnd_owner: HWND, default_name: &str) -> DialogResult {
    let mut buf: Vec<u16> = default_name
        .encode_utf16()
        .chain(std::iter::repeat(0))
        .take(PATH_BUF_LEN)
        .collect();
    // Always leave room for the terminator.
    buf[PATH_BUF_LEN - 1] = 0;

    let filter: Vec<u16> = "Text Documents (*.txt)\0*.txt\0All Files (*.*)\0*.*\0\0"
        .encode_utf16()
        .collect();
    let def_ext = wide("txt");

    let mut ofn = OPENFILENAMEW {
        lStructSize: std::mem::size_of::<OPENFILENAMEW>() as u32,
        hwndOwner: hwnd_owner,
        lpstrFilter: PCWSTR(filter.as_ptr()),
        lpstrFile: PWSTR(buf.as_mut_ptr()),
        nMaxFile: PATH_BUF_LEN as u32,
        lpstrDefExt: PCWSTR(def_ext.as_ptr()),
        Flags: OFN_EXPLORER | OFN_OVERWRITEPROMPT | OFN_PATHMUSTEXIST | OFN_HIDEREADONLY,
        ..Default::default()
    };

    // SAFETY: same invariants as show_open_dialog above; `def_ext` also
    // outlives the call.
    let ok = unsafe { GetSaveFileNameW(&mut ofn) };

    finish(ok.as_bool(), &buf)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Distinguish a cancelled dialog (no extended error) from a failed one.
fn finish(ok: bool, buf: &[u16]) -> DialogResult {
    if ok {
        return Ok(Some(path_from_buf(buf)));
    }
    // SAFETY: CommDlgExtendedError reads thread-local state set by the dialog
    // call that just returned on this thread.
    let code = unsafe { CommDlgExtendedError() }.0;
    if code == 0 {
        Ok(None)
    } else {
        Err(code)
    }
}

/// Convert a null-terminated UTF-16 buffer to a `PathBuf`.
fn path_from_buf(buf: &[u16]) -> PathBuf {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    PathBuf::from(String::from_utf16_lossy(&buf[..len]))
}
