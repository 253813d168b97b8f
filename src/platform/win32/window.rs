// ── Main window ───────────────────────────────────────────────────────────────
//
// Responsibilities in this file (unsafe confined here):
//   • Register the main window class.
//   • Create the top-level window, its menu bar and the EDIT child control.
//   • Build the `Shell` in WM_CREATE and tear it down in WM_DESTROY.
//   • Run the Win32 message loop.
//   • Dispatch WM_COMMAND (Open / Save As / Dictate) and the private
//     completion message posted after each load, save or dictation.
//   • Expose a safe error-dialog helper for use by main().
//
// The EDIT control holds what the user sees.  Before each command and each
// batch of completions its text and caret are pulled into the shell's
// document; after the shell changes the document it is pushed back.

#![allow(unsafe_code)]

use std::{cell::RefCell, ffi::c_void, sync::Arc};

use chrono::Local;
use windows::{
    core::{w, PCWSTR},
    Win32::{
        Foundation::{GetLastError, BOOL, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM},
        Graphics::Gdi::{GetStockObject, DEFAULT_GUI_FONT, HBRUSH, WHITE_BRUSH},
        System::LibraryLoader::GetModuleHandleW,
        UI::WindowsAndMessaging::{
            AppendMenuW, CreateMenu, CreateWindowExW, DefWindowProcW, DestroyWindow,
            DispatchMessageW, GetMessageW, GetWindowLongPtrW, GetWindowTextLengthW,
            GetWindowTextW, LoadCursorW, LoadIconW, MessageBoxW, MoveWindow, PostMessageW,
            PostQuitMessage, RegisterClassExW, SendMessageW, SetFocus,
            SetWindowLongPtrW, SetWindowTextW, ShowWindow, TranslateMessage, UpdateWindow,
            CREATESTRUCTW, CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT, GWLP_USERDATA, HMENU,
            IDC_ARROW, IDI_APPLICATION, MB_ICONERROR, MB_ICONINFORMATION, MB_OK, MF_POPUP,
            MF_STRING, MSG, SW_SHOW, WINDOW_EX_STYLE, WINDOW_STYLE, WM_APP, WM_CLOSE,
            WM_COMMAND, WM_CREATE, WM_DESTROY, WM_SETFOCUS, WM_SETFONT, WM_SIZE, WNDCLASSEXW,
            WS_CHILD, WS_EX_CLIENTEDGE, WS_OVERLAPPEDWINDOW, WS_VISIBLE, WS_VSCROLL,
        },
    },
};

use super::{dialogs, speech, wide};
use crate::{
    document::Document,
    error::{EditorError, Result},
    i18n::{Locale, Messages},
    platform::{
        DocumentPicker, FsResolver, Locator, Notifier, PickerUnavailable, SpeechRecognizer,
        SpeechReply,
    },
    shell::{Shell, ShellEvent},
    worker::{ui_channel, Worker},
};

// ── Window identity ───────────────────────────────────────────────────────────

/// Atom name used to register (and later find) the main window class.
const CLASS_NAME: PCWSTR = w!("ScrawlMainWindow");

/// Default client width in device pixels.
const DEFAULT_WIDTH: i32 = 720;

/// Default client height in device pixels.
const DEFAULT_HEIGHT: i32 = 540;

// ── Menu command IDs ──────────────────────────────────────────────────────────

const IDM_FILE_OPEN: usize = 1001;
const IDM_FILE_SAVE_AS: usize = 1002;
const IDM_DICTATE: usize = 1003;

/// Posted by the UI queue's wake callback after each completion, from the
/// worker or the speech thread.
const WM_APP_COMPLETION: u32 = WM_APP + 1;

// ── EDIT control messages & styles ────────────────────────────────────────────

const EM_GETSEL: u32 = 0x00B0;
const EM_SETSEL: u32 = 0x00B1;
const EM_SCROLLCARET: u32 = 0x00B7;
const EM_SETLIMITTEXT: u32 = 0x00C5;

const ES_MULTILINE: u32 = 0x0004;
const ES_AUTOVSCROLL: u32 = 0x0040;
const ES_NOHIDESEL: u32 = 0x0100;
const ES_WANTRETURN: u32 = 0x1000;

// ── Per-window state ──────────────────────────────────────────────────────────

/// Owned by the window through `GWLP_USERDATA`, from WM_CREATE to WM_DESTROY.
///
/// The shell sits in a `RefCell` because modal dialogs and message boxes pump
/// messages: WndProc can be re-entered while a command still holds the shell.
/// Re-entrant handlers skip the shell; the outer command pumps completions
/// when it finishes.
struct WindowState {
    edit: HWND,
    shell: RefCell<Shell<Win32Platform>>,
}

/// UI-thread collaborators for the shell: common dialogs, WinRT speech and
/// message boxes.
pub(crate) struct Win32Platform {
    owner: HWND,
    messages: Arc<Messages>,
}

impl DocumentPicker for Win32Platform {
    fn pick_open(&mut self) -> std::result::Result<Option<Locator>, PickerUnavailable> {
        dialogs::show_open_dialog(self.owner)
            .map(|p| p.as_deref().map(Locator::from))
            .map_err(|code| PickerUnavailable(format!("open dialog error {code:#06x}")))
    }

    fn pick_save(
        &mut self,
        suggested_name: &str,
        mime: &str,
    ) -> std::result::Result<Option<Locator>, PickerUnavailable> {
        log::debug!("save dialog for {mime}, suggesting {suggested_name}");
        dialogs::show_save_dialog(self.owner, suggested_name)
            .map(|p| p.as_deref().map(Locator::from))
            .map_err(|code| PickerUnavailable(format!("save dialog error {code:#06x}")))
    }
}

impl SpeechRecognizer for Win32Platform {
    fn recognize(&mut self, reply: SpeechReply) {
        speech::recognize(reply);
    }
}

impl Notifier for Win32Platform {
    fn toast(&mut self, message: &str) {
        message_box(self.owner, message, &self.messages.app_title, false);
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Register the main window class, create the window, and drive the message
/// loop until the user closes the application.
pub fn run() -> Result<()> {
    // SAFETY: GetModuleHandleW(None) returns the .exe's own HMODULE, which is
    // always valid for the process lifetime and never fails in practice.
    let hmodule = unsafe { GetModuleHandleW(None) }.map_err(EditorError::from)?;
    let hinstance = HINSTANCE(hmodule.0);

    let messages = Arc::new(Messages::for_locale(Locale::detect()));

    register_class(hinstance)?;
    let hwnd = create_window(hinstance, messages)?;

    // SAFETY: hwnd was just returned by CreateWindowExW and is valid.
    // ShowWindow returns the previous visibility state; UpdateWindow returns
    // a success BOOL. Both are ignored.
    unsafe {
        let _ = ShowWindow(hwnd, SW_SHOW);
        let _ = UpdateWindow(hwnd);
    }

    log::info!("main window visible");
    message_loop()
}

/// Show a modal error dialog with the given message.
///
/// Used by `main()` when `run()` returns an error.
pub fn show_error_dialog(message: &str) {
    message_box(HWND::default(), message, "Scrawl \u{2014} Fatal Error", true);
}

// ── Window class registration ─────────────────────────────────────────────────

fn register_class(hinstance: HINSTANCE) -> Result<()> {
    // SAFETY: LoadIconW with IDI_APPLICATION always succeeds; it loads the
    // built-in application icon resource, which exists on all Windows versions.
    let icon = unsafe { LoadIconW(None, IDI_APPLICATION) }.map_err(EditorError::from)?;

    // SAFETY: LoadCursorW with IDC_ARROW always succeeds; the arrow cursor is
    // a built-in resource guaranteed to exist on all Windows versions.
    let cursor = unsafe { LoadCursorW(None, IDC_ARROW) }.map_err(EditorError::from)?;

    // SAFETY: GetStockObject with WHITE_BRUSH always returns a valid HGDIOBJ.
    // Casting to HBRUSH is correct: stock brush objects are compatible types.
    let bg_brush = unsafe { HBRUSH(GetStockObject(WHITE_BRUSH).0) };

    let wndclass = WNDCLASSEXW {
        cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
        style: CS_HREDRAW | CS_VREDRAW,
        lpfnWndProc: Some(wnd_proc),
        cbClsExtra: 0,
        cbWndExtra: 0,
        hInstance: hinstance,
        hIcon: icon,
        hCursor: cursor,
        hbrBackground: bg_brush,
        lpszMenuName: PCWSTR::null(),
        lpszClassName: CLASS_NAME,
        hIconSm: icon,
    };

    // SAFETY: wndclass is fully initialised with valid handles;
    // CLASS_NAME is a valid null-terminated UTF-16 string literal.
    let atom = unsafe { RegisterClassExW(&wndclass) };
    if atom == 0 {
        return Err(last_error("RegisterClassExW"));
    }

    Ok(())
}

// ── Window creation ───────────────────────────────────────────────────────────

fn create_window(hinstance: HINSTANCE, messages: Arc<Messages>) -> Result<HWND> {
    let title = wide(&messages.app_title);
    let menu = build_menu(&messages)?;

    // Ownership of the messages passes to WM_CREATE through lpCreateParams.
    let create_params = Box::into_raw(Box::new(messages));

    // SAFETY: CLASS_NAME was just registered; hinstance is the exe's module;
    // `title` outlives the call.  `create_params` is a live Box pointer that
    // WM_CREATE (which runs inside this call) takes back.
    let hwnd = unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE(0),
            CLASS_NAME,
            PCWSTR(title.as_ptr()),
            WS_OVERLAPPEDWINDOW,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            DEFAULT_WIDTH,
            DEFAULT_HEIGHT,
            HWND::default(),
            menu,
            hinstance,
            Some(create_params as *const c_void),
        )
    };

    if hwnd == HWND::default() {
        return Err(last_error("CreateWindowExW"));
    }

    Ok(hwnd)
}

// ── Menu construction ─────────────────────────────────────────────────────────

fn build_menu(messages: &Messages) -> Result<HMENU> {
    let file_label = wide(&messages.menu_file);
    let open_label = wide(&messages.menu_open);
    let save_label = wide(&messages.menu_save);
    let dictate_label = wide(&messages.menu_dictate);

    // SAFETY: CreateMenu has no preconditions; the label buffers outlive every
    // AppendMenuW call, which copies the strings.
    unsafe {
        let bar = CreateMenu().map_err(EditorError::from)?;

        let file = CreateMenu().map_err(EditorError::from)?;
        AppendMenuW(file, MF_STRING, IDM_FILE_OPEN, PCWSTR(open_label.as_ptr()))
            .map_err(EditorError::from)?;
        AppendMenuW(file, MF_STRING, IDM_FILE_SAVE_AS, PCWSTR(save_label.as_ptr()))
            .map_err(EditorError::from)?;

        // The uIDNewItem parameter for MF_POPUP is the child HMENU cast to usize.
        AppendMenuW(bar, MF_POPUP, file.0 as usize, PCWSTR(file_label.as_ptr()))
            .map_err(EditorError::from)?;
        // Dictation sits directly on the bar, one click away.
        AppendMenuW(bar, MF_STRING, IDM_DICTATE, PCWSTR(dictate_label.as_ptr()))
            .map_err(EditorError::from)?;

        Ok(bar)
    }
}

// ── Child controls & shell ────────────────────────────────────────────────────

fn on_create(hwnd: HWND, messages: Arc<Messages>) -> Result<WindowState> {
    let style = WS_CHILD
        | WS_VISIBLE
        | WS_VSCROLL
        | WINDOW_STYLE(ES_MULTILINE | ES_AUTOVSCROLL | ES_NOHIDESEL | ES_WANTRETURN);

    // SAFETY: hwnd is the window being created; "EDIT" is a system class.
    // HMENU::default() gives the child control ID 0, which no menu uses.
    let edit = unsafe {
        CreateWindowExW(
            WS_EX_CLIENTEDGE,
            w!("EDIT"),
            PCWSTR::null(),
            style,
            0,
            0,
            0,
            0,
            hwnd,
            HMENU::default(),
            HINSTANCE::default(),
            None,
        )
    };
    if edit == HWND::default() {
        return Err(last_error("CreateWindowExW (EDIT)"));
    }

    // SAFETY: edit is a valid EDIT control.  A limit of 0 lifts the default
    // 32K cap to the control maximum; DEFAULT_GUI_FONT is a stock object that
    // never needs freeing.
    unsafe {
        let _ = SendMessageW(edit, EM_SETLIMITTEXT, WPARAM(0), LPARAM(0));
        let font = GetStockObject(DEFAULT_GUI_FONT);
        let _ = SendMessageW(edit, WM_SETFONT, WPARAM(font.0 as usize), LPARAM(1));
    }

    let worker = Worker::spawn("scrawl-io")?;
    // HWND is not Send; carry the raw handle value to the worker instead.
    let raw_hwnd = hwnd.0 as isize;
    let channel = ui_channel(move || {
        // SAFETY: PostMessageW may be called from any thread.  If the window
        // is already gone the call fails and the wake is simply lost.
        let _ = unsafe {
            PostMessageW(
                HWND(raw_hwnd as *mut c_void),
                WM_APP_COMPLETION,
                WPARAM(0),
                LPARAM(0),
            )
        };
    });

    let platform = Win32Platform {
        owner: hwnd,
        messages: Arc::clone(&messages),
    };
    let shell = Shell::new(platform, Arc::new(FsResolver), worker, channel, messages);

    Ok(WindowState {
        edit,
        shell: RefCell::new(shell),
    })
}

/// Borrow the state stored in `GWLP_USERDATA`, if WM_CREATE has run.
///
/// # Safety
/// Must be called on the UI thread between WM_CREATE and WM_DESTROY.
unsafe fn state<'a>(hwnd: HWND) -> Option<&'a WindowState> {
    let ptr = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *const WindowState;
    // SAFETY: the pointer is either null or the Box leaked in WM_CREATE,
    // which stays alive until WM_DESTROY reclaims it.
    ptr.as_ref()
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn on_command(hwnd: HWND, state: &WindowState, cmd_id: usize) {
    let Ok(mut shell) = state.shell.try_borrow_mut() else {
        log::debug!("command {cmd_id} ignored while a dialog is open");
        return;
    };

    pull_from_edit(state.edit, shell.document_mut());
    match cmd_id {
        IDM_FILE_OPEN => {
            shell.open_document();
        }
        IDM_FILE_SAVE_AS => {
            shell.save_document(&Local::now().naive_local());
        }
        IDM_DICTATE => {
            shell.dictate();
        }
        _ => {}
    }

    let events = shell.pump();
    present(hwnd, state, &shell, events);
}

fn on_completion(hwnd: HWND, state: &WindowState) {
    // A busy shell means a command is running; it pumps when it returns.
    let Ok(mut shell) = state.shell.try_borrow_mut() else {
        return;
    };
    // The user may have typed since the last command; transcripts go in at
    // the current caret.
    pull_from_edit(state.edit, shell.document_mut());
    let events = shell.pump();
    present(hwnd, state, &shell, events);
}

fn present(hwnd: HWND, state: &WindowState, shell: &Shell<Win32Platform>, events: Vec<ShellEvent>) {
    for event in events {
        match event {
            ShellEvent::Loaded | ShellEvent::Dictated => {
                push_to_edit(state.edit, shell.document());
            }
            ShellEvent::Saved(_) => {}
            ShellEvent::LoadFailed(e) => {
                let text = format!("{}\n\n{e}", shell.messages().open_failed);
                message_box(hwnd, &text, &shell.messages().app_title, true);
            }
            ShellEvent::SaveFailed(e) => {
                let text = format!("{}\n\n{e}", shell.messages().save_failed);
                message_box(hwnd, &text, &shell.messages().app_title, true);
            }
        }
    }
}

// ── EDIT ⇄ document ───────────────────────────────────────────────────────────

/// Copy the control's text (CRLF → LF) and caret into `doc`.
fn pull_from_edit(edit: HWND, doc: &mut Document) {
    // SAFETY: edit is a valid EDIT control owned by this thread.
    let len = unsafe { GetWindowTextLengthW(edit) }.max(0) as usize;
    let mut buf = vec![0u16; len + 1];
    // SAFETY: buf holds len + 1 units, room for the text and terminator.
    let copied = unsafe { GetWindowTextW(edit, &mut buf) }.max(0) as usize;
    buf.truncate(copied);

    let mut start: u32 = 0;
    let mut end: u32 = 0;
    // SAFETY: EM_GETSEL writes one DWORD through each pointer; both point at
    // live locals.
    unsafe {
        let _ = SendMessageW(
            edit,
            EM_GETSEL,
            WPARAM(&mut start as *mut u32 as usize),
            LPARAM(&mut end as *mut u32 as isize),
        );
    }

    let text = String::from_utf16_lossy(&buf).replace("\r\n", "\n");
    doc.set_text(text);
    doc.set_cursor_crlf_utf16(start as usize);
}

/// Show `doc` in the control (LF → CRLF) with the caret at its cursor.
fn push_to_edit(edit: HWND, doc: &Document) {
    let text = wide(&doc.text().replace('\n', "\r\n"));
    let caret = doc.cursor_crlf_utf16();

    // SAFETY: edit is a valid EDIT control; `text` is null-terminated and
    // outlives the call, which copies it.
    unsafe {
        if let Err(e) = SetWindowTextW(edit, PCWSTR(text.as_ptr())) {
            log::error!("SetWindowTextW failed: {e}");
            return;
        }
        let _ = SendMessageW(edit, EM_SETSEL, WPARAM(caret), LPARAM(caret as isize));
        let _ = SendMessageW(edit, EM_SCROLLCARET, WPARAM(0), LPARAM(0));
    }
}

// ── Message loop ──────────────────────────────────────────────────────────────

fn message_loop() -> Result<()> {
    let mut msg = MSG::default();

    loop {
        // SAFETY: &mut msg is a valid MSG pointer; HWND::default() retrieves
        // messages for all windows on this thread; 0,0 filter accepts all.
        let ret = unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) };

        match ret.0 {
            // GetMessage returns -1 on error.
            -1 => return Err(last_error("GetMessageW")),
            // Returns 0 when WM_QUIT is retrieved; exit the loop.
            0 => break,
            _ => unsafe {
                // SAFETY: msg was populated by a successful GetMessage call.
                let _ = TranslateMessage(&msg);
                let _ = DispatchMessageW(&msg);
            },
        }
    }

    Ok(())
}

// ── Window procedure ──────────────────────────────────────────────────────────

// SAFETY: wnd_proc is registered as lpfnWndProc in WNDCLASSEXW.
// Windows guarantees that hwnd, msg, wparam, and lparam are valid for the
// lifetime of this call; we must not store hwnd beyond the message handler.
unsafe extern "system" fn wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        // ── Lifecycle ─────────────────────────────────────────────────────────
        WM_CREATE => {
            // SAFETY: for WM_CREATE, lparam points at the CREATESTRUCTW whose
            // lpCreateParams is the Box leaked by create_window.
            let cs = &*(lparam.0 as *const CREATESTRUCTW);
            let messages = *Box::from_raw(cs.lpCreateParams as *mut Arc<Messages>);

            match on_create(hwnd, messages) {
                Ok(state) => {
                    let ptr = Box::into_raw(Box::new(state));
                    SetWindowLongPtrW(hwnd, GWLP_USERDATA, ptr as isize);
                    LRESULT(0)
                }
                Err(e) => {
                    log::error!("window setup failed: {e}");
                    // -1 makes CreateWindowExW fail.
                    LRESULT(-1)
                }
            }
        }

        WM_CLOSE => {
            let _ = DestroyWindow(hwnd);
            LRESULT(0)
        }

        WM_DESTROY => {
            let ptr = SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0) as *mut WindowState;
            if !ptr.is_null() {
                // SAFETY: ptr is the Box leaked in WM_CREATE; userdata is now
                // cleared so no later message can observe it.  Dropping the
                // shell joins the worker after queued saves finish.
                drop(Box::from_raw(ptr));
            }
            PostQuitMessage(0);
            LRESULT(0)
        }

        // ── Layout & focus ────────────────────────────────────────────────────
        WM_SIZE => {
            if let Some(state) = state(hwnd) {
                // lparam low word = new client width, high word = new client height.
                let width = (lparam.0 & 0xFFFF) as i32;
                let height = ((lparam.0 >> 16) & 0xFFFF) as i32;
                let _ = MoveWindow(state.edit, 0, 0, width, height, BOOL(1));
            }
            LRESULT(0)
        }

        WM_SETFOCUS => {
            if let Some(state) = state(hwnd) {
                let _ = SetFocus(state.edit);
            }
            LRESULT(0)
        }

        // ── Commands ──────────────────────────────────────────────────────────
        WM_COMMAND => {
            // Low word of WPARAM is the command identifier.
            let cmd_id = wparam.0 & 0xFFFF;

            match (cmd_id, state(hwnd)) {
                (IDM_FILE_OPEN | IDM_FILE_SAVE_AS | IDM_DICTATE, Some(state)) => {
                    on_command(hwnd, state, cmd_id);
                    LRESULT(0)
                }
                _ => DefWindowProcW(hwnd, msg, wparam, lparam),
            }
        }

        WM_APP_COMPLETION => {
            if let Some(state) = state(hwnd) {
                on_completion(hwnd, state);
            }
            LRESULT(0)
        }

        // Default processing for all unhandled messages.
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn message_box(owner: HWND, text: &str, caption: &str, error: bool) {
    let text = wide(text);
    let caption = wide(caption);
    let icon = if error { MB_ICONERROR } else { MB_ICONINFORMATION };

    // SAFETY: both strings are null-terminated UTF-16 buffers that remain
    // allocated for the duration of the MessageBoxW call.  The return value
    // (button pressed) is intentionally unused.
    unsafe {
        let _ = MessageBoxW(owner, PCWSTR(text.as_ptr()), PCWSTR(caption.as_ptr()), MB_OK | icon);
    }
}

/// Capture the current Win32 last-error code and wrap it in an `EditorError`.
///
/// Call immediately after a Win32 function that signals failure. `GetLastError`
/// reads thread-local state that can be overwritten by any subsequent API call.
fn last_error(function: &'static str) -> EditorError {
    // SAFETY: GetLastError reads thread-local state set by the last Win32 call.
    let code = unsafe { GetLastError() };
    EditorError::Win32 {
        function,
        code: code.0,
    }
}
