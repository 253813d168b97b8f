// Release builds on Windows run as a GUI application (no console window).
// Debug builds keep the console so that log output is visible.
#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

fn main() {
    scrawl::logging::init();

    if let Err(e) = run() {
        log::error!("{e}");
        report_fatal(&e.to_string());
        std::process::exit(1);
    }
}

#[cfg(windows)]
fn run() -> scrawl::error::Result<()> {
    scrawl::platform::win32::window::run()
}

#[cfg(not(windows))]
fn run() -> scrawl::error::Result<()> {
    scrawl::platform::console::run()
}

// Startup failed before or during the UI loop.  On Windows a modal dialog is
// the only output path a GUI app has.
#[cfg(windows)]
fn report_fatal(message: &str) {
    scrawl::platform::win32::window::show_error_dialog(message);
}

#[cfg(not(windows))]
fn report_fatal(message: &str) {
    eprintln!("scrawl: {message}");
}
