// ── Console front end ─────────────────────────────────────────────────────────
//
// Line-oriented stand-in for the GUI on targets without a native front end.
// Commands start with `:`; any other line is typed text, inserted at the
// cursor.  Pickers are prompts on the same input stream, and there is no
// speech engine, so dictation reports that one is required.

use std::{
    io::{self, BufRead, Write},
    sync::Arc,
};

use chrono::Local;

use crate::{
    error::Result,
    i18n::{plain_label, Locale, Messages},
    platform::{
        DocumentPicker, FsResolver, Locator, Notifier, PickerUnavailable, SpeechError,
        SpeechRecognizer, SpeechReply,
    },
    shell::{Shell, ShellEvent},
    worker::{ui_channel, Worker},
};

// ── Commands ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open,
    Save,
    Dictate,
    Print,
    /// Move the cursor to a char offset.
    Cursor(usize),
    Help,
    Quit,
    /// A line of text to insert, newline included.
    Text(String),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let Some(cmd) = line.strip_prefix(':') else {
            return Self::Text(format!("{line}\n"));
        };
        let mut parts = cmd.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("open" | "o"), None) => Self::Open,
            (Some("save" | "s"), None) => Self::Save,
            (Some("dictate" | "d"), None) => Self::Dictate,
            (Some("print" | "p"), None) => Self::Print,
            (Some("cursor" | "c"), Some(n)) => match n.parse() {
                Ok(n) => Self::Cursor(n),
                Err(_) => Self::Unknown(line.to_owned()),
            },
            (Some("help" | "h"), None) => Self::Help,
            (Some("quit" | "q"), None) => Self::Quit,
            // `::text` inserts a line that starts with a colon.
            _ if cmd.starts_with(':') => Self::Text(format!("{cmd}\n")),
            _ => Self::Unknown(line.to_owned()),
        }
    }
}

// ── Console ───────────────────────────────────────────────────────────────────

/// Console implementation of every UI-thread platform trait.
pub struct Console<R, W> {
    input: R,
    output: W,
    messages: Arc<Messages>,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W, messages: Arc<Messages>) -> Self {
        Self {
            input,
            output,
            messages,
        }
    }

    /// Next input line without its terminator; `None` at end of input.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    pub fn write(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes())?;
        self.output.flush()
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        self.write(text)?;
        self.read_line()
    }

    fn help(&mut self) -> io::Result<()> {
        let m = Arc::clone(&self.messages);
        self.write(&format!(
            "{title}\n  :open     {open}\n  :save     {save}\n  :dictate  {dictate}\n  \
             :print  :cursor N  :quit\n",
            title = m.app_title,
            open = plain_label(&m.menu_open),
            save = plain_label(&m.menu_save),
            dictate = plain_label(&m.menu_dictate),
        ))
    }
}

impl<R: BufRead, W: Write> DocumentPicker for Console<R, W> {
    fn pick_open(&mut self) -> std::result::Result<Option<Locator>, PickerUnavailable> {
        let prompt = self.messages.prompt_open.clone();
        let answer = self
            .prompt(&prompt)
            .map_err(|e| PickerUnavailable(e.to_string()))?;
        Ok(answer
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .map(Locator::new))
    }

    fn pick_save(
        &mut self,
        suggested_name: &str,
        mime: &str,
    ) -> std::result::Result<Option<Locator>, PickerUnavailable> {
        log::debug!("save picker for {mime}, suggesting {suggested_name}");
        let prompt = self.messages.save_prompt(suggested_name);
        let answer = self
            .prompt(&prompt)
            .map_err(|e| PickerUnavailable(e.to_string()))?;
        Ok(answer.map(|s| {
            let s = s.trim();
            Locator::new(if s.is_empty() { suggested_name } else { s })
        }))
    }
}

impl<R, W> SpeechRecognizer for Console<R, W> {
    fn recognize(&mut self, reply: SpeechReply) {
        reply.send(Err(SpeechError::Unavailable(
            "the console front end has no speech engine".to_owned(),
        )));
    }
}

impl<R, W: Write> Notifier for Console<R, W> {
    fn toast(&mut self, message: &str) {
        if let Err(e) = writeln!(self.output, "! {message}") {
            log::warn!("toast not shown: {e}");
        }
    }
}

// ── Loop ──────────────────────────────────────────────────────────────────────

/// Run the console editor on stdin/stdout until `:quit` or end of input.
pub fn run() -> Result<()> {
    let messages = Arc::new(Messages::for_locale(Locale::detect()));
    let worker = Worker::spawn("scrawl-io")?;
    // The loop blocks on completions itself; nothing to wake.
    let channel = ui_channel(|| {});
    let console = Console::new(io::stdin().lock(), io::stdout(), Arc::clone(&messages));
    let mut shell = Shell::new(console, Arc::new(FsResolver), worker, channel, messages);
    run_with(&mut shell)
}

/// Drive `shell` from its console's input.
pub fn run_with<R: BufRead, W: Write>(shell: &mut Shell<Console<R, W>>) -> Result<()> {
    shell.platform_mut().help()?;

    while let Some(line) = shell.platform_mut().read_line()? {
        match Command::parse(&line) {
            Command::Open => {
                shell.open_document();
            }
            Command::Save => {
                shell.save_document(&Local::now().naive_local());
            }
            Command::Dictate => {
                shell.dictate();
            }
            Command::Print => {
                let text = shell.document().text().to_owned();
                shell.platform_mut().write(&text)?;
            }
            Command::Cursor(n) => shell.document_mut().set_cursor(n),
            Command::Help => shell.platform_mut().help()?,
            Command::Quit => break,
            Command::Text(text) => shell.document_mut().insert_at_cursor(&text),
            Command::Unknown(line) => {
                log::debug!("unknown command {line:?}");
                shell.platform_mut().help()?;
            }
        }

        for event in shell.wait_idle() {
            report(shell, event)?;
        }
    }

    Ok(())
}

fn report<R: BufRead, W: Write>(shell: &mut Shell<Console<R, W>>, event: ShellEvent) -> Result<()> {
    let line = match event {
        ShellEvent::Loaded => {
            let doc = shell.document();
            format!("{} chars\n", doc.char_len())
        }
        ShellEvent::Saved(locator) => format!("{}: {locator}\n", shell.messages().saved),
        ShellEvent::Dictated => return Ok(()),
        ShellEvent::LoadFailed(e) => format!("{}: {e}\n", shell.messages().open_failed),
        ShellEvent::SaveFailed(e) => format!("{}: {e}\n", shell.messages().save_failed),
    };
    shell.platform_mut().write(&line)?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
