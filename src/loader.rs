// ── Bounded text loader ───────────────────────────────────────────────────────
//
// Reads a document stream line by line into a single string, refusing to
// load more than a fixed number of characters.  The loader takes the stream
// by value, so the stream is closed exactly once on every return path.

use std::io::{self, BufRead, BufReader, Read};

use crate::i18n::Messages;

/// Largest document the editor will load, in characters.
///
/// Counted per line in UTF-16 code units with line terminators excluded, so
/// a character outside the Basic Multilingual Plane counts twice.
pub const MAX_CHARS: usize = 500_000;

/// Marker written between partial content and the fault message when a
/// stream fails mid-read.
const FAULT_MARKER: &str = "\nERROR\n";

const UTF8_BOM: char = '\u{FEFF}';

// ── LoadResult ────────────────────────────────────────────────────────────────

/// Outcome of a single load.
///
/// The two failure shapes differ on purpose: an oversize document is replaced
/// wholesale, while a faulted stream keeps what was read before the fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    /// Every line was read; each line is followed by `\n`.
    Complete(String),
    /// The limit was exceeded.  Holds the oversize message plus `"\n\n"`.
    TooLarge(String),
    /// Reading failed partway.  Holds the partial text plus the inline
    /// `ERROR` block.
    Interrupted(String),
}

impl LoadResult {
    /// The text the shell places in the document buffer.
    pub fn into_text(self) -> String {
        match self {
            Self::Complete(s) | Self::TooLarge(s) | Self::Interrupted(s) => s,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

// ── Lines ─────────────────────────────────────────────────────────────────────

/// Lazy, single-pass iterator over the lines of a UTF-8 stream.
///
/// A line ends at `\n`, `\r\n` or a lone `\r`; terminators are stripped.  A
/// leading BOM is dropped and malformed bytes decode to U+FFFD.  Only read
/// errors are reported, and the iterator fuses after the first one.
struct Lines<R> {
    reader: BufReader<R>,
    first: bool,
    /// The previous line ended at `\r`; a `\n` right after it belongs to it.
    skip_lf: bool,
    done: bool,
}

impl<R: Read> Lines<R> {
    fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
            first: true,
            skip_lf: false,
            done: false,
        }
    }

    fn next_raw(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut raw = Vec::new();
        loop {
            let buf = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if buf.is_empty() {
                return Ok((!raw.is_empty()).then_some(raw));
            }
            if std::mem::take(&mut self.skip_lf) && buf[0] == b'\n' {
                self.reader.consume(1);
                continue;
            }
            match buf.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(end) => {
                    raw.extend_from_slice(&buf[..end]);
                    self.skip_lf = buf[end] == b'\r';
                    self.reader.consume(end + 1);
                    return Ok(Some(raw));
                }
                None => {
                    let len = buf.len();
                    raw.extend_from_slice(buf);
                    self.reader.consume(len);
                }
            }
        }
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        let Some(raw) = self.next_raw()? else {
            return Ok(None);
        };
        let mut line = String::from_utf8(raw)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
        if std::mem::take(&mut self.first) && line.starts_with(UTF8_BOM) {
            line.replace_range(..UTF8_BOM.len_utf8(), "");
        }
        Ok(Some(line))
    }
}

impl<R: Read> Iterator for Lines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_line().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load `source` as text, giving up once more than `limit` characters have
/// been read.
pub fn load<R: Read>(source: R, limit: usize, messages: &Messages) -> LoadResult {
    let mut text = String::new();
    let mut total: usize = 0;

    for line in Lines::new(source) {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("document stream failed after {total} chars: {e}");
                text.push_str(FAULT_MARKER);
                text.push_str(&e.to_string());
                text.push('\n');
                return LoadResult::Interrupted(text);
            }
        };

        total = total.saturating_add(line.encode_utf16().count());
        if total > limit {
            log::warn!("document exceeds {limit} chars; discarding it");
            return LoadResult::TooLarge(format!("{}\n\n", messages.file_too_large));
        }
        text.push_str(&line);
        text.push('\n');
    }

    LoadResult::Complete(text)
}

/// Load `source` and return the string to display, whatever the outcome.
pub fn read_text<R: Read>(source: R, limit: usize, messages: &Messages) -> String {
    load(source, limit, messages).into_text()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
