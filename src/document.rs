// ── Document buffer ───────────────────────────────────────────────────────────
//
// The one document the editor holds.  Owned by the shell and touched only on
// the UI thread; the worker sees nothing but owned copies of its text.

/// In-memory text plus the insertion cursor.
///
/// The cursor is a char offset in `0..=char_len()`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Document {
    text: String,
    cursor: usize,
}

impl Document {
    /// A fresh, empty document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the whole text.  The cursor moves to the start.
    pub fn set_text(&mut self, text: String) {
        self.text = text;
        self.cursor = 0;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor, clamping it to the end of the text.
    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.char_len());
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Insert `s` at the cursor and leave the cursor just after it.
    pub fn insert_at_cursor(&mut self, s: &str) {
        let at = self.byte_offset(self.cursor);
        self.text.insert_str(at, s);
        self.cursor += s.chars().count();
    }

    /// The text as it is written to disk.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.text.as_bytes().to_vec()
    }

    // ── Edit-control positions ────────────────────────────────────────────────
    //
    // Native edit controls show the text with CRLF line breaks and report the
    // caret in UTF-16 code units, so each `\n` here is two units there.

    /// Set the cursor from a caret offset in the CRLF, UTF-16 rendering of the
    /// text.  An offset inside a surrogate pair or a CRLF rounds up to the
    /// following char.
    pub fn set_cursor_crlf_utf16(&mut self, units: usize) {
        let mut seen = 0;
        let mut chars = 0;
        for c in self.text.chars() {
            if seen >= units {
                break;
            }
            seen += crlf_utf16_len(c);
            chars += 1;
        }
        self.cursor = chars;
    }

    /// The cursor as a caret offset in the CRLF, UTF-16 rendering of the text.
    pub fn cursor_crlf_utf16(&self) -> usize {
        self.text.chars().take(self.cursor).map(crlf_utf16_len).sum()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map_or(self.text.len(), |(i, _)| i)
    }
}

fn crlf_utf16_len(c: char) -> usize {
    if c == '\n' {
        2
    } else {
        c.len_utf16()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
