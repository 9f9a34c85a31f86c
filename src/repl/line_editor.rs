//! Line editor state (§4.7): the in-progress line, cursor, and undo/redo
//! stacks, plus the hand-rolled escape-sequence decoding that drives them.

/// A single decoded input event.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Insert(char),
    Backspace,
    MoveLeft,
    MoveRight,
    HistoryUp,
    HistoryDown,
    Tab,
    CtrlC,
    CtrlD,
    Undo,
    Redo,
    Submit,
    /// A byte sequence that doesn't map to a handled event; ignored.
    Unhandled,
}

/// Decode one logical event from raw input bytes, per §4.7's escape table.
/// `bytes` should be the bytes read since the last decode call; a decoded
/// event consumes a prefix of `bytes` and the caller advances by the
/// returned length.
pub fn decode(bytes: &[u8]) -> (EditorEvent, usize) {
    match bytes.first() {
        None => (EditorEvent::Unhandled, 0),
        Some(0x7F) => (EditorEvent::Backspace, 1),
        Some(0x03) => (EditorEvent::CtrlC, 1),
        Some(0x04) => (EditorEvent::CtrlD, 1),
        Some(0x1A) => (EditorEvent::Undo, 1),
        Some(0x19) => (EditorEvent::Redo, 1),
        Some(b'\t') => (EditorEvent::Tab, 1),
        Some(b'\r') | Some(b'\n') => (EditorEvent::Submit, 1),
        Some(0x1B) => decode_escape(bytes),
        Some(&b) if b >= 0x20 => {
            // Decode one UTF-8 scalar value starting at `bytes[0]`.
            let width = utf8_width(b);
            match std::str::from_utf8(&bytes[..width.min(bytes.len())]) {
                Ok(s) => match s.chars().next() {
                    Some(c) => (EditorEvent::Insert(c), width),
                    None => (EditorEvent::Unhandled, 1),
                },
                Err(_) => (EditorEvent::Unhandled, 1),
            }
        }
        Some(_) => (EditorEvent::Unhandled, 1),
    }
}

fn utf8_width(lead_byte: u8) -> usize {
    if lead_byte & 0x80 == 0 {
        1
    } else if lead_byte & 0xE0 == 0xC0 {
        2
    } else if lead_byte & 0xF0 == 0xE0 {
        3
    } else if lead_byte & 0xF8 == 0xF0 {
        4
    } else {
        1
    }
}

fn decode_escape(bytes: &[u8]) -> (EditorEvent, usize) {
    match (bytes.get(1), bytes.get(2)) {
        (Some(b'['), Some(b'D')) => (EditorEvent::MoveLeft, 3),
        (Some(b'['), Some(b'C')) => (EditorEvent::MoveRight, 3),
        (Some(b'['), Some(b'A')) => (EditorEvent::HistoryUp, 3),
        (Some(b'['), Some(b'B')) => (EditorEvent::HistoryDown, 3),
        _ => (EditorEvent::Unhandled, 1),
    }
}

/// The mutable editing surface for one logical line.
#[derive(Debug, Default, Clone)]
pub struct LineEditor {
    current_line: String,
    cursor_pos: usize,
    undo_stack: Vec<String>,
    redo_stack: Vec<String>,
    /// Saved live line while navigating history; `None` when not navigating.
    temp_line: Option<String>,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&self) -> &str {
        &self.current_line
    }

    pub fn cursor(&self) -> usize {
        self.cursor_pos
    }

    fn snapshot(&mut self) {
        self.undo_stack.push(self.current_line.clone());
        self.redo_stack.clear();
    }

    pub fn insert(&mut self, c: char) {
        self.snapshot();
        let byte_idx = self.byte_index(self.cursor_pos);
        self.current_line.insert(byte_idx, c);
        self.cursor_pos += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor_pos == 0 {
            return;
        }
        self.snapshot();
        let start = self.byte_index(self.cursor_pos - 1);
        let end = self.byte_index(self.cursor_pos);
        self.current_line.replace_range(start..end, "");
        self.cursor_pos -= 1;
    }

    pub fn move_left(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor_pos < self.current_line.chars().count() {
            self.cursor_pos += 1;
        }
    }

    pub fn undo(&mut self) {
        if let Some(prev) = self.undo_stack.pop() {
            self.redo_stack.push(self.current_line.clone());
            self.cursor_pos = prev.chars().count();
            self.current_line = prev;
        }
    }

    pub fn redo(&mut self) {
        if let Some(next) = self.redo_stack.pop() {
            self.undo_stack.push(self.current_line.clone());
            self.cursor_pos = next.chars().count();
            self.current_line = next;
        }
    }

    /// Replace the line wholesale (used by history navigation and completion).
    pub fn set_line(&mut self, line: impl Into<String>) {
        self.snapshot();
        self.current_line = line.into();
        self.cursor_pos = self.current_line.chars().count();
    }

    /// Clear the line without recording an undo step (used after submit).
    pub fn reset(&mut self) {
        self.current_line.clear();
        self.cursor_pos = 0;
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.current_line.char_indices().nth(char_idx).map(|(i, _)| i).unwrap_or(self.current_line.len())
    }

    /// Save the live line and return it, marking history navigation active.
    pub fn begin_history_navigation(&mut self) -> String {
        if self.temp_line.is_none() {
            self.temp_line = Some(self.current_line.clone());
        }
        self.current_line.clone()
    }

    /// The line saved when history navigation began, if any is active.
    pub fn temp_line(&self) -> Option<&str> {
        self.temp_line.as_deref()
    }

    /// Exit history navigation, restoring the saved live line.
    pub fn end_history_navigation(&mut self) {
        if let Some(saved) = self.temp_line.take() {
            self.current_line = saved;
            self.cursor_pos = self.current_line.chars().count();
        }
    }
}

/// Extract the whitespace-delimited word ending at `cursor` within `line`,
/// along with its starting byte offset.
pub fn current_word(line: &str, cursor_chars: usize) -> (usize, &str) {
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let end_byte = chars.get(cursor_chars).map(|(i, _)| *i).unwrap_or(line.len());
    let prefix = &line[..end_byte];
    let start_byte = prefix.rfind(char::is_whitespace).map(|i| i + 1).unwrap_or(0);
    (start_byte, &line[start_byte..end_byte])
}
