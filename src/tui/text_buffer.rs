//! Editable input buffer with a character-indexed cursor.
//!
//! The cursor is always a char index in `0..=char_count(text)`. Every public
//! mutation notifies the observer exactly once for text and once for cursor.

use crate::session::observer::SessionObserver;
use std::sync::Arc;

/// Input line text plus cursor position.
pub struct TextBuffer {
    text: String,
    cursor: usize,
    observer: Arc<dyn SessionObserver>,
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBuffer")
            .field("text", &self.text)
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl TextBuffer {
    pub fn new(observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            text: String::new(),
            cursor: 0,
            observer,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cursor position in chars.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn char_len(&self) -> usize {
        char_count(&self.text)
    }

    /// Insert a string at the cursor and move the cursor past it.
    pub fn insert_at_cursor(&mut self, s: &str) {
        let byte_idx = byte_index_at_char(&self.text, self.cursor);
        self.text.insert_str(byte_idx, s);
        self.cursor += char_count(s);
        self.notify();
    }

    /// Delete one char immediately before the cursor. No-op at position 0.
    ///
    /// Returns whether a character was removed.
    pub fn delete_before_cursor(&mut self) -> bool {
        let removed = if self.cursor > 0 {
            delete_char_range(&mut self.text, self.cursor - 1, self.cursor);
            self.cursor -= 1;
            true
        } else {
            false
        };
        self.notify();
        removed
    }

    /// Delete one char at the cursor (forward delete). No-op at the end.
    pub fn delete_at_cursor(&mut self) -> bool {
        let removed = if self.cursor < self.char_len() {
            delete_char_range(&mut self.text, self.cursor, self.cursor + 1);
            true
        } else {
            false
        };
        self.notify();
        removed
    }

    /// Emacs-style backward-kill-word.
    pub fn delete_word_before_cursor(&mut self) {
        let start = previous_word_start(&self.text, self.cursor);
        delete_char_range(&mut self.text, start, self.cursor);
        self.cursor = start;
        self.notify();
    }

    /// Emacs-style kill-to-end-of-line.
    pub fn kill_to_line_end(&mut self) {
        let end = line_end_char_index(&self.text, self.cursor);
        delete_char_range(&mut self.text, self.cursor, end);
        self.notify();
    }

    /// Emacs-style kill-to-start-of-line.
    pub fn kill_to_line_start(&mut self) {
        let start = line_start_char_index(&self.text, self.cursor);
        delete_char_range(&mut self.text, start, self.cursor);
        self.cursor = start;
        self.notify();
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
        self.notify();
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_len());
        self.notify();
    }

    pub fn move_start(&mut self) {
        self.cursor = 0;
        self.notify();
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_len();
        self.notify();
    }

    pub fn move_line_start(&mut self) {
        self.cursor = line_start_char_index(&self.text, self.cursor);
        self.notify();
    }

    pub fn move_line_end(&mut self) {
        self.cursor = line_end_char_index(&self.text, self.cursor);
        self.notify();
    }

    /// Place the cursor, clamped to `[0, len]`.
    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.char_len());
        self.notify();
    }

    /// Replace the whole buffer; cursor is clamped to the new length.
    pub fn set_text(&mut self, text: &str, cursor: usize) {
        self.text = text.to_string();
        self.cursor = cursor.min(char_count(&self.text));
        self.notify();
    }

    /// Replace the char range `start..end` and put the cursor after the
    /// inserted text.
    pub fn replace_range(&mut self, start: usize, end: usize, replacement: &str) {
        let len = self.char_len();
        let start = start.min(len);
        let end = end.clamp(start, len);
        let start_byte = byte_index_at_char(&self.text, start);
        let end_byte = byte_index_at_char(&self.text, end);
        self.text.replace_range(start_byte..end_byte, replacement);
        self.cursor = start + char_count(replacement);
        self.notify();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
        self.notify();
    }

    fn notify(&self) {
        self.observer.text_changed(&self.text);
        self.observer.cursor_changed(self.cursor);
    }
}

/// Delete a char range represented in char indices.
pub(crate) fn delete_char_range(buffer: &mut String, start_char: usize, end_char: usize) {
    if start_char >= end_char {
        return;
    }
    let start = byte_index_at_char(buffer, start_char);
    let end = byte_index_at_char(buffer, end_char);
    buffer.replace_range(start..end, "");
}

/// Return the char index where the previous word starts.
pub(crate) fn previous_word_start(buffer: &str, cursor: usize) -> usize {
    let chars: Vec<char> = buffer.chars().collect();
    let mut idx = cursor.min(chars.len());
    while idx > 0 && chars[idx - 1].is_whitespace() {
        idx -= 1;
    }
    while idx > 0 && !chars[idx - 1].is_whitespace() {
        idx -= 1;
    }
    idx
}

/// Return the char index for the start of the current line.
pub(crate) fn line_start_char_index(buffer: &str, cursor: usize) -> usize {
    let chars: Vec<char> = buffer.chars().collect();
    let mut idx = cursor.min(chars.len());
    while idx > 0 && chars[idx - 1] != '\n' {
        idx -= 1;
    }
    idx
}

/// Return the char index for the end of the current line.
pub(crate) fn line_end_char_index(buffer: &str, cursor: usize) -> usize {
    let chars: Vec<char> = buffer.chars().collect();
    let mut idx = cursor.min(chars.len());
    while idx < chars.len() && chars[idx] != '\n' {
        idx += 1;
    }
    idx
}

/// Convert a char index to a byte index, preserving UTF-8 boundaries.
pub(crate) fn byte_index_at_char(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}

/// Return total char count for a UTF-8 string.
pub(crate) fn char_count(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::RecordingObserver;

    fn buffer() -> (TextBuffer, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        (TextBuffer::new(observer.clone()), observer)
    }

    #[test]
    fn insert_and_delete_track_cursor() {
        let (mut buf, _) = buffer();
        buf.insert_at_cursor("hello");
        assert_eq!(buf.cursor(), 5);
        buf.move_left();
        buf.move_left();
        buf.insert_at_cursor("XY");
        assert_eq!(buf.text(), "helXYlo");
        assert_eq!(buf.cursor(), 5);
        assert!(buf.delete_before_cursor());
        assert_eq!(buf.text(), "helXlo");
        assert_eq!(buf.cursor(), 4);
    }

    #[test]
    fn delete_before_cursor_at_start_is_noop() {
        let (mut buf, _) = buffer();
        buf.insert_at_cursor("ab");
        buf.move_start();
        assert!(!buf.delete_before_cursor());
        assert_eq!(buf.text(), "ab");
        assert_eq!(buf.cursor(), 0);
    }

    #[test]
    fn moves_clamp_to_bounds() {
        let (mut buf, _) = buffer();
        buf.move_left();
        assert_eq!(buf.cursor(), 0);
        buf.insert_at_cursor("abc");
        buf.move_right();
        assert_eq!(buf.cursor(), 3);
        buf.set_cursor(99);
        assert_eq!(buf.cursor(), 3);
    }

    #[test]
    fn every_call_notifies_each_observer_once() {
        let (mut buf, observer) = buffer();
        buf.insert_at_cursor("abc");
        buf.move_left();
        buf.delete_before_cursor();
        buf.move_start();
        buf.delete_before_cursor();
        let counts = observer.counts();
        assert_eq!(counts.text_changed, 5);
        assert_eq!(counts.cursor_changed, 5);
    }

    #[test]
    fn utf8_text_is_edited_by_chars() {
        let (mut buf, _) = buffer();
        buf.insert_at_cursor("aéz");
        buf.move_left();
        buf.delete_before_cursor();
        assert_eq!(buf.text(), "az");
        assert_eq!(buf.cursor(), 1);
    }

    #[test]
    fn replace_range_places_cursor_after_replacement() {
        let (mut buf, _) = buffer();
        buf.insert_at_cursor("see @sr now");
        buf.replace_range(4, 7, "src/main.rs ");
        assert_eq!(buf.text(), "see src/main.rs  now");
        assert_eq!(buf.cursor(), 16);
    }

    #[test]
    fn kill_commands_follow_line_boundaries() {
        let (mut buf, _) = buffer();
        buf.insert_at_cursor("abc\ndef ghi");
        buf.delete_word_before_cursor();
        assert_eq!(buf.text(), "abc\ndef ");
        buf.kill_to_line_start();
        assert_eq!(buf.text(), "abc\n");
        assert_eq!(buf.cursor(), 4);
        buf.set_cursor(1);
        buf.kill_to_line_end();
        assert_eq!(buf.text(), "a\n");
    }

    #[test]
    fn line_boundaries_for_multiline_buffer() {
        let text = "abc\ndef";
        assert_eq!(line_start_char_index(text, 1), 0);
        assert_eq!(line_end_char_index(text, 1), 3);
        assert_eq!(line_start_char_index(text, 5), 4);
        assert_eq!(line_end_char_index(text, 5), 7);
    }

    #[test]
    fn byte_index_respects_utf8_boundaries() {
        let s = "aéz";
        assert_eq!(byte_index_at_char(s, 0), 0);
        assert_eq!(byte_index_at_char(s, 1), 1);
        assert_eq!(byte_index_at_char(s, 2), 3);
        assert_eq!(byte_index_at_char(s, 3), s.len());
    }

    #[cfg(feature = "fuzz-tests")]
    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Insert(String),
            Backspace,
            Delete,
            Left,
            Right,
            Start,
            End,
            Set(usize),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                proptest::string::string_regex("[a-zé@/ \n]{0,4}")
                    .expect("regex")
                    .prop_map(Op::Insert),
                Just(Op::Backspace),
                Just(Op::Delete),
                Just(Op::Left),
                Just(Op::Right),
                Just(Op::Start),
                Just(Op::End),
                (0usize..32).prop_map(Op::Set),
            ]
        }

        proptest! {
            #[test]
            fn cursor_stays_within_bounds(ops in proptest::collection::vec(op(), 0..64)) {
                let (mut buf, _) = buffer();
                for op in ops {
                    match op {
                        Op::Insert(s) => buf.insert_at_cursor(&s),
                        Op::Backspace => { buf.delete_before_cursor(); }
                        Op::Delete => { buf.delete_at_cursor(); }
                        Op::Left => buf.move_left(),
                        Op::Right => buf.move_right(),
                        Op::Start => buf.move_start(),
                        Op::End => buf.move_end(),
                        Op::Set(n) => buf.set_cursor(n),
                    }
                    prop_assert!(buf.cursor() <= buf.char_len());
                }
            }
        }
    }
}
