use crate::grid::GridLayout;
use crate::model::CellKey;

/// In-place editing over grid cells: one focused cell and at most one open edit.
#[derive(Debug, Default)]
pub struct CellEditor {
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
    edit: Option<OpenEdit>,
}

#[derive(Debug)]
struct OpenEdit {
    key: CellKey,
    buffer: EditBuffer,
}

/// A finished edit: the text to write into `key`.
#[derive(Debug, PartialEq, Eq)]
pub struct Commit {
    pub key: CellKey,
    pub text: String,
}

impl CellEditor {
    pub fn new(layout: &GridLayout) -> Self {
        let mut editor = CellEditor::default();
        editor.attach(layout);
        editor
    }

    /// Binds the editor to a freshly rendered grid. Any open edit belongs to
    /// cells that no longer exist and is discarded.
    pub fn attach(&mut self, layout: &GridLayout) {
        self.edit = None;
        self.rows = layout.intervals.len();
        self.cols = layout.days.len();
        self.row = self.row.min(self.rows.saturating_sub(1));
        self.col = self.col.min(self.cols.saturating_sub(1));
    }

    pub fn focus(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn focused_key(&self, layout: &GridLayout) -> Option<CellKey> {
        layout.key_at(self.row, self.col)
    }

    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }

    pub fn editing_key(&self) -> Option<&CellKey> {
        self.edit.as_ref().map(|e| &e.key)
    }

    pub fn buffer(&self) -> Option<&EditBuffer> {
        self.edit.as_ref().map(|e| &e.buffer)
    }

    pub fn buffer_mut(&mut self) -> Option<&mut EditBuffer> {
        self.edit.as_mut().map(|e| &mut e.buffer)
    }

    /// Moves focus by the given deltas, clamped to the grid. Ignored while editing.
    pub fn move_focus(&mut self, d_row: isize, d_col: isize) {
        if self.edit.is_some() || self.rows == 0 || self.cols == 0 {
            return;
        }
        self.row = (self.row as isize + d_row).clamp(0, self.rows as isize - 1) as usize;
        self.col = (self.col as isize + d_col).clamp(0, self.cols as isize - 1) as usize;
    }

    /// Focuses a cell directly. If another cell was being edited, it loses focus
    /// and its commit is returned.
    pub fn focus_cell(&mut self, row: usize, col: usize) -> Option<Commit> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let commit = if (row, col) != (self.row, self.col) {
            self.blur()
        } else {
            None
        };
        self.row = row;
        self.col = col;
        commit
    }

    /// Enters edit mode on the focused cell, seeded with its current text.
    pub fn activate(&mut self, layout: &GridLayout, current: &str) -> bool {
        if self.edit.is_some() {
            return false;
        }
        match self.focused_key(layout) {
            Some(key) => {
                self.edit = Some(OpenEdit {
                    key,
                    buffer: EditBuffer::new(current),
                });
                true
            }
            None => false,
        }
    }

    /// Leaves edit mode and hands back what was typed.
    pub fn blur(&mut self) -> Option<Commit> {
        self.edit.take().map(|e| Commit {
            key: e.key,
            text: e.buffer.value,
        })
    }
}

/// Multi-line text with a byte-offset caret.
#[derive(Debug, Clone)]
pub struct EditBuffer {
    value: String,
    cursor: usize,
}

impl EditBuffer {
    pub fn new(value: &str) -> Self {
        EditBuffer {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char(self.cursor, &self.value);
    }

    pub fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char(self.cursor, &self.value);
    }

    pub fn move_up(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx == 0 {
            return;
        }
        let target_start = line_starts[line_idx - 1];
        self.cursor = index_at_col(&self.value, target_start, col);
    }

    pub fn move_down(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx + 1 >= line_starts.len() {
            return;
        }
        let target_start = line_starts[line_idx + 1];
        self.cursor = index_at_col(&self.value, target_start, col);
    }

    pub fn home(&mut self) {
        let (line_starts, line_idx, _) = line_state(&self.value, self.cursor);
        self.cursor = line_starts[line_idx];
    }

    pub fn end(&mut self) {
        let (line_starts, line_idx, _) = line_state(&self.value, self.cursor);
        self.cursor = index_at_col(&self.value, line_starts[line_idx], usize::MAX);
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    pub fn delete(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        let next = next_char(self.cursor, &self.value);
        self.value.drain(self.cursor..next);
    }

    pub fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

fn prev_char(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    let line_idx = starts
        .iter()
        .rposition(|start| *start <= cursor)
        .unwrap_or(0);
    let col = text[starts[line_idx]..cursor].chars().count();
    (starts, line_idx, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let slice = &text[start..];
    let limit = slice.find('\n').unwrap_or(slice.len());
    slice[..limit]
        .char_indices()
        .nth(target_col)
        .map(|(idx, _)| start + idx)
        .unwrap_or(start + limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Interval;

    fn layout() -> GridLayout {
        GridLayout::new(
            vec!["Mon".into(), "Tue".into(), "Wed".into()],
            vec![
                Interval::new("08:00", "09:00"),
                Interval::new("09:00", "10:00"),
            ],
        )
    }

    #[test]
    fn focus_is_clamped_to_grid() {
        let mut editor = CellEditor::new(&layout());
        editor.move_focus(-1, -1);
        assert_eq!(editor.focus(), (0, 0));
        editor.move_focus(5, 5);
        assert_eq!(editor.focus(), (1, 2));
    }

    #[test]
    fn activate_then_blur_commits_typed_text() {
        let layout = layout();
        let mut editor = CellEditor::new(&layout);
        editor.move_focus(1, 1);
        assert!(editor.activate(&layout, "Math\n9A"));
        assert!(!editor.activate(&layout, "ignored"));
        let buffer = editor.buffer_mut().unwrap();
        buffer.backspace();
        buffer.insert_char('B');
        editor.move_focus(-1, 0);
        assert_eq!(editor.focus(), (1, 1));
        let commit = editor.blur().unwrap();
        assert_eq!(commit.key, CellKey::new("Tue", Interval::new("09:00", "10:00")));
        assert_eq!(commit.text, "Math\n9B");
        assert!(!editor.is_editing());
        assert_eq!(editor.blur(), None);
    }

    #[test]
    fn focusing_another_cell_blurs_the_edit() {
        let layout = layout();
        let mut editor = CellEditor::new(&layout);
        editor.activate(&layout, "Art");
        assert_eq!(editor.focus_cell(0, 0), None);
        assert!(editor.is_editing());
        let commit = editor.focus_cell(1, 2).unwrap();
        assert_eq!(commit.text, "Art");
        assert_eq!(editor.focus(), (1, 2));
        assert!(editor.focus_cell(9, 9).is_none());
    }

    #[test]
    fn attach_discards_open_edit() {
        let layout = layout();
        let mut editor = CellEditor::new(&layout);
        editor.move_focus(1, 2);
        editor.activate(&layout, "Art");
        let smaller = GridLayout::new(vec!["Mon".into()], vec![Interval::new("08:00", "09:00")]);
        editor.attach(&smaller);
        assert!(!editor.is_editing());
        assert_eq!(editor.focus(), (0, 0));
    }

    #[test]
    fn buffer_moves_between_lines() {
        let mut buffer = EditBuffer::new("Física\n9A");
        buffer.move_up();
        assert_eq!(buffer.with_caret(), "Fí▌sica\n9A");
        buffer.end();
        buffer.insert_char('!');
        buffer.move_down();
        buffer.insert_char('x');
        assert_eq!(buffer.value, "Física!\n9Ax");
        buffer.home();
        buffer.delete();
        assert_eq!(buffer.value, "Física!\nAx");
        buffer.move_left();
        buffer.backspace();
        assert_eq!(buffer.value, "Física\nAx");
    }
}
