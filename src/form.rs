//! Goal form state and input handling.

use crossterm::event::{KeyCode, KeyModifiers};

use crate::exchange::{DetailLevel, Tone};

/// Which field is focused in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Goal,
    Tone,
    Detail,
    GenerateButton,
}

impl FormField {
    pub fn next(self) -> Self {
        match self {
            Self::Goal => Self::Tone,
            Self::Tone => Self::Detail,
            Self::Detail => Self::GenerateButton,
            Self::GenerateButton => Self::Goal,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Goal => Self::GenerateButton,
            Self::Tone => Self::Goal,
            Self::Detail => Self::Tone,
            Self::GenerateButton => Self::Detail,
        }
    }
}

/// What the caller should do after a key was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    /// Key consumed (or ignored) by the form.
    None,
    /// User asked to generate.
    Submit,
    /// Key not meant for the form; the caller may handle it.
    Unhandled,
}

/// State for the goal form.
#[derive(Debug, Clone)]
pub struct GoalForm {
    pub focus: FormField,
    pub goal: String,
    /// Cursor position in characters (not bytes) within `goal`.
    pub cursor_pos: usize,
    pub tone: Tone,
    pub detail: DetailLevel,
}

impl GoalForm {
    pub fn new(tone: Tone, detail: DetailLevel) -> Self {
        Self {
            focus: FormField::Goal,
            goal: String::new(),
            cursor_pos: 0,
            tone,
            detail,
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    fn char_count(&self) -> usize {
        self.goal.chars().count()
    }

    /// Byte offset of the given character position.
    fn byte_index(&self, char_pos: usize) -> usize {
        self.goal
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.goal.len())
    }

    /// Insert a character at the current cursor position.
    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor_pos);
        self.goal.insert(at, c);
        self.cursor_pos += 1;
    }

    /// Delete the character before the cursor (backspace).
    pub fn delete_char_before(&mut self) {
        if self.cursor_pos == 0 {
            return;
        }
        let at = self.byte_index(self.cursor_pos - 1);
        self.goal.remove(at);
        self.cursor_pos -= 1;
    }

    /// Delete the character at the cursor position (delete key).
    pub fn delete_char_at(&mut self) {
        if self.cursor_pos < self.char_count() {
            let at = self.byte_index(self.cursor_pos);
            self.goal.remove(at);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.cursor_pos < self.char_count() {
            self.cursor_pos += 1;
        }
    }

    pub fn cursor_home(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor_pos = self.char_count();
    }

    /// Remove the whole goal text.
    pub fn clear_goal(&mut self) {
        self.goal.clear();
        self.cursor_pos = 0;
    }

    /// Goal text split around the cursor: (before, after).
    pub fn split_at_cursor(&self) -> (&str, &str) {
        self.goal.split_at(self.byte_index(self.cursor_pos))
    }
}

/// Route a key press to the form.
///
/// Ctrl-G submits from any field; Enter submits from the goal field and the
/// button; Alt-Enter inserts a line break into the goal.
pub fn handle_form_input(form: &mut GoalForm, key_code: KeyCode, modifiers: KeyModifiers) -> FormAction {
    if key_code == KeyCode::Char('g') && modifiers.contains(KeyModifiers::CONTROL) {
        return FormAction::Submit;
    }

    match key_code {
        KeyCode::Tab => {
            form.focus_next();
            return FormAction::None;
        }
        KeyCode::BackTab => {
            form.focus_prev();
            return FormAction::None;
        }
        _ => {}
    }

    match form.focus {
        FormField::Goal => match key_code {
            KeyCode::Enter if modifiers.contains(KeyModifiers::ALT) => {
                form.insert_char('\n');
                FormAction::None
            }
            KeyCode::Enter => FormAction::Submit,
            KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => {
                form.clear_goal();
                FormAction::None
            }
            KeyCode::Char(_) if modifiers.contains(KeyModifiers::CONTROL) => {
                FormAction::Unhandled
            }
            KeyCode::Char(c) => {
                form.insert_char(c);
                FormAction::None
            }
            KeyCode::Backspace => {
                form.delete_char_before();
                FormAction::None
            }
            KeyCode::Delete => {
                form.delete_char_at();
                FormAction::None
            }
            KeyCode::Left => {
                form.cursor_left();
                FormAction::None
            }
            KeyCode::Right => {
                form.cursor_right();
                FormAction::None
            }
            KeyCode::Home => {
                form.cursor_home();
                FormAction::None
            }
            KeyCode::End => {
                form.cursor_end();
                FormAction::None
            }
            _ => FormAction::Unhandled,
        },
        FormField::Tone => match key_code {
            KeyCode::Left | KeyCode::Char('h') => {
                form.tone = form.tone.prev();
                FormAction::None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                form.tone = form.tone.next();
                FormAction::None
            }
            KeyCode::Enter => FormAction::Submit,
            _ => FormAction::Unhandled,
        },
        FormField::Detail => match key_code {
            KeyCode::Left | KeyCode::Char('h') => {
                form.detail = form.detail.prev();
                FormAction::None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                form.detail = form.detail.next();
                FormAction::None
            }
            KeyCode::Enter => FormAction::Submit,
            _ => FormAction::Unhandled,
        },
        FormField::GenerateButton => match key_code {
            KeyCode::Enter | KeyCode::Char(' ') => FormAction::Submit,
            _ => FormAction::Unhandled,
        },
    }
}
