//! Generic detail and form composers. Both are driven by a declarative
//! field-group description reusing the same accessor model as the column
//! specs, so a feature module declares its fields once.

use ratatui::crossterm::event::KeyEvent;

use crate::columns::{CellValue, ValueFn};
use crate::inputter::Inputter;

pub struct FieldSpec<T> {
    pub key: String,
    pub label: String,
    value_of: ValueFn<T>,
}

impl<T> FieldSpec<T> {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        value_of: impl Fn(&T) -> Option<CellValue> + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            value_of: Box::new(value_of),
        }
    }

    pub fn value(&self, record: &T) -> Option<CellValue> {
        (self.value_of)(record)
    }
}

pub struct FieldGroup<T> {
    pub title: String,
    pub fields: Vec<FieldSpec<T>>,
}

impl<T> FieldGroup<T> {
    pub fn new(title: impl Into<String>, fields: Vec<FieldSpec<T>>) -> Self {
        Self {
            title: title.into(),
            fields,
        }
    }

}

/// One rendered line of a detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailRow {
    GroupHeader(String),
    Field { label: String, value: String },
}

/// Read-only detail view over one record: flattens the field groups into
/// label/value rows plus a scroll cursor.
#[derive(Debug, Default)]
pub struct DetailComposer {
    pub cursor: usize,
}

impl DetailComposer {
    pub fn rows<T>(groups: &[FieldGroup<T>], record: &T) -> Vec<DetailRow> {
        let mut rows = Vec::new();
        for group in groups {
            rows.push(DetailRow::GroupHeader(group.title.clone()));
            for field in &group.fields {
                let value = field
                    .value(record)
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                rows.push(DetailRow::Field {
                    label: field.label.clone(),
                    value,
                });
            }
        }
        rows
    }

    pub fn move_down(&mut self, row_count: usize) {
        if row_count > 0 && self.cursor < row_count - 1 {
            self.cursor += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }
}

/// Create/edit form over the same field groups: one text buffer per field,
/// a focus cursor, and a single line editor bound to the focused field.
/// The composer only collects values; submitting them is the caller's job.
pub struct FormComposer {
    labels: Vec<String>,
    keys: Vec<String>,
    values: Vec<String>,
    pub focus: usize,
    editor: Inputter,
}

impl FormComposer {
    /// Build a form from field groups; when `record` is given the buffers
    /// are seeded from its current values (edit), otherwise empty (create).
    pub fn new<T>(groups: &[FieldGroup<T>], record: Option<&T>) -> Self {
        let mut labels = Vec::new();
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for group in groups {
            for field in &group.fields {
                labels.push(field.label.clone());
                keys.push(field.key.clone());
                values.push(
                    record
                        .and_then(|r| field.value(r))
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                );
            }
        }
        let mut editor = Inputter::default();
        if let Some(first) = values.first() {
            editor.seed(first);
        }
        Self {
            labels,
            keys,
            values,
            focus: 0,
            editor,
        }
    }

    pub fn field_count(&self) -> usize {
        self.values.len()
    }

    pub fn label(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    /// Current text of a field; `input` keeps the buffers in sync with the
    /// editor on every key press.
    pub fn buffer(&self, idx: usize) -> &str {
        self.values.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Feed a key press into the focused field.
    pub fn input(&mut self, key: KeyEvent) {
        let result = self.editor.read(key);
        if let Some(slot) = self.values.get_mut(self.focus) {
            if !result.canceled {
                *slot = result.input;
            }
        }
    }

    pub fn focus_next(&mut self) {
        if self.values.is_empty() {
            return;
        }
        self.focus = (self.focus + 1) % self.values.len();
        self.rebind_editor();
    }

    pub fn focus_prev(&mut self) {
        if self.values.is_empty() {
            return;
        }
        self.focus = (self.focus + self.values.len() - 1) % self.values.len();
        self.rebind_editor();
    }

    fn rebind_editor(&mut self) {
        let current = self.values.get(self.focus).cloned().unwrap_or_default();
        self.editor.seed(&current);
    }

    /// Snapshot of all field values, keyed by field key, for the caller to
    /// submit through its own data layer.
    pub fn values(&self) -> Vec<(String, String)> {
        self.keys
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }
}
