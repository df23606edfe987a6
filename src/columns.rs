use std::cmp::Ordering;
use std::fmt;

/// A single cell value derived from a record by a column accessor.
///
/// Records are an open, caller-defined type; the engine only ever sees
/// values through `ColumnSpec::value`. Text is matched case-insensitively,
/// numbers order numerically and booleans compare by normalized equality
/// (`"true"`/`"1"` equals `true`).
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Lower-cased string form used for keyword and equality matching.
    pub fn matchable(&self) -> String {
        match self {
            CellValue::Text(s) => s.to_lowercase(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
        }
    }

    /// Normalized boolean form, so a textual "true" and a native boolean
    /// compare equal in boolean quick filters.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            CellValue::Number(n) => match n {
                n if *n == 0.0 => Some(false),
                n if *n == 1.0 => Some(true),
                _ => None,
            },
            CellValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse().ok(),
            CellValue::Bool(_) => None,
        }
    }

    /// Ordering used by the sort pipeline. Numeric values order numerically
    /// and come before non-numeric text; everything else compares as
    /// lower-cased strings. Absent values are handled by the caller and
    /// always sort to the end.
    pub fn compare(&self, other: &CellValue) -> Ordering {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.matchable().cmp(&other.matchable()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

pub type ValueFn<T> = Box<dyn Fn(&T) -> Option<CellValue>>;
pub type RenderFn<T> = Box<dyn Fn(&CellValue, &T) -> String>;

/// Declarative column description for one list screen.
///
/// Identity is `key`, unique within a view. Declared once per feature
/// module and immutable at runtime; all record access goes through the
/// `value_of` accessor so the engine stays agnostic of the record shape.
pub struct ColumnSpec<T> {
    pub key: String,
    pub label: String,
    value_of: ValueFn<T>,
    render: Option<RenderFn<T>>,
    pub sortable: bool,
    pub default_visible: bool,
    pub width: u16,
    pub align: Align,
}

impl<T> ColumnSpec<T> {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        value_of: impl Fn(&T) -> Option<CellValue> + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            value_of: Box::new(value_of),
            render: None,
            sortable: true,
            default_visible: true,
            width: 16,
            align: Align::Left,
        }
    }

    pub fn width(mut self, width: u16) -> Self {
        self.width = width;
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    /// Hide the column by default; it can still be switched on through the
    /// column visibility menu.
    pub fn hidden(mut self) -> Self {
        self.default_visible = false;
        self
    }

    /// Override the display form without changing the matchable value.
    pub fn render_with(mut self, render: impl Fn(&CellValue, &T) -> String + 'static) -> Self {
        self.render = Some(Box::new(render));
        self
    }

    /// Derive the cell value for a record. `None` means the record has no
    /// resolvable value for this column; predicates skip it and sorting
    /// pushes it to the end.
    pub fn value(&self, record: &T) -> Option<CellValue> {
        (self.value_of)(record)
    }

    /// Display form of the cell, going through the render override when set.
    pub fn display(&self, record: &T) -> String {
        match self.value(record) {
            Some(value) => match &self.render {
                Some(render) => render(&value, record),
                None => value.to_string(),
            },
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_normalization_accepts_textual_forms() {
        assert_eq!(CellValue::text("True").as_bool(), Some(true));
        assert_eq!(CellValue::text(" 0 ").as_bool(), Some(false));
        assert_eq!(CellValue::Bool(true).as_bool(), Some(true));
        assert_eq!(CellValue::Number(1.0).as_bool(), Some(true));
        assert_eq!(CellValue::text("maybe").as_bool(), None);
    }

    #[test]
    fn numbers_order_numerically_before_text() {
        let two = CellValue::text("2");
        let ten = CellValue::Number(10.0);
        let word = CellValue::text("apple");
        assert_eq!(two.compare(&ten), Ordering::Less);
        assert_eq!(ten.compare(&word), Ordering::Less);
        assert_eq!(word.compare(&CellValue::text("Banana")), Ordering::Less);
    }

    #[test]
    fn display_uses_render_override() {
        let col: ColumnSpec<i64> = ColumnSpec::new("cents", "Amount", |v| {
            Some(CellValue::Number(*v as f64))
        })
        .render_with(|value, _| format!("{:.2} EUR", value.matchable().parse::<f64>().unwrap() / 100.0));
        assert_eq!(col.display(&1250), "12.50 EUR");
    }

    #[test]
    fn missing_value_displays_empty() {
        let col: ColumnSpec<i64> = ColumnSpec::new("never", "Never", |_| None);
        assert_eq!(col.display(&1), "");
    }
}
