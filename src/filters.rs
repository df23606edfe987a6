use std::collections::BTreeMap;

use crate::columns::{CellValue, ColumnSpec, ValueFn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Select,
    Boolean,
    Text,
    Date,
}

#[derive(Debug, Clone)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

impl FilterOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Current constraint of one quick filter: a scalar or an any-of list.
/// An absent map entry or an empty list means "no constraint".
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    One(String),
    Many(Vec<String>),
}

impl FilterValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::One(v) => v.is_empty(),
            FilterValue::Many(vs) => vs.is_empty(),
        }
    }

    pub fn candidates(&self) -> &[String] {
        match self {
            FilterValue::One(v) => std::slice::from_ref(v),
            FilterValue::Many(vs) => vs.as_slice(),
        }
    }

    /// Add or remove a candidate, the multi-select toggle semantics of the
    /// filter popover. Returns the updated constraint, `None` when the last
    /// candidate was removed.
    pub fn toggled(self, candidate: &str) -> Option<FilterValue> {
        let mut values = match self {
            FilterValue::One(v) => vec![v],
            FilterValue::Many(vs) => vs,
        };
        match values.iter().position(|v| v == candidate) {
            Some(pos) => {
                values.remove(pos);
            }
            None => values.push(candidate.to_string()),
        }
        if values.is_empty() {
            None
        } else {
            Some(FilterValue::Many(values))
        }
    }
}

/// Quick filter key -> current constraint. BTreeMap keeps evaluation order
/// deterministic.
pub type FilterValues = BTreeMap<String, FilterValue>;

/// A named, user-toggleable constraint over one record field. The key
/// addresses a record field through its own accessor and does not have to
/// correspond to a column.
pub struct QuickFilterSpec<T> {
    pub key: String,
    pub label: String,
    pub kind: FilterKind,
    pub options: Vec<FilterOption>,
    pub multi_select: bool,
    value_of: ValueFn<T>,
}

impl<T> QuickFilterSpec<T> {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        kind: FilterKind,
        value_of: impl Fn(&T) -> Option<CellValue> + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            options: Vec::new(),
            multi_select: false,
            value_of: Box::new(value_of),
        }
    }

    pub fn options(mut self, options: Vec<FilterOption>) -> Self {
        self.options = options;
        self
    }

    pub fn multi(mut self) -> Self {
        self.multi_select = true;
        self
    }

    pub fn value(&self, record: &T) -> Option<CellValue> {
        (self.value_of)(record)
    }
}

/// True when `keyword` is empty, or any column's derived value contains the
/// lower-cased keyword as a substring. Columns without a resolvable value
/// are skipped.
pub fn matches_keyword<T>(record: &T, keyword: &str, columns: &[ColumnSpec<T>]) -> bool {
    if keyword.is_empty() {
        return true;
    }
    let needle = keyword.to_lowercase();
    columns
        .iter()
        .filter_map(|column| column.value(record))
        .any(|value| value.matchable().contains(&needle))
}

/// A record passes iff it passes every non-empty constraint (AND across
/// filters, OR within one multi-select constraint). A constraint whose
/// filter key is unknown, or whose field does not resolve on the record,
/// fails that dimension without panicking.
pub fn matches_quick_filters<T>(
    record: &T,
    values: &FilterValues,
    filters: &[QuickFilterSpec<T>],
) -> bool {
    values
        .iter()
        .filter(|(_, constraint)| !constraint.is_empty())
        .all(|(key, constraint)| match find_filter(filters, key) {
            Some(filter) => matches_constraint(filter, record, constraint),
            None => false,
        })
}

/// What-if predicate behind the live option counts: would the record pass
/// if `candidate` were the only active constraint of `filter`?
pub fn matches_single<T>(filter: &QuickFilterSpec<T>, record: &T, candidate: &str) -> bool {
    matches_constraint(filter, record, &FilterValue::One(candidate.to_string()))
}

fn find_filter<'a, T>(
    filters: &'a [QuickFilterSpec<T>],
    key: &str,
) -> Option<&'a QuickFilterSpec<T>> {
    filters.iter().find(|f| f.key == key)
}

fn matches_constraint<T>(
    filter: &QuickFilterSpec<T>,
    record: &T,
    constraint: &FilterValue,
) -> bool {
    let Some(value) = filter.value(record) else {
        return false;
    };
    constraint
        .candidates()
        .iter()
        .any(|candidate| value_equals(filter.kind, &value, candidate))
}

fn value_equals(kind: FilterKind, value: &CellValue, candidate: &str) -> bool {
    if kind == FilterKind::Boolean {
        return match (value.as_bool(), CellValue::text(candidate).as_bool()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
    }
    value.matchable() == candidate.to_lowercase()
}
