use std::path::Path;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error("preference entry is not valid json: {0}")]
    Preference(#[from] serde_json::Error),
    #[error("unknown file type")]
    UnknownFileType,
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("loading failed: {0}")]
    LoadingFailed(String),
}

/// Engine configuration. Callers tune it with the generated `with_*`
/// setters: `ListConfig::default().with_page_size(25)`.
#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct ListConfig {
    /// Rows per page.
    pub page_size: usize,
    /// Below this terminal width the card strategy replaces the table.
    pub card_width_threshold: u16,
    /// Event poll interval in milliseconds.
    pub event_poll_time: u64,
    /// Hard cap on rendered cell width.
    pub max_column_width: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            card_width_threshold: 72,
            event_poll_time: 100,
            max_column_width: 48,
        }
    }
}

/// Everything a key press or resize can ask of the list model. The
/// controller maps raw terminal events onto these; the model interprets
/// them per interaction mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveBeginning,
    MoveEnd,
    NextColumn,
    PrevColumn,
    ToggleSelect,
    SelectPage,
    ClearSelection,
    Enter,
    Exit,
    Search,
    OpenFilterMenu,
    ClearFilters,
    OpenColumnMenu,
    SortColumn,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    JumpToPage,
    Refresh,
    AddNew,
    Export,
    Import,
    BulkActions,
    Help,
    Resize(u16, u16),
    RawKey(KeyEvent),
}

/// Caller-supplied callbacks. The engine performs no network I/O, file
/// parsing or navigation itself; every hook is delegated verbatim and
/// every hook is optional.
#[derive(Default)]
pub struct ListHooks<T> {
    pub on_refresh: Option<Box<dyn FnMut()>>,
    pub on_add_new: Option<Box<dyn FnMut()>>,
    pub on_row_click: Option<Box<dyn FnMut(&T)>>,
    pub on_export: Option<Box<dyn FnMut(&[&T])>>,
    pub on_import: Option<Box<dyn FnMut(&Path)>>,
}

impl<T> ListHooks<T> {
    pub fn new() -> Self {
        Self {
            on_refresh: None,
            on_add_new: None,
            on_row_click: None,
            on_export: None,
            on_import: None,
        }
    }

    pub fn refresh(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_refresh = Some(Box::new(f));
        self
    }

    pub fn add_new(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_add_new = Some(Box::new(f));
        self
    }

    pub fn row_click(mut self, f: impl FnMut(&T) + 'static) -> Self {
        self.on_row_click = Some(Box::new(f));
        self
    }

    pub fn export(mut self, f: impl FnMut(&[&T]) + 'static) -> Self {
        self.on_export = Some(Box::new(f));
        self
    }

    pub fn import(mut self, f: impl FnMut(&Path) + 'static) -> Self {
        self.on_import = Some(Box::new(f));
        self
    }
}

pub const HELP_TEXT: &str = "\
 listgrid keys

   j/k, Up/Down     move cursor
   h/l, Left/Right  move sort column
   g / G            first / last page
   ] / [            next / previous page
   :                jump to page
   /                keyword search (Enter apply, Esc cancel)
   f                quick filter menu (Space toggle option)
   F                clear all quick filters
   c                column visibility menu
   s                sort by cursor column (cycles asc/desc/off)
   Space            select row
   a                select whole page
   u                clear selection
   b                bulk actions (Enter run, destructive asks)
   Enter            open record detail
   +                new record form
   e                export visible or selected rows
   i                import from a path
   r                refresh
   ?                this help
   q                quit
";
