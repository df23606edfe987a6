//! Generic tabular list/grid engine.
//!
//! Feature screens hand the engine an in-memory record set plus declarative
//! column, quick-filter and field-group descriptions; the engine owns
//! keyword search, quick filtering, sorting, pagination, row selection,
//! bulk actions and per-view column visibility, and renders the result as
//! a dense table or a card list depending on terminal width. All data
//! access, navigation and persistence of the records themselves stay with
//! the caller, wired in through [`domain::ListHooks`].

pub mod columns;
pub mod compose;
pub mod controller;
pub mod domain;
pub mod filters;
pub mod inputter;
pub mod model;
pub mod paging;
pub mod toolbar;
pub mod ui;
pub mod visibility;

pub use columns::{Align, CellValue, ColumnSpec};
pub use compose::{DetailComposer, DetailRow, FieldGroup, FieldSpec, FormComposer};
pub use controller::Controller;
pub use domain::{HELP_TEXT, ListConfig, ListError, ListHooks, Message};
pub use filters::{FilterKind, FilterOption, FilterValue, FilterValues, QuickFilterSpec};
pub use model::{ListModel, Mode, SortDirection, SortState, Status};
pub use paging::{PageRange, normalize_page, page_count, page_range};
pub use toolbar::{BulkAction, BulkActionBar, BulkOutcome, ColumnMenu, FilterMenu, Pager};
pub use ui::{ListUI, Strategy};
pub use visibility::{ColumnVisibility, JsonFileStore, MemoryStore, PreferenceStore};
