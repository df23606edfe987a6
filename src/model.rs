use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::{Duration, Instant};

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use tracing::{info, trace};

use crate::columns::ColumnSpec;
use crate::compose::{DetailComposer, DetailRow, FieldGroup, FormComposer};
use crate::domain::{ListConfig, ListHooks, Message};
use crate::filters::{
    FilterOption, FilterValue, FilterValues, QuickFilterSpec, matches_keyword,
    matches_quick_filters, matches_single,
};
use crate::inputter::{InputResult, Inputter};
use crate::paging::{PageRange, clamp_page, page_count, page_range, slice_bounds};
use crate::toolbar::{BulkAction, BulkActionBar, BulkOutcome, ColumnMenu, FilterMenu, Pager};
use crate::visibility::{ColumnVisibility, PreferenceStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Quitting,
}

/// Interaction mode; `update` dispatches messages against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    SearchInput,
    PageInput,
    PathInput,
    FilterMenu,
    ColumnMenu,
    BulkBar,
    ConfirmAction,
    Detail,
    Form,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Current sort dimension. The header indicator cycles
/// unsorted -> ascending -> descending -> unsorted; records whose accessor
/// yields no value sort to the end under both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub key: String,
    pub direction: SortDirection,
}

/// The list state controller: single source of truth for what is currently
/// visible and selected.
///
/// The derived pipeline is strictly ordered and recomputed synchronously on
/// every relevant change: keyword filter over the raw records, then quick
/// filters, then a stable sort. Row selection is a set of positions into
/// the filtered set; positions no longer backed by a row are dropped on
/// every recomputation, and the page index is re-validated rather than
/// preserved blindly.
pub struct ListModel<T> {
    config: ListConfig,
    columns: Vec<ColumnSpec<T>>,
    filters: Vec<QuickFilterSpec<T>>,
    field_groups: Vec<FieldGroup<T>>,
    hooks: ListHooks<T>,

    records: Vec<T>,
    keyword: String,
    filter_values: FilterValues,
    sort: Option<SortState>,
    selection: BTreeSet<usize>,
    page: usize,
    page_size: usize,

    // Derived; indices into `records`.
    after_search: Vec<usize>,
    visible: Vec<usize>,

    visibility: ColumnVisibility,

    pub status: Status,
    mode: Mode,
    prev_mode: Mode,
    cursor: usize,
    cursor_col: usize,

    input: Inputter,
    last_input: InputResult,
    filter_menu: FilterMenu,
    column_menu: ColumnMenu,
    bulk: BulkActionBar<T>,
    pager: Pager,
    detail: DetailComposer,
    form: Option<FormComposer>,

    status_message: String,
    last_status_update: Instant,
}

impl<T> ListModel<T> {
    pub fn new(
        config: ListConfig,
        columns: Vec<ColumnSpec<T>>,
        filters: Vec<QuickFilterSpec<T>>,
        store: Box<dyn PreferenceStore>,
        view_name: impl Into<String>,
    ) -> Self {
        let visibility = ColumnVisibility::load(store, view_name, &columns);
        let page_size = config.page_size;
        let mut model = Self {
            config,
            columns,
            filters,
            field_groups: Vec::new(),
            hooks: ListHooks::new(),
            records: Vec::new(),
            keyword: String::new(),
            filter_values: FilterValues::new(),
            sort: None,
            selection: BTreeSet::new(),
            page: 0,
            page_size,
            after_search: Vec::new(),
            visible: Vec::new(),
            visibility,
            status: Status::Ready,
            mode: Mode::Browse,
            prev_mode: Mode::Browse,
            cursor: 0,
            cursor_col: 0,
            input: Inputter::default(),
            last_input: InputResult::default(),
            filter_menu: FilterMenu::default(),
            column_menu: ColumnMenu::default(),
            bulk: BulkActionBar::default(),
            pager: Pager::default(),
            detail: DetailComposer::default(),
            form: None,
            status_message: String::new(),
            last_status_update: Instant::now(),
        };
        model.recompute();
        model
    }

    pub fn hooks(mut self, hooks: ListHooks<T>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn bulk_actions(mut self, actions: Vec<BulkAction<T>>) -> Self {
        self.bulk = BulkActionBar::new(actions);
        self
    }

    pub fn field_groups(mut self, groups: Vec<FieldGroup<T>>) -> Self {
        self.field_groups = groups;
        self
    }

    /// Supply a new raw record set. The records stay owned here but are
    /// treated as read-only; the whole derived pipeline reruns.
    pub fn set_records(&mut self, records: Vec<T>) {
        self.records = records;
        self.recompute();
    }

    // ------------------------- derived accessors -------------------------

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn columns(&self) -> &[ColumnSpec<T>] {
        &self.columns
    }

    pub fn filters(&self) -> &[QuickFilterSpec<T>] {
        &self.filters
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn filter_values(&self) -> &FilterValues {
        &self.filter_values
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn cursor_col(&self) -> usize {
        self.cursor_col
    }

    pub fn after_search_len(&self) -> usize {
        self.after_search.len()
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn visibility(&self) -> &ColumnVisibility {
        &self.visibility
    }

    pub fn filter_menu(&self) -> &FilterMenu {
        &self.filter_menu
    }

    pub fn column_menu(&self) -> &ColumnMenu {
        &self.column_menu
    }

    pub fn bulk_bar(&self) -> &BulkActionBar<T> {
        &self.bulk
    }

    pub fn form(&self) -> Option<&FormComposer> {
        self.form.as_ref()
    }

    pub fn detail_cursor(&self) -> usize {
        self.detail.cursor
    }

    pub fn last_input(&self) -> &InputResult {
        &self.last_input
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Age of the current status message; the UI drops stale ones.
    pub fn status_age(&self) -> Duration {
        self.last_status_update.elapsed()
    }

    /// Columns currently switched on for this view.
    pub fn shown_columns(&self) -> Vec<&ColumnSpec<T>> {
        self.columns
            .iter()
            .filter(|c| self.visibility.is_visible(&c.key))
            .collect()
    }

    pub fn visible_records(&self) -> Vec<&T> {
        self.visible.iter().map(|&i| &self.records[i]).collect()
    }

    /// The current page slice of the visible set, in render order.
    pub fn page_records(&self) -> Vec<&T> {
        let (start, end) = slice_bounds(self.page, self.page_size, self.visible.len());
        self.visible[start..end]
            .iter()
            .map(|&i| &self.records[i])
            .collect()
    }

    pub fn page_count(&self) -> usize {
        page_count(self.visible.len(), self.page_size)
    }

    pub fn page_range(&self) -> PageRange {
        page_range(self.page, self.page_size, self.visible.len())
    }

    pub fn selection_count(&self) -> usize {
        self.selection.len()
    }

    /// The selected records, materialized against the current visible set.
    pub fn selected_records(&self) -> Vec<&T> {
        self.selected_indices()
            .into_iter()
            .map(|i| &self.records[i])
            .collect()
    }

    fn selected_indices(&self) -> Vec<usize> {
        self.selection
            .iter()
            .filter_map(|&pos| self.visible.get(pos).copied())
            .collect()
    }

    pub fn is_position_selected(&self, position: usize) -> bool {
        self.selection.contains(&position)
    }

    /// Position within `visible` of the cursor row.
    pub fn cursor_position(&self) -> usize {
        self.page * self.page_size + self.cursor
    }

    pub fn current_record(&self) -> Option<&T> {
        self.visible
            .get(self.cursor_position())
            .map(|&i| &self.records[i])
    }

    pub fn active_filter_count(&self) -> usize {
        self.filter_values
            .values()
            .filter(|v| !v.is_empty())
            .count()
    }

    /// Live per-option count: how many records of the keyword-filtered set
    /// would match if `option_value` were the only active constraint of
    /// `filter_key`. A what-if evaluation, never a mutation of the real
    /// filter state.
    pub fn option_count(&self, filter_key: &str, option_value: &str) -> usize {
        let Some(filter) = self.filters.iter().find(|f| f.key == filter_key) else {
            return 0;
        };
        self.after_search
            .iter()
            .filter(|&&i| matches_single(filter, &self.records[i], option_value))
            .count()
    }

    /// Options offered by the filter popover. Boolean filters without
    /// declared options get a synthesized yes/no pair.
    pub fn options_for(&self, filter_idx: usize) -> Vec<FilterOption> {
        let Some(filter) = self.filters.get(filter_idx) else {
            return Vec::new();
        };
        if !filter.options.is_empty() {
            return filter.options.clone();
        }
        if filter.kind == crate::filters::FilterKind::Boolean {
            return vec![
                FilterOption::new("true", "yes"),
                FilterOption::new("false", "no"),
            ];
        }
        Vec::new()
    }

    /// Detail rows for the cursor record: declared field groups when the
    /// feature module provided them, otherwise one row per column.
    pub fn detail_rows(&self) -> Vec<DetailRow> {
        let Some(record) = self.current_record() else {
            return Vec::new();
        };
        if !self.field_groups.is_empty() {
            return DetailComposer::rows(&self.field_groups, record);
        }
        let mut rows = vec![DetailRow::GroupHeader("Details".into())];
        rows.extend(self.columns.iter().map(|c| DetailRow::Field {
            label: c.label.clone(),
            value: c.display(record),
        }));
        rows
    }

    /// True while a mode wants raw key events instead of mapped messages.
    pub fn raw_keyevents(&self) -> bool {
        matches!(
            self.mode,
            Mode::SearchInput | Mode::PageInput | Mode::PathInput | Mode::Form
        )
    }

    // ----------------------------- mutators ------------------------------

    pub fn set_keyword(&mut self, keyword: impl Into<String>) {
        self.keyword = keyword.into();
        self.recompute();
    }

    /// Replace or clear one quick filter's constraint.
    pub fn set_filter(&mut self, key: &str, value: Option<FilterValue>) {
        match value {
            Some(v) if !v.is_empty() => {
                self.filter_values.insert(key.to_string(), v);
            }
            _ => {
                self.filter_values.remove(key);
            }
        }
        self.recompute();
    }

    pub fn replace_filters(&mut self, values: FilterValues) {
        self.filter_values = values;
        self.recompute();
    }

    /// Clear every quick filter. The keyword is independently clearable
    /// and stays untouched.
    pub fn clear_filters(&mut self) {
        self.filter_values.clear();
        self.recompute();
    }

    pub fn set_sort(&mut self, sort: Option<SortState>) {
        self.sort = sort;
        self.recompute();
    }

    /// Tri-state header toggle for a sortable column.
    pub fn toggle_sort(&mut self, key: &str) {
        let sortable = self
            .columns
            .iter()
            .any(|c| c.key == key && c.sortable);
        if !sortable {
            return;
        }
        self.sort = match self.sort.take() {
            Some(SortState { key: k, direction: SortDirection::Ascending }) if k == key => {
                Some(SortState { key: k, direction: SortDirection::Descending })
            }
            Some(SortState { key: k, .. }) if k == key => None,
            _ => Some(SortState {
                key: key.to_string(),
                direction: SortDirection::Ascending,
            }),
        };
        self.recompute();
    }

    pub fn toggle_position(&mut self, position: usize) {
        if position >= self.visible.len() {
            return;
        }
        if !self.selection.remove(&position) {
            self.selection.insert(position);
        }
    }

    /// Select every row of the current page (keeps other pages' picks).
    pub fn select_page(&mut self) {
        let (start, end) = slice_bounds(self.page, self.page_size, self.visible.len());
        for pos in start..end {
            self.selection.insert(pos);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
        self.recompute();
    }

    /// 0-based; clamped against the current page count.
    pub fn set_page(&mut self, page: usize) {
        self.page = clamp_page(page, self.visible.len(), self.page_size);
        self.clamp_cursor();
    }

    pub fn next_page(&mut self) {
        self.set_page(self.page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.page.saturating_sub(1));
    }

    pub fn first_page(&mut self) {
        self.set_page(0);
        self.cursor = 0;
    }

    pub fn last_page(&mut self) {
        self.set_page(self.page_count() - 1);
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    // ----------------------------- pipeline ------------------------------

    fn recompute(&mut self) {
        let started = Instant::now();
        self.after_search = (0..self.records.len())
            .filter(|&i| matches_keyword(&self.records[i], &self.keyword, &self.columns))
            .collect();
        self.visible = self
            .after_search
            .iter()
            .copied()
            .filter(|&i| matches_quick_filters(&self.records[i], &self.filter_values, &self.filters))
            .collect();

        if let Some(sort) = &self.sort
            && let Some(column) = self.columns.iter().find(|c| c.key == sort.key)
        {
            let records = &self.records;
            let descending = sort.direction == SortDirection::Descending;
            self.visible.sort_by(|&a, &b| {
                match (column.value(&records[a]), column.value(&records[b])) {
                    (Some(va), Some(vb)) => {
                        let ord = va.compare(&vb);
                        if descending { ord.reverse() } else { ord }
                    }
                    // Absent values sort to the end in both directions.
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            });
        }

        let len = self.visible.len();
        self.selection.retain(|&pos| pos < len);
        self.page = clamp_page(self.page, len, self.page_size);
        self.clamp_cursor();
        trace!(
            "Pipeline: {} raw, {} after search, {} visible, page {}/{} ({}ms)",
            self.records.len(),
            self.after_search.len(),
            len,
            self.page + 1,
            self.page_count(),
            started.elapsed().as_millis()
        );
    }

    fn clamp_cursor(&mut self) {
        let (start, end) = slice_bounds(self.page, self.page_size, self.visible.len());
        let page_len = end - start;
        if page_len == 0 {
            self.cursor = 0;
        } else if self.cursor >= page_len {
            self.cursor = page_len - 1;
        }
        let shown = self.shown_columns().len();
        if shown == 0 {
            self.cursor_col = 0;
        } else if self.cursor_col >= shown {
            self.cursor_col = shown - 1;
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_update = Instant::now();
    }

    // ------------------------- message dispatch --------------------------

    pub fn update(&mut self, message: Message) {
        match self.mode {
            Mode::Browse => self.update_browse(message),
            Mode::SearchInput | Mode::PageInput | Mode::PathInput => {
                self.update_line_input(message)
            }
            Mode::FilterMenu => self.update_filter_menu(message),
            Mode::ColumnMenu => self.update_column_menu(message),
            Mode::BulkBar => self.update_bulk(message),
            Mode::ConfirmAction => self.update_confirm(message),
            Mode::Detail => self.update_detail(message),
            Mode::Form => self.update_form(message),
            Mode::Help => self.update_help(message),
        }
    }

    fn update_browse(&mut self, message: Message) {
        match message {
            Message::Quit => self.quit(),
            Message::MoveDown => self.move_cursor_down(),
            Message::MoveUp => self.move_cursor_up(),
            Message::MoveBeginning => self.first_page(),
            Message::MoveEnd => {
                self.last_page();
                let page_len = self.page_records().len();
                self.cursor = page_len.saturating_sub(1);
            }
            Message::NextColumn => {
                let shown = self.shown_columns().len();
                if shown > 0 {
                    self.cursor_col = (self.cursor_col + 1) % shown;
                }
            }
            Message::PrevColumn => {
                let shown = self.shown_columns().len();
                if shown > 0 {
                    self.cursor_col = (self.cursor_col + shown - 1) % shown;
                }
            }
            Message::SortColumn => {
                if let Some(column) = self.shown_columns().get(self.cursor_col) {
                    let key = column.key.clone();
                    self.toggle_sort(&key);
                }
            }
            Message::ToggleSelect => {
                let pos = self.cursor_position();
                self.toggle_position(pos);
            }
            Message::SelectPage => {
                self.select_page();
                let n = self.selection_count();
                self.set_status_message(format!("{n} rows selected"));
            }
            Message::ClearSelection => {
                self.clear_selection();
                self.set_status_message("Selection cleared");
            }
            Message::Search => {
                self.input.clear();
                self.input.seed(&self.keyword.clone());
                self.last_input = self.input.snapshot();
                self.mode = Mode::SearchInput;
            }
            Message::JumpToPage => {
                self.input.clear();
                self.last_input = self.input.snapshot();
                self.pager.start_jump();
                self.mode = Mode::PageInput;
            }
            Message::OpenFilterMenu => {
                if self.filters.is_empty() {
                    self.set_status_message("No quick filters declared for this view");
                } else {
                    self.filter_menu.open();
                    self.mode = Mode::FilterMenu;
                }
            }
            Message::ClearFilters => {
                self.clear_filters();
                self.set_status_message("Quick filters cleared");
            }
            Message::OpenColumnMenu => {
                self.column_menu.open();
                self.mode = Mode::ColumnMenu;
            }
            Message::NextPage => self.next_page(),
            Message::PrevPage => self.prev_page(),
            Message::FirstPage => self.first_page(),
            Message::LastPage => self.last_page(),
            Message::Enter => self.open_detail(),
            Message::AddNew => self.open_create_form(),
            Message::Export => self.export(),
            Message::Import => {
                if self.hooks.on_import.is_some() {
                    self.input.clear();
                    self.last_input = self.input.snapshot();
                    self.mode = Mode::PathInput;
                } else {
                    self.set_status_message("Import is not wired for this view");
                }
            }
            Message::BulkActions => {
                if self.bulk.enabled(self.selection_count()) {
                    self.mode = Mode::BulkBar;
                } else if self.bulk.is_empty() {
                    self.set_status_message("No bulk actions declared for this view");
                } else {
                    self.set_status_message("Select rows first");
                }
            }
            Message::Refresh => {
                if let Some(f) = self.hooks.on_refresh.as_mut() {
                    f();
                }
                self.set_status_message("Refreshing ...");
            }
            Message::Help => {
                self.prev_mode = self.mode;
                self.mode = Mode::Help;
            }
            Message::Resize(w, h) => trace!("Resized to {w}x{h}"),
            Message::Exit | Message::RawKey(_) => {}
        }
    }

    fn update_line_input(&mut self, message: Message) {
        let Message::RawKey(key) = message else {
            return;
        };
        self.last_input = self.input.read(key);
        if !self.last_input.finished {
            return;
        }
        let result = self.last_input.clone();
        match self.mode {
            Mode::SearchInput => {
                if !result.canceled {
                    self.set_keyword(result.input);
                    self.set_status_message(format!("{} rows match", self.visible.len()));
                }
            }
            Mode::PageInput => {
                if !result.canceled {
                    let max_page = self.page_count();
                    let page = self.pager.finish_jump(&result.input, max_page);
                    self.set_page(page);
                } else {
                    self.pager.editing = false;
                }
            }
            Mode::PathInput => {
                if !result.canceled && !result.input.is_empty() {
                    if let Some(f) = self.hooks.on_import.as_mut() {
                        f(Path::new(&result.input));
                    }
                    self.set_status_message(format!("Importing {} ...", result.input));
                }
            }
            _ => {}
        }
        self.input.clear();
        self.mode = Mode::Browse;
    }

    fn update_filter_menu(&mut self, message: Message) {
        let option_count = self.options_for(self.filter_menu.filter_idx).len();
        match message {
            Message::Quit => self.quit(),
            Message::MoveDown => self.filter_menu.next_option(option_count),
            Message::MoveUp => self.filter_menu.prev_option(option_count),
            Message::NextColumn | Message::NextPage => {
                self.filter_menu.next_filter(self.filters.len())
            }
            Message::PrevColumn | Message::PrevPage => {
                self.filter_menu.prev_filter(self.filters.len())
            }
            Message::ToggleSelect | Message::Enter => self.toggle_menu_option(),
            Message::ClearFilters => {
                self.clear_filters();
                self.set_status_message("Quick filters cleared");
            }
            Message::Exit | Message::OpenFilterMenu => {
                self.filter_menu.close();
                self.mode = Mode::Browse;
            }
            _ => {}
        }
    }

    /// Toggle the option under the filter-menu cursor: multi-select
    /// constraints accumulate, single-select ones replace (or clear when
    /// the same option is hit again). The menu stays open.
    fn toggle_menu_option(&mut self) {
        let filter_idx = self.filter_menu.filter_idx;
        let options = self.options_for(filter_idx);
        let Some(option) = options.get(self.filter_menu.option_idx) else {
            return;
        };
        let Some(filter) = self.filters.get(filter_idx) else {
            return;
        };
        let key = filter.key.clone();
        let value = option.value.clone();
        let next = if filter.multi_select {
            match self.filter_values.remove(&key) {
                Some(current) => current.toggled(&value),
                None => Some(FilterValue::Many(vec![value])),
            }
        } else {
            match self.filter_values.remove(&key) {
                Some(current) if current.candidates() == [value.clone()] => None,
                _ => Some(FilterValue::One(value)),
            }
        };
        self.set_filter(&key, next);
    }

    fn update_column_menu(&mut self, message: Message) {
        match message {
            Message::Quit => self.quit(),
            Message::MoveDown => self.column_menu.move_down(self.columns.len()),
            Message::MoveUp => self.column_menu.move_up(self.columns.len()),
            Message::ToggleSelect | Message::Enter => {
                // Toggling keeps the menu open for further toggles.
                if let Some(column) = self.columns.get(self.column_menu.cursor) {
                    let key = column.key.clone();
                    self.visibility.toggle(&key);
                    self.clamp_cursor();
                }
            }
            Message::Exit | Message::OpenColumnMenu => {
                self.column_menu.close();
                self.mode = Mode::Browse;
            }
            _ => {}
        }
    }

    fn update_bulk(&mut self, message: Message) {
        match message {
            Message::Quit => self.quit(),
            Message::MoveDown => self.bulk.move_down(),
            Message::MoveUp => self.bulk.move_up(),
            Message::Enter => {
                let indices = self.selected_indices();
                let selected: Vec<&T> = indices.iter().map(|&i| &self.records[i]).collect();
                match self.bulk.request(&selected) {
                    BulkOutcome::NeedsConfirmation => self.mode = Mode::ConfirmAction,
                    BulkOutcome::Applied => {
                        let n = selected.len();
                        self.set_status_message(format!("Applied to {n} rows"));
                        self.mode = Mode::Browse;
                    }
                    BulkOutcome::Disabled => {
                        self.set_status_message("Select rows first");
                        self.mode = Mode::Browse;
                    }
                }
            }
            Message::Exit | Message::BulkActions => self.mode = Mode::Browse,
            _ => {}
        }
    }

    fn update_confirm(&mut self, message: Message) {
        match message {
            Message::Quit => self.quit(),
            Message::Enter => {
                let indices = self.selected_indices();
                let selected: Vec<&T> = indices.iter().map(|&i| &self.records[i]).collect();
                if self.bulk.confirm(&selected) == BulkOutcome::Applied {
                    let n = selected.len();
                    self.set_status_message(format!("Applied to {n} rows"));
                }
                self.mode = Mode::Browse;
            }
            Message::Exit => {
                self.bulk.cancel();
                self.mode = Mode::BulkBar;
            }
            _ => {}
        }
    }

    fn open_detail(&mut self) {
        let pos = self.cursor_position();
        if let Some(&idx) = self.visible.get(pos) {
            if let Some(f) = self.hooks.on_row_click.as_mut() {
                f(&self.records[idx]);
            }
            self.detail.cursor = 0;
            self.mode = Mode::Detail;
        }
    }

    fn open_create_form(&mut self) {
        if let Some(f) = self.hooks.on_add_new.as_mut() {
            f();
        }
        if self.field_groups.is_empty() {
            self.set_status_message("No form fields declared for this view");
            return;
        }
        self.form = Some(FormComposer::new(&self.field_groups, None));
        self.prev_mode = self.mode;
        self.mode = Mode::Form;
    }

    fn open_edit_form(&mut self) {
        if self.field_groups.is_empty() {
            self.set_status_message("No form fields declared for this view");
            return;
        }
        let pos = self.cursor_position();
        if let Some(&idx) = self.visible.get(pos) {
            self.form = Some(FormComposer::new(&self.field_groups, Some(&self.records[idx])));
            self.prev_mode = self.mode;
            self.mode = Mode::Form;
        }
    }

    fn export(&mut self) {
        let indices = if self.selection.is_empty() {
            self.visible.clone()
        } else {
            self.selected_indices()
        };
        let records: Vec<&T> = indices.iter().map(|&i| &self.records[i]).collect();
        let n = records.len();
        if let Some(f) = self.hooks.on_export.as_mut() {
            f(&records);
            self.set_status_message(format!("Exported {n} rows"));
        } else {
            self.set_status_message("Export is not wired for this view");
        }
    }

    fn update_detail(&mut self, message: Message) {
        match message {
            Message::Quit => self.quit(),
            Message::MoveDown => {
                let rows = self.detail_rows().len();
                self.detail.move_down(rows);
            }
            Message::MoveUp => self.detail.move_up(),
            Message::NextColumn | Message::NextPage => self.step_record(1),
            Message::PrevColumn | Message::PrevPage => self.step_record(-1),
            Message::Enter => self.open_edit_form(),
            Message::Exit => self.mode = Mode::Browse,
            _ => {}
        }
    }

    /// Move the browse cursor to the previous/next record of the visible
    /// set while staying in detail mode.
    fn step_record(&mut self, step: i64) {
        let pos = self.cursor_position() as i64 + step;
        if pos < 0 || pos as usize >= self.visible.len() {
            return;
        }
        let pos = pos as usize;
        self.page = pos / usize::max(self.page_size, 1);
        self.cursor = pos % usize::max(self.page_size, 1);
        self.detail.cursor = 0;
    }

    fn update_form(&mut self, message: Message) {
        let Message::RawKey(key) = message else {
            return;
        };
        let Some(form) = self.form.as_mut() else {
            self.mode = Mode::Browse;
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.form = None;
                self.mode = self.prev_mode;
            }
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
            KeyCode::Enter => {
                if form.focus + 1 < form.field_count() {
                    form.focus_next();
                } else {
                    self.finish_form();
                }
            }
            _ => form.input(key),
        }
    }

    /// Hand the collected field values back through the log; persisting
    /// them is the caller's data layer's job, outside this engine.
    fn finish_form(&mut self) {
        if let Some(form) = self.form.take() {
            let values = form.values();
            info!("Form submitted with {} fields: {values:?}", values.len());
            self.set_status_message("Form captured (submission is the caller's hook)");
        }
        self.mode = self.prev_mode;
    }

    fn update_help(&mut self, message: Message) {
        match message {
            Message::Quit => self.quit(),
            Message::Exit | Message::Enter | Message::Help => self.mode = self.prev_mode,
            _ => {}
        }
    }

    fn move_cursor_down(&mut self) {
        let page_len = self.page_records().len();
        if page_len == 0 {
            return;
        }
        if self.cursor + 1 < page_len {
            self.cursor += 1;
        } else if self.page + 1 < self.page_count() {
            self.next_page();
            self.cursor = 0;
        }
    }

    fn move_cursor_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        } else if self.page > 0 {
            self.prev_page();
            self.cursor = self.page_records().len().saturating_sub(1);
        }
    }

    /// Raw key passthrough used by form mode tests and the controller.
    pub fn feed_key(&mut self, key: KeyEvent) {
        self.update(Message::RawKey(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use ratatui::crossterm::event::KeyModifiers;

    use crate::columns::CellValue;
    use crate::compose::FieldSpec;
    use crate::filters::FilterKind;
    use crate::ui::Strategy;
    use crate::visibility::MemoryStore;

    #[derive(Debug, Clone, PartialEq)]
    struct Partner {
        name: String,
        city: String,
        status: &'static str,
        kind: &'static str,
        active: bool,
        email: Option<String>,
    }

    fn partner(i: usize, status: &'static str, kind: &'static str) -> Partner {
        Partner {
            name: format!("Partner {i:03}"),
            city: format!("City {}", i % 7),
            status,
            kind,
            active: status == "active",
            email: Some(format!("p{i}@example.com")),
        }
    }

    /// 120 partners: 80 active, 40 inactive; three of them carry "Acme"
    /// in the name only.
    fn partners() -> Vec<Partner> {
        let mut out = Vec::new();
        for i in 0..80 {
            let kind = if i % 2 == 0 { "vendor" } else { "customer" };
            out.push(partner(i, "active", kind));
        }
        for i in 80..120 {
            out.push(partner(i, "inactive", "vendor"));
        }
        out[3].name = "Acme Trading".into();
        out[40].name = "Acme Logistics".into();
        out[90].name = "Acme Holdings".into();
        out
    }

    fn columns() -> Vec<ColumnSpec<Partner>> {
        vec![
            ColumnSpec::new("name", "Name", |p: &Partner| Some(CellValue::text(p.name.clone()))),
            ColumnSpec::new("status", "Status", |p: &Partner| Some(CellValue::text(p.status))),
            ColumnSpec::new("city", "City", |p: &Partner| Some(CellValue::text(p.city.clone()))),
            ColumnSpec::new("email", "Email", |p: &Partner| {
                p.email.clone().map(CellValue::Text)
            }),
        ]
    }

    fn filters() -> Vec<QuickFilterSpec<Partner>> {
        vec![
            QuickFilterSpec::new("status", "Status", FilterKind::Select, |p: &Partner| {
                Some(CellValue::text(p.status))
            })
            .options(vec![
                FilterOption::new("active", "Active"),
                FilterOption::new("inactive", "Inactive"),
            ])
            .multi(),
            QuickFilterSpec::new("kind", "Kind", FilterKind::Select, |p: &Partner| {
                Some(CellValue::text(p.kind))
            })
            .options(vec![
                FilterOption::new("vendor", "Vendor"),
                FilterOption::new("customer", "Customer"),
            ])
            .multi(),
            QuickFilterSpec::new("active", "Active", FilterKind::Boolean, |p: &Partner| {
                Some(CellValue::Bool(p.active))
            }),
        ]
    }

    fn model() -> ListModel<Partner> {
        let mut m = ListModel::new(
            ListConfig::default(),
            columns(),
            filters(),
            Box::new(MemoryStore::new()),
            "partners",
        );
        m.set_records(partners());
        m
    }

    fn status_filter(values: &[&str]) -> FilterValue {
        FilterValue::Many(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn scenario_a_filter_pagination_math() {
        let mut m = model();
        m.set_filter("status", Some(status_filter(&["active"])));
        assert_eq!(m.visible_len(), 80);
        assert_eq!(m.page_count(), 2);
        let range = m.page_range();
        assert_eq!((range.start, range.end, range.total), (1, 50, 80));
        m.next_page();
        let range = m.page_range();
        assert_eq!((range.start, range.end), (51, 80));
    }

    #[test]
    fn scenario_b_keyword_hits_one_column() {
        let mut m = model();
        m.set_keyword("acme");
        assert_eq!(m.after_search_len(), 3);
        assert_eq!(m.visible_len(), 3);
    }

    #[test]
    fn scenario_c_refilter_drops_stale_selection() {
        let mut m = model();
        m.set_filter("status", Some(status_filter(&["active"])));
        m.select_page();
        assert_eq!(m.selection_count(), 50);
        // Narrow to vendors only: 40 of the 80 active remain.
        m.set_filter("kind", Some(status_filter(&["vendor"])));
        assert_eq!(m.visible_len(), 40);
        assert_eq!(m.selection_count(), 40);
        for record in m.selected_records() {
            assert_eq!(record.kind, "vendor");
            assert_eq!(record.status, "active");
        }
    }

    #[test]
    fn page_index_is_revalidated_after_shrink() {
        let mut m = model();
        m.set_page(2); // 120 records / 50 => pages 0..=2
        assert_eq!(m.page(), 2);
        m.set_keyword("acme"); // 3 records left
        assert_eq!(m.page(), 0);
        assert_eq!(m.page_count(), 1);
    }

    #[test]
    fn clearing_quick_filters_keeps_the_keyword() {
        let mut m = model();
        m.set_keyword("partner 0");
        m.set_filter("status", Some(status_filter(&["inactive"])));
        m.clear_filters();
        assert_eq!(m.keyword(), "partner 0");
        assert_eq!(m.visible_len(), m.after_search_len());
    }

    #[test]
    fn empty_filter_map_yields_after_search_exactly() {
        let mut m = model();
        m.set_keyword("city 3");
        assert_eq!(m.visible_len(), m.after_search_len());
    }

    #[test]
    fn sort_cycles_tristate_and_puts_absent_values_last() {
        let mut records = partners();
        records[5].email = None;
        let mut m = model();
        m.set_records(records);

        m.toggle_sort("email");
        assert_eq!(
            m.sort(),
            Some(&SortState { key: "email".into(), direction: SortDirection::Ascending })
        );
        assert!(m.visible_records().last().unwrap().email.is_none());

        m.toggle_sort("email");
        assert_eq!(m.sort().unwrap().direction, SortDirection::Descending);
        assert!(m.visible_records().last().unwrap().email.is_none());

        m.toggle_sort("email");
        assert_eq!(m.sort(), None);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut m = model();
        m.toggle_sort("status"); // many equal keys
        let actives: Vec<String> = m
            .visible_records()
            .iter()
            .filter(|p| p.status == "active")
            .map(|p| p.name.clone())
            .collect();
        let mut expected = actives.clone();
        expected.sort_by_key(|name| {
            partners()
                .iter()
                .position(|p| &p.name == name)
                .unwrap_or(usize::MAX)
        });
        assert_eq!(actives, expected);
    }

    #[test]
    fn unsortable_columns_are_ignored() {
        let mut cols = columns();
        cols[2] = ColumnSpec::new("city", "City", |p: &Partner| {
            Some(CellValue::text(p.city.clone()))
        })
        .unsortable();
        let mut m = ListModel::new(
            ListConfig::default(),
            cols,
            filters(),
            Box::new(MemoryStore::new()),
            "partners",
        );
        m.set_records(partners());
        m.toggle_sort("city");
        assert_eq!(m.sort(), None);
    }

    #[test]
    fn option_counts_are_what_if_over_after_search() {
        let mut m = model();
        assert_eq!(m.option_count("status", "active"), 80);
        assert_eq!(m.option_count("status", "inactive"), 40);
        // An applied constraint on another filter does not change counts:
        // they are evaluated over the keyword-filtered set only.
        m.set_filter("kind", Some(status_filter(&["customer"])));
        assert_eq!(m.option_count("status", "inactive"), 40);
        // The keyword does narrow the base set.
        m.set_keyword("acme");
        assert_eq!(m.option_count("status", "active"), 2);
        assert_eq!(m.option_count("status", "inactive"), 1);
        assert_eq!(m.option_count("ghost", "x"), 0);
    }

    #[test]
    fn boolean_option_count_normalizes() {
        let m = model();
        assert_eq!(m.option_count("active", "true"), 80);
        assert_eq!(m.option_count("active", "false"), 40);
    }

    #[test]
    fn selection_is_strategy_independent() {
        let mut m = model();
        m.update(Message::ToggleSelect);
        m.update(Message::MoveDown);
        m.update(Message::ToggleSelect);
        let names: Vec<String> = m.selected_records().iter().map(|p| p.name.clone()).collect();
        // The strategy switch is a pure function of the width; flipping it
        // does not touch the model, so the same identities stay selected.
        assert_eq!(Strategy::for_width(40, 72), Strategy::Cards);
        assert_eq!(Strategy::for_width(120, 72), Strategy::Table);
        let names_after: Vec<String> =
            m.selected_records().iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, names_after);
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn search_input_mode_applies_keyword_on_enter() {
        let mut m = model();
        m.update(Message::Search);
        assert_eq!(m.mode(), Mode::SearchInput);
        assert!(m.raw_keyevents());
        for c in "acme".chars() {
            m.feed_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        m.feed_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(m.mode(), Mode::Browse);
        assert_eq!(m.keyword(), "acme");
        assert_eq!(m.visible_len(), 3);
    }

    #[test]
    fn search_cancel_keeps_previous_keyword() {
        let mut m = model();
        m.set_keyword("acme");
        m.update(Message::Search);
        m.feed_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        m.feed_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert_eq!(m.mode(), Mode::Browse);
        assert_eq!(m.keyword(), "acme");
    }

    #[test]
    fn jump_to_page_normalizes_input() {
        let mut m = model();
        m.update(Message::JumpToPage);
        assert_eq!(m.mode(), Mode::PageInput);
        for c in "99".chars() {
            m.feed_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        m.feed_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(m.mode(), Mode::Browse);
        assert_eq!(m.page(), m.page_count() - 1);
    }

    #[test]
    fn filter_menu_toggles_options_and_stays_open() {
        let mut m = model();
        m.update(Message::OpenFilterMenu);
        assert_eq!(m.mode(), Mode::FilterMenu);
        m.update(Message::ToggleSelect); // status = [active]
        assert_eq!(m.mode(), Mode::FilterMenu);
        assert_eq!(m.visible_len(), 80);
        m.update(Message::MoveDown);
        m.update(Message::ToggleSelect); // status = [active, inactive]
        assert_eq!(m.visible_len(), 120);
        m.update(Message::MoveUp);
        m.update(Message::ToggleSelect); // back to [inactive]
        assert_eq!(m.visible_len(), 40);
        m.update(Message::Exit);
        assert_eq!(m.mode(), Mode::Browse);
    }

    #[test]
    fn single_select_filter_replaces_and_clears() {
        let mut m = model();
        m.update(Message::OpenFilterMenu);
        m.update(Message::NextColumn);
        m.update(Message::NextColumn); // boolean "active" filter
        m.update(Message::ToggleSelect); // active = true
        assert_eq!(m.visible_len(), 80);
        m.update(Message::MoveDown);
        m.update(Message::ToggleSelect); // active = false replaces
        assert_eq!(m.visible_len(), 40);
        m.update(Message::ToggleSelect); // same option again clears
        assert_eq!(m.visible_len(), 120);
    }

    #[test]
    fn column_menu_toggles_and_stays_open() {
        let mut m = model();
        assert_eq!(m.shown_columns().len(), 4);
        m.update(Message::OpenColumnMenu);
        assert_eq!(m.mode(), Mode::ColumnMenu);
        m.update(Message::MoveDown);
        m.update(Message::MoveDown);
        m.update(Message::MoveDown); // cursor on "email"
        m.update(Message::ToggleSelect);
        assert_eq!(m.mode(), Mode::ColumnMenu);
        assert_eq!(m.shown_columns().len(), 3);
        m.update(Message::ToggleSelect);
        assert_eq!(m.shown_columns().len(), 4);
        m.update(Message::Exit);
        assert_eq!(m.mode(), Mode::Browse);
    }

    #[test]
    fn bulk_flow_requires_selection_and_confirmation() {
        let applied = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&applied);
        let mut m = model().bulk_actions(vec![
            crate::toolbar::BulkAction::new("Delete", move |records: &[&Partner]| {
                sink.borrow_mut()
                    .extend(records.iter().map(|p| p.name.clone()));
            })
            .destructive(),
        ]);
        m.set_records(partners());

        m.update(Message::BulkActions);
        assert_eq!(m.mode(), Mode::Browse); // nothing selected yet

        m.update(Message::ToggleSelect);
        m.update(Message::BulkActions);
        assert_eq!(m.mode(), Mode::BulkBar);
        m.update(Message::Enter);
        assert_eq!(m.mode(), Mode::ConfirmAction);
        assert!(applied.borrow().is_empty());
        m.update(Message::Enter);
        assert_eq!(applied.borrow().len(), 1);
        // Selection is the caller's to clear, not the engine's.
        assert_eq!(m.selection_count(), 1);
        assert_eq!(m.mode(), Mode::Browse);
    }

    #[test]
    fn destructive_confirmation_can_be_canceled() {
        let mut m = model().bulk_actions(vec![
            crate::toolbar::BulkAction::new("Delete", |_: &[&Partner]| {
                panic!("must not run");
            })
            .destructive(),
        ]);
        m.set_records(partners());
        m.update(Message::ToggleSelect);
        m.update(Message::BulkActions);
        m.update(Message::Enter);
        assert_eq!(m.mode(), Mode::ConfirmAction);
        m.update(Message::Exit);
        assert_eq!(m.mode(), Mode::BulkBar);
    }

    #[test]
    fn export_hook_gets_selection_or_visible() {
        let exported = Rc::new(RefCell::new(0usize));
        let sink = Rc::clone(&exported);
        let mut m = model().hooks(ListHooks::new().export(move |records: &[&Partner]| {
            *sink.borrow_mut() = records.len();
        }));
        m.set_records(partners());

        m.update(Message::Export);
        assert_eq!(*exported.borrow(), 120);

        m.update(Message::ToggleSelect);
        m.update(Message::Export);
        assert_eq!(*exported.borrow(), 1);
    }

    #[test]
    fn import_prompt_hands_the_typed_path_to_the_hook() {
        let imported = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&imported);
        let mut m = model().hooks(ListHooks::new().import(move |path: &std::path::Path| {
            *sink.borrow_mut() = path.display().to_string();
        }));
        m.set_records(partners());

        m.update(Message::Import);
        assert_eq!(m.mode(), Mode::PathInput);
        for c in "/tmp/in.csv".chars() {
            m.feed_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        m.feed_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(m.mode(), Mode::Browse);
        assert_eq!(*imported.borrow(), "/tmp/in.csv");
    }

    #[test]
    fn import_without_hook_stays_in_browse() {
        let mut m = model();
        m.update(Message::Import);
        assert_eq!(m.mode(), Mode::Browse);
    }

    #[test]
    fn detail_mode_walks_records_and_fires_row_click() {
        let clicked = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&clicked);
        let mut m = model().hooks(ListHooks::new().row_click(move |p: &Partner| {
            *sink.borrow_mut() = p.name.clone();
        }));
        m.set_records(partners());

        m.update(Message::Enter);
        assert_eq!(m.mode(), Mode::Detail);
        assert_eq!(*clicked.borrow(), "Partner 000");
        assert!(!m.detail_rows().is_empty());

        m.update(Message::NextColumn); // next record
        assert_eq!(m.current_record().unwrap().name, "Partner 001");
        m.update(Message::Exit);
        assert_eq!(m.mode(), Mode::Browse);
    }

    #[test]
    fn form_mode_collects_values_through_raw_keys() {
        let groups = vec![FieldGroup::new(
            "General",
            vec![
                FieldSpec::new("name", "Name", |p: &Partner| {
                    Some(CellValue::text(p.name.clone()))
                }),
                FieldSpec::new("city", "City", |p: &Partner| {
                    Some(CellValue::text(p.city.clone()))
                }),
            ],
        )];
        let mut m = model().field_groups(groups);
        m.set_records(partners());

        m.update(Message::AddNew);
        assert_eq!(m.mode(), Mode::Form);
        assert!(m.raw_keyevents());
        m.feed_key(KeyEvent::new(KeyCode::Char('X'), KeyModifiers::NONE));
        assert_eq!(m.form().unwrap().buffer(0), "X");
        m.feed_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)); // next field
        m.feed_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)); // submit
        assert_eq!(m.mode(), Mode::Browse);
        assert!(m.form().is_none());
    }

    #[test]
    fn cursor_walks_across_page_boundaries() {
        let mut m = model();
        for _ in 0..50 {
            m.update(Message::MoveDown);
        }
        assert_eq!(m.page(), 1);
        assert_eq!(m.cursor(), 0);
        m.update(Message::MoveUp);
        assert_eq!(m.page(), 0);
        assert_eq!(m.cursor(), 49);
    }

    #[test]
    fn empty_visible_set_is_a_normal_state() {
        let mut m = model();
        m.set_keyword("no such partner anywhere");
        assert_eq!(m.visible_len(), 0);
        assert_eq!(m.page_count(), 1);
        assert_eq!(m.page_range().start, 0);
        assert!(m.current_record().is_none());
        m.update(Message::ToggleSelect); // no-op, no panic
        assert_eq!(m.selection_count(), 0);
    }
}
