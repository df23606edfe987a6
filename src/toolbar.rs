//! Toolbar surfaces: quick-filter popover, column-visibility menu, bulk
//! action bar and pager. These are plain state machines over the list
//! model's state; rendering lives in `ui` and never feeds back into them.

use crate::paging::normalize_page;

/// Quick-filter popover: one filter open at a time, a cursor over its
/// options. Option toggling happens in the model (it owns the filter
/// values); the menu only tracks position.
#[derive(Debug, Default)]
pub struct FilterMenu {
    pub open: bool,
    pub filter_idx: usize,
    pub option_idx: usize,
}

impl FilterMenu {
    pub fn open(&mut self) {
        self.open = true;
        self.filter_idx = 0;
        self.option_idx = 0;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn next_filter(&mut self, filter_count: usize) {
        if filter_count > 0 {
            self.filter_idx = (self.filter_idx + 1) % filter_count;
            self.option_idx = 0;
        }
    }

    pub fn prev_filter(&mut self, filter_count: usize) {
        if filter_count > 0 {
            self.filter_idx = (self.filter_idx + filter_count - 1) % filter_count;
            self.option_idx = 0;
        }
    }

    pub fn next_option(&mut self, option_count: usize) {
        if option_count > 0 {
            self.option_idx = (self.option_idx + 1) % option_count;
        }
    }

    pub fn prev_option(&mut self, option_count: usize) {
        if option_count > 0 {
            self.option_idx = (self.option_idx + option_count - 1) % option_count;
        }
    }
}

/// Column-visibility menu: `closed -> open` on trigger, `open -> closed`
/// on an explicit close. Toggling a column keeps the menu open so several
/// columns can be flipped in one session.
#[derive(Debug, Default)]
pub struct ColumnMenu {
    pub open: bool,
    pub cursor: usize,
}

impl ColumnMenu {
    pub fn open(&mut self) {
        self.open = true;
        self.cursor = 0;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn move_down(&mut self, column_count: usize) {
        if column_count > 0 {
            self.cursor = (self.cursor + 1) % column_count;
        }
    }

    pub fn move_up(&mut self, column_count: usize) {
        if column_count > 0 {
            self.cursor = (self.cursor + column_count - 1) % column_count;
        }
    }
}

/// One operation over the full current selection. `apply` receives the
/// materialized selected records, never indices.
pub struct BulkAction<T> {
    pub label: String,
    pub destructive: bool,
    apply: Box<dyn FnMut(&[&T])>,
}

impl<T> BulkAction<T> {
    pub fn new(label: impl Into<String>, apply: impl FnMut(&[&T]) + 'static) -> Self {
        Self {
            label: label.into(),
            destructive: false,
            apply: Box::new(apply),
        }
    }

    pub fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }
}

/// Outcome of asking the bar to run the action under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOutcome {
    /// Nothing selected or no actions registered.
    Disabled,
    /// Destructive action: confirmation required before it runs.
    NeedsConfirmation,
    /// Action ran.
    Applied,
}

/// Bulk-action bar. Enabled only while the selection is non-empty; a
/// destructive action routes through a confirmation step. The bar never
/// clears the selection itself, that stays with the caller so optimistic
/// UI flows keep working.
pub struct BulkActionBar<T> {
    actions: Vec<BulkAction<T>>,
    pub cursor: usize,
    pub confirming: Option<usize>,
}

impl<T> Default for BulkActionBar<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> BulkActionBar<T> {
    pub fn new(actions: Vec<BulkAction<T>>) -> Self {
        Self {
            actions,
            cursor: 0,
            confirming: None,
        }
    }

    pub fn actions(&self) -> &[BulkAction<T>] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn enabled(&self, selection_count: usize) -> bool {
        selection_count > 0 && !self.actions.is_empty()
    }

    pub fn move_down(&mut self) {
        if !self.actions.is_empty() {
            self.cursor = (self.cursor + 1) % self.actions.len();
        }
    }

    pub fn move_up(&mut self) {
        if !self.actions.is_empty() {
            self.cursor = (self.cursor + self.actions.len() - 1) % self.actions.len();
        }
    }

    /// Run the action under the cursor, or park it behind a confirmation
    /// when destructive.
    pub fn request(&mut self, selected: &[&T]) -> BulkOutcome {
        if !self.enabled(selected.len()) {
            return BulkOutcome::Disabled;
        }
        if self.actions[self.cursor].destructive {
            self.confirming = Some(self.cursor);
            return BulkOutcome::NeedsConfirmation;
        }
        (self.actions[self.cursor].apply)(selected);
        BulkOutcome::Applied
    }

    /// Confirm a parked destructive action.
    pub fn confirm(&mut self, selected: &[&T]) -> BulkOutcome {
        match self.confirming.take() {
            Some(idx) if !selected.is_empty() => {
                (self.actions[idx].apply)(selected);
                BulkOutcome::Applied
            }
            _ => BulkOutcome::Disabled,
        }
    }

    pub fn cancel(&mut self) {
        self.confirming = None;
    }
}

/// Pager surface: the desktop strategy offers a jump-to-page input, the
/// card strategy a compact next/previous stepper. Both run through the
/// same normalization.
#[derive(Debug, Default)]
pub struct Pager {
    pub editing: bool,
}

impl Pager {
    pub fn start_jump(&mut self) {
        self.editing = true;
    }

    /// Resolve the typed page number to a valid 0-based page index.
    pub fn finish_jump(&mut self, input: &str, max_page: usize) -> usize {
        self.editing = false;
        normalize_page(input, max_page) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn bulk_bar_disabled_without_selection() {
        let mut bar: BulkActionBar<u32> = BulkActionBar::new(vec![BulkAction::new("Tag", |_| {})]);
        assert!(!bar.enabled(0));
        assert_eq!(bar.request(&[]), BulkOutcome::Disabled);
    }

    #[test]
    fn non_destructive_action_runs_immediately() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut bar = BulkActionBar::new(vec![BulkAction::new("Tag", move |records: &[&u32]| {
            sink.borrow_mut().extend(records.iter().map(|r| **r));
        })]);
        let a = 7u32;
        let b = 9u32;
        assert_eq!(bar.request(&[&a, &b]), BulkOutcome::Applied);
        assert_eq!(*seen.borrow(), vec![7, 9]);
    }

    #[test]
    fn destructive_action_requires_confirmation() {
        let count = Rc::new(RefCell::new(0usize));
        let sink = Rc::clone(&count);
        let mut bar = BulkActionBar::new(vec![
            BulkAction::new("Delete", move |records: &[&u32]| {
                *sink.borrow_mut() += records.len();
            })
            .destructive(),
        ]);
        let a = 1u32;
        assert_eq!(bar.request(&[&a]), BulkOutcome::NeedsConfirmation);
        assert_eq!(*count.borrow(), 0);
        assert_eq!(bar.confirm(&[&a]), BulkOutcome::Applied);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn cancel_drops_the_pending_confirmation() {
        let mut bar = BulkActionBar::new(vec![BulkAction::new("Delete", |_: &[&u32]| {
            panic!("must not run");
        })
        .destructive()]);
        let a = 1u32;
        bar.request(&[&a]);
        bar.cancel();
        assert_eq!(bar.confirm(&[&a]), BulkOutcome::Disabled);
    }

    #[test]
    fn column_menu_stays_open_across_toggles() {
        let mut menu = ColumnMenu::default();
        menu.open();
        menu.move_down(3);
        menu.move_down(3);
        // Toggling visibility is a model concern; the menu itself only
        // closes on an explicit close.
        assert!(menu.open);
        assert_eq!(menu.cursor, 2);
        menu.close();
        assert!(!menu.open);
    }

    #[test]
    fn filter_menu_wraps_filters_and_options() {
        let mut menu = FilterMenu::default();
        menu.open();
        menu.next_filter(2);
        menu.next_filter(2);
        assert_eq!(menu.filter_idx, 0);
        menu.prev_option(3);
        assert_eq!(menu.option_idx, 2);
    }

    #[test]
    fn pager_jump_normalizes_input() {
        let mut pager = Pager::default();
        pager.start_jump();
        assert!(pager.editing);
        assert_eq!(pager.finish_jump("3", 5), 2);
        assert_eq!(pager.finish_jump("99", 5), 4);
        assert_eq!(pager.finish_jump("junk", 5), 0);
    }
}
