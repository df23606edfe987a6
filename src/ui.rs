//! Presentation layer. Two rendering strategies (dense table vs. card
//! list) consume the same derived page slice and selection from the list
//! model; the strategy switch is a pure function of the terminal width and
//! never reaches back into the state logic.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState};

use crate::columns::Align;
use crate::compose::DetailRow;
use crate::domain::HELP_TEXT;
use crate::model::{ListModel, Mode, SortDirection};

pub const TOOLBAR_HEIGHT: u16 = 2;
pub const STATUSLINE_HEIGHT: u16 = 1;
pub const SELECT_MARK_WIDTH: u16 = 3;
pub const CARD_HEIGHT: u16 = 4;

/// Which presentation renders the current page slice. Filtering, sorting,
/// pagination and selection are identical under both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Table,
    Cards,
}

impl Strategy {
    pub fn for_width(width: u16, card_threshold: u16) -> Self {
        if width < card_threshold {
            Strategy::Cards
        } else {
            Strategy::Table
        }
    }
}

pub struct ListUI {
    table_state: TableState,
}

impl ListUI {
    pub fn new() -> Self {
        Self {
            table_state: TableState::default(),
        }
    }

    pub fn draw<T>(&mut self, model: &ListModel<T>, frame: &mut Frame) {
        let area = frame.area();
        let [toolbar_area, body_area, status_area] = Layout::vertical([
            Constraint::Length(TOOLBAR_HEIGHT),
            Constraint::Min(1),
            Constraint::Length(STATUSLINE_HEIGHT),
        ])
        .areas(area);

        self.draw_toolbar(model, frame, toolbar_area);
        self.draw_body(model, frame, body_area);
        self.draw_statusline(model, frame, status_area);

        match model.mode() {
            Mode::FilterMenu => self.draw_filter_menu(model, frame, area),
            Mode::ColumnMenu => self.draw_column_menu(model, frame, area),
            Mode::BulkBar => self.draw_bulk_bar(model, frame, area),
            Mode::ConfirmAction => self.draw_confirmation(model, frame, area),
            Mode::Help => self.draw_help(frame, area),
            _ => {}
        }
    }

    fn draw_toolbar<T>(&self, model: &ListModel<T>, frame: &mut Frame, area: Rect) {
        let search_line = match model.mode() {
            Mode::SearchInput => {
                let input = model.last_input();
                Line::from(vec![
                    Span::raw(" search: "),
                    Span::raw(input.input.clone()).bold(),
                    Span::raw("▏").slow_blink(),
                ])
            }
            Mode::PageInput => {
                let input = model.last_input();
                Line::from(vec![
                    Span::raw(" page: "),
                    Span::raw(input.input.clone()).bold(),
                    Span::raw("▏").slow_blink(),
                ])
            }
            Mode::PathInput => {
                let input = model.last_input();
                Line::from(vec![
                    Span::raw(" import path: "),
                    Span::raw(input.input.clone()).bold(),
                    Span::raw("▏").slow_blink(),
                ])
            }
            _ => {
                let mut spans = vec![Span::raw(" search: ")];
                if model.keyword().is_empty() {
                    spans.push(Span::raw("(none)").dim());
                } else {
                    spans.push(Span::raw(model.keyword().to_string()).bold());
                }
                let active = model.active_filter_count();
                if active > 0 {
                    spans.push(Span::raw(format!("  filters: {active} active")).yellow());
                }
                Line::from(spans)
            }
        };

        let range = model.page_range();
        let mut spans = vec![Span::raw(format!(
            " {}-{} of {}  page {}/{}",
            range.start,
            range.end,
            range.total,
            model.page() + 1,
            model.page_count()
        ))];
        if model.selection_count() > 0 {
            spans.push(
                Span::raw(format!("  {} selected", model.selection_count())).light_green(),
            );
        }
        if let Some(sort) = model.sort() {
            let arrow = match sort.direction {
                SortDirection::Ascending => "▲",
                SortDirection::Descending => "▼",
            };
            spans.push(Span::raw(format!("  sort: {} {arrow}", sort.key)).cyan());
        }
        let pager_line = Line::from(spans);

        frame.render_widget(Paragraph::new(Text::from(vec![search_line, pager_line])), area);
    }

    fn draw_body<T>(&mut self, model: &ListModel<T>, frame: &mut Frame, area: Rect) {
        match model.mode() {
            Mode::Detail => return self.draw_detail(model, frame, area),
            Mode::Form => return self.draw_form(model, frame, area),
            _ => {}
        }
        if model.visible_len() == 0 {
            // Normal terminal state, not an error: the caller renders
            // fetch failures before this pipeline ever runs.
            let para = Paragraph::new("No data to display\nAdjust the keyword or quick filters.")
                .alignment(Alignment::Center)
                .dim()
                .block(self.body_block(model));
            frame.render_widget(para, area);
            return;
        }
        match Strategy::for_width(area.width, model.config().card_width_threshold) {
            Strategy::Table => self.draw_table(model, frame, area),
            Strategy::Cards => self.draw_cards(model, frame, area),
        }
    }

    fn body_block<T>(&self, model: &ListModel<T>) -> Block<'static> {
        Block::bordered().title(format!(" {} ", model.visibility().view_name()))
    }

    fn sort_indicator<T>(model: &ListModel<T>, key: &str) -> &'static str {
        match model.sort() {
            Some(sort) if sort.key == key => match sort.direction {
                SortDirection::Ascending => " ▲",
                SortDirection::Descending => " ▼",
            },
            _ => "",
        }
    }

    fn draw_table<T>(&mut self, model: &ListModel<T>, frame: &mut Frame, area: Rect) {
        let columns = model.shown_columns();

        let mut header_cells = vec![Cell::from("")];
        for (idx, column) in columns.iter().enumerate() {
            let mut text = format!("{}{}", column.label, Self::sort_indicator(model, &column.key));
            if idx == model.cursor_col() {
                text = format!("[{text}]");
            }
            header_cells.push(Cell::from(text));
        }
        let header = Row::new(header_cells).style(Style::default().add_modifier(Modifier::BOLD));

        let max_width = model.config().max_column_width;
        let rows: Vec<Row> = model
            .page_records()
            .iter()
            .enumerate()
            .map(|(row_idx, record)| {
                let position = model.page() * model.page_size() + row_idx;
                let mark = if model.is_position_selected(position) {
                    "✓"
                } else {
                    " "
                };
                let mut cells = vec![Cell::from(mark)];
                for column in &columns {
                    let mut text = column.display(record);
                    if text.chars().count() > max_width {
                        text = text.chars().take(max_width.saturating_sub(1)).collect();
                        text.push('…');
                    }
                    let aligned = match column.align {
                        Align::Left => Text::from(text),
                        Align::Center => Text::from(text).alignment(Alignment::Center),
                        Align::Right => Text::from(text).alignment(Alignment::Right),
                    };
                    cells.push(Cell::from(aligned));
                }
                Row::new(cells)
            })
            .collect();

        let mut widths = vec![Constraint::Length(SELECT_MARK_WIDTH)];
        widths.extend(columns.iter().map(|c| Constraint::Length(c.width)));

        let table = Table::new(rows, widths)
            .header(header)
            .block(self.body_block(model))
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        self.table_state.select(Some(model.cursor()));
        frame.render_stateful_widget(table, area, &mut self.table_state);
    }

    /// Card strategy for narrow viewports: a reduced, priority-ordered
    /// subset of the same page slice. Primary label, badge, then secondary
    /// fields; selection marks match the table strategy.
    fn draw_cards<T>(&self, model: &ListModel<T>, frame: &mut Frame, area: Rect) {
        let block = self.body_block(model);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let capacity = usize::max(1, (inner.height / CARD_HEIGHT) as usize);
        let records = model.page_records();
        let start = if model.cursor() >= capacity {
            model.cursor() + 1 - capacity
        } else {
            0
        };
        let columns = model.shown_columns();

        for (slot, (row_idx, record)) in records
            .iter()
            .enumerate()
            .skip(start)
            .take(capacity)
            .enumerate()
        {
            let card_area = Rect {
                x: inner.x,
                y: inner.y + (slot as u16) * CARD_HEIGHT,
                width: inner.width,
                height: CARD_HEIGHT.min(inner.height.saturating_sub((slot as u16) * CARD_HEIGHT)),
            };
            if card_area.height == 0 {
                break;
            }

            let position = model.page() * model.page_size() + row_idx;
            let mark = if model.is_position_selected(position) {
                "✓ "
            } else {
                "  "
            };
            let primary = columns
                .first()
                .map(|c| c.display(record))
                .unwrap_or_default();
            let badge = columns.get(1).map(|c| c.display(record)).unwrap_or_default();
            let secondary: Vec<String> = columns
                .iter()
                .skip(2)
                .take(3)
                .map(|c| format!("{}: {}", c.label, c.display(record)))
                .collect();

            let mut lines = vec![Line::from(vec![
                Span::raw(mark),
                Span::raw(primary).bold(),
                Span::raw("  "),
                Span::raw(badge).cyan(),
            ])];
            if !secondary.is_empty() {
                lines.push(Line::from(Span::raw(secondary.join(" · ")).dim()));
            }

            let style = if row_idx == model.cursor() {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            let card = Paragraph::new(Text::from(lines)).style(style).block(
                Block::bordered().border_style(if row_idx == model.cursor() {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default().fg(Color::DarkGray)
                }),
            );
            frame.render_widget(card, card_area);
        }
    }

    fn draw_detail<T>(&self, model: &ListModel<T>, frame: &mut Frame, area: Rect) {
        let rows = model.detail_rows();
        let cursor = model.detail_cursor();
        let lines: Vec<Line> = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let line = match row {
                    DetailRow::GroupHeader(title) => {
                        Line::from(Span::raw(format!(" {title}")).bold().underlined())
                    }
                    DetailRow::Field { label, value } => Line::from(vec![
                        Span::raw(format!("   {label:<20}")).dim(),
                        Span::raw(value.clone()),
                    ]),
                };
                if idx == cursor {
                    line.style(Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    line
                }
            })
            .collect();
        let para = Paragraph::new(Text::from(lines)).block(
            Block::bordered().title(" record detail (h/l previous/next, Enter edit, Esc back) "),
        );
        frame.render_widget(para, area);
    }

    fn draw_form<T>(&self, model: &ListModel<T>, frame: &mut Frame, area: Rect) {
        let Some(form) = model.form() else {
            return;
        };
        let mut lines = Vec::new();
        for idx in 0..form.field_count() {
            let label = form.label(idx).unwrap_or("");
            let line = Line::from(vec![
                Span::raw(format!(" {label:<20}")).dim(),
                Span::raw(form.buffer(idx).to_string()),
            ]);
            lines.push(if idx == form.focus {
                line.style(Style::default().add_modifier(Modifier::REVERSED))
            } else {
                line
            });
        }
        let para = Paragraph::new(Text::from(lines)).block(
            Block::bordered().title(" record form (Tab next field, Enter submit, Esc cancel) "),
        );
        frame.render_widget(para, area);
    }

    fn draw_filter_menu<T>(&self, model: &ListModel<T>, frame: &mut Frame, area: Rect) {
        let menu = model.filter_menu();
        let Some(filter) = model.filters().get(menu.filter_idx) else {
            return;
        };
        let options = model.options_for(menu.filter_idx);
        let active = model
            .filter_values()
            .get(&filter.key)
            .map(|v| v.candidates().to_vec())
            .unwrap_or_default();

        let mut lines = Vec::new();
        for (idx, option) in options.iter().enumerate() {
            let checked = if active.iter().any(|v| v == &option.value) {
                "[x]"
            } else {
                "[ ]"
            };
            let count = model.option_count(&filter.key, &option.value);
            let line = Line::from(vec![
                Span::raw(format!(" {checked} {} ", option.label)),
                Span::raw(format!("({count})")).dim(),
            ]);
            lines.push(if idx == menu.option_idx {
                line.style(Style::default().add_modifier(Modifier::REVERSED))
            } else {
                line
            });
        }
        if options.is_empty() {
            lines.push(Line::from(Span::raw(" no options for this filter ").dim()));
        }

        let title = format!(
            " {} ({}/{})  h/l switch, Space toggle, F clear, Esc close ",
            filter.label,
            menu.filter_idx + 1,
            model.filters().len()
        );
        let height = options.len().max(1) as u16 + 2;
        self.popup(frame, area, &title, lines, 60, height);
    }

    fn draw_column_menu<T>(&self, model: &ListModel<T>, frame: &mut Frame, area: Rect) {
        let menu = model.column_menu();
        let lines: Vec<Line> = model
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let checked = if model.visibility().is_visible(&column.key) {
                    "[x]"
                } else {
                    "[ ]"
                };
                let line = Line::from(format!(" {checked} {}", column.label));
                if idx == menu.cursor {
                    line.style(Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    line
                }
            })
            .collect();
        let height = model.columns().len() as u16 + 2;
        self.popup(
            frame,
            area,
            " columns (Space toggle, Esc close) ",
            lines,
            44,
            height,
        );
    }

    fn draw_bulk_bar<T>(&self, model: &ListModel<T>, frame: &mut Frame, area: Rect) {
        let bar = model.bulk_bar();
        let lines: Vec<Line> = bar
            .actions()
            .iter()
            .enumerate()
            .map(|(idx, action)| {
                let mut span = Span::raw(format!(" {} ", action.label));
                if action.destructive {
                    span = span.red();
                }
                let line = Line::from(span);
                if idx == bar.cursor {
                    line.style(Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    line
                }
            })
            .collect();
        let title = format!(
            " bulk actions ({} rows selected, Enter run, Esc close) ",
            model.selection_count()
        );
        let height = bar.actions().len() as u16 + 2;
        self.popup(frame, area, &title, lines, 52, height);
    }

    fn draw_confirmation<T>(&self, model: &ListModel<T>, frame: &mut Frame, area: Rect) {
        let bar = model.bulk_bar();
        let label = bar
            .confirming
            .and_then(|idx| bar.actions().get(idx))
            .map(|a| a.label.clone())
            .unwrap_or_default();
        let lines = vec![
            Line::from(Span::raw(format!(
                " Apply \"{label}\" to {} selected rows? ",
                model.selection_count()
            ))),
            Line::default(),
            Line::from(Span::raw(" Enter confirm · Esc cancel ").dim()),
        ];
        self.popup(frame, area, " confirm ", lines, 56, 5);
    }

    fn draw_help(&self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = HELP_TEXT.lines().map(Line::from).collect();
        let height = lines.len() as u16 + 2;
        self.popup(frame, area, " help ", lines, 60, height);
    }

    fn draw_statusline<T>(&self, model: &ListModel<T>, frame: &mut Frame, area: Rect) {
        let message = if model.status_message().is_empty() || model.status_age().as_secs() > 8 {
            " ? help · q quit".to_string()
        } else {
            format!(" {}", model.status_message())
        };
        frame.render_widget(
            Paragraph::new(message).style(Style::default().fg(Color::DarkGray)),
            area,
        );
    }

    fn popup(&self, frame: &mut Frame, area: Rect, title: &str, lines: Vec<Line>, width: u16, height: u16) {
        let popup_area = centered_rect(area, width, height);
        frame.render_widget(Clear, popup_area);
        let para = Paragraph::new(Text::from(lines))
            .block(Block::bordered().title(title.to_string()));
        frame.render_widget(para, popup_area);
    }
}

impl Default for ListUI {
    fn default() -> Self {
        Self::new()
    }
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_switches_at_the_threshold() {
        assert_eq!(Strategy::for_width(71, 72), Strategy::Cards);
        assert_eq!(Strategy::for_width(72, 72), Strategy::Table);
        assert_eq!(Strategy::for_width(200, 72), Strategy::Table);
    }

    #[test]
    fn centered_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 40, 10);
        let popup = centered_rect(area, 60, 20);
        assert_eq!(popup.width, 40);
        assert_eq!(popup.height, 10);
        let small = centered_rect(area, 20, 4);
        assert_eq!(small.x, 10);
        assert_eq!(small.y, 3);
    }
}
