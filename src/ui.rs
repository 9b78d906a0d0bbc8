use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell as TableCell, Clear, Gauge, Paragraph, Row as TableRow, Table,
        TableState, Tabs, Wrap,
    },
};
use std::time::Duration;
use tracing::trace;

use crate::actions::RowAction;
use crate::domain::{CMDMode, ClassLimit, TTVConfig};
use crate::model::{ConstraintsView, Model, Panel, ScopeView, UIData};
use crate::pipeline::Cell;

pub const TAB_BAR_HEIGHT: usize = 1;
pub const TITLE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const CMDLINE_HEIGH: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

const STATUS_MESSAGE_FADE: Duration = Duration::from_secs(5);
const SELECTED_STYLE: Style = Style::new().add_modifier(Modifier::REVERSED);
const HEADER_STYLE: Style = Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD);

pub struct TableUI {
    max_column_width: usize,
}

impl TableUI {
    pub fn new(config: &TTVConfig) -> Self {
        Self {
            max_column_width: config.max_column_width,
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [tabs_area, title_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(TAB_BAR_HEIGHT as u16),
            Constraint::Length(TITLE_HEIGHT as u16),
            Constraint::Min(TABLE_HEADER_HEIGHT as u16),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(frame.area());

        self.render_tabs(uidata, frame, tabs_area);
        self.render_title(uidata, frame, title_area);
        self.render_table(uidata, frame, table_area);
        self.render_statusline(uidata, frame, status_area);

        match &uidata.panel {
            Some(Panel::Constraints(view)) => {
                self.render_constraints(view, frame, centered_rect(70, 80, frame.area()))
            }
            Some(Panel::Scope(view)) => {
                self.render_scope(view, frame, centered_rect(70, 80, frame.area()))
            }
            None => (),
        }

        if uidata.show_popup {
            self.render_popup(uidata, frame, centered_rect(50, 70, frame.area()));
        }
    }

    fn render_tabs(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let tabs = Tabs::new(uidata.tabs.iter().map(|t| Line::from(t.as_str())))
            .select(uidata.selected_tab)
            .highlight_style(SELECTED_STYLE.bold())
            .divider("|");
        frame.render_widget(tabs, area);
    }

    fn render_title(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let title = Line::from(vec![
            Span::styled(uidata.name.as_str(), Style::default().bold()),
            Span::raw("  "),
            Span::styled(uidata.description.as_str(), Style::default().dim()),
        ]);
        frame.render_widget(Paragraph::new(title), area);
    }

    fn render_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let widths = uidata
            .header
            .iter()
            .map(|h| Constraint::Length(h.width.min(self.max_column_width) as u16))
            .collect::<Vec<Constraint>>();

        let header = uidata
            .header
            .iter()
            .map(|h| {
                let label = match h.marker {
                    Some(arrow) => format!("{} {}", h.label, arrow),
                    None => h.label.clone(),
                };
                let style = if h.sortable {
                    HEADER_STYLE
                } else {
                    HEADER_STYLE.remove_modifier(Modifier::BOLD)
                };
                TableCell::from(label).style(style)
            })
            .collect::<TableRow>()
            .height(TABLE_HEADER_HEIGHT as u16);

        let rows = uidata
            .table
            .iter()
            .map(|r| r.iter().map(styled_cell).collect::<TableRow>());

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(COLUMN_WIDTH_MARGIN as u16)
            .cell_highlight_style(SELECTED_STYLE)
            .row_highlight_style(Style::default().bg(Color::DarkGray));

        let mut state = TableState::default();
        if !uidata.table.is_empty() {
            state = state
                .with_selected(Some(uidata.selected_row))
                .with_selected_column(Some(uidata.selected_column));
        }
        frame.render_stateful_widget(table, area, &mut state);

        if uidata.table.is_empty() {
            let [_, message_area] = Layout::vertical([
                Constraint::Length(TABLE_HEADER_HEIGHT as u16 + 1),
                Constraint::Length(1),
            ])
            .areas(area);
            frame.render_widget(
                Paragraph::new("No data found")
                    .alignment(Alignment::Center)
                    .dim(),
                message_area,
            );
        }
    }

    fn render_statusline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = match uidata.cmd_mode {
                Some(CMDMode::Search) => "/".to_string(),
                Some(CMDMode::ClassLimit(ClassLimit::Batch)) => {
                    "Max classes per day (batch): ".to_string()
                }
                Some(CMDMode::ClassLimit(ClassLimit::Faculty)) => {
                    "Max classes per day (faculty): ".to_string()
                }
                None => String::new(),
            };
            let line = Line::from(vec![
                Span::styled(prompt.as_str(), Style::default().fg(Color::Cyan)),
                Span::raw(uidata.cmdinput.input.as_str()),
            ]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        let mut right = uidata
            .affordances
            .iter()
            .map(|a| match a {
                RowAction::Edit => "e edit".to_string(),
                RowAction::Delete => "d delete".to_string(),
            })
            .collect::<Vec<String>>();
        right.push("? help".to_string());
        right.push(format!("{}/{}", uidata.nrows, uidata.total_rows));
        let right = right.join("  ");

        let [left_area, right_area] = Layout::horizontal([
            Constraint::Min(1),
            Constraint::Length(right.chars().count() as u16),
        ])
        .areas(area);
        let mut status = Paragraph::new(uidata.status_message.as_str()).italic();
        if uidata.last_status_message_update.elapsed() > STATUS_MESSAGE_FADE {
            status = status.dim();
        }
        frame.render_widget(status, left_area);
        frame.render_widget(
            Paragraph::new(right)
                .alignment(Alignment::Right)
                .dim(),
            right_area,
        );
    }

    fn render_constraints(&self, view: &ConstraintsView, frame: &mut Frame, area: Rect) {
        frame.render_widget(Clear, area);
        let block = Block::default()
            .title(" Constraints ")
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut rows = vec![Constraint::Length(1); view.weights.len() + view.limits.len() + 3];
        rows.push(Constraint::Min(0));
        let areas = Layout::vertical(rows).split(inner);

        for (idx, (label, percent, weight)) in view.weights.iter().enumerate() {
            let [label_area, gauge_area] =
                Layout::horizontal([Constraint::Length(32), Constraint::Min(10)])
                    .areas(areas[idx]);
            let style = if view.selected == idx {
                SELECTED_STYLE
            } else {
                Style::default()
            };
            frame.render_widget(Paragraph::new(label.as_str()).style(style), label_area);
            frame.render_widget(
                Gauge::default()
                    .gauge_style(Style::default().fg(Color::Green))
                    .ratio(weight.clamp(0.0, 1.0))
                    .label(format!("{percent}%")),
                gauge_area,
            );
        }

        for (idx, (label, value, min, max)) in view.limits.iter().enumerate() {
            let row = view.weights.len() + idx;
            let style = if view.selected == row {
                SELECTED_STYLE
            } else {
                Style::default()
            };
            let line = Line::from(vec![
                Span::styled(format!("{label:<32}"), style),
                Span::raw(format!("◀ {value:>2} ▶")),
                Span::styled(format!("  ({min}-{max})"), Style::default().dim()),
            ]);
            frame.render_widget(Paragraph::new(line), areas[row]);
        }

        let distribution = view
            .distribution
            .iter()
            .map(|(label, percent)| format!("{label} {percent}%"))
            .collect::<Vec<String>>()
            .join("  ");
        let distribution_row = view.weights.len() + view.limits.len() + 1;
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("Distribution: ", Style::default().bold()),
                Span::raw(distribution),
            ])),
            areas[distribution_row],
        );

        let slots = view
            .time_slots
            .iter()
            .map(|(shift, slots)| {
                Line::from(vec![
                    Span::styled(format!("{shift:<10}"), Style::default().bold()),
                    Span::raw(slots.join("  ")),
                ])
            })
            .collect::<Vec<Line>>();
        frame.render_widget(
            Paragraph::new(slots).wrap(Wrap { trim: false }),
            areas[distribution_row + 2],
        );
    }

    fn render_scope(&self, view: &ScopeView, frame: &mut Frame, area: Rect) {
        frame.render_widget(Clear, area);
        let block = Block::default()
            .title(" Generation Scope ")
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [list_area, summary_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(2)]).areas(inner);

        let mut lines: Vec<Line> = Vec::new();
        let mut selected_line = 0;
        let mut section = "";
        for (idx, item) in view.items.iter().enumerate() {
            if item.section != section {
                section = item.section;
                lines.push(Line::from(Span::styled(section, HEADER_STYLE)));
            }
            if idx == view.selected {
                selected_line = lines.len();
            }
            let checkbox = if item.checked { "[x]" } else { "[ ]" };
            let style = if idx == view.selected {
                SELECTED_STYLE
            } else {
                Style::default()
            };
            lines.push(Line::from(vec![
                Span::styled(format!("  {checkbox} {}", item.label), style),
                Span::styled(format!("  {}", item.detail), Style::default().dim()),
            ]));
        }

        // Keep the selected entry on screen
        let height = list_area.height as usize;
        let scroll = (selected_line + 1).saturating_sub(height);
        trace!("Scope list scroll {scroll} for line {selected_line}");
        frame.render_widget(Paragraph::new(lines).scroll((scroll as u16, 0)), list_area);

        let ready = if view.ready {
            Span::styled("Ready", Style::default().fg(Color::Green).bold())
        } else {
            Span::styled("Not ready", Style::default().fg(Color::Red))
        };
        frame.render_widget(
            Paragraph::new(vec![
                Line::from(view.summary.as_str()).dim(),
                Line::from(ready),
            ]),
            summary_area,
        );
    }

    fn render_popup(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        frame.render_widget(Clear, area);
        let popup = Paragraph::new(uidata.popup_message.as_str())
            .block(
                Block::default()
                    .title(" Help ")
                    .title_alignment(Alignment::Center)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(popup, area);
    }
}

fn styled_cell(cell: &Cell) -> TableCell<'_> {
    match cell {
        Cell::Status { text, active: true } => {
            TableCell::from(text.as_str()).style(Style::default().fg(Color::Green).bold())
        }
        Cell::Status { text, active: false } => {
            TableCell::from(text.as_str()).style(Style::default().dim())
        }
        Cell::Monospace(text) => TableCell::from(Line::from(text.as_str()).right_aligned()),
        Cell::Plain(text) => TableCell::from(text.as_str()),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let width = (u32::from(r.width) * u32::from(percent_x) / 100) as u16;
    let height = (u32::from(r.height) * u32::from(percent_y) / 100) as u16;
    Rect {
        x: r.x + r.width.saturating_sub(width) / 2,
        y: r.y + r.height.saturating_sub(height) / 2,
        width,
        height,
    }
}
