use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::actions::{ActionOutcome, RowAction};
use crate::constraints::{
    Constraints, MAX_CLASSES_BATCH_RANGE, MAX_CLASSES_FACULTY_RANGE,
};
use crate::dataset::{Dataset, row_to_csv, view_to_csv};
use crate::domain::{CMDMode, ClassLimit, HELP_TEXT, Message, TTVConfig, TTVError};
use crate::inputter::{InputResult, Inputter};
use crate::pipeline::{Cell, ViewState, cell_text, present, view, view_indices};
use crate::scope::{Scope, ScopeCatalog};
use crate::ui::{
    CMDLINE_HEIGH, COLUMN_WIDTH_MARGIN, TAB_BAR_HEIGHT, TABLE_HEADER_HEIGHT, TITLE_HEIGHT,
};
use crate::weights::WeightKey;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    CONSTRAINTS,
    SCOPE,
    POPUP,
    CMDINPUT,
}

/// A dataset together with the state of its listing.
struct TableTab {
    dataset: Dataset,
    state: ViewState,
    rows: Vec<usize>, // Mapping of view row index to dataset row index
    widths: Vec<usize>,
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
}

impl TableTab {
    fn new(dataset: Dataset) -> Self {
        let mut tab = TableTab {
            dataset,
            state: ViewState::default(),
            rows: Vec::new(),
            widths: Vec::new(),
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
        };
        tab.refresh();
        tab
    }

    // Rerun the pipeline and keep the cursor inside the result
    fn refresh(&mut self) {
        self.rows = view_indices(&self.dataset.rows, &self.dataset.columns, &self.state);
        self.curser_row = self.curser_row.min(self.rows.len().saturating_sub(1));
        self.curser_column = self
            .curser_column
            .min(self.dataset.columns.len().saturating_sub(1));
    }

    fn calculate_column_widths(&mut self, max_column_width: usize) {
        self.widths = self
            .dataset
            .columns
            .iter()
            .map(|c| {
                let max_data = self
                    .dataset
                    .rows
                    .iter()
                    .map(|r| cell_text(r, &c.key).chars().count())
                    .max()
                    .unwrap_or(0);
                // Leave room for the sort arrow
                let header = c.label.chars().count() + 2;
                let width = std::cmp::max(header, max_data) + COLUMN_WIDTH_MARGIN;
                std::cmp::min(width, max_column_width)
            })
            .collect();
    }

    fn scroll_to_cursor(&mut self, height: usize) {
        if self.curser_row < self.offset_row {
            self.offset_row = self.curser_row;
        } else if height > 0 && self.curser_row >= self.offset_row + height {
            self.offset_row = self.curser_row + 1 - height;
        }
    }

    fn selected_data_row(&self) -> Option<usize> {
        self.rows.get(self.curser_row).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScopeEntry {
    Department(usize),
    Semester(usize),
    Shift(usize),
    Batch(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeaderView {
    pub label: String,
    pub marker: Option<&'static str>,
    pub sortable: bool,
    pub width: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstraintsView {
    pub weights: Vec<(String, u32, f64)>,
    pub limits: Vec<(String, u32, u32, u32)>, // label, value, min, max
    pub distribution: Vec<(String, u32)>,
    pub time_slots: Vec<(String, Vec<String>)>,
    pub selected: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScopeItemView {
    pub section: &'static str,
    pub label: String,
    pub detail: String,
    pub checked: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScopeView {
    pub items: Vec<ScopeItemView>,
    pub selected: usize,
    pub summary: String,
    pub ready: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Panel {
    Constraints(ConstraintsView),
    Scope(ScopeView),
}

pub struct UIData {
    pub tabs: Vec<String>,
    pub selected_tab: usize,
    pub name: String,
    pub description: String,
    pub header: Vec<HeaderView>,
    pub table: Vec<Vec<Cell>>,
    pub nrows: usize,       // Rows in the current view
    pub total_rows: usize,  // Rows in the dataset
    pub selected_row: usize, // Relative to the first rendered row
    pub selected_column: usize,
    pub affordances: Vec<RowAction>,
    pub panel: Option<Panel>,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            tabs: Vec::new(),
            selected_tab: 0,
            name: String::new(),
            description: String::new(),
            header: Vec::new(),
            table: Vec::new(),
            nrows: 0,
            total_rows: 0,
            selected_row: 0,
            selected_column: 0,
            affordances: Vec::new(),
            panel: None,
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let table_height = ui_height
            .saturating_sub(TAB_BAR_HEIGHT)
            .saturating_sub(TITLE_HEIGHT)
            .saturating_sub(TABLE_HEADER_HEIGHT)
            .saturating_sub(CMDLINE_HEIGH);

        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_height,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: TTVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    tabs: Vec<TableTab>,
    current_tab: usize,
    constraints: Constraints,
    constraints_curser: usize,
    catalog: ScopeCatalog,
    scope: Scope,
    scope_curser: usize,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
    last_status_message_update: Instant,
}

// Three weights followed by the two class load limits
const CONSTRAINT_ROWS: usize = 5;

impl Model {
    pub fn init(
        config: &TTVConfig,
        datasets: Vec<Dataset>,
        ui_width: usize,
        ui_height: usize,
    ) -> Result<Self, TTVError> {
        if datasets.is_empty() {
            return Err(TTVError::LoadingFailed("Nothing to show!".into()));
        }

        let mut tabs: Vec<TableTab> = datasets.into_iter().map(TableTab::new).collect();
        for tab in tabs.iter_mut() {
            tab.calculate_column_widths(config.max_column_width);
            if let Some((key, dir)) = &config.initial_sort
                && tab.dataset.columns.iter().any(|c| c.sortable && c.key == *key)
            {
                tab.state = tab.state.sorted_by(key.as_str(), *dir);
                tab.refresh();
            }
        }

        let mut constraints = Constraints::default();
        for (key, percent) in config.weights.iter() {
            constraints = constraints.with_weight(*key, *percent);
        }

        let clipboard = match Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Clipboard not available: {e}");
                None
            }
        };

        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            tabs,
            current_tab: 0,
            constraints,
            constraints_curser: 0,
            catalog: ScopeCatalog::default(),
            scope: Scope::default(),
            scope_curser: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: "Started ttv!".to_string(),
            last_status_message_update: Instant::now(),
        };
        model.update_table_data();
        Ok(model)
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn tab(&self) -> &TableTab {
        &self.tabs[self.current_tab]
    }

    fn tab_mut(&mut self) -> &mut TableTab {
        &mut self.tabs[self.current_tab]
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_status_message_update = self.last_status_message_update;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TTVError> {
        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_table_selection_down(1),
                    Message::MoveUp => self.move_table_selection_up(1),
                    Message::MoveLeft => self.move_table_selection_left(),
                    Message::MoveRight => self.move_table_selection_right(),
                    Message::MovePageUp => self.move_table_selection_up(self.uilayout.table_height),
                    Message::MovePageDown => {
                        self.move_table_selection_down(self.uilayout.table_height)
                    }
                    Message::MoveBeginning => self.move_table_selection_beginning(),
                    Message::MoveEnd => self.move_table_selection_end(),
                    Message::NextTab => self.select_tab(1),
                    Message::PrevTab => self.select_tab(-1),
                    Message::Search => self.enter_cmd_mode(CMDMode::Search),
                    Message::ToggleSort => self.toggle_sort(),
                    Message::Edit => self.apply_row_action(RowAction::Edit),
                    Message::Delete => self.apply_row_action(RowAction::Delete),
                    Message::CopyRow => self.copy_table_row(),
                    Message::CopyView => self.copy_table_view(),
                    Message::Constraints => self.open_panel(Modus::CONSTRAINTS),
                    Message::Scope => self.open_panel(Modus::SCOPE),
                    Message::Help => self.show_help(),
                    Message::Exit => self.clear_search(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::CONSTRAINTS => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_constraints_selection(1),
                    Message::MoveUp => self.move_constraints_selection(-1),
                    Message::MoveLeft => self.step_constraint(-1),
                    Message::MoveRight => self.step_constraint(1),
                    Message::Enter => self.edit_class_limit(),
                    Message::Scope => self.open_panel(Modus::SCOPE),
                    Message::Help => self.show_help(),
                    Message::Exit | Message::Constraints => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::SCOPE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_scope_selection(1),
                    Message::MoveUp => self.move_scope_selection(-1),
                    Message::Toggle | Message::Enter => self.toggle_scope_entry(),
                    Message::Constraints => self.open_panel(Modus::CONSTRAINTS),
                    Message::Help => self.show_help(),
                    Message::Exit | Message::Scope => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit | Message::Help => self.exit(),
                    _ => (),
                },
                Modus::CMDINPUT => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }
        Ok(())
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.update_table_data();
    }

    // -------------------- Table ---------------------- //

    fn update_table_data(&mut self) {
        let height = self.uilayout.table_height;
        let tab = &mut self.tabs[self.current_tab];
        tab.scroll_to_cursor(height);

        let rbegin = tab.offset_row;
        let rend = std::cmp::min(rbegin + height, tab.rows.len());
        let columns = &tab.dataset.columns;

        let table = tab.rows[rbegin.min(rend)..rend]
            .iter()
            .map(|&ridx| present(&tab.dataset.rows[ridx], columns))
            .collect::<Vec<Vec<Cell>>>();

        let header = columns
            .iter()
            .zip(tab.widths.iter())
            .map(|(c, &width)| HeaderView {
                label: c.label.clone(),
                marker: tab.state.sort_marker(&c.key),
                sortable: c.sortable,
                width,
            })
            .collect::<Vec<HeaderView>>();

        trace!(
            "Table {}: Cr {}, Cc {}, Or {}, Rb {}, Re {}, th {}",
            tab.dataset.name,
            tab.curser_row,
            tab.curser_column,
            tab.offset_row,
            rbegin,
            rend,
            height
        );

        let panel = match self.modus {
            Modus::CONSTRAINTS => Some(Panel::Constraints(self.build_constraints_view())),
            Modus::SCOPE => Some(Panel::Scope(self.build_scope_view())),
            Modus::POPUP | Modus::CMDINPUT => match self.previous_modus {
                Modus::CONSTRAINTS => Some(Panel::Constraints(self.build_constraints_view())),
                Modus::SCOPE => Some(Panel::Scope(self.build_scope_view())),
                _ => None,
            },
            Modus::TABLE => None,
        };

        let tab = self.tab();
        self.uidata = UIData {
            tabs: self.tabs.iter().map(|t| t.dataset.name.clone()).collect(),
            selected_tab: self.current_tab,
            name: tab.dataset.name.clone(),
            description: tab.dataset.description.clone(),
            header,
            table,
            nrows: tab.rows.len(),
            total_rows: tab.dataset.rows.len(),
            selected_row: tab.curser_row - tab.offset_row,
            selected_column: tab.curser_column,
            affordances: tab.dataset.actions.available(),
            panel,
            show_popup: self.modus == Modus::POPUP,
            popup_message: self.uidata.popup_message.clone(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        };
    }

    fn select_tab(&mut self, step: i32) {
        let ntabs = self.tabs.len() as i32;
        self.current_tab = (self.current_tab as i32 + step).rem_euclid(ntabs) as usize;
        let name = self.tab().dataset.name.clone();
        self.set_status_message(name);
        self.update_table_data();
    }

    fn toggle_sort(&mut self) {
        let tab = self.tab_mut();
        let Some(column) = tab.dataset.columns.get(tab.curser_column) else {
            return;
        };
        if !column.sortable {
            let label = column.label.clone();
            self.set_status_message(format!("{label} can not be sorted"));
            return;
        }

        // Keep the selected record under the cursor
        let selected = tab.selected_data_row();
        tab.state = tab.state.toggle_sort(column);
        tab.refresh();
        if let Some(data_idx) = selected {
            tab.curser_row = tab.rows.iter().position(|&r| r == data_idx).unwrap_or(0);
        }
        let message = format!(
            "Sorted by {} {}",
            tab.dataset.columns[tab.curser_column].label,
            tab.state.sort_dir.arrow()
        );
        debug!("{message}");
        self.set_status_message(message);
        self.update_table_data();
    }

    fn search(&mut self, term: &str) {
        let start_time = Instant::now();
        let tab = self.tab_mut();
        tab.state = tab.state.with_search(term);
        tab.refresh();
        tab.curser_row = 0;
        tab.offset_row = 0;
        let (found, total) = (tab.rows.len(), tab.dataset.rows.len());
        trace!(
            "Search for {:?} found {} of {} rows in {}us",
            term,
            found,
            total,
            start_time.elapsed().as_micros()
        );
        if found == 0 {
            self.set_status_message("No data found");
        } else {
            self.set_status_message(format!("Found {found} of {total}"));
        }
        self.update_table_data();
    }

    fn clear_search(&mut self) {
        if !self.tab().state.search.is_empty() {
            self.search("");
        }
    }

    fn apply_row_action(&mut self, action: RowAction) {
        let tab = &mut self.tabs[self.current_tab];
        if !tab.dataset.actions.supports(action) {
            let message = format!("Can not {action} rows of {}", tab.dataset.name);
            self.set_status_message(message);
            return;
        }
        let Some(data_idx) = tab.selected_data_row() else {
            self.set_status_message("No row selected");
            return;
        };

        let message = match tab.dataset.actions.apply(action, &tab.dataset.rows[data_idx]) {
            ActionOutcome::Edited(message) => message,
            ActionOutcome::Removed => {
                let id = cell_text(&tab.dataset.rows[data_idx], "id");
                tab.dataset.rows.remove(data_idx);
                tab.refresh();
                tab.calculate_column_widths(self.config.max_column_width);
                format!("Deleted {id}")
            }
            ActionOutcome::Unsupported => format!("Can not {action} this row"),
        };
        info!("{message}");
        self.set_status_message(message);
        self.update_table_data();
    }

    fn copy_to_clipboard(&mut self, content: String, what: &str) {
        let message = match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(content) {
                Ok(_) => format!("Copied {what} to clipboard"),
                Err(e) => {
                    warn!("Error copying to clipboard: {:?}", e);
                    "Copying to clipboard failed".to_string()
                }
            },
            None => "Clipboard not available".to_string(),
        };
        self.set_status_message(message);
    }

    fn copy_table_row(&mut self) {
        let tab = self.tab();
        if let Some(data_idx) = tab.selected_data_row() {
            let content = row_to_csv(&tab.dataset.rows[data_idx], &tab.dataset.columns);
            trace!("Row content: {}", content);
            self.copy_to_clipboard(content, "row");
        }
    }

    fn copy_table_view(&mut self) {
        let tab = self.tab();
        let rows = view(&tab.dataset.rows, &tab.dataset.columns, &tab.state);
        let content = view_to_csv(&rows, &tab.dataset.columns);
        let what = format!("{} rows", rows.len());
        self.copy_to_clipboard(content, &what);
    }

    fn move_table_selection_beginning(&mut self) {
        let tab = self.tab_mut();
        tab.curser_row = 0;
        tab.offset_row = 0;
        self.update_table_data();
    }

    fn move_table_selection_end(&mut self) {
        let tab = self.tab_mut();
        tab.curser_row = tab.rows.len().saturating_sub(1);
        self.update_table_data();
    }

    fn move_table_selection_up(&mut self, size: usize) {
        let tab = self.tab_mut();
        tab.curser_row = tab.curser_row.saturating_sub(size.max(1));
        self.update_table_data();
    }

    fn move_table_selection_down(&mut self, size: usize) {
        let tab = self.tab_mut();
        let last = tab.rows.len().saturating_sub(1);
        tab.curser_row = std::cmp::min(tab.curser_row + size.max(1), last);
        self.update_table_data();
    }

    fn move_table_selection_left(&mut self) {
        let tab = self.tab_mut();
        tab.curser_column = tab.curser_column.saturating_sub(1);
        self.update_table_data();
    }

    fn move_table_selection_right(&mut self) {
        let tab = self.tab_mut();
        if tab.curser_column + 1 < tab.dataset.columns.len() {
            tab.curser_column += 1;
        }
        self.update_table_data();
    }

    // -------------------- Panels ---------------------- //

    fn open_panel(&mut self, modus: Modus) {
        trace!("Open panel {:?}", modus);
        self.modus = modus;
        self.previous_modus = Modus::TABLE;
        self.update_table_data();
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::TABLE => {}
            Modus::CONSTRAINTS | Modus::SCOPE => {
                self.previous_modus = self.modus;
                self.modus = Modus::TABLE;
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
            }
            Modus::CMDINPUT => {}
        }
        self.update_table_data();
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.update_table_data();
    }

    fn build_constraints_view(&self) -> ConstraintsView {
        let c = &self.constraints;
        ConstraintsView {
            weights: WeightKey::ALL
                .iter()
                .map(|&k| {
                    (
                        k.label().to_string(),
                        c.weights.rounded_percent(k),
                        c.weights.get(k),
                    )
                })
                .collect(),
            limits: vec![
                (
                    "Max Classes per Day (Batch)".to_string(),
                    c.max_classes_per_day_batch,
                    *MAX_CLASSES_BATCH_RANGE.start(),
                    *MAX_CLASSES_BATCH_RANGE.end(),
                ),
                (
                    "Max Classes per Day (Faculty)".to_string(),
                    c.max_classes_per_day_faculty,
                    *MAX_CLASSES_FACULTY_RANGE.start(),
                    *MAX_CLASSES_FACULTY_RANGE.end(),
                ),
            ],
            distribution: WeightKey::ALL
                .iter()
                .map(|&k| (k.short_label().to_string(), c.weights.rounded_percent(k)))
                .collect(),
            time_slots: c
                .time_slots
                .numbered()
                .into_iter()
                .map(|(shift, slots)| {
                    (
                        shift.to_string(),
                        slots
                            .into_iter()
                            .map(|(n, t)| format!("{n}. {t}"))
                            .collect(),
                    )
                })
                .collect(),
            selected: self.constraints_curser,
        }
    }

    fn move_constraints_selection(&mut self, step: i32) {
        let next = self.constraints_curser as i32 + step;
        self.constraints_curser = next.clamp(0, CONSTRAINT_ROWS as i32 - 1) as usize;
        self.update_table_data();
    }

    fn step_constraint(&mut self, step: i32) {
        self.constraints = match self.constraints_curser {
            idx if idx < WeightKey::ALL.len() => {
                let key = WeightKey::ALL[idx];
                let constraints = self.constraints.step_weight(key, step);
                debug!("Weights after stepping {key}: {:?}", constraints.weights);
                constraints
            }
            3 => self.constraints.step_max_classes_batch(step),
            _ => self.constraints.step_max_classes_faculty(step),
        };
        self.update_table_data();
    }

    fn edit_class_limit(&mut self) {
        match self.constraints_curser {
            3 => self.enter_cmd_mode(CMDMode::ClassLimit(ClassLimit::Batch)),
            4 => self.enter_cmd_mode(CMDMode::ClassLimit(ClassLimit::Faculty)),
            _ => {}
        }
    }

    fn scope_entries(&self) -> Vec<ScopeEntry> {
        let catalog = &self.catalog;
        let departments = (0..catalog.departments.len()).map(ScopeEntry::Department);
        let semesters = (0..catalog.semesters.len()).map(ScopeEntry::Semester);
        let shifts = (0..catalog.shifts.len()).map(ScopeEntry::Shift);
        let batches = catalog
            .batches
            .iter()
            .enumerate()
            .filter(|(_, b)| self.scope.departments.contains(&b.department))
            .map(|(idx, _)| ScopeEntry::Batch(idx));
        departments
            .chain(semesters)
            .chain(shifts)
            .chain(batches)
            .collect()
    }

    fn build_scope_view(&self) -> ScopeView {
        let catalog = &self.catalog;
        let scope = &self.scope;
        let items = self
            .scope_entries()
            .into_iter()
            .map(|entry| match entry {
                ScopeEntry::Department(i) => {
                    let d = &catalog.departments[i];
                    ScopeItemView {
                        section: "Departments",
                        label: d.name.clone(),
                        detail: format!("{} batches, {} faculty", d.batches, d.faculty),
                        checked: scope.departments.contains(&d.id),
                    }
                }
                ScopeEntry::Semester(i) => {
                    let s = &catalog.semesters[i];
                    ScopeItemView {
                        section: "Semesters",
                        label: s.name.clone(),
                        detail: if s.active { "Active".into() } else { String::new() },
                        checked: scope.semesters.contains(&s.id),
                    }
                }
                ScopeEntry::Shift(i) => {
                    let s = &catalog.shifts[i];
                    ScopeItemView {
                        section: "Shifts",
                        label: s.name.clone(),
                        detail: s.time.clone(),
                        checked: scope.shifts.contains(&s.id),
                    }
                }
                ScopeEntry::Batch(i) => {
                    let b = &catalog.batches[i];
                    ScopeItemView {
                        section: "Batches",
                        label: b.name.clone(),
                        detail: format!("{} students, {}", b.students, b.year),
                        checked: scope.batches.contains(&b.id),
                    }
                }
            })
            .collect();

        let summary = if scope.departments.is_empty() {
            "Select departments first to see available batches".to_string()
        } else {
            format!(
                "{} departments, {} semesters, {} shifts, {} of {} batches, {} students",
                scope.departments.len(),
                scope.semesters.len(),
                scope.shifts.len(),
                scope.batches.len(),
                scope.available_batches(catalog).len(),
                scope.student_count(catalog)
            )
        };

        ScopeView {
            items,
            selected: self.scope_curser,
            summary,
            ready: scope.is_ready(),
        }
    }

    fn move_scope_selection(&mut self, step: i32) {
        let n = self.scope_entries().len() as i32;
        let next = self.scope_curser as i32 + step;
        self.scope_curser = next.clamp(0, (n - 1).max(0)) as usize;
        self.update_table_data();
    }

    fn toggle_scope_entry(&mut self) {
        let Some(entry) = self.scope_entries().get(self.scope_curser).copied() else {
            return;
        };
        let catalog = &self.catalog;
        let scope = &self.scope;
        self.scope = match entry {
            ScopeEntry::Department(i) => {
                let id = &catalog.departments[i].id;
                scope.toggle_department(catalog, id, !scope.departments.contains(id))
            }
            ScopeEntry::Semester(i) => {
                let id = &catalog.semesters[i].id;
                scope.toggle_semester(id, !scope.semesters.contains(id))
            }
            ScopeEntry::Shift(i) => {
                let id = &catalog.shifts[i].id;
                scope.toggle_shift(id, !scope.shifts.contains(id))
            }
            ScopeEntry::Batch(i) => {
                let id = &catalog.batches[i].id;
                scope.toggle_batch(id, !scope.batches.contains(id))
            }
        };
        // Deselecting a department can shrink the list below the cursor
        let n = self.scope_entries().len();
        self.scope_curser = self.scope_curser.min(n.saturating_sub(1));
        if self.scope.is_ready() {
            self.set_status_message("Scope is ready for generation");
        } else {
            self.set_status_message("Select at least one department and batch");
        }
        self.update_table_data();
    }

    // -------------------- Command input ---------------------- //

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {:?} ...", mode);
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;

        match mode {
            CMDMode::Search => {
                let current = self.tab().state.search.clone();
                self.input.set(&current);
            }
            CMDMode::ClassLimit(_) => self.input.clear(),
        }
        self.last_input = self.input.get();
        self.update_table_data();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if !self.active_cmdinput {
            return;
        }
        self.last_input = self.input.read(key);
        // Search runs on every keystroke
        if self.cmd_mode == Some(CMDMode::Search) && self.last_input.changed {
            let term = self.last_input.input.clone();
            self.search(&term);
        }
        if self.last_input.finished {
            self.handle_cmd_input();
        }
        self.update_table_data();
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {:?}", self.last_input);
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let input = self.last_input.clone();
        match self.cmd_mode {
            Some(CMDMode::Search) => {
                if input.canceled {
                    self.search("");
                }
            }
            Some(CMDMode::ClassLimit(limit)) => {
                if !input.canceled {
                    self.constraints = match limit {
                        ClassLimit::Batch => self.constraints.set_max_classes_batch(&input.input),
                        ClassLimit::Faculty => {
                            self.constraints.set_max_classes_faculty(&input.input)
                        }
                    };
                }
            }
            None => {
                info!("Cmd mode is none!")
            }
        }
        self.cmd_mode = None;
        self.input.clear();
        self.last_input = InputResult::default();
    }
}
