use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::catalog::{Order, Product};
use crate::columns::{Record, ValueKind};
use crate::domain::{DashConfig, HELP_TEXT, Message};
use crate::engine::{PAGE_SIZES, SortDirection, TableEngine};
use crate::inputter::{InputResult, Inputter};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen {
    Products,
    Orders,
}

impl Screen {
    fn title(&self) -> &'static str {
        match self {
            Screen::Products => "Products",
            Screen::Orders => "Orders",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    RECORD,
    COLUMNMENU,
    FILTERINPUT,
    POPUP,
}

/// Rendered snapshot of one column: header plus the current page's cells.
#[derive(Clone)]
pub struct UiColumn {
    pub key: String,
    pub label: String,
    pub width: usize,
    pub numeric: bool,
    pub cells: Vec<String>,
    pub sort: Option<(SortDirection, usize)>,
}

/// Column-major, ready-to-paint projection of the active engine's view.
#[derive(Clone, Default)]
pub struct UiTable {
    pub columns: Vec<UiColumn>,
    pub page_index: usize,
    pub page_size: usize,
    pub total_filtered: usize,
    pub total_pages: usize,
    pub filter_pending: bool,
}

/// The view-engine surface the model needs, independent of the record type
/// behind it. Lets one screen switch between the product and order engines.
pub trait EngineOps {
    fn set_text_filter(&mut self, value: &str, now: Instant);
    fn tick(&mut self, now: Instant) -> bool;
    fn apply_filter_now(&mut self, value: &str);
    fn cancel_pending_filter(&mut self);
    fn filter_value(&self) -> Option<&str>;
    fn set_sort(&mut self, key: &str, direction: Option<SortDirection>);
    fn clear_sort(&mut self);
    fn sort_of(&self, key: &str) -> Option<(SortDirection, usize)>;
    fn toggle_column_visibility(&mut self, key: &str, visible: bool);
    fn is_visible(&self, key: &str) -> bool;
    fn set_page(&mut self, index: usize);
    fn set_page_size(&mut self, size: usize);
    fn page_size(&self) -> usize;
    fn hideable_columns(&self) -> Vec<(String, String, bool)>;
    fn derived_len(&self) -> usize;
    fn ui_table(&self) -> UiTable;
    fn activate_id(&self, page_row: usize) -> Option<String>;
    fn record_fields(&self, derived_row: usize) -> Option<(String, Vec<(String, String)>)>;
}

impl<R: Record> EngineOps for TableEngine<R> {
    fn set_text_filter(&mut self, value: &str, now: Instant) {
        TableEngine::set_text_filter(self, value, now);
    }

    fn tick(&mut self, now: Instant) -> bool {
        TableEngine::tick(self, now)
    }

    fn apply_filter_now(&mut self, value: &str) {
        let key = self.default_filter_column().to_string();
        self.apply_filter(key, value);
    }

    fn cancel_pending_filter(&mut self) {
        TableEngine::cancel_pending_filter(self);
    }

    fn filter_value(&self) -> Option<&str> {
        TableEngine::filter_value(self)
    }

    fn set_sort(&mut self, key: &str, direction: Option<SortDirection>) {
        TableEngine::set_sort(self, key, direction);
    }

    fn clear_sort(&mut self) {
        TableEngine::clear_sort(self);
    }

    fn sort_of(&self, key: &str) -> Option<(SortDirection, usize)> {
        TableEngine::sort_of(self, key)
    }

    fn toggle_column_visibility(&mut self, key: &str, visible: bool) {
        TableEngine::toggle_column_visibility(self, key, visible);
    }

    fn is_visible(&self, key: &str) -> bool {
        TableEngine::is_visible(self, key)
    }

    fn set_page(&mut self, index: usize) {
        TableEngine::set_page(self, index);
    }

    fn set_page_size(&mut self, size: usize) {
        TableEngine::set_page_size(self, size);
    }

    fn page_size(&self) -> usize {
        TableEngine::page_size(self)
    }

    fn hideable_columns(&self) -> Vec<(String, String, bool)> {
        self.columns()
            .iter()
            .filter(|c| c.hideable)
            .map(|c| (c.key.to_string(), c.label.to_string(), self.is_visible(c.key)))
            .collect()
    }

    fn derived_len(&self) -> usize {
        TableEngine::derived_len(self)
    }

    fn ui_table(&self) -> UiTable {
        let view = self.view();
        let columns = view
            .columns
            .iter()
            .map(|col| {
                let cells: Vec<String> = view
                    .rows
                    .iter()
                    .map(|r| col.render(&r.value(col.key)))
                    .collect();
                let width = cells
                    .iter()
                    .map(|c| c.chars().count())
                    .chain(std::iter::once(col.label.chars().count()))
                    .max()
                    .unwrap_or(0);
                UiColumn {
                    key: col.key.to_string(),
                    label: col.label.to_string(),
                    width,
                    numeric: matches!(col.kind, ValueKind::Number),
                    cells,
                    sort: self.sort_of(col.key),
                }
            })
            .collect();

        UiTable {
            columns,
            page_index: view.page_index,
            page_size: view.page_size,
            total_filtered: view.total_filtered,
            total_pages: view.total_pages,
            filter_pending: view.filter_pending,
        }
    }

    fn activate_id(&self, page_row: usize) -> Option<String> {
        let mut id = None;
        self.activate(page_row, |record| id = Some(record.id().to_string()));
        id
    }

    fn record_fields(&self, derived_row: usize) -> Option<(String, Vec<(String, String)>)> {
        let record = self.derived_record(derived_row)?;
        let fields = self
            .columns()
            .iter()
            .map(|col| (col.label.to_string(), col.render(&record.value(col.key))))
            .collect();
        Some((record.id().to_string(), fields))
    }
}

/// Everything ui.rs needs for one frame.
pub struct UIData {
    pub title: String,
    pub table: UiTable,
    pub selected_row: usize,
    pub selected_column: usize,
    pub detail: Option<DetailData>,
    pub menu: Option<MenuData>,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

pub struct DetailData {
    pub record_id: String,
    pub fields: Vec<(String, String)>,
    pub position: usize,
    pub total: usize,
}

pub struct MenuData {
    pub entries: Vec<(String, bool)>,
    pub cursor: usize,
}

pub struct Model {
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    screen: Screen,
    products: TableEngine<Product>,
    orders: TableEngine<Order>,
    cursor_row: usize,
    cursor_column: usize,
    detail_idx: usize,
    menu_cursor: usize,
    clipboard: Option<Clipboard>,
    input: Inputter,
    last_input: InputResult,
    filter_before_edit: String,
    uidata: UIData,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(
        config: &DashConfig,
        mut products: TableEngine<Product>,
        mut orders: TableEngine<Order>,
    ) -> Self {
        products.set_page_size(config.page_size);
        orders.set_page_size(config.page_size);
        // Seed the product filter from the query argument, the way the
        // page would read it from its URL.
        if let Some(q) = &config.query {
            EngineOps::apply_filter_now(&mut products, q);
        }

        let mut model = Self {
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            screen: Screen::Products,
            products,
            orders,
            cursor_row: 0,
            cursor_column: 0,
            detail_idx: 0,
            menu_cursor: 0,
            clipboard: Clipboard::new().ok(),
            input: Inputter::default(),
            last_input: InputResult::default(),
            filter_before_edit: String::new(),
            uidata: UIData {
                title: String::new(),
                table: UiTable::default(),
                selected_row: 0,
                selected_column: 0,
                detail: None,
                menu: None,
                show_popup: false,
                popup_message: String::new(),
                cmdinput: InputResult::default(),
                active_cmdinput: false,
                status_message: String::new(),
                last_status_message_update: Instant::now(),
            },
            status_message: "Started shopdash".to_string(),
            last_status_message_update: Instant::now(),
        };
        model.refresh();
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::FILTERINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn active_engine(&mut self) -> &mut dyn EngineOps {
        match self.screen {
            Screen::Products => &mut self.products,
            Screen::Orders => &mut self.orders,
        }
    }

    fn engine_ref(&self) -> &dyn EngineOps {
        match self.screen {
            Screen::Products => &self.products,
            Screen::Orders => &self.orders,
        }
    }

    /// Drives the debounce schedules; called once per event-loop iteration.
    /// Returns whether the derived view changed.
    pub fn tick(&mut self) -> bool {
        let now = Instant::now();
        let changed = self.products.tick(now) | self.orders.tick(now);
        if changed {
            let (shown, total) = {
                let e = self.engine_ref();
                (e.derived_len(), self.uidata.table.total_filtered)
            };
            trace!("Debounced filter applied ({} -> {} rows)", total, shown);
            self.set_status_message(format!("{shown} matching rows"));
            self.refresh();
        }
        changed
    }

    pub fn update(&mut self, message: Message) {
        trace!("Update: modus {:?}, message {:?}", self.modus, message);
        match self.modus {
            Modus::TABLE => match message {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_selection(-1),
                Message::MoveDown => self.move_selection(1),
                Message::MoveLeft => self.move_column(-1),
                Message::MoveRight => self.move_column(1),
                Message::NextPage => self.step_page(1),
                Message::PrevPage => self.step_page(-1),
                Message::FirstPage => self.jump_page(0),
                Message::LastPage => self.jump_page(usize::MAX),
                Message::GrowPageSize => self.cycle_page_size(1),
                Message::ShrinkPageSize => self.cycle_page_size(-1),
                Message::CycleSort => self.cycle_sort(true),
                Message::CycleTieBreak => self.cycle_sort(false),
                Message::ColumnMenu => self.open_column_menu(),
                Message::Filter => self.open_filter_input(),
                Message::SwitchScreen => self.switch_screen(),
                Message::CopyCell => self.copy_cell(),
                Message::CopyRow => self.copy_row(),
                Message::Enter => self.open_detail(),
                Message::Help => self.show_help(),
                Message::Resize(..) => self.refresh(),
                _ => (),
            },
            Modus::RECORD => match message {
                Message::Quit => self.quit(),
                Message::MoveLeft => self.step_detail(-1),
                Message::MoveRight => self.step_detail(1),
                Message::Help => self.show_help(),
                Message::Resize(..) => self.refresh(),
                Message::Exit => self.close_overlay(),
                _ => (),
            },
            Modus::COLUMNMENU => match message {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_menu_cursor(-1),
                Message::MoveDown => self.move_menu_cursor(1),
                Message::Toggle | Message::Enter => self.toggle_menu_entry(),
                Message::Resize(..) => self.refresh(),
                Message::Exit | Message::ColumnMenu => self.close_overlay(),
                _ => (),
            },
            Modus::FILTERINPUT => {
                if let Message::RawKey(key) = message {
                    self.filter_input(key);
                }
            }
            Modus::POPUP => match message {
                Message::Quit => self.quit(),
                Message::Resize(..) => self.refresh(),
                Message::Exit | Message::Enter | Message::Help => self.close_overlay(),
                _ => (),
            },
        }
    }

    // -------------------- message handlers ---------------------- //

    fn move_selection(&mut self, step: isize) {
        let rows = self.uidata.table.columns.first().map_or(0, |c| c.cells.len());
        if rows == 0 {
            return;
        }
        let row = self.cursor_row as isize + step;
        self.cursor_row = row.clamp(0, rows as isize - 1) as usize;
        self.refresh();
    }

    fn move_column(&mut self, step: isize) {
        let cols = self.uidata.table.columns.len();
        if cols == 0 {
            return;
        }
        let col = self.cursor_column as isize + step;
        self.cursor_column = col.clamp(0, cols as isize - 1) as usize;
        self.refresh();
    }

    fn step_page(&mut self, step: isize) {
        let current = self.uidata.table.page_index as isize;
        let target = (current + step).max(0) as usize;
        self.active_engine().set_page(target);
        self.cursor_row = 0;
        self.refresh();
    }

    fn jump_page(&mut self, index: usize) {
        self.active_engine().set_page(index);
        self.cursor_row = 0;
        self.refresh();
    }

    fn cycle_page_size(&mut self, step: isize) {
        let current = self.engine_ref().page_size();
        let pos = PAGE_SIZES.iter().position(|&s| s == current).unwrap_or(0);
        let next = (pos as isize + step).clamp(0, PAGE_SIZES.len() as isize - 1) as usize;
        self.active_engine().set_page_size(PAGE_SIZES[next]);
        self.cursor_row = 0;
        self.set_status_message(format!("Page size {}", PAGE_SIZES[next]));
        self.refresh();
    }

    // `primary` resets the spec to the selected column; otherwise the
    // column joins (or cycles within) the tie-break order.
    fn cycle_sort(&mut self, primary: bool) {
        let Some(key) = self.selected_column_key() else {
            return;
        };
        let current = self.engine_ref().sort_of(&key).map(|(dir, _)| dir);
        let next = match current {
            None => Some(SortDirection::Ascending),
            Some(SortDirection::Ascending) => Some(SortDirection::Descending),
            Some(SortDirection::Descending) => None,
        };
        let engine = self.active_engine();
        if primary && current.is_none() {
            engine.clear_sort();
        }
        engine.set_sort(&key, next);
        match next {
            Some(SortDirection::Ascending) => {
                self.set_status_message(format!("Sort {key} ascending"))
            }
            Some(SortDirection::Descending) => {
                self.set_status_message(format!("Sort {key} descending"))
            }
            None => self.set_status_message(format!("Sort {key} off")),
        }
        self.refresh();
    }

    fn selected_column_key(&self) -> Option<String> {
        self.uidata
            .table
            .columns
            .get(self.cursor_column)
            .map(|c| c.key.clone())
    }

    fn open_column_menu(&mut self) {
        self.menu_cursor = 0;
        self.previous_modus = self.modus;
        self.modus = Modus::COLUMNMENU;
        self.refresh();
    }

    fn move_menu_cursor(&mut self, step: isize) {
        let entries = self.engine_ref().hideable_columns().len();
        if entries == 0 {
            return;
        }
        let pos = self.menu_cursor as isize + step;
        self.menu_cursor = pos.clamp(0, entries as isize - 1) as usize;
        self.refresh();
    }

    fn toggle_menu_entry(&mut self) {
        let entries = self.engine_ref().hideable_columns();
        if let Some((key, _, visible)) = entries.get(self.menu_cursor).cloned() {
            self.active_engine().toggle_column_visibility(&key, !visible);
            self.refresh();
        }
    }

    fn open_filter_input(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::FILTERINPUT;
        self.filter_before_edit = self
            .engine_ref()
            .filter_value()
            .unwrap_or_default()
            .to_string();
        self.input.clear();
        self.input.set(&self.filter_before_edit);
        self.last_input = self.input.get();
        self.refresh();
    }

    fn filter_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        let result = self.last_input.clone();
        if result.finished {
            self.modus = self.previous_modus;
            self.previous_modus = Modus::FILTERINPUT;
            let engine = self.active_engine();
            engine.cancel_pending_filter();
            if result.canceled {
                // Restore what was applied before the edit started.
                let before = self.filter_before_edit.clone();
                self.active_engine().apply_filter_now(&before);
            } else {
                // Commit immediately, skipping the rest of the window.
                self.active_engine().apply_filter_now(&result.input);
                let shown = self.engine_ref().derived_len();
                self.set_status_message(format!("{shown} matching rows"));
            }
            self.cursor_row = 0;
        } else {
            // Live value: apply after quiescence, last write wins.
            self.active_engine()
                .set_text_filter(&result.input, Instant::now());
        }
        self.refresh();
    }

    fn switch_screen(&mut self) {
        self.screen = match self.screen {
            Screen::Products => Screen::Orders,
            Screen::Orders => Screen::Products,
        };
        self.cursor_row = 0;
        self.cursor_column = 0;
        info!("Switched to {} screen", self.screen.title());
        self.refresh();
    }

    fn open_detail(&mut self) {
        let table = &self.uidata.table;
        let derived_row = table.page_index * table.page_size + self.cursor_row;
        // Navigate by record id so filter/sort reordering cannot misaddress.
        match self.engine_ref().activate_id(self.cursor_row) {
            Some(id) => {
                debug!("Activated record {id}");
                self.detail_idx = derived_row;
                self.previous_modus = self.modus;
                self.modus = Modus::RECORD;
                self.refresh();
            }
            None => trace!("Activation on empty page ignored"),
        }
    }

    fn step_detail(&mut self, step: isize) {
        let total = self.engine_ref().derived_len();
        if total == 0 {
            return;
        }
        let idx = self.detail_idx as isize + step;
        self.detail_idx = idx.clamp(0, total as isize - 1) as usize;
        self.refresh();
    }

    fn close_overlay(&mut self) {
        let from = self.modus;
        self.modus = Modus::TABLE;
        self.previous_modus = from;
        self.refresh();
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.refresh();
    }

    fn copy_cell(&mut self) {
        let Some(cell) = self
            .uidata
            .table
            .columns
            .get(self.cursor_column)
            .and_then(|c| c.cells.get(self.cursor_row))
            .cloned()
        else {
            return;
        };
        self.copy_to_clipboard(cell, "Copied cell");
    }

    fn copy_row(&mut self) {
        let table = &self.uidata.table;
        if table.columns.first().is_none_or(|c| c.cells.is_empty()) {
            return;
        }
        let row = table
            .columns
            .iter()
            .filter_map(|c| c.cells.get(self.cursor_row))
            .map(|c| Self::wrap_cell_content(c))
            .collect::<Vec<String>>()
            .join(",");
        self.copy_to_clipboard(row, "Copied row");
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace("\"", "\"\"");
        }
        if needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn copy_to_clipboard(&mut self, content: String, note: &str) {
        match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(content) {
                Ok(_) => self.set_status_message(note.to_string()),
                Err(e) => self.set_status_message(format!("Clipboard error: {e:?}")),
            },
            None => self.set_status_message("No clipboard available".to_string()),
        }
        self.refresh();
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    // Recompute the render snapshot from the active engine and the current
    // modus. Runs after every state mutation.
    fn refresh(&mut self) {
        let table = self.engine_ref().ui_table();

        let rows = table.columns.first().map_or(0, |c| c.cells.len());
        self.cursor_row = self.cursor_row.min(rows.saturating_sub(1));
        self.cursor_column = self
            .cursor_column
            .min(table.columns.len().saturating_sub(1));

        let query = self.engine_ref().filter_value().unwrap_or_default();
        let title = if query.is_empty() {
            self.screen.title().to_string()
        } else {
            format!("{} ?q={}", self.screen.title(), query)
        };

        let detail = if self.modus == Modus::RECORD {
            self.engine_ref()
                .record_fields(self.detail_idx)
                .map(|(record_id, fields)| DetailData {
                    record_id,
                    fields,
                    position: self.detail_idx,
                    total: self.engine_ref().derived_len(),
                })
        } else {
            None
        };

        let menu = if self.modus == Modus::COLUMNMENU {
            Some(MenuData {
                entries: self
                    .engine_ref()
                    .hideable_columns()
                    .into_iter()
                    .map(|(_, label, visible)| (label, visible))
                    .collect(),
                cursor: self.menu_cursor,
            })
        } else {
            None
        };

        self.uidata = UIData {
            title,
            table,
            selected_row: self.cursor_row,
            selected_column: self.cursor_column,
            detail,
            menu,
            show_popup: self.modus == Modus::POPUP,
            popup_message: HELP_TEXT.to_string(),
            cmdinput: self.last_input.clone(),
            active_cmdinput: self.modus == Modus::FILTERINPUT,
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{order_columns, product_columns};
    use ratatui::crossterm::event::KeyCode;
    use std::time::Duration;

    fn products(n: usize) -> Vec<Product> {
        (1..=n)
            .map(|i| Product {
                id: format!("p{i:02}"),
                name: format!("Item {i:02}"),
                description: "''".to_string(),
                price: i as f64,
                color: if i % 2 == 0 { "blue" } else { "red" }.to_string(),
                created_at: 86_400 * i as i64,
            })
            .collect()
    }

    fn orders() -> Vec<Order> {
        vec![Order {
            id: "o1".into(),
            product_id: "p01".into(),
            product_name: "Item 01".into(),
            quantity: 2.0,
            total: 2.0,
            ordered_at: 0,
        }]
    }

    fn model(config: DashConfig) -> Model {
        let window = Duration::from_millis(config.debounce_ms);
        Model::init(
            &config,
            TableEngine::new(products(25), product_columns(), "name", window),
            TableEngine::new(orders(), order_columns(), "product_name", window),
        )
    }

    #[test]
    fn query_argument_seeds_the_product_filter() {
        let m = model(DashConfig::default().query(Some("Item 2".to_string())));
        let ui = m.get_uidata();
        assert_eq!(ui.table.total_filtered, 6);
        assert_eq!(ui.title, "Products ?q=Item 2");
    }

    #[test]
    fn switching_screens_swaps_the_engine() {
        let mut m = model(DashConfig::default());
        assert_eq!(m.get_uidata().table.total_filtered, 25);

        m.update(Message::SwitchScreen);
        let ui = m.get_uidata();
        assert_eq!(ui.title, "Orders");
        assert_eq!(ui.table.total_filtered, 1);
    }

    #[test]
    fn paging_messages_move_and_clamp_the_cursor() {
        let mut m = model(DashConfig::default());
        m.update(Message::NextPage);
        m.update(Message::NextPage);
        m.update(Message::NextPage); // past the end, clamps
        let ui = m.get_uidata();
        assert_eq!(ui.table.page_index, 2);
        assert_eq!(ui.table.columns[0].cells.len(), 5);
    }

    #[test]
    fn typed_filter_applies_only_after_tick() {
        let mut m = model(DashConfig::default().debounce_ms(0));
        m.update(Message::Filter);
        for c in "blue".chars() {
            m.update(Message::RawKey(KeyEvent::from(KeyCode::Char(c))));
        }
        assert_eq!(m.get_uidata().table.total_filtered, 25);
        assert!(m.get_uidata().table.filter_pending);

        // Zero debounce window, so the next tick applies it.
        assert!(m.tick());
        assert_eq!(m.get_uidata().table.total_filtered, 0); // names carry no "blue"
    }

    #[test]
    fn escape_restores_the_previous_filter() {
        let mut m = model(DashConfig::default().query(Some("Item 01".to_string())));
        m.update(Message::Filter);
        m.update(Message::RawKey(KeyEvent::from(KeyCode::Char('x'))));
        m.update(Message::RawKey(KeyEvent::from(KeyCode::Esc)));

        assert!(!m.tick()); // pending edit was cancelled, never applied
        let ui = m.get_uidata();
        assert_eq!(ui.table.total_filtered, 1);
        assert_eq!(ui.title, "Products ?q=Item 01");
    }

    #[test]
    fn enter_commits_the_filter_immediately() {
        let mut m = model(DashConfig::default());
        m.update(Message::Filter);
        for c in "Item 25".chars() {
            m.update(Message::RawKey(KeyEvent::from(KeyCode::Char(c))));
        }
        m.update(Message::RawKey(KeyEvent::from(KeyCode::Enter)));
        assert_eq!(m.get_uidata().table.total_filtered, 1);
        assert!(!m.get_uidata().table.filter_pending);
    }

    #[test]
    fn column_menu_toggles_visibility() {
        let mut m = model(DashConfig::default());
        let before = m.get_uidata().table.columns.len();

        m.update(Message::ColumnMenu);
        assert!(m.get_uidata().menu.is_some());
        m.update(Message::Toggle); // first hideable column: id
        m.update(Message::Exit);

        let ui = m.get_uidata();
        assert!(ui.menu.is_none());
        assert_eq!(ui.table.columns.len(), before - 1);
        assert!(!ui.table.columns.iter().any(|c| c.key == "id"));
    }

    #[test]
    fn detail_view_follows_derived_order() {
        let mut m = model(DashConfig::default());
        // Sort by name descending: Item 25 first.
        m.update(Message::MoveRight); // select "name" (id is column 0)
        m.update(Message::CycleSort);
        m.update(Message::CycleSort);
        m.update(Message::Enter);

        let ui = m.get_uidata();
        let detail = ui.detail.as_ref().unwrap();
        assert_eq!(detail.record_id, "p25");
        assert_eq!(detail.total, 25);

        m.update(Message::MoveRight);
        let ui = m.get_uidata();
        assert_eq!(ui.detail.as_ref().unwrap().record_id, "p24");

        m.update(Message::Exit);
        assert!(m.get_uidata().detail.is_none());
    }

    #[test]
    fn sort_cycle_runs_asc_desc_off() {
        let mut m = model(DashConfig::default());
        m.update(Message::MoveRight); // name column
        m.update(Message::CycleSort);
        assert_eq!(
            m.get_uidata().table.columns[1].sort,
            Some((SortDirection::Ascending, 0))
        );
        m.update(Message::CycleSort);
        assert_eq!(
            m.get_uidata().table.columns[1].sort,
            Some((SortDirection::Descending, 0))
        );
        m.update(Message::CycleSort);
        assert_eq!(m.get_uidata().table.columns[1].sort, None);
    }

    #[test]
    fn page_size_cycle_clamps_at_the_ends() {
        let mut m = model(DashConfig::default());
        m.update(Message::ShrinkPageSize);
        assert_eq!(m.get_uidata().table.page_size, 10);
        m.update(Message::GrowPageSize);
        assert_eq!(m.get_uidata().table.page_size, 20);
    }

    #[test]
    fn row_copy_quotes_cells_with_separators() {
        assert_eq!(Model::wrap_cell_content("plain"), "plain");
        assert_eq!(Model::wrap_cell_content("two words"), "\"two words\"");
        assert_eq!(Model::wrap_cell_content("a\"b"), "a\"\"b");
        assert_eq!(Model::wrap_cell_content("a,b"), "\"a,b\"");
    }
}
