use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::columns::{ColumnDescriptor, Record};
use crate::debounce::Debouncer;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const PAGE_SIZES: [usize; 5] = [10, 20, 30, 40, 50];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Render-ready projection of the record collection for the current page.
/// Borrowed from the engine; recomputed in full on every call to `view`.
pub struct DerivedView<'a, R> {
    pub rows: Vec<&'a R>,
    pub columns: Vec<&'a ColumnDescriptor>,
    pub page_index: usize,
    pub page_size: usize,
    pub total_filtered: usize,
    pub total_pages: usize,
    /// A typed filter is waiting out its quiescence window.
    pub filter_pending: bool,
}

/// View-state machine over a fixed record collection: composes filtering,
/// sorting and pagination, in that order, plus a render-time column
/// visibility projection. One instance per displayed table; all state is
/// local and every operation either applies cleanly or clamps/no-ops.
pub struct TableEngine<R: Record> {
    records: Vec<R>,
    columns: Vec<ColumnDescriptor>,
    /// Column the free-form text filter applies to.
    default_filter_column: &'static str,
    filters: Vec<(String, String)>,
    sort: Vec<(String, SortDirection)>,
    /// Absent key means visible.
    visibility: HashMap<String, bool>,
    page_index: usize,
    page_size: usize,
    debounce: Debouncer,
}

impl<R: Record> TableEngine<R> {
    pub fn new(
        records: Vec<R>,
        columns: Vec<ColumnDescriptor>,
        default_filter_column: &'static str,
        debounce_window: Duration,
    ) -> Self {
        TableEngine {
            records,
            columns,
            default_filter_column,
            filters: Vec::new(),
            sort: Vec::new(),
            visibility: HashMap::new(),
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
            debounce: Debouncer::new(debounce_window),
        }
    }

    /// Schedules the free-form text filter; only the latest value in a rapid
    /// sequence is ever applied, once `tick` observes its deadline.
    pub fn set_text_filter(&mut self, value: &str, now: Instant) {
        self.debounce.schedule(value.to_string(), now);
    }

    /// Applies an elapsed filter schedule, if any. Returns whether the
    /// derived view changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if let Some(value) = self.debounce.poll(now) {
            self.apply_filter(self.default_filter_column.to_string(), &value);
            return true;
        }
        false
    }

    /// Immediately sets (or, with an empty value, clears) the predicate for
    /// one column. Replacement keeps the predicate's position in the
    /// conjunction; the position has no effect on the result set.
    pub fn apply_filter(&mut self, key: String, value: &str) {
        debug!("Filter {:?} on column {}", value, key);
        if value.is_empty() {
            self.filters.retain(|(k, _)| *k != key);
        } else if let Some(slot) = self.filters.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value.to_string();
        } else {
            self.filters.push((key, value.to_string()));
        }
        self.clamp_page();
    }

    /// Drops any filter value still waiting on its quiescence window.
    pub fn cancel_pending_filter(&mut self) {
        self.debounce.cancel();
    }

    pub fn default_filter_column(&self) -> &'static str {
        self.default_filter_column
    }

    pub fn filter_value(&self) -> Option<&str> {
        self.filters
            .iter()
            .find(|(k, _)| k == self.default_filter_column)
            .map(|(_, v)| v.as_str())
    }

    /// No-op for unknown or non-hideable columns. Pure render-time
    /// projection: never touches filter, sort or pagination state.
    pub fn toggle_column_visibility(&mut self, key: &str, visible: bool) {
        let hideable = self
            .columns
            .iter()
            .any(|c| c.key == key && c.hideable);
        if !hideable {
            trace!("Ignoring visibility toggle for column {:?}", key);
            return;
        }
        self.visibility.insert(key.to_string(), visible);
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.visibility.get(key).copied().unwrap_or(true)
    }

    /// `None` removes the column from the sort spec. Setting a direction on
    /// an already-sorted column replaces it in place, keeping its tie-break
    /// position. Unknown keys are ignored.
    pub fn set_sort(&mut self, key: &str, direction: Option<SortDirection>) {
        if !self.columns.iter().any(|c| c.key == key) {
            trace!("Ignoring sort on unknown column {:?}", key);
            return;
        }
        match direction {
            None => self.sort.retain(|(k, _)| k != key),
            Some(dir) => {
                if let Some(slot) = self.sort.iter_mut().find(|(k, _)| k == key) {
                    slot.1 = dir;
                } else {
                    self.sort.push((key.to_string(), dir));
                }
            }
        }
        debug!("Sort spec: {:?}", self.sort);
    }

    pub fn clear_sort(&mut self) {
        self.sort.clear();
    }

    pub fn sort_of(&self, key: &str) -> Option<(SortDirection, usize)> {
        self.sort
            .iter()
            .position(|(k, _)| k == key)
            .map(|pos| (self.sort[pos].1, pos))
    }

    pub fn set_page(&mut self, index: usize) {
        let last = self.last_page();
        self.page_index = index.min(last);
    }

    pub fn set_page_size(&mut self, size: usize) {
        self.page_size = size.max(1);
        self.clamp_page();
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Invokes `action` with the full record at `page_row` of the current
    /// page, so callers navigate by record id rather than position.
    /// Returns false when the row does not exist.
    pub fn activate<F: FnOnce(&R)>(&self, page_row: usize, action: F) -> bool {
        let view = self.view();
        match view.rows.get(page_row) {
            Some(record) => {
                action(record);
                true
            }
            None => false,
        }
    }

    /// Record at an absolute position in the derived (filtered + sorted)
    /// order, ignoring pagination. Drives the detail view's prev/next.
    pub fn derived_record(&self, derived_row: usize) -> Option<&R> {
        let order = self.sorted(self.filtered());
        order.get(derived_row).map(|&i| &self.records[i])
    }

    pub fn derived_len(&self) -> usize {
        self.filtered().len()
    }

    /// Pure function of (records, view state): filter, then sort, then
    /// paginate, then strip hidden columns. Safe to call repeatedly.
    pub fn view(&self) -> DerivedView<'_, R> {
        let order = self.sorted(self.filtered());
        let total_filtered = order.len();
        let total_pages = total_filtered.div_ceil(self.page_size);
        let page_index = if total_pages == 0 {
            0
        } else {
            self.page_index.min(total_pages - 1)
        };

        let begin = page_index * self.page_size;
        let end = (begin + self.page_size).min(total_filtered);
        let rows = order[begin..end].iter().map(|&i| &self.records[i]).collect();

        let columns = self
            .columns
            .iter()
            .filter(|c| self.is_visible(c.key))
            .collect();

        DerivedView {
            rows,
            columns,
            page_index,
            page_size: self.page_size,
            total_filtered,
            total_pages,
            filter_pending: self.debounce.is_pending(),
        }
    }

    // Indices of records matching every active predicate, in input order.
    // Case-insensitive substring over the cell's display string.
    fn filtered(&self) -> Vec<usize> {
        if self.filters.is_empty() {
            return (0..self.records.len()).collect();
        }
        let needles: Vec<(&str, String)> = self
            .filters
            .iter()
            .map(|(k, v)| (k.as_str(), v.to_lowercase()))
            .collect();
        (0..self.records.len())
            .filter(|&i| {
                needles.iter().all(|(key, needle)| {
                    self.records[i]
                        .value(key)
                        .display()
                        .to_lowercase()
                        .contains(needle)
                })
            })
            .collect()
    }

    // Stable sort by the criteria in order; equal keys keep the filtered
    // (input) order.
    fn sorted(&self, mut order: Vec<usize>) -> Vec<usize> {
        if self.sort.is_empty() {
            return order;
        }
        order.sort_by(|&a, &b| {
            for (key, dir) in &self.sort {
                let va = self.records[a].value(key);
                let vb = self.records[b].value(key);
                let cmp = match dir {
                    SortDirection::Ascending => va.compare(&vb),
                    SortDirection::Descending => vb.compare(&va),
                };
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            Ordering::Equal
        });
        order
    }

    fn last_page(&self) -> usize {
        let pages = self.derived_len().div_ceil(self.page_size);
        pages.saturating_sub(1)
    }

    fn clamp_page(&mut self) {
        self.page_index = self.page_index.min(self.last_page());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{CellValue, ValueKind};

    struct Item {
        id: String,
        name: String,
        price: f64,
        color: String,
    }

    impl Record for Item {
        fn id(&self) -> &str {
            &self.id
        }

        fn value(&self, key: &str) -> CellValue {
            match key {
                "id" => CellValue::Text(self.id.clone()),
                "name" => CellValue::Text(self.name.clone()),
                "price" => CellValue::Number(self.price),
                "color" => CellValue::Text(self.color.clone()),
                _ => CellValue::Text(String::new()),
            }
        }
    }

    fn item_columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor {
                key: "id",
                label: "Id",
                kind: ValueKind::Text,
                hideable: true,
                format: None,
            },
            ColumnDescriptor {
                key: "name",
                label: "Name",
                kind: ValueKind::Text,
                hideable: false,
                format: None,
            },
            ColumnDescriptor {
                key: "price",
                label: "Price",
                kind: ValueKind::Number,
                hideable: true,
                format: None,
            },
            ColumnDescriptor {
                key: "color",
                label: "Color",
                kind: ValueKind::Text,
                hideable: true,
                format: None,
            },
        ]
    }

    // 25 items; items 3, 11 and 20 are blue.
    fn catalog() -> Vec<Item> {
        (1..=25)
            .map(|i| Item {
                id: format!("p{i:02}"),
                name: format!("Item {i:02}"),
                price: (i % 5) as f64 * 10.0,
                color: if i == 3 || i == 11 || i == 20 {
                    "Blue".to_string()
                } else {
                    "red".to_string()
                },
            })
            .collect()
    }

    fn engine() -> TableEngine<Item> {
        TableEngine::new(
            catalog(),
            item_columns(),
            "name",
            Duration::from_millis(250),
        )
    }

    fn names(view: &DerivedView<'_, Item>) -> Vec<String> {
        view.rows.iter().map(|r| r.name.clone()).collect()
    }

    #[test]
    fn pages_split_25_records_at_size_10() {
        let mut e = engine();

        let v = e.view();
        assert_eq!(v.total_filtered, 25);
        assert_eq!(v.total_pages, 3);
        assert_eq!(v.page_index, 0);
        assert_eq!(names(&v)[0], "Item 01");
        assert_eq!(names(&v)[9], "Item 10");

        e.set_page(2);
        let v = e.view();
        assert_eq!(v.rows.len(), 5);
        assert_eq!(names(&v)[0], "Item 21");
        assert_eq!(names(&v)[4], "Item 25");
    }

    #[test]
    fn filter_narrows_to_matching_rows() {
        let mut e = engine();
        e.apply_filter("color".to_string(), "blue");

        let v = e.view();
        assert_eq!(v.total_filtered, 3);
        assert_eq!(v.total_pages, 1);
        assert_eq!(names(&v), vec!["Item 03", "Item 11", "Item 20"]);
    }

    #[test]
    fn filter_matches_substring_case_insensitively() {
        let mut e = engine();
        e.apply_filter("color".to_string(), "BLU");
        assert_eq!(e.view().total_filtered, 3);
    }

    #[test]
    fn additional_predicates_never_grow_the_result_set() {
        let mut e = engine();
        let all = e.view().total_filtered;

        e.apply_filter("color".to_string(), "blue");
        let one = e.view().total_filtered;
        assert!(one <= all);

        e.apply_filter("name".to_string(), "Item 1");
        let two = e.view().total_filtered;
        assert!(two <= one);
        assert_eq!(e.view().total_filtered, 1); // only Item 11 is blue
    }

    #[test]
    fn replacing_a_predicate_keeps_a_single_entry() {
        let mut e = engine();
        e.apply_filter("color".to_string(), "blue");
        e.apply_filter("color".to_string(), "red");
        assert_eq!(e.view().total_filtered, 22);

        e.apply_filter("color".to_string(), "");
        assert_eq!(e.view().total_filtered, 25);
    }

    #[test]
    fn sort_is_stable_and_idempotent() {
        let mut e = engine();
        e.set_sort("price", Some(SortDirection::Ascending));
        e.set_page_size(25);

        let first = names(&e.view());
        let second = names(&e.view());
        assert_eq!(first, second);

        // Equal prices keep input order: 5, 10, 15, 20, 25 all cost 0.
        assert_eq!(
            &first[0..5],
            &["Item 05", "Item 10", "Item 15", "Item 20", "Item 25"]
        );
    }

    #[test]
    fn tie_break_orders_equal_primary_keys() {
        let mut items = vec![
            Item {
                id: "a".into(),
                name: "zigzag".into(),
                price: 10.0,
                color: "red".into(),
            },
            Item {
                id: "b".into(),
                name: "anchor".into(),
                price: 10.0,
                color: "red".into(),
            },
            Item {
                id: "c".into(),
                name: "marble".into(),
                price: 99.0,
                color: "red".into(),
            },
        ];
        items.rotate_left(1);
        let mut e = TableEngine::new(
            items,
            item_columns(),
            "name",
            Duration::from_millis(250),
        );
        e.set_sort("price", Some(SortDirection::Descending));
        e.set_sort("name", Some(SortDirection::Ascending));

        assert_eq!(names(&e.view()), vec!["marble", "anchor", "zigzag"]);
    }

    #[test]
    fn direction_replacement_keeps_tie_break_position() {
        let mut e = engine();
        e.set_sort("price", Some(SortDirection::Ascending));
        e.set_sort("name", Some(SortDirection::Ascending));
        e.set_sort("price", Some(SortDirection::Descending));

        assert_eq!(e.sort_of("price"), Some((SortDirection::Descending, 0)));
        assert_eq!(e.sort_of("name"), Some((SortDirection::Ascending, 1)));
    }

    #[test]
    fn clearing_and_unknown_sort_keys() {
        let mut e = engine();
        e.set_sort("price", Some(SortDirection::Ascending));
        e.set_sort("price", None);
        assert_eq!(e.sort_of("price"), None);

        e.set_sort("bogus", Some(SortDirection::Ascending));
        assert_eq!(e.sort_of("bogus"), None);
    }

    #[test]
    fn concatenated_pages_cover_the_derived_set_exactly() {
        for size in [3, 7, 10, 25, 50] {
            let mut e = engine();
            e.set_sort("price", Some(SortDirection::Ascending));
            e.set_page_size(size);

            let total_pages = e.view().total_pages;
            let mut seen = Vec::new();
            for page in 0..total_pages {
                e.set_page(page);
                seen.extend(e.view().rows.iter().map(|r| r.id.clone()));
            }

            assert_eq!(seen.len(), 25, "page size {size}");
            let mut unique = seen.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), 25, "page size {size}");
        }
    }

    #[test]
    fn visibility_is_a_pure_projection() {
        let mut e = engine();
        e.set_sort("price", Some(SortDirection::Ascending));
        let before = names(&e.view());

        e.toggle_column_visibility("price", false);
        let v = e.view();
        assert_eq!(names(&v), before);
        assert!(!v.columns.iter().any(|c| c.key == "price"));
        assert_eq!(v.total_filtered, 25);

        e.toggle_column_visibility("price", true);
        assert!(e.view().columns.iter().any(|c| c.key == "price"));
    }

    #[test]
    fn non_hideable_and_unknown_columns_stay_visible() {
        let mut e = engine();
        e.toggle_column_visibility("name", false);
        e.toggle_column_visibility("bogus", false);

        let v = e.view();
        assert!(v.columns.iter().any(|c| c.key == "name"));
        assert_eq!(v.columns.len(), 4);
    }

    #[test]
    fn cursor_clamps_when_a_filter_shrinks_the_set() {
        let mut e = engine();
        e.set_page(2);
        assert_eq!(e.view().page_index, 2);

        e.apply_filter("color".to_string(), "blue");
        let v = e.view();
        assert_eq!(v.page_index, 0);
        assert_eq!(v.total_pages, 1);
        assert_eq!(v.rows.len(), 3);
    }

    #[test]
    fn out_of_range_requests_resolve_to_nearest_valid() {
        let mut e = engine();
        e.set_page(99);
        assert_eq!(e.view().page_index, 2);

        e.set_page_size(0);
        assert_eq!(e.page_size(), 1);
        assert_eq!(e.view().total_pages, 25);
    }

    #[test]
    fn empty_result_is_a_valid_terminal_state() {
        let mut e = engine();
        e.apply_filter("name".to_string(), "no such item");

        let v = e.view();
        assert_eq!(v.total_filtered, 0);
        assert_eq!(v.total_pages, 0);
        assert_eq!(v.page_index, 0);
        assert!(v.rows.is_empty());
    }

    #[test]
    fn text_filter_waits_out_the_quiescence_window() {
        let mut e = engine();
        // Default filter column is "name".
        let t0 = Instant::now();
        e.set_text_filter("Item 2", t0);

        assert!(!e.tick(t0 + Duration::from_millis(100)));
        assert!(e.view().filter_pending);
        assert_eq!(e.view().total_filtered, 25);

        assert!(e.tick(t0 + Duration::from_millis(250)));
        let v = e.view();
        assert!(!v.filter_pending);
        assert_eq!(v.total_filtered, 6); // Item 20 through Item 25
    }

    #[test]
    fn superseded_filter_input_is_never_applied() {
        let mut e = engine();
        let t0 = Instant::now();
        e.set_text_filter("Item 0", t0);
        let t1 = t0 + Duration::from_millis(200);
        e.set_text_filter("Item 25", t1);

        assert!(!e.tick(t0 + Duration::from_millis(250)));
        assert!(e.tick(t1 + Duration::from_millis(250)));
        assert_eq!(e.view().total_filtered, 1);
        assert_eq!(e.filter_value(), Some("Item 25"));
    }

    #[test]
    fn cancelled_filter_input_leaves_state_untouched() {
        let mut e = engine();
        let t0 = Instant::now();
        e.set_text_filter("Item 1", t0);
        e.cancel_pending_filter();

        assert!(!e.tick(t0 + Duration::from_secs(1)));
        assert_eq!(e.view().total_filtered, 25);
        assert_eq!(e.filter_value(), None);
    }

    #[test]
    fn activation_hands_back_the_full_record() {
        let mut e = engine();
        e.set_sort("name", Some(SortDirection::Descending));
        e.set_page(1);

        // Page 1 descending starts at Item 15.
        let mut activated = None;
        assert!(e.activate(0, |r| activated = Some(r.id.clone())));
        assert_eq!(activated.as_deref(), Some("p15"));

        assert!(!e.activate(99, |_| unreachable!()));
    }

    #[test]
    fn derived_records_follow_filter_and_sort_order() {
        let mut e = engine();
        e.apply_filter("color".to_string(), "blue");
        e.set_sort("name", Some(SortDirection::Descending));

        assert_eq!(e.derived_len(), 3);
        assert_eq!(e.derived_record(0).map(|r| r.id.as_str()), Some("p20"));
        assert_eq!(e.derived_record(2).map(|r| r.id.as_str()), Some("p03"));
        assert!(e.derived_record(3).is_none());
    }
}
