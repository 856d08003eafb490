//! Generic tabular view
//!
//! Search, category filters, single-column sort, pagination and CSV export
//! over an in-memory list of records. Every admin list endpoint runs its
//! fetched rows through a [`TableView`]; nothing here touches the gateway.

pub mod export;
mod params;

pub use export::{export_filename, CsvExporter, ExportFile, Exporter};
pub use params::{ListPage, ListParams};

use crate::values;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Maximum number of page buttons in the page window
pub const PAGE_WINDOW: usize = 5;

/// Cell renderer receiving the whole record
pub type Renderer = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Column descriptor
#[derive(Clone)]
pub struct Column {
    pub key: String,
    pub header: String,
    pub render: Option<Renderer>,
    pub sortable: bool,
}

impl Column {
    pub fn new(key: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            header: header.into(),
            render: None,
            sortable: true,
        }
    }

    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub fn render(mut self, render: impl Fn(&Value) -> String + Send + Sync + 'static) -> Self {
        self.render = Some(Arc::new(render));
        self
    }

    /// Text shown for this column of `record`
    pub fn render_cell(&self, record: &Value) -> String {
        match &self.render {
            Some(render) => render(record),
            None => values::display(values::lookup(record, &self.key)),
        }
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("header", &self.header)
            .field("sortable", &self.sortable)
            .field("render", &self.render.is_some())
            .finish()
    }
}

/// Renders a numeric field with two decimals
pub fn money(key: &'static str) -> impl Fn(&Value) -> String + Send + Sync + 'static {
    move |record| {
        values::lookup(record, key)
            .and_then(Value::as_f64)
            .map(|v| format!("{:.2}", v))
            .unwrap_or_default()
    }
}

/// Column set plus the keys a list may be searched and filtered by
#[derive(Debug, Clone, Default)]
pub struct TableSpec {
    pub columns: Vec<Column>,
    pub search_keys: Vec<String>,
    pub filter_keys: Vec<String>,
}

impl TableSpec {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    pub fn search_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn view(&self, data: Vec<Value>) -> TableView {
        TableView::new(data, self.columns.clone()).with_search_keys(self.search_keys.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortState {
    pub key: String,
    pub direction: SortDirection,
}

/// Search/sort/paginate state over a fixed data set
#[derive(Debug, Clone)]
pub struct TableView {
    data: Vec<Value>,
    columns: Vec<Column>,
    search_keys: Vec<String>,
    page_size: usize,
    search: String,
    filters: BTreeMap<String, String>,
    sort: Option<SortState>,
    current_page: usize,
}

impl TableView {
    pub fn new(data: Vec<Value>, columns: Vec<Column>) -> Self {
        Self {
            data,
            columns,
            search_keys: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            search: String::new(),
            filters: BTreeMap::new(),
            sort: None,
            current_page: 1,
        }
    }

    pub fn with_search_keys(mut self, keys: Vec<String>) -> Self {
        self.search_keys = keys;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    /// Set the search text; always returns to page 1
    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
        self.current_page = 1;
    }

    /// Set or clear (empty / `all`) a category filter; always returns to page 1
    pub fn set_filter(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match value.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() && !v.eq_ignore_ascii_case("all") => {
                self.filters.insert(key, v);
            }
            _ => {
                self.filters.remove(&key);
            }
        }
        self.current_page = 1;
    }

    fn is_sortable(&self, key: &str) -> bool {
        self.columns.iter().any(|c| c.key == key && c.sortable)
    }

    /// Header click: same column flips direction, a new column starts
    /// ascending. Unknown or unsortable columns are ignored.
    pub fn toggle_sort(&mut self, key: &str) -> bool {
        if !self.is_sortable(key) {
            return false;
        }
        self.sort = Some(match self.sort.take() {
            Some(current) if current.key == key => SortState {
                key: current.key,
                direction: current.direction.flip(),
            },
            _ => SortState {
                key: key.to_string(),
                direction: SortDirection::Asc,
            },
        });
        true
    }

    /// Set the sort directly
    pub fn sort_by(&mut self, key: &str, direction: SortDirection) -> bool {
        if !self.is_sortable(key) {
            return false;
        }
        self.sort = Some(SortState {
            key: key.to_string(),
            direction,
        });
        true
    }

    /// Move to `page`, clamped into `1..=total_pages`
    pub fn set_page(&mut self, page: usize) {
        self.current_page = page.clamp(1, self.total_pages().max(1));
    }

    fn matches_search(&self, record: &Value, needle: &str) -> bool {
        if self.search_keys.is_empty() {
            return values::any_scalar_contains(record, needle);
        }
        self.search_keys.iter().any(|key| {
            values::lookup(record, key)
                .map(|v| values::any_scalar_contains(v, needle))
                .unwrap_or(false)
        })
    }

    fn matches_filters(&self, record: &Value) -> bool {
        self.filters.iter().all(|(key, expected)| {
            values::lookup(record, key)
                .map(|v| values::display(Some(v)).eq_ignore_ascii_case(expected))
                .unwrap_or(false)
        })
    }

    /// Records passing the search text and every category filter
    pub fn filtered(&self) -> Vec<&Value> {
        let needle = self.search.trim().to_lowercase();
        self.data
            .iter()
            .filter(|r| needle.is_empty() || self.matches_search(r, &needle))
            .filter(|r| self.matches_filters(r))
            .collect()
    }

    /// Filtered records in the active sort order
    pub fn processed(&self) -> Vec<&Value> {
        let mut rows = self.filtered();
        if let Some(sort) = &self.sort {
            let descending = sort.direction == SortDirection::Desc;
            rows.sort_by(|a, b| {
                values::compare_nulls_last(
                    values::lookup(a, &sort.key),
                    values::lookup(b, &sort.key),
                    descending,
                )
            });
        }
        rows
    }

    pub fn total_filtered(&self) -> usize {
        self.filtered().len()
    }

    /// `ceil(filtered / page_size)`; zero when nothing matches
    pub fn total_pages(&self) -> usize {
        self.total_filtered().div_ceil(self.page_size)
    }

    /// Records on `page` (1-based); out of range pages are empty
    pub fn page_at(&self, page: usize) -> Vec<&Value> {
        if page == 0 {
            return Vec::new();
        }
        self.processed()
            .into_iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
            .collect()
    }

    /// Records on the current page
    pub fn page(&self) -> Vec<&Value> {
        self.page_at(self.current_page)
    }

    /// Up to five page numbers, recentered around the current page
    pub fn page_window(&self) -> Vec<usize> {
        page_window(self.current_page, self.total_pages())
    }

    /// Export the filtered and sorted records (never just one page)
    pub fn export(&self, exporter: Option<&dyn Exporter>) -> ExportFile {
        let rows = self.processed();
        match exporter {
            Some(custom) => custom.export(&self.columns, &rows),
            None => CsvExporter::default().export(&self.columns, &rows),
        }
    }
}

/// Page numbers to show for `current` out of `total` pages
pub fn page_window(current: usize, total: usize) -> Vec<usize> {
    if total <= PAGE_WINDOW {
        return (1..=total).collect();
    }
    let half = PAGE_WINDOW / 2;
    let start = if current <= half + 1 {
        1
    } else if current + half >= total {
        total - PAGE_WINDOW + 1
    } else {
        current - half
    };
    (start..start + PAGE_WINDOW).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn bookings() -> Vec<Value> {
        (1..=12)
            .map(|i| {
                let status = match i % 4 {
                    0 => "confirmed",
                    1 => "pending",
                    2 => "cancelled",
                    _ => "completed",
                };
                json!({
                    "id": i,
                    "status": status,
                    "total_amount": (13 - i) * 100,
                    "client": { "name": format!("Client {}", i) },
                })
            })
            .collect()
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", "ID"),
            Column::new("status", "Status"),
            Column::new("total_amount", "Amount").render(money("total_amount")),
            Column::new("client.name", "Client").unsortable(),
        ]
    }

    fn ids(rows: &[&Value]) -> Vec<i64> {
        rows.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn test_scenario_confirmed_by_status() {
        let mut view = TableView::new(bookings(), columns()).with_search_keys(vec!["status".into()]);
        view.set_search("confirmed");

        assert_eq!(view.total_pages(), 1);
        assert_eq!(view.page().len(), 3);

        assert!(view.toggle_sort("total_amount"));
        let page = view.page();
        let amounts: Vec<i64> = page.iter().map(|r| r["total_amount"].as_i64().unwrap()).collect();
        assert_eq!(amounts, vec![100, 500, 900]);
    }

    #[test]
    fn test_search_without_keys_reaches_nested_fields() {
        let mut view = TableView::new(bookings(), columns());
        view.set_search("CLIENT 1");
        // Client 1, 10, 11, 12
        assert_eq!(ids(&view.filtered()), vec![1, 10, 11, 12]);

        view.set_search("no such thing");
        assert!(view.filtered().is_empty());
        assert_eq!(view.total_pages(), 0);
        assert!(view.page().is_empty());
    }

    #[test]
    fn test_search_results_contain_query() {
        let data = bookings();
        for query in ["pend", "CANCEL", "Client 3", "1200"] {
            let mut view = TableView::new(data.clone(), columns());
            view.set_search(query);
            let needle = query.to_lowercase();
            for row in view.filtered() {
                assert!(data.contains(row));
                assert!(values::any_scalar_contains(row, &needle));
            }
        }
    }

    #[test]
    fn test_search_does_not_span_fields() {
        let record = json!({ "id": 1, "status": "pending", "total_amount": 1200 });
        let mut view = TableView::new(vec![record], vec![]);
        view.set_search("pending 1200");
        assert!(view.filtered().is_empty());

        view.set_search("pending");
        assert_eq!(view.filtered().len(), 1);
    }

    #[test]
    fn test_search_keys_support_dot_paths() {
        let mut view =
            TableView::new(bookings(), columns()).with_search_keys(vec!["client.name".into()]);
        view.set_search("client 2");
        assert_eq!(ids(&view.filtered()), vec![2]);

        view.set_search("pending");
        assert!(view.filtered().is_empty());
    }

    #[test]
    fn test_toggle_sort_cycle() {
        let mut view = TableView::new(bookings(), columns());
        view.toggle_sort("id");
        assert_eq!(view.sort().unwrap().direction, SortDirection::Asc);
        view.toggle_sort("id");
        assert_eq!(view.sort().unwrap().direction, SortDirection::Desc);
        view.toggle_sort("status");
        assert_eq!(
            view.sort(),
            Some(&SortState { key: "status".into(), direction: SortDirection::Asc })
        );
        assert!(!view.toggle_sort("client.name"));
        assert!(!view.toggle_sort("nope"));
        assert_eq!(view.sort().unwrap().key, "status");
    }

    #[test]
    fn test_sort_reverses_and_keeps_nulls_last() {
        let mut data = bookings();
        data.push(json!({ "id": 13, "status": "pending" }));
        data.push(json!({ "id": 14, "status": "pending", "total_amount": null }));

        let mut view = TableView::new(data, columns());
        view.sort_by("total_amount", SortDirection::Asc);
        let asc = ids(&view.processed());
        view.sort_by("total_amount", SortDirection::Desc);
        let desc = ids(&view.processed());

        assert_eq!(&asc[12..], &[13, 14]);
        assert_eq!(&desc[12..], &[13, 14]);
        let mut reversed = asc[..12].to_vec();
        reversed.reverse();
        assert_eq!(desc[..12].to_vec(), reversed);
    }

    #[test]
    fn test_pages_cover_everything_once() {
        let mut view = TableView::new(bookings(), columns()).with_page_size(5);
        view.sort_by("id", SortDirection::Desc);
        assert_eq!(view.total_pages(), 3);

        let mut seen = Vec::new();
        for page in 1..=view.total_pages() {
            let rows = view.page_at(page);
            assert!(rows.len() <= 5);
            seen.extend(ids(&rows));
        }
        assert_eq!(seen, ids(&view.processed()));
        assert!(view.page_at(4).is_empty());
        assert!(view.page_at(0).is_empty());
    }

    #[test]
    fn test_search_and_filters_reset_page() {
        let mut view = TableView::new(bookings(), columns()).with_page_size(2);
        view.set_page(4);
        assert_eq!(view.current_page(), 4);
        view.set_search("c");
        assert_eq!(view.current_page(), 1);

        view.set_page(3);
        view.set_filter("status", Some("Pending".into()));
        assert_eq!(view.current_page(), 1);
        assert_eq!(ids(&view.filtered()), vec![1, 5, 9]);

        view.set_filter("status", Some("all".into()));
        assert_eq!(view.filtered().len(), 12);
    }

    #[test]
    fn test_set_page_clamps() {
        let mut view = TableView::new(bookings(), columns());
        view.set_page(99);
        assert_eq!(view.current_page(), 2);
        view.set_page(0);
        assert_eq!(view.current_page(), 1);
    }

    #[test]
    fn test_page_window_recenters() {
        assert_eq!(page_window(1, 3), vec![1, 2, 3]);
        assert_eq!(page_window(1, 10), vec![1, 2, 3, 4, 5]);
        assert_eq!(page_window(3, 10), vec![1, 2, 3, 4, 5]);
        assert_eq!(page_window(6, 10), vec![4, 5, 6, 7, 8]);
        assert_eq!(page_window(9, 10), vec![6, 7, 8, 9, 10]);
        assert_eq!(page_window(10, 10), vec![6, 7, 8, 9, 10]);
        assert!(page_window(1, 0).is_empty());
    }

    #[test]
    fn test_export_ignores_pagination() {
        let mut view = TableView::new(bookings(), columns()).with_page_size(3);
        view.set_search("pending");
        view.set_page(2);
        let file = view.export(None);
        // header + 3 pending bookings
        assert_eq!(file.body.lines().count(), 4);
        assert!(file.filename.starts_with("export-"));
    }
}
