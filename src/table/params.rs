//! Query string binding for list endpoints

use super::{SortDirection, SortState, TableSpec, TableView};
use crate::error::{validation_error, AppError};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Upper bound for `pageSize`
pub const MAX_PAGE_SIZE: usize = 200;

/// List parameters accepted by every table endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<SortDirection>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub filters: BTreeMap<String, String>,
}

fn parse_number(map: &HashMap<String, String>, key: &str) -> Result<Option<usize>, AppError> {
    match map.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<usize>()
            .map(Some)
            .map_err(|_| validation_error(format!("'{}' must be a positive integer", key))),
    }
}

impl ListParams {
    /// Read the query map; only `filter_keys` are taken as category filters
    pub fn from_map(map: &HashMap<String, String>, filter_keys: &[String]) -> Result<Self, AppError> {
        let direction = match map.get("direction").map(|d| d.to_lowercase()) {
            None => None,
            Some(d) if d == "asc" => Some(SortDirection::Asc),
            Some(d) if d == "desc" => Some(SortDirection::Desc),
            Some(other) => return Err(validation_error(format!("Unknown sort direction '{}'", other))),
        };

        let page_size = parse_number(map, "pageSize")?;
        if let Some(size) = page_size {
            if size == 0 || size > MAX_PAGE_SIZE {
                return Err(validation_error(format!(
                    "'pageSize' must be between 1 and {}",
                    MAX_PAGE_SIZE
                )));
            }
        }

        let filters = filter_keys
            .iter()
            .filter_map(|key| map.get(key).map(|v| (key.clone(), v.clone())))
            .collect();

        Ok(Self {
            search: map.get("search").cloned().filter(|s| !s.trim().is_empty()),
            sort: map.get("sort").cloned().filter(|s| !s.is_empty()),
            direction,
            page: parse_number(map, "page")?,
            page_size,
            filters,
        })
    }

    /// Apply to a view; page is applied last since search and filters reset it
    pub fn apply(&self, view: &mut TableView) {
        if let Some(search) = &self.search {
            view.set_search(search.clone());
        }
        for (key, value) in &self.filters {
            view.set_filter(key.clone(), Some(value.clone()));
        }
        if let Some(sort) = &self.sort {
            view.sort_by(sort, self.direction.unwrap_or(SortDirection::Asc));
        }
        if let Some(page) = self.page {
            view.set_page(page);
        }
    }
}

/// One page of a list endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub rows: Vec<Value>,
    pub total: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub page_size: usize,
    pub page_window: Vec<usize>,
    pub sort: Option<SortState>,
}

impl From<&TableView> for ListPage {
    fn from(view: &TableView) -> Self {
        Self {
            rows: view.page().into_iter().cloned().collect(),
            total: view.total_filtered(),
            total_pages: view.total_pages(),
            current_page: view.current_page(),
            page_size: view.page_size(),
            page_window: view.page_window(),
            sort: view.sort().cloned(),
        }
    }
}

impl TableSpec {
    /// Build a view over `data` with `params` applied
    pub fn apply(&self, data: Vec<Value>, params: &ListParams, default_page_size: usize) -> TableView {
        let mut view = self
            .view(data)
            .with_page_size(params.page_size.unwrap_or(default_page_size));
        params.apply(&mut view);
        view
    }

    pub fn list(&self, data: Vec<Value>, params: &ListParams, default_page_size: usize) -> ListPage {
        ListPage::from(&self.apply(data, params, default_page_size))
    }
}
