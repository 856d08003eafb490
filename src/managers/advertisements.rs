//! Advertisements

use super::{Entity, Manager};
use crate::db::Filter;
use crate::error::AppError;
use crate::models::{Advertisement, AdvertisementUpdate, NewAdvertisement, RecordMeta};
use crate::table::{Column, TableSpec};

impl Entity for Advertisement {
    type Create = NewAdvertisement;
    type Update = AdvertisementUpdate;

    const TABLE: &'static str = "advertisements";
    const LABEL: &'static str = "Advertisement";

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn table_spec() -> TableSpec {
        TableSpec::new(vec![
            Column::new("title", "Title"),
            Column::new("placement", "Placement"),
            Column::new("status", "Status"),
            Column::new("link_url", "Link").unsortable(),
            Column::new("created_at", "Created"),
        ])
        .search_keys(["title", "placement"])
        .filter_keys(["status", "placement"])
    }
}

impl Manager<Advertisement> {
    /// Active ads, optionally for one placement
    pub async fn active(&self, placement: Option<&str>) -> Result<Vec<Advertisement>, AppError> {
        let mut filters = vec![Filter::eq("status", "active")];
        if let Some(placement) = placement {
            filters.push(Filter::eq("placement", placement));
        }
        self.list(filters).await
    }
}
