//! Volunteer activities

use super::{Entity, Manager};
use crate::db::Filter;
use crate::error::AppError;
use crate::models::{NewVolunteerActivity, RecordMeta, VolunteerActivity, VolunteerActivityUpdate};
use crate::table::{Column, TableSpec};

impl Entity for VolunteerActivity {
    type Create = NewVolunteerActivity;
    type Update = VolunteerActivityUpdate;

    const TABLE: &'static str = "volunteer_activities";
    const LABEL: &'static str = "Volunteer activity";

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn table_spec() -> TableSpec {
        TableSpec::new(vec![
            Column::new("title", "Title"),
            Column::new("location", "Location"),
            Column::new("activity_date", "Date"),
            Column::new("max_volunteers", "Slots"),
            Column::new("status", "Status"),
        ])
        .search_keys(["title", "location", "description"])
        .filter_keys(["status"])
    }
}

impl Manager<VolunteerActivity> {
    /// Upcoming activities, soonest first
    pub async fn upcoming(&self) -> Result<Vec<VolunteerActivity>, AppError> {
        let mut activities = self.list(vec![Filter::eq("status", "upcoming")]).await?;
        activities.sort_by_key(|a| a.activity_date);
        Ok(activities)
    }
}
