//! Information centers and their media
//!
//! Centers are never removed: delete flips the status to `deleted` and every
//! read hides them. Media rows belong to one center and are deleted for real.

use super::{Entity, Manager};
use crate::audit::AuditAction;
use crate::db::Filter;
use crate::error::AppError;
use crate::models::{
    CenterMedia, CenterMediaUpdate, CenterUpdate, CenterWithMedia, InformationCenter, NewCenter,
    NewCenterMedia, RecordMeta,
};
use crate::table::{Column, TableSpec};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

impl Entity for InformationCenter {
    type Create = NewCenter;
    type Update = CenterUpdate;

    const TABLE: &'static str = "information_centers";
    const LABEL: &'static str = "Information center";

    const DELETED: AuditAction = AuditAction::CenterArchived;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn table_spec() -> TableSpec {
        TableSpec::new(vec![
            Column::new("name", "Name"),
            Column::new("location", "Location"),
            Column::new("contact_phone", "Phone").unsortable(),
            Column::new("contact_email", "Email").unsortable(),
            Column::new("status", "Status"),
        ])
        .search_keys(["name", "location", "description"])
        .filter_keys(["status"])
    }

    fn scope() -> Vec<Filter> {
        vec![Filter::neq("status", "deleted")]
    }

    fn soft_delete() -> Option<(&'static str, Value)> {
        Some(("status", Value::from("deleted")))
    }
}

impl Entity for CenterMedia {
    type Create = NewCenterMedia;
    type Update = CenterMediaUpdate;

    const TABLE: &'static str = "center_media";
    const LABEL: &'static str = "Center media";

    const CREATED: AuditAction = AuditAction::MediaUploaded;
    const DELETED: AuditAction = AuditAction::MediaDeleted;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn table_spec() -> TableSpec {
        TableSpec::new(vec![
            Column::new("media_type", "Type"),
            Column::new("url", "URL").unsortable(),
            Column::new("caption", "Caption"),
            Column::new("created_at", "Added"),
        ])
        .filter_keys(["media_type"])
    }
}

impl Manager<InformationCenter> {
    pub async fn active(&self) -> Result<Vec<InformationCenter>, AppError> {
        self.list(vec![Filter::eq("status", "active")]).await
    }
}

impl Manager<CenterMedia> {
    pub async fn for_center(&self, center_id: Uuid) -> Result<Vec<CenterMedia>, AppError> {
        self.list(vec![Filter::eq("center_id", center_id.to_string())]).await
    }

    /// Attach media to the given centers in one fetch
    pub async fn attach(&self, centers: Vec<InformationCenter>) -> Result<Vec<CenterWithMedia>, AppError> {
        let ids = centers.iter().map(|c| c.meta.id.to_string());
        let media = if centers.is_empty() {
            Vec::new()
        } else {
            self.list(vec![Filter::is_in("center_id", ids)]).await?
        };

        let mut grouped: HashMap<Uuid, Vec<CenterMedia>> = HashMap::new();
        for item in media {
            grouped.entry(item.center_id).or_default().push(item);
        }
        Ok(centers
            .into_iter()
            .map(|center| CenterWithMedia {
                media: grouped.remove(&center.meta.id).unwrap_or_default(),
                center,
            })
            .collect())
    }
}
