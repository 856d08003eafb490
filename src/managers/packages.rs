//! Tour packages

use super::{Entity, Manager};
use crate::db::Filter;
use crate::error::{not_found_error, AppError};
use crate::models::{NewPackage, Package, PackageUpdate, RecordMeta};
use crate::table::{money, Column, TableSpec};

impl Entity for Package {
    type Create = NewPackage;
    type Update = PackageUpdate;

    const TABLE: &'static str = "packages";
    const LABEL: &'static str = "Package";

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn table_spec() -> TableSpec {
        TableSpec::new(vec![
            Column::new("title", "Title"),
            Column::new("location", "Location"),
            Column::new("price", "Price").render(money("price")),
            Column::new("duration_days", "Days"),
            Column::new("status", "Status"),
            Column::new("created_at", "Created"),
        ])
        .search_keys(["title", "slug", "location", "description"])
        .filter_keys(["status"])
    }
}

impl Manager<Package> {
    /// Packages visible on the public site
    pub async fn active(&self) -> Result<Vec<Package>, AppError> {
        self.list(vec![Filter::eq("status", "active")]).await
    }

    pub async fn by_slug(&self, slug: &str) -> Result<Package, AppError> {
        self.find(vec![Filter::eq("slug", slug), Filter::eq("status", "active")])
            .await?
            .ok_or_else(|| not_found_error(format!("Package '{}' not found", slug)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::gateway;
    use crate::models::PackageStatus;

    fn package(slug: &str, status: PackageStatus) -> NewPackage {
        NewPackage {
            title: slug.to_string(),
            slug: slug.to_string(),
            description: "d".to_string(),
            price: 10.0,
            duration_days: 1,
            location: "Fes".to_string(),
            image_url: Some("https://img.example.com/a.jpg".to_string()),
            status,
        }
    }

    #[tokio::test]
    async fn test_public_lookups_skip_inactive() {
        let (gateway, audit) = gateway();
        let manager: Manager<Package> = Manager::new(gateway, audit);
        manager.create(package("medina-walk", PackageStatus::Active), None).await.unwrap();
        manager.create(package("closed-trail", PackageStatus::Inactive), None).await.unwrap();

        assert_eq!(manager.active().await.unwrap().len(), 1);
        assert!(manager.by_slug("medina-walk").await.is_ok());
        assert!(matches!(manager.by_slug("closed-trail").await, Err(AppError::NotFound(_))));
        assert!(matches!(manager.ensure_unique("slug", "closed-trail").await, Err(AppError::Conflict(_))));
        assert!(manager.ensure_unique("slug", "new-trail").await.is_ok());
    }

    #[tokio::test]
    async fn test_slug_check_ignores_own_record() {
        let (gateway, audit) = gateway();
        let manager: Manager<Package> = Manager::new(gateway, audit);
        let walk = manager.create(package("medina-walk", PackageStatus::Active), None).await.unwrap();
        manager.create(package("dune-camp", PackageStatus::Active), None).await.unwrap();

        assert!(manager.ensure_unique_except("slug", "medina-walk", walk.meta.id).await.is_ok());
        assert!(matches!(
            manager.ensure_unique_except("slug", "dune-camp", walk.meta.id).await,
            Err(AppError::Conflict(_))
        ));
    }
}
