//! Blog posts

use super::{Entity, Manager};
use crate::db::Filter;
use crate::error::{not_found_error, AppError};
use crate::models::{BlogPost, BlogPostUpdate, NewBlogPost, RecordMeta};
use crate::table::{Column, TableSpec};

impl Entity for BlogPost {
    type Create = NewBlogPost;
    type Update = BlogPostUpdate;

    const TABLE: &'static str = "blog_posts";
    const LABEL: &'static str = "Blog post";

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn table_spec() -> TableSpec {
        TableSpec::new(vec![
            Column::new("title", "Title"),
            Column::new("slug", "Slug"),
            Column::new("published", "Published")
                .render(|r| if r["published"] == true { "Yes" } else { "No" }.to_string()),
            Column::new("created_at", "Created"),
        ])
        .search_keys(["title", "slug", "excerpt"])
        .filter_keys(["published"])
    }
}

impl Manager<BlogPost> {
    pub async fn published(&self) -> Result<Vec<BlogPost>, AppError> {
        self.list(vec![Filter::eq("published", true)]).await
    }

    pub async fn published_by_slug(&self, slug: &str) -> Result<BlogPost, AppError> {
        self.find(vec![Filter::eq("slug", slug), Filter::eq("published", true)])
            .await?
            .ok_or_else(|| not_found_error(format!("Post '{}' not found", slug)))
    }
}
