use crate::error::ApiResult;
use crate::settings::keys;
use crate::sitemap::{self, SitemapEntry};
use crate::state::SharedState;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};

/// GET /sitemap.xml
///
/// Static pages plus every bookable package and published post. The base
/// URL comes from the `site_url` setting when one is stored.
pub async fn sitemap_xml(State(state): State<SharedState>) -> ApiResult<impl IntoResponse> {
    let (packages, posts) = tokio::try_join!(state.packages.active(), state.blog.published())?;

    let base = state.settings.get(keys::SITE_URL, &state.site_url).await;
    let entries: Vec<SitemapEntry> = packages
        .iter()
        .map(|p| SitemapEntry::page(format!("/packages/{}", p.slug), p.meta.updated_at.date_naive()))
        .chain(
            posts
                .iter()
                .map(|p| SitemapEntry::page(format!("/blog/{}", p.slug), p.meta.updated_at.date_naive())),
        )
        .collect();

    Ok((
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        sitemap::build(&base, &entries),
    ))
}
