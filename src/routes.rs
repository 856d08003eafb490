//! Route definitions and router setup
//!
//! Configures all API routes and middleware. Access control happens once,
//! in the route guard, against the capability table in `crate::auth`.

mod admin;
mod auth;
mod centers;
mod checkout;
mod client;
mod crud;
mod dashboard;
mod public;
mod sitemap;
mod storage;

use crate::auth::route_guard;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::{
    Advertisement, BlogPost, Booking, InformationCenter, Package, Payment, Profile,
    VolunteerActivity,
};
use crate::settings::{is_enabled, keys};
use crate::state::SharedState;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Largest accepted upload body
const UPLOAD_LIMIT: usize = 20 * 1024 * 1024;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, config: &AppConfig) -> Router {
    let cors = build_cors_layer(config);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let middleware_stack = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    let storage_root = state.storage.root().to_path_buf();

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .route("/sitemap.xml", get(sitemap::sitemap_xml))

        // Authentication
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/me", get(auth::me))

        // Public site
        .route("/api/settings/public", get(public::settings))
        .route("/api/packages", get(public::packages))
        .route("/api/packages/{slug}", get(public::package))
        .route("/api/blog", get(public::blog_posts))
        .route("/api/blog/{slug}", get(public::blog_post))
        .route("/api/ads", get(public::advertisements))
        .route("/api/centers", get(public::centers))
        .route("/api/volunteer-activities", get(public::volunteer_activities))
        .route("/api/checkout", post(checkout::checkout))

        // Admin
        .route("/api/admin/settings", get(admin::list_settings).put(admin::write_setting))
        .route("/api/admin/settings/refresh", post(admin::refresh_settings))
        .route("/api/admin/profiles/{id}/role", put(admin::change_role))
        .route("/api/admin/audit-logs", get(admin::audit_logs))
        .route("/api/admin/audit-logs/export", get(admin::export_audit_logs))
        .merge(crud::read_routes::<Profile>("/api/admin/profiles"))
        .merge(crud::routes::<Package>("/api/admin/packages"))
        .merge(crud::routes::<Advertisement>("/api/admin/advertisements"))
        .merge(crud::routes::<BlogPost>("/api/admin/blog-posts"))

        // Operations
        .merge(crud::routes::<Booking>("/api/manage/bookings"))
        .merge(crud::routes::<InformationCenter>("/api/manage/centers"))
        .merge(crud::routes::<VolunteerActivity>("/api/manage/volunteer-activities"))
        .route(
            "/api/manage/centers/{id}/media",
            get(centers::list_media).post(centers::add_media),
        )
        .route(
            "/api/manage/centers/{id}/media/upload",
            post(centers::upload_media).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route(
            "/api/manage/centers/{id}/media/{media_id}",
            delete(centers::delete_media),
        )
        .route(
            "/api/storage/{bucket}",
            post(storage::upload).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )

        // Finance
        .merge(crud::routes::<Payment>("/api/finance/payments"))
        .merge(crud::read_routes::<Booking>("/api/finance/bookings"))

        // Client self-service
        .route("/api/client/bookings", get(client::bookings))
        .route("/api/client/bookings/{id}", get(client::booking))
        .route("/api/client/payments", get(client::payments))

        // Dashboards
        .route("/api/dashboard/admin", get(dashboard::admin))
        .route("/api/dashboard/tour-manager", get(dashboard::tour_manager))
        .route("/api/dashboard/accountant", get(dashboard::accountant))
        .route("/api/dashboard/client", get(dashboard::client))

        // Uploaded files
        .nest_service("/storage", ServeDir::new(storage_root))
        .fallback(not_found)

        // Apply middleware and state
        .layer(middleware::from_fn_with_state(state.clone(), route_guard))
        .layer(middleware_stack)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers([header::CONTENT_DISPOSITION])
        .max_age(Duration::from_secs(3600));

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

/// Health check endpoint
async fn health_check(State(state): State<SharedState>) -> axum::Json<serde_json::Value> {
    let site = state.settings.get(keys::SITE_NAME, "Wanderlust Tours").await;
    let maintenance = is_enabled(state.settings.value(keys::MAINTENANCE_MODE).await.as_deref());
    axum::Json(serde_json::json!({
        "success": true,
        "message": format!("{} is running fine.", site),
        "maintenance": maintenance,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn not_found(uri: axum::http::Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{create_tokens, decode_token, Role};
    use crate::db::MemoryGateway;
    use crate::models::{NewPackage, PackageStatus, RegisterRequest};
    use crate::state::AppState;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn test_state() -> SharedState {
        let config = AppConfig::default();
        Arc::new(AppState::new(Arc::new(MemoryGateway::new()), &config))
    }

    fn bearer(state: &SharedState, role: Role) -> String {
        let tokens = create_tokens(&state.auth, Uuid::new_v4(), "someone@example.com", role)
            .expect("tokens");
        format!("Bearer {}", tokens.access_token)
    }

    async fn send(state: &SharedState, request: Request<Body>) -> (StatusCode, Value) {
        let app = create_router(state.clone(), &AppConfig::default());
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn seed_package(state: &SharedState, slug: &str, status: PackageStatus) -> Package {
        state
            .packages
            .create(
                NewPackage {
                    title: format!("Tour {}", slug),
                    slug: slug.to_string(),
                    description: "Ten days in the dunes".to_string(),
                    price: 1200.0,
                    duration_days: 10,
                    location: "Merzouga".to_string(),
                    image_url: None,
                    status,
                },
                None,
            )
            .await
            .expect("package")
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let state = test_state();
        let (status, body) = send(
            &state,
            Request::get("/api/admin/settings").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["redirect"], "/auth");
    }

    #[tokio::test]
    async fn test_wrong_role_is_sent_home() {
        let state = test_state();
        let request = Request::get("/api/admin/settings")
            .header(header::AUTHORIZATION, bearer(&state, Role::Client))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["redirect"], "/dashboard");
    }

    #[tokio::test]
    async fn test_public_packages_hide_inactive() {
        let state = test_state();
        seed_package(&state, "sahara-trek", PackageStatus::Active).await;
        seed_package(&state, "atlas-winter", PackageStatus::Inactive).await;

        let (status, body) = send(
            &state,
            Request::get("/api/packages?search=sahara").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["rows"][0]["slug"], "sahara-trek");
    }

    #[tokio::test]
    async fn test_checkout_then_client_sees_booking() {
        let state = test_state();
        let package = seed_package(&state, "sahara-trek", PackageStatus::Active).await;

        let request = Request::post("/api/checkout")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "packageId": package.meta.id,
                    "fullName": "Amina Traveler",
                    "email": "amina@example.com",
                    "numTravelers": 2,
                    "travelDate": "2030-03-01",
                    "paymentMethod": "card"
                })
                .to_string(),
            ))
            .unwrap();
        let (status, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["booking"]["status"], "pending");
        assert_eq!(body["data"]["payment"]["status"], "pending");

        assert!(body["data"]["profile"].is_null());

        let client_id: Uuid = serde_json::from_value(body["data"]["booking"]["client_id"].clone()).unwrap();
        let tokens = create_tokens(&state.auth, client_id, "amina@example.com", Role::Client).unwrap();
        let request = Request::get("/api/client/bookings")
            .header(header::AUTHORIZATION, format!("Bearer {}", tokens.access_token))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);
    }

    async fn register_client(state: &SharedState, email: &str) -> Profile {
        state
            .profiles
            .register(RegisterRequest {
                email: email.to_string(),
                password: "sahara-nights".to_string(),
                full_name: "Amina Traveler".to_string(),
                phone: None,
            })
            .await
            .expect("profile")
    }

    #[tokio::test]
    async fn test_guest_checkout_with_registered_email_needs_sign_in() {
        let state = test_state();
        let package = seed_package(&state, "sahara-trek", PackageStatus::Active).await;
        register_client(&state, "amina@example.com").await;

        let request = Request::post("/api/checkout")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "packageId": package.meta.id,
                    "fullName": "Someone Else",
                    "email": "amina@example.com",
                    "numTravelers": 1,
                    "travelDate": "2030-03-01",
                    "paymentMethod": "card"
                })
                .to_string(),
            ))
            .unwrap();
        let (status, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["redirect"], "/auth");
        assert!(state.bookings.list(vec![]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_picks_up_role_change() {
        let state = test_state();
        let profile = register_client(&state, "guide@example.com").await;
        let tokens = create_tokens(&state.auth, profile.meta.id, &profile.email, Role::Client).unwrap();

        state
            .profiles
            .change_role(profile.meta.id, Role::TourManager, profile.meta.version, None)
            .await
            .unwrap();

        let request = Request::post("/api/auth/refresh")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "refreshToken": tokens.refresh_token }).to_string()))
            .unwrap();
        let (status, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::OK);

        let access = body["tokens"]["accessToken"].as_str().unwrap();
        let claims = decode_token(&state.auth, access).unwrap();
        assert_eq!(claims.role, Role::TourManager);
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let state = test_state();
        let package = seed_package(&state, "sahara-trek", PackageStatus::Active).await;

        let update = |version: i64| {
            Request::put(format!("/api/admin/packages/{}", package.meta.id))
                .header(header::AUTHORIZATION, bearer(&state, Role::Admin))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "version": version, "price": 990.0 }).to_string()))
                .unwrap()
        };

        let (status, body) = send(&state, update(package.meta.version)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["price"], 990.0);

        let (status, _) = send(&state, update(package.meta.version)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_update_cannot_take_another_slug() {
        let state = test_state();
        let trek = seed_package(&state, "sahara-trek", PackageStatus::Active).await;
        seed_package(&state, "atlas-winter", PackageStatus::Active).await;

        let rename = |slug: &str| {
            Request::put(format!("/api/admin/packages/{}", trek.meta.id))
                .header(header::AUTHORIZATION, bearer(&state, Role::Admin))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "version": trek.meta.version, "slug": slug }).to_string()))
                .unwrap()
        };

        let (status, _) = send(&state, rename("atlas-winter")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(state.packages.get(trek.meta.id).await.unwrap().slug, "sahara-trek");

        let (status, body) = send(&state, rename("sahara-trek")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["slug"], "sahara-trek");
    }

    #[tokio::test]
    async fn test_health_reports_maintenance_flag() {
        let state = test_state();
        state
            .settings
            .write(crate::settings::WriteSetting {
                key: keys::MAINTENANCE_MODE.to_string(),
                value: Some("true".to_string()),
                category: None,
                data_type: None,
            })
            .await
            .unwrap();

        let (status, body) = send(&state, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["maintenance"], true);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let state = test_state();
        let (status, body) = send(
            &state,
            Request::get("/api/nowhere").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
