use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config;
use crate::database::DatabaseManager;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{require_super_admin, session_auth_middleware};

/// Full application router: public, protected and elevated tiers plus global layers
pub fn app() -> Router {
    let config = config::config();

    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        .merge(protected_routes())
        .merge(elevated_routes())
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer());

    if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn public_routes() -> Router {
    use public::auth;

    Router::new()
        .route("/auth/register", post(auth::register_post))
        .route("/auth/sign-in", post(auth::sign_in_post))
        .route("/auth/providers", get(auth::providers_get))
        .route("/auth/invites/:token", get(auth::invite_get))
        .route("/auth/oauth/google", get(auth::google_start))
        .route("/auth/oauth/google/callback", get(auth::google_callback))
}

fn protected_routes() -> Router {
    use protected::{audits, auth, projects, reports, settings, views};

    Router::new()
        // Session
        .route("/api/auth/session", get(auth::session_get))
        .route("/api/auth/sign-out", post(auth::sign_out_post))
        // Projects
        .route("/api/projects", get(projects::project_list).post(projects::project_create))
        .route(
            "/api/projects/:id",
            patch(projects::project_update).delete(projects::project_delete),
        )
        // Audits
        .route("/api/audits", get(audits::audit_list).post(audits::audit_create))
        .route("/api/audits/:id", get(audits::audit_show))
        .route("/api/audits/:id/retry", post(audits::audit_retry))
        .route("/api/audits/:id/overview", get(audits::audit_overview))
        .route("/api/audits/:id/issues", get(audits::audit_issues))
        .route("/api/audits/:id/off-page", get(audits::audit_off_page))
        // Reports
        .route("/api/reports", get(reports::report_list))
        .route("/api/reports/:id", axum::routing::delete(reports::report_delete))
        .route("/api/reports/:id/download", get(reports::report_download))
        // Settings
        .route("/api/settings", get(settings::settings_get).put(settings::settings_put))
        .route("/api/settings/password", post(settings::password_post))
        .route("/api/settings/api-key", post(settings::api_key_post))
        // Views
        .route("/api/dashboard", get(views::dashboard_get))
        .route("/api/history", get(views::history_get))
        .route("/api/history/compare", get(views::history_compare))
        .route("/api/plans", get(views::plans_get))
        .route("/api/issues/summary", get(views::issue_summary_get))
        .route("/api/overview/latest", get(views::latest_audit_get))
        .route_layer(middleware::from_fn(session_auth_middleware))
}

fn elevated_routes() -> Router {
    use elevated::admin;

    Router::new()
        .route("/api/admin/users", get(admin::user_list).post(admin::user_create))
        .route("/api/admin/users/:id", patch(admin::user_update))
        .route("/api/admin/overview", get(admin::overview_get))
        .route(
            "/api/admin/system-settings",
            get(admin::system_settings_get).put(admin::system_settings_put),
        )
        .route("/api/invites", get(admin::invite_list).post(admin::invite_create))
        // Outer layer runs first: resolve the session, then check the role
        .route_layer(middleware::from_fn(require_super_admin))
        .route_layer(middleware::from_fn(session_auth_middleware))
}

/// Explicit origins allow credentialed requests; an empty list means any origin without cookies
fn cors_layer() -> CorsLayer {
    let security = &config::config().security;
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Cascade SEO",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "SEO audit service: accounts, projects, audits and reports",
            "endpoints": {
                "auth": "/auth/register, /auth/sign-in, /auth/providers, /auth/invites/:token, /auth/oauth/google (public)",
                "session": "/api/auth/session, /api/auth/sign-out (protected)",
                "projects": "/api/projects[/:id] (protected)",
                "audits": "/api/audits[/:id[/retry|/overview|/issues|/off-page]] (protected)",
                "reports": "/api/reports[/:id[/download]] (protected)",
                "settings": "/api/settings[/password|/api-key] (protected)",
                "views": "/api/dashboard, /api/history[/compare], /api/plans, /api/issues/summary, /api/overview/latest (protected)",
                "admin": "/api/admin/*, /api/invites (super-admin)",
            }
        }
    }))
}

async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "code": "SERVICE_UNAVAILABLE",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
