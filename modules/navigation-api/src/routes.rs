use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use navigation_config::{
    GrantedPermissions, MoveIntent, NavGroup, NavigationManager, PageDraft, PageEdit, PageEntry,
    ResetConfirmation, Section, SectionDraft, SectionEdit, SectionRef,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::error::ApiError;

/// Header carrying the caller's granted permissions, comma-separated.
pub const GRANTED_PERMISSIONS_HEADER: &str = "x-granted-permissions";

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<NavigationManager>,
    pub admin_token: Arc<str>,
}

impl AppState {
    pub fn new(manager: Arc<NavigationManager>, admin_token: impl Into<Arc<str>>) -> Self {
        Self {
            manager,
            admin_token: admin_token.into(),
        }
    }
}

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let admin = Router::new()
        .route("/sections", get(list_sections).post(create_section))
        .route(
            "/sections/{key}",
            patch(update_section).delete(delete_section),
        )
        .route("/sections/{key}/move", post(move_section))
        .route("/pages", get(list_pages).post(create_page))
        .route("/pages/{key}", patch(update_page).delete(delete_page))
        .route("/pages/{key}/visibility", post(set_page_visibility))
        .route("/pages/{key}/move", post(move_page))
        .route("/groups", get(list_groups))
        .route("/reset", post(reset))
        .route("/render", get(render))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .nest("/api/navigation", admin)
        .route("/health", get(health))
        .with_state(state)
        .layer(cors)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

// --- Auth ---

async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token_matches(token, &state.admin_token) => next.run(req).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "unauthorized"})),
        )
            .into_response(),
    }
}

/// Compare without short-circuiting on the first differing byte.
fn token_matches(presented: &str, expected: &str) -> bool {
    let (presented, expected) = (presented.as_bytes(), expected.as_bytes());
    let mut diff = presented.len() ^ expected.len();
    for (i, byte) in presented.iter().enumerate() {
        let other = expected.get(i % expected.len().max(1)).copied().unwrap_or(0);
        diff |= usize::from(byte ^ other);
    }
    diff == 0
}

async fn health() -> &'static str {
    "ok"
}

// --- Request bodies ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveSectionRequest {
    target_index: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovePageRequest {
    source_container: SectionRef,
    target_container: SectionRef,
    target_index: usize,
}

#[derive(Deserialize)]
struct VisibilityRequest {
    visible: bool,
}

#[derive(Deserialize)]
struct ResetRequest {
    confirm: String,
}

#[derive(Deserialize)]
struct DeleteSectionQuery {
    #[serde(default)]
    cascade: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageGroup {
    section_key: SectionRef,
    pages: Vec<PageEntry>,
}

#[derive(Serialize)]
struct Hierarchy {
    sections: Vec<Section>,
    pages: Vec<PageEntry>,
}

// --- Reads ---

async fn list_sections(State(state): State<AppState>) -> Result<Json<Vec<Section>>, ApiError> {
    Ok(Json(state.manager.list_sections().await?))
}

async fn list_pages(State(state): State<AppState>) -> Result<Json<Vec<PageEntry>>, ApiError> {
    Ok(Json(state.manager.list_pages().await?))
}

/// Pages grouped by section, in sidebar order with the ungrouped bucket last.
async fn list_groups(State(state): State<AppState>) -> Result<Json<Vec<PageGroup>>, ApiError> {
    let snapshot = state.manager.snapshot().await?;
    let groups = snapshot
        .groups_in_display_order()
        .into_iter()
        .map(|(section_key, pages)| PageGroup {
            section_key,
            pages: pages.into_iter().cloned().collect(),
        })
        .collect();
    Ok(Json(groups))
}

async fn render(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<NavGroup>>, ApiError> {
    let granted = GrantedPermissions::new(
        headers
            .get(GRANTED_PERMISSIONS_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty()),
    );
    Ok(Json(state.manager.navigation_for(&granted).await?))
}

// --- Sections ---

async fn create_section(
    State(state): State<AppState>,
    Json(draft): Json<SectionDraft>,
) -> Result<(StatusCode, Json<Section>), ApiError> {
    let section = state.manager.create_section(draft).await?;
    Ok((StatusCode::CREATED, Json(section)))
}

async fn update_section(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(edit): Json<SectionEdit>,
) -> Result<Json<Section>, ApiError> {
    Ok(Json(state.manager.update_section(&key, edit).await?))
}

async fn move_section(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<MoveSectionRequest>,
) -> Result<Json<Vec<Section>>, ApiError> {
    state.manager.move_section(&key, req.target_index).await?;
    Ok(Json(state.manager.list_sections().await?))
}

async fn delete_section(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<DeleteSectionQuery>,
) -> Result<StatusCode, ApiError> {
    state.manager.delete_section(&key, query.cascade).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Pages ---

async fn create_page(
    State(state): State<AppState>,
    Json(draft): Json<PageDraft>,
) -> Result<(StatusCode, Json<PageEntry>), ApiError> {
    let page = state.manager.create_page(draft).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

async fn update_page(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(edit): Json<PageEdit>,
) -> Result<Json<PageEntry>, ApiError> {
    Ok(Json(state.manager.update_page(&key, edit).await?))
}

async fn set_page_visibility(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<VisibilityRequest>,
) -> Result<Json<PageEntry>, ApiError> {
    Ok(Json(
        state.manager.set_page_visibility(&key, req.visible).await?,
    ))
}

async fn move_page(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<MovePageRequest>,
) -> Result<Json<Vec<PageGroup>>, ApiError> {
    let intent = MoveIntent::new(key, req.source_container, req.target_container, req.target_index);
    state.manager.move_page(intent).await?;
    list_groups(State(state)).await
}

async fn delete_page(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.manager.delete_page(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Reset ---

async fn reset(
    State(state): State<AppState>,
    Json(req): Json<ResetRequest>,
) -> Result<Json<Hierarchy>, ApiError> {
    let confirmed = ResetConfirmation::parse(&req.confirm)?;
    let snapshot = state.manager.reset_to_defaults(confirmed).await?;
    Ok(Json(Hierarchy {
        sections: snapshot.sections.list().to_vec(),
        pages: snapshot.pages.list().to_vec(),
    }))
}
