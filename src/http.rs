use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use sqlx::sqlite::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::dto::{CreateContactDto, UpdateContactDto};
use crate::error::ApiError;
use crate::service::ContactService;

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone)]
pub struct AppState {
    pub service: ContactService,
    pub pool: SqlitePool,
}

pub fn router(state: AppState, cors_allowed_origins: &[String]) -> Router {
    let mut app = Router::new()
        .route("/api/v1/contacts", get(list_contacts).post(create_contact))
        .route("/api/v1/contacts/search", get(search_contacts))
        .route(
            "/api/v1/contacts/:id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if !cors_allowed_origins.is_empty() {
        let origins: Vec<HeaderValue> = cors_allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageParams {
    page: Option<i64>,
    page_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    #[serde(default)]
    q: String,
    page: Option<i64>,
    page_size: Option<i64>,
}

/// Out-of-range paging values are silently corrected, never rejected:
/// `page < 1` becomes 1, a non-positive `pageSize` falls back to the default,
/// and `pageSize` is capped at 100.
fn clamp_paging(page: Option<i64>, page_size: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let mut page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size < 1 {
        page_size = DEFAULT_PAGE_SIZE;
    }
    (page, page_size.min(MAX_PAGE_SIZE))
}

fn not_found(id: i64) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Contact not found", "id": id })),
    )
        .into_response()
}

async fn list_contacts(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let (page, page_size) = clamp_paging(params.page, params.page_size);
    let result = state.service.get_all(page, page_size).await?;
    Ok(Json(result).into_response())
}

async fn search_contacts(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let (page, page_size) = clamp_paging(params.page, params.page_size);
    let result = state.service.search(&params.q, page, page_size).await?;
    Ok(Json(result).into_response())
}

async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    match state.service.get_by_id(id).await? {
        Some(contact) => Ok(Json(contact).into_response()),
        None => Ok(not_found(id)),
    }
}

async fn create_contact(
    State(state): State<AppState>,
    Json(dto): Json<CreateContactDto>,
) -> Result<Response, ApiError> {
    dto.validate()?;
    let contact = state.service.create(dto).await?;
    Ok((StatusCode::CREATED, Json(contact)).into_response())
}

async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(dto): Json<UpdateContactDto>,
) -> Result<Response, ApiError> {
    dto.validate()?;
    match state.service.update(id, dto).await? {
        Some(contact) => Ok(Json(contact).into_response()),
        None => Ok(not_found(id)),
    }
}

async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    match state.service.delete(id).await? {
        Some(contact) => Ok(Json(contact).into_response()),
        None => Ok(not_found(id)),
    }
}

async fn health(State(state): State<AppState>) -> Result<Response, ApiError> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.pool)
        .await?;
    Ok(Json(json!({ "status": "healthy" })).into_response())
}
