use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    readings::{
        dto::{Page, ReadingInput},
        filter::ReadingFilter,
        ordering::Ordering,
        repo::{self, Reading},
    },
    state::AppState,
};

pub fn collection_routes() -> Router<AppState> {
    Router::new().route("/readings/", get(list_readings).post(create_reading))
}

pub fn detail_routes() -> Router<AppState> {
    Router::new().route(
        "/readings/:id/",
        get(get_reading).put(update_reading).delete(delete_reading),
    )
}

/// 1-based page window; a page past the end is a 404, like an unknown record.
pub(crate) fn page_window(count: i64, page: i64, page_size: i64) -> Result<(i64, i64), ApiError> {
    if page < 1 {
        return Err(ApiError::NotFound);
    }
    let last_page = std::cmp::max(1, (count + page_size - 1) / page_size);
    if page > last_page {
        return Err(ApiError::NotFound);
    }
    Ok((page_size, (page - 1) * page_size))
}

fn parse_page(params: &HashMap<String, String>) -> Result<i64, ApiError> {
    match params.get("page") {
        None => Ok(1),
        Some(raw) => raw.parse::<i64>().map_err(|_| ApiError::NotFound),
    }
}

/// Routes carry UUIDs; anything else is indistinguishable from a missing row.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}

#[instrument(skip(state, params))]
pub async fn list_readings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<Reading>>, ApiError> {
    let filter = ReadingFilter::from_query(&params)?;
    let ordering = Ordering::parse(params.get("ordering").map(String::as_str))?;
    let page = parse_page(&params)?;

    let count = repo::count_for_user(&state.db, user_id, &filter).await?;
    let (limit, offset) = page_window(count, page, state.config.page_size)?;
    let results = repo::list_for_user(&state.db, user_id, &filter, &ordering, limit, offset).await?;

    let last_page = std::cmp::max(1, (count + state.config.page_size - 1) / state.config.page_size);
    Ok(Json(Page {
        count,
        next: (page < last_page).then(|| page + 1),
        previous: (page > 1).then(|| page - 1),
        results,
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_reading(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ReadingInput>,
) -> Result<(StatusCode, Json<Reading>), ApiError> {
    let reading = repo::create_for_user(&state.db, user_id, payload.validate()?).await?;
    info!(user_id = %user_id, reading_id = %reading.id, "reading created");
    Ok((StatusCode::CREATED, Json(reading)))
}

#[instrument(skip(state))]
pub async fn get_reading(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Reading>, ApiError> {
    let id = parse_id(&id)?;
    let reading = repo::get_for_user(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(reading))
}

#[instrument(skip(state, payload))]
pub async fn update_reading(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<ReadingInput>,
) -> Result<Json<Reading>, ApiError> {
    let id = parse_id(&id)?;
    let reading = repo::update_for_user(&state.db, user_id, id, payload.validate()?)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(user_id = %user_id, reading_id = %reading.id, "reading updated");
    Ok(Json(reading))
}

#[instrument(skip(state))]
pub async fn delete_reading(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    if !repo::delete_for_user(&state.db, user_id, id).await? {
        return Err(ApiError::NotFound);
    }
    info!(user_id = %user_id, reading_id = %id, "reading deleted");
    Ok(StatusCode::NO_CONTENT)
}
