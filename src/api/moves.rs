//! Move handlers.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::error::ApiError;
use super::pagination::{Page, PageRequest};
use super::{required, trimmed, AppState};
use crate::storage::{non_negative_u32, EntityKind, FieldErrors, Move, MoveFields};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/moves/", get(list).post(create))
        .route("/moves/create/", post(create))
        .route(
            "/moves/:id/",
            get(retrieve).put(replace).patch(modify).delete(destroy),
        )
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    page: Option<String>,
}

/// Body of a move write.
#[derive(Debug, Default, Deserialize)]
pub struct MovePayload {
    /// Unique name
    pub name: Option<String>,
    /// Strength; negative values are rejected
    pub power: Option<i64>,
}

impl MovePayload {
    /// Resolve into write fields, filling absent ones from `current`.
    ///
    /// # Errors
    /// `Validation` listing missing or out-of-range fields.
    pub fn into_fields(self, current: Option<&Move>) -> Result<MoveFields, ApiError> {
        let mut errors = FieldErrors::new();
        let name = required(
            &mut errors,
            "name",
            trimmed(self.name),
            current.map(|m| m.name.clone()),
        );
        let power = required(
            &mut errors,
            "power",
            self.power,
            current.map(|m| i64::from(m.power)),
        )
        .and_then(|raw| non_negative_u32(&mut errors, "power", raw));

        match (name, power) {
            (Some(name), Some(power)) if errors.is_empty() => Ok(MoveFields { name, power }),
            _ => Err(ApiError::Validation(errors)),
        }
    }
}

async fn list(
    State(state): State<AppState>,
    uri: Uri,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Page<Move>>, ApiError> {
    let Query(query) = query?;
    let request = PageRequest::parse(query.page.as_deref(), state.page_size)?;
    let count = state.store.count_moves().await?;
    request.check(count)?;
    let results = state.store.list_moves(request.size, request.offset()).await?;
    Ok(Json(request.into_page(&uri, count, results)))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<MovePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Move>), ApiError> {
    let Json(payload) = payload?;
    let fields = payload.into_fields(None)?;
    Ok((StatusCode::CREATED, Json(state.store.create_move(&fields).await?)))
}

async fn fetch(state: &AppState, id: i64) -> Result<Move, ApiError> {
    state
        .store
        .get_move(id)
        .await?
        .ok_or_else(|| ApiError::not_found(EntityKind::Move))
}

async fn retrieve(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Move>, ApiError> {
    let Path(id) = path?;
    Ok(Json(fetch(&state, id).await?))
}

async fn replace(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<MovePayload>, JsonRejection>,
) -> Result<Json<Move>, ApiError> {
    let Path(id) = path?;
    fetch(&state, id).await?;
    let Json(payload) = payload?;
    let fields = payload.into_fields(None)?;
    Ok(Json(state.store.update_move(id, &fields).await?))
}

async fn modify(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<MovePayload>, JsonRejection>,
) -> Result<Json<Move>, ApiError> {
    let Path(id) = path?;
    let current = fetch(&state, id).await?;
    let Json(payload) = payload?;
    let fields = payload.into_fields(Some(&current))?;
    Ok(Json(state.store.update_move(id, &fields).await?))
}

async fn destroy(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    if state.store.delete_move(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(EntityKind::Move))
    }
}
