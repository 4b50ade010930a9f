//! Type handlers. A type's name travels as `type`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::error::ApiError;
use super::pagination::{Page, PageRequest};
use super::{required, trimmed, AppState};
use crate::storage::{EntityKind, FieldErrors, PokemonType, TypeFields};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/types/", get(list).post(create))
        .route("/types/create/", post(create))
        .route(
            "/types/:id/",
            get(retrieve).put(replace).patch(modify).delete(destroy),
        )
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    page: Option<String>,
}

/// Body of a type write.
#[derive(Debug, Default, Deserialize)]
pub struct TypePayload {
    /// Unique name
    #[serde(rename = "type")]
    pub name: Option<String>,
}

impl TypePayload {
    /// Resolve into write fields, filling the name from `current` if absent.
    ///
    /// # Errors
    /// `Validation` when no name is available.
    pub fn into_fields(self, current: Option<&PokemonType>) -> Result<TypeFields, ApiError> {
        let mut errors = FieldErrors::new();
        let name = required(
            &mut errors,
            "type",
            trimmed(self.name),
            current.map(|t| t.name.clone()),
        );
        match name {
            Some(name) => Ok(TypeFields { name }),
            None => Err(ApiError::Validation(errors)),
        }
    }
}

async fn list(
    State(state): State<AppState>,
    uri: Uri,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Page<PokemonType>>, ApiError> {
    let Query(query) = query?;
    let request = PageRequest::parse(query.page.as_deref(), state.page_size)?;
    let count = state.store.count_types().await?;
    request.check(count)?;
    let results = state.store.list_types(request.size, request.offset()).await?;
    Ok(Json(request.into_page(&uri, count, results)))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<TypePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<PokemonType>), ApiError> {
    let Json(payload) = payload?;
    let fields = payload.into_fields(None)?;
    Ok((StatusCode::CREATED, Json(state.store.create_type(&fields).await?)))
}

async fn fetch(state: &AppState, id: i64) -> Result<PokemonType, ApiError> {
    state
        .store
        .get_type(id)
        .await?
        .ok_or_else(|| ApiError::not_found(EntityKind::Type))
}

async fn retrieve(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<PokemonType>, ApiError> {
    let Path(id) = path?;
    Ok(Json(fetch(&state, id).await?))
}

async fn replace(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TypePayload>, JsonRejection>,
) -> Result<Json<PokemonType>, ApiError> {
    let Path(id) = path?;
    fetch(&state, id).await?;
    let Json(payload) = payload?;
    let fields = payload.into_fields(None)?;
    Ok(Json(state.store.update_type(id, &fields).await?))
}

async fn modify(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TypePayload>, JsonRejection>,
) -> Result<Json<PokemonType>, ApiError> {
    let Path(id) = path?;
    let current = fetch(&state, id).await?;
    let Json(payload) = payload?;
    let fields = payload.into_fields(Some(&current))?;
    Ok(Json(state.store.update_type(id, &fields).await?))
}

async fn destroy(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    if state.store.delete_type(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(EntityKind::Type))
    }
}
