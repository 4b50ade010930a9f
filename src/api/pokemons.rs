//! Pokemon handlers: CRUD plus the two derived queries.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::error::ApiError;
use super::pagination::{Page, PageRequest};
use super::{required, trimmed, AppState};
use crate::query;
use crate::storage::{
    non_negative_u32, EntityKind, FieldErrors, Move, Pokemon, PokemonFields, PokemonFilter,
};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/pokemons/", get(list).post(create))
        .route("/pokemons/create/", post(create))
        .route(
            "/pokemons/:id/",
            get(retrieve).put(replace).patch(modify).delete(destroy),
        )
        .route("/pokemons/:id/best_move/", get(best_move))
        .route("/pokemons/:id/similar_pokemon/", get(similar_pokemon))
}

// =============================================================================
// Payloads
// =============================================================================

/// Query parameters for the pokemon list.
#[derive(Debug, Default, Deserialize)]
struct PokemonListQuery {
    page: Option<String>,
    #[serde(rename = "types__type")]
    type_name: Option<String>,
    #[serde(rename = "moves__name")]
    move_name: Option<String>,
    search: Option<String>,
}

impl PokemonListQuery {
    fn filter(&self) -> PokemonFilter {
        PokemonFilter {
            type_name: self.type_name.clone(),
            move_name: self.move_name.clone(),
            search: self.search.clone(),
        }
    }
}

/// Body of a pokemon write. Every field is optional on the wire so that
/// missing ones can be reported per field.
#[derive(Debug, Default, Deserialize)]
pub struct PokemonPayload {
    /// Unique name
    pub name: Option<String>,
    /// Pokedex order
    pub order: Option<i64>,
    /// Height
    pub height: Option<f64>,
    /// Weight
    pub weight: Option<f64>,
    /// Type ids
    pub types: Option<Vec<i64>>,
    /// Move ids
    pub moves: Option<Vec<i64>>,
}

impl PokemonPayload {
    /// Resolve into write fields.
    ///
    /// With `current` this is a partial update: absent fields keep their
    /// stored values. Without it every scalar field is required and absent
    /// relations mean none.
    ///
    /// # Errors
    /// `Validation` listing missing or out-of-range fields.
    pub fn into_fields(self, current: Option<&Pokemon>) -> Result<PokemonFields, ApiError> {
        let mut errors = FieldErrors::new();

        let name = required(
            &mut errors,
            "name",
            trimmed(self.name),
            current.map(|p| p.name.clone()),
        );
        let order = required(
            &mut errors,
            "order",
            self.order,
            current.map(|p| i64::from(p.order)),
        )
        .and_then(|raw| non_negative_u32(&mut errors, "order", raw));
        let height = required(&mut errors, "height", self.height, current.map(|p| p.height));
        let weight = required(&mut errors, "weight", self.weight, current.map(|p| p.weight));

        let types = self
            .types
            .or_else(|| current.map(|p| p.types.clone()))
            .unwrap_or_default();
        let moves = self
            .moves
            .or_else(|| current.map(|p| p.move_ids().collect()))
            .unwrap_or_default();

        match (name, order, height, weight) {
            (Some(name), Some(order), Some(height), Some(weight)) if errors.is_empty() => {
                Ok(PokemonFields {
                    name,
                    order,
                    height,
                    weight,
                    types,
                    moves,
                })
            }
            _ => Err(ApiError::Validation(errors)),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn list(
    State(state): State<AppState>,
    uri: Uri,
    query: Result<Query<PokemonListQuery>, QueryRejection>,
) -> Result<Json<Page<Pokemon>>, ApiError> {
    let Query(query) = query?;
    let request = PageRequest::parse(query.page.as_deref(), state.page_size)?;
    let filter = query.filter();

    let count = state.store.count_pokemon(&filter).await?;
    request.check(count)?;
    let results = state
        .store
        .list_pokemon(&filter, request.size, request.offset())
        .await?;

    tracing::debug!(count, page = request.number, "Listed pokemon");
    Ok(Json(request.into_page(&uri, count, results)))
}

async fn create(
    State(state): State<AppState>,
    payload: Result<Json<PokemonPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Pokemon>), ApiError> {
    let Json(payload) = payload?;
    let fields = payload.into_fields(None)?;
    let pokemon = state.store.create_pokemon(&fields).await?;
    Ok((StatusCode::CREATED, Json(pokemon)))
}

async fn fetch(state: &AppState, id: i64) -> Result<Pokemon, ApiError> {
    state
        .store
        .get_pokemon(id)
        .await?
        .ok_or_else(|| ApiError::not_found(EntityKind::Pokemon))
}

async fn retrieve(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Pokemon>, ApiError> {
    let Path(id) = path?;
    Ok(Json(fetch(&state, id).await?))
}

async fn replace(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PokemonPayload>, JsonRejection>,
) -> Result<Json<Pokemon>, ApiError> {
    let Path(id) = path?;
    fetch(&state, id).await?;
    let Json(payload) = payload?;
    let fields = payload.into_fields(None)?;
    Ok(Json(state.store.update_pokemon(id, &fields).await?))
}

async fn modify(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PokemonPayload>, JsonRejection>,
) -> Result<Json<Pokemon>, ApiError> {
    let Path(id) = path?;
    let current = fetch(&state, id).await?;
    let Json(payload) = payload?;
    let fields = payload.into_fields(Some(&current))?;
    Ok(Json(state.store.update_pokemon(id, &fields).await?))
}

async fn destroy(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    if state.store.delete_pokemon(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(EntityKind::Pokemon))
    }
}

async fn best_move(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Move>, ApiError> {
    let Path(id) = path?;
    Ok(Json(query::best_move(state.store.as_ref(), id).await?))
}

async fn similar_pokemon(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Pokemon>>, ApiError> {
    let Path(id) = path?;
    Ok(Json(query::similar_pokemon(state.store.as_ref(), id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Pokemon {
        Pokemon {
            id: 1,
            name: "Charizard".to_string(),
            order: 6,
            height: 17.0,
            weight: 905.0,
            types: vec![1],
            moves: vec![Move {
                id: 2,
                name: "ember".to_string(),
                power: 40,
            }],
        }
    }

    #[test]
    fn test_full_write_requires_scalars() {
        let payload = PokemonPayload {
            name: Some("Charizard".to_string()),
            ..Default::default()
        };
        match payload.into_fields(None).unwrap_err() {
            ApiError::Validation(errors) => {
                let fields: Vec<_> = errors.fields().collect();
                assert_eq!(fields, vec!["height", "order", "weight"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_full_write_defaults_relations_to_empty() {
        let payload = PokemonPayload {
            name: Some("Charizard".to_string()),
            order: Some(6),
            height: Some(17.0),
            weight: Some(905.0),
            ..Default::default()
        };
        let fields = payload.into_fields(None).unwrap();
        assert!(fields.types.is_empty());
        assert!(fields.moves.is_empty());
    }

    #[test]
    fn test_partial_write_keeps_stored_values() {
        let payload = PokemonPayload {
            weight: Some(1.0),
            ..Default::default()
        };
        let fields = payload.into_fields(Some(&stored())).unwrap();
        assert_eq!(fields.name, "Charizard");
        assert_eq!(fields.order, 6);
        assert_eq!(fields.weight, 1.0);
        assert_eq!(fields.types, vec![1]);
        assert_eq!(fields.moves, vec![2]);
    }

    #[test]
    fn test_negative_order_rejected() {
        let payload = PokemonPayload {
            order: Some(-1),
            ..Default::default()
        };
        match payload.into_fields(Some(&stored())).unwrap_err() {
            ApiError::Validation(errors) => assert!(errors.get("order").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
