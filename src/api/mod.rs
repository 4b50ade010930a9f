//! API - CRUD Surface over HTTP
//!
//! TigerStyle: Thin handlers, all rules live in storage and query.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ axum Router  │ ──▶ │   handlers   │ ──▶ │ StorageBackend / │
//! │ + TraceLayer │     │ (per entity) │     │   query layer    │
//! └──────────────┘     └──────────────┘     └──────────────────┘
//! ```
//!
//! Routes keep trailing slashes: `/pokemons/`, `/pokemons/:id/`,
//! `/pokemons/:id/best_move/`, `/pokemons/:id/similar_pokemon/`, and the
//! same CRUD set for `/moves/` and `/types/`.

mod error;
mod moves;
mod pagination;
mod pokemons;
mod types;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::constants::PAGE_SIZE_MAX;
use crate::storage::{FieldErrors, StorageBackend};

pub use error::{ApiError, DETAIL_INVALID_PAGE, DETAIL_NO_MOVES};
pub use pagination::{Page, PageRequest};
pub use pokemons::PokemonPayload;
pub use moves::MovePayload;
pub use types::TypePayload;

/// Message for a field missing from a full write.
pub const MESSAGE_REQUIRED: &str = "This field is required.";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Entity Store
    pub store: Arc<dyn StorageBackend>,
    /// Records per list page
    pub page_size: usize,
}

impl AppState {
    /// Create handler state.
    ///
    /// # Panics
    /// If `page_size` is zero or above `PAGE_SIZE_MAX`.
    #[must_use]
    pub fn new(store: Arc<dyn StorageBackend>, page_size: usize) -> Self {
        assert!(page_size > 0, "page size must be positive");
        assert!(
            page_size <= PAGE_SIZE_MAX,
            "page size {page_size} exceeds {PAGE_SIZE_MAX}"
        );
        Self { store, page_size }
    }
}

/// Build the full HTTP router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(pokemons::routes())
        .merge(moves::routes())
        .merge(types::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Take the submitted value, else the stored one, else record the field
/// as required.
fn required<T>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<T>,
    current: Option<T>,
) -> Option<T> {
    let resolved = value.or(current);
    if resolved.is_none() {
        errors.add(field, MESSAGE_REQUIRED);
    }
    resolved
}

/// Names are stored without surrounding whitespace.
fn trimmed(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string())
}
