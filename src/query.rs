//! Query Layer - Derived read-only queries over the Entity Store
//!
//! TigerStyle: Pure reads, deterministic ordering, explicit errors.
//!
//! - `best_move`: strongest move of a pokemon, lowest id on ties
//! - `similar_pokemon`: other pokemon sharing at least
//!   `SIMILAR_SHARED_MOVES_COUNT_MIN` moves, ascending by id
//!
//! Both work against any `StorageBackend`.

use std::collections::BTreeMap;

use crate::constants::SIMILAR_SHARED_MOVES_COUNT_MIN;
use crate::storage::{Move, Pokemon, StorageBackend, StorageError};

// =============================================================================
// Errors
// =============================================================================

/// Errors from derived queries.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The queried pokemon does not exist
    #[error("pokemon {0} not found")]
    PokemonNotFound(i64),

    /// The pokemon exists but knows no moves
    #[error("no moves available for pokemon {0}")]
    NoMoves(i64),

    /// Storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result alias for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

// =============================================================================
// Queries
// =============================================================================

async fn require_pokemon(store: &dyn StorageBackend, id: i64) -> QueryResult<Pokemon> {
    store
        .get_pokemon(id)
        .await?
        .ok_or(QueryError::PokemonNotFound(id))
}

/// The move with maximal power among the pokemon's moves.
///
/// Ties go to the lowest move id.
///
/// # Errors
/// `PokemonNotFound` if the pokemon is absent, `NoMoves` if it knows none.
pub async fn best_move(store: &dyn StorageBackend, pokemon_id: i64) -> QueryResult<Move> {
    let pokemon = require_pokemon(store, pokemon_id).await?;

    let best = pokemon
        .moves
        .into_iter()
        .reduce(|best, candidate| {
            if candidate.power > best.power
                || (candidate.power == best.power && candidate.id < best.id)
            {
                candidate
            } else {
                best
            }
        })
        .ok_or(QueryError::NoMoves(pokemon_id))?;

    tracing::debug!(pokemon_id, move_id = best.id, power = best.power, "Best move");
    Ok(best)
}

/// Other pokemon sharing at least `SIMILAR_SHARED_MOVES_COUNT_MIN` moves
/// with the given one, ascending by id.
///
/// # Errors
/// `PokemonNotFound` if the pokemon is absent.
pub async fn similar_pokemon(store: &dyn StorageBackend, pokemon_id: i64) -> QueryResult<Vec<Pokemon>> {
    let pokemon = require_pokemon(store, pokemon_id).await?;

    // Shared-move count per other pokemon, via the inverse relation.
    let mut shared: BTreeMap<i64, usize> = BTreeMap::new();
    for move_id in pokemon.move_ids() {
        for other in store.pokemon_with_move(move_id).await? {
            if other != pokemon_id {
                *shared.entry(other).or_insert(0) += 1;
            }
        }
    }

    let mut similar = Vec::new();
    for (other, count) in shared {
        if count < SIMILAR_SHARED_MOVES_COUNT_MIN {
            continue;
        }
        // A concurrent delete can remove a match between the two reads.
        if let Some(record) = store.get_pokemon(other).await? {
            similar.push(record);
        }
    }

    // Postconditions
    assert!(
        similar.iter().all(|p| p.id != pokemon_id),
        "similar pokemon must exclude the queried pokemon"
    );
    assert!(
        similar.windows(2).all(|w| w[0].id < w[1].id),
        "similar pokemon must be ascending by id"
    );

    tracing::debug!(pokemon_id, matches = similar.len(), "Similar pokemon");
    Ok(similar)
}

// =============================================================================
// Tests
// =============================================================================
