//! StorageBackend - The Entity Store contract
//!
//! TigerStyle: One trait, many implementations, identical semantics.
//!
//! Every implementation must:
//! - assign ids from an auto-increment counter starting at 1, never reused
//! - reject invalid fields and duplicate names with `StorageError::Validation`
//!   before anything is written
//! - reject relation ids that do not exist, reported on `types` / `moves`
//! - return relations sorted ascending by id
//! - keep the inverse relation (move -> pokemon, type -> pokemon) consistent
//!   with the forward one on every create, update and delete
//! - list records ordered by ascending id

use async_trait::async_trait;

use super::entity::{Move, MoveFields, Pokemon, PokemonFields, PokemonType, TypeFields};
use super::error::StorageResult;

// =============================================================================
// Pokemon Filter
// =============================================================================

/// Filters for listing pokemon.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PokemonFilter {
    /// Exact name of a type the pokemon must have
    pub type_name: Option<String>,
    /// Exact name of a move the pokemon must know
    pub move_name: Option<String>,
    /// Whitespace-separated terms; each must appear (case-insensitive) in
    /// one of the pokemon's type or move names
    pub search: Option<String>,
}

impl PokemonFilter {
    /// True when no criterion is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.type_name.is_none() && self.move_name.is_none() && self.search_terms().is_empty()
    }

    /// Lowercased search terms.
    #[must_use]
    pub fn search_terms(&self) -> Vec<String> {
        self.search
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default()
    }

    /// Apply the filter to a pokemon's related names.
    #[must_use]
    pub fn matches(&self, type_names: &[&str], move_names: &[&str]) -> bool {
        if let Some(wanted) = &self.type_name {
            if !type_names.iter().any(|t| *t == wanted.as_str()) {
                return false;
            }
        }
        if let Some(wanted) = &self.move_name {
            if !move_names.iter().any(|m| *m == wanted.as_str()) {
                return false;
            }
        }
        self.search_terms().iter().all(|term| {
            type_names
                .iter()
                .chain(move_names.iter())
                .any(|name| name.to_lowercase().contains(term.as_str()))
        })
    }
}

// =============================================================================
// StorageBackend Trait
// =============================================================================

/// Persistence for pokemon, types, moves and their many-to-many relations.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    // ---- Pokemon ----

    /// Create a pokemon and its relations.
    async fn create_pokemon(&self, fields: &PokemonFields) -> StorageResult<Pokemon>;

    /// Get a pokemon by id.
    async fn get_pokemon(&self, id: i64) -> StorageResult<Option<Pokemon>>;

    /// Replace a pokemon's fields and relations.
    async fn update_pokemon(&self, id: i64, fields: &PokemonFields) -> StorageResult<Pokemon>;

    /// Delete a pokemon. Returns false if it did not exist.
    async fn delete_pokemon(&self, id: i64) -> StorageResult<bool>;

    /// List pokemon matching `filter`, ascending by id.
    async fn list_pokemon(
        &self,
        filter: &PokemonFilter,
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<Pokemon>>;

    /// Count pokemon matching `filter`.
    async fn count_pokemon(&self, filter: &PokemonFilter) -> StorageResult<usize>;

    /// Ids of pokemon that know a move, ascending.
    async fn pokemon_with_move(&self, move_id: i64) -> StorageResult<Vec<i64>>;

    /// Ids of pokemon that have a type, ascending.
    async fn pokemon_with_type(&self, type_id: i64) -> StorageResult<Vec<i64>>;

    // ---- Moves ----

    /// Create a move.
    async fn create_move(&self, fields: &MoveFields) -> StorageResult<Move>;

    /// Get a move by id.
    async fn get_move(&self, id: i64) -> StorageResult<Option<Move>>;

    /// Replace a move's fields.
    async fn update_move(&self, id: i64, fields: &MoveFields) -> StorageResult<Move>;

    /// Delete a move and detach it from every pokemon.
    async fn delete_move(&self, id: i64) -> StorageResult<bool>;

    /// List moves ascending by id.
    async fn list_moves(&self, limit: usize, offset: usize) -> StorageResult<Vec<Move>>;

    /// Count moves.
    async fn count_moves(&self) -> StorageResult<usize>;

    // ---- Types ----

    /// Create a type.
    async fn create_type(&self, fields: &TypeFields) -> StorageResult<PokemonType>;

    /// Get a type by id.
    async fn get_type(&self, id: i64) -> StorageResult<Option<PokemonType>>;

    /// Replace a type's fields.
    async fn update_type(&self, id: i64, fields: &TypeFields) -> StorageResult<PokemonType>;

    /// Delete a type and detach it from every pokemon.
    async fn delete_type(&self, id: i64) -> StorageResult<bool>;

    /// List types ascending by id.
    async fn list_types(&self, limit: usize, offset: usize) -> StorageResult<Vec<PokemonType>>;

    /// Count types.
    async fn count_types(&self) -> StorageResult<usize>;

    // ---- Maintenance ----

    /// Remove every record. Tests use this to reset a shared database
    /// between cases; no route exposes it.
    async fn clear(&self) -> StorageResult<()>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = PokemonFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&[], &[]));
        assert!(filter.matches(&["fire"], &["ember"]));
    }

    #[test]
    fn test_exact_filters() {
        let filter = PokemonFilter {
            type_name: Some("fire".to_string()),
            move_name: Some("ember".to_string()),
            search: None,
        };
        assert!(filter.matches(&["fire", "flying"], &["ember", "scratch"]));
        assert!(!filter.matches(&["Fire"], &["ember"]));
        assert!(!filter.matches(&["fire"], &["embers"]));
    }

    #[test]
    fn test_search_terms_all_required() {
        let filter = PokemonFilter {
            search: Some("FIR  thrower".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.search_terms(), vec!["fir", "thrower"]);
        assert!(filter.matches(&["fire"], &["flamethrower"]));
        assert!(!filter.matches(&["fire"], &["ember"]));
    }

    #[test]
    fn test_blank_search_is_empty() {
        let filter = PokemonFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(filter.is_empty());
    }
}
