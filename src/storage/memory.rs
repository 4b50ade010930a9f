//! MemoryBackend - In-process Storage
//!
//! TigerStyle: Deterministic, lock-protected, no I/O.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       MemoryBackend                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RwLock<Inner>                                               │
//! │    pokemon / types / moves   BTreeMap<id, row>               │
//! │    pokemon_types             Relation (forward + inverse)    │
//! │    pokemon_moves             Relation (forward + inverse)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each write validates under the write lock and then mutates, so a rejected
//! write leaves no trace. `Relation` updates both directions together.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::backend::{PokemonFilter, StorageBackend};
use super::entity::{
    EntityKind, Move, MoveFields, Pokemon, PokemonFields, PokemonType, TypeFields,
};
use super::error::{FieldErrors, StorageError, StorageResult};

// =============================================================================
// Relation
// =============================================================================

/// A many-to-many relation kept as two indexes.
///
/// Invariant: `r ∈ forward[l]` iff `l ∈ inverse[r]`; no empty sets are kept.
#[derive(Debug, Default)]
struct Relation {
    /// left id -> right ids
    forward: BTreeMap<i64, BTreeSet<i64>>,
    /// right id -> left ids
    inverse: BTreeMap<i64, BTreeSet<i64>>,
}

impl Relation {
    /// Replace every right id linked to `left`.
    fn set(&mut self, left: i64, rights: &[i64]) {
        self.remove_left(left);
        for &right in rights {
            self.forward.entry(left).or_default().insert(right);
            self.inverse.entry(right).or_default().insert(left);
        }
    }

    /// Unlink `left` from everything.
    fn remove_left(&mut self, left: i64) {
        if let Some(rights) = self.forward.remove(&left) {
            for right in rights {
                detach(&mut self.inverse, right, left);
            }
        }
    }

    /// Unlink `right` from everything.
    fn remove_right(&mut self, right: i64) {
        if let Some(lefts) = self.inverse.remove(&right) {
            for left in lefts {
                detach(&mut self.forward, left, right);
            }
        }
    }

    /// Right ids linked to `left`, ascending.
    fn rights(&self, left: i64) -> Vec<i64> {
        self.forward
            .get(&left)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Left ids linked to `right`, ascending.
    fn lefts(&self, right: i64) -> Vec<i64> {
        self.inverse
            .get(&right)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    fn clear(&mut self) {
        self.forward.clear();
        self.inverse.clear();
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        let forward_ok = self.forward.iter().all(|(l, rs)| {
            !rs.is_empty()
                && rs
                    .iter()
                    .all(|r| self.inverse.get(r).is_some_and(|ls| ls.contains(l)))
        });
        let inverse_ok = self.inverse.iter().all(|(r, ls)| {
            !ls.is_empty()
                && ls
                    .iter()
                    .all(|l| self.forward.get(l).is_some_and(|rs| rs.contains(r)))
        });
        forward_ok && inverse_ok
    }
}

fn detach(index: &mut BTreeMap<i64, BTreeSet<i64>>, key: i64, value: i64) {
    if let Some(set) = index.get_mut(&key) {
        set.remove(&value);
        if set.is_empty() {
            index.remove(&key);
        }
    }
}

// =============================================================================
// Inner State
// =============================================================================

/// Scalar columns of a pokemon.
#[derive(Debug, Clone)]
struct PokemonRow {
    name: String,
    order: u32,
    height: f64,
    weight: f64,
}

#[derive(Debug, Default)]
struct Inner {
    /// Last id handed out per kind
    last_pokemon_id: i64,
    last_type_id: i64,
    last_move_id: i64,

    pokemon: BTreeMap<i64, PokemonRow>,
    types: BTreeMap<i64, PokemonType>,
    moves: BTreeMap<i64, Move>,

    /// pokemon id -> type ids
    pokemon_types: Relation,
    /// pokemon id -> move ids
    pokemon_moves: Relation,
}

impl Inner {
    fn hydrate(&self, id: i64, row: &PokemonRow) -> Pokemon {
        Pokemon {
            id,
            name: row.name.clone(),
            order: row.order,
            height: row.height,
            weight: row.weight,
            types: self.pokemon_types.rights(id),
            moves: self
                .pokemon_moves
                .rights(id)
                .into_iter()
                .filter_map(|move_id| self.moves.get(&move_id).cloned())
                .collect(),
        }
    }

    fn pokemon(&self, id: i64) -> Option<Pokemon> {
        self.pokemon.get(&id).map(|row| self.hydrate(id, row))
    }

    fn matches(&self, id: i64, filter: &PokemonFilter) -> bool {
        if filter.is_empty() {
            return true;
        }
        let type_ids = self.pokemon_types.rights(id);
        let move_ids = self.pokemon_moves.rights(id);
        let type_names: Vec<&str> = type_ids
            .iter()
            .filter_map(|t| self.types.get(t).map(|t| t.name.as_str()))
            .collect();
        let move_names: Vec<&str> = move_ids
            .iter()
            .filter_map(|m| self.moves.get(m).map(|m| m.name.as_str()))
            .collect();
        filter.matches(&type_names, &move_names)
    }

    /// Field, uniqueness and reference checks for a pokemon write.
    fn check_pokemon(&self, fields: &PokemonFields, own_id: Option<i64>) -> StorageResult<()> {
        let mut errors = fields.validate().err().unwrap_or_default();

        let duplicate = self
            .pokemon
            .iter()
            .any(|(id, row)| Some(*id) != own_id && row.name == fields.name);
        if duplicate {
            errors.add("name", EntityKind::Pokemon.duplicate_message());
        }

        errors.merge(missing_refs("types", &fields.types, |id| {
            self.types.contains_key(&id)
        }));
        errors.merge(missing_refs("moves", &fields.moves, |id| {
            self.moves.contains_key(&id)
        }));

        errors.into_result()
    }

    fn check_move(&self, fields: &MoveFields, own_id: Option<i64>) -> StorageResult<()> {
        let mut errors = fields.validate().err().unwrap_or_default();
        if self
            .moves
            .values()
            .any(|m| Some(m.id) != own_id && m.name == fields.name)
        {
            errors.add("name", EntityKind::Move.duplicate_message());
        }
        errors.into_result()
    }

    fn check_type(&self, fields: &TypeFields, own_id: Option<i64>) -> StorageResult<()> {
        let mut errors = fields.validate().err().unwrap_or_default();
        if self
            .types
            .values()
            .any(|t| Some(t.id) != own_id && t.name == fields.name)
        {
            errors.add("type", EntityKind::Type.duplicate_message());
        }
        errors.into_result()
    }
}

/// One message per unknown id, in the DRF wording.
fn missing_refs(field: &str, ids: &[i64], exists: impl Fn(i64) -> bool) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for &id in ids {
        if !exists(id) {
            errors.add(
                field,
                format!("Invalid pk \"{id}\" - object does not exist."),
            );
        }
    }
    errors
}

fn page<T>(items: impl Iterator<Item = T>, limit: usize, offset: usize) -> Vec<T> {
    items.skip(offset).take(limit).collect()
}

// =============================================================================
// MemoryBackend
// =============================================================================

/// In-memory storage backend.
///
/// Used when no database is configured, and as the reference implementation
/// in tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: RwLock<Inner>,
}

impl MemoryBackend {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn relations_consistent(&self) -> bool {
        let inner = self.inner.read().await;
        inner.pokemon_types.is_consistent() && inner.pokemon_moves.is_consistent()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn create_pokemon(&self, fields: &PokemonFields) -> StorageResult<Pokemon> {
        let fields = fields.clone().normalized();
        let mut inner = self.inner.write().await;
        inner.check_pokemon(&fields, None)?;

        inner.last_pokemon_id += 1;
        let id = inner.last_pokemon_id;
        inner.pokemon.insert(
            id,
            PokemonRow {
                name: fields.name.clone(),
                order: fields.order,
                height: fields.height,
                weight: fields.weight,
            },
        );
        inner.pokemon_types.set(id, &fields.types);
        inner.pokemon_moves.set(id, &fields.moves);

        tracing::info!(id, name = %fields.name, "Created pokemon");

        inner
            .pokemon(id)
            .ok_or_else(|| StorageError::internal("created pokemon vanished"))
    }

    async fn get_pokemon(&self, id: i64) -> StorageResult<Option<Pokemon>> {
        Ok(self.inner.read().await.pokemon(id))
    }

    async fn update_pokemon(&self, id: i64, fields: &PokemonFields) -> StorageResult<Pokemon> {
        let fields = fields.clone().normalized();
        let mut inner = self.inner.write().await;
        if !inner.pokemon.contains_key(&id) {
            return Err(StorageError::not_found(EntityKind::Pokemon, id));
        }
        inner.check_pokemon(&fields, Some(id))?;

        inner.pokemon.insert(
            id,
            PokemonRow {
                name: fields.name.clone(),
                order: fields.order,
                height: fields.height,
                weight: fields.weight,
            },
        );
        inner.pokemon_types.set(id, &fields.types);
        inner.pokemon_moves.set(id, &fields.moves);

        tracing::info!(id, name = %fields.name, "Updated pokemon");

        inner
            .pokemon(id)
            .ok_or_else(|| StorageError::internal("updated pokemon vanished"))
    }

    async fn delete_pokemon(&self, id: i64) -> StorageResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.pokemon.remove(&id).is_none() {
            return Ok(false);
        }
        inner.pokemon_types.remove_left(id);
        inner.pokemon_moves.remove_left(id);
        tracing::info!(id, "Deleted pokemon");
        Ok(true)
    }

    async fn list_pokemon(
        &self,
        filter: &PokemonFilter,
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<Pokemon>> {
        assert!(limit > 0, "limit must be positive");

        let inner = self.inner.read().await;
        let matching = inner
            .pokemon
            .iter()
            .filter(|(id, _)| inner.matches(**id, filter))
            .map(|(id, row)| inner.hydrate(*id, row));
        Ok(page(matching, limit, offset))
    }

    async fn count_pokemon(&self, filter: &PokemonFilter) -> StorageResult<usize> {
        let inner = self.inner.read().await;
        Ok(inner
            .pokemon
            .keys()
            .filter(|id| inner.matches(**id, filter))
            .count())
    }

    async fn pokemon_with_move(&self, move_id: i64) -> StorageResult<Vec<i64>> {
        Ok(self.inner.read().await.pokemon_moves.lefts(move_id))
    }

    async fn pokemon_with_type(&self, type_id: i64) -> StorageResult<Vec<i64>> {
        Ok(self.inner.read().await.pokemon_types.lefts(type_id))
    }

    async fn create_move(&self, fields: &MoveFields) -> StorageResult<Move> {
        let mut inner = self.inner.write().await;
        inner.check_move(fields, None)?;

        inner.last_move_id += 1;
        let record = Move {
            id: inner.last_move_id,
            name: fields.name.clone(),
            power: fields.power,
        };
        inner.moves.insert(record.id, record.clone());
        tracing::info!(id = record.id, name = %record.name, "Created move");
        Ok(record)
    }

    async fn get_move(&self, id: i64) -> StorageResult<Option<Move>> {
        Ok(self.inner.read().await.moves.get(&id).cloned())
    }

    async fn update_move(&self, id: i64, fields: &MoveFields) -> StorageResult<Move> {
        let mut inner = self.inner.write().await;
        if !inner.moves.contains_key(&id) {
            return Err(StorageError::not_found(EntityKind::Move, id));
        }
        inner.check_move(fields, Some(id))?;

        let record = Move {
            id,
            name: fields.name.clone(),
            power: fields.power,
        };
        inner.moves.insert(id, record.clone());
        tracing::info!(id, name = %record.name, "Updated move");
        Ok(record)
    }

    async fn delete_move(&self, id: i64) -> StorageResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.moves.remove(&id).is_none() {
            return Ok(false);
        }
        inner.pokemon_moves.remove_right(id);
        tracing::info!(id, "Deleted move");
        Ok(true)
    }

    async fn list_moves(&self, limit: usize, offset: usize) -> StorageResult<Vec<Move>> {
        assert!(limit > 0, "limit must be positive");
        let inner = self.inner.read().await;
        Ok(page(inner.moves.values().cloned(), limit, offset))
    }

    async fn count_moves(&self) -> StorageResult<usize> {
        Ok(self.inner.read().await.moves.len())
    }

    async fn create_type(&self, fields: &TypeFields) -> StorageResult<PokemonType> {
        let mut inner = self.inner.write().await;
        inner.check_type(fields, None)?;

        inner.last_type_id += 1;
        let record = PokemonType {
            id: inner.last_type_id,
            name: fields.name.clone(),
        };
        inner.types.insert(record.id, record.clone());
        tracing::info!(id = record.id, name = %record.name, "Created type");
        Ok(record)
    }

    async fn get_type(&self, id: i64) -> StorageResult<Option<PokemonType>> {
        Ok(self.inner.read().await.types.get(&id).cloned())
    }

    async fn update_type(&self, id: i64, fields: &TypeFields) -> StorageResult<PokemonType> {
        let mut inner = self.inner.write().await;
        if !inner.types.contains_key(&id) {
            return Err(StorageError::not_found(EntityKind::Type, id));
        }
        inner.check_type(fields, Some(id))?;

        let record = PokemonType {
            id,
            name: fields.name.clone(),
        };
        inner.types.insert(id, record.clone());
        tracing::info!(id, name = %record.name, "Updated type");
        Ok(record)
    }

    async fn delete_type(&self, id: i64) -> StorageResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.types.remove(&id).is_none() {
            return Ok(false);
        }
        inner.pokemon_types.remove_right(id);
        tracing::info!(id, "Deleted type");
        Ok(true)
    }

    async fn list_types(&self, limit: usize, offset: usize) -> StorageResult<Vec<PokemonType>> {
        assert!(limit > 0, "limit must be positive");
        let inner = self.inner.read().await;
        Ok(page(inner.types.values().cloned(), limit, offset))
    }

    async fn count_types(&self) -> StorageResult<usize> {
        Ok(self.inner.read().await.types.len())
    }

    async fn clear(&self) -> StorageResult<()> {
        let mut inner = self.inner.write().await;
        inner.pokemon.clear();
        inner.types.clear();
        inner.moves.clear();
        inner.pokemon_types.clear();
        inner.pokemon_moves.clear();
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pokemon(name: &str, types: Vec<i64>, moves: Vec<i64>) -> PokemonFields {
        PokemonFields {
            name: name.to_string(),
            order: 6,
            height: 17.0,
            weight: 905.0,
            types,
            moves,
        }
    }

    fn mv(name: &str, power: u32) -> MoveFields {
        MoveFields {
            name: name.to_string(),
            power,
        }
    }

    fn ty(name: &str) -> TypeFields {
        TypeFields {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_ids_start_at_one_and_are_not_reused() {
        let store = MemoryBackend::new();
        let a = store.create_move(&mv("ember", 40)).await.unwrap();
        let b = store.create_move(&mv("scratch", 40)).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        assert!(store.delete_move(b.id).await.unwrap());
        let c = store.create_move(&mv("tackle", 40)).await.unwrap();
        assert_eq!(c.id, 3);
    }

    #[tokio::test]
    async fn test_pokemon_round_trip() {
        let store = MemoryBackend::new();
        let fire = store.create_type(&ty("fire")).await.unwrap();
        let ember = store.create_move(&mv("ember", 60)).await.unwrap();
        let flame = store.create_move(&mv("flamethrower", 90)).await.unwrap();

        let created = store
            .create_pokemon(&pokemon("Charizard", vec![fire.id], vec![flame.id, ember.id]))
            .await
            .unwrap();
        let fetched = store.get_pokemon(created.id).await.unwrap().unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.name, "Charizard");
        assert_eq!(fetched.order, 6);
        assert_eq!(fetched.height, 17.0);
        assert_eq!(fetched.weight, 905.0);
        assert_eq!(fetched.types, vec![fire.id]);
        // Ascending by move id regardless of input order
        assert_eq!(fetched.move_ids().collect::<Vec<_>>(), vec![ember.id, flame.id]);
    }

    #[tokio::test]
    async fn test_get_missing_pokemon() {
        let store = MemoryBackend::new();
        assert!(store.get_pokemon(9999).await.unwrap().is_none());
        assert!(!store.delete_pokemon(9999).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let store = MemoryBackend::new();
        store.create_move(&mv("ember", 60)).await.unwrap();
        let err = store.create_move(&mv("ember", 10)).await.unwrap_err();
        match err {
            StorageError::Validation(errors) => assert!(errors.get("name").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }

        store.create_type(&ty("fire")).await.unwrap();
        let err = store.create_type(&ty("fire")).await.unwrap_err();
        match err {
            StorageError::Validation(errors) => assert!(errors.get("type").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_may_keep_own_name() {
        let store = MemoryBackend::new();
        let ember = store.create_move(&mv("ember", 60)).await.unwrap();
        let updated = store.update_move(ember.id, &mv("ember", 70)).await.unwrap();
        assert_eq!(updated.power, 70);
    }

    #[tokio::test]
    async fn test_unknown_relation_ids_rejected_without_write() {
        let store = MemoryBackend::new();
        let err = store
            .create_pokemon(&pokemon("Bulbasaur", vec![42], vec![7]))
            .await
            .unwrap_err();
        match err {
            StorageError::Validation(errors) => {
                assert!(errors.get("types").is_some());
                assert!(errors.get("moves").is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.count_pokemon(&PokemonFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_fields_rejected() {
        let store = MemoryBackend::new();
        let mut fields = pokemon("", vec![], vec![]);
        fields.weight = -1.0;
        let err = store.create_pokemon(&fields).await.unwrap_err();
        match err {
            StorageError::Validation(errors) => {
                assert!(errors.get("name").is_some());
                assert!(errors.get("weight").is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryBackend::new();
        let err = store
            .update_pokemon(5, &pokemon("Ghost", vec![], vec![]))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_inverse_relation_tracks_every_mutation() {
        let store = MemoryBackend::new();
        let fire = store.create_type(&ty("fire")).await.unwrap();
        let ember = store.create_move(&mv("ember", 60)).await.unwrap();
        let scratch = store.create_move(&mv("scratch", 40)).await.unwrap();

        let a = store
            .create_pokemon(&pokemon("Charmander", vec![fire.id], vec![ember.id, scratch.id]))
            .await
            .unwrap();
        let b = store
            .create_pokemon(&pokemon("Vulpix", vec![fire.id], vec![ember.id]))
            .await
            .unwrap();

        assert_eq!(store.pokemon_with_move(ember.id).await.unwrap(), vec![a.id, b.id]);
        assert_eq!(store.pokemon_with_type(fire.id).await.unwrap(), vec![a.id, b.id]);
        assert!(store.relations_consistent().await);

        // Update drops ember from a
        store
            .update_pokemon(a.id, &pokemon("Charmander", vec![fire.id], vec![scratch.id]))
            .await
            .unwrap();
        assert_eq!(store.pokemon_with_move(ember.id).await.unwrap(), vec![b.id]);
        assert!(store.relations_consistent().await);

        // Deleting a move detaches it everywhere
        store.delete_move(scratch.id).await.unwrap();
        let a_now = store.get_pokemon(a.id).await.unwrap().unwrap();
        assert!(a_now.moves.is_empty());
        assert!(store.pokemon_with_move(scratch.id).await.unwrap().is_empty());
        assert!(store.relations_consistent().await);

        // Deleting a pokemon removes it from inverse sets
        store.delete_pokemon(b.id).await.unwrap();
        assert!(store.pokemon_with_move(ember.id).await.unwrap().is_empty());
        assert_eq!(store.pokemon_with_type(fire.id).await.unwrap(), vec![a.id]);
        assert!(store.relations_consistent().await);

        // Deleting a type detaches it too
        store.delete_type(fire.id).await.unwrap();
        let a_now = store.get_pokemon(a.id).await.unwrap().unwrap();
        assert!(a_now.types.is_empty());
        assert!(store.relations_consistent().await);
    }

    #[tokio::test]
    async fn test_list_filters_and_paging() {
        let store = MemoryBackend::new();
        let fire = store.create_type(&ty("fire")).await.unwrap();
        let water = store.create_type(&ty("water")).await.unwrap();
        let ember = store.create_move(&mv("ember", 60)).await.unwrap();
        let surf = store.create_move(&mv("surf", 90)).await.unwrap();

        for i in 0..5 {
            store
                .create_pokemon(&pokemon(&format!("Fire{i}"), vec![fire.id], vec![ember.id]))
                .await
                .unwrap();
        }
        for i in 0..3 {
            store
                .create_pokemon(&pokemon(&format!("Water{i}"), vec![water.id], vec![surf.id]))
                .await
                .unwrap();
        }

        let all = PokemonFilter::default();
        assert_eq!(store.count_pokemon(&all).await.unwrap(), 8);

        let page1 = store.list_pokemon(&all, 3, 0).await.unwrap();
        let page3 = store.list_pokemon(&all, 3, 6).await.unwrap();
        assert_eq!(page1.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(page3.len(), 2);

        let by_type = PokemonFilter {
            type_name: Some("water".to_string()),
            ..Default::default()
        };
        assert_eq!(store.count_pokemon(&by_type).await.unwrap(), 3);

        let by_move = PokemonFilter {
            move_name: Some("ember".to_string()),
            ..Default::default()
        };
        let listed = store.list_pokemon(&by_move, 10, 0).await.unwrap();
        assert_eq!(listed.len(), 5);
        assert!(listed.iter().all(|p| p.name.starts_with("Fire")));

        let search = PokemonFilter {
            search: Some("SUR".to_string()),
            ..Default::default()
        };
        assert_eq!(store.count_pokemon(&search).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryBackend::new();
        let ember = store.create_move(&mv("ember", 60)).await.unwrap();
        store
            .create_pokemon(&pokemon("Charmander", vec![], vec![ember.id]))
            .await
            .unwrap();

        store.clear().await.unwrap();
        assert_eq!(store.count_moves().await.unwrap(), 0);
        assert_eq!(store.count_pokemon(&PokemonFilter::default()).await.unwrap(), 0);
        assert!(store.pokemon_with_move(ember.id).await.unwrap().is_empty());
    }
}
