//! Pokedex - CRUD service for pokemon, types and moves
//!
//! Tracks pokemon with their elemental types and battle moves, answers two
//! derived queries (best move, similar pokemon), and ships a tool that
//! assembles pokemon records from PokeAPI.
//!
//! Features:
//! - Entity Store behind one trait (in-memory by default, Postgres optional)
//! - HTTP CRUD surface with page-number pagination
//! - Query layer over the store's inverse relations
//! - Fetch composer with a pluggable transport

pub mod api;
pub mod constants;
pub mod fetch;
pub mod query;
pub mod storage;
