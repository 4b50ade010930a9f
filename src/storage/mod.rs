//! Storage - Entity Store Trait and Implementations
//!
//! TigerStyle: Abstract storage, identical semantics across backends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    StorageBackend Trait                      │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                              ↑
//!          │                              │
//! ┌────────┴────────┐           ┌────────┴────────┐
//! │  MemoryBackend  │           │ PostgresBackend │
//! │   (default)     │           │  (production)   │
//! └─────────────────┘           └─────────────────┘
//! ```

mod backend;
mod entity;
mod error;
mod memory;

#[cfg(feature = "postgres")]
mod postgres;

pub use backend::{PokemonFilter, StorageBackend};
pub use entity::{
    check_name, check_non_negative, non_negative_u32, EntityKind, Move, MoveFields, Pokemon,
    PokemonFields, PokemonType, TypeFields, MESSAGE_BLANK, MESSAGE_INVALID_NUMBER,
    MESSAGE_NEGATIVE,
};
pub use error::{FieldErrors, StorageError, StorageResult};
pub use memory::MemoryBackend;

#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;
