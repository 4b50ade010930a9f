//! Entity - Pokemon, Types and Moves
//!
//! TigerStyle: Explicit types, validation before every write.
//!
//! Records carry their relations as id lists sorted ascending. The write-side
//! `*Fields` structs are what create and update accept; backends call
//! `validate()` before touching storage.

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use super::error::FieldErrors;
use crate::constants::ENTITY_NAME_CHARS_MAX;

/// Message for an empty required string.
pub const MESSAGE_BLANK: &str = "This field may not be blank.";

/// Message for a negative numeric field.
pub const MESSAGE_NEGATIVE: &str = "Ensure this value is greater than or equal to 0.";

/// Message for a non-finite or unrepresentable number.
pub const MESSAGE_INVALID_NUMBER: &str = "A valid number is required.";

// =============================================================================
// Entity Kind
// =============================================================================

/// Kinds of records in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A pokemon
    Pokemon,
    /// An elemental type
    Type,
    /// A battle move
    Move,
}

impl EntityKind {
    /// Get string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pokemon => "pokemon",
            Self::Type => "type",
            Self::Move => "move",
        }
    }

    /// Capitalized name used in user-facing messages.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pokemon => "Pokemon",
            Self::Type => "Type",
            Self::Move => "Move",
        }
    }

    /// Field that must be unique for this kind on the wire.
    #[must_use]
    pub fn unique_field(&self) -> &'static str {
        match self {
            Self::Pokemon | Self::Move => "name",
            Self::Type => "type",
        }
    }

    /// Message for a duplicate unique field.
    #[must_use]
    pub fn duplicate_message(&self) -> String {
        format!(
            "{} with this {} already exists.",
            self.as_str(),
            self.unique_field()
        )
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Records
// =============================================================================

/// A battle move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    /// Auto-increment identifier
    pub id: i64,
    /// Unique name
    pub name: String,
    /// Strength, never negative
    pub power: u32,
}

/// An elemental type. The name travels as `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonType {
    /// Auto-increment identifier
    pub id: i64,
    /// Unique name
    #[serde(rename = "type")]
    pub name: String,
}

/// A pokemon with its relations resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pokemon {
    /// Auto-increment identifier
    pub id: i64,
    /// Unique name
    pub name: String,
    /// Pokedex order, never negative
    pub order: u32,
    /// Height, never negative
    pub height: f64,
    /// Weight, never negative
    pub weight: f64,
    /// Type ids, ascending
    pub types: Vec<i64>,
    /// Moves, ascending by id
    #[serde(serialize_with = "serialize_move_summaries")]
    pub moves: Vec<Move>,
}

impl Pokemon {
    /// Ids of this pokemon's moves, ascending.
    pub fn move_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.moves.iter().map(|m| m.id)
    }

    /// Write-side fields equal to this record.
    #[must_use]
    pub fn to_fields(&self) -> PokemonFields {
        PokemonFields {
            name: self.name.clone(),
            order: self.order,
            height: self.height,
            weight: self.weight,
            types: self.types.clone(),
            moves: self.move_ids().collect(),
        }
    }
}

/// Moves nested in a pokemon are shown as `{"name", "power"}` only.
fn serialize_move_summaries<S: Serializer>(moves: &[Move], serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct MoveSummary<'a> {
        name: &'a str,
        power: u32,
    }

    let mut seq = serializer.serialize_seq(Some(moves.len()))?;
    for m in moves {
        seq.serialize_element(&MoveSummary {
            name: &m.name,
            power: m.power,
        })?;
    }
    seq.end()
}

// =============================================================================
// Write-side Fields
// =============================================================================

/// Fields accepted when creating or replacing a pokemon.
#[derive(Debug, Clone, PartialEq)]
pub struct PokemonFields {
    /// Unique name
    pub name: String,
    /// Pokedex order
    pub order: u32,
    /// Height
    pub height: f64,
    /// Weight
    pub weight: f64,
    /// Type ids to associate
    pub types: Vec<i64>,
    /// Move ids to associate
    pub moves: Vec<i64>,
}

impl PokemonFields {
    /// Check every field, collecting all failures.
    ///
    /// # Errors
    /// Returns the offending fields and their messages.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, "name", &self.name);
        check_non_negative(&mut errors, "height", self.height);
        check_non_negative(&mut errors, "weight", self.weight);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Sort and deduplicate relation ids.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.types.sort_unstable();
        self.types.dedup();
        self.moves.sort_unstable();
        self.moves.dedup();
        self
    }
}

/// Fields accepted when creating or replacing a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveFields {
    /// Unique name
    pub name: String,
    /// Strength
    pub power: u32,
}

impl MoveFields {
    /// Check every field.
    ///
    /// # Errors
    /// Returns the offending fields and their messages.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, "name", &self.name);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Fields accepted when creating or replacing a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeFields {
    /// Unique name
    pub name: String,
}

impl TypeFields {
    /// Check every field. The name is reported as `type`.
    ///
    /// # Errors
    /// Returns the offending fields and their messages.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, "type", &self.name);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// =============================================================================
// Field Checks
// =============================================================================

/// Required, non-blank, at most `ENTITY_NAME_CHARS_MAX` characters.
pub fn check_name(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, MESSAGE_BLANK);
    } else if value.chars().count() > ENTITY_NAME_CHARS_MAX {
        errors.add(
            field,
            format!("Ensure this field has no more than {ENTITY_NAME_CHARS_MAX} characters."),
        );
    }
}

/// Finite and `>= 0`.
pub fn check_non_negative(errors: &mut FieldErrors, field: &str, value: f64) {
    if !value.is_finite() {
        errors.add(field, MESSAGE_INVALID_NUMBER);
    } else if value < 0.0 {
        errors.add(field, MESSAGE_NEGATIVE);
    }
}

/// Convert a raw integer to a non-negative `u32`, recording a failure.
pub fn non_negative_u32(errors: &mut FieldErrors, field: &str, value: i64) -> Option<u32> {
    if value < 0 {
        errors.add(field, MESSAGE_NEGATIVE);
        return None;
    }
    match u32::try_from(value) {
        Ok(v) => Some(v),
        Err(_) => {
            errors.add(field, MESSAGE_INVALID_NUMBER);
            None
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
