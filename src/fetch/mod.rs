//! Fetch Composer - Assemble pokemon records from PokeAPI
//!
//! TigerStyle: Sequential, blocking, all-or-nothing.
//!
//! # Flow
//!
//! ```text
//! GET {base}/{type|move}/{name}/            collection document
//!   └─ for each member (up to limit):
//!        GET member url                     pokemon detail
//!          ├─ GET types[].type.url          -> type name
//!          └─ GET moves[].move.url          -> move name + power
//! ```
//!
//! The emitted record takes `name`, `order`, `height` and `weight` from the
//! collection document, not from the member's detail document. For a type or
//! move collection this means the type/move name and null physical fields.
//! Relations come from the member's detail document.
//!
//! Any failed request aborts the whole run; there are no partial results.

mod transport;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::constants::{FETCH_LIMIT_DEFAULT, POKEAPI_BASE_URL_DEFAULT};

pub use transport::{FixtureTransport, HttpTransport, Transport};

// =============================================================================
// Errors
// =============================================================================

/// Errors from the fetch composer. Every variant aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request could not be completed
    #[error("request to {url} failed: {message}")]
    Request {
        /// Requested URL
        url: String,
        /// Underlying failure
        message: String,
    },

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The body did not have the expected shape
    #[error("unexpected document from {url}: {source}")]
    Decode {
        /// Requested URL
        url: String,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },
}

// =============================================================================
// Configuration
// =============================================================================

/// What the collection is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Pokemon of a type
    Type,
    /// Pokemon that learn a move
    Move,
}

impl FetchMode {
    /// PokeAPI endpoint for the collection.
    #[must_use]
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Move => "move",
        }
    }

    /// Field of the collection document listing its pokemon.
    #[must_use]
    pub fn member_field(&self) -> &'static str {
        match self {
            Self::Type => "pokemon",
            Self::Move => "learned_by_pokemon",
        }
    }
}

/// Fetch composer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// API root, without trailing slash
    pub base_url: String,
    /// Maximum records to assemble (0 = unbounded)
    pub limit: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: POKEAPI_BASE_URL_DEFAULT.to_string(),
            limit: FETCH_LIMIT_DEFAULT,
        }
    }
}

impl FetchConfig {
    /// URL of the collection document for `mode` and `name`.
    #[must_use]
    pub fn collection_url(&self, mode: FetchMode, name: &str) -> String {
        format!(
            "{}/{}/{}/",
            self.base_url.trim_end_matches('/'),
            mode.endpoint(),
            name
        )
    }

    fn limit_reached(&self, assembled: usize) -> bool {
        self.limit > 0 && assembled >= self.limit
    }
}

// =============================================================================
// Output Records
// =============================================================================

/// A resolved type reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedType {
    /// Canonical name
    pub name: Option<String>,
}

/// A resolved move reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedMove {
    /// Canonical name
    pub name: Option<String>,
    /// Power; null for status moves
    pub power: Option<i64>,
}

/// One assembled record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedPokemon {
    /// `name` of the collection document
    pub name: Option<String>,
    /// `order` of the collection document
    pub order: Option<Number>,
    /// `height` of the collection document
    pub height: Option<Number>,
    /// `weight` of the collection document
    pub weight: Option<Number>,
    /// Types of the member, in document order
    pub types: Vec<FetchedType>,
    /// Moves of the member, in document order
    pub moves: Vec<FetchedMove>,
}

// =============================================================================
// Upstream Documents
// =============================================================================

#[derive(Debug, Deserialize)]
struct Link {
    url: String,
}

#[derive(Debug, Deserialize)]
struct TypeMember {
    pokemon: Link,
}

#[derive(Debug, Default, Deserialize)]
struct RootFields {
    name: Option<String>,
    order: Option<Number>,
    height: Option<Number>,
    weight: Option<Number>,
}

#[derive(Debug, Deserialize)]
struct TypeSlot {
    #[serde(rename = "type")]
    kind: Link,
}

#[derive(Debug, Deserialize)]
struct MoveSlot {
    #[serde(rename = "move")]
    entry: Link,
}

#[derive(Debug, Deserialize)]
struct PokemonDetail {
    #[serde(default)]
    types: Vec<TypeSlot>,
    #[serde(default)]
    moves: Vec<MoveSlot>,
}

#[derive(Debug, Deserialize)]
struct TypeDetail {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MoveDetail {
    name: Option<String>,
    power: Option<i64>,
}

fn decode<D: DeserializeOwned>(url: &str, value: Value) -> Result<D, FetchError> {
    serde_json::from_value(value).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}

// =============================================================================
// Composer
// =============================================================================

/// Resolves collections into nested pokemon records over a `Transport`.
pub struct Composer<T: Transport> {
    transport: T,
    config: FetchConfig,
}

impl<T: Transport> Composer<T> {
    /// Create a composer.
    #[must_use]
    pub fn new(transport: T, config: FetchConfig) -> Self {
        Self { transport, config }
    }

    /// Underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn get<D: DeserializeOwned>(&self, url: &str) -> Result<D, FetchError> {
        decode(url, self.transport.get_json(url)?)
    }

    /// Pokemon of type `name`.
    ///
    /// # Errors
    /// The first failed request or malformed document.
    pub fn by_type(&self, name: &str) -> Result<Vec<FetchedPokemon>, FetchError> {
        self.fetch(FetchMode::Type, name)
    }

    /// Pokemon that learn move `name`.
    ///
    /// # Errors
    /// The first failed request or malformed document.
    pub fn by_move(&self, name: &str) -> Result<Vec<FetchedPokemon>, FetchError> {
        self.fetch(FetchMode::Move, name)
    }

    /// Resolve the collection `mode`/`name` into at most `limit` records.
    ///
    /// # Errors
    /// The first failed request or malformed document.
    pub fn fetch(&self, mode: FetchMode, name: &str) -> Result<Vec<FetchedPokemon>, FetchError> {
        let url = self.config.collection_url(mode, name);
        let root = self.transport.get_json(&url)?;
        let root_fields: RootFields = decode(&url, root.clone())?;
        let members = self.member_urls(mode, &url, &root)?;

        tracing::info!(
            mode = mode.endpoint(),
            name,
            members = members.len(),
            limit = self.config.limit,
            "Resolving collection"
        );

        let mut records = Vec::new();
        for member_url in members {
            if self.config.limit_reached(records.len()) {
                break;
            }
            let detail: PokemonDetail = self.get(&member_url)?;
            records.push(self.assemble(&root_fields, detail)?);
        }

        // Postcondition
        assert!(
            self.config.limit == 0 || records.len() <= self.config.limit,
            "assembled {} records over limit {}",
            records.len(),
            self.config.limit
        );
        Ok(records)
    }

    fn member_urls(&self, mode: FetchMode, url: &str, root: &Value) -> Result<Vec<String>, FetchError> {
        let Some(members) = root.get(mode.member_field()) else {
            return Ok(Vec::new());
        };
        let urls = match mode {
            FetchMode::Type => decode::<Vec<TypeMember>>(url, members.clone())?
                .into_iter()
                .map(|m| m.pokemon.url)
                .collect(),
            FetchMode::Move => decode::<Vec<Link>>(url, members.clone())?
                .into_iter()
                .map(|m| m.url)
                .collect(),
        };
        Ok(urls)
    }

    fn assemble(&self, root: &RootFields, detail: PokemonDetail) -> Result<FetchedPokemon, FetchError> {
        let mut types = Vec::with_capacity(detail.types.len());
        for slot in detail.types {
            let resolved: TypeDetail = self.get(&slot.kind.url)?;
            types.push(FetchedType {
                name: resolved.name,
            });
        }

        let mut moves = Vec::with_capacity(detail.moves.len());
        for slot in detail.moves {
            let resolved: MoveDetail = self.get(&slot.entry.url)?;
            moves.push(FetchedMove {
                name: resolved.name,
                power: resolved.power,
            });
        }

        tracing::debug!(types = types.len(), moves = moves.len(), "Assembled record");

        Ok(FetchedPokemon {
            name: root.name.clone(),
            order: root.order.clone(),
            height: root.height.clone(),
            weight: root.weight.clone(),
            types,
            moves,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "http://api.test/v2";

    fn config(limit: usize) -> FetchConfig {
        FetchConfig {
            base_url: BASE.to_string(),
            limit,
        }
    }

    /// Type "fire" with two members; charmander knows three moves.
    fn fire_fixtures() -> FixtureTransport {
        FixtureTransport::new()
            .with(
                format!("{BASE}/type/fire/"),
                json!({
                    "name": "fire",
                    "pokemon": [
                        {"pokemon": {"name": "charmander", "url": format!("{BASE}/pokemon/4/")}},
                        {"pokemon": {"name": "vulpix", "url": format!("{BASE}/pokemon/37/")}}
                    ]
                }),
            )
            .with(
                format!("{BASE}/pokemon/4/"),
                json!({
                    "name": "charmander",
                    "order": 5,
                    "height": 6,
                    "weight": 85,
                    "types": [{"slot": 1, "type": {"name": "fire", "url": format!("{BASE}/type/10/")}}],
                    "moves": [
                        {"move": {"name": "scratch", "url": format!("{BASE}/move/10/")}},
                        {"move": {"name": "ember", "url": format!("{BASE}/move/52/")}},
                        {"move": {"name": "growl", "url": format!("{BASE}/move/45/")}}
                    ]
                }),
            )
            .with(
                format!("{BASE}/pokemon/37/"),
                json!({
                    "name": "vulpix",
                    "types": [{"type": {"url": format!("{BASE}/type/10/")}}],
                    "moves": []
                }),
            )
            .with(format!("{BASE}/type/10/"), json!({"name": "fire"}))
            .with(format!("{BASE}/move/10/"), json!({"name": "scratch", "power": 40}))
            .with(format!("{BASE}/move/52/"), json!({"name": "ember", "power": 40}))
            .with(format!("{BASE}/move/45/"), json!({"name": "growl", "power": null}))
    }

    #[test]
    fn test_type_with_limit_one() {
        let composer = Composer::new(fire_fixtures(), config(1));
        let records = composer.by_type("fire").unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].moves.len(), 3);
        assert_eq!(records[0].types, vec![FetchedType { name: Some("fire".into()) }]);
        assert_eq!(records[0].moves[2].power, None);

        // The second member is never requested.
        assert!(!composer
            .transport()
            .requested()
            .contains(&format!("{BASE}/pokemon/37/")));
    }

    #[test]
    fn test_record_uses_collection_fields() {
        let composer = Composer::new(fire_fixtures(), config(1));
        let record = &composer.by_type("fire").unwrap()[0];

        assert_eq!(record.name.as_deref(), Some("fire"));
        assert!(record.order.is_none());

        let json = serde_json::to_value(record).unwrap();
        assert!(json["height"].is_null());
        assert!(json["weight"].is_null());
    }

    #[test]
    fn test_unbounded_limit() {
        let composer = Composer::new(fire_fixtures(), config(0));
        let records = composer.by_type("fire").unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[1].moves.is_empty());
    }

    #[test]
    fn test_failed_request_aborts() {
        let mut transport = fire_fixtures();
        transport.insert(format!("{BASE}/pokemon/37/"), json!({
            "types": [],
            "moves": [{"move": {"url": format!("{BASE}/move/999/")}}]
        }));
        let composer = Composer::new(transport, config(0));

        let err = composer.by_type("fire").unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, ref url } if url.ends_with("/move/999/")));
    }

    #[test]
    fn test_missing_collection_is_status_error() {
        let composer = Composer::new(FixtureTransport::new(), config(1));
        let err = composer.by_move("nothing").unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[test]
    fn test_move_mode_reads_learned_by_pokemon() {
        let transport = fire_fixtures().with(
            format!("{BASE}/move/ember/"),
            json!({
                "name": "ember",
                "power": 40,
                "learned_by_pokemon": [{"name": "charmander", "url": format!("{BASE}/pokemon/4/")}]
            }),
        );
        let composer = Composer::new(transport, config(5));
        let records = composer.by_move("ember").unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name.as_deref(), Some("ember"));
        assert_eq!(records[0].moves.len(), 3);
    }

    #[test]
    fn test_malformed_member_list() {
        let transport = FixtureTransport::new().with(
            format!("{BASE}/type/odd/"),
            json!({"name": "odd", "pokemon": [{"nope": true}]}),
        );
        let composer = Composer::new(transport, config(1));
        let err = composer.by_type("odd").unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[test]
    fn test_collection_without_members() {
        let transport =
            FixtureTransport::new().with(format!("{BASE}/type/empty/"), json!({"name": "empty"}));
        let composer = Composer::new(transport, config(1));
        assert!(composer.by_type("empty").unwrap().is_empty());
    }

    #[test]
    fn test_collection_url() {
        let config = FetchConfig {
            base_url: "http://pokeapi.co/api/v2/".to_string(),
            limit: 1,
        };
        assert_eq!(
            config.collection_url(FetchMode::Move, "ember"),
            "http://pokeapi.co/api/v2/move/ember/"
        );
        assert_eq!(FetchConfig::default().limit, FETCH_LIMIT_DEFAULT);
    }
}
