//! Constants
//!
//! TigerStyle: Every limit and default is named, with its unit in the name.

// =============================================================================
// Application
// =============================================================================

/// Application name
pub const APP_NAME: &str = "pokedex";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP bind address
pub const HTTP_BIND_ADDRESS_DEFAULT: &str = "127.0.0.1:8000";

// =============================================================================
// Entities
// =============================================================================

/// Maximum length of any entity name in characters
pub const ENTITY_NAME_CHARS_MAX: usize = 255;

/// Minimum number of shared moves for a pokemon to count as similar
pub const SIMILAR_SHARED_MOVES_COUNT_MIN: usize = 3;

// =============================================================================
// Pagination
// =============================================================================

/// Default number of records per list page
pub const PAGE_SIZE_DEFAULT: usize = 10;

/// Maximum number of records per list page
pub const PAGE_SIZE_MAX: usize = 100;

// =============================================================================
// Fetch
// =============================================================================

/// Default PokeAPI base URL
pub const POKEAPI_BASE_URL_DEFAULT: &str = "http://pokeapi.co/api/v2";

/// Default number of pokemon resolved per fetch (0 = unbounded)
pub const FETCH_LIMIT_DEFAULT: usize = 1;
