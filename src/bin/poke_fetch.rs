//! poke-fetch - Assemble pokemon records from PokeAPI
//!
//! Prints an indented JSON array to stdout. Logs go to stderr.
//!
//! ```text
//! poke-fetch --type fire
//! poke-fetch --move ember --limit 0
//! ```

use clap::builder::NonEmptyStringValueParser;
use clap::{ArgGroup, Parser};
use pokedex::constants::{FETCH_LIMIT_DEFAULT, POKEAPI_BASE_URL_DEFAULT};
use pokedex::fetch::{Composer, FetchConfig, FetchMode, HttpTransport};

/// Fetch pokemon of a type, or pokemon that learn a move
#[derive(Parser, Debug)]
#[command(name = "poke-fetch")]
#[command(version)]
#[command(group(ArgGroup::new("selector").required(true).args(["type_name", "move_name"])))]
struct Cli {
    /// Type to resolve
    #[arg(long = "type", value_name = "NAME", value_parser = NonEmptyStringValueParser::new())]
    type_name: Option<String>,

    /// Move to resolve
    #[arg(long = "move", value_name = "NAME", value_parser = NonEmptyStringValueParser::new())]
    move_name: Option<String>,

    /// Maximum records to assemble (0 = no limit)
    #[arg(long, default_value_t = FETCH_LIMIT_DEFAULT)]
    limit: usize,

    /// PokeAPI root
    #[arg(long, env = "POKEAPI_BASE_URL", default_value = POKEAPI_BASE_URL_DEFAULT)]
    base_url: String,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn selection(&self) -> anyhow::Result<(FetchMode, &str)> {
        match (&self.type_name, &self.move_name) {
            (Some(name), None) => Ok((FetchMode::Type, name.as_str())),
            (None, Some(name)) => Ok((FetchMode::Move, name.as_str())),
            _ => anyhow::bail!("exactly one of --type or --move is required"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    let (mode, name) = cli.selection()?;
    let config = FetchConfig {
        base_url: cli.base_url.clone(),
        limit: cli.limit,
    };
    let composer = Composer::new(HttpTransport::new()?, config);

    let records = composer.fetch(mode, name)?;
    println!("{}", serde_json::to_string_pretty(&records)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_selector() {
        let cli = Cli::try_parse_from(["poke-fetch", "--type", "fire"]).unwrap();
        let (mode, name) = cli.selection().unwrap();
        assert_eq!(mode, FetchMode::Type);
        assert_eq!(name, "fire");
        assert_eq!(cli.limit, FETCH_LIMIT_DEFAULT);
    }

    #[test]
    fn test_move_selector_with_limit() {
        let cli = Cli::try_parse_from(["poke-fetch", "--move", "ember", "--limit", "0"]).unwrap();
        assert_eq!(cli.selection().unwrap().0, FetchMode::Move);
        assert_eq!(cli.limit, 0);
    }

    #[test]
    fn test_both_selectors_rejected() {
        let err = Cli::try_parse_from(["poke-fetch", "--type", "fire", "--move", "ember"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_no_selector_rejected() {
        let err = Cli::try_parse_from(["poke-fetch"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_empty_selector_rejected() {
        for flag in ["--type", "--move"] {
            let err = Cli::try_parse_from(["poke-fetch", flag, ""]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
        }
    }
}
