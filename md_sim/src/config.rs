//! Simulator configuration management.
//!
//! Consolidates command-line flags and environment variable reads and
//! provides validated configuration.

use magic_duel::{
    Coins,
    db::{self, DatabaseConfig},
    session::CoordinatorConfig,
};
use pico_args::Arguments;
use std::str::FromStr;

/// Complete simulator configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of games to play
    pub games: usize,
    /// Base seed for boards and bots; random when unset
    pub seed: Option<u64>,
    /// Stake recorded on every game
    pub stake: Coins,
    /// Rounds after which player 1 walks away from a game that is still running
    pub max_rounds: u32,
    /// PostgreSQL storage; games stay in memory when unset
    pub database: Option<DatabaseConfig>,
    /// Coordinator settings
    pub coordinator: CoordinatorConfig,
}

impl SimConfig {
    /// Load configuration from command-line flags, falling back to
    /// environment variables and then defaults
    ///
    /// # Errors
    ///
    /// Returns error if a flag or variable is present but malformed, or the
    /// result fails [`SimConfig::validate`]
    pub fn from_args(pargs: &mut Arguments) -> Result<Self, ConfigError> {
        let games = flag_or_env(pargs, "--games", "MD_SIM_GAMES")?.unwrap_or(10);
        let seed = flag_or_env(pargs, "--seed", "MD_SIM_SEED")?;
        let stake = flag_or_env(pargs, "--stake", "MD_SIM_STAKE")?.unwrap_or(10);
        let max_rounds = flag_or_env(pargs, "--max-rounds", "MD_SIM_MAX_ROUNDS")?.unwrap_or(50);

        let database_url: Option<String> = flag_or_env(pargs, "--db-url", "DATABASE_URL")?;
        let database = database_url.map(|url| DatabaseConfig::default().with_url(&url));

        let config = Self {
            games,
            seed,
            stake,
            max_rounds,
            database,
            coordinator: CoordinatorConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.games == 0 {
            return Err(ConfigError::Invalid {
                var: "MD_SIM_GAMES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.max_rounds == 0 {
            return Err(ConfigError::Invalid {
                var: "MD_SIM_MAX_ROUNDS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        self.coordinator.validate()?;
        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error(transparent)]
    Coordinator(#[from] db::ConfigError),
}

/// A CLI flag wins over the environment variable; both are optional.
fn flag_or_env<T>(pargs: &mut Arguments, flag: &'static str, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
{
    let invalid = |value: &str| ConfigError::Invalid {
        var: var.to_string(),
        reason: format!("cannot parse {value:?}"),
    };

    if let Some(value) = pargs
        .opt_value_from_str::<_, String>(flag)
        .map_err(|err| ConfigError::Invalid {
            var: flag.to_string(),
            reason: err.to_string(),
        })?
    {
        return value.parse().map(Some).map_err(|_| invalid(&value));
    }

    match std::env::var(var) {
        Ok(value) => value.trim().parse().map(Some).map_err(|_| invalid(&value)),
        Err(_) => Ok(None),
    }
}
