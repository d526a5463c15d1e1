//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::physics::{Bounds, Vec3};
use crate::util::rate_limit::INTENT_RATE_LIMIT;
use crate::util::time::{DEFAULT_TICK_RATE, MAX_TICK_RATE};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (empty = any origin)
    pub client_origins: Vec<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Intent requests per second allowed for one participant
    pub intent_rate_limit: u32,

    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Reject joins that name an arena which does not exist yet
    pub strict_arenas: bool,
    /// How long an ended arena stays readable before teardown
    pub ended_linger: Duration,
    /// Rules every new arena is created with
    pub rules: ArenaRules,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosted platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let client_origins = env::var("CLIENT_ORIGIN")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let defaults = ArenaRules::default();
        let rules = ArenaRules {
            min_players: env_or("MIN_PLAYERS", defaults.min_players)?,
            max_players: env_or("MAX_PLAYERS", defaults.max_players)?,
            round_duration_ms: env_secs_or("ROUND_DURATION_SECS", defaults.round_duration_ms)?,
            intermission_ms: env_secs_or("INTERMISSION_SECS", defaults.intermission_ms)?,
            max_rounds: env_or("MAX_ROUNDS", defaults.max_rounds)?,
            rounds_to_win: env_or("ROUNDS_TO_WIN", defaults.rounds_to_win)?,
            respawn_delay_ms: env_secs_or("RESPAWN_DELAY_SECS", defaults.respawn_delay_ms)?,
            objective_fuse_ms: env_secs_or("OBJECTIVE_FUSE_SECS", defaults.objective_fuse_ms)?,
            ..defaults
        };

        let config = Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origins,
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT_SECS", 10u64)?),
            intent_rate_limit: env_or("INTENT_RATE_LIMIT", INTENT_RATE_LIMIT)?,
            tick_rate: env_or("TICK_RATE", DEFAULT_TICK_RATE)?,
            strict_arenas: env_or("ARENA_STRICT", false)?,
            ended_linger: Duration::from_secs(env_or("ENDED_LINGER_SECS", 30u64)?),
            rules,
        };
        config.validate()?;
        Ok(config)
    }

    /// Range checks that parsing alone cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_TICK_RATE).contains(&self.tick_rate) {
            return Err(ConfigError::Invalid("TICK_RATE"));
        }
        if self.rules.min_players < 2 {
            return Err(ConfigError::Invalid("MIN_PLAYERS"));
        }
        if self.rules.max_players < self.rules.min_players {
            return Err(ConfigError::Invalid("MAX_PLAYERS"));
        }
        if self.intent_rate_limit == 0 {
            return Err(ConfigError::Invalid("INTENT_RATE_LIMIT"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_level: "info".to_string(),
            client_origins: Vec::new(),
            request_timeout: Duration::from_secs(10),
            intent_rate_limit: INTENT_RATE_LIMIT,
            tick_rate: DEFAULT_TICK_RATE,
            strict_arenas: false,
            ended_linger: Duration::from_secs(30),
            rules: ArenaRules::default(),
        }
    }
}

/// Environment parameter set of one arena.
///
/// Durations are in milliseconds of arena time.
#[derive(Debug, Clone)]
pub struct ArenaRules {
    pub min_players: usize,
    pub max_players: usize,
    pub round_duration_ms: u64,
    pub intermission_ms: u64,
    pub max_rounds: u32,
    pub rounds_to_win: u32,
    pub respawn_delay_ms: u64,
    pub objective_fuse_ms: u64,
    /// Max distance from the plant position a defuser may stand
    pub defuse_radius: f32,

    /// Hit-scan reach
    pub hit_range: f32,
    /// Minimum cosine between aim and target direction for a hit
    pub hit_cone_cos: f32,
    /// Fraction of incoming damage soaked by armor
    pub armor_absorption: f32,

    pub bounds: Bounds,
    pub attacker_anchor: Vec3,
    pub defender_anchor: Vec3,
    /// Max offset from the faction anchor on the ground plane
    pub spawn_spread: f32,
    pub spawn_armor: f32,

    pub starting_currency: u32,
    pub max_currency: u32,
    pub kill_reward: u32,
    pub round_win_reward: u32,
    pub round_loss_reward: u32,
    pub kill_score: u32,
    pub objective_score: u32,
}

impl Default for ArenaRules {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 10,
            round_duration_ms: 115_000,
            intermission_ms: 5_000,
            max_rounds: 9,
            rounds_to_win: 5,
            respawn_delay_ms: 4_000,
            objective_fuse_ms: 40_000,
            defuse_radius: 3.0,
            hit_range: 30.0,
            hit_cone_cos: 0.95,
            armor_absorption: 0.2,
            bounds: Bounds {
                min: Vec3::new(-100.0, 0.0, -100.0),
                max: Vec3::new(100.0, 50.0, 100.0),
            },
            attacker_anchor: Vec3::new(-40.0, 0.0, 0.0),
            defender_anchor: Vec3::new(40.0, 0.0, 0.0),
            spawn_spread: 5.0,
            spawn_armor: 0.0,
            starting_currency: 800,
            max_currency: 16_000,
            kill_reward: 300,
            round_win_reward: 3_250,
            round_loss_reward: 1_400,
            kill_score: 2,
            objective_score: 3,
        }
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Reads a whole-second variable into milliseconds
fn env_secs_or(key: &'static str, default_ms: u64) -> Result<u64, ConfigError> {
    Ok(env_or(key, default_ms / 1000)?.saturating_mul(1000))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
