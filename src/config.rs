use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_TOLERANCE: f64 = 0.05;
pub const DEFAULT_MIN_MATCHED_MARKETS: usize = 3;
const DEFAULT_HISTORIC_DATA_FILE: &str = "./data/historic_matches.json";
const DEFAULT_FEED_TZ_OFFSET_HOURS: i64 = 3;
const MIN_TZ_OFFSET_HOURS: i64 = -12;
const MAX_TZ_OFFSET_HOURS: i64 = 14;
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro-latest";

/// Tolerance matching parameters, read once per process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityConfig {
    pub tolerance: f64,
    pub min_matched_markets: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            min_matched_markets: DEFAULT_MIN_MATCHED_MARKETS,
        }
    }
}

impl SimilarityConfig {
    pub fn new(tolerance: f64, min_matched_markets: usize) -> Result<Self, ConfigError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(tolerance));
        }
        if min_matched_markets == 0 {
            return Err(ConfigError::ZeroMinimumMarkets);
        }
        Ok(Self {
            tolerance,
            min_matched_markets,
        })
    }

    /// `SIMILARITY_THRESHOLD` and `MIN_SIMILAR_CATEGORIES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let tolerance = parse_or(&lookup, "SIMILARITY_THRESHOLD", DEFAULT_TOLERANCE)?;
        let min = parse_or(&lookup, "MIN_SIMILAR_CATEGORIES", DEFAULT_MIN_MATCHED_MARKETS)?;
        Self::new(tolerance, min)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub similarity: SimilarityConfig,
    pub historic_data_file: PathBuf,
    pub feed_tz_offset_hours: i64,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let text = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let feed_tz_offset_hours = parse_or(
            &lookup,
            "FEED_TIMEZONE_OFFSET_HOURS",
            DEFAULT_FEED_TZ_OFFSET_HOURS,
        )?;
        if !(MIN_TZ_OFFSET_HOURS..=MAX_TZ_OFFSET_HOURS).contains(&feed_tz_offset_hours) {
            return Err(ConfigError::InvalidTimezoneOffset(feed_tz_offset_hours));
        }

        Ok(Self {
            similarity: SimilarityConfig::from_lookup(&lookup)?,
            historic_data_file: PathBuf::from(
                text("HISTORIC_DATA_FILE")
                    .unwrap_or_else(|| DEFAULT_HISTORIC_DATA_FILE.to_string()),
            ),
            feed_tz_offset_hours,
            gemini_api_key: text("GEMINI_API_KEY"),
            gemini_model: text("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        })
    }
}

/// Load `.env.local` then `.env`; earlier files win since dotenvy never overrides.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }
    trimmed.parse::<T>().map_err(|_| ConfigError::NotANumber {
        key,
        value: raw.clone(),
    })
}
