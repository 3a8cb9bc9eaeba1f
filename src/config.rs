//! Search configuration with serde defaults and validation.

use serde::{Deserialize, Serialize};

/// Default minimum cosine similarity for a block to count as a hit.
const DEFAULT_MIN_SIMILARITY: f32 = 0.5;
/// Default maximum number of hits (blocks or note groups) returned.
const DEFAULT_MAX_HITS: usize = 10;
/// Default maximum block size in word units.
const DEFAULT_MAX_BLOCK_SIZE: usize = 512;

/// Policy for collapsing a note's per-block similarities into one score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    /// Best block wins.
    #[default]
    Max,
    /// Arithmetic mean over the note's surviving blocks.
    Avg,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("min_similarity must be between 0.0 and 1.0, got {0}")]
    InvalidThreshold(f32),

    #[error("max_hits must be greater than 0")]
    ZeroMaxHits,

    #[error("max_block_size must be greater than 0")]
    ZeroBlockSize,

    #[error("malformed config: {0}")]
    Parse(String),
}

/// Configuration for semantic search.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Minimum similarity [0.0, 1.0] for a block to survive filtering.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Maximum number of results returned by a search.
    #[serde(default = "default_max_hits")]
    pub max_hits: usize,

    /// How per-block similarities collapse into a per-note score.
    #[serde(default)]
    pub agg_similarity: AggregationMode,

    /// Maximum block size in word units for the chunker.
    #[serde(default = "default_max_block_size")]
    pub max_block_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_MIN_SIMILARITY,
            max_hits: DEFAULT_MAX_HITS,
            agg_similarity: AggregationMode::Max,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
        }
    }
}

fn default_min_similarity() -> f32 {
    DEFAULT_MIN_SIMILARITY
}

fn default_max_hits() -> usize {
    DEFAULT_MAX_HITS
}

fn default_max_block_size() -> usize {
    DEFAULT_MAX_BLOCK_SIZE
}

impl SearchConfig {
    /// Parse a YAML config fragment, falling back to defaults for absent keys.
    pub fn from_yaml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(ConfigError::InvalidThreshold(self.min_similarity));
        }
        if self.max_hits == 0 {
            return Err(ConfigError::ZeroMaxHits);
        }
        if self.max_block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        Ok(())
    }
}
