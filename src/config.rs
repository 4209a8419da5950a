//! Training configuration loaded from JSON
//!
//! Maps a JSON document onto [`TrainingConfig`], filling the standard
//! hyperparameter defaults for absent fields and validating the result
//! before it reaches a training loop.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::CnnResult;
use crate::optimizers::{Hyperparameters, LEARNING_RATE, MOMENTUM, WEIGHT_DECAY};

/// Training hyperparameters plus the optional RNG seed.
///
/// # Example
///
/// ```
/// use rust_convnet::config::TrainingConfig;
///
/// let config: TrainingConfig =
///     serde_json::from_str(r#"{ "learning_rate": 0.05, "seed": 7 }"#).unwrap();
/// assert_eq!(config.learning_rate, 0.05);
/// assert_eq!(config.momentum, 0.01);
/// assert_eq!(config.seed, Some(7));
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_momentum")]
    pub momentum: f64,
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f64,
    /// Seed for weight initialization and shuffling. When absent the
    /// caller seeds from the clock.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_learning_rate() -> f64 {
    LEARNING_RATE
}

fn default_momentum() -> f64 {
    MOMENTUM
}

fn default_weight_decay() -> f64 {
    WEIGHT_DECAY
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: LEARNING_RATE,
            momentum: MOMENTUM,
            weight_decay: WEIGHT_DECAY,
            seed: None,
        }
    }
}

impl TrainingConfig {
    /// Validate the values and convert into [`Hyperparameters`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CnnError::Configuration`] if any value is
    /// negative or not finite.
    pub fn hyperparameters(&self) -> CnnResult<Hyperparameters> {
        Hyperparameters::new(self.learning_rate, self.momentum, self.weight_decay)
    }
}

/// Load and validate a [`TrainingConfig`] from a JSON file.
///
/// # Errors
///
/// Returns [`crate::error::CnnError::Io`] if the file cannot be read,
/// [`crate::error::CnnError::Parse`] for malformed JSON, and
/// [`crate::error::CnnError::Configuration`] for invalid values.
pub fn load_config<P: AsRef<Path>>(path: P) -> CnnResult<TrainingConfig> {
    let contents = fs::read_to_string(path)?;
    let config: TrainingConfig = serde_json::from_str(&contents)?;
    config.hyperparameters()?;
    tracing::debug!(
        learning_rate = config.learning_rate,
        momentum = config.momentum,
        weight_decay = config.weight_decay,
        "loaded training configuration"
    );
    Ok(config)
}
