//! Driver configuration.

use posgrid_core::ConfigError;

/// Configuration for an [`Env`](crate::Env).
///
/// Game parameters live in each game's own config; this struct only
/// covers what the driver itself controls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvConfig {
    /// Seed for the driver's RNG until the first `reset(Some(seed))`.
    /// Default: 0.
    pub seed: u64,
    /// Truncate episodes after this many steps. Combined with the model's
    /// own horizon by taking the smaller. Default: `None`.
    pub max_episode_steps: Option<u64>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_episode_steps: None,
        }
    }
}

impl EnvConfig {
    /// Config with the given truncation horizon.
    pub fn with_max_episode_steps(max_episode_steps: u64) -> Self {
        Self {
            max_episode_steps: Some(max_episode_steps),
            ..Self::default()
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_episode_steps == Some(0) {
            return Err(ConfigError::invalid(
                "max_episode_steps",
                "must be at least 1 when set",
            ));
        }
        Ok(())
    }
}
