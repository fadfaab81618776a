//! Memory configuration

use engram_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for knowledge-graph memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMemoryConfig {
    /// Run the extractor on every saved exchange
    pub auto_extraction: bool,

    /// Traversal depth used when rendering context around an entity
    pub max_hops: usize,

    /// Number of top-ranked entities included in rendered context
    pub top_entities: usize,

    /// Per-day multiplier applied by decay sweeps, in `(0, 1]`
    pub decay_factor: f64,

    /// Relations below this weight are removed by pruning sweeps
    pub prune_threshold: f64,
}

impl Default for GraphMemoryConfig {
    fn default() -> Self {
        Self {
            auto_extraction: true,
            max_hops: 2,
            top_entities: 5,
            decay_factor: 0.99,
            prune_threshold: 0.1,
        }
    }
}

impl GraphMemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: disable automatic extraction
    pub fn no_auto_extraction(mut self) -> Self {
        self.auto_extraction = false;
        self
    }

    /// Builder: set traversal depth
    pub fn max_hops(mut self, hops: usize) -> Self {
        self.max_hops = hops;
        self
    }

    /// Builder: set number of top entities
    pub fn top_entities(mut self, n: usize) -> Self {
        self.top_entities = n;
        self
    }

    /// Builder: set decay factor
    pub fn decay_factor(mut self, factor: f64) -> Self {
        self.decay_factor = factor;
        self
    }

    /// Builder: set prune threshold
    pub fn prune_threshold(mut self, threshold: f64) -> Self {
        self.prune_threshold = threshold;
        self
    }

    /// Reject out-of-range values
    pub fn validate(&self) -> Result<()> {
        if !(self.decay_factor > 0.0 && self.decay_factor <= 1.0) {
            return Err(Error::InvalidArgument(format!(
                "decay_factor must be in (0, 1], got {}",
                self.decay_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.prune_threshold) {
            return Err(Error::InvalidArgument(format!(
                "prune_threshold must be in [0, 1], got {}",
                self.prune_threshold
            )));
        }
        Ok(())
    }
}

/// Configuration for episodic memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicMemoryConfig {
    /// Open an episode automatically when a session records its first exchange
    pub auto_create_episodes: bool,

    /// Inactivity after which the active episode is closed
    pub episode_timeout: Duration,

    /// Maximum number of episodes rendered into context
    pub max_episodes_in_context: usize,

    /// Event count at which the active episode is closed
    pub max_events_per_episode: usize,

    /// Span at which the active episode is closed
    pub max_episode_duration: Duration,

    /// Minimum importance for an episode to appear in context
    pub importance_threshold: f64,
}

impl Default for EpisodicMemoryConfig {
    fn default() -> Self {
        Self {
            auto_create_episodes: true,
            episode_timeout: Duration::from_secs(30 * 60), // 30 minutes
            max_episodes_in_context: 5,
            max_events_per_episode: 100,
            max_episode_duration: Duration::from_secs(60 * 60), // 1 hour
            importance_threshold: 0.3,
        }
    }
}

impl EpisodicMemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: require explicit `start_episode` calls
    pub fn no_auto_create(mut self) -> Self {
        self.auto_create_episodes = false;
        self
    }

    /// Builder: set inactivity timeout
    pub fn episode_timeout(mut self, timeout: Duration) -> Self {
        self.episode_timeout = timeout;
        self
    }

    /// Builder: set number of episodes in context
    pub fn max_episodes_in_context(mut self, n: usize) -> Self {
        self.max_episodes_in_context = n;
        self
    }

    /// Builder: set event cap per episode
    pub fn max_events_per_episode(mut self, n: usize) -> Self {
        self.max_events_per_episode = n;
        self
    }

    /// Builder: set maximum episode span
    pub fn max_episode_duration(mut self, duration: Duration) -> Self {
        self.max_episode_duration = duration;
        self
    }

    /// Builder: set importance threshold
    pub fn importance_threshold(mut self, threshold: f64) -> Self {
        self.importance_threshold = threshold;
        self
    }

    /// Reject out-of-range values
    pub fn validate(&self) -> Result<()> {
        if self.max_events_per_episode == 0 {
            return Err(Error::InvalidArgument(
                "max_events_per_episode must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.importance_threshold) {
            return Err(Error::InvalidArgument(format!(
                "importance_threshold must be in [0, 1], got {}",
                self.importance_threshold
            )));
        }
        Ok(())
    }
}
