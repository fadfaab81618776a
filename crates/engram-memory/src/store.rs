//! The episode store capability

use crate::criteria::EpisodeSearchCriteria;
use crate::episode::{Episode, EpisodeStatus, EpisodeType};
use crate::event::Event;
use engram_core::{EpisodeId, Result, TimeRange, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate figures over an episode store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStatistics {
    pub episode_count: usize,
    pub total_event_count: usize,
    pub count_by_type: BTreeMap<EpisodeType, usize>,
    pub count_by_status: BTreeMap<EpisodeStatus, usize>,
    pub archived_count: usize,
    pub average_events_per_episode: f64,
    pub average_importance: f64,
}

/// Storage and query interface over episodes.
///
/// Operations whose subject is an episode id fail with `EpisodeNotFound`
/// when it is absent; lookups by attribute return an empty result for
/// unknown keys. Time filters are half-open and apply to episode start
/// times, so episodes without events never match them.
pub trait EpisodeStore: Send + Sync {
    // ========== CRUD ==========

    /// Insert an episode, replacing any stored episode with the same id
    fn add_episode(&self, episode: Episode) -> Result<EpisodeId>;

    fn add_episodes(&self, episodes: Vec<Episode>) -> Result<Vec<EpisodeId>> {
        episodes.into_iter().map(|e| self.add_episode(e)).collect()
    }

    /// Append an event to a stored episode
    fn add_event(&self, id: &EpisodeId, event: Event) -> Result<()>;

    fn get_episode(&self, id: &EpisodeId) -> Result<Option<Episode>>;

    /// Replace a stored episode
    fn update_episode(&self, episode: Episode) -> Result<()>;

    fn delete_episode(&self, id: &EpisodeId) -> Result<Episode>;

    fn get_all_episodes(&self) -> Result<Vec<Episode>>;

    fn get_episodes_by_session(&self, session_id: &str) -> Result<Vec<Episode>>;

    // ========== Time Queries ==========

    /// Episodes starting inside `range`
    fn get_episodes_in(&self, range: &TimeRange) -> Result<Vec<Episode>>;

    /// Episodes starting in `[start, end)`; `start > end` is rejected
    fn get_episodes_between(&self, start: Timestamp, end: Timestamp) -> Result<Vec<Episode>> {
        self.get_episodes_in(&TimeRange::new(start, end)?)
    }

    /// Episodes starting today in the local calendar
    fn get_today_episodes(&self) -> Result<Vec<Episode>> {
        self.get_episodes_in(&TimeRange::today())
    }

    /// Episodes starting since Monday in the local calendar
    fn get_this_week_episodes(&self) -> Result<Vec<Episode>> {
        self.get_episodes_in(&TimeRange::this_week())
    }

    /// Episodes starting since the first of the month in the local calendar
    fn get_this_month_episodes(&self) -> Result<Vec<Episode>> {
        self.get_episodes_in(&TimeRange::this_month())
    }

    /// The `n` most recently started episodes (creation time when empty)
    fn get_recent_episodes(&self, n: usize) -> Result<Vec<Episode>>;

    // ========== Attribute Queries ==========

    fn get_episodes_by_type(&self, episode_type: EpisodeType) -> Result<Vec<Episode>>;

    fn get_episodes_by_status(&self, status: EpisodeStatus) -> Result<Vec<Episode>>;

    fn get_ongoing_episodes(&self) -> Result<Vec<Episode>> {
        self.get_episodes_by_status(EpisodeStatus::Ongoing)
    }

    fn get_completed_episodes(&self) -> Result<Vec<Episode>> {
        self.get_episodes_by_status(EpisodeStatus::Completed)
    }

    fn get_episodes_by_participant(&self, participant: &str) -> Result<Vec<Episode>>;

    fn get_episodes_by_location(&self, location: &str) -> Result<Vec<Episode>>;

    fn get_episodes_by_tag(&self, tag: &str) -> Result<Vec<Episode>>;

    // ========== Importance & Similarity ==========

    /// The `n` most important episodes
    fn get_top_episodes(&self, n: usize) -> Result<Vec<Episode>>;

    /// Episodes with importance at least `threshold`, most important first
    fn get_episodes_by_importance(&self, threshold: f64) -> Result<Vec<Episode>>;

    /// The `n` stored episodes most similar to `episode`, excluding itself
    /// and anything with zero similarity
    fn find_similar_episodes(&self, episode: &Episode, n: usize) -> Result<Vec<Episode>>;

    fn find_similar_to(&self, id: &EpisodeId, n: usize) -> Result<Vec<Episode>>;

    // ========== Search ==========

    /// Case-insensitive keyword search over titles, descriptions, summaries
    /// and event contents
    fn search_episodes(&self, keyword: &str) -> Result<Vec<Episode>>;

    fn search(&self, criteria: &EpisodeSearchCriteria) -> Result<Vec<Episode>>;

    // ========== Statistics ==========

    fn episode_count(&self) -> Result<usize>;

    fn total_event_count(&self) -> Result<usize>;

    fn count_by_type(&self) -> Result<BTreeMap<EpisodeType, usize>>;

    fn count_by_status(&self) -> Result<BTreeMap<EpisodeStatus, usize>>;

    fn statistics(&self) -> Result<EpisodeStatistics>;

    // ========== Maintenance ==========

    fn clear(&self) -> Result<()>;

    /// Delete every episode of a session; returns the number removed
    fn clear_session(&self, session_id: &str) -> Result<usize>;

    /// Delete episodes that started before `time`
    fn delete_episodes_before(&self, time: Timestamp) -> Result<usize>;

    /// Delete episodes with importance below `threshold`
    fn delete_low_importance_episodes(&self, threshold: f64) -> Result<usize>;

    /// Flag an episode as archived
    fn archive_episode(&self, id: &EpisodeId) -> Result<()>;

    /// Archive episodes that started before `time`; returns the number newly
    /// archived
    fn archive_episodes_before(&self, time: Timestamp) -> Result<usize>;
}
