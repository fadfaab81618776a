//! Conjunctive episode search criteria

use crate::episode::{Episode, EpisodeStatus, EpisodeType};
use engram_core::{Result, TimeRange, Timestamp};
use serde::{Deserialize, Serialize};

/// Filter combining keyword, attribute, time and importance constraints.
///
/// Every populated field must match. The time window applies to the episode
/// start time; episodes that have no events yet pass it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSearchCriteria {
    pub keyword: Option<String>,
    pub episode_type: Option<EpisodeType>,
    pub status: Option<EpisodeStatus>,
    pub participant: Option<String>,
    pub location: Option<String>,
    pub tag: Option<String>,
    pub time_range: Option<TimeRange>,
    pub min_importance: Option<f64>,
    /// `Some(false)` excludes archived episodes, `Some(true)` keeps only them
    pub archived: Option<bool>,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl EpisodeSearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn episode_type(mut self, episode_type: EpisodeType) -> Self {
        self.episode_type = Some(episode_type);
        self
    }

    pub fn status(mut self, status: EpisodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn participant(mut self, participant: impl Into<String>) -> Self {
        self.participant = Some(participant.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Restrict to episodes starting in `[start, end)`; an open bound is
    /// unbounded
    pub fn between(mut self, start: Option<Timestamp>, end: Option<Timestamp>) -> Result<Self> {
        self.time_range = Some(TimeRange::from_bounds(start, end)?);
        Ok(self)
    }

    pub fn min_importance(mut self, min_importance: f64) -> Self {
        self.min_importance = Some(min_importance);
        self
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check a single episode against every populated constraint
    pub fn matches(&self, episode: &Episode) -> bool {
        if let Some(keyword) = &self.keyword {
            if !matches_keyword(episode, &keyword.to_lowercase()) {
                return false;
            }
        }
        if self.episode_type.is_some() && episode.episode_type != self.episode_type {
            return false;
        }
        if let Some(status) = self.status {
            if episode.status != status {
                return false;
            }
        }
        if let Some(participant) = &self.participant {
            if !episode.participants.contains(participant) {
                return false;
            }
        }
        if self.location.is_some() && episode.location != self.location {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !episode.tags.contains(tag) {
                return false;
            }
        }
        if let (Some(range), Some(start)) = (&self.time_range, episode.start_time) {
            if !range.contains(start) {
                return false;
            }
        }
        if let Some(min_importance) = self.min_importance {
            if episode.importance < min_importance {
                return false;
            }
        }
        if let Some(archived) = self.archived {
            if episode.archived != archived {
                return false;
            }
        }
        true
    }
}

/// Case-insensitive substring match against title, description, summary and
/// event contents; `needle` must already be lower-cased
pub(crate) fn matches_keyword(episode: &Episode, needle: &str) -> bool {
    let contains = |text: &str| text.to_lowercase().contains(needle);

    contains(&episode.title)
        || episode.description.as_deref().is_some_and(contains)
        || episode.summary.as_deref().is_some_and(contains)
        || episode.events.iter().any(|e| contains(&e.content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    #[test]
    fn test_keyword_matches_any_text_field() {
        let episode = Episode::new("Trip planning")
            .with_description("Summer holiday")
            .with_events([Event::new("Booked a flight to Lisbon")]);

        assert!(EpisodeSearchCriteria::new().keyword("TRIP").matches(&episode));
        assert!(EpisodeSearchCriteria::new().keyword("holiday").matches(&episode));
        assert!(EpisodeSearchCriteria::new().keyword("lisbon").matches(&episode));
        assert!(!EpisodeSearchCriteria::new().keyword("madrid").matches(&episode));
    }

    #[test]
    fn test_criteria_are_conjunctive() {
        let episode = Episode::new("Standup")
            .with_type(EpisodeType::Task)
            .with_location("office")
            .with_tag("daily")
            .with_events([Event::new("sync").with_participant("Bob")]);

        let criteria = EpisodeSearchCriteria::new()
            .episode_type(EpisodeType::Task)
            .status(EpisodeStatus::Ongoing)
            .participant("Bob")
            .location("office")
            .tag("daily")
            .archived(false);
        assert!(criteria.matches(&episode));

        assert!(!criteria.clone().tag("weekly").matches(&episode));
        assert!(!criteria.clone().min_importance(0.9).matches(&episode));
        assert!(!criteria.episode_type(EpisodeType::Learning).matches(&episode));
    }

    #[test]
    fn test_time_window() {
        let episode = Episode::new("timed")
            .with_events([Event::new("e").at(Timestamp::from_millis(1_000))]);
        let inside = EpisodeSearchCriteria::new()
            .between(Some(Timestamp::from_millis(1_000)), None)
            .unwrap();
        let outside = EpisodeSearchCriteria::new()
            .between(None, Some(Timestamp::from_millis(1_000)))
            .unwrap();

        assert!(inside.matches(&episode));
        assert!(!outside.matches(&episode));
        // No start time yet
        assert!(outside.matches(&Episode::new("empty")));

        let inverted = EpisodeSearchCriteria::new()
            .between(Some(Timestamp::from_millis(5)), Some(Timestamp::from_millis(1)));
        assert!(inverted.is_err());
    }
}
