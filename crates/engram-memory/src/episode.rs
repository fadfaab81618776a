//! Episodes: ordered collections of events forming one coherent experience

use crate::event::{Event, EventType, jaccard, join, mean_of};
use chrono::Duration;
use engram_core::{EpisodeId, Properties, PropertyValue, TimeRange, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

/// Importance of an episode before any event is added
pub const DEFAULT_EPISODE_IMPORTANCE: f64 = 0.5;

/// Kind of experience an episode captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeType {
    Conversation,
    Task,
    Learning,
    ProblemSolving,
    DecisionMaking,
    Exploration,
    SocialInteraction,
    Other,
}

impl EpisodeType {
    pub const ALL: [EpisodeType; 8] = [
        EpisodeType::Conversation,
        EpisodeType::Task,
        EpisodeType::Learning,
        EpisodeType::ProblemSolving,
        EpisodeType::DecisionMaking,
        EpisodeType::Exploration,
        EpisodeType::SocialInteraction,
        EpisodeType::Other,
    ];
}

impl fmt::Display for EpisodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EpisodeType::Conversation => "CONVERSATION",
            EpisodeType::Task => "TASK",
            EpisodeType::Learning => "LEARNING",
            EpisodeType::ProblemSolving => "PROBLEM_SOLVING",
            EpisodeType::DecisionMaking => "DECISION_MAKING",
            EpisodeType::Exploration => "EXPLORATION",
            EpisodeType::SocialInteraction => "SOCIAL_INTERACTION",
            EpisodeType::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of an episode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStatus {
    #[default]
    Ongoing,
    Completed,
    Paused,
    Cancelled,
}

impl EpisodeStatus {
    pub const ALL: [EpisodeStatus; 4] = [
        EpisodeStatus::Ongoing,
        EpisodeStatus::Completed,
        EpisodeStatus::Paused,
        EpisodeStatus::Cancelled,
    ];

    /// Completed and cancelled episodes are finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, EpisodeStatus::Completed | EpisodeStatus::Cancelled)
    }

    /// Whether the lifecycle allows moving to `next`.
    ///
    /// `ongoing -> {completed, paused, cancelled}` and `paused -> ongoing`.
    /// The transition methods on [`Episode`] only consult this to log.
    pub fn can_transition_to(&self, next: EpisodeStatus) -> bool {
        use EpisodeStatus::*;
        matches!(
            (self, next),
            (Ongoing, Completed) | (Ongoing, Paused) | (Ongoing, Cancelled) | (Paused, Ongoing)
        )
    }
}

impl fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EpisodeStatus::Ongoing => "ongoing",
            EpisodeStatus::Completed => "completed",
            EpisodeStatus::Paused => "paused",
            EpisodeStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// One coherent experience
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    /// Conversation session this episode belongs to
    pub session_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub episode_type: Option<EpisodeType>,
    pub status: EpisodeStatus,
    /// Events in insertion order
    pub events: Vec<Event>,
    /// Earliest event timestamp
    pub start_time: Option<Timestamp>,
    /// Latest event timestamp (or completion time)
    pub end_time: Option<Timestamp>,
    pub location: Option<String>,
    /// Union of the participants of all events
    pub participants: BTreeSet<String>,
    pub overall_emotion: Option<String>,
    /// Running mean of event importance
    pub importance: f64,
    pub tags: BTreeSet<String>,
    pub summary: Option<String>,
    pub metadata: Properties,
    pub archived: bool,
    pub archived_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Episode {
    /// Create an empty, ongoing episode
    pub fn new(title: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: EpisodeId::new(),
            session_id: None,
            title: title.into(),
            description: None,
            episode_type: None,
            status: EpisodeStatus::Ongoing,
            events: Vec::new(),
            start_time: None,
            end_time: None,
            location: None,
            participants: BTreeSet::new(),
            overall_emotion: None,
            importance: DEFAULT_EPISODE_IMPORTANCE,
            tags: BTreeSet::new(),
            summary: None,
            metadata: Properties::new(),
            archived: false,
            archived_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: attach to a session
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_type(mut self, episode_type: EpisodeType) -> Self {
        self.episode_type = Some(episode_type);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.overall_emotion = Some(emotion.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Builder: set importance, clamped to `[0, 1]`
    pub fn with_importance(mut self, importance: f64) -> Self {
        if !importance.is_nan() {
            self.importance = importance.clamp(0.0, 1.0);
        }
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.metadata.set(key, value);
        self
    }

    /// Builder: add events
    pub fn with_events(mut self, events: impl IntoIterator<Item = Event>) -> Self {
        self.add_events(events);
        self
    }

    // ========== Events ==========

    /// Append an event, widening the time bounds, merging participants and
    /// folding its importance into the running mean
    pub fn add_event(&mut self, event: Event) {
        self.start_time = Some(match self.start_time {
            Some(start) => start.min(event.timestamp),
            None => event.timestamp,
        });
        self.end_time = Some(match self.end_time {
            Some(end) => end.max(event.timestamp),
            None => event.timestamp,
        });
        self.participants.extend(event.participants.iter().cloned());

        self.events.push(event);
        let n = self.events.len() as f64;
        let latest = self.events.last().map_or(self.importance, |e| e.importance);
        self.importance = (self.importance * (n - 1.0) + latest) / n;

        self.updated_at = Timestamp::now();
    }

    pub fn add_events(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.add_event(event);
        }
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn events_between(&self, range: &TimeRange) -> Vec<&Event> {
        self.events.iter().filter(|e| e.occurred_between(range)).collect()
    }

    pub fn events_by_type(&self, event_type: EventType) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type == Some(event_type))
            .collect()
    }

    pub fn events_by_participant(&self, participant: &str) -> Vec<&Event> {
        self.events.iter().filter(|e| e.has_participant(participant)).collect()
    }

    pub fn events_by_tag(&self, tag: &str) -> Vec<&Event> {
        self.events.iter().filter(|e| e.has_tag(tag)).collect()
    }

    /// The `n` most important events; equal importance keeps insertion order
    pub fn top_events(&self, n: usize) -> Vec<&Event> {
        let mut ranked: Vec<&Event> = self.events.iter().collect();
        ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        ranked.truncate(n);
        ranked
    }

    /// Time between the first event and the end (or now, if still open)
    pub fn duration(&self) -> Duration {
        match self.start_time {
            Some(start) => self.end_time.unwrap_or_else(Timestamp::now) - start,
            None => Duration::zero(),
        }
    }

    // ========== Lifecycle ==========

    /// Mark the episode completed and close its time span at now
    pub fn complete(&mut self) {
        self.transition(EpisodeStatus::Completed);
        let now = self.updated_at;
        self.end_time = Some(self.end_time.map_or(now, |end| end.max(now)));
    }

    pub fn pause(&mut self) {
        self.transition(EpisodeStatus::Paused);
    }

    pub fn resume(&mut self) {
        self.transition(EpisodeStatus::Ongoing);
    }

    pub fn cancel(&mut self) {
        self.transition(EpisodeStatus::Cancelled);
    }

    fn transition(&mut self, next: EpisodeStatus) {
        if self.status != next && !self.status.can_transition_to(next) {
            warn!(
                "Episode {} moved from {} to {} outside the usual lifecycle",
                self.id, self.status, next
            );
        }
        self.status = next;
        self.updated_at = Timestamp::now();
    }

    /// Flag the episode as archived without removing it
    pub fn archive(&mut self) {
        let now = Timestamp::now();
        self.archived = true;
        self.archived_at = Some(now);
        self.updated_at = now;
    }

    // ========== Rendering ==========

    /// Build a plain-text summary from the episode's attributes and top
    /// events, storing it in `summary`
    pub fn generate_summary(&mut self) -> String {
        if self.events.is_empty() {
            return "Empty episode".to_string();
        }

        let heading = if !self.title.is_empty() {
            self.title.clone()
        } else {
            self.episode_type
                .map(|t| t.to_string())
                .unwrap_or_default()
        };
        let mut lines = vec![heading];
        if let Some(start) = self.start_time {
            lines.push(format!("Start: {}", start));
        }
        if let Some(end) = self.end_time {
            lines.push(format!("End: {}", end));
        }
        if !self.participants.is_empty() {
            lines.push(format!("Participants: {}", join(&self.participants)));
        }
        lines.push(format!("Events: {}", self.events.len()));

        let key_events: Vec<String> = self
            .top_events(3)
            .into_iter()
            .map(|e| format!("  - {}", e.short_description()))
            .collect();
        if !key_events.is_empty() {
            lines.push("Key events:".to_string());
            lines.extend(key_events);
        }

        let summary = lines.join("\n");
        self.summary = Some(summary.clone());
        summary
    }

    /// Narrate the episode: title, description, then each event in order
    pub fn to_natural_language(&self) -> String {
        let mut narrative = String::new();
        if !self.title.is_empty() {
            narrative.push_str(&self.title);
            narrative.push_str("\n\n");
        }
        if let Some(description) = &self.description {
            narrative.push_str(description);
            narrative.push_str("\n\n");
        }
        for (i, event) in self.events.iter().enumerate() {
            narrative.push_str(&format!("{}. {}", i + 1, event.content));
            if !event.participants.is_empty() {
                narrative.push_str(&format!(" ({})", join(&event.participants)));
            }
            narrative.push('\n');
        }
        narrative
    }

    // ========== Similarity ==========

    /// Similarity in `[0, 1]`: the unweighted mean of type equality, location
    /// equality, participant overlap, tag overlap and the mean pairwise
    /// similarity of the two event lists, counting only the factors for which
    /// both episodes carry data
    pub fn similarity_to(&self, other: &Episode) -> f64 {
        let type_score = match (self.episode_type, other.episode_type) {
            (Some(a), Some(b)) => Some(if a == b { 1.0 } else { 0.0 }),
            _ => None,
        };
        let location_score = match (&self.location, &other.location) {
            (Some(a), Some(b)) => Some(if a == b { 1.0 } else { 0.0 }),
            _ => None,
        };

        let event_score = if self.events.is_empty() || other.events.is_empty() {
            None
        } else {
            let total: f64 = self
                .events
                .iter()
                .flat_map(|a| other.events.iter().map(move |b| a.similarity_to(b)))
                .sum();
            Some(total / (self.events.len() * other.events.len()) as f64)
        };

        mean_of([
            type_score,
            location_score,
            jaccard(&self.participants, &other.participants),
            jaccard(&self.tags, &other.tags),
            event_score,
        ])
    }
}
