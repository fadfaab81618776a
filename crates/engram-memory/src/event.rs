//! Events: atomic, timestamped occurrences inside an episode

use engram_core::{EventId, Properties, PropertyValue, TimeRange, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Default importance of an event
pub const DEFAULT_EVENT_IMPORTANCE: f64 = 0.5;

const SHORT_DESCRIPTION_LIMIT: usize = 50;

/// Kind of event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Conversation,
    Question,
    Answer,
    Action,
    Decision,
    Observation,
    Reflection,
    Error,
    Success,
    Other,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Conversation => "CONVERSATION",
            EventType::Question => "QUESTION",
            EventType::Answer => "ANSWER",
            EventType::Action => "ACTION",
            EventType::Decision => "DECISION",
            EventType::Observation => "OBSERVATION",
            EventType::Reflection => "REFLECTION",
            EventType::Error => "ERROR",
            EventType::Success => "SUCCESS",
            EventType::Other => "OTHER",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Jaccard index of two sets, or `None` when either is empty
pub(crate) fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    Some(intersection as f64 / union as f64)
}

/// Mean of the factors that were present, zero if none were
pub(crate) fn mean_of(factors: impl IntoIterator<Item = Option<f64>>) -> f64 {
    let (sum, count) = factors
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), score| (sum + score, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// An atomic occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub content: String,
    pub event_type: Option<EventType>,
    /// When the event happened
    pub timestamp: Timestamp,
    pub location: Option<String>,
    pub participants: BTreeSet<String>,
    pub emotion: Option<String>,
    /// Relevance in `[0, 1]`
    pub importance: f64,
    pub tags: BTreeSet<String>,
    pub properties: Properties,
    pub created_at: Timestamp,
}

impl Event {
    /// Create an event happening now
    pub fn new(content: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: EventId::new(),
            content: content.into(),
            event_type: None,
            timestamp: now,
            location: None,
            participants: BTreeSet::new(),
            emotion: None,
            importance: DEFAULT_EVENT_IMPORTANCE,
            tags: BTreeSet::new(),
            properties: Properties::new(),
            created_at: now,
        }
    }

    /// Builder: set the event type
    pub fn with_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    /// Builder: set when the event happened
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_participant(mut self, participant: impl Into<String>) -> Self {
        self.participants.insert(participant.into());
        self
    }

    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = Some(emotion.into());
        self
    }

    /// Builder: set importance, clamped to `[0, 1]`
    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = if importance.is_nan() {
            DEFAULT_EVENT_IMPORTANCE
        } else {
            importance.clamp(0.0, 1.0)
        };
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.set(key, value);
        self
    }

    /// One-line description: `[TYPE] content`, truncated to 50 characters
    pub fn short_description(&self) -> String {
        let content = if self.content.chars().count() > SHORT_DESCRIPTION_LIMIT {
            let head: String = self.content.chars().take(SHORT_DESCRIPTION_LIMIT - 3).collect();
            format!("{}...", head)
        } else {
            self.content.clone()
        };

        match self.event_type {
            Some(event_type) => format!("[{}] {}", event_type, content),
            None => content,
        }
    }

    /// Multi-line description listing every populated attribute
    pub fn detailed_description(&self) -> String {
        let mut lines = vec![
            format!("Event: {}", self.content),
            format!(
                "Type: {}",
                self.event_type.map_or("UNKNOWN", |t| t.as_str())
            ),
            format!("Time: {}", self.timestamp),
        ];
        if let Some(location) = self.location.as_deref().filter(|l| !l.is_empty()) {
            lines.push(format!("Location: {}", location));
        }
        if !self.participants.is_empty() {
            lines.push(format!("Participants: {}", join(&self.participants)));
        }
        if let Some(emotion) = self.emotion.as_deref().filter(|e| !e.is_empty()) {
            lines.push(format!("Emotion: {}", emotion));
        }
        lines.push(format!("Importance: {:.2}", self.importance));
        if !self.tags.is_empty() {
            lines.push(format!("Tags: {}", join(&self.tags)));
        }
        lines.join("\n")
    }

    /// True if the event happened inside `range`
    pub fn occurred_between(&self, range: &TimeRange) -> bool {
        range.contains(self.timestamp)
    }

    pub fn has_participant(&self, participant: &str) -> bool {
        self.participants.contains(participant)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Similarity in `[0, 1]`: the mean of type equality, location equality,
    /// participant overlap and tag overlap, counting only the factors for
    /// which both events carry data
    pub fn similarity_to(&self, other: &Event) -> f64 {
        let type_score = match (self.event_type, other.event_type) {
            (Some(a), Some(b)) => Some(if a == b { 1.0 } else { 0.0 }),
            _ => None,
        };
        let location_score = match (&self.location, &other.location) {
            (Some(a), Some(b)) => Some(if a == b { 1.0 } else { 0.0 }),
            _ => None,
        };

        mean_of([
            type_score,
            location_score,
            jaccard(&self.participants, &other.participants),
            jaccard(&self.tags, &other.tags),
        ])
    }
}

pub(crate) fn join(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = Event::new("Asked about Rust")
            .with_type(EventType::Question)
            .with_participant("Human")
            .with_tag("rust")
            .with_importance(1.4);

        assert_eq!(event.importance, 1.0);
        assert!(event.has_participant("Human"));
        assert!(event.has_tag("rust"));
        assert!(!event.has_tag("go"));
        assert_eq!(Event::new("x").importance, DEFAULT_EVENT_IMPORTANCE);
    }

    #[test]
    fn test_short_description() {
        let short = Event::new("hello").with_type(EventType::Answer);
        assert_eq!(short.short_description(), "[ANSWER] hello");

        let long = Event::new("x".repeat(60));
        let desc = long.short_description();
        assert_eq!(desc.chars().count(), 50);
        assert!(desc.ends_with("..."));

        let exact = Event::new("y".repeat(50));
        assert_eq!(exact.short_description(), "y".repeat(50));
    }

    #[test]
    fn test_detailed_description() {
        let event = Event::new("Deployed")
            .with_type(EventType::Action)
            .with_location("office")
            .with_participant("Bob")
            .with_participant("Alice");

        let desc = event.detailed_description();
        assert!(desc.starts_with("Event: Deployed\nType: ACTION"));
        assert!(desc.contains("Location: office"));
        assert!(desc.contains("Participants: Alice, Bob"));
        assert!(desc.contains("Importance: 0.50"));
    }

    #[test]
    fn test_occurred_between_is_half_open() {
        let event = Event::new("tick").at(Timestamp::from_millis(100));
        let inside = TimeRange::new(Timestamp::from_millis(100), Timestamp::from_millis(200)).unwrap();
        let before = TimeRange::new(Timestamp::from_millis(0), Timestamp::from_millis(100)).unwrap();

        assert!(event.occurred_between(&inside));
        assert!(!event.occurred_between(&before));
    }

    #[test]
    fn test_similarity() {
        let a = Event::new("a")
            .with_type(EventType::Question)
            .with_participant("Human")
            .with_participant("AI");
        let b = Event::new("b")
            .with_type(EventType::Question)
            .with_participant("Human");

        // type = 1.0, participants = 1/2
        assert!((a.similarity_to(&b) - 0.75).abs() < 1e-9);
        assert!((a.similarity_to(&b) - b.similarity_to(&a)).abs() < 1e-12);

        // No shared data at all
        assert_eq!(Event::new("x").similarity_to(&Event::new("y")), 0.0);
    }

    #[test]
    fn test_jaccard() {
        let a: BTreeSet<String> = ["x", "y"].iter().map(|s| s.to_string()).collect();
        let b: BTreeSet<String> = ["y", "z"].iter().map(|s| s.to_string()).collect();
        assert_eq!(jaccard(&a, &b), Some(1.0 / 3.0));
        assert_eq!(jaccard(&a, &BTreeSet::new()), None);
    }
}
