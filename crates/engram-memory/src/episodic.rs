//! Episodic memory
//!
//! Groups each session's conversation turns into episodes. A session has at
//! most one active episode; it is closed when it goes idle for longer than
//! the configured timeout, reaches the event cap or spans more than the
//! configured duration, and a fresh one is opened on the next turn.

use crate::episode::{Episode, EpisodeStatus, EpisodeType};
use crate::event::{Event, EventType};
use crate::memory_store::InMemoryEpisodeStore;
use crate::store::EpisodeStore;
use crate::types::EpisodicMemoryConfig;
use engram_core::{EpisodeId, Error, Result, TimeRange, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Text returned by [`EpisodicMemory::load_context`] when there is no history
pub const NO_HISTORY: &str = "No relevant history";

/// Participant recorded on events created from user input
pub const HUMAN: &str = "Human";

/// Participant recorded on events created from model output
pub const AI: &str = "AI";

/// Per-session figures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStatistics {
    pub total_episodes: usize,
    pub total_events: usize,
    pub ongoing_episodes: usize,
    pub completed_episodes: usize,
}

/// True if `elapsed` is longer than `limit`
fn exceeds(elapsed: chrono::Duration, limit: Duration) -> bool {
    let limit = i64::try_from(limit.as_millis()).unwrap_or(i64::MAX);
    elapsed.num_milliseconds() > limit
}

/// Session-scoped memory of past experiences
pub struct EpisodicMemory {
    config: EpisodicMemoryConfig,
    store: Arc<dyn EpisodeStore>,
    /// Session id -> its ongoing episode
    active: RwLock<HashMap<String, EpisodeId>>,
}

impl EpisodicMemory {
    /// Create a memory over an existing store
    pub fn new(config: EpisodicMemoryConfig, store: Arc<dyn EpisodeStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            active: RwLock::new(HashMap::new()),
        })
    }

    /// Create with an empty in-memory store
    pub fn in_memory(config: EpisodicMemoryConfig) -> Result<Self> {
        Self::new(config, Arc::new(InMemoryEpisodeStore::new()))
    }

    pub fn config(&self) -> &EpisodicMemoryConfig {
        &self.config
    }

    /// Get the underlying store
    pub fn store(&self) -> &Arc<dyn EpisodeStore> {
        &self.store
    }

    fn active(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, EpisodeId>>> {
        self.active
            .write()
            .map_err(|_| Error::Internal("Failed to acquire active episodes lock".to_string()))
    }

    /// The session's ongoing episode, if any
    pub fn active_episode(&self, session_id: &str) -> Result<Option<Episode>> {
        let id = self.active()?.get(session_id).copied();
        match id {
            Some(id) => self.store.get_episode(&id),
            None => Ok(None),
        }
    }

    // ========== Recording ==========

    /// Record one conversation turn: the input as a question from
    /// [`HUMAN`] and the output as an answer from [`AI`]. Blank sides are
    /// skipped. Returns the episode the events went into.
    pub fn record_exchange(&self, session_id: &str, input: &str, output: &str) -> Result<Option<EpisodeId>> {
        let mut events = Vec::with_capacity(2);
        if !input.trim().is_empty() {
            events.push(Event::new(input).with_type(EventType::Question).with_participant(HUMAN));
        }
        if !output.trim().is_empty() {
            events.push(Event::new(output).with_type(EventType::Answer).with_participant(AI));
        }
        self.record_events(session_id, events)
    }

    /// Append one event to the session's active episode
    pub fn add_event(&self, session_id: &str, event: Event) -> Result<Option<EpisodeId>> {
        self.record_events(session_id, vec![event])
    }

    /// Append events to the session's active episode, opening one when
    /// automatic creation is enabled. The episode is closed afterwards if it
    /// hit the event or duration cap.
    ///
    /// Returns `None` when there was nothing to record or no episode to
    /// record into.
    pub fn record_events(&self, session_id: &str, events: Vec<Event>) -> Result<Option<EpisodeId>> {
        if events.is_empty() {
            return Ok(None);
        }

        let mut active = self.active()?;
        let Some(id) = self.active_or_create(&mut active, session_id)? else {
            warn!("Dropping {} events for session {}: no active episode", events.len(), session_id);
            return Ok(None);
        };

        for event in events {
            self.store.add_event(&id, event)?;
        }

        if let Some(episode) = self.store.get_episode(&id)? {
            if self.is_full(&episode) {
                self.finish(&mut active, session_id, episode)?;
            }
        }
        Ok(Some(id))
    }

    /// Open a new episode for the session, closing the current one
    pub fn start_episode(&self, session_id: &str, title: &str, episode_type: EpisodeType) -> Result<EpisodeId> {
        let mut active = self.active()?;
        if let Some(current) = self.current(&mut active, session_id)? {
            self.finish(&mut active, session_id, current)?;
        }
        self.open(&mut active, session_id, Episode::new(title).with_type(episode_type))
    }

    /// Close the session's active episode; returns it as stored
    pub fn complete_active(&self, session_id: &str) -> Result<Option<Episode>> {
        let mut active = self.active()?;
        match self.current(&mut active, session_id)? {
            Some(episode) => self.finish(&mut active, session_id, episode).map(Some),
            None => Ok(None),
        }
    }

    /// The session's active episode as stored; stale entries whose episode
    /// was deleted behind our back are dropped
    fn current(&self, active: &mut HashMap<String, EpisodeId>, session_id: &str) -> Result<Option<Episode>> {
        let Some(id) = active.get(session_id).copied() else {
            return Ok(None);
        };
        let episode = self.store.get_episode(&id)?;
        if episode.is_none() {
            active.remove(session_id);
        }
        Ok(episode)
    }

    fn active_or_create(
        &self,
        active: &mut HashMap<String, EpisodeId>,
        session_id: &str,
    ) -> Result<Option<EpisodeId>> {
        if let Some(episode) = self.current(active, session_id)? {
            let idle = Timestamp::now() - episode.updated_at;
            if !exceeds(idle, self.config.episode_timeout) {
                return Ok(Some(episode.id));
            }
            debug!("Episode {} of session {} timed out", episode.id, session_id);
            self.finish(active, session_id, episode)?;
        }

        if !self.config.auto_create_episodes {
            return Ok(None);
        }
        let title = format!("Conversation episode {}", Timestamp::now());
        let id = self.open(active, session_id, Episode::new(title).with_type(EpisodeType::Conversation))?;
        Ok(Some(id))
    }

    fn open(&self, active: &mut HashMap<String, EpisodeId>, session_id: &str, episode: Episode) -> Result<EpisodeId> {
        let id = self.store.add_episode(episode.with_session(session_id))?;
        active.insert(session_id.to_string(), id);
        debug!("Opened episode {} for session {}", id, session_id);
        Ok(id)
    }

    fn is_full(&self, episode: &Episode) -> bool {
        episode.event_count() >= self.config.max_events_per_episode
            || exceeds(episode.duration(), self.config.max_episode_duration)
    }

    /// Complete and summarize an episode, then detach it from the session
    fn finish(
        &self,
        active: &mut HashMap<String, EpisodeId>,
        session_id: &str,
        mut episode: Episode,
    ) -> Result<Episode> {
        episode.complete();
        if episode.summary.is_none() {
            episode.generate_summary();
        }
        self.store.update_episode(episode.clone())?;
        active.remove(session_id);

        debug!(
            "Completed episode {} with {} events",
            episode.id,
            episode.event_count()
        );
        Ok(episode)
    }

    // ========== Recall ==========

    /// The session's most recent episodes that meet the importance
    /// threshold, newest first
    pub fn recent_important_episodes(&self, session_id: &str, limit: usize) -> Result<Vec<Episode>> {
        let mut episodes: Vec<Episode> = self
            .store
            .get_episodes_by_session(session_id)?
            .into_iter()
            .filter(|e| e.importance >= self.config.importance_threshold)
            .collect();
        episodes.sort_by(|a, b| {
            let a_time = a.start_time.unwrap_or(a.created_at);
            let b_time = b.start_time.unwrap_or(b.created_at);
            b_time.cmp(&a_time)
        });
        episodes.truncate(limit);
        Ok(episodes)
    }

    /// Render the session's recent important episodes as prompt text, each
    /// with its summary or, failing that, its key events
    pub fn load_context(&self, session_id: &str) -> Result<String> {
        let episodes = self.recent_important_episodes(session_id, self.config.max_episodes_in_context)?;
        if episodes.is_empty() {
            return Ok(NO_HISTORY.to_string());
        }

        let mut context = String::from("=== Relevant episodes ===\n\n");
        for (i, episode) in episodes.iter().enumerate() {
            let title = if episode.title.is_empty() { "Untitled episode" } else { episode.title.as_str() };
            context.push_str(&format!("[Episode {}] {}\n", i + 1, title));

            if let Some(summary) = &episode.summary {
                context.push_str(summary);
                context.push('\n');
            } else {
                let key_events = episode.top_events(3);
                if !key_events.is_empty() {
                    context.push_str("Key events:\n");
                    for event in key_events {
                        context.push_str(&format!("  - {}\n", event.short_description()));
                    }
                }
            }
            context.push('\n');
        }
        Ok(context)
    }

    // ========== Session Queries ==========

    pub fn session_episodes_in(&self, session_id: &str, range: &TimeRange) -> Result<Vec<Episode>> {
        Ok(self
            .store
            .get_episodes_in(range)?
            .into_iter()
            .filter(|e| e.session_id.as_deref() == Some(session_id))
            .collect())
    }

    pub fn today_episodes(&self, session_id: &str) -> Result<Vec<Episode>> {
        self.session_episodes_in(session_id, &TimeRange::today())
    }

    pub fn this_week_episodes(&self, session_id: &str) -> Result<Vec<Episode>> {
        self.session_episodes_in(session_id, &TimeRange::this_week())
    }

    /// Keyword search restricted to one session
    pub fn search_episodes(&self, session_id: &str, keyword: &str) -> Result<Vec<Episode>> {
        Ok(self
            .store
            .search_episodes(keyword)?
            .into_iter()
            .filter(|e| e.session_id.as_deref() == Some(session_id))
            .collect())
    }

    pub fn session_statistics(&self, session_id: &str) -> Result<SessionStatistics> {
        let episodes = self.store.get_episodes_by_session(session_id)?;
        Ok(SessionStatistics {
            total_episodes: episodes.len(),
            total_events: episodes.iter().map(Episode::event_count).sum(),
            ongoing_episodes: episodes.iter().filter(|e| e.status == EpisodeStatus::Ongoing).count(),
            completed_episodes: episodes
                .iter()
                .filter(|e| e.status == EpisodeStatus::Completed)
                .count(),
        })
    }

    // ========== Maintenance ==========

    /// Close the session's active episode and delete all of its episodes;
    /// returns the number deleted
    pub fn clear_session(&self, session_id: &str) -> Result<usize> {
        let mut active = self.active()?;
        if let Some(current) = self.current(&mut active, session_id)? {
            self.finish(&mut active, session_id, current)?;
        }
        self.store.clear_session(session_id)
    }

    /// Delete every episode of every session
    pub fn clear(&self) -> Result<()> {
        let mut active = self.active()?;
        self.store.clear()?;
        active.clear();
        info!("Cleared episodic memory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> EpisodicMemory {
        EpisodicMemory::in_memory(EpisodicMemoryConfig::default()).unwrap()
    }

    #[test]
    fn test_exchange_creates_conversation_episode() {
        let memory = memory();
        let id = memory
            .record_exchange("s1", "What is Rust?", "A systems language.")
            .unwrap()
            .unwrap();

        let episode = memory.store().get_episode(&id).unwrap().unwrap();
        assert_eq!(episode.episode_type, Some(EpisodeType::Conversation));
        assert_eq!(episode.session_id.as_deref(), Some("s1"));
        assert!(episode.title.starts_with("Conversation episode "));
        assert_eq!(episode.event_count(), 2);
        assert_eq!(episode.events[0].event_type, Some(EventType::Question));
        assert!(episode.events[0].has_participant(HUMAN));
        assert_eq!(episode.events[1].event_type, Some(EventType::Answer));
        assert!(episode.events[1].has_participant(AI));
    }

    #[test]
    fn test_turns_share_active_episode() {
        let memory = memory();
        let first = memory.record_exchange("s1", "hi", "hello").unwrap();
        let second = memory.record_exchange("s1", "again", "").unwrap();
        let other = memory.record_exchange("s2", "hi", "hello").unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(memory.active_episode("s1").unwrap().unwrap().event_count(), 3);
        assert_eq!(memory.record_exchange("s1", " ", "").unwrap(), None);
    }

    #[test]
    fn test_event_cap_completes_episode() {
        let memory = EpisodicMemory::in_memory(EpisodicMemoryConfig::new().max_events_per_episode(4)).unwrap();
        let first = memory.record_exchange("s1", "q1", "a1").unwrap().unwrap();
        memory.record_exchange("s1", "q2", "a2").unwrap();

        let closed = memory.store().get_episode(&first).unwrap().unwrap();
        assert_eq!(closed.status, EpisodeStatus::Completed);
        assert!(closed.summary.is_some());
        assert!(memory.active_episode("s1").unwrap().is_none());

        let next = memory.record_exchange("s1", "q3", "a3").unwrap().unwrap();
        assert_ne!(first, next);
    }

    #[test]
    fn test_timeout_rolls_over() {
        let memory = EpisodicMemory::in_memory(EpisodicMemoryConfig::new().episode_timeout(Duration::ZERO)).unwrap();
        let first = memory.record_exchange("s1", "q1", "a1").unwrap().unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let second = memory.record_exchange("s1", "q2", "a2").unwrap().unwrap();

        assert_ne!(first, second);
        let old = memory.store().get_episode(&first).unwrap().unwrap();
        assert_eq!(old.status, EpisodeStatus::Completed);
    }

    #[test]
    fn test_no_auto_create() {
        let memory = EpisodicMemory::in_memory(EpisodicMemoryConfig::new().no_auto_create()).unwrap();
        assert_eq!(memory.record_exchange("s1", "hi", "hello").unwrap(), None);
        assert_eq!(memory.store().episode_count().unwrap(), 0);

        let id = memory.start_episode("s1", "Planning", EpisodeType::Task).unwrap();
        assert_eq!(memory.add_event("s1", Event::new("Wrote the plan")).unwrap(), Some(id));
    }

    #[test]
    fn test_start_episode_closes_current() {
        let memory = memory();
        let first = memory.record_exchange("s1", "hi", "hello").unwrap().unwrap();
        let second = memory.start_episode("s1", "Debugging", EpisodeType::ProblemSolving).unwrap();

        assert_ne!(first, second);
        assert_eq!(
            memory.store().get_episode(&first).unwrap().unwrap().status,
            EpisodeStatus::Completed
        );
        assert_eq!(memory.active_episode("s1").unwrap().unwrap().title, "Debugging");
    }

    #[test]
    fn test_complete_active() {
        let memory = memory();
        assert!(memory.complete_active("s1").unwrap().is_none());

        memory.record_exchange("s1", "hi", "hello").unwrap();
        let done = memory.complete_active("s1").unwrap().unwrap();
        assert_eq!(done.status, EpisodeStatus::Completed);
        assert!(done.summary.as_deref().is_some_and(|s| s.contains("Events: 2")));
    }

    #[test]
    fn test_load_context() {
        let memory = memory();
        assert_eq!(memory.load_context("s1").unwrap(), NO_HISTORY);

        memory.record_exchange("s1", "What is Rust?", "A language").unwrap();
        let ongoing = memory.load_context("s1").unwrap();
        assert!(ongoing.starts_with("=== Relevant episodes ===\n\n[Episode 1] Conversation episode"));
        assert!(ongoing.contains("Key events:\n  - [QUESTION] What is Rust?"));

        memory.complete_active("s1").unwrap();
        let completed = memory.load_context("s1").unwrap();
        assert!(completed.contains("Events: 2"));
        assert_eq!(memory.load_context("s2").unwrap(), NO_HISTORY);
    }

    #[test]
    fn test_load_context_respects_threshold_and_limit() {
        let config = EpisodicMemoryConfig::new()
            .importance_threshold(0.6)
            .max_episodes_in_context(1);
        let memory = EpisodicMemory::in_memory(config).unwrap();

        // Default event importance is 0.5
        memory.record_exchange("s1", "hi", "hello").unwrap();
        assert_eq!(memory.load_context("s1").unwrap(), NO_HISTORY);

        memory.start_episode("s1", "first", EpisodeType::Task).unwrap();
        memory.add_event("s1", Event::new("a").with_importance(0.9)).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        memory.start_episode("s1", "second", EpisodeType::Task).unwrap();
        memory.add_event("s1", Event::new("b").with_importance(0.9)).unwrap();

        let context = memory.load_context("s1").unwrap();
        assert!(context.contains("[Episode 1] second"));
        assert!(!context.contains("first"));
    }

    #[test]
    fn test_session_queries() {
        let memory = memory();
        memory.record_exchange("s1", "Tell me about borrowing", "Sure").unwrap();
        memory.record_exchange("s2", "Tell me about borrowing", "Sure").unwrap();

        assert_eq!(memory.search_episodes("s1", "borrowing").unwrap().len(), 1);
        assert_eq!(memory.session_episodes_in("s1", &TimeRange::all()).unwrap().len(), 1);

        let stats = memory.session_statistics("s1").unwrap();
        assert_eq!(stats.total_episodes, 1);
        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.ongoing_episodes, 1);
        assert_eq!(stats.completed_episodes, 0);
    }

    #[test]
    fn test_clear_session() {
        let memory = memory();
        memory.record_exchange("s1", "hi", "hello").unwrap();
        memory.record_exchange("s2", "hi", "hello").unwrap();

        assert_eq!(memory.clear_session("s1").unwrap(), 1);
        assert!(memory.active_episode("s1").unwrap().is_none());
        assert_eq!(memory.store().episode_count().unwrap(), 1);

        memory.clear().unwrap();
        assert_eq!(memory.store().episode_count().unwrap(), 0);
        assert!(memory.active_episode("s2").unwrap().is_none());
    }

    #[test]
    fn test_deleted_active_episode_is_replaced() {
        let memory = memory();
        let first = memory.record_exchange("s1", "hi", "hello").unwrap().unwrap();
        memory.store().delete_episode(&first).unwrap();

        let second = memory.record_exchange("s1", "again", "").unwrap().unwrap();
        assert_ne!(first, second);
    }
}
