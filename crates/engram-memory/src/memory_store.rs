//! In-memory episode store
//!
//! Episodes live in one primary table; the session, type, status,
//! participant, location, tag and day-bucket indices sit beside it in
//! [`EpisodeTables`] behind a single lock. Every mutation removes the old
//! index entries and writes the new ones under the same write guard as the
//! primary table.

use crate::criteria::{EpisodeSearchCriteria, matches_keyword};
use crate::episode::{Episode, EpisodeStatus, EpisodeType};
use crate::event::Event;
use crate::store::{EpisodeStatistics, EpisodeStore};
use chrono::Utc;
use engram_core::{DayKey, EpisodeId, Error, Result, TimeRange, Timestamp};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct EpisodeTables {
    episodes: HashMap<EpisodeId, Episode>,
    by_session: HashMap<String, BTreeSet<EpisodeId>>,
    by_type: HashMap<EpisodeType, BTreeSet<EpisodeId>>,
    by_status: HashMap<EpisodeStatus, BTreeSet<EpisodeId>>,
    by_participant: HashMap<String, BTreeSet<EpisodeId>>,
    by_location: HashMap<String, BTreeSet<EpisodeId>>,
    by_tag: HashMap<String, BTreeSet<EpisodeId>>,
    /// UTC day of the start time -> episodes
    by_day: BTreeMap<DayKey, BTreeSet<EpisodeId>>,
}

fn day_of(ts: Timestamp) -> DayKey {
    DayKey::of(ts, &Utc)
}

fn add_to<K: Hash + Eq>(index: &mut HashMap<K, BTreeSet<EpisodeId>>, key: K, id: EpisodeId) {
    index.entry(key).or_default().insert(id);
}

fn remove_from<K: Hash + Eq>(index: &mut HashMap<K, BTreeSet<EpisodeId>>, key: &K, id: &EpisodeId) {
    if let Some(bucket) = index.get_mut(key) {
        bucket.remove(id);
        if bucket.is_empty() {
            index.remove(key);
        }
    }
}

impl EpisodeTables {
    fn index(&mut self, episode: &Episode) {
        let id = episode.id;
        if let Some(session) = &episode.session_id {
            add_to(&mut self.by_session, session.clone(), id);
        }
        if let Some(episode_type) = episode.episode_type {
            add_to(&mut self.by_type, episode_type, id);
        }
        add_to(&mut self.by_status, episode.status, id);
        for participant in &episode.participants {
            add_to(&mut self.by_participant, participant.clone(), id);
        }
        if let Some(location) = &episode.location {
            add_to(&mut self.by_location, location.clone(), id);
        }
        for tag in &episode.tags {
            add_to(&mut self.by_tag, tag.clone(), id);
        }
        if let Some(start) = episode.start_time {
            self.by_day.entry(day_of(start)).or_default().insert(id);
        }
    }

    fn unindex(&mut self, episode: &Episode) {
        let id = &episode.id;
        if let Some(session) = &episode.session_id {
            remove_from(&mut self.by_session, session, id);
        }
        if let Some(episode_type) = &episode.episode_type {
            remove_from(&mut self.by_type, episode_type, id);
        }
        remove_from(&mut self.by_status, &episode.status, id);
        for participant in &episode.participants {
            remove_from(&mut self.by_participant, participant, id);
        }
        if let Some(location) = &episode.location {
            remove_from(&mut self.by_location, location, id);
        }
        for tag in &episode.tags {
            remove_from(&mut self.by_tag, tag, id);
        }
        if let Some(start) = episode.start_time {
            let day = day_of(start);
            if let Some(bucket) = self.by_day.get_mut(&day) {
                bucket.remove(id);
                if bucket.is_empty() {
                    self.by_day.remove(&day);
                }
            }
        }
    }

    /// Insert or replace; returns true when an episode was replaced
    fn insert(&mut self, episode: Episode) -> bool {
        let replaced = self.remove(&episode.id).is_some();
        self.index(&episode);
        self.episodes.insert(episode.id, episode);
        replaced
    }

    fn remove(&mut self, id: &EpisodeId) -> Option<Episode> {
        let episode = self.episodes.remove(id)?;
        self.unindex(&episode);
        Some(episode)
    }

    /// Apply `change` to a stored episode and re-index it
    fn modify<T>(&mut self, id: &EpisodeId, change: impl FnOnce(&mut Episode) -> T) -> Result<T> {
        let mut episode = self
            .remove(id)
            .ok_or_else(|| Error::EpisodeNotFound(id.to_string()))?;
        let outcome = change(&mut episode);
        self.insert(episode);
        Ok(outcome)
    }

    fn lookup<K, Q>(&self, index: &HashMap<K, BTreeSet<EpisodeId>>, key: &Q) -> Vec<Episode>
    where
        K: Hash + Eq + std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        index
            .get(key)
            .map(|ids| ids.iter().filter_map(|id| self.episodes.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    fn count_by_type(&self) -> BTreeMap<EpisodeType, usize> {
        EpisodeType::ALL
            .iter()
            .map(|t| (*t, self.by_type.get(t).map_or(0, BTreeSet::len)))
            .collect()
    }

    fn count_by_status(&self) -> BTreeMap<EpisodeStatus, usize> {
        EpisodeStatus::ALL
            .iter()
            .map(|s| (*s, self.by_status.get(s).map_or(0, BTreeSet::len)))
            .collect()
    }

    /// The `n` stored episodes most similar to `episode`, excluding itself
    /// and anything with a zero score
    fn most_similar(&self, episode: &Episode, n: usize) -> Vec<Episode> {
        let mut scored: Vec<(f64, &Episode)> = self
            .episodes
            .values()
            .filter(|other| other.id != episode.id)
            .map(|other| (episode.similarity_to(other), other))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|(a_score, a), (b_score, b)| {
            b_score.total_cmp(a_score).then_with(|| a.id.cmp(&b.id))
        });
        scored.into_iter().take(n).map(|(_, e)| e.clone()).collect()
    }

    fn remove_where(&mut self, predicate: impl Fn(&Episode) -> bool) -> usize {
        let doomed: Vec<EpisodeId> = self
            .episodes
            .values()
            .filter(|e| predicate(e))
            .map(|e| e.id)
            .collect();
        for id in &doomed {
            self.remove(id);
        }
        doomed.len()
    }
}

/// Instant used for recency ordering: the start time, or creation time for
/// episodes without events
fn recency(episode: &Episode) -> Timestamp {
    episode.start_time.unwrap_or(episode.created_at)
}

fn chronological(mut episodes: Vec<Episode>) -> Vec<Episode> {
    episodes.sort_by(|a, b| recency(a).cmp(&recency(b)).then_with(|| a.id.cmp(&b.id)));
    episodes
}

fn by_importance_desc(episodes: &mut [Episode]) {
    episodes.sort_by(|a, b| b.importance.total_cmp(&a.importance).then_with(|| a.id.cmp(&b.id)));
}

fn check_threshold(threshold: f64) -> Result<()> {
    if threshold.is_nan() || threshold < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "importance threshold must be non-negative, got {}",
            threshold
        )));
    }
    Ok(())
}

/// Reference [`EpisodeStore`] kept entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryEpisodeStore {
    tables: RwLock<EpisodeTables>,
}

impl InMemoryEpisodeStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, EpisodeTables>> {
        self.tables
            .read()
            .map_err(|_| Error::Internal("Failed to acquire episodes lock".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, EpisodeTables>> {
        self.tables
            .write()
            .map_err(|_| Error::Internal("Failed to acquire episodes lock".to_string()))
    }
}

impl EpisodeStore for InMemoryEpisodeStore {
    // ========== CRUD ==========

    fn add_episode(&self, episode: Episode) -> Result<EpisodeId> {
        let id = episode.id;
        let mut tables = self.write()?;
        if tables.insert(episode) {
            debug!("Replaced episode {}", id);
        } else {
            debug!("Stored episode {}", id);
        }
        Ok(id)
    }

    fn add_episodes(&self, episodes: Vec<Episode>) -> Result<Vec<EpisodeId>> {
        let mut tables = self.write()?;
        let ids = episodes
            .into_iter()
            .map(|episode| {
                let id = episode.id;
                tables.insert(episode);
                id
            })
            .collect::<Vec<_>>();
        debug!("Stored {} episodes", ids.len());
        Ok(ids)
    }

    fn add_event(&self, id: &EpisodeId, event: Event) -> Result<()> {
        let mut tables = self.write()?;
        let count = tables.modify(id, |episode| {
            episode.add_event(event);
            episode.event_count()
        })?;
        debug!("Added event to episode {} ({} events)", id, count);
        Ok(())
    }

    fn get_episode(&self, id: &EpisodeId) -> Result<Option<Episode>> {
        Ok(self.read()?.episodes.get(id).cloned())
    }

    fn update_episode(&self, episode: Episode) -> Result<()> {
        let id = episode.id;
        let mut tables = self.write()?;
        if !tables.episodes.contains_key(&id) {
            return Err(Error::EpisodeNotFound(id.to_string()));
        }
        tables.insert(episode);
        debug!("Updated episode {}", id);
        Ok(())
    }

    fn delete_episode(&self, id: &EpisodeId) -> Result<Episode> {
        let mut tables = self.write()?;
        let episode = tables
            .remove(id)
            .ok_or_else(|| Error::EpisodeNotFound(id.to_string()))?;
        debug!("Deleted episode {}", id);
        Ok(episode)
    }

    fn get_all_episodes(&self) -> Result<Vec<Episode>> {
        let tables = self.read()?;
        Ok(chronological(tables.episodes.values().cloned().collect()))
    }

    fn get_episodes_by_session(&self, session_id: &str) -> Result<Vec<Episode>> {
        let tables = self.read()?;
        Ok(chronological(tables.lookup(&tables.by_session, session_id)))
    }

    // ========== Time Queries ==========

    fn get_episodes_in(&self, range: &TimeRange) -> Result<Vec<Episode>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let tables = self.read()?;
        let found = tables
            .by_day
            .range(day_of(range.start)..=day_of(range.end))
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| tables.episodes.get(id))
            .filter(|e| e.start_time.is_some_and(|start| range.contains(start)))
            .cloned()
            .collect();
        Ok(chronological(found))
    }

    fn get_recent_episodes(&self, n: usize) -> Result<Vec<Episode>> {
        let mut episodes = self.get_all_episodes()?;
        episodes.reverse();
        episodes.truncate(n);
        Ok(episodes)
    }

    // ========== Attribute Queries ==========

    fn get_episodes_by_type(&self, episode_type: EpisodeType) -> Result<Vec<Episode>> {
        let tables = self.read()?;
        Ok(tables.lookup(&tables.by_type, &episode_type))
    }

    fn get_episodes_by_status(&self, status: EpisodeStatus) -> Result<Vec<Episode>> {
        let tables = self.read()?;
        Ok(tables.lookup(&tables.by_status, &status))
    }

    fn get_episodes_by_participant(&self, participant: &str) -> Result<Vec<Episode>> {
        let tables = self.read()?;
        Ok(tables.lookup(&tables.by_participant, participant))
    }

    fn get_episodes_by_location(&self, location: &str) -> Result<Vec<Episode>> {
        let tables = self.read()?;
        Ok(tables.lookup(&tables.by_location, location))
    }

    fn get_episodes_by_tag(&self, tag: &str) -> Result<Vec<Episode>> {
        let tables = self.read()?;
        Ok(tables.lookup(&tables.by_tag, tag))
    }

    // ========== Importance & Similarity ==========

    fn get_top_episodes(&self, n: usize) -> Result<Vec<Episode>> {
        let mut episodes: Vec<Episode> = self.read()?.episodes.values().cloned().collect();
        by_importance_desc(&mut episodes);
        episodes.truncate(n);
        Ok(episodes)
    }

    fn get_episodes_by_importance(&self, threshold: f64) -> Result<Vec<Episode>> {
        check_threshold(threshold)?;
        let mut episodes: Vec<Episode> = self
            .read()?
            .episodes
            .values()
            .filter(|e| e.importance >= threshold)
            .cloned()
            .collect();
        by_importance_desc(&mut episodes);
        Ok(episodes)
    }

    fn find_similar_episodes(&self, episode: &Episode, n: usize) -> Result<Vec<Episode>> {
        Ok(self.read()?.most_similar(episode, n))
    }

    fn find_similar_to(&self, id: &EpisodeId, n: usize) -> Result<Vec<Episode>> {
        let tables = self.read()?;
        let episode = tables
            .episodes
            .get(id)
            .ok_or_else(|| Error::EpisodeNotFound(id.to_string()))?;
        Ok(tables.most_similar(episode, n))
    }

    // ========== Search ==========

    fn search_episodes(&self, keyword: &str) -> Result<Vec<Episode>> {
        let needle = keyword.to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let tables = self.read()?;
        let found = tables
            .episodes
            .values()
            .filter(|e| matches_keyword(e, &needle))
            .cloned()
            .collect();
        Ok(chronological(found))
    }

    fn search(&self, criteria: &EpisodeSearchCriteria) -> Result<Vec<Episode>> {
        let tables = self.read()?;
        let mut found = chronological(
            tables
                .episodes
                .values()
                .filter(|e| criteria.matches(e))
                .cloned()
                .collect(),
        );
        if let Some(limit) = criteria.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    // ========== Statistics ==========

    fn episode_count(&self) -> Result<usize> {
        Ok(self.read()?.episodes.len())
    }

    fn total_event_count(&self) -> Result<usize> {
        Ok(self.read()?.episodes.values().map(Episode::event_count).sum())
    }

    fn count_by_type(&self) -> Result<BTreeMap<EpisodeType, usize>> {
        Ok(self.read()?.count_by_type())
    }

    fn count_by_status(&self) -> Result<BTreeMap<EpisodeStatus, usize>> {
        Ok(self.read()?.count_by_status())
    }

    fn statistics(&self) -> Result<EpisodeStatistics> {
        let tables = self.read()?;
        let count_by_type = tables.count_by_type();
        let count_by_status = tables.count_by_status();
        let episode_count = tables.episodes.len();
        let total_event_count: usize = tables.episodes.values().map(Episode::event_count).sum();
        let archived_count = tables.episodes.values().filter(|e| e.archived).count();

        let (average_events_per_episode, average_importance) = if episode_count == 0 {
            (0.0, 0.0)
        } else {
            let importance: f64 = tables.episodes.values().map(|e| e.importance).sum();
            (
                total_event_count as f64 / episode_count as f64,
                importance / episode_count as f64,
            )
        };

        Ok(EpisodeStatistics {
            episode_count,
            total_event_count,
            count_by_type,
            count_by_status,
            archived_count,
            average_events_per_episode,
            average_importance,
        })
    }

    // ========== Maintenance ==========

    fn clear(&self) -> Result<()> {
        let mut tables = self.write()?;
        *tables = EpisodeTables::default();
        info!("Cleared episode store");
        Ok(())
    }

    fn clear_session(&self, session_id: &str) -> Result<usize> {
        let mut tables = self.write()?;
        let ids: Vec<EpisodeId> = tables
            .by_session
            .get(session_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        for id in &ids {
            tables.remove(id);
        }
        info!("Cleared {} episodes of session {}", ids.len(), session_id);
        Ok(ids.len())
    }

    fn delete_episodes_before(&self, time: Timestamp) -> Result<usize> {
        let mut tables = self.write()?;
        let removed = tables.remove_where(|e| e.start_time.is_some_and(|start| start < time));
        if removed > 0 {
            info!("Deleted {} episodes that started before {}", removed, time);
        }
        Ok(removed)
    }

    fn delete_low_importance_episodes(&self, threshold: f64) -> Result<usize> {
        check_threshold(threshold)?;
        let mut tables = self.write()?;
        let removed = tables.remove_where(|e| e.importance < threshold);
        if removed > 0 {
            info!("Deleted {} episodes below importance {}", removed, threshold);
        }
        Ok(removed)
    }

    fn archive_episode(&self, id: &EpisodeId) -> Result<()> {
        let mut tables = self.write()?;
        tables.modify(id, Episode::archive)?;
        debug!("Archived episode {}", id);
        Ok(())
    }

    fn archive_episodes_before(&self, time: Timestamp) -> Result<usize> {
        let mut tables = self.write()?;
        let targets: Vec<EpisodeId> = tables
            .episodes
            .values()
            .filter(|e| !e.archived && e.start_time.is_some_and(|start| start < time))
            .map(|e| e.id)
            .collect();
        for id in &targets {
            tables.modify(id, Episode::archive)?;
        }
        if !targets.is_empty() {
            info!("Archived {} episodes that started before {}", targets.len(), time);
        }
        Ok(targets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    const DAY: i64 = 24 * 60 * 60 * 1000;

    fn at(millis: i64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn episode_at(title: &str, millis: i64) -> Episode {
        Episode::new(title).with_events([Event::new(title).at(at(millis))])
    }

    #[test]
    fn test_crud() {
        let store = InMemoryEpisodeStore::new();
        let episode = Episode::new("first").with_session("s1");
        let id = store.add_episode(episode.clone()).unwrap();

        assert_eq!(store.get_episode(&id).unwrap(), Some(episode));
        assert_eq!(store.episode_count().unwrap(), 1);

        let mut updated = store.get_episode(&id).unwrap().unwrap();
        updated.title = "renamed".to_string();
        store.update_episode(updated).unwrap();
        assert_eq!(store.get_episode(&id).unwrap().unwrap().title, "renamed");

        let removed = store.delete_episode(&id).unwrap();
        assert_eq!(removed.title, "renamed");
        assert!(store.get_episode(&id).unwrap().is_none());
        assert!(store.get_episodes_by_session("s1").unwrap().is_empty());
    }

    #[test]
    fn test_missing_ids_are_not_found() {
        let store = InMemoryEpisodeStore::new();
        let ghost = EpisodeId::new();

        assert!(store.delete_episode(&ghost).unwrap_err().is_not_found());
        assert!(store.update_episode(Episode::new("x")).unwrap_err().is_not_found());
        assert!(store.archive_episode(&ghost).unwrap_err().is_not_found());
        assert!(store.add_event(&ghost, Event::new("e")).unwrap_err().is_not_found());
        assert!(store.find_similar_to(&ghost, 3).unwrap_err().is_not_found());
    }

    #[test]
    fn test_add_event_reindexes() {
        let store = InMemoryEpisodeStore::new();
        let id = store.add_episode(Episode::new("chat")).unwrap();

        assert!(store.get_episodes_between(at(0), at(DAY)).unwrap().is_empty());

        store
            .add_event(&id, Event::new("hi").with_participant("Human").at(at(1_000)))
            .unwrap();

        assert_eq!(store.get_episodes_by_participant("Human").unwrap().len(), 1);
        assert_eq!(store.get_episodes_between(at(0), at(DAY)).unwrap().len(), 1);
        assert_eq!(store.total_event_count().unwrap(), 1);
    }

    #[test]
    fn test_update_moves_index_entries() {
        let store = InMemoryEpisodeStore::new();
        let id = store
            .add_episode(Episode::new("trip").with_location("Paris").with_tag("travel"))
            .unwrap();

        let mut episode = store.get_episode(&id).unwrap().unwrap();
        episode.location = Some("Rome".to_string());
        episode.tags.clear();
        episode.complete();
        store.update_episode(episode).unwrap();

        assert!(store.get_episodes_by_location("Paris").unwrap().is_empty());
        assert_eq!(store.get_episodes_by_location("Rome").unwrap().len(), 1);
        assert!(store.get_episodes_by_tag("travel").unwrap().is_empty());
        assert!(store.get_ongoing_episodes().unwrap().is_empty());
        assert_eq!(store.get_completed_episodes().unwrap().len(), 1);
    }

    #[test]
    fn test_time_range_queries() {
        let store = InMemoryEpisodeStore::new();
        store
            .add_episodes(vec![
                episode_at("day0", 0),
                episode_at("day1", DAY),
                episode_at("day1-late", 2 * DAY - 1),
                episode_at("day5", 5 * DAY),
            ])
            .unwrap();

        let titles = |eps: Vec<Episode>| eps.into_iter().map(|e| e.title).collect::<Vec<_>>();

        assert_eq!(
            titles(store.get_episodes_between(at(DAY), at(2 * DAY)).unwrap()),
            vec!["day1", "day1-late"]
        );
        // Half-open: the end bound is excluded
        assert_eq!(
            titles(store.get_episodes_between(at(0), at(DAY)).unwrap()),
            vec!["day0"]
        );
        assert_eq!(store.get_episodes_in(&TimeRange::all()).unwrap().len(), 4);
        assert!(store.get_episodes_between(at(DAY), at(DAY)).unwrap().is_empty());

        let err = store.get_episodes_between(at(2 * DAY), at(DAY)).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_this_month_excludes_old_episodes() {
        let store = InMemoryEpisodeStore::new();
        store.add_episode(episode_at("now", Timestamp::now().as_millis())).unwrap();
        store.add_episode(episode_at("ancient", 0)).unwrap();

        let titles: Vec<_> = store
            .get_this_month_episodes()
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert!(!titles.contains(&"ancient".to_string()));
    }

    #[test]
    fn test_recent_and_top() {
        let store = InMemoryEpisodeStore::new();
        store.add_episode(episode_at("old", 0).with_importance(0.9)).unwrap();
        store.add_episode(episode_at("mid", DAY).with_importance(0.2)).unwrap();
        store.add_episode(episode_at("new", 2 * DAY).with_importance(0.6)).unwrap();

        let recent: Vec<_> = store
            .get_recent_episodes(2)
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(recent, vec!["new", "mid"]);

        let top = store.get_top_episodes(1).unwrap();
        assert_eq!(top[0].title, "old");

        let important = store.get_episodes_by_importance(0.5).unwrap();
        assert_eq!(important.len(), 2);
        assert!(important[0].importance >= important[1].importance);

        assert!(store.get_episodes_by_importance(-1.0).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_find_similar() {
        let store = InMemoryEpisodeStore::new();
        let probe = Episode::new("probe")
            .with_type(EpisodeType::Learning)
            .with_tag("rust");
        let close = Episode::new("close")
            .with_type(EpisodeType::Learning)
            .with_tag("rust");
        let partial = Episode::new("partial")
            .with_type(EpisodeType::Learning)
            .with_tag("go");
        let unrelated = Episode::new("unrelated").with_type(EpisodeType::Task);

        let probe_id = store.add_episode(probe.clone()).unwrap();
        store.add_episodes(vec![close, partial, unrelated]).unwrap();

        let similar = store.find_similar_episodes(&probe, 10).unwrap();
        let titles: Vec<_> = similar.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["close", "partial"]);

        let top_one = store.find_similar_to(&probe_id, 1).unwrap();
        assert_eq!(top_one.len(), 1);
        assert_eq!(top_one[0].title, "close");
    }

    #[test]
    fn test_search() {
        let store = InMemoryEpisodeStore::new();
        store
            .add_episode(
                Episode::new("Rust meetup")
                    .with_type(EpisodeType::SocialInteraction)
                    .with_events([Event::new("Talked about ownership")
                        .with_type(EventType::Conversation)
                        .at(at(DAY))]),
            )
            .unwrap();
        store
            .add_episode(Episode::new("Groceries").with_type(EpisodeType::Task))
            .unwrap();

        assert_eq!(store.search_episodes("OWNERSHIP").unwrap().len(), 1);
        assert!(store.search_episodes("").unwrap().is_empty());

        let criteria = EpisodeSearchCriteria::new()
            .episode_type(EpisodeType::Task)
            .archived(false);
        assert_eq!(store.search(&criteria).unwrap().len(), 1);

        let limited = EpisodeSearchCriteria::new().limit(1);
        assert_eq!(store.search(&limited).unwrap().len(), 1);
    }

    #[test]
    fn test_counts_and_statistics() {
        let store = InMemoryEpisodeStore::new();
        store
            .add_episode(episode_at("a", 0).with_type(EpisodeType::Task))
            .unwrap();
        let mut done = Episode::new("b").with_type(EpisodeType::Task);
        done.complete();
        store.add_episode(done).unwrap();

        let by_type = store.count_by_type().unwrap();
        assert_eq!(by_type[&EpisodeType::Task], 2);
        assert_eq!(by_type[&EpisodeType::Learning], 0);
        assert_eq!(store.count_by_status().unwrap()[&EpisodeStatus::Completed], 1);

        let stats = store.statistics().unwrap();
        assert_eq!(stats.episode_count, 2);
        assert_eq!(stats.total_event_count, 1);
        assert!((stats.average_events_per_episode - 0.5).abs() < 1e-9);
        assert!((stats.average_importance - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_maintenance() {
        let store = InMemoryEpisodeStore::new();
        store.add_episode(episode_at("old", 0).with_session("s")).unwrap();
        store.add_episode(episode_at("older", 10).with_importance(0.1)).unwrap();
        store.add_episode(episode_at("new", 10 * DAY).with_session("s")).unwrap();

        assert_eq!(store.archive_episodes_before(at(DAY)).unwrap(), 2);
        assert_eq!(store.archive_episodes_before(at(DAY)).unwrap(), 0);
        let archived = EpisodeSearchCriteria::new().archived(true);
        assert_eq!(store.search(&archived).unwrap().len(), 2);

        assert_eq!(store.delete_low_importance_episodes(0.2).unwrap(), 1);
        assert_eq!(store.delete_episodes_before(at(DAY)).unwrap(), 1);
        assert_eq!(store.episode_count().unwrap(), 1);

        assert_eq!(store.clear_session("s").unwrap(), 1);
        assert_eq!(store.clear_session("s").unwrap(), 0);
        assert_eq!(store.episode_count().unwrap(), 0);
        assert!(store.get_episodes_in(&TimeRange::all()).unwrap().is_empty());
    }

    #[test]
    fn test_clear() {
        let store = InMemoryEpisodeStore::new();
        store.add_episode(episode_at("x", 0).with_tag("t")).unwrap();
        store.clear().unwrap();
        assert_eq!(store.episode_count().unwrap(), 0);
        assert!(store.get_episodes_by_tag("t").unwrap().is_empty());
    }
}
