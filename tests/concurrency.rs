//! Stores shared between threads keep their indices consistent

use engram::{
    Entity, EntityId, Episode, EpisodeStatus, EpisodeStore, EpisodeType, EpisodicMemory,
    EpisodicMemoryConfig, Event, GraphStore, InMemoryEpisodeStore, InMemoryGraphStore, Relation,
};
use std::thread;

const THREADS: usize = 8;
const ROUNDS: usize = 50;

#[test]
fn test_concurrent_graph_mutation() {
    let store = InMemoryGraphStore::new();
    let hub = store.add_entity(Entity::new("hub", "Node")).unwrap();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let store = &store;
            let hub = &hub;
            scope.spawn(move || {
                for i in 0..ROUNDS {
                    let id = store
                        .add_entity(Entity::new(format!("n{}-{}", t, i), "Node"))
                        .unwrap();
                    store.add_relation(Relation::new(hub, "links", &id)).unwrap();
                    if i % 3 == 0 {
                        store.delete_entity(&id).unwrap();
                    }
                    // Readers run alongside the writers
                    store.get_neighbors(hub, 1).unwrap();
                }
            });
        }
    });

    let expected = THREADS * (ROUNDS - ROUNDS.div_ceil(3));
    assert_eq!(store.entity_count().unwrap(), expected + 1);
    assert_eq!(store.relation_count().unwrap(), expected);
    assert_eq!(store.entity_degree(&hub).unwrap(), expected);

    for relation in store.get_all_relations().unwrap() {
        assert!(store.get_entity(&relation.target).unwrap().is_some());
    }
    let by_type = store.get_entities_by_type("Node").unwrap();
    assert_eq!(by_type.len(), expected + 1);
}

#[test]
fn test_concurrent_merges_sum_references() {
    let store = InMemoryGraphStore::new();

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let store = &store;
            scope.spawn(move || {
                for _ in 0..ROUNDS {
                    store.add_entity(Entity::new("Alice", "Person")).unwrap();
                }
            });
        }
    });

    let alice = store.get_entity(&EntityId::derive("Person", "Alice")).unwrap().unwrap();
    assert_eq!(alice.reference_count, (THREADS * ROUNDS) as u64);
    assert_eq!(store.entity_count().unwrap(), 1);
}

#[test]
fn test_concurrent_events_into_one_episode() {
    let store = InMemoryEpisodeStore::new();
    let id = store.add_episode(Episode::new("shared")).unwrap();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let store = &store;
            let id = &id;
            scope.spawn(move || {
                for i in 0..ROUNDS {
                    let event = Event::new(format!("{}-{}", t, i)).with_participant(format!("p{}", t));
                    store.add_event(id, event).unwrap();
                    store.get_episodes_by_participant("p0").unwrap();
                }
            });
        }
    });

    let episode = store.get_episode(&id).unwrap().unwrap();
    assert_eq!(episode.event_count(), THREADS * ROUNDS);
    assert_eq!(episode.participants.len(), THREADS);
    for t in 0..THREADS {
        assert_eq!(store.get_episodes_by_participant(&format!("p{}", t)).unwrap().len(), 1);
    }
}

#[test]
fn test_statistics_are_one_snapshot() {
    let store = InMemoryEpisodeStore::new();
    let anchor = store
        .add_episode(
            Episode::new("anchor")
                .with_type(EpisodeType::Learning)
                .with_events([Event::new("What is ownership?").with_participant("Human")]),
        )
        .unwrap();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let store = &store;
            let anchor = &anchor;
            scope.spawn(move || {
                for i in 0..ROUNDS {
                    if t % 2 == 0 {
                        let episode = Episode::new(format!("{}-{}", t, i))
                            .with_type(EpisodeType::Learning)
                            .with_events([Event::new("What is borrowing?").with_participant("Human")]);
                        let id = store.add_episode(episode).unwrap();
                        if i % 2 == 0 {
                            store.archive_episode(&id).unwrap();
                        } else {
                            store.delete_episode(&id).unwrap();
                        }
                    } else {
                        let stats = store.statistics().unwrap();
                        assert_eq!(stats.count_by_type.values().sum::<usize>(), stats.episode_count);
                        assert_eq!(stats.count_by_status.values().sum::<usize>(), stats.episode_count);
                        assert_eq!(stats.total_event_count, stats.episode_count);
                        assert!(stats.archived_count < stats.episode_count);

                        for similar in store.find_similar_to(anchor, 3).unwrap() {
                            assert_ne!(&similar.id, anchor);
                        }
                    }
                }
            });
        }
    });

    let archived = (THREADS / 2) * ROUNDS.div_ceil(2);
    let stats = store.statistics().unwrap();
    assert_eq!(stats.episode_count, archived + 1);
    assert_eq!(stats.archived_count, archived);
}

#[test]
fn test_concurrent_sessions() {
    let memory = EpisodicMemory::in_memory(EpisodicMemoryConfig::new().max_events_per_episode(10)).unwrap();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let memory = &memory;
            scope.spawn(move || {
                // Two threads per session
                let session = format!("s{}", t % (THREADS / 2));
                for i in 0..ROUNDS {
                    memory
                        .record_exchange(&session, &format!("q{}", i), &format!("a{}", i))
                        .unwrap();
                }
            });
        }
    });

    for s in 0..THREADS / 2 {
        let session = format!("s{}", s);
        let episodes = memory.store().get_episodes_by_session(&session).unwrap();
        let events: usize = episodes.iter().map(Episode::event_count).sum();
        assert_eq!(events, 2 * 2 * ROUNDS);

        let ongoing = episodes
            .iter()
            .filter(|e| e.status == EpisodeStatus::Ongoing)
            .count();
        assert!(ongoing <= 1);
        assert!(episodes.iter().all(|e| e.event_count() <= 10));
    }
}
