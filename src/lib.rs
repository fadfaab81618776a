//! Engram - associative long-term memory for AI agents
//!
//! This is the main library crate that re-exports all Engram components.

pub use engram_core as core;
pub use engram_graph as graph;
pub use engram_memory as memory;

// Re-export commonly used types
pub use engram_core::{
    EntityId, EpisodeId, Error, EventId, Properties, PropertyValue, RelationId, Result, TimeRange,
    Timestamp,
};

pub use engram_graph::{
    Entity, ExtractionResult, GraphStore, InMemoryGraphStore, KnowledgeExtractor, Path,
    PathElement, Relation, SubGraph,
};
pub use engram_memory::{
    ConversationMemory, Episode, EpisodeSearchCriteria, EpisodeStatus, EpisodeStore, EpisodeType,
    EpisodicMemory, EpisodicMemoryConfig, Event, EventType, GraphMemoryConfig,
    InMemoryEpisodeStore, KnowledgeGraphMemory,
};
