//! Engram Episodic Memory
//!
//! Time-ordered events grouped into episodes, an indexed episode store, and
//! the conversation-facing memories built on top of both stores.
//!
//! # Overview
//!
//! - `Event` / `Episode`: the temporal value model with similarity scoring
//! - `EpisodeStore`: CRUD, time and attribute queries, similarity search and
//!   maintenance sweeps, with an in-memory implementation
//! - `KnowledgeGraphMemory`: extracts knowledge from conversation turns into
//!   a graph and renders it back as context
//! - `EpisodicMemory`: groups each session's turns into episodes

pub mod conversation;
pub mod criteria;
pub mod episode;
pub mod episodic;
pub mod event;
pub mod knowledge;
pub mod memory_store;
pub mod store;
pub mod types;

pub use conversation::ConversationMemory;
pub use criteria::EpisodeSearchCriteria;
pub use episode::{Episode, EpisodeStatus, EpisodeType};
pub use episodic::{EpisodicMemory, SessionStatistics};
pub use event::{Event, EventType};
pub use knowledge::KnowledgeGraphMemory;
pub use memory_store::InMemoryEpisodeStore;
pub use store::{EpisodeStatistics, EpisodeStore};
pub use types::{EpisodicMemoryConfig, GraphMemoryConfig};
