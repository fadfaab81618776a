//! Engram Core Library
//!
//! This crate provides the fundamental types, identifiers and error handling
//! shared by the knowledge-graph and episodic stores.
//!
//! # Overview
//!
//! Engram is an associative long-term memory substrate for agents. It keeps
//! a knowledge graph of entities and weighted relations next to an episodic
//! store of time-ordered events, both as indexed in-memory data layers.
//!
//! # Modules
//!
//! - `error` - Error types and result aliases
//! - `id` - Deterministic and random identifiers
//! - `property` - Tagged-union property bags
//! - `temporal` - Timestamps, half-open ranges and calendar boundaries

pub mod error;
pub mod id;
pub mod property;
pub mod temporal;

pub use error::{Error, Result};
pub use id::{EntityId, EpisodeId, EventId, RelationId, normalize_name};
pub use property::{Properties, PropertyValue};
pub use temporal::{DayKey, TimeRange, Timestamp};
