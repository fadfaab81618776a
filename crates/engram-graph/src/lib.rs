//! Engram Knowledge Graph
//!
//! Entities (nodes) and weighted, decaying relations (edges) kept in flat
//! tables keyed by id. Adjacency lives in an index from entity id to relation
//! ids, so no record ever embeds a reference to another record.
//!
//! # Overview
//!
//! The graph crate provides:
//! - The `Entity` / `Relation` value model with importance and decay rules
//! - The `GraphStore` capability trait and its in-memory implementation
//! - Traversal algorithms (bounded BFS, shortest path, all simple paths)
//! - The `KnowledgeExtractor` seam through which extracted batches arrive

pub mod entity;
pub mod extractor;
pub mod memory_store;
pub mod relation;
pub mod store;
pub mod subgraph;
pub mod traversal;

pub use entity::Entity;
pub use extractor::{ExtractionResult, IngestReport, KnowledgeExtractor, MockKnowledgeExtractor, ingest};
pub use memory_store::InMemoryGraphStore;
pub use relation::Relation;
pub use store::{GraphStatistics, GraphStore};
pub use subgraph::{Path, PathElement, SubGraph};
pub use traversal::GraphView;
