//! The knowledge-graph store capability

use crate::entity::Entity;
use crate::relation::Relation;
use crate::subgraph::{Path, SubGraph};
use engram_core::{EntityId, RelationId, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate figures over a graph store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub entity_count: usize,
    pub relation_count: usize,
    /// Number of entities per type
    pub entity_types: BTreeMap<String, usize>,
    /// Number of relations per predicate
    pub relation_types: BTreeMap<String, usize>,
    /// Mean number of relations touching an entity
    pub average_degree: f64,
    pub average_weight: f64,
}

/// Storage and query interface over entities and relations.
///
/// Operations whose subject is an id (update, delete, traversal origin,
/// relation endpoints) fail with a NotFound error when the id is absent.
/// Lookups by secondary key return an empty result for unknown keys. All
/// operations may be called concurrently on a shared instance.
pub trait GraphStore: Send + Sync {
    // ========== Entity Operations ==========

    /// Insert an entity, merging into an existing one with the same id
    fn add_entity(&self, entity: Entity) -> Result<EntityId>;

    fn add_entities(&self, entities: Vec<Entity>) -> Result<Vec<EntityId>> {
        entities.into_iter().map(|e| self.add_entity(e)).collect()
    }

    fn get_entity(&self, id: &EntityId) -> Result<Option<Entity>>;

    fn get_entity_by_name_and_type(&self, name: &str, entity_type: &str) -> Result<Option<Entity>> {
        self.get_entity(&EntityId::derive(entity_type, name))
    }

    /// Replace a stored entity
    fn update_entity(&self, entity: Entity) -> Result<()>;

    /// Remove an entity and every relation touching it
    fn delete_entity(&self, id: &EntityId) -> Result<Entity>;

    fn get_all_entities(&self) -> Result<Vec<Entity>>;

    fn get_entities_by_type(&self, entity_type: &str) -> Result<Vec<Entity>>;

    /// Case-insensitive substring match on entity names
    fn search_entities(&self, keyword: &str) -> Result<Vec<Entity>>;

    /// The `n` most important entities, ties broken by degree
    fn get_top_entities(&self, n: usize) -> Result<Vec<Entity>>;

    fn entity_count(&self) -> Result<usize>;

    /// Number of distinct relations touching `id`
    fn entity_degree(&self, id: &EntityId) -> Result<usize>;

    /// Recompute every entity's importance against the current time
    fn refresh_importance(&self) -> Result<usize>;

    // ========== Relation Operations ==========

    /// Insert a relation between two stored entities; an existing relation
    /// with the same id is overwritten
    fn add_relation(&self, relation: Relation) -> Result<RelationId>;

    fn add_relations(&self, relations: Vec<Relation>) -> Result<Vec<RelationId>> {
        relations.into_iter().map(|r| self.add_relation(r)).collect()
    }

    fn get_relation(&self, id: &RelationId) -> Result<Option<Relation>>;

    fn update_relation(&self, relation: Relation) -> Result<()>;

    fn delete_relation(&self, id: &RelationId) -> Result<Relation>;

    fn get_all_relations(&self) -> Result<Vec<Relation>>;

    /// Relations with `id` as either endpoint
    fn get_relations_by_entity(&self, id: &EntityId) -> Result<Vec<Relation>>;

    fn get_outgoing_relations(&self, id: &EntityId) -> Result<Vec<Relation>>;

    fn get_incoming_relations(&self, id: &EntityId) -> Result<Vec<Relation>>;

    fn get_relations_by_type(&self, relation_type: &str) -> Result<Vec<Relation>>;

    /// Relations connecting `a` and `b` in either direction
    fn get_relations_between(&self, a: &EntityId, b: &EntityId) -> Result<Vec<Relation>>;

    fn relation_count(&self) -> Result<usize>;

    // ========== Traversal ==========

    fn get_neighbors(&self, id: &EntityId, hops: usize) -> Result<Vec<Entity>>;

    fn get_sub_graph(&self, id: &EntityId, depth: usize) -> Result<SubGraph>;

    fn find_shortest_path(&self, source: &EntityId, target: &EntityId) -> Result<Path>;

    fn find_all_paths(&self, source: &EntityId, target: &EntityId, max_depth: usize) -> Result<Vec<Path>>;

    // ========== Maintenance ==========

    /// Decay every relation weight by `factor` per elapsed day; returns the
    /// number of relations changed
    fn apply_time_decay(&self, factor: f64) -> Result<usize>;

    /// Delete relations whose weight is below `threshold`; returns the number
    /// removed
    fn prune_weak_relations(&self, threshold: f64) -> Result<usize>;

    fn statistics(&self) -> Result<GraphStatistics>;

    fn clear(&self) -> Result<()>;
}
