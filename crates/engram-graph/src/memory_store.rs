//! In-memory graph store
//!
//! Entities and relations live in flat tables keyed by id. Adjacency and the
//! type indices are kept next to them in one [`GraphTables`] value behind a
//! single lock, and every mutation goes through a `GraphTables` method that
//! updates the primary table and all indices before the guard is released.
//! Readers therefore never see a record without its index entries, and a
//! cascading delete is observed all at once.

use crate::entity::Entity;
use crate::relation::Relation;
use crate::store::{GraphStatistics, GraphStore};
use crate::subgraph::{Path, SubGraph};
use crate::traversal::{self, GraphView};
use engram_core::{EntityId, Error, RelationId, Result, Timestamp};
use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct GraphTables {
    entities: HashMap<EntityId, Entity>,
    relations: HashMap<RelationId, Relation>,
    /// entity -> relations touching it (as source or target)
    adjacency: HashMap<EntityId, BTreeSet<RelationId>>,
    entities_by_type: HashMap<String, BTreeSet<EntityId>>,
    relations_by_type: HashMap<String, BTreeSet<RelationId>>,
}

impl GraphTables {
    fn insert_entity(&mut self, entity: Entity) -> EntityId {
        let id = entity.id.clone();
        if let Some(existing) = self.entities.get_mut(&id) {
            existing.merge(entity);
            debug!("Merged entity {} (references: {})", id, existing.reference_count);
            return id;
        }

        self.entities_by_type
            .entry(entity.entity_type.clone())
            .or_default()
            .insert(id.clone());
        self.entities.insert(id.clone(), entity);
        debug!("Created entity {}", id);
        id
    }

    fn replace_entity(&mut self, entity: Entity) -> Result<()> {
        let id = entity.id.clone();
        let previous = self
            .entities
            .get(&id)
            .ok_or_else(|| Error::EntityNotFound(id.to_string()))?;

        if previous.entity_type != entity.entity_type {
            let old_type = previous.entity_type.clone();
            remove_from_index(&mut self.entities_by_type, &old_type, &id);
            self.entities_by_type
                .entry(entity.entity_type.clone())
                .or_default()
                .insert(id.clone());
        }
        self.entities.insert(id, entity);
        Ok(())
    }

    /// Remove an entity and cascade to its relations; returns the entity and
    /// the number of relations removed
    fn remove_entity(&mut self, id: &EntityId) -> Result<(Entity, usize)> {
        let entity = self
            .entities
            .remove(id)
            .ok_or_else(|| Error::EntityNotFound(id.to_string()))?;
        remove_from_index(&mut self.entities_by_type, &entity.entity_type, id);

        let incident = self.adjacency.remove(id).unwrap_or_default();
        let removed = incident.len();
        for rel_id in incident {
            self.remove_relation(&rel_id);
        }

        Ok((entity, removed))
    }

    fn check_endpoints(&self, relation: &Relation) -> Result<()> {
        for endpoint in [&relation.source, &relation.target] {
            if !self.entities.contains_key(endpoint) {
                return Err(Error::EntityNotFound(endpoint.to_string()));
            }
        }
        Ok(())
    }

    /// Insert (or overwrite) a relation whose endpoints are known to exist
    fn insert_relation(&mut self, relation: Relation) -> RelationId {
        let id = relation.id.clone();
        let overwritten = self.remove_relation(&id).is_some();

        let endpoints: Vec<EntityId> = if relation.is_loop() {
            vec![relation.source.clone()]
        } else {
            vec![relation.source.clone(), relation.target.clone()]
        };
        for endpoint in endpoints {
            if let Some(entity) = self.entities.get_mut(&endpoint) {
                entity.increment_references(1);
            }
        }

        self.index_relation(&relation);
        self.relations.insert(id.clone(), relation);

        if overwritten {
            debug!("Overwrote relation {}", id);
        } else {
            debug!("Created relation {}", id);
        }
        id
    }

    fn index_relation(&mut self, relation: &Relation) {
        for endpoint in [&relation.source, &relation.target] {
            self.adjacency
                .entry(endpoint.clone())
                .or_default()
                .insert(relation.id.clone());
        }
        self.relations_by_type
            .entry(relation.relation_type.clone())
            .or_default()
            .insert(relation.id.clone());
    }

    fn remove_relation(&mut self, id: &RelationId) -> Option<Relation> {
        let relation = self.relations.remove(id)?;
        for endpoint in [&relation.source, &relation.target] {
            remove_from_index(&mut self.adjacency, endpoint, id);
        }
        remove_from_index(&mut self.relations_by_type, &relation.relation_type, id);
        Some(relation)
    }

    fn degree(&self, id: &EntityId) -> usize {
        self.adjacency.get(id).map_or(0, BTreeSet::len)
    }

    fn collect_entities<'a>(&self, ids: impl IntoIterator<Item = &'a EntityId>) -> Vec<Entity> {
        ids.into_iter()
            .filter_map(|id| self.entities.get(id).cloned())
            .collect()
    }

    fn collect_relations<'a>(&self, ids: impl IntoIterator<Item = &'a RelationId>) -> Vec<Relation> {
        ids.into_iter()
            .filter_map(|id| self.relations.get(id).cloned())
            .collect()
    }
}

impl GraphView for GraphTables {
    fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    fn relation(&self, id: &RelationId) -> Option<&Relation> {
        self.relations.get(id)
    }

    fn incident_relations(&self, id: &EntityId) -> Vec<&Relation> {
        self.adjacency
            .get(id)
            .map(|ids| ids.iter().filter_map(|rid| self.relations.get(rid)).collect())
            .unwrap_or_default()
    }
}

/// Drop `value` from the bucket at `key`, removing the bucket once empty
fn remove_from_index<K, V>(index: &mut HashMap<K, BTreeSet<V>>, key: &K, value: &V)
where
    K: std::hash::Hash + Eq,
    V: Ord,
{
    if let Some(bucket) = index.get_mut(key) {
        bucket.remove(value);
        if bucket.is_empty() {
            index.remove(key);
        }
    }
}

/// Reference [`GraphStore`] kept entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    tables: RwLock<GraphTables>,
}

impl InMemoryGraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, GraphTables>> {
        self.tables
            .read()
            .map_err(|_| Error::Internal("Failed to acquire graph lock".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, GraphTables>> {
        self.tables
            .write()
            .map_err(|_| Error::Internal("Failed to acquire graph lock".to_string()))
    }
}

impl GraphStore for InMemoryGraphStore {
    // ========== Entity Operations ==========

    fn add_entity(&self, entity: Entity) -> Result<EntityId> {
        entity.validate()?;
        let mut tables = self.write()?;
        Ok(tables.insert_entity(entity))
    }

    fn add_entities(&self, entities: Vec<Entity>) -> Result<Vec<EntityId>> {
        for entity in &entities {
            entity.validate()?;
        }
        let mut tables = self.write()?;
        Ok(entities
            .into_iter()
            .map(|e| tables.insert_entity(e))
            .collect())
    }

    fn get_entity(&self, id: &EntityId) -> Result<Option<Entity>> {
        let tables = self.read()?;
        Ok(tables.entities.get(id).cloned())
    }

    fn update_entity(&self, entity: Entity) -> Result<()> {
        entity.validate()?;
        let id = entity.id.clone();
        let mut tables = self.write()?;
        tables.replace_entity(entity)?;
        debug!("Updated entity {}", id);
        Ok(())
    }

    fn delete_entity(&self, id: &EntityId) -> Result<Entity> {
        let mut tables = self.write()?;
        let (entity, removed) = tables.remove_entity(id)?;
        debug!("Deleted entity {} and {} relations", id, removed);
        Ok(entity)
    }

    fn get_all_entities(&self) -> Result<Vec<Entity>> {
        let tables = self.read()?;
        let mut entities: Vec<Entity> = tables.entities.values().cloned().collect();
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entities)
    }

    fn get_entities_by_type(&self, entity_type: &str) -> Result<Vec<Entity>> {
        let tables = self.read()?;
        Ok(tables
            .entities_by_type
            .get(entity_type)
            .map(|ids| tables.collect_entities(ids))
            .unwrap_or_default())
    }

    fn search_entities(&self, keyword: &str) -> Result<Vec<Entity>> {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let tables = self.read()?;
        let mut found: Vec<Entity> = tables
            .entities
            .values()
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    fn get_top_entities(&self, n: usize) -> Result<Vec<Entity>> {
        let tables = self.read()?;
        let mut ranked: Vec<(&Entity, usize)> = tables
            .entities
            .values()
            .map(|e| (e, tables.degree(&e.id)))
            .collect();
        ranked.sort_by(|(a, a_degree), (b, b_degree)| {
            b.importance
                .total_cmp(&a.importance)
                .then_with(|| b_degree.cmp(a_degree))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(ranked.into_iter().take(n).map(|(e, _)| e.clone()).collect())
    }

    fn entity_count(&self) -> Result<usize> {
        Ok(self.read()?.entities.len())
    }

    fn entity_degree(&self, id: &EntityId) -> Result<usize> {
        let tables = self.read()?;
        if !tables.entities.contains_key(id) {
            return Err(Error::EntityNotFound(id.to_string()));
        }
        Ok(tables.degree(id))
    }

    fn refresh_importance(&self) -> Result<usize> {
        let mut tables = self.write()?;
        let now = Timestamp::now();
        for entity in tables.entities.values_mut() {
            entity.refresh_importance(now);
        }
        Ok(tables.entities.len())
    }

    // ========== Relation Operations ==========

    fn add_relation(&self, relation: Relation) -> Result<RelationId> {
        relation.validate()?;
        let mut tables = self.write()?;
        tables.check_endpoints(&relation)?;
        Ok(tables.insert_relation(relation))
    }

    fn add_relations(&self, relations: Vec<Relation>) -> Result<Vec<RelationId>> {
        let mut tables = self.write()?;
        // Validate the whole batch before touching anything
        for relation in &relations {
            relation.validate()?;
            tables.check_endpoints(relation)?;
        }
        Ok(relations
            .into_iter()
            .map(|r| tables.insert_relation(r))
            .collect())
    }

    fn get_relation(&self, id: &RelationId) -> Result<Option<Relation>> {
        let tables = self.read()?;
        Ok(tables.relations.get(id).cloned())
    }

    fn update_relation(&self, relation: Relation) -> Result<()> {
        relation.validate()?;
        let id = relation.id.clone();
        let mut tables = self.write()?;
        if !tables.relations.contains_key(&id) {
            return Err(Error::RelationNotFound(id.to_string()));
        }
        tables.check_endpoints(&relation)?;

        tables.remove_relation(&id);
        tables.index_relation(&relation);
        tables.relations.insert(id.clone(), relation);
        debug!("Updated relation {}", id);
        Ok(())
    }

    fn delete_relation(&self, id: &RelationId) -> Result<Relation> {
        let mut tables = self.write()?;
        let relation = tables
            .remove_relation(id)
            .ok_or_else(|| Error::RelationNotFound(id.to_string()))?;
        debug!("Deleted relation {}", id);
        Ok(relation)
    }

    fn get_all_relations(&self) -> Result<Vec<Relation>> {
        let tables = self.read()?;
        let mut relations: Vec<Relation> = tables.relations.values().cloned().collect();
        relations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(relations)
    }

    fn get_relations_by_entity(&self, id: &EntityId) -> Result<Vec<Relation>> {
        let tables = self.read()?;
        Ok(tables
            .adjacency
            .get(id)
            .map(|ids| tables.collect_relations(ids))
            .unwrap_or_default())
    }

    fn get_outgoing_relations(&self, id: &EntityId) -> Result<Vec<Relation>> {
        let tables = self.read()?;
        Ok(tables
            .outgoing_relations(id)
            .into_iter()
            .cloned()
            .collect())
    }

    fn get_incoming_relations(&self, id: &EntityId) -> Result<Vec<Relation>> {
        let tables = self.read()?;
        Ok(tables
            .incident_relations(id)
            .into_iter()
            .filter(|r| &r.target == id)
            .cloned()
            .collect())
    }

    fn get_relations_by_type(&self, relation_type: &str) -> Result<Vec<Relation>> {
        let tables = self.read()?;
        Ok(tables
            .relations_by_type
            .get(relation_type)
            .map(|ids| tables.collect_relations(ids))
            .unwrap_or_default())
    }

    fn get_relations_between(&self, a: &EntityId, b: &EntityId) -> Result<Vec<Relation>> {
        let tables = self.read()?;
        Ok(tables
            .incident_relations(a)
            .into_iter()
            .filter(|r| r.other_end(a) == Some(b))
            .cloned()
            .collect())
    }

    fn relation_count(&self) -> Result<usize> {
        Ok(self.read()?.relations.len())
    }

    // ========== Traversal ==========

    fn get_neighbors(&self, id: &EntityId, hops: usize) -> Result<Vec<Entity>> {
        let tables = self.read()?;
        traversal::neighbors(&*tables, id, hops)
    }

    fn get_sub_graph(&self, id: &EntityId, depth: usize) -> Result<SubGraph> {
        let tables = self.read()?;
        traversal::subgraph(&*tables, id, depth)
    }

    fn find_shortest_path(&self, source: &EntityId, target: &EntityId) -> Result<Path> {
        let tables = self.read()?;
        traversal::shortest_path(&*tables, source, target)
    }

    fn find_all_paths(&self, source: &EntityId, target: &EntityId, max_depth: usize) -> Result<Vec<Path>> {
        let tables = self.read()?;
        traversal::all_paths(&*tables, source, target, max_depth)
    }

    // ========== Maintenance ==========

    fn apply_time_decay(&self, factor: f64) -> Result<usize> {
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(Error::InvalidArgument(format!(
                "decay factor must be in (0, 1], got {}",
                factor
            )));
        }

        let mut tables = self.write()?;
        let now = Timestamp::now();
        let decayed = tables
            .relations
            .values_mut()
            .map(|r| r.apply_time_decay(factor, now))
            .filter(|changed| *changed)
            .count();

        info!("Applied time decay {} to {} relations", factor, decayed);
        Ok(decayed)
    }

    fn prune_weak_relations(&self, threshold: f64) -> Result<usize> {
        if threshold.is_nan() || threshold < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "prune threshold must be non-negative, got {}",
                threshold
            )));
        }

        let mut tables = self.write()?;
        let weak: Vec<RelationId> = tables
            .relations
            .values()
            .filter(|r| r.weight < threshold)
            .map(|r| r.id.clone())
            .collect();
        for id in &weak {
            tables.remove_relation(id);
        }

        if !weak.is_empty() {
            info!("Pruned {} relations below weight {}", weak.len(), threshold);
        }
        Ok(weak.len())
    }

    fn statistics(&self) -> Result<GraphStatistics> {
        let tables = self.read()?;
        let entity_count = tables.entities.len();
        let relation_count = tables.relations.len();

        let mut stats = GraphStatistics {
            entity_count,
            relation_count,
            ..Default::default()
        };
        for (entity_type, ids) in &tables.entities_by_type {
            stats.entity_types.insert(entity_type.clone(), ids.len());
        }
        for (relation_type, ids) in &tables.relations_by_type {
            stats.relation_types.insert(relation_type.clone(), ids.len());
        }
        if entity_count > 0 {
            let total_degree: usize = tables.adjacency.values().map(BTreeSet::len).sum();
            stats.average_degree = total_degree as f64 / entity_count as f64;
        }
        if relation_count > 0 {
            let total_weight: f64 = tables.relations.values().map(|r| r.weight).sum();
            stats.average_weight = total_weight / relation_count as f64;
        }

        Ok(stats)
    }

    fn clear(&self) -> Result<()> {
        let mut tables = self.write()?;
        *tables = GraphTables::default();
        info!("Cleared graph store");
        Ok(())
    }
}
