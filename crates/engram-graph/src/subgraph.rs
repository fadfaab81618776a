//! Subgraphs and paths extracted from the knowledge graph

use crate::entity::Entity;
use crate::relation::Relation;
use engram_core::{EntityId, RelationId, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One step of a path: paths alternate `[entity, relation, entity, ...]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PathElement {
    Entity(Entity),
    Relation(Relation),
}

impl PathElement {
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            PathElement::Entity(e) => Some(e),
            PathElement::Relation(_) => None,
        }
    }

    pub fn as_relation(&self) -> Option<&Relation> {
        match self {
            PathElement::Relation(r) => Some(r),
            PathElement::Entity(_) => None,
        }
    }
}

/// An alternating entity/relation sequence; empty means "no path"
pub type Path = Vec<PathElement>;

/// Self-contained neighborhood around a center entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubGraph {
    pub center: Option<Entity>,
    pub entities: BTreeMap<EntityId, Entity>,
    pub relations: BTreeMap<RelationId, Relation>,
    pub depth: usize,
}

impl SubGraph {
    /// Start a subgraph around `center`
    pub fn new(center: Entity, depth: usize) -> Self {
        let mut entities = BTreeMap::new();
        entities.insert(center.id.clone(), center.clone());
        Self {
            center: Some(center),
            entities,
            relations: BTreeMap::new(),
            depth,
        }
    }

    /// Add an entity; returns false if it was already present
    pub fn add_entity(&mut self, entity: Entity) -> bool {
        if self.entities.contains_key(&entity.id) {
            return false;
        }
        self.entities.insert(entity.id.clone(), entity);
        true
    }

    /// Add a relation; returns false if it was already present
    pub fn add_relation(&mut self, relation: Relation) -> bool {
        if self.relations.contains_key(&relation.id) {
            return false;
        }
        self.relations.insert(relation.id.clone(), relation);
        true
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn contains_entity(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Render the relations as sentences, one per line, falling back to the
    /// lone center entity when there are no relations
    pub fn to_natural_language(&self) -> String {
        if self.relations.is_empty() {
            return self
                .center
                .as_ref()
                .map(Entity::to_natural_language)
                .unwrap_or_default();
        }

        self.relations
            .values()
            .map(|rel| {
                rel.to_natural_language(self.display_name(&rel.source), self.display_name(&rel.target))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render as a JSON document
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn display_name<'a>(&'a self, id: &'a EntityId) -> &'a str {
        self.entities
            .get(id)
            .map(|e| e.name.as_str())
            .unwrap_or_else(|| id.as_str())
    }
}
