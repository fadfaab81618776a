//! Knowledge extraction interface
//!
//! Extractors turn free text into batches of entities and relations. How they
//! do it (LLM prompt, rules, ...) is up to the implementation; the graph only
//! consumes the typed batch through [`ingest`].

use crate::entity::Entity;
use crate::relation::Relation;
use crate::store::GraphStore;
use async_trait::async_trait;
use engram_core::{EntityId, Error, RelationId, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// A batch of knowledge extracted from one piece of text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

impl ExtractionResult {
    pub fn new(entities: Vec<Entity>, relations: Vec<Relation>) -> Self {
        Self { entities, relations }
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    /// Combine several batches into one.
    ///
    /// Entities sharing an id are folded together with [`Entity::merge`];
    /// for relations sharing an id the later one wins. First-seen order is
    /// kept for both.
    pub fn merge(results: impl IntoIterator<Item = ExtractionResult>) -> ExtractionResult {
        let mut entities: Vec<Entity> = Vec::new();
        let mut entity_slots: HashMap<EntityId, usize> = HashMap::new();
        let mut relations: Vec<Relation> = Vec::new();
        let mut relation_slots: HashMap<RelationId, usize> = HashMap::new();

        for result in results {
            for entity in result.entities {
                match entity_slots.get(&entity.id) {
                    Some(&slot) => entities[slot].merge(entity),
                    None => {
                        entity_slots.insert(entity.id.clone(), entities.len());
                        entities.push(entity);
                    }
                }
            }
            for relation in result.relations {
                match relation_slots.get(&relation.id) {
                    Some(&slot) => relations[slot] = relation,
                    None => {
                        relation_slots.insert(relation.id.clone(), relations.len());
                        relations.push(relation);
                    }
                }
            }
        }

        ExtractionResult::new(entities, relations)
    }
}

/// Outcome of feeding a batch into a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Ids of the entities added or merged, in batch order
    pub entity_ids: Vec<EntityId>,
    pub relations_added: usize,
    /// Relations dropped because an endpoint was not in the store
    pub relations_skipped: usize,
}

/// Trait for knowledge extractors
#[async_trait]
pub trait KnowledgeExtractor: Send + Sync {
    /// Extract entities and relations from `text`
    async fn extract(&self, text: &str) -> Result<ExtractionResult>;
}

/// Add a batch to `store`: entities first, then relations.
///
/// Relations whose endpoints are missing are skipped rather than failing the
/// whole batch.
pub fn ingest(store: &dyn GraphStore, batch: ExtractionResult) -> Result<IngestReport> {
    let mut report = IngestReport {
        entity_ids: store.add_entities(batch.entities)?,
        ..Default::default()
    };

    for relation in batch.relations {
        let id = relation.id.clone();
        match store.add_relation(relation) {
            Ok(_) => report.relations_added += 1,
            Err(Error::EntityNotFound(missing)) => {
                warn!("Skipping relation {}: entity {} not found", id, missing);
                report.relations_skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    debug!(
        "Ingested {} entities and {} relations ({} skipped)",
        report.entity_ids.len(),
        report.relations_added,
        report.relations_skipped
    );
    Ok(report)
}

/// Rule-based extractor for testing.
///
/// Every capitalized word becomes a `Concept` entity and consecutive
/// concepts are linked with a `mentioned_with` relation.
#[derive(Debug, Clone, Default)]
pub struct MockKnowledgeExtractor;

impl MockKnowledgeExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KnowledgeExtractor for MockKnowledgeExtractor {
    async fn extract(&self, text: &str) -> Result<ExtractionResult> {
        let mut concepts: BTreeMap<EntityId, Entity> = BTreeMap::new();
        let mut order: Vec<EntityId> = Vec::new();

        for word in text.split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric());
            if !word.chars().next().is_some_and(char::is_uppercase) {
                continue;
            }
            let entity = Entity::new(word, "Concept");
            if !concepts.contains_key(&entity.id) {
                order.push(entity.id.clone());
                concepts.insert(entity.id.clone(), entity);
            }
        }

        let relations = order
            .windows(2)
            .map(|pair| Relation::new(&pair[0], "mentioned_with", &pair[1]))
            .collect();
        let entities = order
            .iter()
            .filter_map(|id| concepts.remove(id))
            .collect();

        Ok(ExtractionResult::new(entities, relations))
    }
}
