//! Knowledge-graph memory
//!
//! Runs conversation text through a [`KnowledgeExtractor`], feeds the result
//! into a [`GraphStore`] and renders the neighbourhood of relevant entities
//! back as prompt text.

use crate::types::GraphMemoryConfig;
use engram_core::{EntityId, Error, Result};
use engram_graph::{
    ExtractionResult, GraphStore, InMemoryGraphStore, IngestReport, KnowledgeExtractor, ingest,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Text returned by [`KnowledgeGraphMemory::load_context`] when nothing is known
pub const NO_KNOWLEDGE: &str = "No relevant knowledge";

/// Long-term associative memory backed by a knowledge graph
pub struct KnowledgeGraphMemory {
    config: GraphMemoryConfig,
    store: Arc<dyn GraphStore>,
    extractor: Arc<dyn KnowledgeExtractor>,
    /// Entities each session has mentioned
    session_entities: RwLock<HashMap<String, BTreeSet<EntityId>>>,
}

impl KnowledgeGraphMemory {
    /// Create a memory over an existing store and extractor
    pub fn new(
        config: GraphMemoryConfig,
        store: Arc<dyn GraphStore>,
        extractor: Arc<dyn KnowledgeExtractor>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            extractor,
            session_entities: RwLock::new(HashMap::new()),
        })
    }

    /// Create with default config and an empty in-memory graph
    pub fn in_memory(extractor: Arc<dyn KnowledgeExtractor>) -> Self {
        Self {
            config: GraphMemoryConfig::default(),
            store: Arc::new(InMemoryGraphStore::new()),
            extractor,
            session_entities: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &GraphMemoryConfig {
        &self.config
    }

    /// Get the underlying graph
    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    // ========== Saving ==========

    /// Extract knowledge from `text` and add it to the graph, remembering
    /// which entities `session_id` touched.
    ///
    /// Does nothing when automatic extraction is disabled or the text is blank.
    pub async fn save_context(&self, session_id: &str, text: &str) -> Result<IngestReport> {
        self.save_texts(session_id, &[text]).await
    }

    /// Extract each non-blank text separately and ingest the combined batch
    /// once, so an entity mentioned in several texts is folded before it
    /// reaches the graph.
    pub async fn save_texts(&self, session_id: &str, texts: &[&str]) -> Result<IngestReport> {
        if !self.config.auto_extraction {
            return Ok(IngestReport::default());
        }

        let mut batches = Vec::new();
        for text in texts.iter().filter(|t| !t.trim().is_empty()) {
            batches.push(self.extractor.extract(text).await?);
        }
        if batches.is_empty() {
            return Ok(IngestReport::default());
        }

        let batch = ExtractionResult::merge(batches);
        let report = ingest(self.store.as_ref(), batch)?;

        let mut sessions = self.session_entities.write().map_err(|_| {
            Error::Internal("Failed to acquire session entities lock".to_string())
        })?;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .extend(report.entity_ids.iter().cloned());

        debug!(
            "Saved {} entities and {} relations for session {}",
            report.entity_ids.len(),
            report.relations_added,
            session_id
        );
        Ok(report)
    }

    // ========== Loading ==========

    /// Entities relevant to a turn: everything the session mentioned that is
    /// still stored, plus stored entities the extractor finds in `input`
    pub async fn relevant_entities(&self, session_id: &str, input: &str) -> Result<BTreeSet<EntityId>> {
        let mut relevant = BTreeSet::new();

        for id in self.session_entities(session_id)? {
            if self.store.get_entity(&id)?.is_some() {
                relevant.insert(id);
            }
        }

        if !input.trim().is_empty() {
            let mentioned = self.extractor.extract(input).await?;
            for entity in mentioned.entities {
                if let Some(existing) = self
                    .store
                    .get_entity_by_name_and_type(&entity.name, &entity.entity_type)?
                {
                    relevant.insert(existing.id);
                }
            }
        }

        Ok(relevant)
    }

    /// Render what the graph knows about the current turn: the subgraph
    /// around each relevant entity followed by the top-ranked entities
    pub async fn load_context(&self, session_id: &str, input: &str) -> Result<String> {
        let relevant = self.relevant_entities(session_id, input).await?;
        if relevant.is_empty() {
            return Ok(NO_KNOWLEDGE.to_string());
        }

        let mut context = String::from("Relevant knowledge:\n");
        let mut rendered = BTreeSet::new();
        for id in &relevant {
            let subgraph = self.store.get_sub_graph(id, self.config.max_hops)?;
            if subgraph.is_empty() {
                continue;
            }
            // Overlapping neighbourhoods render identically
            let text = subgraph.to_natural_language();
            if rendered.insert(text.clone()) {
                context.push_str(&text);
                context.push('\n');
            }
        }

        let top = self.store.get_top_entities(self.config.top_entities)?;
        if !top.is_empty() {
            context.push_str("\nKey entities:\n");
            for entity in top {
                context.push_str(&format!("- {} ({})\n", entity.name, entity.entity_type));
            }
        }

        Ok(context)
    }

    /// Ids of the entities a session has mentioned
    pub fn session_entities(&self, session_id: &str) -> Result<Vec<EntityId>> {
        let sessions = self.session_entities.read().map_err(|_| {
            Error::Internal("Failed to acquire session entities lock".to_string())
        })?;
        Ok(sessions
            .get(session_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default())
    }

    // ========== Maintenance ==========

    /// Forget which entities a session touched; the graph itself is kept.
    /// Returns true if the session was tracked.
    pub fn clear_session(&self, session_id: &str) -> Result<bool> {
        let mut sessions = self.session_entities.write().map_err(|_| {
            Error::Internal("Failed to acquire session entities lock".to_string())
        })?;
        Ok(sessions.remove(session_id).is_some())
    }

    /// Empty the graph and every session
    pub fn clear(&self) -> Result<()> {
        self.store.clear()?;
        self.session_entities
            .write()
            .map_err(|_| Error::Internal("Failed to acquire session entities lock".to_string()))?
            .clear();
        info!("Cleared knowledge graph memory");
        Ok(())
    }

    /// Decay every relation by the configured factor
    pub fn apply_time_decay(&self) -> Result<usize> {
        self.store.apply_time_decay(self.config.decay_factor)
    }

    /// Remove relations below the configured threshold
    pub fn prune_weak_relations(&self) -> Result<usize> {
        self.store.prune_weak_relations(self.config.prune_threshold)
    }
}
