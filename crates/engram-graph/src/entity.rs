//! Entity (node) type for the knowledge graph

use engram_core::{EntityId, Error, Properties, PropertyValue, Result, Timestamp};
use serde::{Deserialize, Serialize};

/// Upper bound on the reference-count share of importance
const REFERENCE_IMPORTANCE_CAP: f64 = 0.9;

/// Maximum recency bonus, reached at the moment of an update
const RECENCY_BONUS: f64 = 0.1;

/// E-folding time of the recency bonus, in days
const RECENCY_DAYS: f64 = 30.0;

/// Compute the importance of an entity referenced `reference_count` times
/// whose last update happened `days_since_update` days ago.
///
/// `min(0.9, log10(count + 1)) + 0.1 * exp(-days / 30)`, clamped to `[0, 1]`.
pub fn compute_importance(reference_count: u64, days_since_update: f64) -> f64 {
    let reference_score = ((reference_count as f64) + 1.0)
        .log10()
        .min(REFERENCE_IMPORTANCE_CAP);
    let recency_score = RECENCY_BONUS * (-days_since_update.max(0.0) / RECENCY_DAYS).exp();
    (reference_score + recency_score).clamp(0.0, 1.0)
}

/// A real-world object or concept mentioned by the agent's inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Identity derived from `(type, normalized name)`
    pub id: EntityId,

    /// Display name as first mentioned
    pub name: String,

    /// Free-form type tag (Person, Organization, ...)
    pub entity_type: String,

    pub description: Option<String>,

    pub properties: Properties,

    /// Relevance score in `[0, 1]`
    pub importance: f64,

    /// How many times the entity has been mentioned or linked
    pub reference_count: u64,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,
}

impl Entity {
    /// Create a freshly mentioned entity
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        let name = name.into();
        let entity_type = entity_type.into();
        let now = Timestamp::now();
        Self {
            id: EntityId::derive(&entity_type, &name),
            name,
            entity_type,
            description: None,
            properties: Properties::new(),
            importance: compute_importance(1, 0.0),
            reference_count: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder-style property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.set(key, value);
        self
    }

    /// Check that the record can be stored: its id must still derive from
    /// `(entity_type, name)` and its importance must lie in `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        let expected = EntityId::derive(&self.entity_type, &self.name);
        if self.id != expected {
            return Err(Error::InvalidArgument(format!(
                "entity id {} does not match its type and name ({})",
                self.id, expected
            )));
        }
        if !(0.0..=1.0).contains(&self.importance) {
            return Err(Error::InvalidArgument(format!(
                "entity importance must be in [0, 1], got {}",
                self.importance
            )));
        }
        Ok(())
    }

    /// Fold a duplicate mention into this record.
    ///
    /// Descriptions are concatenated with `"; "`, incoming properties
    /// overwrite existing ones and reference counts are summed. Merging the
    /// same duplicate twice counts it twice.
    pub fn merge(&mut self, other: Entity) {
        self.description = match (self.description.take(), other.description) {
            (Some(existing), Some(incoming)) => Some(format!("{}; {}", existing, incoming)),
            (existing, incoming) => existing.or(incoming),
        };
        self.properties.merge(other.properties);
        self.reference_count = self.reference_count.saturating_add(other.reference_count);
        self.touch();
    }

    /// Record `by` additional references
    pub fn increment_references(&mut self, by: u64) {
        self.reference_count = self.reference_count.saturating_add(by);
        self.touch();
    }

    /// Recompute importance relative to `now`
    pub fn refresh_importance(&mut self, now: Timestamp) {
        self.importance =
            compute_importance(self.reference_count, self.updated_at.days_until(now));
    }

    /// Render as a sentence for prompt construction
    pub fn to_natural_language(&self) -> String {
        match &self.description {
            Some(description) => format!("{} ({}): {}", self.name, self.entity_type, description),
            None => format!("{} ({})", self.name, self.entity_type),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
        self.refresh_importance(self.updated_at);
    }
}
