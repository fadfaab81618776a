//! Relation (edge) type for the knowledge graph

use engram_core::{EntityId, Error, Properties, PropertyValue, RelationId, Result, Timestamp};
use serde::{Deserialize, Serialize};

/// Weight below which time decay never pushes a relation
pub const DECAY_FLOOR: f64 = 0.1;

fn clamp_weight(weight: f64) -> f64 {
    if weight.is_nan() {
        0.0
    } else {
        weight.clamp(0.0, 1.0)
    }
}

/// A directed, weighted edge between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Identity derived from `(source, relation type, target)`
    pub id: RelationId,

    pub source: EntityId,

    pub target: EntityId,

    /// Free-form predicate (works_at, knows, ...)
    pub relation_type: String,

    /// Strength in `[0, 1]`
    pub weight: f64,

    /// Informational only; traversal direction always follows `source -> target`
    pub bidirectional: bool,

    pub properties: Properties,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,

    /// Time of the last decay sweep that changed this relation
    pub decayed_at: Option<Timestamp>,
}

impl Relation {
    /// Create a relation with full weight
    pub fn new(source: &EntityId, relation_type: impl Into<String>, target: &EntityId) -> Self {
        let relation_type = relation_type.into();
        let now = Timestamp::now();
        Self {
            id: RelationId::derive(source, &relation_type, target),
            source: source.clone(),
            target: target.clone(),
            relation_type,
            weight: 1.0,
            bidirectional: false,
            properties: Properties::new(),
            created_at: now,
            updated_at: now,
            decayed_at: None,
        }
    }

    /// Builder-style weight, clamped to `[0, 1]`
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = clamp_weight(weight);
        self
    }

    /// Mark the relation as holding in both directions
    pub fn bidirectional(mut self) -> Self {
        self.bidirectional = true;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.set(key, value);
        self
    }

    /// Set the weight, clamped to `[0, 1]`
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = clamp_weight(weight);
        self.updated_at = Timestamp::now();
    }

    pub fn strengthen(&mut self, amount: f64) {
        self.set_weight(self.weight + amount);
    }

    pub fn weaken(&mut self, amount: f64) {
        self.set_weight(self.weight - amount);
    }

    /// Check that the record can be stored: its id must still derive from
    /// `(source, relation_type, target)` and its weight must lie in `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        let expected = RelationId::derive(&self.source, &self.relation_type, &self.target);
        if self.id != expected {
            return Err(Error::InvalidArgument(format!(
                "relation id {} does not match its endpoints and type ({})",
                self.id, expected
            )));
        }
        if !(0.0..=1.0).contains(&self.weight) {
            return Err(Error::InvalidArgument(format!(
                "relation weight must be in [0, 1], got {}",
                self.weight
            )));
        }
        Ok(())
    }

    /// The endpoint opposite `entity`, if `entity` is one of the endpoints
    pub fn other_end(&self, entity: &EntityId) -> Option<&EntityId> {
        if &self.source == entity {
            Some(&self.target)
        } else if &self.target == entity {
            Some(&self.source)
        } else {
            None
        }
    }

    /// True if `entity` is the source or the target
    pub fn connects(&self, entity: &EntityId) -> bool {
        &self.source == entity || &self.target == entity
    }

    /// True if the relation is a self-loop
    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }

    /// Multiply the weight by `factor ^ days`, where `days` counts whole days
    /// since the later of the last update and the last decay.
    ///
    /// The weight never drops below `min(0.1, weight)`. Returns true when a
    /// decay was applied.
    pub fn apply_time_decay(&mut self, factor: f64, now: Timestamp) -> bool {
        let since = match self.decayed_at {
            Some(decayed_at) if decayed_at > self.updated_at => decayed_at,
            _ => self.updated_at,
        };
        let days = since.whole_days_until(now);
        if days <= 0 {
            return false;
        }

        let exponent = i32::try_from(days).unwrap_or(i32::MAX);
        let floor = DECAY_FLOOR.min(self.weight);
        self.weight = (self.weight * factor.powi(exponent)).max(floor);
        self.decayed_at = Some(now);
        true
    }

    /// Render as `source relation_type target` using the given display names
    pub fn to_natural_language(&self, source_name: &str, target_name: &str) -> String {
        format!("{} {} {}", source_name, self.relation_type, target_name)
    }
}
