//! Graph traversal algorithms
//!
//! The algorithms run against a read-only [`GraphView`] so they can be shared
//! by any store that can hand out entities, relations and adjacency. Neighbor
//! and subgraph expansion ignore direction; path search follows relations
//! from source to target only.

use crate::entity::Entity;
use crate::relation::Relation;
use crate::subgraph::{Path, PathElement, SubGraph};
use engram_core::{EntityId, Error, RelationId, Result};
use std::collections::{HashMap, HashSet, VecDeque};

/// Read access to a consistent snapshot of a graph
pub trait GraphView {
    fn entity(&self, id: &EntityId) -> Option<&Entity>;

    fn relation(&self, id: &RelationId) -> Option<&Relation>;

    /// Relations with `id` as source or target
    fn incident_relations(&self, id: &EntityId) -> Vec<&Relation>;

    /// Relations with `id` as source
    fn outgoing_relations(&self, id: &EntityId) -> Vec<&Relation> {
        self.incident_relations(id)
            .into_iter()
            .filter(|rel| &rel.source == id)
            .collect()
    }
}

fn require<'a, V: GraphView + ?Sized>(view: &'a V, id: &EntityId) -> Result<&'a Entity> {
    view.entity(id)
        .ok_or_else(|| Error::EntityNotFound(id.to_string()))
}

/// Entities within `hops` steps of `origin`, nearest first, excluding `origin`
pub fn neighbors<V: GraphView + ?Sized>(view: &V, origin: &EntityId, hops: usize) -> Result<Vec<Entity>> {
    require(view, origin)?;

    let mut visited: HashSet<&EntityId> = HashSet::new();
    visited.insert(origin);
    let mut frontier = vec![origin];
    let mut reached = Vec::new();

    for _ in 0..hops {
        let mut next = Vec::new();
        for node in frontier {
            for rel in view.incident_relations(node) {
                let Some(other) = rel.other_end(node) else { continue };
                if !visited.insert(other) {
                    continue;
                }
                if let Some(entity) = view.entity(other) {
                    reached.push(entity.clone());
                    next.push(other);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    Ok(reached)
}

/// The center entity plus everything within `depth` steps, with the
/// relations that were walked to reach them
pub fn subgraph<V: GraphView + ?Sized>(view: &V, origin: &EntityId, depth: usize) -> Result<SubGraph> {
    let center = require(view, origin)?;
    let mut graph = SubGraph::new(center.clone(), depth);

    let mut visited: HashSet<&EntityId> = HashSet::new();
    visited.insert(origin);
    let mut frontier = vec![origin];

    for _ in 0..depth {
        let mut next = Vec::new();
        for node in frontier {
            for rel in view.incident_relations(node) {
                let Some(other) = rel.other_end(node) else { continue };
                let Some(entity) = view.entity(other) else { continue };
                graph.add_relation(rel.clone());
                if visited.insert(other) {
                    graph.add_entity(entity.clone());
                    next.push(other);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    Ok(graph)
}

/// Fewest-hop directed path from `source` to `target`.
///
/// Returns `[source]` when both are the same entity and an empty path when
/// `target` is unreachable.
pub fn shortest_path<V: GraphView + ?Sized>(view: &V, source: &EntityId, target: &EntityId) -> Result<Path> {
    let start = require(view, source)?;
    require(view, target)?;

    if source == target {
        return Ok(vec![PathElement::Entity(start.clone())]);
    }

    // entity -> relation used to reach it
    let mut came_from: HashMap<&EntityId, &Relation> = HashMap::new();
    let mut visited: HashSet<&EntityId> = HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(source);
    queue.push_back(source);

    let mut found = false;
    while let Some(node) = queue.pop_front() {
        for rel in view.outgoing_relations(node) {
            if !visited.insert(&rel.target) {
                continue;
            }
            came_from.insert(&rel.target, rel);
            if &rel.target == target {
                found = true;
                break;
            }
            queue.push_back(&rel.target);
        }
        if found {
            break;
        }
    }

    if !found {
        return Ok(Vec::new());
    }

    let mut reversed = Vec::new();
    let mut cursor = target;
    while let Some(&rel) = came_from.get(cursor) {
        reversed.push(PathElement::Entity(require(view, cursor)?.clone()));
        reversed.push(PathElement::Relation(rel.clone()));
        cursor = &rel.source;
    }
    reversed.push(PathElement::Entity(start.clone()));
    reversed.reverse();

    Ok(reversed)
}

/// Every directed simple path from `source` to `target` with at most
/// `max_depth` relations
pub fn all_paths<V: GraphView + ?Sized>(
    view: &V,
    source: &EntityId,
    target: &EntityId,
    max_depth: usize,
) -> Result<Vec<Path>> {
    let start = require(view, source)?;
    require(view, target)?;

    let mut paths = Vec::new();
    if max_depth == 0 {
        return Ok(paths);
    }

    let mut on_path: HashSet<EntityId> = HashSet::new();
    on_path.insert(source.clone());
    let mut trail = vec![PathElement::Entity(start.clone())];
    collect_paths(view, start, target, max_depth, &mut on_path, &mut trail, &mut paths);

    Ok(paths)
}

fn collect_paths<V: GraphView + ?Sized>(
    view: &V,
    current: &Entity,
    target: &EntityId,
    remaining: usize,
    on_path: &mut HashSet<EntityId>,
    trail: &mut Path,
    paths: &mut Vec<Path>,
) {
    if &current.id == target {
        paths.push(trail.clone());
        return;
    }
    if remaining == 0 {
        return;
    }

    for rel in view.outgoing_relations(&current.id) {
        if on_path.contains(&rel.target) {
            continue;
        }
        let Some(next) = view.entity(&rel.target) else { continue };

        on_path.insert(next.id.clone());
        trail.push(PathElement::Relation(rel.clone()));
        trail.push(PathElement::Entity(next.clone()));

        collect_paths(view, next, target, remaining - 1, on_path, trail, paths);

        trail.truncate(trail.len() - 2);
        on_path.remove(&next.id);
    }
}
