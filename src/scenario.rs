use crate::error::ScenarioError;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(pub u32);

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scenario-{}", self.0)
    }
}

/// A named what-if version of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: ScenarioId,
    pub name: String,
    pub predecessor: Option<ScenarioId>,
}

/// Every scenario of a schedule and the derivation edges between them
/// (predecessor -> derived).
#[derive(Debug, Clone, Default)]
pub struct ScenarioRegistry {
    graph: DiGraph<Scenario, ()>,
    index: HashMap<ScenarioId, NodeIndex>,
    next_id: u32,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_root(&mut self, name: impl Into<String>) -> ScenarioId {
        self.insert(name.into(), None)
    }

    /// A new scenario based on `from`, named "Derived from {name}" unless a
    /// name is given.
    pub fn derive(
        &mut self,
        from: ScenarioId,
        name: Option<String>,
    ) -> Result<ScenarioId, ScenarioError> {
        let parent = self.get(from).ok_or(ScenarioError::Unknown(from))?;
        let name = name.unwrap_or_else(|| format!("Derived from {}", parent.name));
        Ok(self.insert(name, Some(from)))
    }

    fn insert(&mut self, name: String, predecessor: Option<ScenarioId>) -> ScenarioId {
        let id = ScenarioId(self.next_id);
        self.next_id += 1;
        let node = self.graph.add_node(Scenario {
            id,
            name,
            predecessor,
        });
        self.index.insert(id, node);
        if let Some(parent) = predecessor.and_then(|p| self.index.get(&p).copied()) {
            self.graph.add_edge(parent, node, ());
        }
        id
    }

    pub fn get(&self, id: ScenarioId) -> Option<&Scenario> {
        self.index.get(&id).map(|node| &self.graph[*node])
    }

    pub fn contains(&self, id: ScenarioId) -> bool {
        self.index.contains_key(&id)
    }

    /// Ancestors of `id`, nearest first.
    pub fn predecessors(&self, id: ScenarioId) -> Vec<ScenarioId> {
        let mut result = Vec::new();
        let Some(mut node) = self.index.get(&id).copied() else {
            return result;
        };
        while let Some(parent) = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .next()
        {
            result.push(self.graph[parent].id);
            node = parent;
        }
        result
    }

    /// Scenarios derived directly from `id`.
    pub fn derived_from(&self, id: ScenarioId) -> Vec<ScenarioId> {
        let Some(node) = self.index.get(&id).copied() else {
            return Vec::new();
        };
        let mut result: Vec<ScenarioId> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .map(|child| self.graph[child].id)
            .collect();
        result.sort();
        result
    }

    pub fn ids(&self) -> Vec<ScenarioId> {
        let mut ids: Vec<ScenarioId> = self.index.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
