//! The evaluated unit graph.
//!
//! Produced by [`Evaluator::plan`](super::Evaluator::plan): one node per unique
//! identifier, with an edge from every dependency to its dependent and the
//! unit's [`Specification`] attached. Emission walks it in dependency waves.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

use super::types::EvalError;
use crate::unit::{Specification, UnitId};

#[derive(Debug, Default)]
pub struct EvalGraph {
  graph: DiGraph<UnitId, ()>,
  nodes: HashMap<UnitId, NodeIndex>,
  specs: BTreeMap<UnitId, Specification>,
  root: Option<UnitId>,
}

impl EvalGraph {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  fn node(&mut self, id: &UnitId) -> NodeIndex {
    if let Some(&idx) = self.nodes.get(id) {
      return idx;
    }
    let idx = self.graph.add_node(id.clone());
    self.nodes.insert(id.clone(), idx);
    idx
  }

  /// Record a finished unit. Returns false if it was already present.
  pub(crate) fn insert(&mut self, spec: Specification) -> bool {
    let id = spec.identifier().clone();
    self.node(&id);
    self.specs.insert(id, spec).is_none()
  }

  pub(crate) fn add_dependency(&mut self, dependency: &UnitId, dependent: &UnitId) {
    let from = self.node(dependency);
    let to = self.node(dependent);
    if self.graph.find_edge(from, to).is_none() {
      self.graph.add_edge(from, to, ());
    }
  }

  pub(crate) fn set_root(&mut self, id: UnitId) {
    self.root = Some(id);
  }

  /// Identifier of the unit evaluation started from.
  pub fn root(&self) -> Option<&UnitId> {
    self.root.as_ref()
  }

  pub fn len(&self) -> usize {
    self.specs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.specs.is_empty()
  }

  pub fn contains(&self, id: &UnitId) -> bool {
    self.specs.contains_key(id)
  }

  pub fn specification(&self, id: &UnitId) -> Option<&Specification> {
    self.specs.get(id)
  }

  /// All specifications, ordered by identifier.
  pub fn specifications(&self) -> impl Iterator<Item = &Specification> {
    self.specs.values()
  }

  /// Identifiers with dependencies before dependents.
  pub fn topological(&self) -> Result<Vec<UnitId>, EvalError> {
    let sorted = toposort(&self.graph, None).map_err(|cycle| EvalError::Cycle {
      chain: vec![self.graph[cycle.node_id()].to_string()],
    })?;
    Ok(sorted.into_iter().map(|idx| self.graph[idx].clone()).collect())
  }

  /// Identifiers grouped into waves.
  ///
  /// Every unit's dependencies sit in earlier waves, so the members of one
  /// wave can be emitted concurrently. Waves are sorted by identifier.
  pub fn waves(&self) -> Result<Vec<Vec<UnitId>>, EvalError> {
    let mut in_degree: HashMap<NodeIndex, usize> = self
      .graph
      .node_indices()
      .map(|idx| (idx, self.graph.neighbors_directed(idx, Direction::Incoming).count()))
      .collect();
    let mut remaining: HashSet<NodeIndex> = self.graph.node_indices().collect();
    let mut waves = Vec::new();

    while !remaining.is_empty() {
      let ready: Vec<NodeIndex> = remaining.iter().filter(|&&idx| in_degree[&idx] == 0).copied().collect();
      if ready.is_empty() {
        let mut stuck: Vec<String> = remaining.iter().map(|idx| self.graph[*idx].to_string()).collect();
        stuck.sort();
        return Err(EvalError::Cycle { chain: stuck });
      }

      for idx in &ready {
        remaining.remove(idx);
        for dependent in self.graph.neighbors_directed(*idx, Direction::Outgoing) {
          if let Some(degree) = in_degree.get_mut(&dependent) {
            *degree = degree.saturating_sub(1);
          }
        }
      }

      let mut wave: Vec<UnitId> = ready.into_iter().map(|idx| self.graph[idx].clone()).collect();
      wave.sort();
      waves.push(wave);
    }

    Ok(waves)
  }

  /// Direct dependencies of a unit, sorted.
  pub fn dependencies(&self, id: &UnitId) -> Vec<UnitId> {
    self.neighbors(id, Direction::Incoming)
  }

  /// Units that directly depend on `id`, sorted.
  pub fn dependents(&self, id: &UnitId) -> Vec<UnitId> {
    self.neighbors(id, Direction::Outgoing)
  }

  fn neighbors(&self, id: &UnitId, direction: Direction) -> Vec<UnitId> {
    let Some(&idx) = self.nodes.get(id) else {
      return Vec::new();
    };
    let mut ids: Vec<UnitId> = self
      .graph
      .neighbors_directed(idx, direction)
      .map(|n| self.graph[n].clone())
      .collect();
    ids.sort();
    ids
  }

  /// Graphviz rendering, edges pointing from dependency to dependent.
  pub fn to_dot(&self) -> String {
    let labelled = self.graph.map(|_, id| id.to_string(), |_, _| String::new());
    format!("{}", Dot::with_config(&labelled, &[Config::EdgeNoLabel]))
  }
}
