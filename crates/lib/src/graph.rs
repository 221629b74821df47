//! Component dependency graph.
//!
//! Nodes are component names and edges point from a dependency to its
//! dependent, so an edge reads "must be built before". The graph is built once
//! per invocation and never mutated afterwards.
//!
//! Orders are deterministic: whenever several components are free to go next,
//! the one that was added to the graph first wins. Callers feed components in
//! sorted name order, so identical inputs always produce identical plans.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::config::{ComponentDeclaration, ConfigError};

/// A directed graph of component dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
  /// Component names in insertion order; a node's index is its tie-break rank.
  nodes: Vec<String>,

  index: HashMap<String, usize>,

  /// Outgoing edges: dependency -> dependents.
  dependents: Vec<Vec<usize>>,

  /// Incoming edges: dependent -> dependencies.
  dependencies: Vec<Vec<usize>>,
}

impl DependencyGraph {
  /// Build the graph from component declarations.
  ///
  /// # Errors
  ///
  /// Returns `UnknownDependency` if a component names a dependency that is not
  /// one of `components`.
  pub fn build(components: &[ComponentDeclaration]) -> Result<Self, ConfigError> {
    Self::from_dependencies(components.iter().map(|c| (c.name.as_str(), c.dependencies.as_slice())))
  }

  /// Build the graph from `(component, direct dependencies)` pairs.
  pub fn from_dependencies<'a, I, D>(entries: I) -> Result<Self, ConfigError>
  where
    I: IntoIterator<Item = (&'a str, D)>,
    D: IntoIterator<Item = &'a String>,
  {
    let entries: Vec<(&str, Vec<&String>)> = entries
      .into_iter()
      .map(|(name, deps)| (name, deps.into_iter().collect()))
      .collect();

    let mut graph = Self::default();
    for (name, _) in &entries {
      graph.add_node(name);
    }

    for (name, deps) in &entries {
      let dependent = graph.index[*name];
      for dep in deps {
        let Some(&dependency) = graph.index.get(dep.as_str()) else {
          return Err(ConfigError::UnknownDependency {
            component: name.to_string(),
            dependency: dep.to_string(),
          });
        };
        if !graph.dependents[dependency].contains(&dependent) {
          graph.dependents[dependency].push(dependent);
          graph.dependencies[dependent].push(dependency);
        }
      }
    }

    Ok(graph)
  }

  fn add_node(&mut self, name: &str) {
    if self.index.contains_key(name) {
      return;
    }
    self.index.insert(name.to_string(), self.nodes.len());
    self.nodes.push(name.to_string());
    self.dependents.push(Vec::new());
    self.dependencies.push(Vec::new());
  }

  /// Verify the graph is acyclic.
  ///
  /// # Errors
  ///
  /// Returns `Cycle` with the offending node sequence, first node repeated at the end.
  pub fn validate(&self) -> Result<(), ConfigError> {
    match self.find_cycle() {
      Some(cycle) => Err(ConfigError::Cycle {
        cycle: cycle.into_iter().map(|idx| self.nodes[idx].clone()).collect(),
      }),
      None => Ok(()),
    }
  }

  /// Depth-first search for a back edge, returning the cycle it closes.
  fn find_cycle(&self) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
      New,
      Active,
      Done,
    }

    fn visit(graph: &DependencyGraph, node: usize, marks: &mut [Mark], path: &mut Vec<usize>) -> Option<Vec<usize>> {
      marks[node] = Mark::Active;
      path.push(node);

      for &next in &graph.dependents[node] {
        match marks[next] {
          Mark::Active => {
            let start = path.iter().position(|&n| n == next).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(next);
            return Some(cycle);
          }
          Mark::New => {
            if let Some(cycle) = visit(graph, next, marks, path) {
              return Some(cycle);
            }
          }
          Mark::Done => {}
        }
      }

      path.pop();
      marks[node] = Mark::Done;
      None
    }

    let mut marks = vec![Mark::New; self.nodes.len()];
    let mut path = Vec::new();
    for node in 0..self.nodes.len() {
      if marks[node] == Mark::New
        && let Some(cycle) = visit(self, node, &mut marks, &mut path)
      {
        return Some(cycle);
      }
    }
    None
  }

  /// The order in which to build `requested`.
  ///
  /// Every requested component is included together with all of its transitive
  /// dependencies, even ones that were not requested, and each component comes
  /// after everything it depends on.
  ///
  /// # Errors
  ///
  /// Returns `UnknownComponent` for a requested name not in the graph, or
  /// `Cycle` if the graph was not acyclic.
  pub fn build_order<S: AsRef<str>>(&self, requested: &[S]) -> Result<Vec<String>, ConfigError> {
    let mut members = HashSet::new();
    for name in requested {
      let idx = self.node(name.as_ref())?;
      members.insert(idx);
      members.extend(self.ancestors(idx));
    }
    self.sorted(&members)
  }

  /// All transitive dependencies of `component`, dependencies first.
  ///
  /// These are the components whose artifacts are copied into its image.
  pub fn transitive_dependencies(&self, component: &str) -> Result<Vec<String>, ConfigError> {
    let idx = self.node(component)?;
    self.sorted(&self.ancestors(idx))
  }

  /// Direct dependencies of `component`, in declaration order.
  pub fn direct_dependencies(&self, component: &str) -> Vec<&str> {
    self
      .index
      .get(component)
      .map(|&idx| self.dependencies[idx].iter().map(|&d| self.nodes[d].as_str()).collect())
      .unwrap_or_default()
  }

  /// Full topological order of the whole graph.
  pub fn topological_order(&self) -> Result<Vec<String>, ConfigError> {
    self.sorted(&(0..self.nodes.len()).collect())
  }

  pub fn contains(&self, component: &str) -> bool {
    self.index.contains_key(component)
  }

  pub fn nodes(&self) -> &[String] {
    &self.nodes
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  fn node(&self, name: &str) -> Result<usize, ConfigError> {
    self
      .index
      .get(name)
      .copied()
      .ok_or_else(|| ConfigError::UnknownComponent(name.to_string()))
  }

  /// Every node reachable backwards from `start`, excluding `start` itself
  /// unless it sits on a cycle.
  fn ancestors(&self, start: usize) -> HashSet<usize> {
    let mut seen = HashSet::new();
    let mut stack: Vec<usize> = self.dependencies[start].clone();
    while let Some(node) = stack.pop() {
      if seen.insert(node) {
        stack.extend(self.dependencies[node].iter().copied());
      }
    }
    seen
  }

  /// Kahn's algorithm restricted to `members`, lowest insertion index first.
  fn sorted(&self, members: &HashSet<usize>) -> Result<Vec<String>, ConfigError> {
    let mut in_degree: HashMap<usize, usize> = members
      .iter()
      .map(|&idx| {
        let degree = self.dependencies[idx].iter().filter(|d| members.contains(d)).count();
        (idx, degree)
      })
      .collect();

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
      .iter()
      .filter(|&(_, &degree)| degree == 0)
      .map(|(&idx, _)| Reverse(idx))
      .collect();

    let mut order = Vec::with_capacity(members.len());
    while let Some(Reverse(idx)) = ready.pop() {
      order.push(self.nodes[idx].clone());
      for dependent in &self.dependents[idx] {
        if let Some(degree) = in_degree.get_mut(dependent) {
          *degree -= 1;
          if *degree == 0 {
            ready.push(Reverse(*dependent));
          }
        }
      }
    }

    if order.len() != members.len() {
      self.validate()?;
    }

    Ok(order)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn graph(entries: &[(&str, &[&str])]) -> Result<DependencyGraph, ConfigError> {
    let owned: Vec<(&str, Vec<String>)> = entries
      .iter()
      .map(|(name, deps)| (*name, deps.iter().map(|d| d.to_string()).collect()))
      .collect();
    DependencyGraph::from_dependencies(owned.iter().map(|(name, deps)| (*name, deps.iter())))
  }

  fn position(order: &[String], name: &str) -> usize {
    order.iter().position(|n| n == name).unwrap()
  }

  #[test]
  fn empty_graph() {
    let g = graph(&[]).unwrap();
    assert!(g.is_empty());
    g.validate().unwrap();
    assert!(g.topological_order().unwrap().is_empty());
    assert!(g.build_order::<&str>(&[]).unwrap().is_empty());
  }

  #[test]
  fn linear_chain() {
    let g = graph(&[("app", &["lib"]), ("base", &[]), ("lib", &["base"])]).unwrap();
    g.validate().unwrap();

    assert_eq!(g.topological_order().unwrap(), vec!["base", "lib", "app"]);
    assert_eq!(g.transitive_dependencies("app").unwrap(), vec!["base", "lib"]);
    assert_eq!(g.transitive_dependencies("base").unwrap(), Vec::<String>::new());
    assert_eq!(g.direct_dependencies("app"), vec!["lib"]);
  }

  #[test]
  fn diamond() {
    //     a
    //    / \
    //   b   c
    //    \ /
    //     d
    let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["a"]), ("d", &["c", "b"])]).unwrap();
    g.validate().unwrap();

    let order = g.build_order(&["d"]).unwrap();
    assert_eq!(order, vec!["a", "b", "c", "d"]);
    assert!(position(&order, "a") < position(&order, "b"));
    assert!(position(&order, "b") < position(&order, "d"));
    assert!(position(&order, "c") < position(&order, "d"));
  }

  #[test]
  fn build_order_includes_unrequested_dependencies() {
    let g = graph(&[("shared", &[]), ("web", &["shared"])]).unwrap();
    assert_eq!(g.build_order(&["web"]).unwrap(), vec!["shared", "web"]);
  }

  #[test]
  fn build_order_excludes_unrelated_components() {
    let g = graph(&[("api", &["shared"]), ("shared", &[]), ("tools", &[]), ("web", &["shared"])]).unwrap();
    assert_eq!(g.build_order(&["web"]).unwrap(), vec!["shared", "web"]);
    assert_eq!(g.build_order(&["web", "api"]).unwrap(), vec!["shared", "api", "web"]);
  }

  #[test]
  fn ties_break_by_insertion_order() {
    let g = graph(&[("alpha", &[]), ("beta", &[]), ("gamma", &[])]).unwrap();
    assert_eq!(g.build_order(&["gamma", "alpha", "beta"]).unwrap(), vec!["alpha", "beta", "gamma"]);

    let first = g.topological_order().unwrap();
    for _ in 0..10 {
      assert_eq!(g.topological_order().unwrap(), first);
    }
  }

  #[test]
  fn unknown_dependency_is_rejected() {
    let err = graph(&[("web", &["ghost"])]).unwrap_err();
    assert!(matches!(
      err,
      ConfigError::UnknownDependency { ref component, ref dependency } if component == "web" && dependency == "ghost"
    ));
  }

  #[test]
  fn unknown_requested_component_is_rejected() {
    let g = graph(&[("web", &[])]).unwrap();
    assert!(matches!(g.build_order(&["api"]), Err(ConfigError::UnknownComponent(ref c)) if c == "api"));
  }

  #[test]
  fn self_loop_is_a_cycle() {
    let g = graph(&[("web", &["web"])]).unwrap();
    match g.validate().unwrap_err() {
      ConfigError::Cycle { cycle } => assert_eq!(cycle, vec!["web", "web"]),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn three_node_cycle_names_every_member() {
    let g = graph(&[("a", &["c"]), ("b", &["a"]), ("c", &["b"])]).unwrap();
    match g.validate().unwrap_err() {
      ConfigError::Cycle { cycle } => {
        assert_eq!(cycle.first(), cycle.last());
        for name in ["a", "b", "c"] {
          assert!(cycle.contains(&name.to_string()), "{name} missing from {cycle:?}");
        }
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn cycle_off_the_requested_path_still_fails_validation() {
    let g = graph(&[("web", &[]), ("x", &["y"]), ("y", &["x"])]).unwrap();
    assert!(g.validate().is_err());
  }

  #[test]
  fn ordering_on_a_cyclic_graph_reports_the_cycle() {
    let g = graph(&[("x", &["y"]), ("y", &["x"])]).unwrap();
    assert!(matches!(g.build_order(&["x"]), Err(ConfigError::Cycle { .. })));
  }

  #[test]
  fn every_component_follows_its_transitive_dependencies() {
    let g = graph(&[
      ("api", &["models", "auth"]),
      ("auth", &["models"]),
      ("cli", &["api"]),
      ("models", &["base"]),
      ("base", &[]),
      ("web", &["auth"]),
    ])
    .unwrap();
    g.validate().unwrap();

    let order = g.build_order(&["cli", "web"]).unwrap();
    for name in &order {
      for dep in g.transitive_dependencies(name).unwrap() {
        assert!(position(&order, &dep) < position(&order, name), "{dep} must precede {name}");
      }
    }
  }
}
