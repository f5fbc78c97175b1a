// kiln: Build orchestration and classpath engine for JVM projects.
// Copyright (C) 2024 International Digital Economy Academy
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// For inquiries, you can contact us via e-mail at jichuruanjian@idea.edu.cn.

//! Reactor ordering: topological sort of a multi-module build with cycle
//! and duplicate-identity detection.

use std::collections::{BTreeSet, HashMap};

use kilnutil::graph::get_example_cycle;
use kilnutil::project::ReactorModule;
use petgraph::graph::DiGraph;
use thiserror::Error;

/// Ordering failed; no partial order is returned. A cycle aborts the whole
/// multi-module pass since no valid order exists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReactorError {
    #[error("duplicate module id in reactor: {0}")]
    DuplicateId(String),
    #[error("cycle in module dependencies: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

/// Order modules so every module comes after the modules it depends on.
///
/// Dependencies naming ids outside the reactor are external artifacts and
/// don't constrain the order. Modules not constrained against each other
/// keep their input order.
pub fn sort(modules: &[ReactorModule]) -> Result<Vec<ReactorModule>, ReactorError> {
    let mut index_of = HashMap::new();
    for (idx, module) in modules.iter().enumerate() {
        if index_of.insert(module.id.as_str(), idx).is_some() {
            return Err(ReactorError::DuplicateId(module.id.clone()));
        }
    }

    // edge A -> B: A depends on B, so B must be configured/built first
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let nodes: Vec<_> = modules
        .iter()
        .map(|m| graph.add_node(m.id.as_str()))
        .collect();
    for (idx, module) in modules.iter().enumerate() {
        for dep in &module.deps {
            if let Some(&dep_idx) = index_of.get(dep.as_str()) {
                graph.add_edge(nodes[idx], nodes[dep_idx], ());
            }
        }
    }

    if let Err(cycle) = petgraph::algo::toposort(&graph, None) {
        let cycle = get_example_cycle(&graph, cycle.node_id());
        let ids = cycle.iter().map(|n| graph[*n].to_string()).collect();
        return Err(ReactorError::Cycle(ids));
    }

    // Kahn's algorithm over the acyclic graph, always draining the
    // earliest-declared ready module, so unconstrained modules keep their
    // input order.
    let mut blockers: Vec<usize> = modules
        .iter()
        .map(|m| {
            m.deps
                .iter()
                .filter(|d| index_of.contains_key(d.as_str()))
                .count()
        })
        .collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); modules.len()];
    for (idx, module) in modules.iter().enumerate() {
        for dep in &module.deps {
            if let Some(&dep_idx) = index_of.get(dep.as_str()) {
                dependents[dep_idx].push(idx);
            }
        }
    }

    let mut ready: BTreeSet<usize> = blockers
        .iter()
        .enumerate()
        .filter(|&(_, &n)| n == 0)
        .map(|(idx, _)| idx)
        .collect();
    let mut order = Vec::with_capacity(modules.len());
    while let Some(idx) = ready.pop_first() {
        order.push(modules[idx].clone());
        for &dependent in &dependents[idx] {
            blockers[dependent] -= 1;
            if blockers[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }
    debug_assert_eq!(order.len(), modules.len());
    Ok(order)
}

#[cfg(test)]
mod test {
    use test_log::test;

    use super::*;

    fn ids(modules: &[ReactorModule]) -> Vec<&str> {
        modules.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn chain_orders_dependencies_first() {
        let modules = vec![
            ReactorModule::new("a", ["b"]),
            ReactorModule::new("b", ["c"]),
            ReactorModule::new("c", []),
        ];
        let sorted = sort(&modules).unwrap();
        assert_eq!(ids(&sorted), ["c", "b", "a"]);
    }

    #[test]
    fn unconstrained_modules_keep_input_order() {
        let modules = vec![
            ReactorModule::new("one", []),
            ReactorModule::new("two", []),
            ReactorModule::new("three", []),
        ];
        let sorted = sort(&modules).unwrap();
        assert_eq!(ids(&sorted), ["one", "two", "three"]);
    }

    #[test]
    fn external_dependencies_are_ignored() {
        let modules = vec![
            ReactorModule::new("app", ["lib", "junit:junit"]),
            ReactorModule::new("lib", ["org.slf4j:slf4j-api"]),
        ];
        let sorted = sort(&modules).unwrap();
        assert_eq!(ids(&sorted), ["lib", "app"]);
    }

    #[test]
    fn diamond_respects_all_edges() {
        let modules = vec![
            ReactorModule::new("top", ["left", "right"]),
            ReactorModule::new("left", ["base"]),
            ReactorModule::new("right", ["base"]),
            ReactorModule::new("base", []),
        ];
        let sorted = sort(&modules).unwrap();
        assert_eq!(ids(&sorted), ["base", "left", "right", "top"]);
    }

    #[test]
    fn cycle_is_reported_with_participants() {
        let modules = vec![
            ReactorModule::new("a", ["b"]),
            ReactorModule::new("b", ["c"]),
            ReactorModule::new("c", ["a"]),
        ];
        match sort(&modules) {
            Err(ReactorError::Cycle(cycle)) => {
                assert_eq!(cycle.first(), cycle.last());
                for id in ["a", "b", "c"] {
                    assert!(cycle.iter().any(|c| c == id), "{id} missing from {cycle:?}");
                }
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_id_is_its_own_error() {
        let modules = vec![
            ReactorModule::new("dup", []),
            ReactorModule::new("dup", ["x"]),
        ];
        assert_eq!(
            sort(&modules),
            Err(ReactorError::DuplicateId("dup".to_string()))
        );
    }
}
