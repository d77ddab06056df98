// src/registry/order.rs

//! Deterministic module load order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::errors::{ModbuildError, Result};
use crate::registry::descriptor::ModuleDescriptor;

/// Drop modules whose dependencies were not discovered, transitively.
///
/// Returns the surviving modules (input order preserved) and a
/// `(module, reason)` pair for each dropped one.
pub fn drop_unresolved(
    mut modules: Vec<ModuleDescriptor>,
) -> (Vec<ModuleDescriptor>, Vec<(String, String)>) {
    let mut dropped = Vec::new();

    loop {
        let known: HashSet<String> = modules.iter().map(|m| m.name.clone()).collect();
        let (keep, removed): (Vec<_>, Vec<_>) = modules
            .into_iter()
            .partition(|m| m.dependencies.iter().all(|d| known.contains(d)));
        modules = keep;

        if removed.is_empty() {
            break;
        }
        for module in removed {
            let missing: Vec<&str> = module
                .dependencies
                .iter()
                .filter(|d| !known.contains(*d))
                .map(String::as_str)
                .collect();
            dropped.push((
                module.name.clone(),
                format!("unresolved dependencies: {}", missing.join(", ")),
            ));
        }
    }

    (modules, dropped)
}

/// Sort modules into load order.
///
/// Dependencies always load before their dependents. Among modules that are
/// ready at the same time, those pinned in `pinned` win (in pinned order),
/// then lower `priority`, then name. The result depends only on the module
/// set, never on the order of `modules`.
///
/// Every dependency must be one of `modules` (see [`drop_unresolved`]);
/// otherwise a `Discovery` error names the first offending module.
pub fn load_order(
    modules: Vec<ModuleDescriptor>,
    pinned: &[String],
) -> Result<Vec<ModuleDescriptor>> {
    let known: HashSet<&str> = modules.iter().map(|m| m.name.as_str()).collect();
    for module in modules.iter() {
        if let Some(dep) = module.dependencies.iter().find(|d| !known.contains(d.as_str())) {
            return Err(ModbuildError::Discovery {
                module: module.name.clone(),
                reason: format!("unknown dependency '{dep}'"),
            });
        }
    }

    for name in pinned {
        if !modules.iter().any(|m| &m.name == name) {
            warn!(module = %name, "module listed in load_order was not discovered");
        }
    }

    let position = topo_positions(&modules, pinned)?;

    let mut modules = modules;
    modules.sort_by_key(|m| position[&m.name]);
    Ok(modules)
}

/// Kahn's algorithm with a rank-ordered ready set.
fn topo_positions(
    modules: &[ModuleDescriptor],
    pinned: &[String],
) -> Result<HashMap<String, usize>> {
    let rank = |m: &ModuleDescriptor| {
        let pin = pinned
            .iter()
            .position(|p| p == &m.name)
            .unwrap_or(usize::MAX);
        (pin, m.priority, m.name.clone())
    };

    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for module in modules.iter() {
        graph.add_node(module.name.as_str());
    }
    for module in modules.iter() {
        for dep in module.dependencies.iter() {
            graph.add_edge(dep.as_str(), module.name.as_str(), ());
        }
    }

    let by_name: HashMap<&str, &ModuleDescriptor> =
        modules.iter().map(|m| (m.name.as_str(), m)).collect();

    let mut in_degree: HashMap<&str, usize> = graph
        .nodes()
        .map(|n| (n, graph.neighbors_directed(n, Direction::Incoming).count()))
        .collect();

    let mut ready = BinaryHeap::new();
    for (name, degree) in in_degree.iter() {
        if *degree == 0 {
            ready.push(Reverse((rank(by_name[name]), *name)));
        }
    }

    let mut ordered: Vec<&str> = Vec::with_capacity(modules.len());
    while let Some(Reverse((_, name))) = ready.pop() {
        ordered.push(name);
        for next in graph.neighbors_directed(name, Direction::Outgoing) {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse((rank(by_name[next]), next)));
                }
            }
        }
    }

    if ordered.len() < modules.len() {
        let placed: HashSet<&str> = ordered.iter().copied().collect();
        let mut stuck: Vec<String> = modules
            .iter()
            .filter(|m| !placed.contains(m.name.as_str()))
            .map(|m| m.name.clone())
            .collect();
        stuck.sort();
        return Err(ModbuildError::ModuleCycle(stuck));
    }

    Ok(ordered
        .iter()
        .enumerate()
        .map(|(i, n)| (n.to_string(), i))
        .collect())
}
