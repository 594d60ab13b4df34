// SPDX-License-Identifier: Apache-2.0

//! Traversal helpers. All walks are worklist-based (no recursion) and carry
//! their visited sets locally, so nothing is ever stamped on shared nodes.

use std::collections::HashSet;

use crate::aig::graph::{Aig, AigNode, NodeId};

/// The fan-in cone of a root, cut off at a caller-chosen boundary.
#[derive(Debug, Clone, Default)]
pub struct Cone {
    /// AND nodes of the cone in postorder (fanins before users, root last).
    pub gates: Vec<NodeId>,
    /// Boundary nodes actually reached from the root.
    pub boundary_hit: HashSet<NodeId>,
    /// Terminal nodes (inputs or the constant) reached that are NOT in the
    /// boundary; nonempty means the boundary did not cover the cone.
    pub escaped: Vec<NodeId>,
}

/// Walks the cone under `root`, treating `boundary` members as leaves.
pub fn cone_postorder(aig: &Aig, root: NodeId, boundary: &HashSet<NodeId>) -> Cone {
    let mut worklist: Vec<NodeId> = vec![root];
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut cone = Cone::default();
    while let Some(current) = worklist.pop() {
        if visited.contains(&current) {
            continue;
        }
        if boundary.contains(&current) {
            visited.insert(current);
            cone.boundary_hit.insert(current);
            continue;
        }
        match aig.node(current) {
            AigNode::And { f0, f1 } => {
                let deps = [f0.node(), f1.node()];
                let mut all_deps_visited = true;
                for dep in deps {
                    if !visited.contains(&dep) {
                        worklist.push(current); // Revisit after dependencies
                        worklist.push(dep);
                        all_deps_visited = false;
                        break;
                    }
                }
                if all_deps_visited {
                    visited.insert(current);
                    cone.gates.push(current);
                }
            }
            _ => {
                visited.insert(current);
                cone.escaped.push(current);
            }
        }
    }
    cone
}

/// All nodes reachable downward from `starts`, the starts included.
pub fn reachable(aig: &Aig, starts: impl IntoIterator<Item = NodeId>) -> HashSet<NodeId> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut worklist: Vec<NodeId> = starts.into_iter().collect();
    while let Some(current) = worklist.pop() {
        if !visited.insert(current) {
            continue;
        }
        if let Some((f0, f1)) = aig.fanins(current) {
            worklist.push(f0.node());
            worklist.push(f1.node());
        }
    }
    visited
}

/// Combinational inputs in the transitive fan-in of `root`, in the graph's
/// input order.
pub fn support_inputs(aig: &Aig, root: NodeId) -> Vec<NodeId> {
    let seen = reachable(aig, [root]);
    aig.inputs().iter().copied().filter(|n| seen.contains(n)).collect()
}
