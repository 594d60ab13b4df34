// SPDX-License-Identifier: Apache-2.0

//! Reachability sweep: rebuilds a graph keeping only the logic feeding a
//! selected subset of outputs, returning the old-to-new remaps the caller
//! needs to fix up its own references.
//!
//! Inputs and latches are always preserved (positions included), so the
//! sweep never changes the interface of the graph, only its interior.

use crate::aig::graph::{Aig, AigNode, EquivTable, Lit, NodeId};
use crate::aig::topo;

#[derive(Debug, Clone)]
pub struct SweepResult {
    pub aig: Aig,
    /// Old node index to new id; `None` for swept nodes.
    pub node_map: Vec<Option<NodeId>>,
    /// Old output index to new index; `None` for dropped outputs.
    pub output_map: Vec<Option<usize>>,
}

/// Keeps the outputs with `keep_output[k]` set (plus every latch next-state
/// cone) and sweeps all unreachable AND gates.
pub fn sweep_outputs(aig: &Aig, keep_output: &[bool]) -> SweepResult {
    assert_eq!(keep_output.len(), aig.output_count());
    let mut roots: Vec<NodeId> = Vec::new();
    for (k, &keep) in keep_output.iter().enumerate() {
        if keep {
            roots.push(aig.output(k).node());
        }
    }
    for k in 0..aig.latch_count() {
        roots.push(aig.next_state(k).node());
    }
    let live = topo::reachable(aig, roots);

    let mut out = Aig::with_capacity(aig.node_count());
    let mut node_map: Vec<Option<NodeId>> = vec![None; aig.node_count()];
    node_map[0] = Some(NodeId(0));
    for id in aig.inputs() {
        node_map[id.index()] = Some(out.add_input());
    }
    out.set_latch_count(aig.latch_count());
    for i in 0..aig.node_count() {
        let id = NodeId(i as u32);
        if !live.contains(&id) {
            continue;
        }
        if let AigNode::And { f0, f1 } = *aig.node(id) {
            let nf0 = remap_lit(&node_map, f0);
            let nf1 = remap_lit(&node_map, f1);
            node_map[i] = Some(out.add_and(nf0, nf1));
        }
    }
    let mut output_map: Vec<Option<usize>> = vec![None; aig.output_count()];
    for (k, &keep) in keep_output.iter().enumerate() {
        if keep {
            let driver = remap_lit(&node_map, aig.output(k));
            output_map[k] = Some(out.add_output(driver));
        }
    }
    for k in 0..aig.latch_count() {
        let driver = remap_lit(&node_map, aig.next_state(k));
        out.set_next_state(k, driver);
    }
    out.set_name(aig.name().map(str::to_owned));
    out.set_constraint_count(aig.constraint_count());
    if let Some(equiv) = aig.equiv() {
        out.set_equiv(filter_equiv(equiv, &node_map));
    }
    SweepResult { aig: out, node_map, output_map }
}

fn remap_lit(node_map: &[Option<NodeId>], lit: Lit) -> Lit {
    let mapped = node_map[lit.node().index()]
        .unwrap_or_else(|| panic!("sweep: live literal {} references swept node", lit.raw()));
    Lit::new(mapped, lit.is_complement())
}

/// Drops equivalence entries whose member or representative was swept.
fn filter_equiv(equiv: &EquivTable, node_map: &[Option<NodeId>]) -> Option<EquivTable> {
    let mut out = EquivTable::new(node_map.len());
    let mut kept = 0usize;
    for (member, entry) in equiv.iter() {
        let new_member = node_map.get(member.index()).copied().flatten();
        let new_repr = node_map.get(entry.repr.index()).copied().flatten();
        if let (Some(m), Some(r)) = (new_member, new_repr) {
            // Input/gate relative order is preserved by the rebuild, so the
            // repr-below-member invariant survives remapping.
            if out.set(m, r, entry.proved).is_ok() {
                kept += 1;
            }
        }
    }
    if kept == 0 { None } else { Some(out) }
}
