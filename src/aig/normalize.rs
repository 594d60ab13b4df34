// SPDX-License-Identifier: Apache-2.0

//! Writer-layout normalization.
//!
//! The binary AIGER body requires the node table to be laid out as
//! `[constant, inputs/latches, AND gates]` with every gate's fanins strictly
//! below it. Graphs built through [`Aig::add_input`]/[`Aig::add_and`] are
//! already topological, but inputs created after gates break the contiguous
//! layout; `normalize` rebuilds such graphs into the required shape.

use crate::aig::graph::{Aig, AigNode, EquivTable, Lit, NodeId};

/// True when the node table is `[const, inputs.., ands..]` with the graph's
/// input list matching the table positions.
pub fn is_normalized(aig: &Aig) -> bool {
    let n_inputs = aig.inputs().len();
    for (k, id) in aig.inputs().iter().enumerate() {
        if id.index() != k + 1 {
            return false;
        }
    }
    for i in n_inputs + 1..aig.node_count() {
        match aig.node(NodeId(i as u32)) {
            AigNode::And { .. } => {}
            _ => return false,
        }
    }
    true
}

/// Rebuilds `aig` in normalized layout, preserving input order, gate relative
/// order, outputs, latches, and side data.
pub fn normalize(aig: &Aig) -> Aig {
    let mut out = Aig::with_capacity(aig.node_count());
    let mut node_map: Vec<Option<NodeId>> = vec![None; aig.node_count()];
    node_map[0] = Some(NodeId(0));
    for id in aig.inputs() {
        node_map[id.index()] = Some(out.add_input());
    }
    out.set_latch_count(aig.latch_count());
    let map_lit = |node_map: &[Option<NodeId>], lit: Lit| -> Lit {
        // Creation order is topological, so the fanin is always mapped.
        let mapped = node_map[lit.node().index()]
            .unwrap_or_else(|| panic!("normalize: unmapped fanin node {}", lit.node().0));
        Lit::new(mapped, lit.is_complement())
    };
    for i in 0..aig.node_count() {
        let id = NodeId(i as u32);
        if let AigNode::And { f0, f1 } = *aig.node(id) {
            let nf0 = map_lit(&node_map, f0);
            let nf1 = map_lit(&node_map, f1);
            node_map[i] = Some(out.add_and(nf0, nf1));
        }
    }
    for k in 0..aig.output_count() {
        let driver = map_lit(&node_map, aig.output(k));
        out.add_output(driver);
    }
    for k in 0..aig.latch_count() {
        let driver = map_lit(&node_map, aig.next_state(k));
        out.set_next_state(k, driver);
    }
    out.set_name(aig.name().map(str::to_owned));
    out.set_constraint_count(aig.constraint_count());
    if let Some(equiv) = aig.equiv() {
        out.set_equiv(Some(remap_equiv(equiv, &node_map)));
    }
    out
}

/// Remaps an equivalence table across a node renumbering. Renumbering can
/// reorder a class's smallest index, so classes are regrouped around the new
/// minimum; a displaced representative's fresh member edge is marked proved
/// only when the whole class was proved.
fn remap_equiv(equiv: &EquivTable, node_map: &[Option<NodeId>]) -> EquivTable {
    let mut out = EquivTable::new(node_map.len());
    for (old_repr, members) in equiv.classes() {
        let mapped_repr = match node_map.get(old_repr.index()).copied().flatten() {
            Some(id) => id,
            None => continue,
        };
        let mut mapped: Vec<(NodeId, bool)> = vec![(mapped_repr, true)];
        let mut all_proved = true;
        for member in members {
            let entry = match equiv.get(member) {
                Some(e) => e,
                None => continue,
            };
            if let Some(id) = node_map.get(member.index()).copied().flatten() {
                mapped.push((id, entry.proved));
                all_proved &= entry.proved;
            }
        }
        if mapped.len() < 2 {
            continue;
        }
        mapped.sort_by_key(|(id, _)| *id);
        let new_repr = mapped[0].0;
        for &(member, proved) in &mapped[1..] {
            let proved = if member == mapped_repr { all_proved } else { proved };
            // `mapped` is sorted and deduplicated by construction, so this
            // cannot fail; a failure would indicate a remap bug.
            if let Err(e) = out.set(member, new_repr, proved) {
                panic!("normalize: equivalence remap produced invalid class: {}", e);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::sim::eval;
    use pretty_assertions::assert_eq;

    #[test]
    fn built_in_order_is_normalized() {
        let mut g = Aig::new();
        let a = g.add_input();
        let b = g.add_input();
        let n = g.add_and(g.lit(a, false), g.lit(b, false));
        g.add_output(g.lit(n, false));
        assert!(is_normalized(&g));
    }

    #[test]
    fn late_input_breaks_layout_and_normalize_repairs_it() {
        let mut g = Aig::new();
        let a = g.add_input();
        let b = g.add_input();
        let n = g.add_and(g.lit(a, false), g.lit(b, false));
        let c = g.add_input();
        let m = g.add_and(g.lit(n, true), g.lit(c, false));
        g.add_output(g.lit(m, false));
        assert!(!is_normalized(&g));

        let fixed = normalize(&g);
        assert!(is_normalized(&fixed));
        assert_eq!(fixed.pi_count(), 3);
        assert_eq!(fixed.and_count(), 2);
        for bits in 0u32..8 {
            let vals: Vec<bool> = (0..3).map(|k| bits & (1 << k) != 0).collect();
            assert_eq!(eval(&fixed, &vals), eval(&g, &vals), "bits={:03b}", bits);
        }
    }

    #[test]
    fn normalize_carries_side_data() {
        let mut g = Aig::new();
        let a = g.add_input();
        let b = g.add_input();
        let n = g.add_and(g.lit(a, false), g.lit(b, false));
        let m = g.add_and(g.lit(a, false), g.lit(b, true));
        g.add_output(g.lit(m, false));
        g.set_name(Some("carried".to_string()));
        g.set_constraint_count(2);
        let mut eq = EquivTable::new(g.node_count());
        eq.set(m, n, true).unwrap();
        g.set_equiv(Some(eq));

        let fixed = normalize(&g);
        assert_eq!(fixed.name(), Some("carried"));
        assert_eq!(fixed.constraint_count(), 2);
        let eq2 = fixed.equiv().unwrap();
        assert_eq!(eq2.member_count(), 1);
        assert_eq!(eq2.get(NodeId(4)).map(|e| (e.repr, e.proved)), Some((NodeId(3), true)));
    }
}
