// SPDX-License-Identifier: Apache-2.0

//! Summary statistics for a graph, serializable for tool output.

use serde::Serialize;

use crate::aig::graph::{Aig, AigNode, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryStats {
    pub inputs: usize,
    pub latches: usize,
    pub outputs: usize,
    pub ands: usize,
    /// Longest AND-gate path from any combinational input to any output or
    /// latch next-state driver.
    pub levels: usize,
}

pub fn summarize(aig: &Aig) -> SummaryStats {
    let depths = node_depths(aig);
    let mut levels = 0usize;
    for &o in aig.outputs() {
        levels = levels.max(depths[o.node().index()] as usize);
    }
    for k in 0..aig.latch_count() {
        levels = levels.max(depths[aig.next_state(k).node().index()] as usize);
    }
    SummaryStats {
        inputs: aig.pi_count(),
        latches: aig.latch_count(),
        outputs: aig.output_count(),
        ands: aig.and_count(),
        levels,
    }
}

/// AND-depth per node: zero for the constant and inputs, `1 + max(fanins)`
/// for gates. One forward pass; creation order is topological.
pub fn node_depths(aig: &Aig) -> Vec<u32> {
    let mut depths = vec![0u32; aig.node_count()];
    for i in 0..aig.node_count() {
        if let AigNode::And { f0, f1 } = *aig.node(NodeId(i as u32)) {
            let d0 = depths[f0.node().index()];
            let d1 = depths[f1.node().index()];
            depths[i] = 1 + d0.max(d1);
        }
    }
    depths
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn counts_and_levels() {
        let mut g = Aig::new();
        let a = g.add_input();
        let b = g.add_input();
        let c = g.add_input();
        let ab = g.add_and(g.lit(a, false), g.lit(b, false));
        let abc = g.add_and(g.lit(ab, false), g.lit(c, false));
        g.add_output(g.lit(abc, true));
        let stats = summarize(&g);
        assert_eq!(
            stats,
            SummaryStats { inputs: 3, latches: 0, outputs: 1, ands: 2, levels: 2 }
        );
    }

    #[test]
    fn constant_output_has_level_zero() {
        let mut g = Aig::new();
        g.add_input();
        g.add_output(crate::aig::graph::Lit::TRUE);
        assert_eq!(summarize(&g).levels, 0);
    }
}
