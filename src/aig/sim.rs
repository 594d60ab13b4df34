// SPDX-License-Identifier: Apache-2.0

//! Single-pattern evaluation, used as the correctness oracle in tests and for
//! spot-checking rebuilt subgraphs.

use crate::aig::graph::{Aig, AigNode, Lit, NodeId};

/// Value of a literal given per-node values.
pub fn lit_value(values: &[bool], lit: Lit) -> bool {
    values[lit.node().index()] ^ lit.is_complement()
}

/// Evaluates every node for one assignment of the combinational inputs
/// (primary inputs then latch outputs, in graph input order).
pub fn eval_nodes(aig: &Aig, inputs: &[bool]) -> Vec<bool> {
    assert_eq!(inputs.len(), aig.inputs().len(), "one value per combinational input");
    let mut values = vec![false; aig.node_count()];
    for (k, node) in aig.inputs().iter().enumerate() {
        values[node.index()] = inputs[k];
    }
    // Creation order is topological, so one forward pass suffices.
    for i in 0..aig.node_count() {
        if let AigNode::And { f0, f1 } = *aig.node(NodeId(i as u32)) {
            values[i] = lit_value(&values, f0) && lit_value(&values, f1);
        }
    }
    values
}

/// Evaluates all combinational outputs for one input assignment.
pub fn eval(aig: &Aig, inputs: &[bool]) -> Vec<bool> {
    let values = eval_nodes(aig, inputs);
    aig.outputs().iter().map(|&o| lit_value(&values, o)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn evaluates_and_of_two_inputs() {
        let mut g = Aig::new();
        let a = g.add_input();
        let b = g.add_input();
        let n = g.add_and(g.lit(a, false), g.lit(b, false));
        g.add_output(g.lit(n, false));
        g.add_output(g.lit(n, true));
        assert_eq!(eval(&g, &[false, false]), vec![false, true]);
        assert_eq!(eval(&g, &[true, false]), vec![false, true]);
        assert_eq!(eval(&g, &[false, true]), vec![false, true]);
        assert_eq!(eval(&g, &[true, true]), vec![true, false]);
    }

    #[test]
    fn constant_outputs() {
        let mut g = Aig::new();
        g.add_input();
        g.add_output(Lit::TRUE);
        g.add_output(Lit::FALSE);
        assert_eq!(eval(&g, &[true]), vec![true, false]);
    }

    #[test]
    fn majority3() {
        let mut g = Aig::new();
        let a = g.add_input();
        let b = g.add_input();
        let c = g.add_input();
        let (la, lb, lc) = (g.lit(a, false), g.lit(b, false), g.lit(c, false));
        let ab = Lit::new(g.add_and(la, lb), false);
        let ac = Lit::new(g.add_and(la, lc), false);
        let bc = Lit::new(g.add_and(lb, lc), false);
        // maj = !(!(ab) & !(ac)) | bc, folded into ANDs.
        let nor_ab_ac = g.add_and(!ab, !ac);
        let n = g.add_and(g.lit(nor_ab_ac, false), !bc);
        g.add_output(g.lit(n, true));
        for bits in 0u32..8 {
            let va = bits & 1 != 0;
            let vb = bits & 2 != 0;
            let vc = bits & 4 != 0;
            let want = (va as u8 + vb as u8 + vc as u8) >= 2;
            assert_eq!(eval(&g, &[va, vb, vc]), vec![want], "bits={:03b}", bits);
        }
    }
}
