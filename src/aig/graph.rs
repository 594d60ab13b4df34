// SPDX-License-Identifier: Apache-2.0

//! And-Inverter Graph container.
//!
//! Nodes are append-only: index 0 is the constant-false node, inputs and AND
//! gates follow in creation order. Because an AND's fanins must already exist
//! when it is created, node-index order is always a valid topological order.
//!
//! A `Lit` is the AIGER-style packed literal `2 * node_index + complement`.
//! `Lit(0)` is constant false, `Lit(1)` constant true.

use std::collections::BTreeMap;

/// Index of a node in an [`Aig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Packed literal: `2 * node_index + complement_bit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lit(u32);

impl Lit {
    /// Constant false literal (node 0, uncomplemented).
    pub const FALSE: Lit = Lit(0);
    /// Constant true literal (node 0, complemented).
    pub const TRUE: Lit = Lit(1);

    pub fn new(node: NodeId, complement: bool) -> Self {
        Lit(node.0 * 2 + complement as u32)
    }

    /// Reconstructs a literal from its raw AIGER encoding.
    pub fn from_raw(raw: u32) -> Self {
        Lit(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn node(&self) -> NodeId {
        NodeId(self.0 >> 1)
    }

    pub fn is_complement(&self) -> bool {
        self.0 & 1 != 0
    }

    pub fn negate(&self) -> Lit {
        Lit(self.0 ^ 1)
    }

    /// Same node, complement bit cleared.
    pub fn regular(&self) -> Lit {
        Lit(self.0 & !1)
    }

    pub fn is_const(&self) -> bool {
        self.0 <= 1
    }
}

impl std::ops::Not for Lit {
    type Output = Lit;
    fn not(self) -> Lit {
        self.negate()
    }
}

impl std::fmt::Display for Lit {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AigNode {
    /// The constant-false node; always at index 0.
    Const0,
    /// A combinational input (primary input or latch output).
    Input,
    /// Two-input AND gate; invariant: `f0.raw() <= f1.raw()`.
    And { f0: Lit, f1: Lit },
}

/// One node's membership in a proved/candidate equivalence class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquivEntry {
    /// Class representative; strictly smaller node index than the member.
    pub repr: NodeId,
    pub proved: bool,
}

/// Side table mapping nodes to equivalence-class representatives.
///
/// The representative of a class is always the smallest node index in it and
/// carries no entry of its own.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EquivTable {
    entries: Vec<Option<EquivEntry>>,
}

impl EquivTable {
    pub fn new(node_count: usize) -> Self {
        EquivTable { entries: vec![None; node_count] }
    }

    /// Records `member` as equivalent to `repr`. Fails unless `repr < member`.
    pub fn set(&mut self, member: NodeId, repr: NodeId, proved: bool) -> Result<(), String> {
        if repr >= member {
            return Err(format!(
                "equivalence representative {} not below member {}",
                repr.0, member.0
            ));
        }
        if member.index() >= self.entries.len() {
            self.entries.resize(member.index() + 1, None);
        }
        self.entries[member.index()] = Some(EquivEntry { repr, proved });
        Ok(())
    }

    pub fn get(&self, node: NodeId) -> Option<EquivEntry> {
        self.entries.get(node.index()).copied().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.is_none())
    }

    /// Number of member entries (representatives are not counted).
    pub fn member_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, EquivEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.map(|entry| (NodeId(i as u32), entry)))
    }

    /// Groups members under their representative, both sides sorted ascending.
    pub fn classes(&self) -> BTreeMap<NodeId, Vec<NodeId>> {
        let mut map: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for (member, entry) in self.iter() {
            map.entry(entry.repr).or_default().push(member);
        }
        map
    }
}

/// Append-only AIG with latch, output, and auxiliary side data.
#[derive(Debug, Clone, PartialEq)]
pub struct Aig {
    nodes: Vec<AigNode>,
    /// Combinational inputs in creation order: primary inputs first, then the
    /// `latch_count` trailing latch outputs.
    inputs: Vec<NodeId>,
    latch_count: usize,
    /// Next-state driver per latch; parallel to the trailing inputs.
    latch_next: Vec<Lit>,
    outputs: Vec<Lit>,
    num_ands: usize,
    name: Option<String>,
    equiv: Option<EquivTable>,
    constraint_count: u32,
}

impl Default for Aig {
    fn default() -> Self {
        Self::new()
    }
}

impl Aig {
    pub fn new() -> Self {
        Aig {
            nodes: vec![AigNode::Const0],
            inputs: Vec::new(),
            latch_count: 0,
            latch_next: Vec::new(),
            outputs: Vec::new(),
            num_ands: 0,
            name: None,
            equiv: None,
            constraint_count: 0,
        }
    }

    pub fn with_capacity(node_hint: usize) -> Self {
        let mut aig = Self::new();
        aig.nodes.reserve(node_hint);
        aig
    }

    pub fn add_input(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(AigNode::Input);
        self.inputs.push(id);
        id
    }

    /// Appends an AND gate. Fanins are stored with `f0 <= f1`.
    pub fn add_and(&mut self, f0: Lit, f1: Lit) -> NodeId {
        assert!(
            f0.node().index() < self.nodes.len() && f1.node().index() < self.nodes.len(),
            "AND fanin references a node that does not exist yet"
        );
        let (f0, f1) = if f0.raw() <= f1.raw() { (f0, f1) } else { (f1, f0) };
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(AigNode::And { f0, f1 });
        self.num_ands += 1;
        id
    }

    /// Appends a combinational output and returns its index.
    pub fn add_output(&mut self, driver: Lit) -> usize {
        assert!(driver.node().index() < self.nodes.len());
        self.outputs.push(driver);
        self.outputs.len() - 1
    }

    /// Overwrites an output's driver (used to sever recorded instances).
    pub fn set_output(&mut self, index: usize, driver: Lit) {
        assert!(driver.node().index() < self.nodes.len());
        self.outputs[index] = driver;
    }

    /// Declares the last `count` inputs to be latch outputs.
    pub fn set_latch_count(&mut self, count: usize) {
        assert!(count <= self.inputs.len());
        self.latch_count = count;
        self.latch_next.resize(count, Lit::FALSE);
    }

    pub fn set_next_state(&mut self, latch: usize, driver: Lit) {
        assert!(driver.node().index() < self.nodes.len());
        self.latch_next[latch] = driver;
    }

    pub fn next_state(&self, latch: usize) -> Lit {
        self.latch_next[latch]
    }

    pub fn node(&self, id: NodeId) -> &AigNode {
        &self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// AIGER `M`: the largest variable index, i.e. node count minus the constant.
    pub fn max_var(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Primary inputs only (latch outputs excluded).
    pub fn pi_count(&self) -> usize {
        self.inputs.len() - self.latch_count
    }

    pub fn latch_count(&self) -> usize {
        self.latch_count
    }

    /// All combinational inputs: primary inputs then latch outputs.
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn input(&self, k: usize) -> NodeId {
        self.inputs[k]
    }

    pub fn outputs(&self) -> &[Lit] {
        &self.outputs
    }

    pub fn output(&self, k: usize) -> Lit {
        self.outputs[k]
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn and_count(&self) -> usize {
        self.num_ands
    }

    pub fn is_and(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.index()], AigNode::And { .. })
    }

    pub fn is_input(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.index()], AigNode::Input)
    }

    pub fn fanins(&self, id: NodeId) -> Option<(Lit, Lit)> {
        match self.nodes[id.index()] {
            AigNode::And { f0, f1 } => Some((f0, f1)),
            _ => None,
        }
    }

    pub fn lit(&self, id: NodeId, complement: bool) -> Lit {
        debug_assert!(id.index() < self.nodes.len());
        Lit::new(id, complement)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn equiv(&self) -> Option<&EquivTable> {
        self.equiv.as_ref()
    }

    pub fn set_equiv(&mut self, equiv: Option<EquivTable>) {
        self.equiv = equiv;
    }

    pub fn constraint_count(&self) -> u32 {
        self.constraint_count
    }

    pub fn set_constraint_count(&mut self, count: u32) {
        self.constraint_count = count;
    }

    /// Iterates AND node ids in creation (topological) order.
    pub fn and_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| match n {
            AigNode::And { .. } => Some(NodeId(i as u32)),
            _ => None,
        })
    }
}
