// SPDX-License-Identifier: Apache-2.0

//! The recorded-subgraph library: a growable map from semi-canonical truth
//! tables to the best known small AIG realizations of those functions.
//!
//! The library owns its graph. Every accepted cut is rebuilt over the
//! library's fixed primary inputs under the canonical variable labeling,
//! through a structural hasher so shared shapes collapse, and is pinned by a
//! combinational output so it stays alive until a better realization evicts
//! it. Classes live in a stable arena indexed by an open-chained hash table
//! over the truth words; instance chains are kept pairwise incomparable by
//! the dominance logic in [`crate::record::dominance`].
//!
//! All operations are single-threaded; the caller serializes access.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;

use log::debug;
use serde::Serialize;

use crate::aig::dce;
use crate::aig::graph::{Aig, AigNode, Lit, NodeId};
use crate::aig::strash::{Strash, StrashOptions};
use crate::aig::topo;
use crate::record::dominance::{self, DelayCost, InsertOutcome, UNREACHABLE, clamp_delay};
use crate::record::truth::{MAX_VARS, Truth};

const INITIAL_BUCKETS: usize = 101;

const HASH_MULTIPLIERS: [u64; 8] = [
    12582917, 25165843, 50331653, 100663319, 201326611, 402653189, 805306457, 1610612741,
];

fn hash_truth(t: &Truth) -> u64 {
    let mut h = 0u64;
    for (k, w) in t.words().iter().enumerate() {
        h = h.wrapping_add(w.wrapping_mul(HASH_MULTIPLIERS[k % HASH_MULTIPLIERS.len()]));
    }
    h
}

fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

fn next_prime(mut n: usize) -> usize {
    loop {
        if is_prime(n) {
            return n;
        }
        n += 1;
    }
}

#[derive(Debug, Clone)]
pub struct RecParams {
    /// Library width: every class truth table is stretched to this many
    /// variables and every instance carries this many pin delays.
    pub nvars: usize,
    /// Advisory cut-enumeration bound for callers driving `add_cut`.
    pub ncuts_max: usize,
    /// Whether `filter` is permitted.
    pub trim: bool,
    /// Extra gate-count allowance per leaf count, on top of the base
    /// `leaves + 3 * (leaves - 1)` volume bound.
    pub size_slack: [u8; MAX_VARS + 1],
}

impl RecParams {
    pub fn new(nvars: usize) -> Self {
        RecParams { nvars, ncuts_max: 8, trim: false, size_slack: [0; MAX_VARS + 1] }
    }

    pub fn with_trim(mut self) -> Self {
        self.trim = true;
        self
    }

    fn validate(&self) -> Result<(), String> {
        if !(2..=MAX_VARS).contains(&self.nvars) {
            return Err(format!("nvars must be in 2..={}, got {}", MAX_VARS, self.nvars));
        }
        if self.ncuts_max == 0 {
            return Err("ncuts_max must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum RecError {
    InvalidParams(String),
    BadSeed(String),
    /// `filter` was called on a library built without trim mode.
    TrimDisabled,
    /// The library has been filtered and no longer accepts insertions.
    Filtered,
    /// An internal consistency check failed; scoped to one insertion, the
    /// library remains usable.
    Internal(String),
}

impl fmt::Display for RecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecError::InvalidParams(m) => write!(f, "invalid parameters: {}", m),
            RecError::BadSeed(m) => write!(f, "unusable seed graph: {}", m),
            RecError::TrimDisabled => write!(f, "filtering requires trim mode"),
            RecError::Filtered => write!(f, "library is filtered and closed to insertion"),
            RecError::Internal(m) => write!(f, "internal invariant violated: {}", m),
        }
    }
}

impl std::error::Error for RecError {}

/// Why a cut was not recorded. All of these are ordinary outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reject {
    /// Fewer than two leaves.
    Trivial,
    /// More leaves than the library width.
    TooWide,
    /// The cone under the root is not fully covered by the leaves.
    NotACut,
    /// Some leaf is computable from the rest of the cut.
    StructuralRedundancy,
    /// Too many gates for the leaf count.
    Volume,
    /// The root function does not depend on every leaf.
    VacuousSupport,
    /// An interior node equals an AND/OR of two earlier cone nodes.
    SubDecomposition,
    /// Identical structure already recorded.
    Duplicate,
    /// An existing instance is at least as good on every pin.
    Dominated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Rejected(Reject),
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct RecStats {
    pub cuts_tried: u64,
    pub added: u64,
    pub classes_created: u64,
    pub rejected_trivial: u64,
    pub rejected_too_wide: u64,
    pub rejected_not_a_cut: u64,
    pub rejected_structural: u64,
    pub rejected_volume: u64,
    pub rejected_support: u64,
    pub rejected_subdecomp: u64,
    pub rejected_duplicate: u64,
    pub rejected_dominated: u64,
    pub internal_errors: u64,
    pub lookup_hits: u64,
    pub lookup_misses: u64,
}

/// One recorded realization: a literal in the library graph plus its costs.
#[derive(Debug, Clone)]
pub struct Instance {
    root: Lit,
    out: usize,
    compl: bool,
    area: u8,
    delays: Vec<i8>,
}

impl Instance {
    /// Literal realizing the class function XOR [`Instance::is_complement`].
    pub fn root(&self) -> Lit {
        self.root
    }

    pub fn output_index(&self) -> usize {
        self.out
    }

    pub fn is_complement(&self) -> bool {
        self.compl
    }
}

impl DelayCost for Instance {
    fn delays(&self) -> &[i8] {
        &self.delays
    }
    fn area(&self) -> u8 {
        self.area
    }
}

#[derive(Debug)]
pub struct TruthClass {
    truth: Truth,
    freq: u32,
    instances: Vec<Instance>,
    next: Option<usize>,
}

impl TruthClass {
    pub fn truth(&self) -> &Truth {
        &self.truth
    }

    pub fn freq(&self) -> u32 {
        self.freq
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }
}

/// Winning realization returned by [`RecLibrary::lookup_best`].
#[derive(Debug, Clone)]
pub struct Match {
    /// Library literal computing the queried function once the inputs are
    /// wired per `perm`/`input_neg`.
    pub lit: Lit,
    /// Library input `k` corresponds to cut leaf `perm[k]`.
    pub perm: Vec<u8>,
    /// Bit `k` set means library input `k` takes the complemented leaf.
    pub input_neg: u16,
    pub delay: i8,
    pub area: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterOutcome {
    pub classes_removed: usize,
    pub instances_removed: usize,
    pub nodes_before: usize,
    pub nodes_after: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Active,
    Filtered,
}

#[derive(Debug)]
pub struct RecLibrary {
    params: RecParams,
    graph: Aig,
    strash: Strash,
    classes: Vec<TruthClass>,
    buckets: Vec<Option<usize>>,
    /// Refcount of live instances per root literal; backs the duplicate
    /// check in the insert pipeline.
    driven: HashMap<Lit, u32>,
    stats: RecStats,
    state: State,
}

/// A cut detached from its host graph: leaves become local indices
/// `0..nleaves`, gates reference leaves or earlier gates.
#[derive(Debug)]
struct CutCone {
    nleaves: usize,
    /// Topological order; each fanin is `(local index, complement)` where
    /// indices below `nleaves` are leaves and the rest are earlier gates.
    gates: Vec<((usize, bool), (usize, bool))>,
    root_compl: bool,
    /// Root function over the leaves, root complement folded in.
    truth: Truth,
}

impl RecLibrary {
    /// Builds a library: fresh graph with `params.nvars` inputs, the 2-input
    /// primitives recorded, and every output cone of `seed` (if given)
    /// offered to the insert pipeline.
    pub fn start(seed: Option<&Aig>, params: RecParams) -> Result<RecLibrary, RecError> {
        params.validate().map_err(RecError::InvalidParams)?;
        let mut lib = RecLibrary {
            graph: Aig::new(),
            strash: Strash::new(StrashOptions::opt()),
            classes: Vec::new(),
            buckets: vec![None; INITIAL_BUCKETS],
            driven: HashMap::new(),
            stats: RecStats::default(),
            state: State::Active,
            params,
        };
        for _ in 0..lib.params.nvars {
            lib.graph.add_input();
        }
        let seed_roots = match seed {
            Some(s) => lib.import_seed(s)?,
            None => Vec::new(),
        };
        lib.seed_primitives()?;
        for root in seed_roots {
            lib.record_root(root)?;
        }
        Ok(lib)
    }

    /// Copies the seed's logic into the library graph through the structural
    /// hasher; returns the mapped output literals.
    fn import_seed(&mut self, seed: &Aig) -> Result<Vec<Lit>, RecError> {
        if seed.latch_count() != 0 {
            return Err(RecError::BadSeed("seed graph has latches".to_string()));
        }
        if seed.pi_count() > self.params.nvars {
            return Err(RecError::BadSeed(format!(
                "seed has {} inputs, library width is {}",
                seed.pi_count(),
                self.params.nvars
            )));
        }
        let mut node_map: Vec<Lit> = Vec::with_capacity(seed.node_count());
        node_map.push(Lit::FALSE);
        let mut next_input = 0usize;
        for idx in 1..seed.node_count() {
            match seed.node(NodeId(idx as u32)) {
                AigNode::Input => {
                    node_map.push(self.graph.lit(self.graph.input(next_input), false));
                    next_input += 1;
                }
                AigNode::And { f0, f1 } => {
                    let a = map_lit(&node_map, *f0);
                    let b = map_lit(&node_map, *f1);
                    let lit = self.strash.and(&mut self.graph, a, b);
                    node_map.push(lit);
                }
                AigNode::Const0 => {
                    return Err(RecError::Internal("constant node beyond index 0".to_string()));
                }
            }
        }
        Ok(seed.outputs().iter().map(|o| map_lit(&node_map, *o)).collect())
    }

    /// Records one AND and one XOR over the first two inputs. Together with
    /// complement probing this guarantees every nontrivial 2-input function
    /// resolves at lookup time.
    fn seed_primitives(&mut self) -> Result<(), RecError> {
        let i0 = self.graph.lit(self.graph.input(0), false);
        let i1 = self.graph.lit(self.graph.input(1), false);
        let and_root = self.strash.and(&mut self.graph, i0, i1);
        self.record_root(and_root)?;
        let xor_root = self.strash.xor(&mut self.graph, i0, i1);
        self.record_root(xor_root)?;
        Ok(())
    }

    /// Offers a root inside the library's own graph to the insert pipeline,
    /// using its support inputs as the cut. Rejections are logged, not
    /// propagated.
    fn record_root(&mut self, root: Lit) -> Result<(), RecError> {
        if root.is_const() || !self.graph.is_and(root.node()) {
            debug!("seed root {} skipped: not a gate", root.raw());
            return Ok(());
        }
        let leaves = topo::support_inputs(&self.graph, root.node());
        let analyzed = analyze_cut(&self.graph, root, &leaves, self.volume_bound(leaves.len()));
        match self.insert_analyzed(analyzed)? {
            AddOutcome::Added => {}
            AddOutcome::Rejected(r) => debug!("seed root {} rejected: {:?}", root.raw(), r),
        }
        Ok(())
    }

    fn volume_bound(&self, nleaves: usize) -> usize {
        let slack = self.params.size_slack.get(nleaves).copied().unwrap_or(0) as usize;
        nleaves + 3 * (nleaves - 1) + slack
    }

    /// Insert-pipeline entry point for one candidate cut of `host`.
    pub fn add_cut(
        &mut self,
        host: &Aig,
        root: Lit,
        leaves: &[NodeId],
    ) -> Result<AddOutcome, RecError> {
        if self.state != State::Active {
            return Err(RecError::Filtered);
        }
        if leaves.len() > self.params.nvars {
            self.stats.cuts_tried += 1;
            let outcome = AddOutcome::Rejected(Reject::TooWide);
            self.bump_outcome(&outcome);
            return Ok(outcome);
        }
        let analyzed = analyze_cut(host, root, leaves, self.volume_bound(leaves.len()));
        self.insert_analyzed(analyzed)
    }

    fn insert_analyzed(
        &mut self,
        analyzed: Result<CutCone, Reject>,
    ) -> Result<AddOutcome, RecError> {
        self.stats.cuts_tried += 1;
        let outcome = match analyzed {
            Ok(cone) => match self.insert_cone(cone) {
                Ok(o) => o,
                Err(e) => {
                    self.stats.internal_errors += 1;
                    return Err(e);
                }
            },
            Err(r) => AddOutcome::Rejected(r),
        };
        self.bump_outcome(&outcome);
        Ok(outcome)
    }

    fn bump_outcome(&mut self, outcome: &AddOutcome) {
        let s = &mut self.stats;
        match outcome {
            AddOutcome::Added => s.added += 1,
            AddOutcome::Rejected(r) => match r {
                Reject::Trivial => s.rejected_trivial += 1,
                Reject::TooWide => s.rejected_too_wide += 1,
                Reject::NotACut => s.rejected_not_a_cut += 1,
                Reject::StructuralRedundancy => s.rejected_structural += 1,
                Reject::Volume => s.rejected_volume += 1,
                Reject::VacuousSupport => s.rejected_support += 1,
                Reject::SubDecomposition => s.rejected_subdecomp += 1,
                Reject::Duplicate => s.rejected_duplicate += 1,
                Reject::Dominated => s.rejected_dominated += 1,
            },
        }
    }

    /// Steps 4..10 of the pipeline: canonicize, rebuild, verify, cost, and
    /// place into the class chain.
    fn insert_cone(&mut self, cone: CutCone) -> Result<AddOutcome, RecError> {
        let nleaves = cone.nleaves;
        let (canon_small, xform) = cone.truth.semi_canonicize();
        let canon = canon_small.stretch(self.params.nvars);

        // Original leaf perm[k] maps to library input k, phase applied.
        let mut leaf_lits = vec![Lit::FALSE; nleaves];
        for k in 0..nleaves {
            let orig = xform.perm[k] as usize;
            leaf_lits[orig] = self.graph.lit(self.graph.input(k), xform.input_negated(k));
        }
        let nodes_before = self.graph.node_count();
        let mut gate_lits: Vec<Lit> = Vec::with_capacity(cone.gates.len());
        for &((i0, c0), (i1, c1)) in &cone.gates {
            let a = local_lit(&leaf_lits, &gate_lits, nleaves, i0, c0);
            let b = local_lit(&leaf_lits, &gate_lits, nleaves, i1, c1);
            gate_lits.push(self.strash.and(&mut self.graph, a, b));
        }
        let rebuilt = gate_lits[cone.gates.len() - 1];
        let rebuilt = if cone.root_compl { !rebuilt } else { rebuilt };
        let canon_root = if xform.out_neg { !rebuilt } else { rebuilt };
        if canon_root.is_const() {
            return Err(RecError::Internal("cut rebuilt to a constant".to_string()));
        }
        let created = self.graph.node_count() > nodes_before;
        if !created && self.driven.contains_key(&canon_root) {
            return Ok(AddOutcome::Rejected(Reject::Duplicate));
        }

        // Verify the rebuild realizes the canonical table before recording
        // anything. A mismatch is contained to this insertion.
        let mut boundary: HashSet<NodeId> = self.graph.inputs().iter().copied().collect();
        boundary.insert(NodeId(0));
        let lib_cone = topo::cone_postorder(&self.graph, canon_root.node(), &boundary);
        if !lib_cone.escaped.is_empty() {
            return Err(RecError::Internal("rebuilt cone escapes the library inputs".to_string()));
        }
        let realized = self.simulate_rebuilt(&lib_cone, canon_root, nleaves)?;
        if realized != canon_small {
            return Err(RecError::Internal(format!(
                "rebuilt literal {} does not realize its canonical table",
                canon_root.raw()
            )));
        }

        let area = lib_cone.gates.len().min(u8::MAX as usize) as u8;
        let mut delays = vec![UNREACHABLE; self.params.nvars];
        for (k, d) in delays.iter_mut().enumerate().take(nleaves) {
            *d = longest_path(&self.graph, &lib_cone, self.graph.input(k), canon_root.node());
        }

        let (class_id, compl) = match self.find_class(&canon) {
            Some(hit) => hit,
            None => (self.create_class(canon), false),
        };
        let out = self.graph.add_output(canon_root);
        let inst = Instance { root: canon_root, out, compl, area, delays };
        match dominance::insert_by_dominance(&mut self.classes[class_id].instances, inst) {
            InsertOutcome::Inserted { evicted } => {
                for e in &evicted {
                    self.release_instance(e);
                }
                *self.driven.entry(canon_root).or_insert(0) += 1;
                self.classes[class_id].freq += 1;
                debug_assert!(dominance::chain_is_pareto(&self.classes[class_id].instances));
                Ok(AddOutcome::Added)
            }
            InsertOutcome::Rejected(e) => {
                self.graph.set_output(e.out, Lit::FALSE);
                Ok(AddOutcome::Rejected(Reject::Dominated))
            }
        }
    }

    /// Truth table of `root` over the first `nleaves` library inputs.
    fn simulate_rebuilt(
        &self,
        cone: &topo::Cone,
        root: Lit,
        nleaves: usize,
    ) -> Result<Truth, RecError> {
        let mut tables: HashMap<NodeId, Truth> = HashMap::new();
        tables.insert(NodeId(0), Truth::const0(nleaves));
        for k in 0..nleaves {
            tables.insert(self.graph.input(k), Truth::elementary(nleaves, k));
        }
        for &g in &cone.gates {
            let (f0, f1) = self
                .graph
                .fanins(g)
                .ok_or_else(|| RecError::Internal("cone gate is not an AND".to_string()))?;
            let t0 = fanin_table(&tables, f0)?;
            let t1 = fanin_table(&tables, f1)?;
            tables.insert(g, t0.and(&t1));
        }
        let t = fanin_table(&tables, root)?;
        Ok(t)
    }

    fn probe(&self, t: &Truth) -> Option<usize> {
        let b = (hash_truth(t) % self.buckets.len() as u64) as usize;
        let mut cur = self.buckets[b];
        while let Some(id) = cur {
            if self.classes[id].truth == *t {
                return Some(id);
            }
            cur = self.classes[id].next;
        }
        None
    }

    /// Locates the class for a canonical table, trying the complement too;
    /// the flag says the match was through the complement.
    fn find_class(&self, canon: &Truth) -> Option<(usize, bool)> {
        if let Some(id) = self.probe(canon) {
            return Some((id, false));
        }
        self.probe(&canon.not()).map(|id| (id, true))
    }

    fn create_class(&mut self, truth: Truth) -> usize {
        let id = self.classes.len();
        let b = (hash_truth(&truth) % self.buckets.len() as u64) as usize;
        let next = self.buckets[b];
        self.classes.push(TruthClass { truth, freq: 0, instances: Vec::new(), next });
        self.buckets[b] = Some(id);
        self.stats.classes_created += 1;
        if self.classes.len() > 2 * self.buckets.len() {
            self.grow_buckets();
        }
        id
    }

    fn grow_buckets(&mut self) {
        let new_len = next_prime(self.buckets.len() * 2);
        debug!(
            "rec library rehash: {} classes, {} -> {} buckets",
            self.classes.len(),
            self.buckets.len(),
            new_len
        );
        self.buckets = vec![None; new_len];
        for id in 0..self.classes.len() {
            let b = (hash_truth(&self.classes[id].truth) % new_len as u64) as usize;
            self.classes[id].next = self.buckets[b];
            self.buckets[b] = Some(id);
        }
    }

    /// Severs an evicted instance's output and drops its driven refcount.
    fn release_instance(&mut self, inst: &Instance) {
        self.graph.set_output(inst.out, Lit::FALSE);
        if let Some(n) = self.driven.get_mut(&inst.root) {
            if *n <= 1 {
                self.driven.remove(&inst.root);
            } else {
                *n -= 1;
            }
        }
    }

    /// Finds the fastest recorded realization of `cut_truth` given the
    /// arrival time at each cut leaf. Ties break toward smaller area. Both
    /// polarities of the query are tried; the returned literal already
    /// accounts for the winning polarity.
    pub fn lookup_best(&mut self, cut_truth: &Truth, arrivals: &[i8]) -> Option<Match> {
        let nleaves = cut_truth.nvars();
        assert_eq!(arrivals.len(), nleaves, "one arrival per cut leaf");
        let mut best: Option<Match> = None;
        for polarity in [false, true] {
            let query = if polarity { cut_truth.not() } else { cut_truth.clone() };
            let (canon_small, xform) = query.semi_canonicize();
            let canon = canon_small.stretch(self.params.nvars);
            let (class_id, probe_compl) = match self.find_class(&canon) {
                Some(hit) => hit,
                None => continue,
            };
            for inst in &self.classes[class_id].instances {
                let mut delay: i32 = 0;
                let mut feasible = true;
                for k in 0..nleaves {
                    let d = inst.delays[k];
                    if d == UNREACHABLE {
                        feasible = false;
                        break;
                    }
                    delay = delay.max(d as i32 + arrivals[xform.perm[k] as usize] as i32);
                }
                if !feasible {
                    continue;
                }
                let delay = delay.min(i8::MAX as i32) as i8;
                let better = match &best {
                    None => true,
                    Some(b) => delay < b.delay || (delay == b.delay && inst.area < b.area),
                };
                if better {
                    let compl = polarity ^ xform.out_neg ^ probe_compl ^ inst.compl;
                    best = Some(Match {
                        lit: if compl { !inst.root } else { inst.root },
                        perm: xform.perm.clone(),
                        input_neg: xform.input_neg,
                        delay,
                        area: inst.area,
                    });
                }
            }
        }
        match &best {
            Some(_) => self.stats.lookup_hits += 1,
            None => self.stats.lookup_misses += 1,
        }
        best
    }

    /// Drops every class with frequency at or under `threshold`, severs the
    /// dropped instances, and compacts the graph. The library becomes
    /// lookup-only.
    pub fn filter(&mut self, threshold: u32) -> Result<FilterOutcome, RecError> {
        if !self.params.trim {
            return Err(RecError::TrimDisabled);
        }
        if self.state != State::Active {
            return Err(RecError::Filtered);
        }
        let mut keep_output = vec![false; self.graph.output_count()];
        let mut kept: Vec<TruthClass> = Vec::new();
        let mut classes_removed = 0usize;
        let mut instances_removed = 0usize;
        for class in std::mem::take(&mut self.classes) {
            if class.freq > threshold {
                for inst in &class.instances {
                    keep_output[inst.out] = true;
                }
                kept.push(class);
            } else {
                classes_removed += 1;
                instances_removed += class.instances.len();
                for inst in &class.instances {
                    self.release_instance(inst);
                }
            }
        }

        let nodes_before = self.graph.node_count();
        let swept = dce::sweep_outputs(&self.graph, &keep_output);
        for class in &mut kept {
            for inst in &mut class.instances {
                let node = swept.node_map[inst.root.node().index()]
                    .expect("kept instance root survives the sweep");
                inst.root = Lit::new(node, inst.root.is_complement());
                inst.out = swept.output_map[inst.out]
                    .expect("kept instance output survives the sweep");
            }
        }
        self.graph = swept.aig;
        self.strash = Strash::for_graph(&self.graph, StrashOptions::opt());
        self.driven.clear();
        for class in &kept {
            for inst in &class.instances {
                *self.driven.entry(inst.root).or_insert(0) += 1;
            }
        }
        self.classes = kept;
        let nbuckets = self.buckets.len();
        self.buckets = vec![None; nbuckets];
        for id in 0..self.classes.len() {
            let b = (hash_truth(&self.classes[id].truth) % nbuckets as u64) as usize;
            self.classes[id].next = self.buckets[b];
            self.buckets[b] = Some(id);
        }
        self.state = State::Filtered;
        debug!(
            "rec library filter: removed {} classes / {} instances, {} -> {} nodes",
            classes_removed,
            instances_removed,
            nodes_before,
            self.graph.node_count()
        );
        Ok(FilterOutcome {
            classes_removed,
            instances_removed,
            nodes_before,
            nodes_after: self.graph.node_count(),
        })
    }

    pub fn graph(&self) -> &Aig {
        &self.graph
    }

    pub fn params(&self) -> &RecParams {
        &self.params
    }

    pub fn stats(&self) -> &RecStats {
        &self.stats
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn classes(&self) -> impl Iterator<Item = &TruthClass> {
        self.classes.iter()
    }

    /// Human-readable listing of every class and instance.
    pub fn dump(&self, out: &mut dyn io::Write) -> io::Result<()> {
        writeln!(
            out,
            "rec library: {} vars, {} classes, {} graph nodes",
            self.params.nvars,
            self.classes.len(),
            self.graph.node_count()
        )?;
        for (id, class) in self.classes.iter().enumerate() {
            write!(out, "class {:>5}  freq {:>6}  truth ", id, class.freq)?;
            for w in class.truth.words().iter().rev() {
                write!(out, "{:016x}", w)?;
            }
            writeln!(out)?;
            for inst in &class.instances {
                write!(
                    out,
                    "  lit {:>8}{}  area {:>3}  delays",
                    inst.root.raw(),
                    if inst.compl { "'" } else { " " },
                    inst.area
                )?;
                for d in &inst.delays {
                    if *d == UNREACHABLE {
                        write!(out, "   -")?;
                    } else {
                        write!(out, " {:>3}", d)?;
                    }
                }
                writeln!(out)?;
            }
        }
        Ok(())
    }
}

fn map_lit(node_map: &[Lit], lit: Lit) -> Lit {
    let base = node_map[lit.node().index()];
    if lit.is_complement() { !base } else { base }
}

fn local_lit(leaf_lits: &[Lit], gate_lits: &[Lit], nleaves: usize, idx: usize, compl: bool) -> Lit {
    let base = if idx < nleaves { leaf_lits[idx] } else { gate_lits[idx - nleaves] };
    if compl { !base } else { base }
}

fn fanin_table(tables: &HashMap<NodeId, Truth>, lit: Lit) -> Result<Truth, RecError> {
    let t = tables.get(&lit.node()).ok_or_else(|| {
        RecError::Internal(format!("rebuilt cone references untabled node {}", lit.node().0))
    })?;
    Ok(if lit.is_complement() { t.not() } else { t.clone() })
}

/// Longest AND-hop path from `leaf` to `root` inside `cone`, or the
/// unreachable sentinel when no path exists.
fn longest_path(aig: &Aig, cone: &topo::Cone, leaf: NodeId, root: NodeId) -> i8 {
    let mut dist: HashMap<NodeId, u32> = HashMap::new();
    dist.insert(leaf, 0);
    for &g in &cone.gates {
        if let Some((f0, f1)) = aig.fanins(g) {
            let d = [f0, f1]
                .iter()
                .filter_map(|f| dist.get(&f.node()))
                .max()
                .copied();
            if let Some(d) = d {
                dist.insert(g, d + 1);
            }
        }
    }
    match dist.get(&root) {
        Some(&d) => clamp_delay(d),
        None => UNREACHABLE,
    }
}

/// Steps 1..3 of the insert pipeline: checks the cut's shape and simulates
/// its function, producing a host-independent cone description.
fn analyze_cut(
    host: &Aig,
    root: Lit,
    leaves: &[NodeId],
    volume_bound: usize,
) -> Result<CutCone, Reject> {
    let nleaves = leaves.len();
    if nleaves < 2 {
        return Err(Reject::Trivial);
    }
    let leaf_set: HashSet<NodeId> = leaves.iter().copied().collect();
    if leaf_set.len() != nleaves {
        return Err(Reject::NotACut);
    }
    if root.is_const() || leaf_set.contains(&root.node()) || !host.is_and(root.node()) {
        return Err(Reject::Trivial);
    }
    let cone = topo::cone_postorder(host, root.node(), &leaf_set);
    if !cone.escaped.is_empty() {
        return Err(Reject::NotACut);
    }
    // A leaf whose own fanins both lie inside the cone is expressible from
    // the other leaves; the cut without it would record the same function
    // more cheaply.
    let mut marked: HashSet<NodeId> = cone.boundary_hit.clone();
    marked.extend(cone.gates.iter().copied());
    for &leaf in leaves {
        if let Some((f0, f1)) = host.fanins(leaf) {
            if marked.contains(&f0.node()) && marked.contains(&f1.node()) {
                return Err(Reject::StructuralRedundancy);
            }
        }
    }
    if cone.gates.len() > volume_bound {
        return Err(Reject::Volume);
    }

    // Local renumbering plus per-node truth simulation over the leaves.
    let mut local: HashMap<NodeId, usize> = HashMap::new();
    let mut tables: Vec<Truth> = Vec::with_capacity(nleaves + cone.gates.len());
    for (k, &n) in leaves.iter().enumerate() {
        local.insert(n, k);
        tables.push(Truth::elementary(nleaves, k));
    }
    let mut gates: Vec<((usize, bool), (usize, bool))> = Vec::with_capacity(cone.gates.len());
    for &g in &cone.gates {
        let (f0, f1) = host.fanins(g).expect("cone gates are AND nodes");
        let i0 = local[&f0.node()];
        let i1 = local[&f1.node()];
        let t0 = if f0.is_complement() { tables[i0].not() } else { tables[i0].clone() };
        let t1 = if f1.is_complement() { tables[i1].not() } else { tables[i1].clone() };
        local.insert(g, tables.len());
        tables.push(t0.and(&t1));
        gates.push(((i0, f0.is_complement()), (i1, f1.is_complement())));
    }
    let root_pos = local[&root.node()];
    let truth = if root.is_complement() {
        tables[root_pos].not()
    } else {
        tables[root_pos].clone()
    };
    if truth.support_size() < nleaves {
        return Err(Reject::VacuousSupport);
    }

    // Sub-decomposition test: an interior node expressible as an AND/OR of
    // two earlier cone nodes (its own fanin pair excepted) means a cheaper
    // decomposition exists, so the cut is not worth recording.
    for (gi, &((i0, _), (i1, _))) in gates.iter().enumerate() {
        let gpos = nleaves + gi;
        let own = (i0.min(i1), i0.max(i1));
        for a in 0..gpos {
            for b in a + 1..gpos {
                if (a, b) == own {
                    continue;
                }
                for (ca, cb) in [(false, false), (false, true), (true, false), (true, true)] {
                    let ta = if ca { tables[a].not() } else { tables[a].clone() };
                    let tb = if cb { tables[b].not() } else { tables[b].clone() };
                    let cand = ta.and(&tb);
                    if tables[gpos] == cand || tables[gpos] == cand.not() {
                        return Err(Reject::SubDecomposition);
                    }
                }
            }
        }
    }

    Ok(CutCone { nleaves, gates, root_compl: root.is_complement(), truth })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::sim;
    use pretty_assertions::assert_eq;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Value of `lit` in `g` under the given input assignment.
    fn eval_lit(g: &Aig, lit: Lit, inputs: &[bool]) -> bool {
        let values = sim::eval_nodes(g, inputs);
        sim::lit_value(&values, lit)
    }

    /// Checks that `m` realizes `expected` once library inputs are wired to
    /// the cut leaves per the match's permutation and phases.
    fn check_match(lib: &RecLibrary, m: &Match, expected: &Truth) {
        let nvars = lib.params().nvars;
        let nleaves = expected.nvars();
        for bits in 0..1u32 << nleaves {
            let mut lib_inputs = vec![false; nvars];
            for k in 0..nleaves {
                let leaf = m.perm[k] as usize;
                let mut v = bits & (1 << leaf) != 0;
                if (m.input_neg >> k) & 1 != 0 {
                    v = !v;
                }
                lib_inputs[k] = v;
            }
            assert_eq!(
                eval_lit(lib.graph(), m.lit, &lib_inputs),
                expected.get_bit(bits),
                "assignment {:04b}",
                bits
            );
        }
    }

    fn and2() -> Truth {
        Truth::from_fn(2, |b| b & 3 == 3)
    }

    fn xor2() -> Truth {
        Truth::from_fn(2, |b| (b & 1) ^ ((b >> 1) & 1) != 0)
    }

    #[test]
    fn start_seeds_the_two_input_primitives() {
        init_logging();
        let lib = RecLibrary::start(None, RecParams::new(4)).unwrap();
        // One AND-family class and one XOR class.
        assert_eq!(lib.class_count(), 2);
        assert_eq!(lib.graph().pi_count(), 4);
        assert_eq!(lib.stats().added, 2);
    }

    #[test]
    fn every_two_input_function_resolves_after_start() {
        let mut lib = RecLibrary::start(None, RecParams::new(4)).unwrap();
        let fns: Vec<Truth> = (0u32..16)
            .map(|mask| Truth::from_fn(2, move |b| (mask >> b) & 1 != 0))
            .filter(|t| t.support_size() == 2)
            .collect();
        assert_eq!(fns.len(), 10);
        for t in &fns {
            let m = lib.lookup_best(t, &[0, 0]).unwrap_or_else(|| panic!("missing {:?}", t));
            check_match(&lib, &m, t);
        }
        assert_eq!(lib.stats().lookup_hits, 10);
    }

    #[test]
    fn same_structure_reinserted_is_a_duplicate() {
        let mut lib = RecLibrary::start(None, RecParams::new(4)).unwrap();
        let mut host = Aig::new();
        let a = host.add_input();
        let b = host.add_input();
        let g = host.add_and(host.lit(a, false), host.lit(b, false));
        let outcome = lib.add_cut(&host, host.lit(g, false), &[a, b]).unwrap();
        assert_eq!(outcome, AddOutcome::Rejected(Reject::Duplicate));
        // The complemented root is the same stored function modulo output
        // phase, so it is a duplicate too.
        let outcome = lib.add_cut(&host, host.lit(g, true), &[a, b]).unwrap();
        assert_eq!(outcome, AddOutcome::Rejected(Reject::Duplicate));
        assert_eq!(lib.stats().rejected_duplicate, 2);
    }

    fn and3_host_left() -> (Aig, Lit, Vec<NodeId>) {
        let mut g = Aig::new();
        let a = g.add_input();
        let b = g.add_input();
        let c = g.add_input();
        let ab = g.add_and(g.lit(a, false), g.lit(b, false));
        let abc = g.add_and(g.lit(ab, false), g.lit(c, false));
        (g, Lit::new(abc, false), vec![a, b, c])
    }

    fn and3_host_right() -> (Aig, Lit, Vec<NodeId>) {
        let mut g = Aig::new();
        let a = g.add_input();
        let b = g.add_input();
        let c = g.add_input();
        let bc = g.add_and(g.lit(b, false), g.lit(c, false));
        let abc = g.add_and(g.lit(a, false), g.lit(bc, false));
        (g, Lit::new(abc, false), vec![a, b, c])
    }

    #[test]
    fn incomparable_realizations_share_a_class() {
        init_logging();
        let mut lib = RecLibrary::start(None, RecParams::new(4)).unwrap();
        let (h1, r1, l1) = and3_host_left();
        assert_eq!(lib.add_cut(&h1, r1, &l1).unwrap(), AddOutcome::Added);
        let (h2, r2, l2) = and3_host_right();
        assert_eq!(lib.add_cut(&h2, r2, &l2).unwrap(), AddOutcome::Added);
        assert_eq!(lib.class_count(), 3);
        let class = lib
            .classes()
            .find(|c| c.instances().len() == 2)
            .expect("three-input AND class has both shapes");
        assert_eq!(class.freq(), 2);
        assert!(dominance::chain_is_pareto(class.instances()));
    }

    #[test]
    fn lookup_prefers_the_shape_matching_the_arrivals() {
        let mut lib = RecLibrary::start(None, RecParams::new(4)).unwrap();
        let (h1, r1, l1) = and3_host_left();
        lib.add_cut(&h1, r1, &l1).unwrap();
        let (h2, r2, l2) = and3_host_right();
        lib.add_cut(&h2, r2, &l2).unwrap();
        let and3 = Truth::from_fn(3, |b| b & 7 == 7);
        // Leaf 0 arrives late: the shape with a single hop on pin 0 wins.
        let m = lib.lookup_best(&and3, &[5, 0, 0]).expect("and3 is recorded");
        assert_eq!(m.delay, 6);
        check_match(&lib, &m, &and3);
        // All-equal arrivals: both shapes tie at depth 2 plus arrival.
        let m = lib.lookup_best(&and3, &[1, 1, 1]).expect("and3 is recorded");
        assert_eq!(m.delay, 3);
    }

    #[test]
    fn nand_resolves_through_output_phase() {
        let mut lib = RecLibrary::start(None, RecParams::new(4)).unwrap();
        let nand = and2().not();
        let m = lib.lookup_best(&nand, &[2, 7]).expect("nand shares the AND class");
        assert_eq!(m.delay, 8);
        check_match(&lib, &m, &nand);
    }

    #[test]
    fn xnor_resolves_through_the_complement_class() {
        let mut lib = RecLibrary::start(None, RecParams::new(4)).unwrap();
        let xnor = xor2().not();
        let m = lib.lookup_best(&xnor, &[0, 0]).expect("xnor matches the xor class");
        assert_eq!(m.delay, 2);
        check_match(&lib, &m, &xnor);
    }

    #[test]
    fn unrecorded_function_is_a_miss() {
        let mut lib = RecLibrary::start(None, RecParams::new(4)).unwrap();
        let maj = Truth::from_fn(3, |b| (b & 1) + ((b >> 1) & 1) + ((b >> 2) & 1) >= 2);
        assert!(lib.lookup_best(&maj, &[0, 0, 0]).is_none());
        assert_eq!(lib.stats().lookup_misses, 1);
    }

    #[test]
    fn structurally_redundant_cut_is_rejected() {
        let mut lib = RecLibrary::start(None, RecParams::new(4)).unwrap();
        // `add_and` does no hashing, so `ab` and `ab2` are distinct nodes
        // computing the same function. The cone under `root` reaches a and b
        // through ab2, which makes leaf `ab` computable from the other two.
        let mut host = Aig::new();
        let a = host.add_input();
        let b = host.add_input();
        let ab = host.add_and(host.lit(a, false), host.lit(b, false));
        let ab2 = host.add_and(host.lit(a, false), host.lit(b, false));
        let root = host.add_and(host.lit(ab, false), host.lit(ab2, false));
        let outcome = lib.add_cut(&host, host.lit(root, false), &[a, b, ab]).unwrap();
        assert_eq!(outcome, AddOutcome::Rejected(Reject::StructuralRedundancy));
    }

    #[test]
    fn cut_not_covering_the_cone_is_rejected() {
        let mut lib = RecLibrary::start(None, RecParams::new(4)).unwrap();
        let mut host = Aig::new();
        let a = host.add_input();
        let b = host.add_input();
        let c = host.add_input();
        let bc = host.add_and(host.lit(b, false), host.lit(c, false));
        let root = host.add_and(host.lit(a, false), host.lit(bc, false));
        // `c` is reachable but not declared a leaf.
        let outcome = lib.add_cut(&host, host.lit(root, false), &[a, b]).unwrap();
        assert_eq!(outcome, AddOutcome::Rejected(Reject::NotACut));
    }

    #[test]
    fn vacuous_leaf_is_rejected() {
        let mut lib = RecLibrary::start(None, RecParams::new(4)).unwrap();
        let mut host = Aig::new();
        let a = host.add_input();
        let b = host.add_input();
        let c = host.add_input();
        let ab = host.add_and(host.lit(a, false), host.lit(b, false));
        // Root depends on a and b only, but c is declared a leaf.
        let outcome = lib.add_cut(&host, host.lit(ab, false), &[a, b, c]).unwrap();
        assert_eq!(outcome, AddOutcome::Rejected(Reject::VacuousSupport));
    }

    #[test]
    fn seed_graph_outputs_are_recorded() {
        init_logging();
        let mut seed = Aig::new();
        let a = seed.add_input();
        let b = seed.add_input();
        let c = seed.add_input();
        let ab = seed.add_and(seed.lit(a, false), seed.lit(b, false));
        let abc = seed.add_and(seed.lit(ab, false), seed.lit(c, false));
        seed.add_output(seed.lit(abc, false));
        let mut lib = RecLibrary::start(Some(&seed), RecParams::new(4)).unwrap();
        // Primitives plus the 3-input AND.
        assert_eq!(lib.class_count(), 3);
        let and3 = Truth::from_fn(3, |b| b & 7 == 7);
        let m = lib.lookup_best(&and3, &[0, 0, 0]).expect("seed output recorded");
        check_match(&lib, &m, &and3);
    }

    #[test]
    fn seed_with_latches_is_rejected() {
        let mut seed = Aig::new();
        seed.add_input();
        seed.add_input();
        seed.set_latch_count(1);
        let err = RecLibrary::start(Some(&seed), RecParams::new(4)).unwrap_err();
        assert!(matches!(err, RecError::BadSeed(_)));
    }

    #[test]
    fn too_wide_seed_is_rejected() {
        let mut seed = Aig::new();
        for _ in 0..5 {
            seed.add_input();
        }
        let err = RecLibrary::start(Some(&seed), RecParams::new(4)).unwrap_err();
        assert!(matches!(err, RecError::BadSeed(_)));
    }

    #[test]
    fn filter_requires_trim_mode() {
        let mut lib = RecLibrary::start(None, RecParams::new(4)).unwrap();
        assert!(matches!(lib.filter(0), Err(RecError::TrimDisabled)));
    }

    #[test]
    fn filter_drops_rare_classes_and_compacts() {
        init_logging();
        let mut lib = RecLibrary::start(None, RecParams::new(4).with_trim()).unwrap();
        let (h1, r1, l1) = and3_host_left();
        lib.add_cut(&h1, r1, &l1).unwrap();
        let (h2, r2, l2) = and3_host_right();
        lib.add_cut(&h2, r2, &l2).unwrap();
        assert_eq!(lib.class_count(), 3);

        // Threshold 1 removes the seeded primitives (freq 1 each) and keeps
        // the twice-recorded 3-input AND.
        let report = lib.filter(1).unwrap();
        assert_eq!(report.classes_removed, 2);
        assert_eq!(lib.class_count(), 1);
        assert!(report.nodes_after < report.nodes_before);
        for class in lib.classes() {
            assert!(class.freq() > 1);
        }

        // Remapped instances still evaluate correctly.
        let and3 = Truth::from_fn(3, |b| b & 7 == 7);
        let m = lib.lookup_best(&and3, &[0, 0, 0]).expect("kept class still resolves");
        check_match(&lib, &m, &and3);

        // Insertions are now refused; lookups for dropped classes miss.
        let (h3, r3, l3) = and3_host_left();
        assert!(matches!(lib.add_cut(&h3, r3, &l3), Err(RecError::Filtered)));
        assert!(lib.lookup_best(&and2(), &[0, 0]).is_none());
    }

    #[test]
    fn instance_outputs_stay_consistent_with_the_graph() {
        let mut lib = RecLibrary::start(None, RecParams::new(4)).unwrap();
        let (h1, r1, l1) = and3_host_left();
        lib.add_cut(&h1, r1, &l1).unwrap();
        for class in lib.classes() {
            for inst in class.instances() {
                assert_eq!(lib.graph().output(inst.output_index()), inst.root());
            }
        }
    }

    #[test]
    fn params_are_validated() {
        assert!(matches!(
            RecLibrary::start(None, RecParams::new(1)),
            Err(RecError::InvalidParams(_))
        ));
        assert!(matches!(
            RecLibrary::start(None, RecParams::new(17)),
            Err(RecError::InvalidParams(_))
        ));
    }

    #[test]
    fn dump_lists_every_class() {
        let lib = RecLibrary::start(None, RecParams::new(4)).unwrap();
        let mut buf = Vec::new();
        lib.dump(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("2 classes"));
        assert_eq!(text.lines().filter(|l| l.starts_with("class")).count(), 2);
    }

    #[test]
    fn phase_variants_funnel_into_few_classes() {
        init_logging();
        let mut lib = RecLibrary::start(None, RecParams::new(6)).unwrap();
        let mut host = Aig::new();
        let a = host.add_input();
        let b = host.add_input();
        let c = host.add_input();
        let mut strash = Strash::new(StrashOptions::no_opt());
        let mut roots: Vec<Lit> = Vec::new();
        let la = host.lit(a, false);
        let lb = host.lit(b, false);
        let lc = host.lit(c, false);
        for i in 0..8u32 {
            let x = if i & 1 != 0 { !la } else { la };
            let y = if i & 2 != 0 { !lb } else { lb };
            let z = if i & 4 != 0 { !lc } else { lc };
            let xy = strash.and(&mut host, x, y);
            roots.push(strash.and(&mut host, xy, z));
            let xz = strash.xor(&mut host, x, z);
            roots.push(strash.and(&mut host, xz, y));
        }
        for root in roots {
            let _ = lib.add_cut(&host, root, &[a, b, c]).unwrap();
        }
        // All eight AND variants funnel into one class. The XOR-AND family
        // splits in two: semi-canonicization only flips an input on a strict
        // cofactor-weight win, so the xor/xnor phase distinction survives.
        assert_eq!(lib.class_count(), 5);
        // Whatever ended up stored must still be findable by exact truth.
        let truths: Vec<Truth> = lib.classes().map(|c| c.truth().clone()).collect();
        for t in truths {
            let nleaves = t.support_size();
            let narrow = Truth::from_fn(nleaves, |b| t.get_bit(b));
            assert!(lib.lookup_best(&narrow, &vec![0; nleaves]).is_some());
        }
    }

    #[test]
    fn bucket_growth_preserves_every_class() {
        init_logging();
        let mut lib = RecLibrary::start(None, RecParams::new(8)).unwrap();
        // Threshold functions are pairwise distinct, so pushing 250 of them
        // through `create_class` forces a rehash past the initial 101
        // buckets.
        let truths: Vec<Truth> =
            (1u32..=250).map(|i| Truth::from_fn(8, move |b| b < i)).collect();
        for t in &truths {
            lib.create_class(t.clone());
        }
        assert!(lib.buckets.len() > INITIAL_BUCKETS);
        for t in &truths {
            assert!(lib.probe(t).is_some(), "class lost in rehash");
        }
    }
}
