// SPDX-License-Identifier: Apache-2.0

//! Structurally-hashing AND constructor over an [`Aig`].
//!
//! Folding (opportunistic constant/identity simplification) and hashing can
//! be switched off independently -- "off" is mainly useful for testing the
//! simplification logic itself.

use std::collections::HashMap;

use crate::aig::graph::{Aig, Lit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrashOptions {
    pub fold: bool,
    pub hash: bool,
}

impl StrashOptions {
    /// Folding and hashing enabled.
    pub fn opt() -> Self {
        Self { fold: true, hash: true }
    }

    pub fn no_opt() -> Self {
        Self { fold: false, hash: false }
    }
}

/// Hash-consing table for AND gates; the graph itself lives outside so that
/// several passes can share one `Aig` while keeping their own tables.
#[derive(Debug, Clone)]
pub struct Strash {
    options: StrashOptions,
    table: HashMap<(Lit, Lit), Lit>,
}

impl Strash {
    pub fn new(options: StrashOptions) -> Self {
        Strash { options, table: HashMap::new() }
    }

    /// Builds a table pre-seeded with every AND already present in `aig`.
    pub fn for_graph(aig: &Aig, options: StrashOptions) -> Self {
        let mut strash = Strash::new(options);
        if options.hash {
            for id in aig.and_ids() {
                let (f0, f1) = aig.fanins(id).unwrap_or((Lit::FALSE, Lit::FALSE));
                // First writer wins so lookups resolve to the earliest copy.
                strash.table.entry((f0, f1)).or_insert(aig.lit(id, false));
            }
        }
        strash
    }

    /// AND of two literals, folding and structure-sharing per the options.
    pub fn and(&mut self, aig: &mut Aig, a: Lit, b: Lit) -> Lit {
        let (lo, hi) = if a.raw() <= b.raw() { (a, b) } else { (b, a) };
        if self.options.fold {
            if lo == Lit::FALSE || lo == !hi {
                return Lit::FALSE;
            }
            if lo == Lit::TRUE {
                return hi;
            }
            if lo == hi {
                return lo;
            }
        }
        if self.options.hash {
            if let Some(&existing) = self.table.get(&(lo, hi)) {
                return existing;
            }
        }
        let id = aig.add_and(lo, hi);
        let lit = aig.lit(id, false);
        if self.options.hash {
            self.table.insert((lo, hi), lit);
        }
        lit
    }

    pub fn or(&mut self, aig: &mut Aig, a: Lit, b: Lit) -> Lit {
        !self.and(aig, !a, !b)
    }

    /// XOR via three ANDs: `(a & !b) | (!a & b)`.
    pub fn xor(&mut self, aig: &mut Aig, a: Lit, b: Lit) -> Lit {
        let a_not_b = self.and(aig, a, !b);
        let b_not_a = self.and(aig, !a, b);
        self.or(aig, a_not_b, b_not_a)
    }
}
