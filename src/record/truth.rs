// SPDX-License-Identifier: Apache-2.0

//! Word-packed truth tables for up to 16 variables, plus the semi-canonical
//! transform the subgraph library keys on.
//!
//! Bit `b` of the table is the function value at the assignment whose
//! variable `k` equals bit `k` of `b`. Tables with fewer than 6 variables
//! keep their pattern replicated through the whole 64-bit word, so every
//! word-wise operation (including hashing and equality) is width-uniform.
//!
//! `semi_canonicize` is deliberately greedy, not a full NPN canonicalizer:
//! it negates the output toward minority weight, negates each input toward a
//! lighter positive cofactor, then sorts variables by positive-cofactor
//! weight via adjacent swaps. Ties are left untouched, so two NPN-equivalent
//! functions can land in different representatives; the library compensates
//! at lookup time by also probing the complement.

pub const MAX_VARS: usize = 16;

/// Words needed for an `nvars`-variable table.
pub fn words_for(nvars: usize) -> usize {
    if nvars <= 6 { 1 } else { 1 << (nvars - 6) }
}

/// Mask of the positions within word `w` where variable `v` is true.
fn var_word_mask(v: usize, w: usize) -> u64 {
    match v {
        0 => 0xAAAA_AAAA_AAAA_AAAA,
        1 => 0xCCCC_CCCC_CCCC_CCCC,
        2 => 0xF0F0_F0F0_F0F0_F0F0,
        3 => 0xFF00_FF00_FF00_FF00,
        4 => 0xFFFF_0000_FFFF_0000,
        5 => 0xFFFF_FFFF_0000_0000,
        _ => {
            if (w >> (v - 6)) & 1 != 0 { u64::MAX } else { 0 }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Truth {
    nvars: usize,
    words: Vec<u64>,
}

impl Truth {
    pub fn const0(nvars: usize) -> Self {
        assert!((1..=MAX_VARS).contains(&nvars), "nvars out of range: {nvars}");
        Truth { nvars, words: vec![0; words_for(nvars)] }
    }

    pub fn const1(nvars: usize) -> Self {
        let mut t = Truth::const0(nvars);
        for w in &mut t.words {
            *w = u64::MAX;
        }
        t
    }

    /// Projection of variable `v`.
    pub fn elementary(nvars: usize, v: usize) -> Self {
        assert!(v < nvars, "variable {v} out of range for {nvars} vars");
        let mut t = Truth::const0(nvars);
        for w in 0..t.words.len() {
            t.words[w] = var_word_mask(v, w);
        }
        t
    }

    /// Builds a table by evaluating `f` at each of the `2^nvars` assignments.
    pub fn from_fn(nvars: usize, f: impl Fn(u32) -> bool) -> Self {
        let mut t = Truth::const0(nvars);
        for b in 0..1u32 << nvars {
            if f(b) {
                t.words[(b >> 6) as usize] |= 1u64 << (b & 63);
            }
        }
        t.replicate();
        t
    }

    /// Tiles the low `2^nvars` bits through the rest of word 0. No-op for
    /// six or more variables.
    fn replicate(&mut self) {
        if self.nvars >= 6 {
            return;
        }
        let block = 1usize << self.nvars;
        let mut w = self.words[0] & ((1u64 << block) - 1);
        let mut width = block;
        while width < 64 {
            w |= w << width;
            width <<= 1;
        }
        self.words[0] = w;
    }

    pub fn nvars(&self) -> usize {
        self.nvars
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn get_bit(&self, assignment: u32) -> bool {
        debug_assert!(assignment < 1 << self.nvars);
        (self.words[(assignment >> 6) as usize] >> (assignment & 63)) & 1 != 0
    }

    pub fn not(&self) -> Truth {
        Truth { nvars: self.nvars, words: self.words.iter().map(|w| !w).collect() }
    }

    pub fn and(&self, other: &Truth) -> Truth {
        assert_eq!(self.nvars, other.nvars);
        let words = self.words.iter().zip(&other.words).map(|(a, b)| a & b).collect();
        Truth { nvars: self.nvars, words }
    }

    pub fn or(&self, other: &Truth) -> Truth {
        assert_eq!(self.nvars, other.nvars);
        let words = self.words.iter().zip(&other.words).map(|(a, b)| a | b).collect();
        Truth { nvars: self.nvars, words }
    }

    pub fn xor(&self, other: &Truth) -> Truth {
        assert_eq!(self.nvars, other.nvars);
        let words = self.words.iter().zip(&other.words).map(|(a, b)| a ^ b).collect();
        Truth { nvars: self.nvars, words }
    }

    /// Number of set bits over the replicated words. Comparisons between
    /// weights of same-width tables are what matters; the replication factor
    /// scales all of them equally.
    pub fn weight(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Weights of the negative and positive cofactors of `v`, in that order.
    pub fn cofactor_weights(&self, v: usize) -> (u32, u32) {
        assert!(v < self.nvars);
        let mut w0 = 0;
        let mut w1 = 0;
        for w in 0..self.words.len() {
            let m = var_word_mask(v, w);
            w1 += (self.words[w] & m).count_ones();
            w0 += (self.words[w] & !m).count_ones();
        }
        (w0, w1)
    }

    /// Exchanges the two cofactors of `v` (substitutes `!v` for `v`).
    pub fn flip_var(&self, v: usize) -> Truth {
        assert!(v < self.nvars);
        let mut out = self.clone();
        if v < 6 {
            let shift = 1u32 << v;
            for w in 0..out.words.len() {
                let m = var_word_mask(v, w);
                let x = self.words[w];
                out.words[w] = ((x & m) >> shift) | ((x & !m) << shift);
            }
        } else {
            let stride = 1usize << (v - 6);
            for w in 0..out.words.len() {
                if w & stride == 0 {
                    out.words.swap(w, w | stride);
                }
            }
        }
        out
    }

    /// Exchanges variables `v` and `v + 1`.
    pub fn swap_adjacent(&self, v: usize) -> Truth {
        assert!(v + 1 < self.nvars);
        let mut out = self.clone();
        if v + 1 < 6 {
            // Both variables live inside each word. Bits where exactly one
            // of the two is set trade places at distance 2^v.
            let shift = 1u32 << v;
            for w in 0..out.words.len() {
                let mv = var_word_mask(v, w);
                let mn = var_word_mask(v + 1, w);
                let x = self.words[w];
                let lone_v = x & mv & !mn;
                let lone_n = x & !mv & mn;
                out.words[w] = (x & !(mv ^ mn)) | (lone_v << shift) | (lone_n >> shift);
            }
        } else if v == 5 {
            // Variable 5 is the high word half; variable 6 is the word-pair
            // index. Cross-trade the mismatched halves of each pair.
            for p in 0..out.words.len() / 2 {
                let lo = self.words[2 * p];
                let hi = self.words[2 * p + 1];
                out.words[2 * p] = (lo & 0xFFFF_FFFF) | ((hi & 0xFFFF_FFFF) << 32);
                out.words[2 * p + 1] = (hi & !0xFFFF_FFFF) | (lo >> 32);
            }
        } else {
            let a = 1usize << (v - 6);
            let b = 1usize << (v - 5);
            for w in 0..out.words.len() {
                if w & a != 0 && w & b == 0 {
                    out.words.swap(w, (w ^ a) | b);
                }
            }
        }
        out
    }

    /// Set of variables the function actually depends on, as a bitmask.
    pub fn support(&self) -> u16 {
        let mut mask = 0u16;
        for v in 0..self.nvars {
            if self.flip_var(v) != *self {
                mask |= 1 << v;
            }
        }
        mask
    }

    pub fn support_size(&self) -> usize {
        self.support().count_ones() as usize
    }

    /// Widens the table to `to_nvars` variables by periodic duplication; the
    /// added variables are vacuous.
    pub fn stretch(&self, to_nvars: usize) -> Truth {
        assert!(to_nvars >= self.nvars && to_nvars <= MAX_VARS);
        let mut out = Truth::const0(to_nvars);
        for w in 0..out.words.len() {
            out.words[w] = self.words[w % self.words.len()];
        }
        out.nvars = to_nvars;
        out
    }
}

/// Record of what `semi_canonicize` did.
///
/// Semantics match the transform direction used for recipes: for a canonical
/// assignment `y`, the original assignment is `x[perm[i]] = y[i] XOR
/// input_negated(i)`, and `canon(y) = orig(x) XOR out_neg`. Equivalently,
/// canonical variable `i` stands for original variable `perm[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonTransform {
    pub perm: Vec<u8>,
    pub input_neg: u16,
    pub out_neg: bool,
}

impl CanonTransform {
    pub fn identity(nvars: usize) -> Self {
        CanonTransform { perm: (0..nvars as u8).collect(), input_neg: 0, out_neg: false }
    }

    #[inline]
    pub fn input_negated(&self, i: usize) -> bool {
        (self.input_neg >> i) & 1 != 0
    }
}

impl Truth {
    /// Applies `xform` per the semantics documented on [`CanonTransform`].
    pub fn apply(&self, xform: &CanonTransform) -> Truth {
        assert_eq!(xform.perm.len(), self.nvars);
        Truth::from_fn(self.nvars, |y| {
            let mut x = 0u32;
            for i in 0..self.nvars {
                let mut bit = (y >> i) & 1 != 0;
                if xform.input_negated(i) {
                    bit = !bit;
                }
                if bit {
                    x |= 1 << xform.perm[i];
                }
            }
            self.get_bit(x) ^ xform.out_neg
        })
    }

    /// Returns the semi-canonical representative and the transform that
    /// produced it, so `self.apply(&xform) == canon`.
    pub fn semi_canonicize(&self) -> (Truth, CanonTransform) {
        let mut t = self.clone();
        let mut xform = CanonTransform::identity(self.nvars);

        let total_bits = (self.words.len() * 64) as u32;
        if t.weight() * 2 > total_bits {
            t = t.not();
            xform.out_neg = true;
        }
        for v in 0..self.nvars {
            let (w0, w1) = t.cofactor_weights(v);
            if w1 > w0 {
                t = t.flip_var(v);
                xform.input_neg ^= 1 << v;
            }
        }
        // Bubble variables into ascending positive-cofactor weight. Equal
        // weights never swap, which keeps the result deterministic.
        let mut changed = true;
        while changed {
            changed = false;
            for v in 0..self.nvars - 1 {
                let k_lo = t.cofactor_weights(v).1;
                let k_hi = t.cofactor_weights(v + 1).1;
                if k_lo > k_hi {
                    t = t.swap_adjacent(v);
                    xform.perm.swap(v, v + 1);
                    let lo_bit = (xform.input_neg >> v) & 1;
                    let hi_bit = (xform.input_neg >> (v + 1)) & 1;
                    if lo_bit != hi_bit {
                        xform.input_neg ^= (1 << v) | (1 << (v + 1));
                    }
                    changed = true;
                }
            }
        }
        debug_assert_eq!(self.apply(&xform), t);
        (t, xform)
    }
}
