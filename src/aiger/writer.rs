// SPDX-License-Identifier: Apache-2.0

//! Emits an [`Aig`] as an AIGER binary file, standard or compact variant.
//!
//! The graph is normalized first when its node numbering does not already
//! match AIGER's required order (constant, inputs, then gates). Output is
//! fully deterministic: the same graph always produces the same bytes.

use std::fs;
use std::io::Write as _;
use std::path::Path;

use crate::aig::graph::{Aig, NodeId};
use crate::aig::normalize;
use crate::aiger::blocks::{self, AuxData};
use crate::aiger::varint;
use crate::aiger::{AigerError, Variant};

#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    pub variant: Variant,
}

impl WriteOptions {
    pub fn standard() -> Self {
        WriteOptions { variant: Variant::Standard }
    }

    pub fn compact() -> Self {
        WriteOptions { variant: Variant::Compact }
    }
}

pub fn write_aiger_to_path(
    aig: &Aig,
    options: &WriteOptions,
    path: &Path,
) -> Result<(), AigerError> {
    let bytes = write_aiger(aig, options)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Serializes the graph to AIGER bytes.
pub fn write_aiger(aig: &Aig, options: &WriteOptions) -> Result<Vec<u8>, AigerError> {
    if aig.output_count() == 0 {
        return Err(AigerError::NoOutputs);
    }
    let normalized;
    let g = if normalize::is_normalized(aig) {
        aig
    } else {
        normalized = normalize::normalize(aig);
        &normalized
    };

    let i = g.pi_count();
    let l = g.latch_count();
    let o = g.output_count();
    let a = g.and_count();
    let m = g.max_var();
    assert_eq!(m, i + l + a, "normalized graph must have dense variable numbering");

    let mut out = Vec::new();
    let magic = match options.variant {
        Variant::Standard => "aig",
        Variant::Compact => "aig2",
    };
    writeln!(out, "{} {} {} {} {} {}", magic, m, i, l, o, a)?;

    let mut drivers: Vec<u32> = Vec::with_capacity(l + o);
    for k in 0..l {
        drivers.push(g.next_state(k).raw());
    }
    for k in 0..o {
        drivers.push(g.output(k).raw());
    }
    match options.variant {
        Variant::Standard => {
            for d in &drivers {
                writeln!(out, "{}", d)?;
            }
        }
        Variant::Compact => varint::encode_literal_deltas(&mut out, &drivers),
    }

    // Gates occupy variables i+l+1 ..= m in topological order, so each
    // delta pair is nonnegative by construction.
    for var in i + l + 1..=m {
        let this_lit = (var as u32) << 1;
        let (f0, f1) = g
            .fanins(NodeId(var as u32))
            .ok_or_else(|| AigerError::Internal(format!("variable {} is not a gate", var)))?;
        let delta1 = this_lit.checked_sub(f1.raw()).ok_or_else(|| {
            AigerError::Internal(format!("gate literal {} below its fanin {}", this_lit, f1.raw()))
        })?;
        let delta0 = f1.raw().checked_sub(f0.raw()).ok_or_else(|| {
            AigerError::Internal(format!("unsorted fanins {} < {}", f1.raw(), f0.raw()))
        })?;
        varint::encode_u32(&mut out, delta1);
        varint::encode_u32(&mut out, delta0);
    }

    out.push(b'c');
    let aux = AuxData {
        name: g.name().map(str::to_string),
        equiv: g.equiv().cloned(),
        constraint_count: g.constraint_count(),
    };
    blocks::write_blocks(&mut out, &aux);
    writeln!(out, "aigrec {}", env!("CARGO_PKG_VERSION"))?;
    Ok(out)
}
