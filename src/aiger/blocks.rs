// SPDX-License-Identifier: Apache-2.0

//! The extended trailer: a signature handshake followed by tagged,
//! length-prefixed blocks.
//!
//! Layout after the `'c'` byte that opens the trailer:
//!
//! ```text
//!   0x0A  <8-byte LE magic 0xAC1D0FF1CEC0FFEE>      signature
//!   tag   <8-byte LE payload length> <payload>      zero or more blocks
//!   0x00  <8-byte LE zero>                          terminator
//!   <free-text comment, ignored>
//! ```
//!
//! Unknown tags are skipped over their declared length so newer writers stay
//! readable. Every declared length is checked against the remaining buffer
//! before the payload is touched.

use log::warn;

use crate::aig::graph::{EquivTable, NodeId};
use crate::aiger::AigerError;
use crate::aiger::varint;

pub const SIGNATURE_MAGIC: u64 = 0xAC1D_0FF1_CEC0_FFEE;
pub const SIGNATURE_TAG: u8 = b'\n';

pub const TAG_NAME: u8 = b'N';
pub const TAG_EQUIV: u8 = b'=';
pub const TAG_CONSTRAINTS: u8 = b'c';
pub const TAG_END: u8 = 0;

/// Decoded auxiliary side data carried by the block section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuxData {
    pub name: Option<String>,
    pub equiv: Option<EquivTable>,
    pub constraint_count: u32,
}

pub(crate) fn read_u8(src: &[u8], cursor: &mut usize) -> Result<u8, AigerError> {
    let b = *src
        .get(*cursor)
        .ok_or_else(|| AigerError::Corrupt("unexpected end of file".to_string()))?;
    *cursor += 1;
    Ok(b)
}

pub(crate) fn read_u64_le(src: &[u8], cursor: &mut usize) -> Result<u64, AigerError> {
    let bytes = take(src, cursor, 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(raw))
}

pub(crate) fn take<'a>(
    src: &'a [u8],
    cursor: &mut usize,
    n: usize,
) -> Result<&'a [u8], AigerError> {
    let end = cursor
        .checked_add(n)
        .filter(|&e| e <= src.len())
        .ok_or_else(|| AigerError::Corrupt(format!("{} bytes requested past end of file", n)))?;
    let slice = &src[*cursor..end];
    *cursor = end;
    Ok(slice)
}

/// Reads and checks the signature; a mismatch is a hard (but recoverable at
/// the caller) parse failure.
pub fn read_signature(src: &[u8], cursor: &mut usize) -> Result<(), AigerError> {
    let tag = read_u8(src, cursor)?;
    let word = read_u64_le(src, cursor)?;
    if tag != SIGNATURE_TAG || word != SIGNATURE_MAGIC {
        return Err(AigerError::Corrupt(format!(
            "extended signature mismatch: tag 0x{:02x} word 0x{:016x}",
            tag, word
        )));
    }
    Ok(())
}

/// Reads blocks until the terminator, returning the decoded side data as one
/// unit. `node_count` bounds the node indices an equivalence block may name.
pub fn read_blocks(
    src: &[u8],
    cursor: &mut usize,
    node_count: usize,
) -> Result<AuxData, AigerError> {
    let mut aux = AuxData::default();
    loop {
        let tag = read_u8(src, cursor)?;
        let len = read_u64_le(src, cursor)?;
        if tag == TAG_END {
            if len != 0 {
                return Err(AigerError::Corrupt(format!(
                    "terminator block declares nonzero length {}",
                    len
                )));
            }
            return Ok(aux);
        }
        if len > (src.len() - *cursor) as u64 {
            return Err(AigerError::Corrupt(format!(
                "block 0x{:02x} declares {} bytes but only {} remain",
                tag,
                len,
                src.len() - *cursor
            )));
        }
        let payload = take(src, cursor, len as usize)?;
        match tag {
            TAG_NAME => {
                let name = String::from_utf8(payload.to_vec()).map_err(|_| {
                    AigerError::Corrupt("model name is not valid UTF-8".to_string())
                })?;
                aux.name = Some(name);
            }
            TAG_EQUIV => {
                aux.equiv = Some(decode_equiv_payload(payload, node_count)?);
            }
            TAG_CONSTRAINTS => {
                if payload.len() != 4 {
                    return Err(AigerError::Corrupt(format!(
                        "constraint block must be 4 bytes, got {}",
                        payload.len()
                    )));
                }
                let mut raw = [0u8; 4];
                raw.copy_from_slice(payload);
                aux.constraint_count = u32::from_le_bytes(raw);
            }
            _ => {
                warn!("skipping unknown AIGER block tag 0x{:02x} ({} bytes)", tag, len);
            }
        }
    }
}

/// Writes the signature, the present blocks in fixed order (name,
/// equivalences, constraints), and the terminator.
pub fn write_blocks(out: &mut Vec<u8>, aux: &AuxData) {
    out.push(SIGNATURE_TAG);
    out.extend_from_slice(&SIGNATURE_MAGIC.to_le_bytes());
    if let Some(name) = &aux.name {
        write_block(out, TAG_NAME, name.as_bytes());
    }
    if let Some(equiv) = &aux.equiv {
        if !equiv.is_empty() {
            let payload = encode_equiv_payload(equiv);
            write_block(out, TAG_EQUIV, &payload);
        }
    }
    if aux.constraint_count != 0 {
        write_block(out, TAG_CONSTRAINTS, &aux.constraint_count.to_le_bytes());
    }
    out.push(TAG_END);
    out.extend_from_slice(&0u64.to_le_bytes());
}

pub fn write_block(out: &mut Vec<u8>, tag: u8, payload: &[u8]) {
    out.push(tag);
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(payload);
}

/// Equivalence payload: a class count, then per class the total literal
/// count, the representative literal as a delta from the previous class's
/// representative, and each member literal as a delta from its predecessor.
/// All deltas run upward, which the ascending class/member order guarantees.
/// Member literals carry the proved flag in the phase bit; representative
/// literals have phase zero.
fn encode_equiv_payload(equiv: &EquivTable) -> Vec<u8> {
    let classes = equiv.classes();
    let mut out = Vec::new();
    varint::encode_u64(&mut out, classes.len() as u64);
    let mut prev_repr_lit = 0u64;
    for (repr, members) in classes {
        varint::encode_u64(&mut out, members.len() as u64 + 1);
        let repr_lit = repr.0 as u64 * 2;
        varint::encode_u64(&mut out, repr_lit - prev_repr_lit);
        prev_repr_lit = repr_lit;
        let mut prev = repr_lit;
        for member in members {
            let proved = equiv.get(member).map(|e| e.proved).unwrap_or(false);
            let lit = member.0 as u64 * 2 + proved as u64;
            varint::encode_u64(&mut out, lit - prev);
            prev = lit;
        }
    }
    out
}

fn decode_equiv_payload(payload: &[u8], node_count: usize) -> Result<EquivTable, AigerError> {
    let corrupt = |msg: String| AigerError::Corrupt(msg);
    let mut cursor = 0usize;
    let class_count = varint::decode_u64(payload, &mut cursor).map_err(corrupt)?;
    if class_count > node_count as u64 {
        return Err(AigerError::Corrupt(format!(
            "equivalence block claims {} classes for {} nodes",
            class_count, node_count
        )));
    }
    let mut table = EquivTable::new(node_count);
    let mut prev_repr_lit = 0u64;
    for _ in 0..class_count {
        let member_count = varint::decode_u64(payload, &mut cursor).map_err(corrupt)?;
        if member_count < 2 {
            return Err(AigerError::Corrupt(format!(
                "equivalence class with {} literals (need a representative and a member)",
                member_count
            )));
        }
        let repr_delta = varint::decode_u64(payload, &mut cursor).map_err(corrupt)?;
        let repr_lit = prev_repr_lit
            .checked_add(repr_delta)
            .ok_or_else(|| AigerError::Corrupt("equivalence literal overflows".to_string()))?;
        if repr_lit & 1 != 0 {
            return Err(AigerError::Corrupt(
                "equivalence representative literal has its phase bit set".to_string(),
            ));
        }
        let repr = node_index(repr_lit, node_count)?;
        prev_repr_lit = repr_lit;
        let mut prev = repr_lit;
        for _ in 1..member_count {
            let delta = varint::decode_u64(payload, &mut cursor).map_err(corrupt)?;
            let lit = prev
                .checked_add(delta)
                .ok_or_else(|| AigerError::Corrupt("equivalence literal overflows".to_string()))?;
            let member = node_index(lit, node_count)?;
            let proved = lit & 1 != 0;
            table
                .set(member, repr, proved)
                .map_err(|e| AigerError::Corrupt(format!("equivalence block: {}", e)))?;
            prev = lit;
        }
    }
    if cursor != payload.len() {
        return Err(AigerError::Corrupt(format!(
            "{} trailing bytes in equivalence block",
            payload.len() - cursor
        )));
    }
    Ok(table)
}

fn node_index(lit: u64, node_count: usize) -> Result<NodeId, AigerError> {
    let index = lit >> 1;
    if index >= node_count as u64 {
        return Err(AigerError::Corrupt(format!(
            "equivalence literal {} names node {} outside the graph ({} nodes)",
            lit, index, node_count
        )));
    }
    Ok(NodeId(index as u32))
}
