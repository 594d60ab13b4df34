// SPDX-License-Identifier: Apache-2.0

//! Parses AIGER binary files (both variants) into an [`Aig`].
//!
//! The parser is strict about the base sections -- header arithmetic, driver
//! literals, and the AND body must be exactly right -- but deliberately
//! forgiving about the trailer: a broken extended section is reported in the
//! result instead of discarding the already-parsed graph.

use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::aig::graph::{Aig, Lit};
use crate::aiger::blocks;
use crate::aiger::varint;
use crate::aiger::{AigerError, Variant};

/// Outcome of trailer parsing; never fatal to the base graph.
#[derive(Debug)]
pub enum TrailerStatus {
    /// File ended right after the AND section.
    Absent,
    /// A `'c'` with nothing after it.
    CommentOnly,
    /// Legacy bare model name (`'n'` tag), stored into the graph.
    LegacyName,
    /// Signature-guarded block section parsed and committed.
    Extended,
    /// The trailer was present but unusable; side data was discarded.
    Failed(AigerError),
}

impl TrailerStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, TrailerStatus::Failed(_))
    }
}

#[derive(Debug)]
pub struct ReadResult {
    pub aig: Aig,
    pub variant: Variant,
    pub trailer: TrailerStatus,
}

pub fn read_aiger_from_path(path: &Path) -> Result<ReadResult, AigerError> {
    let contents = fs::read(path)?;
    read_aiger(&contents)
}

/// Parses a whole in-memory AIGER file.
pub fn read_aiger(src: &[u8]) -> Result<ReadResult, AigerError> {
    let variant = if src.starts_with(b"aig ") {
        Variant::Standard
    } else if src.starts_with(b"aig2 ") {
        Variant::Compact
    } else {
        return Err(AigerError::BadMagic);
    };

    let (header_line, mut cursor) =
        read_ascii_line(src, 0).map_err(AigerError::BadHeader)?;
    let tokens: Vec<&str> = header_line.split_whitespace().collect();
    if tokens.len() != 6 {
        return Err(AigerError::BadHeader(format!(
            "expected 6 header tokens, got {} (\"{}\")",
            tokens.len(),
            header_line
        )));
    }
    let parse_count = |s: &str, field: &str| -> Result<u32, AigerError> {
        s.parse::<u32>()
            .map_err(|e| AigerError::BadHeader(format!("invalid {} value '{}': {}", field, s, e)))
    };
    let m = parse_count(tokens[1], "M")?;
    let i = parse_count(tokens[2], "I")?;
    let l = parse_count(tokens[3], "L")?;
    let o = parse_count(tokens[4], "O")?;
    let a = parse_count(tokens[5], "A")?;
    if (m as u64) != i as u64 + l as u64 + a as u64 {
        return Err(AigerError::BadHeader(format!(
            "M = {} but I + L + A = {}",
            m,
            i as u64 + l as u64 + a as u64
        )));
    }
    if m > u32::MAX >> 1 {
        return Err(AigerError::BadHeader(format!("M = {} exceeds the literal range", m)));
    }

    let capacity_hint = (m as usize + 1).min(1 << 22);
    let mut aig = Aig::with_capacity(capacity_hint);
    // Dense variable-to-literal table; entry 0 is the constant.
    let mut var_to_lit: Vec<Lit> = Vec::with_capacity(capacity_hint);
    var_to_lit.push(Lit::FALSE);
    for _ in 0..i + l {
        let node = aig.add_input();
        var_to_lit.push(aig.lit(node, false));
    }
    aig.set_latch_count(l as usize);

    // Driver literals (latch next-states then outputs) are parsed before the
    // AND section and resolved after it, since they may name later gates.
    let n_drivers = (l + o) as usize;
    let driver_raw: Vec<u32> = match variant {
        Variant::Standard => {
            let mut drivers = Vec::with_capacity(n_drivers);
            for k in 0..n_drivers {
                let (line, next) = read_ascii_line(src, cursor).map_err(AigerError::Corrupt)?;
                cursor = next;
                let lit: u32 = line.trim().parse().map_err(|e| {
                    AigerError::Corrupt(format!("invalid driver literal '{}' #{}: {}", line, k, e))
                })?;
                drivers.push(lit);
            }
            drivers
        }
        Variant::Compact => varint::decode_literal_deltas(src, &mut cursor, n_drivers)
            .map_err(AigerError::Corrupt)?,
    };

    for and_idx in 0..a {
        let this_var = i + l + and_idx + 1;
        let this_lit = this_var << 1;
        let delta1 = varint::decode_u32(src, &mut cursor).map_err(AigerError::Corrupt)?;
        let delta0 = varint::decode_u32(src, &mut cursor).map_err(AigerError::Corrupt)?;
        let fanin1 = this_lit.checked_sub(delta1).ok_or_else(|| {
            AigerError::Corrupt(format!("delta {} underflows gate literal {}", delta1, this_lit))
        })?;
        if fanin1 == this_lit {
            return Err(AigerError::Corrupt(format!("gate literal {} refers to itself", this_lit)));
        }
        let fanin0 = fanin1.checked_sub(delta0).ok_or_else(|| {
            AigerError::Corrupt(format!("delta {} underflows fanin literal {}", delta0, fanin1))
        })?;
        let l0 = resolve_lit(&var_to_lit, fanin0)?;
        let l1 = resolve_lit(&var_to_lit, fanin1)?;
        let node = aig.add_and(l0, l1);
        var_to_lit.push(aig.lit(node, false));
    }

    for k in 0..l as usize {
        let driver = resolve_lit(&var_to_lit, driver_raw[k])?;
        aig.set_next_state(k, driver);
    }
    for k in 0..o as usize {
        let driver = resolve_lit(&var_to_lit, driver_raw[l as usize + k])?;
        aig.add_output(driver);
    }

    skip_symbol_lines(src, &mut cursor)?;
    let trailer = parse_trailer(src, &mut cursor, &mut aig);
    if let TrailerStatus::Failed(e) = &trailer {
        warn!("AIGER trailer unusable, base graph kept: {}", e);
    }
    Ok(ReadResult { aig, variant, trailer })
}

fn resolve_lit(var_to_lit: &[Lit], raw: u32) -> Result<Lit, AigerError> {
    let var = (raw >> 1) as usize;
    let base = *var_to_lit.get(var).ok_or_else(|| {
        AigerError::Corrupt(format!("literal {} names undefined variable {}", raw, var))
    })?;
    Ok(if raw & 1 != 0 { !base } else { base })
}

/// Skips ASCII symbol lines (`i<n> <name>`, `l<n> <name>`, `o<n> <name>`).
/// Symbols are not stored; the model name travels in the block trailer.
fn skip_symbol_lines(src: &[u8], cursor: &mut usize) -> Result<(), AigerError> {
    while let Some(&first) = src.get(*cursor) {
        if !matches!(first, b'i' | b'l' | b'o') {
            break;
        }
        // Require "<kind><digits> " so a comment cannot be mistaken for a
        // symbol line.
        let rest = &src[*cursor + 1..];
        let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 || rest.get(digits) != Some(&b' ') {
            return Err(AigerError::Corrupt(format!(
                "malformed symbol line starting with '{}'",
                first as char
            )));
        }
        let (line, next) = read_ascii_line(src, *cursor).map_err(AigerError::Corrupt)?;
        debug!("skipping AIGER symbol line: {}", line);
        *cursor = next;
    }
    Ok(())
}

/// Everything after the AND/symbol sections. Failures are contained: the
/// status carries them and any partially decoded side data is dropped.
fn parse_trailer(src: &[u8], cursor: &mut usize, aig: &mut Aig) -> TrailerStatus {
    let first = match src.get(*cursor) {
        None => return TrailerStatus::Absent,
        Some(&b) => b,
    };
    *cursor += 1;
    if first != b'c' {
        return TrailerStatus::Failed(AigerError::Corrupt(format!(
            "unexpected byte 0x{:02x} where the trailer should start",
            first
        )));
    }
    match src.get(*cursor) {
        None => TrailerStatus::CommentOnly,
        Some(&b'n') => {
            *cursor += 1;
            let rest = &src[*cursor..];
            let end = rest.iter().position(|&b| b == 0 || b == b'\n').unwrap_or(rest.len());
            match std::str::from_utf8(&rest[..end]) {
                Ok(name) => {
                    aig.set_name(Some(name.to_string()));
                    *cursor += end;
                    TrailerStatus::LegacyName
                }
                Err(_) => TrailerStatus::Failed(AigerError::Corrupt(
                    "legacy model name is not valid UTF-8".to_string(),
                )),
            }
        }
        Some(_) => {
            let attempt = blocks::read_signature(src, cursor)
                .and_then(|()| blocks::read_blocks(src, cursor, aig.node_count()));
            match attempt {
                Ok(aux) => {
                    if aux.name.is_some() {
                        aig.set_name(aux.name);
                    }
                    if aux.equiv.is_some() {
                        aig.set_equiv(aux.equiv);
                    }
                    if aux.constraint_count != 0 {
                        aig.set_constraint_count(aux.constraint_count);
                    }
                    TrailerStatus::Extended
                }
                Err(e) => TrailerStatus::Failed(e),
            }
        }
    }
}

fn read_ascii_line(src: &[u8], start: usize) -> Result<(String, usize), String> {
    if start >= src.len() {
        return Err("unexpected EOF while reading ASCII line".to_string());
    }
    let end = src[start..]
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| "unterminated ASCII line".to_string())?;
    let line = std::str::from_utf8(&src[start..start + end])
        .map_err(|e| format!("invalid UTF-8 in ASCII line: {}", e))?;
    Ok((line.to_string(), start + end + 1))
}
