// SPDX-License-Identifier: Apache-2.0

//! AIGER binary-format codec: the standard `aig` variant (ASCII driver
//! lines) and the compact `aig2` variant (delta-coded binary driver list),
//! plus the extended block trailer both share.

pub mod blocks;
pub mod reader;
pub mod varint;
pub mod writer;

pub use crate::aiger::reader::{ReadResult, TrailerStatus, read_aiger, read_aiger_from_path};
pub use crate::aiger::writer::{WriteOptions, write_aiger, write_aiger_to_path};

use std::io;

/// File variant selected by the header magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// `"aig"`: ASCII driver-literal lines, binary AND section.
    Standard,
    /// `"aig2"`: delta-coded binary driver literals, binary AND section.
    Compact,
}

#[derive(Debug)]
pub enum AigerError {
    Io(io::Error),
    /// The file does not start with `"aig "` or `"aig2 "`.
    BadMagic,
    /// Header fields unreadable or inconsistent (`M != I + L + A`).
    BadHeader(String),
    /// A well-formed prefix followed by a malformed body, varint, delta, or
    /// block; the position and reason are in the message.
    Corrupt(String),
    /// The writer requires at least one output.
    NoOutputs,
    /// A consistency check inside the codec failed; indicates a bug rather
    /// than a bad file.
    Internal(String),
}

impl std::fmt::Display for AigerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {}", e),
            Self::BadMagic => write!(f, "not an AIGER binary file (bad magic)"),
            Self::BadHeader(msg) => write!(f, "bad AIGER header: {}", msg),
            Self::Corrupt(msg) => write!(f, "corrupt AIGER file: {}", msg),
            Self::NoOutputs => write!(f, "graph has no outputs; refusing to write"),
            Self::Internal(msg) => write!(f, "internal AIGER codec error: {}", msg),
        }
    }
}

impl std::error::Error for AigerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for AigerError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
