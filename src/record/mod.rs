// SPDX-License-Identifier: Apache-2.0

pub mod dominance;
pub mod library;
pub mod truth;

pub use crate::record::dominance::{DelayCmp, DelayCost, InsertOutcome, MAX_DELAY, UNREACHABLE};
pub use crate::record::library::{
    AddOutcome, FilterOutcome, Match, RecError, RecLibrary, RecParams, RecStats, Reject,
};
pub use crate::record::truth::{CanonTransform, MAX_VARS, Truth};
