// SPDX-License-Identifier: Apache-2.0

pub mod dce;
pub mod graph;
pub mod normalize;
pub mod sim;
pub mod stats;
pub mod strash;
pub mod topo;

pub use crate::aig::graph::{Aig, AigNode, EquivEntry, EquivTable, Lit, NodeId};
pub use crate::aig::strash::{Strash, StrashOptions};
