// SPDX-License-Identifier: Apache-2.0

//! And-inverter graphs, the binary AIGER interchange format, and a recorded
//! subgraph library mapping boolean functions to their best known
//! realizations.

pub mod aig;
pub mod aiger;
pub mod record;
