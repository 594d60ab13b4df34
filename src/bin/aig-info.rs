// SPDX-License-Identifier: Apache-2.0

//! Prints summary statistics for a binary AIGER file and optionally rewrites
//! it in either driver encoding.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use aigrec::aig::stats;
use aigrec::aiger::{
    TrailerStatus, Variant, WriteOptions, read_aiger_from_path, write_aiger_to_path,
};

#[derive(Debug, Parser)]
#[command(name = "aig-info")]
#[command(about = "Summarize a binary AIGER file, optionally rewriting it")]
struct Args {
    /// Input AIGER file (`aig` or `aig2`).
    input: PathBuf,

    /// Emit the summary as JSON instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Rewrite the (normalized) graph to this path.
    #[arg(long)]
    rewrite: Option<PathBuf>,

    /// Use the compact `aig2` driver encoding when rewriting.
    #[arg(long, default_value_t = false)]
    compact: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let result = read_aiger_from_path(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let g = &result.aig;
    let summary = stats::summarize(g);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let variant = match result.variant {
            Variant::Standard => "aig",
            Variant::Compact => "aig2",
        };
        println!("variant:  {}", variant);
        println!("inputs:   {}", summary.inputs);
        println!("latches:  {}", summary.latches);
        println!("outputs:  {}", summary.outputs);
        println!("ands:     {}", summary.ands);
        println!("levels:   {}", summary.levels);
        if let Some(name) = g.name() {
            println!("name:     {}", name);
        }
        if g.constraint_count() > 0 {
            println!("constraints: {}", g.constraint_count());
        }
        if let Some(eq) = g.equiv() {
            println!("equivalences: {} literals", eq.member_count());
        }
        match &result.trailer {
            TrailerStatus::Failed(e) => println!("trailer:  unusable ({})", e),
            status => println!("trailer:  {:?}", status),
        }
    }

    if let Some(out_path) = args.rewrite.as_ref() {
        let options = if args.compact { WriteOptions::compact() } else { WriteOptions::standard() };
        write_aiger_to_path(g, &options, out_path)
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        eprintln!("aig-info: rewrote {} as {}", args.input.display(), out_path.display());
    }

    Ok(())
}
