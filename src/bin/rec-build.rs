// SPDX-License-Identifier: Apache-2.0

//! Builds a recorded-subgraph library, seeding it from an AIGER file, and
//! prints the resulting class listing.

use std::fs::File;
use std::io::{self, Write as _};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use aigrec::aiger::{WriteOptions, read_aiger_from_path, write_aiger_to_path};
use aigrec::record::{RecLibrary, RecParams};

#[derive(Debug, Parser)]
#[command(name = "rec-build")]
#[command(about = "Build a recorded-subgraph library from an AIGER seed")]
struct Args {
    /// Seed AIGER file; every output cone is offered to the library.
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Library width in variables.
    #[arg(long, default_value_t = 6)]
    nvars: usize,

    /// Drop classes recorded at most this many times, then compact the
    /// library graph.
    #[arg(long)]
    filter: Option<u32>,

    /// Write the class listing here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Save the library graph as a binary AIGER file.
    #[arg(long)]
    save_graph: Option<PathBuf>,

    /// Use the compact `aig2` encoding for `--save-graph`.
    #[arg(long, default_value_t = false)]
    compact: bool,

    /// Print insertion statistics as JSON on stderr.
    #[arg(long, default_value_t = false)]
    stats: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut params = RecParams::new(args.nvars);
    if args.filter.is_some() {
        params = params.with_trim();
    }

    let seed_read = match args.seed.as_ref() {
        Some(p) => Some(
            read_aiger_from_path(p).with_context(|| format!("failed to read {}", p.display()))?,
        ),
        None => None,
    };
    let mut lib = RecLibrary::start(seed_read.as_ref().map(|r| &r.aig), params)
        .context("failed to build the library")?;
    eprintln!(
        "rec-build: {} classes, {} graph nodes",
        lib.class_count(),
        lib.graph().node_count()
    );

    if let Some(threshold) = args.filter {
        let report = lib.filter(threshold).context("filtering failed")?;
        eprintln!(
            "rec-build: filter dropped {} classes / {} instances, graph {} -> {} nodes",
            report.classes_removed,
            report.instances_removed,
            report.nodes_before,
            report.nodes_after
        );
    }

    match args.out.as_ref() {
        Some(p) => {
            let mut f =
                File::create(p).with_context(|| format!("failed to create {}", p.display()))?;
            lib.dump(&mut f)?;
        }
        None => {
            let stdout = io::stdout();
            lib.dump(&mut stdout.lock())?;
        }
    }

    if let Some(p) = args.save_graph.as_ref() {
        let options = if args.compact { WriteOptions::compact() } else { WriteOptions::standard() };
        write_aiger_to_path(lib.graph(), &options, p)
            .with_context(|| format!("failed to write {}", p.display()))?;
        eprintln!("rec-build: saved library graph to {}", p.display());
    }

    if args.stats {
        let mut err = io::stderr().lock();
        writeln!(err, "{}", serde_json::to_string_pretty(lib.stats())?)?;
    }

    Ok(())
}
