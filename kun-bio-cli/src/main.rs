use clap::{Parser, Subcommand};

mod commands;

use commands::{align, debruijn, index, poa};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Sketch indexes, de Bruijn graphs, POA consensus, and DNA aligners", long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a MinHash/LSH sketch index over the records of a FASTA file.
    Index(index::Args),
    /// Build a de Bruijn graph over the reads of a FASTA file and report its structure.
    Debruijn(debruijn::Args),
    /// Fold the reads of a FASTA file into a partial-order alignment consensus.
    Poa(poa::Args),
    /// Align two sequences.
    Align(align::Args),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    match args.cmd {
        Commands::Index(cmd_args) => index::run(cmd_args)?,
        Commands::Debruijn(cmd_args) => debruijn::run(cmd_args)?,
        Commands::Poa(cmd_args) => poa::run(cmd_args)?,
        Commands::Align(cmd_args) => align::run(cmd_args)?,
    }

    Ok(())
}
