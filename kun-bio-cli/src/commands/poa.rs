use std::fs::File;
use std::path::PathBuf;

use clap::Parser;

use kun_bio::poa::{AlignMode, PoaAlignConfig, PoaGraph};

use super::read_fasta_records;

/// Fold the reads of a FASTA file into a partial-order alignment
/// consensus graph and report the consensus sequence.
#[derive(Parser, Debug)]
pub struct Args {
    /// FASTA (optionally gzipped) file of reads, threaded in file order.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Minimum per-vertex coverage required to survive consensus/pruning.
    #[arg(long, default_value_t = 1)]
    pub min_coverage: u32,

    /// Drop vertices below `min_coverage` from the graph after consensus.
    #[arg(long)]
    pub prune: bool,

    /// Write a GraphViz DOT rendering of the final graph to this path.
    #[arg(long)]
    pub graphviz: Option<PathBuf>,

    /// Write a per-vertex CSV dump of the final graph to this path.
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

pub fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let records = read_fasta_records(&args.input)?;
    let mut records = records.into_iter();
    let first = records
        .next()
        .ok_or("no sequences found in input file")?;

    let mut graph = PoaGraph::new();
    graph.add_first_read(&first.seq)?;

    let config = PoaAlignConfig::default();
    for record in records {
        let score = graph.add_read(&record.seq, &config)?;
        log::debug!("{}: threaded with alignment score {}", record.id, score);
    }

    let (consensus, path) = graph.find_consensus(AlignMode::Global, args.min_coverage);
    println!("consensus ({} vertices): {}", path.len(), consensus);

    if args.prune {
        graph.prune_graph(args.min_coverage);
        println!("pruned graph to {} vertices", graph.num_vertices());
    }

    if let Some(path) = &args.graphviz {
        let mut file = File::create(path)?;
        graph.write_graphviz_file(&mut file)?;
        println!("wrote GraphViz DOT to {}", path.display());
    }
    if let Some(path) = &args.csv {
        let mut file = File::create(path)?;
        graph.write_graph_csv_file(&mut file)?;
        println!("wrote CSV to {}", path.display());
    }

    if !graph.validate_topology() {
        log::warn!("graph failed topology validation");
    }

    Ok(())
}
