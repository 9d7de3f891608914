use std::fs::File;
use std::path::PathBuf;

use clap::Parser;

use kmer_core::bits::wang_hash;
use kmer_core::sketch::canonical_kmers;
use kun_bio::lsh::LshIndex;

use super::read_fasta_records;

/// Build a bit-sampling or bottom-k MinHash/LSH sketch index over the
/// records of a FASTA file.
#[derive(Parser, Debug)]
pub struct Args {
    /// FASTA (optionally gzipped) file of sequences to sketch and index.
    #[arg(short, long)]
    pub input: PathBuf,

    /// k-mer length each record's MinHash sketch is built from.
    #[arg(short = 'k', long, default_value_t = 21)]
    pub kmer_length: u32,

    /// Number of registers kept per sketch.
    #[arg(short = 'm', long, default_value_t = 64)]
    pub sketch_size: usize,

    /// Use the degenerate bottom-k backend instead of bit-sampling tables.
    #[arg(long)]
    pub bottom_k: bool,

    /// Registers-per-signature for each bit-sampling table (ignored with --bottom-k).
    #[arg(long, value_delimiter = ',', default_value = "1,2,4,8")]
    pub registers_per_signature: Vec<usize>,

    /// Write the serialized index to this path.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let records = read_fasta_records(&args.input)?;
    if records.is_empty() {
        return Err("no sequences found in input file".into());
    }

    let index = if args.bottom_k {
        LshIndex::bottom_k(args.sketch_size)
    } else {
        LshIndex::with_registers(args.sketch_size, &args.registers_per_signature)?
    };

    for record in &records {
        let sketch = minhash_sketch(&record.seq, args.kmer_length, args.sketch_size)?;
        if sketch.is_empty() {
            log::warn!(
                "{}: no k-mers of length {} found, skipping",
                record.id,
                args.kmer_length
            );
            continue;
        }
        let id = index.insert(&sketch);
        log::debug!("{} -> id {} ({} registers)", record.id, id, sketch.len());
    }

    println!(
        "indexed {} sequences into {} table(s)",
        index.total_ids(),
        index.num_tables()
    );

    if let Some(output) = &args.output {
        let mut file = File::create(output)?;
        index.write(&mut file)?;
        println!("wrote index to {}", output.display());
    }

    Ok(())
}

/// The `sketch_size` smallest `wang_hash`-transformed canonical k-mer
/// values in `seq` — a bottom-k MinHash sketch.
fn minhash_sketch(seq: &[u8], k: u32, sketch_size: usize) -> kmer_core::Result<Vec<u64>> {
    let windows = canonical_kmers(seq, k)?;
    let mut hashes: Vec<u64> = windows.iter().map(|w| wang_hash(w.canonical)).collect();
    hashes.sort_unstable();
    hashes.dedup();
    hashes.truncate(sketch_size);
    Ok(hashes)
}
