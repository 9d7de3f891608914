use std::collections::HashMap;

use clap::{Parser, ValueEnum};

use kun_bio::align::affine::{align_affine, align_affine_iupac};
use kun_bio::align::banded_chain::{BandedChainAlign, BandedChainAlignConfig};
use kun_bio::align::pairwise::{align, local_align, AlignConfig, AlignMode as PairwiseAlignMode, AlignParams};
use kun_bio::align::seed_chain::{chain_seeds, ChainSeedsConfig, Seed};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Mode {
    Global,
    Semiglobal,
    Local,
    Affine,
    AffineIupac,
    Banded,
}

/// Align two DNA sequences under a chosen scoring model.
#[derive(Parser, Debug)]
pub struct Args {
    /// Reference (target) sequence.
    #[arg(short, long)]
    pub target: String,

    /// Query sequence.
    #[arg(short, long)]
    pub query: String,

    /// Alignment mode.
    #[arg(short, long, value_enum, default_value_t = Mode::Global)]
    pub mode: Mode,

    /// Exact-match seed length used to anchor `--mode banded`.
    #[arg(long, default_value_t = 12)]
    pub seed_length: usize,
}

pub fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    match args.mode {
        Mode::Global => print_pairwise(&args.target, &args.query, PairwiseAlignMode::Global)?,
        Mode::Semiglobal => print_pairwise(&args.target, &args.query, PairwiseAlignMode::Semiglobal)?,
        Mode::Local => {
            let params = AlignParams::default();
            let result = local_align(&args.target, &args.query, &params)?;
            println!(
                "target[{}..{}] vs query[{}..{}]  mismatches={}  score={}",
                result.target_begin,
                result.target_end,
                result.query_begin,
                result.query_end,
                result.num_mismatches,
                result.score
            );
        }
        Mode::Affine => {
            let (alignment, score) = align_affine(&args.target, &args.query)?;
            print_aligned(alignment.target(), alignment.query(), score as f64);
        }
        Mode::AffineIupac => {
            let (alignment, score) = align_affine_iupac(&args.target, &args.query)?;
            print_aligned(alignment.target(), alignment.query(), score as f64);
        }
        Mode::Banded => {
            let seeds = exact_match_seeds(&args.target, &args.query, args.seed_length);
            if seeds.is_empty() {
                return Err(format!(
                    "no exact matches of length {} found between target and query",
                    args.seed_length
                )
                .into());
            }
            let chains = chain_seeds(&seeds, &ChainSeedsConfig::default());
            let best_chain = chains.into_iter().next().expect("chain_seeds: non-empty seeds yield a chain");
            let alignment = BandedChainAlign::align(
                &args.target,
                &args.query,
                &best_chain,
                &BandedChainAlignConfig::default(),
            )?;
            print_aligned(alignment.aligned_target(), alignment.aligned_query(), alignment.score());
        }
    }
    Ok(())
}

fn print_pairwise(
    target: &str,
    query: &str,
    mode: PairwiseAlignMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AlignConfig {
        params: AlignParams::default(),
        mode,
    };
    let (alignment, score) = align(target, query, &config)?;
    println!("target: {}", alignment.target());
    println!("query:  {}", alignment.query());
    println!(
        "transcript: {}  matches={} mismatches={} insertions={} deletions={} accuracy={:.4} score={}",
        alignment.transcript(),
        alignment.matches(),
        alignment.mismatches(),
        alignment.insertions(),
        alignment.deletions(),
        alignment.accuracy(),
        score
    );
    Ok(())
}

fn print_aligned(target: &str, query: &str, score: f64) {
    println!("target: {}", target);
    println!("query:  {}", query);
    let matches = target.bytes().zip(query.bytes()).filter(|(a, b)| a == b).count();
    println!("matches={} score={}", matches, score);
}

/// Naive O(n) exact-match seeding: every `seed_length`-mer of `query`
/// indexed by position, matched against every `seed_length`-mer of
/// `target` in turn. Good enough to anchor a demonstration banded-chain
/// alignment; not a substitute for a real seed index.
fn exact_match_seeds(target: &str, query: &str, seed_length: usize) -> Vec<Seed> {
    let t = target.as_bytes();
    let q = query.as_bytes();
    if seed_length == 0 || t.len() < seed_length || q.len() < seed_length {
        return Vec::new();
    }

    let mut query_positions: HashMap<&[u8], Vec<usize>> = HashMap::new();
    for i in 0..=q.len() - seed_length {
        query_positions
            .entry(&q[i..i + seed_length])
            .or_default()
            .push(i);
    }

    let mut seeds = Vec::new();
    for j in 0..=t.len() - seed_length {
        if let Some(positions) = query_positions.get(&t[j..j + seed_length]) {
            for &i in positions {
                seeds.push(Seed::new(j as u64, i as u64, seed_length as u64));
            }
        }
    }
    seeds
}
