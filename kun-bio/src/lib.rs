//! LSH sketch indexes, a de Bruijn graph engine, a POA consensus engine,
//! and pairwise/banded-chain DNA aligners, built on `kmer-core`'s bit
//! substrate and register-block hashing.

pub mod align;
pub mod debruijn;
pub mod error;
pub mod kmer_lsh;
pub mod lsh;
pub mod poa;

pub use error::{Error, Result};
pub use kmer_lsh::KMerLshTable;
pub use lsh::LshIndex;
