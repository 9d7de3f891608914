//! Bit-packed DNA encodings, a reversible 64-bit hash, sub-mer selection,
//! and canonical k-mer / minimizer sketching — the shared substrate for
//! the LSH index, de Bruijn graph, POA engine, and aligners built on top
//! of it in the `kun-bio` crate.

pub mod bits;
pub mod error;
pub mod hash;
pub mod io;
pub mod parallel;
pub mod sketch;
pub mod submer;

pub use bits::{canonical_representation, reverse_complement, wang_hash, wang_hash_inv, DnaBit};
pub use error::{Error, Result};
pub use sketch::{canonical_kmers, scan_minimizers, KmerWindow, Meros};
pub use submer::SubMerSelection;
