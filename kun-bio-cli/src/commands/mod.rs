pub mod align;
pub mod debruijn;
pub mod index;
pub mod poa;

use std::path::Path;

use kmer_core::io::{dyn_reader, FastaReader, Sequence};

/// Reads every record of a (possibly gzipped) FASTA file into memory.
/// Shared by every subcommand that ingests a file of reads.
pub fn read_fasta_records(path: &Path) -> std::io::Result<Vec<Sequence>> {
    let inner = dyn_reader(path)?;
    let mut reader = FastaReader::new(inner);
    let mut records = Vec::new();
    while let Some(record) = reader.next_record()? {
        if !record.seq.is_empty() {
            records.push(record);
        }
    }
    Ok(records)
}
