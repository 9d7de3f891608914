//! Producer/consumer parallel minimizer scanning over a FASTA source,
//! grounded in the teacher's `seqkmer::parallel::read_parallel`: one
//! producer thread reads records into a bounded channel, N-2 consumer
//! threads scan minimizers and invoke a user closure, and a final thread
//! folds the per-record results.

use std::io::Read;
use std::sync::mpsc::Receiver;

use crate::io::{FastaReader, Sequence};
use crate::sketch::{scan_minimizers, Meros};

/// Wraps a channel of per-record scan outputs.
pub struct ParallelResult<T> {
    pub rx: Receiver<T>,
}

impl<T> Iterator for ParallelResult<T> {
    type Item = T;
    fn next(&mut self) -> Option<T> {
        self.rx.recv().ok()
    }
}

/// Scans every record from `source` for minimizers using `meros`,
/// parallelized across `n_threads` worker threads (minus the producer
/// and folder thread), and calls `fold` on each `(Sequence, Vec<(usize,
/// u64)>)` pair as it becomes available from any worker, in arrival
/// order (not necessarily record order).
pub fn read_parallel<R, F, Out>(
    source: R,
    meros: Meros,
    n_threads: usize,
    fold: F,
) -> crate::error::Result<Vec<Out>>
where
    R: Read + Send + 'static,
    F: Fn(Sequence, Vec<(usize, u64)>) -> Out + Send + Sync,
    Out: Send,
{
    let workers = n_threads.saturating_sub(2).max(1);
    let (record_tx, record_rx) = crossbeam_channel::bounded::<Sequence>(workers * 4);
    let (result_tx, result_rx) = std::sync::mpsc::channel::<Out>();

    std::thread::scope(|scope| {
        scope.spawn(move || {
            let mut reader = FastaReader::new(source);
            while let Ok(Some(record)) = reader.next_record() {
                if record_tx.send(record).is_err() {
                    break;
                }
            }
        });

        for _ in 0..workers {
            let record_rx = record_rx.clone();
            let result_tx = result_tx.clone();
            let meros = meros;
            let fold = &fold;
            scope.spawn(move || {
                for record in record_rx.iter() {
                    if let Ok(windows) = scan_minimizers(&record.seq, &meros) {
                        let out = fold(record, windows);
                        if result_tx.send(out).is_err() {
                            break;
                        }
                    }
                }
            });
        }
        drop(result_tx);
    });

    Ok(ParallelResult { rx: result_rx }.collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn scans_all_records() {
        let data = b">a\nACGTACGTACGTACGT\n>b\nTTTTACGTACGTGGGG\n".to_vec();
        let meros = Meros::new(12, 8, 0, 0);
        let results = read_parallel(Cursor::new(data), meros, 4, |seq, windows| {
            (seq.id, windows.len())
        })
        .unwrap();
        assert_eq!(results.len(), 2);
    }
}
