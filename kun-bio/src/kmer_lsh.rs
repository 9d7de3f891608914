//! `KMerLSHTable`: a specialized LSH index keyed directly by sub-mer
//! selections over fixed-width k-mers, rather than by generic sketch
//! registers. Grounded in
//! `examples/original_source/include/pbcopper/algorithm/KMerIndex.h`.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Mutex;

use kmer_core::bits::wang_hash;
use kmer_core::submer::SubMerSelection;

/// Threshold below which bottom-K pooling uses the reserve+partial-sort
/// path; above it, a bounded max-heap is used instead. Grounded in
/// `KMerIndex.h`'s `generatePooledBottomK` split.
const SMALL_POOL_THRESHOLD: usize = 1024;

/// `(id, count)` result row, ordered by count descending then id
/// descending (spec §4.4).
pub type CountedId = (u64, u32);

struct Map {
    buckets: Mutex<HashMap<u64, Vec<u64>>>,
}

impl Map {
    fn new() -> Self {
        Map {
            buckets: Mutex::new(HashMap::new()),
        }
    }
}

/// A table over one or more [`SubMerSelection`] masks.
///
/// `sliding = false`: one hash per k-mer per mask (bit-sampling
/// Hamming-LSH); `sliding = true`: one hash per shifted kernel placement
/// per mask (translation-invariant k-mer-set LSH). `bottom_k = Some(k)`
/// overrides both: hashes from every mask/kernel are pooled per k-mer,
/// sorted ascending, and the `k` smallest are kept, each inserted as an
/// independent key against a single shared map.
pub struct KMerLshTable {
    selections: Vec<SubMerSelection>,
    kmer_length: usize,
    sliding: bool,
    bottom_k: Option<usize>,
    maps: Vec<Map>,
}

impl KMerLshTable {
    pub fn new(selections: Vec<SubMerSelection>, kmer_length: usize, sliding: bool, bottom_k: Option<usize>) -> Self {
        let num_maps = if bottom_k.is_some() { 1 } else { selections.len() };
        KMerLshTable {
            selections,
            kmer_length,
            sliding,
            bottom_k,
            maps: (0..num_maps).map(|_| Map::new()).collect(),
        }
    }

    pub fn kmer_length(&self) -> usize {
        self.kmer_length
    }

    fn sub_hashes_for_selection(&self, kmer: u64, selection: &SubMerSelection) -> Vec<u64> {
        if !self.sliding {
            return vec![wang_hash(selection.select_subseq(kmer))];
        }
        let k = self.kmer_length as u32;
        let num_kernels = selection.number_of_kernels(k);
        let mut out = Vec::with_capacity(num_kernels as usize);
        for offset in 0..num_kernels {
            if let Ok(sub) = selection.select_subseq_at(kmer, k, offset) {
                out.push(wang_hash(sub));
            }
        }
        out
    }

    /// Inserts one k-mer's hashes under `id`. Locks only the per-map
    /// mutexes it touches, so concurrent inserts into distinct maps
    /// never contend.
    pub fn insert(&self, kmer: u64, id: u64) {
        if let Some(k) = self.bottom_k {
            let mut pooled: Vec<u64> = Vec::new();
            for selection in &self.selections {
                pooled.extend(self.sub_hashes_for_selection(kmer, selection));
            }
            let smallest = bottom_k_smallest(pooled, k);
            let map = &self.maps[0];
            let mut guard = map.buckets.lock().unwrap();
            for key in smallest {
                guard.entry(key).or_default().push(id);
            }
            return;
        }
        for (map_idx, selection) in self.selections.iter().enumerate() {
            let hashes = self.sub_hashes_for_selection(kmer, selection);
            let map = &self.maps[map_idx];
            let mut guard = map.buckets.lock().unwrap();
            for key in hashes {
                guard.entry(key).or_default().push(id);
            }
        }
    }

    /// `InsertThreadSafe` partitioned parallel insertion: deterministic
    /// per-item id pre-computation (`start_index + position`) so the
    /// final assignment matches the serial order regardless of which
    /// thread finishes first.
    pub fn insert_parallel(&self, kmers: &[u64], start_index: u64) {
        use rayon::prelude::*;
        kmers.par_iter().enumerate().for_each(|(i, &kmer)| {
            self.insert(kmer, start_index + i as u64);
        });
    }

    /// `Query`: hashes `kmer` the same way insertion does, merges hits
    /// from every relevant map, and returns `(id, count)` rows sorted by
    /// count descending then id descending.
    pub fn query(&self, kmer: u64) -> Vec<CountedId> {
        let mut counts: HashMap<u64, u32> = HashMap::new();
        if let Some(k) = self.bottom_k {
            let mut pooled: Vec<u64> = Vec::new();
            for selection in &self.selections {
                pooled.extend(self.sub_hashes_for_selection(kmer, selection));
            }
            let smallest = bottom_k_smallest(pooled, k);
            let guard = self.maps[0].buckets.lock().unwrap();
            for key in smallest {
                if let Some(bucket) = guard.get(&key) {
                    for &id in bucket {
                        *counts.entry(id).or_insert(0) += 1;
                    }
                }
            }
        } else {
            for (map_idx, selection) in self.selections.iter().enumerate() {
                let hashes = self.sub_hashes_for_selection(kmer, selection);
                let guard = self.maps[map_idx].buckets.lock().unwrap();
                for key in hashes {
                    if let Some(bucket) = guard.get(&key) {
                        for &id in bucket {
                            *counts.entry(id).or_insert(0) += 1;
                        }
                    }
                }
            }
        }
        sorted_counts(counts)
    }

    /// `MapQuery`: same as [`Self::query`] but over many k-mers at once,
    /// merging all hit counts before sorting.
    pub fn map_query(&self, kmers: &[u64]) -> Vec<CountedId> {
        let mut counts: HashMap<u64, u32> = HashMap::new();
        for &kmer in kmers {
            for (id, c) in self.query(kmer) {
                *counts.entry(id).or_insert(0) += c;
            }
        }
        sorted_counts(counts)
    }
}

fn sorted_counts(counts: HashMap<u64, u32>) -> Vec<CountedId> {
    let mut rows: Vec<CountedId> = counts.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));
    rows
}

/// Keeps the `k` smallest values of `values`. Below the size threshold,
/// sorts in place and truncates; above it, uses a bounded max-heap so
/// memory stays `O(k)` rather than `O(n)`.
fn bottom_k_smallest(mut values: Vec<u64>, k: usize) -> Vec<u64> {
    if values.len() <= SMALL_POOL_THRESHOLD {
        values.sort_unstable();
        values.truncate(k);
        return values;
    }
    let mut heap: BinaryHeap<u64> = BinaryHeap::with_capacity(k + 1);
    for v in values {
        if heap.len() < k {
            heap.push(v);
        } else if let Some(&top) = heap.peek() {
            if v < top {
                heap.pop();
                heap.push(v);
            }
        }
    }
    let mut out: Vec<u64> = heap.into_sorted_vec();
    out.reverse();
    out.sort_unstable();
    out
}

#[allow(dead_code)]
fn bottom_k_smallest_reverse_helper(v: Reverse<u64>) -> u64 {
    v.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_k_small_pool_matches_sort() {
        let values: Vec<u64> = vec![9, 3, 7, 1, 5, 2];
        let result = bottom_k_smallest(values, 3);
        assert_eq!(result, vec![1, 2, 3]);
    }

    #[test]
    fn bottom_k_large_pool_matches_small_pool() {
        let values: Vec<u64> = (0..2000).rev().collect();
        let small_path = {
            let mut v = values.clone();
            v.sort_unstable();
            v.truncate(5);
            v
        };
        let large_path = bottom_k_smallest(values, 5);
        assert_eq!(small_path, large_path);
    }

    #[test]
    fn non_sliding_query_returns_inserted_id() {
        let selection = SubMerSelection::from_positions(&[0, 1, 2]);
        let table = KMerLshTable::new(vec![selection], 16, false, None);
        table.insert(0xABCD, 42);
        let rows = table.query(0xABCD);
        assert_eq!(rows.first().map(|(id, _)| *id), Some(42));
    }

    #[test]
    fn bottom_k_mode_uses_single_map() {
        let selections = vec![
            SubMerSelection::from_positions(&[0, 1]),
            SubMerSelection::from_positions(&[2, 3]),
        ];
        let table = KMerLshTable::new(selections, 16, false, Some(2));
        assert_eq!(table.maps.len(), 1);
        table.insert(0x1234, 7);
        let rows = table.query(0x1234);
        assert_eq!(rows.first().map(|(id, _)| *id), Some(7));
    }

    #[test]
    fn map_query_merges_counts_across_kmers() {
        let selection = SubMerSelection::from_positions(&[0, 1, 2]);
        let table = KMerLshTable::new(vec![selection], 16, false, None);
        table.insert(10, 1);
        table.insert(20, 1);
        let rows = table.map_query(&[10, 20]);
        assert_eq!(rows.first().map(|(id, count)| (*id, *count)), Some((1, 2)));
    }

    #[test]
    fn query_sorted_by_count_desc_then_id_desc() {
        let selection = SubMerSelection::from_positions(&[0, 1, 2, 3]);
        let table = KMerLshTable::new(vec![selection], 16, true, None);
        table.insert(0x55, 1);
        table.insert(0x55, 2);
        table.insert(0x66, 3);
        let rows = table.query(0x55);
        // id 2 and 1 tie on count; 2 sorts first by id desc.
        assert!(rows.iter().position(|(id, _)| *id == 2).unwrap() < rows.iter().position(|(id, _)| *id == 1).unwrap());
    }
}
