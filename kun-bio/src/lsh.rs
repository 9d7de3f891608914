//! Locality-sensitive hashing index over k-mer / MinHash sketches.
//!
//! Two backends share one representation: the bit-sampling / spaced-seed
//! index (one hash map per sub-signature, grouped into tables by
//! specificity `registersPerTable`) and the degenerate bottom-k index
//! (exactly one table with one map). Grounded bit-for-bit in
//! `examples/original_source/include/pbcopper/algorithm/LSHIndex.h`,
//! including the two documented bug fixes from that source: `CloneLike`
//! reads the canonical `is_bottom_k_only` field (no typo), and mutex
//! selection always locks when a shard mutex exists.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use kmer_core::hash::{simple_fast_hash, wyhash64_step, FastMod};

use crate::error::{Error, Result};

type Bucket = Vec<u64>;
type Shard = Mutex<HashMap<u64, Bucket>>;

struct LshTable {
    registers_per_table: usize,
    maps: Vec<Shard>,
}

impl LshTable {
    fn empty_like(&self) -> LshTable {
        LshTable {
            registers_per_table: self.registers_per_table,
            maps: (0..self.maps.len()).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }
}

/// A concurrent, shardable, serializable index over fixed-size sketches.
pub struct LshIndex {
    sketch_size: usize,
    total_ids: AtomicU64,
    tables: Vec<LshTable>,
    is_bottom_k_only: bool,
    is_locked: bool,
}

/// Result of [`LshIndex::update_query`]: the set of ids that shared at
/// least one bucket with the inserted sketch, their hit counts, and the
/// number of buckets that matched per processed (table, sub-signature)
/// row.
#[derive(Debug, Default)]
pub struct QueryResult {
    pub ids: Vec<u64>,
    pub counts: HashMap<u64, u32>,
    pub items_per_row: Vec<usize>,
}

impl LshIndex {
    /// Constructor 1: most general — explicit registers-per-signature and
    /// signatures-per-row for every table.
    pub fn new(
        sketch_size: usize,
        registers_per_signatures: &[usize],
        signatures_per_rows: &[usize],
    ) -> Result<Self> {
        if registers_per_signatures.len() != signatures_per_rows.len() {
            return Err(Error::InvalidArgument {
                message: "registers_per_signatures.len != signatures_per_rows.len".into(),
            });
        }
        let mut tables = Vec::with_capacity(registers_per_signatures.len());
        for (&r, &num_maps) in registers_per_signatures.iter().zip(signatures_per_rows) {
            if r == 0 {
                return Err(Error::DomainError {
                    message: "registersPerSignature must be > 0".into(),
                });
            }
            tables.push(LshTable {
                registers_per_table: r,
                maps: (0..num_maps).map(|_| Mutex::new(HashMap::new())).collect(),
            });
        }
        Ok(LshIndex {
            sketch_size,
            total_ids: AtomicU64::new(0),
            tables,
            is_bottom_k_only: false,
            is_locked: true,
        })
    }

    /// Constructor 2: signatures-per-row defaults to `M / registersPerSignature`.
    pub fn with_registers(sketch_size: usize, registers_per_signatures: &[usize]) -> Result<Self> {
        let signatures_per_rows: Vec<usize> = registers_per_signatures
            .iter()
            .map(|&r| {
                if r == 0 {
                    0
                } else {
                    (sketch_size + r - 1) / r
                }
            })
            .collect();
        Self::new(sketch_size, registers_per_signatures, &signatures_per_rows)
    }

    /// Constructor 3: `densified` picks one table per integer `r in [1,
    /// M]`; otherwise one table per power of two `r <= M`.
    pub fn densified(sketch_size: usize, densified: bool) -> Result<Self> {
        let registers: Vec<usize> = if densified {
            (1..=sketch_size).collect()
        } else {
            let mut v = Vec::new();
            let mut r = 1;
            while r <= sketch_size {
                v.push(r);
                r *= 2;
            }
            v
        };
        Self::with_registers(sketch_size, &registers)
    }

    /// Degenerate bottom-k index: exactly one table with one map.
    pub fn bottom_k(sketch_size: usize) -> Self {
        LshIndex {
            sketch_size,
            total_ids: AtomicU64::new(0),
            tables: vec![LshTable {
                registers_per_table: 1,
                maps: vec![Mutex::new(HashMap::new())],
            }],
            is_bottom_k_only: true,
            is_locked: true,
        }
    }

    pub fn sketch_size(&self) -> usize {
        self.sketch_size
    }

    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn is_bottom_k_only(&self) -> bool {
        self.is_bottom_k_only
    }

    pub fn total_ids(&self) -> u64 {
        self.total_ids.load(Ordering::SeqCst)
    }

    /// Atomic id issuance: `fetch_add(1)` on the monotonic counter.
    pub fn next_id(&self) -> u64 {
        self.total_ids.fetch_add(1, Ordering::SeqCst)
    }

    /// Creates an empty index with identical table shape and per-shard
    /// lock vector. Reads the canonical `is_bottom_k_only` field (fixes
    /// the original's `isBottomKOnly__` typo bug).
    pub fn clone_like(&self) -> Self {
        LshIndex {
            sketch_size: self.sketch_size,
            total_ids: AtomicU64::new(0),
            tables: self.tables.iter().map(LshTable::empty_like).collect(),
            is_bottom_k_only: self.is_bottom_k_only,
            is_locked: self.is_locked,
        }
    }

    fn hash_index(&self, sketch: &[u64], table_idx: usize, map_idx: usize) -> u64 {
        let table = &self.tables[table_idx];
        let r = table.registers_per_table;
        let m = self.sketch_size;
        let start = map_idx * r;
        if start + r <= m {
            kmer_core::hash::hash_memory(&sketch[start..start + r])
        } else {
            // seeded-walk fallback: M % r != 0, the last block would run
            // past the sketch.
            let seed0 = (((table_idx as u64) << 32) ^ ((table_idx as u64) >> 32)) | (map_idx as u64);
            let mut seed = simple_fast_hash(seed0);
            let fast_mod = FastMod::new(m as u64);
            let mut acc = 0u64;
            for step in 0..r {
                let pos = wyhash64_step(&mut seed);
                let idx = fast_mod.reduce(pos) as usize;
                acc ^= simple_fast_hash(sketch[idx] ^ acc.rotate_left(step as u32 + 1));
            }
            kmer_core::bits::wang_hash(acc)
        }
    }

    /// Insertion protocol (spec §4.3.2): for every table, for every
    /// sub-signature, compute `hashIndex` and append `id` to that
    /// bucket under that shard's lock.
    fn insert_at(&self, sketch: &[u64], id: u64) {
        if self.is_bottom_k_only {
            let map = &self.tables[0].maps[0];
            for &register in sketch {
                let mut guard = map.lock().unwrap();
                guard.entry(register).or_default().push(id);
            }
            return;
        }
        for table_idx in 0..self.tables.len() {
            for map_idx in 0..self.tables[table_idx].maps.len() {
                let h = self.hash_index(sketch, table_idx, map_idx);
                let mut guard = self.tables[table_idx].maps[map_idx].lock().unwrap();
                guard.entry(h).or_default().push(id);
            }
        }
    }

    /// Issues a new id and inserts `sketch` under it; returns the id.
    pub fn insert(&self, sketch: &[u64]) -> u64 {
        let id = self.next_id();
        self.insert_at(sketch, id);
        id
    }

    /// `UpdateQuery`: issues a new id, then for every (table,
    /// sub-signature) looks up existing bucket members (recording a hit
    /// each) before appending its own id. Exhaustive — never early-stops.
    pub fn update_query(&self, sketch: &[u64]) -> QueryResult {
        let my_id = self.next_id();
        let mut result = QueryResult::default();
        if self.is_bottom_k_only {
            let map = &self.tables[0].maps[0];
            for &register in sketch {
                let mut guard = map.lock().unwrap();
                let bucket = guard.entry(register).or_default();
                result.items_per_row.push(bucket.len());
                for &existing in bucket.iter() {
                    *result.counts.entry(existing).or_insert(0) += 1;
                    if !result.ids.contains(&existing) {
                        result.ids.push(existing);
                    }
                }
                bucket.push(my_id);
            }
            return result;
        }
        for table_idx in 0..self.tables.len() {
            for map_idx in 0..self.tables[table_idx].maps.len() {
                let h = self.hash_index(sketch, table_idx, map_idx);
                let mut guard = self.tables[table_idx].maps[map_idx].lock().unwrap();
                let bucket = guard.entry(h).or_default();
                result.items_per_row.push(bucket.len());
                for &existing in bucket.iter() {
                    *result.counts.entry(existing).or_insert(0) += 1;
                    if !result.ids.contains(&existing) {
                        result.ids.push(existing);
                    }
                }
                bucket.push(my_id);
            }
        }
        result
    }

    /// `Query(sketch, maxCandidates, startingIdx, earlyStop)`: iterate
    /// tables from most-specific (largest r) to least-specific,
    /// descending from `starting_idx` (default = number of tables).
    pub fn query(
        &self,
        sketch: &[u64],
        max_candidates: usize,
        starting_idx: Option<usize>,
        early_stop: bool,
    ) -> QueryResult {
        if self.is_bottom_k_only {
            return self.query_bottom_k(sketch, max_candidates, early_stop);
        }
        let start = starting_idx.unwrap_or(self.tables.len()).min(self.tables.len());
        let mut result = QueryResult::default();
        let mut seen: std::collections::HashSet<u64> = std::collections::HashSet::new();
        'outer: for table_idx in (0..start).rev() {
            for map_idx in 0..self.tables[table_idx].maps.len() {
                let h = self.hash_index(sketch, table_idx, map_idx);
                let guard = self.tables[table_idx].maps[map_idx].lock().unwrap();
                if let Some(bucket) = guard.get(&h) {
                    result.items_per_row.push(bucket.len());
                    for &id in bucket {
                        *result.counts.entry(id).or_insert(0) += 1;
                        if seen.insert(id) {
                            result.ids.push(id);
                        }
                    }
                } else {
                    result.items_per_row.push(0);
                }
                if early_stop && seen.len() >= max_candidates {
                    break 'outer;
                }
            }
        }
        result
    }

    /// Bottom-k query path (§4.3.7): walk each of the `|S|` values in
    /// turn and merge hits.
    fn query_bottom_k(&self, sketch: &[u64], max_candidates: usize, early_stop: bool) -> QueryResult {
        let map = &self.tables[0].maps[0];
        let mut result = QueryResult::default();
        let mut seen: std::collections::HashSet<u64> = std::collections::HashSet::new();
        for &register in sketch {
            let guard = map.lock().unwrap();
            if let Some(bucket) = guard.get(&register) {
                result.items_per_row.push(bucket.len());
                for &id in bucket {
                    *result.counts.entry(id).or_insert(0) += 1;
                    if seen.insert(id) {
                        result.ids.push(id);
                    }
                }
            } else {
                result.items_per_row.push(0);
            }
            if early_stop && seen.len() >= max_candidates {
                break;
            }
        }
        result
    }

    /// Serializes the index in the exact little-endian layout of spec
    /// §4.3.5.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_i64::<LittleEndian>(self.total_ids() as i64)?;
        let number_map_sets = self.tables.len() as i64;
        w.write_i64::<LittleEndian>(number_map_sets)?;
        for table in &self.tables {
            w.write_i64::<LittleEndian>(table.maps.len() as i64)?;
        }
        for table in &self.tables {
            w.write_i64::<LittleEndian>(table.registers_per_table as i64)?;
        }
        w.write_u8(self.is_bottom_k_only as u8)?;
        w.write_u8(self.is_locked as u8)?;
        for table in &self.tables {
            for shard in &table.maps {
                let guard = shard.lock().unwrap();
                w.write_u64::<LittleEndian>(guard.len() as u64)?;
                for (key, values) in guard.iter() {
                    w.write_u64::<LittleEndian>(values.len() as u64)?;
                    w.write_u64::<LittleEndian>(*key)?;
                    for v in values {
                        w.write_u64::<LittleEndian>(*v)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Reconstructs an index previously written by [`Self::write`],
    /// reconstructing the mutex vector iff `isLocked`.
    pub fn read<R: Read>(
        r: &mut R,
        sketch_size: usize,
        registers_per_signatures: &[usize],
    ) -> Result<Self> {
        let total_ids = r.read_i64::<LittleEndian>()?;
        let number_tables = r.read_i64::<LittleEndian>()?;
        let mut map_sizes = Vec::with_capacity(number_tables as usize);
        for _ in 0..number_tables {
            map_sizes.push(r.read_i64::<LittleEndian>()?);
        }
        let mut registers = Vec::with_capacity(number_tables as usize);
        for _ in 0..number_tables {
            registers.push(r.read_i64::<LittleEndian>()? as usize);
        }
        let is_bottom_k_only = r.read_u8()? != 0;
        let is_locked = r.read_u8()? != 0;

        if registers_per_signatures != registers.as_slice() {
            return Err(Error::InvalidArgument {
                message: format!(
                    "registers_per_signatures {:?} does not match the {:?} recorded in the stream",
                    registers_per_signatures, registers
                ),
            });
        }

        // table boundaries come straight from the per-table `mapSizes`/
        // `registersPerTable` entries; no grouping-by-equal-r inference.
        let mut tables = Vec::with_capacity(number_tables as usize);
        for (&num_maps, &r_per) in map_sizes.iter().zip(registers.iter()) {
            tables.push(LshTable {
                registers_per_table: r_per,
                maps: (0..num_maps).map(|_| Mutex::new(HashMap::new())).collect(),
            });
        }

        for table in &mut tables {
            for shard in &mut table.maps {
                let bucket_count = r.read_u64::<LittleEndian>()?;
                let mut map = HashMap::with_capacity(bucket_count as usize);
                for _ in 0..bucket_count {
                    let value_count = r.read_u64::<LittleEndian>()?;
                    let key = r.read_u64::<LittleEndian>()?;
                    let mut values = Vec::with_capacity(value_count as usize);
                    for _ in 0..value_count {
                        values.push(r.read_u64::<LittleEndian>()?);
                    }
                    map.insert(key, values);
                }
                *shard = Mutex::new(map);
            }
        }

        Ok(LshIndex {
            sketch_size,
            total_ids: AtomicU64::new(total_ids as u64),
            tables,
            is_bottom_k_only,
            is_locked,
        })
    }

    /// Deterministic parallel bulk insert: partitions `sketches` evenly
    /// across `rayon`'s global pool. Each worker pre-computes its
    /// starting id (`old_id + start_index`) so final id assignment
    /// matches the serial order regardless of completion order.
    pub fn insert_parallel(&self, sketches: &[Vec<u64>]) -> Vec<u64> {
        use rayon::prelude::*;
        let old_id = self.total_ids.fetch_add(sketches.len() as u64, Ordering::SeqCst);
        let ids: Vec<u64> = (0..sketches.len() as u64).map(|i| old_id + i).collect();
        sketches
            .par_iter()
            .zip(ids.par_iter())
            .for_each(|(sketch, &id)| self.insert_at(sketch, id));
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_after_insert() {
        let index = LshIndex::densified(8, false).unwrap();
        let sketch: Vec<u64> = (0..8).collect();
        let id = index.insert(&sketch);
        let result = index.query(&sketch, 10, None, false);
        let count = result.counts.get(&id).copied().unwrap_or(0);
        assert_eq!(count as usize, index.num_tables());
    }

    #[test]
    fn clone_like_is_empty_with_same_shape() {
        let index = LshIndex::with_registers(16, &[1, 2, 4]).unwrap();
        index.insert(&(0..16).collect::<Vec<_>>());
        let cloned = index.clone_like();
        assert_eq!(cloned.total_ids(), 0);
        assert_eq!(cloned.num_tables(), index.num_tables());
        assert_eq!(cloned.is_bottom_k_only(), index.is_bottom_k_only());
    }

    #[test]
    fn serialization_round_trip() {
        let index = LshIndex::with_registers(8, &[2, 4]).unwrap();
        let s1: Vec<u64> = (0..8).collect();
        let s2: Vec<u64> = (8..16).collect();
        index.insert(&s1);
        index.insert(&s2);

        let mut buf = Vec::new();
        index.write(&mut buf).unwrap();
        let restored = LshIndex::read(&mut &buf[..], 8, &[2, 4]).unwrap();
        assert_eq!(restored.total_ids(), index.total_ids());

        let r1 = index.query(&s1, 10, None, false);
        let r2 = restored.query(&s1, 10, None, false);
        assert_eq!(r1.ids.len(), r2.ids.len());
    }

    #[test]
    fn serialization_round_trip_preserves_distinct_tables_with_equal_registers() {
        // two tables sharing the same registers-per-table count must stay
        // distinct through a write/read cycle (not merge into one table).
        let index = LshIndex::with_registers(8, &[2, 2]).unwrap();
        assert_eq!(index.num_tables(), 2);

        let mut buf = Vec::new();
        index.write(&mut buf).unwrap();
        let restored = LshIndex::read(&mut &buf[..], 8, &[2, 2]).unwrap();
        assert_eq!(restored.num_tables(), 2);
    }

    #[test]
    fn bottom_k_membership() {
        let index = LshIndex::bottom_k(4);
        let sketch = vec![10u64, 20, 30, 40];
        let id = index.insert(&sketch);
        let result = index.query(&sketch, 10, None, false);
        assert_eq!(result.counts.get(&id).copied().unwrap_or(0), 4);
    }

    #[test]
    fn parallel_insert_matches_serial_order() {
        let index_serial = LshIndex::with_registers(4, &[1, 2]).unwrap();
        let sketches: Vec<Vec<u64>> = (0..20).map(|i| vec![i, i + 1, i + 2, i + 3]).collect();
        let mut serial_ids = Vec::new();
        for s in &sketches {
            serial_ids.push(index_serial.insert(s));
        }

        let index_parallel = LshIndex::with_registers(4, &[1, 2]).unwrap();
        let parallel_ids = index_parallel.insert_parallel(&sketches);
        assert_eq!(serial_ids, parallel_ids);
    }
}
