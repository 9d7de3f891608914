//! Canonical k-mer extraction and minimizer-window scanning.
//!
//! Grounded in the teacher's `seqkmer::feat`/`seqkmer::mmscanner` pair: a
//! rolling k-mer/l-mer cursor feeds a deque-based sliding-window minimum,
//! canonicalizing (and optionally masking via a spaced seed) each
//! candidate l-mer before it enters the window.

use crate::bits::{canonical_representation, fmix64, from_ascii, reverse_complement};
use crate::error::Result;

pub const DEFAULT_KMER_LENGTH: u32 = 35;
pub const DEFAULT_MINIMIZER_LENGTH: u32 = 31;
pub const DEFAULT_MINIMIZER_SPACES: u32 = 7;

/// One extracted window: forward 2-bit encoding, its reverse-complement,
/// and the canonical (min of the two) bit encoding — the external-facing
/// ingest contract: a vector of `(forwardHash, reverseHash, bitEncoding)`
/// triples, one per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerWindow {
    pub position: usize,
    pub forward: u64,
    pub reverse: u64,
    pub canonical: u64,
    pub width: u32,
}

/// Extract canonical k-mers (k <= 32) from a DNA sequence, keeping at
/// each position the lexicographic minimum of the k-mer and its
/// reverse complement.
pub fn canonical_kmers(seq: &[u8], k: u32) -> Result<Vec<KmerWindow>> {
    assert!(k > 0 && k <= 32);
    if (seq.len() as u32) < k {
        return Ok(Vec::new());
    }
    let mask = if k * 2 >= 64 {
        u64::MAX
    } else {
        (1u64 << (k * 2)) - 1
    };
    let mut out = Vec::with_capacity(seq.len() - k as usize + 1);
    let mut value: u64 = 0;
    for (i, &b) in seq.iter().enumerate() {
        let code = from_ascii(b)? as u64;
        value = ((value << 2) | code) & mask;
        if i + 1 >= k as usize {
            let rc = reverse_complement(value, k);
            out.push(KmerWindow {
                position: i + 1 - k as usize,
                forward: value,
                reverse: rc,
                canonical: value.min(rc),
                width: k,
            });
        }
    }
    Ok(out)
}

/// Rolling k-mer/l-mer builder: maintains a masked rolling value as bases
/// are appended one at a time.
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pub capacity: u32,
    pub value: u64,
    pub mask: u64,
    filled: u32,
}

impl Cursor {
    pub fn new(capacity: u32) -> Self {
        let mask = if capacity * 2 >= 64 {
            u64::MAX
        } else {
            (1u64 << (capacity * 2)) - 1
        };
        Cursor {
            capacity,
            value: 0,
            mask,
            filled: 0,
        }
    }

    /// Appends `code` (a 2-bit base) and returns `Some(value)` once the
    /// cursor has seen at least `capacity` bases.
    pub fn next_lmer(&mut self, code: u64) -> Option<u64> {
        self.value = ((self.value << 2) | code) & self.mask;
        self.filled = (self.filled + 1).min(self.capacity + 1);
        if self.filled >= self.capacity {
            Some(self.value)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct MinimizerData {
    pos: usize,
    candidate: u64,
}

/// Deque-based sliding-window minimum over l-mers within a k-mer window.
#[derive(Debug, Default)]
pub struct MinimizerWindow {
    deque: std::collections::VecDeque<MinimizerData>,
    window_size: usize,
}

impl MinimizerWindow {
    pub fn new(window_size: usize) -> Self {
        MinimizerWindow {
            deque: std::collections::VecDeque::new(),
            window_size,
        }
    }

    /// Pushes a new candidate l-mer at `pos`, evicting back-elements that
    /// are no longer smaller, and the front if it has slid out of the
    /// window. Returns `Some(minimizer)` when the window's minimum
    /// changes.
    pub fn push(&mut self, pos: usize, candidate: u64) -> Option<u64> {
        while let Some(back) = self.deque.back() {
            if back.candidate >= candidate {
                self.deque.pop_back();
            } else {
                break;
            }
        }
        self.deque.push_back(MinimizerData { pos, candidate });
        while let Some(front) = self.deque.front() {
            if front.pos + self.window_size <= pos {
                self.deque.pop_front();
            } else {
                break;
            }
        }
        self.deque.front().map(|m| m.candidate)
    }
}

/// Sketching configuration: k-mer length, minimizer (l-mer) length,
/// optional spaced-seed mask, and toggle mask used to perturb minimizer
/// selection away from low-complexity runs.
#[derive(Debug, Clone, Copy)]
pub struct Meros {
    pub k_mer: u32,
    pub l_mer: u32,
    pub mask: u64,
    pub spaced_seed_mask: u64,
    pub toggle_mask: u64,
    pub min_clear_hash_value: Option<u64>,
}

impl Meros {
    pub fn new(k_mer: u32, l_mer: u32, spaced_seed_mask: u64, toggle_mask: u64) -> Self {
        let mask = if l_mer * 2 >= 64 {
            u64::MAX
        } else {
            (1u64 << (l_mer * 2)) - 1
        };
        Meros {
            k_mer,
            l_mer,
            mask,
            spaced_seed_mask,
            toggle_mask: toggle_mask & mask,
            min_clear_hash_value: None,
        }
    }

    pub fn window_size(&self) -> usize {
        (self.k_mer - self.l_mer) as usize
    }
}

impl Default for Meros {
    fn default() -> Self {
        Meros::new(
            DEFAULT_KMER_LENGTH,
            DEFAULT_MINIMIZER_LENGTH,
            0x1a5a_5a5a_5a5a_5a5a & ((1u64 << (DEFAULT_MINIMIZER_LENGTH * 2)) - 1),
            crate::bits::DEFAULT_TOGGLE_MASK,
        )
    }
}

fn to_candidate_lmer(meros: &Meros, lmer: u64) -> u64 {
    let canonical = canonical_representation(lmer, meros.l_mer);
    if meros.spaced_seed_mask != 0 {
        canonical & meros.spaced_seed_mask
    } else {
        canonical
    }
}

/// Scans `seq` for minimizers according to `meros`, yielding
/// `(position, minimizer_hash)` pairs in the teacher's `MinimizerIterator`
/// style: each candidate l-mer is canonicalized (and optionally
/// spaced-seed masked) before entering the sliding window, and the
/// emitted hash is `fmix64(minimizer ^ toggle_mask)`.
pub fn scan_minimizers(seq: &[u8], meros: &Meros) -> Result<Vec<(usize, u64)>> {
    let mut cursor = Cursor::new(meros.l_mer);
    let mut window = MinimizerWindow::new(meros.window_size().max(1));
    let mut out = Vec::new();
    let mut last_emitted: Option<u64> = None;
    for (i, &b) in seq.iter().enumerate() {
        let code = from_ascii(b)? as u64;
        if let Some(lmer) = cursor.next_lmer(code) {
            let candidate = to_candidate_lmer(meros, lmer);
            if let Some(min_val) = window.push(i, candidate) {
                if last_emitted != Some(min_val) {
                    let hashed = fmix64(min_val ^ meros.toggle_mask);
                    out.push((i, hashed));
                    last_emitted = Some(min_val);
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_kmers_basic() {
        let windows = canonical_kmers(b"ACGTACGT", 4).unwrap();
        assert_eq!(windows.len(), 5);
        for w in &windows {
            assert_eq!(w.canonical, w.forward.min(w.reverse));
        }
    }

    #[test]
    fn minimizer_window_tracks_min() {
        let mut w = MinimizerWindow::new(3);
        assert_eq!(w.push(0, 5), Some(5));
        assert_eq!(w.push(1, 2), Some(2));
        assert_eq!(w.push(2, 8), Some(2));
        // pos 3 evicts pos 0 from window (window_size=3): front still pos1 val2 (1+3>3 false? 1+3=4>3 keeps)
        assert_eq!(w.push(3, 9), Some(2));
    }

    #[test]
    fn scan_minimizers_deterministic() {
        let meros = Meros::new(12, 8, 0, 0);
        let a = scan_minimizers(b"ACGTACGTACGTACGT", &meros).unwrap();
        let b = scan_minimizers(b"ACGTACGTACGTACGT", &meros).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }
}
