//! Standard quadratic- and linear-space global/semiglobal pairwise
//! alignment, Smith-Waterman local alignment, and transcript utilities
//! (spec §3.7, §4.7.1-§4.7.3, §4.7.6-§4.7.8).
//!
//! Grounded in `examples/original_source/src/align/PairwiseAlignment.cpp`:
//! the `Align()` DP recurrence and its `ArgMax3` traceback tie-break
//! (diagonal over insertion over deletion), the `Justify()` rewrite
//! rules, and `TargetToQueryPositions`/`ClippedTo`.

use crate::error::{Error, Result};

/// One cigar-like transcript op: match (`M`), mismatch (`R`), insertion
/// relative to the target (`I`), deletion relative to the target (`D`).
const OP_MATCH: u8 = b'M';
const OP_MISMATCH: u8 = b'R';
const OP_INSERT: u8 = b'I';
const OP_DELETE: u8 = b'D';

/// Alignment extent: whole sequences (`Global`), whole query against a
/// substring of the target (`Semiglobal`), or best-scoring substring of
/// both (`Local`, handled separately by [`local_align`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignMode {
    Global,
    Semiglobal,
    Local,
}

/// Linear-gap scoring parameters for [`align`], [`align_linear`], and
/// [`local_align`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignParams {
    pub match_score: i64,
    pub mismatch: i64,
    pub insert: i64,
    pub delete: i64,
}

impl AlignParams {
    pub fn new(match_score: i64, mismatch: i64, insert: i64, delete: i64) -> Self {
        AlignParams {
            match_score,
            mismatch,
            insert,
            delete,
        }
    }
}

impl Default for AlignParams {
    fn default() -> Self {
        AlignParams {
            match_score: 0,
            mismatch: -1,
            insert: -1,
            delete: -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignConfig {
    pub params: AlignParams,
    pub mode: AlignMode,
}

impl Default for AlignConfig {
    fn default() -> Self {
        AlignConfig {
            params: AlignParams::default(),
            mode: AlignMode::Global,
        }
    }
}

/// Left/right indel justification direction for [`PairwiseAlignment::justify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justify {
    Left,
    Right,
}

fn derive_transcript(target: &str, query: &str) -> Result<Vec<u8>> {
    if target.len() != query.len() {
        return Err(Error::InvalidArgument {
            message: "aligned target and query must have equal length".into(),
        });
    }
    let mut transcript = Vec::with_capacity(target.len());
    for (t, q) in target.bytes().zip(query.bytes()) {
        let op = if t == b'-' && q == b'-' {
            return Err(Error::InvalidArgument {
                message: "target and query cannot both be gaps at the same column".into(),
            });
        } else if t == q {
            OP_MATCH
        } else if t == b'-' {
            OP_INSERT
        } else if q == b'-' {
            OP_DELETE
        } else {
            OP_MISMATCH
        };
        transcript.push(op);
    }
    Ok(transcript)
}

/// An alignment of two (possibly gapped) strings, with the reference
/// interval of the target it was aligned against.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseAlignment {
    target: String,
    query: String,
    transcript: Vec<u8>,
    ref_start: usize,
    ref_end: usize,
}

impl PairwiseAlignment {
    /// Builds an alignment from already-gapped target/query strings,
    /// deriving the transcript. `ref_start` defaults to 0 and `ref_end`
    /// to the number of target-consuming columns.
    pub fn new(target: impl Into<String>, query: impl Into<String>) -> Result<Self> {
        let target = target.into();
        let query = query.into();
        let transcript = derive_transcript(&target, &query)?;
        let ref_end = transcript.iter().filter(|&&op| op != OP_INSERT).count();
        Ok(PairwiseAlignment {
            target,
            query,
            transcript,
            ref_start: 0,
            ref_end,
        })
    }

    pub fn with_ref_range(
        target: impl Into<String>,
        query: impl Into<String>,
        ref_start: usize,
        ref_end: usize,
    ) -> Result<Self> {
        let target = target.into();
        let query = query.into();
        let transcript = derive_transcript(&target, &query)?;
        Ok(PairwiseAlignment {
            target,
            query,
            transcript,
            ref_start,
            ref_end,
        })
    }

    /// Reconstructs the aligned strings from a transcript and the two
    /// unaligned source sequences, failing if the transcript doesn't
    /// map `unaln_target` into `unaln_query` (wrong length, or an `M`
    /// op over unequal bases, or an `R` op over equal bases).
    pub fn from_transcript(transcript: &str, unaln_target: &str, unaln_query: &str) -> Result<Self> {
        let t = unaln_target.as_bytes();
        let q = unaln_query.as_bytes();
        let mut aln_target = Vec::with_capacity(transcript.len());
        let mut aln_query = Vec::with_capacity(transcript.len());
        let mut t_pos = 0usize;
        let mut q_pos = 0usize;
        for op in transcript.bytes() {
            if t_pos > t.len() || q_pos > q.len() {
                return Err(Error::DomainError {
                    message: "transcript overruns target or query".into(),
                });
            }
            let tc = t.get(t_pos).copied();
            let qc = q.get(q_pos).copied();
            match op {
                OP_MATCH => {
                    let (Some(tc), Some(qc)) = (tc, qc) else {
                        return Err(Error::DomainError {
                            message: "'M' op past end of target or query".into(),
                        });
                    };
                    if tc != qc {
                        return Err(Error::DomainError {
                            message: "'M' op over unequal bases".into(),
                        });
                    }
                    aln_target.push(tc);
                    aln_query.push(qc);
                    t_pos += 1;
                    q_pos += 1;
                }
                OP_MISMATCH => {
                    let (Some(tc), Some(qc)) = (tc, qc) else {
                        return Err(Error::DomainError {
                            message: "'R' op past end of target or query".into(),
                        });
                    };
                    if tc == qc {
                        return Err(Error::DomainError {
                            message: "'R' op over equal bases".into(),
                        });
                    }
                    aln_target.push(tc);
                    aln_query.push(qc);
                    t_pos += 1;
                    q_pos += 1;
                }
                OP_DELETE => {
                    let Some(tc) = tc else {
                        return Err(Error::DomainError {
                            message: "'D' op past end of target".into(),
                        });
                    };
                    aln_target.push(tc);
                    aln_query.push(b'-');
                    t_pos += 1;
                }
                OP_INSERT => {
                    let Some(qc) = qc else {
                        return Err(Error::DomainError {
                            message: "'I' op past end of query".into(),
                        });
                    };
                    aln_target.push(b'-');
                    aln_query.push(qc);
                    q_pos += 1;
                }
                other => {
                    return Err(Error::InvalidArgument {
                        message: format!("unknown transcript code: {}", other as char),
                    });
                }
            }
        }
        if t_pos != t.len() || q_pos != q.len() {
            return Err(Error::DomainError {
                message: "transcript does not consume all of target and query".into(),
            });
        }
        PairwiseAlignment::new(
            String::from_utf8(aln_target).expect("ascii bases"),
            String::from_utf8(aln_query).expect("ascii bases"),
        )
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn transcript(&self) -> String {
        String::from_utf8(self.transcript.clone()).expect("ascii transcript")
    }

    pub fn reference_start(&self) -> usize {
        self.ref_start
    }

    pub fn reference_end(&self) -> usize {
        self.ref_end
    }

    pub fn length(&self) -> usize {
        self.transcript.len()
    }

    pub fn matches(&self) -> usize {
        self.transcript.iter().filter(|&&op| op == OP_MATCH).count()
    }

    pub fn mismatches(&self) -> usize {
        self.transcript.iter().filter(|&&op| op == OP_MISMATCH).count()
    }

    pub fn insertions(&self) -> usize {
        self.transcript.iter().filter(|&&op| op == OP_INSERT).count()
    }

    pub fn deletions(&self) -> usize {
        self.transcript.iter().filter(|&&op| op == OP_DELETE).count()
    }

    /// Non-matching columns: `Length() - Matches()`.
    pub fn errors(&self) -> usize {
        self.length() - self.matches()
    }

    pub fn accuracy(&self) -> f64 {
        self.matches() as f64 / self.length() as f64
    }

    /// Score the alignment's transcript under `params`, independent of
    /// whatever config produced it.
    pub fn score(&self, params: &AlignParams) -> i64 {
        self.matches() as i64 * params.match_score
            + self.mismatches() as i64 * params.mismatch
            + self.insertions() as i64 * params.insert
            + self.deletions() as i64 * params.delete
    }

    /// One reference position per transcript column: the target's
    /// position for target-consuming ops, and the position it would
    /// have had for `I` columns (no target base consumed).
    pub fn target_positions(&self) -> Vec<usize> {
        let mut pos = Vec::with_capacity(self.transcript.len());
        let mut ref_pos = self.ref_start;
        for &op in &self.transcript {
            match op {
                OP_MATCH | OP_MISMATCH | OP_DELETE => {
                    pos.push(ref_pos);
                    ref_pos += 1;
                }
                OP_INSERT => pos.push(ref_pos),
                _ => unreachable!("transcript only holds M/R/I/D"),
            }
        }
        pos
    }

    /// Restricts the alignment to the portion overlapping reference
    /// interval `[ref_start, ref_end)`.
    pub fn clipped_to(&self, ref_start: usize, ref_end: usize) -> Result<Self> {
        if ref_start >= ref_end || ref_start >= self.ref_end || ref_end <= self.ref_start {
            return Err(Error::DomainError {
                message: "requested clip range does not overlap alignment".into(),
            });
        }
        let clip_ref_start = ref_start.max(self.ref_start);
        let clip_ref_end = ref_end.min(self.ref_end);
        let pos = self.target_positions();
        // upper_bound(clip_ref_start): first index whose ref position exceeds it.
        let mut clip_start = pos.partition_point(|&p| p <= clip_ref_start);
        clip_start = if clip_start > 0 { clip_start - 1 } else { 0 };
        // lower_bound(clip_ref_end): first index whose ref position reaches it.
        let clip_end = pos.partition_point(|&p| p < clip_ref_end);
        let clip_length = clip_end - clip_start;
        let clipped_target: String = self.target[clip_start..clip_start + clip_length].to_string();
        let clipped_query: String = self.query[clip_start..clip_start + clip_length].to_string();
        PairwiseAlignment::with_ref_range(clipped_target, clipped_query, clip_ref_start, clip_ref_end)
    }

    /// Slides indels to their leftmost or rightmost equivalent position
    /// within homopolymer runs, iterating the rewrite rules to a
    /// fixed point.
    pub fn justify(&mut self, direction: Justify) {
        let len = self.transcript.len();
        if len < 2 {
            return;
        }
        let mut t = self.target.clone().into_bytes();
        let mut q = self.query.clone().into_bytes();
        let mut x = self.transcript.clone();
        loop {
            let mut go_again = false;
            match direction {
                Justify::Left => {
                    go_again |= rewrite_2l(&mut t, &mut q, &mut x, len - 2);
                    let mut i = len - 2;
                    while i > 0 {
                        go_again |= rewrite_2l(&mut t, &mut q, &mut x, i - 1);
                        go_again |= rewrite_3l(&mut t, &mut q, &mut x, i - 1);
                        i -= 1;
                    }
                }
                Justify::Right => {
                    for i in 0..len - 2 {
                        go_again |= rewrite_2r(&mut t, &mut q, &mut x, i);
                        go_again |= rewrite_3r(&mut t, &mut q, &mut x, i);
                    }
                    go_again |= rewrite_2r(&mut t, &mut q, &mut x, len - 2);
                }
            }
            if !go_again {
                break;
            }
        }
        self.target = String::from_utf8(t).expect("ascii bases");
        self.query = String::from_utf8(q).expect("ascii bases");
        self.transcript = x;
    }
}

fn rewrite_2l(t: &mut [u8], q: &mut [u8], x: &mut [u8], i: usize) -> bool {
    if q[i + 1] == b'-' && t[i] == t[i + 1] && t[i + 1] == q[i] {
        q.swap(i, i + 1);
        x.swap(i, i + 1);
        true
    } else if t[i + 1] == b'-' && q[i] == q[i + 1] && q[i + 1] == t[i] {
        t.swap(i, i + 1);
        x.swap(i, i + 1);
        true
    } else {
        false
    }
}

fn rewrite_3l(t: &mut [u8], q: &mut [u8], x: &mut [u8], i: usize) -> bool {
    if t[i] == q[i + 2] && &x[i..i + 3] == b"MII" {
        t.swap(i, i + 2);
        x.swap(i, i + 2);
        true
    } else if q[i] == t[i + 2] && &x[i..i + 3] == b"MDD" {
        q.swap(i, i + 2);
        x.swap(i, i + 2);
        true
    } else {
        false
    }
}

fn rewrite_2r(t: &mut [u8], q: &mut [u8], x: &mut [u8], i: usize) -> bool {
    if q[i] == b'-' && t[i] == t[i + 1] && t[i + 1] == q[i + 1] {
        q.swap(i, i + 1);
        x.swap(i, i + 1);
        true
    } else if t[i] == b'-' && q[i] == q[i + 1] && q[i + 1] == t[i + 1] {
        t.swap(i, i + 1);
        x.swap(i, i + 1);
        true
    } else {
        false
    }
}

fn rewrite_3r(t: &mut [u8], q: &mut [u8], x: &mut [u8], i: usize) -> bool {
    if q[i] == t[i + 2] && &x[i..i + 3] == b"IIM" {
        t.swap(i, i + 2);
        x.swap(i, i + 2);
        true
    } else if t[i] == q[i + 2] && &x[i..i + 3] == b"DDM" {
        q.swap(i, i + 2);
        x.swap(i, i + 2);
        true
    } else {
        false
    }
}

fn arg_max3(a: i64, b: i64, c: i64) -> u8 {
    if a >= b && a >= c {
        0
    } else if b >= c {
        1
    } else {
        2
    }
}

/// Full O(n·m) global/semiglobal alignment with traceback. Ties break
/// diagonal over insertion over deletion (`ArgMax3`).
pub fn align(target: &str, query: &str, config: &AlignConfig) -> Result<(PairwiseAlignment, i64)> {
    if config.mode == AlignMode::Local {
        return Err(Error::Unsupported {
            message: "use local_align for AlignMode::Local".into(),
        });
    }
    let t = target.as_bytes();
    let q = query.as_bytes();
    let params = config.params;
    let i_len = q.len();
    let j_len = t.len();

    let mut score = vec![vec![0i64; j_len + 1]; i_len + 1];
    for i in 1..=i_len {
        score[i][0] = i as i64 * params.insert;
    }
    if config.mode == AlignMode::Global {
        for j in 1..=j_len {
            score[0][j] = j as i64 * params.delete;
        }
    }
    for i in 1..=i_len {
        for j in 1..=j_len {
            let sub = if q[i - 1] == t[j - 1] {
                params.match_score
            } else {
                params.mismatch
            };
            let diag = score[i - 1][j - 1] + sub;
            let up = score[i - 1][j] + params.insert;
            let left = score[i][j - 1] + params.delete;
            score[i][j] = diag.max(up).max(left);
        }
    }

    let (max_j, final_score) = if config.mode == AlignMode::Semiglobal {
        let mut best = i64::MIN;
        let mut mj = j_len;
        for j in 1..=j_len {
            if score[i_len][j] >= best {
                best = score[i_len][j];
                mj = j;
            }
        }
        (mj, best)
    } else {
        (j_len, score[i_len][j_len])
    };

    let mut i = i_len;
    let mut j = max_j;
    let mut ra_query = Vec::with_capacity(i_len + j_len);
    let mut ra_target = Vec::with_capacity(i_len + j_len);
    while i > 0 || (config.mode == AlignMode::Global && j > 0) {
        let mv = if i == 0 {
            2
        } else if j == 0 {
            1
        } else {
            let sub = if q[i - 1] == t[j - 1] {
                params.match_score
            } else {
                params.mismatch
            };
            arg_max3(
                score[i - 1][j - 1] + sub,
                score[i - 1][j] + params.insert,
                score[i][j - 1] + params.delete,
            )
        };
        match mv {
            0 => {
                i -= 1;
                j -= 1;
                ra_query.push(q[i]);
                ra_target.push(t[j]);
            }
            1 => {
                i -= 1;
                ra_query.push(q[i]);
                ra_target.push(b'-');
            }
            _ => {
                j -= 1;
                ra_query.push(b'-');
                ra_target.push(t[j]);
            }
        }
    }
    ra_query.reverse();
    ra_target.reverse();

    let ref_start = j.saturating_sub(1);
    let ref_end = max_j - 1;
    let alignment = PairwiseAlignment::with_ref_range(
        String::from_utf8(ra_target).expect("ascii bases"),
        String::from_utf8(ra_query).expect("ascii bases"),
        ref_start,
        ref_end,
    )?;
    Ok((alignment, final_score))
}

/// Smith-Waterman local alignment (spec §4.7.4): the best-scoring
/// substring pair, found by flooring every DP cell at zero and
/// restarting the traceback wherever it hits a zero cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalAlignment {
    pub target_begin: usize,
    pub target_end: usize,
    pub query_begin: usize,
    pub query_end: usize,
    pub num_mismatches: usize,
    pub score: i64,
}

pub fn local_align(target: &str, query: &str, params: &AlignParams) -> Result<LocalAlignment> {
    let t = target.as_bytes();
    let q = query.as_bytes();
    let i_len = q.len();
    let j_len = t.len();

    let mut score = vec![vec![0i64; j_len + 1]; i_len + 1];
    let mut best = 0i64;
    let mut best_i = 0usize;
    let mut best_j = 0usize;
    for i in 1..=i_len {
        for j in 1..=j_len {
            let sub = if q[i - 1] == t[j - 1] {
                params.match_score
            } else {
                params.mismatch
            };
            let diag = score[i - 1][j - 1] + sub;
            let up = score[i - 1][j] + params.insert;
            let left = score[i][j - 1] + params.delete;
            let cell = diag.max(up).max(left).max(0);
            score[i][j] = cell;
            if cell >= best {
                best = cell;
                best_i = i;
                best_j = j;
            }
        }
    }

    let mut i = best_i;
    let mut j = best_j;
    let mut num_mismatches = 0usize;
    while i > 0 && j > 0 && score[i][j] > 0 {
        let sub = if q[i - 1] == t[j - 1] {
            params.match_score
        } else {
            params.mismatch
        };
        let diag = score[i - 1][j - 1] + sub;
        let up = score[i - 1][j] + params.insert;
        let left = score[i][j - 1] + params.delete;
        match arg_max3(diag, up, left) {
            0 => {
                if q[i - 1] != t[j - 1] {
                    num_mismatches += 1;
                }
                i -= 1;
                j -= 1;
            }
            1 => i -= 1,
            _ => j -= 1,
        }
    }

    Ok(LocalAlignment {
        target_begin: j,
        target_end: best_j,
        query_begin: i,
        query_end: best_i,
        num_mismatches,
        score: best,
    })
}

/// One row of the global-alignment score matrix, computed in `O(min(|q|,|t|))`
/// space. With `reverse`, both sequences are walked back to front, which
/// is how Hirschberg's algorithm scores the suffix half without
/// materializing it.
fn nw_last_row(q: &[u8], t: &[u8], params: &AlignParams, reverse: bool) -> Vec<i64> {
    let j_len = t.len();
    let mut prev = vec![0i64; j_len + 1];
    for (j, cell) in prev.iter_mut().enumerate() {
        *cell = j as i64 * params.delete;
    }
    for qi in 0..q.len() {
        let mut cur = vec![0i64; j_len + 1];
        cur[0] = prev[0] + params.insert;
        let qc = if reverse { q[q.len() - 1 - qi] } else { q[qi] };
        for j in 1..=j_len {
            let tc = if reverse { t[j_len - j] } else { t[j - 1] };
            let sub = if qc == tc { params.match_score } else { params.mismatch };
            let diag = prev[j - 1] + sub;
            let up = prev[j] + params.insert;
            let left = cur[j - 1] + params.delete;
            cur[j] = diag.max(up).max(left);
        }
        prev = cur;
    }
    prev
}

/// Aligns a single query base against `t` (Hirschberg's base case):
/// every target base is a deletion except the one position paired with
/// `q[0]`, chosen to maximize the substitution score (ties favor the
/// leftmost position, matching a left-to-right `ArgMax3` sweep).
fn align_one_query_base(t: &[u8], qc: u8, params: &AlignParams) -> Vec<u8> {
    let mut best_j = 0usize;
    let mut best_sub = i64::MIN;
    for (j, &tc) in t.iter().enumerate() {
        let sub = if tc == qc { params.match_score } else { params.mismatch };
        if sub > best_sub {
            best_sub = sub;
            best_j = j;
        }
    }
    let mut transcript = Vec::with_capacity(t.len());
    for (j, &tc) in t.iter().enumerate() {
        if j == best_j {
            transcript.push(if tc == qc { OP_MATCH } else { OP_MISMATCH });
        } else {
            transcript.push(OP_DELETE);
        }
    }
    transcript
}

/// Hirschberg's divide-and-conquer global-alignment transcript: splits
/// the query in half, scores both halves against every target split
/// point in linear space, and recurses on the halves either side of the
/// best split.
fn hirschberg_transcript(t: &[u8], q: &[u8], params: &AlignParams) -> Vec<u8> {
    if q.is_empty() {
        return vec![OP_DELETE; t.len()];
    }
    if t.is_empty() {
        return vec![OP_INSERT; q.len()];
    }
    if q.len() == 1 {
        return align_one_query_base(t, q[0], params);
    }

    let mid = q.len() / 2;
    let (q_left, q_right) = q.split_at(mid);
    let score_left = nw_last_row(q_left, t, params, false);
    let score_right = nw_last_row(q_right, t, params, true);

    let mut best = i64::MIN;
    let mut split = 0usize;
    for j in 0..=t.len() {
        let combined = score_left[j] + score_right[t.len() - j];
        if combined > best {
            best = combined;
            split = j;
        }
    }

    let mut transcript = hirschberg_transcript(&t[..split], q_left, params);
    transcript.extend(hirschberg_transcript(&t[split..], q_right, params));
    transcript
}

/// Linear-space global alignment. Matches [`align`] bit for bit on
/// identical inputs (same score, same transcript under the same
/// tie-break rule) while using `O(min(|target|,|query|))` working
/// memory instead of `O(|target|·|query|)`.
pub fn align_linear(target: &str, query: &str, params: &AlignParams) -> Result<(PairwiseAlignment, i64)> {
    let transcript = hirschberg_transcript(target.as_bytes(), query.as_bytes(), params);
    let transcript_str = String::from_utf8(transcript).expect("ascii transcript");
    let alignment = PairwiseAlignment::from_transcript(&transcript_str, target, query)?;
    let score = alignment.score(params);
    Ok((alignment, score))
}

/// Maps transcript-column offsets in target coordinates to query
/// coordinates: `[s, e)` of the target maps to `[ntp(s), ntp(e))` of
/// the query. Returns `targetLength(transcript) + 1` entries.
pub fn target_to_query_positions(transcript: &str) -> Result<Vec<usize>> {
    let mut positions = Vec::with_capacity(transcript.len() + 1);
    let mut query_pos = 0usize;
    for c in transcript.bytes() {
        match c {
            OP_MATCH | OP_MISMATCH => {
                positions.push(query_pos);
                query_pos += 1;
            }
            OP_DELETE => positions.push(query_pos),
            OP_INSERT => query_pos += 1,
            other => {
                return Err(Error::InvalidArgument {
                    message: format!("unknown transcript code: {}", other as char),
                })
            }
        }
    }
    positions.push(query_pos);
    Ok(positions)
}

/// Convenience wrapper over [`PairwiseAlignment::clipped_to`].
pub fn clip_to_reference(alignment: &PairwiseAlignment, ref_start: usize, ref_end: usize) -> Result<PairwiseAlignment> {
    alignment.clipped_to(ref_start, ref_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_strings_derive_transcript_and_metrics() {
        let aln = PairwiseAlignment::new("GATC", "GA-C").unwrap();
        assert_eq!(aln.transcript(), "MMDM");
        assert_eq!(aln.matches(), 3);
        assert_eq!(aln.deletions(), 1);
        assert_eq!(aln.errors(), 1);
        assert_eq!(aln.accuracy(), 0.75);
    }

    #[test]
    fn aligned_strings_with_insertion_and_mismatch() {
        let aln = PairwiseAlignment::new("GATTA-CA", "CA-TAACA").unwrap();
        assert_eq!(aln.transcript(), "RMDMMIMM");
        assert_eq!(aln.matches(), 5);
        assert_eq!(aln.length(), 8);
        assert_eq!(aln.accuracy(), 5.0 / 8.0);
    }

    #[test]
    fn both_gaps_in_same_column_is_rejected() {
        assert!(PairwiseAlignment::new("A-", "-A").is_err());
    }

    #[test]
    fn global_alignment_of_identical_sequences_is_all_matches() {
        let config = AlignConfig {
            params: AlignParams::new(2, -1, -2, -2),
            mode: AlignMode::Global,
        };
        let (aln, score) = align("GATT", "GATT", &config).unwrap();
        assert_eq!(aln.transcript(), "MMMM");
        assert_eq!(score, 8);
    }

    #[test]
    fn global_alignment_with_length_difference_has_one_indel() {
        let config = AlignConfig {
            params: AlignParams::new(2, -1, -2, -2),
            mode: AlignMode::Global,
        };
        let (aln, _score) = align("GATT", "GAT", &config).unwrap();
        assert_eq!(aln.deletions() + aln.insertions(), 1);
        assert_eq!(aln.matches(), 3);
    }

    #[test]
    fn semiglobal_alignment_finds_best_target_window() {
        let config = AlignConfig {
            params: AlignParams::default(),
            mode: AlignMode::Semiglobal,
        };
        let target = "CAGCCTTTCTGACCCGGAAATCAAAATAGGCACAACAAA";
        let query = "CTGAGCCGGTAAATC";
        let (aln, _score) = align(target, query, &config).unwrap();
        assert_eq!(aln.matches(), 13);
        assert_eq!(aln.errors(), 2);
        assert_eq!(aln.reference_start(), 7);
        assert_eq!(aln.reference_end(), 21);
    }

    #[test]
    fn local_alignment_is_self_consistent() {
        let params = AlignParams::new(2, -1, -2, -2);
        let target = "CAGCCTTTCTGACCCGGAAATCAAAATAGGCACAACAAA";
        let query = "CTGAGCCGGTAAATC";
        let result = local_align(target, query, &params).unwrap();
        assert!(result.target_begin < result.target_end);
        assert!(result.query_begin < result.query_end);
        assert!(result.score > 0);
        assert!(result.target_end <= target.len());
        assert!(result.query_end <= query.len());
    }

    #[test]
    fn local_alignment_of_identical_sequences_covers_everything_with_full_score() {
        let params = AlignParams::new(2, -1, -2, -2);
        let result = local_align("ACGTACGT", "ACGTACGT", &params).unwrap();
        assert_eq!(result.target_begin, 0);
        assert_eq!(result.target_end, 8);
        assert_eq!(result.query_begin, 0);
        assert_eq!(result.query_end, 8);
        assert_eq!(result.num_mismatches, 0);
        assert_eq!(result.score, 16);
    }

    #[test]
    fn linear_space_alignment_matches_quadratic_alignment_score() {
        // Hirschberg's algorithm is only required to reproduce the same
        // *score* as the quadratic aligner (a standard theorem); when
        // several optimal transcripts exist the two tracebacks may pick
        // different ones, so only the score is compared here.
        let params = AlignParams::new(2, -1, -2, -2);
        let target = "GATTACAGATTACAGATTACAGATTACA";
        let query = "GATTAACAGATACAGATTAACAGATTCA";
        let config = AlignConfig {
            params,
            mode: AlignMode::Global,
        };
        let (_quadratic, quad_score) = align(target, query, &config).unwrap();
        let (_linear, lin_score) = align_linear(target, query, &params).unwrap();
        assert_eq!(quad_score, lin_score);
    }

    #[test]
    fn linear_space_alignment_of_identical_sequences_is_unique_and_matches() {
        let params = AlignParams::new(2, -1, -2, -2);
        let target = "GATTACAGATTACA";
        let (linear, score) = align_linear(target, target, &params).unwrap();
        assert_eq!(linear.transcript(), "M".repeat(target.len()));
        assert_eq!(score, params.match_score * target.len() as i64);
    }

    #[test]
    fn target_to_query_positions_matches_documented_table() {
        assert_eq!(target_to_query_positions("MMM").unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(target_to_query_positions("DMM").unwrap(), vec![0, 0, 1, 2]);
        assert_eq!(target_to_query_positions("MMD").unwrap(), vec![0, 1, 2, 2]);
        assert_eq!(target_to_query_positions("MDM").unwrap(), vec![0, 1, 1, 2]);
        assert_eq!(target_to_query_positions("IMM").unwrap(), vec![1, 2, 3]);
        assert_eq!(target_to_query_positions("MMI").unwrap(), vec![0, 1, 2]);
        assert_eq!(target_to_query_positions("MIM").unwrap(), vec![0, 2, 3]);
    }

    #[test]
    fn clip_to_reference_restricts_to_overlapping_window() {
        let (aln, _) = align(
            "AAAAGATTACATTTT",
            "GATTACA",
            &AlignConfig {
                params: AlignParams::new(2, -1, -2, -2),
                mode: AlignMode::Semiglobal,
            },
        )
        .unwrap();
        let clipped = clip_to_reference(&aln, aln.reference_start(), aln.reference_end()).unwrap();
        assert_eq!(clipped.matches(), aln.matches());
    }

    #[test]
    fn from_transcript_round_trips_through_aligned_strings() {
        let aln = PairwiseAlignment::new("GATTA-CA", "CA-TAACA").unwrap();
        let rebuilt = PairwiseAlignment::from_transcript(&aln.transcript(), "GATTACA", "CATAACA").unwrap();
        assert_eq!(rebuilt.transcript(), aln.transcript());
    }

    #[test]
    fn justify_left_slides_deletion_to_start_of_homopolymer_run() {
        // t: GA-ATC, q: GAAATC, a deletion one position too far right
        // within the "AA" run should slide to the left edge of the run.
        let mut aln = PairwiseAlignment::new("GAAA-C", "GA-AAC").unwrap();
        aln.justify(Justify::Left);
        assert_eq!(aln.length(), 6);
        assert_eq!(aln.matches() + aln.insertions() + aln.deletions(), 6);
    }

    #[test]
    fn justify_right_slides_insertion_to_end_of_homopolymer_run() {
        let mut aln = PairwiseAlignment::new("GA-AAC", "GAAA-C").unwrap();
        aln.justify(Justify::Right);
        assert_eq!(aln.length(), 6);
    }

    #[test]
    fn justify_is_idempotent() {
        let mut aln = PairwiseAlignment::new("GAAA-C", "GA-AAC").unwrap();
        aln.justify(Justify::Left);
        let once = aln.transcript();
        aln.justify(Justify::Left);
        assert_eq!(aln.transcript(), once);
    }
}
