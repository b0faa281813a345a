//! Six-pass device partitioning pipeline.
//!
//! Each pass is a parallel-for over fixed-size chunks of the batch and runs
//! only after the previous pass has fully completed:
//!
//! 1. **Zero**: clear bucket totals and per-chunk histograms.
//! 2. **Count**: per-chunk histograms, atomically added into bucket totals.
//! 3. **Offsets**: exclusive prefix sum of the totals, then the first slot
//!    every chunk owns inside every bucket.
//! 4. **Scatter**: each chunk copies its pairs, in input order, into its
//!    reserved slots of the temp buffers.
//! 5. **Copy back**: temp buffers overwrite the caller's buffers.
//! 6. **Recount**: count the partitioned keys again and publish counts and
//!    offsets.
//!
//! Chunks claim bucket slots in chunk order (pass 3), so the partition is
//! stable no matter how the passes are scheduled across threads.

use crate::bucket::{BucketRule, check_recount, exclusive_prefix_sum};
use crate::error::Result;
use crate::exchange::Partitioned;
use crate::key::{Payload, RangeKey};
use crate::memory::{PartitionOutput, Scratch};
use crate::types::GridDims;
use rayon::ThreadPool;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::shared::SharedSlice;

/// One stage of the device pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    Zero,
    Count,
    Offsets,
    ScatterToTemp,
    CopyBack,
    Recount,
}

impl PassKind {
    /// Every pass, in the order the pipeline issues them.
    pub const ORDER: [PassKind; 6] = [
        PassKind::Zero,
        PassKind::Count,
        PassKind::Offsets,
        PassKind::ScatterToTemp,
        PassKind::CopyBack,
        PassKind::Recount,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            PassKind::Zero => "zero",
            PassKind::Count => "count",
            PassKind::Offsets => "offsets",
            PassKind::ScatterToTemp => "scatter_to_temp",
            PassKind::CopyBack => "copy_back",
            PassKind::Recount => "recount",
        }
    }
}

impl std::fmt::Display for PassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Buffers and launch shape handed to the device path for one batch.
///
/// Ownership moves into the stream for the duration of the job and comes
/// back in the [`DeviceBatch`].
#[derive(Debug, Clone)]
pub struct DeviceJob<K, V> {
    pub keys: Vec<K>,
    pub vals: Vec<V>,
    pub grid: GridDims,
}

impl<K, V> DeviceJob<K, V> {
    pub fn new(keys: Vec<K>, vals: Vec<V>, grid: GridDims) -> Self {
        Self { keys, vals, grid }
    }

    /// Job for a flat grid with one emit per thread.
    pub fn flat(keys: Vec<K>, vals: Vec<V>) -> Self {
        let grid = GridDims::flat(keys.len());
        Self::new(keys, vals, grid)
    }
}

/// Buffers handed back by a completed device job.
///
/// The buffers always come back. `outcome` holds the per-bucket counts and
/// offsets, or the error that stopped the pipeline. A key rejected under
/// [`OutOfRangePolicy::Reject`](crate::OutOfRangePolicy::Reject) stops it
/// before the buffers are touched.
#[derive(Debug)]
pub struct DeviceBatch<K: RangeKey, V: Payload> {
    pub keys: Vec<K>,
    pub vals: Vec<V>,
    /// The scratch region, returned for reuse by the next batch.
    pub scratch: Scratch<K, V>,
    pub outcome: Result<PartitionOutput>,
}

impl<K: RangeKey, V: Payload> DeviceBatch<K, V> {
    /// Counts and offsets, if the pipeline succeeded.
    pub fn output(&self) -> Option<&PartitionOutput> {
        self.outcome.as_ref().ok()
    }

    /// Borrow the partitioned buffers for the exchange stage.
    pub fn view(&self) -> Option<Partitioned<'_, K, V>> {
        self.output().map(|output| Partitioned {
            keys: &self.keys,
            vals: &self.vals,
            output,
        })
    }
}

type PassFn<K, V> = fn(&mut PipelineState<K, V>, &ThreadPool) -> Result<()>;

pub(crate) struct PipelineState<K: RangeKey, V: Payload> {
    rule: BucketRule<K>,
    chunk_items: usize,
    verify_recount: bool,
    keys: Vec<K>,
    vals: Vec<V>,
    scratch: Scratch<K, V>,
    totals: Vec<AtomicUsize>,
    /// `num_chunks x comm_size`, chunk-major. Histograms after pass 2,
    /// per-chunk slot cursors after pass 3.
    chunk_hist: Vec<usize>,
    first_counts: Vec<usize>,
    clamped: AtomicUsize,
    output: PartitionOutput,
}

impl<K: RangeKey, V: Payload> PipelineState<K, V> {
    /// Caller guarantees `keys.len() == vals.len()` and that `scratch` holds
    /// at least that many pairs.
    pub(crate) fn new(
        rule: BucketRule<K>,
        chunk_items: usize,
        verify_recount: bool,
        job: DeviceJob<K, V>,
        scratch: Scratch<K, V>,
    ) -> Self {
        let comm = rule.comm_size();
        let chunk_items = chunk_items.max(1);
        let num_chunks = job.keys.len().div_ceil(chunk_items);
        Self {
            rule,
            chunk_items,
            verify_recount,
            keys: job.keys,
            vals: job.vals,
            scratch,
            totals: (0..comm).map(|_| AtomicUsize::new(0)).collect(),
            chunk_hist: vec![0; num_chunks * comm],
            first_counts: vec![0; comm],
            clamped: AtomicUsize::new(0),
            output: PartitionOutput::new(comm),
        }
    }

    fn passes() -> [(PassKind, PassFn<K, V>); 6] {
        [
            (PassKind::Zero, zero::<K, V>),
            (PassKind::Count, count::<K, V>),
            (PassKind::Offsets, offsets::<K, V>),
            (PassKind::ScatterToTemp, scatter_to_temp::<K, V>),
            (PassKind::CopyBack, copy_back::<K, V>),
            (PassKind::Recount, recount::<K, V>),
        ]
    }

    /// Run every pass in order on `pool`, stopping at the first failure.
    ///
    /// Passes 1-3 never touch the key/value buffers, so a rejected key leaves
    /// them exactly as submitted.
    pub(crate) fn run(mut self, pool: &ThreadPool) -> DeviceBatch<K, V> {
        let status = self.run_passes(pool);
        DeviceBatch {
            keys: self.keys,
            vals: self.vals,
            scratch: self.scratch,
            outcome: status.map(|()| self.output),
        }
    }

    fn run_passes(&mut self, pool: &ThreadPool) -> Result<()> {
        let items = self.keys.len();
        let buckets = self.rule.comm_size();
        for (kind, pass) in Self::passes() {
            tracing::debug!(pass = kind.name(), items, buckets, "device pass");
            pass(self, pool)?;
        }

        let clamped = self.clamped.load(Ordering::Relaxed);
        if clamped > 0 {
            tracing::warn!(clamped, items, "keys outside the partition range were clamped");
        }
        Ok(())
    }
}

fn zero<K: RangeKey, V: Payload>(s: &mut PipelineState<K, V>, pool: &ThreadPool) -> Result<()> {
    let PipelineState {
        totals,
        chunk_hist,
        clamped,
        ..
    } = s;
    pool.install(|| {
        totals
            .par_iter()
            .for_each(|t| t.store(0, Ordering::Relaxed));
        chunk_hist.par_iter_mut().for_each(|h| *h = 0);
    });
    clamped.store(0, Ordering::Relaxed);
    Ok(())
}

fn count<K: RangeKey, V: Payload>(s: &mut PipelineState<K, V>, pool: &ThreadPool) -> Result<()> {
    let PipelineState {
        rule,
        chunk_items,
        keys,
        totals,
        chunk_hist,
        clamped,
        ..
    } = s;
    let rule = *rule;
    let comm = rule.comm_size();
    pool.install(|| {
        keys.par_chunks(*chunk_items)
            .zip(chunk_hist.par_chunks_mut(comm))
            .try_for_each(|(chunk, hist)| -> Result<()> {
                let mut outside = 0;
                for &k in chunk {
                    hist[rule.bucket_of(k)?] += 1;
                    if !rule.in_range(k) {
                        outside += 1;
                    }
                }
                for (total, &n) in totals.iter().zip(hist.iter()) {
                    if n > 0 {
                        total.fetch_add(n, Ordering::Relaxed);
                    }
                }
                if outside > 0 {
                    clamped.fetch_add(outside, Ordering::Relaxed);
                }
                Ok(())
            })
    })
}

fn offsets<K: RangeKey, V: Payload>(s: &mut PipelineState<K, V>, _pool: &ThreadPool) -> Result<()> {
    let PipelineState {
        rule,
        totals,
        chunk_hist,
        first_counts,
        ..
    } = s;
    for (count, total) in first_counts.iter_mut().zip(totals.iter()) {
        *count = total.load(Ordering::Relaxed);
    }

    let mut next_slot = exclusive_prefix_sum(first_counts);

    // Chunk c owns the slots of bucket b right after those of chunks 0..c.
    for hist in chunk_hist.chunks_mut(rule.comm_size()) {
        for (cell, slot) in hist.iter_mut().zip(next_slot.iter_mut()) {
            let n = *cell;
            *cell = *slot;
            *slot += n;
        }
    }
    Ok(())
}

fn scatter_to_temp<K: RangeKey, V: Payload>(
    s: &mut PipelineState<K, V>,
    pool: &ThreadPool,
) -> Result<()> {
    let PipelineState {
        rule,
        chunk_items,
        keys,
        vals,
        scratch,
        chunk_hist,
        ..
    } = s;
    let rule = *rule;
    let comm = rule.comm_size();
    let (temp_keys, temp_vals) = scratch.split_mut(keys.len());
    let temp_keys = SharedSlice::new(temp_keys);
    let temp_vals = SharedSlice::new(temp_vals);

    pool.install(|| {
        keys.par_chunks(*chunk_items)
            .zip(vals.par_chunks(*chunk_items))
            .zip(chunk_hist.par_chunks_mut(comm))
            .try_for_each(|((ks, vs), cursor)| -> Result<()> {
                for (&k, &v) in ks.iter().zip(vs) {
                    let b = rule.bucket_of(k)?;
                    let slot = cursor[b];
                    cursor[b] += 1;
                    // SAFETY: pass 3 gave every (chunk, bucket) pair its own
                    // run of slots, so no two chunks write the same index.
                    unsafe {
                        temp_keys.write(slot, k);
                        temp_vals.write(slot, v);
                    }
                }
                Ok(())
            })
    })
}

fn copy_back<K: RangeKey, V: Payload>(
    s: &mut PipelineState<K, V>,
    pool: &ThreadPool,
) -> Result<()> {
    let PipelineState {
        chunk_items,
        keys,
        vals,
        scratch,
        ..
    } = s;
    let chunk = *chunk_items;
    let (temp_keys, temp_vals) = scratch.split_mut(keys.len());
    pool.install(|| {
        keys.par_chunks_mut(chunk)
            .zip(temp_keys.par_chunks(chunk))
            .for_each(|(dst, src)| dst.copy_from_slice(src));
        vals.par_chunks_mut(chunk)
            .zip(temp_vals.par_chunks(chunk))
            .for_each(|(dst, src)| dst.copy_from_slice(src));
    });
    Ok(())
}

fn recount<K: RangeKey, V: Payload>(s: &mut PipelineState<K, V>, pool: &ThreadPool) -> Result<()> {
    let PipelineState {
        rule,
        chunk_items,
        verify_recount,
        keys,
        totals,
        first_counts,
        output,
        ..
    } = s;
    let rule = *rule;
    let comm = rule.comm_size();
    for t in totals.iter() {
        t.store(0, Ordering::Relaxed);
    }
    pool.install(|| {
        keys.par_chunks(*chunk_items)
            .try_for_each(|chunk| -> Result<()> {
                let mut local = vec![0usize; comm];
                for &k in chunk {
                    local[rule.bucket_of(k)?] += 1;
                }
                for (total, &n) in totals.iter().zip(local.iter()) {
                    if n > 0 {
                        total.fetch_add(n, Ordering::Relaxed);
                    }
                }
                Ok(())
            })
    })?;

    let recounted: Vec<usize> = totals.iter().map(|t| t.load(Ordering::Relaxed)).collect();
    if *verify_recount {
        check_recount(first_counts, &recounted)?;
    }
    output.publish(&recounted);
    Ok(())
}
