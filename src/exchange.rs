//! Hand-off to the all-to-all exchange that follows partitioning.
//!
//! After partitioning, bucket `r` of every participant is destined for rank
//! `r`. [`ExchangePlan`] turns a [`PartitionOutput`] into the byte ranges a
//! network all-to-all sends from the key and value buffers;
//! [`exchange_local`] performs the same exchange between in-process batches.

use crate::error::{Result, ShuffleError};
use crate::memory::PartitionOutput;
use crate::types::Rank;
use std::ops::Range;

/// Where one destination's bucket lives in the partitioned buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpan {
    pub rank: Rank,
    pub item_offset: usize,
    pub item_count: usize,
    /// Byte range within the key buffer.
    pub key_bytes: Range<usize>,
    /// Byte range within the value buffer.
    pub val_bytes: Range<usize>,
}

impl BucketSpan {
    pub fn items(&self) -> Range<usize> {
        self.item_offset..self.item_offset + self.item_count
    }

    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }
}

/// Send layout for one partitioned batch: one span per destination rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangePlan {
    spans: Vec<BucketSpan>,
}

impl ExchangePlan {
    /// Build the plan for keys of `key_size` bytes and values of `val_size` bytes.
    pub fn from_output(output: &PartitionOutput, key_size: usize, val_size: usize) -> Self {
        let spans = (0..output.comm_size())
            .map(|bucket| {
                let key_off = output.key_offsets()[bucket];
                let key_cnt = output.key_counts()[bucket];
                let val_off = output.val_offsets()[bucket];
                let val_cnt = output.val_counts()[bucket];
                BucketSpan {
                    rank: bucket as Rank,
                    item_offset: key_off,
                    item_count: key_cnt,
                    key_bytes: key_off * key_size..(key_off + key_cnt) * key_size,
                    val_bytes: val_off * val_size..(val_off + val_cnt) * val_size,
                }
            })
            .collect();
        Self { spans }
    }

    /// Build the plan for buffers of `K` keys and `V` values.
    pub fn for_types<K, V>(output: &PartitionOutput) -> Self {
        Self::from_output(output, std::mem::size_of::<K>(), std::mem::size_of::<V>())
    }

    pub fn spans(&self) -> &[BucketSpan] {
        &self.spans
    }

    pub fn span(&self, rank: Rank) -> Result<&BucketSpan> {
        self.spans
            .get(rank as usize)
            .ok_or(ShuffleError::InvalidRank {
                rank,
                world_size: self.spans.len() as u32,
            })
    }

    /// Items sent to each rank, indexed by rank.
    pub fn send_counts(&self) -> Vec<usize> {
        self.spans.iter().map(|s| s.item_count).collect()
    }

    /// The slice of a partitioned buffer destined for `rank`.
    pub fn bucket<'a, T>(&self, buf: &'a [T], rank: Rank) -> Result<&'a [T]> {
        let span = self.span(rank)?;
        buf.get(span.items())
            .ok_or(ShuffleError::BufferSizeMismatch {
                what: "partitioned buffer",
                expected: span.item_offset + span.item_count,
                actual: buf.len(),
            })
    }
}

/// One participant's partitioned batch, borrowed for the exchange.
#[derive(Debug, Clone, Copy)]
pub struct Partitioned<'a, K, V> {
    pub keys: &'a [K],
    pub vals: &'a [V],
    pub output: &'a PartitionOutput,
}

/// What one rank holds after the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received<K, V> {
    pub keys: Vec<K>,
    pub vals: Vec<V>,
    /// Items received from each source rank, indexed by source.
    pub from_counts: Vec<usize>,
}

/// All-to-all between in-process participants.
///
/// `sources[s]` is rank `s`'s partitioned batch. Rank `r` receives bucket `r`
/// of every source, concatenated in source-rank order, so the relative order
/// of pairs from one source is preserved.
pub fn exchange_local<K: Copy, V: Copy>(
    sources: &[Partitioned<'_, K, V>],
) -> Result<Vec<Received<K, V>>> {
    let world = sources.len();
    let plans: Vec<ExchangePlan> = sources
        .iter()
        .map(|src| {
            if src.output.comm_size() != world {
                return Err(ShuffleError::BufferSizeMismatch {
                    what: "bucket array",
                    expected: world,
                    actual: src.output.comm_size(),
                });
            }
            Ok(ExchangePlan::for_types::<K, V>(src.output))
        })
        .collect::<Result<_>>()?;

    let mut received = Vec::with_capacity(world);
    for dest in 0..world as Rank {
        let total: usize = plans.iter().map(|p| p.spans[dest as usize].item_count).sum();
        let mut keys = Vec::with_capacity(total);
        let mut vals = Vec::with_capacity(total);
        let mut from_counts = Vec::with_capacity(world);
        for (src, plan) in sources.iter().zip(&plans) {
            let ks = plan.bucket(src.keys, dest)?;
            let vs = plan.bucket(src.vals, dest)?;
            keys.extend_from_slice(ks);
            vals.extend_from_slice(vs);
            from_counts.push(ks.len());
        }
        tracing::debug!(dest, items = keys.len(), "local exchange delivered");
        received.push(Received {
            keys,
            vals,
            from_counts,
        });
    }
    Ok(received)
}
