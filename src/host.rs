//! Sequential reference strategy.
//!
//! A stable two-pass counting sort over host memory. Runs synchronously on
//! the calling thread and produces exactly what the device pipeline produces
//! for the same input.

use crate::bucket::{BucketRule, check_recount, exclusive_prefix_sum};
use crate::error::Result;
use crate::key::{Payload, RangeKey};
use crate::memory::{PartitionOutput, Scratch};

/// Partition `keys`/`vals` in place into `rule.comm_size()` buckets.
///
/// `keys` and `vals` must have the same length and `scratch` must hold at
/// least that many pairs; the caller checks both. Under
/// [`OutOfRangePolicy::Reject`](crate::OutOfRangePolicy::Reject) an
/// out-of-range key fails the call before any buffer is written.
pub(crate) fn partition<K: RangeKey, V: Payload>(
    rule: &BucketRule<K>,
    keys: &mut [K],
    vals: &mut [V],
    scratch: &mut Scratch<K, V>,
    verify_recount: bool,
    output: &mut PartitionOutput,
) -> Result<()> {
    let comm = rule.comm_size();
    let items = keys.len();

    let mut counts = vec![0usize; comm];
    let mut clamped = 0usize;
    for &k in keys.iter() {
        counts[rule.bucket_of(k)?] += 1;
        if !rule.in_range(k) {
            clamped += 1;
        }
    }

    let offsets = exclusive_prefix_sum(&counts);

    let (temp_keys, temp_vals) = scratch.split_mut(items);
    let mut cursor = vec![0usize; comm];
    for (&k, &v) in keys.iter().zip(vals.iter()) {
        let b = rule.bucket_of(k)?;
        let slot = offsets[b] + cursor[b];
        temp_keys[slot] = k;
        temp_vals[slot] = v;
        cursor[b] += 1;
    }

    keys.copy_from_slice(temp_keys);
    vals.copy_from_slice(temp_vals);

    let recounted = recount(rule, keys)?;
    if verify_recount {
        check_recount(&counts, &recounted)?;
    }
    output.publish(&recounted);

    if clamped > 0 {
        tracing::warn!(clamped, items, "keys outside the partition range were clamped");
    }
    tracing::debug!(items, buckets = comm, "host partition complete");
    Ok(())
}

fn recount<K: RangeKey>(rule: &BucketRule<K>, keys: &[K]) -> Result<Vec<usize>> {
    let mut counts = vec![0usize; rule.comm_size()];
    for &k in keys {
        counts[rule.bucket_of(k)?] += 1;
    }
    Ok(counts)
}
