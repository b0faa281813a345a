//! Key-to-bucket routing shared by both execution strategies.
//!
//! The range `[begin, end)` is split into `comm_size` equal-width buckets.
//! A key `k` goes to `floor((k - begin) * comm_size / (end - begin))`,
//! evaluated in exact integer arithmetic so both strategies agree bit for bit.

use crate::error::{Result, ShuffleError};
use crate::key::RangeKey;
use crate::types::OutOfRangePolicy;
use std::marker::PhantomData;

/// Half-open key range `[begin, end)` with `end > begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange<K: RangeKey> {
    begin: K,
    end: K,
}

impl<K: RangeKey> KeyRange<K> {
    pub fn new(begin: K, end: K) -> Result<Self> {
        if end <= begin {
            return Err(ShuffleError::InvalidRange {
                begin: begin.widen(),
                end: end.widen(),
            });
        }
        Ok(Self { begin, end })
    }

    pub fn begin(&self) -> K {
        self.begin
    }

    pub fn end(&self) -> K {
        self.end
    }
}

/// Routes keys of one range to one of `comm_size` buckets.
#[derive(Debug, Clone, Copy)]
pub struct BucketRule<K: RangeKey> {
    begin: i128,
    span: i128,
    comm_size: usize,
    policy: OutOfRangePolicy,
    _key: PhantomData<K>,
}

impl<K: RangeKey> BucketRule<K> {
    /// Build a rule for `range` split across `comm_size` participants.
    pub fn new(range: KeyRange<K>, comm_size: u32, policy: OutOfRangePolicy) -> Result<Self> {
        if comm_size == 0 {
            return Err(ShuffleError::InvalidCommSize { comm_size });
        }
        let begin = range.begin().widen();
        Ok(Self {
            begin,
            span: range.end().widen() - begin,
            comm_size: comm_size as usize,
            policy,
            _key: PhantomData,
        })
    }

    pub fn comm_size(&self) -> usize {
        self.comm_size
    }

    pub fn policy(&self) -> OutOfRangePolicy {
        self.policy
    }

    /// Whether `key` routes without clamping.
    #[inline]
    pub fn in_range(&self, key: K) -> bool {
        let rel = key.widen() - self.begin;
        rel >= 0 && rel < self.span
    }

    /// Bucket index of `key`, always in `0..comm_size` on success.
    #[inline]
    pub fn bucket_of(&self, key: K) -> Result<usize> {
        let rel = key.widen() - self.begin;
        if rel < 0 {
            return self.outside(key, 0);
        }
        if rel >= self.span {
            return self.outside(key, self.comm_size - 1);
        }
        // rel < span, so the quotient is strictly below comm_size.
        Ok((rel * self.comm_size as i128 / self.span) as usize)
    }

    /// First key (inclusive) routed to `bucket` when keys are in range.
    pub fn lower_bound(&self, bucket: usize) -> i128 {
        // Smallest rel with rel * n >= bucket * span, i.e. ceil(bucket * span / n).
        let n = self.comm_size as i128;
        self.begin + (bucket as i128 * self.span + n - 1) / n
    }

    fn outside(&self, key: K, clamped: usize) -> Result<usize> {
        match self.policy {
            OutOfRangePolicy::Clamp => Ok(clamped),
            OutOfRangePolicy::Reject => Err(ShuffleError::KeyOutOfRange {
                key: key.widen(),
                begin: self.begin,
                end: self.begin + self.span,
            }),
        }
    }
}

/// Exclusive prefix sum: `offsets[0] = 0`, `offsets[i] = offsets[i-1] + counts[i-1]`.
///
/// The result has one entry per count.
pub fn exclusive_prefix_sum(counts: &[usize]) -> Vec<usize> {
    counts
        .iter()
        .scan(0usize, |running, &count| {
            let offset = *running;
            *running += count;
            Some(offset)
        })
        .collect()
}

/// Compare the post-scatter recount with the first count, bucket by bucket.
pub(crate) fn check_recount(first: &[usize], recount: &[usize]) -> Result<()> {
    for (bucket, (&expected, &actual)) in first.iter().zip(recount).enumerate() {
        if expected != actual {
            return Err(ShuffleError::RecountMismatch {
                bucket,
                expected,
                actual,
            });
        }
    }
    Ok(())
}
