use std::ops::Range;

/// Per-bucket counts and offsets produced by one partitioning call.
///
/// Index `i` describes bucket `i`, the items destined for rank `i`. Offsets
/// are the exclusive prefix sum of counts. Keys and values occupy the same
/// item ranges, so the key and value arrays are equal; both are kept because
/// the exchange stage addresses the two buffers separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionOutput {
    key_offsets: Vec<usize>,
    val_offsets: Vec<usize>,
    key_counts: Vec<usize>,
    val_counts: Vec<usize>,
}

impl PartitionOutput {
    /// Zeroed output for `comm_size` buckets.
    pub fn new(comm_size: usize) -> Self {
        Self {
            key_offsets: vec![0; comm_size],
            val_offsets: vec![0; comm_size],
            key_counts: vec![0; comm_size],
            val_counts: vec![0; comm_size],
        }
    }

    /// Number of buckets.
    pub fn comm_size(&self) -> usize {
        self.key_counts.len()
    }

    pub fn key_offsets(&self) -> &[usize] {
        &self.key_offsets
    }

    pub fn val_offsets(&self) -> &[usize] {
        &self.val_offsets
    }

    pub fn key_counts(&self) -> &[usize] {
        &self.key_counts
    }

    pub fn val_counts(&self) -> &[usize] {
        &self.val_counts
    }

    /// Total number of partitioned items.
    pub fn total(&self) -> usize {
        self.key_counts.iter().sum()
    }

    /// Item range occupied by `bucket` in the partitioned buffers.
    pub fn bucket_range(&self, bucket: usize) -> Range<usize> {
        let start = self.key_offsets[bucket];
        start..start + self.key_counts[bucket]
    }

    /// Publish final counts and their exclusive prefix sum.
    ///
    /// Resizes every array to `counts.len()` buckets.
    pub(crate) fn publish(&mut self, counts: &[usize]) {
        self.key_counts = counts.to_vec();
        self.val_counts = counts.to_vec();
        self.key_offsets = crate::bucket::exclusive_prefix_sum(counts);
        self.val_offsets = self.key_offsets.clone();
    }
}
