/// Rank of a participant in the distributed job (0-indexed).
pub type Rank = u32;

/// Execution substrate a partitioning call runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Six stream-ordered parallel passes on a [`DeviceStream`](crate::DeviceStream).
    Gpu,
    /// Sequential two-pass counting sort on the calling thread.
    Cpu,
}

impl Strategy {
    /// Every strategy, in preference order.
    pub const ALL: [Strategy; 2] = [Strategy::Gpu, Strategy::Cpu];

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Strategy::Gpu => "gpu",
            Strategy::Cpu => "cpu",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What to do with a key outside `[range_begin, range_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutOfRangePolicy {
    /// Keys below the range go to bucket 0, keys at or above the end go to
    /// the last bucket.
    #[default]
    Clamp,
    /// Fail the whole call with `KeyOutOfRange` before any buffer is touched.
    Reject,
}

impl std::str::FromStr for OutOfRangePolicy {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(OutOfRangePolicy::Clamp),
            "reject" => Ok(OutOfRangePolicy::Reject),
            _ => Err(()),
        }
    }
}

/// Shape of the map-phase launch that produced a batch.
///
/// Every thread emits the same number of pairs, so a batch always holds
/// `num_threads * emits_per_thread` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridDims {
    pub num_threads: usize,
    pub emits_per_thread: usize,
}

impl GridDims {
    pub const fn new(num_threads: usize, emits_per_thread: usize) -> Self {
        Self {
            num_threads,
            emits_per_thread,
        }
    }

    /// A grid with one emit per thread, covering `items` pairs.
    pub const fn flat(items: usize) -> Self {
        Self::new(items, 1)
    }

    /// Total number of key/value pairs in the batch, or `None` if the grid
    /// describes more items than fit in a `usize`.
    pub const fn num_items(&self) -> Option<usize> {
        self.num_threads.checked_mul(self.emits_per_thread)
    }
}
