use crate::types::{GridDims, Rank};

pub type Result<T> = std::result::Result<T, ShuffleError>;

#[derive(Debug, thiserror::Error)]
pub enum ShuffleError {
    #[error("invalid key range [{begin}, {end}): end must be greater than begin")]
    InvalidRange { begin: i128, end: i128 },

    #[error("invalid participant count {comm_size}: at least one participant is required")]
    InvalidCommSize { comm_size: u32 },

    #[error("partitioner used before init(): participant count is unknown")]
    NotInitialized,

    #[error("{what} size mismatch: expected {expected} items, got {actual}")]
    BufferSizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("launch grid {num_threads} x {emits_per_thread} overflows the item count")]
    GridTooLarge {
        num_threads: usize,
        emits_per_thread: usize,
    },

    #[error("scratch region too small: need {required} bytes, got {actual}")]
    ScratchTooSmall { required: usize, actual: usize },

    #[error("key {key} lies outside the partition range [{begin}, {end})")]
    KeyOutOfRange { key: i128, begin: i128, end: i128 },

    #[error("bucket {bucket} recount mismatch: {expected} before scatter, {actual} after")]
    RecountMismatch {
        bucket: usize,
        expected: usize,
        actual: usize,
    },

    #[error("coordination layer error: {0}")]
    Coordinator(String),

    #[error("rank {rank} out of range for {world_size} participants")]
    InvalidRank { rank: Rank, world_size: u32 },

    #[error("device stream closed before the job completed")]
    StreamClosed,

    #[error("device stream error: {0}")]
    Device(String),

    #[error("invalid value {value:?} for {var}")]
    Config { var: &'static str, value: String },
}

impl ShuffleError {
    /// Create a `GridTooLarge` error for `grid`.
    pub fn grid_too_large(grid: GridDims) -> Self {
        Self::GridTooLarge {
            num_threads: grid.num_threads,
            emits_per_thread: grid.emits_per_thread,
        }
    }

    /// Create a `Coordinator` error from any message.
    pub fn coordinator(msg: impl Into<String>) -> Self {
        Self::Coordinator(msg.into())
    }

    /// Create a `Device` error from any message.
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Create a `Config` error for an environment variable that failed to parse.
    pub fn config(var: &'static str, value: impl Into<String>) -> Self {
        Self::Config {
            var,
            value: value.into(),
        }
    }
}
