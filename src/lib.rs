//! Range partitioning for the shuffle stage of a distributed MapReduce job.
//!
//! The map phase emits integer key/value pairs into a contiguous batch.
//! [`RangePartitioner`] reorders that batch into one contiguous bucket per
//! participant, by where each key falls in a fixed range, and reports each
//! bucket's count and offset for the all-to-all exchange that follows.
//!
//! Two strategies produce identical results:
//! - [`Strategy::Gpu`]: six stream-ordered data-parallel passes on a
//!   [`DeviceStream`], returning a completion handle.
//! - [`Strategy::Cpu`]: a sequential counting sort on the calling thread.

pub mod bucket;
pub mod cluster;
pub mod config;
pub mod device;
pub mod emit;
pub mod error;
pub mod exchange;
mod host;
pub mod key;
pub mod memory;
pub mod partitioner;
pub mod types;

pub use bucket::{BucketRule, KeyRange, exclusive_prefix_sum};
pub use cluster::{Coordinator, EnvWorld, StaticWorld};
pub use config::ShuffleConfig;
pub use device::{DeviceBatch, DeviceJob, DeviceStream, PassKind, StreamHandle};
pub use emit::EmitConfiguration;
pub use error::{Result, ShuffleError};
pub use exchange::{BucketSpan, ExchangePlan, Partitioned, Received, exchange_local};
pub use key::{Payload, RangeKey};
pub use memory::{PartitionOutput, Scratch};
pub use partitioner::{HostJob, PipelineStage, RangePartitioner};
pub use types::{GridDims, OutOfRangePolicy, Rank, Strategy};
