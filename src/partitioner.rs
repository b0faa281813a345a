use crate::bucket::{BucketRule, KeyRange};
use crate::cluster::Coordinator;
use crate::config::ShuffleConfig;
use crate::device::{DeviceBatch, DeviceJob, DeviceStream, PipelineState, StreamHandle};
use crate::emit::EmitConfiguration;
use crate::error::{Result, ShuffleError};
use crate::host;
use crate::key::{Payload, RangeKey};
use crate::memory::{PartitionOutput, Scratch};
use crate::types::{GridDims, Strategy};

/// Lifecycle shared by every stage of the processing pipeline.
pub trait PipelineStage {
    /// One-time setup against the coordination layer.
    fn init(&mut self, coordinator: &dyn Coordinator) -> Result<()>;

    /// Teardown. Stages that hold no resources may do nothing.
    fn finalize(&mut self);

    /// Whether the stage can run on `strategy`.
    fn supports(&self, strategy: Strategy) -> bool;

    /// Scratch bytes one call on `strategy` needs for a batch shaped like `emit`.
    fn memory_requirement(&self, strategy: Strategy, emit: &EmitConfiguration) -> usize;
}

/// Host buffers and launch shape handed to the CPU path for one batch.
#[derive(Debug)]
pub struct HostJob<'a, K, V> {
    pub keys: &'a mut [K],
    pub vals: &'a mut [V],
    pub grid: GridDims,
}

impl<'a, K, V> HostJob<'a, K, V> {
    pub fn new(keys: &'a mut [K], vals: &'a mut [V], grid: GridDims) -> Self {
        Self { keys, vals, grid }
    }

    /// Job for a flat grid with one emit per thread.
    pub fn flat(keys: &'a mut [K], vals: &'a mut [V]) -> Self {
        let grid = GridDims::flat(keys.len());
        Self::new(keys, vals, grid)
    }
}

/// Splits emitted key/value pairs into one contiguous bucket per participant,
/// by where each key falls in a fixed range.
///
/// Call [`init`](PipelineStage::init) once, then partition any number of
/// batches with [`execute_on_gpu_async`](Self::execute_on_gpu_async) or
/// [`execute_on_cpu`](Self::execute_on_cpu). Both strategies produce
/// identical buffers, counts and offsets for identical input.
#[derive(Debug, Clone)]
pub struct RangePartitioner<K: RangeKey> {
    range: KeyRange<K>,
    config: ShuffleConfig,
    comm_size: Option<u32>,
}

impl<K: RangeKey> RangePartitioner<K> {
    /// Partitioner over `[range_begin, range_end)` with default tuning.
    pub fn new(range_begin: K, range_end: K) -> Result<Self> {
        Self::with_config(range_begin, range_end, ShuffleConfig::default())
    }

    pub fn with_config(range_begin: K, range_end: K, config: ShuffleConfig) -> Result<Self> {
        Ok(Self {
            range: KeyRange::new(range_begin, range_end)?,
            config,
            comm_size: None,
        })
    }

    pub fn range(&self) -> KeyRange<K> {
        self.range
    }

    pub fn config(&self) -> &ShuffleConfig {
        &self.config
    }

    /// Participant count learned at `init()`, if it has run.
    pub fn comm_size(&self) -> Option<u32> {
        self.comm_size
    }

    pub fn can_execute_on_gpu(&self) -> bool {
        self.supports(Strategy::Gpu)
    }

    pub fn can_execute_on_cpu(&self) -> bool {
        self.supports(Strategy::Cpu)
    }

    /// Bytes of device scratch one batch needs: a temp key buffer plus a
    /// temp value buffer, each as large as the batch's.
    pub fn memory_requirement_on_gpu(&self, emit: &EmitConfiguration) -> usize {
        emit.key_space().saturating_add(emit.value_space())
    }

    /// Bucket routing for the current participant count.
    pub fn rule(&self) -> Result<BucketRule<K>> {
        let comm_size = self.comm_size.ok_or(ShuffleError::NotInitialized)?;
        BucketRule::new(self.range, comm_size, self.config.out_of_range)
    }

    /// Issue the device pipeline for one batch on `stream` and return at once.
    ///
    /// The buffers and scratch move into the stream; the returned handle
    /// yields them back in a [`DeviceBatch`] whose `outcome` carries the
    /// per-bucket counts and offsets. Jobs on one stream complete in
    /// submission order.
    pub fn execute_on_gpu_async<V: Payload>(
        &self,
        job: DeviceJob<K, V>,
        scratch: Scratch<K, V>,
        stream: &DeviceStream,
    ) -> Result<StreamHandle<DeviceBatch<K, V>>> {
        let rule = self.rule()?;
        check_shapes(job.keys.len(), job.vals.len(), job.grid)?;
        scratch.ensure(job.keys.len())?;

        let state = PipelineState::new(
            rule,
            self.config.chunk_items,
            self.config.verify_recount,
            job,
            scratch,
        );
        stream.submit(move |pool| Ok(state.run(pool)))
    }

    /// Partition one batch on the calling thread, in place.
    ///
    /// `output` is resized to the participant count and overwritten.
    pub fn execute_on_cpu<V: Payload>(
        &self,
        job: HostJob<'_, K, V>,
        scratch: &mut Scratch<K, V>,
        output: &mut PartitionOutput,
    ) -> Result<()> {
        let rule = self.rule()?;
        check_shapes(job.keys.len(), job.vals.len(), job.grid)?;
        scratch.ensure(job.keys.len())?;

        host::partition(
            &rule,
            job.keys,
            job.vals,
            scratch,
            self.config.verify_recount,
            output,
        )
    }
}

impl<K: RangeKey> PipelineStage for RangePartitioner<K> {
    fn init(&mut self, coordinator: &dyn Coordinator) -> Result<()> {
        if let Some(comm_size) = self.comm_size {
            tracing::debug!(comm_size, "partitioner already initialized");
            return Ok(());
        }
        let comm_size = coordinator.world_size()?;
        if comm_size == 0 {
            return Err(ShuffleError::InvalidCommSize { comm_size });
        }
        self.comm_size = Some(comm_size);
        tracing::info!(
            comm_size,
            rank = coordinator.rank(),
            range_begin = ?self.range.begin(),
            range_end = ?self.range.end(),
            "range partitioner initialized"
        );
        Ok(())
    }

    fn finalize(&mut self) {}

    fn supports(&self, strategy: Strategy) -> bool {
        match strategy {
            Strategy::Gpu | Strategy::Cpu => true,
        }
    }

    fn memory_requirement(&self, strategy: Strategy, emit: &EmitConfiguration) -> usize {
        match strategy {
            // The host path allocates the same temp buffers in host memory.
            Strategy::Gpu | Strategy::Cpu => self.memory_requirement_on_gpu(emit),
        }
    }
}

fn check_shapes(keys: usize, vals: usize, grid: GridDims) -> Result<()> {
    let expected = grid
        .num_items()
        .ok_or_else(|| ShuffleError::grid_too_large(grid))?;
    if keys != expected {
        return Err(ShuffleError::BufferSizeMismatch {
            what: "key buffer",
            expected,
            actual: keys,
        });
    }
    if vals != expected {
        return Err(ShuffleError::BufferSizeMismatch {
            what: "value buffer",
            expected,
            actual: vals,
        });
    }
    Ok(())
}
