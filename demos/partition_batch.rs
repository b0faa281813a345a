//! Partition one emitted batch for a world of 4 ranks, on both strategies.
//!
//! Keys in `[0, 100)` are split into four equal buckets; bucket `r` is what
//! rank `r` receives in the exchange that follows.
//!
//! ```bash
//! cargo run --example partition_batch
//! ```

use rangeshuffle::{
    DeviceJob, DeviceStream, ExchangePlan, HostJob, PartitionOutput, PipelineStage,
    RangePartitioner, Scratch, ShuffleConfig, StaticWorld,
};

#[tokio::main]
async fn main() -> rangeshuffle::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = ShuffleConfig::try_from_env()?;
    let mut partitioner = RangePartitioner::with_config(0i32, 100, config.clone())?;
    partitioner.init(&StaticWorld::new(4, 0)?)?;

    let keys = vec![10, 55, 99, 0, 25, 80];
    let vals = vec![1u64, 2, 3, 4, 5, 6];

    // Host path: in place, on this thread.
    let mut host_keys = keys.clone();
    let mut host_vals = vals.clone();
    let mut scratch = Scratch::with_capacity(keys.len());
    let mut output = PartitionOutput::new(4);
    partitioner.execute_on_cpu(
        HostJob::flat(&mut host_keys, &mut host_vals),
        &mut scratch,
        &mut output,
    )?;
    println!("cpu keys:   {host_keys:?}");
    println!("cpu values: {host_vals:?}");

    // Device path: submit, then wait on the handle.
    let stream = DeviceStream::from_config(&config)?;
    let handle = partitioner.execute_on_gpu_async(DeviceJob::flat(keys, vals), scratch, &stream)?;
    let batch = handle.wait().await?;
    let device_output = batch.outcome?;
    println!("gpu keys:   {:?}", batch.keys);
    println!("gpu values: {:?}", batch.vals);
    assert_eq!(device_output, output);

    let rule = partitioner.rule()?;
    let plan = ExchangePlan::for_types::<i32, u64>(&device_output);
    for span in plan.spans() {
        println!(
            "rank {} (keys from {}): items {:?} keys {:?}",
            span.rank,
            rule.lower_bound(span.rank as usize),
            span.items(),
            &batch.keys[span.items()]
        );
    }
    // Output:
    // rank 0 (keys from 0): items 0..2 keys [10, 0]
    // rank 1 (keys from 25): items 2..3 keys [25]
    // rank 2 (keys from 50): items 3..4 keys [55]
    // rank 3 (keys from 75): items 4..6 keys [99, 80]

    Ok(())
}
