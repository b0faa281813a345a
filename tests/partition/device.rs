use rangeshuffle::{
    DeviceJob, DeviceStream, GridDims, OutOfRangePolicy, Scratch, ShuffleConfig, ShuffleError,
};

use super::helpers::{
    EXAMPLE_KEYS, EXAMPLE_VALS, assert_partitioned, clamp_rule, partitioner, partitioner_with,
    random_batch, run_gpu,
};

#[tokio::test]
async fn test_example_batch() {
    let p = partitioner(0, 100, 4);
    let stream = DeviceStream::new(2).unwrap();
    let batch = run_gpu(&p, &stream, EXAMPLE_KEYS.to_vec(), EXAMPLE_VALS.to_vec()).await;

    let out = batch.output().unwrap();
    assert_eq!(batch.keys, vec![10, 0, 25, 55, 99, 80]);
    assert_eq!(batch.vals, vec![1, 4, 5, 2, 3, 6]);
    assert_eq!(out.key_counts(), &[2, 1, 1, 2]);
    assert_eq!(out.val_offsets(), &[0, 2, 3, 4]);
}

#[tokio::test]
async fn test_range_end_lands_in_last_bucket() {
    let p = partitioner(0, 100, 4);
    let stream = DeviceStream::new(1).unwrap();
    let batch = run_gpu(&p, &stream, vec![100, 5, -3], vec![0, 1, 2]).await;
    assert_eq!(batch.output().unwrap().key_counts(), &[2, 0, 0, 1]);
    assert_eq!(batch.keys, vec![5, -3, 100]);
}

#[tokio::test]
async fn test_random_batches_with_small_chunks() {
    let stream = DeviceStream::new(4).unwrap();
    for (seed, n, chunk) in [(5u64, 1000usize, 1usize), (6, 1000, 37), (7, 10_000, 512)] {
        let config = ShuffleConfig::default().with_chunk_items(chunk);
        let p = partitioner_with(0, 1000, 9, config);
        let (keys, vals) = random_batch(seed, n, -50, 1050);
        let batch = run_gpu(&p, &stream, keys.clone(), vals.clone()).await;
        assert_partitioned(
            &clamp_rule(0, 1000, 9),
            &keys,
            &vals,
            &batch.keys,
            &batch.vals,
            batch.output().unwrap(),
        );
    }
}

#[tokio::test]
async fn test_reject_returns_buffers_untouched() {
    let config = ShuffleConfig::default().with_out_of_range(OutOfRangePolicy::Reject);
    let p = partitioner_with(0, 100, 4, config);
    let stream = DeviceStream::new(2).unwrap();
    let batch = run_gpu(&p, &stream, vec![10, -1, 55], vec![1, 2, 3]).await;

    assert!(matches!(
        batch.outcome,
        Err(ShuffleError::KeyOutOfRange { key: -1, .. })
    ));
    assert_eq!(batch.keys, vec![10, -1, 55]);
    assert_eq!(batch.vals, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_jobs_complete_in_submission_order() {
    let p = partitioner(0, 100, 4);
    let stream = DeviceStream::new(2).unwrap();

    let handles: Vec<_> = (0..6u64)
        .map(|seed| {
            let (keys, vals) = random_batch(seed, 2000, 0, 100);
            let scratch = Scratch::with_capacity(keys.len());
            p.execute_on_gpu_async(DeviceJob::flat(keys, vals), scratch, &stream)
                .unwrap()
        })
        .collect();

    // Waiting on the last job implies every earlier job already finished.
    let mut handles = handles.into_iter().rev();
    let last = handles.next().unwrap();
    last.wait().await.unwrap();
    for h in handles {
        assert!(h.is_finished());
        assert!(h.wait().await.unwrap().outcome.is_ok());
    }
}

#[test]
fn test_blocking_wait_and_scratch_reuse() {
    let p = partitioner(0, 100, 4);
    let stream = DeviceStream::new(1).unwrap();
    let mut scratch = Scratch::with_capacity(6);

    for _ in 0..3 {
        let job = DeviceJob::flat(EXAMPLE_KEYS.to_vec(), EXAMPLE_VALS.to_vec());
        let batch = p
            .execute_on_gpu_async(job, scratch, &stream)
            .unwrap()
            .wait_blocking()
            .unwrap();
        assert_eq!(batch.vals, vec![1, 4, 5, 2, 3, 6]);
        scratch = batch.scratch;
    }
    stream.synchronize().unwrap();
}

#[test]
fn test_submission_checks_happen_up_front() {
    let p = partitioner(0, 100, 4);
    let stream = DeviceStream::new(1).unwrap();

    let job = DeviceJob::new(vec![1, 2, 3], vec![1u32, 2, 3], GridDims::new(2, 2));
    let err = p
        .execute_on_gpu_async(job, Scratch::with_capacity(4), &stream)
        .unwrap_err();
    assert!(matches!(
        err,
        ShuffleError::BufferSizeMismatch {
            what: "key buffer",
            ..
        }
    ));

    let job = DeviceJob::flat(vec![1, 2, 3], vec![1u32, 2, 3]);
    let err = p
        .execute_on_gpu_async(job, Scratch::with_capacity(2), &stream)
        .unwrap_err();
    assert!(matches!(err, ShuffleError::ScratchTooSmall { .. }));

    let job = DeviceJob::new(vec![1, 2], vec![1u32, 2], GridDims::new(2, usize::MAX));
    let err = p
        .execute_on_gpu_async(job, Scratch::with_capacity(2), &stream)
        .unwrap_err();
    assert!(matches!(
        err,
        ShuffleError::GridTooLarge {
            num_threads: 2,
            emits_per_thread: usize::MAX
        }
    ));
}
