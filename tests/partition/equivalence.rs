//! The host and device strategies must agree exactly on every input.

use rangeshuffle::{DeviceStream, ShuffleConfig};

use super::helpers::{partitioner, partitioner_with, random_batch, run_cpu, run_gpu};

#[tokio::test]
async fn test_strategies_agree_on_random_batches() {
    let stream = DeviceStream::new(3).unwrap();
    let cases = [
        (21u64, 0usize, 1u32),
        (22, 1, 4),
        (23, 999, 1),
        (24, 1000, 3),
        (25, 20_000, 64),
    ];
    for (seed, n, buckets) in cases {
        let p = partitioner_with(
            -1000,
            1000,
            buckets,
            ShuffleConfig::default().with_chunk_items(128),
        );
        let (keys, vals) = random_batch(seed, n, -1200, 1200);

        let (ck, cv, cout) = run_cpu(&p, keys.clone(), vals.clone());
        let batch = run_gpu(&p, &stream, keys, vals).await;

        assert_eq!(batch.keys, ck, "keys differ, seed {seed}");
        assert_eq!(batch.vals, cv, "values differ, seed {seed}");
        assert_eq!(batch.output(), Some(&cout), "counts differ, seed {seed}");
    }
}

#[tokio::test]
async fn test_strategies_agree_on_skewed_batch() {
    // Every key in one bucket except a handful at the edges.
    let p = partitioner(0, 1 << 20, 8);
    let stream = DeviceStream::new(2).unwrap();
    let mut keys = vec![3i32; 5000];
    keys[0] = (1 << 20) - 1;
    keys[2500] = 1 << 20;
    keys[4999] = 1 << 19;
    let vals: Vec<u32> = (0..5000).collect();

    let (ck, cv, cout) = run_cpu(&p, keys.clone(), vals.clone());
    let batch = run_gpu(&p, &stream, keys, vals).await;
    assert_eq!(batch.keys, ck);
    assert_eq!(batch.vals, cv);
    assert_eq!(cout.key_counts(), &[4997, 0, 0, 0, 1, 0, 0, 2]);
    assert_eq!(batch.output(), Some(&cout));
}

#[tokio::test]
async fn test_device_thread_count_does_not_change_result() {
    let p = partitioner(0, 500, 5);
    let (keys, vals) = random_batch(31, 3000, 0, 500);
    let (ck, cv, _) = run_cpu(&p, keys.clone(), vals.clone());
    for threads in [1, 2, 8] {
        let stream = DeviceStream::new(threads).unwrap();
        let batch = run_gpu(&p, &stream, keys.clone(), vals.clone()).await;
        assert_eq!(batch.keys, ck, "{threads} threads");
        assert_eq!(batch.vals, cv, "{threads} threads");
    }
}
