use rangeshuffle::{
    GridDims, HostJob, OutOfRangePolicy, PartitionOutput, Scratch, ShuffleConfig, ShuffleError,
};

use super::helpers::{
    EXAMPLE_KEYS, EXAMPLE_VALS, assert_partitioned, clamp_rule, partitioner, partitioner_with,
    random_batch, run_cpu,
};

#[test]
fn test_example_batch() {
    let p = partitioner(0, 100, 4);
    let (keys, vals, out) = run_cpu(&p, EXAMPLE_KEYS.to_vec(), EXAMPLE_VALS.to_vec());

    assert_eq!(keys, vec![10, 0, 25, 55, 99, 80]);
    assert_eq!(vals, vec![1, 4, 5, 2, 3, 6]);
    assert_eq!(out.key_counts(), &[2, 1, 1, 2]);
    assert_eq!(out.key_offsets(), &[0, 2, 3, 4]);
    assert_eq!(&keys[out.bucket_range(0)], &[10, 0]);
    assert_eq!(&keys[out.bucket_range(3)], &[99, 80]);
}

#[test]
fn test_range_end_lands_in_last_bucket() {
    let p = partitioner(0, 100, 4);
    let (keys, _, out) = run_cpu(&p, vec![100, 5, -3], vec![0, 1, 2]);
    assert_eq!(out.key_counts(), &[2, 0, 0, 1]);
    assert_eq!(keys, vec![5, -3, 100]);
}

#[test]
fn test_reject_fails_without_touching_buffers() {
    let p = partitioner_with(
        0,
        100,
        4,
        ShuffleConfig::default().with_out_of_range(OutOfRangePolicy::Reject),
    );
    let mut keys = vec![10, 55, 100, 0];
    let mut vals = vec![1u32, 2, 3, 4];
    let mut scratch = Scratch::with_capacity(4);
    let mut out = PartitionOutput::new(4);

    let err = p
        .execute_on_cpu(HostJob::flat(&mut keys, &mut vals), &mut scratch, &mut out)
        .unwrap_err();
    assert!(matches!(
        err,
        ShuffleError::KeyOutOfRange {
            key: 100,
            begin: 0,
            end: 100
        }
    ));
    assert_eq!(keys, vec![10, 55, 100, 0]);
    assert_eq!(vals, vec![1, 2, 3, 4]);
}

#[test]
fn test_repartition_is_idempotent() {
    let p = partitioner(0, 1000, 7);
    let (keys, vals) = random_batch(11, 500, 0, 1000);
    let (k1, v1, o1) = run_cpu(&p, keys, vals);
    let (k2, v2, o2) = run_cpu(&p, k1.clone(), v1.clone());
    assert_eq!(k1, k2);
    assert_eq!(v1, v2);
    assert_eq!(o1, o2);
}

#[test]
fn test_random_batches_are_partitioned() {
    for (seed, n, buckets) in [(1u64, 0usize, 3u32), (2, 1, 5), (3, 257, 4), (4, 4096, 16)] {
        let p = partitioner(-500, 500, buckets);
        let (keys, vals) = random_batch(seed, n, -600, 600);
        let (k, v, out) = run_cpu(&p, keys.clone(), vals.clone());
        assert_partitioned(&clamp_rule(-500, 500, buckets), &keys, &vals, &k, &v, &out);
    }
}

#[test]
fn test_more_buckets_than_items() {
    let p = partitioner(0, 100, 32);
    let (keys, _, out) = run_cpu(&p, vec![99, 0], vec![0, 1]);
    assert_eq!(keys, vec![0, 99]);
    assert_eq!(out.comm_size(), 32);
    assert_eq!(out.key_counts()[0], 1);
    assert_eq!(out.key_counts()[31], 1);
    assert_eq!(out.total(), 2);
}

#[test]
fn test_grid_with_several_emits_per_thread() {
    let p = partitioner(0, 100, 2);
    let mut keys = vec![90, 10, 60, 40, 70, 20];
    let mut vals = vec![0u32, 1, 2, 3, 4, 5];
    let mut scratch = Scratch::with_capacity(6);
    let mut out = PartitionOutput::new(2);

    p.execute_on_cpu(
        HostJob::new(&mut keys, &mut vals, GridDims::new(3, 2)),
        &mut scratch,
        &mut out,
    )
    .unwrap();
    assert_eq!(keys, vec![10, 40, 20, 90, 60, 70]);
    assert_eq!(vals, vec![1, 3, 5, 0, 2, 4]);
    assert_eq!(out.key_offsets(), &[0, 3]);
}

#[test]
fn test_oversized_grid_is_an_error() {
    let p = partitioner(0, 100, 4);
    let mut keys = vec![10, 20];
    let mut vals = vec![1u32, 2];
    let mut scratch = Scratch::with_capacity(2);
    let mut out = PartitionOutput::new(4);

    let err = p
        .execute_on_cpu(
            HostJob::new(&mut keys, &mut vals, GridDims::new(usize::MAX, 2)),
            &mut scratch,
            &mut out,
        )
        .unwrap_err();
    assert!(matches!(err, ShuffleError::GridTooLarge { .. }));
    assert_eq!(keys, vec![10, 20]);
}

#[test]
fn test_wide_key_types() {
    let p = partitioner(i64::MIN, i64::MAX, 2);
    let (keys, _, out) = run_cpu(&p, vec![i64::MAX - 1, -1, 0, i64::MIN], vec![0, 1, 2, 3]);
    assert_eq!(keys, vec![-1, i64::MIN, i64::MAX - 1, 0]);
    assert_eq!(out.key_counts(), &[2, 2]);

    let p = partitioner(0u64, u64::MAX, 4);
    let (keys, _, out) = run_cpu(&p, vec![u64::MAX, 1, u64::MAX / 2], vec![0, 1, 2]);
    assert_eq!(keys, vec![1, u64::MAX / 2, u64::MAX]);
    assert_eq!(out.key_counts(), &[1, 1, 0, 1]);
}

#[test]
fn test_scratch_is_reusable_across_batches() {
    let p = partitioner(0, 100, 4);
    let mut scratch = Scratch::with_capacity(6);
    let mut out = PartitionOutput::new(4);

    let mut keys = EXAMPLE_KEYS.to_vec();
    let mut vals = EXAMPLE_VALS.to_vec();
    p.execute_on_cpu(HostJob::flat(&mut keys, &mut vals), &mut scratch, &mut out)
        .unwrap();

    let mut keys = vec![80, 5];
    let mut vals = vec![9u32, 8];
    p.execute_on_cpu(HostJob::flat(&mut keys, &mut vals), &mut scratch, &mut out)
        .unwrap();
    assert_eq!(keys, vec![5, 80]);
    assert_eq!(out.key_counts(), &[1, 0, 0, 1]);
}
