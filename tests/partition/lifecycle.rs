use std::collections::HashMap;

use rangeshuffle::{
    Coordinator, EmitConfiguration, EnvWorld, GridDims, PipelineStage, RangePartitioner, Scratch,
    Strategy,
};

#[test]
fn test_init_from_launcher_environment() {
    let env: HashMap<&str, &str> = [("OMPI_COMM_WORLD_SIZE", "8"), ("OMPI_COMM_WORLD_RANK", "5")]
        .into_iter()
        .collect();
    let world = EnvWorld::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
    assert_eq!(world.rank(), 5);

    let mut p = RangePartitioner::new(0u32, 1 << 16).unwrap();
    p.init(&world).unwrap();
    assert_eq!(p.comm_size(), Some(8));
    assert_eq!(p.rule().unwrap().comm_size(), 8);
    p.finalize();
}

#[test]
fn test_scratch_sized_from_memory_requirement() {
    let p = RangePartitioner::new(0i64, 1 << 40).unwrap();
    let emit = EmitConfiguration::for_grid::<i64, u32>(GridDims::new(64, 4)).unwrap();

    for strategy in Strategy::ALL {
        assert!(p.supports(strategy));
        assert_eq!(p.memory_requirement(strategy, &emit), 256 * 8 + 256 * 4);
    }

    let scratch = Scratch::<i64, u32>::for_emit(&emit);
    assert_eq!(scratch.size_bytes(), p.memory_requirement_on_gpu(&emit));
    assert_eq!(scratch.capacity(), emit.num_items());
}
