use crate::error::{Result, ShuffleError};
use crate::types::Rank;

/// The distributed coordination layer, as seen by the partitioner.
///
/// The partitioner asks for the participant count once, at `init()`. The
/// same layer later moves each bucket to its rank during the exchange.
pub trait Coordinator: Send + Sync {
    /// Total number of participants in the job.
    fn world_size(&self) -> Result<u32>;

    /// This process's rank (0-indexed).
    fn rank(&self) -> Rank;
}

/// Fixed-size world, for tests and single-process pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticWorld {
    world_size: u32,
    rank: Rank,
}

impl StaticWorld {
    pub fn new(world_size: u32, rank: Rank) -> Result<Self> {
        if world_size == 0 {
            return Err(ShuffleError::InvalidCommSize { comm_size: 0 });
        }
        if rank >= world_size {
            return Err(ShuffleError::InvalidRank { rank, world_size });
        }
        Ok(Self { world_size, rank })
    }

    /// A world of one: this process receives every bucket.
    pub fn single() -> Self {
        Self {
            world_size: 1,
            rank: 0,
        }
    }
}

impl Coordinator for StaticWorld {
    fn world_size(&self) -> Result<u32> {
        Ok(self.world_size)
    }

    fn rank(&self) -> Rank {
        self.rank
    }
}

/// `(size variable, rank variable)` pairs set by common job launchers,
/// checked in order.
const LAUNCHER_VARS: [(&str, &str); 4] = [
    ("RANGESHUFFLE_WORLD_SIZE", "RANGESHUFFLE_RANK"),
    ("OMPI_COMM_WORLD_SIZE", "OMPI_COMM_WORLD_RANK"),
    ("PMI_SIZE", "PMI_RANK"),
    ("WORLD_SIZE", "RANK"),
];

/// World described by the environment of a job launcher (mpirun, PMI,
/// torchrun-style `WORLD_SIZE`/`RANK`).
///
/// A process started without any launcher variables forms a world of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvWorld {
    inner: StaticWorld,
    source: &'static str,
}

impl EnvWorld {
    /// Read the world from the process environment.
    pub fn detect() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the world through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        for (size_var, rank_var) in LAUNCHER_VARS {
            let Some(size) = lookup(size_var) else {
                continue;
            };
            let world_size = size
                .trim()
                .parse::<u32>()
                .map_err(|_| ShuffleError::config(size_var, &size))?;
            let rank = match lookup(rank_var) {
                Some(r) => r
                    .trim()
                    .parse::<Rank>()
                    .map_err(|_| ShuffleError::config(rank_var, &r))?,
                None => 0,
            };
            tracing::debug!(world_size, rank, source = size_var, "detected launcher world");
            return Ok(Self {
                inner: StaticWorld::new(world_size, rank)?,
                source: size_var,
            });
        }

        tracing::debug!("no launcher variables set, running as a world of one");
        Ok(Self {
            inner: StaticWorld::single(),
            source: "default",
        })
    }

    /// The variable the world size was read from, or `"default"`.
    pub fn source(&self) -> &'static str {
        self.source
    }
}

impl Coordinator for EnvWorld {
    fn world_size(&self) -> Result<u32> {
        self.inner.world_size()
    }

    fn rank(&self) -> Rank {
        self.inner.rank()
    }
}
