mod world;

pub use world::{Coordinator, EnvWorld, StaticWorld};
