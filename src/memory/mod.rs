mod output;
mod scratch;

pub use output::PartitionOutput;
pub use scratch::Scratch;
