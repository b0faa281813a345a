mod pipeline;
mod shared;
mod stream;

pub use pipeline::{DeviceBatch, DeviceJob, PassKind};
pub(crate) use pipeline::PipelineState;
pub use stream::{DeviceStream, StreamHandle};
