pub mod device;
pub mod fluid;
pub mod layouts;
pub mod metrics;
pub mod pipelines;
pub mod readback;

pub use device::*;
pub use fluid::*;
pub use layouts::*;
pub use metrics::*;
pub use pipelines::*;
pub use readback::*;
