pub mod controls;
pub mod grid;
pub mod history;
pub mod metrics;
pub mod noise;
pub mod particles;
pub mod stepper;

pub use controls::*;
pub use grid::*;
pub use history::*;
pub use metrics::*;
pub use particles::*;
pub use stepper::*;
