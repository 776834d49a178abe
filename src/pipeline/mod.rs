//! Structure for combining the various dynamics components to perform an actual simulation.

pub use dynamics_pipeline::DynamicsPipeline;

mod dynamics_pipeline;
