// Pipelines — topic discovery across categories and representative sampling.

pub mod aggregate;
pub mod modeler;
pub mod sample;
