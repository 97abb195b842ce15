// Sift: adaptive topic discovery and representative sampling for reviews
//
// This is the library root. Each module corresponds to a major subsystem
// of the review analysis pipeline.

pub mod config;
pub mod corpus;
pub mod labeling;
pub mod output;
pub mod pipeline;
pub mod status;
pub mod topics;
