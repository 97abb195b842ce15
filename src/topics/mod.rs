// Topic discovery — corpus profiling, adaptive parameters, embedding,
// reduction, density clustering, and keyword extraction.

pub mod characterize;
pub mod cluster;
pub mod download;
pub mod embeddings;
pub mod keywords;
pub mod params;
pub mod reduce;
pub mod traits;
