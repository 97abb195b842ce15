// Cluster labeling — chat API client, prompt construction, call pacing.

pub mod chat;
pub mod pacer;
pub mod traits;
