// Kindling: trending-topic clustering and LinkedIn post pipeline
//
// This is the library root. Each module corresponds to a major subsystem:
// harvesting trends, clustering and ranking them, drafting posts, and
// publishing the result.

pub mod cluster;
pub mod compose;
pub mod config;
pub mod db;
pub mod jobs;
pub mod output;
pub mod publish;
pub mod sources;
pub mod status;
