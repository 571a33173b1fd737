//! Per-frame processing stages: region partitioning, cluster extraction and
//! geometric feature description.

pub mod clustering;
pub mod features;
pub mod partition;
