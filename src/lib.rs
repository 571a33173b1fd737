//! 3D LiDAR pedestrian detection pipeline.
//!
//! This crate turns one raw point cloud frame into a set of candidate object
//! clusters and decides which of them are human-shaped:
//! - Range-adaptive partitioning of the frame into 14 nested circular regions
//! - Per-region Euclidean clustering with a range-dependent merge tolerance
//! - Geometric feature descriptors per cluster (covariance, inertia tensor,
//!   slice profile)
//! - libsvm-style min-max feature rescaling and a pluggable classifier
//!
//! # Example
//!
//! ```
//! use pedestrian_pipeline::{Detector, DetectorConfig, PointCloud};
//!
//! let mut frame = PointCloud::new();
//! for i in 0..12 {
//!     frame.push(3.0 + 0.01 * i as f32, 0.0, 0.1);
//! }
//!
//! let detector = Detector::model_free(DetectorConfig::default());
//! let detections = detector.process_frame(&frame);
//! ```

pub mod classifier;
pub mod cli;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod processors;

pub use config::{DetectorConfig, ModelConfig, PipelineConfig};
pub use core::cloud::PointCloud;
pub use pipeline::{Detection, Detector};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
