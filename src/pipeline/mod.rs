//! Per-frame detection pipeline.
//!
//! One frame flows strictly forward through partition, per-region cluster
//! extraction, feature description, classification and assembly. The only
//! state shared across frames is the injected configuration and classifier
//! model, both read-only after construction, so processing one frame at a
//! time needs no locking.

use std::path::Path;

use anyhow::Result;
use log::{debug, info};

use crate::classifier::{ClassifierModel, Decision};
use crate::config::DetectorConfig;
use crate::core::cloud::PointCloud;
use crate::processors::clustering::{cluster_regions, ClusterExtractor, EuclideanClusterer};
use crate::processors::features::extract_feature;
use crate::processors::partition::{filter_z_band, partition_regions};

/// One accepted detection: the sole output record of the pipeline.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Cluster centroid.
    pub centroid: [f32; 3],
    /// Bounding box minimum corner.
    pub min: [f32; 3],
    /// Bounding box maximum corner.
    pub max: [f32; 3],
    /// Positive-class probability, absent in model-free or label-only mode.
    pub probability: Option<f64>,
}

/// The frame-to-detections pipeline.
pub struct Detector {
    config: DetectorConfig,
    extractor: Box<dyn ClusterExtractor>,
    model: Option<ClassifierModel>,
}

impl Detector {
    /// Builds a detector with an explicit clustering capability and an
    /// optional classifier model.
    pub fn new(
        config: DetectorConfig,
        extractor: Box<dyn ClusterExtractor>,
        model: Option<ClassifierModel>,
    ) -> Self {
        Self {
            config,
            extractor,
            model,
        }
    }

    /// Builds a model-free detector using the in-process Euclidean
    /// clusterer: every geometrically valid cluster becomes a detection.
    pub fn model_free(config: DetectorConfig) -> Self {
        Self::new(config, Box::new(EuclideanClusterer), None)
    }

    /// Processes one frame into detections.
    ///
    /// Stages run sequentially: z-band filter, nested-region partition,
    /// per-region clustering, feature extraction, classification, assembly.
    /// A frame with no detections is a normal outcome.
    pub fn process_frame(&self, frame: &PointCloud) -> Vec<Detection> {
        let banded = filter_z_band(frame, self.config.z_limit_min, self.config.z_limit_max);
        let regions = partition_regions(&banded);
        let clusters = cluster_regions(&banded, &regions, self.extractor.as_ref(), &self.config);

        let mut detections = Vec::new();
        for cluster in &clusters {
            let feature = extract_feature(cluster);

            let decision = match &self.model {
                Some(model) => model.classify(&feature, self.config.human_probability),
                None => Decision::accept_all(),
            };

            if decision.accept {
                detections.push(Detection {
                    centroid: feature.centroid,
                    min: feature.min,
                    max: feature.max,
                    probability: decision.probability,
                });
            }
        }

        debug!(
            "frame: {} points, {} in band, {} clusters, {} detections",
            frame.len(),
            banded.len(),
            clusters.len(),
            detections.len()
        );

        detections
    }
}

/// Process a recorded frame file end to end: load, detect, write detections.
///
/// # Errors
///
/// Returns an error if the frame cannot be loaded or the detection CSV
/// cannot be written.
pub fn process_frame_file(
    detector: &Detector,
    frame_file: &Path,
    output: &Path,
) -> Result<Vec<Detection>> {
    let frame = crate::core::loaders::load_frame(frame_file)?;
    let detections = detector.process_frame(&frame);
    crate::core::writers::write_detections_csv(output, &detections)?;

    info!(
        "{}: {} points -> {} detections ({})",
        frame_file.display(),
        frame.len(),
        detections.len(),
        output.display()
    );

    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classifier, ClassifierModel};
    use crate::classifier::scale::ScaleRange;
    use crate::processors::features::FEATURE_SIZE;

    /// A human-sized blob of points around 3 m range: 60 points filling
    /// roughly 0.4 x 0.4 x 0.8 m, spaced within the band-1 merge tolerance.
    fn human_blob() -> PointCloud {
        let mut cloud = PointCloud::new();
        for i in 0..4 {
            for j in 0..3 {
                for k in 0..5 {
                    cloud.push(
                        3.0 + 0.13 * i as f32,
                        -0.2 + 0.18 * j as f32,
                        -0.4 + 0.19 * k as f32,
                    );
                }
            }
        }
        cloud
    }

    struct FixedProbability(f64);

    impl Classifier for FixedProbability {
        fn supports_probability(&self) -> bool {
            true
        }
        fn predict_probability(&self, _features: &[f64; FEATURE_SIZE]) -> f64 {
            self.0
        }
        fn predict_label(&self, _features: &[f64; FEATURE_SIZE]) -> i32 {
            1
        }
    }

    #[test]
    fn test_model_free_frame_produces_detection() {
        let detector = Detector::model_free(DetectorConfig::default());
        let detections = detector.process_frame(&human_blob());

        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert!(d.probability.is_none());
        assert!((d.centroid[0] - 3.195).abs() < 1e-2);
        assert!(d.min[2] >= -0.41 && d.max[2] <= 0.61);
    }

    #[test]
    fn test_empty_frame_is_normal() {
        let detector = Detector::model_free(DetectorConfig::default());
        assert!(detector.process_frame(&PointCloud::new()).is_empty());
    }

    #[test]
    fn test_ground_points_are_ignored() {
        let mut frame = human_blob();
        for i in 0..50 {
            frame.push(2.0 + 0.02 * i as f32, 0.5, -1.2); // below z_limit_min
        }

        let detector = Detector::model_free(DetectorConfig::default());
        let detections = detector.process_frame(&frame);
        assert_eq!(detections.len(), 1);
        assert!(detections[0].min[2] > -0.8);
    }

    #[test]
    fn test_human_size_limit_rejects_thin_cluster() {
        // A thin vertical stripe: x/y extents below the 0.2 m minimum.
        let mut frame = PointCloud::new();
        for k in 0..20 {
            frame.push(3.0, 0.0, -0.4 + 0.07 * k as f32);
        }

        let permissive = Detector::model_free(DetectorConfig::default());
        assert_eq!(permissive.process_frame(&frame).len(), 1);

        let gated = Detector::model_free(DetectorConfig {
            human_size_limit: true,
            ..Default::default()
        });
        assert!(gated.process_frame(&frame).is_empty());
    }

    #[test]
    fn test_process_frame_file_roundtrip() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let frame_path = temp_dir.path().join("frame.csv");

        let blob = human_blob();
        let mut content = String::from("x,y,z\n");
        for i in 0..blob.len() {
            let p = blob.point(i);
            content.push_str(&format!("{},{},{}\n", p[0], p[1], p[2]));
        }
        std::fs::write(&frame_path, content).unwrap();

        let output = temp_dir.path().join("out").join("detections.csv");
        let detector = Detector::model_free(DetectorConfig::default());
        let detections = process_frame_file(&detector, &frame_path, &output).unwrap();

        assert_eq!(detections.len(), 1);
        assert!(output.exists());
    }

    #[test]
    fn test_probability_threshold_through_pipeline() {
        let frame = human_blob();

        let rejecting = Detector::new(
            DetectorConfig::default(),
            Box::new(EuclideanClusterer),
            Some(ClassifierModel::new(
                Box::new(FixedProbability(0.65)),
                ScaleRange::new(-1.0, 1.0),
            )),
        );
        assert!(rejecting.process_frame(&frame).is_empty());

        let accepting = Detector::new(
            DetectorConfig::default(),
            Box::new(EuclideanClusterer),
            Some(ClassifierModel::new(
                Box::new(FixedProbability(0.75)),
                ScaleRange::new(-1.0, 1.0),
            )),
        );
        let detections = accepting.process_frame(&frame);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].probability, Some(0.75));
    }
}
