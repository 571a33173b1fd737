//! Classification adapter: pluggable classifier contract plus the
//! accept/reject decision.
//!
//! The trained binary classifier is an external capability; this module owns
//! only the way it is driven: feature rescaling, the probability threshold
//! and the model-free fallback.

pub mod scale;

use std::path::Path;

use log::{info, warn};

use crate::processors::features::{Feature, FEATURE_SIZE};
use scale::ScaleRange;

/// Class code of the positive ("human") class.
pub const POSITIVE_CLASS: i32 = 1;

/// Contract for the external binary classifier.
pub trait Classifier: Send + Sync {
    /// Whether the loaded model can emit class probabilities.
    fn supports_probability(&self) -> bool;

    /// Probability of the positive class for a rescaled feature vector.
    ///
    /// Only called when [`supports_probability`](Self::supports_probability)
    /// returns true.
    fn predict_probability(&self, features: &[f64; FEATURE_SIZE]) -> f64;

    /// Predicted class code for a rescaled feature vector.
    fn predict_label(&self, features: &[f64; FEATURE_SIZE]) -> i32;
}

/// Outcome of classifying one cluster.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    /// Whether the cluster is accepted as human.
    pub accept: bool,
    /// Positive-class probability, when the model supports it.
    pub probability: Option<f64>,
}

impl Decision {
    /// The model-free outcome: accept unconditionally, no probability.
    pub fn accept_all() -> Self {
        Self {
            accept: true,
            probability: None,
        }
    }
}

/// A loaded classifier together with its feature scale table.
pub struct ClassifierModel {
    classifier: Box<dyn Classifier>,
    scale: ScaleRange,
}

impl ClassifierModel {
    pub fn new(classifier: Box<dyn Classifier>, scale: ScaleRange) -> Self {
        Self { classifier, scale }
    }

    /// Rescales the descriptor and applies the accept/reject decision.
    ///
    /// Probability-capable models accept iff the positive-class probability
    /// reaches `human_probability`; label-only models accept iff the
    /// predicted class is the positive one.
    pub fn classify(&self, feature: &Feature, human_probability: f64) -> Decision {
        let mut values = feature.to_vector();
        self.scale.apply(&mut values);

        if self.classifier.supports_probability() {
            let probability = self.classifier.predict_probability(&values);
            Decision {
                accept: probability >= human_probability,
                probability: Some(probability),
            }
        } else {
            Decision {
                accept: self.classifier.predict_label(&values) == POSITIVE_CLASS,
                probability: None,
            }
        }
    }
}

/// Pairs a classifier with the scale table loaded from `range_file`.
///
/// Either piece missing is non-fatal: a warning is logged and `None` is
/// returned, putting the pipeline in model-free (accept-all) mode.
pub fn load_model(
    classifier: Option<Box<dyn Classifier>>,
    range_file: Option<&Path>,
) -> Option<ClassifierModel> {
    let Some(classifier) = classifier else {
        warn!("no classifier model available, using model-free detection");
        return None;
    };

    let Some(range_file) = range_file else {
        warn!("no feature range file configured, using model-free detection");
        return None;
    };

    match ScaleRange::from_file(range_file) {
        Ok(scale) => {
            info!("loaded feature ranges from '{}'", range_file.display());
            Some(ClassifierModel::new(classifier, scale))
        }
        Err(e) => {
            warn!(
                "cannot load feature ranges from '{}' ({}), using model-free detection",
                range_file.display(),
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cloud::PointCloud;
    use crate::processors::clustering::Cluster;
    use crate::processors::features::extract_feature;

    struct FixedProbability(f64);

    impl Classifier for FixedProbability {
        fn supports_probability(&self) -> bool {
            true
        }
        fn predict_probability(&self, _features: &[f64; FEATURE_SIZE]) -> f64 {
            self.0
        }
        fn predict_label(&self, _features: &[f64; FEATURE_SIZE]) -> i32 {
            if self.0 >= 0.5 {
                POSITIVE_CLASS
            } else {
                0
            }
        }
    }

    struct FixedLabel(i32);

    impl Classifier for FixedLabel {
        fn supports_probability(&self) -> bool {
            false
        }
        fn predict_probability(&self, _features: &[f64; FEATURE_SIZE]) -> f64 {
            unreachable!("label-only model")
        }
        fn predict_label(&self, _features: &[f64; FEATURE_SIZE]) -> i32 {
            self.0
        }
    }

    fn sample_feature() -> Feature {
        let points = PointCloud::from_coords(&[
            [3.0, 0.0, 0.0],
            [3.1, 0.0, 0.5],
            [3.0, 0.1, 1.0],
            [3.1, 0.1, 1.5],
        ]);
        let cluster = Cluster::from_points(points, vec![0, 1, 2, 3], 1).unwrap();
        extract_feature(&cluster)
    }

    #[test]
    fn test_probability_threshold_decision() {
        let feature = sample_feature();
        let scale = ScaleRange::new(-1.0, 1.0);

        let low = ClassifierModel::new(Box::new(FixedProbability(0.65)), scale.clone());
        let decision = low.classify(&feature, 0.7);
        assert!(!decision.accept);
        assert_eq!(decision.probability, Some(0.65));

        let high = ClassifierModel::new(Box::new(FixedProbability(0.75)), scale);
        let decision = high.classify(&feature, 0.7);
        assert!(decision.accept);
        assert_eq!(decision.probability, Some(0.75));
    }

    #[test]
    fn test_label_model_decision() {
        let feature = sample_feature();

        let positive = ClassifierModel::new(Box::new(FixedLabel(1)), ScaleRange::new(-1.0, 1.0));
        let decision = positive.classify(&feature, 0.7);
        assert!(decision.accept);
        assert!(decision.probability.is_none());

        let negative = ClassifierModel::new(Box::new(FixedLabel(-1)), ScaleRange::new(-1.0, 1.0));
        assert!(!negative.classify(&feature, 0.7).accept);
    }

    #[test]
    fn test_load_model_fallbacks() {
        assert!(load_model(None, None).is_none());

        let classifier: Box<dyn Classifier> = Box::new(FixedLabel(1));
        assert!(load_model(Some(classifier), None).is_none());

        let classifier: Box<dyn Classifier> = Box::new(FixedLabel(1));
        let missing = std::path::PathBuf::from("/nonexistent/pedestrian.range");
        assert!(load_model(Some(classifier), Some(&missing)).is_none());
    }
}
