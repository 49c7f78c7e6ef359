//! Nearest-centroid classifier

use serde::{Deserialize, Serialize};

use super::{FeatureClassifier, TrainingExample, NUM_CLASSES};
use crate::estimation::{FeatureVector, FEATURE_COUNT};

/// One mean feature vector per scale position seen during training.
///
/// Classes with no training examples have no centroid and are never
/// predicted. Distance ties resolve to the lowest class index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidClassifier {
    centroids: Vec<Option<FeatureVector>>,
}

impl CentroidClassifier {
    /// Fit on labelled examples. Returns `None` if no example carries a
    /// valid label.
    pub fn fit(examples: &[TrainingExample]) -> Option<Self> {
        let mut sums = vec![[0.0_f32; FEATURE_COUNT]; NUM_CLASSES];
        let mut counts = vec![0usize; NUM_CLASSES];

        for example in examples.iter().filter(|e| e.label < NUM_CLASSES) {
            for (sum, value) in sums[example.label].iter_mut().zip(example.features.0) {
                *sum += value;
            }
            counts[example.label] += 1;
        }

        if counts.iter().all(|&c| c == 0) {
            return None;
        }

        let centroids = sums
            .into_iter()
            .zip(counts)
            .map(|(mut sum, count)| {
                (count > 0).then(|| {
                    sum.iter_mut().for_each(|v| *v /= count as f32);
                    FeatureVector(sum)
                })
            })
            .collect();

        Some(Self { centroids })
    }

    /// Fraction of `examples` predicted correctly.
    pub fn accuracy(&self, examples: &[TrainingExample]) -> f32 {
        if examples.is_empty() {
            return 0.0;
        }
        let correct = examples
            .iter()
            .filter(|e| self.predict_index(&e.features) == e.label)
            .count();
        correct as f32 / examples.len() as f32
    }

    /// Scale positions that have a centroid.
    pub fn known_classes(&self) -> impl Iterator<Item = usize> + '_ {
        self.centroids
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|_| i))
    }
}

impl FeatureClassifier for CentroidClassifier {
    fn predict_index(&self, features: &FeatureVector) -> usize {
        let mut best: Option<(usize, f32)> = None;
        for (index, centroid) in self.centroids.iter().enumerate() {
            let Some(centroid) = centroid else { continue };
            let distance = centroid.squared_distance(features);
            match best {
                Some((_, d)) if distance >= d => {}
                _ => best = Some((index, distance)),
            }
        }
        best.map(|(index, _)| index).unwrap_or(0)
    }
}
