// src/classifier.rs
use log::warn;
use serde::{Deserialize, Serialize};
use crate::types::FeatureVector;
/// Decides, per feature vector, whether it followed the attended stimulus.
pub trait Classifier {
    fn predict(&mut self, features: &[FeatureVector]) -> Vec<bool>;
}
/// Echoes the recorded flags. Used for copy-spelling, where the target is known.
#[derive(Clone, Copy, Debug, Default)]
pub struct LabelPassthrough;
impl Classifier for LabelPassthrough {
    fn predict(&mut self, features: &[FeatureVector]) -> Vec<bool> {
        features.iter().map(|f| f.flag).collect()
    }
}
/// Replaces recorded flags with predictions. A short prediction list leaves the
/// remaining flags cleared.
pub fn relabel(features: &[FeatureVector], predictions: &[bool]) -> Vec<FeatureVector> {
    if predictions.len() != features.len() {
        warn!(
            "classifier returned {} predictions for {} feature vectors",
            predictions.len(),
            features.len()
        );
    }
    features
        .iter()
        .enumerate()
        .map(|(i, f)| FeatureVector {
            indicator: f.indicator,
            flag: predictions.get(i).copied().unwrap_or(false),
            values: f.values.clone(),
        })
        .collect()
}
/// Labeled feature matrix for an external trainer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSet {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<bool>,
    pub indicators: Vec<u8>,
}
impl TrainingSet {
    pub fn from_features(features: &[FeatureVector]) -> Self {
        let mut set = Self::default();
        set.extend(features);
        set
    }
    pub fn extend(&mut self, features: &[FeatureVector]) {
        for f in features {
            self.features.push(f.values.clone());
            self.labels.push(f.flag);
            self.indicators.push(f.indicator);
        }
    }
    pub fn len(&self) -> usize {
        self.labels.len()
    }
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn fv(indicator: u8, flag: bool) -> FeatureVector {
        FeatureVector {
            indicator,
            flag,
            values: vec![indicator as f64; 4],
        }
    }
    #[test]
    fn passthrough_echoes_flags() {
        let features = vec![fv(1, false), fv(8, true)];
        assert_eq!(LabelPassthrough.predict(&features), vec![false, true]);
    }
    #[test]
    fn relabel_uses_predictions() {
        let features = vec![fv(1, false), fv(8, true), fv(3, true)];
        let out = relabel(&features, &[true, false]);
        let flags: Vec<bool> = out.iter().map(|f| f.flag).collect();
        assert_eq!(flags, vec![true, false, false]);
        assert_eq!(out[0].values, features[0].values);
    }
    #[test]
    fn training_set_serializes() {
        let set = TrainingSet::from_features(&[fv(2, true), fv(9, false)]);
        assert_eq!(set.len(), 2);
        let json = serde_json::to_string(&set).unwrap();
        let back: TrainingSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
        assert_eq!(back.indicators, vec![2, 9]);
    }
}
