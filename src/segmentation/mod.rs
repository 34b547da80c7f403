// src/segmentation/mod.rs
use std::fmt;
use crate::error::Anomaly;
use crate::types::{Chunk, FeatureVector};
pub mod compactor;
pub mod extractor;
pub mod normalizer;
pub mod window;
pub use compactor::{compact, Compacted};
pub use extractor::extract_chunks;
pub use normalizer::{ChunkNormalizer, NormalizationPolicy, Normalized, StandardLengths};
pub use window::EventWindow;
/// Trial and sequence numbers (1-based) used to tag log lines and anomalies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequenceContext {
    pub trial: usize,
    pub sequence: usize,
}
impl fmt::Display for SequenceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trial {} sequence {}", self.trial, self.sequence)
    }
}
/// Output of running one event window through extraction, normalization and compaction.
#[derive(Clone, Debug, Default)]
pub struct SegmentedSequence {
    pub chunks: Vec<Chunk>,
    pub features: Vec<FeatureVector>,
    pub anomalies: Vec<Anomaly>,
}
pub fn segment(
    window: &EventWindow,
    normalizer: &ChunkNormalizer,
    ctx: SequenceContext,
) -> SegmentedSequence {
    let chunks = extract_chunks(window);
    let Normalized {
        chunks: normalized,
        mut anomalies,
    } = normalizer.normalize(&chunks, ctx);
    let compacted = compact(&normalized, ctx);
    anomalies.extend(compacted.anomalies);
    SegmentedSequence {
        chunks,
        features: compacted.features,
        anomalies,
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventLabel;
    use ndarray::Array2;
    const CHANNELS: usize = 9;
    fn scenario() -> EventWindow {
        let runs = [0u8, 1, 2, 1, 2];
        let labels: Vec<EventLabel> = (0..50)
            .map(|i| EventLabel {
                indicator: runs[i / 10],
                flag: (35..40).contains(&i),
            })
            .collect();
        let data = Array2::from_shape_fn((CHANNELS, 50), |(c, i)| (c * 1000 + i) as f64);
        EventWindow::from_parts(data, &labels).unwrap()
    }
    #[test]
    fn fifty_sample_scenario() {
        let window = scenario();
        let chunks = extract_chunks(&window);
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.len() == 10));
        let lengths = StandardLengths::from_reference(&chunks).unwrap();
        assert_eq!(lengths, StandardLengths { flash: 10, isi: 10 });
        let normalizer = ChunkNormalizer::new(lengths, NormalizationPolicy::Strict);
        let out = segment(&window, &normalizer, SequenceContext { trial: 1, sequence: 1 });
        assert_eq!(out.features.len(), 2);
        assert!(out.features.iter().all(|f| f.len() == CHANNELS * 20));
        let flags: Vec<bool> = out.features.iter().map(|f| f.flag).collect();
        assert_eq!(flags, vec![false, true]);
        let indicators: Vec<u8> = out.features.iter().map(|f| f.indicator).collect();
        assert_eq!(indicators, vec![1, 1]);
        assert!(out.anomalies.is_empty());
        // channel 0 of the first vector: flash samples 10..20, then ISI samples 20..30
        assert_eq!(out.features[0].values[0], 10.0);
        assert_eq!(out.features[0].values[19], 29.0);
        assert_eq!(out.features[0].values[20], 1010.0);
    }
    #[test]
    fn segmentation_is_deterministic() {
        let window = scenario();
        let normalizer = ChunkNormalizer::new(
            StandardLengths { flash: 10, isi: 10 },
            NormalizationPolicy::Lenient,
        );
        let a = segment(&window, &normalizer, SequenceContext::default());
        let b = segment(&window, &normalizer, SequenceContext::default());
        assert_eq!(a.features, b.features);
        assert_eq!(a.chunks, b.chunks);
    }
    #[test]
    fn policies_diverge_on_long_chunk() {
        let runs = [(0u8, 6), (3, 4), (0, 4), (9, 7), (0, 4)];
        let labels: Vec<EventLabel> = runs
            .iter()
            .flat_map(|&(indicator, len)| {
                std::iter::repeat(EventLabel { indicator, flag: indicator == 9 }).take(len)
            })
            .collect();
        let data = Array2::zeros((2, labels.len()));
        let window = EventWindow::from_parts(data, &labels).unwrap();
        let lengths = StandardLengths { flash: 4, isi: 4 };
        let strict = segment(
            &window,
            &ChunkNormalizer::new(lengths, NormalizationPolicy::Strict),
            SequenceContext::default(),
        );
        // dropping the 7-sample flash leaves an odd count
        assert_eq!(strict.features.len(), 1);
        assert_eq!(strict.anomalies.len(), 2);
        assert!(matches!(strict.anomalies[1], Anomaly::BoundaryMismatch { indicator: 0, length: 4 }));
        let lenient = segment(
            &window,
            &ChunkNormalizer::new(lengths, NormalizationPolicy::Lenient),
            SequenceContext::default(),
        );
        assert_eq!(lenient.features.len(), 2);
        assert!(lenient.features[1].flag);
        assert_eq!(lenient.features[1].len(), 2 * 8);
    }
}
