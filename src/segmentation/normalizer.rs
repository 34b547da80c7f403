use log::{debug, warn};
use serde::{Deserialize, Serialize};
use crate::error::Anomaly;
use crate::scheduler::StimulusTiming;
use crate::segmentation::SequenceContext;
use crate::types::Chunk;
/// What to do with a chunk whose length matches neither standard length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationPolicy {
    /// Drop the chunk and its label.
    #[default]
    Strict,
    /// Cut the chunk to the length its predecessor implies.
    Lenient,
}
/// Expected sample counts of a flash chunk and of the ISI chunk that follows it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardLengths {
    pub flash: usize,
    pub isi: usize,
}
impl StandardLengths {
    /// Reads the lengths off the first flash-then-ISI pair after the baseline chunk.
    pub fn from_reference(chunks: &[Chunk]) -> Option<Self> {
        match chunks {
            [_baseline, flash, isi, ..] => Some(Self {
                flash: flash.len(),
                isi: isi.len(),
            }),
            _ => None,
        }
    }
    /// Lengths implied by the stimulus timing. Back-to-back augmentations (no wait)
    /// make the following augmentation play the ISI role.
    pub fn from_timing(timing: &StimulusTiming, sampling_rate: f64) -> Self {
        let (flash, wait) = timing.slot_samples(sampling_rate);
        Self {
            flash,
            isi: if wait == 0 { flash } else { wait },
        }
    }
    pub fn pair_len(&self) -> usize {
        self.flash + self.isi
    }
    pub fn matches(&self, len: usize) -> bool {
        len == self.flash || len == self.isi
    }
    fn implied_after(&self, predecessor: Option<usize>) -> usize {
        match predecessor {
            Some(len) if len == self.flash => self.isi,
            Some(len) if len == self.isi => self.flash,
            _ => self.flash,
        }
    }
}
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Normalized {
    pub chunks: Vec<Chunk>,
    pub anomalies: Vec<Anomaly>,
}
/// Reconciles chunk lengths against the standard lengths.
#[derive(Clone, Copy, Debug)]
pub struct ChunkNormalizer {
    lengths: StandardLengths,
    policy: NormalizationPolicy,
}
impl ChunkNormalizer {
    pub fn new(lengths: StandardLengths, policy: NormalizationPolicy) -> Self {
        Self { lengths, policy }
    }
    pub fn lengths(&self) -> StandardLengths {
        self.lengths
    }
    pub fn policy(&self) -> NormalizationPolicy {
        self.policy
    }
    /// Drops the leading baseline chunk, then applies the policy to every other
    /// chunk, building a fresh output sequence.
    pub fn normalize(&self, chunks: &[Chunk], ctx: SequenceContext) -> Normalized {
        let mut out: Vec<Chunk> = Vec::with_capacity(chunks.len().saturating_sub(1));
        let mut anomalies = Vec::new();
        if let Some(baseline) = chunks.first() {
            debug!(
                "{ctx}: dropping baseline chunk (indicator {}, {} samples)",
                baseline.indicator,
                baseline.len()
            );
        }
        for (position, chunk) in chunks.iter().enumerate().skip(1) {
            let observed = chunk.len();
            if self.lengths.matches(observed) {
                out.push(chunk.clone());
                continue;
            }
            if self.policy == NormalizationPolicy::Lenient {
                let implied = self.lengths.implied_after(out.last().map(Chunk::len));
                if observed > implied {
                    debug!(
                        "{ctx}: truncating chunk {position} (indicator {}) from {observed} to {implied}",
                        chunk.indicator
                    );
                    anomalies.push(Anomaly::Truncated {
                        position,
                        indicator: chunk.indicator,
                        observed,
                        kept: implied,
                    });
                    out.push(chunk.truncated(implied));
                    continue;
                }
            }
            warn!(
                "{ctx}: dropping malformed chunk {position} (indicator {}): {observed} samples, expected {} or {}",
                chunk.indicator, self.lengths.flash, self.lengths.isi
            );
            anomalies.push(Anomaly::MalformedChunk {
                position,
                indicator: chunk.indicator,
                observed,
                expected_flash: self.lengths.flash,
                expected_isi: self.lengths.isi,
            });
        }
        Normalized {
            chunks: out,
            anomalies,
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    fn chunk(indicator: u8, len: usize) -> Chunk {
        Chunk {
            indicator,
            flag: false,
            start: 0,
            data: Array2::from_shape_fn((2, len), |(c, i)| (c * 100 + i) as f64),
        }
    }
    const LENGTHS: StandardLengths = StandardLengths { flash: 5, isi: 3 };
    #[test]
    fn reference_pair_follows_baseline() {
        let chunks = vec![chunk(0, 40), chunk(2, 5), chunk(0, 3), chunk(9, 5)];
        assert_eq!(StandardLengths::from_reference(&chunks), Some(LENGTHS));
        assert_eq!(StandardLengths::from_reference(&chunks[..2]), None);
    }
    #[test]
    fn timing_without_wait_uses_flash_for_both() {
        let timing = StimulusTiming::default();
        let lengths = StandardLengths::from_timing(&timing, 500.0);
        assert_eq!(lengths.flash, 63);
        assert_eq!(lengths.isi, 63);
        let timing = StimulusTiming {
            aug_duration: 0.1,
            aug_wait: 0.06,
            ..StimulusTiming::default()
        };
        let lengths = StandardLengths::from_timing(&timing, 500.0);
        assert_eq!((lengths.flash, lengths.isi), (50, 30));
        assert_eq!(lengths.pair_len(), 80);
    }
    #[test]
    fn baseline_is_always_dropped() {
        let normalizer = ChunkNormalizer::new(LENGTHS, NormalizationPolicy::Strict);
        let chunks = vec![chunk(3, 5), chunk(4, 3)];
        let out = normalizer.normalize(&chunks, SequenceContext::default());
        assert_eq!(out.chunks.len(), 1);
        assert_eq!(out.chunks[0].indicator, 4);
        assert!(out.anomalies.is_empty());
    }
    #[test]
    fn strict_policy_drops_and_reports() {
        let normalizer = ChunkNormalizer::new(LENGTHS, NormalizationPolicy::Strict);
        let chunks = vec![chunk(0, 9), chunk(1, 5), chunk(0, 4), chunk(2, 5), chunk(0, 3)];
        let out = normalizer.normalize(&chunks, SequenceContext { trial: 1, sequence: 2 });
        let kept: Vec<usize> = out.chunks.iter().map(Chunk::len).collect();
        assert_eq!(kept, vec![5, 5, 3]);
        assert_eq!(
            out.anomalies,
            vec![Anomaly::MalformedChunk {
                position: 2,
                indicator: 0,
                observed: 4,
                expected_flash: 5,
                expected_isi: 3,
            }]
        );
    }
    #[test]
    fn lenient_policy_truncates_to_implied_length() {
        let normalizer = ChunkNormalizer::new(LENGTHS, NormalizationPolicy::Lenient);
        let chunks = vec![chunk(0, 9), chunk(1, 7), chunk(0, 4), chunk(2, 2)];
        let out = normalizer.normalize(&chunks, SequenceContext::default());
        let kept: Vec<usize> = out.chunks.iter().map(Chunk::len).collect();
        assert_eq!(kept, vec![5, 3]);
        assert_eq!(out.chunks[0].data[[1, 4]], 104.0);
        assert!(matches!(out.anomalies[0], Anomaly::Truncated { position: 1, kept: 5, .. }));
        assert!(matches!(out.anomalies[1], Anomaly::Truncated { position: 2, kept: 3, .. }));
        assert!(matches!(
            out.anomalies[2],
            Anomaly::MalformedChunk { position: 3, observed: 2, .. }
        ));
    }
    #[test]
    fn input_is_left_untouched() {
        let normalizer = ChunkNormalizer::new(LENGTHS, NormalizationPolicy::Lenient);
        let chunks = vec![chunk(0, 9), chunk(1, 7)];
        let before = chunks.clone();
        let _ = normalizer.normalize(&chunks, SequenceContext::default());
        assert_eq!(chunks, before);
    }
}
