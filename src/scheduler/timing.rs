use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use crate::error::{Result, SpellerError};
use crate::types::MAX_INDICATOR;
/// Stimulus timing of one session. Durations are in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusTiming {
    /// How long one row or column stays augmented.
    pub aug_duration: f64,
    /// Pause between the end of one augmentation and the start of the next.
    pub aug_wait: f64,
    /// Rest before each sequence. Its samples form the baseline chunk.
    pub inter_seq_interval: f64,
    pub num_seq: usize,
    pub num_trials: usize,
    pub num_augmentations: usize,
}
impl Default for StimulusTiming {
    fn default() -> Self {
        Self {
            aug_duration: 0.125,
            aug_wait: 0.0,
            inter_seq_interval: 0.375,
            num_seq: 5,
            num_trials: 1,
            num_augmentations: MAX_INDICATOR as usize,
        }
    }
}
impl StimulusTiming {
    /// Baseline lead-in plus every augmentation of one sequence.
    pub fn sequence_duration(&self) -> f64 {
        self.inter_seq_interval + self.num_augmentations as f64 * (self.aug_duration + self.aug_wait)
    }
    pub fn window_size(&self, sampling_rate: f64) -> usize {
        window_size(self.sequence_duration(), sampling_rate)
    }
    /// Flash and wait lengths in whole samples.
    pub fn slot_samples(&self, sampling_rate: f64) -> (usize, usize) {
        (
            (self.aug_duration * sampling_rate).round() as usize,
            (self.aug_wait * sampling_rate).round() as usize,
        )
    }
    /// Samples covered by all augmentations of one sequence.
    pub fn augmentation_samples(&self, sampling_rate: f64) -> usize {
        let (flash, wait) = self.slot_samples(sampling_rate);
        self.num_augmentations * (flash + wait)
    }
    /// Samples of a full window that precede the first augmentation.
    pub fn baseline_samples(&self, sampling_rate: f64) -> usize {
        self.window_size(sampling_rate)
            .saturating_sub(self.augmentation_samples(sampling_rate))
    }
    pub fn validate(&self) -> Result<()> {
        if !(self.aug_duration > 0.0) {
            return Err(SpellerError::Config("timing.aug_duration must be > 0".into()));
        }
        if !(self.aug_wait >= 0.0) {
            return Err(SpellerError::Config("timing.aug_wait must be >= 0".into()));
        }
        if !(self.inter_seq_interval > 0.0) {
            return Err(SpellerError::Config(
                "timing.inter_seq_interval must be > 0 (it provides the baseline chunk)".into(),
            ));
        }
        if self.num_seq == 0 || self.num_trials == 0 {
            return Err(SpellerError::Config("timing.num_seq and timing.num_trials must be >= 1".into()));
        }
        if self.num_augmentations == 0 || self.num_augmentations > MAX_INDICATOR as usize {
            return Err(SpellerError::Config(format!(
                "timing.num_augmentations must be within 1..={MAX_INDICATOR}"
            )));
        }
        Ok(())
    }
    /// Rate-dependent checks: the rounded augmentation slots must fit the window
    /// and leave room for a baseline.
    pub fn validate_for(&self, sampling_rate: f64) -> Result<()> {
        if !(sampling_rate > 0.0) {
            return Err(SpellerError::InvalidSampleRate);
        }
        self.validate()?;
        if self.slot_samples(sampling_rate).0 == 0 {
            return Err(SpellerError::Config(format!(
                "aug_duration {} s is shorter than one sample at {sampling_rate} Hz",
                self.aug_duration
            )));
        }
        if self.baseline_samples(sampling_rate) == 0 {
            return Err(SpellerError::Config(format!(
                "window of {} samples has no room for a baseline before {} augmentation samples",
                self.window_size(sampling_rate),
                self.augmentation_samples(sampling_rate)
            )));
        }
        Ok(())
    }
}
/// Samples needed to cover `duration` seconds, rounded up.
pub fn window_size(duration: f64, sampling_rate: f64) -> usize {
    (duration * sampling_rate).ceil() as usize
}
/// Augmentation order of one sequence and the stream time of its first flash.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequencePlan {
    pub order: Vec<u8>,
    pub start: f64,
}
impl SequencePlan {
    /// Stream time just past the last augmentation slot.
    pub fn end(&self, timing: &StimulusTiming, sampling_rate: f64) -> f64 {
        self.start + timing.augmentation_samples(sampling_rate) as f64 / sampling_rate
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StimulusSchedule {
    pub sequences: Vec<SequencePlan>,
}
impl StimulusSchedule {
    /// One independent shuffle of `1..=num_augmentations` per sequence.
    ///
    /// Sequences are laid on the sample grid: each one spans `window_size`
    /// samples starting at `trial_start`, and its first flash follows the
    /// baseline samples.
    pub fn shuffled<R: Rng + ?Sized>(
        timing: &StimulusTiming,
        trial_start: f64,
        sampling_rate: f64,
        rng: &mut R,
    ) -> Self {
        let period = timing.window_size(sampling_rate) as f64 / sampling_rate;
        let lead = timing.baseline_samples(sampling_rate) as f64 / sampling_rate;
        let sequences = (0..timing.num_seq)
            .map(|s| {
                let mut order: Vec<u8> = (1..=timing.num_augmentations as u8).collect();
                order.shuffle(rng);
                SequencePlan {
                    order,
                    start: trial_start + s as f64 * period + lead,
                }
            })
            .collect();
        Self { sequences }
    }
    pub fn len(&self) -> usize {
        self.sequences.len()
    }
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
    pub fn orders(&self) -> Vec<Vec<u8>> {
        self.sequences.iter().map(|p| p.order.clone()).collect()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    #[test]
    fn window_size_rounds_up() {
        assert_eq!(window_size(1.25, 500.0), 625);
        assert_eq!(window_size(1.875, 500.0), 938);
        assert_eq!(StimulusTiming::default().window_size(500.0), 938);
    }
    #[test]
    fn default_slots_at_500_hz() {
        let timing = StimulusTiming::default();
        assert_eq!(timing.slot_samples(500.0), (63, 0));
        assert_eq!(timing.augmentation_samples(500.0), 756);
        assert_eq!(timing.baseline_samples(500.0), 182);
        assert!(timing.validate_for(500.0).is_ok());
    }
    #[test]
    fn validation_rejects_bad_timings() {
        let no_baseline = StimulusTiming {
            inter_seq_interval: 0.0,
            ..StimulusTiming::default()
        };
        assert!(no_baseline.validate().is_err());
        let too_many = StimulusTiming {
            num_augmentations: 13,
            ..StimulusTiming::default()
        };
        assert!(too_many.validate().is_err());
        assert!(StimulusTiming::default().validate_for(4.0).is_err());
        assert!(matches!(
            StimulusTiming::default().validate_for(0.0),
            Err(SpellerError::InvalidSampleRate)
        ));
    }
    #[test]
    fn schedule_holds_permutations_on_the_sample_grid() {
        let timing = StimulusTiming::default();
        let mut rng = StdRng::seed_from_u64(3);
        let schedule = StimulusSchedule::shuffled(&timing, 2.0, 500.0, &mut rng);
        assert_eq!(schedule.len(), 5);
        for (s, plan) in schedule.sequences.iter().enumerate() {
            let mut sorted = plan.order.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (1..=12).collect::<Vec<u8>>());
            let expected = 2.0 + (s * 938 + 182) as f64 / 500.0;
            assert!((plan.start - expected).abs() < 1e-9);
            assert!((plan.end(&timing, 500.0) - (expected + 1.512)).abs() < 1e-9);
        }
    }
}
