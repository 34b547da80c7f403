use std::path::PathBuf;
use log::{debug, error, info, warn};
use crate::acquisition::{SharedStreamBuffer, StreamBuffer, StreamWindow};
use crate::classifier::{relabel, Classifier};
use crate::config::ExtractOptions;
use crate::decoder::{decode, Decoded};
use crate::error::{Anomaly, Result, SpellerError};
use crate::scheduler::annotate::annotate;
use crate::scheduler::timing::{SequencePlan, StimulusTiming};
use crate::segmentation::{
    compact, extract_chunks, ChunkNormalizer, NormalizationPolicy, Normalized, SequenceContext,
    StandardLengths,
};
use crate::types::{EventLabel, FeatureVector};
/// Artifact prefix of the primary (EEG) stream.
pub const PRIMARY_STREAM: &str = "voltages";
/// What happens to samples still buffered when a trial ends or is abandoned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResidualDisposition {
    /// Spill them to an artifact before clearing.
    Persist,
    Discard,
}
#[derive(Clone, Debug)]
pub struct SequenceOutcome {
    pub sequence: usize,
    pub requested: usize,
    pub samples: usize,
    /// The buffer held fewer samples than one window.
    pub short: bool,
    pub features: usize,
    pub anomalies: Vec<Anomaly>,
    pub artifact: PathBuf,
    /// One artifact per auxiliary stream, in registration order.
    pub auxiliary: Vec<PathBuf>,
}
#[derive(Clone, Debug)]
pub struct TrialOutcome {
    pub trial: usize,
    pub orders: Vec<Vec<u8>>,
    pub decoded: Decoded,
    pub sequences: Vec<SequenceOutcome>,
    /// Feature vectors with the flags the classifier assigned.
    pub features: Vec<FeatureVector>,
    pub archive: Option<PathBuf>,
    pub auxiliary_archives: Vec<PathBuf>,
}
impl TrialOutcome {
    pub fn short_sequences(&self) -> Vec<usize> {
        self.sequences
            .iter()
            .filter(|s| s.short)
            .map(|s| s.sequence)
            .collect()
    }
    pub fn anomaly_count(&self) -> usize {
        self.sequences.iter().map(|s| s.anomalies.len()).sum()
    }
}
/// A stream recorded in lockstep with the primary one (impedances, for instance).
/// It is extracted and archived alongside it but never segmented.
struct AuxiliaryStream {
    name: String,
    buffer: SharedStreamBuffer,
    window_size: usize,
}
struct ActiveTrial {
    number: usize,
    targets: Vec<u8>,
    orders: Vec<Vec<u8>>,
    sequences: Vec<SequenceOutcome>,
    features: Vec<FeatureVector>,
    failure: Option<String>,
}
/// Control side of a session: extracts one window per sequence from the shared
/// buffer and turns a finished trial into a decoded character.
pub struct TrialRunner<C> {
    buffer: SharedStreamBuffer,
    auxiliary: Vec<AuxiliaryStream>,
    timing: StimulusTiming,
    sampling_rate: f64,
    window_size: usize,
    policy: NormalizationPolicy,
    lengths: Option<StandardLengths>,
    classifier: C,
    compress_archive: bool,
    active: Option<ActiveTrial>,
}
impl<C: Classifier> TrialRunner<C> {
    pub fn new(
        buffer: SharedStreamBuffer,
        timing: StimulusTiming,
        sampling_rate: f64,
        policy: NormalizationPolicy,
        classifier: C,
    ) -> Result<Self> {
        timing.validate_for(sampling_rate)?;
        let window_size = timing.window_size(sampling_rate);
        info!(
            "trial runner ready: window {window_size} samples ({:.3} s @ {sampling_rate} Hz), {:?} policy",
            timing.sequence_duration(),
            policy
        );
        Ok(Self {
            buffer,
            auxiliary: Vec::new(),
            timing,
            sampling_rate,
            window_size,
            policy,
            lengths: None,
            classifier,
            compress_archive: false,
            active: None,
        })
    }
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress_archive = compress;
        self
    }
    /// Fixes the standard lengths up front instead of learning them from the
    /// first reference pair.
    pub fn with_lengths(mut self, lengths: StandardLengths) -> Self {
        self.lengths = Some(lengths);
        self
    }
    /// Registers a secondary stream. Each sequence extracts its newest window as
    /// `<name>_t<t>_s<s>_`, sized for the stream's own rate.
    pub fn with_auxiliary(
        mut self,
        name: impl Into<String>,
        buffer: SharedStreamBuffer,
        sampling_rate: f64,
    ) -> Result<Self> {
        let name = name.into();
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(SpellerError::InvalidSampleRate);
        }
        if name == PRIMARY_STREAM || self.auxiliary.iter().any(|a| a.name == name) {
            return Err(SpellerError::Config(format!("stream name {name} is already in use")));
        }
        let window_size = self.timing.window_size(sampling_rate);
        info!("recording auxiliary stream {name}: window {window_size} samples");
        self.auxiliary.push(AuxiliaryStream {
            name,
            buffer,
            window_size,
        });
        Ok(self)
    }
    pub fn window_size(&self) -> usize {
        self.window_size
    }
    pub fn timing(&self) -> &StimulusTiming {
        &self.timing
    }
    pub fn lengths(&self) -> Option<StandardLengths> {
        self.lengths
    }
    pub fn buffer(&self) -> &SharedStreamBuffer {
        &self.buffer
    }
    pub fn auxiliary_buffer(&self, name: &str) -> Option<&SharedStreamBuffer> {
        self.auxiliary
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.buffer)
    }
    pub fn is_trial_active(&self) -> bool {
        self.active.is_some()
    }
    /// `targets` are the indicators to flag; empty for free spelling.
    pub fn begin_trial(&mut self, trial: usize, targets: &[u8]) -> Result<()> {
        if let Some(active) = &self.active {
            return Err(SpellerError::TrialAborted {
                trial: active.number,
                reason: format!("trial {trial} started before it was finished or aborted"),
            });
        }
        debug!("trial {trial}: begin, targets {targets:?}");
        self.active = Some(ActiveTrial {
            number: trial,
            targets: targets.to_vec(),
            orders: Vec::new(),
            sequences: Vec::new(),
            features: Vec::new(),
            failure: None,
        });
        Ok(())
    }
    /// Called once the sequence's last augmentation ended. Extracts the newest
    /// window of every stream, then segments the primary one into feature vectors.
    pub fn run_sequence(&mut self, plan: &SequencePlan) -> Result<SequenceOutcome> {
        let active = self.active.as_mut().ok_or_else(|| {
            SpellerError::Config("run_sequence called without an active trial".into())
        })?;
        if let Some(reason) = &active.failure {
            return Err(SpellerError::TrialAborted {
                trial: active.number,
                reason: reason.clone(),
            });
        }
        let ctx = SequenceContext {
            trial: active.number,
            sequence: active.sequences.len() + 1,
        };
        let window = match extract_newest(&self.buffer, PRIMARY_STREAM, self.window_size, ctx) {
            Ok(window) => window,
            Err(e) => {
                error!("{ctx}: aborting trial, window not persisted: {e}");
                active.failure = Some(e.to_string());
                return Err(e);
            }
        };
        let mut auxiliary = Vec::with_capacity(self.auxiliary.len());
        for stream in &self.auxiliary {
            match extract_newest(&stream.buffer, &stream.name, stream.window_size, ctx) {
                Ok(aux) => auxiliary.push(aux.artifact().to_path_buf()),
                Err(e) => {
                    error!("{ctx}: aborting trial, {} window not persisted: {e}", stream.name);
                    active.failure = Some(e.to_string());
                    return Err(e);
                }
            }
        }
        let mut anomalies = Vec::new();
        if window.is_underrun() {
            anomalies.push(Anomaly::Underrun {
                requested: window.requested(),
                available: window.len(),
            });
        }
        let annotated = annotate(
            &window,
            plan,
            &active.targets,
            &self.timing,
            self.sampling_rate,
        )?;
        let chunks = extract_chunks(&annotated);
        let lengths = match self.lengths {
            Some(lengths) => lengths,
            None => match StandardLengths::from_reference(&chunks) {
                Some(lengths) => {
                    info!(
                        "{ctx}: standard lengths fixed at flash {} / isi {}",
                        lengths.flash, lengths.isi
                    );
                    self.lengths = Some(lengths);
                    lengths
                }
                None => StandardLengths::from_timing(&self.timing, self.sampling_rate),
            },
        };
        let Normalized {
            chunks: normalized,
            anomalies: normalizer_anomalies,
        } = ChunkNormalizer::new(lengths, self.policy).normalize(&chunks, ctx);
        let compacted = compact(&normalized, ctx);
        anomalies.extend(normalizer_anomalies);
        anomalies.extend(compacted.anomalies);
        debug!(
            "{ctx}: {} samples, {} chunks, {} feature vectors, {} anomalies",
            window.len(),
            chunks.len(),
            compacted.features.len(),
            anomalies.len()
        );
        active.orders.push(plan.order.clone());
        let features = compacted.features.len();
        active.features.extend(compacted.features);
        let outcome = SequenceOutcome {
            sequence: ctx.sequence,
            requested: window.requested(),
            samples: window.len(),
            short: window.is_underrun(),
            features,
            anomalies,
            artifact: window.artifact().to_path_buf(),
            auxiliary,
        };
        active.sequences.push(outcome.clone());
        Ok(outcome)
    }
    /// Relabels the trial's feature vectors with the classifier and decodes them.
    /// Then, stream by stream, settles the samples still buffered as `residual`
    /// says (persisted ones join the trial archive), consolidates the trial's
    /// artifacts and resets the buffer.
    pub fn finish_trial(&mut self, residual: ResidualDisposition) -> Result<TrialOutcome> {
        if let Some(ActiveTrial {
            number,
            failure: Some(reason),
            ..
        }) = &self.active
        {
            return Err(SpellerError::TrialAborted {
                trial: *number,
                reason: reason.clone(),
            });
        }
        let active = self.active.take().ok_or_else(|| {
            SpellerError::Config("finish_trial called without an active trial".into())
        })?;
        let predictions = self.classifier.predict(&active.features);
        let features = relabel(&active.features, &predictions);
        let labels: Vec<EventLabel> = features.iter().map(FeatureVector::label).collect();
        let decoded = decode(&labels);
        let mut archives = Vec::with_capacity(self.auxiliary.len() + 1);
        let streams = std::iter::once((PRIMARY_STREAM, &self.buffer))
            .chain(self.auxiliary.iter().map(|a| (a.name.as_str(), &a.buffer)));
        for (name, buffer) in streams {
            match close_stream(
                &mut buffer.lock(),
                name,
                active.number,
                residual,
                self.compress_archive,
            ) {
                Ok(archive) => archives.push(archive),
                Err(e) => {
                    error!(
                        "trial {}: aborting, {name} artifacts not consolidated: {e}",
                        active.number
                    );
                    self.active = Some(ActiveTrial {
                        failure: Some(e.to_string()),
                        ..active
                    });
                    return Err(e);
                }
            }
        }
        match decoded {
            Decoded::Char(ch) => info!("trial {}: decoded '{ch}'", active.number),
            Decoded::NoDecode => warn!("trial {}: no decode", active.number),
        }
        let mut archives = archives.into_iter();
        let archive = archives.next().flatten();
        Ok(TrialOutcome {
            trial: active.number,
            orders: active.orders,
            decoded,
            sequences: active.sequences,
            features,
            archive,
            auxiliary_archives: archives.flatten().collect(),
        })
    }
    /// Abandons the active trial. Artifacts already written stay on disk;
    /// residual samples of every stream are persisted or discarded as requested.
    /// Returns the residual artifacts written. Every stream is settled even when
    /// one fails; the first failure is returned.
    pub fn abort(&mut self, disposition: ResidualDisposition) -> Result<Vec<PathBuf>> {
        let trial = self.active.take().map_or(0, |a| a.number);
        let streams = std::iter::once((PRIMARY_STREAM, &self.buffer))
            .chain(self.auxiliary.iter().map(|a| (a.name.as_str(), &a.buffer)));
        let mut saved = Vec::new();
        let mut first_error = None;
        for (name, buffer) in streams {
            let mut buffer = buffer.lock();
            match settle_residual(&mut buffer, name, trial, disposition) {
                Ok(path) => {
                    saved.extend(path);
                    buffer.clear(true);
                }
                Err(e) => {
                    error!("trial {trial} aborted: {name} residual not persisted: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(saved),
        }
    }
}
fn extract_newest(
    buffer: &SharedStreamBuffer,
    stream: &str,
    window_size: usize,
    ctx: SequenceContext,
) -> Result<StreamWindow> {
    let mut buffer = buffer.lock();
    if !buffer.flag(window_size) {
        warn!(
            "{ctx}: {stream} underrun, {} of {window_size} samples buffered",
            buffer.len()
        );
    }
    let prefix = format!("{stream}_t{}_s{}_", ctx.trial, ctx.sequence);
    buffer.windowed_extract_as(window_size, true, true, Some(&prefix))
}
/// Persists or drops whatever is still buffered. Rows only leave the buffer
/// once they are durable or explicitly discarded.
fn settle_residual(
    buffer: &mut StreamBuffer,
    stream: &str,
    trial: usize,
    disposition: ResidualDisposition,
) -> Result<Option<PathBuf>> {
    let residual = buffer.len();
    if residual == 0 {
        return Ok(None);
    }
    let saved = match disposition {
        ResidualDisposition::Persist => {
            let options = ExtractOptions {
                filename: Some(format!("{stream}_residual_t{trial}_")),
                timestamp_suffix: buffer.timestamp_suffix(),
                ..ExtractOptions::default()
            };
            let path = buffer.save(&options)?;
            info!("trial {trial}: {residual} residual {stream} samples saved to {path:?}");
            Some(path)
        }
        ResidualDisposition::Discard => {
            warn!("trial {trial}: discarding {residual} residual {stream} samples");
            None
        }
    };
    buffer.clear(false);
    Ok(saved)
}
/// Residual, consolidation and reset for one stream at a trial boundary. The
/// lock is held throughout so a concurrent pump cannot slip samples in between.
fn close_stream(
    buffer: &mut StreamBuffer,
    stream: &str,
    trial: usize,
    residual: ResidualDisposition,
    compress: bool,
) -> Result<Option<PathBuf>> {
    settle_residual(buffer, stream, trial, residual)?;
    let archive = buffer.consolidate(compress)?;
    buffer.clear(true);
    Ok(archive)
}
