use std::collections::VecDeque;
use std::f64::consts::PI;
use std::time::{Duration, Instant};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use crate::config::{SampleFormat, StreamConfig};
use crate::error::{Result, SpellerError};
/// Metadata advertised by an acquisition stream.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamInfo {
    pub name: String,
    pub stream_type: String,
    pub channel_count: usize,
    pub sampling_rate: f64,
    pub dtype: SampleFormat,
    pub serial: String,
}
/// One pull from a source: `samples x channels` plus one timestamp per sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleChunk {
    pub samples: Vec<Vec<f64>>,
    pub timestamps: Vec<f64>,
}
impl SampleChunk {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }
    /// An empty chunk means nothing was available yet, not an error.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
    fn split_off(&mut self, at: usize) -> SampleChunk {
        SampleChunk {
            samples: self.samples.split_off(at),
            timestamps: self.timestamps.split_off(at),
        }
    }
}
/// Trait representing something that can yield sample chunks on demand.
pub trait AcquisitionSource {
    fn info(&self) -> StreamInfo;
    /// Returns at most `max_samples` samples. Waiting up to `timeout` is the
    /// source's own business; the pipeline never imposes one.
    fn pull_chunk(&mut self, max_samples: usize, timeout: Duration) -> Result<SampleChunk>;
}
impl StreamConfig {
    pub fn accepts(&self, info: &StreamInfo) -> bool {
        self.name.as_ref().map_or(true, |n| *n == info.name)
            && self
                .stream_type
                .as_ref()
                .map_or(true, |t| t.eq_ignore_ascii_case(&info.stream_type))
            && self.channel_count.map_or(true, |c| c == info.channel_count)
            && self
                .sampling_rate
                .map_or(true, |r| (r - info.sampling_rate).abs() < 1e-9)
            && self.dtype.map_or(true, |d| d == info.dtype)
            && self.serial.as_ref().map_or(true, |s| *s == info.serial)
    }
}
/// Picks the first candidate whose metadata satisfies `config`.
pub fn select_stream<S: AcquisitionSource>(
    candidates: impl IntoIterator<Item = S>,
    config: &StreamConfig,
) -> Result<S> {
    candidates
        .into_iter()
        .find(|source| config.accepts(&source.info()))
        .ok_or(SpellerError::StreamNotFound)
}
/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    info: StreamInfo,
    queue: VecDeque<SampleChunk>,
}
impl ManualSource {
    pub fn new(info: StreamInfo, chunks: impl IntoIterator<Item = SampleChunk>) -> Self {
        Self {
            info,
            queue: chunks.into_iter().collect(),
        }
    }
    pub fn remaining(&self) -> usize {
        self.queue.iter().map(SampleChunk::len).sum()
    }
}
impl AcquisitionSource for ManualSource {
    fn info(&self) -> StreamInfo {
        self.info.clone()
    }
    fn pull_chunk(&mut self, max_samples: usize, _timeout: Duration) -> Result<SampleChunk> {
        let Some(mut chunk) = self.queue.pop_front() else {
            return Ok(SampleChunk::default());
        };
        if chunk.len() > max_samples {
            let rest = chunk.split_off(max_samples);
            self.queue.push_front(rest);
        }
        Ok(chunk)
    }
}
/// Named waveforms produced by [`SyntheticSource`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalMode {
    /// Uniform noise in `[0, 1)` on every channel.
    #[default]
    Random,
    /// 10 Hz sine, identical on every channel.
    Sinusoid,
    /// 5 Hz sine plus a 0.2-weighted 15 Hz sine and 0.2-weighted noise.
    NoisySine,
}
impl SignalMode {
    fn value(self, t: f64, rng: &mut StdRng) -> f64 {
        match self {
            SignalMode::Random => rng.gen::<f64>(),
            SignalMode::Sinusoid => (10.0 * 2.0 * PI * t).sin(),
            SignalMode::NoisySine => {
                (5.0 * 2.0 * PI * t).sin()
                    + 0.2 * (15.0 * 2.0 * PI * t).sin()
                    + 0.2 * rng.gen::<f64>()
            }
        }
    }
}
/// Virtual stream for exercising the pipeline without hardware.
pub struct SyntheticSource {
    info: StreamInfo,
    mode: SignalMode,
    rng: StdRng,
    produced: u64,
    t0: f64,
    realtime: Option<Instant>,
}
impl SyntheticSource {
    pub fn new(channel_count: usize, sampling_rate: f64, mode: SignalMode, seed: u64) -> Self {
        Self {
            info: StreamInfo {
                name: "Virtual Quick-20".into(),
                stream_type: "EEG".into(),
                channel_count,
                sampling_rate,
                dtype: SampleFormat::Float32,
                serial: "virtual000000".into(),
            },
            mode,
            rng: StdRng::seed_from_u64(seed),
            produced: 0,
            t0: 0.0,
            realtime: None,
        }
    }
    /// Only hand out samples whose wall-clock time has come.
    pub fn paced(mut self) -> Self {
        self.realtime = Some(Instant::now());
        self
    }
    pub fn starting_at(mut self, t0: f64) -> Self {
        self.t0 = t0;
        self
    }
    /// Timestamp the next generated sample will carry.
    pub fn next_timestamp(&self) -> f64 {
        self.t0 + self.produced as f64 / self.info.sampling_rate
    }
}
impl AcquisitionSource for SyntheticSource {
    fn info(&self) -> StreamInfo {
        self.info.clone()
    }
    fn pull_chunk(&mut self, max_samples: usize, _timeout: Duration) -> Result<SampleChunk> {
        let due = match self.realtime {
            Some(started) => {
                let total = (started.elapsed().as_secs_f64() * self.info.sampling_rate) as u64;
                (total.saturating_sub(self.produced) as usize).min(max_samples)
            }
            None => max_samples,
        };
        let mut chunk = SampleChunk {
            samples: Vec::with_capacity(due),
            timestamps: Vec::with_capacity(due),
        };
        for _ in 0..due {
            let t = self.next_timestamp();
            let relative = t - self.t0;
            let mut sample = Vec::with_capacity(self.info.channel_count);
            for _ in 0..self.info.channel_count {
                sample.push(self.mode.value(relative, &mut self.rng));
            }
            chunk.samples.push(sample);
            chunk.timestamps.push(t);
            self.produced += 1;
        }
        Ok(chunk)
    }
}
