use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use log::{debug, warn};
use ndarray::Array2;
use parking_lot::Mutex;
use crate::acquisition::artifact::ArtifactStore;
use crate::acquisition::source::SampleChunk;
use crate::config::{BufferConfig, ExtractOptions};
use crate::error::{Result, SpellerError};
use crate::types::Sample;
const DEFAULT_PREFIX: &str = "buffered_";
/// Samples taken out of the buffer by a single extraction call.
#[derive(Clone, Debug)]
pub struct StreamWindow {
    rows: Vec<Vec<f64>>, // samples x (channels + timestamp)
    channel_count: usize,
    requested: usize,
    artifact: PathBuf,
}
impl StreamWindow {
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    pub fn requested(&self) -> usize {
        self.requested
    }
    /// True when the buffer held fewer samples than the caller asked for.
    pub fn is_underrun(&self) -> bool {
        self.rows.len() < self.requested
    }
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
    pub fn timestamps(&self) -> impl Iterator<Item = f64> + '_ {
        let ts = self.channel_count;
        self.rows.iter().map(move |row| row[ts])
    }
    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        let ts = self.channel_count;
        self.rows.iter().map(move |row| Sample {
            timestamp: row[ts],
            channels: row[..ts].to_vec(),
        })
    }
    /// Channel data transposed to `channels x samples`, timestamps excluded.
    pub fn channel_major(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.channel_count, self.rows.len()), |(ch, i)| {
            self.rows[i][ch]
        })
    }
}
/// Ingest buffer that spills every extracted slice to disk before handing it out.
pub struct StreamBuffer {
    rows: Vec<Vec<f64>>, // samples x (channels + timestamp)
    channel_count: usize,
    store: ArtifactStore,
    artifact_names: Vec<String>,
    consolidated: usize,
    timestamp_suffix: bool,
}
pub type SharedStreamBuffer = Arc<Mutex<StreamBuffer>>;
impl StreamBuffer {
    pub fn new(channel_count: usize, store: ArtifactStore) -> Self {
        Self {
            rows: Vec::new(),
            channel_count,
            store,
            artifact_names: Vec::new(),
            consolidated: 0,
            timestamp_suffix: true,
        }
    }
    pub fn from_config(channel_count: usize, config: &BufferConfig) -> Self {
        let store = ArtifactStore::new(
            config.artifact_dir.clone(),
            Duration::from_millis(config.slow_write_warning_ms),
        );
        let mut buffer = Self::new(channel_count, store);
        buffer.timestamp_suffix = config.timestamp_suffix;
        buffer
    }
    pub fn with_timestamp_suffix(mut self, enabled: bool) -> Self {
        self.timestamp_suffix = enabled;
        self
    }
    pub fn timestamp_suffix(&self) -> bool {
        self.timestamp_suffix
    }
    pub fn into_shared(self) -> SharedStreamBuffer {
        Arc::new(Mutex::new(self))
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }
    pub fn latest_timestamp(&self) -> Option<f64> {
        self.rows.last().map(|row| row[self.channel_count])
    }
    /// Every artifact written since the last name reset, consolidated or not.
    pub fn artifact_names(&self) -> &[String] {
        &self.artifact_names
    }
    pub fn pending_artifacts(&self) -> &[String] {
        &self.artifact_names[self.consolidated..]
    }
    /// Appends one acquisition chunk; the timestamp becomes the trailing column.
    pub fn add(&mut self, samples: Vec<Vec<f64>>, timestamps: Vec<f64>) -> Result<usize> {
        if samples.len() != timestamps.len() {
            return Err(SpellerError::TimestampMismatch {
                samples: samples.len(),
                timestamps: timestamps.len(),
            });
        }
        if let Some(bad) = samples.iter().find(|s| s.len() != self.channel_count) {
            return Err(SpellerError::ChannelMismatch {
                expected: self.channel_count,
                actual: bad.len(),
            });
        }
        let added = samples.len();
        self.rows.reserve(added);
        for (mut sample, stamp) in samples.into_iter().zip(timestamps) {
            sample.push(stamp);
            self.rows.push(sample);
        }
        Ok(added)
    }
    pub fn add_chunk(&mut self, chunk: SampleChunk) -> Result<usize> {
        self.add(chunk.samples, chunk.timestamps)
    }
    /// True iff at least `size` samples are buffered.
    pub fn flag(&self, size: usize) -> bool {
        self.rows.len() >= size
    }
    pub fn windowed_extract(
        &mut self,
        count: usize,
        from_end: bool,
        delete: bool,
    ) -> Result<StreamWindow> {
        self.windowed_extract_as(count, from_end, delete, None)
    }
    /// Takes the oldest or newest `count` samples (fewer on underrun). The slice is
    /// persisted before anything else happens, and only removed from the live buffer
    /// once that write succeeded.
    pub fn windowed_extract_as(
        &mut self,
        count: usize,
        from_end: bool,
        delete: bool,
        filename: Option<&str>,
    ) -> Result<StreamWindow> {
        let len = self.rows.len();
        let take = count.min(len);
        let range = if from_end { len - take..len } else { 0..take };
        let options = ExtractOptions {
            window_start: Some(range.start),
            window_end: Some(range.end),
            filename: filename.map(str::to_string),
            timestamp_suffix: self.timestamp_suffix,
        };
        let artifact = self.save(&options)?;
        if take < count {
            debug!("extraction underrun: requested {count}, buffered {len}");
        }
        let rows = if delete {
            self.rows.drain(range).collect()
        } else {
            self.rows[range].to_vec()
        };
        Ok(StreamWindow {
            rows,
            channel_count: self.channel_count,
            requested: count,
            artifact,
        })
    }
    /// Persists a slice of the live buffer without removing it.
    pub fn save(&mut self, options: &ExtractOptions) -> Result<PathBuf> {
        let range = self.resolve(options)?;
        let prefix = options.filename.as_deref().unwrap_or(DEFAULT_PREFIX);
        let name = self
            .store
            .unique_name(prefix, options.timestamp_suffix, &self.artifact_names);
        let path = self
            .store
            .write(&name, self.channel_count + 1, &self.rows[range])?;
        self.artifact_names.push(name);
        Ok(path)
    }
    fn resolve(&self, options: &ExtractOptions) -> Result<Range<usize>> {
        let len = self.rows.len();
        let start = options.window_start.unwrap_or(0);
        let end = options.window_end.unwrap_or(len);
        if start > end || end > len {
            return Err(SpellerError::RangeOutOfBounds { start, end, len });
        }
        Ok(start..end)
    }
    /// Empties the live buffer. The artifact index survives unless asked otherwise,
    /// since it lists everything the current trial has persisted.
    pub fn clear(&mut self, reset_artifact_names: bool) {
        if !self.rows.is_empty() {
            debug!("clearing {} buffered samples", self.rows.len());
        }
        self.rows.clear();
        if reset_artifact_names {
            self.artifact_names.clear();
            self.consolidated = 0;
        }
    }
    /// Packs every not-yet-consolidated artifact into one archive and removes the
    /// individual files.
    pub fn consolidate(&mut self, compress: bool) -> Result<Option<PathBuf>> {
        let archive = self.store.consolidate(self.pending_artifacts(), compress)?;
        self.consolidated = self.artifact_names.len();
        Ok(archive)
    }
}
impl Drop for StreamBuffer {
    fn drop(&mut self) {
        if !self.rows.is_empty() {
            warn!(
                "stream buffer dropped with {} samples that were never persisted or discarded",
                self.rows.len()
            );
        }
    }
}
