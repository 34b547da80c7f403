use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{Result, SpellerError};
use crate::scheduler::StimulusTiming;
use crate::segmentation::NormalizationPolicy;
use crate::acquisition::SignalMode;
/// Numeric format advertised by a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    Float32,
    Double64,
    Int32,
    Int16,
}
/// Stream selection criteria. Every unset field matches any stream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub stream_type: Option<String>,
    pub channel_count: Option<usize>,
    pub sampling_rate: Option<f64>,
    pub dtype: Option<SampleFormat>,
    pub serial: Option<String>,
}
impl StreamConfig {
    pub fn eeg() -> Self {
        Self {
            stream_type: Some("EEG".into()),
            ..Self::default()
        }
    }
}
/// Options for persisting one slice of the live buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// First row of the slice (inclusive). `None` means the buffer start.
    pub window_start: Option<usize>,
    /// Last row of the slice (exclusive). `None` means the buffer end.
    pub window_end: Option<usize>,
    /// Artifact name prefix; `buffered_` when unset.
    pub filename: Option<String>,
    pub timestamp_suffix: bool,
}
impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            window_start: None,
            window_end: None,
            filename: None,
            timestamp_suffix: true,
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub artifact_dir: PathBuf,
    pub timestamp_suffix: bool,
    pub slow_write_warning_ms: u64,
    pub compress_archive: bool,
}
impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("recordings"),
            timestamp_suffix: true,
            slow_write_warning_ms: 20,
            compress_archive: false,
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub mode: SignalMode,
    pub channel_count: usize,
    pub sampling_rate: f64,
    pub seed: u64,
}
impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            mode: SignalMode::Random,
            channel_count: 8,
            sampling_rate: 500.0,
            seed: 7,
        }
    }
}
/// A secondary stream recorded next to the EEG one and archived per trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuxiliaryConfig {
    /// Artifact prefix, e.g. `impedances`.
    pub name: String,
    pub channel_count: usize,
    pub sampling_rate: f64,
}
impl Default for AuxiliaryConfig {
    fn default() -> Self {
        Self {
            name: "impedances".into(),
            channel_count: 8,
            sampling_rate: 500.0,
        }
    }
}
/// Everything a session needs, loadable from a single JSON document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub stream: StreamConfig,
    pub timing: StimulusTiming,
    pub buffer: BufferConfig,
    pub policy: NormalizationPolicy,
    pub signal: SignalConfig,
    pub auxiliary: Vec<AuxiliaryConfig>,
    /// Characters the subject is asked to spell, one per trial.
    pub copy_text: String,
    pub trial_log: Option<PathBuf>,
    /// Directory for per-trial ERP plots; no plots when unset.
    pub plot_dir: Option<PathBuf>,
}
impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&raw)
            .map_err(|e| SpellerError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }
    pub fn validate(&self) -> Result<()> {
        if self.signal.sampling_rate <= 0.0 {
            return Err(SpellerError::InvalidSampleRate);
        }
        if self.signal.channel_count == 0 {
            return Err(SpellerError::Config("signal.channel_count must be > 0".into()));
        }
        for aux in &self.auxiliary {
            if !(aux.sampling_rate.is_finite() && aux.sampling_rate > 0.0) {
                return Err(SpellerError::InvalidSampleRate);
            }
            if aux.channel_count == 0 {
                return Err(SpellerError::Config(format!(
                    "auxiliary stream {}: channel_count must be > 0",
                    aux.name
                )));
            }
        }
        self.timing.validate_for(self.signal.sampling_rate)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn partial_json_falls_back_to_defaults() {
        let raw = r#"{
            "stream": { "type": "EEG", "sampling_rate": 500.0 },
            "timing": { "num_seq": 3 },
            "policy": "lenient"
        }"#;
        let config: SessionConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.stream.stream_type.as_deref(), Some("EEG"));
        assert_eq!(config.stream.channel_count, None);
        assert_eq!(config.timing.num_seq, 3);
        assert_eq!(config.timing.num_augmentations, 12);
        assert_eq!(config.policy, NormalizationPolicy::Lenient);
        assert!(config.buffer.timestamp_suffix);
        config.validate().unwrap();
    }
    #[test]
    fn auxiliary_streams_default_to_impedances() {
        let raw = r#"{ "auxiliary": [ { "channel_count": 20 } ] }"#;
        let mut config: SessionConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.auxiliary[0].name, "impedances");
        assert_eq!(config.auxiliary[0].channel_count, 20);
        config.validate().unwrap();
        config.auxiliary[0].channel_count = 0;
        assert!(matches!(config.validate(), Err(SpellerError::Config(_))));
    }
    #[test]
    fn rejects_zero_sampling_rate() {
        let mut config = SessionConfig::default();
        config.signal.sampling_rate = 0.0;
        assert!(matches!(config.validate(), Err(SpellerError::InvalidSampleRate)));
    }
}
