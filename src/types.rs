// src/types.rs
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
/// Indicator value carried by samples outside any augmentation.
pub const BASELINE_INDICATOR: u8 = 0;
/// Highest augmentation index of the 6x6 grid (6 columns + 6 rows).
pub const MAX_INDICATOR: u8 = 12;
/// One acquisition sample.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub timestamp: f64,
    pub channels: Vec<f64>,
}
/// The two marker fields that ride alongside the channel data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventLabel {
    pub indicator: u8,
    pub flag: bool,
}
/// Maximal run of samples sharing one indicator value.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    pub indicator: u8,
    pub flag: bool,
    /// Column of the source window where the run begins.
    pub start: usize,
    pub data: Array2<f64>, // channels x samples
}
impl Chunk {
    pub fn len(&self) -> usize {
        self.data.ncols()
    }
    pub fn is_empty(&self) -> bool {
        self.data.ncols() == 0
    }
    pub fn channel_count(&self) -> usize {
        self.data.nrows()
    }
    pub fn label(&self) -> EventLabel {
        EventLabel {
            indicator: self.indicator,
            flag: self.flag,
        }
    }
    /// Copy keeping only the first `len` samples.
    pub fn truncated(&self, len: usize) -> Chunk {
        let len = len.min(self.len());
        Chunk {
            indicator: self.indicator,
            flag: self.flag,
            start: self.start,
            data: self.data.slice(s![.., ..len]).to_owned(),
        }
    }
}
/// Channel-major flattening of one merged (flash, ISI) chunk pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub indicator: u8,
    pub flag: bool,
    pub values: Vec<f64>,
}
impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn label(&self) -> EventLabel {
        EventLabel {
            indicator: self.indicator,
            flag: self.flag,
        }
    }
}
