use log::warn;
use ndarray::{concatenate, Axis};
use crate::error::Anomaly;
use crate::segmentation::SequenceContext;
use crate::types::{Chunk, FeatureVector};
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Compacted {
    pub features: Vec<FeatureVector>,
    pub anomalies: Vec<Anomaly>,
}
/// Merges adjacent (flash, ISI) chunk pairs into channel-major feature vectors.
///
/// Pairs are strict: chunk `2k` with chunk `2k + 1`. The vector carries the
/// first chunk's indicator and flag. An odd trailing chunk cannot be paired and
/// is dropped.
pub fn compact(chunks: &[Chunk], ctx: SequenceContext) -> Compacted {
    let pairs = chunks.chunks_exact(2);
    let trailing = pairs.remainder().first();
    let mut features = Vec::with_capacity(chunks.len() / 2);
    for pair in pairs {
        let (flash, isi) = (&pair[0], &pair[1]);
        let merged = match concatenate(Axis(1), &[flash.data.view(), isi.data.view()]) {
            Ok(merged) => merged,
            Err(e) => {
                warn!(
                    "{ctx}: cannot merge chunks at {} and {} ({e}); pair skipped",
                    flash.start, isi.start
                );
                continue;
            }
        };
        // Row-major iteration over channels x samples is channel-major flattening.
        features.push(FeatureVector {
            indicator: flash.indicator,
            flag: flash.flag,
            values: merged.iter().copied().collect(),
        });
    }
    let mut anomalies = Vec::new();
    if let Some(last) = trailing {
        warn!(
            "{ctx}: odd chunk count {}, dropping trailing chunk (indicator {}, {} samples)",
            chunks.len(),
            last.indicator,
            last.len()
        );
        anomalies.push(Anomaly::BoundaryMismatch {
            indicator: last.indicator,
            length: last.len(),
        });
    }
    Compacted {
        features,
        anomalies,
    }
}
