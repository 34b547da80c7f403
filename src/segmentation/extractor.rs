use ndarray::s;
use crate::segmentation::EventWindow;
use crate::types::Chunk;
/// Splits a window into maximal equal-indicator runs in one left-to-right pass.
///
/// A run closes when the indicator changes between column `i` and `i + 1`, or at
/// the last column. Indicator and flag are read from the run's last column.
pub fn extract_chunks(window: &EventWindow) -> Vec<Chunk> {
    let n = window.len();
    let channels = window.channels();
    let mut chunks = Vec::new();
    let mut start = 0;
    for i in 0..n {
        let closes = i + 1 == n || window.indicator(i) != window.indicator(i + 1);
        if !closes {
            continue;
        }
        let label = window.label(i);
        chunks.push(Chunk {
            indicator: label.indicator,
            flag: label.flag,
            start,
            data: channels.slice(s![.., start..=i]).to_owned(),
        });
        start = i + 1;
    }
    chunks
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventLabel;
    use ndarray::{concatenate, Array2, Axis};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    fn window_from_runs(runs: &[(u8, usize)], channels: usize) -> EventWindow {
        let labels: Vec<EventLabel> = runs
            .iter()
            .flat_map(|&(indicator, len)| {
                std::iter::repeat(EventLabel {
                    indicator,
                    flag: false,
                })
                .take(len)
            })
            .collect();
        let data = Array2::from_shape_fn((channels, labels.len()), |(c, i)| {
            (c * 1000 + i) as f64
        });
        EventWindow::from_parts(data, &labels).unwrap()
    }
    #[test]
    fn empty_window_has_no_chunks() {
        let window = window_from_runs(&[], 3);
        assert!(extract_chunks(&window).is_empty());
    }
    #[test]
    fn single_run_is_one_chunk() {
        let window = window_from_runs(&[(4, 7)], 2);
        let chunks = extract_chunks(&window);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 7);
        assert_eq!(chunks[0].indicator, 4);
    }
    #[test]
    fn label_comes_from_last_column() {
        let labels = [
            EventLabel { indicator: 3, flag: false },
            EventLabel { indicator: 3, flag: false },
            EventLabel { indicator: 3, flag: true },
            EventLabel { indicator: 0, flag: true },
            EventLabel { indicator: 0, flag: false },
        ];
        let window = EventWindow::from_parts(Array2::zeros((1, 5)), &labels).unwrap();
        let chunks = extract_chunks(&window);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].flag);
        assert!(!chunks[1].flag);
        assert_eq!(chunks[1].start, 3);
    }
    #[test]
    fn chunks_partition_random_windows() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let mut runs = Vec::new();
            let mut previous = None;
            for _ in 0..rng.gen_range(1..20) {
                let mut indicator = rng.gen_range(0..=12u8);
                while Some(indicator) == previous {
                    indicator = rng.gen_range(0..=12u8);
                }
                previous = Some(indicator);
                runs.push((indicator, rng.gen_range(1..15usize)));
            }
            let window = window_from_runs(&runs, 3);
            let chunks = extract_chunks(&window);
            assert_eq!(chunks.len(), runs.len());
            let mut expected_start = 0;
            for (chunk, &(indicator, len)) in chunks.iter().zip(&runs) {
                assert_eq!(chunk.start, expected_start);
                assert_eq!(chunk.len(), len);
                assert_eq!(chunk.indicator, indicator);
                expected_start += len;
            }
            let views: Vec<_> = chunks.iter().map(|c| c.data.view()).collect();
            let rebuilt = concatenate(Axis(1), &views).unwrap();
            assert_eq!(rebuilt.view(), window.channels());
        }
    }
}
