use ndarray::{s, Array2, ArrayView2};
use crate::error::{Result, SpellerError};
use crate::types::{EventLabel, MAX_INDICATOR};
/// Samples of one window laid out as `channels` rows, then the indicator row,
/// then the flag row; one column per sample.
#[derive(Clone, Debug, PartialEq)]
pub struct EventWindow {
    matrix: Array2<f64>,
    channel_count: usize,
}
impl EventWindow {
    pub fn from_matrix(matrix: Array2<f64>, channel_count: usize) -> Result<Self> {
        if matrix.nrows() != channel_count + 2 {
            return Err(SpellerError::MalformedWindow(format!(
                "expected {} rows (channels + indicator + flag), got {}",
                channel_count + 2,
                matrix.nrows()
            )));
        }
        for (column, &value) in matrix.row(channel_count).iter().enumerate() {
            if value.fract() != 0.0 || value < 0.0 || value > MAX_INDICATOR as f64 {
                return Err(SpellerError::InvalidIndicator { column, value });
            }
        }
        Ok(Self {
            matrix,
            channel_count,
        })
    }
    /// Stacks `channels x samples` data with one label per sample.
    pub fn from_parts(channels: Array2<f64>, labels: &[EventLabel]) -> Result<Self> {
        if channels.ncols() != labels.len() {
            return Err(SpellerError::MalformedWindow(format!(
                "{} samples but {} labels",
                channels.ncols(),
                labels.len()
            )));
        }
        let channel_count = channels.nrows();
        let mut matrix = Array2::zeros((channel_count + 2, labels.len()));
        matrix
            .slice_mut(s![..channel_count, ..])
            .assign(&channels);
        for (i, label) in labels.iter().enumerate() {
            matrix[[channel_count, i]] = label.indicator as f64;
            matrix[[channel_count + 1, i]] = if label.flag { 1.0 } else { 0.0 };
        }
        Self::from_matrix(matrix, channel_count)
    }
    pub fn len(&self) -> usize {
        self.matrix.ncols()
    }
    pub fn is_empty(&self) -> bool {
        self.matrix.ncols() == 0
    }
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }
    pub fn channels(&self) -> ArrayView2<'_, f64> {
        self.matrix.slice(s![..self.channel_count, ..])
    }
    pub fn indicator(&self, column: usize) -> u8 {
        self.matrix[[self.channel_count, column]] as u8
    }
    pub fn flag(&self, column: usize) -> bool {
        self.matrix[[self.channel_count + 1, column]] != 0.0
    }
    pub fn label(&self, column: usize) -> EventLabel {
        EventLabel {
            indicator: self.indicator(column),
            flag: self.flag(column),
        }
    }
    pub fn labels(&self) -> Vec<EventLabel> {
        (0..self.len()).map(|i| self.label(i)).collect()
    }
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn rejects_out_of_range_indicator() {
        let mut m = Array2::zeros((4, 3));
        m[[2, 1]] = 13.0;
        let err = EventWindow::from_matrix(m, 2).unwrap_err();
        assert!(matches!(err, SpellerError::InvalidIndicator { column: 1, .. }));
    }
    #[test]
    fn rejects_wrong_row_count() {
        let m = Array2::zeros((3, 3));
        assert!(matches!(
            EventWindow::from_matrix(m, 2),
            Err(SpellerError::MalformedWindow(_))
        ));
    }
    #[test]
    fn parts_round_trip_labels() {
        let channels = Array2::from_shape_fn((2, 3), |(c, i)| (c * 3 + i) as f64);
        let labels = [
            EventLabel { indicator: 0, flag: false },
            EventLabel { indicator: 7, flag: true },
            EventLabel { indicator: 7, flag: true },
        ];
        let window = EventWindow::from_parts(channels.clone(), &labels).unwrap();
        assert_eq!(window.labels(), labels.to_vec());
        assert_eq!(window.channels(), channels.view());
    }
}
