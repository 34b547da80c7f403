// src/decoder.rs
use log::debug;
use crate::types::EventLabel;
/// Row-column speller grid. Indicators 1..=6 address columns, 7..=12 address rows.
pub const GRID: [[char; 6]; 6] = [
    ['A', 'B', 'C', 'D', 'E', 'F'],
    ['G', 'H', 'I', 'J', 'K', 'L'],
    ['M', 'N', 'O', 'P', 'Q', 'R'],
    ['S', 'T', 'U', 'V', 'W', 'X'],
    ['Y', 'Z', '0', '1', '2', '3'],
    ['4', '5', '6', '7', '8', '9'],
];
const FIRST_ROW: u8 = 7;
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decoded {
    Char(char),
    /// No flagged row or no flagged column in the trial.
    NoDecode,
}
impl Decoded {
    pub fn as_char(self) -> Option<char> {
        match self {
            Decoded::Char(c) => Some(c),
            Decoded::NoDecode => None,
        }
    }
}
/// Picks the most often flagged column and row of a trial. On a tie the
/// indicator that was flagged first wins.
pub fn decode(labels: &[EventLabel]) -> Decoded {
    let mut columns = Tally::default();
    let mut rows = Tally::default();
    for (position, label) in labels.iter().enumerate().filter(|(_, l)| l.flag) {
        match label.indicator {
            1..=6 => columns.hit(label.indicator as usize - 1, position),
            7..=12 => rows.hit((label.indicator - FIRST_ROW) as usize, position),
            _ => {}
        }
    }
    match (columns.winner(), rows.winner()) {
        (Some(c), Some(r)) => Decoded::Char(GRID[r][c]),
        (column, row) => {
            debug!("no decode: column {column:?}, row {row:?}");
            Decoded::NoDecode
        }
    }
}
#[derive(Default)]
struct Tally {
    counts: [usize; 6],
    first_seen: [usize; 6],
}
impl Tally {
    fn hit(&mut self, slot: usize, position: usize) {
        if self.counts[slot] == 0 {
            self.first_seen[slot] = position;
        }
        self.counts[slot] += 1;
    }
    fn winner(&self) -> Option<usize> {
        (0..6)
            .filter(|&i| self.counts[i] > 0)
            .max_by(|&a, &b| {
                self.counts[a]
                    .cmp(&self.counts[b])
                    .then(self.first_seen[b].cmp(&self.first_seen[a]))
            })
    }
}
/// Column and row indicators that spell `ch`, if it is on the grid.
pub fn target_indicators(ch: char) -> Option<(u8, u8)> {
    let ch = ch.to_ascii_uppercase();
    GRID.iter().enumerate().find_map(|(r, row)| {
        row.iter()
            .position(|&c| c == ch)
            .map(|c| (c as u8 + 1, r as u8 + FIRST_ROW))
    })
}
/// Accumulates spelled text, collapsing back-to-back repeats of one character.
#[derive(Clone, Debug, Default)]
pub struct Debouncer {
    last: Option<char>,
    text: String,
}
impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }
    /// Returns the character if it was appended.
    pub fn push(&mut self, decoded: Decoded) -> Option<char> {
        let ch = decoded.as_char()?;
        if self.last == Some(ch) {
            return None;
        }
        self.last = Some(ch);
        self.text.push(ch);
        Some(ch)
    }
    pub fn text(&self) -> &str {
        &self.text
    }
    pub fn reset(&mut self) {
        self.last = None;
        self.text.clear();
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn flagged(indicators: &[u8]) -> Vec<EventLabel> {
        indicators
            .iter()
            .map(|&indicator| EventLabel { indicator, flag: true })
            .collect()
    }
    #[test]
    fn row_nine_column_three_is_o() {
        let mut labels = flagged(&[9, 3]);
        labels.push(EventLabel { indicator: 1, flag: false });
        assert_eq!(decode(&labels), Decoded::Char('O'));
    }
    #[test]
    fn every_grid_character_round_trips() {
        for row in GRID {
            for ch in row {
                let (c, r) = target_indicators(ch).unwrap();
                assert_eq!(decode(&flagged(&[r, c])), Decoded::Char(ch));
            }
        }
        assert_eq!(target_indicators('?'), None);
        assert_eq!(target_indicators('q'), Some((5, 9)));
    }
    #[test]
    fn missing_axis_is_no_decode() {
        assert_eq!(decode(&flagged(&[2, 2])), Decoded::NoDecode);
        assert_eq!(decode(&flagged(&[11])), Decoded::NoDecode);
        assert_eq!(decode(&[]), Decoded::NoDecode);
    }
    #[test]
    fn majority_then_earliest_wins() {
        assert_eq!(decode(&flagged(&[1, 4, 4, 7])), Decoded::Char('D'));
        assert_eq!(decode(&flagged(&[5, 2, 12, 8])), Decoded::Char('8'));
    }
    #[test]
    fn debouncer_collapses_repeats() {
        let mut d = Debouncer::new();
        assert_eq!(d.push(Decoded::Char('H')), Some('H'));
        assert_eq!(d.push(Decoded::Char('H')), None);
        assert_eq!(d.push(Decoded::NoDecode), None);
        assert_eq!(d.push(Decoded::Char('I')), Some('I'));
        assert_eq!(d.text(), "HI");
        d.reset();
        assert_eq!(d.text(), "");
    }
}
