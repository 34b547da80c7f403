use crate::acquisition::StreamWindow;
use crate::error::Result;
use crate::scheduler::timing::{SequencePlan, StimulusTiming};
use crate::segmentation::EventWindow;
use crate::types::EventLabel;
/// Derives the indicator and flag rows of an extracted window from the
/// sequence plan that was on screen while it was recorded.
///
/// The first flash is anchored at the sample nearest to `plan.start`; every
/// augmentation then occupies `flash` samples followed by `wait` samples.
/// Only flash samples carry an indicator, and their flag is set when the
/// indicator is one of `targets`. Slots that fall outside the window (an
/// underrun cuts the front) are clipped.
pub fn annotate(
    window: &StreamWindow,
    plan: &SequencePlan,
    targets: &[u8],
    timing: &StimulusTiming,
    sampling_rate: f64,
) -> Result<EventWindow> {
    let len = window.len();
    let mut labels = vec![EventLabel::default(); len];
    if let Some(first) = window.timestamps().next() {
        let (flash, wait) = timing.slot_samples(sampling_rate);
        let anchor = ((plan.start - first) * sampling_rate).round() as i64;
        for (k, &indicator) in plan.order.iter().enumerate() {
            let begin = anchor + (k * (flash + wait)) as i64;
            let end = begin + flash as i64;
            let (begin, end) = (clip(begin, len), clip(end, len));
            let flag = targets.contains(&indicator);
            for label in &mut labels[begin..end] {
                *label = EventLabel { indicator, flag };
            }
        }
    }
    EventWindow::from_parts(window.channel_major(), &labels)
}
fn clip(index: i64, len: usize) -> usize {
    index.clamp(0, len as i64) as usize
}
