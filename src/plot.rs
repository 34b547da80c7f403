// src/plot.rs
use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use crate::acquisition::StreamWindow;
use crate::error::{Result, SpellerError};
use crate::types::FeatureVector;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(10, 10, 10),
            palette: vec![BLUE, RED, GREEN, CYAN, MAGENTA, YELLOW, WHITE],
        }
    }
}
/// Channel traces of one extracted window against its timestamps.
pub fn render_window_png(window: &StreamWindow, style: &PlotStyle) -> Result<Vec<u8>> {
    check_style(style)?;
    if window.is_empty() {
        return Err(SpellerError::Plot("window has no samples".into()));
    }
    let stamps: Vec<f64> = window.timestamps().collect();
    let data = window.channel_major();
    let (t0, t1) = (stamps[0], stamps[stamps.len() - 1].max(stamps[0] + 1e-6));
    let (y_min, y_max) = bounds(data.iter().copied());
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                format!("Window ({} / {} samples)", window.len(), window.requested()),
                ("sans-serif", 20).into_font().color(&WHITE),
            )
            .set_label_area_size(LabelAreaPosition::Left, 45)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(t0..t1, y_min..y_max)?;
        chart
            .configure_mesh()
            .light_line_style(&WHITE.mix(0.1))
            .draw()?;
        for (idx, channel) in data.outer_iter().enumerate() {
            let color = style.palette[idx % style.palette.len()];
            let series = stamps.iter().copied().zip(channel.iter().copied());
            chart
                .draw_series(LineSeries::new(series, &color))?
                .label(format!("Ch {idx}"))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }
        chart
            .configure_series_labels()
            .border_style(&WHITE.mix(0.2))
            .background_style(&style.background)
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
/// Mean target and non-target trace of one channel across feature vectors.
pub fn render_erp_png(
    features: &[FeatureVector],
    channel: usize,
    channel_count: usize,
    style: &PlotStyle,
) -> Result<Vec<u8>> {
    check_style(style)?;
    let Some(first) = features.first() else {
        return Err(SpellerError::Plot("no feature vectors to average".into()));
    };
    if channel_count == 0 || channel >= channel_count || first.len() % channel_count != 0 {
        return Err(SpellerError::Plot(format!(
            "channel {channel} of {channel_count} does not fit a vector of {} values",
            first.len()
        )));
    }
    let per_channel = first.len() / channel_count;
    let target = channel_mean(features.iter().filter(|f| f.flag), channel, per_channel);
    let other = channel_mean(features.iter().filter(|f| !f.flag), channel, per_channel);
    let (y_min, y_max) = bounds(target.iter().chain(other.iter()).flatten().copied());
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                format!("ERP, channel {channel}"),
                ("sans-serif", 20).into_font().color(&WHITE),
            )
            .set_label_area_size(LabelAreaPosition::Left, 45)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(0f64..per_channel as f64, y_min..y_max)?;
        chart
            .configure_mesh()
            .light_line_style(&WHITE.mix(0.1))
            .draw()?;
        let traces = [
            ("target", target, style.palette[1 % style.palette.len()]),
            ("non-target", other, style.palette[0]),
        ];
        for (label, trace, color) in traces {
            let Some(trace) = trace else { continue };
            let series = trace.into_iter().enumerate().map(|(i, v)| (i as f64, v));
            chart
                .draw_series(LineSeries::new(series, &color))?
                .label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }
        chart
            .configure_series_labels()
            .border_style(&WHITE.mix(0.2))
            .background_style(&style.background)
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn check_style(style: &PlotStyle) -> Result<()> {
    if style.palette.is_empty() {
        return Err(SpellerError::Plot("plot style has an empty palette".into()));
    }
    if style.width == 0 || style.height == 0 {
        return Err(SpellerError::Plot(format!(
            "plot size {}x{} has no pixels",
            style.width, style.height
        )));
    }
    Ok(())
}
fn channel_mean<'a>(
    features: impl Iterator<Item = &'a FeatureVector>,
    channel: usize,
    per_channel: usize,
) -> Option<Vec<f64>> {
    let mut sum = vec![0.0; per_channel];
    let mut n = 0usize;
    let range = channel * per_channel..(channel + 1) * per_channel;
    for f in features {
        let Some(values) = f.values.get(range.clone()) else {
            continue;
        };
        for (acc, v) in sum.iter_mut().zip(values) {
            *acc += v;
        }
        n += 1;
    }
    (n > 0).then(|| sum.into_iter().map(|s| s / n as f64).collect())
}
fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() || (hi - lo).abs() < f64::EPSILON {
        (lo.min(0.0) - 1.0, hi.max(0.0) + 1.0)
    } else {
        (lo, hi)
    }
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| SpellerError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
