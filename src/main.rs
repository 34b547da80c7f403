// src/main.rs
use std::path::Path;
use std::time::Duration;
use anyhow::{Context, Result};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rowcol_speller::acquisition::{
    select_stream, AcquisitionSource, SharedStreamBuffer, SignalMode, StreamBuffer, SyntheticSource,
};
use rowcol_speller::classifier::LabelPassthrough;
use rowcol_speller::config::SessionConfig;
use rowcol_speller::decoder::{target_indicators, Debouncer};
use rowcol_speller::plot::{render_erp_png, PlotStyle};
use rowcol_speller::recorder::{TrialRecord, TrialRecorder};
use rowcol_speller::scheduler::{
    ResidualDisposition, StimulusSchedule, TrialOutcome, TrialRunner,
};
type Runner = TrialRunner<LabelPassthrough>;
struct AuxiliaryFeed {
    source: SyntheticSource,
    buffer: SharedStreamBuffer,
    window_size: usize,
}
// Simulated stimulus clock: every sequence ends exactly one window of samples later.
fn run_trial(
    runner: &mut Runner,
    source: &mut SyntheticSource,
    auxiliary: &mut [AuxiliaryFeed],
    schedule: &StimulusSchedule,
) -> Result<TrialOutcome> {
    for plan in &schedule.sequences {
        let chunk = source.pull_chunk(runner.window_size(), Duration::ZERO)?;
        runner.buffer().lock().add_chunk(chunk)?;
        for feed in auxiliary.iter_mut() {
            let chunk = feed.source.pull_chunk(feed.window_size, Duration::ZERO)?;
            feed.buffer.lock().add_chunk(chunk)?;
        }
        let outcome = runner.run_sequence(plan)?;
        if outcome.short {
            warn!("sequence {} ran short", outcome.sequence);
        }
    }
    Ok(runner.finish_trial(ResidualDisposition::Persist)?)
}
fn plot_erp(dir: &Path, outcome: &TrialOutcome, channel_count: usize) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let png = render_erp_png(&outcome.features, 0, channel_count, &PlotStyle::default())?;
    let path = dir.join(format!("erp_t{}.png", outcome.trial));
    std::fs::write(&path, png).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
fn main() -> Result<()> {
    env_logger::init();
    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::load(Path::new(&path))
            .with_context(|| format!("loading session config {path}"))?,
        None => SessionConfig::default(),
    };
    config.validate()?;
    let signal = &config.signal;
    let candidate = SyntheticSource::new(
        signal.channel_count,
        signal.sampling_rate,
        signal.mode,
        signal.seed,
    );
    let mut source = select_stream([candidate], &config.stream)
        .context("no acquisition stream matches the configured stream")?;
    let stream = source.info();
    info!(
        "using stream {} ({} ch @ {} Hz)",
        stream.name, stream.channel_count, stream.sampling_rate
    );
    let buffer = StreamBuffer::from_config(stream.channel_count, &config.buffer).into_shared();
    let mut runner = TrialRunner::new(
        buffer,
        config.timing.clone(),
        stream.sampling_rate,
        config.policy,
        LabelPassthrough,
    )?
    .with_compression(config.buffer.compress_archive);
    let mut auxiliary = Vec::with_capacity(config.auxiliary.len());
    for (idx, aux) in config.auxiliary.iter().enumerate() {
        let buffer = StreamBuffer::from_config(aux.channel_count, &config.buffer).into_shared();
        runner = runner.with_auxiliary(aux.name.clone(), buffer.clone(), aux.sampling_rate)?;
        auxiliary.push(AuxiliaryFeed {
            source: SyntheticSource::new(
                aux.channel_count,
                aux.sampling_rate,
                SignalMode::Random,
                signal.seed + idx as u64 + 1,
            ),
            buffer,
            window_size: config.timing.window_size(aux.sampling_rate),
        });
    }
    let mut recorder = TrialRecorder::new();
    if let Some(path) = &config.trial_log {
        recorder.start(path)?;
    }
    let copy: Vec<char> = config.copy_text.chars().collect();
    if copy.is_empty() {
        warn!("no copy_text configured; nothing will be flagged and every trial ends without a decode");
    }
    let trials = config.timing.num_trials.max(copy.len());
    let mut rng = StdRng::seed_from_u64(signal.seed);
    let mut speller = Debouncer::new();
    for trial in 1..=trials {
        let expected = copy.get(trial - 1).copied();
        let targets = match expected.map(|ch| (ch, target_indicators(ch))) {
            Some((_, Some((column, row)))) => vec![column, row],
            Some((ch, None)) => {
                warn!("'{ch}' is not on the speller grid");
                Vec::new()
            }
            None => Vec::new(),
        };
        let schedule = StimulusSchedule::shuffled(
            &config.timing,
            source.next_timestamp(),
            stream.sampling_rate,
            &mut rng,
        );
        runner.begin_trial(trial, &targets)?;
        let outcome = match run_trial(&mut runner, &mut source, &mut auxiliary, &schedule) {
            Ok(outcome) => outcome,
            Err(e) => {
                runner.abort(ResidualDisposition::Persist)?;
                recorder.stop()?;
                return Err(e.context(format!("trial {trial}")));
            }
        };
        speller.push(outcome.decoded);
        recorder.write_record(&TrialRecord::from_outcome(&outcome, expected))?;
        if let Some(dir) = &config.plot_dir {
            if let Err(e) = plot_erp(dir, &outcome, stream.channel_count) {
                warn!("trial {trial}: ERP plot skipped: {e:#}");
            }
        }
    }
    recorder.stop()?;
    println!("spelled: {}", speller.text());
    Ok(())
}
