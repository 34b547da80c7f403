// src/scheduler/mod.rs
pub mod annotate;
pub mod runner;
pub mod timing;
pub use annotate::annotate;
pub use runner::{
    ResidualDisposition, SequenceOutcome, TrialOutcome, TrialRunner, PRIMARY_STREAM,
};
pub use timing::{window_size, SequencePlan, StimulusSchedule, StimulusTiming};
