// src/acquisition/mod.rs
pub mod artifact;
pub mod buffer;
pub mod pump;
pub mod source;
pub use artifact::{read_archive, read_artifact, ArtifactStore, WindowArtifact, WrittenArtifact};
pub use buffer::{SharedStreamBuffer, StreamBuffer, StreamWindow};
pub use pump::{AcquisitionPump, PumpSettings};
pub use source::{
    select_stream, AcquisitionSource, ManualSource, SampleChunk, SignalMode, StreamInfo,
    SyntheticSource,
};
