use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use log::{error, info};
use crate::acquisition::buffer::SharedStreamBuffer;
use crate::acquisition::source::AcquisitionSource;
use crate::error::{Result, SpellerError};
#[derive(Clone, Copy, Debug)]
pub struct PumpSettings {
    pub max_samples: usize,
    pub pull_timeout: Duration,
    /// Sleep between pulls that returned nothing.
    pub idle: Duration,
}
impl Default for PumpSettings {
    fn default() -> Self {
        Self {
            max_samples: 256,
            pull_timeout: Duration::ZERO,
            idle: Duration::from_millis(2),
        }
    }
}
/// Producer thread feeding a shared [`StreamBuffer`](crate::acquisition::StreamBuffer).
/// Every `add` happens under the buffer lock, so extraction on the control side
/// never observes a half-appended chunk.
pub struct AcquisitionPump {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Result<usize>>,
}
impl AcquisitionPump {
    pub fn spawn<S>(mut source: S, buffer: SharedStreamBuffer, settings: PumpSettings) -> Self
    where
        S: AcquisitionSource + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            let stream = source.info();
            info!(
                "acquisition started on {} ({} ch @ {} Hz)",
                stream.name, stream.channel_count, stream.sampling_rate
            );
            let mut ingested = 0usize;
            while !flag.load(Ordering::Acquire) {
                let chunk = match source.pull_chunk(settings.max_samples, settings.pull_timeout) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        error!("acquisition stopped: {e}");
                        return Err(e);
                    }
                };
                if chunk.is_empty() {
                    thread::sleep(settings.idle);
                    continue;
                }
                ingested += buffer.lock().add_chunk(chunk)?;
            }
            info!("acquisition stopped after {ingested} samples");
            Ok(ingested)
        });
        Self { stop, handle }
    }
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
    /// Signals the thread and waits for it. Returns the number of samples ingested.
    pub fn stop(self) -> Result<usize> {
        self.stop.store(true, Ordering::Release);
        self.handle
            .join()
            .map_err(|_| SpellerError::Source("acquisition thread panicked".into()))?
    }
}
