use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

/// Snapshot of an in-flight artifact upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadProgress {
    pub transferred_bytes: u64,
    pub total_bytes: u64,
    /// Fraction complete in `0.0..=1.0`.
    pub percent: f64,
    /// Instantaneous throughput.
    pub bytes_per_second: f64,
}

impl UploadProgress {
    pub fn is_complete(&self) -> bool {
        self.percent >= 1.0
    }
}

/// Receives upload progress. Implementations must not block; progress is
/// observational only and never affects the upload outcome.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: UploadProgress);
}

impl<F> ProgressObserver for F
where
    F: Fn(UploadProgress) + Send + Sync,
{
    fn on_progress(&self, progress: UploadProgress) {
        self(progress)
    }
}

/// Observer that discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _progress: UploadProgress) {}
}

/// Forwards progress onto a bounded channel, dropping updates when the
/// receiver lags behind.
pub struct ChannelObserver<T> {
    tx: mpsc::Sender<T>,
    map: Box<dyn Fn(UploadProgress) -> T + Send + Sync>,
}

impl<T: Send> ChannelObserver<T> {
    pub fn new(
        tx: mpsc::Sender<T>,
        map: impl Fn(UploadProgress) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            tx,
            map: Box::new(map),
        }
    }
}

impl<T: Send> ProgressObserver for ChannelObserver<T> {
    fn on_progress(&self, progress: UploadProgress) {
        // Full or closed channel: the update is simply lost.
        let _ = self.tx.try_send((self.map)(progress));
    }
}

/// Turns raw byte counts from an upload transport into [`UploadProgress`]
/// updates for an observer.
pub struct ProgressReporter<'a> {
    observer: &'a dyn ProgressObserver,
    total_bytes: u64,
    transferred: Mutex<u64>,
    speed: SpeedCalculator,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(observer: &'a dyn ProgressObserver, total_bytes: u64) -> Self {
        Self {
            observer,
            total_bytes,
            transferred: Mutex::new(0),
            speed: SpeedCalculator::new(None, None),
        }
    }

    /// Records `bytes` more sent and notifies the observer.
    pub fn advance(&self, bytes: u64) {
        let transferred = {
            let mut t = self.transferred.lock().unwrap();
            *t = (*t + bytes).min(self.total_bytes);
            *t
        };
        self.speed.add_sample(bytes);
        self.observer.on_progress(self.snapshot(transferred));
    }

    /// Reports the upload as complete regardless of counted bytes.
    pub fn finish(&self) {
        let transferred = {
            let mut t = self.transferred.lock().unwrap();
            *t = self.total_bytes;
            *t
        };
        let mut progress = self.snapshot(transferred);
        progress.percent = 1.0;
        self.observer.on_progress(progress);
    }

    fn snapshot(&self, transferred: u64) -> UploadProgress {
        let percent = if self.total_bytes == 0 {
            0.0
        } else {
            transferred as f64 / self.total_bytes as f64
        };
        UploadProgress {
            transferred_bytes: transferred,
            total_bytes: self.total_bytes,
            percent,
            bytes_per_second: self.speed.bytes_per_second(),
        }
    }
}

// ---------------------------------------------------------------------------
// SpeedCalculator
// ---------------------------------------------------------------------------

struct SpeedSample {
    bytes: u64,
    at: Instant,
}

/// Calculates throughput over a sliding window of samples.
pub struct SpeedCalculator {
    inner: Mutex<SpeedWindow>,
}

struct SpeedWindow {
    samples: Vec<SpeedSample>,
    max_samples: usize,
    window: Duration,
}

impl SpeedCalculator {
    /// `window` defaults to 5 s, `max_samples` to 100.
    pub fn new(window: Option<Duration>, max_samples: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(SpeedWindow {
                samples: Vec::new(),
                max_samples: max_samples.unwrap_or(100),
                window: window.unwrap_or(Duration::from_secs(5)),
            }),
        }
    }

    pub fn add_sample(&self, bytes: u64) {
        self.add_sample_at(bytes, Instant::now());
    }

    fn add_sample_at(&self, bytes: u64, at: Instant) {
        let mut w = self.inner.lock().unwrap();
        w.samples.push(SpeedSample { bytes, at });

        if let Some(cutoff) = at.checked_sub(w.window) {
            w.samples.retain(|s| s.at >= cutoff);
        }
        if w.samples.len() > w.max_samples {
            let excess = w.samples.len() - w.max_samples;
            w.samples.drain(..excess);
        }
    }

    /// Average bytes/second within the window; 0.0 with fewer than two
    /// samples. The first sample only marks the start of the interval.
    pub fn bytes_per_second(&self) -> f64 {
        let w = self.inner.lock().unwrap();
        let (Some(first), Some(last)) = (w.samples.first(), w.samples.last()) else {
            return 0.0;
        };
        if w.samples.len() < 2 {
            return 0.0;
        }
        let elapsed = last.at.duration_since(first.at);
        if elapsed.is_zero() {
            return 0.0;
        }
        let total: u64 = w.samples[1..].iter().map(|s| s.bytes).sum();
        total as f64 / elapsed.as_secs_f64()
    }
}
