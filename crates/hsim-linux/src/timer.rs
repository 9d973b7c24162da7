use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error};

use hsim_core::{SimError, SimResult};
use hsim_hal::HalTimer;

/// Resolution of the simulated kernel tick.
pub const TICKS_PER_SECOND: u64 = 1000;

/// Microseconds to kernel ticks, rounded up.
pub fn us_to_ticks(us: u64) -> u64 {
    us.saturating_mul(TICKS_PER_SECOND).saturating_add(999_999) / 1_000_000
}

fn ticks_to_duration(ticks: u64) -> Duration {
    Duration::from_micros(ticks.saturating_mul(1_000_000 / TICKS_PER_SECOND))
}

type Callback = Box<dyn FnMut() + Send + 'static>;

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Thread-backed timer. One-shot timers fire once per `start`; auto-reload
/// timers fire every period until stopped.
pub struct HostTimer {
    period: Duration,
    auto_reload: bool,
    callback: Arc<Mutex<Callback>>,
    worker: Option<Worker>,
}

impl HostTimer {
    /// `period_us` is rounded up to whole ticks, minimum one tick.
    pub fn new<F>(period_us: u64, auto_reload: bool, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let ticks = us_to_ticks(period_us).max(1);
        Self {
            period: ticks_to_duration(ticks),
            auto_reload,
            callback: Arc::new(Mutex::new(Box::new(callback))),
            worker: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().map_or(false, |w| !w.handle.is_finished())
    }
}

impl HalTimer for HostTimer {
    fn start(&mut self) -> SimResult<()> {
        if self.is_running() {
            return Err(SimError::InvalidState);
        }
        // A fired one-shot leaves a finished worker behind.
        self.stop();

        let (tx, rx) = mpsc::channel::<()>();
        let callback = Arc::clone(&self.callback);
        let period = self.period;
        let auto_reload = self.auto_reload;

        let handle = thread::Builder::new()
            .name("hsim-timer".into())
            .spawn(move || loop {
                match rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => {
                        match callback.lock() {
                            Ok(mut cb) => (*cb)(),
                            Err(_) => break,
                        }
                        if !auto_reload {
                            break;
                        }
                    }
                    // Stop requested, or the timer was dropped.
                    _ => break,
                }
            })
            .map_err(|e| {
                error!("could not spawn timer thread: {}", e);
                SimError::InvalidState
            })?;

        debug!("timer started: period {:?}, auto_reload {}", period, auto_reload);
        self.worker = Some(Worker { stop: tx, handle });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop.send(());
            if worker.handle.join().is_err() {
                error!("timer callback panicked");
            }
        }
    }
}

impl Drop for HostTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
