use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, Sender, TryRecvError};

/// Work performed on every scheduler tick.
pub trait TickWorker: Send + 'static {
    fn tick(&mut self);
}

struct Running<W> {
    stop_tx: Sender<()>,
    handle: JoinHandle<W>,
}

/// Runs a [`TickWorker`] once immediately and then every `interval` on a
/// dedicated thread.
///
/// Ticks never overlap. When a tick overruns the interval the missed ticks
/// are dropped, not queued. The worker is handed back by [`stop`] so its
/// state survives a stop/start cycle.
///
/// [`stop`]: DetectionLoop::stop
pub struct DetectionLoop<W: TickWorker> {
    running: Option<Running<W>>,
}

impl<W: TickWorker> DetectionLoop<W> {
    pub fn new() -> Self {
        Self { running: None }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Starts ticking. If the loop is already running the worker is
    /// returned unused.
    pub fn start(&mut self, interval: Duration, worker: W) -> Result<(), W> {
        if self.running.is_some() {
            return Err(worker);
        }
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let handle = thread::spawn(move || {
            let mut worker = worker;
            worker.tick();

            // `tick` channels hold at most one pending tick, so ticks that
            // fall due while the worker is busy collapse into one.
            let ticker = crossbeam_channel::tick(interval);
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        // Stop wins over a tick that became ready at the same time.
                        if !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
                            break;
                        }
                        worker.tick();
                    }
                }
            }
            worker
        });
        self.running = Some(Running { stop_tx, handle });
        log::debug!("Detection loop started ({interval:?} interval)");
        Ok(())
    }

    /// Stops ticking and waits for an in-progress tick to finish. Returns
    /// the worker, or `None` if the loop was not running.
    ///
    /// Once this returns no further tick runs.
    pub fn stop(&mut self) -> Option<W> {
        let Running { stop_tx, handle } = self.running.take()?;
        let _ = stop_tx.send(());
        drop(stop_tx);
        match handle.join() {
            Ok(worker) => {
                log::debug!("Detection loop stopped");
                Some(worker)
            }
            Err(_) => {
                log::error!("Detection loop thread panicked");
                None
            }
        }
    }
}

impl<W: TickWorker> Default for DetectionLoop<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: TickWorker> Drop for DetectionLoop<W> {
    fn drop(&mut self) {
        self.stop();
    }
}
