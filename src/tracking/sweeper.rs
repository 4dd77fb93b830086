//! Recurring sweep task.
//!
//! Runs a callback on its own thread every `interval` until stopped. Stopping
//! is explicit and prompt: the stop signal wakes the thread immediately
//! instead of waiting for the next tick, and `stop` joins it, so no sweep can
//! run after `stop` returns.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{Sender, bounded, select, tick};
use tracing::{info, warn};

pub struct Sweeper {
    /// Dropping the sender wakes the thread.
    stop_sender: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Spawn the sweep thread. The first sweep happens one `interval` after
    /// spawning.
    pub fn spawn<F>(interval: Duration, mut sweep: F) -> Result<Self>
    where
        F: FnMut(Instant) + Send + 'static,
    {
        let (stop_sender, stop_receiver) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("staleness-sweeper".to_string())
            .spawn(move || {
                info!("Sweeper thread started (interval {:?})", interval);
                let ticker = tick(interval);
                loop {
                    select! {
                        recv(stop_receiver) -> _ => break,
                        recv(ticker) -> msg => match msg {
                            Ok(at) => sweep(at),
                            Err(_) => break,
                        },
                    }
                }
                info!("Sweeper thread exiting");
            })
            .context("Failed to spawn sweeper thread")?;

        Ok(Self {
            stop_sender: Some(stop_sender),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.stop_sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Sweeper thread panicked");
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_sweeps_repeatedly_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let mut sweeper = Sweeper::spawn(Duration::from_millis(10), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while count.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        sweeper.stop();
        let after_stop = count.load(Ordering::SeqCst);
        assert!(after_stop >= 3);
        assert!(!sweeper.is_running());

        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_stop_does_not_wait_for_next_tick() {
        let mut sweeper = Sweeper::spawn(Duration::from_secs(3600), |_| {}).unwrap();
        let start = Instant::now();
        sweeper.stop();
        assert!(start.elapsed() < Duration::from_secs(5));
        // Second stop is a no-op.
        sweeper.stop();
    }

    #[test]
    fn test_drop_stops_thread() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let sweeper = Sweeper::spawn(Duration::from_millis(5), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        drop(sweeper);

        let after_drop = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), after_drop);
    }
}
