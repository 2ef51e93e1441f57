// SPDX-License-Identifier: GPL-3.0-only
//! Frame delivery worker
//!
//! Runs a device's frame pump on its own thread, separate from both the
//! interaction thread and the session's configuration worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Action returned by the delivery callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Keep delivering
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a frame delivery thread
///
/// The callback is invoked once per frame interval until it returns
/// `LoopAction::Stop` or the controller is stopped or dropped.
pub struct FrameDeliveryWorker {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl FrameDeliveryWorker {
    /// Start delivering at `interval`; a zero interval runs back to back
    pub fn start<F>(name: &str, interval: Duration, mut deliver: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, interval_ms = interval.as_millis() as u64, "Starting frame delivery");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut delivered: u64 = 0;
                loop {
                    if stop.load(Ordering::Acquire) {
                        debug!(name = %thread_name, "Stop signal received");
                        break;
                    }

                    let started = Instant::now();
                    if deliver() == LoopAction::Stop {
                        debug!(name = %thread_name, "Delivery callback requested stop");
                        break;
                    }
                    delivered += 1;

                    // stop() unparks us, so a long interval never delays shutdown
                    let deadline = started + interval;
                    while !stop.load(Ordering::Acquire) {
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        thread::park_timeout(deadline - now);
                    }
                }
                info!(name = %thread_name, delivered, "Frame delivery exiting");
            });

        let thread_handle = match thread_handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(name = %name, error = %e, "Failed to spawn frame delivery thread");
                None
            }
        };

        Self {
            thread_handle,
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            handle.thread().unpark();
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Frame delivery thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for FrameDeliveryWorker {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "FrameDeliveryWorker dropped, stopping loop");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_callback_stop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut worker = FrameDeliveryWorker::start("test-loop", Duration::ZERO, move || {
            if counter_clone.fetch_add(1, Ordering::SeqCst) >= 4 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        });

        while worker.is_running() {
            thread::sleep(Duration::from_millis(1));
        }
        worker.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_stop_interrupts_long_interval() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut worker =
            FrameDeliveryWorker::start("test-slow", Duration::from_secs(60), move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                LoopAction::Continue
            });

        thread::sleep(Duration::from_millis(20));
        let started = Instant::now();
        worker.stop();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!worker.is_running());
    }
}
