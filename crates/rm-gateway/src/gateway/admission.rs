//! Sliding-window admission control.
//!
//! Every upstream request passes through [`AdmissionQueue::admit`] first.
//! The queue remembers when each admitted request started; once
//! `max_requests` of them fall inside the trailing `window`, further callers
//! poll until the oldest entry ages out.
//!
//! A background sweep drops stale timestamps on a fixed period. The poll loop
//! prunes as well, so admission stays correct even if the sweep lags or has
//! been shut down.

use crate::domain::config::RateLimitConfig;
use crate::domain::error::{GatewayError, GatewayResult};
use crate::gateway::metrics::GatewayMetrics;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

enum Sweep {
    Idle,
    Running(JoinHandle<()>),
    Stopped,
}

/// Shared sliding-window admission queue
pub struct AdmissionQueue {
    config: RateLimitConfig,
    /// Start times of admitted requests, oldest first
    window: Arc<Mutex<VecDeque<Instant>>>,
    sweep: Mutex<Sweep>,
    metrics: Arc<GatewayMetrics>,
}

impl AdmissionQueue {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_metrics(config, Arc::new(GatewayMetrics::new()))
    }

    pub fn with_metrics(config: RateLimitConfig, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            config,
            window: Arc::new(Mutex::new(VecDeque::new())),
            sweep: Mutex::new(Sweep::Idle),
            metrics,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Wait until the request fits in the window, then count it.
    ///
    /// Never fails unless `max_wait` is configured and expires, in which case
    /// a `RateLimit` error without an upstream status is returned.
    pub async fn admit(&self) -> GatewayResult<()> {
        self.ensure_sweep();

        let started = Instant::now();
        let mut waiting = false;

        loop {
            let now = Instant::now();
            {
                let mut window = self.window.lock();
                prune(&mut window, now, self.config.window);
                if window.len() < self.config.max_requests {
                    window.push_back(now);
                    drop(window);
                    if waiting {
                        let waited = now.duration_since(started);
                        self.metrics.record_admission_wait(waited);
                        debug!(waited_ms = waited.as_millis() as u64, "Admission granted after wait");
                    }
                    return Ok(());
                }
            }

            if let Some(max_wait) = self.config.max_wait {
                if now.duration_since(started) >= max_wait {
                    warn!(
                        max_wait_ms = max_wait.as_millis() as u64,
                        max_requests = self.config.max_requests,
                        "Admission wait exceeded"
                    );
                    return Err(GatewayError::admission_timeout(max_wait));
                }
            }

            if !waiting {
                waiting = true;
                debug!(
                    max_requests = self.config.max_requests,
                    window_ms = self.config.window.as_millis() as u64,
                    "Admission quota exhausted, waiting"
                );
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Requests counted against the current window
    pub fn in_window(&self) -> usize {
        let mut window = self.window.lock();
        prune(&mut window, Instant::now(), self.config.window);
        window.len()
    }

    /// Timestamps currently held, including stale ones not yet swept
    pub fn tracked(&self) -> usize {
        self.window.lock().len()
    }

    pub fn is_sweeping(&self) -> bool {
        matches!(*self.sweep.lock(), Sweep::Running(_))
    }

    /// Stop the background sweep. Safe to call more than once.
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.sweep.lock(), Sweep::Stopped);
        if let Sweep::Running(handle) = previous {
            handle.abort();
            info!("Admission sweep stopped");
        }
    }

    fn ensure_sweep(&self) {
        let mut sweep = self.sweep.lock();
        if !matches!(*sweep, Sweep::Idle) {
            return;
        }

        let window = Arc::clone(&self.window);
        let period = self.config.sweep_interval;
        let span = self.config.window;
        let handle = tokio::spawn(sweep_task(window, period, span));
        *sweep = Sweep::Running(handle);
        info!(
            sweep_interval_ms = period.as_millis() as u64,
            "Admission sweep started"
        );
    }
}

impl Drop for AdmissionQueue {
    fn drop(&mut self) {
        if let Sweep::Running(handle) = &*self.sweep.lock() {
            handle.abort();
        }
    }
}

async fn sweep_task(window: Arc<Mutex<VecDeque<Instant>>>, period: Duration, span: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let mut window = window.lock();
        let before = window.len();
        prune(&mut window, Instant::now(), span);
        let removed = before - window.len();
        if removed > 0 {
            trace!(removed, remaining = window.len(), "Swept admission window");
        }
    }
}

/// Drop entries that are no longer newer than `now - span`
fn prune(window: &mut VecDeque<Instant>, now: Instant, span: Duration) {
    while let Some(oldest) = window.front() {
        if now.duration_since(*oldest) >= span {
            window.pop_front();
        } else {
            break;
        }
    }
}
