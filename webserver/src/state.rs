//! Webserver state management

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Process-level state shared by every handler
#[derive(Debug)]
pub struct WebServerState {
    pub bind_address: SocketAddr,
    /// Interval of the background sweeper; zero disables it
    pub sweep_interval: Duration,
    pub is_running: Arc<AtomicBool>,
    pub sweeps_completed: Arc<AtomicU64>,
    pub server_start_time: Instant,
}

impl WebServerState {
    pub fn new(bind_address: SocketAddr, sweep_interval: Duration) -> Self {
        Self {
            bind_address,
            sweep_interval,
            is_running: Arc::new(AtomicBool::new(true)),
            sweeps_completed: Arc::new(AtomicU64::new(0)),
            server_start_time: Instant::now(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    pub fn set_running(&self, running: bool) {
        self.is_running.store(running, Ordering::Relaxed);
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.server_start_time.elapsed().as_secs()
    }

    pub fn sweeper_enabled(&self) -> bool {
        !self.sweep_interval.is_zero()
    }

    pub fn record_sweep(&self) -> u64 {
        self.sweeps_completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get_sweeps_completed(&self) -> u64 {
        self.sweeps_completed.load(Ordering::Relaxed)
    }
}
