//! Network-idle detection: a page has settled once no request has been in
//! flight for the whole settle window.

use horseman_core::{HorsemanError, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{sleep, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct NetworkActivity {
    inflight: HashSet<String>,
    /// Ids whose completion arrived before their start.
    settled_early: HashSet<String>,
    last_change: Instant,
}

impl Default for NetworkActivity {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkActivity {
    pub fn new() -> Self {
        Self {
            inflight: HashSet::new(),
            settled_early: HashSet::new(),
            last_change: Instant::now(),
        }
    }

    /// Mark a request in flight, unless its completion was already seen.
    pub fn request_started(&mut self, request_id: impl Into<String>) {
        let request_id = request_id.into();
        if !self.settled_early.remove(&request_id) {
            self.inflight.insert(request_id);
        }
        self.last_change = Instant::now();
    }

    /// Mark a request finished or failed. An id not yet started is remembered
    /// so its late start does not count as in flight.
    pub fn request_settled(&mut self, request_id: &str) {
        if self.inflight.remove(request_id) {
            self.last_change = Instant::now();
        } else {
            self.settled_early.insert(request_id.to_string());
        }
    }

    /// Restart the idle clock, e.g. when a navigation begins.
    pub fn touch(&mut self) {
        self.last_change = Instant::now();
    }

    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    /// How long the network has been idle, or `None` while requests are in flight.
    pub fn idle_for(&self) -> Option<Duration> {
        self.inflight
            .is_empty()
            .then(|| self.last_change.elapsed())
    }
}

pub type SharedActivity = Arc<Mutex<NetworkActivity>>;

pub fn lock_activity(activity: &SharedActivity) -> MutexGuard<'_, NetworkActivity> {
    activity.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub async fn wait_for_quiescence(activity: &SharedActivity, settle: Duration, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let idle = lock_activity(activity).idle_for();
        if matches!(idle, Some(elapsed) if elapsed >= settle) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(HorsemanError::Timeout(timeout.as_millis() as u64));
        }
        sleep(POLL_INTERVAL).await;
    }
}
