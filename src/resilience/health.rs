//! Stale-if-error health indicator.
//!
//! A single-value cache for the always-on "is the system healthy" probe. A
//! fresh value is served from memory; once it expires one caller re-probes
//! the backend under a short timeout. When that probe fails or finds no
//! data, the last observed value keeps being served and the expiry is
//! re-armed with a short grace window, so the indicator answers quickly
//! while the backend is degraded. It only reports `Unknown` when no probe
//! has ever succeeded.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::deadline_after;
use crate::config::HealthProbeConfig;

// == Health Status ==
/// Answer of the health indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// No probe has succeeded yet
    Unknown,
    /// Last observed status; `true` means green
    Known(bool),
}

impl HealthStatus {
    /// `Some(true)` for green, `Some(false)` for red, `None` when unknown.
    pub fn is_green(self) -> Option<bool> {
        match self {
            HealthStatus::Unknown => None,
            HealthStatus::Known(green) => Some(green),
        }
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    last_known: Option<bool>,
    expires_at: Option<Instant>,
}

impl ProbeState {
    fn status(&self) -> HealthStatus {
        self.last_known
            .map(HealthStatus::Known)
            .unwrap_or(HealthStatus::Unknown)
    }

    fn fresh_status(&self, now: Instant) -> Option<HealthStatus> {
        match self.expires_at {
            Some(expires_at) if now < expires_at => Some(self.status()),
            _ => None,
        }
    }
}

// == Health Status Cache ==
#[derive(Debug)]
pub struct HealthStatusCache {
    state: Mutex<ProbeState>,
    /// Serializes probes so an expired value triggers one backend call
    probe_lock: tokio::sync::Mutex<()>,
    ttl: Duration,
    grace_period: Duration,
    probe_timeout: Duration,
}

impl HealthStatusCache {
    pub fn new(config: &HealthProbeConfig) -> Self {
        Self {
            state: Mutex::new(ProbeState::default()),
            probe_lock: tokio::sync::Mutex::new(()),
            ttl: config.ttl,
            grace_period: config.grace_period,
            probe_timeout: config.probe_timeout,
        }
    }

    /// Returns the current status, probing the backend if it has expired.
    ///
    /// `probe` yields `Ok(Some(green))` on success and `Ok(None)` when the
    /// backend has no data. It is cut off after the probe timeout. This
    /// never fails: errors degrade to the last known value or `Unknown`.
    pub async fn get<F, Fut, E>(&self, probe: F) -> HealthStatus
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<bool>, E>>,
        E: fmt::Display,
    {
        self.get_or_derive(probe, || None).await
    }

    /// Like [`HealthStatusCache::get`], but a failed probe first asks
    /// `derive` for a status computed from data already at hand. A derived
    /// status counts as a successful probe.
    pub async fn get_or_derive<F, Fut, E, D>(&self, probe: F, derive: D) -> HealthStatus
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<bool>, E>>,
        E: fmt::Display,
        D: FnOnce() -> Option<bool>,
    {
        let fresh = self.state.lock().fresh_status(Instant::now());
        if let Some(status) = fresh {
            return status;
        }

        let _probing = self.probe_lock.lock().await;
        // Another caller may have refreshed the value while we queued.
        let fresh = self.state.lock().fresh_status(Instant::now());
        if let Some(status) = fresh {
            return status;
        }

        let failure = match tokio::time::timeout(self.probe_timeout, probe()).await {
            Ok(Ok(Some(green))) => return self.observe(green),
            Ok(Ok(None)) => "no data".to_string(),
            Ok(Err(err)) => err.to_string(),
            Err(_) => format!("probe timed out after {}ms", self.probe_timeout.as_millis()),
        };

        if let Some(green) = derive() {
            debug!(green, reason = %failure, "health probe failed, status derived from cached data");
            return self.observe(green);
        }

        let mut state = self.state.lock();
        state.expires_at = Some(deadline_after(Instant::now(), self.grace_period.min(self.ttl)));
        let status = state.status();
        match status {
            HealthStatus::Known(green) => {
                warn!(green, reason = %failure, "health probe failed, serving last known status")
            }
            HealthStatus::Unknown => {
                warn!(reason = %failure, "health probe failed with no prior status")
            }
        }
        status
    }

    fn observe(&self, green: bool) -> HealthStatus {
        let mut state = self.state.lock();
        if state.last_known != Some(green) {
            debug!(green, "health status changed");
        }
        state.last_known = Some(green);
        state.expires_at = Some(deadline_after(Instant::now(), self.ttl));
        HealthStatus::Known(green)
    }

    /// Last observed status without probing, regardless of freshness.
    pub fn last_known(&self) -> HealthStatus {
        self.state.lock().status()
    }
}
