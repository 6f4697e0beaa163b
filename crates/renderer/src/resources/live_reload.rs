use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, error, info};

use super::catalog::ResourceId;
use super::device::ShaderDevice;
use super::registry::Resources;

/// Minimum time between two filesystem sweeps.
pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_millis(500);

/// Polls resource files and hot-swaps the ones that changed on disk.
///
/// The poller never mutates a live resource until its replacement has been
/// fully loaded, so a broken edit leaves the previous version in place.
#[derive(Debug)]
pub struct LiveReload {
    interval: Duration,
    last_check: Instant,
    forced: bool,
    stat_failing: [bool; ResourceId::COUNT],
    rejected: [Option<SystemTime>; ResourceId::COUNT],
}

impl LiveReload {
    /// Starts the rate-limit window at `now`, normally right after the
    /// initial load.
    pub fn new(now: Instant) -> Self {
        Self {
            interval: DEFAULT_RELOAD_INTERVAL,
            last_check: now,
            forced: false,
            stat_failing: [false; ResourceId::COUNT],
            rejected: [None; ResourceId::COUNT],
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Restarts the rate-limit window at `now` and forgets failure history.
    pub fn reset(&mut self, now: Instant) {
        self.last_check = now;
        self.forced = false;
        self.stat_failing = [false; ResourceId::COUNT];
        self.rejected = [None; ResourceId::COUNT];
    }

    /// Skips the rate limit on the next [`check`](Self::check).
    pub fn force_next(&mut self) {
        self.forced = true;
    }

    /// Re-stats every loaded resource and reloads the ones whose timestamp
    /// changed.
    ///
    /// Returns the identifiers that were swapped, in catalog order. Callers
    /// rebuild anything derived from those handles before the next draw.
    pub fn check<D: ShaderDevice>(
        &mut self,
        resources: &mut Resources<D>,
        device: &D,
        now: Instant,
    ) -> Vec<ResourceId> {
        let mut changed = Vec::new();
        if !self.forced && now.saturating_duration_since(self.last_check) < self.interval {
            return changed;
        }
        self.forced = false;

        for id in ResourceId::ALL {
            let slot = id.index();
            let Some(resource) = resources.try_get(id) else {
                continue;
            };
            let path = resource.file_path().to_path_buf();
            let stored = resource.last_modified();

            let observed = match resources.store().modified(&path) {
                Ok(observed) => {
                    if std::mem::take(&mut self.stat_failing[slot]) {
                        info!(resource = %id, path = %path.display(), "resource file is readable again");
                    }
                    observed
                }
                Err(err) => {
                    if self.stat_failing[slot] {
                        debug!(resource = %id, error = %err, "resource file still unavailable");
                    } else {
                        error!(
                            resource = %id,
                            path = %path.display(),
                            error = %err,
                            "failed to stat resource file; keeping loaded version"
                        );
                        self.stat_failing[slot] = true;
                    }
                    continue;
                }
            };

            if observed == stored || self.rejected[slot] == Some(observed) {
                continue;
            }

            match resources.reload(id, device) {
                Ok(()) => {
                    self.rejected[slot] = None;
                    info!(resource = %id, path = %path.display(), "live reloaded resource");
                    changed.push(id);
                }
                Err(err) => {
                    // Remember the failing revision so a broken edit is
                    // reported once rather than on every sweep.
                    self.rejected[slot] = Some(observed);
                    error!(
                        resource = %id,
                        error = %err,
                        "failed to live reload resource; keeping previous version"
                    );
                }
            }
        }

        self.last_check = now;
        changed
    }
}
