// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic allocator and uptime sampling for `leadflow serve`.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const SAMPLE_EVERY: Duration = Duration::from_secs(15);

/// Allocator figures at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorStats {
    pub allocated: u64,
    pub resident: u64,
}

impl AllocatorStats {
    /// Read jemalloc's counters, refreshing its cached epoch first.
    #[cfg(not(target_env = "msvc"))]
    pub fn read() -> Option<Self> {
        tikv_jemalloc_ctl::epoch::advance().ok()?;
        Some(Self {
            allocated: tikv_jemalloc_ctl::stats::allocated::read().ok()? as u64,
            resident: tikv_jemalloc_ctl::stats::resident::read().ok()? as u64,
        })
    }

    #[cfg(target_env = "msvc")]
    pub fn read() -> Option<Self> {
        None
    }

    pub fn over(&self, warn_mb: u64) -> bool {
        self.allocated > warn_mb.saturating_mul(1024 * 1024)
    }
}

/// Sample allocator stats until `cancel` fires.
///
/// Logs on each transition into or out of the warning zone rather than on
/// every tick.
pub async fn run(warn_mb: u64, cancel: CancellationToken) {
    let started = Instant::now();
    let mut ticker = tokio::time::interval(SAMPLE_EVERY);
    let mut was_over = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(stats) = AllocatorStats::read() else {
                    continue;
                };
                let over = stats.over(warn_mb);
                if over && !was_over {
                    warn!(
                        allocated_mb = stats.allocated / (1024 * 1024),
                        warn_mb,
                        "heap above warning threshold"
                    );
                } else if !over && was_over {
                    debug!(warn_mb, "heap back under warning threshold");
                }
                was_over = over;
                publish(stats, started.elapsed(), over);
            }
            _ = cancel.cancelled() => break,
        }
    }
    debug!("process sampler stopped");
}

#[cfg(feature = "prometheus")]
fn publish(stats: AllocatorStats, uptime: Duration, over: bool) {
    leadflow_prometheus::record_process(&leadflow_prometheus::ProcessGauges {
        heap_bytes: stats.allocated,
        resident_bytes: stats.resident,
        uptime_secs: uptime.as_secs_f64(),
        under_pressure: over,
    });
}

#[cfg(not(feature = "prometheus"))]
fn publish(_stats: AllocatorStats, _uptime: Duration, _over: bool) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_in_mebibytes() {
        let stats = AllocatorStats {
            allocated: 3 * 1024 * 1024,
            resident: 0,
        };
        assert!(stats.over(2));
        assert!(!stats.over(3));
        assert!(!stats.over(u64::MAX));
    }

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_reports_live_allocations() {
        let buf = std::hint::black_box(vec![1u8; 1 << 20]);
        let stats = AllocatorStats::read().unwrap();
        assert!(stats.allocated >= 1 << 20);
        assert!(stats.resident > 0);
        drop(buf);
    }

    #[tokio::test]
    async fn sampler_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(1, cancel.clone()));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("sampler should exit after cancel")
            .unwrap();
    }
}
