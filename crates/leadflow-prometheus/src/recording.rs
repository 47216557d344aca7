// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-level gauges sampled by the daemon.
//!
//! Domain metrics (leads, answers, tiers, journeys) are described by
//! `leadflow_engine::recording`; this module only covers the process itself.

use metrics::{describe_gauge, gauge};

/// Describe the process gauges. Called once after the recorder is installed.
pub fn register_metrics() {
    describe_gauge!(
        "leadflow_memory_heap_bytes",
        "Bytes allocated by the application heap"
    );
    describe_gauge!(
        "leadflow_memory_resident_bytes",
        "Bytes in physically resident allocator pages"
    );
    describe_gauge!(
        "leadflow_memory_pressure",
        "1 when heap usage is above telemetry.memory_warn_mb"
    );
    describe_gauge!("leadflow_uptime_seconds", "Seconds since `serve` started");
}

/// One reading of the process gauges.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessGauges {
    pub heap_bytes: u64,
    pub resident_bytes: u64,
    pub uptime_secs: f64,
    pub under_pressure: bool,
}

/// Publish a reading. Gauges keep the last value until the next call.
pub fn record_process(reading: &ProcessGauges) {
    gauge!("leadflow_memory_heap_bytes").set(reading.heap_bytes as f64);
    gauge!("leadflow_memory_resident_bytes").set(reading.resident_bytes as f64);
    gauge!("leadflow_memory_pressure").set(if reading.under_pressure { 1.0 } else { 0.0 });
    gauge!("leadflow_uptime_seconds").set(reading.uptime_secs);
}
