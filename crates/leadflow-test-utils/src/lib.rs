// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Leadflow integration tests.
//!
//! Provides deterministic adapters and a harness over a temporary SQLite
//! database, so engine scenarios run without wall-clock time or outbound
//! delivery.
//!
//! # Components
//!
//! - [`ManualClock`] - Clock that only advances when told to
//! - [`MockNotifier`] - Qualified-lead sink that captures deliveries
//! - [`TestHarness`] - Engine wired to temp storage and both mocks

pub mod harness;
pub mod manual_clock;
pub mod mock_notifier;

pub use harness::TestHarness;
pub use manual_clock::ManualClock;
pub use mock_notifier::MockNotifier;
