// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the storage entities.
//!
//! Each public function runs inside a single `call` on the database thread;
//! functions that touch more than one row group their statements in a
//! transaction.

pub mod events;
pub mod forms;
pub mod journey;
pub mod leads;

use std::fmt::Display;

use tracing::warn;

/// Collect the rows that decode, skipping and logging the ones that do not.
///
/// Each item pairs the row key with its decode result. A failure to step the
/// cursor or read the key still fails the whole read.
pub(crate) fn readable_rows<K: Display, T>(
    table: &'static str,
    rows: impl Iterator<Item = rusqlite::Result<(K, rusqlite::Result<T>)>>,
) -> rusqlite::Result<Vec<T>> {
    let mut records = Vec::new();
    for row in rows {
        let (key, decoded) = row?;
        match decoded {
            Ok(record) => records.push(record),
            Err(error) => warn!(table, key = %key, error = %error, "skipping unreadable row"),
        }
    }
    Ok(records)
}
