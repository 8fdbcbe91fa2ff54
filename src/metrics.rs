//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Tessera.
//! The Tessera project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifetime counters of one pipeline, shared by every concurrent call.
#[derive(Debug, Default)]
pub struct TePipelineMetrics {
    received: AtomicU64,
    raw_writes: AtomicU64,
    quarantined: AtomicU64,
    succeeded: AtomicU64,
    errored: AtomicU64,
    processed_writes: AtomicU64,
    feature_writes: AtomicU64,
    warehouse_rows: AtomicU64,
}

/// Point-in-time copy of [`TePipelineMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeMetricsSnapshot {
    pub received: u64,
    pub raw_writes: u64,
    pub quarantined: u64,
    pub succeeded: u64,
    pub errored: u64,
    pub processed_writes: u64,
    pub feature_writes: u64,
    pub warehouse_rows: u64,
}

impl TePipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_raw_write(&self) {
        self.raw_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_quarantined(&self) {
        self.quarantined.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_errored(&self) {
        self.errored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_processed_write(&self) {
        self.processed_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_feature_write(&self) {
        self.feature_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_warehouse_rows(&self, rows: usize) {
        self.warehouse_rows.fetch_add(rows as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TeMetricsSnapshot {
        TeMetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            raw_writes: self.raw_writes.load(Ordering::Relaxed),
            quarantined: self.quarantined.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            errored: self.errored.load(Ordering::Relaxed),
            processed_writes: self.processed_writes.load(Ordering::Relaxed),
            feature_writes: self.feature_writes.load(Ordering::Relaxed),
            warehouse_rows: self.warehouse_rows.load(Ordering::Relaxed),
        }
    }

    pub fn as_json(&self) -> Value {
        self.snapshot().as_json()
    }
}

impl TeMetricsSnapshot {
    pub fn as_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
