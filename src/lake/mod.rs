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

//! # Tiered Data Lake Module
//!
//! The lake has three zones, each under its own root:
//!
//! | Zone        | Partition                                              |
//! |-------------|--------------------------------------------------------|
//! | `raw`       | `<raw-root>/<source>/<YYYY>/<MM>/<DD>/<HH>`            |
//! | `processed` | `<processed-root>/<source>_processed/<YYYY>/<MM>/<DD>` |
//! | `feature`   | `<feature-root>/<source>_features/<YYYY>/<MM>/<DD>`    |
//!
//! Writes never touch an existing object. Every write creates a new
//! `part-*` object inside its partition, so a partition only ever grows, and
//! reading a partition back returns every payload committed to it.
//!
//! ## Module Components
//!
//! - **zone**: zone names, partition suffixes and the clock
//! - **sink**: the [`TeObjectSink`] interface and its memory/local backends
//! - **encode**: JSONL/CSV/Parquet encodings and compression

pub mod encode;
pub mod sink;
pub mod zone;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TeLakeConfig;
use crate::errors::{Result, TeError};
use crate::record::TeRecord;
use crate::table::TeTable;

pub use encode::{TeLakeCompression, TeLakeFormat};
pub use sink::{TeLocalObjectSink, TeMemoryObjectSink, TeObjectSink};
pub use zone::{TeClock, TeFixedClock, TeSystemClock, TeZone};

/// Receipt for one durable zone write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeZoneCommit {
    pub zone: TeZone,
    /// Partition directory the object was written into.
    pub partition: String,
    /// Full object key, readable back through the sink.
    pub key: String,
    pub bytes: usize,
    pub rows: usize,
    pub committed_at: DateTime<Utc>,
}

/// Writes records and tables into the raw, processed and feature zones.
#[derive(Debug)]
pub struct TeTieredStore {
    sink: Arc<dyn TeObjectSink>,
    config: TeLakeConfig,
    clock: Arc<dyn TeClock>,
    sequence: AtomicU64,
}

impl TeTieredStore {
    pub fn new(sink: Arc<dyn TeObjectSink>, config: TeLakeConfig) -> Self {
        TeTieredStore {
            sink,
            config,
            clock: Arc::new(TeSystemClock),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn TeClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &TeLakeConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<dyn TeObjectSink> {
        &self.sink
    }

    pub fn root_for_zone(&self, zone: TeZone) -> &str {
        match zone {
            TeZone::Raw => &self.config.raw_root,
            TeZone::Processed => &self.config.processed_root,
            TeZone::Feature => &self.config.feature_root,
        }
    }

    /// Partition directory for a source at a point in time.
    pub fn partition_path(&self, zone: TeZone, source: &str, at: DateTime<Utc>) -> String {
        let root = self.root_for_zone(zone).trim_end_matches('/');
        let dataset = zone.dataset(source);
        let suffix = zone.partition_suffix(at);
        if root.is_empty() {
            format!("{dataset}/{suffix}")
        } else {
            format!("{root}/{dataset}/{suffix}")
        }
    }

    /// Persists the untouched record in the raw zone.
    pub async fn write_raw(&self, record: &TeRecord) -> Result<TeZoneCommit> {
        let payload = record
            .to_raw_json()
            .map_err(|err| TeError::storage(TeZone::Raw, err.to_string()))?;
        self.write(TeZone::Raw, record.source(), payload, 1, "json")
            .await
    }

    /// Persists a cleaned table in the processed zone.
    pub async fn write_processed(&self, table: &TeTable, source: &str) -> Result<TeZoneCommit> {
        self.write_table(TeZone::Processed, table, source).await
    }

    /// Persists a feature-augmented table in the feature zone.
    pub async fn write_features(&self, table: &TeTable, source: &str) -> Result<TeZoneCommit> {
        self.write_table(TeZone::Feature, table, source).await
    }

    async fn write_table(&self, zone: TeZone, table: &TeTable, source: &str) -> Result<TeZoneCommit> {
        let format = self.config.format;
        let payload = encode::encode_table(table, format).map_err(|err| match err {
            err @ TeError::Configuration { .. } => err,
            other => TeError::storage(zone, other.to_string()),
        })?;
        self.write(zone, source, payload, table.num_rows(), format.extension())
            .await
    }

    async fn write(
        &self,
        zone: TeZone,
        source: &str,
        payload: Vec<u8>,
        rows: usize,
        extension: &str,
    ) -> Result<TeZoneCommit> {
        check_source(source)?;

        let compression = self.config.compression;
        let payload = encode::compress(payload, compression).map_err(|err| match err {
            err @ TeError::Configuration { .. } => err,
            other => TeError::storage(zone, other.to_string()),
        })?;

        let now = self.clock.now();
        let partition = self.partition_path(zone, source, now);
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let digest = blake3::hash(&payload).to_hex();
        let key = format!(
            "{partition}/part-{}-{sequence:06}-{}.{extension}{}",
            now.format("%Y%m%dT%H%M%S%.9f"),
            &digest.as_str()[..8],
            compression.suffix()
        );
        let bytes = payload.len();

        self.sink
            .put(&key, payload)
            .await
            .map_err(|err| TeError::storage(zone, err.to_string()))?;

        log::debug!(
            "lake.write: object committed - zone={}, key={}, bytes={}, rows={}",
            zone,
            key,
            bytes,
            rows
        );

        Ok(TeZoneCommit {
            zone,
            partition,
            key,
            bytes,
            rows,
            committed_at: now,
        })
    }

    /// Reads back every payload of a partition, decompressed, in key order.
    pub async fn read_partition(
        &self,
        zone: TeZone,
        source: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<Vec<u8>>> {
        check_source(source)?;
        let partition = self.partition_path(zone, source, at);
        let keys = self
            .sink
            .list(&partition)
            .await
            .map_err(|err| TeError::storage(zone, err.to_string()))?;

        let mut payloads = Vec::with_capacity(keys.len());
        for key in keys {
            let payload = self
                .sink
                .get(&key)
                .await
                .map_err(|err| TeError::storage(zone, err.to_string()))?;
            let payload = encode::decompress(payload, compression_of(&key))
                .map_err(|err| TeError::storage(zone, err.to_string()))?;
            payloads.push(payload);
        }
        Ok(payloads)
    }
}

fn compression_of(key: &str) -> TeLakeCompression {
    if key.ends_with(".gz") {
        TeLakeCompression::Gzip
    } else if key.ends_with(".zst") {
        TeLakeCompression::Zstd
    } else {
        TeLakeCompression::None
    }
}

fn check_source(source: &str) -> Result<()> {
    if source.is_empty() || source.contains('/') || source.contains("..") {
        return Err(TeError::configuration(format!(
            "source '{source}' must be a non-empty name without path separators"
        )));
    }
    Ok(())
}
