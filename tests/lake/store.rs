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

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tessera::config::TeLakeConfig;
use tessera::errors::{Result, TeError};
use tessera::lake::{
    TeFixedClock, TeLakeFormat, TeLocalObjectSink, TeMemoryObjectSink, TeObjectSink, TeTieredStore,
    TeZone,
};
use tessera::record::TeRecord;
use tessera::table::TeTable;

#[derive(Debug)]
struct TeCTUnavailableSink;

#[async_trait::async_trait]
impl TeObjectSink for TeCTUnavailableSink {
    async fn put(&self, _key: &str, _payload: Vec<u8>) -> Result<()> {
        Err(TeError::Io("connection refused".into()))
    }

    async fn get(&self, _key: &str) -> Result<Vec<u8>> {
        Err(TeError::Io("connection refused".into()))
    }

    async fn list(&self, _prefix: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

fn clock() -> Arc<TeFixedClock> {
    Arc::new(TeFixedClock::new(Utc.with_ymd_and_hms(2026, 3, 7, 23, 15, 0).unwrap()))
}

fn table() -> TeTable {
    TeTable::new()
        .with_column("item", vec![json!("tea"), json!("cake")])
        .unwrap()
        .with_column("qty", vec![json!(2), Value::Null])
        .unwrap()
}

#[tokio::test]
async fn TeFTCommitsLandInZonePartitions() {
    let sink = Arc::new(TeMemoryObjectSink::new());
    let store = TeTieredStore::new(sink.clone(), TeLakeConfig::default()).with_clock(clock());
    let record = TeRecord::from_value("pos", json!({"qty": 2})).unwrap();

    let raw = store.write_raw(&record).await.unwrap();
    let processed = store.write_processed(&table(), "pos").await.unwrap();
    let features = store.write_features(&table(), "pos").await.unwrap();

    assert_eq!(raw.partition, "s3://data-lake/raw/pos/2026/03/07/23");
    assert_eq!(processed.partition, "s3://data-lake/processed/pos_processed/2026/03/07");
    assert_eq!(features.partition, "s3://data-lake/features/pos_features/2026/03/07");
    assert!(raw.key.starts_with(&format!("{}/part-20260307T231500", raw.partition)));
    assert!(raw.key.ends_with(".json"));
    assert!(processed.key.ends_with(".jsonl"));
    assert_eq!(processed.rows, 2);
    assert_eq!(sink.len(), 3);
}

#[tokio::test]
async fn TeFTPartitionsFollowTheClock() {
    let sink = Arc::new(TeMemoryObjectSink::new());
    let clock = clock();
    let store = TeTieredStore::new(sink.clone(), TeLakeConfig::default()).with_clock(clock.clone());
    let record = TeRecord::from_value("pos", json!({"qty": 1})).unwrap();

    let before = store.write_raw(&record).await.unwrap();
    clock.advance(Duration::hours(1));
    let after = store.write_raw(&record).await.unwrap();

    assert_eq!(after.partition, "s3://data-lake/raw/pos/2026/03/08/00");
    assert_ne!(before.partition, after.partition);
    let first = store
        .read_partition(TeZone::Raw, "pos", before.committed_at)
        .await
        .unwrap();
    assert_eq!(first.len(), 1);
}

#[tokio::test]
async fn TeFTLocalSinkPersistsCsvReadableByPath() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(TeLocalObjectSink::new(dir.path()));
    let config = TeLakeConfig::default().format(TeLakeFormat::Csv);
    let store = TeTieredStore::new(sink, config).with_clock(clock());

    let commit = store.write_processed(&table(), "pos").await.unwrap();
    assert!(commit.key.ends_with(".csv"));

    let relative = commit.key.trim_start_matches("s3://");
    let on_disk = std::fs::read_to_string(dir.path().join(relative)).unwrap();
    assert_eq!(on_disk, "item,qty\ntea,2\ncake,\n");

    let payloads = store
        .read_partition(TeZone::Processed, "pos", commit.committed_at)
        .await
        .unwrap();
    assert_eq!(payloads, vec![on_disk.into_bytes()]);
}

#[tokio::test]
async fn TeFTSinkFailuresAreStorageErrors() {
    let store = TeTieredStore::new(Arc::new(TeCTUnavailableSink), TeLakeConfig::default());
    let err = store.write_features(&table(), "pos").await.unwrap_err();
    match err {
        TeError::Storage { zone, message } => {
            assert_eq!(zone, TeZone::Feature);
            assert!(message.contains("connection refused"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn TeFTCustomRootsAreHonoured() {
    let sink = Arc::new(TeMemoryObjectSink::new());
    let config = TeLakeConfig::default()
        .raw_root("lake/bronze")
        .processed_root("lake/silver/")
        .feature_root("lake/gold");
    let store = TeTieredStore::new(sink, config).with_clock(clock());
    let at = Utc.with_ymd_and_hms(2026, 3, 7, 5, 0, 0).unwrap();
    assert_eq!(store.partition_path(TeZone::Raw, "inventory", at), "lake/bronze/inventory/2026/03/07/05");
    assert_eq!(
        store.partition_path(TeZone::Processed, "inventory", at),
        "lake/silver/inventory_processed/2026/03/07"
    );
    assert_eq!(
        store.partition_path(TeZone::Feature, "inventory", at),
        "lake/gold/inventory_features/2026/03/07"
    );
}
