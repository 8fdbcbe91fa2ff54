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

use proptest::prelude::*;
use serde_json::{json, Value};
use tessera::errors::{Result, TeError};
use tessera::lake::{TeMemoryObjectSink, TeObjectSink};
use tessera::pipeline::{TePipeline, TePipelineBuilder, TeRunStatus};
use tessera::record::TeRecord;
use tessera::runner::{TeBatchRunner, TeStreamRunner};
use tessera::table::TeTable;
use tessera::warehouse::{TeMemoryTableSink, TeTableSchema};
use tokio_util::sync::CancellationToken;

/// Object sink that panics on payloads mentioning `boom`.
#[derive(Debug, Default)]
struct TeCTPanickingSink {
    inner: TeMemoryObjectSink,
}

#[async_trait::async_trait]
impl TeObjectSink for TeCTPanickingSink {
    async fn put(&self, key: &str, payload: Vec<u8>) -> Result<()> {
        if String::from_utf8_lossy(&payload).contains("boom") {
            panic!("sink crashed");
        }
        self.inner.put(key, payload).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.get(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list(prefix).await
    }
}

fn builder(tables: Arc<TeMemoryTableSink>) -> TePipelineBuilder {
    TePipelineBuilder::with_defaults()
        .table_sink(tables)
        .declare_table("pos", TeTableSchema::new(&["id"], &["price", "qty", "unit_price"]))
        .add_validation_fn("price", "price.non_negative", |v: &Value| {
            v.as_f64().map_or(false, |p| p >= 0.0)
        })
        .add_feature_fn("unit_price", |t: &TeTable| -> Result<Vec<Value>> {
            let price = t.column("price").ok_or_else(|| TeError::internal("missing price"))?;
            let qty = t.column("qty").ok_or_else(|| TeError::internal("missing qty"))?;
            price
                .values
                .iter()
                .zip(&qty.values)
                .map(|(p, q)| match (p.as_f64(), q.as_f64()) {
                    (Some(p), Some(q)) if q > 0.0 => Ok(json!(p / q)),
                    _ => Err(TeError::internal(format!("malformed quantity {q}"))),
                })
                .collect()
        })
}

fn pipeline() -> (Arc<TePipeline>, Arc<TeMemoryTableSink>) {
    let tables = Arc::new(TeMemoryTableSink::new());
    (Arc::new(builder(tables.clone()).build().unwrap()), tables)
}

fn batch(rows: &[(i64, Value)]) -> Vec<TeRecord> {
    rows.iter()
        .enumerate()
        .map(|(id, (price, qty))| {
            TeRecord::from_value("upload", json!({"id": id, "price": price, "qty": qty})).unwrap()
        })
        .collect()
}

#[tokio::test]
async fn TeFTBatchCountsQuarantinedAsFailed() {
    let (pipeline, tables) = pipeline();
    let records = batch(&[
        (10, json!(2)),
        (-1, json!(1)),
        (4, json!(4)),
        (-7, json!(1)),
        (9, json!(3)),
    ]);

    let report = TeBatchRunner::new(pipeline.clone())
        .with_concurrency(2)
        .process_batch(records, "pos")
        .await;

    assert_eq!(report.processed, 5);
    assert_eq!(report.successful, 3);
    assert_eq!(report.failed, 2);
    assert_eq!(report.quarantined, 2);
    assert_eq!(report.errored, 0);
    assert_eq!(pipeline.quarantine().len(), 2);
    assert_eq!(tables.row_count("pos"), 3);
}

#[tokio::test]
async fn TeFTOneFailingRecordDoesNotAbortTheBatch() {
    let (pipeline, tables) = pipeline();
    let mut rows: Vec<(i64, Value)> = (1..=10).map(|i| (i * 10, json!(2))).collect();
    rows[6].1 = json!("two");

    let report = TeBatchRunner::new(pipeline)
        .with_concurrency(4)
        .process_batch(batch(&rows), "pos")
        .await;

    assert_eq!(report.processed, 10);
    assert_eq!(report.successful, 9);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errored, 1);
    let failed = &report.outcomes[6];
    assert_eq!(failed.index, 6);
    assert_eq!(failed.status, TeRunStatus::Error);
    assert!(matches!(failed.error, Some(TeError::Feature { .. })));
    assert_eq!(tables.row_count("pos"), 9);
}

#[tokio::test]
async fn TeFTPanickingTaskIsIsolated() {
    let tables = Arc::new(TeMemoryTableSink::new());
    let pipeline = Arc::new(
        builder(tables.clone())
            .object_sink(Arc::new(TeCTPanickingSink::default()))
            .build()
            .unwrap(),
    );
    let mut records = batch(&[(1, json!(1)), (2, json!(1)), (3, json!(1))]);
    records[1] = TeRecord::from_value("upload", json!({"id": "boom", "price": 2, "qty": 1})).unwrap();

    let report = TeBatchRunner::new(pipeline.clone())
        .with_concurrency(3)
        .process_batch(records, "pos")
        .await;

    assert_eq!(report.processed, 3);
    assert_eq!(report.successful, 2);
    assert_eq!(report.errored, 1);
    assert!(matches!(report.outcomes[1].error, Some(TeError::Internal(_))));
    assert_eq!(pipeline.metrics().snapshot().errored, 1);
}

#[tokio::test]
async fn TeFTCancellationStopsLaunchingButFinishesInFlight() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let tables = Arc::new(TeMemoryTableSink::new());
    let pipeline = Arc::new(
        builder(tables.clone())
            .add_cleaning_fn("stop_after_third", move |t: TeTable| {
                if t.column("id").map_or(false, |c| c.values == vec![json!(2)]) {
                    trigger.cancel();
                }
                Ok(t)
            })
            .build()
            .unwrap(),
    );

    let records = batch(&[(1, json!(1)), (2, json!(1)), (3, json!(1)), (4, json!(1)), (5, json!(1))]);
    let report = TeBatchRunner::new(pipeline)
        .with_concurrency(1)
        .with_cancellation(token)
        .process_batch(records, "pos")
        .await;

    assert_eq!(report.processed, 3);
    assert_eq!(report.successful, 3);
    assert_eq!(report.cancelled, 2);
    assert_eq!(tables.row_count("pos"), 3);
}

#[tokio::test]
async fn TeFTStreamRunnerMatchesSingleProcess() {
    let (pipeline, _) = pipeline();
    let runner = TeStreamRunner::new(pipeline);

    let ok = TeRecord::from_value("device-7", json!({"price": 12, "qty": 4})).unwrap();
    let result = runner.process_event(&ok, "pos").await.unwrap();
    assert_eq!(result.status, TeRunStatus::Success);
    assert_eq!(result.features_created, vec!["unit_price"]);

    let bad = TeRecord::from_value("device-7", json!({"price": -12, "qty": 4})).unwrap();
    let result = runner.process_event(&bad, "pos").await.unwrap();
    assert_eq!(result.status, TeRunStatus::Quarantined);

    let broken = TeRecord::from_value("device-7", json!({"price": 12, "qty": 0})).unwrap();
    assert!(runner.process_event(&broken, "pos").await.is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn TeFTBatchCountsAreConserved(
        prices in prop::collection::vec(-20i64..20, 0..24),
        concurrency in 1usize..6,
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let report = runtime.block_on(async {
            let (pipeline, _) = pipeline();
            let rows: Vec<(i64, Value)> = prices.iter().map(|p| (*p, json!(1))).collect();
            TeBatchRunner::new(pipeline)
                .with_concurrency(concurrency)
                .process_batch(batch(&rows), "pos")
                .await
        });

        let invalid = prices.iter().filter(|p| **p < 0).count();
        prop_assert_eq!(report.processed, prices.len());
        prop_assert_eq!(report.successful, prices.len() - invalid);
        prop_assert_eq!(report.failed, invalid);
        prop_assert_eq!(report.successful + report.failed, report.processed);
        prop_assert_eq!(report.outcomes.len(), prices.len());
        for (index, outcome) in report.outcomes.iter().enumerate() {
            prop_assert_eq!(outcome.index, index);
        }
    }
}
