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
use proptest::prelude::*;
use serde_json::{json, Value};
use tessera::config::TePipelineConfig;
use tessera::errors::{Result, TeError};
use tessera::lake::{TeFixedClock, TeMemoryObjectSink, TeZone};
use tessera::pipeline::{TePipeline, TePipelineBuilder, TeRunStatus};
use tessera::record::TeRecord;
use tessera::table::TeTable;
use tessera::validate::TeQuarantine;
use tessera::warehouse::{TeMemoryTableSink, TeTableSchema};

struct TeCTHarness {
    pipeline: TePipeline,
    objects: Arc<TeMemoryObjectSink>,
    tables: Arc<TeMemoryTableSink>,
    clock: Arc<TeFixedClock>,
}

impl TeCTHarness {
    fn new(builder: TePipelineBuilder) -> Self {
        let objects = Arc::new(TeMemoryObjectSink::new());
        let tables = Arc::new(TeMemoryTableSink::new());
        let clock = Arc::new(TeFixedClock::new(Utc.with_ymd_and_hms(2026, 3, 7, 9, 0, 0).unwrap()));
        let pipeline = builder
            .object_sink(objects.clone())
            .table_sink(tables.clone())
            .clock(clock.clone())
            .declare_table("pos", TeTableSchema::new(&["store"], &["price", "qty", "qty_doubled"]))
            .build()
            .unwrap();
        TeCTHarness {
            pipeline,
            objects,
            tables,
            clock,
        }
    }

    fn writes(&self, zone: TeZone) -> usize {
        self.objects
            .count_under(self.pipeline.store().root_for_zone(zone))
    }
}

fn non_negative(value: &Value) -> bool {
    value.as_f64().map_or(false, |v| v >= 0.0)
}

fn scenario_b() -> TePipelineBuilder {
    TePipelineBuilder::with_defaults()
        .add_validation_fn("price", "price.non_negative", non_negative)
        .add_cleaning_fn("drop_non_positive_qty", |t: TeTable| {
            Ok(t.filter_rows(|row| row.get("qty").and_then(Value::as_f64).map_or(true, |q| q > 0.0)))
        })
        .add_feature_fn("qty_doubled", |t: &TeTable| {
            let qty = t
                .column("qty")
                .ok_or_else(|| TeError::internal("missing qty"))?;
            Ok(qty
                .as_f64()
                .map(|q| q.map_or(Value::Null, |q| json!(q * 2.0)))
                .collect())
        })
}

fn record(value: Value) -> TeRecord {
    TeRecord::from_value("pos", value).unwrap()
}

#[tokio::test]
async fn TeFTInvalidRecordIsQuarantinedAfterRawWrite() {
    let harness = TeCTHarness::new(scenario_b());
    let result = harness.pipeline.process(&record(json!({"price": -5}))).await.unwrap();

    assert_eq!(result.status, TeRunStatus::Quarantined);
    assert!(!result.validation.is_valid());
    assert!(result.validation.quarantined());
    assert_eq!(result.validation.invalid_fields(), ["price"]);
    assert!(result.features_created.is_empty());

    assert_eq!(harness.writes(TeZone::Raw), 1);
    assert_eq!(harness.writes(TeZone::Processed), 0);
    assert_eq!(harness.writes(TeZone::Feature), 0);
    assert_eq!(harness.tables.total_rows(), 0);

    let quarantined = harness.pipeline.quarantine().snapshot();
    assert_eq!(quarantined.len(), 1);
    assert_eq!(quarantined[0].record.get("price"), Some(&json!(-5)));
}

#[tokio::test]
async fn TeFTValidRecordReachesEveryZoneAndWarehouse() {
    let harness = TeCTHarness::new(scenario_b());
    let result = harness.pipeline.process(&record(json!({"qty": 10}))).await.unwrap();

    assert_eq!(result.status, TeRunStatus::Success);
    assert!(result.validation.is_valid());
    assert_eq!(result.features_created, vec!["qty_doubled"]);
    let zones: Vec<TeZone> = result.commits.iter().map(|c| c.zone).collect();
    assert_eq!(zones, vec![TeZone::Raw, TeZone::Processed, TeZone::Feature]);

    assert_eq!(harness.writes(TeZone::Raw), 1);
    assert_eq!(harness.writes(TeZone::Processed), 1);
    assert_eq!(harness.writes(TeZone::Feature), 1);

    let rows = harness.tables.rows("pos");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["qty"], json!(10));
    assert_eq!(rows[0]["qty_doubled"], json!(20.0));
    assert_eq!(result.warehouse_table.as_deref(), Some("pos"));
    assert_eq!(result.warehouse_rows, 1);
}

#[tokio::test]
async fn TeFTProcessedZoneHoldsCleanedColumnsOnly() {
    let harness = TeCTHarness::new(scenario_b());
    let result = harness.pipeline.process(&record(json!({"qty": 3}))).await.unwrap();

    let processed = harness
        .pipeline
        .store()
        .read_partition(TeZone::Processed, "pos", result.commits[1].committed_at)
        .await
        .unwrap();
    let features = harness
        .pipeline
        .store()
        .read_partition(TeZone::Feature, "pos", result.commits[2].committed_at)
        .await
        .unwrap();
    assert_eq!(processed, vec![b"{\"qty\":3}\n".to_vec()]);
    assert_eq!(features, vec![b"{\"qty\":3,\"qty_doubled\":6.0}\n".to_vec()]);
}

#[tokio::test]
async fn TeFTFailuresAfterValidationAreErrorsNotQuarantine() {
    let harness = TeCTHarness::new(
        TePipelineBuilder::new().add_feature_fn("explode", |_t: &TeTable| -> Result<Vec<Value>> {
            Err(TeError::internal("malformed input"))
        }),
    );
    let err = harness.pipeline.process(&record(json!({"qty": 1}))).await.unwrap_err();

    assert!(matches!(err, TeError::Feature { .. }));
    assert!(harness.pipeline.quarantine().is_empty());
    assert_eq!(harness.writes(TeZone::Raw), 1);
    assert_eq!(harness.writes(TeZone::Processed), 0);

    let metrics = harness.pipeline.metrics().snapshot();
    assert_eq!(metrics.errored, 1);
    assert_eq!(metrics.quarantined, 0);
}

#[tokio::test]
async fn TeFTSchemaDriftSurfacesAfterZoneWrites() {
    let harness = TeCTHarness::new(
        TePipelineBuilder::new().add_validation_fn("qty", "qty.non_negative", non_negative),
    );
    let err = harness
        .pipeline
        .process(&record(json!({"qty": 1, "colour": "red"})))
        .await
        .unwrap_err();

    assert_eq!(err, TeError::schema_mismatch("pos", vec!["colour".into()]));
    assert_eq!(harness.writes(TeZone::Feature), 1);
    assert_eq!(harness.tables.total_rows(), 0);
}

#[tokio::test]
async fn TeFTUnconfiguredPipelineFailsFast() {
    let harness = TeCTHarness::new(TePipelineBuilder::new());
    let err = harness.pipeline.process(&record(json!({"qty": 1}))).await.unwrap_err();
    assert_eq!(err.kind(), "configuration");
    assert!(harness.objects.is_empty());
}

#[tokio::test]
async fn TeFTUndeclaredWarehouseTableIsConfigurationError() {
    let harness = TeCTHarness::new(
        TePipelineBuilder::new().add_validation_fn("qty", "qty.non_negative", non_negative),
    );
    let inventory = TeRecord::from_value("inventory", json!({"qty": 1})).unwrap();
    let err = harness.pipeline.process(&inventory).await.unwrap_err();
    assert!(matches!(err, TeError::Configuration { .. }));
}

#[tokio::test]
async fn TeFTRepeatedRunsAreStructurallyIdentical() {
    let harness = TeCTHarness::new(scenario_b());
    let input = record(json!({"qty": 4, "price": 2.5}));

    let first = harness.pipeline.process(&input).await.unwrap();
    harness.clock.advance(Duration::days(1));
    let second = harness.pipeline.process(&input).await.unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(first.validation, second.validation);
    assert_eq!(first.features_created, second.features_created);
    assert_ne!(first.commits[0].partition, second.commits[0].partition);
    assert_eq!(harness.tables.row_count("pos"), 2);
}

#[tokio::test]
async fn TeFTSharedQuarantineCollectsFromPipeline() {
    let quarantine = Arc::new(TeQuarantine::new());
    let harness = TeCTHarness::new(scenario_b().quarantine(Arc::clone(&quarantine)));
    harness.pipeline.process(&record(json!({"price": -1}))).await.unwrap();
    harness.pipeline.process(&record(json!({"price": -2}))).await.unwrap();
    assert_eq!(quarantine.len(), 2);
}

#[tokio::test]
async fn TeFTPipelineFromYamlConfig() {
    let config = TePipelineConfig::from_yaml_str(
        r#"
lake:
  format: csv
warehouse_tables:
  pos: menu_performance
registry:
  rules:
    - { field: quantity_sold, rule: rule.non_negative }
  steps:
    - { step: clean.trim_strings }
    - { step: clean.drop_below, config: { column: quantity_sold, threshold: 0 } }
  features:
    - name: revenue
      transform: feature.scale
      config: { column: quantity_sold, factor: 4.5 }
"#,
    )
    .unwrap();

    let tables = Arc::new(TeMemoryTableSink::new());
    let pipeline = TePipelineBuilder::from_config(&config)
        .unwrap()
        .table_sink(tables.clone())
        .build()
        .unwrap();

    let result = pipeline
        .process(&record(json!({"item_id": "  latte ", "quantity_sold": 2})))
        .await
        .unwrap();
    assert_eq!(result.status, TeRunStatus::Success);
    assert_eq!(result.warehouse_table.as_deref(), Some("menu_performance"));
    assert!(result.commits[1].key.ends_with(".csv"));

    let rows = tables.rows("menu_performance");
    assert_eq!(rows[0]["item_id"], json!("latte"));
    assert_eq!(rows[0]["revenue"], json!(9.0));
}

#[tokio::test]
async fn TeFTCleaningThatEmptiesTheTableStillSucceeds() {
    let harness = TeCTHarness::new(scenario_b());
    let result = harness.pipeline.process(&record(json!({"qty": 0}))).await.unwrap();
    assert_eq!(result.status, TeRunStatus::Success);
    assert_eq!(result.warehouse_rows, 0);
    assert_eq!(harness.writes(TeZone::Processed), 1);
    assert_eq!(harness.writes(TeZone::Feature), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn TeFTZoneWriteCountsMatchOutcomes(prices in prop::collection::vec(-50i64..50, 1..12)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let harness = TeCTHarness::new(scenario_b());
            let mut successes = 0;
            for price in &prices {
                let result = harness
                    .pipeline
                    .process(&record(json!({"price": price, "qty": 1})))
                    .await
                    .unwrap();
                if result.status == TeRunStatus::Success {
                    successes += 1;
                }
            }

            assert_eq!(harness.writes(TeZone::Raw), prices.len());
            assert_eq!(harness.writes(TeZone::Processed), successes);
            assert_eq!(harness.writes(TeZone::Feature), successes);
            assert_eq!(harness.tables.row_count("pos"), successes);
            assert_eq!(successes, prices.iter().filter(|p| **p >= 0).count());

            let metrics = harness.pipeline.metrics().snapshot();
            assert_eq!(metrics.raw_writes as usize, prices.len());
            assert_eq!(metrics.succeeded as usize, successes);
        });
    }
}
