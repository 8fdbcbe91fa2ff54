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

//! # Pipeline Module
//!
//! [`TePipeline::process`] moves one record through a fixed sequence of
//! states:
//!
//! ```text
//! Received -> RawPersisted -> Validated -+-> Quarantined
//!                                        |
//!                                        +-> Cleaned -> FeatureEngineered
//!                                            -> ProcessedPersisted -> FeaturePersisted
//!                                            -> WarehouseLoaded
//! ```
//!
//! The raw write always precedes validation, so invalid records keep an
//! audit trail. A quarantined record is never cleaned, never written to the
//! processed or feature zones and never loaded. Any failure after
//! validation is returned as an error and is never reported as a quarantine.
//!
//! Pipelines are assembled with [`TePipelineBuilder`], either in code or from
//! a configuration document through the builder's factory registry, and are
//! immutable once built.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clean::steps::{self, TeCleaningFactory};
use crate::clean::{TeCleaningChain, TeCleaningStep};
use crate::config::{TeLakeConfig, TePipelineConfig, TeRegistryConfig};
use crate::errors::{Result, TeError};
use crate::features::transforms::{self, TeFeatureFactory};
use crate::features::{TeFeatureSet, TeFeatureTransform};
use crate::lake::{TeClock, TeMemoryObjectSink, TeObjectSink, TeTieredStore, TeZoneCommit};
use crate::metrics::TePipelineMetrics;
use crate::record::TeRecord;
use crate::table::TeTable;
use crate::validate::rules::{self, TeRuleFactory};
use crate::validate::{TeQuarantine, TeRule, TeRuleFn, TeRuleSet, TeValidationResult};
use crate::warehouse::{TeMemoryTableSink, TeStarSchema, TeTableSchema, TeTableSink, TeWarehouse};

/// Terminal status of one record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeRunStatus {
    Success,
    Quarantined,
    /// A cleaning, feature, storage or schema failure. Only produced by the
    /// runners, which turn an `Err` from [`TePipeline::process`] into an
    /// outcome.
    Error,
}

/// Result of processing one record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeRunResult {
    pub status: TeRunStatus,
    pub validation: TeValidationResult,
    /// Feature columns added by this run, in registration order.
    pub features_created: Vec<String>,
    /// Lake writes in the order they were committed.
    pub commits: Vec<TeZoneCommit>,
    pub warehouse_table: Option<String>,
    pub warehouse_rows: usize,
}

impl TeRunResult {
    pub fn is_success(&self) -> bool {
        self.status == TeRunStatus::Success
    }
}

/// Validation, cleaning, feature engineering, lake and warehouse stages for
/// every source.
#[derive(Debug)]
pub struct TePipeline {
    rules: TeRuleSet,
    chain: TeCleaningChain,
    features: TeFeatureSet,
    store: TeTieredStore,
    warehouse: TeWarehouse,
    warehouse_tables: BTreeMap<String, String>,
    metrics: TePipelineMetrics,
    batch_concurrency: usize,
}

impl TePipeline {
    pub fn builder() -> TePipelineBuilder {
        TePipelineBuilder::with_defaults()
    }

    /// Fails unless at least one rule, step or transform is registered.
    pub fn validate(&self) -> Result<()> {
        if self.rules.is_empty() && self.chain.is_empty() && self.features.is_empty() {
            return Err(TeError::configuration(
                "no validation rules, cleaning steps or feature transforms registered",
            ));
        }
        Ok(())
    }

    /// Runs one record through every stage.
    ///
    /// Validation failures are an `Ok` result with status
    /// [`TeRunStatus::Quarantined`]; every other failure is an `Err`.
    pub async fn process(&self, record: &TeRecord) -> Result<TeRunResult> {
        self.metrics.record_received();
        match self.run(record).await {
            Ok(result) => Ok(result),
            Err(err) => {
                self.metrics.record_errored();
                log::error!(
                    "pipeline.error: record failed - source={}, kind={}, error={}",
                    record.source(),
                    err.kind(),
                    err
                );
                Err(err)
            }
        }
    }

    async fn run(&self, record: &TeRecord) -> Result<TeRunResult> {
        self.validate()?;
        let source = record.source();
        log::debug!(
            "pipeline.received: record received - source={}, fields={}",
            source,
            record.fields().len()
        );

        let raw = self.store.write_raw(record).await?;
        self.metrics.record_raw_write();
        log::debug!("pipeline.raw_persisted: raw record written - source={}, key={}", source, raw.key);
        let mut commits = vec![raw];

        let validation = self.rules.validate(record);
        if !validation.is_valid() {
            self.metrics.record_quarantined();
            log::info!(
                "pipeline.quarantined: record quarantined - source={}, invalid_fields={:?}",
                source,
                validation.invalid_fields()
            );
            return Ok(TeRunResult {
                status: TeRunStatus::Quarantined,
                validation,
                features_created: Vec::new(),
                commits,
                warehouse_table: None,
                warehouse_rows: 0,
            });
        }
        log::debug!("pipeline.validated: record valid - source={}", source);

        let cleaned = self.chain.clean(TeTable::from_record(record))?;
        log::debug!("pipeline.cleaned: record cleaned - source={}, rows={}", source, cleaned.num_rows());

        let (featured, features_created) = self.features.apply(cleaned.clone())?;
        log::debug!(
            "pipeline.feature_engineered: features computed - source={}, features={:?}",
            source,
            features_created
        );

        commits.push(self.store.write_processed(&cleaned, source).await?);
        self.metrics.record_processed_write();
        commits.push(self.store.write_features(&featured, source).await?);
        self.metrics.record_feature_write();

        let table = self.warehouse_table(source).to_string();
        let rows = self.warehouse.load(&table, &featured).await?;
        self.metrics.record_warehouse_rows(rows);
        self.metrics.record_succeeded();
        log::info!(
            "pipeline.warehouse_loaded: record loaded - source={}, table={}, rows={}",
            source,
            table,
            rows
        );

        Ok(TeRunResult {
            status: TeRunStatus::Success,
            validation,
            features_created,
            commits,
            warehouse_table: Some(table),
            warehouse_rows: rows,
        })
    }

    /// Warehouse table that records of `source` are loaded into.
    pub fn warehouse_table<'a>(&'a self, source: &'a str) -> &'a str {
        self.warehouse_tables
            .get(source)
            .map_or(source, String::as_str)
    }

    pub fn quarantine(&self) -> &Arc<TeQuarantine> {
        self.rules.quarantine()
    }

    pub fn metrics(&self) -> &TePipelineMetrics {
        &self.metrics
    }

    pub fn store(&self) -> &TeTieredStore {
        &self.store
    }

    pub fn warehouse(&self) -> &TeWarehouse {
        &self.warehouse
    }

    pub fn rule_set(&self) -> &TeRuleSet {
        &self.rules
    }

    pub fn cleaning_chain(&self) -> &TeCleaningChain {
        &self.chain
    }

    pub fn feature_set(&self) -> &TeFeatureSet {
        &self.features
    }

    /// Default number of records a batch runs at once.
    pub fn batch_concurrency(&self) -> usize {
        self.batch_concurrency
    }
}

/// Builder that registers stages and knows how to instantiate them from
/// configuration.
pub struct TePipelineBuilder {
    rules: Vec<(String, Box<dyn TeRule>)>,
    chain: TeCleaningChain,
    features: TeFeatureSet,
    quarantine: Option<Arc<TeQuarantine>>,
    lake: TeLakeConfig,
    object_sink: Option<Arc<dyn TeObjectSink>>,
    clock: Option<Arc<dyn TeClock>>,
    schema: TeStarSchema,
    table_sink: Option<Arc<dyn TeTableSink>>,
    warehouse_tables: BTreeMap<String, String>,
    batch_concurrency: usize,
    rule_factories: HashMap<String, TeRuleFactory>,
    step_factories: HashMap<String, TeCleaningFactory>,
    feature_factories: HashMap<String, TeFeatureFactory>,
}

impl Default for TePipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TePipelineBuilder {
    /// Creates a builder with no registered factories, in-memory sinks and
    /// the restaurant star schema.
    pub fn new() -> Self {
        let config = TePipelineConfig::default();
        TePipelineBuilder {
            rules: Vec::new(),
            chain: TeCleaningChain::new(),
            features: TeFeatureSet::new(),
            quarantine: None,
            lake: config.lake,
            object_sink: None,
            clock: None,
            schema: config.warehouse,
            table_sink: None,
            warehouse_tables: config.warehouse_tables,
            batch_concurrency: config.batch_concurrency,
            rule_factories: HashMap::new(),
            step_factories: HashMap::new(),
            feature_factories: HashMap::new(),
        }
    }

    /// Creates a builder pre-loaded with the bundled rule, step and
    /// transform factories.
    pub fn with_defaults() -> Self {
        let mut builder = Self::new();
        builder.register_defaults();
        builder
    }

    /// Creates a builder from a full pipeline configuration, including its
    /// registry section.
    pub fn from_config(config: &TePipelineConfig) -> Result<Self> {
        let mut builder = Self::with_defaults()
            .lake(config.lake.clone())
            .star_schema(config.warehouse.clone())
            .batch_concurrency(config.batch_concurrency);
        for (source, table) in &config.warehouse_tables {
            builder = builder.warehouse_table_for(source, table);
        }
        builder.register_from_config(&config.registry)
    }

    pub fn register_rule(&mut self, name: impl Into<String>, factory: TeRuleFactory) {
        self.rule_factories.insert(name.into(), factory);
    }

    pub fn register_step(&mut self, name: impl Into<String>, factory: TeCleaningFactory) {
        self.step_factories.insert(name.into(), factory);
    }

    pub fn register_feature(&mut self, name: impl Into<String>, factory: TeFeatureFactory) {
        self.feature_factories.insert(name.into(), factory);
    }

    fn register_defaults(&mut self) {
        self.register_rule("rule.not_null", rules::rule_not_null_factory as TeRuleFactory);
        self.register_rule("rule.non_negative", rules::rule_non_negative_factory as TeRuleFactory);
        self.register_rule("rule.range", rules::rule_range_factory as TeRuleFactory);
        self.register_rule("rule.regex", rules::rule_regex_factory as TeRuleFactory);
        self.register_rule("rule.one_of", rules::rule_one_of_factory as TeRuleFactory);
        self.register_rule("rule.type", rules::rule_type_factory as TeRuleFactory);

        self.register_step("clean.trim_strings", steps::clean_trim_strings_factory as TeCleaningFactory);
        self.register_step("clean.fill_null", steps::clean_fill_null_factory as TeCleaningFactory);
        self.register_step("clean.drop_below", steps::clean_drop_below_factory as TeCleaningFactory);
        self.register_step("clean.drop_columns", steps::clean_drop_columns_factory as TeCleaningFactory);
        self.register_step("clean.dedup_rows", steps::clean_dedup_rows_factory as TeCleaningFactory);

        self.register_feature("feature.scale", transforms::feature_scale_factory as TeFeatureFactory);
        self.register_feature("feature.ratio", transforms::feature_ratio_factory as TeFeatureFactory);
        self.register_feature("feature.sum", transforms::feature_sum_factory as TeFeatureFactory);
        self.register_feature(
            "feature.hour_of_day",
            transforms::feature_hour_of_day_factory as TeFeatureFactory,
        );
    }

    pub fn add_validation_rule(mut self, field: impl Into<String>, rule: Box<dyn TeRule>) -> Self {
        self.rules.push((field.into(), rule));
        self
    }

    /// Registers a closure predicate for `field`.
    pub fn add_validation_fn<F>(self, field: impl Into<String>, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.add_validation_rule(field, Box::new(TeRuleFn::new(name, predicate)))
    }

    pub fn add_cleaning_step(mut self, step: Box<dyn TeCleaningStep>) -> Self {
        self.chain.add_step(step);
        self
    }

    pub fn add_cleaning_fn<F>(mut self, name: impl Into<String>, step: F) -> Self
    where
        F: Fn(TeTable) -> Result<TeTable> + Send + Sync + 'static,
    {
        self.chain.add_step_fn(name, step);
        self
    }

    pub fn add_feature_transform(
        mut self,
        name: impl Into<String>,
        transform: Box<dyn TeFeatureTransform>,
    ) -> Self {
        self.features.add_transform(name, transform);
        self
    }

    pub fn add_feature_fn<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&TeTable) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        self.features.add_transform_fn(name, compute);
        self
    }

    /// Shares an existing quarantine instead of creating a fresh one.
    pub fn quarantine(mut self, quarantine: Arc<TeQuarantine>) -> Self {
        self.quarantine = Some(quarantine);
        self
    }

    pub fn lake(mut self, lake: TeLakeConfig) -> Self {
        self.lake = lake;
        self
    }

    pub fn object_sink(mut self, sink: Arc<dyn TeObjectSink>) -> Self {
        self.object_sink = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn TeClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn star_schema(mut self, schema: TeStarSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Declares one more warehouse table.
    pub fn declare_table(mut self, name: impl Into<String>, schema: TeTableSchema) -> Self {
        self.schema = self.schema.with_table(name, schema);
        self
    }

    pub fn table_sink(mut self, sink: Arc<dyn TeTableSink>) -> Self {
        self.table_sink = Some(sink);
        self
    }

    /// Loads records of `source` into `table` instead of the table named
    /// after the source.
    pub fn warehouse_table_for(mut self, source: impl Into<String>, table: impl Into<String>) -> Self {
        self.warehouse_tables.insert(source.into(), table.into());
        self
    }

    pub fn batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency;
        self
    }

    /// Instantiates every registration of a typed registry, in order.
    pub fn register_from_config(mut self, registry: &TeRegistryConfig) -> Result<Self> {
        for (index, entry) in registry.rules.iter().enumerate() {
            let factory = self.rule_factories.get(&entry.rule).ok_or_else(|| {
                TeError::configuration(format!("rules #{index}: unknown rule '{}'", entry.rule))
            })?;
            let rule = factory(&entry.config)?;
            self.rules.push((entry.field.clone(), rule));
        }

        for (index, entry) in registry.steps.iter().enumerate() {
            let factory = self.step_factories.get(&entry.step).ok_or_else(|| {
                TeError::configuration(format!("steps #{index}: unknown step '{}'", entry.step))
            })?;
            let step = factory(&entry.config)?;
            self.chain.add_step(step);
        }

        for (index, entry) in registry.features.iter().enumerate() {
            let factory = self.feature_factories.get(&entry.transform).ok_or_else(|| {
                TeError::configuration(format!(
                    "features #{index}: unknown transform '{}'",
                    entry.transform
                ))
            })?;
            let transform = factory(&entry.config)?;
            self.features.add_transform(entry.name.clone(), transform);
        }

        Ok(self)
    }

    /// Builds a pipeline from a `{rules, steps, features}` document.
    pub fn build_from_config(self, config: &Value) -> Result<TePipeline> {
        let registry: TeRegistryConfig = serde_json::from_value(config.clone())
            .map_err(|err| TeError::configuration(format!("invalid pipeline registry: {err}")))?;
        self.register_from_config(&registry)?.build()
    }

    pub fn build(self) -> Result<TePipeline> {
        if self.batch_concurrency == 0 {
            return Err(TeError::configuration("batch_concurrency must be at least 1"));
        }
        for (source, table) in &self.warehouse_tables {
            if self.schema.table(table).is_none() {
                return Err(TeError::configuration(format!(
                    "source '{source}' maps to undeclared warehouse table '{table}'"
                )));
            }
        }

        let quarantine = self.quarantine.unwrap_or_default();
        let mut rules = TeRuleSet::with_quarantine(quarantine);
        for (field, rule) in self.rules {
            rules.add_rule(field, rule);
        }

        let object_sink = self
            .object_sink
            .unwrap_or_else(|| Arc::new(TeMemoryObjectSink::new()));
        let mut store = TeTieredStore::new(object_sink, self.lake);
        if let Some(clock) = self.clock {
            store = store.with_clock(clock);
        }

        let table_sink = self
            .table_sink
            .unwrap_or_else(|| Arc::new(TeMemoryTableSink::new()));
        let warehouse = TeWarehouse::new(self.schema, table_sink);

        log::info!(
            "pipeline.build: pipeline assembled - rules={}, steps={}, features={}",
            rules.rule_count(),
            self.chain.len(),
            self.features.len()
        );

        Ok(TePipeline {
            rules,
            chain: self.chain,
            features: self.features,
            store,
            warehouse,
            warehouse_tables: self.warehouse_tables,
            metrics: TePipelineMetrics::new(),
            batch_concurrency: self.batch_concurrency,
        })
    }
}
