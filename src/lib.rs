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

//! # Tessera Core Library
//!
//! Tessera ingests business events (point-of-sale, inventory, feedback,
//! external signals) and turns them into validated, cleaned and
//! feature-augmented records stored in a three-zone data lake and loaded
//! into a dimensional warehouse.
//!
//! ## Module Overview
//!
//! - **record**: [`TeRecord`], the tagged input event
//! - **table**: [`TeTable`], the column-oriented value passed between stages
//! - **validate**: rule sets and the quarantine
//! - **clean**: cleaning chains and built-in steps
//! - **features**: feature transform sets and built-in transforms
//! - **lake**: the tiered raw/processed/feature store and object sinks
//! - **warehouse**: star schema, table sinks and loading
//! - **pipeline**: the per-record orchestrator and its builder
//! - **runner**: batch and stream runners
//! - **config**: YAML/JSON configuration
//! - **metrics**: pipeline counters
//!
//! ## Feature Flags
//!
//! - `parquet`: Parquet encoding for the processed and feature zones
//! - `compression`: gzip and zstd compression of lake objects
//! - `full`: Enables all features
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use serde_json::json;
//! use tessera::{TePipelineBuilder, TeRecord, TeStreamRunner, TeTableSchema};
//!
//! let pipeline = TePipelineBuilder::with_defaults()
//!     .declare_table("pos", TeTableSchema::new(&["store"], &["qty", "qty_doubled"]))
//!     .build_from_config(&json!({
//!         "rules": [{"field": "qty", "rule": "rule.non_negative"}],
//!         "features": [{"name": "qty_doubled", "transform": "feature.scale",
//!                       "config": {"column": "qty", "factor": 2}}]
//!     }))?;
//!
//! let runner = TeStreamRunner::new(Arc::new(pipeline));
//! let record = TeRecord::from_value("pos", json!({"store": "s1", "qty": 10}))?;
//! let result = runner.process_event(&record, "pos").await?;
//! assert_eq!(result.features_created, vec!["qty_doubled"]);
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return `Result<T, TeError>`. Validation failures
//! are not errors: they are reported through [`TeValidationResult`] and
//! quarantine the record.

pub mod errors;
pub mod record;
pub mod table;
pub mod validate;
pub mod clean;
pub mod features;
pub mod lake;
pub mod warehouse;
pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod runner;

pub use errors::{Result, TeError};
pub use record::{TeFields, TeRecord, TeRecordBatch};
pub use table::{TeColumn, TeTable};
pub use validate::{TeQuarantine, TeQuarantinedRecord, TeRule, TeRuleFn, TeRuleSet, TeValidationResult};
pub use clean::{TeCleaningChain, TeCleaningFn, TeCleaningStep};
pub use features::{TeFeatureFn, TeFeatureSet, TeFeatureTransform};
pub use lake::{
    TeClock, TeFixedClock, TeLakeCompression, TeLakeFormat, TeLocalObjectSink,
    TeMemoryObjectSink, TeObjectSink, TeSystemClock, TeTieredStore, TeZone, TeZoneCommit,
};
pub use warehouse::{TeMemoryTableSink, TeStarSchema, TeTableSchema, TeTableSink, TeWarehouse};
pub use config::{TeFeatureEntry, TeLakeConfig, TePipelineConfig, TeRegistryConfig, TeRuleEntry, TeStepEntry};
pub use metrics::{TeMetricsSnapshot, TePipelineMetrics};
pub use pipeline::{TePipeline, TePipelineBuilder, TeRunResult, TeRunStatus};
pub use runner::{TeBatchReport, TeBatchRunner, TeRecordOutcome, TeStreamRunner};
