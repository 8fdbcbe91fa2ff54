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

//! # Configuration Module
//!
//! Pipeline configuration can be built in code with the chained setters or
//! loaded from a YAML or JSON document:
//!
//! ```yaml
//! lake:
//!   raw_root: s3://data-lake/raw/
//!   format: csv
//! batch_concurrency: 8
//! warehouse_tables:
//!   pos: menu_performance
//! registry:
//!   rules:
//!     - { field: price, rule: rule.non_negative }
//!   steps:
//!     - { step: clean.drop_below, config: { column: qty, threshold: 0 } }
//!   features:
//!     - { name: revenue_per_item, transform: feature.ratio,
//!         config: { numerator: revenue, denominator: quantity_sold } }
//! ```
//!
//! Every section is optional; omitted values fall back to the defaults
//! below.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, TeError};
use crate::lake::{TeLakeCompression, TeLakeFormat};
use crate::warehouse::TeStarSchema;

/// Roots and encoding of the three lake zones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeLakeConfig {
    pub raw_root: String,
    pub processed_root: String,
    pub feature_root: String,
    pub format: TeLakeFormat,
    pub compression: TeLakeCompression,
}

impl Default for TeLakeConfig {
    fn default() -> Self {
        Self {
            raw_root: "s3://data-lake/raw/".to_string(),
            processed_root: "s3://data-lake/processed/".to_string(),
            feature_root: "s3://data-lake/features/".to_string(),
            format: TeLakeFormat::Jsonl,
            compression: TeLakeCompression::None,
        }
    }
}

impl TeLakeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw_root(mut self, root: &str) -> Self {
        self.raw_root = root.to_string();
        self
    }

    pub fn processed_root(mut self, root: &str) -> Self {
        self.processed_root = root.to_string();
        self
    }

    pub fn feature_root(mut self, root: &str) -> Self {
        self.feature_root = root.to_string();
        self
    }

    pub fn format(mut self, format: TeLakeFormat) -> Self {
        self.format = format;
        self
    }

    pub fn compression(mut self, compression: TeLakeCompression) -> Self {
        self.compression = compression;
        self
    }
}

/// Registration of a validation rule by factory name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeRuleEntry {
    pub field: String,
    pub rule: String,
    #[serde(default)]
    pub config: Value,
}

/// Registration of a cleaning step by factory name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeStepEntry {
    pub step: String,
    #[serde(default)]
    pub config: Value,
}

/// Registration of a feature transform by factory name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeFeatureEntry {
    pub name: String,
    pub transform: String,
    #[serde(default)]
    pub config: Value,
}

/// Declarative list of rules, steps and transforms, in registration order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeRegistryConfig {
    pub rules: Vec<TeRuleEntry>,
    pub steps: Vec<TeStepEntry>,
    pub features: Vec<TeFeatureEntry>,
}

impl TeRegistryConfig {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.steps.is_empty() && self.features.is_empty()
    }
}

/// Top-level pipeline configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TePipelineConfig {
    pub lake: TeLakeConfig,
    pub warehouse: TeStarSchema,
    /// Maximum number of records a batch runs at once.
    pub batch_concurrency: usize,
    /// Overrides of the warehouse table a source loads into; sources not
    /// listed load into the table named after themselves.
    pub warehouse_tables: BTreeMap<String, String>,
    pub registry: TeRegistryConfig,
}

impl Default for TePipelineConfig {
    fn default() -> Self {
        Self {
            lake: TeLakeConfig::default(),
            warehouse: TeStarSchema::restaurant_default(),
            batch_concurrency: num_cpus::get().max(1),
            warehouse_tables: BTreeMap::new(),
            registry: TeRegistryConfig::default(),
        }
    }
}

impl TePipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lake(mut self, lake: TeLakeConfig) -> Self {
        self.lake = lake;
        self
    }

    pub fn warehouse(mut self, schema: TeStarSchema) -> Self {
        self.warehouse = schema;
        self
    }

    pub fn batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency;
        self
    }

    pub fn warehouse_table(mut self, source: &str, table: &str) -> Self {
        self.warehouse_tables
            .insert(source.to_string(), table.to_string());
        self
    }

    pub fn registry(mut self, registry: TeRegistryConfig) -> Self {
        self.registry = registry;
        self
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()
    }

    /// Loads a `.yaml`, `.yml` or `.json` configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text),
            "json" => Self::from_json_str(&text),
            other => Err(TeError::configuration(format!(
                "unsupported configuration extension '{other}'"
            ))),
        }
    }

    fn validate(self) -> Result<Self> {
        if self.batch_concurrency == 0 {
            return Err(TeError::configuration("batch_concurrency must be at least 1"));
        }
        Ok(self)
    }
}
