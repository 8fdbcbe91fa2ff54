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

//! Declared dimensional schemas.
//!
//! Warehouse tables are declared up front, never inferred from loaded data.
//! Each table separates dimension columns (descriptive keys) from measure
//! columns (numeric facts).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::table::TeTable;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeTableSchema {
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub measures: Vec<String>,
}

impl TeTableSchema {
    pub fn new(dimensions: &[&str], measures: &[&str]) -> Self {
        TeTableSchema {
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            measures: measures.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Dimensions followed by measures.
    pub fn columns(&self) -> Vec<String> {
        self.dimensions
            .iter()
            .chain(self.measures.iter())
            .cloned()
            .collect()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.dimensions.iter().any(|d| d == column) || self.measures.iter().any(|m| m == column)
    }

    /// Columns of `table` that are neither a dimension nor a measure, in
    /// table order.
    pub fn unknown_columns(&self, table: &TeTable) -> Vec<String> {
        table
            .columns()
            .iter()
            .filter(|column| !self.contains(&column.name))
            .map(|column| column.name.clone())
            .collect()
    }
}

/// Named set of table schemas.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeStarSchema {
    tables: BTreeMap<String, TeTableSchema>,
}

impl TeStarSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// The restaurant analytics schema: customer behaviour, menu performance
    /// and temporal patterns.
    pub fn restaurant_default() -> Self {
        TeStarSchema::new()
            .with_table(
                "customer_behavior",
                TeTableSchema::new(
                    &["customer_id", "time_id", "location_id"],
                    &["purchase_amount", "visit_frequency"],
                ),
            )
            .with_table(
                "menu_performance",
                TeTableSchema::new(
                    &["item_id", "time_id", "category_id"],
                    &["quantity_sold", "revenue", "cost"],
                ),
            )
            .with_table(
                "temporal_patterns",
                TeTableSchema::new(
                    &["time_id", "location_id"],
                    &["traffic", "sales", "performance_metrics"],
                ),
            )
    }

    /// Declares a table, replacing any previous declaration of the same name.
    pub fn with_table(mut self, name: impl Into<String>, schema: TeTableSchema) -> Self {
        self.tables.insert(name.into(), schema);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TeTableSchema> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TeTableSchema)> {
        self.tables.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
