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

//! # Warehouse Module
//!
//! Loads tables into a declared star schema through a [`TeTableSink`].
//!
//! ## Module Components
//!
//! - **schema**: [`TeTableSchema`] and [`TeStarSchema`]
//! - **sink**: the [`TeTableSink`] interface and the in-memory sink

pub mod schema;
pub mod sink;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::errors::{Result, TeError};
use crate::table::TeTable;

pub use schema::{TeStarSchema, TeTableSchema};
pub use sink::{TeMemoryTableSink, TeTableSink};

/// Dimensional warehouse bound to one schema and one sink.
#[derive(Debug)]
pub struct TeWarehouse {
    schema: TeStarSchema,
    sink: Arc<dyn TeTableSink>,
    created: Mutex<HashSet<String>>,
}

impl TeWarehouse {
    pub fn new(schema: TeStarSchema, sink: Arc<dyn TeTableSink>) -> Self {
        TeWarehouse {
            schema,
            sink,
            created: Mutex::new(HashSet::new()),
        }
    }

    pub fn schema(&self) -> &TeStarSchema {
        &self.schema
    }

    pub fn sink(&self) -> &Arc<dyn TeTableSink> {
        &self.sink
    }

    /// Creates every declared table on the sink.
    pub async fn create_star_schema(&self) -> Result<()> {
        for (name, table) in self.schema.iter() {
            self.sink.create_table(name, table).await?;
            self.mark_created(name);
        }
        log::info!(
            "warehouse.schema: star schema created - tables={}",
            self.schema.len()
        );
        Ok(())
    }

    /// Appends rows to a declared table. Every column of `table` must be a
    /// declared dimension or measure.
    pub async fn load(&self, name: &str, table: &TeTable) -> Result<usize> {
        let schema = self.schema.table(name).ok_or_else(|| {
            TeError::configuration(format!("warehouse table '{name}' is not declared"))
        })?;

        let unknown = schema.unknown_columns(table);
        if !unknown.is_empty() {
            log::warn!(
                "warehouse.load: schema drift rejected - table={}, columns={:?}",
                name,
                unknown
            );
            return Err(TeError::schema_mismatch(name, unknown));
        }

        if !self.is_created(name) {
            self.sink.create_table(name, schema).await?;
            self.mark_created(name);
        }

        let rows = self.sink.load(name, table).await?;
        log::debug!("warehouse.load: rows loaded - table={}, rows={}", name, rows);
        Ok(rows)
    }

    pub async fn query(&self, expr: &str) -> Result<TeTable> {
        self.sink.query(expr).await
    }

    fn is_created(&self, name: &str) -> bool {
        self.created
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(name)
    }

    fn mark_created(&self, name: &str) {
        self.created
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(name.to_string());
    }
}
