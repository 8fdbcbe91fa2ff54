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

//! # Table Sinks
//!
//! [`TeTableSink`] is the narrow interface the warehouse loads through.
//! [`TeMemoryTableSink`] keeps rows in process and answers a small
//! `SELECT <cols|*> FROM <table> [LIMIT <n>]` read path.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::errors::{Result, TeError};
use crate::record::TeFields;
use crate::table::{TeColumn, TeTable};
use crate::warehouse::schema::TeTableSchema;

#[async_trait]
pub trait TeTableSink: fmt::Debug + Send + Sync {
    /// Creates a table if it does not exist. Re-creating a table with the
    /// same schema is a no-op; a different schema is an error.
    async fn create_table(&self, name: &str, schema: &TeTableSchema) -> Result<()>;

    /// Appends every row of `table`, returning the number of rows loaded.
    async fn load(&self, name: &str, table: &TeTable) -> Result<usize>;

    /// Runs a read query.
    async fn query(&self, expr: &str) -> Result<TeTable>;
}

#[derive(Debug)]
struct TeStoredTable {
    schema: TeTableSchema,
    rows: Vec<TeFields>,
}

#[derive(Debug, Default)]
pub struct TeMemoryTableSink {
    tables: Mutex<BTreeMap<String, TeStoredTable>>,
}

impl TeMemoryTableSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, BTreeMap<String, TeStoredTable>> {
        self.tables.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables().keys().cloned().collect()
    }

    pub fn row_count(&self, name: &str) -> usize {
        self.tables().get(name).map_or(0, |t| t.rows.len())
    }

    pub fn total_rows(&self) -> usize {
        self.tables().values().map(|t| t.rows.len()).sum()
    }

    /// Stored rows of a table; every declared column is present.
    pub fn rows(&self, name: &str) -> Vec<TeFields> {
        self.tables()
            .get(name)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TeTableSink for TeMemoryTableSink {
    async fn create_table(&self, name: &str, schema: &TeTableSchema) -> Result<()> {
        let mut tables = self.tables();
        match tables.get(name) {
            Some(existing) if existing.schema == *schema => Ok(()),
            Some(_) => Err(TeError::configuration(format!(
                "table '{name}' already exists with a different schema"
            ))),
            None => {
                tables.insert(
                    name.to_string(),
                    TeStoredTable {
                        schema: schema.clone(),
                        rows: Vec::new(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn load(&self, name: &str, table: &TeTable) -> Result<usize> {
        let mut tables = self.tables();
        let stored = tables
            .get_mut(name)
            .ok_or_else(|| TeError::configuration(format!("table '{name}' has not been created")))?;

        let unknown = stored.schema.unknown_columns(table);
        if !unknown.is_empty() {
            return Err(TeError::schema_mismatch(name, unknown));
        }

        let columns = stored.schema.columns();
        for row in table.rows() {
            let mut stored_row = TeFields::new();
            for column in &columns {
                stored_row.insert(column.clone(), row.get(column).cloned().unwrap_or(Value::Null));
            }
            stored.rows.push(stored_row);
        }
        Ok(table.num_rows())
    }

    async fn query(&self, expr: &str) -> Result<TeTable> {
        let select = TeSelect::parse(expr)?;
        let tables = self.tables();
        let stored = tables
            .get(&select.table)
            .ok_or_else(|| TeError::configuration(format!("unknown table '{}'", select.table)))?;

        let columns = match select.columns {
            Some(columns) => {
                let unknown: Vec<String> = columns
                    .iter()
                    .filter(|c| !stored.schema.contains(c))
                    .cloned()
                    .collect();
                if !unknown.is_empty() {
                    return Err(TeError::schema_mismatch(select.table.clone(), unknown));
                }
                columns
            }
            None => stored.schema.columns(),
        };

        let limit = select.limit.unwrap_or(usize::MAX);
        let rows = &stored.rows[..stored.rows.len().min(limit)];
        let columns = columns
            .into_iter()
            .map(|name| {
                let values = rows
                    .iter()
                    .map(|row| row.get(&name).cloned().unwrap_or(Value::Null))
                    .collect();
                TeColumn::new(name, values)
            })
            .collect();
        TeTable::from_columns(columns)
    }
}

/// Parsed `SELECT` expression.
#[derive(Debug, PartialEq)]
struct TeSelect {
    /// `None` for `*`.
    columns: Option<Vec<String>>,
    table: String,
    limit: Option<usize>,
}

const SELECT_PATTERN: &str =
    r"(?is)^\s*select\s+(.+?)\s+from\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s+limit\s+(\d+))?\s*;?\s*$";

static SELECT_REGEX: OnceLock<std::result::Result<Regex, String>> = OnceLock::new();

fn select_regex() -> Result<&'static Regex> {
    SELECT_REGEX
        .get_or_init(|| Regex::new(SELECT_PATTERN).map_err(|err| err.to_string()))
        .as_ref()
        .map_err(|err| TeError::internal(format!("select pattern: {err}")))
}

impl TeSelect {
    fn parse(expr: &str) -> Result<Self> {
        let pattern = select_regex()?;
        let captures = pattern.captures(expr).ok_or_else(|| {
            TeError::configuration(format!(
                "unsupported query '{expr}': expected SELECT <columns|*> FROM <table> [LIMIT <n>]"
            ))
        })?;

        let projection = captures[1].trim();
        let columns = if projection == "*" {
            None
        } else {
            let columns: Vec<String> = projection
                .split(',')
                .map(|c| c.trim().to_string())
                .collect();
            if columns.iter().any(|c| c.is_empty()) {
                return Err(TeError::configuration(format!(
                    "empty column in projection '{projection}'"
                )));
            }
            if let Some(column) = columns
                .iter()
                .enumerate()
                .find_map(|(index, c)| columns[..index].contains(c).then_some(c))
            {
                return Err(TeError::configuration(format!(
                    "column '{column}' appears twice in projection '{projection}'"
                )));
            }
            Some(columns)
        };

        let limit = match captures.get(3) {
            Some(n) => Some(n.as_str().parse::<usize>().map_err(|err| {
                TeError::configuration(format!("invalid LIMIT '{}': {err}", n.as_str()))
            })?),
            None => None,
        };

        Ok(TeSelect {
            columns,
            table: captures[2].to_string(),
            limit,
        })
    }
}
