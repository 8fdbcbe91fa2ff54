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

//! # Tessera Table Module
//!
//! [`TeTable`] is the rectangular value handed between the cleaning, feature,
//! lake and warehouse stages. It is an ordered sequence of named columns of
//! equal length and is always passed by value: a stage consumes one table and
//! returns another, so no buffer is shared between steps.
//!
//! Rows are materialized on demand as field maps whose keys follow column
//! order, which is what the row-oriented lake encodings and the warehouse
//! sink consume.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Result, TeError};
use crate::record::{TeFields, TeRecord};

/// Named column of a [`TeTable`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeColumn {
    pub name: String,
    pub values: Vec<Value>,
}

impl TeColumn {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        TeColumn {
            name: name.into(),
            values,
        }
    }

    /// Iterates the column as `f64`, yielding `None` for non-numeric cells.
    pub fn as_f64(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.values.iter().map(Value::as_f64)
    }
}

/// Ordered, rectangular batch of columns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TeTableRepr")]
pub struct TeTable {
    columns: Vec<TeColumn>,
    rows: usize,
}

/// Unchecked wire shape of a [`TeTable`].
#[derive(Deserialize)]
struct TeTableRepr {
    columns: Vec<TeColumn>,
    rows: usize,
}

impl TryFrom<TeTableRepr> for TeTable {
    type Error = TeError;

    fn try_from(repr: TeTableRepr) -> Result<Self> {
        if repr.columns.is_empty() {
            return Ok(TeTable {
                columns: Vec::new(),
                rows: repr.rows,
            });
        }
        let table = TeTable::from_columns(repr.columns)?;
        if table.rows != repr.rows {
            return Err(TeError::configuration(format!(
                "table declares {} rows but its columns hold {}",
                repr.rows, table.rows
            )));
        }
        Ok(table)
    }
}

impl TeTable {
    /// Creates an empty table with no columns and no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a single record as a one-row table, keeping field order.
    pub fn from_record(record: &TeRecord) -> Self {
        let columns = record
            .fields()
            .iter()
            .map(|(name, value)| TeColumn::new(name.clone(), vec![value.clone()]))
            .collect();
        TeTable { columns, rows: 1 }
    }

    /// Builds a table from row maps. Columns appear in first-seen order and
    /// cells missing from a row are filled with `null`.
    pub fn from_rows(rows: &[TeFields]) -> Self {
        let mut names: Vec<String> = Vec::new();
        for row in rows {
            for key in row.keys() {
                if !names.iter().any(|name| name == key) {
                    names.push(key.clone());
                }
            }
        }

        let columns = names
            .into_iter()
            .map(|name| {
                let values = rows
                    .iter()
                    .map(|row| row.get(&name).cloned().unwrap_or(Value::Null))
                    .collect();
                TeColumn::new(name, values)
            })
            .collect();

        TeTable {
            columns,
            rows: rows.len(),
        }
    }

    /// Builds a table from explicit columns, checking they are rectangular
    /// and uniquely named.
    pub fn from_columns(columns: Vec<TeColumn>) -> Result<Self> {
        let rows = columns.first().map_or(0, |c| c.values.len());
        let mut table = TeTable {
            columns: Vec::with_capacity(columns.len()),
            rows,
        };
        for column in columns {
            table = table.with_column(column.name, column.values)?;
        }
        Ok(table)
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[TeColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&TeColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Appends a column. The column must match the row count (any length is
    /// accepted for an empty table) and must not reuse a name.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<Value>) -> Result<Self> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(TeError::internal(format!("column '{name}' already exists")));
        }
        if self.columns.is_empty() && self.rows == 0 {
            self.rows = values.len();
        } else if values.len() != self.rows {
            return Err(TeError::internal(format!(
                "column '{name}' has {} values but table has {} rows",
                values.len(),
                self.rows
            )));
        }
        self.columns.push(TeColumn::new(name, values));
        Ok(self)
    }

    /// Removes a column if present.
    pub fn drop_column(mut self, name: &str) -> Self {
        self.columns.retain(|c| c.name != name);
        self
    }

    /// Rewrites every cell of one column. Missing columns leave the table
    /// unchanged.
    pub fn map_column<F>(mut self, name: &str, mut f: F) -> Self
    where
        F: FnMut(Value) -> Value,
    {
        if let Some(column) = self.columns.iter_mut().find(|c| c.name == name) {
            let values = std::mem::take(&mut column.values);
            column.values = values.into_iter().map(&mut f).collect();
        }
        self
    }

    /// Rewrites every cell of every column.
    pub fn map_cells<F>(mut self, mut f: F) -> Self
    where
        F: FnMut(Value) -> Value,
    {
        for column in &mut self.columns {
            let values = std::mem::take(&mut column.values);
            column.values = values.into_iter().map(&mut f).collect();
        }
        self
    }

    /// Keeps the rows for which `keep` returns true.
    pub fn filter_rows<F>(self, mut keep: F) -> Self
    where
        F: FnMut(&TeFields) -> bool,
    {
        let mask: Vec<bool> = self.rows().map(|row| keep(&row)).collect();
        self.retain_mask(&mask)
    }

    /// Fallible variant of [`TeTable::filter_rows`]; the first error aborts.
    pub fn try_filter_rows<F>(self, mut keep: F) -> Result<Self>
    where
        F: FnMut(&TeFields) -> Result<bool>,
    {
        let mut mask = Vec::with_capacity(self.rows);
        for row in self.rows() {
            mask.push(keep(&row)?);
        }
        Ok(self.retain_mask(&mask))
    }

    fn retain_mask(mut self, mask: &[bool]) -> Self {
        for column in &mut self.columns {
            let values = std::mem::take(&mut column.values);
            column.values = values
                .into_iter()
                .zip(mask.iter())
                .filter_map(|(value, keep)| keep.then_some(value))
                .collect();
        }
        self.rows = mask.iter().filter(|keep| **keep).count();
        self
    }

    /// Materializes one row as a field map.
    pub fn row(&self, index: usize) -> Option<TeFields> {
        if index >= self.rows {
            return None;
        }
        let mut row = Map::with_capacity(self.columns.len());
        for column in &self.columns {
            row.insert(column.name.clone(), column.values[index].clone());
        }
        Some(row)
    }

    /// Iterates rows as field maps in column order.
    pub fn rows(&self) -> impl Iterator<Item = TeFields> + '_ {
        (0..self.rows).filter_map(move |index| self.row(index))
    }

    pub fn to_rows(&self) -> Vec<TeFields> {
        self.rows().collect()
    }
}
