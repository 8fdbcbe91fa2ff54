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

//! Built-in cleaning steps and their configuration factories.

use std::collections::HashSet;

use serde_json::Value;

use crate::clean::TeCleaningStep;
use crate::errors::{Result, TeError};
use crate::table::TeTable;

/// Signature shared by every cleaning step factory.
pub type TeCleaningFactory = fn(&Value) -> Result<Box<dyn TeCleaningStep>>;

/// Trims and collapses whitespace in every string cell.
#[derive(Debug, Default)]
pub struct TeTrimStrings;

impl TeCleaningStep for TeTrimStrings {
    fn name(&self) -> &str {
        "clean.trim_strings"
    }

    fn apply(&self, table: TeTable) -> Result<TeTable> {
        Ok(table.map_cells(|value| match value {
            Value::String(text) => {
                Value::String(text.split_whitespace().collect::<Vec<_>>().join(" "))
            }
            other => other,
        }))
    }
}

/// Replaces `null` cells of one column with a default. A missing column is
/// added, filled with the default.
#[derive(Debug)]
pub struct TeFillNull {
    column: String,
    value: Value,
}

impl TeFillNull {
    pub fn new(column: impl Into<String>, value: Value) -> Self {
        TeFillNull {
            column: column.into(),
            value,
        }
    }
}

impl TeCleaningStep for TeFillNull {
    fn name(&self) -> &str {
        "clean.fill_null"
    }

    fn apply(&self, table: TeTable) -> Result<TeTable> {
        if !table.has_column(&self.column) {
            let rows = table.num_rows();
            return table.with_column(self.column.clone(), vec![self.value.clone(); rows]);
        }
        Ok(table.map_column(&self.column, |value| {
            if value.is_null() {
                self.value.clone()
            } else {
                value
            }
        }))
    }
}

/// Drops rows whose numeric value in `column` is at or below `threshold`
/// (strictly below when `inclusive` is false). Non-numeric cells are kept.
#[derive(Debug)]
pub struct TeDropBelow {
    column: String,
    threshold: f64,
    inclusive: bool,
}

impl TeDropBelow {
    pub fn new(column: impl Into<String>, threshold: f64, inclusive: bool) -> Self {
        TeDropBelow {
            column: column.into(),
            threshold,
            inclusive,
        }
    }
}

impl TeCleaningStep for TeDropBelow {
    fn name(&self) -> &str {
        "clean.drop_below"
    }

    fn apply(&self, table: TeTable) -> Result<TeTable> {
        Ok(table.filter_rows(|row| match row.get(&self.column).and_then(Value::as_f64) {
            Some(number) if self.inclusive => number > self.threshold,
            Some(number) => number >= self.threshold,
            None => true,
        }))
    }
}

/// Removes columns by name; unknown names are ignored.
#[derive(Debug)]
pub struct TeDropColumns {
    columns: Vec<String>,
}

impl TeDropColumns {
    pub fn new(columns: Vec<String>) -> Self {
        TeDropColumns { columns }
    }
}

impl TeCleaningStep for TeDropColumns {
    fn name(&self) -> &str {
        "clean.drop_columns"
    }

    fn apply(&self, table: TeTable) -> Result<TeTable> {
        Ok(self
            .columns
            .iter()
            .fold(table, |table, column| table.drop_column(column)))
    }
}

/// Keeps the first occurrence of each identical row.
#[derive(Debug, Default)]
pub struct TeDedupRows;

impl TeCleaningStep for TeDedupRows {
    fn name(&self) -> &str {
        "clean.dedup_rows"
    }

    fn apply(&self, table: TeTable) -> Result<TeTable> {
        let mut seen = HashSet::new();
        table.try_filter_rows(|row| {
            let encoded = serde_json::to_vec(row)?;
            Ok(seen.insert(*blake3::hash(&encoded).as_bytes()))
        })
    }
}

fn required_str<'a>(step: &str, config: &'a Value, key: &str) -> Result<&'a str> {
    config
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| TeError::configuration(format!("{step} requires string '{key}'")))
}

pub fn clean_trim_strings_factory(_config: &Value) -> Result<Box<dyn TeCleaningStep>> {
    Ok(Box::new(TeTrimStrings))
}

pub fn clean_fill_null_factory(config: &Value) -> Result<Box<dyn TeCleaningStep>> {
    let column = required_str("clean.fill_null", config, "column")?;
    let value = config
        .get("value")
        .cloned()
        .ok_or_else(|| TeError::configuration("clean.fill_null requires 'value'"))?;
    Ok(Box::new(TeFillNull::new(column, value)))
}

pub fn clean_drop_below_factory(config: &Value) -> Result<Box<dyn TeCleaningStep>> {
    let column = required_str("clean.drop_below", config, "column")?;
    let threshold = config
        .get("threshold")
        .and_then(Value::as_f64)
        .ok_or_else(|| TeError::configuration("clean.drop_below requires number 'threshold'"))?;
    let inclusive = config
        .get("inclusive")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    Ok(Box::new(TeDropBelow::new(column, threshold, inclusive)))
}

pub fn clean_drop_columns_factory(config: &Value) -> Result<Box<dyn TeCleaningStep>> {
    let columns = config
        .get("columns")
        .and_then(Value::as_array)
        .ok_or_else(|| TeError::configuration("clean.drop_columns requires array 'columns'"))?
        .iter()
        .map(|v| {
            v.as_str().map(str::to_string).ok_or_else(|| {
                TeError::configuration("clean.drop_columns 'columns' must contain strings")
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Box::new(TeDropColumns::new(columns)))
}

pub fn clean_dedup_rows_factory(_config: &Value) -> Result<Box<dyn TeCleaningStep>> {
    Ok(Box::new(TeDedupRows))
}
