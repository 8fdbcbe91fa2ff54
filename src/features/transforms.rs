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

//! Built-in feature transforms and their configuration factories.
//!
//! Numeric transforms emit `null` for rows whose inputs are missing or not
//! numeric. A referenced column that does not exist on the table is an error.

use chrono::{DateTime, Timelike};
use serde_json::{json, Value};

use crate::errors::{Result, TeError};
use crate::features::TeFeatureTransform;
use crate::table::{TeColumn, TeTable};

/// Signature shared by every feature transform factory.
pub type TeFeatureFactory = fn(&Value) -> Result<Box<dyn TeFeatureTransform>>;

fn require_column<'a>(transform: &str, table: &'a TeTable, name: &str) -> Result<&'a TeColumn> {
    table.column(name).ok_or_else(|| {
        TeError::internal(format!("{transform} references missing column '{name}'"))
    })
}

fn number(value: f64) -> Value {
    json!(value)
}

/// `column * factor`.
#[derive(Debug)]
pub struct TeScale {
    column: String,
    factor: f64,
}

impl TeScale {
    pub fn new(column: impl Into<String>, factor: f64) -> Self {
        TeScale {
            column: column.into(),
            factor,
        }
    }
}

impl TeFeatureTransform for TeScale {
    fn compute(&self, table: &TeTable) -> Result<Vec<Value>> {
        let column = require_column("feature.scale", table, &self.column)?;
        Ok(column
            .as_f64()
            .map(|v| v.map_or(Value::Null, |n| number(n * self.factor)))
            .collect())
    }
}

/// `numerator / denominator`, `null` when the denominator is zero.
#[derive(Debug)]
pub struct TeRatio {
    numerator: String,
    denominator: String,
}

impl TeRatio {
    pub fn new(numerator: impl Into<String>, denominator: impl Into<String>) -> Self {
        TeRatio {
            numerator: numerator.into(),
            denominator: denominator.into(),
        }
    }
}

impl TeFeatureTransform for TeRatio {
    fn compute(&self, table: &TeTable) -> Result<Vec<Value>> {
        let num = require_column("feature.ratio", table, &self.numerator)?;
        let den = require_column("feature.ratio", table, &self.denominator)?;
        Ok(num
            .as_f64()
            .zip(den.as_f64())
            .map(|pair| match pair {
                (Some(n), Some(d)) if d != 0.0 => number(n / d),
                _ => Value::Null,
            })
            .collect())
    }
}

/// Row-wise sum of several columns; `null` if any input is not numeric.
#[derive(Debug)]
pub struct TeSum {
    columns: Vec<String>,
}

impl TeSum {
    pub fn new(columns: Vec<String>) -> Self {
        TeSum { columns }
    }
}

impl TeFeatureTransform for TeSum {
    fn compute(&self, table: &TeTable) -> Result<Vec<Value>> {
        let inputs = self
            .columns
            .iter()
            .map(|name| require_column("feature.sum", table, name))
            .collect::<Result<Vec<_>>>()?;

        Ok((0..table.num_rows())
            .map(|row| {
                inputs
                    .iter()
                    .map(|column| column.values[row].as_f64())
                    .sum::<Option<f64>>()
                    .map_or(Value::Null, number)
            })
            .collect())
    }
}

/// Hour of day (0-23) of an RFC 3339 timestamp column. `null` cells stay
/// `null`; anything else that does not parse is an error.
#[derive(Debug)]
pub struct TeHourOfDay {
    column: String,
}

impl TeHourOfDay {
    pub fn new(column: impl Into<String>) -> Self {
        TeHourOfDay {
            column: column.into(),
        }
    }
}

impl TeFeatureTransform for TeHourOfDay {
    fn compute(&self, table: &TeTable) -> Result<Vec<Value>> {
        let column = require_column("feature.hour_of_day", table, &self.column)?;
        column
            .values
            .iter()
            .map(|value| match value {
                Value::Null => Ok(Value::Null),
                Value::String(text) => DateTime::parse_from_rfc3339(text)
                    .map(|ts| json!(ts.hour()))
                    .map_err(|err| {
                        TeError::internal(format!("cannot parse timestamp '{text}': {err}"))
                    }),
                other => Err(TeError::internal(format!(
                    "expected timestamp string, got {other}"
                ))),
            })
            .collect()
    }
}

fn required_str<'a>(transform: &str, config: &'a Value, key: &str) -> Result<&'a str> {
    config
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| TeError::configuration(format!("{transform} requires string '{key}'")))
}

pub fn feature_scale_factory(config: &Value) -> Result<Box<dyn TeFeatureTransform>> {
    let column = required_str("feature.scale", config, "column")?;
    let factor = config
        .get("factor")
        .and_then(Value::as_f64)
        .ok_or_else(|| TeError::configuration("feature.scale requires number 'factor'"))?;
    Ok(Box::new(TeScale::new(column, factor)))
}

pub fn feature_ratio_factory(config: &Value) -> Result<Box<dyn TeFeatureTransform>> {
    let numerator = required_str("feature.ratio", config, "numerator")?;
    let denominator = required_str("feature.ratio", config, "denominator")?;
    Ok(Box::new(TeRatio::new(numerator, denominator)))
}

pub fn feature_sum_factory(config: &Value) -> Result<Box<dyn TeFeatureTransform>> {
    let columns = config
        .get("columns")
        .and_then(Value::as_array)
        .filter(|columns| !columns.is_empty())
        .ok_or_else(|| TeError::configuration("feature.sum requires non-empty array 'columns'"))?
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| TeError::configuration("feature.sum 'columns' must contain strings"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Box::new(TeSum::new(columns)))
}

pub fn feature_hour_of_day_factory(config: &Value) -> Result<Box<dyn TeFeatureTransform>> {
    let column = required_str("feature.hour_of_day", config, "column")?;
    Ok(Box::new(TeHourOfDay::new(column)))
}
