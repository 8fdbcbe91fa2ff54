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

//! Built-in validation rules and the factories that build them from JSON
//! configuration.

use regex::Regex;
use serde_json::Value;

use crate::errors::{Result, TeError};
use crate::record::json_type_name;
use crate::validate::TeRule;

/// Signature shared by every rule factory.
pub type TeRuleFactory = fn(&Value) -> Result<Box<dyn TeRule>>;

/// Fails on `null`.
#[derive(Debug, Default)]
pub struct TeNotNull;

impl TeRule for TeNotNull {
    fn name(&self) -> &str {
        "rule.not_null"
    }

    fn check(&self, value: &Value) -> Result<bool> {
        Ok(!value.is_null())
    }
}

/// Requires a number greater than or equal to zero. Non-numeric values are
/// an error, which the rule set counts as a failure.
#[derive(Debug, Default)]
pub struct TeNonNegative;

impl TeRule for TeNonNegative {
    fn name(&self) -> &str {
        "rule.non_negative"
    }

    fn check(&self, value: &Value) -> Result<bool> {
        let number = expect_number(self.name(), value)?;
        Ok(number >= 0.0)
    }
}

/// Requires a number within inclusive bounds; either bound may be open.
#[derive(Debug)]
pub struct TeRange {
    min: Option<f64>,
    max: Option<f64>,
}

impl TeRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Result<Self> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(TeError::configuration(format!(
                    "rule.range min {lo} is greater than max {hi}"
                )));
            }
        }
        Ok(TeRange { min, max })
    }
}

impl TeRule for TeRange {
    fn name(&self) -> &str {
        "rule.range"
    }

    fn check(&self, value: &Value) -> Result<bool> {
        let number = expect_number(self.name(), value)?;
        let above = self.min.map_or(true, |min| number >= min);
        let below = self.max.map_or(true, |max| number <= max);
        Ok(above && below)
    }
}

/// Requires a string matching a regular expression.
#[derive(Debug)]
pub struct TeMatches {
    pattern: Regex,
}

impl TeMatches {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|err| TeError::configuration(format!("rule.regex invalid pattern: {err}")))?;
        Ok(TeMatches { pattern })
    }
}

impl TeRule for TeMatches {
    fn name(&self) -> &str {
        "rule.regex"
    }

    fn check(&self, value: &Value) -> Result<bool> {
        Ok(value
            .as_str()
            .map(|text| self.pattern.is_match(text))
            .unwrap_or(false))
    }
}

/// Requires the value to equal one of an allowed set.
#[derive(Debug)]
pub struct TeOneOf {
    allowed: Vec<Value>,
}

impl TeOneOf {
    pub fn new(allowed: Vec<Value>) -> Self {
        TeOneOf { allowed }
    }
}

impl TeRule for TeOneOf {
    fn name(&self) -> &str {
        "rule.one_of"
    }

    fn check(&self, value: &Value) -> Result<bool> {
        Ok(self.allowed.contains(value))
    }
}

/// Requires a JSON type: `null`, `boolean`, `number`, `integer`, `string`,
/// `array` or `object`.
#[derive(Debug)]
pub struct TeIsType {
    expected: String,
}

impl TeIsType {
    pub fn new(expected: &str) -> Result<Self> {
        match expected {
            "null" | "boolean" | "number" | "integer" | "string" | "array" | "object" => {
                Ok(TeIsType {
                    expected: expected.to_string(),
                })
            }
            other => Err(TeError::configuration(format!(
                "rule.type unknown type '{other}'"
            ))),
        }
    }
}

impl TeRule for TeIsType {
    fn name(&self) -> &str {
        "rule.type"
    }

    fn check(&self, value: &Value) -> Result<bool> {
        if self.expected == "integer" {
            return Ok(value.is_i64() || value.is_u64());
        }
        Ok(json_type_name(value) == self.expected)
    }
}

fn expect_number(rule: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        TeError::internal(format!(
            "{rule} expects a number, got {}",
            json_type_name(value)
        ))
    })
}

fn config_object<'a>(
    rule: &str,
    config: &'a Value,
) -> Result<Option<&'a serde_json::Map<String, Value>>> {
    match config {
        Value::Null => Ok(None),
        Value::Object(obj) => Ok(Some(obj)),
        _ => Err(TeError::configuration(format!("{rule} config must be object"))),
    }
}

fn optional_f64(rule: &str, config: &Value, key: &str) -> Result<Option<f64>> {
    let Some(obj) = config_object(rule, config)? else {
        return Ok(None);
    };
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| {
            TeError::configuration(format!("{rule} '{key}' must be a number"))
        }),
    }
}

/// Factory for [`TeNotNull`].
pub fn rule_not_null_factory(_config: &Value) -> Result<Box<dyn TeRule>> {
    Ok(Box::new(TeNotNull))
}

/// Factory for [`TeNonNegative`].
pub fn rule_non_negative_factory(_config: &Value) -> Result<Box<dyn TeRule>> {
    Ok(Box::new(TeNonNegative))
}

/// Factory for [`TeRange`]; reads optional numeric `min` and `max`.
pub fn rule_range_factory(config: &Value) -> Result<Box<dyn TeRule>> {
    let min = optional_f64("rule.range", config, "min")?;
    let max = optional_f64("rule.range", config, "max")?;
    if min.is_none() && max.is_none() {
        return Err(TeError::configuration(
            "rule.range requires at least one of 'min' or 'max'",
        ));
    }
    Ok(Box::new(TeRange::new(min, max)?))
}

/// Factory for [`TeMatches`]; requires string `pattern`.
pub fn rule_regex_factory(config: &Value) -> Result<Box<dyn TeRule>> {
    let pattern = config_object("rule.regex", config)?
        .and_then(|obj| obj.get("pattern"))
        .and_then(Value::as_str)
        .ok_or_else(|| TeError::configuration("rule.regex requires string 'pattern'"))?;
    Ok(Box::new(TeMatches::new(pattern)?))
}

/// Factory for [`TeOneOf`]; requires array `values`.
pub fn rule_one_of_factory(config: &Value) -> Result<Box<dyn TeRule>> {
    let values = config_object("rule.one_of", config)?
        .and_then(|obj| obj.get("values"))
        .and_then(Value::as_array)
        .ok_or_else(|| TeError::configuration("rule.one_of requires array 'values'"))?;
    Ok(Box::new(TeOneOf::new(values.clone())))
}

/// Factory for [`TeIsType`]; requires string `type`.
pub fn rule_type_factory(config: &Value) -> Result<Box<dyn TeRule>> {
    let expected = config_object("rule.type", config)?
        .and_then(|obj| obj.get("type"))
        .and_then(Value::as_str)
        .ok_or_else(|| TeError::configuration("rule.type requires string 'type'"))?;
    Ok(Box::new(TeIsType::new(expected)?))
}
