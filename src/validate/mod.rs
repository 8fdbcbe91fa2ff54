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

//! # Validation Module
//!
//! Field-level validation of incoming records.
//!
//! A [`TeRuleSet`] keeps, per field name, an ordered list of [`TeRule`]
//! predicates. Validating a record runs every rule of every registered field
//! the record carries; nothing short-circuits, so the result names every
//! invalid field rather than the first one found. Fields without rules are
//! never flagged.
//!
//! A record with at least one invalid field is appended to the shared
//! [`TeQuarantine`] and reported through [`TeValidationResult`]. Validation
//! failure is an outcome, not an error.
//!
//! ## Rule Failures
//!
//! A rule that returns `Err`, or panics, counts as a failed rule for that
//! field. One malformed rule therefore flags its field instead of aborting
//! the run or the surrounding batch.
//!
//! ## Built-in Rules
//!
//! See [`rules`] for the rules that can be configured by name
//! (`rule.not_null`, `rule.non_negative`, `rule.range`, `rule.regex`,
//! `rule.one_of`, `rule.type`).

pub mod quarantine;
pub mod rules;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;
use crate::record::TeRecord;

pub use quarantine::{TeQuarantine, TeQuarantinedRecord};

/// Predicate applied to the value of one field.
pub trait TeRule: fmt::Debug + Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Returns whether the value passes. `Err` counts as a failure.
    fn check(&self, value: &Value) -> Result<bool>;
}

/// Adapts a closure into a [`TeRule`].
pub struct TeRuleFn<F> {
    name: String,
    predicate: F,
}

impl<F> TeRuleFn<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        TeRuleFn {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> fmt::Debug for TeRuleFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeRuleFn").field("name", &self.name).finish()
    }
}

impl<F> TeRule for TeRuleFn<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, value: &Value) -> Result<bool> {
        Ok((self.predicate)(value))
    }
}

/// Outcome of validating one record.
///
/// `quarantined` always equals `!is_valid`; both are derived from
/// `invalid_fields` at construction, including when deserialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TeValidationResultRepr")]
pub struct TeValidationResult {
    is_valid: bool,
    invalid_fields: Vec<String>,
    quarantined: bool,
}

#[derive(Deserialize)]
struct TeValidationResultRepr {
    #[serde(default)]
    invalid_fields: Vec<String>,
}

impl From<TeValidationResultRepr> for TeValidationResult {
    fn from(repr: TeValidationResultRepr) -> Self {
        TeValidationResult::from_invalid_fields(repr.invalid_fields)
    }
}

impl TeValidationResult {
    pub fn from_invalid_fields(invalid_fields: Vec<String>) -> Self {
        let is_valid = invalid_fields.is_empty();
        TeValidationResult {
            is_valid,
            invalid_fields,
            quarantined: !is_valid,
        }
    }

    pub fn valid() -> Self {
        Self::from_invalid_fields(Vec::new())
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn invalid_fields(&self) -> &[String] {
        &self.invalid_fields
    }

    pub fn quarantined(&self) -> bool {
        self.quarantined
    }
}

/// Ordered registry of field rules plus the quarantine they feed.
#[derive(Debug)]
pub struct TeRuleSet {
    rules: Vec<(String, Vec<Box<dyn TeRule>>)>,
    quarantine: Arc<TeQuarantine>,
}

impl Default for TeRuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl TeRuleSet {
    /// Creates an empty rule set with its own quarantine.
    pub fn new() -> Self {
        Self::with_quarantine(Arc::new(TeQuarantine::new()))
    }

    /// Creates an empty rule set that quarantines into a shared store.
    pub fn with_quarantine(quarantine: Arc<TeQuarantine>) -> Self {
        TeRuleSet {
            rules: Vec::new(),
            quarantine,
        }
    }

    /// Registers a rule for a field. Duplicate rules are kept and both run.
    pub fn add_rule(&mut self, field: impl Into<String>, rule: Box<dyn TeRule>) {
        let field = field.into();
        match self.rules.iter_mut().find(|(name, _)| *name == field) {
            Some((_, rules)) => rules.push(rule),
            None => self.rules.push((field, vec![rule])),
        }
    }

    /// Registers a closure as a rule for a field.
    pub fn add_rule_fn<F>(&mut self, field: impl Into<String>, predicate: F)
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let field = field.into();
        let name = format!("{field}.predicate");
        self.add_rule(field, Box::new(TeRuleFn::new(name, predicate)));
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of registered rules across all fields.
    pub fn rule_count(&self) -> usize {
        self.rules.iter().map(|(_, rules)| rules.len()).sum()
    }

    /// Fields that have at least one rule, in registration order.
    pub fn fields(&self) -> Vec<&str> {
        self.rules.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn quarantine(&self) -> &Arc<TeQuarantine> {
        &self.quarantine
    }

    /// Validates a record, quarantining it when any field fails.
    pub fn validate(&self, record: &TeRecord) -> TeValidationResult {
        let mut invalid_fields = Vec::new();

        for (field, rules) in &self.rules {
            let Some(value) = record.get(field) else {
                continue;
            };
            let mut field_valid = true;
            for rule in rules {
                if !evaluate(field, rule.as_ref(), value) {
                    field_valid = false;
                }
            }
            if !field_valid {
                invalid_fields.push(field.clone());
            }
        }

        let result = TeValidationResult::from_invalid_fields(invalid_fields);
        if result.quarantined() {
            log::debug!(
                "validate.quarantine: record failed validation - source={}, invalid_fields={:?}",
                record.source(),
                result.invalid_fields()
            );
            self.quarantine
                .push(record.clone(), result.invalid_fields().to_vec());
        }
        result
    }
}

fn evaluate(field: &str, rule: &dyn TeRule, value: &Value) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| rule.check(value))) {
        Ok(Ok(passed)) => passed,
        Ok(Err(err)) => {
            log::warn!(
                "validate.rule.error: rule raised an error, treating as failed - field={}, rule={}, error={}",
                field,
                rule.name(),
                err
            );
            false
        }
        Err(_) => {
            log::warn!(
                "validate.rule.panic: rule panicked, treating as failed - field={}, rule={}",
                field,
                rule.name()
            );
            false
        }
    }
}
