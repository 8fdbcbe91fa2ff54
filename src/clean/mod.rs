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

//! # Cleaning Module
//!
//! A [`TeCleaningChain`] is an ordered list of [`TeCleaningStep`]s. Cleaning a
//! table runs every step in registration order, each one consuming the table
//! produced by the previous step. The chain never skips a step; a step that
//! only applies to some rows decides that itself.
//!
//! Cleaning happens before the processed and feature zones are written, so a
//! failing step leaves nothing behind. Its error is surfaced as
//! [`TeError::Cleaning`] naming the step, and the chain stops there.

pub mod steps;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::errors::{Result, TeError};
use crate::table::TeTable;

/// Transform over a whole table. Steps may rewrite cells, drop rows or drop
/// columns, and must only rely on the table they are given.
pub trait TeCleaningStep: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, table: TeTable) -> Result<TeTable>;
}

/// Adapts a closure into a [`TeCleaningStep`].
pub struct TeCleaningFn<F> {
    name: String,
    step: F,
}

impl<F> TeCleaningFn<F>
where
    F: Fn(TeTable) -> Result<TeTable> + Send + Sync,
{
    pub fn new(name: impl Into<String>, step: F) -> Self {
        TeCleaningFn {
            name: name.into(),
            step,
        }
    }
}

impl<F> fmt::Debug for TeCleaningFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeCleaningFn").field("name", &self.name).finish()
    }
}

impl<F> TeCleaningStep for TeCleaningFn<F>
where
    F: Fn(TeTable) -> Result<TeTable> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, table: TeTable) -> Result<TeTable> {
        (self.step)(table)
    }
}

/// Runs a step, normalizing both errors and panics into [`TeError::Cleaning`].
pub fn execute_step(step: &dyn TeCleaningStep, table: TeTable) -> Result<TeTable> {
    match panic::catch_unwind(AssertUnwindSafe(|| step.apply(table))) {
        Ok(Ok(table)) => Ok(table),
        Ok(Err(err @ TeError::Cleaning { .. })) => Err(err),
        Ok(Err(err)) => Err(TeError::cleaning(step.name(), err.to_string())),
        Err(_) => Err(TeError::cleaning(step.name(), "step panicked")),
    }
}

/// Ordered chain of cleaning steps.
#[derive(Debug, Default)]
pub struct TeCleaningChain {
    steps: Vec<Box<dyn TeCleaningStep>>,
}

impl TeCleaningChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, step: Box<dyn TeCleaningStep>) {
        self.steps.push(step);
    }

    /// Registers a closure as the next step.
    pub fn add_step_fn<F>(&mut self, name: impl Into<String>, step: F)
    where
        F: Fn(TeTable) -> Result<TeTable> + Send + Sync + 'static,
    {
        self.add_step(Box::new(TeCleaningFn::new(name, step)));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Applies every step in order.
    pub fn clean(&self, mut table: TeTable) -> Result<TeTable> {
        for step in &self.steps {
            let before = table.num_rows();
            table = execute_step(step.as_ref(), table)?;
            log::trace!(
                "clean.step: step applied - step={}, rows_before={}, rows_after={}",
                step.name(),
                before,
                table.num_rows()
            );
        }
        Ok(table)
    }
}
