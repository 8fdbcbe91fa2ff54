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

//! # Feature Engineering Module
//!
//! A [`TeFeatureSet`] holds named [`TeFeatureTransform`]s. Applying the set
//! to a cleaned table appends one derived column per transform, in
//! registration order, and reports the names of the columns it created.
//!
//! Each transform sees the table as augmented by the transforms registered
//! before it, so `qty_doubled` can feed `qty_quadrupled` but never the other
//! way round. Transforms must be deterministic in their input table.

pub mod transforms;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;

use crate::errors::{Result, TeError};
use crate::table::TeTable;

/// Derived-column computation over a whole table.
pub trait TeFeatureTransform: fmt::Debug + Send + Sync {
    /// Returns one value per table row.
    fn compute(&self, table: &TeTable) -> Result<Vec<Value>>;
}

/// Adapts a closure into a [`TeFeatureTransform`].
pub struct TeFeatureFn<F> {
    compute: F,
}

impl<F> TeFeatureFn<F>
where
    F: Fn(&TeTable) -> Result<Vec<Value>> + Send + Sync,
{
    pub fn new(compute: F) -> Self {
        TeFeatureFn { compute }
    }
}

impl<F> fmt::Debug for TeFeatureFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TeFeatureFn")
    }
}

impl<F> TeFeatureTransform for TeFeatureFn<F>
where
    F: Fn(&TeTable) -> Result<Vec<Value>> + Send + Sync,
{
    fn compute(&self, table: &TeTable) -> Result<Vec<Value>> {
        (self.compute)(table)
    }
}

/// Ordered set of named feature transforms.
#[derive(Debug, Default)]
pub struct TeFeatureSet {
    transforms: Vec<(String, Box<dyn TeFeatureTransform>)>,
}

impl TeFeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transform. Registering an existing name replaces that
    /// transform but keeps its original position.
    pub fn add_transform(&mut self, name: impl Into<String>, transform: Box<dyn TeFeatureTransform>) {
        let name = name.into();
        match self.transforms.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = transform,
            None => self.transforms.push((name, transform)),
        }
    }

    /// Registers a closure as a transform.
    pub fn add_transform_fn<F>(&mut self, name: impl Into<String>, compute: F)
    where
        F: Fn(&TeTable) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        self.add_transform(name, Box::new(TeFeatureFn::new(compute)));
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.transforms.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Appends every feature column and returns the augmented table with the
    /// names of the created columns, in order.
    pub fn apply(&self, mut table: TeTable) -> Result<(TeTable, Vec<String>)> {
        let mut created = Vec::with_capacity(self.transforms.len());

        for (name, transform) in &self.transforms {
            if table.has_column(name) {
                return Err(TeError::feature(
                    name.clone(),
                    "column already exists on the table",
                ));
            }

            let values = match panic::catch_unwind(AssertUnwindSafe(|| transform.compute(&table))) {
                Ok(Ok(values)) => values,
                Ok(Err(err @ TeError::Feature { .. })) => return Err(err),
                Ok(Err(err)) => return Err(TeError::feature(name.clone(), err.to_string())),
                Err(_) => return Err(TeError::feature(name.clone(), "transform panicked")),
            };

            if values.len() != table.num_rows() {
                return Err(TeError::feature(
                    name.clone(),
                    format!(
                        "column length {} does not match {} rows",
                        values.len(),
                        table.num_rows()
                    ),
                ));
            }

            table = table
                .with_column(name.clone(), values)
                .map_err(|err| TeError::feature(name.clone(), err.to_string()))?;
            created.push(name.clone());
        }

        Ok((table, created))
    }
}
