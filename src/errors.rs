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

//! # Tessera Error Module
//!
//! This module defines the error types used throughout Tessera for consistent
//! error handling and reporting.
//!
//! ## Error Categories
//!
//! - **Cleaning**: A cleaning step failed; the record never reaches the lake
//! - **Feature**: A feature transform failed or produced a malformed column
//! - **Storage**: A lake zone write or read failed
//! - **SchemaMismatch**: Rows carry columns the warehouse table does not declare
//! - **Configuration**: The pipeline or warehouse is wired incorrectly
//! - **Io** / **Serde** / **Internal**: Plumbing failures
//!
//! Validation failures are deliberately absent. A record that fails its rules
//! is a normal outcome carried by
//! [`TeValidationResult`](crate::validate::TeValidationResult), never an error.
//!
//! ## Usage
//!
//! ```rust
//! use tessera::errors::{Result, TeError};
//!
//! fn check_table(name: &str) -> Result<()> {
//!     if name.is_empty() {
//!         return Err(TeError::configuration("table name cannot be empty"));
//!     }
//!     Ok(())
//! }
//! ```

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lake::TeZone;

/// Convenience result type used throughout Tessera.
pub type Result<T> = std::result::Result<T, TeError>;

/// Canonical error enumeration for Tessera.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum TeError {
    /// A cleaning step rejected or failed to transform the table.
    #[error("cleaning step '{step}' failed: {message}")]
    Cleaning { step: String, message: String },

    /// A feature transform failed or produced an unusable column.
    #[error("feature '{feature}' failed: {message}")]
    Feature { feature: String, message: String },

    /// A lake zone could not persist or return a payload.
    #[error("storage error in {zone} zone: {message}")]
    Storage { zone: TeZone, message: String },

    /// Rows carry columns that the warehouse table does not declare.
    #[error("schema mismatch for table '{table}': undeclared columns {columns:?}")]
    SchemaMismatch { table: String, columns: Vec<String> },

    /// The pipeline, warehouse or a registration is wired incorrectly.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Errors originating from filesystem IO.
    #[error("io error: {0}")]
    Io(String),

    /// Wrapper for serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for TeError {
    fn from(err: io::Error) -> Self {
        TeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TeError {
    fn from(err: serde_json::Error) -> Self {
        TeError::Serde(err.to_string())
    }
}

impl From<serde_yaml::Error> for TeError {
    fn from(err: serde_yaml::Error) -> Self {
        TeError::Serde(err.to_string())
    }
}

impl From<csv::Error> for TeError {
    fn from(err: csv::Error) -> Self {
        TeError::Serde(format!("csv: {err}"))
    }
}

impl TeError {
    /// Helper to construct cleaning errors.
    pub fn cleaning(step: impl Into<String>, message: impl Into<String>) -> Self {
        TeError::Cleaning {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Helper to construct feature errors.
    pub fn feature(feature: impl Into<String>, message: impl Into<String>) -> Self {
        TeError::Feature {
            feature: feature.into(),
            message: message.into(),
        }
    }

    /// Helper to construct storage errors.
    pub fn storage(zone: TeZone, message: impl Into<String>) -> Self {
        TeError::Storage {
            zone,
            message: message.into(),
        }
    }

    /// Helper to construct schema mismatch errors.
    pub fn schema_mismatch(table: impl Into<String>, columns: Vec<String>) -> Self {
        TeError::SchemaMismatch {
            table: table.into(),
            columns,
        }
    }

    /// Helper to construct configuration errors.
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        TeError::Configuration {
            message: message.into(),
        }
    }

    /// Helper to construct internal errors.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        TeError::Internal(message.into())
    }

    /// Stable short name of the error category, used in logs and batch outcomes.
    pub fn kind(&self) -> &'static str {
        match self {
            TeError::Cleaning { .. } => "cleaning",
            TeError::Feature { .. } => "feature",
            TeError::Storage { .. } => "storage",
            TeError::SchemaMismatch { .. } => "schema",
            TeError::Configuration { .. } => "configuration",
            TeError::Io(_) => "io",
            TeError::Serde(_) => "serde",
            TeError::Internal(_) => "internal",
        }
    }
}
