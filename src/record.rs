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

//! # Tessera Record Module
//!
//! A [`TeRecord`] is one raw business event (a point-of-sale ticket, an
//! inventory count, a feedback form, an external signal) as handed to the
//! pipeline by its caller.
//!
//! ## Design Principles
//!
//! - **Flexibility**: Fields use `serde_json::Value`, so nested and
//!   dynamically-typed payloads need no schema up front
//! - **Immutability**: Records expose read accessors only; every stage after
//!   validation works on a [`TeTable`](crate::table::TeTable) built from the
//!   record instead of mutating it
//! - **Provenance**: Each record carries its `source` tag and ingestion stamp
//!
//! ## Usage Example
//!
//! ```rust
//! use serde_json::json;
//! use tessera::record::TeRecord;
//!
//! let record = TeRecord::from_value("pos", json!({"item_id": "burger", "qty": 2})).unwrap();
//! assert_eq!(record.source(), "pos");
//! assert_eq!(record.get("qty"), Some(&json!(2)));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Result, TeError};

/// Field map carried by a record.
pub type TeFields = Map<String, Value>;

/// Raw business event flowing through the pipeline exactly once per call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeRecord {
    source: String,
    fields: TeFields,
    ingested_at: DateTime<Utc>,
}

impl TeRecord {
    /// Constructs a record stamped with the current time.
    pub fn new(source: impl Into<String>, fields: TeFields) -> Self {
        Self::with_ingested_at(source, fields, Utc::now())
    }

    /// Constructs a record with an explicit ingestion stamp.
    pub fn with_ingested_at(
        source: impl Into<String>,
        fields: TeFields,
        ingested_at: DateTime<Utc>,
    ) -> Self {
        TeRecord {
            source: source.into(),
            fields,
            ingested_at,
        }
    }

    /// Builds a record from a JSON object; any other JSON shape is rejected.
    pub fn from_value(source: impl Into<String>, value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self::new(source, fields)),
            other => Err(TeError::configuration(format!(
                "record payload must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn fields(&self) -> &TeFields {
        &self.fields
    }

    pub fn ingested_at(&self) -> DateTime<Utc> {
        self.ingested_at
    }

    /// Returns the value of a field, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns true when the record carries the field, even if it is null.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns a copy of this record re-tagged with another source.
    ///
    /// Batch and stream runners use this so the `source` argument of a run
    /// always wins over whatever tag the caller attached.
    pub fn retagged(&self, source: &str) -> Self {
        if self.source == source {
            return self.clone();
        }
        TeRecord {
            source: source.to_string(),
            fields: self.fields.clone(),
            ingested_at: self.ingested_at,
        }
    }

    /// Serializes the untouched record as a raw-zone JSON document.
    pub fn to_raw_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Convenience alias for working on batches of records.
pub type TeRecordBatch = Vec<TeRecord>;

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
