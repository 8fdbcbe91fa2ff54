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

//! Append-only store of records that failed validation.
//!
//! The store is shared between every concurrent validation call, so appends
//! go through a mutex. Entries are only ever removed by an operator calling
//! [`TeQuarantine::drain`].

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::TeRecord;

/// A record held back by validation, with the fields that failed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeQuarantinedRecord {
    pub record: TeRecord,
    pub invalid_fields: Vec<String>,
    pub quarantined_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct TeQuarantine {
    entries: Mutex<Vec<TeQuarantinedRecord>>,
}

impl TeQuarantine {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-pushed entry behind,
    // so a poisoned store is still consistent.
    fn entries(&self) -> MutexGuard<'_, Vec<TeQuarantinedRecord>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, record: TeRecord, invalid_fields: Vec<String>) {
        let entry = TeQuarantinedRecord {
            record,
            invalid_fields,
            quarantined_at: Utc::now(),
        };
        self.entries().push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Copies the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<TeQuarantinedRecord> {
        self.entries().clone()
    }

    /// Removes and returns every entry, oldest first.
    pub fn drain(&self) -> Vec<TeQuarantinedRecord> {
        std::mem::take(&mut *self.entries())
    }
}
