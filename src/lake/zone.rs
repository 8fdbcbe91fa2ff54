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

//! Lake zones, their partition layout, and the clock that stamps them.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Logical partition of the data lake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeZone {
    Raw,
    Processed,
    Feature,
}

impl TeZone {
    pub const ALL: [TeZone; 3] = [TeZone::Raw, TeZone::Processed, TeZone::Feature];

    pub fn as_str(&self) -> &'static str {
        match self {
            TeZone::Raw => "raw",
            TeZone::Processed => "processed",
            TeZone::Feature => "feature",
        }
    }

    /// Dataset directory for a source inside this zone.
    pub fn dataset(&self, source: &str) -> String {
        match self {
            TeZone::Raw => source.to_string(),
            TeZone::Processed => format!("{source}_processed"),
            TeZone::Feature => format!("{source}_features"),
        }
    }

    /// Time partition: `YYYY/MM/DD/HH` for raw, `YYYY/MM/DD` otherwise.
    pub fn partition_suffix(&self, at: DateTime<Utc>) -> String {
        match self {
            TeZone::Raw => at.format("%Y/%m/%d/%H").to_string(),
            TeZone::Processed | TeZone::Feature => at.format("%Y/%m/%d").to_string(),
        }
    }
}

impl fmt::Display for TeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of "now" for partition paths.
pub trait TeClock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TeSystemClock;

impl TeClock for TeSystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for deterministic partitions in tests and replays.
#[derive(Debug)]
pub struct TeFixedClock {
    at: Mutex<DateTime<Utc>>,
}

impl TeFixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        TeFixedClock { at: Mutex::new(at) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.at.lock().unwrap_or_else(|p| p.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut at = self.at.lock().unwrap_or_else(|p| p.into_inner());
        *at = *at + by;
    }
}

impl TeClock for TeFixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.at.lock().unwrap_or_else(|p| p.into_inner())
    }
}
