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

//! # Runners
//!
//! [`TeBatchRunner`] pushes many records of one source through a shared
//! [`TePipeline`]; [`TeStreamRunner`] handles one event at a time and
//! returns its result directly.
//!
//! Each batch record runs in its own task, bounded by a semaphore. A record
//! that errors or panics is counted as failed and never affects its
//! siblings. Cancelling a batch stops new records from launching while
//! records already running are allowed to finish.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::errors::{Result, TeError};
use crate::pipeline::{TePipeline, TeRunResult, TeRunStatus};
use crate::record::TeRecord;

/// Outcome of one launched batch record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeRecordOutcome {
    /// Position of the record in the input batch.
    pub index: usize,
    pub status: TeRunStatus,
    pub result: Option<TeRunResult>,
    pub error: Option<TeError>,
}

impl TeRecordOutcome {
    fn from_result(index: usize, outcome: Result<TeRunResult>) -> Self {
        match outcome {
            Ok(result) => TeRecordOutcome {
                index,
                status: result.status,
                result: Some(result),
                error: None,
            },
            Err(err) => TeRecordOutcome {
                index,
                status: TeRunStatus::Error,
                result: None,
                error: Some(err),
            },
        }
    }
}

/// Aggregate counts of one batch.
///
/// `processed` counts launched records and equals `successful + failed`;
/// `failed` is `quarantined + errored`. Records never launched because the
/// batch was cancelled are only counted in `cancelled`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeBatchReport {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub quarantined: usize,
    pub errored: usize,
    pub cancelled: usize,
    /// One entry per launched record, in input order.
    pub outcomes: Vec<TeRecordOutcome>,
}

impl TeBatchReport {
    fn push(&mut self, outcome: TeRecordOutcome) {
        self.processed += 1;
        match outcome.status {
            TeRunStatus::Success => self.successful += 1,
            TeRunStatus::Quarantined => {
                self.failed += 1;
                self.quarantined += 1;
            }
            TeRunStatus::Error => {
                self.failed += 1;
                self.errored += 1;
            }
        }
        self.outcomes.push(outcome);
    }
}

#[derive(Debug, Clone)]
pub struct TeBatchRunner {
    pipeline: Arc<TePipeline>,
    concurrency: usize,
    cancellation: CancellationToken,
}

impl TeBatchRunner {
    /// Creates a runner using the pipeline's configured batch concurrency.
    pub fn new(pipeline: Arc<TePipeline>) -> Self {
        let concurrency = pipeline.batch_concurrency().max(1);
        TeBatchRunner {
            pipeline,
            concurrency,
            cancellation: CancellationToken::new(),
        }
    }

    /// Maximum number of records in flight. `1` runs the batch sequentially.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Processes every record, re-tagged with `source`.
    pub async fn process_batch(&self, records: Vec<TeRecord>, source: &str) -> TeBatchReport {
        let total = records.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles: Vec<(usize, JoinHandle<Result<TeRunResult>>)> = Vec::with_capacity(total);
        let mut report = TeBatchReport::default();

        log::info!(
            "runner.batch: batch started - source={}, records={}, concurrency={}",
            source,
            total,
            self.concurrency
        );

        for (index, record) in records.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                report.cancelled = total - index;
                log::warn!(
                    "runner.batch: batch cancelled - source={}, launched={}, cancelled={}",
                    source,
                    index,
                    report.cancelled
                );
                break;
            };

            let pipeline = Arc::clone(&self.pipeline);
            let record = record.retagged(source);
            let handle = tokio::spawn(async move {
                let _permit = permit;
                pipeline.process(&record).await
            });
            handles.push((index, handle));
        }

        for (index, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    self.pipeline.metrics().record_errored();
                    log::error!(
                        "runner.batch: record task aborted - source={}, index={}, error={}",
                        source,
                        index,
                        join_err
                    );
                    Err(TeError::internal(format!("record task aborted: {join_err}")))
                }
            };
            report.push(TeRecordOutcome::from_result(index, outcome));
        }

        log::info!(
            "runner.batch: batch finished - source={}, processed={}, successful={}, failed={}, cancelled={}",
            source,
            report.processed,
            report.successful,
            report.failed,
            report.cancelled
        );
        report
    }

    /// Processes JSON objects as records of `source`. Values that are not
    /// objects become errored outcomes.
    pub async fn process_values(&self, values: Vec<Value>, source: &str) -> TeBatchReport {
        let mut records = Vec::with_capacity(values.len());
        let mut rejected = Vec::new();
        for (index, value) in values.into_iter().enumerate() {
            match TeRecord::from_value(source, value) {
                Ok(record) => records.push((index, record)),
                Err(err) => rejected.push((index, err)),
            }
        }
        if rejected.is_empty() {
            return self
                .process_batch(records.into_iter().map(|(_, r)| r).collect(), source)
                .await;
        }

        let positions: Vec<usize> = records.iter().map(|(index, _)| *index).collect();
        let inner = self
            .process_batch(records.into_iter().map(|(_, r)| r).collect(), source)
            .await;

        let mut outcomes: Vec<TeRecordOutcome> = inner
            .outcomes
            .into_iter()
            .map(|mut outcome| {
                outcome.index = positions[outcome.index];
                outcome
            })
            .collect();
        let mut report = TeBatchReport {
            cancelled: inner.cancelled,
            ..TeBatchReport::default()
        };
        for (index, err) in rejected {
            self.pipeline.metrics().record_received();
            self.pipeline.metrics().record_errored();
            outcomes.push(TeRecordOutcome::from_result(index, Err(err)));
        }
        outcomes.sort_by_key(|outcome| outcome.index);
        for outcome in outcomes {
            report.push(outcome);
        }
        report
    }
}

/// Single-event entry point for streaming callers.
#[derive(Debug, Clone)]
pub struct TeStreamRunner {
    pipeline: Arc<TePipeline>,
}

impl TeStreamRunner {
    pub fn new(pipeline: Arc<TePipeline>) -> Self {
        TeStreamRunner { pipeline }
    }

    pub fn pipeline(&self) -> &Arc<TePipeline> {
        &self.pipeline
    }

    pub async fn process_event(&self, record: &TeRecord, source: &str) -> Result<TeRunResult> {
        self.pipeline.process(&record.retagged(source)).await
    }
}
