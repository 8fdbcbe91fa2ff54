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

use serde_json::{json, Value};
use tessera::clean::steps::{
    clean_drop_below_factory, clean_drop_columns_factory, clean_fill_null_factory,
    clean_trim_strings_factory, TeDedupRows, TeDropBelow,
};
use tessera::clean::{TeCleaningChain, TeCleaningStep};
use tessera::errors::{Result, TeError};
use tessera::table::TeTable;

fn orders() -> TeTable {
    TeTable::new()
        .with_column("item", vec![json!("  iced   tea "), json!("cake"), json!("cake"), json!("soup")])
        .unwrap()
        .with_column("qty", vec![json!(2), json!(0), json!(0), Value::Null])
        .unwrap()
        .with_column("note", vec![Value::Null, json!("x"), json!("x"), Value::Null])
        .unwrap()
}

#[test]
fn TeFTStepsRunInRegistrationOrder() {
    let mut chain = TeCleaningChain::new();
    chain.add_step_fn("append_a", |t: TeTable| {
        Ok(t.map_column("item", |v| json!(format!("{}a", v.as_str().unwrap_or("")))))
    });
    chain.add_step_fn("append_b", |t: TeTable| {
        Ok(t.map_column("item", |v| json!(format!("{}b", v.as_str().unwrap_or("")))))
    });
    assert_eq!(chain.step_names(), vec!["append_a", "append_b"]);

    let cleaned = chain
        .clean(TeTable::new().with_column("item", vec![json!("")]).unwrap())
        .unwrap();
    assert_eq!(cleaned.column("item").unwrap().values, vec![json!("ab")]);
}

#[test]
fn TeFTFailingStepStopsTheChain() {
    let mut chain = TeCleaningChain::new();
    chain.add_step_fn("explode", |_t: TeTable| -> Result<TeTable> {
        Err(TeError::internal("bad column"))
    });
    chain.add_step_fn("never", |_t: TeTable| -> Result<TeTable> {
        panic!("must not run");
    });

    let err = chain.clean(orders()).unwrap_err();
    match err {
        TeError::Cleaning { step, message } => {
            assert_eq!(step, "explode");
            assert!(message.contains("bad column"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn TeFTPanickingStepBecomesCleaningError() {
    let mut chain = TeCleaningChain::new();
    chain.add_step_fn("panics", |_t: TeTable| -> Result<TeTable> { panic!("boom") });
    let err = chain.clean(orders()).unwrap_err();
    assert_eq!(err.kind(), "cleaning");
}

#[test]
fn TeFTDropBelowKeepsNonNumericRows() {
    let inclusive = TeDropBelow::new("qty", 0.0, true).apply(orders()).unwrap();
    assert_eq!(inclusive.num_rows(), 2);
    assert_eq!(inclusive.column("qty").unwrap().values, vec![json!(2), Value::Null]);

    let strict = TeDropBelow::new("qty", 0.0, false).apply(orders()).unwrap();
    assert_eq!(strict.num_rows(), 4);
}

#[test]
fn TeFTBuiltInStepsFromConfig() {
    let mut chain = TeCleaningChain::new();
    chain.add_step(clean_trim_strings_factory(&Value::Null).unwrap());
    chain.add_step(clean_fill_null_factory(&json!({"column": "qty", "value": 1})).unwrap());
    chain.add_step(clean_drop_below_factory(&json!({"column": "qty", "threshold": 0})).unwrap());
    chain.add_step(clean_drop_columns_factory(&json!({"columns": ["note"]})).unwrap());
    chain.add_step(Box::new(TeDedupRows));

    let cleaned = chain.clean(orders()).unwrap();
    assert_eq!(cleaned.column_names(), vec!["item", "qty"]);
    assert_eq!(
        cleaned.column("item").unwrap().values,
        vec![json!("iced tea"), json!("soup")]
    );
    assert_eq!(cleaned.column("qty").unwrap().values, vec![json!(2), json!(1)]);
}

#[test]
fn TeFTDedupKeepsFirstOccurrence() {
    let deduped = TeDedupRows.apply(orders()).unwrap();
    assert_eq!(deduped.num_rows(), 3);
    assert_eq!(deduped.column("item").unwrap().values[1], json!("cake"));
}

#[test]
fn TeFTStepFactoriesRejectBadConfig() {
    assert!(clean_fill_null_factory(&json!({"column": "qty"})).is_err());
    assert!(clean_drop_below_factory(&json!({"column": "qty", "threshold": "low"})).is_err());
    assert!(clean_drop_columns_factory(&json!({"columns": [1]})).is_err());
}
