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

//! Physical encodings for lake objects.
//!
//! Raw objects are always one JSON document per record. Processed and
//! feature objects encode a whole table as JSONL, CSV or Parquet, optionally
//! compressed with gzip or zstd. Parquet and compression are behind the
//! `parquet` and `compression` features; selecting them in a build without
//! the feature is a configuration error at write time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, TeError};
use crate::table::TeTable;

/// Encoding of processed and feature zone objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeLakeFormat {
    #[default]
    Jsonl,
    Csv,
    Parquet,
}

impl TeLakeFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TeLakeFormat::Jsonl => "jsonl",
            TeLakeFormat::Csv => "csv",
            TeLakeFormat::Parquet => "parquet",
        }
    }
}

/// Compression applied to every lake object after encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeLakeCompression {
    #[default]
    None,
    Gzip,
    Zstd,
}

impl TeLakeCompression {
    /// Suffix appended after the format extension, including the dot.
    pub fn suffix(&self) -> &'static str {
        match self {
            TeLakeCompression::None => "",
            TeLakeCompression::Gzip => ".gz",
            TeLakeCompression::Zstd => ".zst",
        }
    }
}

/// Encodes a table in the requested format.
pub fn encode_table(table: &TeTable, format: TeLakeFormat) -> Result<Vec<u8>> {
    match format {
        TeLakeFormat::Jsonl => encode_jsonl(table),
        TeLakeFormat::Csv => encode_csv(table),
        TeLakeFormat::Parquet => encode_parquet(table),
    }
}

fn encode_jsonl(table: &TeTable) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for row in table.rows() {
        serde_json::to_writer(&mut out, &row)?;
        out.push(b'\n');
    }
    Ok(out)
}

/// Flattens a cell for text-only encodings: strings stay as-is, `null`
/// becomes empty, everything else is written as JSON.
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn encode_csv(table: &TeTable) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(table.column_names())?;
    for index in 0..table.num_rows() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|column| cell_text(&column.values[index]).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }
    writer
        .into_inner()
        .map_err(|err| TeError::Serde(format!("csv: {err}")))
}

#[cfg(feature = "parquet")]
fn encode_parquet(table: &TeTable) -> Result<Vec<u8>> {
    use std::sync::Arc;

    use arrow2::array::{Array, MutableArray, MutableUtf8Array};
    use arrow2::chunk::Chunk;
    use arrow2::datatypes::{DataType, Field, Schema};
    use arrow2::io::parquet::write::{
        CompressionOptions, Encoding, FileWriter, RowGroupIterator, Version, WriteOptions,
    };

    if table.num_columns() == 0 {
        return Err(TeError::Serde(
            "parquet: cannot encode a table without columns".to_string(),
        ));
    }

    let mut arrays: Vec<Arc<dyn Array>> = Vec::with_capacity(table.num_columns());
    let mut fields = Vec::with_capacity(table.num_columns());
    for column in table.columns() {
        let mut array = MutableUtf8Array::<i32>::new();
        for value in &column.values {
            match cell_text(value) {
                Some(text) => array.push(Some(text)),
                None => array.push_null(),
            }
        }
        arrays.push(array.into_arc());
        fields.push(Field::new(column.name.clone(), DataType::Utf8, true));
    }

    let schema = Schema::from(fields);
    let chunk = Chunk::try_new(arrays).map_err(parquet_err)?;

    let options = WriteOptions {
        write_statistics: true,
        compression: CompressionOptions::Uncompressed,
        version: Version::V2,
        data_pagesize_limit: Some(1024 * 1024),
    };
    let encodings: Vec<Vec<Encoding>> = schema
        .fields
        .iter()
        .map(|_| vec![Encoding::Plain])
        .collect();

    let row_groups = RowGroupIterator::try_new(
        vec![arrow2::error::Result::Ok(chunk)].into_iter(),
        &schema,
        options,
        encodings,
    )
    .map_err(parquet_err)?;

    let mut buffer = Vec::new();
    {
        let mut writer = FileWriter::try_new(&mut buffer, schema, options).map_err(parquet_err)?;
        for group in row_groups {
            let group = group.map_err(parquet_err)?;
            writer.write(group).map_err(parquet_err)?;
        }
        writer.end(None).map_err(parquet_err)?;
    }
    Ok(buffer)
}

#[cfg(feature = "parquet")]
fn parquet_err(err: arrow2::error::Error) -> TeError {
    TeError::Serde(format!("parquet: {err}"))
}

#[cfg(not(feature = "parquet"))]
fn encode_parquet(_table: &TeTable) -> Result<Vec<u8>> {
    Err(TeError::configuration(
        "parquet lake format requires the 'parquet' feature",
    ))
}

/// Applies the configured compression.
pub fn compress(payload: Vec<u8>, compression: TeLakeCompression) -> Result<Vec<u8>> {
    match compression {
        TeLakeCompression::None => Ok(payload),
        TeLakeCompression::Gzip | TeLakeCompression::Zstd => codec::compress(&payload, compression),
    }
}

/// Reverses [`compress`].
pub fn decompress(payload: Vec<u8>, compression: TeLakeCompression) -> Result<Vec<u8>> {
    match compression {
        TeLakeCompression::None => Ok(payload),
        TeLakeCompression::Gzip | TeLakeCompression::Zstd => {
            codec::decompress(&payload, compression)
        }
    }
}

#[cfg(feature = "compression")]
mod codec {
    use std::io::{Read, Write};

    use super::TeLakeCompression;
    use crate::errors::Result;

    pub(super) fn compress(payload: &[u8], compression: TeLakeCompression) -> Result<Vec<u8>> {
        match compression {
            TeLakeCompression::Gzip => {
                let mut encoder =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(payload)?;
                Ok(encoder.finish()?)
            }
            TeLakeCompression::Zstd => Ok(zstd::stream::encode_all(payload, 0)?),
            TeLakeCompression::None => Ok(payload.to_vec()),
        }
    }

    pub(super) fn decompress(payload: &[u8], compression: TeLakeCompression) -> Result<Vec<u8>> {
        match compression {
            TeLakeCompression::Gzip => {
                let mut out = Vec::new();
                flate2::read::GzDecoder::new(payload).read_to_end(&mut out)?;
                Ok(out)
            }
            TeLakeCompression::Zstd => Ok(zstd::stream::decode_all(payload)?),
            TeLakeCompression::None => Ok(payload.to_vec()),
        }
    }
}

#[cfg(not(feature = "compression"))]
mod codec {
    use super::TeLakeCompression;
    use crate::errors::{Result, TeError};

    pub(super) fn compress(_payload: &[u8], compression: TeLakeCompression) -> Result<Vec<u8>> {
        Err(unsupported(compression))
    }

    pub(super) fn decompress(_payload: &[u8], compression: TeLakeCompression) -> Result<Vec<u8>> {
        Err(unsupported(compression))
    }

    fn unsupported(compression: TeLakeCompression) -> TeError {
        TeError::configuration(format!(
            "{compression:?} lake compression requires the 'compression' feature"
        ))
    }
}
