// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Local Staging Writer
//!
//! Encodes row batches into a CSV file on local disk before anything touches
//! the shared destination.
//!
//! - **Unique file**: created through `tempfile` inside the staging
//!   directory, so concurrent runs never collide.
//! - **Scoped cleanup**: the file is deleted when the writer or the
//!   `StagedFile` is dropped, on success and on every error path.
//! - **One buffered stream**: the CSV writer's own buffer is sized to the
//!   configured capacity (4 MiB by default) to keep syscalls rare.

use crate::domain::entities::{FieldValue, RowBatch};
use crate::domain::errors::{ExportError, Result};
use crate::ports::batch_sink::BatchSink;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use log::warn;
use std::borrow::Cow;
use std::fs::File;
use std::path::Path;
use tempfile::NamedTempFile;

pub const DEFAULT_WRITE_BUFFER_BYTES: usize = 4 * 1024 * 1024;

/// Writes the header and every batch into a fresh staging file.
pub struct StagingWriter {
    wtr: csv::Writer<File>,
    staging: NamedTempFile,
    width: usize,
    rows_written: u64,
}

impl StagingWriter {
    /// Creates the staging file in `dir` and writes the header row.
    pub fn create(dir: &Path, buffer_capacity: usize, columns: &[String]) -> Result<Self> {
        let staging = tempfile::Builder::new()
            .prefix("report-export-")
            .suffix(".csv")
            .tempfile_in(dir)?;
        let file = staging.as_file().try_clone()?;

        let mut wtr = WriterBuilder::new()
            .delimiter(b',')
            .terminator(Terminator::Any(b'\n'))
            .quote_style(QuoteStyle::Necessary)
            .buffer_capacity(buffer_capacity.max(8 * 1024))
            .from_writer(file);

        wtr.write_record(columns)?;

        Ok(Self {
            wtr,
            staging,
            width: columns.len(),
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        self.staging.path()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flushes everything to disk and hands the file over for publishing.
    pub fn finish(mut self) -> Result<StagedFile> {
        self.wtr.flush()?;
        let file = self.staging.as_file();
        file.sync_all()?;
        let bytes = file.metadata()?.len();

        Ok(StagedFile {
            file: self.staging,
            rows: self.rows_written,
            bytes,
        })
    }
}

impl BatchSink for StagingWriter {
    fn write_batch(&mut self, batch: &RowBatch) -> Result<u64> {
        for row in &batch.rows {
            if row.len() != self.width {
                return Err(ExportError::EncodingError(format!(
                    "row {} has {} values, header has {}",
                    self.rows_written + 1,
                    row.len(),
                    self.width
                )));
            }
            let record = row
                .iter()
                .map(encode_field)
                .collect::<Result<Vec<Cow<'_, str>>>>()?;
            self.wtr.write_record(record.iter().map(|f| f.as_bytes()))?;
            self.rows_written += 1;
        }
        Ok(batch.len() as u64)
    }
}

/// Renders one value as CSV field text. Quoting is left to the CSV writer.
pub fn encode_field(value: &FieldValue) -> Result<Cow<'_, str>> {
    let text = match value {
        FieldValue::Null => Cow::Borrowed(""),
        FieldValue::Text(s) => Cow::Borrowed(s.as_str()),
        FieldValue::Integer(v) => Cow::Owned(v.to_string()),
        FieldValue::Float(v) if v.is_finite() => Cow::Owned(v.to_string()),
        FieldValue::Float(v) => {
            return Err(ExportError::EncodingError(format!(
                "non-finite number {} cannot be written",
                v
            )))
        }
        FieldValue::Date(d) => Cow::Owned(d.format("%Y-%m-%d").to_string()),
        FieldValue::DateTime(dt) => {
            if dt.and_utc().timestamp_subsec_nanos() == 0 {
                Cow::Owned(dt.format("%Y-%m-%d %H:%M:%S").to_string())
            } else {
                Cow::Owned(dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string())
            }
        }
        FieldValue::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => Cow::Borrowed(s),
            Err(e) => {
                return Err(ExportError::EncodingError(format!(
                    "binary value is not valid UTF-8: {}",
                    e
                )))
            }
        },
    };
    Ok(text)
}

/// A completed staging file waiting to be published.
///
/// The file is removed when this value is dropped; `discard` does the same
/// and logs a failure instead of ignoring it.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
    rows: u64,
    bytes: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Data rows, header excluded.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Deletes the staging file. Failure is logged, never returned.
    pub fn discard(self) {
        let path = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            warn!(
                "Could not remove staging file {}: {}",
                path.display(),
                e
            );
        }
    }
}
