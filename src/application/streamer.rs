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

//! # Row Streamer
//!
//! Drains a cursor into a sink one batch at a time. Only the batch being
//! encoded is held in memory, so the result set can be arbitrarily large.

use crate::domain::errors::{ExportError, Result};
use crate::ports::batch_sink::BatchSink;
use crate::ports::source_port::RowCursor;
use log::debug;

/// Streams every row of `cursor` into `sink` and returns the row count.
///
/// Stops at the first empty batch. A failing fetch is reported as a
/// `StreamError` carrying the number of rows already streamed, and so is a
/// sink that accepts fewer rows than it was handed.
pub fn stream_rows(
    cursor: &mut dyn RowCursor,
    batch_size: usize,
    sink: &mut dyn BatchSink,
) -> Result<u64> {
    let batch_size = batch_size.max(1);
    let mut total: u64 = 0;
    let mut batches: u64 = 0;

    loop {
        let batch = cursor.fetch_batch(batch_size).map_err(|e| match e {
            ExportError::StreamError(reason) => {
                ExportError::StreamError(format!("after {} rows: {}", total, reason))
            }
            other => other,
        })?;
        if batch.is_empty() {
            break;
        }

        let fetched = batch.len() as u64;
        let written = sink.write_batch(&batch)?;
        if written != fetched {
            return Err(ExportError::StreamError(format!(
                "after {} rows: sink wrote {} of {} fetched rows",
                total, written, fetched
            )));
        }
        total += fetched;
        batches += 1;
        debug!("Batch {}: {} rows (total {})", batches, batch.len(), total);
    }

    Ok(total)
}
