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

//! Core error definitions for the report exporter.
//!
//! Every failure of a job maps to exactly one of these variants. None of them
//! is retried automatically: the error surfaces to the job runner, which
//! records it and moves on to the next job.

use thiserror::Error;

/// Error types encountered while exporting and publishing a report.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The data source could not be reached or rejected the credentials.
    #[error("Connection failed: {0}")]
    ConnectionError(String),

    /// The statement could not be prepared or executed.
    #[error("Query failed: {0}")]
    QueryError(String),

    /// A fetch failed part-way through the result set.
    #[error("Streaming failed: {0}")]
    StreamError(String),

    /// A value cannot be represented in the output file.
    #[error("Encoding failed: {0}")]
    EncodingError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Copy or rename into the destination failed. The previous export at
    /// `path` is still intact.
    #[error("Publish to {path} failed: {reason}")]
    PublishError { path: String, reason: String },
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            match e.into_kind() {
                csv::ErrorKind::Io(io) => ExportError::IoError(io),
                other => ExportError::EncodingError(format!("{:?}", other)),
            }
        } else {
            ExportError::EncodingError(e.to_string())
        }
    }
}

/// A specialized Result type for the report exporter.
pub type Result<T> = std::result::Result<T, ExportError>;
