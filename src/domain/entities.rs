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

//! # Domain Entities
//!
//! The "Nouns" of the exporter: what to run (`QuerySpec`), where to run it
//! (`ConnectionDescriptor`), where the result goes (`JobDescriptor`), the
//! rows travelling through the pipeline (`RowBatch`) and the report card of
//! a finished job (`JobResult`).

use crate::domain::timing::TimingReport;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Rows fetched per round trip when nothing else is configured.
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// A positional bind parameter.
///
/// Deserialised from plain scalars: `42` is an integer, `1.5` a float,
/// `"2024-01-31"` a date, anything else text, and `null` a NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    Null,
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Text(String),
}

/// What to execute: statement text, positional parameters and the fetch
/// chunk size. Built once by the caller and only ever read afterwards.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    sql: String,
    params: Vec<QueryParam>,
    batch_size: usize,
}

impl QuerySpec {
    pub fn new(sql: impl Into<String>, params: Vec<QueryParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Overrides the fetch chunk size. Zero is clamped to one row.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[QueryParam] {
        &self.params
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

/// A single column value exactly as the source produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

pub type Row = Vec<FieldValue>;

/// One fetch worth of rows plus the column names they belong to.
///
/// Batches are never kept around: the streamer drops each one as soon as the
/// encoder has consumed it.
#[derive(Debug, Clone)]
pub struct RowBatch {
    pub columns: Arc<[String]>,
    pub rows: Vec<Row>,
}

impl RowBatch {
    pub fn new(columns: Arc<[String]>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// An empty batch signals that the cursor is exhausted.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Where and as whom to connect.
#[derive(Clone, Default)]
pub struct ConnectionDescriptor {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub service: String,
    /// Full connect string; takes precedence over host/port/service.
    pub connection_string: Option<String>,
    /// Rows the driver prefetches with the execute round trip.
    pub prefetch_rows: Option<u32>,
}

impl ConnectionDescriptor {
    /// Returns the EZConnect string (`//host:port/service`) unless an explicit
    /// connection string was configured.
    pub fn connect_string(&self) -> String {
        match &self.connection_string {
            Some(s) => s.clone(),
            None => format!("//{}:{}/{}", self.host, self.port, self.service),
        }
    }
}

// Hand-written so credentials never end up in logs.
impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connect_string", &self.connect_string())
            .field("prefetch_rows", &self.prefetch_rows)
            .finish()
    }
}

/// A fully resolved unit of work for the job runner.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    pub name: String,
    pub connection: ConnectionDescriptor,
    pub query: QuerySpec,
    /// Final path of the published file.
    pub destination: PathBuf,
    /// Logged once the job has published successfully.
    pub done_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Success,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Success => write!(f, "SUCCESS"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Counts produced by one successful pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    /// Data rows published, header excluded.
    pub rows: u64,
    /// Size of the published file.
    pub bytes: u64,
}

/// `JobResult` is the "Report Card" for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub name: String,
    pub destination: String,
    pub rows: u64,
    pub bytes: u64,
    /// Wall-clock seconds for the whole job.
    pub duration: f64,
    pub status: JobStatus,
    pub error: Option<String>,
    pub timing: Option<TimingReport>,
}

impl JobResult {
    pub fn success(job: &JobDescriptor, summary: ExportSummary, timing: TimingReport) -> Self {
        Self {
            name: job.name.clone(),
            destination: job.destination.display().to_string(),
            rows: summary.rows,
            bytes: summary.bytes,
            duration: timing.total_secs,
            status: JobStatus::Success,
            error: None,
            timing: Some(timing),
        }
    }

    pub fn failure(job: &JobDescriptor, error: String, timing: TimingReport) -> Self {
        Self {
            name: job.name.clone(),
            destination: job.destination.display().to_string(),
            rows: 0,
            bytes: 0,
            duration: timing.total_secs,
            status: JobStatus::Failed,
            error: Some(error),
            timing: Some(timing),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }
}
