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

//! # Source Port
//!
//! This Port defines what it means to "run a query" against a data source.
//! The pipeline only ever sees these three traits, so it does not care
//! whether the rows come from Oracle, another driver, or an in-memory table
//! used by the tests.
//!
//! The lifecycle is: `connect` → `execute` (exactly once) → `fetch_batch`
//! until an empty batch → drop the cursor → `close`.

use crate::domain::entities::{ConnectionDescriptor, QuerySpec, RowBatch};
use crate::domain::errors::Result;

/// Opens connections to a data source.
pub trait SourcePort: Send + Sync {
    /// Establishes a connection.
    ///
    /// Fails with `ExportError::ConnectionError` when the source cannot be
    /// reached or refuses the credentials.
    fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn SourceSession>>;
}

/// One live connection.
///
/// Dropping a session releases the connection; `close` does the same but
/// reports a failure to release.
pub trait SourceSession {
    /// Executes the statement with its positional parameters.
    ///
    /// Fails with `ExportError::QueryError` on bad SQL or execution faults.
    fn execute(&mut self, query: &QuerySpec) -> Result<Box<dyn RowCursor>>;

    fn close(self: Box<Self>) -> Result<()>;
}

/// Forward-only cursor over a result set.
pub trait RowCursor {
    /// Column names in result order.
    fn columns(&self) -> &[String];

    /// Fetches up to `max_rows` rows. An empty batch means the result set is
    /// exhausted.
    ///
    /// Fails with `ExportError::StreamError` if the fetch breaks mid-stream.
    fn fetch_batch(&mut self, max_rows: usize) -> Result<RowBatch>;
}
