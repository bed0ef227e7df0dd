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

//! In-memory `SourcePort` serving a fixed table.
//!
//! Used to drive the pipeline without a database, including fault
//! injection at connect, execute, or after a given number of rows.

use crate::domain::entities::{ConnectionDescriptor, QuerySpec, Row, RowBatch};
use crate::domain::errors::{ExportError, Result};
use crate::ports::source_port::{RowCursor, SourcePort, SourceSession};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Where an `InMemorySource` should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    #[default]
    None,
    Connect,
    Execute,
    /// The fetch following the first `n` rows fails.
    AfterRows(usize),
}

#[derive(Debug, Default)]
struct Counters {
    open_sessions: AtomicUsize,
    executions: AtomicUsize,
    fetch_sizes: Mutex<Vec<usize>>,
}

/// A table held in memory, served through the same port as a database.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    columns: Arc<[String]>,
    rows: Arc<Vec<Row>>,
    fault: Fault,
    counters: Arc<Counters>,
}

impl InMemorySource {
    pub fn new(columns: &[&str], rows: Vec<Row>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Arc::new(rows),
            fault: Fault::None,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = fault;
        self
    }

    /// Sessions connected and not yet closed or dropped.
    pub fn open_sessions(&self) -> usize {
        self.counters.open_sessions.load(Ordering::SeqCst)
    }

    pub fn executions(&self) -> usize {
        self.counters.executions.load(Ordering::SeqCst)
    }

    /// Sizes of every non-empty batch handed out, in order.
    pub fn fetch_sizes(&self) -> Vec<usize> {
        self.counters
            .fetch_sizes
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

impl SourcePort for InMemorySource {
    fn connect(&self, _descriptor: &ConnectionDescriptor) -> Result<Box<dyn SourceSession>> {
        if self.fault == Fault::Connect {
            return Err(ExportError::ConnectionError(
                "in-memory source refused the connection".into(),
            ));
        }
        self.counters.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemorySession {
            source: self.clone(),
        }))
    }
}

struct InMemorySession {
    source: InMemorySource,
}

impl SourceSession for InMemorySession {
    fn execute(&mut self, _query: &QuerySpec) -> Result<Box<dyn RowCursor>> {
        if self.source.fault == Fault::Execute {
            return Err(ExportError::QueryError("invalid statement".into()));
        }
        self.source.counters.executions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryCursor {
            source: self.source.clone(),
            position: 0,
        }))
    }

    fn close(self: Box<Self>) -> Result<()> {
        // Drop does the bookkeeping.
        Ok(())
    }
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        self.source
            .counters
            .open_sessions
            .fetch_sub(1, Ordering::SeqCst);
    }
}

struct InMemoryCursor {
    source: InMemorySource,
    position: usize,
}

impl RowCursor for InMemoryCursor {
    fn columns(&self) -> &[String] {
        &self.source.columns
    }

    fn fetch_batch(&mut self, max_rows: usize) -> Result<RowBatch> {
        if let Fault::AfterRows(n) = self.source.fault {
            if self.position >= n {
                return Err(ExportError::StreamError(format!(
                    "connection reset after {} rows",
                    self.position
                )));
            }
        }

        let mut end = (self.position + max_rows).min(self.source.rows.len());
        if let Fault::AfterRows(n) = self.source.fault {
            end = end.min(n.max(self.position));
        }
        let rows = self.source.rows[self.position..end].to_vec();
        self.position = end;

        if !rows.is_empty() {
            if let Ok(mut sizes) = self.source.counters.fetch_sizes.lock() {
                sizes.push(rows.len());
            }
        }
        Ok(RowBatch::new(self.source.columns.clone(), rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::FieldValue;

    fn numbers(n: i64) -> InMemorySource {
        let rows = (0..n).map(|i| vec![FieldValue::Integer(i)]).collect();
        InMemorySource::new(&["N"], rows)
    }

    #[test]
    fn test_batches_until_exhausted() {
        let source = numbers(5);
        let mut session = source.connect(&ConnectionDescriptor::default()).unwrap();
        let mut cursor = session
            .execute(&QuerySpec::new("SELECT N FROM T", vec![]))
            .unwrap();

        assert_eq!(cursor.columns(), &["N".to_string()]);
        assert_eq!(cursor.fetch_batch(2).unwrap().len(), 2);
        assert_eq!(cursor.fetch_batch(2).unwrap().len(), 2);
        assert_eq!(cursor.fetch_batch(2).unwrap().len(), 1);
        assert!(cursor.fetch_batch(2).unwrap().is_empty());
        assert_eq!(source.fetch_sizes(), vec![2, 2, 1]);
    }

    #[test]
    fn test_fault_after_rows() {
        let source = numbers(10).with_fault(Fault::AfterRows(3));
        let mut session = source.connect(&ConnectionDescriptor::default()).unwrap();
        let mut cursor = session.execute(&QuerySpec::new("q", vec![])).unwrap();

        assert_eq!(cursor.fetch_batch(2).unwrap().len(), 2);
        assert_eq!(cursor.fetch_batch(2).unwrap().len(), 1);
        assert!(matches!(
            cursor.fetch_batch(2),
            Err(ExportError::StreamError(_))
        ));
    }

    #[test]
    fn test_sessions_released_on_drop_and_close() {
        let source = numbers(1);
        let s1 = source.connect(&ConnectionDescriptor::default()).unwrap();
        let s2 = source.connect(&ConnectionDescriptor::default()).unwrap();
        assert_eq!(source.open_sessions(), 2);

        drop(s1);
        assert_eq!(source.open_sessions(), 1);
        s2.close().unwrap();
        assert_eq!(source.open_sessions(), 0);
    }
}
