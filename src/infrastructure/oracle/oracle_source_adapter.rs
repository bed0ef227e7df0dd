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

//! Infrastructure adapter that runs report queries against Oracle.
//!
//! A logical batch is filled from the driver's fetch array, which is sized
//! to the batch but capped at `MAX_FETCH_ARRAY_SIZE` rows. The driver
//! allocates the array up front at each column's maximum width. Large
//! batches take several round trips.

use crate::domain::entities::{
    ConnectionDescriptor, FieldValue, QueryParam, QuerySpec, Row, RowBatch,
};
use crate::domain::errors::{ExportError, Result};
use crate::ports::source_port::{RowCursor, SourcePort, SourceSession};
use chrono::NaiveDateTime;
use log::{debug, info};
use oracle::sql_type::{OracleType, ToSql};
use oracle::{Connection, ResultSet};
use std::sync::Arc;

/// Upper bound on rows per driver round trip.
pub const MAX_FETCH_ARRAY_SIZE: u32 = 10_000;

/// Driver fetch array size for a logical batch of `batch_size` rows.
fn fetch_array_size(batch_size: usize) -> u32 {
    u32::try_from(batch_size)
        .unwrap_or(u32::MAX)
        .clamp(1, MAX_FETCH_ARRAY_SIZE)
}

/// Concrete implementation of `SourcePort` for Oracle databases.
#[derive(Debug, Default)]
pub struct OracleSourceAdapter;

impl OracleSourceAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SourcePort for OracleSourceAdapter {
    fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn SourceSession>> {
        let conn_str = descriptor.connect_string();
        info!("Connecting to {} as {}", conn_str, descriptor.username);

        let conn = Connection::connect(&descriptor.username, &descriptor.password, &conn_str)
            .map_err(|e| ExportError::ConnectionError(format!("{}: {}", conn_str, e)))?;

        Ok(Box::new(OracleSession {
            conn,
            prefetch_rows: descriptor.prefetch_rows,
        }))
    }
}

/// A live Oracle connection. Dropping it closes the connection.
struct OracleSession {
    conn: Connection,
    prefetch_rows: Option<u32>,
}

impl SourceSession for OracleSession {
    fn execute(&mut self, query: &QuerySpec) -> Result<Box<dyn RowCursor>> {
        let mut builder = self.conn.statement(query.sql());
        builder.fetch_array_size(fetch_array_size(query.batch_size()));
        if let Some(prefetch) = self.prefetch_rows {
            builder.prefetch_rows(prefetch);
        }
        let stmt = builder
            .build()
            .map_err(|e| ExportError::QueryError(e.to_string()))?;

        let params: Vec<&dyn ToSql> = query.params().iter().map(bind_value).collect();
        let rows: ResultSet<'static, oracle::Row> = stmt
            .into_result_set(&params)
            .map_err(|e| ExportError::QueryError(e.to_string()))?;

        let col_infos = rows.column_info();
        let columns: Arc<[String]> = col_infos.iter().map(|c| c.name().to_string()).collect();
        let col_types: Vec<OracleType> =
            col_infos.iter().map(|c| c.oracle_type().clone()).collect();
        debug!("Query returned {} columns: {:?}", columns.len(), columns);

        Ok(Box::new(OracleRowCursor {
            rows,
            columns,
            col_types,
        }))
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .map_err(|e| ExportError::ConnectionError(format!("close failed: {}", e)))
    }
}

fn bind_value(param: &QueryParam) -> &dyn ToSql {
    match param {
        QueryParam::Null => &None::<i64>,
        QueryParam::Integer(v) => v,
        QueryParam::Float(v) => v,
        QueryParam::Date(d) => d,
        QueryParam::Text(s) => s,
    }
}

/// Forward-only cursor over an Oracle result set.
struct OracleRowCursor {
    rows: ResultSet<'static, oracle::Row>,
    columns: Arc<[String]>,
    col_types: Vec<OracleType>,
}

impl RowCursor for OracleRowCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn fetch_batch(&mut self, max_rows: usize) -> Result<RowBatch> {
        let mut batch = Vec::with_capacity(max_rows.min(64 * 1024));
        while batch.len() < max_rows {
            match self.rows.next() {
                Some(row_res) => {
                    let row = row_res.map_err(|e| ExportError::StreamError(e.to_string()))?;
                    batch.push(convert_row(&row, &self.col_types)?);
                }
                None => break,
            }
        }
        Ok(RowBatch::new(self.columns.clone(), batch))
    }
}

fn convert_row(row: &oracle::Row, col_types: &[OracleType]) -> Result<Row> {
    col_types
        .iter()
        .enumerate()
        .map(|(i, otype)| convert_value(row, i, otype))
        .collect()
}

/// Reads column `i` without reformatting it. Numbers are taken in Oracle's
/// own text form so no precision is lost on the way to the file.
fn convert_value(row: &oracle::Row, i: usize, otype: &OracleType) -> Result<FieldValue> {
    let fetch_err = |e: oracle::Error| ExportError::StreamError(format!("column {}: {}", i, e));

    let value = match otype {
        OracleType::Int64 => {
            let v: Option<i64> = row.get(i).map_err(fetch_err)?;
            v.into()
        }
        OracleType::Date | OracleType::Timestamp(_) => {
            let v: Option<NaiveDateTime> = row.get(i).map_err(fetch_err)?;
            v.map(FieldValue::DateTime).unwrap_or(FieldValue::Null)
        }
        OracleType::Raw(_) | OracleType::BLOB => {
            let v: Option<Vec<u8>> = row.get(i).map_err(fetch_err)?;
            v.map(FieldValue::Bytes).unwrap_or(FieldValue::Null)
        }
        _ => {
            let v: Option<String> = row.get(i).map_err(fetch_err)?;
            v.into()
        }
    };
    Ok(value)
}
