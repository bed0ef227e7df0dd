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

//! # Export Pipeline
//!
//! Runs one job end to end, strictly in sequence:
//!
//! `CONNECT` → `EXECUTE` → `STREAM_TO_STAGING` → `COPY_TO_DESTINATION` →
//! `RENAME_ON_DESTINATION` → `CLEANUP`
//!
//! Each step is timed under that label. All I/O is blocking and there is no
//! timeout: a fetch that never returns stalls the job.

use crate::application::streamer::stream_rows;
use crate::domain::entities::{ExportSummary, JobDescriptor};
use crate::domain::errors::{ExportError, Result};
use crate::domain::timing::TimingCollector;
use crate::infrastructure::local_storage::publisher::{PublishTarget, Publisher};
use crate::infrastructure::local_storage::staging_writer::{
    StagedFile, StagingWriter, DEFAULT_WRITE_BUFFER_BYTES,
};
use crate::ports::source_port::{RowCursor, SourcePort, SourceSession};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Instant;

/// Local-side settings shared by every job of a run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Directory for staging files. Assumed local, fast and large enough.
    pub staging_dir: PathBuf,
    pub write_buffer_bytes: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            staging_dir: std::env::temp_dir(),
            write_buffer_bytes: DEFAULT_WRITE_BUFFER_BYTES,
        }
    }
}

pub struct ExportPipeline<'a> {
    source: &'a dyn SourcePort,
    settings: &'a PipelineSettings,
    publisher: Publisher,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(source: &'a dyn SourcePort, settings: &'a PipelineSettings) -> Self {
        Self {
            source,
            settings,
            publisher: Publisher::new(),
        }
    }

    /// Exports `job` and publishes it. The connection is released on every
    /// path; a failure leaves the previous file at the destination intact.
    pub fn run(&self, job: &JobDescriptor, timing: &mut TimingCollector) -> Result<ExportSummary> {
        let target = PublishTarget::new(&job.destination)?;

        let mut session = timing.time("CONNECT", || self.source.connect(&job.connection))?;
        let outcome = self.extract_and_publish(session.as_mut(), job, &target, timing);

        timing.time("CLEANUP", || {
            if let Err(e) = session.close() {
                warn!("[{}] Connection did not close cleanly: {}", job.name, e);
            }
        });

        outcome
    }

    fn extract_and_publish(
        &self,
        session: &mut dyn SourceSession,
        job: &JobDescriptor,
        target: &PublishTarget,
        timing: &mut TimingCollector,
    ) -> Result<ExportSummary> {
        let mut cursor = timing.time("EXECUTE", || session.execute(&job.query))?;

        let staged = timing.time("STREAM_TO_STAGING", || {
            self.stage(cursor.as_mut(), job)
        })?;
        drop(cursor);

        let rows = staged.rows();
        let bytes = self.publisher.publish(staged, target, timing)?;
        Ok(ExportSummary { rows, bytes })
    }

    /// Streams the cursor into a new staging file and cross-checks counts.
    fn stage(&self, cursor: &mut dyn RowCursor, job: &JobDescriptor) -> Result<StagedFile> {
        let started = Instant::now();
        let columns = cursor.columns().to_vec();
        let mut writer = StagingWriter::create(
            &self.settings.staging_dir,
            self.settings.write_buffer_bytes,
            &columns,
        )?;

        let batch_size = job.query.batch_size();
        let streamed = stream_rows(cursor, batch_size, &mut writer)?;
        let staged = writer.finish()?;

        check_row_counts(streamed, staged.rows())?;

        let secs = started.elapsed().as_secs_f64();
        if secs > 0.0 {
            info!(
                "[{}] Streamed {} rows @ {:.0} rows/s (batch_size={})",
                job.name,
                streamed,
                streamed as f64 / secs,
                batch_size
            );
        }
        Ok(staged)
    }
}

fn check_row_counts(streamed: u64, staged: u64) -> Result<()> {
    if streamed != staged {
        return Err(ExportError::StreamError(format!(
            "streamed {} rows but staged {}",
            streamed, staged
        )));
    }
    Ok(())
}
