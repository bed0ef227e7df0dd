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

//! The job runner.
//!
//! Takes a list of fully built job descriptors and pushes each one through
//! the export pipeline, one after another. Jobs are independent: a failed
//! job is recorded and the next one still runs.

use crate::application::pipeline::{ExportPipeline, PipelineSettings};
use crate::domain::entities::{JobDescriptor, JobResult};
use crate::domain::errors::{ExportError, Result};
use crate::domain::timing::TimingCollector;
use crate::ports::source_port::SourcePort;
use log::{error, info};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs export jobs sequentially against one source.
pub struct Orchestrator {
    source: Arc<dyn SourcePort>,
    settings: PipelineSettings,
    report_dir: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn SourcePort>,
        settings: PipelineSettings,
        report_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            source,
            settings,
            report_dir,
        }
    }

    /// Runs every job in order and returns one result per job.
    ///
    /// Only a failure to write the run report is returned as an error; job
    /// failures are reported through their `JobResult`.
    pub fn run(&self, jobs: &[JobDescriptor]) -> Result<Vec<JobResult>> {
        info!("Starting {} export job(s)...", jobs.len());
        let pipeline = ExportPipeline::new(self.source.as_ref(), &self.settings);

        let mut results = Vec::with_capacity(jobs.len());
        for job in jobs {
            results.push(self.run_job(&pipeline, job));
        }

        let final_total: f64 = results.iter().map(|r| r.duration).sum();
        info!("FINAL TOTAL: {:.3} s", final_total);

        if let Some(dir) = &self.report_dir {
            self.generate_report(dir, &results, final_total)?;
        }

        Ok(results)
    }

    fn run_job(&self, pipeline: &ExportPipeline<'_>, job: &JobDescriptor) -> JobResult {
        info!("[{}] Exporting to {}", job.name, job.destination.display());
        let mut timing = TimingCollector::new();

        match pipeline.run(job, &mut timing) {
            Ok(summary) => {
                let report = timing.report();
                info!("[{}] {}", job.name, report);
                info!("[{}] Total Rows: {}", job.name, summary.rows);
                if let Some(msg) = &job.done_message {
                    info!("{}", msg);
                }
                JobResult::success(job, summary, report)
            }
            Err(e) => {
                let report = timing.report();
                error!("[{}] Job failed: {}", job.name, e);
                info!("[{}] {}", job.name, report);
                JobResult::failure(job, e.to_string(), report)
            }
        }
    }

    fn generate_report(&self, dir: &Path, results: &[JobResult], duration_secs: f64) -> Result<()> {
        let success = results.iter().filter(|r| r.is_success()).count();
        let total_rows: u64 = results.iter().map(|r| r.rows).sum();
        let total_bytes: u64 = results.iter().map(|r| r.bytes).sum();

        let report = json!({
            "summary": {
                "total_jobs": results.len(),
                "success": success,
                "failed": results.len() - success,
                "total_rows": total_rows,
                "total_bytes": total_bytes,
                "total_duration_seconds": duration_secs,
            },
            "details": results
        });

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        std::fs::create_dir_all(dir)?;
        let report_path = dir.join(format!("report_{}.json", timestamp));
        let file = std::fs::File::create(&report_path)?;
        serde_json::to_writer_pretty(file, &report)
            .map_err(|e| ExportError::IoError(e.into()))?;

        info!("Run report written to {}", report_path.display());
        Ok(())
    }
}
