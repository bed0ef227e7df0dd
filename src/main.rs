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

//! # Report Exporter
//!
//! Runs a fixed list of report queries against Oracle, streams each result
//! set into a local CSV staging file and publishes it to shared storage
//! under an atomic rename.

use clap::Parser;
use log::{error, info};
use report_exporter::application::orchestrator::Orchestrator;
use report_exporter::config::{AppConfig, CliArgs};
use report_exporter::domain::entities::JobDescriptor;
use report_exporter::domain::errors::Result;
use report_exporter::infrastructure::oracle::oracle_source_adapter::OracleSourceAdapter;
use std::process;
use std::sync::Arc;

fn main() {
    // 1. Initialize Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    // 3. Load Config
    let (config, jobs) = match load(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    // 4. Run Jobs
    let orchestrator = Orchestrator::new(
        Arc::new(OracleSourceAdapter::new()),
        config.pipeline_settings(),
        config.report_dir(),
    );

    match orchestrator.run(&jobs) {
        Ok(results) => {
            let success_count = results.iter().filter(|r| r.is_success()).count();
            info!(
                "Export finished. {}/{} jobs successful.",
                success_count,
                results.len()
            );
            if success_count != results.len() {
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Run failed: {}", e);
            process::exit(1);
        }
    }
}

fn load(args: &CliArgs) -> Result<(AppConfig, Vec<JobDescriptor>)> {
    let mut config = AppConfig::from_file(&args.config)?;
    config.apply_env_overrides()?;
    config.merge_cli(args);
    config.validate()?;
    let jobs = config.job_descriptors(&args.jobs)?;
    Ok((config, jobs))
}
