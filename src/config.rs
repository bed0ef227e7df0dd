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

//! # Configuration
//!
//! Loads the run configuration from YAML or JSON, layers environment and
//! CLI overrides on top (CLI > environment > file > defaults), and turns
//! the `jobs` list into ready-to-run `JobDescriptor`s.

use crate::application::pipeline::PipelineSettings;
use crate::domain::entities::{
    ConnectionDescriptor, JobDescriptor, QueryParam, QuerySpec, DEFAULT_BATCH_SIZE,
};
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::local_storage::publisher::PublishTarget;
use crate::infrastructure::local_storage::staging_writer::DEFAULT_WRITE_BUFFER_BYTES;
use clap::Parser;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;

pub const ENV_PASSWORD: &str = "ORACLE_PASSWORD";
pub const ENV_BATCH_SIZE: &str = "REPORT_EXPORT_BATCH_SIZE";
pub const ENV_PREFETCH_ROWS: &str = "REPORT_EXPORT_PREFETCH_ROWS";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
    /// Environment and CLI values. These beat per-job settings too.
    #[serde(skip)]
    pub overrides: RunOverrides,
}

/// Run-wide values from the environment or the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub batch_size: Option<usize>,
    pub service: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub username: String,
    pub password: Option<String>,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub service: String,
    /// Overrides `//host:port/service` when set.
    pub connection_string: Option<String>,
    pub prefetch_rows: Option<u32>,
}

fn default_port() -> u16 {
    1521
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExportConfig {
    pub batch_size: Option<usize>,
    pub staging_dir: Option<String>,
    pub write_buffer_bytes: Option<usize>,
    pub report_dir: Option<String>,
}

/// One report to extract and publish.
#[derive(Debug, Deserialize, Clone)]
pub struct JobConfig {
    pub name: String,
    pub sql: Option<String>,
    pub sql_file: Option<String>,
    #[serde(default)]
    pub params: Vec<QueryParam>,
    /// Runs this job against another service on the same server.
    pub service: Option<String>,
    pub destination: String,
    pub batch_size: Option<usize>,
    pub done_message: Option<String>,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: String,

    /// Run only the named job (repeatable)
    #[arg(long = "job")]
    pub jobs: Vec<String>,

    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub service: Option<String>,
    #[arg(long)]
    pub batch_size: Option<usize>,
    #[arg(long)]
    pub staging_dir: Option<String>,
    #[arg(long)]
    pub report_dir: Option<String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ExportError::ConfigError(format!("cannot read {}: {}", path, e)))?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents)
                .map_err(|e| ExportError::ConfigError(format!("{}: {}", path, e)))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| ExportError::ConfigError(format!("{}: {}", path, e)))?
        };

        Ok(config)
    }

    /// Applies overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.database.password.is_none() {
            self.database.password = lookup(ENV_PASSWORD);
        }
        if let Some(v) = lookup(ENV_BATCH_SIZE) {
            self.overrides.batch_size = Some(parse_env(ENV_BATCH_SIZE, &v)?);
        }
        if let Some(v) = lookup(ENV_PREFETCH_ROWS) {
            self.database.prefetch_rows = Some(parse_env(ENV_PREFETCH_ROWS, &v)?);
        }
        Ok(())
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(u) = &args.username { self.database.username = u.clone(); }
        if let Some(p) = &args.password { self.database.password = Some(p.clone()); }
        if let Some(h) = &args.host { self.database.host = h.clone(); }
        if let Some(s) = &args.service { self.overrides.service = Some(s.clone()); }
        if let Some(b) = args.batch_size { self.overrides.batch_size = Some(b); }
        if let Some(d) = &args.staging_dir { self.export.staging_dir = Some(d.clone()); }
        if let Some(r) = &args.report_dir { self.export.report_dir = Some(r.clone()); }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.username.is_empty() {
            return config_err("database.username is required");
        }
        if self.database.connection_string.is_none() && self.database.host.is_empty() {
            return config_err("database.host or database.connection_string is required");
        }
        if self.export.batch_size == Some(0) || self.overrides.batch_size == Some(0) {
            return config_err("batch_size must be greater than zero");
        }
        if self.database.connection_string.is_some() && self.overrides.service.is_some() {
            return config_err("--service cannot be combined with database.connection_string");
        }
        if self.jobs.is_empty() {
            return config_err("no jobs configured");
        }

        let mut names = HashSet::new();
        for job in &self.jobs {
            if job.name.trim().is_empty() {
                return config_err("every job needs a name");
            }
            if !names.insert(job.name.as_str()) {
                return config_err(&format!("duplicate job name '{}'", job.name));
            }
            match (&job.sql, &job.sql_file) {
                (Some(_), None) | (None, Some(_)) => {}
                _ => {
                    return config_err(&format!(
                        "job '{}' needs exactly one of sql or sql_file",
                        job.name
                    ))
                }
            }
            if job.batch_size == Some(0) {
                return config_err(&format!("job '{}': batch_size must be greater than zero", job.name));
            }
            if job.service.is_some() && self.database.connection_string.is_some() {
                return config_err(&format!(
                    "job '{}': service cannot be combined with database.connection_string",
                    job.name
                ));
            }
            PublishTarget::new(&job.destination)?;
        }
        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            staging_dir: self
                .export
                .staging_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            write_buffer_bytes: self
                .export
                .write_buffer_bytes
                .unwrap_or(DEFAULT_WRITE_BUFFER_BYTES),
        }
    }

    pub fn report_dir(&self) -> Option<PathBuf> {
        self.export.report_dir.as_ref().map(PathBuf::from)
    }

    /// Builds descriptors for all jobs, or only for those named in `only`.
    pub fn job_descriptors(&self, only: &[String]) -> Result<Vec<JobDescriptor>> {
        if let Some(unknown) = only.iter().find(|n| !self.jobs.iter().any(|j| &j.name == *n)) {
            return config_err(&format!("unknown job '{}'", unknown));
        }

        self.jobs
            .iter()
            .filter(|j| only.is_empty() || only.contains(&j.name))
            .map(|j| self.build_descriptor(j))
            .collect()
    }

    fn build_descriptor(&self, job: &JobConfig) -> Result<JobDescriptor> {
        let sql = match (&job.sql, &job.sql_file) {
            (Some(sql), _) => sql.clone(),
            (None, Some(file)) => std::fs::read_to_string(file).map_err(|e| {
                ExportError::ConfigError(format!("job '{}': cannot read {}: {}", job.name, file, e))
            })?,
            (None, None) => {
                return config_err(&format!("job '{}' has no SQL", job.name));
            }
        };

        let batch_size = self
            .overrides
            .batch_size
            .or(job.batch_size)
            .or(self.export.batch_size)
            .unwrap_or(DEFAULT_BATCH_SIZE);

        let db = &self.database;
        let connection = ConnectionDescriptor {
            username: db.username.clone(),
            password: db.password.clone().unwrap_or_default(),
            host: db.host.clone(),
            port: db.port,
            service: self
                .overrides
                .service
                .clone()
                .or_else(|| job.service.clone())
                .unwrap_or_else(|| db.service.clone()),
            connection_string: db.connection_string.clone(),
            prefetch_rows: db.prefetch_rows,
        };

        Ok(JobDescriptor {
            name: job.name.clone(),
            connection,
            query: QuerySpec::new(sql.trim(), job.params.clone()).with_batch_size(batch_size),
            destination: PathBuf::from(&job.destination),
            done_message: job.done_message.clone(),
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ExportError::ConfigError(format!("{}: invalid value '{}'", key, value)))
}

fn config_err<T>(msg: &str) -> Result<T> {
    Err(ExportError::ConfigError(msg.to_string()))
}
