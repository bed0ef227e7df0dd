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

//! # Publisher
//!
//! Moves a finished staging file to the shared destination so that readers
//! only ever see a complete file:
//!
//! 1. create the destination directory if needed,
//! 2. copy the staging file to a temporary name *in the destination
//!    directory* and fsync it,
//! 3. `rename` the temporary file over the final name,
//! 4. remove the staging file (best-effort).
//!
//! The final path is touched by step 3 only. If the copy fails nothing is
//! renamed; if the rename fails (for instance across volumes) the job fails.
//! There is no copy fallback for a failed rename.

use crate::domain::errors::{ExportError, Result};
use crate::domain::timing::TimingCollector;
use crate::infrastructure::local_storage::staging_writer::StagedFile;
use log::{info, warn};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Final destination plus its same-directory temporary sibling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    final_path: PathBuf,
    temp_path: PathBuf,
}

impl PublishTarget {
    /// Derives the temporary path from `final_path`:
    /// `Sales.csv` → `Sales.tmp.csv`, `Sales` → `Sales.tmp`.
    pub fn new(final_path: impl Into<PathBuf>) -> Result<Self> {
        let final_path = final_path.into();
        let stem = final_path.file_stem().ok_or_else(|| {
            ExportError::ConfigError(format!(
                "destination {} has no file name",
                final_path.display()
            ))
        })?;

        let mut temp_name = OsString::from(stem);
        temp_name.push(".tmp");
        if let Some(ext) = final_path.extension() {
            temp_name.push(".");
            temp_name.push(ext);
        }
        let temp_path = final_path.with_file_name(temp_name);

        Ok(Self {
            final_path,
            temp_path,
        })
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Directory shared by the final and temporary paths.
    pub fn directory(&self) -> &Path {
        match self.final_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    fn publish_error(&self, step: &str, e: io::Error) -> ExportError {
        ExportError::PublishError {
            path: self.final_path.display().to_string(),
            reason: format!("{}: {}", step, e),
        }
    }

    fn remove_temp(&self) {
        if let Err(e) = fs::remove_file(&self.temp_path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(
                    "Could not remove temporary file {}: {}",
                    self.temp_path.display(),
                    e
                );
            }
        }
    }
}

/// Copies staged output into place and swaps it in atomically.
#[derive(Debug, Default)]
pub struct Publisher;

impl Publisher {
    pub fn new() -> Self {
        Self
    }

    /// Publishes `staged` to `target` and returns the published size.
    ///
    /// The staging file is consumed and removed whether or not publishing
    /// succeeds.
    pub fn publish(
        &self,
        staged: StagedFile,
        target: &PublishTarget,
        timing: &mut TimingCollector,
    ) -> Result<u64> {
        let result = self.transfer(&staged, target, timing);
        staged.discard();
        result
    }

    fn transfer(
        &self,
        staged: &StagedFile,
        target: &PublishTarget,
        timing: &mut TimingCollector,
    ) -> Result<u64> {
        fs::create_dir_all(target.directory())
            .map_err(|e| target.publish_error("create directory", e))?;

        let copied = timing
            .time("COPY_TO_DESTINATION", || {
                copy_and_sync(staged.path(), target.temp_path())
            })
            .map_err(|e| {
                target.remove_temp();
                target.publish_error("copy", e)
            })?;

        if copied != staged.bytes() {
            target.remove_temp();
            return Err(ExportError::PublishError {
                path: target.final_path().display().to_string(),
                reason: format!(
                    "copied {} bytes but staging file has {}",
                    copied,
                    staged.bytes()
                ),
            });
        }

        timing
            .time("RENAME_ON_DESTINATION", || {
                fs::rename(target.temp_path(), target.final_path())
            })
            .map_err(|e| {
                target.remove_temp();
                target.publish_error("rename", e)
            })?;

        info!(
            "Published {} ({} bytes)",
            target.final_path().display(),
            copied
        );
        Ok(copied)
    }
}

fn copy_and_sync(from: &Path, to: &Path) -> io::Result<u64> {
    let copied = fs::copy(from, to)?;
    OpenOptions::new().write(true).open(to)?.sync_all()?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{FieldValue, RowBatch};
    use crate::infrastructure::local_storage::staging_writer::StagingWriter;
    use crate::ports::batch_sink::BatchSink;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn stage(dir: &Path, rows: &[&str]) -> StagedFile {
        let cols = vec!["Site".to_string()];
        let mut writer = StagingWriter::create(dir, 1024, &cols).unwrap();
        let rows = rows.iter().map(|r| vec![FieldValue::from(*r)]).collect();
        writer
            .write_batch(&RowBatch::new(Arc::from(cols), rows))
            .unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn test_temp_path_naming() {
        let t = PublishTarget::new("/share/reports/SW_Sales_Chart_Data.csv").unwrap();
        assert_eq!(
            t.temp_path(),
            Path::new("/share/reports/SW_Sales_Chart_Data.tmp.csv")
        );
        assert_eq!(t.directory(), Path::new("/share/reports"));

        let t = PublishTarget::new("/share/reports/extract").unwrap();
        assert_eq!(t.temp_path(), Path::new("/share/reports/extract.tmp"));

        let t = PublishTarget::new("local.csv").unwrap();
        assert_eq!(t.directory(), Path::new("."));

        assert!(PublishTarget::new("/").is_err());
    }

    #[test]
    fn test_publish_creates_directory_and_cleans_up() {
        let staging = tempfile::tempdir().unwrap();
        let share = tempfile::tempdir().unwrap();
        let target = PublishTarget::new(share.path().join("nested/dir/out.csv")).unwrap();

        let staged = stage(staging.path(), &["A", "B"]);
        let staged_path = staged.path().to_path_buf();
        let mut timing = TimingCollector::new();

        let bytes = Publisher::new()
            .publish(staged, &target, &mut timing)
            .unwrap();

        let content = fs::read_to_string(target.final_path()).unwrap();
        assert_eq!(content, "Site\nA\nB\n");
        assert_eq!(bytes, content.len() as u64);
        assert!(!target.temp_path().exists());
        assert!(!staged_path.exists());
        assert!(timing.span("COPY_TO_DESTINATION").is_some());
        assert!(timing.span("RENAME_ON_DESTINATION").is_some());
    }

    #[test]
    fn test_publish_replaces_previous_export() {
        let staging = tempfile::tempdir().unwrap();
        let share = tempfile::tempdir().unwrap();
        let target = PublishTarget::new(share.path().join("out.csv")).unwrap();
        fs::write(target.final_path(), "OLD_CONTENT").unwrap();

        Publisher::new()
            .publish(
                stage(staging.path(), &["NEW"]),
                &target,
                &mut TimingCollector::new(),
            )
            .unwrap();

        assert_eq!(
            fs::read_to_string(target.final_path()).unwrap(),
            "Site\nNEW\n"
        );
    }

    #[test]
    fn test_copy_failure_leaves_destination_untouched() {
        let staging = tempfile::tempdir().unwrap();
        let share = tempfile::tempdir().unwrap();
        let target = PublishTarget::new(share.path().join("out.csv")).unwrap();
        fs::write(target.final_path(), "PREVIOUS").unwrap();
        // A directory squatting on the temp name makes the copy fail.
        fs::create_dir(target.temp_path()).unwrap();

        let staged = stage(staging.path(), &["NEW"]);
        let staged_path = staged.path().to_path_buf();
        let mut timing = TimingCollector::new();
        let res = Publisher::new().publish(staged, &target, &mut timing);

        assert!(matches!(res, Err(ExportError::PublishError { .. })));
        assert_eq!(fs::read_to_string(target.final_path()).unwrap(), "PREVIOUS");
        assert!(timing.span("RENAME_ON_DESTINATION").is_none());
        assert!(!staged_path.exists());
    }

    #[test]
    fn test_rename_failure_is_publish_error() {
        let staging = tempfile::tempdir().unwrap();
        let share = tempfile::tempdir().unwrap();
        let target = PublishTarget::new(share.path().join("out.csv")).unwrap();
        // A non-empty directory at the final name cannot be replaced by a file.
        fs::create_dir(target.final_path()).unwrap();
        fs::write(target.final_path().join("keep"), "x").unwrap();

        let res = Publisher::new().publish(
            stage(staging.path(), &["NEW"]),
            &target,
            &mut TimingCollector::new(),
        );

        match res {
            Err(ExportError::PublishError { reason, .. }) => assert!(reason.starts_with("rename")),
            other => panic!("expected rename failure, got {:?}", other),
        }
        assert!(!target.temp_path().exists());
        assert!(target.final_path().join("keep").exists());
    }

    #[test]
    fn test_concurrent_reader_sees_only_complete_files() {
        let staging = tempfile::tempdir().unwrap();
        let share = tempfile::tempdir().unwrap();
        let target = PublishTarget::new(share.path().join("out.csv")).unwrap();

        let rows_a: Vec<String> = (0..2_000).map(|i| format!("A{}", i)).collect();
        let rows_b: Vec<String> = (0..3_000).map(|i| format!("B{}", i)).collect();
        let refs_a: Vec<&str> = rows_a.iter().map(|s| s.as_str()).collect();
        let refs_b: Vec<&str> = rows_b.iter().map(|s| s.as_str()).collect();
        let expected_a = format!("Site\n{}\n", rows_a.join("\n"));
        let expected_b = format!("Site\n{}\n", rows_b.join("\n"));

        Publisher::new()
            .publish(stage(staging.path(), &refs_a), &target, &mut TimingCollector::new())
            .unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let reader = {
            let done = done.clone();
            let path = target.final_path().to_path_buf();
            let (a, b) = (expected_a.clone(), expected_b.clone());
            std::thread::spawn(move || {
                let mut reads = 0u64;
                loop {
                    let content = fs::read_to_string(&path).unwrap();
                    assert!(content == a || content == b, "reader saw a partial file");
                    reads += 1;
                    if done.load(Ordering::SeqCst) {
                        return reads;
                    }
                }
            })
        };

        for i in 0..40 {
            let rows = if i % 2 == 0 { &refs_b } else { &refs_a };
            Publisher::new()
                .publish(stage(staging.path(), rows), &target, &mut TimingCollector::new())
                .unwrap();
        }
        done.store(true, Ordering::SeqCst);

        assert!(reader.join().unwrap() > 0);
        assert_eq!(fs::read_to_string(target.final_path()).unwrap(), expected_a);
    }
}
