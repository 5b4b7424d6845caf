//! Batch driver: file discovery and concurrent formatting.
//!
//! Files are matched with glob sets and formatted on the blocking pool, at
//! most `jobs` at a time. Every task reads its file fresh; one failing file
//! is reported and never stops the others.

use crate::error::{FormatError, Result};
use crate::formatter::{check_file_with, format_file_with, FormatOptions};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use walkdir::WalkDir;

/// Files formatted when no pattern is given.
pub const DEFAULT_INCLUDE: &[&str] = &["**/*.{md,mdx}"];

/// Paths never formatted.
pub const DEFAULT_IGNORE: &[&str] = &["**/node_modules/**", "dist/**", "build/**", ".git/**"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Rewrite files that change.
    Write,
    /// Report files that would change; the run fails if any would.
    Check,
    /// Report files that would change without failing.
    DryRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Changed,
    Unchanged,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FileOutcome {
    fn new(path: PathBuf, status: FileStatus) -> Self {
        Self {
            path,
            status,
            message: None,
        }
    }

    fn error(path: PathBuf, err: &FormatError) -> Self {
        Self {
            path,
            status: FileStatus::Error,
            message: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchSummary {
    pub changed: usize,
    pub unchanged: usize,
    pub errored: usize,
    pub files: Vec<FileOutcome>,
}

impl BatchSummary {
    fn record(&mut self, outcome: FileOutcome) {
        match outcome.status {
            FileStatus::Changed => self.changed += 1,
            FileStatus::Unchanged => self.unchanged += 1,
            FileStatus::Error => self.errored += 1,
        }
        self.files.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.files.len()
    }
}

fn build_glob_set<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern.as_ref())?);
    }
    Ok(builder.build()?)
}

/// Include and ignore glob sets, matched against paths relative to the
/// discovery root.
pub struct FileMatcher {
    include: GlobSet,
    ignore: GlobSet,
}

impl FileMatcher {
    pub fn new<S: AsRef<str>>(include: &[S], ignore: &[S]) -> Result<Self> {
        let mut ignore_patterns: Vec<&str> = DEFAULT_IGNORE.to_vec();
        ignore_patterns.extend(ignore.iter().map(AsRef::as_ref));
        Ok(Self {
            include: build_glob_set(include)?,
            ignore: build_glob_set(&ignore_patterns)?,
        })
    }

    pub fn is_ignored(&self, relative: &Path) -> bool {
        self.ignore.is_match(relative)
    }

    pub fn matches(&self, relative: &Path) -> bool {
        self.include.is_match(relative) && !self.is_ignored(relative)
    }

    /// A directory is skipped when anything inside it would be ignored.
    fn prunes(&self, relative_dir: &Path) -> bool {
        !relative_dir.as_os_str().is_empty() && self.ignore.is_match(relative_dir.join("*"))
    }

    fn walk(&self, root: &Path, dir: &Path) -> Vec<PathBuf> {
        let relative = |path: &Path| path.strip_prefix(root).unwrap_or(path).to_path_buf();
        WalkDir::new(dir)
            .into_iter()
            .filter_entry(|e| !(e.file_type().is_dir() && self.prunes(&relative(e.path()))))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.matches(&relative(e.path())))
            .map(|e| e.into_path())
            .collect()
    }
}

/// Resolve command-line patterns under `root`. Each pattern may name a
/// file, a directory (searched for Markdown and MDX files) or a glob. No
/// patterns means every Markdown and MDX file under `root`.
pub fn collect_files<S: AsRef<str>>(root: &Path, patterns: &[S], ignore: &[S]) -> Result<Vec<PathBuf>> {
    let default_matcher = FileMatcher::new(DEFAULT_INCLUDE, &ignore_strs(ignore))?;
    let mut files = Vec::new();

    if patterns.is_empty() {
        files.extend(default_matcher.walk(root, root));
    }
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let candidate = root.join(pattern);
        if candidate.is_file() {
            let relative = candidate.strip_prefix(root).unwrap_or(&candidate);
            if !default_matcher.is_ignored(relative) {
                files.push(candidate);
            }
        } else if candidate.is_dir() {
            files.extend(default_matcher.walk(root, &candidate));
        } else {
            let matcher = FileMatcher::new(&[pattern], &ignore_strs(ignore))?;
            let found = matcher.walk(root, root);
            if found.is_empty() {
                log::warn!("No files match {}", pattern);
            }
            files.extend(found);
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn ignore_strs<S: AsRef<str>>(ignore: &[S]) -> Vec<&str> {
    ignore.iter().map(AsRef::as_ref).collect()
}

fn process_file(path: &Path, mode: RunMode, options: &FormatOptions) -> FileOutcome {
    let path_buf = path.to_path_buf();
    let result = match mode {
        RunMode::Write => format_file_with(path, options),
        RunMode::Check | RunMode::DryRun => check_file_with(path, options),
    };
    match result {
        Ok(true) => {
            match mode {
                RunMode::Write => log::info!("Formatted {}", path.display()),
                _ => log::info!("Would reformat {}", path.display()),
            }
            FileOutcome::new(path_buf, FileStatus::Changed)
        }
        Ok(false) => {
            log::debug!("Unchanged {}", path.display());
            FileOutcome::new(path_buf, FileStatus::Unchanged)
        }
        Err(e) => {
            log::error!("{}: {}", path.display(), e);
            FileOutcome::error(path_buf, &e)
        }
    }
}

/// Format `files` concurrently, at most `jobs` at a time.
pub async fn run_batch(
    files: Vec<PathBuf>,
    mode: RunMode,
    options: Arc<FormatOptions>,
    jobs: usize,
) -> BatchSummary {
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));

    let tasks: Vec<_> = files
        .iter()
        .cloned()
        .map(|path| {
            let semaphore = Arc::clone(&semaphore);
            let options = Arc::clone(&options);
            tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| FormatError::Task(e.to_string()))?;
                tokio::task::spawn_blocking(move || process_file(&path, mode, &options))
                    .await
                    .map_err(|e| FormatError::Task(e.to_string()))
            })
        })
        .collect();

    let results = futures::future::join_all(tasks).await;

    let mut summary = BatchSummary::default();
    for (path, result) in files.into_iter().zip(results) {
        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => FileOutcome::error(path, &e),
            Err(e) => FileOutcome::error(path, &FormatError::Task(e.to_string())),
        };
        summary.record(outcome);
    }
    summary
}
