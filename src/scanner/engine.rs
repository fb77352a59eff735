//! Scan Engine
//!
//! Walks a working tree depth-first in file-name order, prunes ignored
//! directories before descending, and matches every line of every text file
//! against the marker patterns. Findings are produced lazily: a file is opened
//! only when the consumer asks for more findings than are already buffered
//! from the previous file.
//!
//! ## Failure policy
//!
//! - a missing or unreadable repository root fails the scan up front
//! - an unreadable or non-UTF-8 file is logged as `ScanIOError` and skipped
//! - binary and oversized files are skipped silently (debug log only)
//!
//! Files are read whole before matching so a file that turns out to be
//! undecodable contributes no findings at all.

use crate::core::error::{ErrorContext, ScannerError, ScannerResult};
use crate::core::settings::ScanSettings;
use crate::filter::{looks_binary, FileRuleSource, IgnoreFilter, RuleSource};
use crate::patterns::PatternSet;
use crate::repository::types::RepositoryReference;
use crate::scanner::manifest::collect_manifest_files;
use crate::scanner::types::{relative_display, Finding, ManifestFile, ScanStats};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use walkdir::{DirEntry, WalkDir};

type EntryPredicate = Box<dyn FnMut(&DirEntry) -> bool + Send>;
type CancelCheck = Box<dyn Fn() -> bool + Send>;

#[derive(Clone)]
pub struct ScanEngine {
    patterns: Arc<PatternSet>,
    settings: Arc<ScanSettings>,
    rules: Arc<dyn RuleSource>,
}

impl ScanEngine {
    pub fn new(patterns: PatternSet, settings: ScanSettings) -> Self {
        Self {
            patterns: Arc::new(patterns),
            settings: Arc::new(settings),
            rules: Arc::new(FileRuleSource),
        }
    }

    pub fn with_rule_source(mut self, rules: Arc<dyn RuleSource>) -> Self {
        self.rules = rules;
        self
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    pub fn scan(&self, reference: &RepositoryReference) -> ScannerResult<FindingIter> {
        let context =
            ErrorContext::new("scan", "scan_engine").with_repo_url(&reference.identifier);
        self.scan_path(&reference.path)
            .map_err(|e| e.with_context(&context))
    }

    /// Start a scan of the tree at `root`
    ///
    /// The ignore rules are read here, once; the returned iterator does the
    /// actual traversal.
    pub fn scan_path(&self, root: &Path) -> ScannerResult<FindingIter> {
        let context = ErrorContext::new("scan", "scan_engine")
            .with_file_path(root.display().to_string());

        let metadata =
            std::fs::metadata(root).map_err(|e| ScannerError::from(e).with_context(&context))?;
        if !metadata.is_dir() {
            return Err(ScannerError::not_found(format!(
                "Repository root {} is not a directory",
                root.display()
            ))
            .with_context(&context));
        }
        std::fs::read_dir(root).map_err(|e| ScannerError::from(e).with_context(&context))?;

        let filter = Arc::new(IgnoreFilter::for_repository(
            root,
            &self.settings,
            self.rules.as_ref(),
        )?);

        Ok(FindingIter::new(
            root.to_path_buf(),
            filter,
            Arc::clone(&self.patterns),
            Arc::clone(&self.settings),
        ))
    }
}

/// Outcome of reading a candidate file
pub(crate) enum FileContent {
    Text(String),
    Binary,
    Oversized(u64),
}

/// Read a file for matching, classifying it as text, binary or oversized
pub(crate) fn read_text(
    path: &Path,
    relative: &str,
    settings: &ScanSettings,
) -> ScannerResult<FileContent> {
    let context = ErrorContext::new("read_file", "scan_engine").with_file_path(relative);
    let unreadable = |e: std::io::Error| {
        ScannerError::scan_io(format!("Cannot read {}", relative))
            .with_source(e)
            .with_context(&context)
    };

    let size = std::fs::metadata(path).map_err(unreadable)?.len();
    if size > settings.max_file_size {
        return Ok(FileContent::Oversized(size));
    }

    let bytes = std::fs::read(path).map_err(unreadable)?;
    if looks_binary(&bytes, settings.binary_probe_bytes) {
        return Ok(FileContent::Binary);
    }

    String::from_utf8(bytes).map(FileContent::Text).map_err(|e| {
        ScannerError::scan_io(format!("{} is not valid UTF-8", relative))
            .with_source(e)
            .with_context(&context)
    })
}

/// Lazy, non-restartable sequence of findings for one tree
pub struct FindingIter {
    root: PathBuf,
    walker: walkdir::FilterEntry<walkdir::IntoIter, EntryPredicate>,
    filter: Arc<IgnoreFilter>,
    patterns: Arc<PatternSet>,
    settings: Arc<ScanSettings>,
    pending: VecDeque<Finding>,
    pruned: Arc<AtomicUsize>,
    ignored: Arc<AtomicUsize>,
    stats: ScanStats,
    started: Instant,
    finished: bool,
    cancel: Option<CancelCheck>,
}

impl FindingIter {
    fn new(
        root: PathBuf,
        filter: Arc<IgnoreFilter>,
        patterns: Arc<PatternSet>,
        settings: Arc<ScanSettings>,
    ) -> Self {
        let pruned = Arc::new(AtomicUsize::new(0));
        let ignored = Arc::new(AtomicUsize::new(0));

        let predicate: EntryPredicate = {
            let root = root.clone();
            let filter = Arc::clone(&filter);
            let pruned = Arc::clone(&pruned);
            let ignored = Arc::clone(&ignored);
            Box::new(move |entry: &DirEntry| {
                if entry.depth() == 0 {
                    return true;
                }
                let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
                let is_dir = entry.file_type().is_dir();
                if filter.should_skip(relative, is_dir) {
                    let counter = if is_dir { &pruned } else { &ignored };
                    counter.fetch_add(1, Ordering::Relaxed);
                    return false;
                }
                true
            })
        };

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(predicate);

        Self {
            root,
            walker,
            filter,
            patterns,
            settings,
            pending: VecDeque::new(),
            pruned,
            ignored,
            stats: ScanStats::default(),
            started: Instant::now(),
            finished: false,
            cancel: None,
        }
    }

    /// Stop before the next walker step once `cancelled` returns true
    pub fn with_cancel(mut self, cancelled: impl Fn() -> bool + Send + 'static) -> Self {
        self.cancel = Some(Box::new(cancelled));
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|cancelled| cancelled())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stats(&self) -> ScanStats {
        ScanStats {
            directories_pruned: self.pruned.load(Ordering::Relaxed),
            files_ignored: self.ignored.load(Ordering::Relaxed),
            duration: self.started.elapsed(),
            ..self.stats.clone()
        }
    }

    /// Task-list files in the same tree, honouring the same ignore rules
    pub fn manifest_files(&self) -> ScannerResult<Vec<ManifestFile>> {
        collect_manifest_files(&self.root, &self.filter, &self.settings)
    }

    fn scan_file(&mut self, entry: &DirEntry) {
        let relative_path = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
        let relative = relative_display(relative_path);

        let text = match read_text(entry.path(), &relative, &self.settings) {
            Ok(FileContent::Text(text)) => text,
            Ok(FileContent::Binary) => {
                log::debug!("Skipping binary file {}", relative);
                self.stats.files_skipped += 1;
                return;
            }
            Ok(FileContent::Oversized(size)) => {
                log::debug!("Skipping {} ({} bytes exceeds limit)", relative, size);
                self.stats.files_skipped += 1;
                return;
            }
            Err(e) => {
                log::warn!("{} ({})", e, e.source_message().unwrap_or("no detail"));
                self.stats.files_skipped += 1;
                return;
            }
        };

        self.stats.files_scanned += 1;
        let buffered = self.pending.len();
        let lines = text.lines().collect::<Vec<_>>();
        for (index, line) in lines.iter().enumerate() {
            if let Some(found) = self.patterns.match_line(line) {
                self.pending.push_back(Finding {
                    file_path: relative.clone(),
                    line_num: index + 1,
                    todo_text: line.trim().to_string(),
                    next_line: lines
                        .get(index + 1)
                        .map(|next| next.trim().to_string())
                        .unwrap_or_default(),
                    marker: found.token.to_string(),
                });
            }
        }
        self.stats.findings += self.pending.len() - buffered;
    }

    fn finish(&mut self) {
        self.finished = true;
        let stats = self.stats();
        log::info!(
            "Scanned {} files in {} ({} skipped, {} ignored, {} directories pruned): {} findings in {:.2?}",
            stats.files_scanned,
            self.root.display(),
            stats.files_skipped,
            stats.files_ignored,
            stats.directories_pruned,
            stats.findings,
            stats.duration
        );
    }
}

impl Iterator for FindingIter {
    type Item = Finding;

    fn next(&mut self) -> Option<Finding> {
        loop {
            if let Some(finding) = self.pending.pop_front() {
                return Some(finding);
            }
            if self.finished {
                return None;
            }
            if self.is_cancelled() {
                log::debug!("Traversal of {} cancelled", self.root.display());
                self.finish();
                return None;
            }

            match self.walker.next() {
                None => {
                    self.finish();
                    return None;
                }
                Some(Err(e)) => {
                    let location = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| self.root.display().to_string());
                    log::warn!("Cannot traverse {}: {}", location, e);
                    self.stats.files_skipped += 1;
                }
                Some(Ok(entry)) => {
                    let file_type = entry.file_type();
                    if file_type.is_symlink() {
                        log::debug!("Not following symlink {}", entry.path().display());
                    } else if file_type.is_file() {
                        self.scan_file(&entry);
                    }
                }
            }
        }
    }
}
