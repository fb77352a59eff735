//! Task-list manifest collection
//!
//! Secondary pass over a tree that picks up files conventionally used as task
//! lists (`TODO.md`, `todo.txt`, ...) and returns them whole. Names are
//! matched case-insensitively against the configured glob patterns.

use crate::core::error::{ErrorContext, ScannerError, ScannerResult};
use crate::core::settings::ScanSettings;
use crate::filter::IgnoreFilter;
use crate::scanner::engine::{read_text, FileContent};
use crate::scanner::types::{relative_display, ManifestFile};
use glob::{MatchOptions, Pattern};
use std::path::Path;
use walkdir::WalkDir;

const NAME_MATCH: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

pub fn collect_manifest_files(
    root: &Path,
    filter: &IgnoreFilter,
    settings: &ScanSettings,
) -> ScannerResult<Vec<ManifestFile>> {
    let patterns = settings
        .manifest_names
        .iter()
        .filter_map(|name| match Pattern::new(name) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                log::warn!("Ignoring invalid manifest name pattern '{}': {}", name, e);
                None
            }
        })
        .collect::<Vec<_>>();

    if !root.is_dir() {
        return Err(ScannerError::not_found(format!(
            "Repository root {} is not a directory",
            root.display()
        ))
        .with_context(
            &ErrorContext::new("collect_manifest_files", "scan_engine")
                .with_file_path(root.display().to_string()),
        ));
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !filter.should_skip(
                    entry.path().strip_prefix(root).unwrap_or(entry.path()),
                    entry.file_type().is_dir(),
                )
        });

    let mut manifests = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Cannot traverse while collecting manifests: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if !patterns.iter().any(|p| p.matches_with(&name, NAME_MATCH)) {
            continue;
        }

        let relative = relative_display(entry.path().strip_prefix(root).unwrap_or(entry.path()));
        match read_text(entry.path(), &relative, settings) {
            Ok(FileContent::Text(content)) => manifests.push(ManifestFile {
                file_path: relative,
                content,
            }),
            Ok(_) => log::debug!("Skipping manifest {}: binary or oversized", relative),
            Err(e) => log::warn!("{} ({})", e, e.source_message().unwrap_or("no detail")),
        }
    }

    log::debug!("Found {} manifest files in {}", manifests.len(), root.display());
    Ok(manifests)
}
