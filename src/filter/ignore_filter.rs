//! Ignore Filter
//!
//! Decides whether a repository-relative path is skipped during traversal.
//! Built once per scan from the repository's ignore rules plus a fixed
//! exclusion of version-control metadata directories; a concurrent edit to the
//! ignore file does not affect a filter that has already been built.

use crate::core::error::{ErrorContext, ScannerError, ScannerResult};
use crate::core::settings::ScanSettings;
use crate::filter::rules::RuleSource;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Component, Path, PathBuf};

/// Version-control metadata directories that are never traversed
pub const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn", ".bzr"];

#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    root: PathBuf,
    gitignore: Gitignore,
    rule_count: usize,
}

impl IgnoreFilter {
    /// Build a filter from ordered rules; invalid rules are logged and dropped
    pub fn new<S: AsRef<str>>(root: &Path, rules: &[S]) -> ScannerResult<Self> {
        let mut builder = GitignoreBuilder::new(root);
        let mut rule_count = 0;

        for rule in rules {
            match builder.add_line(None, rule.as_ref()) {
                Ok(_) => rule_count += 1,
                Err(e) => log::warn!("Ignoring invalid ignore rule '{}': {}", rule.as_ref(), e),
            }
        }

        let gitignore = builder.build().map_err(|e| {
            ScannerError::unknown(format!("Failed to build ignore rules: {}", e))
                .with_context(&ErrorContext::new("build_ignore_filter", "ignore_filter"))
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            gitignore,
            rule_count,
        })
    }

    /// Read the repository's ignore file once and append configured extras
    pub fn for_repository(
        root: &Path,
        settings: &ScanSettings,
        source: &dyn RuleSource,
    ) -> ScannerResult<Self> {
        let ignore_file = root.join(&settings.ignore_file);
        let mut rules = source.read_rules(&ignore_file).map_err(|e| {
            ScannerError::from(e).with_context(
                &ErrorContext::new("read_ignore_rules", "ignore_filter")
                    .with_file_path(settings.ignore_file.clone()),
            )
        })?;
        rules.extend(settings.extra_ignores.iter().cloned());

        log::debug!(
            "Loaded {} ignore rules for {}",
            rules.len(),
            root.display()
        );
        Self::new(root, &rules)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    /// True when `path` (relative to the repository root) must not be visited
    ///
    /// Paths that would escape the root, and anything inside a version-control
    /// metadata directory, are always skipped.
    pub fn should_skip(&self, path: &Path, is_dir: bool) -> bool {
        let relative = match path.strip_prefix(&self.root) {
            Ok(stripped) => stripped,
            Err(_) if path.is_absolute() => return true,
            Err(_) => path,
        };

        if relative.as_os_str().is_empty() {
            return false;
        }

        for component in relative.components() {
            match component {
                Component::Normal(name) => {
                    if VCS_DIRS.iter().any(|vcs| name == *vcs) {
                        return true;
                    }
                }
                Component::CurDir => {}
                _ => return true,
            }
        }

        self.gitignore
            .matched_path_or_any_parents(relative, is_dir)
            .is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(rules: &[&str]) -> IgnoreFilter {
        IgnoreFilter::new(Path::new("/repo"), rules).unwrap()
    }

    #[test]
    fn test_vcs_directories_always_skipped() {
        let f = filter(&[]);
        assert!(f.should_skip(Path::new(".git"), true));
        assert!(f.should_skip(Path::new(".git/config"), false));
        assert!(f.should_skip(Path::new("vendor/lib/.hg"), true));
        assert!(!f.should_skip(Path::new(".github/workflows/ci.yml"), false));
    }

    #[test]
    fn test_glob_rules() {
        let f = filter(&["*.generated.go", "node_modules/"]);

        assert!(f.should_skip(Path::new("api/types.generated.go"), false));
        assert!(!f.should_skip(Path::new("api/types.go"), false));
        assert!(f.should_skip(Path::new("node_modules"), true));
        assert!(f.should_skip(Path::new("web/node_modules/lodash/index.js"), false));
        // directory-only rule does not match a file of the same name
        assert!(!f.should_skip(Path::new("node_modules"), false));
    }

    #[test]
    fn test_later_rules_override_earlier_ones() {
        let f = filter(&["*.log", "!keep.log"]);
        assert!(f.should_skip(Path::new("debug.log"), false));
        assert!(!f.should_skip(Path::new("keep.log"), false));

        let f = filter(&["!keep.log", "*.log"]);
        assert!(f.should_skip(Path::new("keep.log"), false));
    }

    #[test]
    fn test_paths_escaping_root_are_skipped() {
        let f = filter(&[]);
        assert!(f.should_skip(Path::new("../outside.rs"), false));
        assert!(f.should_skip(Path::new("src/../../outside.rs"), false));
        assert!(f.should_skip(Path::new("/etc/passwd"), false));
    }

    #[test]
    fn test_absolute_paths_under_root_are_accepted() {
        let f = filter(&["build/"]);
        assert!(!f.should_skip(Path::new("/repo/src/main.rs"), false));
        assert!(f.should_skip(Path::new("/repo/build"), true));
        assert!(!f.should_skip(Path::new("/repo"), true));
    }

    #[test]
    fn test_invalid_rules_are_dropped() {
        let f = filter(&["[z-a]", "*.tmp"]);
        assert_eq!(f.rule_count(), 1);
        assert!(f.should_skip(Path::new("x.tmp"), false));
    }

    #[test]
    fn test_for_repository_appends_extra_ignores() {
        struct StaticRules;
        impl RuleSource for StaticRules {
            fn read_rules(&self, ignore_file: &Path) -> std::io::Result<Vec<String>> {
                assert!(ignore_file.ends_with(".gitignore"));
                Ok(vec!["*.log".to_string()])
            }
        }

        let settings = ScanSettings {
            extra_ignores: vec!["!important.log".to_string()],
            ..ScanSettings::default()
        };
        let f = IgnoreFilter::for_repository(Path::new("/repo"), &settings, &StaticRules)
            .unwrap();

        assert_eq!(f.rule_count(), 2);
        assert!(f.should_skip(Path::new("trace.log"), false));
        assert!(!f.should_skip(Path::new("important.log"), false));
    }
}
