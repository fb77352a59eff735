//! Repository Store
//!
//! Maps repository identifiers to working directories under a single root and
//! tracks when each was last synchronised. The store never touches the
//! network; it only reserves paths and records freshness.
//!
//! Each identifier owns a guard so that at most one clone or pull runs for it
//! at a time. There is no store-wide lock held across I/O.

use crate::core::error::{ErrorContext, ScannerError, ScannerResult};
use crate::core::sync::LockResultExt;
use crate::repository::identifier::{IdentifierKind, RepositoryIdentifier};
use crate::repository::types::RepositoryReference;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

/// Marker in the name of a staging directory used while cloning
pub(crate) const PARTIAL_MARKER: &str = ".partial-";

#[derive(Debug, Clone)]
struct StoreEntry {
    name: String,
    path: PathBuf,
    remote_url: Option<String>,
    last_synced: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct RepositoryStore {
    root: PathBuf,
    entries: RwLock<HashMap<String, StoreEntry>>,
    guards: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

const COMPONENT: &str = "repository_store";

fn read_origin_url(path: &Path) -> Option<String> {
    let repo = gix::open(path).ok()?;
    let config = repo.config_snapshot();
    let url = config.string("remote.origin.url").map(|url| url.to_string());
    url
}

impl RepositoryStore {
    /// Store rooted at `root` with no known repositories
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: RwLock::new(HashMap::new()),
            guards: Mutex::new(HashMap::new()),
        }
    }

    /// Open the store at `root`, re-registering every clone already on disk
    ///
    /// Clones are keyed by their `origin` remote when one is configured, and by
    /// directory name otherwise. Leftover staging directories from an
    /// interrupted clone are removed.
    pub fn open(root: impl Into<PathBuf>) -> ScannerResult<Self> {
        let store = Self::new(root);
        let context = ErrorContext::new("open_store", COMPONENT)
            .with_file_path(store.root.display().to_string());

        std::fs::create_dir_all(&store.root)
            .map_err(|e| ScannerError::from(e).with_context(&context))?;

        let mut dirs = std::fs::read_dir(&store.root)
            .map_err(|e| ScannerError::from(e).with_context(&context))?
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .collect::<Vec<_>>();
        dirs.sort_by_key(|entry| entry.file_name());

        {
            let mut entries = store.entries.write().or_poisoned("entries", COMPONENT)?;
            for dir in dirs {
                let name = dir.file_name().to_string_lossy().to_string();
                let path = dir.path();

                if name.starts_with('.') {
                    if name.contains(PARTIAL_MARKER) {
                        match std::fs::remove_dir_all(&path) {
                            Ok(()) => log::warn!("Removed incomplete clone {}", path.display()),
                            Err(e) => log::warn!(
                                "Failed to remove incomplete clone {}: {}",
                                path.display(),
                                e
                            ),
                        }
                    }
                    continue;
                }

                let last_synced = dir
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .map(DateTime::<Utc>::from);
                let remote_url = read_origin_url(&path);
                let key = remote_url
                    .as_deref()
                    .and_then(|url| RepositoryIdentifier::parse(url).ok())
                    .map(|id| id.key().to_string())
                    .unwrap_or_else(|| name.clone());

                if entries.contains_key(&key) {
                    log::warn!(
                        "Skipping {}: another directory already holds {}",
                        path.display(),
                        key
                    );
                    continue;
                }

                log::debug!("Registered {} as {}", path.display(), key);
                entries.insert(
                    key,
                    StoreEntry {
                        name,
                        path,
                        remote_url,
                        last_synced,
                    },
                );
            }
            log::info!(
                "Repository store at {} holds {} repositories",
                store.root.display(),
                entries.len()
            );
        }

        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn find<'a>(
        entries: &'a HashMap<String, StoreEntry>,
        id: &RepositoryIdentifier,
    ) -> Option<(&'a String, &'a StoreEntry)> {
        match id.kind() {
            IdentifierKind::Name => entries
                .get_key_value(id.key())
                .or_else(|| entries.iter().find(|(_, entry)| entry.name == id.name())),
            IdentifierKind::Remote | IdentifierKind::LocalPath => entries.get_key_value(id.key()),
        }
    }

    /// Working directory for `id`, reserving one on first use
    ///
    /// The path is `<root>/<name>`; when that is already taken by a different
    /// repository, a short hash of the identifier is appended. Bare names only
    /// resolve to repositories that are already known.
    pub fn resolve(&self, id: &RepositoryIdentifier) -> ScannerResult<PathBuf> {
        {
            let entries = self.entries.read().or_poisoned("entries", COMPONENT)?;
            if let Some((_, entry)) = Self::find(&entries, id) {
                return Ok(entry.path.clone());
            }
        }

        if id.kind() == IdentifierKind::Name {
            return Err(ScannerError::not_found(format!(
                "No local repository named '{}'",
                id.name()
            )));
        }

        let mut entries = self.entries.write().or_poisoned("entries", COMPONENT)?;
        if let Some(entry) = entries.get(id.key()) {
            return Ok(entry.path.clone());
        }

        let path = self.claim_path(&entries, id);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| id.name().to_string());
        entries.insert(
            id.key().to_string(),
            StoreEntry {
                name,
                path: path.clone(),
                remote_url: id.clone_url().map(str::to_string),
                last_synced: None,
            },
        );
        log::debug!("Reserved {} for {}", path.display(), id.key());
        Ok(path)
    }

    fn claim_path(&self, entries: &HashMap<String, StoreEntry>, id: &RepositoryIdentifier) -> PathBuf {
        let taken = |candidate: &Path| {
            candidate.exists() || entries.values().any(|entry| entry.path == candidate)
        };

        let base = self.root.join(id.name());
        if !taken(&base) {
            return base;
        }

        let digest = format!("{:x}", Sha256::digest(id.key().as_bytes()));
        self.root.join(format!("{}-{}", id.name(), &digest[..8]))
    }

    /// True when `id` has a working directory on disk
    pub fn exists(&self, id: &RepositoryIdentifier) -> ScannerResult<bool> {
        let entries = self.entries.read().or_poisoned("entries", COMPONENT)?;
        Ok(Self::find(&entries, id).is_some_and(|(_, entry)| entry.path.is_dir()))
    }

    /// Record a successful synchronisation of `id`
    pub fn touch(&self, id: &RepositoryIdentifier) -> ScannerResult<DateTime<Utc>> {
        let mut entries = self.entries.write().or_poisoned("entries", COMPONENT)?;
        let key = Self::find(&entries, id)
            .map(|(key, _)| key.clone())
            .ok_or_else(|| {
                ScannerError::not_found(format!("Repository '{}' is not in the store", id))
            })?;

        let now = Utc::now();
        if let Some(entry) = entries.get_mut(&key) {
            entry.last_synced = Some(now);
        }
        Ok(now)
    }

    pub fn reference(&self, id: &RepositoryIdentifier) -> ScannerResult<RepositoryReference> {
        let entries = self.entries.read().or_poisoned("entries", COMPONENT)?;
        Self::find(&entries, id)
            .map(|(key, entry)| to_reference(key, entry))
            .ok_or_else(|| {
                ScannerError::not_found(format!("Repository '{}' is not in the store", id))
            })
    }

    /// Every repository with a working directory, ordered by name
    pub fn list(&self) -> ScannerResult<Vec<RepositoryReference>> {
        let entries = self.entries.read().or_poisoned("entries", COMPONENT)?;
        let mut references = entries
            .iter()
            .filter(|(_, entry)| entry.path.is_dir())
            .map(|(key, entry)| to_reference(key, entry))
            .collect::<Vec<_>>();
        references.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(references)
    }

    /// Guard serialising clone and pull for the repository behind `id`
    pub fn guard(&self, id: &RepositoryIdentifier) -> ScannerResult<Arc<tokio::sync::Mutex<()>>> {
        let key = {
            let entries = self.entries.read().or_poisoned("entries", COMPONENT)?;
            Self::find(&entries, id)
                .map(|(key, _)| key.clone())
                .unwrap_or_else(|| id.key().to_string())
        };

        let mut guards = self.guards.lock().or_poisoned("guards", COMPONENT)?;
        // entries only the map still holds are idle
        guards.retain(|_, guard| Arc::strong_count(guard) > 1);
        Ok(guards.entry(key).or_default().clone())
    }
}

fn to_reference(key: &str, entry: &StoreEntry) -> RepositoryReference {
    RepositoryReference {
        identifier: key.to_string(),
        name: entry.name.clone(),
        path: entry.path.clone(),
        remote_url: entry.remote_url.clone(),
        last_synced: entry.last_synced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use tempfile::TempDir;

    fn id(raw: &str) -> RepositoryIdentifier {
        RepositoryIdentifier::parse(raw).unwrap()
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let root = TempDir::new().unwrap();
        let store = RepositoryStore::new(root.path());

        let first = store.resolve(&id("https://github.com/owner/project.git")).unwrap();
        let again = store.resolve(&id("git@github.com:owner/project")).unwrap();

        assert_eq!(first, root.path().join("project"));
        assert_eq!(first, again);
        assert!(!store.exists(&id("https://github.com/owner/project")).unwrap());
    }

    #[test]
    fn test_name_collision_gets_hash_suffix() {
        let root = TempDir::new().unwrap();
        let store = RepositoryStore::new(root.path());

        let first = store.resolve(&id("https://github.com/alice/tools")).unwrap();
        let second = store.resolve(&id("https://gitlab.com/bob/tools")).unwrap();

        assert_eq!(first, root.path().join("tools"));
        assert_ne!(first, second);
        let suffixed = second.file_name().unwrap().to_string_lossy().to_string();
        assert!(suffixed.starts_with("tools-"));
        assert_eq!(suffixed.len(), "tools-".len() + 8);

        // stable on re-resolve
        assert_eq!(second, store.resolve(&id("https://gitlab.com/bob/tools.git")).unwrap());
    }

    #[test]
    fn test_unregistered_directory_is_not_reused() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("project")).unwrap();
        let store = RepositoryStore::new(root.path());

        let path = store.resolve(&id("https://example.org/x/project")).unwrap();
        assert_ne!(path, root.path().join("project"));
    }

    #[test]
    fn test_unknown_name_is_not_found() {
        let root = TempDir::new().unwrap();
        let store = RepositoryStore::new(root.path());

        let err = store.resolve(&id("nothing-here")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!store.exists(&id("nothing-here")).unwrap());
    }

    #[test]
    fn test_touch_and_list() {
        let root = TempDir::new().unwrap();
        let store = RepositoryStore::new(root.path());
        let project = id("https://github.com/owner/project");

        let path = store.resolve(&project).unwrap();
        assert!(store.list().unwrap().is_empty());

        std::fs::create_dir(&path).unwrap();
        let synced = store.touch(&project).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].identifier, "github.com/owner/project");
        assert_eq!(listed[0].last_synced, Some(synced));
        assert!(store.exists(&id("project")).unwrap());
    }

    #[test]
    fn test_touch_unknown_fails() {
        let root = TempDir::new().unwrap();
        let store = RepositoryStore::new(root.path());
        let err = store.touch(&id("https://github.com/owner/none")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_open_rebuilds_from_disk() {
        let root = TempDir::new().unwrap();

        let cloned = root.path().join("project");
        gix::init(&cloned).unwrap();
        let config = cloned.join(".git").join("config");
        let mut contents = std::fs::read_to_string(&config).unwrap();
        contents.push_str("[remote \"origin\"]\n\turl = https://github.com/owner/project.git\n");
        std::fs::write(&config, contents).unwrap();

        std::fs::create_dir(root.path().join("notes")).unwrap();
        std::fs::create_dir(root.path().join(".project.partial-1234")).unwrap();

        let store = RepositoryStore::open(root.path()).unwrap();

        let by_url = id("https://github.com/owner/project");
        assert!(store.exists(&by_url).unwrap());
        assert_eq!(store.resolve(&by_url).unwrap(), cloned);
        assert_eq!(
            store.reference(&id("project")).unwrap().remote_url.as_deref(),
            Some("https://github.com/owner/project.git")
        );

        let names = store
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["notes", "project"]);
        assert!(!root.path().join(".project.partial-1234").exists());
    }

    #[test]
    fn test_guard_is_shared_between_name_and_url() {
        let root = TempDir::new().unwrap();
        let store = RepositoryStore::new(root.path());
        let url = id("https://github.com/owner/project");
        let path = store.resolve(&url).unwrap();
        std::fs::create_dir(&path).unwrap();

        let a = store.guard(&url).unwrap();
        let b = store.guard(&id("project")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_idle_guards_are_released() {
        let root = TempDir::new().unwrap();
        let store = RepositoryStore::new(root.path());

        let held = store.guard(&id("https://github.com/owner/kept")).unwrap();
        for n in 0..20 {
            drop(store.guard(&id(&format!("https://github.com/owner/repo{}", n))).unwrap());
        }
        let last = store.guard(&id("https://github.com/owner/last")).unwrap();

        let guards = store.guards.lock().unwrap();
        assert_eq!(guards.len(), 2);
        assert!(guards.values().any(|guard| Arc::ptr_eq(guard, &held)));
        assert!(guards.values().any(|guard| Arc::ptr_eq(guard, &last)));
    }
}
