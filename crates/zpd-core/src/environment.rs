//! Process-wide environment: version, intern-table warm-up, search path
//!
//! The search path is shared by every instance. It is ordered, only
//! appended to or cleared, and consulted first-match-wins when a patch is
//! loaded without an explicit directory.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::symbol;
use crate::types::Version;

static SEARCH_PATH: RwLock<SearchPath> = RwLock::new(SearchPath::new());

/// Engine version, from the crate version
pub fn version() -> Version {
    Version {
        major: env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
        minor: env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
        bug: env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
    }
}

pub fn version_major() -> u32 {
    version().major
}

pub fn version_minor() -> u32 {
    version().minor
}

pub fn version_bug() -> u32 {
    version().bug
}

/// Prepare the shared tables before any instance is created
///
/// Idempotent. Call it from the main thread at start-up so the first
/// intern never happens on an audio thread.
pub fn init() {
    symbol::init_tables();
    log::debug!("zpd {} environment initialized", version());
}

/// Reset the process-wide state that can be reset (the search path)
///
/// Interned names are permanent and survive a clear.
pub fn clear() {
    searchpath_clear();
}

/// Ordered list of directories searched for patch files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    pub const fn new() -> Self {
        Self { dirs: Vec::new() }
    }

    pub fn add(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.push(dir.into());
    }

    pub fn clear(&mut self) {
        self.dirs.clear();
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Locate `name`
    ///
    /// An absolute `name` is used as-is. A non-empty `search_dir` is the only
    /// place looked at. Otherwise the directories are tried in insertion
    /// order and the first existing file wins.
    pub fn resolve(&self, name: &str, search_dir: &str) -> Option<PathBuf> {
        let name_path = Path::new(name);
        if name_path.is_absolute() {
            return name_path.is_file().then(|| name_path.to_path_buf());
        }
        if !search_dir.is_empty() {
            let candidate = Path::new(search_dir).join(name);
            return candidate.is_file().then_some(candidate);
        }
        self.dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

/// Remove every directory from the global search path
pub fn searchpath_clear() {
    SEARCH_PATH
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
    log::debug!("Search path cleared");
}

/// Append a directory to the global search path
pub fn searchpath_add(dir: impl AsRef<Path>) {
    let dir = dir.as_ref();
    SEARCH_PATH
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add(dir);
    log::debug!("Search path added: {}", dir.display());
}

/// Snapshot of the global search path
pub fn searchpath() -> SearchPath {
    SEARCH_PATH
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Resolve a patch file through the global search path
pub(crate) fn resolve(name: &str, search_dir: &str) -> Option<PathBuf> {
    SEARCH_PATH
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .resolve(name, search_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_version_matches_crate() {
        let v = version();
        assert_eq!(v.to_string(), env!("CARGO_PKG_VERSION").split('-').next().unwrap());
        assert_eq!(version_major(), v.major);
    }

    #[test]
    fn test_first_match_wins() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        fs::write(a.path().join("x.pd"), "#N canvas 0 0 10 10 10;\n").unwrap();
        fs::write(b.path().join("x.pd"), "#N canvas 0 0 10 10 10;\n").unwrap();

        let mut path = SearchPath::new();
        path.add(a.path());
        path.add(b.path());
        assert_eq!(path.resolve("x.pd", ""), Some(a.path().join("x.pd")));

        path.clear();
        assert_eq!(path.resolve("x.pd", ""), None);
    }

    #[test]
    fn test_explicit_dir_is_exclusive() {
        let a = tempdir().unwrap();
        let empty = tempdir().unwrap();
        fs::write(a.path().join("y.pd"), "#N canvas 0 0 10 10 10;\n").unwrap();

        let mut path = SearchPath::new();
        path.add(a.path());
        let dir = empty.path().to_string_lossy().to_string();
        assert_eq!(path.resolve("y.pd", &dir), None);

        let dir = a.path().to_string_lossy().to_string();
        assert_eq!(path.resolve("y.pd", &dir), Some(a.path().join("y.pd")));
    }

    #[test]
    fn test_absolute_name() {
        let a = tempdir().unwrap();
        let file = a.path().join("z.pd");
        fs::write(&file, "#N canvas 0 0 10 10 10;\n").unwrap();
        let path = SearchPath::new();
        assert_eq!(path.resolve(&file.to_string_lossy(), ""), Some(file.clone()));
    }
}
