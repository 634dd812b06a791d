//! Filesystem view: the platform queries the directory tree is built on.
//!
//! Two implementations ship with the crate:
//! - `LocalFileSystem`: the native filesystem via `std::fs`
//! - `MemoryFileSystem`: an in-memory tree with listing counters, used by tests
//!   and by embedders that want to present a synthetic hierarchy
//!
//! The trait is synchronous and single-threaded; listings block the caller.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::fs::operations;

/// A directory entry returned by `FileSystemView::list_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Full path to the entry.
    pub path: PathBuf,
    /// Last component of the path.
    pub name: String,
    /// Whether the entry is a directory (symlinks are followed).
    pub is_dir: bool,
}

/// Platform filesystem queries used by the tree and the icon manager.
pub trait FileSystemView {
    /// Top-level entry points, e.g. `/` or one entry per drive letter.
    fn roots(&self) -> Vec<PathBuf>;

    /// Whether `path` is a drive/volume root, displayed by its full path.
    fn is_drive(&self, path: &Path) -> bool;

    /// Whether `path` is hidden by platform convention.
    fn is_hidden(&self, path: &Path) -> bool;

    /// Human-readable label for `path`.
    fn display_name(&self, path: &Path) -> String;

    /// Native per-path glyph, if the platform has one.
    fn system_icon(&self, path: &Path) -> Option<String>;

    /// List the direct children of `path`.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Whether `path` exists at all (file or directory).
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create a single new directory.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// The user's home directory.
    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    /// `path` made absolute against the working directory. `.` and `..` are
    /// left for the caller to fold.
    fn absolute(&self, path: &Path) -> PathBuf {
        std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Last path segment, or the whole path when there is none (roots).
pub(crate) fn last_segment(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

// ============================================================================
// LocalFileSystem
// ============================================================================

/// Native filesystem view.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }

    #[cfg(windows)]
    fn drive_roots() -> Vec<PathBuf> {
        let drives: Vec<PathBuf> = (b'A'..=b'Z')
            .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
            .filter(|p| p.exists())
            .collect();
        if drives.is_empty() {
            vec![PathBuf::from("C:\\")]
        } else {
            drives
        }
    }
}

impl FileSystemView for LocalFileSystem {
    fn roots(&self) -> Vec<PathBuf> {
        #[cfg(windows)]
        {
            Self::drive_roots()
        }
        #[cfg(not(windows))]
        {
            vec![PathBuf::from("/")]
        }
    }

    fn is_drive(&self, path: &Path) -> bool {
        cfg!(windows)
            && path.parent().is_none()
            && matches!(path.components().next(), Some(Component::Prefix(_)))
    }

    fn is_hidden(&self, path: &Path) -> bool {
        let dotted = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        #[cfg(windows)]
        {
            use std::os::windows::fs::MetadataExt;
            const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
            let flagged = std::fs::metadata(path)
                .map(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
                .unwrap_or(false);
            dotted || (flagged && !self.is_drive(path))
        }
        #[cfg(not(windows))]
        {
            dotted
        }
    }

    fn display_name(&self, path: &Path) -> String {
        if self.is_drive(path) {
            path.to_string_lossy().to_string()
        } else {
            last_segment(path)
        }
    }

    fn system_icon(&self, path: &Path) -> Option<String> {
        if self.is_drive(path) {
            return Some("◉".to_string());
        }
        if self.home_dir().as_deref() == Some(path) {
            return Some("⌂".to_string());
        }
        let meta = std::fs::symlink_metadata(path).ok()?;
        if meta.file_type().is_symlink() {
            Some("↪".to_string())
        } else if meta.is_dir() {
            Some("■".to_string())
        } else {
            None
        }
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let entry_path = entry.path();
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                is_dir: entry_path.is_dir(),
                path: entry_path,
            });
        }
        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        operations::create_dir(path)
    }
}

// ============================================================================
// MemoryFileSystem
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct MemEntry {
    is_dir: bool,
    hidden: bool,
}

/// In-memory filesystem view.
///
/// Directories and files are registered by absolute path; parents are created
/// implicitly. Every `list_dir` call is counted per path, and individual
/// directories can be marked as failing to simulate permission errors.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    roots: Vec<PathBuf>,
    drives: bool,
    home: Option<PathBuf>,
    working_dir: Option<PathBuf>,
    entries: RefCell<BTreeMap<PathBuf, MemEntry>>,
    failing: RefCell<HashSet<PathBuf>>,
    listings: RefCell<HashMap<PathBuf, usize>>,
}

impl MemoryFileSystem {
    /// Create a filesystem with the given roots. Roots are directories.
    pub fn new<P: AsRef<Path>>(roots: &[P]) -> Self {
        let fs = Self {
            roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
            ..Default::default()
        };
        for root in &fs.roots {
            fs.entries.borrow_mut().insert(
                root.clone(),
                MemEntry {
                    is_dir: true,
                    hidden: false,
                },
            );
        }
        fs
    }

    /// Treat every root as a drive (multi-volume layout).
    pub fn with_drives(mut self) -> Self {
        self.drives = true;
        self
    }

    /// Set the home directory reported by `home_dir`.
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Set the directory relative paths are taken against. Defaults to the
    /// first root.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Register a directory (and its missing parents).
    pub fn add_dir(&self, path: impl AsRef<Path>) -> &Self {
        self.insert(path.as_ref(), true);
        self
    }

    /// Register a regular file (and its missing parent directories).
    pub fn add_file(&self, path: impl AsRef<Path>) -> &Self {
        self.insert(path.as_ref(), false);
        self
    }

    /// Mark an existing entry as hidden regardless of its name.
    pub fn hide(&self, path: impl AsRef<Path>) -> &Self {
        if let Some(entry) = self.entries.borrow_mut().get_mut(path.as_ref()) {
            entry.hidden = true;
        }
        self
    }

    /// Make listings of `path` fail with `PermissionDenied`.
    pub fn fail_listing(&self, path: impl AsRef<Path>) -> &Self {
        self.failing
            .borrow_mut()
            .insert(path.as_ref().to_path_buf());
        self
    }

    /// Remove an entry and everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) -> &Self {
        let path = path.as_ref();
        self.entries.borrow_mut().retain(|p, _| !p.starts_with(path));
        self
    }

    /// Number of `list_dir` calls made for `path`.
    pub fn listing_count(&self, path: impl AsRef<Path>) -> usize {
        self.listings
            .borrow()
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    fn insert(&self, path: &Path, is_dir: bool) {
        let mut entries = self.entries.borrow_mut();
        let mut ancestor = path.parent();
        while let Some(dir) = ancestor {
            if dir.as_os_str().is_empty() || entries.contains_key(dir) {
                break;
            }
            entries.insert(
                dir.to_path_buf(),
                MemEntry {
                    is_dir: true,
                    hidden: false,
                },
            );
            ancestor = dir.parent();
        }
        entries.insert(
            path.to_path_buf(),
            MemEntry {
                is_dir,
                hidden: false,
            },
        );
    }
}

impl FileSystemView for MemoryFileSystem {
    fn roots(&self) -> Vec<PathBuf> {
        self.roots.clone()
    }

    fn is_drive(&self, path: &Path) -> bool {
        self.drives && self.roots.iter().any(|r| r == path)
    }

    fn is_hidden(&self, path: &Path) -> bool {
        let flagged = self
            .entries
            .borrow()
            .get(path)
            .is_some_and(|e| e.hidden);
        flagged
            || path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'))
    }

    fn display_name(&self, path: &Path) -> String {
        if self.is_drive(path) {
            path.to_string_lossy().to_string()
        } else {
            last_segment(path)
        }
    }

    fn system_icon(&self, path: &Path) -> Option<String> {
        if self.is_drive(path) {
            Some("◉".to_string())
        } else if self.is_dir(path) {
            Some("■".to_string())
        } else {
            None
        }
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        *self
            .listings
            .borrow_mut()
            .entry(path.to_path_buf())
            .or_insert(0) += 1;

        if self.failing.borrow().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{}: permission denied", path.display()),
            ));
        }
        let entries = self.entries.borrow();
        match entries.get(path) {
            Some(entry) if entry.is_dir => {}
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("{}: not a directory", path.display()),
                ))
            }
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{}: no such directory", path.display()),
                ))
            }
        }
        Ok(entries
            .iter()
            .filter(|(p, _)| p.parent() == Some(path) && p.as_path() != path)
            .map(|(p, e)| DirEntry {
                path: p.clone(),
                name: last_segment(p),
                is_dir: e.is_dir,
            })
            .collect())
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries.borrow().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.entries.borrow().get(path).is_some_and(|e| e.is_dir)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        if self.entries.borrow().contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{}: already exists", path.display()),
            ));
        }
        match path.parent() {
            Some(parent) if self.is_dir(parent) => {}
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{}: parent does not exist", path.display()),
                ))
            }
        }
        if self
            .failing
            .borrow()
            .iter()
            .any(|f| path.parent() == Some(f.as_path()))
        {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{}: permission denied", path.display()),
            ));
        }
        self.insert(path, true);
        Ok(())
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home.clone()
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if self.roots.iter().any(|root| path.starts_with(root)) {
            return path.to_path_buf();
        }
        match self.working_dir.as_ref().or(self.roots.first()) {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        }
    }
}
