use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::fs::change::{ChangeListeners, DirectoryChangeEvent, ListenerId};
use crate::fs::node::{DirectoryNode, TreeRoot, DEFAULT_ROOT_LABEL};
use crate::fs::operations;
use crate::fs::view::FileSystemView;

/// Construction-time options of a directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeOptions {
    /// Include hidden directories in listings.
    pub show_hidden: bool,
    /// Allow several directories to be selected at once.
    pub multi_selection: bool,
    /// Return multi-selections sorted by path.
    pub sort_selected: bool,
    /// Label of the synthetic node shown above several roots.
    pub root_label: String,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            show_hidden: false,
            multi_selection: false,
            sort_selected: false,
            root_label: DEFAULT_ROOT_LABEL.to_string(),
        }
    }
}

/// What a flattened row stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Drive,
    Directory,
}

/// A flattened representation of a tree node for rendering.
#[derive(Debug, Clone)]
pub struct FlatItem {
    pub name: String,
    pub path: PathBuf,
    pub kind: ItemKind,
    pub depth: usize,
    pub is_expanded: bool,
    /// Scanned and without child directories.
    pub is_leaf: bool,
    pub is_last_sibling: bool,
    pub is_hidden: bool,
    pub is_home: bool,
    /// The listing failed; rendered like an empty directory.
    pub expansion_failed: bool,
}

/// The directory tree: node hierarchy, navigation, selection and change
/// notification.
///
/// `current_directory` always names a materialized node, or is `None`.
/// Navigation to a path that does not resolve leaves all state untouched.
pub struct DirectoryTree {
    view: Rc<dyn FileSystemView>,
    options: TreeOptions,
    root: TreeRoot,
    current_dir: Option<PathBuf>,
    last_dir: Option<PathBuf>,
    /// Directories toggled into the multi-selection, in toggle order.
    multi_selected: Vec<PathBuf>,
    listeners: ChangeListeners,
    home: Option<PathBuf>,
    pub flat_items: Vec<FlatItem>,
    pub selected_index: usize,
    pub scroll_offset: usize,
}

impl DirectoryTree {
    /// Build the tree over the view's roots. No directory is current yet.
    pub fn new(view: Rc<dyn FileSystemView>, options: TreeOptions) -> Self {
        let root = Self::build_root(&view, &options);
        let home = view.home_dir();
        let mut tree = Self {
            view,
            options,
            root,
            current_dir: None,
            last_dir: None,
            multi_selected: Vec::new(),
            listeners: ChangeListeners::new(),
            home,
            flat_items: Vec::new(),
            selected_index: 0,
            scroll_offset: 0,
        };
        tree.flatten();
        tree
    }

    fn build_root(view: &Rc<dyn FileSystemView>, options: &TreeOptions) -> TreeRoot {
        let roots = view.roots();
        debug!(count = roots.len(), "building directory tree");
        TreeRoot::build(
            roots,
            &options.root_label,
            options.show_hidden,
            Rc::clone(view),
        )
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub fn view(&self) -> &Rc<dyn FileSystemView> {
        &self.view
    }

    pub fn root(&self) -> &TreeRoot {
        &self.root
    }

    pub fn is_multi_root(&self) -> bool {
        matches!(self.root, TreeRoot::Multi(_))
    }

    pub fn current_directory(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Directory that was current before the last change.
    pub fn last_directory(&self) -> Option<&Path> {
        self.last_dir.as_deref()
    }

    pub fn home_directory(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    pub fn show_hidden(&self) -> bool {
        self.options.show_hidden
    }

    pub fn is_multi_selection_enabled(&self) -> bool {
        self.options.multi_selection
    }

    pub fn set_multi_selection_enabled(&mut self, enabled: bool) {
        self.options.multi_selection = enabled;
        if !enabled {
            self.multi_selected.clear();
        }
    }

    pub fn is_sort_selected(&self) -> bool {
        self.options.sort_selected
    }

    pub fn set_sort_selected(&mut self, sort: bool) {
        self.options.sort_selected = sort;
    }

    /// Materialized node at `path`, if any.
    pub fn node(&self, path: &Path) -> Option<&DirectoryNode> {
        self.root.find(path)
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    pub fn add_change_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&DirectoryChangeEvent) + 'static,
    {
        self.listeners.add(listener)
    }

    pub fn remove_change_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Record a new current directory and notify listeners if it changed.
    fn update_current(&mut self, current: Option<PathBuf>) {
        if self.current_dir == current {
            return;
        }
        let previous = std::mem::replace(&mut self.current_dir, current.clone());
        self.last_dir = previous.clone();
        debug!(
            previous = ?previous,
            current = ?current,
            "current directory changed"
        );
        self.listeners
            .notify(&DirectoryChangeEvent { previous, current });
    }

    // ------------------------------------------------------------------
    // Path resolution
    // ------------------------------------------------------------------

    /// Split `path` into the names matched level by level from the root.
    ///
    /// Relative paths are taken against the view's working directory, `.` and
    /// `..` are folded lexically, an existing file is replaced by its parent,
    /// and a drive contributes its full path string as one element.
    pub fn to_path_elements(&self, path: &Path) -> Vec<String> {
        let absolute = self.view.absolute(path);
        let mut normalized = PathBuf::new();
        for component in absolute.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                other => normalized.push(other.as_os_str()),
            }
        }

        let mut dir = normalized;
        if self.view.exists(&dir) && !self.view.is_dir(&dir) {
            if let Some(parent) = dir.parent() {
                dir = parent.to_path_buf();
            }
        }

        let mut elements = Vec::new();
        let mut cursor = Some(dir.as_path());
        while let Some(current) = cursor {
            if self.view.is_drive(current) {
                elements.push(current.to_string_lossy().to_string());
                break;
            }
            if let Some(name) = current.file_name() {
                let name = name.to_string_lossy();
                if !name.is_empty() {
                    elements.push(name.to_string());
                }
            }
            cursor = current.parent();
        }
        elements.reverse();
        elements
    }

    /// Expand the nodes along `path` without selecting it.
    ///
    /// Returns the node for `path` once every element matched.
    pub fn expand_directory(&mut self, path: &Path) -> Option<&DirectoryNode> {
        let resolved = self.resolve(path)?;
        self.reveal(&resolved);
        self.flatten();
        self.root.find(&resolved)
    }

    fn resolve(&mut self, path: &Path) -> Option<PathBuf> {
        let elements = self.to_path_elements(path);
        self.root
            .resolve(&elements)
            .map(|node| node.path().to_path_buf())
    }

    /// Mark every materialized ancestor of `path` as expanded.
    fn reveal(&mut self, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if let Some(node) = self.root.find_mut(ancestor) {
                node.expanded = true;
            }
        }
    }

    /// Expand the ancestors of `path` so its row is part of the flattened view.
    pub fn ensure_visible(&mut self, path: &Path) {
        self.reveal(path);
        self.flatten();
    }

    /// Navigate to `path`. Returns false, changing nothing, if it does not resolve.
    pub fn set_current_directory(&mut self, path: &Path) -> bool {
        let Some(resolved) = self.resolve(path) else {
            debug!(path = %path.display(), "directory does not resolve, ignoring");
            return false;
        };
        self.reveal(&resolved);
        self.flatten();
        self.select_path(&resolved);
        true
    }

    /// Select the given directories.
    ///
    /// Without multi-selection only the first path is honoured. Paths that do not
    /// resolve are skipped. The first resolved path becomes current.
    pub fn set_selected_directories(&mut self, paths: &[PathBuf]) {
        if !self.options.multi_selection {
            if let Some(first) = paths.first() {
                self.set_current_directory(first);
            }
            return;
        }

        let mut resolved = Vec::new();
        for path in paths {
            match self.resolve(path) {
                Some(p) => {
                    self.reveal(&p);
                    if !resolved.contains(&p) {
                        resolved.push(p);
                    }
                }
                None => debug!(path = %path.display(), "skipping unresolvable selection"),
            }
        }
        self.flatten();
        if let Some(first) = resolved.first().cloned() {
            self.select_path(&first);
        }
        self.multi_selected = resolved;
    }

    /// The selection: toggled directories in multi-selection mode, else the
    /// current directory.
    pub fn selected_directories(&self) -> Vec<PathBuf> {
        if self.options.multi_selection && !self.multi_selected.is_empty() {
            let mut selected = self.multi_selected.clone();
            if self.options.sort_selected {
                selected.sort();
            }
            return selected;
        }
        self.current_dir.iter().cloned().collect()
    }

    pub fn is_multi_selected(&self, path: &Path) -> bool {
        self.multi_selected.iter().any(|p| p == path)
    }

    pub fn multi_selected_count(&self) -> usize {
        self.multi_selected.len()
    }

    /// Toggle membership of the cursor row in the multi-selection.
    pub fn toggle_multi_select(&mut self) {
        if !self.options.multi_selection {
            return;
        }
        let Some(item) = self.flat_items.get(self.selected_index) else {
            return;
        };
        let path = item.path.clone();
        if let Some(pos) = self.multi_selected.iter().position(|p| *p == path) {
            self.multi_selected.remove(pos);
        } else {
            self.multi_selected.push(path);
        }
    }

    pub fn clear_multi_select(&mut self) {
        self.multi_selected.clear();
    }

    // ------------------------------------------------------------------
    // Rebuild and rescan
    // ------------------------------------------------------------------

    /// Rebuild the whole tree from the roots and reselect the current directory.
    ///
    /// Expanded branches are restored. If the current directory vanished, its
    /// nearest surviving ancestor becomes current.
    pub fn refresh(&mut self) {
        let expanded = self.collect_expanded_paths();
        let remembered = self.current_dir.clone();
        let selection = std::mem::take(&mut self.multi_selected);

        self.root = Self::build_root(&self.view, &self.options);
        self.restore_expanded(&expanded);

        for path in selection {
            if let Some(resolved) = self.resolve(&path) {
                self.reveal(&resolved);
                if !self.multi_selected.contains(&resolved) {
                    self.multi_selected.push(resolved);
                }
            }
        }

        let target = remembered
            .as_deref()
            .and_then(|dir| self.resolve_nearest(dir));
        if let (Some(before), Some(after)) = (&remembered, &target) {
            if before != after {
                info!(
                    previous = %before.display(),
                    fallback = %after.display(),
                    "current directory vanished, selecting ancestor"
                );
            }
        }
        if let Some(target) = &target {
            self.reveal(target);
        }
        self.flatten();
        match target {
            Some(path) => self.select_path(&path),
            None => self.update_current(None),
        }
    }

    /// Resolve `path` or, failing that, its closest resolvable ancestor.
    fn resolve_nearest(&mut self, path: &Path) -> Option<PathBuf> {
        path.ancestors().find_map(|candidate| {
            if self.view.is_dir(candidate) {
                self.resolve(candidate)
            } else {
                None
            }
        })
    }

    /// Change the hidden-directory policy. The tree is rebuilt.
    pub fn set_show_hidden(&mut self, show: bool) {
        self.options.show_hidden = show;
        self.refresh();
    }

    /// Re-list one directory from disk, keeping expanded sub-branches.
    ///
    /// Returns false if `dir` is not part of the materialized tree.
    pub fn rescan_directory(&mut self, dir: &Path) -> bool {
        let expanded: Vec<PathBuf> = self
            .collect_expanded_paths()
            .into_iter()
            .filter(|p| p.starts_with(dir) && p != dir)
            .collect();
        let Some(node) = self.root.find_mut(dir) else {
            return false;
        };
        node.reset();
        node.expand_if_necessary();
        let expanded = expanded.into_iter().collect();
        self.restore_expanded(&expanded);

        let root = &self.root;
        self.multi_selected
            .retain(|p| !p.starts_with(dir) || root.find(p).is_some());

        let current = self.current_dir.clone();
        let target = match current {
            Some(cur) if cur.starts_with(dir) && self.root.find(&cur).is_none() => {
                cur.ancestors().find(|a| self.root.find(a).is_some()).map(Path::to_path_buf)
            }
            other => other,
        };
        self.flatten();
        match target {
            Some(path) => self.select_path(&path),
            None => self.update_current(None),
        }
        true
    }

    /// Re-list the current directory only.
    pub fn rescan_current_directory(&mut self) -> bool {
        match self.current_dir.clone() {
            Some(dir) => self.rescan_directory(&dir),
            None => false,
        }
    }

    /// Create `name` below the current directory and navigate into it.
    pub fn new_folder(&mut self, name: &str) -> Result<PathBuf> {
        let name = operations::validate_folder_name(name)?;
        let parent = self
            .current_dir
            .clone()
            .ok_or(AppError::NoCurrentDirectory)?;
        let target = parent.join(name);
        self.view.create_dir(&target)?;
        info!(path = %target.display(), "created folder");

        self.rescan_directory(&parent);
        if let Some(node) = self.root.find_mut(&parent) {
            node.expanded = true;
        }
        if !self.set_current_directory(&target) {
            // e.g. a dot-prefixed name while hidden directories are filtered
            warn!(path = %target.display(), "new folder is not visible in the tree");
            self.flatten();
        }
        Ok(target)
    }

    // ------------------------------------------------------------------
    // Flattening
    // ------------------------------------------------------------------

    /// Rebuild the flat items list and move the cursor onto the current directory.
    pub fn flatten(&mut self) {
        self.flat_items.clear();
        let top = self.root.top_level();
        for (i, node) in top.iter().enumerate() {
            Self::flatten_node(
                node,
                0,
                i + 1 == top.len(),
                self.home.as_deref(),
                &mut self.flat_items,
            );
        }

        if let Some(idx) = self
            .current_dir
            .as_deref()
            .and_then(|cur| self.find_index_by_path(cur))
        {
            self.selected_index = idx;
        } else if !self.flat_items.is_empty() && self.selected_index >= self.flat_items.len() {
            self.selected_index = self.flat_items.len() - 1;
        } else if self.flat_items.is_empty() {
            self.selected_index = 0;
        }
    }

    fn flatten_node(
        node: &DirectoryNode,
        depth: usize,
        is_last: bool,
        home: Option<&Path>,
        items: &mut Vec<FlatItem>,
    ) {
        items.push(FlatItem {
            name: node.display_name().to_string(),
            path: node.path().to_path_buf(),
            kind: if node.is_drive() {
                ItemKind::Drive
            } else {
                ItemKind::Directory
            },
            depth,
            is_expanded: node.expanded,
            is_leaf: node.is_leaf(),
            is_last_sibling: is_last,
            is_hidden: node.is_hidden(),
            is_home: home == Some(node.path()),
            expansion_failed: node.expansion_failed(),
        });

        if node.expanded {
            let children = node.children();
            for (i, child) in children.iter().enumerate() {
                Self::flatten_node(child, depth + 1, i + 1 == children.len(), home, items);
            }
        }
    }

    /// Find the flat_items index of a node by its path.
    pub fn find_index_by_path(&self, path: &Path) -> Option<usize> {
        self.flat_items.iter().position(|item| item.path == path)
    }

    /// Collect all expanded directory paths, materialized or not shown.
    pub fn collect_expanded_paths(&self) -> HashSet<PathBuf> {
        fn walk(node: &DirectoryNode, out: &mut HashSet<PathBuf>) {
            if node.expanded {
                out.insert(node.path().to_path_buf());
            }
            for child in node.children() {
                walk(child, out);
            }
        }
        let mut out = HashSet::new();
        for node in self.root.top_level() {
            walk(node, &mut out);
        }
        out
    }

    /// Re-expand directories from a saved set, ancestors first.
    pub fn restore_expanded(&mut self, expanded: &HashSet<PathBuf>) {
        for path in Self::expanded_paths_in_restore_order(expanded) {
            if let Some(resolved) = self.resolve(path) {
                if let Some(node) = self.root.find_mut(&resolved) {
                    node.expanded = true;
                }
            }
        }
    }

    /// Return expanded paths sorted so ancestors are restored before descendants.
    fn expanded_paths_in_restore_order(expanded: &HashSet<PathBuf>) -> Vec<&PathBuf> {
        let mut ordered: Vec<&PathBuf> = expanded.iter().collect();
        ordered.sort_by(|a, b| {
            a.components()
                .count()
                .cmp(&b.components().count())
                .then_with(|| a.cmp(b))
        });
        ordered
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    /// Move the cursor to a row; the row's directory becomes current.
    pub fn select_index(&mut self, index: usize) {
        let Some(item) = self.flat_items.get(index) else {
            return;
        };
        let path = item.path.clone();
        self.selected_index = index;
        self.update_current(Some(path));
    }

    fn select_path(&mut self, path: &Path) {
        if let Some(idx) = self.find_index_by_path(path) {
            self.selected_index = idx;
        }
        self.update_current(Some(path.to_path_buf()));
    }

    pub fn select_next(&mut self) {
        if self.current_dir.is_none() {
            self.select_index(0);
        } else if self.selected_index + 1 < self.flat_items.len() {
            self.select_index(self.selected_index + 1);
        }
    }

    pub fn select_previous(&mut self) {
        if self.current_dir.is_none() {
            self.select_index(0);
        } else if self.selected_index > 0 {
            self.select_index(self.selected_index - 1);
        }
    }

    pub fn select_first(&mut self) {
        self.select_index(0);
    }

    pub fn select_last(&mut self) {
        if !self.flat_items.is_empty() {
            self.select_index(self.flat_items.len() - 1);
        }
    }

    pub fn page_down(&mut self, page: usize) {
        if self.flat_items.is_empty() {
            return;
        }
        let target = (self.selected_index + page.max(1)).min(self.flat_items.len() - 1);
        self.select_index(target);
    }

    pub fn page_up(&mut self, page: usize) {
        let target = self.selected_index.saturating_sub(page.max(1));
        self.select_index(target);
    }

    /// Expand the cursor directory, listing it if necessary.
    pub fn expand_selected(&mut self) {
        let Some(item) = self.flat_items.get(self.selected_index) else {
            return;
        };
        let path = item.path.clone();
        if let Some(node) = self.root.find_mut(&path) {
            node.expand_if_necessary();
            if !node.expanded {
                node.expanded = true;
                self.flatten();
            }
        }
        if self.current_dir.is_none() {
            self.select_path(&path);
        }
    }

    /// Collapse the cursor directory, or move to its parent row.
    pub fn collapse_selected(&mut self) {
        let Some(item) = self.flat_items.get(self.selected_index) else {
            return;
        };
        let path = item.path.clone();

        if item.is_expanded && !item.is_leaf {
            if let Some(node) = self.root.find_mut(&path) {
                node.expanded = false;
                self.flatten();
            }
            return;
        }

        if let Some(parent) = path.parent() {
            if let Some(idx) = self.find_index_by_path(parent) {
                self.select_index(idx);
            }
        }
    }

    /// Navigate to the parent of the current directory.
    pub fn change_to_parent_directory(&mut self) -> bool {
        let Some(parent) = self
            .current_dir
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
        else {
            return false;
        };
        self.set_current_directory(&parent)
    }

    /// Navigate to the user's home directory.
    pub fn go_home(&mut self) -> bool {
        match self.home.clone() {
            Some(home) => self.set_current_directory(&home),
            None => false,
        }
    }

    /// Update the scroll offset to ensure the selected item is visible.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected_index - visible_height + 1;
        }
    }
}

impl std::fmt::Debug for DirectoryTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryTree")
            .field("options", &self.options)
            .field("current_dir", &self.current_dir)
            .field("last_dir", &self.last_dir)
            .field("multi_selected", &self.multi_selected)
            .field("rows", &self.flat_items.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::view::{LocalFileSystem, MemoryFileSystem};
    use std::cell::RefCell;

    fn setup_fs() -> Rc<MemoryFileSystem> {
        let fs = MemoryFileSystem::new(&["/"]).with_home("/home/user");
        fs.add_dir("/home/user/docs")
            .add_dir("/home/user/Music")
            .add_dir("/home/user/.config/nvim")
            .add_file("/home/user/notes.txt")
            .add_dir("/home/other")
            .add_dir("/srv/www")
            .add_dir("/tmp");
        Rc::new(fs)
    }

    fn tree_with(fs: &Rc<MemoryFileSystem>, options: TreeOptions) -> DirectoryTree {
        let view: Rc<dyn FileSystemView> = fs.clone();
        DirectoryTree::new(view, options)
    }

    fn tree(fs: &Rc<MemoryFileSystem>) -> DirectoryTree {
        tree_with(fs, TreeOptions::default())
    }

    fn child_names(tree: &DirectoryTree, path: &str) -> Vec<String> {
        tree.node(Path::new(path))
            .unwrap()
            .children()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    fn record_changes(tree: &mut DirectoryTree) -> Rc<RefCell<Vec<DirectoryChangeEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        tree.add_change_listener(move |e| sink.borrow_mut().push(e.clone()));
        seen
    }

    #[test]
    fn new_tree_shows_single_root_without_current() {
        let fs = setup_fs();
        let tree = tree(&fs);
        assert!(!tree.is_multi_root());
        assert!(tree.current_directory().is_none());
        assert_eq!(tree.flat_items[0].path, PathBuf::from("/"));
        let names: Vec<&str> = tree.flat_items[1..].iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["home", "srv", "tmp"]);
    }

    #[test]
    fn path_elements_skip_root_and_fold_dots() {
        let fs = setup_fs();
        let tree = tree(&fs);
        assert_eq!(
            tree.to_path_elements(Path::new("/home/user/./docs/../docs")),
            vec!["home", "user", "docs"]
        );
        assert!(tree.to_path_elements(Path::new("/")).is_empty());
    }

    #[test]
    fn path_elements_use_parent_of_file() {
        let fs = setup_fs();
        let tree = tree(&fs);
        assert_eq!(
            tree.to_path_elements(Path::new("/home/user/notes.txt")),
            vec!["home", "user"]
        );
    }

    #[test]
    fn path_elements_stop_at_drive() {
        let fs = Rc::new(MemoryFileSystem::new(&["/vol/a", "/vol/b"]).with_drives());
        fs.add_dir("/vol/b/music/jazz");
        let tree = tree(&fs);
        assert_eq!(
            tree.to_path_elements(Path::new("/vol/b/music/jazz")),
            vec!["/vol/b", "music", "jazz"]
        );
    }

    #[test]
    fn expand_directory_resolves_existing_path() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        let node = tree.expand_directory(Path::new("/home/user/docs")).unwrap();
        assert_eq!(node.path(), Path::new("/home/user/docs"));
        // expanding does not select
        assert!(tree.current_directory().is_none());
        assert!(tree.find_index_by_path(Path::new("/home/user/docs")).is_some());
    }

    #[test]
    fn expand_directory_of_root() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        let node = tree.expand_directory(Path::new("/")).unwrap();
        assert_eq!(node.path(), Path::new("/"));
    }

    #[test]
    fn unresolvable_path_leaves_state_unchanged() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        assert!(tree.set_current_directory(Path::new("/home/user")));
        let seen = record_changes(&mut tree);

        assert!(tree.expand_directory(Path::new("/home/nobody/x")).is_none());
        assert!(!tree.set_current_directory(Path::new("/home/user/missing")));
        assert!(!tree.set_current_directory(Path::new("/nowhere")));
        assert_eq!(tree.current_directory(), Some(Path::new("/home/user")));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn hidden_directory_does_not_resolve_when_filtered() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        assert!(!tree.set_current_directory(Path::new("/home/user/.config")));
        tree.set_show_hidden(true);
        assert!(tree.set_current_directory(Path::new("/home/user/.config/nvim")));
    }

    #[test]
    fn set_current_directory_round_trip_and_last_directory() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        assert!(tree.set_current_directory(Path::new("/home/user/docs")));
        assert_eq!(tree.current_directory(), Some(Path::new("/home/user/docs")));
        assert!(tree.set_current_directory(Path::new("/srv/www")));
        assert_eq!(tree.current_directory(), Some(Path::new("/srv/www")));
        assert_eq!(tree.last_directory(), Some(Path::new("/home/user/docs")));
    }

    #[test]
    fn set_current_directory_moves_cursor_and_reveals_ancestors() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/home/user/docs"));
        let item = &tree.flat_items[tree.selected_index];
        assert_eq!(item.path, PathBuf::from("/home/user/docs"));
        assert_eq!(item.depth, 3);
        let home = tree.flat_items.iter().find(|i| i.path == Path::new("/home")).unwrap();
        assert!(home.is_expanded);
    }

    #[test]
    fn listeners_receive_one_notification_each_in_order() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/tmp"));

        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second"] {
            let sink = Rc::clone(&seen);
            tree.add_change_listener(move |e| sink.borrow_mut().push((tag, e.clone())));
        }
        tree.set_current_directory(Path::new("/srv"));

        let expected = DirectoryChangeEvent {
            previous: Some(PathBuf::from("/tmp")),
            current: Some(PathBuf::from("/srv")),
        };
        assert_eq!(
            *seen.borrow(),
            vec![("first", expected.clone()), ("second", expected)]
        );
    }

    #[test]
    fn reselecting_same_directory_does_not_notify() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/tmp"));
        let seen = record_changes(&mut tree);
        tree.set_current_directory(Path::new("/tmp"));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn removed_listener_is_silent() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let id = tree.add_change_listener(move |_| *c.borrow_mut() += 1);
        tree.set_current_directory(Path::new("/tmp"));
        assert!(tree.remove_change_listener(id));
        tree.set_current_directory(Path::new("/srv"));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn show_hidden_toggle_changes_children() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/home/user"));
        tree.set_show_hidden(true);
        assert_eq!(
            child_names(&tree, "/home/user"),
            vec![".config", "docs", "Music"]
        );
        tree.set_show_hidden(false);
        assert_eq!(child_names(&tree, "/home/user"), vec!["docs", "Music"]);
        assert_eq!(tree.current_directory(), Some(Path::new("/home/user")));
    }

    #[test]
    fn hiding_current_hidden_directory_falls_back_to_parent() {
        let fs = setup_fs();
        let mut tree = tree_with(
            &fs,
            TreeOptions {
                show_hidden: true,
                ..TreeOptions::default()
            },
        );
        tree.set_current_directory(Path::new("/home/user/.config/nvim"));
        tree.set_show_hidden(false);
        assert_eq!(tree.current_directory(), Some(Path::new("/home/user")));
    }

    #[test]
    fn refresh_picks_up_new_directories_and_keeps_expansion() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/home/user/docs"));
        fs.add_dir("/home/user/Downloads");
        assert_eq!(child_names(&tree, "/home/user"), vec!["docs", "Music"]);

        tree.refresh();
        assert_eq!(
            child_names(&tree, "/home/user"),
            vec!["docs", "Downloads", "Music"]
        );
        assert_eq!(tree.current_directory(), Some(Path::new("/home/user/docs")));
        assert!(tree.collect_expanded_paths().contains(Path::new("/home/user")));
    }

    #[test]
    fn refresh_falls_back_to_nearest_ancestor() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/srv/www"));
        let seen = record_changes(&mut tree);
        fs.remove("/srv");
        tree.refresh();
        assert_eq!(tree.current_directory(), Some(Path::new("/")));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn refresh_without_resolvable_ancestor_clears_current() {
        let fs = Rc::new(MemoryFileSystem::new(&["/vol/a", "/vol/b"]).with_drives());
        fs.add_dir("/vol/b/x");
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/vol/b/x"));
        fs.remove("/vol/b");
        tree.refresh();
        assert!(tree.current_directory().is_none());
    }

    #[test]
    fn rescan_current_directory_relists_only_that_branch() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/home/user"));
        let root_listings = fs.listing_count("/");
        fs.add_dir("/home/user/Pictures");
        assert!(tree.rescan_current_directory());
        assert_eq!(
            child_names(&tree, "/home/user"),
            vec!["docs", "Music", "Pictures"]
        );
        assert_eq!(fs.listing_count("/"), root_listings);
    }

    #[test]
    fn new_folder_creates_and_navigates() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/home/user"));
        let created = tree.new_folder("Foo").unwrap();
        assert_eq!(created, PathBuf::from("/home/user/Foo"));
        assert_eq!(tree.current_directory(), Some(Path::new("/home/user/Foo")));
        assert!(child_names(&tree, "/home/user").contains(&"Foo".to_string()));
    }

    #[test]
    fn new_folder_failure_keeps_state() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/home/user"));
        assert!(matches!(
            tree.new_folder("docs"),
            Err(AppError::Io(_))
        ));
        assert!(matches!(
            tree.new_folder("a/b"),
            Err(AppError::InvalidFolderName(_))
        ));
        assert_eq!(tree.current_directory(), Some(Path::new("/home/user")));
    }

    #[test]
    fn new_folder_requires_current_directory() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        assert!(matches!(
            tree.new_folder("Foo"),
            Err(AppError::NoCurrentDirectory)
        ));
    }

    #[test]
    fn multi_root_tree_lists_roots_at_top_level() {
        let fs = Rc::new(MemoryFileSystem::new(&["C:\\", "D:\\"]).with_drives());
        let tree = tree(&fs);
        assert!(tree.is_multi_root());
        assert_eq!(tree.root().label(), "Computer");
        let top: Vec<(&str, ItemKind, usize)> = tree
            .flat_items
            .iter()
            .map(|i| (i.name.as_str(), i.kind, i.depth))
            .collect();
        assert_eq!(
            top,
            vec![
                ("C:\\", ItemKind::Drive, 0),
                ("D:\\", ItemKind::Drive, 0)
            ]
        );
    }

    #[test]
    fn multi_root_navigation() {
        let fs = Rc::new(MemoryFileSystem::new(&["/vol/a", "/vol/b"]).with_drives());
        fs.add_dir("/vol/b/music/jazz");
        let mut tree = tree(&fs);
        assert!(tree.set_current_directory(Path::new("/vol/b/music/jazz")));
        assert_eq!(tree.current_directory(), Some(Path::new("/vol/b/music/jazz")));
        assert!(tree.set_current_directory(Path::new("/vol/a")));
    }

    #[test]
    fn single_mode_honours_only_first_selection() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.set_selected_directories(&[PathBuf::from("/srv"), PathBuf::from("/tmp")]);
        assert_eq!(tree.selected_directories(), vec![PathBuf::from("/srv")]);
    }

    #[test]
    fn multi_selection_skips_unresolvable_and_sorts() {
        let fs = setup_fs();
        let mut tree = tree_with(
            &fs,
            TreeOptions {
                multi_selection: true,
                sort_selected: true,
                ..TreeOptions::default()
            },
        );
        tree.set_selected_directories(&[
            PathBuf::from("/tmp"),
            PathBuf::from("/missing"),
            PathBuf::from("/home/user/docs"),
        ]);
        assert_eq!(
            tree.selected_directories(),
            vec![PathBuf::from("/home/user/docs"), PathBuf::from("/tmp")]
        );
        assert_eq!(tree.current_directory(), Some(Path::new("/tmp")));
    }

    #[test]
    fn toggle_multi_select_adds_and_removes_cursor_row() {
        let fs = setup_fs();
        let mut tree = tree_with(
            &fs,
            TreeOptions {
                multi_selection: true,
                ..TreeOptions::default()
            },
        );
        tree.set_current_directory(Path::new("/srv"));
        tree.toggle_multi_select();
        tree.set_current_directory(Path::new("/tmp"));
        tree.toggle_multi_select();
        assert_eq!(
            tree.selected_directories(),
            vec![PathBuf::from("/srv"), PathBuf::from("/tmp")]
        );
        tree.toggle_multi_select();
        assert_eq!(tree.selected_directories(), vec![PathBuf::from("/srv")]);
    }

    #[test]
    fn toggle_multi_select_ignored_in_single_mode() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/srv"));
        tree.toggle_multi_select();
        assert_eq!(tree.multi_selected_count(), 0);
    }

    #[test]
    fn cursor_moves_update_current() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.select_next();
        assert_eq!(tree.current_directory(), Some(Path::new("/")));
        tree.select_next();
        assert_eq!(tree.current_directory(), Some(Path::new("/home")));
        tree.select_last();
        assert_eq!(tree.current_directory(), Some(Path::new("/tmp")));
        tree.page_up(10);
        assert_eq!(tree.selected_index, 0);
    }

    #[test]
    fn expand_and_collapse_selected() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/home"));
        let before = tree.flat_items.len();
        tree.expand_selected();
        assert_eq!(tree.flat_items.len(), before + 2);
        tree.collapse_selected();
        assert_eq!(tree.flat_items.len(), before);
        // collapsing a collapsed row moves to the parent
        tree.collapse_selected();
        assert_eq!(tree.current_directory(), Some(Path::new("/")));
    }

    #[test]
    fn failed_listing_is_an_empty_leaf() {
        let fs = setup_fs();
        fs.fail_listing("/srv");
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/srv"));
        tree.expand_selected();
        let item = &tree.flat_items[tree.selected_index];
        assert!(item.is_leaf);
        assert!(item.expansion_failed);
        assert!(!tree.set_current_directory(Path::new("/srv/www")));
        assert_eq!(tree.current_directory(), Some(Path::new("/srv")));
    }

    #[test]
    fn change_to_parent_and_home() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/home/user/docs"));
        assert!(tree.change_to_parent_directory());
        assert_eq!(tree.current_directory(), Some(Path::new("/home/user")));
        tree.set_current_directory(Path::new("/tmp"));
        assert!(tree.go_home());
        assert_eq!(tree.current_directory(), Some(Path::new("/home/user")));
        let row = &tree.flat_items[tree.selected_index];
        assert!(row.is_home);
    }

    #[test]
    fn root_has_no_parent() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/"));
        assert!(!tree.change_to_parent_directory());
    }

    #[test]
    fn update_scroll_follows_cursor() {
        let fs = setup_fs();
        let mut tree = tree(&fs);
        tree.set_current_directory(Path::new("/tmp"));
        tree.update_scroll(2);
        assert!(tree.scroll_offset <= tree.selected_index);
        assert!(tree.selected_index < tree.scroll_offset + 2);
    }

    #[test]
    fn expanded_restore_order_is_parent_first() {
        let root = PathBuf::from("/tmp/root");
        let alpha = root.join("alpha");
        let nested = alpha.join("nested");

        let mut expanded = HashSet::new();
        expanded.insert(nested.clone());
        expanded.insert(root.clone());
        expanded.insert(alpha.clone());

        let ordered = DirectoryTree::expanded_paths_in_restore_order(&expanded);
        let ordered_paths: Vec<PathBuf> = ordered.into_iter().cloned().collect();

        assert_eq!(ordered_paths, vec![root, alpha, nested]);
    }

    #[cfg(unix)]
    #[test]
    fn local_filesystem_navigation() {
        let dir = tempfile::Builder::new()
            .prefix("dchoose-tree")
            .tempdir()
            .unwrap();
        std::fs::create_dir(dir.path().join("alpha")).unwrap();
        std::fs::create_dir(dir.path().join("Beta")).unwrap();
        std::fs::create_dir(dir.path().join(".hidden")).unwrap();
        std::fs::File::create(dir.path().join("file.txt")).unwrap();
        let base = dir.path().canonicalize().unwrap();

        let view: Rc<dyn FileSystemView> = Rc::new(LocalFileSystem::new());
        let mut tree = DirectoryTree::new(view, TreeOptions::default());
        assert!(tree.set_current_directory(&base));
        assert_eq!(tree.current_directory(), Some(base.as_path()));

        let names: Vec<String> = tree
            .node(&base)
            .unwrap()
            .children()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "Beta"]);

        let created = tree.new_folder("Foo").unwrap();
        assert!(created.is_dir());
        assert_eq!(tree.current_directory(), Some(base.join("Foo").as_path()));
    }

    #[test]
    fn relative_paths_resolve_against_working_directory() {
        let fs = MemoryFileSystem::new(&["/"]).with_working_dir("/srv");
        fs.add_dir("/srv/tmp").add_dir("/tmp");
        let fs = Rc::new(fs);
        let mut tree = tree(&fs);

        assert_eq!(
            tree.to_path_elements(Path::new("tmp")),
            vec!["srv".to_string(), "tmp".to_string()]
        );
        assert!(tree.set_current_directory(Path::new("tmp")));
        assert_eq!(tree.current_directory(), Some(Path::new("/srv/tmp")));

        assert!(tree.set_current_directory(Path::new("./../tmp")));
        assert_eq!(tree.current_directory(), Some(Path::new("/tmp")));
        assert_eq!(tree.last_directory(), Some(Path::new("/srv/tmp")));
    }

    #[cfg(unix)]
    #[test]
    fn local_relative_path_round_trips() {
        let cwd = std::env::current_dir().unwrap();
        let dir = tempfile::Builder::new()
            .prefix("dchoose-rel")
            .tempdir_in(&cwd)
            .unwrap();
        std::fs::create_dir(dir.path().join("tmp")).unwrap();
        let name = dir.path().file_name().unwrap().to_owned();
        let relative = PathBuf::from(&name).join("tmp");

        let view: Rc<dyn FileSystemView> = Rc::new(LocalFileSystem::new());
        let options = TreeOptions {
            show_hidden: true,
            ..TreeOptions::default()
        };
        let mut tree = DirectoryTree::new(view, options);
        assert!(tree.set_current_directory(&relative));
        assert_eq!(tree.current_directory(), Some(cwd.join(&relative).as_path()));
    }
}
