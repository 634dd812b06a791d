use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::fs::view::FileSystemView;

/// Label of the synthetic node grouping several roots.
pub const DEFAULT_ROOT_LABEL: &str = "Computer";

/// Lazy-loading state of a directory node.
#[derive(Debug)]
pub enum Expansion {
    /// Children have not been listed yet.
    NotExpanded,
    /// Children listed, filtered and sorted (possibly empty).
    Expanded(Vec<DirectoryNode>),
    /// The listing failed. Reads treat this exactly like an empty directory.
    ExpansionFailed,
}

/// A lazily populated node wrapping one filesystem directory.
pub struct DirectoryNode {
    path: PathBuf,
    /// Name used to match path elements: the drive path for drives, else the last segment.
    name: String,
    display_name: String,
    is_drive: bool,
    is_hidden: bool,
    show_hidden: bool,
    /// Presentation state: whether the node's children are shown.
    pub expanded: bool,
    expansion: Expansion,
    view: Rc<dyn FileSystemView>,
}

impl DirectoryNode {
    /// Create an unexpanded node. The filesystem view and hidden-file policy are
    /// injected here and handed down to every child.
    pub fn new(path: impl Into<PathBuf>, show_hidden: bool, view: Rc<dyn FileSystemView>) -> Self {
        let path = path.into();
        let is_drive = view.is_drive(&path);
        let name = if is_drive {
            path.to_string_lossy().to_string()
        } else {
            crate::fs::view::last_segment(&path)
        };
        let display_name = view.display_name(&path);
        let is_hidden = !is_drive && view.is_hidden(&path);
        Self {
            path,
            name,
            display_name,
            is_drive,
            is_hidden,
            show_hidden,
            expanded: false,
            expansion: Expansion::NotExpanded,
            view,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_drive(&self) -> bool {
        self.is_drive
    }

    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    pub fn expansion(&self) -> &Expansion {
        &self.expansion
    }

    pub fn is_initialized(&self) -> bool {
        !matches!(self.expansion, Expansion::NotExpanded)
    }

    pub fn expansion_failed(&self) -> bool {
        matches!(self.expansion, Expansion::ExpansionFailed)
    }

    /// A scanned node without child directories.
    pub fn is_leaf(&self) -> bool {
        self.is_initialized() && self.children().is_empty()
    }

    /// Materialized children; empty until the node has been expanded.
    pub fn children(&self) -> &[DirectoryNode] {
        match &self.expansion {
            Expansion::Expanded(children) => children,
            Expansion::NotExpanded | Expansion::ExpansionFailed => &[],
        }
    }

    pub fn children_mut(&mut self) -> &mut [DirectoryNode] {
        match &mut self.expansion {
            Expansion::Expanded(children) => children,
            Expansion::NotExpanded | Expansion::ExpansionFailed => &mut [],
        }
    }

    /// List, filter and sort the child directories on first call.
    ///
    /// Returns true if a listing was performed. Listing errors are absorbed: the
    /// node becomes an initialized leaf.
    pub fn expand_if_necessary(&mut self) -> bool {
        if self.is_initialized() {
            return false;
        }

        let entries = match self.view.list_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "directory listing failed");
                self.expansion = Expansion::ExpansionFailed;
                return true;
            }
        };

        let mut dirs: Vec<_> = entries
            .into_iter()
            .filter(|e| e.is_dir)
            .filter(|e| self.show_hidden || !self.view.is_hidden(&e.path))
            .collect();
        dirs.sort_by_key(|e| e.name.to_lowercase());

        let children = dirs
            .into_iter()
            .map(|e| DirectoryNode::new(e.path, self.show_hidden, Rc::clone(&self.view)))
            .collect();
        self.expansion = Expansion::Expanded(children);
        true
    }

    /// Forget the scanned children so the next expansion re-lists from disk.
    pub fn reset(&mut self) {
        self.expansion = Expansion::NotExpanded;
    }

    /// Find a materialized child by name and expand it.
    pub fn expand(&mut self, name: &str) -> Option<&mut DirectoryNode> {
        let child = self.children_mut().iter_mut().find(|c| c.name == name)?;
        child.expand_if_necessary();
        Some(child)
    }

    /// Depth-first lookup of a materialized node by path.
    pub fn find(&self, target: &Path) -> Option<&DirectoryNode> {
        if self.path == target {
            return Some(self);
        }
        if !target.starts_with(&self.path) {
            return None;
        }
        self.children().iter().find_map(|c| c.find(target))
    }

    pub fn find_mut(&mut self, target: &Path) -> Option<&mut DirectoryNode> {
        if self.path == target {
            return Some(self);
        }
        if !target.starts_with(&self.path) {
            return None;
        }
        self.children_mut()
            .iter_mut()
            .find_map(|c| c.find_mut(target))
    }
}

impl fmt::Debug for DirectoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryNode")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("expanded", &self.expanded)
            .field("expansion", &self.expansion)
            .finish()
    }
}

/// Synthetic parent grouping several roots (e.g. drive letters).
#[derive(Debug)]
pub struct MultiRootNode {
    label: String,
    roots: Vec<DirectoryNode>,
}

impl MultiRootNode {
    pub fn new(
        label: impl Into<String>,
        roots: Vec<PathBuf>,
        show_hidden: bool,
        view: Rc<dyn FileSystemView>,
    ) -> Self {
        Self {
            label: label.into(),
            roots: roots
                .into_iter()
                .map(|r| DirectoryNode::new(r, show_hidden, Rc::clone(&view)))
                .collect(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn roots(&self) -> &[DirectoryNode] {
        &self.roots
    }

    pub fn roots_mut(&mut self) -> &mut [DirectoryNode] {
        &mut self.roots
    }

    /// Roots are few and cheap to list, so all of them are expanded eagerly.
    pub fn expand_if_necessary(&mut self) {
        for root in &mut self.roots {
            root.expand_if_necessary();
        }
    }

    /// Find a root by name and expand it.
    pub fn expand(&mut self, name: &str) -> Option<&mut DirectoryNode> {
        let root = self.roots.iter_mut().find(|r| r.name() == name)?;
        root.expand_if_necessary();
        Some(root)
    }
}

/// Root of the directory tree.
#[derive(Debug)]
pub enum TreeRoot {
    /// Exactly one filesystem root, shown as the visible tree root.
    Single(DirectoryNode),
    /// Several roots under a synthetic, hidden parent.
    Multi(MultiRootNode),
}

impl TreeRoot {
    /// Build the root for the given roots: a plain node for one root, a
    /// multi-root container otherwise.
    pub fn build(
        roots: Vec<PathBuf>,
        label: &str,
        show_hidden: bool,
        view: Rc<dyn FileSystemView>,
    ) -> Self {
        let mut root = if roots.len() == 1 {
            let mut node = DirectoryNode::new(roots[0].clone(), show_hidden, view);
            node.expanded = true;
            TreeRoot::Single(node)
        } else {
            TreeRoot::Multi(MultiRootNode::new(label, roots, show_hidden, view))
        };
        root.expand_if_necessary();
        root
    }

    pub fn expand_if_necessary(&mut self) {
        match self {
            TreeRoot::Single(node) => {
                node.expand_if_necessary();
            }
            TreeRoot::Multi(multi) => multi.expand_if_necessary(),
        }
    }

    /// Visible top-level nodes: the single root, or every root of a multi-root.
    pub fn top_level(&self) -> &[DirectoryNode] {
        match self {
            TreeRoot::Single(node) => std::slice::from_ref(node),
            TreeRoot::Multi(multi) => multi.roots(),
        }
    }

    pub fn top_level_mut(&mut self) -> &mut [DirectoryNode] {
        match self {
            TreeRoot::Single(node) => std::slice::from_mut(node),
            TreeRoot::Multi(multi) => multi.roots_mut(),
        }
    }

    pub fn find(&self, target: &Path) -> Option<&DirectoryNode> {
        self.top_level().iter().find_map(|n| n.find(target))
    }

    pub fn find_mut(&mut self, target: &Path) -> Option<&mut DirectoryNode> {
        self.top_level_mut()
            .iter_mut()
            .find_map(|n| n.find_mut(target))
    }

    /// Walk `elements` from the root, expanding each matched node on the way.
    ///
    /// Returns the node matched by the last element; `None` as soon as an element
    /// has no same-named child. For a single root the walk starts at the root
    /// itself (a leading element naming a drive root is consumed by it).
    pub fn resolve(&mut self, elements: &[String]) -> Option<&mut DirectoryNode> {
        let (mut node, rest) = match self {
            TreeRoot::Single(node) => {
                let consumes_first = node.is_drive()
                    && elements.first().is_some_and(|first| first == node.name());
                let rest = if consumes_first {
                    &elements[1..]
                } else {
                    elements
                };
                (node, rest)
            }
            TreeRoot::Multi(multi) => {
                let (first, rest) = elements.split_first()?;
                (multi.expand(first)?, rest)
            }
        };
        node.expand_if_necessary();
        for element in rest {
            node = node.expand(element)?;
        }
        Some(node)
    }

    /// Label for the tree as a whole.
    pub fn label(&self) -> &str {
        match self {
            TreeRoot::Single(node) => node.display_name(),
            TreeRoot::Multi(multi) => multi.label(),
        }
    }
}
