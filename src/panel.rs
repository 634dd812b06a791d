//! Embeddable directory panel: the tree plus its icon set, popup menu and
//! new-folder prompt.
//!
//! The panel owns all state a host needs to draw and drive a directory tree.
//! `DirectoryChooser` wraps it in a dialog; hosts with their own layout can
//! render it directly through `components::tree` and `components::dialog`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::fs::tree::DirectoryTree;
use crate::fs::view::FileSystemView;
use crate::icons::IconManager;
use crate::input::TextInput;

/// What a popup menu entry does when activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupAction {
    NewFolder,
    Refresh,
    ToggleHidden,
    Parent,
    Home,
    /// Host-defined entry, reported back to the host by label.
    Custom(String),
}

/// One entry of the tree's popup menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupMenuItem {
    pub label: String,
    pub action: PopupAction,
    pub enabled: bool,
}

impl PopupMenuItem {
    pub fn new(label: impl Into<String>, action: PopupAction) -> Self {
        Self {
            label: label.into(),
            action,
            enabled: true,
        }
    }

    /// A host-defined entry whose activation yields its label.
    pub fn custom(label: impl Into<String>) -> Self {
        let label = label.into();
        Self::new(label.clone(), PopupAction::Custom(label))
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Hook run every time the popup menu opens, with the current directory.
pub type PopupMenuCustomizer = Box<dyn FnMut(Option<&Path>, &mut Vec<PopupMenuItem>)>;

/// An open popup menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupMenuState {
    pub items: Vec<PopupMenuItem>,
    pub selected: usize,
}

impl PopupMenuState {
    fn new(items: Vec<PopupMenuItem>) -> Self {
        let selected = items.iter().position(|i| i.enabled).unwrap_or(0);
        Self { items, selected }
    }

    /// Move to the next enabled entry, wrapping around.
    pub fn select_next(&mut self) {
        self.step(1);
    }

    pub fn select_previous(&mut self) {
        self.step(self.items.len().saturating_sub(1));
    }

    fn step(&mut self, by: usize) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        let mut idx = self.selected;
        for _ in 0..len {
            idx = (idx + by) % len;
            if self.items[idx].enabled {
                self.selected = idx;
                return;
            }
        }
    }

    pub fn selected_item(&self) -> Option<&PopupMenuItem> {
        self.items.get(self.selected)
    }
}

/// Modal layer drawn over the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Overlay {
    #[default]
    None,
    /// Prompt for the name of a folder to create below the current directory.
    NewFolder(TextInput),
    PopupMenu(PopupMenuState),
    /// Blocking message, dismissed with Enter or Esc.
    Error(String),
}

/// Tree, icons and the modal layers that operate on them.
pub struct DirectoryChooserPanel {
    tree: DirectoryTree,
    icons: IconManager,
    popup_enabled: bool,
    customizer: Option<PopupMenuCustomizer>,
    overlay: Overlay,
}

impl DirectoryChooserPanel {
    pub fn new(tree: DirectoryTree, icons: IconManager) -> Self {
        Self {
            tree,
            icons,
            popup_enabled: false,
            customizer: None,
            overlay: Overlay::None,
        }
    }

    /// Build the tree and icon set described by `config` over `view`.
    pub fn from_config(view: Rc<dyn FileSystemView>, config: &AppConfig) -> Result<Self> {
        let mut icons = match config.icon_registry() {
            Some(path) => IconManager::from_file(&path)?,
            None => IconManager::builtin()?,
        };
        if let Some(set) = config.icon_set() {
            icons.set_active_set(set)?;
        }
        let tree = DirectoryTree::new(view, config.tree_options());
        let mut panel = Self::new(tree, icons);
        panel.set_popup_menu_enabled(config.popup_menu_enabled());
        Ok(panel)
    }

    pub fn tree(&self) -> &DirectoryTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DirectoryTree {
        &mut self.tree
    }

    pub fn icon_manager(&self) -> &IconManager {
        &self.icons
    }

    pub fn set_icon_manager(&mut self, icons: IconManager) {
        self.icons = icons;
    }

    pub fn current_directory(&self) -> Option<&Path> {
        self.tree.current_directory()
    }

    pub fn set_current_directory(&mut self, path: &Path) -> bool {
        self.tree.set_current_directory(path)
    }

    pub fn is_popup_menu_enabled(&self) -> bool {
        self.popup_enabled
    }

    pub fn set_popup_menu_enabled(&mut self, enabled: bool) {
        self.popup_enabled = enabled;
        if !enabled && matches!(self.overlay, Overlay::PopupMenu(_)) {
            self.overlay = Overlay::None;
        }
    }

    /// Install or remove (`None`) the popup menu customizer.
    pub fn set_popup_menu_customizer(&mut self, customizer: Option<PopupMenuCustomizer>) {
        self.customizer = customizer;
    }

    pub fn has_popup_menu_customizer(&self) -> bool {
        self.customizer.is_some()
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut Overlay {
        &mut self.overlay
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay != Overlay::None
    }

    pub fn close_overlay(&mut self) {
        self.overlay = Overlay::None;
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "showing error");
        self.overlay = Overlay::Error(message);
    }

    // ------------------------------------------------------------------
    // Popup menu
    // ------------------------------------------------------------------

    /// Built-in entries, enabled according to the tree state.
    pub fn default_popup_items(&self) -> Vec<PopupMenuItem> {
        let current = self.tree.current_directory();
        let hidden_label = if self.tree.show_hidden() {
            "Hide hidden"
        } else {
            "Show hidden"
        };
        vec![
            PopupMenuItem::new("New Folder", PopupAction::NewFolder).enabled(current.is_some()),
            PopupMenuItem::new("Refresh", PopupAction::Refresh),
            PopupMenuItem::new(hidden_label, PopupAction::ToggleHidden),
            PopupMenuItem::new("Parent", PopupAction::Parent)
                .enabled(current.and_then(Path::parent).is_some()),
            PopupMenuItem::new("Home", PopupAction::Home)
                .enabled(self.tree.home_directory().is_some()),
        ]
    }

    /// Open the popup menu. Returns false if it is disabled or ends up empty.
    pub fn open_popup_menu(&mut self) -> bool {
        if !self.popup_enabled {
            return false;
        }
        let mut items = self.default_popup_items();
        if let Some(customize) = self.customizer.as_mut() {
            customize(self.tree.current_directory(), &mut items);
        }
        if items.is_empty() {
            debug!("popup menu customizer removed every entry");
            return false;
        }
        self.overlay = Overlay::PopupMenu(PopupMenuState::new(items));
        true
    }

    /// Run the highlighted popup entry and close the menu.
    ///
    /// Returns the label of a custom entry so the host can act on it. Disabled
    /// entries do nothing and leave the menu open.
    pub fn activate_popup_item(&mut self) -> Option<String> {
        let action = match &self.overlay {
            Overlay::PopupMenu(menu) => match menu.selected_item() {
                Some(item) if item.enabled => item.action.clone(),
                _ => return None,
            },
            _ => return None,
        };
        self.overlay = Overlay::None;
        debug!(?action, "popup menu action");
        match action {
            PopupAction::NewFolder => {
                self.begin_new_folder();
            }
            PopupAction::Refresh => self.tree.refresh(),
            PopupAction::ToggleHidden => {
                let show = !self.tree.show_hidden();
                self.tree.set_show_hidden(show);
            }
            PopupAction::Parent => {
                self.tree.change_to_parent_directory();
            }
            PopupAction::Home => {
                self.tree.go_home();
            }
            PopupAction::Custom(label) => return Some(label),
        }
        None
    }

    // ------------------------------------------------------------------
    // New folder
    // ------------------------------------------------------------------

    /// Open the new-folder prompt, or an error if no directory is current.
    pub fn begin_new_folder(&mut self) -> bool {
        if self.tree.current_directory().is_none() {
            self.show_error(AppError::NoCurrentDirectory.to_string());
            return false;
        }
        self.overlay = Overlay::NewFolder(TextInput::new());
        true
    }

    /// Create the folder named in the prompt.
    ///
    /// On failure the prompt is replaced by an error message and the tree is
    /// left as it was.
    pub fn confirm_new_folder(&mut self) -> Option<PathBuf> {
        let name = match &self.overlay {
            Overlay::NewFolder(input) => input.value().to_string(),
            _ => return None,
        };
        match self.tree.new_folder(&name) {
            Ok(path) => {
                self.overlay = Overlay::None;
                Some(path)
            }
            Err(e) => {
                self.show_error(format!("Failed to create folder: {e}"));
                None
            }
        }
    }
}

impl fmt::Debug for DirectoryChooserPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryChooserPanel")
            .field("tree", &self.tree)
            .field("icon_set", &self.icons.active_set())
            .field("popup_enabled", &self.popup_enabled)
            .field("overlay", &self.overlay)
            .finish()
    }
}
