//! The directory chooser dialog.
//!
//! `DirectoryChooser` arranges a toolbar, the directory panel, an optional
//! accessory, a directory text field and approve/cancel buttons, and runs them
//! as a modal loop over any ratatui backend and any `EventSource`. Its method
//! surface follows the usual file-chooser conventions; everything concerning
//! files or file filters is fixed to the directories-only answer.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ratatui::{backend::Backend, layout::Rect, Terminal};
use tracing::{debug, error, info, warn};

use crate::components::accessory::Accessory;
use crate::components::toolbar::ToolbarButton;
use crate::config::AppConfig;
use crate::error::Result;
use crate::event::EventSource;
use crate::fs::change::{DirectoryChangeEvent, ListenerId, Listeners};
use crate::fs::view::FileSystemView;
use crate::handler;
use crate::icons::{Icon, IconManager};
use crate::input::TextInput;
use crate::panel::{DirectoryChooserPanel, PopupMenuCustomizer};
use crate::theme::{self, ThemeColors};
use crate::ui;

/// Title used until `set_dialog_title` is called.
pub const DEFAULT_TITLE: &str = "Select directory";

thread_local! {
    static MODAL_OPEN: Cell<bool> = const { Cell::new(false) };
}

/// Held while a chooser dialog owns the terminal of this thread.
#[derive(Debug)]
pub struct ModalGuard {
    _private: (),
}

impl ModalGuard {
    /// Claim the modal slot. Returns `None` if a dialog is already open.
    pub fn acquire() -> Option<Self> {
        MODAL_OPEN.with(|open| {
            if open.replace(true) {
                None
            } else {
                Some(Self { _private: () })
            }
        })
    }
}

impl Drop for ModalGuard {
    fn drop(&mut self) {
        MODAL_OPEN.with(|open| open.set(false));
    }
}

/// Whether a chooser dialog is currently showing on this thread.
pub fn is_dialog_open() -> bool {
    MODAL_OPEN.with(Cell::get)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DialogType {
    #[default]
    Open,
    Save,
    Custom,
}

/// How a dialog invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChooserResult {
    Approve,
    Cancel,
    /// The dialog could not be shown, e.g. another one was already open.
    Error,
}

/// Command delivered to action listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChooserCommand {
    Approve,
    Cancel,
    /// A custom popup menu entry, by label.
    Custom(String),
}

impl ChooserCommand {
    pub fn name(&self) -> &str {
        match self {
            ChooserCommand::Approve => "ApproveSelection",
            ChooserCommand::Cancel => "CancelSelection",
            ChooserCommand::Custom(label) => label,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSelectionMode {
    FilesOnly,
    DirectoriesOnly,
    FilesAndDirectories,
}

/// A file filter. Accepted for interface compatibility only; the chooser
/// never lists files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub description: String,
    pub extensions: Vec<String>,
}

/// Which part of the dialog receives key presses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Tree,
    DirectoryField,
}

/// Screen areas from the last draw, used for mouse hit testing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChooserLayout {
    pub tree: Rect,
    pub toolbar: Vec<(ToolbarButton, Rect)>,
    pub field: Rect,
    pub approve: Rect,
    pub cancel: Rect,
}

/// Modal directory chooser.
pub struct DirectoryChooser {
    panel: DirectoryChooserPanel,
    theme: ThemeColors,
    dialog_type: DialogType,
    title: String,
    approve_text: Option<String>,
    control_buttons_shown: bool,
    accessory: Option<Box<dyn Accessory>>,
    field: TextInput,
    focus: Focus,
    outcome: Option<ChooserResult>,
    action_listeners: Listeners<ChooserCommand>,
    changes: Rc<RefCell<VecDeque<DirectoryChangeEvent>>>,
    layout: ChooserLayout,
}

impl DirectoryChooser {
    pub fn new(mut panel: DirectoryChooserPanel) -> Self {
        let changes = Rc::new(RefCell::new(VecDeque::new()));
        let sink = Rc::clone(&changes);
        panel
            .tree_mut()
            .add_change_listener(move |e| sink.borrow_mut().push_back(e.clone()));
        let mut chooser = Self {
            panel,
            theme: theme::dark_theme(),
            dialog_type: DialogType::Open,
            title: DEFAULT_TITLE.to_string(),
            approve_text: None,
            control_buttons_shown: true,
            accessory: None,
            field: TextInput::new(),
            focus: Focus::Tree,
            outcome: None,
            action_listeners: Listeners::new(),
            changes,
            layout: ChooserLayout::default(),
        };
        chooser.sync_directory_field();
        chooser
    }

    /// Chooser over `view` configured from `config`.
    pub fn from_config(view: Rc<dyn FileSystemView>, config: &AppConfig) -> Result<Self> {
        let panel = DirectoryChooserPanel::from_config(view, config)?;
        let mut chooser = Self::new(panel);
        chooser.theme = theme::resolve_theme(&config.theme);
        chooser.control_buttons_shown = config.control_buttons_shown();
        Ok(chooser)
    }

    pub fn panel(&self) -> &DirectoryChooserPanel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut DirectoryChooserPanel {
        &mut self.panel
    }

    pub fn theme(&self) -> &ThemeColors {
        &self.theme
    }

    pub fn set_theme(&mut self, theme: ThemeColors) {
        self.theme = theme;
    }

    // ------------------------------------------------------------------
    // Dialog
    // ------------------------------------------------------------------

    /// Show an open dialog and wait for the user.
    pub async fn show_open_dialog<B, E>(
        &mut self,
        terminal: &mut Terminal<B>,
        events: &mut E,
    ) -> ChooserResult
    where
        B: Backend,
        E: EventSource,
    {
        self.dialog_type = DialogType::Open;
        self.show_dialog(terminal, events, None).await
    }

    /// Show a save dialog and wait for the user.
    pub async fn show_save_dialog<B, E>(
        &mut self,
        terminal: &mut Terminal<B>,
        events: &mut E,
    ) -> ChooserResult
    where
        B: Backend,
        E: EventSource,
    {
        self.dialog_type = DialogType::Save;
        self.show_dialog(terminal, events, None).await
    }

    /// Show the dialog and wait until it is approved, cancelled or its event
    /// stream closes.
    ///
    /// A non-`None` `approve_text` relabels the approve button and makes this
    /// a custom dialog. Returns `ChooserResult::Error` at once if another
    /// chooser dialog is open on this thread.
    pub async fn show_dialog<B, E>(
        &mut self,
        terminal: &mut Terminal<B>,
        events: &mut E,
        approve_text: Option<&str>,
    ) -> ChooserResult
    where
        B: Backend,
        E: EventSource,
    {
        let Some(_guard) = ModalGuard::acquire() else {
            warn!("a chooser dialog is already open");
            return ChooserResult::Error;
        };

        if let Some(text) = approve_text {
            self.approve_text = Some(text.to_string());
            self.dialog_type = DialogType::Custom;
        }
        self.outcome = None;
        self.focus = Focus::Tree;
        self.panel.close_overlay();
        self.panel.tree_mut().rescan_current_directory();
        self.sync_changes();
        self.sync_directory_field();

        info!(title = %self.title, dialog_type = ?self.dialog_type, "dialog opened");
        let result = match self.run_modal(terminal, events).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "dialog failed");
                ChooserResult::Error
            }
        };
        info!(?result, "dialog closed");
        result
    }

    async fn run_modal<B, E>(
        &mut self,
        terminal: &mut Terminal<B>,
        events: &mut E,
    ) -> Result<ChooserResult>
    where
        B: Backend,
        E: EventSource,
    {
        loop {
            terminal.draw(|frame| ui::render(self, frame))?;

            let Some(event) = events.next_event().await else {
                debug!("event stream closed, treating as cancel");
                return Ok(ChooserResult::Cancel);
            };
            handler::handle_event(self, event);
            self.sync_changes();

            if let Some(result) = self.outcome.take() {
                return Ok(result);
            }
        }
    }

    pub fn dialog_type(&self) -> DialogType {
        self.dialog_type
    }

    pub fn set_dialog_type(&mut self, dialog_type: DialogType) {
        self.dialog_type = dialog_type;
    }

    pub fn dialog_title(&self) -> &str {
        &self.title
    }

    pub fn set_dialog_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Label of the approve button: the explicit text, else "Save" for save
    /// dialogs and "Open" otherwise.
    pub fn approve_button_text(&self) -> &str {
        match (&self.approve_text, self.dialog_type) {
            (Some(text), _) => text,
            (None, DialogType::Save) => "Save",
            (None, _) => "Open",
        }
    }

    pub fn set_approve_button_text(&mut self, text: Option<String>) {
        self.approve_text = text;
    }

    /// Whether the toolbar (Home, New Folder, Refresh) is visible.
    pub fn control_buttons_are_shown(&self) -> bool {
        self.control_buttons_shown
    }

    pub fn set_control_buttons_are_shown(&mut self, shown: bool) {
        self.control_buttons_shown = shown;
    }

    pub fn accessory(&self) -> Option<&dyn Accessory> {
        self.accessory.as_deref()
    }

    /// Install (or remove) the panel shown right of the tree.
    pub fn set_accessory(&mut self, accessory: Option<Box<dyn Accessory>>) {
        self.accessory = accessory;
        self.notify_accessory();
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Tree => Focus::DirectoryField,
            Focus::DirectoryField => Focus::Tree,
        };
    }

    pub fn directory_field(&self) -> &TextInput {
        &self.field
    }

    pub fn directory_field_mut(&mut self) -> &mut TextInput {
        &mut self.field
    }

    pub fn layout(&self) -> &ChooserLayout {
        &self.layout
    }

    pub(crate) fn set_layout(&mut self, layout: ChooserLayout) {
        self.layout = layout;
    }

    // ------------------------------------------------------------------
    // Approve / cancel
    // ------------------------------------------------------------------

    /// Approve is possible only while a directory is current.
    pub fn is_approve_enabled(&self) -> bool {
        self.panel.current_directory().is_some()
    }

    /// Close the dialog with `Approve`. Ignored while approve is disabled.
    pub fn approve_selection(&mut self) -> bool {
        if !self.is_approve_enabled() {
            debug!("approve ignored, no directory selected");
            return false;
        }
        self.outcome = Some(ChooserResult::Approve);
        self.action_listeners.notify(&ChooserCommand::Approve);
        true
    }

    /// Close the dialog with `Cancel`.
    pub fn cancel_selection(&mut self) {
        self.outcome = Some(ChooserResult::Cancel);
        self.action_listeners.notify(&ChooserCommand::Cancel);
    }

    pub(crate) fn fire_custom_command(&mut self, label: String) {
        debug!(%label, "custom popup command");
        self.action_listeners
            .notify(&ChooserCommand::Custom(label));
    }

    pub fn add_action_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ChooserCommand) + 'static,
    {
        self.action_listeners.add(listener)
    }

    pub fn remove_action_listener(&mut self, id: ListenerId) -> bool {
        self.action_listeners.remove(id)
    }

    pub fn action_listener_count(&self) -> usize {
        self.action_listeners.len()
    }

    pub fn add_change_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&DirectoryChangeEvent) + 'static,
    {
        self.panel.tree_mut().add_change_listener(listener)
    }

    pub fn remove_change_listener(&mut self, id: ListenerId) -> bool {
        self.panel.tree_mut().remove_change_listener(id)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn current_directory(&self) -> Option<&Path> {
        self.panel.current_directory()
    }

    pub fn set_current_directory(&mut self, dir: &Path) -> bool {
        let changed = self.panel.set_current_directory(dir);
        self.sync_changes();
        changed
    }

    pub fn change_to_parent_directory(&mut self) -> bool {
        let changed = self.panel.tree_mut().change_to_parent_directory();
        self.sync_changes();
        changed
    }

    pub fn go_home(&mut self) -> bool {
        let changed = self.panel.tree_mut().go_home();
        self.sync_changes();
        changed
    }

    pub fn rescan_current_directory(&mut self) -> bool {
        let found = self.panel.tree_mut().rescan_current_directory();
        self.sync_changes();
        found
    }

    pub fn refresh(&mut self) {
        self.panel.tree_mut().refresh();
        self.sync_changes();
    }

    /// Open the new-folder prompt.
    pub fn new_folder(&mut self) -> bool {
        self.panel.begin_new_folder()
    }

    pub fn ensure_file_is_visible(&mut self, path: &Path) {
        self.panel.tree_mut().ensure_visible(path);
    }

    /// Navigate to the path typed into the directory field, if it names an
    /// existing directory. `~` expands to the home directory and relative
    /// paths are taken against the working directory.
    pub fn navigate_to_directory_field(&mut self) -> bool {
        let text = self.field.value().trim();
        if text.is_empty() {
            return false;
        }
        let tree = self.panel.tree();
        let path = match (text.strip_prefix('~'), tree.home_directory()) {
            (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with(['/', '\\']) => {
                home.join(rest.trim_start_matches(['/', '\\']))
            }
            _ => tree.view().absolute(Path::new(text)),
        };
        if !tree.view().is_dir(&path) {
            debug!(path = %path.display(), "directory field does not name a directory");
            return false;
        }
        self.set_current_directory(&path)
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn selected_file(&self) -> Option<PathBuf> {
        self.current_directory().map(Path::to_path_buf)
    }

    pub fn set_selected_file(&mut self, path: &Path) -> bool {
        self.set_current_directory(path)
    }

    /// The selected directories (several only with multi-selection).
    pub fn selected_files(&self) -> Vec<PathBuf> {
        self.panel.tree().selected_directories()
    }

    pub fn set_selected_files(&mut self, paths: &[PathBuf]) {
        self.panel.tree_mut().set_selected_directories(paths);
        self.sync_changes();
        self.notify_accessory();
    }

    /// Toggle the cursor row in the multi-selection.
    pub fn toggle_multi_select(&mut self) {
        self.panel.tree_mut().toggle_multi_select();
        self.notify_accessory();
    }

    pub fn is_multi_selection_enabled(&self) -> bool {
        self.panel.tree().is_multi_selection_enabled()
    }

    pub fn set_multi_selection_enabled(&mut self, enabled: bool) {
        self.panel.tree_mut().set_multi_selection_enabled(enabled);
    }

    // ------------------------------------------------------------------
    // Directories-only file-chooser surface
    // ------------------------------------------------------------------

    pub fn file_selection_mode(&self) -> FileSelectionMode {
        FileSelectionMode::DirectoriesOnly
    }

    /// No effect: only directories can be chosen.
    pub fn set_file_selection_mode(&mut self, mode: FileSelectionMode) {
        debug!(?mode, "file selection mode is fixed to directories only");
    }

    pub fn is_file_selection_enabled(&self) -> bool {
        false
    }

    pub fn is_directory_selection_enabled(&self) -> bool {
        true
    }

    pub fn choosable_file_filters(&self) -> &[FileFilter] {
        &[]
    }

    pub fn add_choosable_file_filter(&mut self, filter: FileFilter) {
        debug!(filter = %filter.description, "file filters are not supported");
    }

    /// Always reports success; there is nothing to remove.
    pub fn remove_choosable_file_filter(&mut self, _filter: &FileFilter) -> bool {
        true
    }

    pub fn reset_choosable_file_filters(&mut self) {}

    pub fn file_filter(&self) -> Option<&FileFilter> {
        None
    }

    pub fn set_file_filter(&mut self, _filter: Option<FileFilter>) {}

    pub fn is_accept_all_file_filter_used(&self) -> bool {
        false
    }

    pub fn set_accept_all_file_filter_used(&mut self, _used: bool) {}

    /// Whether `path` could be chosen: a directory, and visible unless hidden
    /// directories are shown.
    pub fn accept(&self, path: &Path) -> bool {
        let view = self.panel.tree().view();
        view.is_dir(path) && (self.show_hidden() || !view.is_hidden(path))
    }

    pub fn is_traversable(&self, path: &Path) -> bool {
        self.panel.tree().view().is_dir(path)
    }

    pub fn name(&self, path: &Path) -> String {
        self.panel.tree().view().display_name(path)
    }

    pub fn icon(&self, path: &Path) -> Option<Icon> {
        self.panel
            .icon_manager()
            .system_icon(self.panel.tree().view().as_ref(), path)
    }

    pub fn file_system_view(&self) -> &Rc<dyn FileSystemView> {
        self.panel.tree().view()
    }

    pub fn show_hidden(&self) -> bool {
        self.panel.tree().show_hidden()
    }

    pub fn set_show_hidden(&mut self, show: bool) {
        self.panel.tree_mut().set_show_hidden(show);
        self.sync_changes();
    }

    pub fn is_file_hiding_enabled(&self) -> bool {
        !self.show_hidden()
    }

    pub fn set_file_hiding_enabled(&mut self, enabled: bool) {
        self.set_show_hidden(!enabled);
    }

    pub fn icon_manager(&self) -> &IconManager {
        self.panel.icon_manager()
    }

    pub fn set_icon_manager(&mut self, icons: IconManager) {
        self.panel.set_icon_manager(icons);
    }

    pub fn is_popup_menu_enabled(&self) -> bool {
        self.panel.is_popup_menu_enabled()
    }

    pub fn set_popup_menu_enabled(&mut self, enabled: bool) {
        self.panel.set_popup_menu_enabled(enabled);
    }

    pub fn set_popup_menu_customizer(&mut self, customizer: Option<PopupMenuCustomizer>) {
        self.panel.set_popup_menu_customizer(customizer);
    }

    // ------------------------------------------------------------------
    // Change propagation
    // ------------------------------------------------------------------

    /// Apply queued directory changes to the text field and the accessory.
    pub(crate) fn sync_changes(&mut self) {
        let pending = self.changes.borrow_mut().drain(..).count();
        if pending == 0 {
            return;
        }
        self.sync_directory_field();
        self.notify_accessory();
    }

    /// Let the accessory re-read the tree after a directory or selection change.
    fn notify_accessory(&mut self) {
        if let Some(accessory) = self.accessory.as_mut() {
            accessory.directory_changed(self.panel.tree());
        }
    }

    fn sync_directory_field(&mut self) {
        let text = self
            .panel
            .current_directory()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        if self.field.value() != text {
            self.field.set_value(text);
        }
    }
}

impl fmt::Debug for DirectoryChooser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryChooser")
            .field("panel", &self.panel)
            .field("dialog_type", &self.dialog_type)
            .field("title", &self.title)
            .field("focus", &self.focus)
            .field("has_accessory", &self.accessory.is_some())
            .finish()
    }
}
