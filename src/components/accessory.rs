//! Accessory panels shown to the right of the tree.

use std::path::PathBuf;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Widget},
};

use crate::fs::tree::DirectoryTree;
use crate::theme::ThemeColors;

/// A host-supplied side panel that follows the current directory.
pub trait Accessory {
    fn title(&self) -> &str;

    /// Preferred width in columns, borders included.
    fn width(&self) -> u16 {
        32
    }

    /// Called after every change of the current directory or the selection,
    /// and when installed.
    fn directory_changed(&mut self, tree: &DirectoryTree);

    /// Draw the content into `area` (inside the border).
    fn render(&self, area: Rect, buf: &mut Buffer, theme: &ThemeColors);
}

/// Summary of the current directory: path and entry counts.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirectoryInfoAccessory {
    path: Option<PathBuf>,
    directories: usize,
    files: usize,
    hidden: usize,
    selected: usize,
    unreadable: bool,
}

impl DirectoryInfoAccessory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lines(&self) -> Vec<(&'static str, String)> {
        let Some(path) = &self.path else {
            return vec![("", "No directory selected".to_string())];
        };
        let mut lines = vec![("Path", path.display().to_string())];
        if self.unreadable {
            lines.push(("", "Not readable".to_string()));
        } else {
            lines.push(("Folders", self.directories.to_string()));
            lines.push(("Files", self.files.to_string()));
            lines.push(("Hidden", self.hidden.to_string()));
        }
        if self.selected > 1 {
            lines.push(("Selected", self.selected.to_string()));
        }
        lines
    }
}

impl Accessory for DirectoryInfoAccessory {
    fn title(&self) -> &str {
        "Info"
    }

    fn directory_changed(&mut self, tree: &DirectoryTree) {
        *self = Self {
            path: tree.current_directory().map(|p| p.to_path_buf()),
            selected: tree.selected_directories().len(),
            ..Self::default()
        };
        let Some(path) = &self.path else {
            return;
        };
        let view = tree.view();
        match view.list_dir(path) {
            Ok(entries) => {
                for entry in entries {
                    if view.is_hidden(&entry.path) {
                        self.hidden += 1;
                    }
                    if entry.is_dir {
                        self.directories += 1;
                    } else {
                        self.files += 1;
                    }
                }
            }
            Err(_) => self.unreadable = true,
        }
    }

    fn render(&self, area: Rect, buf: &mut Buffer, theme: &ThemeColors) {
        let label_style = Style::default()
            .fg(theme.dim_fg)
            .add_modifier(Modifier::BOLD);
        let value_style = Style::default().fg(theme.tree_fg);
        let mut y = area.y;
        for (label, value) in self.lines() {
            if y >= area.y + area.height {
                break;
            }
            let spans = if label.is_empty() {
                vec![Span::styled(value, value_style)]
            } else {
                vec![
                    Span::styled(format!("{label}: "), label_style),
                    Span::styled(value, value_style),
                ]
            };
            buf.set_line(area.x, y, &Line::from(spans), area.width);
            y += 1;
        }
    }
}

/// Bordered frame around an accessory.
pub struct AccessoryWidget<'a> {
    accessory: &'a dyn Accessory,
    theme: &'a ThemeColors,
}

impl<'a> AccessoryWidget<'a> {
    pub fn new(accessory: &'a dyn Accessory, theme: &'a ThemeColors) -> Self {
        Self { accessory, theme }
    }
}

impl<'a> Widget for AccessoryWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(format!(" {} ", self.accessory.title()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border_fg))
            .padding(Padding::horizontal(1));
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }
        self.accessory.render(inner, buf, self.theme);
    }
}
