use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::fs::tree::{DirectoryTree, FlatItem, ItemKind};
use crate::icons::IconManager;
use crate::theme::ThemeColors;

/// Tree widget that renders the directory tree with box-drawing characters.
pub struct TreeWidget<'a> {
    tree: &'a DirectoryTree,
    icons: &'a IconManager,
    theme: &'a ThemeColors,
    focused: bool,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(tree: &'a DirectoryTree, icons: &'a IconManager, theme: &'a ThemeColors) -> Self {
        Self {
            tree,
            icons,
            theme,
            focused: true,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    /// Unfocused trees draw the cursor row without bold.
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Build the prefix string for tree indentation using box-drawing characters.
    ///
    /// We need to know the ancestor chain to draw continuation lines correctly.
    fn build_prefix(item: &FlatItem, items: &[FlatItem], item_index: usize) -> String {
        if item.depth == 0 {
            return String::new();
        }

        let mut parts: Vec<&str> = Vec::new();

        // For each ancestor level (1..depth), determine if it's the last sibling at that level
        for d in 1..item.depth {
            let mut ancestor_is_last = false;
            for j in (0..item_index).rev() {
                if items[j].depth == d {
                    ancestor_is_last = items[j].is_last_sibling;
                    break;
                }
                if items[j].depth < d {
                    break;
                }
            }
            if ancestor_is_last {
                parts.push("   ");
            } else {
                parts.push("│  ");
            }
        }

        if item.is_last_sibling {
            parts.push("└──");
        } else {
            parts.push("├──");
        }

        parts.join("")
    }

    fn item_style(&self, item: &FlatItem, is_cursor: bool, is_marked: bool) -> Style {
        if is_cursor {
            let style = Style::default()
                .bg(self.theme.tree_selected_bg)
                .fg(self.theme.tree_selected_fg);
            return if self.focused {
                style.add_modifier(Modifier::BOLD)
            } else {
                style
            };
        }
        if is_marked {
            return Style::default()
                .fg(self.theme.tree_marked_fg)
                .add_modifier(Modifier::BOLD);
        }
        if item.is_hidden {
            return Style::default().fg(self.theme.tree_hidden_fg);
        }
        match item.kind {
            ItemKind::Drive => Style::default()
                .fg(self.theme.tree_drive_fg)
                .add_modifier(Modifier::BOLD),
            ItemKind::Directory => Style::default().fg(self.theme.tree_dir_fg),
        }
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let items = &self.tree.flat_items;
        let visible_height = inner_area.height as usize;

        if items.is_empty() || visible_height == 0 {
            return;
        }

        // no highlight until a directory is current
        let cursor = self
            .tree
            .current_directory()
            .map(|_| self.tree.selected_index);
        let scroll = self.tree.scroll_offset;
        let view = self.tree.view();

        let visible_items = items.iter().enumerate().skip(scroll).take(visible_height);

        for (i, (idx, item)) in visible_items.enumerate() {
            let y = inner_area.y + i as u16;

            let prefix = Self::build_prefix(item, items, idx);
            let is_cursor = cursor == Some(idx);
            let is_marked = self.tree.is_multi_selected(&item.path);
            let style = self.item_style(item, is_cursor, is_marked);

            let marker = if is_marked { "● " } else { "" };
            let icon = self
                .icons
                .icon_for(view.as_ref(), item)
                .map(|icon| format!("{icon} "))
                .unwrap_or_default();

            let mut spans = vec![
                Span::styled(prefix, Style::default().fg(self.theme.dim_fg)),
                Span::styled(format!("{marker}{icon}{}", item.name), style),
            ];
            if is_cursor {
                // extend the highlight across the row
                let used: usize = spans.iter().map(|s| s.width()).sum();
                let pad = (inner_area.width as usize).saturating_sub(used);
                spans.push(Span::styled(" ".repeat(pad), style));
            }

            let line = Line::from(spans);
            buf.set_line(inner_area.x, y, &line, inner_area.width);
        }
    }
}
