use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::icons::{IconManager, IconRole};
use crate::theme::ThemeColors;

/// Buttons of the chooser toolbar, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarButton {
    Home,
    NewFolder,
    Refresh,
}

impl ToolbarButton {
    pub const ALL: [ToolbarButton; 3] = [
        ToolbarButton::Home,
        ToolbarButton::NewFolder,
        ToolbarButton::Refresh,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ToolbarButton::Home => "Home",
            ToolbarButton::NewFolder => "New Folder",
            ToolbarButton::Refresh => "Refresh",
        }
    }

    fn role(self) -> IconRole {
        match self {
            ToolbarButton::Home => IconRole::Home,
            ToolbarButton::NewFolder => IconRole::NewFolder,
            ToolbarButton::Refresh => IconRole::Refresh,
        }
    }

    fn text(self, icons: &IconManager) -> String {
        match icons.icon(self.role()) {
            Some(icon) => format!(" {icon} {} ", self.label()),
            None => format!(" {} ", self.label()),
        }
    }
}

/// Screen areas of the toolbar buttons within `area`, for hit testing.
pub fn button_areas(area: Rect, icons: &IconManager) -> Vec<(ToolbarButton, Rect)> {
    let mut x = area.x;
    let right = area.x + area.width;
    let mut out = Vec::new();
    for button in ToolbarButton::ALL {
        let width = button.text(icons).width() as u16;
        if x >= right {
            break;
        }
        out.push((button, Rect::new(x, area.y, width.min(right - x), 1)));
        x = x.saturating_add(width + 1);
    }
    out
}

/// Row of Home / New Folder / Refresh buttons.
pub struct ToolbarWidget<'a> {
    icons: &'a IconManager,
    theme: &'a ThemeColors,
}

impl<'a> ToolbarWidget<'a> {
    pub fn new(icons: &'a IconManager, theme: &'a ThemeColors) -> Self {
        Self { icons, theme }
    }
}

impl<'a> Widget for ToolbarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let style = Style::default()
            .fg(self.theme.status_fg)
            .bg(self.theme.dialog_bg);
        for (button, rect) in button_areas(area, self.icons) {
            let line = Line::from(Span::styled(button.text(self.icons), style));
            buf.set_line(rect.x, rect.y, &line, rect.width);
        }
    }
}
