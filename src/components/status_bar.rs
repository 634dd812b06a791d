use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::components::dialog::input_line;
use crate::input::TextInput;
use crate::theme::ThemeColors;

const DIRECTORY_LABEL: &str = "Directory: ";
const CANCEL_TEXT: &str = "Cancel";

fn button_text(text: &str) -> String {
    format!("[ {text} ]")
}

/// Areas of the approve and cancel buttons, right-aligned in `area`.
pub fn button_areas(area: Rect, approve_text: &str) -> (Rect, Rect) {
    let right = area.x + area.width;
    let cancel_w = button_text(CANCEL_TEXT).width() as u16;
    let approve_w = button_text(approve_text).width() as u16;
    let cancel_x = right.saturating_sub(cancel_w + 1).max(area.x);
    let approve_x = cancel_x.saturating_sub(approve_w + 1).max(area.x);
    (
        Rect::new(approve_x, area.y, approve_w.min(right - approve_x), 1),
        Rect::new(cancel_x, area.y, cancel_w.min(right - cancel_x), 1),
    )
}

/// Bottom bar: selection summary on the left, approve and cancel buttons on
/// the right.
pub struct StatusBarWidget<'a> {
    approve_text: &'a str,
    theme: &'a ThemeColors,
    approve_enabled: bool,
    info: Option<&'a str>,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(approve_text: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            approve_text,
            theme,
            approve_enabled: true,
            info: None,
        }
    }

    pub fn approve_enabled(mut self, enabled: bool) -> Self {
        self.approve_enabled = enabled;
        self
    }

    pub fn info(mut self, info: &'a str) -> Self {
        self.info = Some(info);
        self
    }
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let (approve_area, cancel_area) = button_areas(area, self.approve_text);

        if let Some(info) = self.info {
            let hints_style = Style::default()
                .fg(self.theme.dim_fg)
                .add_modifier(Modifier::DIM);
            let budget = approve_area.x.saturating_sub(area.x + 1);
            buf.set_line(
                area.x,
                area.y,
                &Line::from(Span::styled(info, hints_style)),
                budget,
            );
        }

        let approve_style = if self.approve_enabled {
            Style::default()
                .fg(self.theme.button_fg)
                .bg(self.theme.button_bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(self.theme.dim_fg)
                .add_modifier(Modifier::DIM)
        };
        let cancel_style = Style::default()
            .fg(self.theme.status_fg)
            .bg(self.theme.dialog_bg);

        buf.set_line(
            approve_area.x,
            approve_area.y,
            &Line::from(Span::styled(button_text(self.approve_text), approve_style)),
            approve_area.width,
        );
        buf.set_line(
            cancel_area.x,
            cancel_area.y,
            &Line::from(Span::styled(button_text(CANCEL_TEXT), cancel_style)),
            cancel_area.width,
        );
    }
}

/// "Directory:" label followed by the editable path.
pub struct DirectoryFieldWidget<'a> {
    input: &'a TextInput,
    theme: &'a ThemeColors,
    focused: bool,
}

impl<'a> DirectoryFieldWidget<'a> {
    pub fn new(input: &'a TextInput, theme: &'a ThemeColors) -> Self {
        Self {
            input,
            theme,
            focused: false,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }
}

impl<'a> Widget for DirectoryFieldWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let label_style = if self.focused {
            Style::default()
                .fg(self.theme.border_focused_fg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.theme.status_fg)
        };
        let label = Line::from(Span::styled(DIRECTORY_LABEL, label_style));
        buf.set_line(area.x, area.y, &label, area.width);

        let label_w = (DIRECTORY_LABEL.width() as u16).min(area.width);
        let field_w = area.width - label_w;
        if field_w == 0 {
            return;
        }
        let line = input_line(self.input, field_w as usize, self.theme, self.focused);
        buf.set_line(area.x + label_w, area.y, &line, field_w);
    }
}
