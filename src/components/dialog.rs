use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::input::TextInput;
use crate::panel::{Overlay, PopupMenuState};
use crate::theme::ThemeColors;

/// Dialog widget that renders the panel's overlay as a centered modal.
pub struct DialogWidget<'a> {
    overlay: &'a Overlay,
    theme: &'a ThemeColors,
}

impl<'a> DialogWidget<'a> {
    pub fn new(overlay: &'a Overlay, theme: &'a ThemeColors) -> Self {
        Self { overlay, theme }
    }

    /// Calculate a centered rectangle within the given area.
    fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        let w = width.min(area.width);
        let h = height.min(area.height);
        Rect::new(x, y, w, h)
    }
}

impl<'a> Widget for DialogWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.overlay {
            Overlay::None => {}
            Overlay::NewFolder(input) => {
                render_input_dialog("New Folder", input, self.theme, area, buf);
            }
            Overlay::PopupMenu(menu) => render_popup_menu(menu, self.theme, area, buf),
            Overlay::Error(message) => render_error_dialog(message, self.theme, area, buf),
        }
    }
}

fn hint_line(hint: &str) -> Line<'_> {
    let hint_style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::DIM);
    Line::from(Span::styled(hint, hint_style))
}

fn render_input_dialog(
    title: &str,
    input: &TextInput,
    theme: &ThemeColors,
    area: Rect,
    buf: &mut Buffer,
) {
    let dialog_width = 50.min(area.width.saturating_sub(4));
    let dialog_height = 5;
    let rect = DialogWidget::centered_rect(dialog_width, dialog_height, area);

    Clear.render(rect, buf);

    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.dialog_border_fg))
        .style(Style::default().bg(theme.dialog_bg))
        .padding(Padding::horizontal(1));

    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let line = input_line(input, inner.width as usize, theme, true);
    buf.set_line(inner.x, inner.y + inner.height / 2, &line, inner.width);

    if inner.height > 1 {
        buf.set_line(
            inner.x,
            inner.y + inner.height - 1,
            &hint_line("[Enter] Create  [Esc] Cancel"),
            inner.width,
        );
    }
}

/// Render `input` into at most `max_width` columns, with a block cursor when
/// `show_cursor` is set. Text left of the cursor is dropped first when it
/// does not fit.
pub(crate) fn input_line<'a>(
    input: &'a TextInput,
    max_width: usize,
    theme: &ThemeColors,
    show_cursor: bool,
) -> Line<'a> {
    let value = input.value();
    let input_style = Style::default().fg(theme.tree_fg);
    if !show_cursor {
        return Line::from(Span::styled(trim_left_to_width(value, max_width), input_style));
    }

    let cursor = input.cursor();
    let (cursor_char, after) = match value[cursor..].chars().next() {
        Some(c) => value[cursor..].split_at(c.len_utf8()),
        None => (" ", ""),
    };

    // Truncate from left if input is too long
    let budget = max_width.saturating_sub(cursor_char.width().max(1));
    let before_display = trim_left_to_width(&value[..cursor], budget);

    let cursor_style = Style::default()
        .bg(theme.tree_fg)
        .fg(theme.dialog_bg)
        .add_modifier(Modifier::BOLD);

    Line::from(vec![
        Span::styled(before_display, input_style),
        Span::styled(cursor_char, cursor_style),
        Span::styled(after, input_style),
    ])
}

fn trim_left_to_width(text: &str, width: usize) -> &str {
    let mut start = 0;
    while text[start..].width() > width {
        match text[start..].chars().next() {
            Some(c) => start += c.len_utf8(),
            None => break,
        }
    }
    &text[start..]
}

fn render_popup_menu(menu: &PopupMenuState, theme: &ThemeColors, area: Rect, buf: &mut Buffer) {
    let label_width = menu
        .items
        .iter()
        .map(|i| i.label.width())
        .max()
        .unwrap_or(0) as u16;
    let dialog_width = (label_width + 8).max(24).min(area.width.saturating_sub(4));
    let dialog_height = (menu.items.len() as u16 + 3).min(area.height.saturating_sub(2));
    let rect = DialogWidget::centered_rect(dialog_width, dialog_height, area);

    Clear.render(rect, buf);

    let block = Block::default()
        .title(" Actions ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.dialog_border_fg))
        .style(Style::default().bg(theme.dialog_bg))
        .padding(Padding::horizontal(1));

    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let rows = inner.height.saturating_sub(1) as usize;
    let skip = menu.selected.saturating_sub(rows.saturating_sub(1));
    for (i, (idx, item)) in menu.items.iter().enumerate().skip(skip).take(rows).enumerate() {
        let selected = idx == menu.selected;
        let style = if !item.enabled {
            Style::default()
                .fg(theme.dim_fg)
                .add_modifier(Modifier::DIM)
        } else if selected {
            Style::default()
                .bg(theme.tree_selected_bg)
                .fg(theme.tree_selected_fg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.tree_fg)
        };
        let pointer = if selected { "> " } else { "  " };
        let text = format!("{pointer}{}", item.label);
        let pad = (inner.width as usize).saturating_sub(text.width());
        let line = Line::from(Span::styled(format!("{text}{}", " ".repeat(pad)), style));
        buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
    }

    buf.set_line(
        inner.x,
        inner.y + inner.height - 1,
        &hint_line("[Enter] Run  [Esc] Close"),
        inner.width,
    );
}

fn render_error_dialog(message: &str, theme: &ThemeColors, area: Rect, buf: &mut Buffer) {
    let dialog_width = (message.width() as u16 + 6)
        .max(30)
        .min(area.width.saturating_sub(4));
    let dialog_height = 5;
    let rect = DialogWidget::centered_rect(dialog_width, dialog_height, area);

    Clear.render(rect, buf);

    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.error_fg))
        .style(Style::default().bg(theme.dialog_bg))
        .padding(Padding::horizontal(1));

    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let msg_line = Line::from(Span::styled(message, Style::default().fg(theme.error_fg)));
    buf.set_line(inner.x, inner.y + inner.height / 2, &msg_line, inner.width);

    if inner.height > 1 {
        buf.set_line(
            inner.x,
            inner.y + inner.height - 1,
            &hint_line("[Enter/Esc] Dismiss"),
            inner.width,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::{PopupAction, PopupMenuItem};
    use crate::theme;

    fn render(overlay: &Overlay) -> String {
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        DialogWidget::new(overlay, &tc).render(area, &mut buf);
        buffer_to_string(&buf, area)
    }

    #[test]
    fn test_new_folder_dialog_renders() {
        let overlay = Overlay::NewFolder(TextInput::with_value("reports"));
        let content = render(&overlay);
        assert!(content.contains("New Folder"));
        assert!(content.contains("reports"));
        assert!(content.contains("[Enter] Create"));
    }

    #[test]
    fn test_error_dialog_renders() {
        let overlay = Overlay::Error("Permission denied".to_string());
        let content = render(&overlay);
        assert!(content.contains("Error"));
        assert!(content.contains("Permission denied"));
    }

    #[test]
    fn test_popup_menu_renders_pointer_on_selection() {
        let menu = PopupMenuState {
            items: vec![
                PopupMenuItem::new("Refresh", PopupAction::Refresh),
                PopupMenuItem::custom("Bookmark"),
            ],
            selected: 1,
        };
        let content = render(&Overlay::PopupMenu(menu));
        assert!(content.contains("Actions"));
        assert!(content.contains("  Refresh"));
        assert!(content.contains("> Bookmark"));
    }

    #[test]
    fn test_no_overlay_noop() {
        let content = render(&Overlay::None);
        assert!(content.trim().is_empty());
    }

    #[test]
    fn test_input_line_truncates_from_left() {
        let tc = theme::dark_theme();
        let input = TextInput::with_value("abcdefghij");
        let line = input_line(&input, 5, &tc, true);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "ghij ");
    }

    #[test]
    fn test_input_line_cursor_on_multibyte_char() {
        let tc = theme::dark_theme();
        let mut input = TextInput::with_value("né");
        input.move_left();
        let line = input_line(&input, 10, &tc, true);
        assert_eq!(line.spans[1].content, "é");
        assert_eq!(line.spans[0].content, "n");
    }

    #[test]
    fn test_centered_rect() {
        let rect = DialogWidget::centered_rect(20, 5, Rect::new(0, 0, 80, 24));
        assert_eq!(rect, Rect::new(30, 9, 20, 5));
        let clipped = DialogWidget::centered_rect(100, 50, Rect::new(0, 0, 80, 24));
        assert_eq!(clipped, Rect::new(0, 0, 80, 24));
    }

    fn buffer_to_string(buf: &Buffer, area: Rect) -> String {
        let mut s = String::new();
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                s.push_str(buf.cell((x, y)).unwrap().symbol());
            }
            s.push('\n');
        }
        s
    }
}
