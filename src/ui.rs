use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders},
    Frame,
};

use crate::chooser::{ChooserLayout, DirectoryChooser, Focus};
use crate::components::accessory::AccessoryWidget;
use crate::components::dialog::DialogWidget;
use crate::components::status_bar::{self, DirectoryFieldWidget, StatusBarWidget};
use crate::components::toolbar::{self, ToolbarWidget};
use crate::components::tree::TreeWidget;

const HINTS: &str = "[Tab] Focus  [Enter] Approve  [Esc] Cancel";

/// Render the chooser dialog and record its layout for mouse handling.
pub fn render(chooser: &mut DirectoryChooser, frame: &mut Frame) {
    let area = frame.area();

    let outer = Block::default()
        .title(format!(" {} ", chooser.dialog_title()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(chooser.theme().border_fg));
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let toolbar_height = u16::from(chooser.control_buttons_are_shown());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(toolbar_height),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);
    let (toolbar_area, body_area, field_area, status_area) =
        (chunks[0], chunks[1], chunks[2], chunks[3]);

    let (tree_area, accessory_area) = split_body(chooser, body_area);

    let tree_block = Block::default().borders(Borders::ALL).border_style(
        Style::default().fg(if chooser.focus() == Focus::Tree {
            chooser.theme().border_focused_fg
        } else {
            chooser.theme().border_fg
        }),
    );
    let tree_inner = tree_block.inner(tree_area);

    // Keep the cursor row visible before drawing
    chooser
        .panel_mut()
        .tree_mut()
        .update_scroll(tree_inner.height as usize);

    let approve_text = chooser.approve_button_text().to_string();
    let layout = ChooserLayout {
        tree: tree_inner,
        toolbar: if toolbar_height > 0 {
            toolbar::button_areas(toolbar_area, chooser.panel().icon_manager())
        } else {
            Vec::new()
        },
        field: field_area,
        approve: status_bar::button_areas(status_area, &approve_text).0,
        cancel: status_bar::button_areas(status_area, &approve_text).1,
    };

    let panel = chooser.panel();
    let theme = chooser.theme();

    if toolbar_height > 0 {
        frame.render_widget(ToolbarWidget::new(panel.icon_manager(), theme), toolbar_area);
    }

    let tree_widget = TreeWidget::new(panel.tree(), panel.icon_manager(), theme)
        .block(tree_block)
        .focused(chooser.focus() == Focus::Tree);
    frame.render_widget(tree_widget, tree_area);

    if let (Some(accessory), Some(rect)) = (chooser.accessory(), accessory_area) {
        frame.render_widget(AccessoryWidget::new(accessory, theme), rect);
    }

    frame.render_widget(
        DirectoryFieldWidget::new(chooser.directory_field(), theme)
            .focused(chooser.focus() == Focus::DirectoryField),
        field_area,
    );

    let marked = panel.tree().multi_selected_count();
    let info = if marked > 0 {
        format!("{marked} selected")
    } else {
        HINTS.to_string()
    };
    frame.render_widget(
        StatusBarWidget::new(&approve_text, theme)
            .approve_enabled(chooser.is_approve_enabled())
            .info(&info),
        status_area,
    );

    if panel.has_overlay() {
        frame.render_widget(DialogWidget::new(panel.overlay(), theme), area);
    }

    chooser.set_layout(layout);
}

/// Tree on the left; the accessory, if any, on the right.
fn split_body(chooser: &DirectoryChooser, body: Rect) -> (Rect, Option<Rect>) {
    let Some(accessory) = chooser.accessory() else {
        return (body, None);
    };
    let width = accessory.width().min(body.width / 2);
    if width == 0 {
        return (body, None);
    }
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(width)])
        .split(body);
    (chunks[0], Some(chunks[1]))
}
