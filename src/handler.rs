use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};
use tracing::debug;

use crate::chooser::{DirectoryChooser, Focus};
use crate::components::toolbar::ToolbarButton;
use crate::event::Event;
use crate::panel::Overlay;

/// Dispatch one event to the chooser.
pub fn handle_event(chooser: &mut DirectoryChooser, event: Event) {
    match event {
        Event::Key(key) => handle_key_event(chooser, key),
        Event::Mouse(mouse) => handle_mouse_event(chooser, mouse),
        Event::Tick | Event::Resize(_, _) => {}
    }
    chooser.sync_changes();
}

/// Handle a key event.
pub fn handle_key_event(chooser: &mut DirectoryChooser, key: KeyEvent) {
    if chooser.panel().has_overlay() {
        handle_overlay_key(chooser, key);
        return;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            chooser.cancel_selection();
        }
        KeyCode::Esc => chooser.cancel_selection(),
        KeyCode::Tab | KeyCode::BackTab => chooser.toggle_focus(),
        _ => match chooser.focus() {
            Focus::Tree => handle_tree_key(chooser, key),
            Focus::DirectoryField => handle_field_key(chooser, key),
        },
    }
}

fn handle_tree_key(chooser: &mut DirectoryChooser, key: KeyEvent) {
    let page = chooser.layout().tree.height as usize;
    let tree = chooser.panel_mut().tree_mut();
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => tree.select_previous(),
        KeyCode::Down | KeyCode::Char('j') => tree.select_next(),
        KeyCode::PageUp => tree.page_up(page),
        KeyCode::PageDown => tree.page_down(page),
        KeyCode::Home | KeyCode::Char('g') => tree.select_first(),
        KeyCode::End | KeyCode::Char('G') => tree.select_last(),
        KeyCode::Right | KeyCode::Char('l') => tree.expand_selected(),
        KeyCode::Left | KeyCode::Char('h') => tree.collapse_selected(),
        KeyCode::Char(' ') => chooser.toggle_multi_select(),
        KeyCode::Backspace => {
            tree.change_to_parent_directory();
        }
        KeyCode::Char('~') => {
            tree.go_home();
        }
        KeyCode::Char('r') | KeyCode::F(5) => tree.refresh(),
        KeyCode::Char('.') => {
            let show = !tree.show_hidden();
            tree.set_show_hidden(show);
        }
        KeyCode::Enter => {
            chooser.approve_selection();
        }
        KeyCode::Char('n') => {
            chooser.new_folder();
        }
        KeyCode::Char('m') => {
            chooser.panel_mut().open_popup_menu();
        }
        _ => {}
    }
}

fn handle_field_key(chooser: &mut DirectoryChooser, key: KeyEvent) {
    let field = chooser.directory_field_mut();
    match key.code {
        KeyCode::Char(c) => field.insert_char(c),
        KeyCode::Backspace => field.delete_char(),
        KeyCode::Delete => field.delete_forward(),
        KeyCode::Left => field.move_left(),
        KeyCode::Right => field.move_right(),
        KeyCode::Home => field.move_home(),
        KeyCode::End => field.move_end(),
        KeyCode::Enter => {
            if !chooser.navigate_to_directory_field() {
                debug!(text = chooser.directory_field().value(), "not a directory");
            }
        }
        _ => {}
    }
}

fn handle_overlay_key(chooser: &mut DirectoryChooser, key: KeyEvent) {
    let panel = chooser.panel_mut();
    match panel.overlay_mut() {
        Overlay::None => {}
        Overlay::NewFolder(input) => match key.code {
            KeyCode::Enter => {
                panel.confirm_new_folder();
            }
            KeyCode::Esc => panel.close_overlay(),
            KeyCode::Char(c) => input.insert_char(c),
            KeyCode::Backspace => input.delete_char(),
            KeyCode::Delete => input.delete_forward(),
            KeyCode::Left => input.move_left(),
            KeyCode::Right => input.move_right(),
            KeyCode::Home => input.move_home(),
            KeyCode::End => input.move_end(),
            _ => {}
        },
        Overlay::PopupMenu(menu) => match key.code {
            KeyCode::Up | KeyCode::Char('k') => menu.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => menu.select_next(),
            KeyCode::Esc => panel.close_overlay(),
            KeyCode::Enter => {
                if let Some(label) = panel.activate_popup_item() {
                    chooser.fire_custom_command(label);
                }
            }
            _ => {}
        },
        Overlay::Error(_) => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                panel.close_overlay();
            }
        }
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    area.contains(Position::new(column, row))
}

/// Handle a mouse event. Ignored while a modal overlay is open.
pub fn handle_mouse_event(chooser: &mut DirectoryChooser, mouse: MouseEvent) {
    if chooser.panel().has_overlay() {
        return;
    }
    let (column, row) = (mouse.column, mouse.row);
    let layout = chooser.layout().clone();

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if contains(layout.approve, column, row) {
                chooser.approve_selection();
            } else if contains(layout.cancel, column, row) {
                chooser.cancel_selection();
            } else if contains(layout.field, column, row) {
                chooser.set_focus(Focus::DirectoryField);
            } else if contains(layout.tree, column, row) {
                chooser.set_focus(Focus::Tree);
                click_tree_row(chooser, (row - layout.tree.y) as usize);
            } else if let Some((button, _)) = layout
                .toolbar
                .iter()
                .find(|(_, area)| contains(*area, column, row))
            {
                press_toolbar_button(chooser, *button);
            }
        }
        MouseEventKind::Down(MouseButton::Right) if contains(layout.tree, column, row) => {
            click_tree_row(chooser, (row - layout.tree.y) as usize);
            chooser.panel_mut().open_popup_menu();
        }
        MouseEventKind::ScrollUp if contains(layout.tree, column, row) => {
            chooser.panel_mut().tree_mut().select_previous();
        }
        MouseEventKind::ScrollDown if contains(layout.tree, column, row) => {
            chooser.panel_mut().tree_mut().select_next();
        }
        _ => {}
    }
}

/// Select the row at `offset` within the visible tree; clicking the selected
/// row toggles its expansion.
fn click_tree_row(chooser: &mut DirectoryChooser, offset: usize) {
    let tree = chooser.panel_mut().tree_mut();
    let index = tree.scroll_offset + offset;
    let Some(expanded) = tree.flat_items.get(index).map(|item| item.is_expanded) else {
        return;
    };
    let already_selected = index == tree.selected_index && tree.current_directory().is_some();
    if !already_selected {
        tree.select_index(index);
    } else if expanded {
        tree.collapse_selected();
    } else {
        tree.expand_selected();
    }
}

fn press_toolbar_button(chooser: &mut DirectoryChooser, button: ToolbarButton) {
    debug!(?button, "toolbar button");
    match button {
        ToolbarButton::Home => {
            chooser.go_home();
        }
        ToolbarButton::NewFolder => {
            chooser.new_folder();
        }
        ToolbarButton::Refresh => chooser.refresh(),
    }
}
