use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{backend::TestBackend, Terminal};
use tempfile::TempDir;

use dirchooser::chooser::{ChooserResult, DirectoryChooser, Focus};
use dirchooser::config::AppConfig;
use dirchooser::event::{Event, ScriptedEvents};
use dirchooser::fs::view::{FileSystemView, LocalFileSystem};

/// A real directory tree without a dot-prefixed temp name, which would be hidden.
fn setup() -> (TempDir, PathBuf) {
    let dir = tempfile::Builder::new().prefix("dchoose").tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir(root.join("alpha")).unwrap();
    fs::create_dir(root.join("alpha").join("nested")).unwrap();
    fs::create_dir(root.join("beta")).unwrap();
    fs::create_dir(root.join(".secret")).unwrap();
    fs::write(root.join("notes.txt"), "x").unwrap();
    (dir, root)
}

fn chooser_with(config: &AppConfig) -> DirectoryChooser {
    let view: Rc<dyn FileSystemView> = Rc::new(LocalFileSystem::new());
    DirectoryChooser::from_config(view, config).unwrap()
}

fn chooser() -> DirectoryChooser {
    chooser_with(&AppConfig::default())
}

fn terminal() -> Terminal<TestBackend> {
    Terminal::new(TestBackend::new(100, 30)).unwrap()
}

fn screen(terminal: &Terminal<TestBackend>) -> String {
    let buf = terminal.backend().buffer();
    let mut s = String::new();
    for y in 0..buf.area.height {
        for x in 0..buf.area.width {
            s.push_str(buf.cell((x, y)).unwrap().symbol());
        }
        s.push('\n');
    }
    s
}

#[tokio::test]
async fn approve_returns_current_directory() {
    let (_dir, root) = setup();
    let mut chooser = chooser();
    assert!(chooser.set_current_directory(&root.join("alpha")));

    let mut term = terminal();
    let mut events = ScriptedEvents::keys([KeyCode::Enter]);
    let result = chooser.show_open_dialog(&mut term, &mut events).await;

    assert_eq!(result, ChooserResult::Approve);
    assert_eq!(chooser.selected_files(), vec![root.join("alpha")]);
}

#[tokio::test]
async fn files_are_never_listed() {
    let (_dir, root) = setup();
    let mut chooser = chooser();
    chooser.set_current_directory(&root);
    // expand the temp dir and walk onto its children so they are on screen
    let mut term = terminal();
    let mut events =
        ScriptedEvents::keys([KeyCode::Right, KeyCode::Down, KeyCode::Down, KeyCode::Esc]);
    let result = chooser.show_open_dialog(&mut term, &mut events).await;

    assert_eq!(result, ChooserResult::Cancel);
    let content = screen(&term);
    assert!(content.contains("alpha"));
    assert!(content.contains("beta"));
    assert!(!content.contains("notes.txt"));
    assert!(!content.contains(".secret"));
}

#[tokio::test]
async fn new_folder_is_created_on_disk_and_approved() {
    let (_dir, root) = setup();
    let mut chooser = chooser();
    chooser.set_current_directory(&root.join("beta"));

    let mut events = ScriptedEvents::keys([KeyCode::Char('n')]);
    events.extend(ScriptedEvents::typed("gamma"));
    events.push_key(KeyCode::Enter);
    events.push_key(KeyCode::Enter);

    let mut term = terminal();
    let result = chooser.show_open_dialog(&mut term, &mut events).await;

    assert_eq!(result, ChooserResult::Approve);
    assert!(root.join("beta").join("gamma").is_dir());
    assert_eq!(chooser.selected_file(), Some(root.join("beta").join("gamma")));
}

#[tokio::test]
async fn duplicate_folder_shows_error_and_keeps_directory() {
    let (_dir, root) = setup();
    let mut chooser = chooser();
    chooser.set_current_directory(&root);

    let mut events = ScriptedEvents::keys([KeyCode::Char('n')]);
    events.extend(ScriptedEvents::typed("alpha"));
    // create fails; the first Esc dismisses the error, the second cancels
    events.extend(ScriptedEvents::keys([KeyCode::Enter, KeyCode::Esc, KeyCode::Esc]));

    let mut term = terminal();
    let result = chooser.show_open_dialog(&mut term, &mut events).await;

    assert_eq!(result, ChooserResult::Cancel);
    assert_eq!(chooser.current_directory(), Some(root.as_path()));
}

#[tokio::test]
async fn typed_path_navigates_then_approves() {
    let (_dir, root) = setup();
    let mut chooser = chooser();
    let target = root.join("alpha").join("nested");

    let mut events = ScriptedEvents::keys([KeyCode::Tab]);
    events.extend(ScriptedEvents::typed(&target.display().to_string()));
    events.extend(ScriptedEvents::keys([KeyCode::Enter, KeyCode::Tab, KeyCode::Enter]));

    let mut term = terminal();
    let result = chooser.show_open_dialog(&mut term, &mut events).await;

    assert_eq!(result, ChooserResult::Approve);
    assert_eq!(chooser.current_directory(), Some(target.as_path()));
    assert_eq!(chooser.focus(), Focus::Tree);
}

#[tokio::test]
async fn typed_relative_path_is_taken_against_working_directory() {
    let cwd = std::env::current_dir().unwrap();
    let dir = tempfile::Builder::new()
        .prefix("dchoose-field")
        .tempdir_in(&cwd)
        .unwrap();
    fs::create_dir(dir.path().join("tmp")).unwrap();
    let relative = PathBuf::from(dir.path().file_name().unwrap()).join("tmp");

    let config: AppConfig = toml::from_str("[general]\nshow_hidden = true\n").unwrap();
    let mut chooser = chooser_with(&config);
    let mut events = ScriptedEvents::keys([KeyCode::Tab]);
    events.extend(ScriptedEvents::typed(&relative.display().to_string()));
    events.extend(ScriptedEvents::keys([KeyCode::Enter, KeyCode::Tab, KeyCode::Enter]));

    let mut term = terminal();
    let result = chooser.show_open_dialog(&mut term, &mut events).await;

    assert_eq!(result, ChooserResult::Approve);
    assert_eq!(chooser.selected_files(), vec![cwd.join(&relative)]);
}

#[tokio::test]
async fn typed_file_path_is_ignored() {
    let (_dir, root) = setup();
    let mut chooser = chooser();

    let mut events = ScriptedEvents::keys([KeyCode::Tab]);
    events.extend(ScriptedEvents::typed(&root.join("notes.txt").display().to_string()));
    events.extend(ScriptedEvents::keys([KeyCode::Enter, KeyCode::Esc]));

    let mut term = terminal();
    let result = chooser.show_open_dialog(&mut term, &mut events).await;

    assert_eq!(result, ChooserResult::Cancel);
    assert_eq!(chooser.current_directory(), None);
}

#[tokio::test]
async fn show_hidden_toggle_reveals_dot_directories() {
    let (_dir, root) = setup();
    let mut chooser = chooser();
    chooser.set_current_directory(&root);

    let mut events = ScriptedEvents::keys([
        KeyCode::Right,
        KeyCode::Char('.'),
        KeyCode::Down,
        KeyCode::Esc,
    ]);
    let mut term = terminal();
    chooser.show_open_dialog(&mut term, &mut events).await;

    assert!(chooser.show_hidden());
    assert!(chooser.accept(&root.join(".secret")));
    assert!(screen(&term).contains(".secret"));
}

#[tokio::test]
async fn multi_selection_returns_marked_directories_sorted() {
    let (_dir, root) = setup();
    let config: AppConfig =
        toml::from_str("[tree]\nmulti_selection = true\nsort_selected = true\n").unwrap();
    let mut chooser = chooser_with(&config);
    chooser.set_current_directory(&root.join("beta"));

    // mark beta, move up to alpha, mark it, approve
    let mut events = ScriptedEvents::keys([
        KeyCode::Char(' '),
        KeyCode::Up,
        KeyCode::Char(' '),
        KeyCode::Enter,
    ]);
    let mut term = terminal();
    let result = chooser.show_open_dialog(&mut term, &mut events).await;

    assert_eq!(result, ChooserResult::Approve);
    assert_eq!(
        chooser.selected_files(),
        vec![root.join("alpha"), root.join("beta")]
    );
}

#[test]
fn initial_multi_selection_from_paths() {
    let (_dir, root) = setup();
    let config: AppConfig = toml::from_str("[tree]\nmulti_selection = true\n").unwrap();
    let mut chooser = chooser_with(&config);
    chooser.set_selected_files(&[root.join("beta"), root.join("missing"), root.join("alpha")]);

    assert_eq!(chooser.current_directory(), Some(root.join("beta").as_path()));
    assert_eq!(
        chooser.selected_files(),
        vec![root.join("beta"), root.join("alpha")]
    );
}

#[tokio::test]
async fn dialog_rescans_current_directory_on_show() {
    let (_dir, root) = setup();
    let mut chooser = chooser();
    chooser.set_current_directory(&root);
    let node_names = |chooser: &DirectoryChooser| -> Vec<String> {
        chooser
            .panel()
            .tree()
            .node(&root)
            .map(|n| n.children().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default()
    };
    chooser.panel_mut().tree_mut().expand_selected();
    assert_eq!(node_names(&chooser), vec!["alpha", "beta"]);

    fs::create_dir(root.join("delta")).unwrap();
    let mut term = terminal();
    let mut events = ScriptedEvents::keys([KeyCode::Esc]);
    chooser.show_open_dialog(&mut term, &mut events).await;

    assert_eq!(node_names(&chooser), vec!["alpha", "beta", "delta"]);
}

#[tokio::test]
async fn vanished_directory_falls_back_to_parent_on_refresh() {
    let (_dir, root) = setup();
    let mut chooser = chooser();
    chooser.set_current_directory(&root.join("alpha").join("nested"));
    fs::remove_dir(root.join("alpha").join("nested")).unwrap();

    let mut events = ScriptedEvents::keys([KeyCode::F(5), KeyCode::Esc]);
    let mut term = terminal();
    chooser.show_open_dialog(&mut term, &mut events).await;

    assert_eq!(chooser.current_directory(), Some(root.join("alpha").as_path()));
    assert_eq!(
        chooser.directory_field().value(),
        root.join("alpha").display().to_string()
    );
}

#[tokio::test]
async fn save_dialog_labels_approve_button() {
    let (_dir, root) = setup();
    let mut chooser = chooser();
    chooser.set_current_directory(&root);
    let mut events = ScriptedEvents::new([Event::Key(KeyEvent::new(
        KeyCode::Char('c'),
        KeyModifiers::CONTROL,
    ))]);
    let mut term = terminal();
    let result = chooser.show_save_dialog(&mut term, &mut events).await;

    assert_eq!(result, ChooserResult::Cancel);
    assert!(screen(&term).contains("[ Save ]"));
}

#[test]
fn path_elements_of_nested_directory() {
    let (_dir, root) = setup();
    let chooser = chooser();
    let elements = chooser
        .panel()
        .tree()
        .to_path_elements(&root.join("alpha").join("..").join("beta"));
    assert_eq!(elements.last().map(String::as_str), Some("beta"));
    assert!(!elements.iter().any(|e| e == ".."));
    assert_eq!(
        chooser.panel().tree().to_path_elements(&root.join("notes.txt")),
        chooser.panel().tree().to_path_elements(Path::new(&root))
    );
}
