use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use dirchooser::chooser::{ChooserResult, DirectoryChooser};
use dirchooser::components::accessory::DirectoryInfoAccessory;
use dirchooser::config::{AppConfig, GeneralConfig, IconsConfig, TreeConfig};
use dirchooser::error::{AppError, Result};
use dirchooser::event::EventHandler;
use dirchooser::fs::change::DirectoryChangeEvent;
use dirchooser::fs::view::{FileSystemView, LocalFileSystem};
use dirchooser::logging;
use dirchooser::tui::{install_panic_hook, Tui};

/// Pick one or more directories in the terminal and print them.
#[derive(Parser, Debug)]
#[command(name = "dchoose", version, about)]
struct Cli {
    /// Initial directories (more than one enables multi-selection)
    paths: Vec<PathBuf>,

    /// Allow selecting several directories
    #[arg(long)]
    multi: bool,

    /// Print multi-selections sorted by path
    #[arg(long)]
    sort_selected: bool,

    /// Show hidden directories
    #[arg(long)]
    show_hidden: bool,

    /// Open as a save dialog
    #[arg(long)]
    save: bool,

    /// Dialog title
    #[arg(long)]
    title: Option<String>,

    /// Approve button text
    #[arg(long)]
    approve_text: Option<String>,

    /// Icon set to activate
    #[arg(long, value_name = "NAME")]
    icon_set: Option<String>,

    /// Icon set registry file
    #[arg(long, value_name = "FILE")]
    icons: Option<PathBuf>,

    /// Configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Hide the Home / New Folder / Refresh toolbar
    #[arg(long)]
    no_toolbar: bool,

    /// Enable the tree popup menu (`m`)
    #[arg(long)]
    popup_menu: bool,

    /// Show the directory info panel
    #[arg(long)]
    info: bool,

    /// Print the selection as a JSON array
    #[arg(long)]
    json: bool,

    /// Print directory changes to stderr on exit
    #[arg(long)]
    print_changes: bool,

    /// Log file (defaults to the platform cache directory)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Config values set explicitly on the command line.
    fn overrides(&self) -> AppConfig {
        let flag = |set: bool| set.then_some(true);
        AppConfig {
            general: GeneralConfig {
                show_hidden: flag(self.show_hidden),
                ..GeneralConfig::default()
            },
            tree: TreeConfig {
                multi_selection: flag(self.multi || self.paths.len() > 1),
                sort_selected: flag(self.sort_selected),
                popup_menu: flag(self.popup_menu),
                control_buttons: self.no_toolbar.then_some(false),
                ..TreeConfig::default()
            },
            icons: IconsConfig {
                registry: self.icons.as_ref().map(|p| p.display().to_string()),
                active_set: self.icon_set.clone(),
            },
            ..AppConfig::default()
        }
    }
}

fn resolve_initial_paths(cli: &Cli, config: &AppConfig) -> Result<Vec<PathBuf>> {
    let requested = if cli.paths.is_empty() {
        match config.default_path() {
            Some(path) => vec![path],
            None => vec![std::env::current_dir()?],
        }
    } else {
        cli.paths.clone()
    };
    requested
        .iter()
        .map(|path| {
            path.canonicalize()
                .map_err(|_| AppError::InvalidPath(format!("{} does not exist", path.display())))
        })
        .collect()
}

fn print_selection(paths: &[PathBuf], json: bool) -> Result<()> {
    if json {
        let strings: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        let encoded = serde_json::to_string(&strings).map_err(std::io::Error::from)?;
        println!("{encoded}");
    } else {
        for path in paths {
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn describe(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string())
}

async fn run(cli: Cli) -> Result<ExitCode> {
    if let Some(path) = logging::resolve_log_file_path(cli.log_file.as_deref()) {
        // a chooser without a log file is still usable
        let _ = logging::init(&path);
    }

    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));
    let initial = resolve_initial_paths(&cli, &config)?;

    let view: Rc<dyn FileSystemView> = Rc::new(LocalFileSystem::new());
    let mut chooser = DirectoryChooser::from_config(view, &config)?;
    if let Some(title) = &cli.title {
        chooser.set_dialog_title(title.clone());
    }
    if cli.info {
        chooser.set_accessory(Some(Box::new(DirectoryInfoAccessory::new())));
    }
    chooser.set_selected_files(&initial);

    let changes: Rc<RefCell<Vec<DirectoryChangeEvent>>> = Rc::default();
    if cli.print_changes {
        let sink = Rc::clone(&changes);
        chooser.add_change_listener(move |e| sink.borrow_mut().push(e.clone()));
    }

    install_panic_hook();
    let mut tui = Tui::new(config.mouse_enabled())?;
    let mut events = EventHandler::new(Duration::from_millis(250));

    let result = {
        let terminal = tui.terminal_mut();
        if cli.save {
            chooser.set_approve_button_text(cli.approve_text.clone());
            chooser.show_save_dialog(terminal, &mut events).await
        } else if let Some(text) = cli.approve_text.as_deref() {
            chooser.show_dialog(terminal, &mut events, Some(text)).await
        } else {
            chooser.show_open_dialog(terminal, &mut events).await
        }
    };
    tui.restore()?;

    if cli.print_changes {
        for change in changes.borrow().iter() {
            eprintln!(
                "{} -> {}",
                describe(change.previous.as_deref()),
                describe(change.current.as_deref())
            );
        }
    }

    match result {
        ChooserResult::Approve => {
            let selected = chooser.selected_files();
            info!(count = selected.len(), "selection approved");
            print_selection(&selected, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        ChooserResult::Cancel => {
            eprintln!("Cancelled");
            Ok(ExitCode::from(1))
        }
        ChooserResult::Error => {
            warn!("dialog could not be shown");
            Ok(ExitCode::from(2))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("dchoose: {e}");
            ExitCode::from(2)
        }
    }
}
