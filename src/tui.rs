use std::io::{self, Stderr};

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::debug;

use crate::error::{AppError, Result};

/// Terminal wrapper that manages raw mode and the alternate screen.
///
/// The dialog draws on stderr so stdout stays free for the chosen paths,
/// e.g. `cd "$(dchoose)"`.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stderr>>,
    mouse_enabled: bool,
    restored: bool,
}

impl Tui {
    /// Enter raw mode and the alternate screen, optionally capturing the mouse.
    pub fn new(enable_mouse: bool) -> Result<Self> {
        let mut stderr = io::stderr();
        terminal::enable_raw_mode()?;
        execute!(stderr, EnterAlternateScreen)?;
        if enable_mouse {
            execute!(stderr, EnableMouseCapture)?;
        }
        let backend = CrosstermBackend::new(stderr);
        let terminal =
            Terminal::new(backend).map_err(|e| AppError::Terminal(e.to_string()))?;
        debug!(mouse = enable_mouse, "terminal initialized");
        Ok(Self {
            terminal,
            mouse_enabled: enable_mouse,
            restored: false,
        })
    }

    /// Restore the terminal to its original state. Safe to call twice.
    pub fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        if self.mouse_enabled {
            execute!(self.terminal.backend_mut(), DisableMouseCapture)?;
        }
        terminal::disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<CrosstermBackend<Stderr>> {
        &mut self.terminal
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Install a panic hook that restores the terminal before printing panic info.
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = terminal::disable_raw_mode();
        let _ = execute!(io::stderr(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic_info);
    }));
}
