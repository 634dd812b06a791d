//! Terminal directory chooser.
//!
//! A lazily expanding directory tree ([`fs::tree::DirectoryTree`]) over a pluggable
//! filesystem view, an embeddable panel ([`panel::DirectoryChooserPanel`]) and a modal
//! dialog ([`chooser::DirectoryChooser`]) rendered with ratatui.

pub mod chooser;
pub mod components;
pub mod config;
pub mod error;
pub mod event;
pub mod fs;
pub mod handler;
pub mod icons;
pub mod input;
pub mod logging;
pub mod panel;
pub mod theme;
pub mod tui;
pub mod ui;

pub use chooser::{ChooserCommand, ChooserResult, DialogType, DirectoryChooser};
pub use error::{AppError, Result};
pub use fs::view::{FileSystemView, LocalFileSystem};
