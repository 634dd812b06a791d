use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors surfaced by the chooser.
///
/// Listing failures inside the tree never appear here: they are absorbed by
/// the node layer and never reach callers.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from terminal setup or explicit filesystem mutations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Malformed icon-set registry or unknown icon set.
    #[error("Icon sets definition invalid: {0}")]
    IconConfig(String),

    /// A new-folder name that cannot name a single directory.
    #[error("Invalid folder name: {0}")]
    InvalidFolderName(String),

    /// An operation needed a current directory but none is selected.
    #[error("No directory selected")]
    NoCurrentDirectory,
}
