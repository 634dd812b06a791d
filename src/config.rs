//! Chooser configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--show-hidden`, `--icon-set`, etc.)
//! 2. `$DCHOOSE_CONFIG` environment variable (path to config file)
//! 3. Project-local `.dchoose.toml` in the current working directory
//! 4. Global `~/.config/dchoose/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::fs::node::DEFAULT_ROOT_LABEL;
use crate::fs::tree::TreeOptions;

// ── Section configs ──────────────────────────────────────────────────────────

/// General settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Starting directory when none is given on the command line.
    pub default_path: Option<String>,
    /// Show hidden directories by default.
    pub show_hidden: Option<bool>,
    /// Enable mouse support.
    pub mouse: Option<bool>,
}

/// Directory tree and chooser layout settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    pub multi_selection: Option<bool>,
    /// Return multi-selections sorted by path.
    pub sort_selected: Option<bool>,
    /// Label above several roots (e.g. drive letters).
    pub root_label: Option<String>,
    /// Enable the context menu on the tree.
    pub popup_menu: Option<bool>,
    /// Show the toolbar and Approve/Cancel buttons.
    pub control_buttons: Option<bool>,
}

/// Icon registry settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct IconsConfig {
    /// Path to an icon-set registry file; the built-in registry when unset.
    pub registry: Option<String>,
    /// Name of the set to activate instead of the registry's `active_set`.
    pub active_set: Option<String>,
}

/// Color settings for a single theme palette.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeColorsConfig {
    pub tree_fg: Option<String>,
    pub tree_selected_bg: Option<String>,
    pub tree_selected_fg: Option<String>,
    pub tree_dir_fg: Option<String>,
    pub tree_drive_fg: Option<String>,
    pub tree_hidden_fg: Option<String>,
    pub tree_marked_fg: Option<String>,
    pub status_bg: Option<String>,
    pub status_fg: Option<String>,
    pub border_fg: Option<String>,
    pub dialog_bg: Option<String>,
    pub dialog_border_fg: Option<String>,
    pub button_fg: Option<String>,
    pub button_bg: Option<String>,
}

/// Theme configuration section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Color scheme: "dark", "light", "custom".
    pub scheme: Option<String>,
    /// Custom color overrides.
    pub custom: Option<ThemeColorsConfig>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub tree: TreeConfig,
    pub icons: IconsConfig,
    pub theme: ThemeConfig,
}

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path, which is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("DCHOOSE_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".dchoose.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("dchoose").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning logged).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse config file");
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                default_path: other
                    .general
                    .default_path
                    .clone()
                    .or(self.general.default_path),
                show_hidden: other.general.show_hidden.or(self.general.show_hidden),
                mouse: other.general.mouse.or(self.general.mouse),
            },
            tree: TreeConfig {
                multi_selection: other.tree.multi_selection.or(self.tree.multi_selection),
                sort_selected: other.tree.sort_selected.or(self.tree.sort_selected),
                root_label: other.tree.root_label.clone().or(self.tree.root_label),
                popup_menu: other.tree.popup_menu.or(self.tree.popup_menu),
                control_buttons: other.tree.control_buttons.or(self.tree.control_buttons),
            },
            icons: IconsConfig {
                registry: other.icons.registry.clone().or(self.icons.registry),
                active_set: other.icons.active_set.clone().or(self.icons.active_set),
            },
            theme: ThemeConfig {
                scheme: other.theme.scheme.clone().or(self.theme.scheme),
                custom: other.theme.custom.clone().or(self.theme.custom),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Lowest priority first so higher ones overwrite.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn default_path(&self) -> Option<PathBuf> {
        self.general.default_path.as_ref().map(PathBuf::from)
    }

    pub fn show_hidden(&self) -> bool {
        self.general.show_hidden.unwrap_or(false)
    }

    pub fn mouse_enabled(&self) -> bool {
        self.general.mouse.unwrap_or(true)
    }

    pub fn multi_selection(&self) -> bool {
        self.tree.multi_selection.unwrap_or(false)
    }

    pub fn sort_selected(&self) -> bool {
        self.tree.sort_selected.unwrap_or(false)
    }

    pub fn root_label(&self) -> &str {
        self.tree.root_label.as_deref().unwrap_or(DEFAULT_ROOT_LABEL)
    }

    pub fn popup_menu_enabled(&self) -> bool {
        self.tree.popup_menu.unwrap_or(false)
    }

    pub fn control_buttons_shown(&self) -> bool {
        self.tree.control_buttons.unwrap_or(true)
    }

    pub fn icon_registry(&self) -> Option<PathBuf> {
        self.icons.registry.as_ref().map(PathBuf::from)
    }

    pub fn icon_set(&self) -> Option<&str> {
        self.icons.active_set.as_deref()
    }

    /// Theme scheme: "dark", "light", or "custom".
    pub fn theme_scheme(&self) -> &str {
        self.theme.scheme.as_deref().unwrap_or("dark")
    }

    /// Tree construction options derived from this config.
    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            show_hidden: self.show_hidden(),
            multi_selection: self.multi_selection(),
            sort_selected: self.sort_selected(),
            root_label: self.root_label().to_string(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let cfg = AppConfig::default();
        assert!(!cfg.show_hidden());
        assert!(cfg.mouse_enabled());
        assert!(!cfg.multi_selection());
        assert!(!cfg.sort_selected());
        assert_eq!(cfg.root_label(), "Computer");
        assert!(!cfg.popup_menu_enabled());
        assert!(cfg.control_buttons_shown());
        assert!(cfg.icon_registry().is_none());
        assert!(cfg.icon_set().is_none());
        assert_eq!(cfg.theme_scheme(), "dark");
        assert!(cfg.default_path().is_none());
    }

    #[test]
    fn test_toml_parsing_full() {
        let toml = r#"
[general]
default_path = "/srv"
show_hidden = true
mouse = false

[tree]
multi_selection = true
sort_selected = true
root_label = "This PC"
popup_menu = true
control_buttons = false

[icons]
registry = "/etc/dchoose/sets.toml"
active_set = "ascii"

[theme]
scheme = "light"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(cfg.default_path(), Some(PathBuf::from("/srv")));
        assert!(cfg.show_hidden());
        assert!(!cfg.mouse_enabled());
        assert!(cfg.multi_selection());
        assert!(cfg.sort_selected());
        assert_eq!(cfg.root_label(), "This PC");
        assert!(cfg.popup_menu_enabled());
        assert!(!cfg.control_buttons_shown());
        assert_eq!(
            cfg.icon_registry(),
            Some(PathBuf::from("/etc/dchoose/sets.toml"))
        );
        assert_eq!(cfg.icon_set(), Some("ascii"));
        assert_eq!(cfg.theme_scheme(), "light");
    }

    #[test]
    fn test_toml_parsing_partial() {
        let toml = r#"
[general]
show_hidden = true
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert!(cfg.show_hidden());
        assert!(cfg.control_buttons_shown());
        assert_eq!(cfg.root_label(), "Computer");
    }

    #[test]
    fn test_toml_parsing_empty() {
        let cfg: AppConfig = toml::from_str("").expect("parse failed");
        assert!(!cfg.show_hidden());
    }

    #[test]
    fn test_merge_overrides() {
        let base = AppConfig {
            general: GeneralConfig {
                show_hidden: Some(false),
                mouse: Some(false),
                ..Default::default()
            },
            tree: TreeConfig {
                multi_selection: Some(true),
                sort_selected: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };

        let over = AppConfig {
            general: GeneralConfig {
                show_hidden: Some(true),
                ..Default::default()
            },
            tree: TreeConfig {
                sort_selected: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge(&over);
        assert!(merged.show_hidden());
        assert!(!merged.mouse_enabled());
        assert!(merged.multi_selection());
        assert!(merged.sort_selected());
    }

    #[test]
    fn test_merge_none_does_not_clear_some() {
        let base = AppConfig {
            icons: IconsConfig {
                registry: Some("/icons.toml".into()),
                active_set: Some("ascii".into()),
            },
            ..Default::default()
        };
        let merged = base.merge(&AppConfig::default());
        assert_eq!(merged.icon_set(), Some("ascii"));
        assert_eq!(merged.icon_registry(), Some(PathBuf::from("/icons.toml")));
    }

    #[test]
    fn test_tree_options() {
        let cfg = AppConfig {
            general: GeneralConfig {
                show_hidden: Some(true),
                ..Default::default()
            },
            tree: TreeConfig {
                multi_selection: Some(true),
                root_label: Some("Volumes".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let options = cfg.tree_options();
        assert!(options.show_hidden);
        assert!(options.multi_selection);
        assert!(!options.sort_selected);
        assert_eq!(options.root_label, "Volumes");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("test-config.toml");
        let mut f = std::fs::File::create(&cfg_path).expect("create");
        writeln!(
            f,
            r#"
[general]
show_hidden = true

[tree]
popup_menu = true
"#
        )
        .expect("write");

        let cfg = load_file(&cfg_path).expect("load");
        assert!(cfg.show_hidden());
        assert!(cfg.popup_menu_enabled());
        assert!(cfg.control_buttons_shown());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file(Path::new("/nonexistent/config.toml")).is_none());
    }

    #[test]
    fn test_load_invalid_toml_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("bad.toml");
        std::fs::write(&cfg_path, "this is { not valid toml").expect("write");
        assert!(load_file(&cfg_path).is_none());
    }

    #[test]
    fn test_load_with_cli_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        std::fs::write(
            &cfg_path,
            r#"
[general]
show_hidden = true

[icons]
active_set = "nerd"
"#,
        )
        .expect("write");

        let cli_overrides = AppConfig {
            icons: IconsConfig {
                active_set: Some("ascii".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let cfg = AppConfig::load(Some(&cfg_path), Some(&cli_overrides));
        assert_eq!(cfg.icon_set(), Some("ascii"));
        assert!(cfg.show_hidden());
    }

    #[test]
    fn test_theme_custom_colors() {
        let toml = r##"
[theme]
scheme = "custom"

[theme.custom]
tree_fg = "#c0caf5"
border_fg = "#565f89"
"##;
        let cfg: AppConfig = toml::from_str(toml).expect("parse");
        assert_eq!(cfg.theme_scheme(), "custom");
        let custom = cfg.theme.custom.as_ref().expect("custom present");
        assert_eq!(custom.tree_fg.as_deref(), Some("#c0caf5"));
        assert_eq!(custom.border_fg.as_deref(), Some("#565f89"));
        assert!(custom.dialog_bg.is_none());
    }
}
