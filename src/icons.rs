//! Icon sets: a TOML registry of named glyph bundles, one active at a time.
//!
//! Icons are short terminal glyphs read from asset files and padded to the set's
//! `icon_size` in display columns. Sets whose `location` starts with `builtin:`
//! are compiled into the binary; any other location is a directory, resolved
//! relative to the registry file.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::error::{AppError, Result};
use crate::fs::tree::{FlatItem, ItemKind};
use crate::fs::view::FileSystemView;

const BUILTIN_PREFIX: &str = "builtin:";

const BUILTIN_REGISTRY: &str = include_str!("../assets/icons/sets.toml");

const BUILTIN_ASSETS: &[(&str, &str)] = &[
    ("nerd/closed.txt", include_str!("../assets/icons/nerd/closed.txt")),
    ("nerd/open.txt", include_str!("../assets/icons/nerd/open.txt")),
    ("nerd/drive.txt", include_str!("../assets/icons/nerd/drive.txt")),
    ("nerd/home.txt", include_str!("../assets/icons/nerd/home.txt")),
    ("nerd/new_folder.txt", include_str!("../assets/icons/nerd/new_folder.txt")),
    ("nerd/refresh.txt", include_str!("../assets/icons/nerd/refresh.txt")),
    ("ascii/closed.txt", include_str!("../assets/icons/ascii/closed.txt")),
    ("ascii/open.txt", include_str!("../assets/icons/ascii/open.txt")),
    ("ascii/drive.txt", include_str!("../assets/icons/ascii/drive.txt")),
    ("ascii/home.txt", include_str!("../assets/icons/ascii/home.txt")),
    ("ascii/new_folder.txt", include_str!("../assets/icons/ascii/new_folder.txt")),
    ("ascii/refresh.txt", include_str!("../assets/icons/ascii/refresh.txt")),
];

/// Width used when a set does not parse its own.
pub const DEFAULT_ICON_SIZE: usize = 2;

// ── Registry file ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RegistryFile {
    available_sets: Option<Vec<String>>,
    active_set: Option<String>,
    sets: BTreeMap<String, SetFile>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct SetFile {
    location: Option<String>,
    source: Option<String>,
    license: Option<String>,
    icon_size: Option<usize>,
    drive: Option<String>,
    open: Option<String>,
    closed: Option<String>,
    home: Option<String>,
    new_folder: Option<String>,
    refresh: Option<String>,
}

/// Role an icon plays in the chooser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconRole {
    Drive,
    Open,
    Closed,
    Home,
    NewFolder,
    Refresh,
}

/// A validated icon set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconSet {
    pub name: String,
    pub location: String,
    pub source: String,
    pub license: String,
    pub icon_size: usize,
    assets: HashMap<IconRole, String>,
}

impl IconSet {
    fn from_file(name: &str, file: &SetFile) -> std::result::Result<Self, String> {
        fn required(value: &Option<String>, key: &str) -> std::result::Result<String, String> {
            value
                .clone()
                .ok_or_else(|| format!("Missing icon set key: {key}"))
        }

        let location = file
            .location
            .clone()
            .ok_or_else(|| format!("Missing sets location key: sets.{name}.location"))?;
        let source = required(&file.source, "source")?;
        let license = required(&file.license, "license")?;
        let drive = required(&file.drive, "drive")?;
        let open = required(&file.open, "open")?;
        let closed = required(&file.closed, "closed")?;
        let icon_size = file
            .icon_size
            .ok_or_else(|| "Missing icon set key: icon_size".to_string())?;

        let mut assets = HashMap::new();
        assets.insert(IconRole::Drive, drive);
        assets.insert(IconRole::Open, open);
        assets.insert(IconRole::Closed, closed);
        for (role, value) in [
            (IconRole::Home, &file.home),
            (IconRole::NewFolder, &file.new_folder),
            (IconRole::Refresh, &file.refresh),
        ] {
            if let Some(v) = value {
                assets.insert(role, v.clone());
            }
        }

        Ok(Self {
            name: name.to_string(),
            location,
            source,
            license,
            icon_size: if icon_size == 0 {
                DEFAULT_ICON_SIZE
            } else {
                icon_size
            },
            assets,
        })
    }

    /// Asset name for `role`; `None` when the role is absent or blank.
    pub fn asset(&self, role: IconRole) -> Option<&str> {
        self.assets
            .get(&role)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

// ── Icon ─────────────────────────────────────────────────────────────────────

/// A glyph padded to the set's icon size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon(String);

impl Icon {
    /// Fit `glyph` into exactly `size` display columns.
    pub fn fit(glyph: &str, size: usize) -> Self {
        let mut out = String::new();
        let mut width = 0;
        for c in glyph.chars() {
            let w = c.width().unwrap_or(0);
            if width + w > size {
                break;
            }
            out.push(c);
            width += w;
        }
        out.extend(std::iter::repeat(' ').take(size - width));
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn width(&self) -> usize {
        self.0.width()
    }
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Manager ──────────────────────────────────────────────────────────────────

/// Loads, validates and caches icon sets.
#[derive(Debug)]
pub struct IconManager {
    available: Vec<String>,
    sets: BTreeMap<String, SetFile>,
    base_dir: Option<PathBuf>,
    active: IconSet,
    /// Fitted assets keyed by asset path and icon size.
    cache: RefCell<HashMap<(String, usize), Option<Icon>>>,
    /// Raw platform glyphs keyed by path.
    system_cache: RefCell<HashMap<PathBuf, Option<String>>>,
}

impl IconManager {
    /// Manager over the registry compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_REGISTRY, None)
    }

    /// Manager over a registry file on disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::IconConfig(format!(
                "Failed to read icon sets: {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content, path.parent())
    }

    /// Parse and validate a registry. Relative directory locations resolve
    /// against `base_dir`.
    pub fn from_toml_str(content: &str, base_dir: Option<&Path>) -> Result<Self> {
        let file: RegistryFile =
            toml::from_str(content).map_err(|e| AppError::IconConfig(e.to_string()))?;
        let available = file
            .available_sets
            .ok_or_else(|| AppError::IconConfig("Missing sets key: available_sets".into()))?;
        let active_name = file
            .active_set
            .ok_or_else(|| AppError::IconConfig("Missing sets key: active_set".into()))?;
        for name in &available {
            let has_location = file
                .sets
                .get(name)
                .is_some_and(|s| s.location.is_some());
            if !has_location {
                return Err(AppError::IconConfig(format!(
                    "Missing sets location key: sets.{name}.location"
                )));
            }
        }

        let active = Self::validate_set(&file.sets, &active_name)?;
        debug!(set = %active.name, "icon set activated");
        Ok(Self {
            available,
            sets: file.sets,
            base_dir: base_dir.map(Path::to_path_buf),
            active,
            cache: RefCell::new(HashMap::new()),
            system_cache: RefCell::new(HashMap::new()),
        })
    }

    fn validate_set(sets: &BTreeMap<String, SetFile>, name: &str) -> Result<IconSet> {
        let file = sets.get(name).ok_or_else(|| {
            AppError::IconConfig(format!(
                "Failed to initialize icon set '{name}': Missing sets location key: sets.{name}.location"
            ))
        })?;
        IconSet::from_file(name, file).map_err(|msg| {
            AppError::IconConfig(format!("Failed to initialize icon set '{name}': {msg}"))
        })
    }

    pub fn available_sets(&self) -> &[String] {
        &self.available
    }

    pub fn active_set(&self) -> &str {
        &self.active.name
    }

    pub fn active(&self) -> &IconSet {
        &self.active
    }

    /// Switch to another registered set. The current set stays active on error.
    pub fn set_active_set(&mut self, name: &str) -> Result<()> {
        if !self.available.iter().any(|s| s == name) {
            return Err(AppError::IconConfig(format!(
                "Invalid icon set name (available: {}): {name}",
                self.available.join(",")
            )));
        }
        self.active = Self::validate_set(&self.sets, name)?;
        debug!(set = %name, "icon set activated");
        Ok(())
    }

    pub fn icon_size(&self) -> usize {
        self.active.icon_size
    }

    /// Icon for a role of the active set, or `None` if the set declares none.
    pub fn icon(&self, role: IconRole) -> Option<Icon> {
        let name = self.active.asset(role)?;
        let filename = format!("{}/{}", self.active.location, name);
        self.load_icon(&filename)
    }

    pub fn drive_icon(&self) -> Option<Icon> {
        self.icon(IconRole::Drive)
    }

    pub fn open_icon(&self) -> Option<Icon> {
        self.icon(IconRole::Open)
    }

    pub fn closed_icon(&self) -> Option<Icon> {
        self.icon(IconRole::Closed)
    }

    pub fn home_icon(&self) -> Option<Icon> {
        self.icon(IconRole::Home)
    }

    fn load_icon(&self, filename: &str) -> Option<Icon> {
        let key = (filename.to_string(), self.icon_size());
        if let Some(cached) = self.cache.borrow().get(&key) {
            return cached.clone();
        }
        let icon = match self.read_asset(filename) {
            Ok(content) => match content.lines().map(str::trim).find(|l| !l.is_empty()) {
                Some(glyph) => Some(Icon::fit(glyph, self.icon_size())),
                None => {
                    warn!(asset = %filename, "icon asset is empty");
                    None
                }
            },
            Err(e) => {
                warn!(asset = %filename, error = %e, "failed to load icon");
                None
            }
        };
        self.cache.borrow_mut().insert(key, icon.clone());
        icon
    }

    fn read_asset(&self, filename: &str) -> std::io::Result<String> {
        if let Some(key) = filename.strip_prefix(BUILTIN_PREFIX) {
            return BUILTIN_ASSETS
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, content)| content.to_string())
                .ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no such builtin asset")
                });
        }
        let path = Path::new(filename);
        let path = match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
        std::fs::read_to_string(path)
    }

    /// The platform's glyph for `path`, cached permanently by path and fitted
    /// to the active set.
    pub fn system_icon(&self, view: &dyn FileSystemView, path: &Path) -> Option<Icon> {
        let cached = self.system_cache.borrow().get(path).cloned();
        let glyph = match cached {
            Some(glyph) => glyph,
            None => {
                let glyph = view.system_icon(path);
                self.system_cache
                    .borrow_mut()
                    .insert(path.to_path_buf(), glyph.clone());
                glyph
            }
        };
        glyph.map(|glyph| Icon::fit(&glyph, self.icon_size()))
    }

    /// Icon for a tree row: the role icon, else the platform glyph.
    pub fn icon_for(&self, view: &dyn FileSystemView, item: &FlatItem) -> Option<Icon> {
        let role = if item.kind == ItemKind::Drive {
            IconRole::Drive
        } else if item.is_home {
            IconRole::Home
        } else if item.is_expanded && !item.is_leaf {
            IconRole::Open
        } else {
            IconRole::Closed
        };
        self.icon(role)
            .or_else(|| {
                if role == IconRole::Home {
                    self.closed_icon()
                } else {
                    None
                }
            })
            .or_else(|| self.system_icon(view, &item.path))
    }
}
