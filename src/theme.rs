//! Theme data model: built-in palettes and resolution from config.
//!
//! Two built-in palettes (dark and light); the `custom` scheme starts from the
//! dark palette and applies hex overrides from the config file.

use ratatui::style::Color;

use crate::config::{ThemeColorsConfig, ThemeConfig};

// ── Runtime theme colors ─────────────────────────────────────────────────────

/// All runtime colors used in the chooser.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    // Tree
    pub tree_fg: Color,
    pub tree_selected_bg: Color,
    pub tree_selected_fg: Color,
    pub tree_dir_fg: Color,
    pub tree_drive_fg: Color,
    pub tree_hidden_fg: Color,
    /// Directories toggled into a multi-selection.
    pub tree_marked_fg: Color,

    // Directory field and buttons
    pub status_bg: Color,
    pub status_fg: Color,
    pub button_fg: Color,
    pub button_bg: Color,

    // Borders & chrome
    pub border_fg: Color,
    pub border_focused_fg: Color,

    // Dialogs
    pub dialog_bg: Color,
    pub dialog_border_fg: Color,

    // Semantic colors (not configurable)
    pub error_fg: Color,
    pub warning_fg: Color,
    pub success_fg: Color,
    pub accent_fg: Color,
    pub dim_fg: Color,
}

// ── Built-in palettes ────────────────────────────────────────────────────────

/// Dark theme using Catppuccin Mocha palette.
pub fn dark_theme() -> ThemeColors {
    ThemeColors {
        tree_fg: Color::Rgb(205, 214, 244),          // #cdd6f4 (text)
        tree_selected_bg: Color::Rgb(69, 71, 90),    // #45475a (surface1)
        tree_selected_fg: Color::Rgb(205, 214, 244), // #cdd6f4
        tree_dir_fg: Color::Rgb(137, 180, 250),      // #89b4fa (blue)
        tree_drive_fg: Color::Rgb(250, 179, 135),    // #fab387 (peach)
        tree_hidden_fg: Color::Rgb(108, 112, 134),   // #6c7086 (overlay0)
        tree_marked_fg: Color::Rgb(166, 227, 161),   // #a6e3a1 (green)

        status_bg: Color::Rgb(30, 30, 46), // #1e1e2e (base)
        status_fg: Color::Rgb(205, 214, 244),
        button_fg: Color::Rgb(30, 30, 46),
        button_bg: Color::Rgb(137, 180, 250),

        border_fg: Color::Rgb(88, 91, 112),           // #585b70 (surface2)
        border_focused_fg: Color::Rgb(137, 180, 250), // #89b4fa (blue)

        dialog_bg: Color::Rgb(49, 50, 68), // #313244 (surface0)
        dialog_border_fg: Color::Rgb(137, 180, 250),

        error_fg: Color::Rgb(243, 139, 168),   // #f38ba8 (red)
        warning_fg: Color::Rgb(249, 226, 175), // #f9e2af (yellow)
        success_fg: Color::Rgb(166, 227, 161), // #a6e3a1 (green)
        accent_fg: Color::Rgb(203, 166, 247),  // #cba6f7 (mauve)
        dim_fg: Color::Rgb(108, 112, 134),     // #6c7086
    }
}

/// Light theme, complementary to the dark one.
pub fn light_theme() -> ThemeColors {
    ThemeColors {
        tree_fg: Color::Rgb(76, 79, 105),            // #4c4f69 (text)
        tree_selected_bg: Color::Rgb(204, 208, 218), // #ccd0da (surface1)
        tree_selected_fg: Color::Rgb(76, 79, 105),
        tree_dir_fg: Color::Rgb(30, 102, 245),      // #1e66f5 (blue)
        tree_drive_fg: Color::Rgb(254, 100, 11),    // #fe640b (peach)
        tree_hidden_fg: Color::Rgb(156, 160, 176),  // #9ca0b0 (overlay0)
        tree_marked_fg: Color::Rgb(64, 160, 43),    // #40a02b (green)

        status_bg: Color::Rgb(239, 241, 245), // #eff1f5 (base)
        status_fg: Color::Rgb(76, 79, 105),
        button_fg: Color::Rgb(239, 241, 245),
        button_bg: Color::Rgb(30, 102, 245),

        border_fg: Color::Rgb(172, 176, 190), // #acb0be (surface2)
        border_focused_fg: Color::Rgb(30, 102, 245),

        dialog_bg: Color::Rgb(230, 233, 239), // #e6e9ef (surface0)
        dialog_border_fg: Color::Rgb(30, 102, 245),

        error_fg: Color::Rgb(210, 15, 57),    // #d20f39 (red)
        warning_fg: Color::Rgb(223, 142, 29), // #df8e1d (yellow)
        success_fg: Color::Rgb(64, 160, 43),  // #40a02b (green)
        accent_fg: Color::Rgb(136, 57, 239),  // #8839ef (mauve)
        dim_fg: Color::Rgb(156, 160, 176),
    }
}

// ── Color parsing ────────────────────────────────────────────────────────────

/// Parse a hex color string like `"#aabbcc"` into a `ratatui::style::Color`.
/// Returns `None` for malformed input.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

fn override_color(target: &mut Color, hex: Option<&String>) {
    if let Some(color) = hex.and_then(|h| parse_hex_color(h)) {
        *target = color;
    }
}

// ── Theme resolution ─────────────────────────────────────────────────────────

/// Resolve the final `ThemeColors` from config.
///
/// - `"dark"` (default): dark Catppuccin palette
/// - `"light"`: light Catppuccin palette
/// - `"custom"`: start from dark palette, then override with custom hex values
pub fn resolve_theme(config: &ThemeConfig) -> ThemeColors {
    let scheme = config.scheme.as_deref().unwrap_or("dark");
    match scheme {
        "light" => light_theme(),
        "custom" => {
            let mut theme = dark_theme();
            if let Some(custom) = &config.custom {
                apply_custom_colors(&mut theme, custom);
            }
            theme
        }
        _ => dark_theme(),
    }
}

/// Apply custom hex color overrides on top of an existing theme.
fn apply_custom_colors(theme: &mut ThemeColors, custom: &ThemeColorsConfig) {
    override_color(&mut theme.tree_fg, custom.tree_fg.as_ref());
    override_color(&mut theme.tree_selected_bg, custom.tree_selected_bg.as_ref());
    override_color(&mut theme.tree_selected_fg, custom.tree_selected_fg.as_ref());
    override_color(&mut theme.tree_dir_fg, custom.tree_dir_fg.as_ref());
    override_color(&mut theme.tree_drive_fg, custom.tree_drive_fg.as_ref());
    override_color(&mut theme.tree_hidden_fg, custom.tree_hidden_fg.as_ref());
    override_color(&mut theme.tree_marked_fg, custom.tree_marked_fg.as_ref());
    override_color(&mut theme.status_bg, custom.status_bg.as_ref());
    override_color(&mut theme.status_fg, custom.status_fg.as_ref());
    override_color(&mut theme.border_fg, custom.border_fg.as_ref());
    override_color(&mut theme.dialog_bg, custom.dialog_bg.as_ref());
    override_color(&mut theme.dialog_border_fg, custom.dialog_border_fg.as_ref());
    override_color(&mut theme.button_fg, custom.button_fg.as_ref());
    override_color(&mut theme.button_bg, custom.button_bg.as_ref());
}

// ── Tests ────────────────────────────────────────────────────────────────────
