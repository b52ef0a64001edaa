//! Configuration and color scheme management for slotmenu.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.slotmenu/config.toml`
//! - Per-menu-type size overrides
//! - Built-in color schemes for the terminal host
//!
//! # Configuration File
//!
//! ```toml
//! # Refresh tick period of the host loop
//! refresh_interval_ms = 50
//!
//! # Log filter (trace, debug, info, warn, error or an EnvFilter directive)
//! log_level = "debug"
//!
//! # Take the host surface down when an open is rolled back
//! close_on_open_failure = true
//!
//! # Color scheme: default, nord, dracula, gruvbox-dark
//! color_scheme = "nord"
//!
//! [dimensions.chest]
//! rows = 6
//! columns = 9
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::wm::MenuType;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Milliseconds between refresh ticks
    pub refresh_interval_ms: u64,
    /// Log filter for the host binary
    pub log_level: String,
    /// Close the surface the user was looking at when an open fails
    pub close_on_open_failure: bool,
    /// Color scheme name
    pub color_scheme: String,
    /// Size overrides keyed by menu type name
    pub dimensions: HashMap<String, Dimensions>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 50,
            log_level: "info".to_string(),
            close_on_open_failure: true,
            color_scheme: "default".to_string(),
            dimensions: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub rows: usize,
    pub columns: usize,
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    /// Load configuration from file, falling back to defaults
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if path.exists() {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(config) = Self::from_toml_str(&content) {
                        return config;
                    }
                }
            }
        }
        Self::default()
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::get_config_path().context("Could not determine config path")?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Directory holding the config file and the log
    pub fn data_dir() -> Option<PathBuf> {
        let dir = home_dir()?.join(".slotmenu");
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        Some(dir)
    }

    fn get_config_path() -> Option<PathBuf> {
        Self::data_dir().map(|dir| dir.join("config.toml"))
    }

    /// Configured size for a menu type
    pub fn dimensions_for(&self, kind: MenuType) -> Option<Dimensions> {
        self.dimensions.get(kind.name()).copied()
    }

    /// Get the color scheme
    pub fn get_color_scheme(&self) -> ColorScheme {
        ColorScheme::by_name(&self.color_scheme)
    }
}

/// Color definition (RGB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to crossterm Color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        crossterm::style::Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

/// Color scheme of the terminal host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorScheme {
    pub name: String,

    // Title bar colors
    pub title_bg: Color,
    pub title_fg: Color,

    // Grid colors
    pub border: Color,
    pub cell_bg: Color,
    pub cell_fg: Color,
    pub empty_fg: Color,

    // Status bar colors
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    pub status_user_bg: Color,
    pub status_user_fg: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_scheme()
    }
}

impl ColorScheme {
    /// Default color scheme
    pub fn default_scheme() -> Self {
        Self {
            name: "default".to_string(),

            title_bg: Color::new(60, 60, 180),
            title_fg: Color::new(255, 255, 255),

            border: Color::new(100, 150, 255),
            cell_bg: Color::new(40, 40, 40),
            cell_fg: Color::new(220, 220, 220),
            empty_fg: Color::new(80, 80, 80),

            status_bar_bg: Color::new(0, 100, 0),
            status_bar_fg: Color::new(255, 255, 255),
            status_user_bg: Color::new(200, 200, 0),
            status_user_fg: Color::new(0, 0, 0),
        }
    }

    /// Nord scheme
    pub fn nord() -> Self {
        Self {
            name: "nord".to_string(),

            title_bg: Color::new(136, 192, 208),
            title_fg: Color::new(46, 52, 64),

            border: Color::new(136, 192, 208),
            cell_bg: Color::new(46, 52, 64),
            cell_fg: Color::new(216, 222, 233),
            empty_fg: Color::new(76, 86, 106),

            status_bar_bg: Color::new(59, 66, 82),
            status_bar_fg: Color::new(216, 222, 233),
            status_user_bg: Color::new(163, 190, 140),
            status_user_fg: Color::new(46, 52, 64),
        }
    }

    /// Dracula scheme
    pub fn dracula() -> Self {
        Self {
            name: "dracula".to_string(),

            title_bg: Color::new(189, 147, 249),
            title_fg: Color::new(40, 42, 54),

            border: Color::new(189, 147, 249),
            cell_bg: Color::new(40, 42, 54),
            cell_fg: Color::new(248, 248, 242),
            empty_fg: Color::new(98, 114, 164),

            status_bar_bg: Color::new(68, 71, 90),
            status_bar_fg: Color::new(248, 248, 242),
            status_user_bg: Color::new(80, 250, 123),
            status_user_fg: Color::new(40, 42, 54),
        }
    }

    /// Gruvbox Dark scheme
    pub fn gruvbox_dark() -> Self {
        Self {
            name: "gruvbox-dark".to_string(),

            title_bg: Color::new(215, 153, 33),
            title_fg: Color::new(40, 40, 40),

            border: Color::new(215, 153, 33),
            cell_bg: Color::new(40, 40, 40),
            cell_fg: Color::new(235, 219, 178),
            empty_fg: Color::new(102, 92, 84),

            status_bar_bg: Color::new(60, 56, 54),
            status_bar_fg: Color::new(235, 219, 178),
            status_user_bg: Color::new(152, 151, 26),
            status_user_fg: Color::new(40, 40, 40),
        }
    }

    /// Get scheme by name
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "nord" => Self::nord(),
            "dracula" => Self::dracula(),
            "gruvbox-dark" | "gruvbox_dark" | "gruvbox" => Self::gruvbox_dark(),
            _ => Self::default_scheme(),
        }
    }

    /// List available schemes
    pub fn list() -> Vec<&'static str> {
        vec!["default", "nord", "dracula", "gruvbox-dark"]
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
