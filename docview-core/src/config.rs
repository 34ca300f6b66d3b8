use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};

use crate::view::{AdjustMode, GotoMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Rgb {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| anyhow!("color {s:?} must start with '#'"))?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow!("color {s:?} must have the form #rrggbb"));
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16);
        Ok(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Startup configuration read from `config.toml`. Every field is optional in
/// the file; missing fields fall back to [`Config::default`].
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub zoom_min: u32,
    pub zoom_max: u32,
    pub zoom_step: u32,
    pub scroll_step: u32,
    pub recolor_open: bool,
    pub adjust_open: AdjustMode,
    pub goto_mode: GotoMode,
    #[serde_as(as = "DisplayFromStr")]
    pub recolor_darkcolor: Rgb,
    #[serde_as(as = "DisplayFromStr")]
    pub recolor_lightcolor: Rgb,
    #[serde_as(as = "DisplayFromStr")]
    pub search_highlight: Rgb,
    pub highlight_alpha: f32,
    pub password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zoom_min: 10,
            zoom_max: 400,
            zoom_step: 10,
            scroll_step: 40,
            recolor_open: false,
            adjust_open: AdjustMode::BestFit,
            goto_mode: GotoMode::Labels,
            recolor_darkcolor: Rgb::new(0x35, 0x35, 0x35),
            recolor_lightcolor: Rgb::new(0xdb, 0xdb, 0xdb),
            search_highlight: Rgb::new(0x9f, 0xbc, 0x00),
            highlight_alpha: 0.2,
            password: String::new(),
        }
    }
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self> {
        let config: Config = toml::from_str(source).context("failed to parse configuration")?;
        config.validate()
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration {:?}", path))?;
        Self::from_toml(&source)
    }

    fn validate(self) -> Result<Self> {
        if self.zoom_min == 0 || self.zoom_min > self.zoom_max {
            return Err(anyhow!(
                "zoom-min ({}) must be positive and not exceed zoom-max ({})",
                self.zoom_min,
                self.zoom_max
            ));
        }
        if !(0.0..=1.0).contains(&self.highlight_alpha) {
            return Err(anyhow!("highlight-alpha must lie within 0.0..=1.0"));
        }
        Ok(self)
    }
}
