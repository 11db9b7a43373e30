use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^#[0-9a-f]{6}$").expect("hex color pattern is valid")
});

pub const TEMPLATE_BLUE: &str = "#119EE5";
pub const TEMPLATE_MAGENTA: &str = "#E5017C";
pub const TEMPLATE_YELLOW: &str = "#FEED00";
pub const TEMPLATE_BACKGROUND: &str = "#1E1F21";

const DEFAULT_LIGHT_THRESHOLD: f64 = 0.8;

/// A strict `#RRGGBB` color. The original casing is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected a #RRGGBB hex color, got {0:?}")]
pub struct InvalidColor(pub String);

impl Color {
    pub fn parse(raw: &str) -> Result<Self, InvalidColor> {
        if HEX_COLOR.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidColor(raw.to_string()))
        }
    }

    /// Palette constants are checked by the tests below.
    pub(crate) fn from_palette(hex: &'static str) -> Self {
        Self(hex.to_string())
    }

    pub fn template_blue() -> Self {
        Self::from_palette(TEMPLATE_BLUE)
    }

    pub fn template_magenta() -> Self {
        Self::from_palette(TEMPLATE_MAGENTA)
    }

    pub fn template_yellow() -> Self {
        Self::from_palette(TEMPLATE_YELLOW)
    }

    pub fn template_background() -> Self {
        Self::from_palette(TEMPLATE_BACKGROUND)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&self.0[range], 16).unwrap_or_default()
        };
        (channel(1..3), channel(3..5), channel(5..7))
    }

    /// Relative luminance above `threshold` (0..1) counts as light.
    pub fn is_light(&self, threshold: f64) -> bool {
        let (r, g, b) = self.rgb();
        let luminance = 0.2126 * f64::from(r) / 255.0
            + 0.7152 * f64::from(g) / 255.0
            + 0.0722 * f64::from(b) / 255.0;
        luminance > threshold
    }

    pub fn is_light_default(&self) -> bool {
        self.is_light(DEFAULT_LIGHT_THRESHOLD)
    }
}

impl TryFrom<String> for Color {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if HEX_COLOR.is_match(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidColor(value))
        }
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Color {
    type Err = InvalidColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
