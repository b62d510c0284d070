//! Geometry types shared with the resolver

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A point on screen in absolute pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
}

impl Coordinates {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for Coordinates {
    type Err = String;

    /// Parse `"x,y"` (whitespace around either number is ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("Invalid coordinates '{s}'. Expected 'x,y'."))?;
        let x = x
            .trim()
            .parse::<i32>()
            .map_err(|e| format!("Invalid x in '{s}': {e}"))?;
        let y = y
            .trim()
            .parse::<i32>()
            .map_err(|e| format!("Invalid y in '{s}': {e}"))?;
        Ok(Self { x, y })
    }
}

/// Dimensions of the device screen in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Convert a position given in percent (0-100) of the screen to absolute pixels.
///
/// Out-of-range percentages are clamped to the screen edges.
pub fn percent_to_pixels(x_percent: f64, y_percent: f64, screen: ScreenSize) -> Coordinates {
    let x = x_percent.clamp(0.0, 100.0) / 100.0 * screen.width as f64;
    let y = y_percent.clamp(0.0, 100.0) / 100.0 * screen.height as f64;
    Coordinates {
        x: x.round() as i32,
        y: y.round() as i32,
    }
}
