//! Window geometry strings of the form `WxH+X+Y`.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::warn;

/// Windowed size and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            x: 0,
            y: 0,
        }
    }
}

impl Geometry {
    /// Strictly parse `WxH+X+Y`. Zero-sized windows are rejected.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (width, rest) = s.trim().split_once('x')?;
        let (height, rest) = rest.split_once('+')?;
        let (x, y) = rest.split_once('+')?;
        let width: u32 = digits(width)?.parse().ok()?;
        let height: u32 = digits(height)?.parse().ok()?;
        let x: i32 = digits(x)?.parse().ok()?;
        let y: i32 = digits(y)?.parse().ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            width,
            height,
            x,
            y,
        })
    }

    /// Parse `s`, falling back to 800x600+0+0 when absent or malformed.
    #[must_use]
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s {
            None => Self::default(),
            Some(raw) => Self::parse(raw).unwrap_or_else(|| {
                warn!(geometry = raw, "malformed geometry; using 800x600+0+0");
                Self::default()
            }),
        }
    }
}

/// `s` if it is a non-empty run of ASCII digits; signs are not accepted.
fn digits(s: &str) -> Option<&str> {
    (!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())).then_some(s)
}

impl FromStr for Geometry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("expected WxH+X+Y, got {s:?}"))
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

impl<'de> Deserialize<'de> for Geometry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_or_default(Some(&raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_geometry() {
        let g = Geometry::parse("910x930+10+0").unwrap();
        assert_eq!(
            g,
            Geometry {
                width: 910,
                height: 930,
                x: 10,
                y: 0
            }
        );
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let g = Geometry::parse("  1024x768+5+6 \n").unwrap();
        assert_eq!((g.width, g.height, g.x, g.y), (1024, 768, 5, 6));
    }

    #[test]
    fn bogus_falls_back_to_default() {
        assert_eq!(Geometry::parse("bogus"), None);
        assert_eq!(Geometry::parse_or_default(Some("bogus")), Geometry::default());
        assert_eq!(Geometry::parse_or_default(None).to_string(), "800x600+0+0");
    }

    #[test]
    fn rejects_partial_and_negative_forms() {
        assert_eq!(Geometry::parse("800x600"), None);
        assert_eq!(Geometry::parse("800x600-1+0"), None);
        assert_eq!(Geometry::parse("0x600+0+0"), None);
        assert_eq!(Geometry::parse("800x600++1+0"), None);
        assert_eq!(Geometry::parse("800x600+1+2+3"), None);
        assert_eq!(Geometry::parse("800 x600+1+2"), None);
    }
}
