//! Configuration consumed by the layout passes.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Options read by the layout passes. Lengths are in drawing-unit tenths
/// unless stated otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Half the distance between two staff lines, before the definition
    /// factor is applied.
    pub unit: i32,
    /// Lyric font size. Word spacing between harmony labels scales with
    /// `lyric_size / lyric_size_default`.
    pub lyric_size: f64,
    pub lyric_size_default: f64,
    /// Stem width in tenths of a unit.
    pub stem_width: i32,
    /// Draw ligatures as brackets over plain notes. The ligature shape pass
    /// is skipped entirely when set.
    pub ligature_as_bracket: bool,
    /// Number consecutive measure repeats.
    pub multi_number: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            unit: 9,
            lyric_size: 4.5,
            lyric_size_default: 4.5,
            stem_width: 2,
            ligature_as_bracket: false,
            multi_number: true,
        }
    }
}

impl LayoutOptions {
    /// Load options from a JSON object. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Ratio applied to word spacing.
    pub fn lyric_size_ratio(&self) -> f64 {
        if self.lyric_size_default > 0.0 {
            self.lyric_size / self.lyric_size_default
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let options = LayoutOptions::from_json(r#"{ "lyric_size": 9.0 }"#).unwrap();
        assert_eq!(options.unit, 9);
        assert!(options.multi_number);
        assert_eq!(options.lyric_size_ratio(), 2.0);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(LayoutOptions::from_json("{ unit: ").is_err());
    }
}
