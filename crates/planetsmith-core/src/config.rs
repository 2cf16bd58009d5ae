#![forbid(unsafe_code)]

//! Generator options: the configuration resource that drives dynamic
//! control population.
//!
//! The host serves a JSON document of named option-source lists and named
//! numeric range descriptors:
//!
//! ```json
//! {
//!   "generatorOptions": {
//!     "shapes": [{ "id": "SPHERE", "name": "Sphere" }],
//!     "rotationAxes": [{ "id": "Y", "name": "Y axis" }],
//!     "orbitPositions": [{ "id": 1, "name": "Inner orbit" }],
//!     "sizeRange": { "min": 0, "max": 100, "step": 1, "default": 50 },
//!     "rotationSpeedRange": { "min": 0, "max": 100, "step": 1, "default": 10 },
//!     "orbitSpeedRange": { "min": 0, "max": 100, "step": 1, "default": 10 }
//!   }
//! }
//! ```
//!
//! Fields reference these by `data_path` name; an unknown path is a
//! configuration error handled (logged, skipped) by the binder.

use serde::{Deserialize, Serialize};

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(rename = "generatorOptions")]
    pub options: GeneratorOptions,
}

impl GeneratorConfig {
    /// Parse the configuration resource body.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// Named option lists and range descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorOptions {
    pub shapes: Vec<ChoiceItem>,
    pub rotation_axes: Vec<ChoiceItem>,
    pub orbit_positions: Vec<ChoiceItem>,
    pub size_range: RangeSpec,
    pub rotation_speed_range: RangeSpec,
    pub orbit_speed_range: RangeSpec,
}

impl GeneratorOptions {
    /// Look up an option-source list by data path.
    #[must_use]
    pub fn choices(&self, path: &str) -> Option<&[ChoiceItem]> {
        match path {
            "shapes" => Some(&self.shapes),
            "rotationAxes" => Some(&self.rotation_axes),
            "orbitPositions" => Some(&self.orbit_positions),
            _ => None,
        }
    }

    /// Look up a numeric range descriptor by data path.
    #[must_use]
    pub fn range(&self, path: &str) -> Option<&RangeSpec> {
        match path {
            "sizeRange" => Some(&self.size_range),
            "rotationSpeedRange" => Some(&self.rotation_speed_range),
            "orbitSpeedRange" => Some(&self.orbit_speed_range),
            _ => None,
        }
    }
}

/// One select option: stable id plus display text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceItem {
    pub id: ChoiceId,
    pub name: String,
}

/// Option ids come as strings (`"SPHERE"`, `"Y"`) or numbers (orbit slots).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceId {
    Text(String),
    Index(i64),
}

impl ChoiceId {
    /// The value written into the `<option>` control.
    #[must_use]
    pub fn as_control_value(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Index(n) => n.to_string(),
        }
    }
}

/// Numeric range descriptor for a slider control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    #[serde(rename = "default")]
    pub default_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "generatorOptions": {
            "shapes": [
                { "id": "SPHERE", "name": "Sphere" },
                { "id": "CUBE", "name": "Cube" }
            ],
            "rotationAxes": [
                { "id": "X", "name": "X axis" },
                { "id": "Y", "name": "Y axis" },
                { "id": "Z", "name": "Z axis" }
            ],
            "orbitPositions": [
                { "id": 1, "name": "Inner orbit" },
                { "id": 2, "name": "Outer orbit" }
            ],
            "sizeRange": { "min": 0, "max": 100, "step": 1, "default": 50 },
            "rotationSpeedRange": { "min": 0, "max": 50, "step": 1, "default": 10 },
            "orbitSpeedRange": { "min": 0, "max": 50, "step": 1, "default": 5 }
        }
    }"#;

    #[test]
    fn parses_the_documented_shape() {
        let config = GeneratorConfig::from_json(SAMPLE).unwrap();
        let options = &config.options;
        assert_eq!(options.shapes.len(), 2);
        assert_eq!(options.rotation_axes.len(), 3);
        assert_eq!(options.size_range.default_value, 50.0);
    }

    #[test]
    fn choices_lookup_by_data_path() {
        let config = GeneratorConfig::from_json(SAMPLE).unwrap();
        let shapes = config.options.choices("shapes").unwrap();
        assert_eq!(shapes[0].id.as_control_value(), "SPHERE");
        assert!(config.options.choices("nope").is_none());
    }

    #[test]
    fn numeric_ids_render_as_control_values() {
        let config = GeneratorConfig::from_json(SAMPLE).unwrap();
        let positions = config.options.choices("orbitPositions").unwrap();
        assert_eq!(positions[0].id.as_control_value(), "1");
        assert_eq!(positions[1].id.as_control_value(), "2");
    }

    #[test]
    fn range_lookup_by_data_path() {
        let config = GeneratorConfig::from_json(SAMPLE).unwrap();
        let range = config.options.range("orbitSpeedRange").unwrap();
        assert_eq!(range.default_value, 5.0);
        assert!(config.options.range("shapes").is_none());
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(GeneratorConfig::from_json("{").is_err());
        assert!(GeneratorConfig::from_json(r#"{"generatorOptions":{}}"#).is_err());
    }
}
