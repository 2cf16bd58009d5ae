#![forbid(unsafe_code)]

//! The concrete planet-creator form: schema instance, dynamic-population
//! bindings, and well-known names shared with the template and the engine.

use serde::{Deserialize, Serialize};

use crate::error::BindError;
use crate::schema::{FieldDefault, FieldDescriptor, FormSchema, Transform, UiKind};

/// Control-id prefix stripped when deriving payload keys.
pub const KEY_PREFIX: &str = "planet-";

/// Container element the template must provide exactly once.
pub const CONTAINER_SELECTOR: &str = "#planet-creator-modal";

/// Commit button inside the container.
pub const COMMIT_SELECTOR: &str = "#create-planet-btn";

/// Foreign entry receiving the committed payload.
pub const ENTRY_GENERATE: &str = "generate";

/// Foreign entry receiving debounced live-preview payloads.
pub const ENTRY_PREVIEW: &str = "preview";

/// Default template fragment URL.
pub const TEMPLATE_URL: &str = "./interface/_generator-menu.html";

/// Default configuration resource URL.
pub const CONFIG_URL: &str = "./interface/generator-options.json";

/// Debounce delay for live preview, in milliseconds.
pub const PREVIEW_DEBOUNCE_MS: u32 = 100;

/// Runtime-ready gate for engine initialization, in milliseconds.
pub const READY_TIMEOUT_MS: u32 = 10_000;

/// Select control populated from a named option-source list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectBinding {
    pub field_id: String,
    pub data_path: String,
    /// Option id pre-selected when present (e.g. the default axis).
    pub preselect: Option<String>,
}

/// Range control populated from a named range descriptor, with a
/// companion numeric label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBinding {
    pub field_id: String,
    pub data_path: String,
    pub label_id: String,
    /// Label decimal places: 3 for angular/rotational fields, 2 otherwise.
    pub precision: u8,
}

/// The planet-creator field table.
///
/// Sliders carry engine-unit scaling: size is slider/100, both rotation
/// speeds are slider/1000. Keys without an explicit mapping derive from
/// the id (`planet-shape` → `shape`).
pub fn planet_schema() -> Result<FormSchema, BindError> {
    FormSchema::new(
        KEY_PREFIX,
        vec![
            FieldDescriptor::new(
                "planet-name",
                UiKind::Text,
                Transform::Verbatim,
                FieldDefault::StampedName {
                    prefix: "Planet".into(),
                },
            ),
            FieldDescriptor::new(
                "planet-shape",
                UiKind::Select,
                Transform::Verbatim,
                FieldDefault::literal("SPHERE"),
            ),
            FieldDescriptor::new(
                "planet-size",
                UiKind::Range,
                Transform::Number { divisor: 100.0 },
                FieldDefault::RangeDefault {
                    path: "sizeRange".into(),
                },
            ),
            FieldDescriptor::new(
                "planet-color",
                UiKind::Color,
                Transform::ColorRgb,
                FieldDefault::literal("#808080"),
            ),
            FieldDescriptor::new(
                "planet-position",
                UiKind::Select,
                Transform::Number { divisor: 1.0 },
                FieldDefault::literal("1"),
            ),
            FieldDescriptor::new(
                "rotation-axis",
                UiKind::Select,
                Transform::Verbatim,
                FieldDefault::literal("Y"),
            )
            .with_output_key("rotationDir"),
            FieldDescriptor::new(
                "self-rotation",
                UiKind::Range,
                Transform::Number { divisor: 1000.0 },
                FieldDefault::RangeDefault {
                    path: "rotationSpeedRange".into(),
                },
            )
            .with_output_key("rotationSpeedItself"),
            FieldDescriptor::new(
                "orbit-speed",
                UiKind::Range,
                Transform::Number { divisor: 1000.0 },
                FieldDefault::RangeDefault {
                    path: "orbitSpeedRange".into(),
                },
            )
            .with_output_key("rotationSpeedCenter"),
        ],
    )
}

/// Select controls populated from the options resource.
pub fn planet_select_bindings() -> Vec<SelectBinding> {
    vec![
        SelectBinding {
            field_id: "planet-shape".into(),
            data_path: "shapes".into(),
            preselect: None,
        },
        SelectBinding {
            field_id: "rotation-axis".into(),
            data_path: "rotationAxes".into(),
            preselect: Some("Y".into()),
        },
        SelectBinding {
            field_id: "planet-position".into(),
            data_path: "orbitPositions".into(),
            preselect: None,
        },
    ]
}

/// Range controls populated from the options resource.
pub fn planet_range_bindings() -> Vec<RangeBinding> {
    vec![
        RangeBinding {
            field_id: "planet-size".into(),
            data_path: "sizeRange".into(),
            label_id: "size-value".into(),
            precision: 2,
        },
        RangeBinding {
            field_id: "self-rotation".into(),
            data_path: "rotationSpeedRange".into(),
            label_id: "self-rotation-value".into(),
            precision: 3,
        },
        RangeBinding {
            field_id: "orbit-speed".into(),
            data_path: "orbitSpeedRange".into(),
            label_id: "orbit-speed-value".into(),
            precision: 3,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DefaultContext;
    use std::collections::HashMap;

    #[test]
    fn schema_builds_with_unique_keys() {
        let schema = planet_schema().unwrap();
        assert_eq!(schema.fields().len(), 8);
    }

    #[test]
    fn payload_keys_match_the_engine_contract() {
        let schema = planet_schema().unwrap();
        let ctx = DefaultContext {
            options: None,
            now_ms: 0,
        };
        let payload = schema.payload(|_| None, &ctx);
        let keys: Vec<&str> = payload.keys().map(String::as_str).collect();
        for expected in [
            "name",
            "shape",
            "size",
            "color",
            "position",
            "rotationDir",
            "rotationSpeedItself",
            "rotationSpeedCenter",
        ] {
            assert!(keys.contains(&expected), "missing key {expected}");
        }
    }

    #[test]
    fn slider_values_are_scaled_to_engine_units() {
        let schema = planet_schema().unwrap();
        let values: HashMap<&str, &str> = [
            ("planet-size", "80"),
            ("self-rotation", "25"),
            ("orbit-speed", "5"),
        ]
        .into_iter()
        .collect();
        let ctx = DefaultContext {
            options: None,
            now_ms: 0,
        };
        let payload = schema.payload(|id| values.get(id).map(|v| (*v).to_owned()), &ctx);
        assert_eq!(payload["size"], 0.8);
        assert_eq!(payload["rotationSpeedItself"], 0.025);
        assert_eq!(payload["rotationSpeedCenter"], 0.005);
    }

    #[test]
    fn every_bound_control_exists_in_the_schema() {
        let schema = planet_schema().unwrap();
        for binding in planet_select_bindings() {
            assert!(
                schema.field(&binding.field_id).is_some(),
                "select binding {} has no field",
                binding.field_id
            );
        }
        for binding in planet_range_bindings() {
            assert!(
                schema.field(&binding.field_id).is_some(),
                "range binding {} has no field",
                binding.field_id
            );
        }
    }

    #[test]
    fn rotational_ranges_use_three_decimals() {
        let precisions: HashMap<String, u8> = planet_range_bindings()
            .into_iter()
            .map(|b| (b.field_id, b.precision))
            .collect();
        assert_eq!(precisions["planet-size"], 2);
        assert_eq!(precisions["self-rotation"], 3);
        assert_eq!(precisions["orbit-speed"], 3);
    }

    #[test]
    fn axis_select_preselects_y() {
        let bindings = planet_select_bindings();
        let axis = bindings
            .iter()
            .find(|b| b.field_id == "rotation-axis")
            .unwrap();
        assert_eq!(axis.preselect.as_deref(), Some("Y"));
    }
}
