#![forbid(unsafe_code)]

//! Declarative field schema and payload assembly.
//!
//! A form is described as a data table of [`FieldDescriptor`]s: UI kind,
//! transform, default, output key. Transforms and defaults are tagged enum
//! variants rather than embedded closures, so a schema is serializable and
//! testable without a DOM. The binder supplies a reader closure that pulls
//! raw control values; everything after that point is pure.
//!
//! # Value-or-default policy
//!
//! The payload is always fully populated: every declared field contributes
//! an entry. A raw value that is absent, empty, unparsable, or whose
//! transformed value is falsy (`""`, `0`, NaN) falls back to the field
//! default. This deliberately conflates "absent" with "explicitly
//! zero/empty" — a slider at raw `0` reads back as the field default. The
//! policy is inherited and preserved; see the documented tests.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::color;
use crate::config::GeneratorOptions;
use crate::error::BindError;

/// Kind of control a field binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiKind {
    Text,
    Color,
    Select,
    Range,
    File,
}

/// Raw-to-typed value transform, as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Transform {
    /// Pass the raw string through unchanged.
    Verbatim,
    /// Parse as `f64` and divide by `divisor` (engine-unit scaling).
    Number { divisor: f64 },
    /// Decompose a hex color into normalized `{r, g, b}` components.
    ColorRgb,
}

impl Transform {
    /// Apply to a non-empty raw value. `None` means the raw value is
    /// unusable (e.g. a non-numeric string for [`Transform::Number`]) and
    /// the default applies.
    #[must_use]
    pub fn apply(&self, raw: &str) -> Option<FieldValue> {
        match self {
            Self::Verbatim => Some(FieldValue::Str(raw.to_owned())),
            Self::Number { divisor } => raw
                .trim()
                .parse::<f64>()
                .ok()
                .map(|v| FieldValue::Num(v / divisor)),
            Self::ColorRgb => Some(FieldValue::Color(color::parse_hex(raw))),
        }
    }

    /// Last-resort value when even the default cannot be resolved.
    #[must_use]
    pub fn fallback_value(&self) -> FieldValue {
        match self {
            Self::Verbatim => FieldValue::Str(String::new()),
            Self::Number { .. } => FieldValue::Num(0.0),
            Self::ColorRgb => FieldValue::Color(color::FALLBACK),
        }
    }
}

/// Field default, as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FieldDefault {
    /// A literal raw value, run through the field's transform.
    Literal { raw: String },
    /// The `default` of a named range descriptor in the options resource.
    RangeDefault { path: String },
    /// `"<prefix> <timestamp>"` — a generated unique-ish display name.
    StampedName { prefix: String },
}

impl FieldDefault {
    #[must_use]
    pub fn literal(raw: impl Into<String>) -> Self {
        Self::Literal { raw: raw.into() }
    }
}

/// Typed value produced by a transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Str(String),
    Num(f64),
    Color(color::Rgb),
}

impl FieldValue {
    /// Falsiness per the inherited value-or-default policy.
    #[must_use]
    pub fn is_falsy(&self) -> bool {
        match self {
            Self::Str(s) => s.is_empty(),
            Self::Num(n) => *n == 0.0 || n.is_nan(),
            Self::Color(_) => false,
        }
    }

    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Str(s) => Value::String(s),
            Self::Num(n) => json!(n),
            Self::Color(rgb) => json!({ "r": rgb.r, "g": rgb.g, "b": rgb.b }),
        }
    }
}

/// One declarative field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Control element id, unique within the schema.
    pub id: String,
    pub ui_kind: UiKind,
    /// Explicit payload key; `None` derives one from the id.
    pub output_key: Option<String>,
    pub transform: Transform,
    pub default: FieldDefault,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        ui_kind: UiKind,
        transform: Transform,
        default: FieldDefault,
    ) -> Self {
        Self {
            id: id.into(),
            ui_kind,
            output_key: None,
            transform,
            default,
        }
    }

    #[must_use]
    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }
}

/// Inputs needed to resolve field defaults at payload time.
#[derive(Debug, Clone, Copy)]
pub struct DefaultContext<'a> {
    /// Options resource, if it loaded; range defaults degrade without it.
    pub options: Option<&'a GeneratorOptions>,
    /// Millisecond timestamp for stamped names.
    pub now_ms: u64,
}

/// Ordered, validated field table. Order is UI layout order only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    key_prefix: String,
    fields: Vec<FieldDescriptor>,
}

impl FormSchema {
    /// Build a schema, enforcing unique ids and unique resolved output keys.
    pub fn new(
        key_prefix: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, BindError> {
        let key_prefix = key_prefix.into();
        let mut ids = HashSet::new();
        let mut keys = HashSet::new();
        for field in &fields {
            if !ids.insert(field.id.as_str()) {
                return Err(BindError::DuplicateId {
                    id: field.id.clone(),
                });
            }
            let key = resolved_output_key(field, &key_prefix);
            if !keys.insert(key.clone()) {
                return Err(BindError::DuplicateKey { key });
            }
        }
        Ok(Self { key_prefix, fields })
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Payload key for a field: explicit mapping, or derived from the id.
    #[must_use]
    pub fn output_key(&self, field: &FieldDescriptor) -> String {
        resolved_output_key(field, &self.key_prefix)
    }

    /// Assemble the full payload from raw control values.
    ///
    /// `read` returns the raw value for a field id (`None` when the control
    /// is missing). Every declared field contributes an entry; see the
    /// module docs for the fallback policy.
    pub fn payload<F>(&self, mut read: F, ctx: &DefaultContext<'_>) -> Map<String, Value>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = Map::new();
        for field in &self.fields {
            let typed = read(&field.id)
                .filter(|raw| !raw.is_empty())
                .and_then(|raw| field.transform.apply(&raw))
                .filter(|value| !value.is_falsy());
            let value = typed.unwrap_or_else(|| default_value(field, ctx));
            out.insert(self.output_key(field), value.into_json());
        }
        out
    }

    /// Payload serialized as the UTF-8 JSON string the bridge delivers.
    pub fn payload_json<F>(
        &self,
        read: F,
        ctx: &DefaultContext<'_>,
    ) -> Result<String, serde_json::Error>
    where
        F: FnMut(&str) -> Option<String>,
    {
        serde_json::to_string(&Value::Object(self.payload(read, ctx)))
    }
}

/// Resolve a field's default to a typed value.
fn default_value(field: &FieldDescriptor, ctx: &DefaultContext<'_>) -> FieldValue {
    let raw = match &field.default {
        FieldDefault::Literal { raw } => raw.clone(),
        FieldDefault::RangeDefault { path } => {
            match ctx.options.and_then(|o| o.range(path)) {
                Some(range) => range.default_value.to_string(),
                None => {
                    warn!(field = %field.id, path = %path, "range default path yielded no data");
                    return field.transform.fallback_value();
                }
            }
        }
        FieldDefault::StampedName { prefix } => format!("{prefix} {}", ctx.now_ms),
    };
    field
        .transform
        .apply(&raw)
        .unwrap_or_else(|| field.transform.fallback_value())
}

fn resolved_output_key(field: &FieldDescriptor, prefix: &str) -> String {
    field
        .output_key
        .clone()
        .unwrap_or_else(|| derive_output_key(&field.id, prefix))
}

/// Derive a payload key from a control id: strip the schema prefix, then
/// camel-case the remaining kebab segments (`rotation-axis` → `rotationAxis`).
#[must_use]
pub fn derive_output_key(id: &str, prefix: &str) -> String {
    let stripped = id.strip_prefix(prefix).unwrap_or(id);
    let mut out = String::with_capacity(stripped.len());
    let mut upper_next = false;
    for ch in stripped.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// File controls report the selected file's name with its extension
/// suffix stripped. Dotfiles and extensionless names pass through.
#[must_use]
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}
