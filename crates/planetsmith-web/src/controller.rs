#![forbid(unsafe_code)]

//! The exported entry point tying the interface layer together.
//!
//! [`PlanetCreator`] owns one form lifecycle: wait for the engine runtime,
//! fetch and mount the template fragment, bind the schema, populate dynamic
//! controls from the options resource, and wire edits into debounced
//! preview calls plus the commit button. Initialization is staged and
//! short-circuiting; every stage past the ready gate degrades to
//! `Ok(false)` instead of failing the page.

use std::rc::Rc;

use js_sys::Reflect;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;

use planetsmith_core::bridge::MarshalBridge;
use planetsmith_core::config::{GeneratorConfig, GeneratorOptions};
use planetsmith_core::planet::{
    self, COMMIT_SELECTOR, CONFIG_URL, CONTAINER_SELECTOR, ENTRY_GENERATE, ENTRY_PREVIEW,
    PREVIEW_DEBOUNCE_MS, READY_TIMEOUT_MS, TEMPLATE_URL,
};

use crate::binder::FormBinder;
use crate::engine::{EngineModule, js_error_message};
use crate::preview::PreviewSync;
use crate::template::{TemplateCache, fetch_body};

/// Live state of a successfully mounted form.
struct FormState {
    bridge: Rc<MarshalBridge<EngineModule>>,
    binder: Rc<FormBinder>,
    options: Rc<Option<GeneratorOptions>>,
    preview: Rc<PreviewSync>,
    // Kept for the page lifetime so remounts reuse cached templates.
    #[allow(dead_code)]
    templates: TemplateCache,
}

/// One planet-creation form bound to one hosted engine module.
#[wasm_bindgen]
pub struct PlanetCreator {
    engine: EngineModule,
    state: Option<FormState>,
}

#[wasm_bindgen]
impl PlanetCreator {
    /// `module` is the engine module object hosted on the page. It is held
    /// by reference and never mutated.
    #[wasm_bindgen(constructor)]
    pub fn new(module: JsValue) -> Self {
        Self {
            engine: EngineModule::new(module),
            state: None,
        }
    }

    /// Mount and bind the form.
    ///
    /// `options` is an optional plain object overriding `templateUrl`,
    /// `configUrl`, `readyTimeoutMs`, and `previewDebounceMs`.
    ///
    /// Returns `Ok(true)` when the form is live, `Ok(false)` when a
    /// recoverable stage degraded (missing template, missing container),
    /// and `Err` only when the engine never became ready.
    pub async fn init(&mut self, options: Option<js_sys::Object>) -> Result<bool, JsValue> {
        let template_url =
            init_string(options.as_ref(), "templateUrl").unwrap_or_else(|| TEMPLATE_URL.into());
        let config_url =
            init_string(options.as_ref(), "configUrl").unwrap_or_else(|| CONFIG_URL.into());
        let ready_timeout =
            init_u32(options.as_ref(), "readyTimeoutMs").unwrap_or(READY_TIMEOUT_MS);
        let debounce =
            init_u32(options.as_ref(), "previewDebounceMs").unwrap_or(PREVIEW_DEBOUNCE_MS);

        self.engine
            .wait_ready(ready_timeout)
            .await
            .map_err(|err| JsValue::from_str(&err.to_string()))?;

        let templates = TemplateCache::new();
        let doc = templates
            .document(&template_url)
            .await
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        let Some(doc) = doc else {
            return Ok(false);
        };

        let Some(container) = doc.query_selector(CONTAINER_SELECTOR).ok().flatten() else {
            warn!(
                selector = CONTAINER_SELECTOR,
                url = %template_url,
                "template has no form container"
            );
            return Ok(false);
        };

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            warn!("no host document; form not mounted");
            return Ok(false);
        };
        // Remounting replaces any previous instance of the form.
        if let Ok(Some(existing)) = document.query_selector(CONTAINER_SELECTOR) {
            existing.remove();
        }
        let Some(body) = document.body() else {
            warn!("host document has no body; form not mounted");
            return Ok(false);
        };
        if let Err(err) = body.append_child(&container) {
            warn!(error = %js_error_message(&err), "failed to mount form");
            return Ok(false);
        }

        let schema = planet::planet_schema().map_err(|err| JsValue::from_str(&err.to_string()))?;
        let binder = Rc::new(FormBinder::new(schema, container));
        let bridge = Rc::new(MarshalBridge::negotiate(self.engine.clone()));

        // Options are an enhancement: without them the form still binds,
        // selects stay as authored and defaults come from the field table.
        let options = match fetch_body(&config_url).await {
            Ok(raw) => match GeneratorConfig::from_json(&raw) {
                Ok(config) => Some(config.options),
                Err(err) => {
                    warn!(url = %config_url, error = %err, "options resource is malformed");
                    None
                }
            },
            Err(err) => {
                warn!(url = %config_url, error = %err, "options resource unavailable");
                None
            }
        };
        if let Some(opts) = &options {
            binder.populate_selects(opts, &planet::planet_select_bindings());
            binder.populate_ranges(opts, &planet::planet_range_bindings());
        }
        let options = Rc::new(options);

        let preview = Rc::new(PreviewSync::new(debounce, {
            let binder = Rc::clone(&binder);
            let bridge = Rc::clone(&bridge);
            let options = Rc::clone(&options);
            Rc::new(move || deliver(&binder, &bridge, &options, ENTRY_PREVIEW))
        }));
        binder.attach_listeners(&planet::planet_range_bindings(), {
            let preview = Rc::clone(&preview);
            Rc::new(move || preview.schedule())
        });
        // Commit bypasses the debounce window and does not cancel a
        // pending preview.
        binder.attach_commit(COMMIT_SELECTOR, {
            let binder = Rc::clone(&binder);
            let bridge = Rc::clone(&bridge);
            let options = Rc::clone(&options);
            Rc::new(move || deliver(&binder, &bridge, &options, ENTRY_GENERATE))
        });

        info!(
            capability = bridge.capability().as_str(),
            template = %template_url,
            "planet creator bound"
        );
        self.state = Some(FormState {
            bridge,
            binder,
            options,
            preview,
            templates,
        });
        Ok(true)
    }

    /// Negotiated marshal transport, or `"unavailable"` before `init`.
    #[must_use]
    pub fn capability(&self) -> String {
        self.state
            .as_ref()
            .map(|state| state.bridge.capability().as_str())
            .unwrap_or("unavailable")
            .to_owned()
    }

    #[must_use]
    #[wasm_bindgen(js_name = isBound)]
    pub fn is_bound(&self) -> bool {
        self.state.is_some()
    }

    /// Commit the current form state to the engine immediately.
    pub fn generate(&self) {
        if let Some(state) = &self.state {
            deliver(&state.binder, &state.bridge, &state.options, ENTRY_GENERATE);
        }
    }

    /// Send a preview of the current form state, skipping the debounce.
    #[wasm_bindgen(js_name = previewNow)]
    pub fn preview_now(&self) {
        if let Some(state) = &self.state {
            state.preview.cancel();
            deliver(&state.binder, &state.bridge, &state.options, ENTRY_PREVIEW);
        }
    }
}

fn deliver(
    binder: &FormBinder,
    bridge: &MarshalBridge<EngineModule>,
    options: &Option<GeneratorOptions>,
    entry: &str,
) {
    match binder.payload_json(options.as_ref()) {
        Ok(payload) => {
            if let Err(err) = bridge.send(entry, &payload) {
                warn!(entry, error = %err, "payload delivery failed");
            }
        }
        Err(err) => warn!(entry, error = %err, "payload encoding failed"),
    }
}

fn init_value(options: Option<&js_sys::Object>, key: &str) -> Option<JsValue> {
    let options = options?;
    Reflect::get(options.as_ref(), &JsValue::from_str(key))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

fn init_string(options: Option<&js_sys::Object>, key: &str) -> Option<String> {
    init_value(options, key)
        .and_then(|value| value.as_string())
        .filter(|value| !value.is_empty())
}

fn init_u32(options: Option<&js_sys::Object>, key: &str) -> Option<u32> {
    init_value(options, key)
        .and_then(|value| value.as_f64())
        .filter(|value| value.is_finite() && *value >= 0.0)
        .map(|value| value as u32)
}
