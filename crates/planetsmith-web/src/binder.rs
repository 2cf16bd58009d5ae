#![forbid(unsafe_code)]

//! DOM form binder: turns the declarative schema into concrete element
//! reads, dynamic population, and listener wiring.
//!
//! Every schema/DOM mismatch (missing control, unknown data path, wrong
//! element type) is a logged configuration error for that field; binding
//! continues for the rest. The binder owns the listener closures so they
//! stay alive for the lifetime of the form.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Reflect;
use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlInputElement, HtmlOptionElement, HtmlSelectElement};

use planetsmith_core::config::GeneratorOptions;
use planetsmith_core::error::BindError;
use planetsmith_core::planet::{RangeBinding, SelectBinding};
use planetsmith_core::schema::{
    DefaultContext, FieldDescriptor, FormSchema, UiKind, strip_extension,
};

use crate::engine::js_error_message;

/// Binds one mounted form fragment to a [`FormSchema`].
pub struct FormBinder {
    schema: FormSchema,
    container: Element,
    listeners: RefCell<Vec<Closure<dyn FnMut()>>>,
}

impl FormBinder {
    #[must_use]
    pub fn new(schema: FormSchema, container: Element) -> Self {
        Self {
            schema,
            container,
            listeners: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    fn control(&self, id: &str) -> Option<Element> {
        self.container
            .query_selector(&format!("#{id}"))
            .ok()
            .flatten()
    }

    /// Raw control value per UI kind. `None` when the control is missing
    /// or (for file inputs) nothing is selected.
    fn read_field(&self, field: &FieldDescriptor) -> Option<String> {
        let el = self.control(&field.id)?;
        match field.ui_kind {
            UiKind::Select => el.dyn_ref::<HtmlSelectElement>().map(HtmlSelectElement::value),
            UiKind::File => {
                let input = el.dyn_ref::<HtmlInputElement>()?;
                let file = input.files()?.get(0)?;
                Some(strip_extension(&file.name()).to_owned())
            }
            UiKind::Text | UiKind::Color | UiKind::Range => Some(
                el.dyn_ref::<HtmlInputElement>()
                    .map(HtmlInputElement::value)
                    .unwrap_or_else(|| reflected_value(&el)),
            ),
        }
    }

    /// Full typed payload from live DOM state.
    #[must_use]
    pub fn payload(
        &self,
        options: Option<&GeneratorOptions>,
    ) -> serde_json::Map<String, serde_json::Value> {
        let ctx = DefaultContext {
            options,
            now_ms: js_sys::Date::now() as u64,
        };
        self.schema.payload(
            |id| {
                self.schema
                    .field(id)
                    .and_then(|field| self.read_field(field))
            },
            &ctx,
        )
    }

    /// Payload as the JSON string handed to the marshal bridge.
    pub fn payload_json(
        &self,
        options: Option<&GeneratorOptions>,
    ) -> Result<String, serde_json::Error> {
        serde_json::to_string(&serde_json::Value::Object(self.payload(options)))
    }

    /// Rebuild each bound select's options from its data path: clear all
    /// existing options, one new option per item, preselect applied.
    pub fn populate_selects(&self, options: &GeneratorOptions, bindings: &[SelectBinding]) {
        for binding in bindings {
            let Some(items) = options.choices(&binding.data_path) else {
                log_bind_error(&BindError::MissingDataPath {
                    path: binding.data_path.clone(),
                });
                continue;
            };
            let Some(select) = self
                .control(&binding.field_id)
                .and_then(|el| el.dyn_into::<HtmlSelectElement>().ok())
            else {
                log_bind_error(&BindError::MissingControl {
                    id: binding.field_id.clone(),
                });
                continue;
            };
            select.set_length(0);
            for item in items {
                let value = item.id.as_control_value();
                match HtmlOptionElement::new_with_text_and_value(&item.name, &value) {
                    Ok(option) => {
                        option.set_selected(binding.preselect.as_deref() == Some(value.as_str()));
                        if let Err(err) = select.append_child(&option) {
                            warn!(
                                field = %binding.field_id,
                                error = %js_error_message(&err),
                                "failed to append option"
                            );
                        }
                    }
                    Err(err) => warn!(
                        field = %binding.field_id,
                        error = %js_error_message(&err),
                        "failed to create option"
                    ),
                }
            }
        }
    }

    /// Apply each bound range descriptor to its slider and refresh the
    /// companion numeric label.
    pub fn populate_ranges(&self, options: &GeneratorOptions, bindings: &[RangeBinding]) {
        for binding in bindings {
            let Some(range) = options.range(&binding.data_path) else {
                log_bind_error(&BindError::MissingDataPath {
                    path: binding.data_path.clone(),
                });
                continue;
            };
            let Some(slider) = self
                .control(&binding.field_id)
                .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
            else {
                log_bind_error(&BindError::MissingControl {
                    id: binding.field_id.clone(),
                });
                continue;
            };
            slider.set_min(&range.min.to_string());
            slider.set_max(&range.max.to_string());
            slider.set_step(&range.step.to_string());
            slider.set_value(&range.default_value.to_string());
            self.refresh_range_label(binding, range.default_value);
        }
    }

    fn refresh_range_label(&self, binding: &RangeBinding, value: f64) {
        if let Some(label) = self.control(&binding.label_id) {
            label.set_text_content(Some(&format_label(value, binding.precision)));
        }
    }

    /// Wire `input` + `change` on every declared control to the update
    /// callback, and an independent label refresher on each range slider.
    pub fn attach_listeners(&self, range_bindings: &[RangeBinding], update: Rc<dyn Fn()>) {
        for field in self.schema.fields() {
            let Some(el) = self.control(&field.id) else {
                log_bind_error(&BindError::MissingControl {
                    id: field.id.clone(),
                });
                continue;
            };
            let callback = {
                let update = Rc::clone(&update);
                Closure::wrap(Box::new(move || update()) as Box<dyn FnMut()>)
            };
            for event in ["input", "change"] {
                if let Err(err) =
                    el.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
                {
                    warn!(
                        field = %field.id,
                        event,
                        error = %js_error_message(&err),
                        "failed to attach listener"
                    );
                }
            }
            self.listeners.borrow_mut().push(callback);
        }

        for binding in range_bindings {
            let Some(slider) = self
                .control(&binding.field_id)
                .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
            else {
                continue; // already logged above if declared in the schema
            };
            let Some(label) = self.control(&binding.label_id) else {
                log_bind_error(&BindError::MissingControl {
                    id: binding.label_id.clone(),
                });
                continue;
            };
            let precision = binding.precision;
            let callback = {
                let slider = slider.clone();
                Closure::wrap(Box::new(move || {
                    let value = slider.value().parse::<f64>().unwrap_or(0.0);
                    label.set_text_content(Some(&format_label(value, precision)));
                }) as Box<dyn FnMut()>)
            };
            if let Err(err) =
                slider.add_event_listener_with_callback("input", callback.as_ref().unchecked_ref())
            {
                warn!(
                    field = %binding.field_id,
                    error = %js_error_message(&err),
                    "failed to attach label refresher"
                );
            }
            self.listeners.borrow_mut().push(callback);
        }
    }

    /// Wire the commit control to a synchronous, non-debounced action.
    pub fn attach_commit(&self, selector: &str, commit: Rc<dyn Fn()>) {
        let button = match self.container.query_selector(selector) {
            Ok(Some(el)) => el,
            _ => {
                warn!(selector, "commit control not found");
                return;
            }
        };
        let callback = Closure::wrap(Box::new(move || commit()) as Box<dyn FnMut()>);
        if let Err(err) =
            button.add_event_listener_with_callback("click", callback.as_ref().unchecked_ref())
        {
            warn!(selector, error = %js_error_message(&err), "failed to attach commit listener");
        }
        self.listeners.borrow_mut().push(callback);
    }
}

fn format_label(value: f64, precision: u8) -> String {
    format!("{value:.prec$}", prec = usize::from(precision))
}

fn reflected_value(el: &Element) -> String {
    Reflect::get(el.as_ref(), &JsValue::from_str("value"))
        .ok()
        .and_then(|value| value.as_string())
        .unwrap_or_default()
}

fn log_bind_error(err: &BindError) {
    warn!(error = %err, "binding degraded");
}
