#![forbid(unsafe_code)]

//! Adapter between the JS engine module object and the core
//! [`ForeignModule`] seam.
//!
//! The module object is an opaque capability provider (Emscripten-style):
//! we only probe and invoke its exports, never mutate it. Readiness is
//! observed rather than hooked — a truthy `calledRun`, a `ready` promise
//! when exposed, or polling as a last resort, all gated by the caller's
//! timeout.

use js_sys::{Array, Function, Promise, Reflect};
use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use planetsmith_core::bridge::{
    EXPORT_ALLOC, EXPORT_CALL_BY_NAME, EXPORT_FREE, EXPORT_UTF8_LEN, EXPORT_UTF8_WRITE,
    ForeignModule,
};
use planetsmith_core::error::{InitError, MarshalError};

const TIMED_OUT: &str = "planetsmith:timeout";
const POLL_INTERVAL_MS: u32 = 50;

/// Best-effort human-readable message from a thrown JS value.
pub(crate) fn js_error_message(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    value
        .dyn_ref::<js_sys::Error>()
        .map(|err| String::from(err.message()))
        .unwrap_or_else(|| format!("{value:?}"))
}

/// The hosted engine module, shared read-only across all form instances.
#[derive(Clone)]
pub struct EngineModule {
    module: JsValue,
}

impl EngineModule {
    #[must_use]
    pub fn new(module: JsValue) -> Self {
        Self { module }
    }

    fn export(&self, name: &str) -> Option<Function> {
        Reflect::get(&self.module, &JsValue::from_str(name))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok())
    }

    fn runtime_initialized(&self) -> bool {
        Reflect::get(&self.module, &JsValue::from_str("calledRun"))
            .map(|value| value.is_truthy())
            .unwrap_or(false)
    }

    fn ready_promise(&self) -> Option<Promise> {
        Reflect::get(&self.module, &JsValue::from_str("ready"))
            .ok()
            .and_then(|value| value.dyn_into::<Promise>().ok())
    }

    /// Wait for the one-time runtime-ready notification, gated by
    /// `timeout_ms`. The timeout is the only initialization failure that
    /// propagates out of the interface layer.
    pub async fn wait_ready(&self, timeout_ms: u32) -> Result<(), InitError> {
        if self.runtime_initialized() {
            return Ok(());
        }

        if let Some(ready) = self.ready_promise() {
            let race = Promise::race(&Array::of2(&ready, &timeout_promise(timeout_ms)));
            return match JsFuture::from(race).await {
                Ok(value) if value.as_string().as_deref() == Some(TIMED_OUT) => {
                    Err(InitError::ReadyTimeout { timeout_ms })
                }
                Ok(_) => Ok(()),
                Err(err) => Err(InitError::ModuleFailed {
                    message: js_error_message(&err),
                }),
            };
        }

        // No ready promise exposed: poll the initialized flag.
        let mut waited = 0;
        while waited < timeout_ms {
            sleep(POLL_INTERVAL_MS).await;
            waited += POLL_INTERVAL_MS;
            if self.runtime_initialized() {
                return Ok(());
            }
        }
        Err(InitError::ReadyTimeout { timeout_ms })
    }
}

impl ForeignModule for EngineModule {
    fn has_export(&self, name: &str) -> bool {
        self.export(name).is_some()
    }

    fn utf8_len(&self, text: &str) -> Result<usize, MarshalError> {
        let func = self
            .export(EXPORT_UTF8_LEN)
            .ok_or_else(|| MarshalError::invocation(EXPORT_UTF8_LEN, "export missing"))?;
        let length = func
            .call1(&self.module, &JsValue::from_str(text))
            .map_err(|err| MarshalError::invocation(EXPORT_UTF8_LEN, js_error_message(&err)))?;
        length
            .as_f64()
            .map(|n| n as usize)
            .ok_or_else(|| MarshalError::invocation(EXPORT_UTF8_LEN, "non-numeric length"))
    }

    fn alloc(&self, len: usize) -> Result<u32, MarshalError> {
        let func = self
            .export(EXPORT_ALLOC)
            .ok_or(MarshalError::Allocation { bytes: len })?;
        let addr = func
            .call1(&self.module, &JsValue::from_f64(len as f64))
            .map_err(|_| MarshalError::Allocation { bytes: len })?;
        // A non-numeric or missing result reads as address zero, which the
        // bridge treats as allocation failure.
        Ok(addr.as_f64().unwrap_or(0.0) as u32)
    }

    fn write_utf8(&self, text: &str, addr: u32, capacity: usize) -> Result<(), MarshalError> {
        let func = self
            .export(EXPORT_UTF8_WRITE)
            .ok_or_else(|| MarshalError::invocation(EXPORT_UTF8_WRITE, "export missing"))?;
        func.call3(
            &self.module,
            &JsValue::from_str(text),
            &JsValue::from_f64(f64::from(addr)),
            &JsValue::from_f64(capacity as f64),
        )
        .map_err(|err| MarshalError::invocation(EXPORT_UTF8_WRITE, js_error_message(&err)))?;
        Ok(())
    }

    fn release(&self, addr: u32) {
        match self.export(EXPORT_FREE) {
            Some(func) => {
                if let Err(err) = func.call1(&self.module, &JsValue::from_f64(f64::from(addr))) {
                    warn!(addr, error = %js_error_message(&err), "foreign release threw");
                }
            }
            None => warn!(addr, "deallocator disappeared; foreign allocation leaked"),
        }
    }

    fn call_pointer(&self, export: &str, addr: u32) -> Result<(), MarshalError> {
        let func = self
            .export(export)
            .ok_or_else(|| MarshalError::invocation(export, "export missing"))?;
        func.call1(&self.module, &JsValue::from_f64(f64::from(addr)))
            .map_err(|err| MarshalError::invocation(export, js_error_message(&err)))?;
        Ok(())
    }

    fn call_named(&self, entry: &str, payload: &str) -> Result<(), MarshalError> {
        let func = self
            .export(EXPORT_CALL_BY_NAME)
            .ok_or_else(|| MarshalError::invocation(entry, "call-by-name invoker missing"))?;
        // ccall(entry, returnType, argTypes, args)
        let arg_types = Array::of1(&JsValue::from_str("string"));
        let args = Array::of1(&JsValue::from_str(payload));
        let call_args = Array::of4(
            &JsValue::from_str(entry),
            &JsValue::NULL,
            &arg_types.into(),
            &args.into(),
        );
        func.apply(&self.module, &call_args)
            .map_err(|err| MarshalError::invocation(entry, js_error_message(&err)))?;
        Ok(())
    }
}

fn timeout_promise(ms: u32) -> Promise {
    Promise::new(&mut |resolve, _reject| {
        let callback: JsValue = Closure::once_into_js(move || {
            let _ = resolve.call1(&JsValue::NULL, &JsValue::from_str(TIMED_OUT));
        });
        schedule_timeout(&callback, ms);
    })
}

pub(crate) async fn sleep(ms: u32) {
    let promise = Promise::new(&mut |resolve, _reject| {
        let resolve_now = resolve.clone();
        let callback: JsValue = Closure::once_into_js(move || {
            let _ = resolve.call0(&JsValue::NULL);
        });
        if !schedule_timeout(&callback, ms) {
            let _ = resolve_now.call0(&JsValue::NULL);
        }
    });
    let _ = JsFuture::from(promise).await;
}

fn schedule_timeout(callback: &JsValue, ms: u32) -> bool {
    let Some(window) = web_sys::window() else {
        return false;
    };
    window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            ms as i32,
        )
        .is_ok()
}
