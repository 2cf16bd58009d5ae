#![forbid(unsafe_code)]

//! Debounced live-preview scheduling.
//!
//! [`PreviewSync`] owns its debounce state: a [`DebounceGate`] deciding
//! which scheduled edit is still current, the browser timer handle, and a
//! single persistent callback closure reused across every reschedule (so a
//! burst of edits allocates no per-edit closures and leaks nothing when
//! timers are cleared).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

use planetsmith_core::debounce::{DebounceGate, DebounceToken};

/// Collapses bursts of form edits into one trailing-edge preview call.
pub struct PreviewSync {
    delay_ms: u32,
    gate: Rc<RefCell<DebounceGate>>,
    pending: Rc<Cell<Option<DebounceToken>>>,
    timer: Rc<Cell<Option<i32>>>,
    callback: Closure<dyn FnMut()>,
}

impl PreviewSync {
    /// `send` fires once per settled burst, after `delay_ms` of quiet.
    #[must_use]
    pub fn new(delay_ms: u32, send: Rc<dyn Fn()>) -> Self {
        let gate = Rc::new(RefCell::new(DebounceGate::new()));
        let pending = Rc::new(Cell::new(None));
        let timer = Rc::new(Cell::new(None));
        let callback = {
            let gate = Rc::clone(&gate);
            let pending = Rc::clone(&pending);
            let timer = Rc::clone(&timer);
            Closure::wrap(Box::new(move || {
                timer.set(None);
                if let Some(token) = pending.take() {
                    if gate.borrow_mut().try_fire(token) {
                        send();
                    }
                }
            }) as Box<dyn FnMut()>)
        };
        Self {
            delay_ms,
            gate,
            pending,
            timer,
            callback,
        }
    }

    /// Restart the quiet window. Any previously scheduled fire is
    /// superseded: its timer is cleared and its token invalidated.
    pub fn schedule(&self) {
        self.clear_timer();
        let token = self.gate.borrow_mut().schedule();
        self.pending.set(Some(token));

        let Some(window) = web_sys::window() else {
            warn!("no window object; preview not scheduled");
            self.cancel();
            return;
        };
        match window.set_timeout_with_callback_and_timeout_and_arguments_0(
            self.callback.as_ref().unchecked_ref(),
            self.delay_ms as i32,
        ) {
            Ok(handle) => self.timer.set(Some(handle)),
            Err(_) => {
                warn!("failed to schedule preview timer");
                self.cancel();
            }
        }
    }

    /// Drop any scheduled fire without sending.
    pub fn cancel(&self) {
        self.clear_timer();
        self.pending.set(None);
        self.gate.borrow_mut().cancel();
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.gate.borrow().is_armed()
    }

    fn clear_timer(&self) {
        if let Some(handle) = self.timer.take() {
            if let Some(window) = web_sys::window() {
                window.clear_timeout_with_handle(handle);
            }
        }
    }
}

/// The timer handle is window-global; a pending timeout must not outlive
/// the callback closure it points at.
impl Drop for PreviewSync {
    fn drop(&mut self) {
        self.cancel();
    }
}
