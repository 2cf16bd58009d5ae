#![forbid(unsafe_code)]

//! Per-URL template cache with single-flight loads.
//!
//! A template fragment is fetched once per distinct URL, parsed with
//! `DOMParser`, and cached for the lifetime of the cache object — there is
//! no eviction. Concurrent requests for the same URL share one in-flight
//! fetch: the cache slot holds the pending promise and followers await it.
//!
//! "No document" is a first-class outcome: network failures, non-2xx
//! statuses, and parse failures are logged and yield `Ok(None)`. Callers
//! degrade (no form, page stays interactive) rather than crash.

use std::cell::RefCell;
use std::collections::HashMap;

use js_sys::Promise;
use tracing::{debug, warn};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{JsFuture, future_to_promise};
use web_sys::{Document, DomParser, Response, SupportedType};

use planetsmith_core::error::{BindError, LoadError};

use crate::engine::js_error_message;

enum Slot {
    Ready(Document),
    Pending(Promise),
}

/// Owned, explicit template cache (no global state). Construct one
/// wherever the binder is constructed and keep it for the page lifetime.
#[derive(Default)]
pub struct TemplateCache {
    slots: RefCell<HashMap<String, Slot>>,
    last_url: RefCell<Option<String>>,
}

impl TemplateCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The parsed document for `url`, fetching on first use.
    ///
    /// An empty `url` reuses the most recently requested URL; with an
    /// empty cache that is a configuration error. Load failures are
    /// recovered as `Ok(None)`.
    pub async fn document(&self, url: &str) -> Result<Option<Document>, BindError> {
        let url = self.resolve_url(url)?;

        let pending = {
            let slots = self.slots.borrow();
            match slots.get(&url) {
                Some(Slot::Ready(doc)) => return Ok(Some(doc.clone())),
                Some(Slot::Pending(promise)) => Some(promise.clone()),
                None => None,
            }
        };
        if let Some(promise) = pending {
            // Follower: share the leader's fetch.
            return Ok(self.settle(&url, promise).await);
        }

        let promise = future_to_promise(fetch_document(url.clone()));
        self.slots
            .borrow_mut()
            .insert(url.clone(), Slot::Pending(promise.clone()));
        Ok(self.settle(&url, promise).await)
    }

    /// Drop any cached entry for `url` and fetch it again.
    pub async fn reload(&self, url: &str) -> Result<Option<Document>, BindError> {
        let url = self.resolve_url(url)?;
        {
            let mut slots = self.slots.borrow_mut();
            if matches!(slots.get(&url), Some(Slot::Ready(_))) {
                slots.remove(&url);
            }
        }
        self.document(&url).await
    }

    fn resolve_url(&self, url: &str) -> Result<String, BindError> {
        if url.is_empty() {
            return self
                .last_url
                .borrow()
                .clone()
                .ok_or(BindError::EmptyUrl);
        }
        *self.last_url.borrow_mut() = Some(url.to_owned());
        Ok(url.to_owned())
    }

    /// Await a load promise and record its outcome. Settlement is
    /// idempotent: leader and followers race to update the slot, the first
    /// wake wins, and each outcome is logged once per load, not per waiter.
    async fn settle(&self, url: &str, promise: Promise) -> Option<Document> {
        match JsFuture::from(promise).await {
            Ok(value) => match value.dyn_into::<Document>() {
                Ok(doc) => {
                    let prior = self
                        .slots
                        .borrow_mut()
                        .insert(url.to_owned(), Slot::Ready(doc.clone()));
                    if !matches!(prior, Some(Slot::Ready(_))) {
                        debug!(url, "template cached");
                    }
                    Some(doc)
                }
                Err(_) => {
                    if self.drop_pending(url) {
                        warn!(url, "template load produced a non-document");
                    }
                    None
                }
            },
            Err(err) => {
                if self.drop_pending(url) {
                    warn!(url, error = %js_error_message(&err), "template load failed");
                }
                None
            }
        }
    }

    /// True when this call performed the pending → empty transition.
    fn drop_pending(&self, url: &str) -> bool {
        let mut slots = self.slots.borrow_mut();
        if matches!(slots.get(url), Some(Slot::Pending(_))) {
            slots.remove(url);
            true
        } else {
            false
        }
    }
}

async fn fetch_document(url: String) -> Result<JsValue, JsValue> {
    let body = fetch_body(&url)
        .await
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
    let parser = DomParser::new()?;
    let doc = parser.parse_from_string(&body, SupportedType::TextHtml)?;
    Ok(doc.into())
}

/// Fetch a text resource with the template error posture: failures are
/// logged by the caller and reported as `Err(LoadError)`.
pub async fn fetch_body(url: &str) -> Result<String, LoadError> {
    let window = web_sys::window().ok_or_else(|| LoadError::network("no window object"))?;
    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|err| LoadError::network(js_error_message(&err)))?;
    let response: Response = response
        .dyn_into()
        .map_err(|_| LoadError::network("fetch resolved to a non-Response"))?;
    if !response.ok() {
        return Err(LoadError::Status {
            status: response.status(),
        });
    }
    let text = response
        .text()
        .map_err(|err| LoadError::network(js_error_message(&err)))?;
    let body = JsFuture::from(text)
        .await
        .map_err(|err| LoadError::network(js_error_message(&err)))?;
    Ok(body.as_string().unwrap_or_default())
}
