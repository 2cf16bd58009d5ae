#![cfg(target_arch = "wasm32")]

//! Browser-side binding tests: synthetic form fragments, real DOM reads.

use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;
use web_sys::{Document, Element, HtmlInputElement, HtmlSelectElement};

use planetsmith_core::config::GeneratorOptions;
use planetsmith_core::error::BindError;
use planetsmith_core::planet::{
    planet_range_bindings, planet_schema, planet_select_bindings,
};
use planetsmith_web::binder::FormBinder;
use planetsmith_web::preview::PreviewSync;
use planetsmith_web::template::TemplateCache;

wasm_bindgen_test_configure!(run_in_browser);

const FORM_MARKUP: &str = r##"
  <input id="planet-name" type="text">
  <select id="planet-shape">
    <option value="SPHERE">Sphere</option>
    <option value="CUBE">Cube</option>
  </select>
  <input id="planet-size" type="range" min="10" max="1000" value="550">
  <span id="size-value"></span>
  <input id="planet-color" type="color" value="#ff8033">
  <select id="planet-position">
    <option value="1">First</option>
    <option value="2">Second</option>
  </select>
  <select id="rotation-axis">
    <option value="X">X</option>
    <option value="Y">Y</option>
  </select>
  <input id="self-rotation" type="range" min="0" max="5000" value="1500">
  <span id="self-rotation-value"></span>
  <input id="orbit-speed" type="range" min="0" max="5000" value="250">
  <span id="orbit-speed-value"></span>
  <button id="create-planet-btn">Create</button>
"##;

const OPTIONS_JSON: &str = r#"{
  "shapes": [
    {"id": "SPHERE", "name": "Sphere"},
    {"id": "CUBE", "name": "Cube"}
  ],
  "rotationAxes": [
    {"id": "X", "name": "X axis"},
    {"id": "Y", "name": "Y axis"}
  ],
  "orbitPositions": [
    {"id": 1, "name": "First orbit"},
    {"id": 2, "name": "Second orbit"}
  ],
  "sizeRange": {"min": 10, "max": 1000, "step": 1, "default": 550},
  "rotationSpeedRange": {"min": 0, "max": 5000, "step": 10, "default": 1000},
  "orbitSpeedRange": {"min": 0, "max": 5000, "step": 10, "default": 500}
}"#;

fn document() -> Document {
    web_sys::window().and_then(|w| w.document()).unwrap()
}

fn mount_form(markup: &str) -> Element {
    let container = document().create_element("div").unwrap();
    container.set_id("planet-creator-modal");
    container.set_inner_html(markup);
    container
}

fn binder_for(markup: &str) -> FormBinder {
    FormBinder::new(planet_schema().unwrap(), mount_form(markup))
}

fn set_input(container: &Element, id: &str, value: &str) {
    container
        .query_selector(&format!("#{id}"))
        .unwrap()
        .unwrap()
        .dyn_into::<HtmlInputElement>()
        .unwrap()
        .set_value(value);
}

fn set_select(container: &Element, id: &str, value: &str) {
    container
        .query_selector(&format!("#{id}"))
        .unwrap()
        .unwrap()
        .dyn_into::<HtmlSelectElement>()
        .unwrap()
        .set_value(value);
}

fn num(payload: &serde_json::Map<String, serde_json::Value>, key: &str) -> f64 {
    payload[key].as_f64().unwrap()
}

#[wasm_bindgen_test]
fn payload_reads_typed_and_scaled_values() {
    let container = mount_form(FORM_MARKUP);
    set_input(&container, "planet-name", "Kepler-442b");
    set_select(&container, "planet-shape", "CUBE");
    set_input(&container, "planet-size", "550");
    set_input(&container, "planet-color", "#ff8033");
    set_select(&container, "planet-position", "2");
    set_select(&container, "rotation-axis", "Y");
    set_input(&container, "self-rotation", "1500");
    set_input(&container, "orbit-speed", "250");

    let binder = FormBinder::new(planet_schema().unwrap(), container);
    let payload = binder.payload(None);

    assert_eq!(payload["name"], "Kepler-442b");
    assert_eq!(payload["shape"], "CUBE");
    assert_eq!(num(&payload, "size"), 5.5);
    assert_eq!(num(&payload, "position"), 2.0);
    assert_eq!(payload["rotationDir"], "Y");
    assert_eq!(num(&payload, "rotationSpeedItself"), 1.5);
    assert_eq!(num(&payload, "rotationSpeedCenter"), 0.25);

    let color = payload["color"].as_object().unwrap();
    assert_eq!(color["r"].as_f64().unwrap(), 1.0);
    assert!((color["g"].as_f64().unwrap() - 0x80 as f64 / 255.0).abs() < 1e-9);
    assert_eq!(color["b"].as_f64().unwrap(), 0.2);
}

#[wasm_bindgen_test]
fn empty_name_gets_a_stamped_default() {
    let binder = binder_for(FORM_MARKUP);
    let payload = binder.payload(None);
    let name = payload["name"].as_str().unwrap();
    assert!(name.starts_with("Planet "), "got {name}");
}

#[wasm_bindgen_test]
fn zero_range_falls_back_to_the_options_default() {
    let options: GeneratorOptions = serde_json::from_str(OPTIONS_JSON).unwrap();
    let container = mount_form(FORM_MARKUP);
    set_input(&container, "planet-size", "0");

    let binder = FormBinder::new(planet_schema().unwrap(), container);
    let payload = binder.payload(Some(&options));
    assert_eq!(num(&payload, "size"), 5.5);
}

#[wasm_bindgen_test]
fn missing_control_yields_the_field_default() {
    let markup =
        FORM_MARKUP.replace(r##"<input id="planet-color" type="color" value="#ff8033">"##, "");
    let binder = binder_for(&markup);
    let payload = binder.payload(None);

    // Default gray #808080.
    let color = payload["color"].as_object().unwrap();
    let gray = 0x80 as f64 / 255.0;
    assert!((color["r"].as_f64().unwrap() - gray).abs() < 1e-9);
    assert!((color["g"].as_f64().unwrap() - gray).abs() < 1e-9);
}

#[wasm_bindgen_test]
fn populate_selects_rebuilds_options_and_preselects() {
    let options: GeneratorOptions = serde_json::from_str(OPTIONS_JSON).unwrap();
    let container = mount_form(FORM_MARKUP);
    let binder = FormBinder::new(planet_schema().unwrap(), container.clone());

    binder.populate_selects(&options, &planet_select_bindings());

    let axis = container
        .query_selector("#rotation-axis")
        .unwrap()
        .unwrap()
        .dyn_into::<HtmlSelectElement>()
        .unwrap();
    assert_eq!(axis.length(), 2);
    assert_eq!(axis.value(), "Y");

    let position = container
        .query_selector("#planet-position")
        .unwrap()
        .unwrap()
        .dyn_into::<HtmlSelectElement>()
        .unwrap();
    // Numeric ids become string control values.
    assert_eq!(position.value(), "1");
}

#[wasm_bindgen_test]
fn populate_ranges_applies_bounds_and_labels() {
    let options: GeneratorOptions = serde_json::from_str(OPTIONS_JSON).unwrap();
    let container = mount_form(FORM_MARKUP);
    let binder = FormBinder::new(planet_schema().unwrap(), container.clone());

    binder.populate_ranges(&options, &planet_range_bindings());

    let slider = container
        .query_selector("#planet-size")
        .unwrap()
        .unwrap()
        .dyn_into::<HtmlInputElement>()
        .unwrap();
    assert_eq!(slider.min(), "10");
    assert_eq!(slider.max(), "1000");
    assert_eq!(slider.value(), "550");

    let label = container.query_selector("#size-value").unwrap().unwrap();
    assert_eq!(label.text_content().unwrap(), "550.00");

    // Rotation labels carry three decimal places.
    let spin_label = container
        .query_selector("#self-rotation-value")
        .unwrap()
        .unwrap();
    assert_eq!(spin_label.text_content().unwrap(), "1000.000");
}

#[wasm_bindgen_test]
async fn preview_burst_fires_once_with_trailing_edge() {
    let fired = Rc::new(Cell::new(0u32));
    let preview = PreviewSync::new(20, {
        let fired = Rc::clone(&fired);
        Rc::new(move || fired.set(fired.get() + 1))
    });

    preview.schedule();
    preview.schedule();
    preview.schedule();
    assert!(preview.is_pending());

    sleep(100).await;
    assert_eq!(fired.get(), 1);
    assert!(!preview.is_pending());
}

#[wasm_bindgen_test]
async fn cancelled_preview_never_fires() {
    let fired = Rc::new(Cell::new(0u32));
    let preview = PreviewSync::new(20, {
        let fired = Rc::clone(&fired);
        Rc::new(move || fired.set(fired.get() + 1))
    });

    preview.schedule();
    preview.cancel();
    sleep(100).await;
    assert_eq!(fired.get(), 0);
}

#[wasm_bindgen_test]
async fn dropped_preview_clears_its_pending_timer() {
    let fired = Rc::new(Cell::new(0u32));
    {
        let preview = PreviewSync::new(20, {
            let fired = Rc::clone(&fired);
            Rc::new(move || fired.set(fired.get() + 1))
        });
        preview.schedule();
        // Dropped with the timer still pending, as on form re-init.
    }
    sleep(100).await;
    assert_eq!(fired.get(), 0);
}

/// Replaces `window.fetch` with a counting stand-in for the duration of a
/// test, restoring the real one on drop.
struct FetchStub {
    calls: Rc<Cell<u32>>,
    original: JsValue,
    _handler: Closure<dyn FnMut(JsValue) -> js_sys::Promise>,
}

impl FetchStub {
    fn new(body: Option<&'static str>) -> Self {
        let calls = Rc::new(Cell::new(0u32));
        let handler = {
            let calls = Rc::clone(&calls);
            Closure::wrap(Box::new(move |_url: JsValue| {
                calls.set(calls.get() + 1);
                match body {
                    Some(text) => match web_sys::Response::new_with_opt_str(Some(text)) {
                        Ok(response) => js_sys::Promise::resolve(&response),
                        Err(err) => js_sys::Promise::reject(&err),
                    },
                    None => js_sys::Promise::reject(&JsValue::from_str("network down")),
                }
            }) as Box<dyn FnMut(JsValue) -> js_sys::Promise>)
        };
        let window = web_sys::window().unwrap();
        let original = js_sys::Reflect::get(&window, &JsValue::from_str("fetch")).unwrap();
        js_sys::Reflect::set(&window, &JsValue::from_str("fetch"), handler.as_ref()).unwrap();
        Self {
            calls,
            original,
            _handler: handler,
        }
    }

    fn serve(body: &'static str) -> Self {
        Self::new(Some(body))
    }

    fn failing() -> Self {
        Self::new(None)
    }

    fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl Drop for FetchStub {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            let _ = js_sys::Reflect::set(&window, &JsValue::from_str("fetch"), &self.original);
        }
    }
}

fn shared_document(cache: &Rc<TemplateCache>, url: &'static str) -> js_sys::Promise {
    let cache = Rc::clone(cache);
    wasm_bindgen_futures::future_to_promise(async move {
        let doc = cache
            .document(url)
            .await
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        Ok(JsValue::from_bool(doc.is_some()))
    })
}

#[wasm_bindgen_test]
async fn cached_template_is_fetched_once() {
    let stub = FetchStub::serve(r#"<div id="cached-marker">x</div>"#);
    let cache = TemplateCache::new();

    let first = cache.document("./stub-once.html").await.unwrap().unwrap();
    let second = cache.document("./stub-once.html").await.unwrap().unwrap();

    assert_eq!(stub.calls(), 1);
    // Same cached document object, not a re-parse.
    assert_eq!(JsValue::from(first), JsValue::from(second));
}

#[wasm_bindgen_test]
async fn concurrent_requests_share_one_fetch() {
    let stub = FetchStub::serve("<p>shared</p>");
    let cache = Rc::new(TemplateCache::new());

    let joined = js_sys::Promise::all(&js_sys::Array::of2(
        &shared_document(&cache, "./stub-shared.html"),
        &shared_document(&cache, "./stub-shared.html"),
    ));
    let results = js_sys::Array::from(&JsFuture::from(joined).await.unwrap());

    assert!(results.iter().all(|loaded| loaded.as_bool() == Some(true)));
    assert_eq!(stub.calls(), 1);
}

#[wasm_bindgen_test]
async fn reload_drops_the_cache_and_refetches() {
    let stub = FetchStub::serve("<p>fresh</p>");
    let cache = TemplateCache::new();

    assert!(cache.document("./stub-reload.html").await.unwrap().is_some());
    assert_eq!(stub.calls(), 1);

    assert!(cache.reload("./stub-reload.html").await.unwrap().is_some());
    assert_eq!(stub.calls(), 2);
}

#[wasm_bindgen_test]
async fn failed_concurrent_load_settles_all_waiters_and_clears_the_slot() {
    let cache = Rc::new(TemplateCache::new());
    {
        let stub = FetchStub::failing();
        let joined = js_sys::Promise::all(&js_sys::Array::of2(
            &shared_document(&cache, "./stub-flaky.html"),
            &shared_document(&cache, "./stub-flaky.html"),
        ));
        let results = js_sys::Array::from(&JsFuture::from(joined).await.unwrap());
        assert!(results.iter().all(|loaded| loaded.as_bool() == Some(false)));
        assert_eq!(stub.calls(), 1);
    }

    // The failed slot is gone: the next request fetches again and succeeds.
    let stub = FetchStub::serve("<p>recovered</p>");
    assert!(cache.document("./stub-flaky.html").await.unwrap().is_some());
    assert_eq!(stub.calls(), 1);
}

#[wasm_bindgen_test]
async fn template_cache_recovers_missing_resources_as_none() {
    let cache = TemplateCache::new();
    let loaded = cache.document("./no-such-template.html").await.unwrap();
    assert!(loaded.is_none());
}

#[wasm_bindgen_test]
async fn empty_url_without_history_is_a_configuration_error() {
    let cache = TemplateCache::new();
    match cache.document("").await {
        Err(BindError::EmptyUrl) => {}
        other => panic!("expected EmptyUrl, got {other:?}"),
    }
}

async fn sleep(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _| {
        web_sys::window()
            .unwrap()
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            .unwrap();
    });
    let _ = JsFuture::from(promise).await;
}
