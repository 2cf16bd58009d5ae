#![forbid(unsafe_code)]

//! Browser interface layer for Planetsmith.
//!
//! This crate is the bridge between a declaratively-described HTML form and
//! the compiled engine module hosted on the page: it fetches and caches the
//! template fragment, binds the form schema to live DOM controls, negotiates
//! a marshal transport into the engine, and debounces edits into live
//! preview calls. The engine itself (rendering, physics) and the template's
//! HTML/CSS are external collaborators.
//!
//! All browser-coupled modules are compiled for `wasm32` only; the native
//! build exposes just the re-exported core types so hosts and tests can
//! share the schema.

pub use planetsmith_core as core;
pub use planetsmith_core::{
    DefaultContext, FieldDescriptor, FormSchema, Transform, TransportCapability, UiKind,
};

#[cfg(target_arch = "wasm32")]
pub mod binder;
#[cfg(target_arch = "wasm32")]
pub mod controller;
#[cfg(target_arch = "wasm32")]
pub mod engine;
#[cfg(target_arch = "wasm32")]
pub mod preview;
#[cfg(target_arch = "wasm32")]
pub mod template;

#[cfg(target_arch = "wasm32")]
pub use controller::PlanetCreator;
