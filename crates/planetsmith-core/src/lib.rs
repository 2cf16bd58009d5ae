#![forbid(unsafe_code)]

//! DOM-free core of the Planetsmith interface layer.
//!
//! Everything here is deterministic and testable without a browser: the
//! declarative field schema and its value-or-default payload policy
//! ([`schema`]), hex-color decomposition ([`color`]), the generator
//! options resource ([`config`]), transport negotiation over the
//! [`bridge::ForeignModule`] seam ([`bridge`]), the preview debounce gate
//! ([`debounce`]), and the concrete planet form tables ([`planet`]).
//!
//! The companion `planetsmith-web` crate supplies the DOM reader, the JS
//! module adapter, and the timers.

pub mod bridge;
pub mod color;
pub mod config;
pub mod debounce;
pub mod error;
pub mod planet;
pub mod schema;

pub use bridge::{Delivery, ForeignModule, MarshalBridge, TransportCapability};
pub use error::{BindError, InitError, LoadError, MarshalError};
pub use schema::{DefaultContext, FieldDescriptor, FormSchema, Transform, UiKind};
