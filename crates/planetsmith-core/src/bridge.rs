#![forbid(unsafe_code)]

//! Transport negotiation and payload delivery across the foreign boundary.
//!
//! The engine module may expose any subset of an Emscripten-style surface:
//! an allocator (`_malloc`), a UTF-8 byte-length calculator
//! (`lengthBytesUTF8`), a UTF-8 writer (`stringToUTF8`), a deallocator
//! (`_free`), a generic call-by-name invoker (`ccall`), and `_`-prefixed
//! named exports. [`MarshalBridge`] probes that surface **once** at
//! construction and reuses the resolved [`TransportCapability`] for every
//! call.
//!
//! # Pointer transport safety
//!
//! The pointer path allocates on the foreign heap, writes the encoded
//! payload, invokes the entry point, and releases the allocation exactly
//! once on every exit path — success, write failure, or a throwing call.
//! That exactly-once release is the load-bearing invariant here; it is
//! enforced with an RAII guard and exercised by the mock-module tests.
//!
//! A transport failure at runtime falls back to the next transport for
//! that call only; the negotiated capability never downgrades.

use tracing::{debug, warn};

use crate::error::MarshalError;

/// Allocator export name.
pub const EXPORT_ALLOC: &str = "_malloc";
/// Deallocator export name.
pub const EXPORT_FREE: &str = "_free";
/// UTF-8 byte-length calculator export name.
pub const EXPORT_UTF8_LEN: &str = "lengthBytesUTF8";
/// UTF-8 writer export name.
pub const EXPORT_UTF8_WRITE: &str = "stringToUTF8";
/// Generic call-by-name invoker export name.
pub const EXPORT_CALL_BY_NAME: &str = "ccall";

/// Abstraction over the foreign module's exposed entry points.
///
/// The web crate implements this over a JS module object; tests implement
/// it with recording mocks. Implementations never mutate the module —
/// they only invoke what it exposes.
pub trait ForeignModule {
    /// Whether the module exposes a callable entry point with this name.
    fn has_export(&self, name: &str) -> bool;

    /// UTF-8 byte length of `text`, excluding any terminator.
    fn utf8_len(&self, text: &str) -> Result<usize, MarshalError>;

    /// Allocate `len` bytes on the foreign heap. A zero address signals
    /// allocation failure and must not be released.
    fn alloc(&self, len: usize) -> Result<u32, MarshalError>;

    /// Write `text` as NUL-terminated UTF-8 into `addr`, at most
    /// `capacity` bytes including the terminator.
    fn write_utf8(&self, text: &str, addr: u32, capacity: usize) -> Result<(), MarshalError>;

    /// Release a previously allocated address. Must be infallible from the
    /// caller's perspective; failures may only be logged.
    fn release(&self, addr: u32);

    /// Invoke a `_`-prefixed named export with a foreign-heap address.
    fn call_pointer(&self, export: &str, addr: u32) -> Result<(), MarshalError>;

    /// Invoke an entry by name through the generic invoker, passing the
    /// payload directly as a string argument.
    fn call_named(&self, entry: &str, payload: &str) -> Result<(), MarshalError>;
}

/// Transport resolved once per module instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportCapability {
    /// Full allocator/writer surface: encode into foreign memory, call by
    /// address.
    Pointer,
    /// Generic call-by-name invoker only.
    NamedCall,
    /// Neither transport exposed; every delivery is a hard failure.
    Unavailable,
}

impl TransportCapability {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pointer => "pointer",
            Self::NamedCall => "named_call",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Which transport actually carried a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Pointer,
    NamedCall,
}

/// Releases a foreign allocation exactly once, on every exit path.
struct AllocGuard<'a, M: ForeignModule> {
    module: &'a M,
    addr: u32,
}

impl<M: ForeignModule> Drop for AllocGuard<'_, M> {
    fn drop(&mut self) {
        self.module.release(self.addr);
    }
}

/// Negotiated delivery channel into the foreign module.
#[derive(Debug)]
pub struct MarshalBridge<M: ForeignModule> {
    module: M,
    capability: TransportCapability,
}

impl<M: ForeignModule> MarshalBridge<M> {
    /// Probe the module's exports and fix the transport selection.
    pub fn negotiate(module: M) -> Self {
        let capability = probe(&module);
        debug!(capability = capability.as_str(), "marshal transport negotiated");
        Self { module, capability }
    }

    #[must_use]
    pub fn capability(&self) -> TransportCapability {
        self.capability
    }

    #[must_use]
    pub fn module(&self) -> &M {
        &self.module
    }

    /// Deliver an encoded payload to the named entry point.
    ///
    /// Tries the negotiated transport first; a runtime failure on the
    /// pointer path falls back to the named-call path for this call only.
    pub fn send(&self, entry: &str, payload: &str) -> Result<Delivery, MarshalError> {
        match self.capability {
            TransportCapability::Pointer => match self.send_pointer(entry, payload) {
                Ok(()) => Ok(Delivery::Pointer),
                Err(err) if self.module.has_export(EXPORT_CALL_BY_NAME) => {
                    warn!(
                        entry,
                        error = %err,
                        "pointer transport failed, retrying via named call"
                    );
                    self.module.call_named(entry, payload)?;
                    Ok(Delivery::NamedCall)
                }
                Err(err) => Err(err),
            },
            TransportCapability::NamedCall => {
                self.module.call_named(entry, payload)?;
                Ok(Delivery::NamedCall)
            }
            TransportCapability::Unavailable => {
                warn!(entry, "payload dropped: no delivery method");
                Err(MarshalError::NoTransport)
            }
        }
    }

    fn send_pointer(&self, entry: &str, payload: &str) -> Result<(), MarshalError> {
        // One terminator byte past the encoded length.
        let capacity = self.module.utf8_len(payload)? + 1;
        let addr = self.module.alloc(capacity)?;
        if addr == 0 {
            return Err(MarshalError::Allocation { bytes: capacity });
        }
        let _guard = AllocGuard {
            module: &self.module,
            addr,
        };
        self.module.write_utf8(payload, addr, capacity)?;
        self.module.call_pointer(&format!("_{entry}"), addr)
    }
}

fn probe<M: ForeignModule>(module: &M) -> TransportCapability {
    let pointer_exports = [EXPORT_ALLOC, EXPORT_UTF8_LEN, EXPORT_UTF8_WRITE, EXPORT_FREE];
    if pointer_exports.iter().all(|name| module.has_export(name)) {
        TransportCapability::Pointer
    } else if module.has_export(EXPORT_CALL_BY_NAME) {
        TransportCapability::NamedCall
    } else {
        TransportCapability::Unavailable
    }
}
