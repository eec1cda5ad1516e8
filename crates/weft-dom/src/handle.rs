//! Per-instance guest data handles.
//!
//! Each adapted element instance owns exactly one opaque handle, produced
//! by the guest constructor hook before any lifecycle callback can fire.
//! The association lives in a `WeakMap` keyed by the element, so the
//! handle becomes collectable at the same moment the host instance does.
//! No destruction callback exists or is needed.

use std::error::Error;
use std::fmt;

use js_sys::{Uint8Array, WeakMap, WebAssembly};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::HtmlElement;

thread_local! {
    static HANDLES: WeakMap = WeakMap::new();
}

/// Record `handle` for `element`. Called exactly once per instance, from
/// the generated class constructor.
pub(crate) fn assign(element: &HtmlElement, handle: &JsValue) {
    HANDLES.with(|table| {
        table.set(element.as_ref(), handle);
    });
}

/// The handle stored for `element`, or `None` if the element was not
/// constructed through this adapter.
pub fn instance_handle(element: &HtmlElement) -> Option<JsValue> {
    HANDLES.with(|table| {
        if table.has(element.as_ref()) {
            Some(table.get(element.as_ref()))
        } else {
            None
        }
    })
}

/// Copy the bytes of `element`'s stored handle into guest memory at
/// `offset`, leaving the handle reference itself in place.
///
/// This is the only mutation path touching a stored handle; it requires
/// the guest constructor hook to have produced a byte buffer. The
/// destination range must be reserved by the guest beforehand.
pub fn inject_handle(
    element: &HtmlElement,
    memory: &WebAssembly::Memory,
    offset: u32,
) -> Result<(), HandleError> {
    let handle = instance_handle(element).ok_or(HandleError::Unmanaged)?;

    let bytes: &Uint8Array = handle.dyn_ref().ok_or(HandleError::NotBytes)?;

    weft_bridge::inject(memory, offset, bytes);

    Ok(())
}

/// Why a handle operation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleError {
    /// The element was not constructed through this adapter
    Unmanaged,
    /// The stored handle is not a byte buffer
    NotBytes,
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleError::Unmanaged => write!(f, "element has no adapter-managed handle"),
            HandleError::NotBytes => write!(f, "stored handle is not a byte buffer"),
        }
    }
}

impl Error for HandleError {}
