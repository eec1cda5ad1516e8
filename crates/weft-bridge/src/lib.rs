//! Byte transfer across the wasm linear-memory boundary.
//!
//! A guest module cannot hand the host anything but integers, so host-side
//! code that needs guest bytes works with (offset, length) windows into the
//! guest's `WebAssembly.Memory`. The guest may grow its memory at any time,
//! which detaches the old backing buffer, so no view is ever cached here:
//! every operation re-resolves a fresh view over the memory's current
//! buffer and either copies out into an independent buffer or copies in and
//! returns.
//!
//! Bounds are the caller's contract. An out-of-range (offset, length) pair
//! surfaces as the runtime's own range error and is not caught or recovered
//! at this layer.

use js_sys::{Uint8Array, WebAssembly};
use wasm_bindgen::JsCast;

/// The linear memory of the currently executing wasm module.
pub fn guest_memory() -> WebAssembly::Memory {
    wasm_bindgen::memory().unchecked_into()
}

/// Copy `len` bytes starting at `offset` out of `memory`.
///
/// The returned array owns its own backing buffer: later guest writes or
/// memory growth cannot change it.
pub fn extract(memory: &WebAssembly::Memory, offset: u32, len: u32) -> Uint8Array {
    let view = Uint8Array::new_with_byte_offset_and_length(&memory.buffer(), offset, len);

    // Constructing from a view copies into a fresh non-view array.
    Uint8Array::new(&view)
}

/// Like [`extract`], but copies into a Rust-owned `Vec<u8>`.
pub fn extract_vec(memory: &WebAssembly::Memory, offset: u32, len: u32) -> Vec<u8> {
    Uint8Array::new_with_byte_offset_and_length(&memory.buffer(), offset, len).to_vec()
}

/// Copy `source` byte-for-byte into `memory` starting at `offset`.
///
/// The destination range must already be reserved by the guest; this
/// performs no allocation on the guest side and no bounds negotiation.
pub fn inject(memory: &WebAssembly::Memory, offset: u32, source: &Uint8Array) {
    let store = Uint8Array::new(&memory.buffer());

    store.set(source, offset);
}

/// Like [`inject`], but sources the bytes from a Rust slice.
pub fn inject_slice(memory: &WebAssembly::Memory, offset: u32, bytes: &[u8]) {
    let dest = Uint8Array::new_with_byte_offset_and_length(
        &memory.buffer(),
        offset,
        bytes.len() as u32,
    );

    dest.copy_from(bytes);
}
