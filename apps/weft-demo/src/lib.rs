//! Demo application for the weft boundary layer.
//!
//! Wires all three boundary primitives together on one page: a custom
//! element whose lifecycle is driven by Rust hooks, a per-instance handle
//! round-tripped through guest memory, and a worker spawned against an
//! embedded guest module that echoes its entry argument into shared
//! memory.

use std::cell::Cell;

use js_sys::{Object, Reflect, Uint8Array, WebAssembly};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

use weft_dom::{define_element, ElementDefinition, ElementName, LifecycleHooks};
use weft_worker::spawn_worker;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

// (module
//   (import "wbg" "memory" (memory 1 1 shared))
//   (func (export "__weft_worker_entry") (param i32)
//     (i32.store (i32.const 0) (local.get 0))))
const ECHO_MODULE: [u8; 75] = [
    0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, //
    0x01, 0x05, 0x01, 0x60, 0x01, 0x7f, 0x00, //
    0x02, 0x10, 0x01, 0x03, 0x77, 0x62, 0x67, 0x06, 0x6d, 0x65, 0x6d, 0x6f, 0x72,
    0x79, 0x02, 0x03, 0x01, 0x01, //
    0x03, 0x02, 0x01, 0x00, //
    0x07, 0x17, 0x01, 0x13, 0x5f, 0x5f, 0x77, 0x65, 0x66, 0x74, 0x5f, 0x77, 0x6f,
    0x72, 0x6b, 0x65, 0x72, 0x5f, 0x65, 0x6e, 0x74, 0x72, 0x79, 0x00, 0x00, //
    0x0a, 0x0b, 0x01, 0x09, 0x00, 0x41, 0x00, 0x20, 0x00, 0x36, 0x02, 0x00, 0x0b, //
];

thread_local! {
    static NEXT_ORDINAL: Cell<u32> = const { Cell::new(1) };
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    register_counter_element()?;

    log("[weft-demo] ready");
    Ok(())
}

/// Register `<demo-counter>`: each instance gets an ordinal stamped into
/// its handle at construction, renders it when connected, and re-renders
/// when its observed `label` attribute changes.
fn register_counter_element() -> Result<(), JsValue> {
    let hooks = LifecycleHooks::new(|_element| {
        let ordinal = NEXT_ORDINAL.with(|next| {
            let ordinal = next.get();
            next.set(ordinal + 1);
            ordinal
        });

        Uint8Array::from(&ordinal.to_le_bytes()[..]).into()
    })
    .connected(|element| {
        let ordinal = counter_ordinal(element).unwrap_or(0);
        element.set_text_content(Some(&format!("counter #{ordinal}")));
    })
    .attribute_changed(|element, change| {
        if let Some(label) = change.new_value {
            let ordinal = counter_ordinal(element).unwrap_or(0);
            element.set_text_content(Some(&format!("{label} (counter #{ordinal})")));
        }
    });

    define_element(
        ElementDefinition::new(ElementName::parse("demo-counter").unwrap(), hooks)
            .observed_attributes(["label"]),
    )
}

/// Read a counter's ordinal back out of its handle by injecting the
/// handle bytes into a guest-side staging buffer.
#[wasm_bindgen]
pub fn counter_ordinal(element: &HtmlElement) -> Option<u32> {
    let mut staging = [0u8; 4];
    let offset = staging.as_mut_ptr() as u32;

    weft_dom::inject_handle(element, &weft_bridge::guest_memory(), offset).ok()?;

    Some(u32::from_le_bytes(staging))
}

/// Spawn the embedded echo module in a worker and log once it has written
/// `value` into the shared memory.
#[wasm_bindgen]
pub fn spawn_echo_worker(value: u32) -> Result<(), JsValue> {
    let module = WebAssembly::Module::new(&Uint8Array::from(&ECHO_MODULE[..]))?;
    let memory = shared_memory(1)?;

    let spawned = spawn_worker(&module, &memory, value)
        .map_err(|err| JsValue::from_str(&err.to_string()))?;

    wasm_bindgen_futures::spawn_local(async move {
        for _ in 0..500 {
            let echoed = entry_cell(&memory);
            if echoed == value as i32 {
                log(&format!("[weft-demo] worker echoed {echoed}"));
                spawned.terminate();
                return;
            }
            sleep(10).await;
        }

        log("[weft-demo] worker never echoed; leaving it running");
    });

    Ok(())
}

fn shared_memory(pages: u32) -> Result<WebAssembly::Memory, JsValue> {
    let descriptor = Object::new();
    Reflect::set(&descriptor, &"initial".into(), &pages.into())?;
    Reflect::set(&descriptor, &"maximum".into(), &pages.into())?;
    Reflect::set(&descriptor, &"shared".into(), &JsValue::TRUE)?;

    WebAssembly::Memory::new(&descriptor)
}

fn entry_cell(memory: &WebAssembly::Memory) -> i32 {
    let mut bytes = [0u8; 4];
    Uint8Array::new(&memory.buffer())
        .subarray(0, 4)
        .copy_to(&mut bytes);
    i32::from_le_bytes(bytes)
}

async fn sleep(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let global = js_sys::global();
        let set_timeout: js_sys::Function = Reflect::get(&global, &"setTimeout".into())
            .unwrap_throw()
            .unchecked_into();
        set_timeout
            .call2(&global, &resolve, &JsValue::from(ms))
            .unwrap_throw();
    });

    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}
