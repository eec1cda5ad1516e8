//! Browser tests for the worker bootstrap handshake.
//!
//! The handshake needs memory that can cross the context boundary, which
//! browsers only allow on cross-origin-isolated pages; the tests that post
//! shared memory bail out early when the test page is not isolated.
//!
//! The guest under test is a hand-assembled module that imports its memory
//! as `wbg.memory` and exports an entry function writing its argument to
//! address 0, so the spawning side can observe the invocation through the
//! shared buffer.

#![cfg(target_arch = "wasm32")]

use std::cell::Cell;
use std::rc::Rc;

use js_sys::{Object, Reflect, Uint8Array, WebAssembly};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::*;

use weft_worker::{spawn_worker, SpawnError};

wasm_bindgen_test_configure!(run_in_browser);

// (module
//   (import "wbg" "memory" (memory 1 1 shared))
//   (func (export "__weft_worker_entry") (param i32)
//     (i32.store (i32.const 0) (local.get 0))))
const ECHO_MODULE: [u8; 75] = [
    0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, // magic + version
    0x01, 0x05, 0x01, 0x60, 0x01, 0x7f, 0x00, // type: (i32) -> ()
    0x02, 0x10, 0x01, 0x03, 0x77, 0x62, 0x67, 0x06, 0x6d, 0x65, 0x6d, 0x6f, 0x72,
    0x79, 0x02, 0x03, 0x01, 0x01, // import: "wbg" "memory", shared 1..1
    0x03, 0x02, 0x01, 0x00, // function: type 0
    0x07, 0x17, 0x01, 0x13, 0x5f, 0x5f, 0x77, 0x65, 0x66, 0x74, 0x5f, 0x77, 0x6f,
    0x72, 0x6b, 0x65, 0x72, 0x5f, 0x65, 0x6e, 0x74, 0x72, 0x79, 0x00,
    0x00, // export: "__weft_worker_entry" func 0
    0x0a, 0x0b, 0x01, 0x09, 0x00, 0x41, 0x00, 0x20, 0x00, 0x36, 0x02, 0x00,
    0x0b, // code: i32.store at 0
];

// Same module, but importing its memory from "env" instead of "wbg", so
// the bootstrap's import object cannot satisfy it and instantiation fails.
const UNLINKABLE_MODULE: [u8; 75] = [
    0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, //
    0x01, 0x05, 0x01, 0x60, 0x01, 0x7f, 0x00, //
    0x02, 0x10, 0x01, 0x03, 0x65, 0x6e, 0x76, 0x06, 0x6d, 0x65, 0x6d, 0x6f, 0x72,
    0x79, 0x02, 0x03, 0x01, 0x01, // import: "env" "memory"
    0x03, 0x02, 0x01, 0x00, //
    0x07, 0x17, 0x01, 0x13, 0x5f, 0x5f, 0x77, 0x65, 0x66, 0x74, 0x5f, 0x77, 0x6f,
    0x72, 0x6b, 0x65, 0x72, 0x5f, 0x65, 0x6e, 0x74, 0x72, 0x79, 0x00, 0x00, //
    0x0a, 0x0b, 0x01, 0x09, 0x00, 0x41, 0x00, 0x20, 0x00, 0x36, 0x02, 0x00, 0x0b, //
];

fn cross_origin_isolated() -> bool {
    Reflect::get(&js_sys::global(), &"crossOriginIsolated".into())
        .map(|v| v.as_bool().unwrap_or(false))
        .unwrap_or(false)
}

fn compile(bytes: &[u8]) -> WebAssembly::Module {
    let array = Uint8Array::from(bytes);
    WebAssembly::Module::new(&array).unwrap()
}

fn shared_memory() -> WebAssembly::Memory {
    let descriptor = Object::new();
    Reflect::set(&descriptor, &"initial".into(), &1.into()).unwrap();
    Reflect::set(&descriptor, &"maximum".into(), &1.into()).unwrap();
    Reflect::set(&descriptor, &"shared".into(), &JsValue::TRUE).unwrap();
    WebAssembly::Memory::new(&descriptor).unwrap()
}

fn plain_memory() -> WebAssembly::Memory {
    let descriptor = Object::new();
    Reflect::set(&descriptor, &"initial".into(), &1.into()).unwrap();
    WebAssembly::Memory::new(&descriptor).unwrap()
}

/// The i32 the guest entry writes at address 0, read through the shared
/// buffer.
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
            .unwrap()
            .unchecked_into();
        set_timeout
            .call2(&global, &resolve, &JsValue::from(ms))
            .unwrap();
    });

    wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .unwrap();
}

async fn wait_for_entry_cell(memory: &WebAssembly::Memory, expected: i32) {
    for _ in 0..500 {
        if entry_cell(memory) == expected {
            return;
        }
        sleep(10).await;
    }

    panic!("worker entry never wrote {expected}");
}

#[wasm_bindgen_test]
async fn bootstrap_invokes_entry_exactly_once() {
    if !cross_origin_isolated() {
        return;
    }

    let module = compile(&ECHO_MODULE);
    let memory = shared_memory();

    let spawned = spawn_worker(&module, &memory, 42).unwrap();

    wait_for_entry_cell(&memory, 42).await;

    // A second message must not re-run bootstrap; if it did, its pointer
    // would show up at the entry cell.
    let request = Object::new();
    Reflect::set(&request, &"module".into(), &module).unwrap();
    Reflect::set(&request, &"memory".into(), &memory).unwrap();
    Reflect::set(&request, &"pointer".into(), &JsValue::from(99u32)).unwrap();
    spawned.as_ref().post_message(&request).unwrap();

    sleep(200).await;
    assert_eq!(entry_cell(&memory), 42);

    spawned.terminate();
}

#[wasm_bindgen_test]
async fn failed_instantiation_reaches_error_channel_without_entry() {
    if !cross_origin_isolated() {
        return;
    }

    let module = compile(&UNLINKABLE_MODULE);
    let memory = shared_memory();

    let spawned = spawn_worker(&module, &memory, 7).unwrap();

    let errors = Rc::new(Cell::new(0u32));
    let errors_in_handler = errors.clone();
    let onerror = Closure::wrap(Box::new(move |event: web_sys::ErrorEvent| {
        event.prevent_default();
        errors_in_handler.set(errors_in_handler.get() + 1);
    }) as Box<dyn FnMut(web_sys::ErrorEvent)>);
    spawned
        .as_ref()
        .set_onerror(Some(onerror.as_ref().unchecked_ref()));

    sleep(500).await;

    assert_eq!(errors.get(), 1);
    assert_eq!(entry_cell(&memory), 0);

    spawned.terminate();
}

#[wasm_bindgen_test]
fn non_shared_memory_cannot_cross_the_boundary() {
    let module = compile(&ECHO_MODULE);
    let memory = plain_memory();

    assert_eq!(
        spawn_worker(&module, &memory, 1).unwrap_err(),
        SpawnError::PostMessage
    );
}
