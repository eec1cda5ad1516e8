//! One-shot worker bootstrap handshake.
//!
//! A wasm guest cannot create an execution context by itself, so this
//! crate does the whole dance on its behalf: create a Web Worker from an
//! inline bootstrap script, post it the compiled module, the shared
//! memory, and one pointer-sized argument, and have the worker instantiate
//! the module and call its entry export with that argument exactly once.
//!
//! The bootstrap script installs its message listener as its very first
//! action and removes it again before any async work begins, so a
//! duplicate or late message, whether from guest or user code, can never
//! re-enter bootstrap. Instantiation or entry failures are logged,
//! rescheduled onto the worker's top-level error channel, and re-thrown to
//! keep the bootstrap promise chain rejected.

use js_sys::{Array, Object, Reflect, WebAssembly};
use wasm_bindgen::prelude::*;
use web_sys::{Blob, BlobPropertyBag, Url, Worker};

use std::error::Error;
use std::fmt;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

/// The export the bootstrap invokes once instantiation completes.
///
/// Guest modules participate by exporting a function of this name taking a
/// single `i32`/pointer argument (`#[no_mangle] pub extern "C" fn
/// __weft_worker_entry(arg: u32)` on the Rust side).
pub const WORKER_ENTRY_EXPORT: &str = "__weft_worker_entry";

// The worker-side half of the handshake. The listener is registered
// before anything else and deregistered before the first await point;
// between those two lines, nothing yields, so exactly one message can ever
// reach the instantiate path.
const BOOTSTRAP_SCRIPT: &str = r#"
let initialized = false;

let initialize = function (messageEvent) {
    if (initialized) {
        return;
    }
    initialized = true;

    // One-shot: drop the listener before any async work, so no later
    // message can ever be mistaken for a second bootstrap request.
    removeEventListener("message", initialize);

    let { module, memory, pointer } = messageEvent.data;

    WebAssembly.instantiate(module, { wbg: { memory } }).then(function (instance) {
        instance.exports.__weft_worker_entry(pointer);
    }).catch(function (err) {
        console.log(err);

        // Surface on the worker's top-level error channel:
        setTimeout(function () { throw err; });

        // Rethrow to keep the bootstrap chain rejected:
        throw err;
    });
};

addEventListener("message", initialize);
"#;

/// A worker that has been sent its bootstrap request.
///
/// Dropping the handle does not terminate the worker; termination is an
/// explicit, irreversible operation.
#[derive(Clone, Debug)]
pub struct SpawnedWorker {
    inner: Worker,
}

impl SpawnedWorker {
    pub fn terminate(&self) {
        self.inner.terminate()
    }
}

impl AsRef<Worker> for SpawnedWorker {
    fn as_ref(&self) -> &Worker {
        &self.inner
    }
}

impl From<SpawnedWorker> for Worker {
    fn from(spawned: SpawnedWorker) -> Worker {
        spawned.inner
    }
}

/// Why a spawn attempt failed on the caller side.
///
/// Worker-side failures (instantiation, entry invocation) never surface
/// here; they arrive on the worker's error channel instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnError {
    /// The bootstrap blob or its object URL could not be created
    ScriptProvision,
    /// The Worker constructor rejected the bootstrap script
    WorkerCreate,
    /// The spawn request object could not be assembled
    RequestBuild,
    /// The spawn request could not be posted (e.g. non-shareable memory)
    PostMessage,
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::ScriptProvision => write!(f, "failed to provision bootstrap script"),
            SpawnError::WorkerCreate => write!(f, "failed to create worker"),
            SpawnError::RequestBuild => write!(f, "failed to assemble spawn request"),
            SpawnError::PostMessage => write!(f, "failed to post spawn request"),
        }
    }
}

impl Error for SpawnError {}

/// Spawn a worker and run `module` in it.
///
/// Posts one `{module, memory, pointer}` request; on receipt the worker
/// instantiates `module` against `memory` (import object
/// `{ wbg: { memory } }`, so the module's only host import must be its
/// memory) and calls [`WORKER_ENTRY_EXPORT`] with `entry_arg`. The memory
/// must be shared to cross the context boundary.
///
/// Returns as soon as the request is posted; the instantiation itself is
/// asynchronous inside the worker and its failures surface on the
/// worker's error channel, not here.
pub fn spawn_worker(
    module: &WebAssembly::Module,
    memory: &WebAssembly::Memory,
    entry_arg: u32,
) -> Result<SpawnedWorker, SpawnError> {
    let url = match bootstrap_url() {
        Ok(url) => url,
        Err(err) => {
            log(&format!(
                "[weft-worker] failed to provision bootstrap script: {err:?}"
            ));
            return Err(SpawnError::ScriptProvision);
        }
    };

    let worker = match Worker::new(&url) {
        Ok(worker) => worker,
        Err(err) => {
            log(&format!("[weft-worker] failed to create Worker: {err:?}"));
            return Err(SpawnError::WorkerCreate);
        }
    };

    let request = match spawn_request(module, memory, entry_arg) {
        Ok(request) => request,
        Err(err) => {
            log(&format!(
                "[weft-worker] failed to assemble spawn request: {err:?}"
            ));
            worker.terminate();
            return Err(SpawnError::RequestBuild);
        }
    };

    if let Err(err) = worker.post_message(&request) {
        log(&format!(
            "[weft-worker] failed to post spawn request: {err:?}"
        ));
        worker.terminate();
        return Err(SpawnError::PostMessage);
    }

    Ok(SpawnedWorker { inner: worker })
}

/// Provision the bootstrap script as a same-origin object URL.
fn bootstrap_url() -> Result<String, JsValue> {
    let parts = Array::of1(&JsValue::from_str(BOOTSTRAP_SCRIPT));

    let options = BlobPropertyBag::new();
    options.set_type("application/javascript");

    let blob = Blob::new_with_str_sequence_and_options(&parts, &options)?;

    Url::create_object_url_with_blob(&blob)
}

/// The one-shot request payload: exactly `{module, memory, pointer}`.
fn spawn_request(
    module: &WebAssembly::Module,
    memory: &WebAssembly::Memory,
    pointer: u32,
) -> Result<Object, JsValue> {
    let request = Object::new();

    Reflect::set(&request, &"module".into(), module)?;
    Reflect::set(&request, &"memory".into(), memory)?;
    Reflect::set(&request, &"pointer".into(), &JsValue::from(pointer))?;

    Ok(request)
}
