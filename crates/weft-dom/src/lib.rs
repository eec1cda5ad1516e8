//! Custom-element lifecycle adapter for wasm guest modules.
//!
//! A wasm guest cannot subclass a host element class itself, so this crate
//! does it on the guest's behalf: it generates a host element class whose
//! constructor and lifecycle callbacks forward into guest-supplied hooks,
//! and keeps one opaque per-instance data handle alive exactly as long as
//! the host instance exists.
//!
//! ## Module Structure
//!
//! - `name` - custom-element name validation
//! - `registry` - class generation and registration
//! - `handle` - the per-instance handle side table
//!
//! ## Lifecycle
//!
//! Host construction invokes the guest constructor hook synchronously and
//! stores its return value as the instance handle, before any lifecycle
//! callback can fire. Connected/disconnected may then alternate any number
//! of times, adopted fires on document transfer, and attribute changes are
//! reported only for the names fixed in the definition's observed list.
//! Instance destruction is garbage-collector-driven and deliberately
//! invisible: no hook fires for it, and the handle table is weak so the
//! handle dies with the instance.

mod handle;
mod name;
mod registry;

pub use handle::{inject_handle, instance_handle, HandleError};
pub use name::{ElementName, InvalidElementName};
pub use registry::{
    define_element, AttributeChange, ElementBase, ElementDefinition, LifecycleHooks,
};
