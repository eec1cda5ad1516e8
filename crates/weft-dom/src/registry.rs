//! Element class generation and registration.
//!
//! The host registry wants a JS class; the guest supplies Rust hooks. A
//! small class factory bridges the two: it produces a subclass of the
//! selected base whose constructor and lifecycle methods forward straight
//! into wrapped closures, passing the instance (and the attribute-change
//! triple) and nothing else. Hook failures are not caught anywhere on this
//! path; they surface through the host's own dispatch, as lifecycle
//! errors normally do.

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, ElementDefinitionOptions, HtmlElement};

use crate::handle::assign;
use crate::name::ElementName;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

/// Base class variant, fixed at registration time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementBase {
    /// Autonomous element deriving from the generic element class.
    Generic,
    /// Customized built-in extending the named tag's implementation class.
    Extends(String),
}

/// An observed attribute mutation, as delivered to the guest hook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeChange {
    pub name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// The five guest hooks behind one element class.
///
/// The constructor hook runs synchronously during host construction,
/// before any lifecycle callback can fire, and its return value becomes
/// the instance's handle. The remaining hooks default to no-ops.
pub struct LifecycleHooks {
    constructor: Box<dyn FnMut(&HtmlElement) -> JsValue>,
    connected: Box<dyn FnMut(&HtmlElement)>,
    disconnected: Box<dyn FnMut(&HtmlElement)>,
    adopted: Box<dyn FnMut(&HtmlElement)>,
    attribute_changed: Box<dyn FnMut(&HtmlElement, AttributeChange)>,
}

impl LifecycleHooks {
    pub fn new(constructor: impl FnMut(&HtmlElement) -> JsValue + 'static) -> Self {
        LifecycleHooks {
            constructor: Box::new(constructor),
            connected: Box::new(|_| {}),
            disconnected: Box::new(|_| {}),
            adopted: Box::new(|_| {}),
            attribute_changed: Box::new(|_, _| {}),
        }
    }

    pub fn connected(mut self, hook: impl FnMut(&HtmlElement) + 'static) -> Self {
        self.connected = Box::new(hook);
        self
    }

    pub fn disconnected(mut self, hook: impl FnMut(&HtmlElement) + 'static) -> Self {
        self.disconnected = Box::new(hook);
        self
    }

    pub fn adopted(mut self, hook: impl FnMut(&HtmlElement) + 'static) -> Self {
        self.adopted = Box::new(hook);
        self
    }

    pub fn attribute_changed(
        mut self,
        hook: impl FnMut(&HtmlElement, AttributeChange) + 'static,
    ) -> Self {
        self.attribute_changed = Box::new(hook);
        self
    }
}

/// Everything the registry needs for one element class.
pub struct ElementDefinition {
    name: ElementName,
    base: ElementBase,
    hooks: LifecycleHooks,
    observed_attributes: Vec<String>,
}

impl ElementDefinition {
    pub fn new(name: ElementName, hooks: LifecycleHooks) -> Self {
        ElementDefinition {
            name,
            base: ElementBase::Generic,
            hooks,
            observed_attributes: Vec::new(),
        }
    }

    /// Extend an existing tag's implementation class instead of the
    /// generic element class.
    pub fn extends(mut self, tag: &str) -> Self {
        self.base = ElementBase::Extends(tag.to_string());
        self
    }

    /// Attribute names whose mutations reach the attribute-changed hook.
    /// Fixed at definition time; mutations of any other attribute are
    /// never reported.
    pub fn observed_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.observed_attributes = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Register `definition` with the document's custom-element registry.
///
/// Registration happens once per name; a duplicate name is rejected by the
/// registry itself and the rejection is returned unmodified.
pub fn define_element(definition: ElementDefinition) -> Result<(), JsValue> {
    let ElementDefinition {
        name,
        base,
        hooks,
        observed_attributes,
    } = definition;

    let window = web_sys::window()
        .ok_or_else(|| JsValue::from_str("custom elements require a window context"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("window has no document"))?;
    let registry = window.custom_elements();

    let base_class = resolve_base(&document, &base)?;

    let LifecycleHooks {
        mut constructor,
        mut connected,
        mut disconnected,
        mut adopted,
        mut attribute_changed,
    } = hooks;

    let construct_closure = Closure::wrap(Box::new(move |element: HtmlElement| {
        let data = constructor(&element);
        assign(&element, &data);
    }) as Box<dyn FnMut(HtmlElement)>);

    let connected_closure = Closure::wrap(Box::new(move |element: HtmlElement| {
        connected(&element);
    }) as Box<dyn FnMut(HtmlElement)>);

    let disconnected_closure = Closure::wrap(Box::new(move |element: HtmlElement| {
        disconnected(&element);
    }) as Box<dyn FnMut(HtmlElement)>);

    let adopted_closure = Closure::wrap(Box::new(move |element: HtmlElement| {
        adopted(&element);
    }) as Box<dyn FnMut(HtmlElement)>);

    let attribute_changed_closure = Closure::wrap(Box::new(
        move |element: HtmlElement,
              name: String,
              old_value: Option<String>,
              new_value: Option<String>| {
            attribute_changed(
                &element,
                AttributeChange {
                    name,
                    old_value,
                    new_value,
                },
            );
        },
    )
        as Box<dyn FnMut(HtmlElement, String, Option<String>, Option<String>)>);

    let observed = observed_attributes
        .iter()
        .map(|attr| JsValue::from_str(attr))
        .collect::<Array>();

    let class = element_class(
        &base_class,
        construct_closure.as_ref().unchecked_ref(),
        connected_closure.as_ref().unchecked_ref(),
        disconnected_closure.as_ref().unchecked_ref(),
        adopted_closure.as_ref().unchecked_ref(),
        attribute_changed_closure.as_ref().unchecked_ref(),
        &observed,
    )?;

    let result = match &base {
        ElementBase::Generic => registry.define(name.as_str(), &class),
        ElementBase::Extends(tag) => {
            let options = ElementDefinitionOptions::new();
            options.set_extends(tag);
            registry.define_with_options(name.as_str(), &class, &options)
        }
    };

    match result {
        Ok(()) => {
            // Definitions can never be revoked, so the hook closures stay
            // alive for the rest of the page's life.
            construct_closure.forget();
            connected_closure.forget();
            disconnected_closure.forget();
            adopted_closure.forget();
            attribute_changed_closure.forget();

            log(&format!("[weft-dom] defined <{name}>"));
            Ok(())
        }
        Err(err) => {
            log(&format!("[weft-dom] failed to define <{name}>: {err:?}"));
            Err(err)
        }
    }
}

/// Resolve the base class for a definition.
fn resolve_base(document: &Document, base: &ElementBase) -> Result<Function, JsValue> {
    let class = match base {
        ElementBase::Generic => Reflect::get(&js_sys::global(), &"HTMLElement".into())?,
        ElementBase::Extends(tag) => {
            // The implementation class of an existing tag is only
            // reachable through an instance of it.
            let probe = document.create_element(tag)?;
            Reflect::get(probe.as_ref(), &"constructor".into())?
        }
    };

    class.dyn_into::<Function>()
}

/// Generate the element class: a subclass of `base` forwarding its
/// constructor and every lifecycle method into the given callables.
fn element_class(
    base: &Function,
    construct: &Function,
    connected: &Function,
    disconnected: &Function,
    adopted: &Function,
    attribute_changed: &Function,
    observed: &Array,
) -> Result<Function, JsValue> {
    let factory = Function::new_with_args(
        "base, construct, connected, disconnected, adopted, attributeChanged, observed",
        r#"
        return class extends base {
            static get observedAttributes() {
                return observed;
            }

            constructor() {
                super();

                construct(this);
            }

            connectedCallback() {
                connected(this);
            }

            disconnectedCallback() {
                disconnected(this);
            }

            adoptedCallback() {
                adopted(this);
            }

            attributeChangedCallback(name, oldValue, newValue) {
                attributeChanged(this, name, oldValue, newValue);
            }
        };
        "#,
    );

    let args = Array::new();
    args.push(base);
    args.push(construct);
    args.push(connected);
    args.push(disconnected);
    args.push(adopted);
    args.push(attribute_changed);
    args.push(observed);

    factory.apply(&JsValue::NULL, &args)?.dyn_into::<Function>()
}
