//! Elements and components.
//!
//! An [`Element`] is an immutable descriptor: "instantiate this component
//! with these props here". Elements are created fresh on every execution and
//! dropped after reconciliation; the engine only keeps the props.
//!
//! Components are anything implementing [`Render`]. Every
//! `Fn(&Value) -> Result<Value>` closure or function item qualifies, so a
//! component is usually just a plain function:
//!
//! ```ignore
//! fn leaf(_props: &Value) -> Result<Value> {
//!     Ok(Value::map([("value", Value::from(42))]))
//! }
//!
//! let element = create_element(leaf, Value::Null);
//! ```

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::types::Value;

// =============================================================================
// Render capability
// =============================================================================

/// The single capability the engine needs from a component.
pub trait Render: 'static {
    fn render(&self, props: &Value) -> Result<Value>;
}

impl<F> Render for F
where
    F: Fn(&Value) -> Result<Value> + 'static,
{
    fn render(&self, props: &Value) -> Result<Value> {
        self(props)
    }
}

/// Plain function pointer, the one erased renderer whose target is known.
type RenderFn = fn(&Value) -> Result<Value>;

/// A type-erased component plus its identity.
///
/// Identity is the concrete type of the renderer, so two elements built from
/// the same function (or the same closure expression) are the same component
/// even though each holds its own allocation. Function pointers
/// (`fn(&Value) -> Result<Value>`) all share one type and are told apart by
/// address.
///
/// Boxed `dyn Fn` renderers share one type too and cannot be told apart:
/// switching between two of them at the same key keeps the instance and its
/// hooks. Wrap each in its own named function or closure to give it an
/// identity.
#[derive(Clone)]
pub struct Component {
    render: Rc<dyn Render>,
    type_id: TypeId,
    address: Option<usize>,
    name: &'static str,
}

impl Component {
    pub fn new<R: Render>(render: R) -> Self {
        let address = (&render as &dyn Any)
            .downcast_ref::<RenderFn>()
            .map(|f| *f as usize);
        Self {
            render: Rc::new(render),
            type_id: TypeId::of::<R>(),
            address,
            name: type_name::<R>(),
        }
    }

    /// Diagnostic name (the renderer's type name).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether both handles run the same component.
    pub fn same(&self, other: &Component) -> bool {
        self.type_id == other.type_id && self.address == other.address
    }

    pub(crate) fn render(&self, props: &Value) -> Result<Value> {
        self.render.render(props)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

// =============================================================================
// Element
// =============================================================================

#[derive(Clone)]
struct ElementData {
    component: Component,
    props: Value,
    key: Option<Rc<str>>,
    item_key: Option<Rc<str>>,
}

/// Immutable "instantiate this here" descriptor.
#[derive(Clone)]
pub struct Element(Rc<ElementData>);

impl Element {
    /// Create an element for an already-wrapped component.
    ///
    /// A string or integer `"key"` field in map props becomes the element's
    /// item key, which identifies it within a list. `""` and `0` count as no
    /// key.
    pub fn new(component: Component, props: Value) -> Self {
        let item_key = match props.get("key") {
            Some(Value::Str(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Int(i)) if *i != 0 => Some(i.to_string().into()),
            _ => None,
        };
        Element(Rc::new(ElementData {
            component,
            props,
            key: None,
            item_key,
        }))
    }

    /// Set an explicit key. An explicit key replaces the structural path
    /// entirely when the child is identified.
    pub fn with_key(mut self, key: impl Into<Rc<str>>) -> Self {
        Rc::make_mut(&mut self.0).key = Some(key.into());
        self
    }

    pub fn component(&self) -> &Component {
        &self.0.component
    }

    pub fn props(&self) -> &Value {
        &self.0.props
    }

    pub fn key(&self) -> Option<&str> {
        self.0.key.as_deref()
    }

    pub fn item_key(&self) -> Option<&str> {
        self.0.item_key.as_deref()
    }

    pub(crate) fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.0.component.same(&other.0.component)
                && self.0.key == other.0.key
                && self.0.item_key == other.0.item_key
                && self.0.props == other.0.props)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("component", &self.0.component.name)
            .field("key", &self.key())
            .field("props", &self.0.props)
            .finish()
    }
}

/// Create an element from any renderer.
pub fn create_element<R: Render>(render: R, props: impl Into<Value>) -> Element {
    Element::new(Component::new(render), props.into())
}
