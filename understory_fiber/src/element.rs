// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declarative tree descriptions: elements, props, values, and component references.
//!
//! ## Overview
//!
//! An [`Element`] describes one node of the desired tree: a host tag, a text run, or a
//! [`Component`] invocation, plus an optional [`Key`] and its [`Props`].
//! Elements are immutable once built and cheap to clone (reference counted), so the
//! reconciler can hold on to them across passes without copying subtrees.
//!
//! ## Children
//!
//! Children are anything implementing [`IntoChildren`]: elements, strings, numbers,
//! `Option`s, and vectors or arrays of those. Nested lists are flattened, `None` is dropped,
//! and non-element values are wrapped as text elements.
//!
//! ```
//! use understory_fiber::{Element, Value};
//!
//! let items = vec!["a", "b"];
//! let list = Element::host("ul")
//!     .prop("class", "menu")
//!     .children(items.into_iter().map(|label| Element::host("li").key(label).child(label)));
//! assert_eq!(list.props().children().len(), 2);
//! assert_eq!(list.props().get("class"), Some(&Value::from("menu")));
//!
//! let mixed = Element::host("p").child(("count: ", 3)).child(None::<Element>);
//! assert_eq!(mixed.props().children().len(), 2);
//! ```

use alloc::borrow::Cow;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::{Any, TypeId};

use crate::hooks::Hooks;

/// Identity hint used to decide whether two positional siblings are the same node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Integer key.
    Int(i64),
    /// String key.
    Str(Cow<'static, str>),
}

impl From<&'static str> for Key {
    fn from(value: &'static str) -> Self {
        Self::Str(Cow::Borrowed(value))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::Str(Cow::Owned(value))
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// A zero-argument callback carried in props (event listeners and the like).
///
/// Compared by identity: two callbacks are equal only if they share the same allocation.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn()>);

impl Callback {
    /// Wrap a closure.
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke the callback.
    pub fn call(&self) {
        (self.0)();
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl core::fmt::Debug for Callback {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

/// A prop or dependency value.
///
/// Equality is shallow: scalars compare by value (floats bitwise), callbacks and shared
/// values by pointer identity. This is the comparison used for update detection and for
/// effect dependency lists.
#[derive(Clone)]
pub enum Value {
    /// Explicit absence.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// String.
    Str(Cow<'static, str>),
    /// Callback (listeners).
    Callback(Callback),
    /// Arbitrary shared data, compared by identity.
    Shared(Rc<dyn Any>),
}

impl Value {
    /// Wrap arbitrary data as a shared value.
    pub fn shared<T: 'static>(value: T) -> Self {
        Self::Shared(Rc::new(value))
    }

    /// String contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer contents, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean contents, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Callback contents, if this is a callback.
    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            Self::Callback(cb) => Some(cb),
            _ => None,
        }
    }

    /// Shared data of type `T`, if this is a shared value holding a `T`.
    pub fn downcast<T: 'static>(&self) -> Option<Rc<T>> {
        match self {
            Self::Shared(rc) => Rc::clone(rc).downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Callback(a), Self::Callback(b)) => a == b,
            (Self::Shared(a), Self::Shared(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl core::fmt::Debug for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Self::Callback(cb) => cb.fmt(f),
            Self::Shared(rc) => write!(f, "Shared({:p})", Rc::as_ptr(rc).cast::<()>()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&'static str> for Value {
    fn from(value: &'static str) -> Self {
        Self::Str(Cow::Borrowed(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(Cow::Owned(value))
    }
}

impl From<Callback> for Value {
    fn from(value: Callback) -> Self {
        Self::Callback(value)
    }
}

/// Ordered attribute map plus the child list of an element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    attrs: BTreeMap<Cow<'static, str>, Value>,
    children: Vec<Element>,
}

impl Props {
    /// Attribute that carries the contents of a text element.
    pub const TEXT: &'static str = "text";

    /// Props holding only `children`.
    pub fn with_children(children: Vec<Element>) -> Self {
        Self {
            attrs: BTreeMap::new(),
            children,
        }
    }

    /// Look up an attribute.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// Attributes in key order, excluding children.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.attrs.iter().map(|(k, v)| (k.as_ref(), v))
    }

    /// Number of attributes, excluding children.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Returns true if there are no attributes (children are not counted).
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// The declared children.
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Contents of a text element; empty for anything else.
    pub fn text(&self) -> &str {
        self.get(Self::TEXT).and_then(Value::as_str).unwrap_or("")
    }

    /// Set an attribute, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<Cow<'static, str>>, value: impl Into<Value>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Shallow difference used to decide whether an Update is needed.
    ///
    /// Attributes are compared value by value; children only contribute their count.
    pub fn differs_from(&self, other: &Self) -> bool {
        self.children.len() != other.children.len() || self.attrs != other.attrs
    }

    /// Names whose values differ between `self` (previous) and `next`, including removals.
    pub fn changed_names<'a>(&'a self, next: &'a Self) -> impl Iterator<Item = &'a str> + 'a {
        let removed = self
            .attrs
            .keys()
            .filter(move |k| !next.attrs.contains_key(*k))
            .map(AsRef::as_ref);
        let changed = next
            .attrs
            .iter()
            .filter(move |(k, v)| self.attrs.get(*k) != Some(*v))
            .map(|(k, _)| k.as_ref());
        removed.chain(changed)
    }
}

/// Render function stored in a [`Component`].
pub type RenderFn = dyn Fn(&mut Hooks<'_>, &Props) -> Element;

/// A reference to component logic.
///
/// Two components are the same type when they were created from the same function
/// (or the same closure definition site): identity is the [`TypeId`] of the function.
#[derive(Clone)]
pub struct Component {
    id: TypeId,
    name: &'static str,
    render: Rc<RenderFn>,
}

impl Component {
    /// Wrap a render function.
    ///
    /// The function may return anything convertible into an [`Element`]; strings and
    /// numbers become text elements.
    pub fn new<F, R>(render: F) -> Self
    where
        F: Fn(&mut Hooks<'_>, &Props) -> R + 'static,
        R: Into<Element>,
    {
        Self {
            id: TypeId::of::<F>(),
            name: core::any::type_name::<F>(),
            render: Rc::new(move |cx: &mut Hooks<'_>, props: &Props| render(cx, props).into()),
        }
    }

    /// Replace the diagnostic name (defaults to the function's type name).
    #[must_use]
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Diagnostic name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn render(&self, cx: &mut Hooks<'_>, props: &Props) -> Element {
        (self.render)(cx, props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl core::fmt::Debug for Component {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// What kind of node an element describes.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementType {
    /// A host node created through the renderer adapter (for example `"div"`).
    Host(Cow<'static, str>),
    /// A component invocation.
    Component(Component),
    /// A text run; its contents live in [`Props::TEXT`].
    Text,
}

#[derive(Clone, Debug, PartialEq)]
struct ElementData {
    ty: ElementType,
    key: Option<Key>,
    props: Props,
}

/// An immutable, reference-counted tree description node.
#[derive(Clone, PartialEq)]
pub struct Element(Rc<ElementData>);

impl Element {
    /// An element of the given type with no key, attributes, or children.
    pub fn new(ty: ElementType) -> Self {
        Self(Rc::new(ElementData {
            ty,
            key: None,
            props: Props::default(),
        }))
    }

    /// A host element such as `"div"`.
    pub fn host(tag: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ElementType::Host(tag.into()))
    }

    /// A text element.
    pub fn text(value: impl Into<Cow<'static, str>>) -> Self {
        let mut element = Self::new(ElementType::Text);
        element.data_mut().props.insert(Props::TEXT, Value::Str(value.into()));
        element
    }

    /// A component element.
    pub fn component(component: Component) -> Self {
        Self::new(ElementType::Component(component))
    }

    /// Set the key.
    #[must_use]
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.data_mut().key = Some(key.into());
        self
    }

    /// Set an attribute.
    #[must_use]
    pub fn prop(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        self.data_mut().props.insert(name, value);
        self
    }

    /// Append one child (or a flattened list of children).
    #[must_use]
    pub fn child(mut self, child: impl IntoChildren) -> Self {
        child.push_into(&mut self.data_mut().props.children);
        self
    }

    /// Append every child of an iterator, flattening each.
    #[must_use]
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoChildren,
    {
        let out = &mut self.data_mut().props.children;
        for child in children {
            child.push_into(out);
        }
        self
    }

    /// The element's type.
    pub fn ty(&self) -> &ElementType {
        &self.0.ty
    }

    /// The element's key, if any.
    pub fn key_ref(&self) -> Option<&Key> {
        self.0.key.as_ref()
    }

    /// The element's props.
    pub fn props(&self) -> &Props {
        &self.0.props
    }

    fn data_mut(&mut self) -> &mut ElementData {
        Rc::make_mut(&mut self.0)
    }
}

impl core::fmt::Debug for Element {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut s = f.debug_struct("Element");
        match &self.0.ty {
            ElementType::Host(tag) => s.field("host", tag),
            ElementType::Component(c) => s.field("component", &c.name()),
            ElementType::Text => s.field("text", &self.0.props.text()),
        };
        if let Some(key) = &self.0.key {
            s.field("key", key);
        }
        s.field("children", &self.0.props.children.len()).finish()
    }
}

impl From<&'static str> for Element {
    fn from(value: &'static str) -> Self {
        Self::text(value)
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<Cow<'static, str>> for Element {
    fn from(value: Cow<'static, str>) -> Self {
        Self::text(value)
    }
}

impl From<Component> for Element {
    fn from(value: Component) -> Self {
        Self::component(value)
    }
}

macro_rules! text_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Element {
                fn from(value: $ty) -> Self {
                    Self::text(value.to_string())
                }
            }
        )*
    };
}

text_from_display!(i32, i64, u32, u64, usize, f64, char);

/// Values that can be appended to an element's child list.
///
/// Lists flatten, `None` contributes nothing, and everything else becomes one element.
pub trait IntoChildren {
    /// Append the flattened children to `out`.
    fn push_into(self, out: &mut Vec<Element>);
}

impl IntoChildren for Element {
    fn push_into(self, out: &mut Vec<Element>) {
        out.push(self);
    }
}

macro_rules! children_via_element {
    ($($ty:ty),*) => {
        $(
            impl IntoChildren for $ty {
                fn push_into(self, out: &mut Vec<Element>) {
                    out.push(Element::from(self));
                }
            }
        )*
    };
}

children_via_element!(
    &'static str, String, Cow<'static, str>, Component, i32, i64, u32, u64, usize, f64, char
);

impl<T: IntoChildren> IntoChildren for Option<T> {
    fn push_into(self, out: &mut Vec<Element>) {
        if let Some(child) = self {
            child.push_into(out);
        }
    }
}

impl<T: IntoChildren> IntoChildren for Vec<T> {
    fn push_into(self, out: &mut Vec<Element>) {
        for child in self {
            child.push_into(out);
        }
    }
}

impl<T: IntoChildren, const N: usize> IntoChildren for [T; N] {
    fn push_into(self, out: &mut Vec<Element>) {
        for child in self {
            child.push_into(out);
        }
    }
}

impl<A: IntoChildren, B: IntoChildren> IntoChildren for (A, B) {
    fn push_into(self, out: &mut Vec<Element>) {
        self.0.push_into(out);
        self.1.push_into(out);
    }
}

/// Functional form of the element builder.
///
/// Equivalent to [`Element::new`] followed by one [`Element::prop`] per attribute and
/// [`Element::child`] for `children`.
pub fn create_element<N, V>(
    ty: ElementType,
    props: impl IntoIterator<Item = (N, V)>,
    children: impl IntoChildren,
) -> Element
where
    N: Into<Cow<'static, str>>,
    V: Into<Value>,
{
    let mut element = Element::new(ty);
    {
        let data = element.data_mut();
        for (name, value) in props {
            data.props.insert(name, value);
        }
        children.push_into(&mut data.props.children);
    }
    element
}
