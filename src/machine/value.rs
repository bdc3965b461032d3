//! Raw machine values
//!
//! This module defines [`RawValue`], the value representation handed to the diagram
//! engine by the machine being visualized. Heap values are reference counted so that
//! the same array or closure can be reachable from several bindings, and arrays sit
//! behind a `RefCell` so the machine can build cycles by mutation.
//!
//! # Value Types
//!
//! - [`RawValue::Unassigned`]: declared but not yet assigned (temporal dead zone)
//! - [`RawValue::Undefined`], [`RawValue::Null`], [`RawValue::Bool`],
//!   [`RawValue::Number`], [`RawValue::Str`]: primitives without identity
//! - [`RawValue::Array`]: shared, mutable array (pairs are two-slot arrays)
//! - [`RawValue::Closure`]: user function capturing a defining scope
//! - [`RawValue::Builtin`]: primitive function with no captured scope
//! - [`RawValue::Opaque`]: anything the machine could not classify
//!
//! # Identity
//!
//! Two `RawValue`s denote the same heap object when their `Rc`s point at the same
//! allocation; [`RawValue::identity`] exposes that address.

use super::scope::ScopeId;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a machine array
pub type ArrayRef = Rc<RefCell<RawArray>>;

/// Values as produced by the machine
#[derive(Debug, Clone, Default)]
pub enum RawValue {
    #[default]
    Unassigned,
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(ArrayRef),
    Closure(Rc<Closure>),
    Builtin(Rc<Builtin>),
    Opaque(String),
}

/// Array contents plus the scope the array was created in, when the machine knows it
#[derive(Default)]
pub struct RawArray {
    pub elements: Vec<RawValue>,
    pub origin: Option<ScopeId>,
}

// Arrays may contain themselves, so Debug must not recurse into the elements
impl fmt::Debug for RawArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawArray")
            .field("len", &self.elements.len())
            .field("origin", &self.origin)
            .finish()
    }
}

/// A user-defined function value
#[derive(Debug, Clone)]
pub struct Closure {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: String,
    pub env: ScopeId,
}

/// A primitive (host-provided) function value
#[derive(Debug, Clone)]
pub struct Builtin {
    pub name: String,
}

impl RawValue {
    /// Create a fresh array holding `elements`
    pub fn array(elements: Vec<RawValue>, origin: Option<ScopeId>) -> Self {
        RawValue::Array(Rc::new(RefCell::new(RawArray { elements, origin })))
    }

    /// Create a fresh closure value
    pub fn closure(name: Option<&str>, params: &[&str], body: &str, env: ScopeId) -> Self {
        RawValue::Closure(Rc::new(Closure {
            name: name.map(str::to_string),
            params: params.iter().map(|p| p.to_string()).collect(),
            body: body.to_string(),
            env,
        }))
    }

    /// Create a fresh builtin function value
    pub fn builtin(name: &str) -> Self {
        RawValue::Builtin(Rc::new(Builtin {
            name: name.to_string(),
        }))
    }

    /// Heap identity of this value, `None` for primitives
    pub fn identity(&self) -> Option<usize> {
        match self {
            RawValue::Array(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            RawValue::Closure(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            RawValue::Builtin(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            _ => None,
        }
    }

    /// Check whether two values denote the same heap object
    pub fn same_object(&self, other: &RawValue) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Get the array handle, returns None if not an Array
    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            RawValue::Array(rc) => Some(rc),
            _ => None,
        }
    }
}
