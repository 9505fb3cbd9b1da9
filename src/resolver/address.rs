//! Resolved endpoints and their attribute bag.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Host name a resolver wants presented to the backend, independent of the
/// endpoint actually connected to.
pub const HOST_OVERRIDE: AttributeKey<String> = AttributeKey::new("HostOverride");

/// A concrete network endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // IPv6 literals need brackets in an authority.
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Typed key into [`Attributes`].
///
/// Two keys are the same key only when both the value type and the name
/// match, so `AttributeKey::<String>::new("a")` and
/// `AttributeKey::<u16>::new("a")` never collide.
pub struct AttributeKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AttributeKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for AttributeKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AttributeKey<T> {}

impl<T> fmt::Debug for AttributeKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeKey")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct KeyId {
    type_id: TypeId,
    name: &'static str,
}

/// Heterogeneous, typed attribute bag attached to a [`ResolvedAddress`].
#[derive(Clone, Default)]
pub struct Attributes {
    values: HashMap<KeyId, Arc<dyn Any + Send + Sync>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value stored under `key`.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: AttributeKey<T>, value: T) {
        self.values.insert(Self::id(&key), Arc::new(value));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<T: Any + Send + Sync>(mut self, key: AttributeKey<T>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get<T: Any + Send + Sync>(&self, key: &AttributeKey<T>) -> Option<&T> {
        self.values
            .get(&Self::id(key))
            .and_then(|v| v.downcast_ref::<T>())
    }

    pub fn contains<T: Any + Send + Sync>(&self, key: &AttributeKey<T>) -> bool {
        self.values.contains_key(&Self::id(key))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn id<T: Any>(key: &AttributeKey<T>) -> KeyId {
        KeyId {
            type_id: TypeId::of::<T>(),
            name: key.name,
        }
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.values.keys().map(|k| k.name))
            .finish()
    }
}

/// An endpoint plus the attributes its resolver attached to it.
#[derive(Debug, Clone)]
pub struct ResolvedAddress {
    pub endpoint: Endpoint,
    pub attributes: Attributes,
}

impl ResolvedAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            endpoint: Endpoint::new(host, port),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(endpoint: Endpoint, attributes: Attributes) -> Self {
        Self {
            endpoint,
            attributes,
        }
    }

    /// The `HostOverride` attribute, if the resolver set one.
    pub fn host_override(&self) -> Option<&str> {
        self.attributes.get(&HOST_OVERRIDE).map(String::as_str)
    }
}
