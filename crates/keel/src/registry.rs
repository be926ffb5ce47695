use std::collections::HashMap;

use crate::entity::Entity;
use crate::error::{KeelError, KeelResult};

/// What the registry knows about one stored type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Namespace (hash key) holding the type's records.
    pub namespace: &'static str,
    /// Rust type name, for diagnostics.
    pub type_name: &'static str,
}

impl TypeDescriptor {
    pub fn of<T: Entity>() -> Self {
        Self {
            namespace: T::namespace(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// Explicit mapping from namespace to record type.
///
/// The embedding application registers every type it intends to load before
/// loading; loading from an unregistered namespace fails with
/// [`KeelError::UnknownType`].
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<&'static str, TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T`. Registering the same type again is a no-op; registering
    /// a different type under an already claimed namespace is rejected.
    pub fn register<T: Entity>(&mut self) -> KeelResult<&TypeDescriptor> {
        let descriptor = TypeDescriptor::of::<T>();
        if descriptor.namespace.is_empty() {
            return Err(KeelError::InvalidArgument(format!(
                "{} has an empty namespace",
                descriptor.type_name
            )));
        }
        if let Some(existing) = self.types.get(descriptor.namespace) {
            if existing.type_name != descriptor.type_name {
                return Err(KeelError::InvalidArgument(format!(
                    "namespace {:?} is already registered to {}",
                    descriptor.namespace, existing.type_name
                )));
            }
        }
        Ok(self
            .types
            .entry(descriptor.namespace)
            .or_insert(descriptor))
    }

    /// The descriptor registered for `namespace`.
    pub fn resolve(&self, namespace: &str) -> KeelResult<&TypeDescriptor> {
        self.types
            .get(namespace)
            .ok_or_else(|| KeelError::UnknownType(namespace.to_string()))
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.types.contains_key(namespace)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered namespaces, sorted.
    pub fn namespaces(&self) -> Vec<&'static str> {
        let mut namespaces: Vec<_> = self.types.keys().copied().collect();
        namespaces.sort_unstable();
        namespaces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_types::{Fields, Namespaced, Oid, TypeError};

    macro_rules! unit_entity {
        ($name:ident, $ns:literal) => {
            struct $name;

            impl Namespaced for $name {
                fn namespace() -> &'static str {
                    $ns
                }
            }

            impl Entity for $name {
                fn oid(&self) -> Option<&Oid> {
                    None
                }
                fn set_oid(&mut self, _oid: Oid) {}
                fn to_fields(&self) -> Fields {
                    Fields::new()
                }
                fn from_fields(_oid: Oid, _fields: &Fields) -> Result<Self, TypeError> {
                    Ok($name)
                }
            }
        };
    }

    unit_entity!(Person, "app.Person");
    unit_entity!(Impostor, "app.Person");
    unit_entity!(Invoice, "billing.Invoice");
    unit_entity!(Nameless, "");

    #[test]
    fn register_and_resolve() {
        let mut registry = TypeRegistry::new();
        registry.register::<Person>().unwrap();
        let descriptor = registry.resolve("app.Person").unwrap();
        assert_eq!(descriptor.namespace, "app.Person");
        assert!(descriptor.type_name.ends_with("Person"));
    }

    #[test]
    fn unknown_namespace() {
        let registry = TypeRegistry::new();
        let err = registry.resolve("app.Person").unwrap_err();
        assert!(matches!(err, KeelError::UnknownType(ns) if ns == "app.Person"));
    }

    #[test]
    fn reregistering_is_noop() {
        let mut registry = TypeRegistry::new();
        registry.register::<Person>().unwrap();
        registry.register::<Person>().unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn conflicting_namespace_is_rejected() {
        let mut registry = TypeRegistry::new();
        registry.register::<Person>().unwrap();
        let err = registry.register::<Impostor>().unwrap_err();
        assert!(matches!(err, KeelError::InvalidArgument(_)));
    }

    #[test]
    fn empty_namespace_is_rejected() {
        let mut registry = TypeRegistry::new();
        assert!(registry.register::<Nameless>().is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn namespaces_are_sorted() {
        let mut registry = TypeRegistry::new();
        registry.register::<Invoice>().unwrap();
        registry.register::<Person>().unwrap();
        assert_eq!(registry.namespaces(), vec!["app.Person", "billing.Invoice"]);
        assert!(registry.contains("billing.Invoice"));
    }
}
