//! Explicit component registry: type name -> factory.

use std::collections::BTreeMap;

use crate::node::Node;

/// Builds a hosted component instance with the given instance name.
pub type Factory = fn(&str) -> Box<dyn Node>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("component type `{0}` is already registered")]
    Duplicate(String),
    #[error("unknown component type `{0}`")]
    Unknown(String),
}

/// Maps component type names to factories.
///
/// Populated by explicit registration calls at startup, e.g.
/// `framewire_components::register_builtins(&mut registry)`.
#[derive(Clone, Debug, Default)]
pub struct ComponentRegistry {
    factories: BTreeMap<String, Factory>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        factory: Factory,
    ) -> Result<(), RegistryError> {
        let type_name = type_name.into();
        if self.factories.contains_key(&type_name) {
            return Err(RegistryError::Duplicate(type_name));
        }
        self.factories.insert(type_name, factory);
        Ok(())
    }

    pub fn create(
        &self,
        type_name: &str,
        instance_name: &str,
    ) -> Result<Box<dyn Node>, RegistryError> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| RegistryError::Unknown(type_name.to_string()))?;
        Ok(factory(instance_name))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type names in lexicographic order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
