use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use super::backend::{DetectorBackend, ModelLoader};

/// Registry of model loaders, keyed by backend name.
pub struct LoaderRegistry {
    loaders: HashMap<String, Arc<dyn ModelLoader>>,
    default_name: Option<String>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self {
            loaders: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a loader. The first registered loader becomes the default.
    pub fn register<L: ModelLoader + 'static>(&mut self, loader: L) {
        let name = loader.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.loaders.insert(name, Arc::new(loader));
    }

    /// Set default loader by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.loaders.contains_key(name) {
            return Err(anyhow!("model backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ModelLoader>> {
        self.loaders.get(name).cloned()
    }

    pub fn default_loader(&self) -> Option<Arc<dyn ModelLoader>> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// Registered backend names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loaders.keys().cloned().collect();
        names.sort();
        names
    }

    /// Load a backend synchronously by name.
    pub fn load(&self, name: &str) -> Result<Box<dyn DetectorBackend>> {
        let loader = self.get(name).ok_or_else(|| {
            anyhow!(
                "model backend '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            )
        })?;
        loader.load()
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backend::FnLoader;
    use crate::detect::backends::StubBackend;

    fn stub_loader(
        name: &'static str,
    ) -> FnLoader<impl Fn() -> Result<Box<dyn DetectorBackend>> + Send + Sync> {
        FnLoader::new(name, || {
            Ok(Box::new(StubBackend::new("person")) as Box<dyn DetectorBackend>)
        })
    }

    #[test]
    fn first_registered_is_default() {
        let mut registry = LoaderRegistry::new();
        registry.register(stub_loader("a"));
        registry.register(stub_loader("b"));
        assert_eq!(registry.default_loader().unwrap().name(), "a");
        registry.set_default("b").unwrap();
        assert_eq!(registry.default_loader().unwrap().name(), "b");
        assert_eq!(registry.list(), vec!["a", "b"]);
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let mut registry = LoaderRegistry::new();
        registry.register(stub_loader("stub"));
        assert!(registry.set_default("tract").is_err());
        let err = registry.load("tract").err().unwrap();
        assert!(err.to_string().contains("available: stub"));
        assert!(registry.load("stub").is_ok());
    }
}
