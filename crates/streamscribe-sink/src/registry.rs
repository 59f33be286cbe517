use crate::sink_trait::Sink;
use std::collections::HashMap;
use streamscribe_core::SinkError;

pub struct SinkRegistry {
    factories: HashMap<String, fn() -> Box<dyn Sink>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("console", || Box::new(crate::console::ConsoleSink::new()));
        registry.register("file", || Box::new(crate::file::FileSink::new()));
        registry
    }

    pub fn register(&mut self, name: &str, factory: fn() -> Box<dyn Sink>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Sink>, SinkError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| SinkError::NotFound(name.to_string()))
    }

    pub fn list_sinks(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_builtin_sinks() {
        let registry = SinkRegistry::new();
        assert!(registry.create("console").is_ok());
        assert!(registry.create("file").is_ok());
    }

    #[test]
    fn test_registry_create_unknown_returns_error() {
        let registry = SinkRegistry::new();
        match registry.create("nope") {
            Err(SinkError::NotFound(name)) => assert_eq!(name, "nope"),
            _ => panic!("expected NotFound error"),
        }
    }

    #[test]
    fn test_registry_list_sinks() {
        let registry = SinkRegistry::new();
        let sinks = registry.list_sinks();
        assert!(sinks.contains(&"console"));
        assert!(sinks.contains(&"file"));
    }
}
