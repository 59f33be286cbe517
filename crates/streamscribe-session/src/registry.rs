use crate::transport::SpeechTransport;
use std::collections::HashMap;
use streamscribe_core::TransportError;

pub struct TransportRegistry {
    factories: HashMap<String, fn() -> Box<dyn SpeechTransport>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("null", || {
            Box::new(crate::null_transport::NullTransport::new())
        });
        #[cfg(feature = "gcp")]
        registry.register("gcp", || {
            Box::new(crate::gcp_transport::GcpTransport::new())
        });
        registry
    }

    pub fn register(&mut self, name: &str, factory: fn() -> Box<dyn SpeechTransport>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn SpeechTransport>, TransportError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| TransportError::NotFound(name.to_string()))
    }

    pub fn list_transports(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::null_transport::NullTransport;

    #[test]
    fn test_registry_new_has_null_transport() {
        let registry = TransportRegistry::new();
        assert!(registry.create("null").is_ok());
    }

    #[test]
    fn test_registry_create_null_returns_correct_name() {
        let registry = TransportRegistry::new();
        let transport = registry.create("null").unwrap();
        assert_eq!(transport.name(), "null");
    }

    #[test]
    fn test_registry_create_unknown_returns_error() {
        let registry = TransportRegistry::new();
        let result = registry.create("nope");
        match result {
            Err(TransportError::NotFound(name)) => assert_eq!(name, "nope"),
            _ => panic!("expected NotFound error"),
        }
    }

    #[test]
    fn test_registry_register_custom_transport() {
        let mut registry = TransportRegistry::new();
        registry.register("custom", || Box::new(NullTransport::new()));
        assert!(registry.create("custom").is_ok());
    }

    #[test]
    fn test_registry_list_transports_includes_null() {
        let registry = TransportRegistry::new();
        let transports = registry.list_transports();
        assert!(transports.contains(&"null"));
    }
}
