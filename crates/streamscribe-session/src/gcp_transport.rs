use crate::transport::{AudioSink, ResultSource, SpeechTransport, StreamConfig};
use async_trait::async_trait;
use streamscribe_core::TransportError;

pub struct GcpTransport {
    credentials_path: Option<String>,
    endpoint: Option<String>,
}

impl GcpTransport {
    pub fn new() -> Self {
        Self {
            credentials_path: None,
            endpoint: None,
        }
    }
}

impl Default for GcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechTransport for GcpTransport {
    fn name(&self) -> &str {
        "gcp"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), TransportError> {
        let credentials_path = config
            .get("credentials_path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                TransportError::InitializationFailed(
                    "missing 'credentials_path' in gcp config".to_string(),
                )
            })?;
        if !std::path::Path::new(credentials_path).exists() {
            return Err(TransportError::InitializationFailed(format!(
                "service account key not found at {credentials_path}"
            )));
        }
        std::env::set_var("GOOGLE_APPLICATION_CREDENTIALS", credentials_path);
        self.credentials_path = Some(credentials_path.to_string());

        self.endpoint = config
            .get("endpoint")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        tracing::info!(
            credentials_path = %credentials_path,
            endpoint = ?self.endpoint,
            "GcpTransport initialized (stub — gRPC client not wired)"
        );
        Ok(())
    }

    async fn open(
        &self,
        _config: &StreamConfig,
    ) -> Result<(Box<dyn AudioSink>, Box<dyn ResultSource>), TransportError> {
        // Stub: real streaming call deferred to when tonic is actually wired
        Err(TransportError::OpenFailed(
            "gcp transport stub cannot open streams".to_string(),
        ))
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
