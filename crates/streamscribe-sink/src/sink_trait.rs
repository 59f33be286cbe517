use async_trait::async_trait;
use streamscribe_core::{SinkError, TranscriptEvent};

/// A transcript consumer that receives recognized speech and forwards it
/// somewhere.
///
/// Implementations are registered via [`SinkRegistry`](crate::SinkRegistry)
/// and receive every transcript event, interim and final; each sink decides
/// which to act on.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Returns the sink's plugin name (e.g. `"console"`, `"file"`).
    fn name(&self) -> &str;
    /// One-time initialisation with sink-specific TOML configuration.
    async fn initialize(&mut self, config: toml::Value) -> Result<(), SinkError>;
    /// Deliver one transcript event to this sink.
    async fn publish(&self, event: &TranscriptEvent) -> Result<(), SinkError>;
    /// Returns `true` if the sink is currently able to accept transcripts.
    fn is_healthy(&self) -> bool;
    /// Gracefully shut down the sink, releasing resources.
    async fn shutdown(&self) -> Result<(), SinkError>;
}
