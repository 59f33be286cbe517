pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AudioError, ConfigError, SessionError, SinkError, TransportError};
pub use types::{AudioChunk, SampleBlock, SessionEvent, TranscriptEvent};
