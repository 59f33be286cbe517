pub mod null_transport;
pub mod registry;
pub mod session;
pub mod transport;
#[cfg(feature = "gcp")]
pub mod gcp_transport;

pub use null_transport::NullTransport;
pub use registry::TransportRegistry;
pub use session::{SessionConfig, StreamSession};
pub use transport::{
    AudioEncoding, AudioSink, ResultSource, SpeechTransport, StreamConfig, TranscriptResult,
};
#[cfg(feature = "gcp")]
pub use gcp_transport::GcpTransport;
