pub mod console;
pub mod file;
pub mod host;
pub mod registry;
pub mod sink_trait;

pub use console::ConsoleSink;
pub use file::FileSink;
pub use host::SinkHost;
pub use registry::SinkRegistry;
pub use sink_trait::Sink;
