use crate::sink_trait::Sink;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use streamscribe_core::{SinkError, TranscriptEvent};

/// Appends final transcripts to a file, one per line. Interim results are
/// skipped; only committed text belongs in the record.
pub struct FileSink {
    output_path: Mutex<Option<PathBuf>>,
    write_count: AtomicUsize,
}

impl FileSink {
    pub fn new() -> Self {
        Self {
            output_path: Mutex::new(None),
            write_count: AtomicUsize::new(0),
        }
    }

    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::Relaxed)
    }
}

impl Default for FileSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), SinkError> {
        let path = config.get("path").and_then(|v| v.as_str()).ok_or_else(|| {
            SinkError::InitializationFailed("missing 'path' in config".to_string())
        })?;
        *self.output_path.lock().unwrap() = Some(PathBuf::from(path));
        Ok(())
    }

    async fn publish(&self, event: &TranscriptEvent) -> Result<(), SinkError> {
        if !event.is_final {
            return Ok(());
        }

        let guard = self.output_path.lock().unwrap();
        let path = guard
            .as_ref()
            .ok_or_else(|| SinkError::PublishFailed("not initialized".to_string()))?;

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| SinkError::PublishFailed(e.to_string()))?;

        writeln!(file, "{}", event.text).map_err(|e| SinkError::PublishFailed(e.to_string()))?;

        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.output_path.lock().unwrap().is_some()
    }

    async fn shutdown(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
