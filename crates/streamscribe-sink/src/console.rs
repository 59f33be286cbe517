use crate::sink_trait::Sink;
use async_trait::async_trait;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use streamscribe_core::{SinkError, TranscriptEvent};

/// Prints transcripts to stdout. Interim results rewrite the current line in
/// place; final results commit a line. With `accumulate = true` the sink
/// keeps the whole dictation so far and reprints it on every final result.
pub struct ConsoleSink {
    accumulate: AtomicBool,
    accumulated: Mutex<String>,
    publish_count: AtomicUsize,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            accumulate: AtomicBool::new(false),
            accumulated: Mutex::new(String::new()),
            publish_count: AtomicUsize::new(0),
        }
    }

    pub fn publish_count(&self) -> usize {
        self.publish_count.load(Ordering::Relaxed)
    }

    pub fn accumulated(&self) -> String {
        self.accumulated.lock().unwrap().clone()
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), SinkError> {
        let accumulate = config
            .get("accumulate")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        self.accumulate.store(accumulate, Ordering::Relaxed);
        Ok(())
    }

    async fn publish(&self, event: &TranscriptEvent) -> Result<(), SinkError> {
        self.publish_count.fetch_add(1, Ordering::Relaxed);

        let mut out = std::io::stdout().lock();
        if event.is_final {
            if self.accumulate.load(Ordering::Relaxed) {
                let mut acc = self.accumulated.lock().unwrap();
                acc.push_str(&event.text);
                acc.push(' ');
                writeln!(out, "\r{}", acc).map_err(|e| SinkError::PublishFailed(e.to_string()))?;
            } else {
                writeln!(out, "\r{}", event.text)
                    .map_err(|e| SinkError::PublishFailed(e.to_string()))?;
            }
        } else {
            write!(out, "\r{}", event.text).map_err(|e| SinkError::PublishFailed(e.to_string()))?;
            out.flush().map_err(|e| SinkError::PublishFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        true
    }

    async fn shutdown(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn final_event(text: &str) -> TranscriptEvent {
        TranscriptEvent {
            text: text.to_string(),
            is_final: true,
            end_offset_ms: 0,
        }
    }

    fn interim_event(text: &str) -> TranscriptEvent {
        TranscriptEvent {
            text: text.to_string(),
            is_final: false,
            end_offset_ms: 0,
        }
    }

    #[test]
    fn test_console_sink_name() {
        let sink = ConsoleSink::new();
        assert_eq!(sink.name(), "console");
    }

    #[tokio::test]
    async fn test_console_sink_initialize_defaults_to_plain() {
        let mut sink = ConsoleSink::new();
        sink.initialize(toml::Value::Table(Default::default()))
            .await
            .unwrap();
        sink.publish(&final_event("hello")).await.unwrap();
        assert!(sink.accumulated().is_empty());
    }

    #[tokio::test]
    async fn test_console_sink_accumulates_finals() {
        let mut sink = ConsoleSink::new();
        let config = toml::Value::Table({
            let mut t = toml::map::Map::new();
            t.insert("accumulate".to_string(), toml::Value::Boolean(true));
            t
        });
        sink.initialize(config).await.unwrap();

        sink.publish(&final_event("hello")).await.unwrap();
        sink.publish(&final_event("world")).await.unwrap();
        assert_eq!(sink.accumulated(), "hello world ");
    }

    #[tokio::test]
    async fn test_console_sink_interim_does_not_accumulate() {
        let mut sink = ConsoleSink::new();
        let config = toml::Value::Table({
            let mut t = toml::map::Map::new();
            t.insert("accumulate".to_string(), toml::Value::Boolean(true));
            t
        });
        sink.initialize(config).await.unwrap();

        sink.publish(&interim_event("partial")).await.unwrap();
        assert!(sink.accumulated().is_empty());
        assert_eq!(sink.publish_count(), 1);
    }

    #[test]
    fn test_console_sink_is_healthy() {
        let sink = ConsoleSink::new();
        assert!(sink.is_healthy());
    }

    #[test]
    fn test_console_sink_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConsoleSink>();
    }
}
