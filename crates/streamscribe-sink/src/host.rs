use crate::registry::SinkRegistry;
use crate::sink_trait::Sink;
use streamscribe_core::{SessionEvent, SinkError};
use tokio::sync::mpsc;

/// Consumes the session's event stream and fans transcripts out to the
/// configured sinks. Lifecycle transitions are logged, not forwarded.
pub struct SinkHost {
    registry: SinkRegistry,
    sinks: Vec<Box<dyn Sink>>,
    event_rx: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl SinkHost {
    pub fn new(event_rx: mpsc::UnboundedReceiver<SessionEvent>) -> Self {
        Self {
            registry: SinkRegistry::new(),
            sinks: Vec::new(),
            event_rx: Some(event_rx),
            task_handle: None,
        }
    }

    pub async fn add_sink(
        &mut self,
        plugin_name: &str,
        config: toml::Value,
    ) -> Result<(), SinkError> {
        let mut sink = self.registry.create(plugin_name)?;
        sink.initialize(config).await?;
        self.sinks.push(sink);
        Ok(())
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn start(&mut self) {
        let mut rx = self
            .event_rx
            .take()
            .expect("start() called but receiver already taken");
        let sinks = std::mem::take(&mut self.sinks);

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    SessionEvent::Started => {
                        tracing::info!("listening");
                    }
                    SessionEvent::Stopped => {
                        tracing::info!("stopped listening");
                    }
                    SessionEvent::Transcript(transcript) => {
                        for sink in &sinks {
                            if let Err(e) = sink.publish(&transcript).await {
                                tracing::error!(
                                    sink = %sink.name(),
                                    "publish failed: {e}"
                                );
                            }
                        }
                    }
                }
            }

            for sink in &sinks {
                let _ = sink.shutdown().await;
            }
        });

        self.task_handle = Some(handle);
    }

    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamscribe_core::TranscriptEvent;

    fn make_channel() -> (
        mpsc::UnboundedSender<SessionEvent>,
        mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        mpsc::unbounded_channel()
    }

    fn transcript(text: &str, is_final: bool) -> SessionEvent {
        SessionEvent::Transcript(TranscriptEvent {
            text: text.to_string(),
            is_final,
            end_offset_ms: 0,
        })
    }

    fn file_config(path: &str) -> toml::Value {
        toml::Value::Table({
            let mut t = toml::map::Map::new();
            t.insert("path".to_string(), toml::Value::String(path.to_string()));
            t
        })
    }

    #[tokio::test]
    async fn test_host_add_sink_unknown_plugin_fails() {
        let (_tx, rx) = make_channel();
        let mut host = SinkHost::new(rx);
        let result = host
            .add_sink("nonexistent", toml::Value::Table(Default::default()))
            .await;
        assert!(matches!(result, Err(SinkError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_host_routes_finals_to_file_sink() {
        let dir = std::env::temp_dir().join("streamscribe_sink_host_file");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.txt");
        let _ = std::fs::remove_file(&path);

        let (tx, rx) = make_channel();
        let mut host = SinkHost::new(rx);
        host.add_sink("file", file_config(&path.to_string_lossy()))
            .await
            .unwrap();
        host.start();

        tx.send(SessionEvent::Started).unwrap();
        tx.send(transcript("hello", true)).unwrap();
        tx.send(transcript("partial", false)).unwrap();
        tx.send(transcript("world", true)).unwrap();
        tx.send(SessionEvent::Stopped).unwrap();
        drop(tx);

        tokio::time::timeout(std::time::Duration::from_secs(2), host.shutdown())
            .await
            .expect("shutdown timed out");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "hello\nworld\n");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_host_fans_out_to_multiple_sinks() {
        let dir = std::env::temp_dir().join("streamscribe_sink_host_fanout");
        std::fs::create_dir_all(&dir).unwrap();
        let path_a = dir.join("a.txt");
        let path_b = dir.join("b.txt");
        let _ = std::fs::remove_file(&path_a);
        let _ = std::fs::remove_file(&path_b);

        let (tx, rx) = make_channel();
        let mut host = SinkHost::new(rx);
        host.add_sink("file", file_config(&path_a.to_string_lossy()))
            .await
            .unwrap();
        host.add_sink("file", file_config(&path_b.to_string_lossy()))
            .await
            .unwrap();
        assert_eq!(host.sink_count(), 2);
        host.start();

        tx.send(transcript("fanout", true)).unwrap();
        drop(tx);

        tokio::time::timeout(std::time::Duration::from_secs(2), host.shutdown())
            .await
            .expect("shutdown timed out");

        assert_eq!(std::fs::read_to_string(&path_a).unwrap(), "fanout\n");
        assert_eq!(std::fs::read_to_string(&path_b).unwrap(), "fanout\n");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_host_shutdown_completes_after_sender_drop() {
        let (tx, rx) = make_channel();
        let mut host = SinkHost::new(rx);
        host.start();

        drop(tx);

        tokio::time::timeout(std::time::Duration::from_secs(2), host.shutdown())
            .await
            .expect("shutdown timed out");
    }

    #[tokio::test]
    async fn test_host_without_sinks_consumes_events() {
        let (tx, rx) = make_channel();
        let mut host = SinkHost::new(rx);
        host.start();

        tx.send(SessionEvent::Started).unwrap();
        tx.send(transcript("ignored", true)).unwrap();
        drop(tx);

        tokio::time::timeout(std::time::Duration::from_secs(2), host.shutdown())
            .await
            .expect("shutdown timed out");
    }
}
