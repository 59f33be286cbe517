use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "streamscribe", about = "Streaming microphone transcription")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = streamscribe_core::AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;

    let env_filter =
        EnvFilter::try_new(&config.general.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("streamscribe starting");

    // Resolve the capture device
    let device_manager = streamscribe_audio::DeviceManager::new();
    let input_device = device_manager
        .get_input_device(&config.audio.device_name)
        .with_context(|| {
            format!(
                "failed to get input device '{}'",
                config.audio.device_name
            )
        })?;

    let sample_rate = config.audio.sample_rate;
    let channels: u16 = 1;
    let buffer_size = config.audio.buffer_size;

    // Create and initialize the transport plugin
    let registry = streamscribe_session::TransportRegistry::new();
    let mut transport = registry
        .create(&config.transport.plugin)
        .with_context(|| format!("unknown transport '{}'", config.transport.plugin))?;
    transport
        .initialize(config.transport.extra.clone())
        .await
        .with_context(|| {
            format!(
                "failed to initialize transport '{}'",
                config.transport.plugin
            )
        })?;
    let transport: Arc<dyn streamscribe_session::SpeechTransport> = Arc::from(transport);
    tracing::info!("transport '{}' active", config.transport.plugin);

    let session = streamscribe_session::StreamSession::new(transport);
    let event_rx = session
        .take_event_receiver()
        .context("event receiver already taken")?;

    // Route session events to the configured sinks
    let mut sink_host = None;
    if config.sink.is_empty() {
        // Fallback: log transcripts when no sinks are configured
        let mut rx = event_rx;
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let streamscribe_core::SessionEvent::Transcript(t) = event {
                    tracing::info!(is_final = t.is_final, "transcript: {}", t.text);
                }
            }
        });
    } else {
        let mut host = streamscribe_sink::SinkHost::new(event_rx);
        for sink_cfg in &config.sink {
            host.add_sink(&sink_cfg.plugin, sink_cfg.extra.clone())
                .await
                .with_context(|| format!("failed to add sink '{}'", sink_cfg.plugin))?;
            tracing::info!("sink '{}' attached", sink_cfg.plugin);
        }
        host.start();
        sink_host = Some(host);
    }

    // Capture ring: ~2 seconds of mono audio
    let ring_capacity = (sample_rate as usize) * 2;
    let (producer, consumer) = streamscribe_audio::create_ring_buffer(ring_capacity);

    let (_capture, capture_handle) = streamscribe_audio::CaptureNode::new(
        &input_device,
        producer,
        sample_rate,
        channels,
        buffer_size,
    )
    .context("failed to create capture node")?;

    capture_handle
        .wait_for_signal(Duration::from_millis(config.audio.mic_init_timeout_ms))
        .await
        .context("unable to initialize microphone")?;

    // Pump: one PCM chunk per capture buffer period
    let (chunk_tx, mut chunk_rx) = tokio::sync::mpsc::unbounded_channel();
    let pump =
        streamscribe_audio::ChunkPump::new(consumer, buffer_size as usize, channels, chunk_tx);
    let period =
        Duration::from_millis((buffer_size as u64 * 1000 / sample_rate.max(1) as u64).max(1));
    let pump_handle = pump.start(period);

    let session_config = streamscribe_session::SessionConfig {
        sample_rate_hz: sample_rate,
        language: config.session.language.clone(),
        interim_results: config.session.interim_results,
        max_stream_duration: Duration::from_millis(config.session.max_stream_duration_ms),
        stop_drain_timeout: Duration::from_millis(config.session.stop_drain_timeout_ms),
    };
    session
        .start(session_config)
        .await
        .context("failed to start listening")?;

    let ingest_session = session.clone();
    let ingest_task = tokio::spawn(async move {
        while let Some(chunk) = chunk_rx.recv().await {
            ingest_session.ingest(chunk).await;
        }
    });

    tracing::info!("transcribing, press ctrl-c to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    tracing::info!("shutting down");
    session.stop().await;
    pump_handle.stop();
    let _ = ingest_task.await;
    drop(session);

    if let Some(mut host) = sink_host {
        host.shutdown().await;
    }

    Ok(())
}
