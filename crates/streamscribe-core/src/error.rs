use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to enumerate devices: {0}")]
    DeviceEnumeration(String),

    #[error("failed to build stream: {0}")]
    StreamBuild(String),

    #[error("microphone produced no signal before the init timeout")]
    InitTimeout,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport not found: {0}")]
    NotFound(String),

    #[error("transport initialization failed: {0}")]
    InitializationFailed(String),

    #[error("failed to open recognition stream: {0}")]
    OpenFailed(String),

    #[error("failed to write audio: {0}")]
    WriteFailed(String),

    #[error("failed to read response: {0}")]
    ReadFailed(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a listening session is already active")]
    AlreadyActive,

    #[error("no listening session is active")]
    NotActive,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink initialization failed: {0}")]
    InitializationFailed(String),

    #[error("failed to publish transcript: {0}")]
    PublishFailed(String),

    #[error("sink not found: {0}")]
    NotFound(String),
}
