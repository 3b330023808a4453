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

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("failed to encode sample: {0}")]
    Encode(String),
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("matcher initialization failed: {0}")]
    InitializationFailed(String),

    #[error("matcher not found: {0}")]
    MatcherNotFound(String),

    #[error("no match found")]
    NoMatch,

    #[error("match request failed: {0}")]
    RequestFailed(String),

    #[error("matcher rejected the request ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("audio capture failed: {0}")]
    Capture(#[from] AudioError),

    #[error("media source unavailable: {0}")]
    SourceUnavailable(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlayerError {
    #[error("media failed to load: {0}")]
    LoadFailed(String),

    #[error("playback refused without user action")]
    AutoplayBlocked,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write state file: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Failures of one playback attempt, each mapping to a distinct remedy.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    #[error("media failed to load: {0}")]
    MediaLoadFailed(String),

    #[error("autoplay blocked, user action required")]
    AutoplayBlocked,

    #[error("matching failed: {0}")]
    MatchingFailed(String),

    #[error("match confidence {confidence:.2} below threshold {threshold:.2}")]
    LowConfidence { confidence: f64, threshold: f64 },

    #[error("cannot {action} while {from:?}")]
    InvalidTransition {
        from: crate::SessionState,
        action: &'static str,
    },
}

impl From<PlayerError> for SyncError {
    fn from(e: PlayerError) -> Self {
        match e {
            PlayerError::LoadFailed(msg) => SyncError::MediaLoadFailed(msg),
            PlayerError::AutoplayBlocked => SyncError::AutoplayBlocked,
        }
    }
}

impl From<MatchError> for SyncError {
    fn from(e: MatchError) -> Self {
        match e {
            MatchError::SourceUnavailable(msg) => SyncError::MediaLoadFailed(msg),
            other => SyncError::MatchingFailed(other.to_string()),
        }
    }
}
