pub mod clock;
pub mod config;
pub mod error;
pub mod offset;
pub mod sample_source;
pub mod session_types;
pub mod types;

pub use clock::{Clock, WallClock};
pub use config::AppConfig;
pub use error::{AudioError, ConfigError, MatchError, PlayerError, StoreError, SyncError};
pub use offset::{compute_target_media_ms, expected_position_sec};
pub use sample_source::SampleSource;
pub use session_types::{
    bias_announcement, EngineStatus, PlaybackRequest, SessionCommand, SessionState,
};
pub use types::{
    AudioSample, BiasConfig, DriftSample, MatchEvent, MatchRequest, MatchResult, MediaSource,
    SyncBaseline,
};

/// Fixed lookahead of the capture pipeline's encoder/resampler.
pub const CAPTURE_BIAS_MS: f64 = 80.0;

/// User bias used when nothing has been persisted yet.
pub const DEFAULT_SYNC_BIAS_MS: i64 = 75;
