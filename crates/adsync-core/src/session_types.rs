use crate::error::SyncError;
use crate::types::{MatchEvent, MatchResult, MediaSource};

/// Lifecycle of one sync session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Awaiting a match event.
    #[default]
    Idle,
    /// Seek Stabilizer running.
    Seeking,
    /// Platform refused playback; waiting for a user-initiated start.
    AwaitingManualStart,
    /// Playing with the Drift Controller correcting.
    Playing,
    Paused,
}

impl SessionState {
    /// Transitions the session state machine permits.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Seeking)
                | (Seeking, Playing)
                | (Seeking, AwaitingManualStart)
                | (Seeking, Idle)
                | (AwaitingManualStart, Seeking)
                | (AwaitingManualStart, Idle)
                | (Playing, Paused)
                | (Playing, Idle)
                | (Paused, Playing)
                | (Paused, Idle)
        )
    }

    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Playing | SessionState::Paused)
    }
}

/// Snapshot the engine exposes to whatever renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub state: SessionState,
    pub sync_bias_ms: i64,
    /// Accessible text announced whenever the bias changes.
    pub announcement: Option<String>,
    /// Bumped on every announcement, including repeats of the same text.
    pub announcement_seq: u64,
    pub last_error: Option<SyncError>,
    pub clip_id: Option<String>,
    pub confidence: Option<f64>,
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            sync_bias_ms: crate::DEFAULT_SYNC_BIAS_MS,
            announcement: None,
            announcement_seq: 0,
            last_error: None,
            clip_id: None,
            confidence: None,
        }
    }
}

/// A playback attempt ready to hand to the session: the match and where to play it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRequest {
    pub event: MatchEvent,
    pub result: MatchResult,
    pub source: MediaSource,
}

/// Commands sent to the session host.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Start(PlaybackRequest),
    TogglePlayback,
    ManualStart,
    AdjustBias(i64),
    /// Discard the current attempt and return to idle.
    Relisten,
    /// Surface a failure that happened before the session got involved.
    ReportError(SyncError),
    Stop,
}

/// Text announced after a bias change.
pub fn bias_announcement(sync_bias_ms: i64) -> String {
    format!("Sync bias {:+} ms", sync_bias_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_default_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
    }

    #[test]
    fn test_permitted_transitions() {
        use SessionState::*;
        assert!(Idle.can_transition_to(Seeking));
        assert!(Seeking.can_transition_to(Playing));
        assert!(Seeking.can_transition_to(AwaitingManualStart));
        assert!(AwaitingManualStart.can_transition_to(Seeking));
        assert!(Playing.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Playing));
        for s in [Seeking, AwaitingManualStart, Playing, Paused] {
            assert!(s.can_transition_to(Idle), "{s:?} should allow re-listen");
        }
    }

    #[test]
    fn test_forbidden_transitions() {
        use SessionState::*;
        assert!(!Idle.can_transition_to(Playing));
        assert!(!Idle.can_transition_to(Paused));
        assert!(!Playing.can_transition_to(Seeking));
        assert!(!Paused.can_transition_to(Seeking));
        assert!(!AwaitingManualStart.can_transition_to(Playing));
        assert!(!Idle.can_transition_to(Idle));
    }

    #[test]
    fn test_is_active() {
        assert!(SessionState::Playing.is_active());
        assert!(SessionState::Paused.is_active());
        assert!(!SessionState::Seeking.is_active());
        assert!(!SessionState::Idle.is_active());
    }

    #[test]
    fn test_engine_status_default() {
        let status = EngineStatus::default();
        assert_eq!(status.state, SessionState::Idle);
        assert_eq!(status.sync_bias_ms, 75);
        assert!(status.announcement.is_none());
        assert!(status.last_error.is_none());
    }

    #[test]
    fn test_bias_announcement_signed() {
        assert_eq!(bias_announcement(100), "Sync bias +100 ms");
        assert_eq!(bias_announcement(-25), "Sync bias -25 ms");
        assert_eq!(bias_announcement(0), "Sync bias +0 ms");
    }

    #[test]
    fn test_session_command_clone_eq() {
        let cmd = SessionCommand::AdjustBias(25);
        assert_eq!(cmd.clone(), cmd);
    }
}
