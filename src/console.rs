use adsync_core::{EngineStatus, SessionCommand, SessionState};

/// What a line typed on the console asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleAction {
    Session(SessionCommand),
    /// Drop the current attempt and listen again.
    Listen,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  +        sync bias later by one step
  -        sync bias earlier by one step
  b <ms>   change sync bias by <ms> (0 repeats the current value)
  p        play / pause (also starts playback after autoplay was blocked)
  s        start playback manually
  l        re-listen
  h        help
  q        quit";

pub fn parse_line(line: &str, step_ms: i64) -> Option<ConsoleAction> {
    let mut parts = line.split_whitespace();
    let action = match parts.next()? {
        "+" => ConsoleAction::Session(SessionCommand::AdjustBias(step_ms)),
        "-" => ConsoleAction::Session(SessionCommand::AdjustBias(-step_ms)),
        "b" | "bias" => {
            let delta = parts.next()?.parse::<i64>().ok()?;
            ConsoleAction::Session(SessionCommand::AdjustBias(delta))
        }
        "p" | "pause" | "play" => ConsoleAction::Session(SessionCommand::TogglePlayback),
        "s" | "start" => ConsoleAction::Session(SessionCommand::ManualStart),
        "l" | "r" | "listen" => ConsoleAction::Listen,
        "h" | "?" | "help" => ConsoleAction::Help,
        "q" | "quit" => ConsoleAction::Quit,
        _ => return None,
    };
    Some(action)
}

/// User-facing lines for what changed between two status snapshots.
pub fn describe_change(prev: &EngineStatus, next: &EngineStatus) -> Vec<String> {
    let mut lines = Vec::new();
    if next.announcement_seq != prev.announcement_seq {
        if let Some(announcement) = &next.announcement {
            lines.push(announcement.clone());
        }
    }
    if next.state != prev.state {
        lines.push(match next.state {
            SessionState::Idle => "idle".to_string(),
            SessionState::Seeking => "seeking".to_string(),
            SessionState::AwaitingManualStart => {
                "playback blocked: press 's' to start".to_string()
            }
            SessionState::Playing => match (&next.clip_id, next.confidence) {
                (Some(clip), Some(confidence)) => {
                    format!("playing {clip} (confidence {confidence:.2})")
                }
                _ => "playing".to_string(),
            },
            SessionState::Paused => "paused".to_string(),
        });
    }
    if next.last_error != prev.last_error {
        if let Some(error) = &next.last_error {
            lines.push(format!("error: {error}"));
        }
    }
    lines
}
