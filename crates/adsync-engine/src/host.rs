use crate::session::{Pending, SyncSession};
use adsync_core::{EngineStatus, SessionCommand, SessionState};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Interval, MissedTickBehavior};

enum Event {
    Command(Option<SessionCommand>),
    Tick,
}

/// Runs a [`SyncSession`] on its own task.
///
/// Commands and drift samples are serialized through one loop, so the
/// session needs no locking. The drift timer only exists while playing.
/// Waiting on the element (load, start, resume) keeps the loop listening:
/// a new start, re-listen or stop abandons the wait, and other commands
/// queue until it is over.
pub struct SessionHost {
    session: Option<SyncSession>,
    sample_interval: Duration,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    command_rx: Option<mpsc::UnboundedReceiver<SessionCommand>>,
    status_tx: watch::Sender<EngineStatus>,
    task_handle: Option<tokio::task::JoinHandle<SyncSession>>,
}

impl SessionHost {
    pub fn new(session: SyncSession, sample_interval: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(session.status().clone());
        Self {
            session: Some(session),
            sample_interval,
            command_tx,
            command_rx: Some(command_rx),
            status_tx,
            task_handle: None,
        }
    }

    pub fn command_sender(&self) -> mpsc::UnboundedSender<SessionCommand> {
        self.command_tx.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
        self.status_tx.subscribe()
    }

    pub fn start(&mut self) {
        let (Some(mut session), Some(mut rx)) = (self.session.take(), self.command_rx.take())
        else {
            tracing::warn!("session host already started");
            return;
        };
        let status_tx = self.status_tx.clone();
        let period = self.sample_interval;

        let handle = tokio::spawn(async move {
            let mut timer: Option<Interval> = None;
            let mut queued: VecDeque<SessionCommand> = VecDeque::new();
            loop {
                let event = match queued.pop_front() {
                    Some(cmd) => Event::Command(Some(cmd)),
                    None => tokio::select! {
                        cmd = rx.recv() => Event::Command(cmd),
                        _ = next_tick(&mut timer) => Event::Tick,
                    },
                };

                match event {
                    Event::Tick => {
                        session.tick();
                        continue;
                    }
                    Event::Command(None) | Event::Command(Some(SessionCommand::Stop)) => {
                        session.stop();
                        status_tx.send_replace(session.status().clone());
                        break;
                    }
                    Event::Command(Some(cmd)) => {
                        if abandons_attempt(&cmd) {
                            // A new attempt never inherits the old attempt's timer.
                            timer = None;
                        }
                        if let Some(pending) = apply_command(&mut session, cmd) {
                            status_tx.send_replace(session.status().clone());
                            run_pending(&mut session, pending, &mut rx, &mut queued).await;
                        }
                    }
                }

                if session.state() == SessionState::Playing {
                    if timer.is_none() {
                        timer = Some(drift_timer(period));
                    }
                } else {
                    timer = None;
                }
                status_tx.send_replace(session.status().clone());
            }
            drop(timer);
            tracing::debug!("session host stopped");
            session
        });

        self.task_handle = Some(handle);
    }

    /// Stop the session and wait for the loop to exit, returning the session.
    pub async fn shutdown(&mut self) -> Option<SyncSession> {
        let _ = self.command_tx.send(SessionCommand::Stop);
        match self.task_handle.take() {
            Some(handle) => handle.await.ok(),
            None => self.session.take(),
        }
    }
}

fn abandons_attempt(cmd: &SessionCommand) -> bool {
    matches!(
        cmd,
        SessionCommand::Start(_) | SessionCommand::Relisten | SessionCommand::Stop
    )
}

/// Apply a command's immediate effects. Returns the waiting still to do.
fn apply_command(session: &mut SyncSession, cmd: SessionCommand) -> Option<Pending> {
    let result = match cmd {
        SessionCommand::Start(request) => {
            session.relisten();
            session.prepare_start(request).map(Some)
        }
        SessionCommand::TogglePlayback => session.prepare_toggle(),
        SessionCommand::ManualStart => session.prepare_manual_start().map(Some),
        SessionCommand::AdjustBias(delta_ms) => {
            session.adjust_bias(delta_ms);
            Ok(None)
        }
        SessionCommand::Relisten => {
            session.relisten();
            Ok(None)
        }
        SessionCommand::ReportError(error) => {
            session.report_error(error);
            Ok(None)
        }
        SessionCommand::Stop => Ok(None),
    };
    result.unwrap_or_else(|e| {
        tracing::debug!("command not completed: {e}");
        None
    })
}

/// Drive the waiting half of a command while still reading commands.
///
/// A command that abandons the attempt drops the wait and is queued first in
/// line after anything that arrived before it; the session is left in its
/// intermediate state for that command to discard.
async fn run_pending(
    session: &mut SyncSession,
    pending: Pending,
    rx: &mut mpsc::UnboundedReceiver<SessionCommand>,
    queued: &mut VecDeque<SessionCommand>,
) {
    let work = session.finish(pending);
    tokio::pin!(work);
    loop {
        tokio::select! {
            result = &mut work => {
                if let Err(e) = result {
                    tracing::debug!("command not completed: {e}");
                }
                return;
            }
            cmd = rx.recv() => match cmd {
                Some(cmd) if !abandons_attempt(&cmd) => queued.push_back(cmd),
                cmd => {
                    tracing::debug!(?pending, "abandoning wait on the element");
                    queued.push_back(cmd.unwrap_or(SessionCommand::Stop));
                    return;
                }
            },
        }
    }
}

fn drift_timer(period: Duration) -> Interval {
    let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bias::{BiasController, MemoryBiasStore};
    use crate::player_trait::PlaybackElement;
    use crate::sim_player::SimulatedPlayer;
    use adsync_core::config::SyncConfig;
    use adsync_core::{
        Clock, MatchEvent, MatchResult, MediaSource, PlaybackRequest, SyncError, WallClock,
    };
    use std::sync::Arc;

    fn make_host(player: SimulatedPlayer) -> (SessionHost, WallClock) {
        let clock = WallClock::starting_at(0.0);
        let bias = BiasController::new(Box::new(MemoryBiasStore::new()), &SyncConfig::default());
        let session = SyncSession::new(
            Box::new(player),
            Arc::new(clock),
            bias,
            &SyncConfig::default(),
        );
        (SessionHost::new(session, Duration::from_secs(1)), clock)
    }

    fn request(clock: &WallClock) -> PlaybackRequest {
        let now = clock.now_ms();
        PlaybackRequest {
            event: MatchEvent {
                matched_clip_offset_ms: 60_000.0,
                listen_start_wall_ms: now,
                matched_at_wall_ms: now,
            },
            result: MatchResult {
                clip_id: "clip".to_string(),
                offset_ms: 60_000,
                confidence: 1.0,
            },
            source: MediaSource {
                clip_id: "clip".to_string(),
                url: "file://clip.mp3".to_string(),
            },
        }
    }

    async fn wait_for_state(rx: &mut watch::Receiver<EngineStatus>, state: SessionState) {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.state == state))
            .await
            .expect("timed out waiting for state")
            .expect("status channel closed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_initial_status() {
        let (host, _) = make_host(SimulatedPlayer::new());
        let rx = host.subscribe();
        assert_eq!(rx.borrow().state, SessionState::Idle);
        assert_eq!(rx.borrow().sync_bias_ms, 75);
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_start_then_shutdown() {
        let (mut host, clock) = make_host(SimulatedPlayer::new());
        let mut rx = host.subscribe();
        let tx = host.command_sender();
        host.start();

        tx.send(SessionCommand::Start(request(&clock))).unwrap();
        wait_for_state(&mut rx, SessionState::Playing).await;

        let session = host.shutdown().await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(rx.borrow().state, SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_ticks_correct_drift() {
        let player = SimulatedPlayer::new();
        let (mut host, clock) = make_host(player.clone());
        let mut rx = host.subscribe();
        let tx = host.command_sender();
        host.start();

        tx.send(SessionCommand::Start(request(&clock))).unwrap();
        wait_for_state(&mut rx, SessionState::Playing).await;

        player.glitch(-3.0);
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let expected = 60.155 + clock.now_ms() / 1000.0;
        assert!((player.current_time() - expected).abs() < 1e-3);

        host.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_pause_stops_ticks() {
        let player = SimulatedPlayer::new();
        let (mut host, clock) = make_host(player.clone());
        let mut rx = host.subscribe();
        let tx = host.command_sender();
        host.start();

        tx.send(SessionCommand::Start(request(&clock))).unwrap();
        wait_for_state(&mut rx, SessionState::Playing).await;
        tx.send(SessionCommand::TogglePlayback).unwrap();
        wait_for_state(&mut rx, SessionState::Paused).await;

        let seeks = player.seek_count();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(player.seek_count(), seeks);

        host.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_bias_announcement() {
        let (mut host, _) = make_host(SimulatedPlayer::new());
        let mut rx = host.subscribe();
        let tx = host.command_sender();
        host.start();

        tx.send(SessionCommand::AdjustBias(-25)).unwrap();
        rx.changed().await.unwrap();
        let status = rx.borrow_and_update().clone();
        assert_eq!(status.sync_bias_ms, 50);
        assert_eq!(status.announcement.as_deref(), Some("Sync bias +50 ms"));

        host.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_report_error() {
        let (mut host, _) = make_host(SimulatedPlayer::new());
        let mut rx = host.subscribe();
        let tx = host.command_sender();
        host.start();

        tx.send(SessionCommand::ReportError(SyncError::MatchingFailed(
            "no match found".to_string(),
        )))
        .unwrap();
        rx.changed().await.unwrap();
        assert!(matches!(
            rx.borrow().last_error,
            Some(SyncError::MatchingFailed(_))
        ));

        host.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_shutdown_completes() {
        let (mut host, _) = make_host(SimulatedPlayer::new());
        host.start();
        tokio::time::timeout(Duration::from_secs(2), host.shutdown())
            .await
            .expect("shutdown timed out");
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_shutdown_without_start_returns_session() {
        let (mut host, _) = make_host(SimulatedPlayer::new());
        assert!(host.shutdown().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_relisten_abandons_loading_attempt() {
        let player = SimulatedPlayer::new().with_ready_delay(Duration::from_secs(3600));
        let (mut host, clock) = make_host(player.clone());
        let mut rx = host.subscribe();
        let tx = host.command_sender();
        host.start();

        tx.send(SessionCommand::Start(request(&clock))).unwrap();
        wait_for_state(&mut rx, SessionState::Seeking).await;
        assert_eq!(rx.borrow().clip_id.as_deref(), Some("clip"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(SessionCommand::Relisten).unwrap();
        wait_for_state(&mut rx, SessionState::Idle).await;
        assert!(rx.borrow().clip_id.is_none());

        // The element becoming ready later starts nothing.
        tokio::time::sleep(Duration::from_secs(3700)).await;
        assert_eq!(rx.borrow().state, SessionState::Idle);
        assert_eq!(player.seek_count(), 0);
        assert!(player.is_paused());

        host.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_new_start_replaces_loading_attempt() {
        let player = SimulatedPlayer::new().with_ready_delay(Duration::from_secs(3600));
        let (mut host, clock) = make_host(player.clone());
        let mut rx = host.subscribe();
        let tx = host.command_sender();
        host.start();

        tx.send(SessionCommand::Start(request(&clock))).unwrap();
        wait_for_state(&mut rx, SessionState::Seeking).await;

        let mut second = request(&clock);
        second.result.clip_id = "other".to_string();
        tx.send(SessionCommand::Start(second)).unwrap();
        rx.wait_for(|s| s.clip_id.as_deref() == Some("other"))
            .await
            .unwrap();
        assert_eq!(rx.borrow().state, SessionState::Seeking);

        host.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_queues_commands_during_load() {
        let player = SimulatedPlayer::new().with_ready_delay(Duration::from_millis(500));
        let (mut host, clock) = make_host(player.clone());
        let mut rx = host.subscribe();
        let tx = host.command_sender();
        host.start();

        tx.send(SessionCommand::Start(request(&clock))).unwrap();
        wait_for_state(&mut rx, SessionState::Seeking).await;
        tx.send(SessionCommand::AdjustBias(25)).unwrap();

        wait_for_state(&mut rx, SessionState::Playing).await;
        rx.wait_for(|s| s.sync_bias_ms == 100).await.unwrap();
        assert_eq!(rx.borrow().state, SessionState::Playing);

        host.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_shutdown_during_load_is_prompt() {
        let player = SimulatedPlayer::new().with_ready_delay(Duration::from_secs(3600));
        let (mut host, clock) = make_host(player.clone());
        let mut rx = host.subscribe();
        let tx = host.command_sender();
        host.start();

        tx.send(SessionCommand::Start(request(&clock))).unwrap();
        wait_for_state(&mut rx, SessionState::Seeking).await;

        let session = tokio::time::timeout(Duration::from_secs(2), host.shutdown())
            .await
            .expect("shutdown timed out")
            .unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(player.seek_count(), 0);
    }
}
