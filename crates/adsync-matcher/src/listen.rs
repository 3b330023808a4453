use crate::matcher_trait::Matcher;
use adsync_core::{
    Clock, MatchError, MatchEvent, MatchRequest, PlaybackRequest, SampleSource, SessionCommand,
    SyncError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Run one listening attempt: record the room, identify the clip and resolve
/// where to play its audio-description track.
///
/// `listen_start_wall_ms` is taken just before recording starts and
/// `matched_at_wall_ms` as soon as the matcher answers; the catalog lookup
/// afterwards is absorbed by the seek stage.
pub async fn listen(
    source: &mut dyn SampleSource,
    matcher: &dyn Matcher,
    clock: &dyn Clock,
    request: &MatchRequest,
    duration: Duration,
) -> Result<PlaybackRequest, MatchError> {
    let listen_start_wall_ms = clock.now_ms();
    tracing::info!(source = source.name(), ?duration, "listening");

    let sample = source.record(duration).await?;
    let result = matcher.match_sample(&sample, request).await?;
    let matched_at_wall_ms = clock.now_ms();

    tracing::info!(
        clip_id = %result.clip_id,
        offset_ms = result.offset_ms,
        confidence = result.confidence,
        latency_ms = matched_at_wall_ms - listen_start_wall_ms,
        "matched"
    );

    let media = matcher.resolve_source(&result.clip_id, &request.lang).await?;

    Ok(PlaybackRequest {
        event: MatchEvent {
            matched_clip_offset_ms: result.offset_ms as f64,
            listen_start_wall_ms,
            matched_at_wall_ms,
        },
        result,
        source: media,
    })
}

/// Runs one listen per trigger and hands each outcome to the session.
///
/// Every attempt opens with a [`SessionCommand::Relisten`], so the session
/// drops the previous attempt before this one's `Start` can arrive. A trigger
/// received mid-listen abandons the listen in flight and starts over; closing
/// the trigger channel abandons it and returns.
pub async fn run_listener(
    mut source: Box<dyn SampleSource>,
    matcher: Box<dyn Matcher>,
    clock: Arc<dyn Clock>,
    request: MatchRequest,
    duration: Duration,
    mut trigger_rx: mpsc::UnboundedReceiver<()>,
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
) {
    let mut triggered = trigger_rx.recv().await.is_some();
    while triggered {
        // Collapse repeated triggers into one attempt.
        while trigger_rx.try_recv().is_ok() {}
        if cmd_tx.send(SessionCommand::Relisten).is_err() {
            break;
        }

        let attempt = listen(
            source.as_mut(),
            matcher.as_ref(),
            clock.as_ref(),
            &request,
            duration,
        );
        let outcome = tokio::select! {
            biased;
            next = trigger_rx.recv() => {
                tracing::info!("listen abandoned");
                triggered = next.is_some();
                continue;
            }
            outcome = attempt => outcome,
        };

        let cmd = match outcome {
            Ok(playback) => SessionCommand::Start(playback),
            Err(e) => {
                tracing::warn!(matcher = matcher.name(), "listen failed: {e}");
                SessionCommand::ReportError(SyncError::from(e))
            }
        };
        if cmd_tx.send(cmd).is_err() {
            break;
        }
        triggered = trigger_rx.recv().await.is_some();
    }

    if let Err(e) = matcher.shutdown().await {
        tracing::error!("matcher shutdown failed: {e}");
    }
}
